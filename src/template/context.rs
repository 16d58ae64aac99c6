//! Evaluation environment of a template: one subject plus the shared
//! services every macro may consult.

use crate::error::{Error, Result};
use crate::extract::CommentExtractor;
use crate::inflect;
use crate::invoke::{Invoker, Sandbox};
use crate::link::RepositoryLinks;
use crate::model::Subject;
use crate::reference::{MethodReference, ParseOptions, ReferenceKind, Visibility};
use crate::registry::SubjectRegistry;
use crate::source::{SourceLocator, SourceSite};
use crate::template::eval::{Args, Env};
use crate::template::macros::MacroSet;
use crate::template::{Origin, TemplateEngine, Value};
use tracing::debug;

/// Nesting bound for `print_mark_doc_from` chains.
const MAX_NESTING: usize = 16;

/// Read-only services shared by every worker of a run.
#[derive(Clone, Copy)]
pub struct Workspace<'w> {
    pub registry: &'w SubjectRegistry,
    pub locator: &'w dyn SourceLocator,
    pub links: &'w dyn RepositoryLinks,
    pub invoker: &'w dyn Invoker,
    pub macros: &'w MacroSet,
    pub extractor: &'w CommentExtractor,
    pub engine: TemplateEngine,
}

/// Environment bound to one subject and, for member blocks, the member
/// being documented.
pub struct MacroContext<'w> {
    ws: Workspace<'w>,
    subject: &'w Subject,
    current: Option<MethodReference>,
    depth: usize,
}

impl<'w> MacroContext<'w> {
    pub fn new(ws: Workspace<'w>, subject: &'w Subject, current: Option<MethodReference>) -> Self {
        Self {
            ws,
            subject,
            current,
            depth: 0,
        }
    }

    pub fn workspace(&self) -> Workspace<'w> {
        self.ws
    }

    pub fn subject(&self) -> &'w Subject {
        self.subject
    }

    /// Member whose block is being rendered, if any.
    pub fn current(&self) -> Option<&MethodReference> {
        self.current.as_ref()
    }

    /// Parse a reference written inside this subject's documentation.
    pub fn reference(&self, text: &str) -> Result<MethodReference> {
        MethodReference::parse(text, &self.subject.name, ParseOptions::default())
    }

    /// Positional argument `index` as a reference, else the current member.
    pub fn reference_arg(&self, args: &Args, index: usize, macro_name: &str) -> Result<MethodReference> {
        match args.get(index) {
            Some(_) => self.reference(args.str(index, macro_name)?),
            None => self.current.clone().ok_or_else(|| {
                Error::eval(format!(
                    "{}: no reference given outside a member block",
                    macro_name
                ))
            }),
        }
    }

    pub fn owner(&self, reference: &MethodReference) -> Result<&'w Subject> {
        reference.context(self.ws.registry)
    }

    pub fn locate(&self, reference: &MethodReference) -> Result<SourceSite> {
        let owner = self.owner(reference)?;
        self.ws
            .locator
            .locate(reference, owner, self.ws.registry)
            .map_err(|err| err.into_error(reference))
    }

    /// Body of a definition without its first and last lines, every line
    /// flush left.
    pub fn method_source(&self, reference: &MethodReference) -> Result<String> {
        let site = self.locate(reference)?;
        let lines: Vec<&str> = site.body.lines().collect();
        let inner = match lines.len() {
            0..=2 => &[][..],
            n => &lines[1..n - 1],
        };
        Ok(inner.iter().map(|l| l.trim_start()).collect::<Vec<_>>().join("\n"))
    }

    pub fn raw_comment(&self, reference: &MethodReference) -> Result<String> {
        Ok(self.locate(reference)?.comment)
    }

    /// Render another member's doc block in that member's own context.
    pub fn mark_doc(&self, reference: &MethodReference) -> Result<String> {
        if self.depth >= MAX_NESTING {
            return Err(Error::eval(format!(
                "doc blocks nested deeper than {} levels at {}",
                MAX_NESTING, reference
            )));
        }
        let owner = self.owner(reference)?;
        let site = self.locate(reference)?;
        let block = self.ws.extractor.extract(&site);
        if block.is_empty() {
            return Ok(String::new());
        }
        let origin = Origin {
            file: site.file.clone(),
            line: block.line,
            member: reference.name().to_string(),
            reference: reference.raw().to_string(),
        };
        let mut nested = MacroContext {
            ws: self.ws,
            subject: owner,
            current: Some(reference.clone().at(Some(site.file), Some(site.line))),
            depth: self.depth + 1,
        };
        self.ws.engine.render(&block.text, &origin, &mut nested)
    }

    /// Live result of a member, through the sandboxed invoker.
    pub fn eval_method(&self, reference: &MethodReference) -> Result<Value> {
        let owner = self.owner(reference)?;
        Sandbox::new(self.ws.invoker, self.ws.registry, self.ws.locator).evaluate(reference, owner)
    }

    /// Whether `name` is an instance member of the subject or its lineage.
    pub fn is_member(&self, name: &str) -> bool {
        self.ws.registry.has_instance_member(&self.subject.name, name)
    }

    /// Absolute URL of a member's heading on its owner's page.
    pub fn member_url(&self, subject: &str, name: &str) -> String {
        format!("{}#{}", self.ws.links.page_url(subject), inflect::anchor(name))
    }

    /// Constant visible from this subject: lineage first, then qualified
    /// through the registry.
    pub fn constant_value(&self, path: &str) -> Option<Value> {
        let registry = self.ws.registry;
        match path.rsplit_once("::") {
            None => registry
                .find_constant(&self.subject.name, path)
                .map(|(_, c)| c.value.clone()),
            Some((owner, name)) => {
                let owner = registry.resolve(owner, &self.subject.name).ok()?;
                registry.find_constant(&owner.name, name).map(|(_, c)| c.value.clone())
            }
        }
    }
}

impl Env for MacroContext<'_> {
    fn call(&mut self, name: &str, args: Option<Args>) -> Result<Value> {
        let macros = self.ws.macros;
        if let Some(f) = macros.get(name) {
            return f(self, &args.unwrap_or_default());
        }
        let registry = self.ws.registry;
        if registry
            .find_member(&self.subject.name, name, ReferenceKind::Class)
            .is_some()
        {
            debug!(subject = %self.subject.name, member = name, "evaluating class member from template");
            let reference = MethodReference::member(&self.subject.name, name, ReferenceKind::Class, Visibility::Public);
            return self.eval_method(&reference);
        }
        Err(Error::eval(format!(
            "undefined local variable or method `{}' for {}",
            name, self.subject.name
        )))
    }

    fn constant(&mut self, path: &str) -> Result<Value> {
        if let Some(value) = self.constant_value(path) {
            return Ok(value);
        }
        match self.ws.registry.resolve(path, &self.subject.name) {
            Ok(subject) => Ok(Value::str(subject.name.clone())),
            Err(_) => Err(Error::eval(format!("uninitialized constant {}", path))),
        }
    }

    fn call_on_constant(&mut self, path: &str, method: &str, args: Args) -> Result<Value> {
        let subject = self
            .ws
            .registry
            .resolve(path, &self.subject.name)
            .map_err(|_| Error::eval(format!("uninitialized constant {}", path)))?;
        if matches!(method, "name" | "to_s") && args.is_empty() {
            return Ok(Value::str(subject.name.clone()));
        }
        let reference = MethodReference::member(&subject.name, method, ReferenceKind::Class, Visibility::Public);
        self.eval_method(&reference)
    }
}
