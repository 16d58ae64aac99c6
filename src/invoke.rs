//! Member evaluation outside the host runtime.
//!
//! `eval_method` needs the live result of a member. Instead of running the
//! host program, an [`Invoker`] evaluates either a declared result from the
//! manifest or the member body itself with the template expression
//! evaluator. Collaborators the body needs are supplied by a [`Sandbox`]:
//! configured stubs first, then other members of the same subject invoked
//! on demand.

use crate::error::{Error, Result};
use crate::model::Subject;
use crate::reference::{MethodReference, ReferenceKind, Visibility};
use crate::registry::SubjectRegistry;
use crate::source::SourceLocator;
use crate::template::eval::{self, Args, Env, Locals};
use crate::template::expr;
use crate::template::Value;
use indexmap::IndexMap;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

/// Upper bound on collaborators stubbed for one evaluation.
pub const MAX_STUBS: usize = 32;
/// Upper bound on nested member evaluations.
pub const MAX_DEPTH: usize = 8;

/// Endless definition; the parameter list, if any, directly follows the name.
static RE_ENDLESS_BODY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^def\s+(?:self\.)?[\w?!]+(?:\([^)]*\))?\s*=\s*(.*)$").unwrap());

/// One member evaluation request.
pub struct Invocation<'a> {
    pub reference: &'a MethodReference,
    pub subject: &'a Subject,
    pub registry: &'a SubjectRegistry,
    pub locator: &'a dyn SourceLocator,
    pub bindings: &'a IndexMap<String, Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    /// The body referenced a collaborator with no binding.
    #[error("unbound collaborator `{0}`")]
    Unbound(String),
    /// The body uses something the evaluator cannot express.
    #[error("{0}")]
    Unsupported(String),
    #[error(transparent)]
    Failed(#[from] Error),
}

/// Evaluates a single member with a fixed set of bindings.
pub trait Invoker: Send + Sync {
    fn invoke(&self, call: &Invocation<'_>) -> std::result::Result<Value, InvokeError>;
}

/// Default invoker: declared results, then body evaluation.
#[derive(Debug, Default, Clone, Copy)]
pub struct SourceInvoker;

impl Invoker for SourceInvoker {
    fn invoke(&self, call: &Invocation<'_>) -> std::result::Result<Value, InvokeError> {
        let name = call.reference.name();
        let kind = call.reference.kind();

        let declared = call
            .registry
            .find_member(&call.subject.name, name, kind)
            .and_then(|(_, member)| member.returns.clone());
        if let Some(value) = declared {
            return Ok(value);
        }

        let site = call
            .locator
            .locate(call.reference, call.subject, call.registry)
            .map_err(|err| InvokeError::Unsupported(err.to_string()))?;
        let body = executable_body(&site.body);
        let program = expr::parse_program(&body).map_err(|err| InvokeError::Unsupported(err.to_string()))?;

        let mut env = BodyEnv {
            call,
            failure: None,
        };
        let mut locals = Locals::new();
        match eval::eval_program(&program, &mut env, &mut locals) {
            Ok(value) => Ok(value),
            Err(err) => Err(env.failure.take().unwrap_or(InvokeError::Failed(err))),
        }
    }
}

/// Statements of a definition without its `def` and `end` lines.
fn executable_body(source: &str) -> String {
    let lines: Vec<&str> = source.lines().map(str::trim).collect();
    match lines.as_slice() {
        [] => String::new(),
        [single] => one_line_body(single),
        [_, inner @ .., _] => inner.join("\n"),
    }
}

/// `def a; 2; end` → `2`, `def a = 2` → `2`
fn one_line_body(line: &str) -> String {
    if let Some(rest) = line.strip_suffix("end").map(str::trim_end) {
        if let Some(rest) = rest.strip_suffix(';') {
            if let Some((_, body)) = rest.split_once(';') {
                return body.trim().to_string();
            }
        }
    }
    RE_ENDLESS_BODY
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map_or_else(String::new, |body| body.as_str().trim().to_string())
}

struct BodyEnv<'c, 'a> {
    call: &'c Invocation<'a>,
    failure: Option<InvokeError>,
}

impl BodyEnv<'_, '_> {
    fn fail(&mut self, failure: InvokeError) -> Error {
        let err = Error::eval(failure.to_string());
        self.failure = Some(failure);
        err
    }
}

impl Env for BodyEnv<'_, '_> {
    fn call(&mut self, name: &str, args: Option<Args>) -> Result<Value> {
        if let Some(value) = self.call.bindings.get(name) {
            return Ok(value.clone());
        }
        match args {
            Some(args) if !args.is_empty() => Err(self.fail(InvokeError::Unsupported(format!(
                "cannot call `{}` with arguments",
                name
            )))),
            _ => Err(self.fail(InvokeError::Unbound(name.to_string()))),
        }
    }

    fn constant(&mut self, path: &str) -> Result<Value> {
        let subject = &self.call.subject.name;
        let found = match path.rsplit_once("::") {
            None => self.call.registry.find_constant(subject, path),
            Some((owner, name)) => self
                .call
                .registry
                .resolve(owner, subject)
                .ok()
                .and_then(|owner| self.call.registry.find_constant(&owner.name, name)),
        };
        match found {
            Some((_, constant)) => Ok(constant.value.clone()),
            None => Err(self.fail(InvokeError::Unsupported(format!(
                "uninitialized constant {}",
                path
            )))),
        }
    }

    fn call_on_constant(&mut self, path: &str, method: &str, _args: Args) -> Result<Value> {
        Err(self.fail(InvokeError::Unsupported(format!(
            "cannot call `{}.{}` outside the host runtime",
            path, method
        ))))
    }
}

/// Drives an [`Invoker`], stubbing unbound collaborators until the member
/// evaluates or a bound is hit.
pub struct Sandbox<'a> {
    invoker: &'a dyn Invoker,
    registry: &'a SubjectRegistry,
    locator: &'a dyn SourceLocator,
}

impl<'a> Sandbox<'a> {
    pub fn new(invoker: &'a dyn Invoker, registry: &'a SubjectRegistry, locator: &'a dyn SourceLocator) -> Self {
        Self {
            invoker,
            registry,
            locator,
        }
    }

    pub fn evaluate(&self, reference: &MethodReference, subject: &Subject) -> Result<Value> {
        self.evaluate_at(reference, subject, 0)
    }

    fn evaluate_at(&self, reference: &MethodReference, subject: &Subject, depth: usize) -> Result<Value> {
        if depth > MAX_DEPTH {
            return Err(invoke_error(reference, format!("nesting deeper than {} evaluations", MAX_DEPTH)));
        }

        let mut bindings = subject.stubs.clone();
        if reference.kind() == ReferenceKind::Instance {
            bindings.extend(subject.bootstrap.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        let mut stubbed = 0;
        loop {
            let call = Invocation {
                reference,
                subject,
                registry: self.registry,
                locator: self.locator,
                bindings: &bindings,
            };
            match self.invoker.invoke(&call) {
                Ok(value) => return Ok(value),
                Err(InvokeError::Failed(err)) => return Err(err),
                Err(InvokeError::Unsupported(reason)) => return Err(invoke_error(reference, reason)),
                Err(InvokeError::Unbound(name)) => {
                    if stubbed >= MAX_STUBS {
                        return Err(invoke_error(
                            reference,
                            format!("gave up after stubbing {} collaborators", MAX_STUBS),
                        ));
                    }
                    debug!(%reference, collaborator = %name, "stubbing collaborator");
                    let value = self.stub(reference, subject, &name, depth)?;
                    bindings.insert(name, value);
                    stubbed += 1;
                }
            }
        }
    }

    /// Value for an unbound collaborator: the subject's instance member of
    /// that name, else its class member.
    fn stub(&self, reference: &MethodReference, subject: &Subject, name: &str, depth: usize) -> Result<Value> {
        for kind in [ReferenceKind::Instance, ReferenceKind::Class] {
            if self.registry.find_member(&subject.name, name, kind).is_some() {
                let collaborator = MethodReference::member(&subject.name, name, kind, Visibility::Public);
                return self.evaluate_at(&collaborator, subject, depth + 1);
            }
        }
        Err(invoke_error(
            reference,
            format!("`{}` is neither bound nor a member of {}", name, subject.name),
        ))
    }
}

fn invoke_error(reference: &MethodReference, reason: String) -> Error {
    Error::Invoke {
        reference: reference.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Constant, Member};
    use crate::source::{LocateError, SourceSite};

    /// Serves method bodies from a table instead of files.
    struct Bodies(Vec<(&'static str, &'static str)>);

    impl SourceLocator for Bodies {
        fn locate(
            &self,
            reference: &MethodReference,
            _context: &Subject,
            _registry: &SubjectRegistry,
        ) -> std::result::Result<SourceSite, LocateError> {
            self.0
                .iter()
                .find(|(name, _)| *name == reference.name())
                .map(|(_, body)| SourceSite {
                    file: "lib/test.rb".to_string(),
                    line: 1,
                    comment: String::new(),
                    comment_line: 1,
                    body: body.to_string(),
                })
                .ok_or_else(|| LocateError::NotFound(reference.to_string()))
        }

        fn locate_subject(&self, subject: &Subject) -> std::result::Result<SourceSite, LocateError> {
            Err(LocateError::NotFound(subject.name.clone()))
        }
    }

    fn fixture() -> (SubjectRegistry, Bodies) {
        let mut test = Subject::new("Nesting::Test");
        for name in ["method4", "method5", "method6", "uses_ivar", "calls_out", "loops", "grouped"] {
            test.members.push(Member::new(name, ReferenceKind::Instance));
        }
        let mut declared = Member::new("method1", ReferenceKind::Class);
        declared.returns = Some(Value::str("declared"));
        test.members.push(declared);
        test.constants.insert(
            "SCOPED_CONSTANT_VALUE".to_string(),
            Constant {
                name: "SCOPED_CONSTANT_VALUE".to_string(),
                value: Value::str("1001"),
                line: None,
            },
        );
        test.bootstrap.insert("@amount".to_string(), Value::Int(100));

        let bodies = Bodies(vec![
            ("method4", "def method4\n  \"im 4\"\nend"),
            ("method5", "def method5\n  \"im 5\" + method4 + SCOPED_CONSTANT_VALUE\nend"),
            ("method6", "def method6; method5; end"),
            ("uses_ivar", "def uses_ivar = @amount * 2"),
            ("calls_out", "def calls_out\n  Mutex.new\nend"),
            ("loops", "def loops\n  undefined_thing\nend"),
            ("grouped", "def grouped = (1 + 2) * 3"),
        ]);
        (SubjectRegistry::new(vec![test]).unwrap(), bodies)
    }

    fn eval(text: &str) -> Result<Value> {
        let (registry, bodies) = fixture();
        let reference = MethodReference::parse(text, "Nesting::Test", Default::default()).unwrap();
        let subject = registry.get("Nesting::Test").unwrap();
        Sandbox::new(&SourceInvoker, &registry, &bodies).evaluate(&reference, subject)
    }

    #[test]
    fn declared_results_win() {
        assert_eq!(eval(".method1").unwrap(), Value::str("declared"));
    }

    #[test]
    fn collaborators_are_stubbed_recursively() {
        assert_eq!(eval("#method5").unwrap(), Value::str("im 5im 41001"));
        assert_eq!(eval("#method6").unwrap(), Value::str("im 5im 41001"));
    }

    #[test]
    fn bootstrap_binds_instance_state() {
        assert_eq!(eval("#uses_ivar").unwrap(), Value::Int(200));
    }

    #[test]
    fn endless_bodies_with_parentheses() {
        assert_eq!(eval("#grouped").unwrap(), Value::Int(9));
    }

    #[test]
    fn runtime_only_calls_are_unsupported() {
        let err = eval("#calls_out").unwrap_err();
        assert!(matches!(err, Error::Invoke { .. }));
        assert!(err.to_string().contains("Mutex.new"));
    }

    #[test]
    fn unknown_collaborators_fail() {
        let err = eval("#loops").unwrap_err();
        assert!(err.to_string().contains("`undefined_thing` is neither bound nor a member"));
    }

    #[test]
    fn one_line_bodies() {
        assert_eq!(executable_body("def a; 2; end"), "2");
        assert_eq!(executable_body("def a(x) = x + 1"), "x + 1");
        assert_eq!(executable_body("def a = (1 + 2)"), "(1 + 2)");
        assert_eq!(executable_body(r#"def label = "x(y)""#), r#""x(y)""#);
        assert_eq!(executable_body("def self.rate(a, b) = a * b"), "a * b");
        assert_eq!(executable_body("def a\n  [1,\n   2]\nend"), "[1,\n2]");
    }
}
