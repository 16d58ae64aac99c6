//! Page title and summary line from the subject hierarchy.

use crate::error::Result;
use crate::inflect;
use crate::model::Subject;
use crate::template::eval::{Args, Env};
use crate::template::{MacroContext, Value, Workspace};

pub struct Summary<'w> {
    subject: &'w Subject,
    ctx: MacroContext<'w>,
}

impl<'w> Summary<'w> {
    pub fn new(ws: Workspace<'w>, subject: &'w Subject) -> Self {
        Self {
            subject,
            ctx: MacroContext::new(ws, subject, None),
        }
    }

    /// Titleized leaf name followed by ` < `-joined ancestor links.
    pub fn title(&mut self) -> Result<String> {
        let registry = self.ctx.workspace().registry;
        let mut parts = vec![inflect::titleize(self.subject.leaf_name())];
        for ancestor in registry.ancestors(&self.subject.name) {
            parts.push(self.link(ancestor)?);
        }
        Ok(parts.join(" < "))
    }

    /// `Descendants: ` and the descendant links, if there are any.
    pub fn summary(&mut self) -> Result<Option<String>> {
        let registry = self.ctx.workspace().registry;
        let descendants = registry.descendants(&self.subject.name);
        if descendants.is_empty() {
            return Ok(None);
        }
        let links = descendants
            .into_iter()
            .map(|d| self.link(d))
            .collect::<Result<Vec<_>>>()?;
        Ok(Some(format!("Descendants: {}", links.join(", "))))
    }

    /// Goes through `link_to_markdown` so projects can redefine it.
    fn link(&mut self, subject: &Subject) -> Result<String> {
        let mut args = Args::new(vec![Value::str(subject.name.clone())]);
        args.keywords
            .insert("title".to_string(), Value::str(inflect::titleize(subject.leaf_name())));
        Ok(self.ctx.call("link_to_markdown", Some(args))?.to_display())
    }
}
