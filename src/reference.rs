//! Member references: `Owner#name`, `Owner.name` and `Owner::NAME`.

use crate::error::{Error, Result};
use crate::registry::SubjectRegistry;
use crate::model::Subject;
use regex::Regex;
use serde::Deserialize;
use std::fmt;
use std::sync::LazyLock;

static RE_INSTANCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[:A-Za-z_0-9!?#]+$").unwrap());

static RE_CLASS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[:A-Za-z_0-9!?.]+$").unwrap());

/// Which member a reference names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    Instance,
    Class,
    Constant,
}

impl ReferenceKind {
    /// Separator between owner and name in the reference grammar.
    pub fn type_symbol(self) -> &'static str {
        match self {
            ReferenceKind::Instance => "#",
            ReferenceKind::Class => ".",
            ReferenceKind::Constant => "",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReferenceKind::Instance => "instance",
            ReferenceKind::Class => "class",
            ReferenceKind::Constant => "constant",
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a member came from relative to the subject being documented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Visibility {
    /// Named explicitly (method filter, macro argument).
    #[default]
    Public,
    /// Declared on the subject itself.
    Native,
    /// Inherited from an ancestor or mixin.
    Super,
}

/// Extra knobs for [`MethodReference::parse`].
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Accept a bare name as a constant reference.
    pub allow_constant: bool,
    pub visibility: Visibility,
    pub file: Option<String>,
    pub line: Option<usize>,
}

impl ParseOptions {
    pub fn constant() -> Self {
        Self {
            allow_constant: true,
            ..Self::default()
        }
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }
}

/// A reference to a member of some subject.
///
/// The owning subject is resolved lazily through the registry so that
/// references can be built before every subject is known.
#[derive(Debug, Clone)]
pub struct MethodReference {
    kind: ReferenceKind,
    raw: String,
    /// Subject the reference was written in.
    origin: String,
    pub visibility: Visibility,
    pub file: Option<String>,
    pub line: Option<usize>,
}

impl MethodReference {
    /// Parse `text` written in the context of subject `origin`.
    pub fn parse(text: &str, origin: &str, opts: ParseOptions) -> Result<Self> {
        let raw = text.trim();
        let kind = if raw.contains('#') && RE_INSTANCE.is_match(raw) {
            ReferenceKind::Instance
        } else if raw.contains('.') && RE_CLASS.is_match(raw) {
            ReferenceKind::Class
        } else if opts.allow_constant && !raw.is_empty() {
            ReferenceKind::Constant
        } else {
            return Err(Error::MalformedReference(raw.to_string()));
        };

        let reference = Self {
            kind,
            raw: raw.to_string(),
            origin: origin.to_string(),
            visibility: opts.visibility,
            file: opts.file,
            line: opts.line,
        };
        if reference.name().is_empty() {
            return Err(Error::MalformedReference(raw.to_string()));
        }
        Ok(reference)
    }

    /// Reference to `name` on `subject` with the given kind.
    pub fn member(subject: &str, name: &str, kind: ReferenceKind, visibility: Visibility) -> Self {
        let separator = match kind {
            ReferenceKind::Constant => "::",
            other => other.type_symbol(),
        };
        Self {
            kind,
            raw: format!("{}{}{}", subject, separator, name),
            origin: subject.to_string(),
            visibility,
            file: None,
            line: None,
        }
    }

    pub fn kind(&self) -> ReferenceKind {
        self.kind
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn type_symbol(&self) -> &'static str {
        self.kind.type_symbol()
    }

    /// Member name: the last segment after the type symbol.
    pub fn name(&self) -> &str {
        match self.kind {
            ReferenceKind::Constant => self.raw.rsplit("::").next().unwrap_or(&self.raw),
            kind => self.raw.rsplit(kind.type_symbol()).next().unwrap_or(&self.raw),
        }
    }

    /// Owner as written, or `None` when the reference starts with its
    /// symbol (`#name`, `.name`) or is an unqualified constant.
    pub fn context_name(&self) -> Option<&str> {
        let owner = match self.kind {
            ReferenceKind::Constant => self.raw.rsplit_once("::").map(|(owner, _)| owner),
            kind => self.raw.rsplit_once(kind.type_symbol()).map(|(owner, _)| owner),
        };
        owner.filter(|o| !o.is_empty())
    }

    /// Resolve the owning subject: the origin for unqualified references,
    /// otherwise a registry lookup with nested-name fallback.
    pub fn context<'r>(&self, registry: &'r SubjectRegistry) -> Result<&'r Subject> {
        match self.context_name() {
            Some(owner) => registry.resolve(owner, &self.origin),
            None => registry.resolve(&self.origin, ""),
        }
    }

    /// Same reference anchored to a specific source line.
    pub fn at(mut self, file: Option<String>, line: Option<usize>) -> Self {
        self.file = file;
        self.line = line;
        self
    }
}

impl PartialEq for MethodReference {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.raw == other.raw
    }
}

impl Eq for MethodReference {}

impl fmt::Display for MethodReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<MethodReference> {
        MethodReference::parse(text, "Billing::Invoice", ParseOptions::default())
    }

    #[test]
    fn instance_references() {
        let r = parse("Billing::Invoice#total").unwrap();
        assert_eq!(r.kind(), ReferenceKind::Instance);
        assert_eq!(r.name(), "total");
        assert_eq!(r.context_name(), Some("Billing::Invoice"));
        assert_eq!(r.type_symbol(), "#");

        let local = parse("#paid?").unwrap();
        assert_eq!(local.name(), "paid?");
        assert_eq!(local.context_name(), None);
    }

    #[test]
    fn class_references() {
        let r = parse("Test2.method7").unwrap();
        assert_eq!(r.kind(), ReferenceKind::Class);
        assert_eq!(r.name(), "method7");
        assert_eq!(parse(".build").unwrap().context_name(), None);
    }

    #[test]
    fn constants_require_opt_in() {
        let err = parse("Owner::Name").unwrap_err();
        assert!(matches!(err, Error::MalformedReference(ref s) if s == "Owner::Name"));

        let r = MethodReference::parse("Owner::Name", "Owner", ParseOptions::constant()).unwrap();
        assert_eq!(r.kind(), ReferenceKind::Constant);
        assert_eq!(r.name(), "Name");
        assert_eq!(r.type_symbol(), "");
        assert_eq!(r.context_name(), Some("Owner"));
    }

    #[test]
    fn empty_member_names_are_malformed() {
        assert!(parse("Owner#").is_err());
        assert!(parse("").is_err());
        assert!(parse("Owner#has space").is_err());
    }

    #[test]
    fn render_round_trips() {
        for text in ["A::B#c?", "#d!", "A.e", ".f", "A::B::C#g"] {
            assert_eq!(parse(text).unwrap().to_string(), text);
        }
    }

    #[test]
    fn equality_ignores_location() {
        let a = parse("#total").unwrap().at(Some("a.rb".into()), Some(3));
        let b = parse("#total").unwrap();
        assert_eq!(a, b);
        assert_ne!(parse("#total").unwrap(), parse(".total").unwrap());
    }

    #[test]
    fn member_builder() {
        let r = MethodReference::member("Test", "LIMIT", ReferenceKind::Constant, Visibility::Native);
        assert_eq!(r.raw(), "Test::LIMIT");
        assert_eq!(r.name(), "LIMIT");
        let r = MethodReference::member("Test", "total", ReferenceKind::Instance, Visibility::Super);
        assert_eq!(r.raw(), "Test#total");
    }
}
