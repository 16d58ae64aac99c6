//! Subjects, their members and the pages rendered from them.

use crate::reference::{MethodReference, ReferenceKind};
use crate::template::Value;
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectKind {
    #[default]
    Class,
    Module,
}

impl SubjectKind {
    pub fn keyword(self) -> &'static str {
        match self {
            SubjectKind::Class => "class",
            SubjectKind::Module => "module",
        }
    }
}

/// A documented method.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub name: String,
    pub kind: ReferenceKind,
    /// 1-based line of the definition (or declarative macro).
    pub line: Option<usize>,
    /// Declared result, used instead of evaluating the body.
    pub returns: Option<Value>,
}

impl Member {
    pub fn new(name: impl Into<String>, kind: ReferenceKind) -> Self {
        Self {
            name: name.into(),
            kind,
            line: None,
            returns: None,
        }
    }

    pub fn at(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    pub name: String,
    pub value: Value,
    pub line: Option<usize>,
}

/// A class-like unit being documented.
#[derive(Debug, Clone, Default)]
pub struct Subject {
    /// Fully qualified name, `::`-separated.
    pub name: String,
    pub kind: SubjectKind,
    /// Defining file relative to the project root.
    pub file: Option<String>,
    /// Line of the `class`/`module` declaration.
    pub line: Option<usize>,
    pub parent: Option<String>,
    pub includes: Vec<String>,
    /// Members in declaration order.
    pub members: Vec<Member>,
    pub constants: IndexMap<String, Constant>,
    /// Bindings used to bootstrap an instance for invocation.
    pub bootstrap: IndexMap<String, Value>,
    /// Collaborator stubs for invocation.
    pub stubs: IndexMap<String, Value>,
}

impl Subject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn member(&self, name: &str, kind: ReferenceKind) -> Option<&Member> {
        self.members.iter().find(|m| m.name == name && m.kind == kind)
    }

    /// Add or replace a member, keeping declaration order for new names.
    pub fn upsert_member(&mut self, member: Member) {
        match self
            .members
            .iter_mut()
            .find(|m| m.name == member.name && m.kind == member.kind)
        {
            Some(existing) => {
                if member.line.is_some() {
                    existing.line = member.line;
                }
                if member.returns.is_some() {
                    existing.returns = member.returns;
                }
            }
            None => self.members.push(member),
        }
    }

    /// Last `::` segment of the name.
    pub fn leaf_name(&self) -> &str {
        split_namespace(&self.name).1
    }
}

/// `"A::B::C"` → `("A::B", "C")`; top-level names get an empty namespace.
pub fn split_namespace(name: &str) -> (&str, &str) {
    name.rsplit_once("::").unwrap_or(("", name))
}

/// One documented member after templating.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedEntry {
    pub text: String,
    pub reference: MethodReference,
}

impl RenderedEntry {
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Page-level identity of an entry. `#build` and `.build` are distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryKey {
    pub kind: ReferenceKind,
    pub name: String,
}

impl EntryKey {
    pub fn new(kind: ReferenceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    pub fn of(reference: &MethodReference) -> Self {
        Self::new(reference.kind(), reference.name())
    }
}

/// Rendered entries in enumeration order.
pub type Entries = IndexMap<EntryKey, RenderedEntry>;

/// The finished document for one subject.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub subject: String,
    pub title: String,
    pub summary: Option<String>,
    pub entries: Entries,
    pub text: String,
}

impl Page {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// namespace → leaf name → page
pub type NamespaceTree = BTreeMap<String, BTreeMap<String, Page>>;

/// Fold pages into a [`NamespaceTree`].
pub fn namespace_tree(pages: impl IntoIterator<Item = Page>) -> NamespaceTree {
    let mut tree = NamespaceTree::new();
    for page in pages {
        let (namespace, leaf) = split_namespace(&page.subject);
        let (namespace, leaf) = (namespace.to_string(), leaf.to_string());
        tree.entry(namespace).or_default().insert(leaf, page);
    }
    tree
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(subject: &str) -> Page {
        Page {
            subject: subject.to_string(),
            title: String::new(),
            summary: None,
            entries: Entries::new(),
            text: String::new(),
        }
    }

    #[test]
    fn namespaces_split_on_last_separator() {
        assert_eq!(split_namespace("A::B::C"), ("A::B", "C"));
        assert_eq!(split_namespace("Top"), ("", "Top"));
    }

    #[test]
    fn tree_groups_by_namespace() {
        let tree = namespace_tree(vec![page("Billing::Invoice"), page("Billing::Tax"), page("Report")]);
        assert_eq!(tree.len(), 2);
        let billing = &tree["Billing"];
        assert_eq!(billing.keys().collect::<Vec<_>>(), ["Invoice", "Tax"]);
        assert!(tree[""].contains_key("Report"));
    }

    #[test]
    fn upsert_keeps_order_and_fills_gaps() {
        let mut subject = Subject::new("Test");
        subject.upsert_member(Member::new("a", ReferenceKind::Instance).at(3));
        subject.upsert_member(Member::new("b", ReferenceKind::Instance).at(7));
        let mut a = Member::new("a", ReferenceKind::Instance);
        a.returns = Some(Value::Int(2));
        subject.upsert_member(a);

        assert_eq!(subject.members.len(), 2);
        assert_eq!(subject.members[0].line, Some(3));
        assert_eq!(subject.members[0].returns, Some(Value::Int(2)));
    }
}
