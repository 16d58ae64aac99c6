//! Markdown page layout.

use crate::error::{Error, Result};
use crate::inflect;
use crate::model::{Entries, RenderedEntry};
use crate::reference::ReferenceKind;
use regex::Regex;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static RE_BLANK_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// How entries of one kind are laid out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub kind: ReferenceKind,
    /// Heading marker of each entry (`##`, `###`).
    pub heading: &'static str,
    /// Section title, if the section gets its own heading.
    pub title: Option<&'static str>,
}

impl Section {
    /// Instance members, class members, then the reference values appendix.
    pub fn standard() -> Vec<Section> {
        vec![
            Section {
                kind: ReferenceKind::Instance,
                heading: "##",
                title: None,
            },
            Section {
                kind: ReferenceKind::Class,
                heading: "##",
                title: None,
            },
            Section {
                kind: ReferenceKind::Constant,
                heading: "###",
                title: Some("Reference Values"),
            },
        ]
    }
}

/// Lays out one subject's page.
#[derive(Debug, Clone)]
pub struct PageAssembler<'a> {
    title: &'a str,
    summary: Option<&'a str>,
    class_comment: Option<&'a str>,
    sections: Vec<Section>,
}

impl<'a> PageAssembler<'a> {
    pub fn new(title: &'a str, summary: Option<&'a str>) -> Self {
        Self {
            title,
            summary,
            class_comment: None,
            sections: Section::standard(),
        }
    }

    pub fn class_comment(mut self, comment: Option<&'a str>) -> Self {
        self.class_comment = comment;
        self
    }

    pub fn sections(mut self, sections: Vec<Section>) -> Self {
        self.sections = sections;
        self
    }

    /// Render the page. Returns an empty string when no entry and no subject
    /// comment has content. Entries of a kind without a section are an
    /// error.
    pub fn assemble(&self, entries: &Entries) -> Result<String> {
        let mut groups: BTreeMap<ReferenceKind, Vec<(&str, &RenderedEntry)>> = BTreeMap::new();
        for (key, entry) in entries {
            if !entry.is_blank() {
                groups.entry(key.kind).or_default().push((key.name.as_str(), entry));
            }
        }

        let mut bodies = Vec::with_capacity(self.sections.len());
        for section in &self.sections {
            let mut group = groups.remove(&section.kind).unwrap_or_default();
            group.sort_by(|a, b| entry_order(a, b));
            let body = group
                .iter()
                .map(|(name, entry)| format!("{} {}\n{}", section.heading, inflect::titleize(name), entry.text))
                .collect::<Vec<_>>()
                .join("\n\n");
            bodies.push(match (section.title, body.is_empty()) {
                (_, true) => String::new(),
                (Some(title), false) => format!("\n## {}\n{}\n", title, body),
                (None, false) => body,
            });
        }

        if !groups.is_empty() {
            let kinds: Vec<&str> = groups.keys().map(|k| k.as_str()).collect();
            return Err(Error::UnrecognizedEntryKind(kinds.join(", ")));
        }

        let class_comment = self.class_comment.filter(|c| !c.trim().is_empty());
        if class_comment.is_none() && bodies.iter().all(String::is_empty) {
            return Ok(String::new());
        }

        let summary = RE_BLANK_RUN
            .replace_all(&format!("{}\n", self.summary.unwrap_or_default()), "\n\n")
            .into_owned();
        let mut parts = vec![format!("# {}", self.title), summary];
        parts.push(class_comment.map(|c| format!("{}\n", c)).unwrap_or_default());
        parts.extend(bodies);
        parts.retain(|p| !p.is_empty());

        let page = RE_BLANK_RUN.replace_all(&parts.join("\n"), "\n\n").into_owned();
        Ok(format!("{}\n\n", page.trim_end_matches('\n')))
    }
}

/// Located entries by `(file, line)`, then unlocated entries by name.
fn entry_order(a: &(&str, &RenderedEntry), b: &(&str, &RenderedEntry)) -> Ordering {
    let location = |entry: &RenderedEntry| {
        let reference = &entry.reference;
        reference.line.map(|line| (reference.file.clone().unwrap_or_default(), line))
    };
    match (location(a.1), location(b.1)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.0.cmp(b.0)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.0.cmp(b.0),
    }
}
