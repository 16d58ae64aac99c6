//! [`SourceLocator`] backed by files under a project root.

use super::discover::{self, Outline};
use super::{LocateError, SourceLocator, SourceSite};
use crate::extract::strip_comment_hash;
use crate::model::Subject;
use crate::reference::{MethodReference, ReferenceKind};
use crate::registry::SubjectRegistry;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Reads sources relative to `root`. File contents and outlines are cached
/// per path and shared between workers.
#[derive(Debug)]
pub struct FileLocator {
    root: PathBuf,
    lines: DashMap<String, Arc<Vec<String>>>,
    outlines: DashMap<String, Arc<Outline>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    /// `def`/`class`/`module` through the matching `end`.
    Block,
    /// A single statement, possibly spanning bracketed continuation lines.
    Statement,
}

impl FileLocator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            lines: DashMap::new(),
            outlines: DashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn lines(&self, file: &str) -> Result<Arc<Vec<String>>, LocateError> {
        if let Some(cached) = self.lines.get(file) {
            return Ok(Arc::clone(cached.value()));
        }
        let path = self.root.join(file);
        let text = std::fs::read_to_string(&path)
            .map_err(|err| LocateError::NotFound(format!("cannot read {}: {}", path.display(), err)))?;
        let lines: Arc<Vec<String>> = Arc::new(text.lines().map(str::to_string).collect());
        self.lines.insert(file.to_string(), Arc::clone(&lines));
        Ok(lines)
    }

    fn outline(&self, file: &str) -> Result<Arc<Outline>, LocateError> {
        if let Some(cached) = self.outlines.get(file) {
            return Ok(Arc::clone(cached.value()));
        }
        let lines = self.lines(file)?;
        let outline = Arc::new(discover::outline(&lines.join("\n")));
        self.outlines.insert(file.to_string(), Arc::clone(&outline));
        Ok(outline)
    }

    fn site_at(&self, file: &str, line: usize, shape: Shape) -> Result<SourceSite, LocateError> {
        let lines = self.lines(file)?;
        let index = line
            .checked_sub(1)
            .filter(|i| *i < lines.len())
            .ok_or_else(|| LocateError::NotFound(format!("{} has no line {}", file, line)))?;

        let mut first_comment = index;
        while first_comment > 0 && lines[first_comment - 1].trim_start().starts_with('#') {
            first_comment -= 1;
        }
        let comment: String = lines[first_comment..index]
            .iter()
            .map(|l| format!("{}\n", strip_comment_hash(l.trim_start())))
            .collect();

        let last = match shape {
            Shape::Block => discover::block_end(&lines, index),
            Shape::Statement => discover::statement_end(&lines, index),
        };
        Ok(SourceSite {
            file: file.to_string(),
            line,
            comment,
            comment_line: first_comment + 1,
            body: lines[index..=last].join("\n"),
        })
    }

    /// Definition line of `name` in `subject`: registered first, then the
    /// file outline.
    fn definition_line(&self, subject: &Subject, file: &str, name: &str, kind: ReferenceKind) -> Option<usize> {
        let registered = match kind {
            ReferenceKind::Constant => subject.constants.get(name).and_then(|c| c.line),
            _ => subject.member(name, kind).and_then(|m| m.line),
        };
        registered.or_else(|| {
            let outline = self.outline(file).ok()?;
            let declared = outline.subject(&subject.name)?;
            match kind {
                ReferenceKind::Constant => declared
                    .constants
                    .iter()
                    .find(|c| c.name == name)
                    .and_then(|c| c.line),
                _ => declared
                    .members
                    .iter()
                    .find(|m| m.name == name && m.kind == kind)
                    .and_then(|m| m.line),
            }
        })
    }

    /// Earliest declarative macro line (`attribute :name`, delegators...)
    /// naming `name`.
    fn macro_line(&self, file: &str, name: &str) -> Option<usize> {
        let lines = self.lines(file).ok()?;
        lines
            .iter()
            .position(|l| discover::declarative_names(l).iter().any(|n| n == name))
            .map(|i| i + 1)
    }
}

impl SourceLocator for FileLocator {
    fn locate(
        &self,
        reference: &MethodReference,
        context: &Subject,
        registry: &SubjectRegistry,
    ) -> Result<SourceSite, LocateError> {
        let name = reference.name();
        let kind = reference.kind();
        let shape = match kind {
            ReferenceKind::Constant => Shape::Statement,
            _ => Shape::Block,
        };

        if let Some(line) = reference.line {
            let file = reference
                .file
                .as_deref()
                .or(context.file.as_deref())
                .ok_or_else(|| LocateError::NotFound(format!("{} has no source file", context.name)))?;
            return self.site_at(file, line, shape);
        }

        let lineage = registry.lineage(&context.name);
        let mut definition = None;
        for subject in &lineage {
            let Some(file) = subject.file.as_deref() else {
                continue;
            };
            if let Some(line) = self.definition_line(subject, file, name, kind) {
                definition = Some(self.site_at(file, line, shape)?);
                break;
            }
        }

        if let Some(site) = &definition {
            if site.has_comment() {
                return Ok(site.clone());
            }
        }

        if kind == ReferenceKind::Instance {
            for subject in &lineage {
                let Some(file) = subject.file.as_deref() else {
                    continue;
                };
                if let Some(line) = self.macro_line(file, name) {
                    let site = self.site_at(file, line, Shape::Statement)?;
                    if site.has_comment() {
                        debug!(reference = %reference, file, line, "using declarative macro comment");
                        return Ok(site);
                    }
                }
            }
        }

        definition.ok_or_else(|| {
            LocateError::NotFound(format!(
                "no definition of `{}` found for {}",
                name, context.name
            ))
        })
    }

    fn locate_subject(&self, subject: &Subject) -> Result<SourceSite, LocateError> {
        let file = subject
            .file
            .as_deref()
            .ok_or_else(|| LocateError::NotFound(format!("{} has no source file", subject.name)))?;
        let line = match subject.line {
            Some(line) => line,
            None => self
                .outline(file)?
                .subject(&subject.name)
                .map(|s| s.line)
                .ok_or_else(|| {
                    LocateError::NotFound(format!("{} is not declared in {}", subject.name, file))
                })?,
        };
        self.site_at(file, line, Shape::Block)
    }
}
