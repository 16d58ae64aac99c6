//! Source location: finding a member's definition, its preceding comment
//! and its body text.

pub mod discover;
pub mod file;

use crate::error::Error;
use crate::model::Subject;
use crate::reference::MethodReference;
use crate::registry::SubjectRegistry;

pub use file::FileLocator;

/// A located definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSite {
    /// Path relative to the project root.
    pub file: String,
    /// 1-based line of the definition.
    pub line: usize,
    /// Comment block above the definition with comment markers stripped,
    /// one `\n`-terminated line per comment line.
    pub comment: String,
    /// 1-based line of the first comment line (equals `line` when there is
    /// no comment).
    pub comment_line: usize,
    /// Definition source text, first line to closing line.
    pub body: String,
}

impl SourceSite {
    pub fn has_comment(&self) -> bool {
        !self.comment.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocateError {
    #[error("{0}")]
    NotFound(String),
}

impl LocateError {
    pub fn into_error(self, reference: &MethodReference) -> Error {
        match self {
            LocateError::NotFound(reason) => Error::SourceNotFound {
                reference: reference.to_string(),
                reason,
            },
        }
    }
}

/// Resolves references to their source.
pub trait SourceLocator: Send + Sync {
    /// Locate `reference`, whose owner has already been resolved to
    /// `context`.
    fn locate(
        &self,
        reference: &MethodReference,
        context: &Subject,
        registry: &SubjectRegistry,
    ) -> Result<SourceSite, LocateError>;

    /// Locate a subject's own declaration.
    fn locate_subject(&self, subject: &Subject) -> Result<SourceSite, LocateError>;
}
