//! Error types for the documentation pipeline.
//!
//! Only [`Error::SourceNotFound`] is recoverable: the pipeline absorbs it at
//! the extraction boundary and drops the affected entry. Every other variant
//! aborts the run.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for markdoc operations
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Main error type for markdoc
#[derive(Debug, Error)]
pub enum Error {
    /// A reference string matches none of the reference grammars.
    #[error("method_reference is formatted incorrectly: '{0}'")]
    MalformedReference(String),

    /// The defining source of a member could not be located.
    #[error("source not found for {reference}: {reason}")]
    SourceNotFound { reference: String, reason: String },

    /// Failure while expanding a doc-comment template. `trace` lists the
    /// doc-comment locations (`file:line:in `member'`), innermost last.
    #[error("{source}{}", render_trace(.trace))]
    Template {
        trace: Vec<String>,
        source: Box<Error>,
    },

    /// The page assembler was handed entries it has no section for.
    #[error("Unhandled methods types: {0}")]
    UnrecognizedEntryKind(String),

    /// A subject name that the registry cannot resolve.
    #[error("unknown subject `{name}` (referenced from `{context}`)")]
    UnknownSubject { name: String, context: String },

    /// Template expression error (syntax, unknown macro, bad arguments).
    #[error("{0}")]
    Eval(String),

    /// A member could not be evaluated outside the host runtime.
    #[error("cannot evaluate {reference}: {reason}")]
    Invoke { reference: String, reason: String },

    /// Manifest or setup error
    #[error("configuration error: {0}")]
    Config(String),

    /// A source or manifest file could not be read
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid manifest: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl Error {
    /// Create an evaluation error
    pub fn eval(message: impl Into<String>) -> Self {
        Error::Eval(message.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }

    /// Whether the pipeline may drop the entry instead of aborting.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::SourceNotFound { .. })
    }

    /// Attach a doc-comment location to this error.
    ///
    /// Nested template failures (a macro rendering another member's block)
    /// keep a single flat trace with the outermost location first.
    pub fn with_frame(self, frame: String) -> Self {
        match self {
            Error::Template { mut trace, source } => {
                trace.insert(0, frame);
                Error::Template { trace, source }
            }
            other => Error::Template {
                trace: vec![frame],
                source: Box::new(other),
            },
        }
    }
}

fn render_trace(trace: &[String]) -> String {
    trace
        .iter()
        .rev()
        .map(|frame| format!("\n    from {}", frame))
        .collect()
}
