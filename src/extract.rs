//! DSL comment blocks.
//!
//! A doc comment only contributes documentation between a start token and
//! an end token:
//!
//! ```text
//! #=mark_doc
//! # Returns <%= eval_method "#total" %>
//! #=mark_end
//! def total
//! ```
//!
//! A start token without an end token takes the rest of the comment and
//! marks the output as incomplete. No start token means no documentation.

use crate::error::{Error, Result};
use crate::source::SourceSite;
use regex::Regex;
use std::sync::LazyLock;

pub const START_TOKEN: &str = "=mark_doc";
pub const END_TOKEN: &str = "=mark_end";

/// Appended to blocks that have no end token.
pub const NO_END_MARKER: &str = "[//]: # (This method has no mark_end)";

static RE_COMMENT_HASH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^#[ \t]?").unwrap());

/// Remove the comment marker and one following space from every line.
pub fn strip_comment_hash(text: &str) -> String {
    RE_COMMENT_HASH.replace_all(text, "").into_owned()
}

/// The templated part of a comment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DslBlock {
    pub text: String,
    /// Source line of the block's first line.
    pub line: usize,
}

impl DslBlock {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Extracts [`DslBlock`]s for a configured pair of tokens.
#[derive(Debug, Clone)]
pub struct CommentExtractor {
    bounded: Regex,
    open: Regex,
}

static RE_DEFAULT_BOUNDED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)=mark_doc\n(.*)=mark_end").unwrap());

static RE_DEFAULT_OPEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)=mark_doc\n(.*)").unwrap());

impl Default for CommentExtractor {
    fn default() -> Self {
        Self {
            bounded: RE_DEFAULT_BOUNDED.clone(),
            open: RE_DEFAULT_OPEN.clone(),
        }
    }
}

impl CommentExtractor {
    pub fn new(start: &str, end: &str) -> Result<Self> {
        if start.is_empty() || end.is_empty() {
            return Err(Error::config("doc block tokens must not be empty"));
        }
        let start = regex::escape(start);
        let end = regex::escape(end);
        let compile = |pattern: String| {
            Regex::new(&pattern).map_err(|err| Error::config(format!("invalid doc block token: {}", err)))
        };
        Ok(Self {
            bounded: compile(format!(r"(?s){}\n(.*){}", start, end))?,
            open: compile(format!(r"(?s){}\n(.*)", start))?,
        })
    }

    /// Apply the block rule to an already stripped comment.
    ///
    /// `first_line` is the source line of the comment's first line.
    pub fn block(&self, comment: &str, first_line: usize) -> DslBlock {
        let located = |start: usize, text: String| DslBlock {
            line: first_line + comment[..start].matches('\n').count(),
            text,
        };
        if let Some(m) = self.bounded.captures(comment).and_then(|c| c.get(1)) {
            return located(m.start(), m.as_str().to_string());
        }
        if let Some(m) = self.open.captures(comment).and_then(|c| c.get(1)) {
            return located(m.start(), format!("{}{}", m.as_str(), NO_END_MARKER));
        }
        DslBlock {
            text: String::new(),
            line: first_line,
        }
    }

    /// The block in a located definition's comment.
    pub fn extract(&self, site: &SourceSite) -> DslBlock {
        self.block(&site.comment, site.comment_line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_one_space_after_hash() {
        assert_eq!(strip_comment_hash("# a\n#  b\n#c\n"), "a\n b\nc\n");
    }

    #[test]
    fn bounded_block() {
        let extractor = CommentExtractor::default();
        let block = extractor.block("Intro\n=mark_doc\nThis is 2\n=mark_end\nafter\n", 10);
        assert_eq!(block.text, "This is 2\n");
        assert_eq!(block.line, 12);
    }

    #[test]
    fn start_only_block_is_marked() {
        let extractor = CommentExtractor::default();
        let block = extractor.block("=mark_doc\nhello\n", 1);
        assert_eq!(block.text, format!("hello\n{}", NO_END_MARKER));
    }

    #[test]
    fn complete_block_never_has_marker() {
        let extractor = CommentExtractor::default();
        let block = extractor.block("=mark_doc\nhello\n=mark_end\n", 1);
        assert!(!block.text.contains(NO_END_MARKER));
    }

    #[test]
    fn no_tokens_means_empty() {
        let extractor = CommentExtractor::default();
        assert!(extractor.block("just a comment\n", 1).is_empty());
    }

    #[test]
    fn custom_tokens_are_escaped() {
        let extractor = CommentExtractor::new("@doc(", "@end)").unwrap();
        assert_eq!(extractor.block("@doc(\nx\n@end)\n", 1).text, "x\n");
        assert!(CommentExtractor::new("", "x").is_err());
    }
}
