//! Second link pass: absolute links back to the current page become
//! same-page anchors.

use regex::{Captures, Regex};
use std::sync::LazyLock;

static RE_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\[[\w?\-!0-9 ]*\])\((.*?)\)").unwrap());

#[derive(Debug, Clone)]
pub struct RelativeLinkCollapser {
    page_url: String,
}

impl RelativeLinkCollapser {
    /// `page_url` is the own page's URL as produced by
    /// [`RepositoryLinks::page_url`](super::RepositoryLinks::page_url).
    pub fn new(page_url: impl Into<String>) -> Self {
        Self {
            page_url: page_url.into(),
        }
    }

    pub fn collapse(&self, text: &str) -> String {
        RE_LINK
            .replace_all(text, |caps: &Captures| {
                let target = &caps[2];
                match target.split_once('#') {
                    Some((path, fragment)) if path == self.page_url => {
                        format!("{}(#{})", &caps[1], fragment)
                    }
                    _ => caps[0].to_string(),
                }
            })
            .into_owned()
    }
}
