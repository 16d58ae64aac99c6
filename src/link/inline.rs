//! First link pass: inline markers (`` ^`name` ``) become markdown links.

use crate::inflect;
use regex::{Captures, Regex};
use std::sync::LazyLock;

static RE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\^`([\w:.#?!]*[^`\n])`").unwrap());

static RE_OWNER_METHOD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^((?:\w+::)*[A-Z]\w*)#([\w?!]+)$").unwrap());

static RE_QUALIFIED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\w*(?:::\w+)+$").unwrap());

/// Resolves inline markers for one page.
#[derive(Debug, Clone)]
pub struct InlineLinker<'a> {
    /// Page key of the page being linked.
    page_key: &'a str,
    /// Prefix for links to other pages.
    root_path: &'a str,
}

impl<'a> InlineLinker<'a> {
    pub fn new(page_key: &'a str, root_path: &'a str) -> Self {
        Self { page_key, root_path }
    }

    /// Replace every marker. Text without markers is returned unchanged,
    /// so linking twice equals linking once.
    pub fn link(&self, text: &str) -> String {
        RE_MARKER
            .replace_all(text, |caps: &Captures| self.resolve(&caps[1]))
            .into_owned()
    }

    fn resolve(&self, token: &str) -> String {
        if let Some(caps) = RE_OWNER_METHOD.captures(token) {
            let (owner, method) = (&caps[1], &caps[2]);
            let title = inflect::titleize(method);
            let key = inflect::page_key(owner);
            if key == self.page_key {
                return format!("[{}](#{})", title, inflect::anchor(method));
            }
            return format!(
                "[{}]({}{}#{})",
                title,
                self.root_path,
                key,
                inflect::anchor(method)
            );
        }
        if RE_QUALIFIED.is_match(token) {
            return format!(
                "[{}]({}{})",
                inflect::titleize(&token.replace("::", " ")),
                self.root_path,
                inflect::page_key(token)
            );
        }
        format!("[{}](#{})", inflect::titleize(token), inflect::anchor(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(text: &str) -> String {
        InlineLinker::new("billing-invoice", "./").link(text)
    }

    #[test]
    fn local_names_link_to_anchors() {
        assert_eq!(
            link("see ^`this_thing_works?` now"),
            "see [This Thing Works?](#this-thing-works) now"
        );
    }

    #[test]
    fn owner_methods_link_to_their_page() {
        assert_eq!(
            link("^`Billing::Customer#full_name`"),
            "[Full Name](./billing-customer#full-name)"
        );
        assert_eq!(link("^`Billing::Invoice#total`"), "[Total](#total)");
    }

    #[test]
    fn qualified_names_link_to_pages() {
        assert_eq!(
            link("^`Billing::Customer`"),
            "[Billing Customer](./billing-customer)"
        );
    }

    #[test]
    fn linking_is_idempotent() {
        let once = link("a ^`b_c` and ^`Billing::Customer#d`");
        assert_eq!(link(&once), once);
    }

    #[test]
    fn plain_backticks_are_untouched() {
        assert_eq!(link("`code` and ^`` empty"), "`code` and ^`` empty");
    }
}
