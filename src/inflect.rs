//! Name inflections and GitHub-flavored heading anchors.
//!
//! Headings are rendered from titleized member names and anchors are built
//! from the raw names, so [`anchor`] must agree with GitHub's heading slug of
//! every titleized name.

use regex::Regex;
use std::sync::LazyLock;

static RE_ACRONYM_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Z\d]+)([A-Z][a-z])").unwrap());

static RE_CAMEL_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z\d])([A-Z])").unwrap());

/// `"ReportParser::TransUnion"` → `"report_parser/trans_union"`
pub fn underscore(word: &str) -> String {
    let word = word.replace("::", "/");
    let word = RE_ACRONYM_BOUNDARY.replace_all(&word, "${1}_${2}");
    let word = RE_CAMEL_BOUNDARY.replace_all(&word, "${1}_${2}");
    word.replace('-', "_").to_lowercase()
}

/// `"user_name"` → `"User name"` (or `"user name"` without capitalization).
///
/// Leading underscores and a trailing `_id` are dropped.
pub fn humanize(word: &str, capitalize: bool) -> String {
    let word = word.trim_start_matches('_');
    let word = word.strip_suffix("_id").unwrap_or(word);
    spaced(word, capitalize)
}

fn spaced(word: &str, capitalize: bool) -> String {
    let lowered = word.replace('_', " ").to_lowercase();
    if capitalize {
        upcase_first(&lowered)
    } else {
        lowered
    }
}

/// `"the_sum_of_a_and_b"` → `"The Sum Of A And B"`
///
/// Unlike [`humanize`] an `_id` suffix is kept, so headings stay in step
/// with [`anchor`].
pub fn titleize(word: &str) -> String {
    let humanized = spaced(underscore(word).trim_start_matches('_'), true);
    let chars: Vec<char> = humanized.chars().collect();
    let mut out = String::with_capacity(humanized.len());
    for (i, &c) in chars.iter().enumerate() {
        let prev = i.checked_sub(1).map(|p| chars[p]);
        let at_boundary = prev.map_or(true, |p| !is_word_char(p));
        let after_quote = prev.is_some_and(|p| matches!(p, '\'' | '’' | '`' | '(' | ')'))
            && i >= 2
            && is_word_char(chars[i - 2]);
        if c.is_ascii_lowercase() && at_boundary && !after_quote {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// `"i_return_one"` → `"i-return-one"`
pub fn dasherize(word: &str) -> String {
    word.replace('_', "-")
}

/// Same-page anchor for a member name.
///
/// Lower-cases, dash-joins and drops spaces plus trailing `?`/`!` so the
/// result equals the id GitHub assigns to the member's titleized heading.
pub fn anchor(name: &str) -> String {
    dasherize(&name.to_lowercase())
        .chars()
        .filter(|c| !matches!(c, ' ' | '?' | '!'))
        .collect()
}

/// Page key for a subject: `"Billing::Invoice"` → `"billing-invoice"`.
pub fn page_key(subject: &str) -> String {
    underscore(subject).replace('/', "-")
}

/// Output path of a subject's page relative to the output directory.
pub fn page_path(subject: &str) -> String {
    format!("{}.md", underscore(subject))
}

/// Digit grouping: `10000` → `"10,000"`.
pub fn delimit(value: i128) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if value < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

fn upcase_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
