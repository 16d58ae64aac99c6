//! Source-to-prose rewrites used by the `ruby_to_markdown` family of macros.
//!
//! Every pass is a plain `&str -> String` function so callers can run any
//! subset in order. Passes that need to know about the documented subject
//! (constants, member names) take closures instead of a context.

use crate::inflect;
use crate::template::value::Value;
use regex::{Captures, Regex};
use std::sync::LazyLock;

static RE_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9][0-9_]+[0-9]+").unwrap());

static RE_EARLY_RETURN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"return (unless|if)").unwrap());

static RE_TRAILING_IF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(.+) (if|unless) (.+)").unwrap());

static RE_TERNARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(.*) \? (.*) : (.*)").unwrap());

static RE_ELSE_IF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*(?:else if|elsif)\b(.*)$").unwrap());

static RE_IF: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^[ \t]*if\b(.*)$").unwrap());

static RE_UNLESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*unless\b(.*)$").unwrap());

static RE_ELSE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^[ \t]*else[ \t]*$").unwrap());

static RE_CASE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^[ \t]*case\b(.*)$").unwrap());

static RE_WHEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^[ \t]*when\b(.*)$").unwrap());

static RE_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^[ \t]*end[ \t]*$\n?").unwrap());

static RE_COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^[ \t]*#(.*)$").unwrap());

static RE_PREDICATE_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\w)\.(\w+\?)").unwrap());

static RE_MEMOIZED_IVAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@[a-z][a-z0-9_]+ \|\|=?\s").unwrap());

static RE_PRETTY_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"["']?[a-zA-Z_?!0-9]*["']?"#).unwrap());

static RE_QUOTED_WORDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"['"][a-zA-Z_0-9!?\s]+['"]"#).unwrap());

static RE_BACKTICK_WORDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`[a-zA-Z_0-9!?\s]+`").unwrap());

/// `1_000` → `1,000`. Digits glued to an identifier or a decimal point are
/// left alone.
pub fn readable_numbers(src: &str) -> String {
    let mut out = String::with_capacity(src.len());
    let mut last = 0;
    for m in RE_NUMBER.find_iter(src) {
        let glued = src[..m.start()]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '.');
        out.push_str(&src[last..m.start()]);
        match m.as_str().replace('_', "").parse::<i128>() {
            Ok(n) if !glued => out.push_str(&inflect::delimit(n)),
            _ => out.push_str(m.as_str()),
        }
        last = m.end();
    }
    out.push_str(&src[last..]);
    out
}

/// `return if x` → `return nothing if x`
pub fn pretty_early_return(src: &str) -> String {
    RE_EARLY_RETURN
        .replace_all(src, "return nothing $1")
        .into_owned()
}

/// `a if b` → `if b` / `a` / `end` (and the `unless` analog).
pub fn convert_early_return_to_if_else(src: &str) -> String {
    RE_TRAILING_IF
        .replace_all(src, |caps: &Captures| {
            let head = &caps[1];
            if head.trim().is_empty() || head.trim_end().ends_with("else") {
                return caps[0].to_string();
            }
            format!("{} {}\n{}\nend", &caps[2], &caps[3], head.trim_start())
        })
        .into_owned()
}

/// `a ? b : c` → `if a` / `b` / `else` / `c` / `end`
pub fn ternary_to_if_else(src: &str) -> String {
    RE_TERNARY
        .replace_all(src, "if $1\n$2\nelse\n$3\nend")
        .into_owned()
}

pub fn if_statements_to_bullets(src: &str) -> String {
    let src = RE_ELSE_IF.replace_all(src, "* __Else If__$1\n__Then__");
    let src = RE_IF.replace_all(&src, "* __If__$1\n__Then__");
    let src = RE_UNLESS.replace_all(&src, "* __Unless__$1\n__Then__");
    RE_ELSE.replace_all(&src, "* __Else__").into_owned()
}

pub fn case_statements_to_bullets(src: &str) -> String {
    let src = RE_CASE.replace_all(src, "* __Given__$1");
    let src = RE_WHEN.replace_all(&src, "* __When__$1\n__Then__");
    RE_ELSE.replace_all(&src, "* __Else__").into_owned()
}

pub fn remove_end_keyword(src: &str) -> String {
    RE_END.replace_all(src, "").into_owned()
}

/// `# note` → `</br>*( note)*</br>`
pub fn comments_to_prose(src: &str) -> String {
    RE_COMMENT
        .replace_all(src, "</br>*($1)*</br>")
        .into_owned()
}

pub fn operators_to_words(src: &str) -> String {
    let mut text = src.replace("nil?", "missing?");
    for (op, words) in [
        ("&&", "and"),
        ("||", "or"),
        (">=", "is greater than or equal to"),
        ("<=", "is less than or equal to"),
        (" < ", " is less than "),
        (" > ", " is greater than "),
        (" == ", " Equal to "),
        (" != ", " not equal to "),
    ] {
        text = text.replace(op, words);
    }
    RE_PREDICATE_CALL.replace_all(&text, "$1 is $2").into_owned()
}

/// Replace upper-case constant names with `[value](#anchor)` links. Names
/// `lookup` does not know are left unchanged.
pub fn constants_as_links(src: &str, lookup: impl Fn(&str) -> Option<Value>) -> String {
    rewrite_words(src, |word| {
        if !is_constant_name(word.text) {
            return None;
        }
        let value = lookup(word.text)?;
        Some(format!(
            "[{}](#{})",
            value.present(),
            inflect::anchor(word.text)
        ))
    })
}

/// Replace identifiers naming members of the subject with `link(name)`.
///
/// Keyword labels (`name:`), symbols, instance variables and method calls
/// on a receiver are skipped.
pub fn methods_as_links(
    src: &str,
    is_member: impl Fn(&str) -> bool,
    link: impl Fn(&str) -> String,
) -> String {
    rewrite_words(src, |word| {
        let first = word.text.chars().next()?;
        if !(first.is_ascii_lowercase() || first == '_') {
            return None;
        }
        if matches!(word.prev, Some('.') | Some(':') | Some('@') | Some('$'))
            || word.next == Some(':')
        {
            return None;
        }
        is_member(word.text).then(|| link(word.text))
    })
}

/// Loose English rendering of a code fragment.
pub fn pretty_code(src: &str, humanize: bool) -> String {
    let text = ternary_to_if_else(src);
    let text = pretty_early_return(&text);
    let mut text = RE_MEMOIZED_IVAR.replace_all(&text, "").into_owned();
    for (op, words) in [
        (":", ""),
        ("&&", "and"),
        (">=", "is greater than or equal to"),
        ("<=", "is less than or equal to"),
        (" < ", " is less than "),
        (" > ", " is greater than "),
        (" == ", " Equal to "),
        ("nil?", "is missing?"),
        ("elsif", "else if"),
        ("||", "or"),
    ] {
        text = text.replace(op, words);
    }
    let text = RE_NUMBER
        .replace_all(&text, |caps: &Captures| caps[0].replace('_', ","))
        .into_owned();
    if !humanize {
        return text;
    }
    RE_PRETTY_WORD
        .replace_all(&text, |caps: &Captures| {
            let word = &caps[0];
            if word.is_empty() {
                String::new()
            } else if word.contains('_') && !is_quoted(word) {
                format!("'{}'", inflect::humanize(word, true))
            } else {
                inflect::humanize(word, false)
            }
        })
        .into_owned()
}

/// `'some name'` → `` ^`some_name` `` for quoted strings in `include`
/// (or all of them when `include` is `None`).
pub fn quoted_strings_as_local_links(text: &str, include: Option<&[String]>) -> String {
    RE_QUOTED_WORDS
        .replace_all(text, |caps: &Captures| {
            let quoted = &caps[0];
            if !included(include, quoted) {
                return quoted.to_string();
            }
            let name = inflect::underscore(&remove_quotes(quoted)).replace(' ', "_");
            format!("^`{}`", name)
        })
        .into_owned()
}

/// Back-ticked phrases in pretty code (`` `i return one` ``) become member
/// links when they name a member.
pub fn link_local_methods_from_pretty_code(
    code: &str,
    include: Option<&[String]>,
    is_member: impl Fn(&str) -> bool,
    link: impl Fn(&str) -> String,
) -> String {
    RE_BACKTICK_WORDS
        .replace_all(code, |caps: &Captures| {
            let phrase = &caps[0];
            if !included(include, phrase) {
                return phrase.to_string();
            }
            let name = inflect::underscore(phrase)
                .replace(' ', "_")
                .replace('`', "");
            methods_as_links(&name, &is_member, &link)
        })
        .into_owned()
}

fn included(include: Option<&[String]>, text: &str) -> bool {
    match include {
        None => true,
        Some(names) => {
            let bare = remove_quotes(text).replace('`', "");
            names.iter().any(|n| *n == bare)
        }
    }
}

fn remove_quotes(text: &str) -> String {
    text.chars().filter(|c| !matches!(c, '\'' | '"' | '|')).collect()
}

fn is_quoted(word: &str) -> bool {
    word.len() >= 2
        && matches!(word.chars().next(), Some('\'') | Some('"'))
        && matches!(word.chars().next_back(), Some('\'') | Some('"'))
}

fn is_constant_name(word: &str) -> bool {
    let mut chars = word.chars();
    chars.next().is_some_and(|c| c.is_ascii_uppercase())
        && word.len() >= 2
        && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

struct Word<'a> {
    text: &'a str,
    prev: Option<char>,
    next: Option<char>,
}

/// Walk `src` word by word, copying string literals, back-ticked spans and
/// markdown link targets through untouched.
fn rewrite_words(src: &str, mut f: impl FnMut(&Word<'_>) -> Option<String>) -> String {
    let chars: Vec<(usize, char)> = src.char_indices().collect();
    let mut out = String::with_capacity(src.len());
    let mut i = 0;
    let byte_at = |i: usize| chars.get(i).map_or(src.len(), |&(b, _)| b);

    while i < chars.len() {
        let c = chars[i].1;
        let prev = i.checked_sub(1).map(|p| chars[p].1);

        let skip_to = match c {
            '\'' | '"' | '`' => closing(&chars, i, c),
            '(' if prev == Some(']') => closing(&chars, i, ')'),
            _ => None,
        };
        if let Some(end) = skip_to {
            out.push_str(&src[byte_at(i)..byte_at(end + 1)]);
            i = end + 1;
            continue;
        }

        let starts_word = (c.is_alphabetic() || c == '_')
            && !prev.is_some_and(|p| p.is_alphanumeric() || p == '_');
        if !starts_word {
            out.push(c);
            i += 1;
            continue;
        }

        let start = i;
        while i < chars.len() && (chars[i].1.is_alphanumeric() || chars[i].1 == '_') {
            i += 1;
        }
        if i < chars.len() && matches!(chars[i].1, '?' | '!') {
            i += 1;
        }
        let word = Word {
            text: &src[byte_at(start)..byte_at(i)],
            prev,
            next: chars.get(i).map(|&(_, c)| c),
        };
        match f(&word) {
            Some(replacement) => out.push_str(&replacement),
            None => out.push_str(word.text),
        }
    }
    out
}

/// Index of the matching close character on the same line, if any.
fn closing(chars: &[(usize, char)], open: usize, close: char) -> Option<usize> {
    let mut i = open + 1;
    while i < chars.len() {
        match chars[i].1 {
            '\\' => i += 1,
            '\n' => return None,
            c if c == close => return Some(i),
            _ => {}
        }
        i += 1;
    }
    None
}
