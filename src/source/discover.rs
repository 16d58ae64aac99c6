//! Line-oriented outline scanner for Ruby-style sources.
//!
//! This is not a parser. It recognizes subject declarations, method
//! definitions, constants, mixins and the common declarative member macros
//! well enough to register a population and find definition lines. Blocks
//! are matched by indentation: a block opened at column `n` closes at the
//! next `end` that also sits at column `n`.

use crate::model::{Constant, Member, SubjectKind};
use crate::reference::ReferenceKind;
use crate::template::eval::{self, Args, Env, Locals};
use crate::template::expr;
use crate::template::Value;
use crate::error::{Error, Result};
use regex::Regex;
use std::sync::LazyLock;

static RE_SUBJECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(class|module)\s+(:{0,2}[A-Z][\w:]*)(?:\s*<\s*(:{0,2}[A-Z][\w:]*))?").unwrap()
});

static RE_SINGLETON: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^class\s*<<\s*self\b").unwrap());

static RE_DEF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^def\s+(self\.)?([A-Za-z_]\w*[?!=]?)").unwrap());

static RE_ENDLESS_DEF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^def\s+(?:self\.)?[\w?!]+(?:\([^)]*\))?\s*=[^=~>]").unwrap());

static RE_ONE_LINE_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r";\s*end\s*$").unwrap());

static RE_CONSTANT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z][A-Z0-9_]*)\s*=([^=~].*)$").unwrap());

static RE_INCLUDE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^include\s+(.+)$").unwrap());

static RE_SYMBOL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r":([A-Za-z_]\w*[?!]?)").unwrap());

static RE_DECLARATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(attribute|attr_reader|attr_accessor|attr_writer|def_delegators|def_delegator|delegate)\s+(.+)$")
        .unwrap()
});

/// A subject declaration found in a file.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectOutline {
    pub name: String,
    pub kind: SubjectKind,
    pub parent: Option<String>,
    pub includes: Vec<String>,
    /// 1-based declaration line.
    pub line: usize,
    /// 1-based line of the closing `end`.
    pub end_line: usize,
    pub members: Vec<Member>,
    pub constants: Vec<Constant>,
}

/// Every subject declared in a source file, in order of appearance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outline {
    pub subjects: Vec<SubjectOutline>,
}

impl Outline {
    pub fn subject(&self, name: &str) -> Option<&SubjectOutline> {
        self.subjects.iter().find(|s| s.name == name)
    }
}

enum Frame {
    Subject { index: usize, indent: usize },
    Singleton { indent: usize },
}

impl Frame {
    fn indent(&self) -> usize {
        match self {
            Frame::Subject { indent, .. } | Frame::Singleton { indent } => *indent,
        }
    }
}

/// Scan `source` into an [`Outline`].
pub fn outline(source: &str) -> Outline {
    let lines: Vec<&str> = source.lines().collect();
    let mut subjects: Vec<SubjectOutline> = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let raw = lines[i];
        let indent = indentation(raw);
        let line = raw.trim();
        let lineno = i + 1;
        i += 1;

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if is_end(line) {
            if stack.last().is_some_and(|f| f.indent() == indent) {
                if let Some(Frame::Subject { index, .. }) = stack.pop() {
                    subjects[index].end_line = lineno;
                }
            }
            continue;
        }

        let current = stack.iter().rev().find_map(|f| match f {
            Frame::Subject { index, .. } => Some(*index),
            Frame::Singleton { .. } => None,
        });
        let in_singleton = matches!(stack.last(), Some(Frame::Singleton { .. }));

        if RE_SINGLETON.is_match(line) {
            if !RE_ONE_LINE_END.is_match(line) {
                stack.push(Frame::Singleton { indent });
            }
            continue;
        }

        if let Some(caps) = RE_SUBJECT.captures(line) {
            let kind = if &caps[1] == "module" {
                SubjectKind::Module
            } else {
                SubjectKind::Class
            };
            let declared = &caps[2];
            let name = match (declared.strip_prefix("::"), current) {
                (Some(absolute), _) => absolute.to_string(),
                (None, Some(outer)) => format!("{}::{}", subjects[outer].name, declared),
                (None, None) => declared.to_string(),
            };
            subjects.push(SubjectOutline {
                name,
                kind,
                parent: caps.get(3).map(|p| p.as_str().to_string()),
                includes: Vec::new(),
                line: lineno,
                end_line: lineno,
                members: Vec::new(),
                constants: Vec::new(),
            });
            if !RE_ONE_LINE_END.is_match(line) {
                stack.push(Frame::Subject {
                    index: subjects.len() - 1,
                    indent,
                });
            }
            continue;
        }

        let Some(owner) = current else {
            continue;
        };

        if let Some(caps) = RE_DEF.captures(line) {
            let name = &caps[2];
            let kind = if caps.get(1).is_some() || in_singleton {
                ReferenceKind::Class
            } else {
                ReferenceKind::Instance
            };
            if !name.ends_with('=') {
                // An explicit `def` takes the place of a declarative macro.
                let members = &mut subjects[owner].members;
                match members.iter_mut().find(|m| m.name == name && m.kind == kind) {
                    Some(existing) => existing.line = Some(lineno),
                    None => members.push(Member::new(name, kind).at(lineno)),
                }
            }
            if !is_one_liner(line) {
                i = block_end(&lines, lineno - 1) + 1;
            }
            continue;
        }

        if let Some(caps) = RE_CONSTANT.captures(line) {
            let (text, last) = gather_balanced(&lines, lineno - 1, caps[2].trim());
            subjects[owner].constants.push(Constant {
                name: caps[1].to_string(),
                value: literal_value(&text),
                line: Some(lineno),
            });
            i = last + 1;
            continue;
        }

        if let Some(caps) = RE_INCLUDE.captures(line) {
            subjects[owner].includes.extend(
                caps[1]
                    .split(',')
                    .map(str::trim)
                    .filter(|m| m.chars().next().is_some_and(|c| c.is_ascii_uppercase()))
                    .map(str::to_string),
            );
            continue;
        }

        if let Some(caps) = RE_DECLARATIVE.captures(line) {
            for name in declared_names(&caps[1], &caps[2]) {
                let member = Member::new(name, ReferenceKind::Instance).at(lineno);
                if !subjects[owner].members.iter().any(|m| m.name == member.name) {
                    subjects[owner].members.push(member);
                }
            }
        }
    }

    Outline { subjects }
}

/// Names produced by a declarative member macro line.
pub fn declared_names(macro_name: &str, args: &str) -> Vec<String> {
    let symbols: Vec<String> = RE_SYMBOL
        .captures_iter(args.split(" to:").next().unwrap_or(args))
        .map(|c| c[1].to_string())
        .collect();
    match macro_name {
        "attr_writer" => Vec::new(),
        "attribute" => symbols.into_iter().take(1).collect(),
        "def_delegator" => {
            // def_delegator :target, :method[, :alias]
            let names: Vec<String> = delegator_args(args);
            names.get(2).or(names.get(1)).cloned().into_iter().collect()
        }
        "def_delegators" => delegator_args(args).into_iter().skip(1).collect(),
        _ => symbols,
    }
}

fn delegator_args(args: &str) -> Vec<String> {
    args.split(',')
        .map(|a| a.trim().trim_start_matches(':').to_string())
        .collect()
}

/// Zero-based index of the line closing the block opened at `start`.
///
/// One-line definitions close on their own line. A block without a
/// matching `end` runs to the end of the file.
pub fn block_end<S: AsRef<str>>(lines: &[S], start: usize) -> usize {
    let Some(first) = lines.get(start) else {
        return start;
    };
    let first = first.as_ref();
    if is_one_liner(first.trim()) {
        return start;
    }
    let indent = indentation(first);
    lines
        .iter()
        .enumerate()
        .skip(start + 1)
        .find(|(_, l)| {
            let l = l.as_ref();
            indentation(l) == indent && is_end(l.trim())
        })
        .map_or(lines.len().saturating_sub(1), |(i, _)| i)
}

fn is_one_liner(line: &str) -> bool {
    RE_ONE_LINE_END.is_match(line) || RE_ENDLESS_DEF.is_match(line)
}

fn is_end(trimmed: &str) -> bool {
    trimmed
        .strip_prefix("end")
        .is_some_and(|rest| !rest.starts_with(|c: char| c.is_alphanumeric() || c == '_'))
}

fn indentation(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

/// Join continuation lines until brackets balance. Returns the text and
/// the zero-based index of the last line used.
fn gather_balanced<S: AsRef<str>>(lines: &[S], start: usize, first: &str) -> (String, usize) {
    let mut text = first.to_string();
    let mut last = start;
    while depth(&text) > 0 && last + 1 < lines.len() {
        last += 1;
        text.push('\n');
        text.push_str(lines[last].as_ref().trim());
    }
    (text, last)
}

/// Zero-based index of the last line of the statement starting at `start`
/// (continuation lines are followed while brackets are open).
pub fn statement_end<S: AsRef<str>>(lines: &[S], start: usize) -> usize {
    match lines.get(start) {
        Some(first) => gather_balanced(lines, start, first.as_ref().trim()).1,
        None => start,
    }
}

/// Member names declared by a declarative macro line, if it is one.
pub fn declarative_names(line: &str) -> Vec<String> {
    match RE_DECLARATIVE.captures(line.trim()) {
        Some(caps) => declared_names(&caps[1], &caps[2]),
        None => Vec::new(),
    }
}

fn depth(text: &str) -> i32 {
    let mut depth = 0;
    let mut quote: Option<char> = None;
    for c in text.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(' | '[' | '{') => depth += 1,
            (None, ')' | ']' | '}') => depth -= 1,
            _ => {}
        }
    }
    depth
}

/// Evaluate a constant's right-hand side when it is a plain literal.
/// Anything else (calls, references) is kept as source text.
pub fn literal_value(text: &str) -> Value {
    let text = text.trim().trim_end_matches(".freeze").trim();
    expr::parse_expr(text)
        .and_then(|parsed| eval::eval(&parsed, &mut LiteralsOnly, &mut Locals::new()))
        .unwrap_or_else(|_| Value::Opaque(text.to_string()))
}

struct LiteralsOnly;

impl Env for LiteralsOnly {
    fn call(&mut self, name: &str, _: Option<Args>) -> Result<Value> {
        Err(Error::eval(format!("`{}` is not a literal", name)))
    }

    fn constant(&mut self, path: &str) -> Result<Value> {
        Err(Error::eval(format!("`{}` is not a literal", path)))
    }

    fn call_on_constant(&mut self, path: &str, method: &str, _: Args) -> Result<Value> {
        Err(Error::eval(format!("`{}.{}` is not a literal", path, method)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"
module Billing
  # An invoice.
  class Invoice < Document
    include Taxable, Printable
    extend Forwardable

    TAX_RATE = 0.2
    LIMITS = [1,
              2]
    LOCK = Mutex.new

    attribute :owner_id
    attr_accessor :number, :due_on
    def_delegator :customer, :name, :customer_name
    delegate :email, :phone, to: :customer

    # Sum of lines.
    def total
      if lines.empty?
        0
      end
    end

    def paid?; true; end
    def zero = 0

    def self.build(attrs)
      new(attrs)
    end

    class << self
      def parse(text)
      end
    end

    private

    def secret!
    end
  end

  module Taxable; end
end
"#;

    #[test]
    fn subjects_are_qualified_by_nesting() {
        let outline = outline(SOURCE);
        let names: Vec<_> = outline.subjects.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Billing", "Billing::Invoice", "Billing::Taxable"]);

        let invoice = outline.subject("Billing::Invoice").unwrap();
        assert_eq!(invoice.parent.as_deref(), Some("Document"));
        assert_eq!(invoice.includes, ["Taxable", "Printable"]);
        assert_eq!(invoice.line, 4);
        assert_eq!(invoice.end_line, 41);
    }

    #[test]
    fn members_in_declaration_order() {
        let outline = outline(SOURCE);
        let invoice = outline.subject("Billing::Invoice").unwrap();
        let members: Vec<_> = invoice
            .members
            .iter()
            .map(|m| (m.name.as_str(), m.kind))
            .collect();
        use ReferenceKind::*;
        assert_eq!(
            members,
            [
                ("owner_id", Instance),
                ("number", Instance),
                ("due_on", Instance),
                ("customer_name", Instance),
                ("email", Instance),
                ("phone", Instance),
                ("total", Instance),
                ("paid?", Instance),
                ("zero", Instance),
                ("build", Class),
                ("parse", Class),
                ("secret!", Instance),
            ]
        );
        let total = invoice.members.iter().find(|m| m.name == "total").unwrap();
        assert_eq!(total.line, Some(19));
    }

    #[test]
    fn constants_keep_literals_and_source() {
        let outline = outline(SOURCE);
        let invoice = outline.subject("Billing::Invoice").unwrap();
        let values: Vec<_> = invoice
            .constants
            .iter()
            .map(|c| (c.name.as_str(), c.value.clone()))
            .collect();
        assert_eq!(
            values,
            [
                ("TAX_RATE", Value::Float(0.2)),
                ("LIMITS", Value::Array(vec![Value::Int(1), Value::Int(2)])),
                ("LOCK", Value::Opaque("Mutex.new".to_string())),
            ]
        );
    }

    #[test]
    fn block_end_matches_indentation() {
        let lines: Vec<&str> = SOURCE.lines().collect();
        // `def total` is line 19, so index 18; its `end` is line 23.
        assert_eq!(block_end(&lines, 18), 22);
        assert_eq!(block_end(&lines, 24), 24);
    }

    #[test]
    fn end_keyword_detection() {
        assert!(is_end("end"));
        assert!(is_end("end # of class"));
        assert!(!is_end("endpoint = 1"));
    }
}
