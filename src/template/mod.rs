//! ERB-style templates embedded in doc comments.
//!
//! A template is plain text with `<%= expr %>` interpolation, `<% stmt %>`
//! statements and `<%# %>` comments. Expressions are parsed by [`expr`] and
//! evaluated by [`eval`] against an [`eval::Env`], normally a
//! [`context::MacroContext`].

pub mod context;
pub mod eval;
pub mod expr;
pub mod macros;
pub mod prose;
pub mod tables;
pub mod value;

use crate::error::{Error, Result};
use eval::{Env, Locals};

pub use context::{MacroContext, Workspace};
pub use macros::{MacroModule, MacroSet};
pub use value::Value;

/// Placeholder replaced by the quoted reference of the documented member.
pub const METHOD_PLACEHOLDER: &str = "__method__";

#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Text(String),
    /// `<%= code %>`; `line` is the zero-based template line of the tag.
    Output { code: String, line: usize },
    /// `<% code %>`
    Exec { code: String, line: usize },
}

/// Where a template came from, used to build error traces.
#[derive(Debug, Clone)]
pub struct Origin {
    pub file: String,
    /// Source line of the template's first line.
    pub line: usize,
    /// Member name shown in `in `name'`.
    pub member: String,
    /// Reference string substituted for [`METHOD_PLACEHOLDER`].
    pub reference: String,
}

impl Origin {
    fn frame(&self, offset: usize) -> String {
        format!("{}:{}:in `{}'", self.file, self.line + offset, self.member)
    }
}

/// Split a template into text and code segments.
pub fn scan(template: &str) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut rest = template;
    let mut line = 0;

    while let Some(open) = rest.find("<%") {
        let (before, after) = rest.split_at(open);
        text.push_str(before);
        line += before.matches('\n').count();
        let after = &after[2..];

        if let Some(literal) = after.strip_prefix('%') {
            text.push_str("<%");
            rest = literal;
            continue;
        }

        let (trim_left, after) = match after.strip_prefix('-') {
            Some(stripped) => (true, stripped),
            None => (false, after),
        };
        if trim_left {
            let kept = text.trim_end_matches([' ', '\t']).len();
            text.truncate(kept);
        }

        let close = find_close(after).ok_or_else(|| {
            Error::eval(format!("unterminated `<%` tag on template line {}", line + 1))
        })?;
        let raw = &after[..close];
        let mut rest_after = &after[close + 2..];

        let (code, trim_right) = match raw.strip_suffix('-') {
            Some(code) => (code, true),
            None => (raw, false),
        };

        if !text.is_empty() {
            segments.push(Segment::Text(std::mem::take(&mut text)));
        }
        if let Some(code) = code.strip_prefix('=') {
            segments.push(Segment::Output {
                code: code.trim().to_string(),
                line,
            });
        } else if !code.starts_with('#') {
            segments.push(Segment::Exec {
                code: code.trim().to_string(),
                line,
            });
        }
        line += raw.matches('\n').count();

        if trim_right {
            if let Some(stripped) = rest_after.strip_prefix('\n') {
                rest_after = stripped;
                line += 1;
            }
        }
        rest = rest_after;
    }

    text.push_str(rest);
    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }
    Ok(segments)
}

/// Offset of the closing `%>`, ignoring any inside string literals.
fn find_close(code: &str) -> Option<usize> {
    let bytes = code.as_bytes();
    let mut quote: Option<u8> = None;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(_) if b == b'\\' => {
                i += 2;
                continue;
            }
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None if b == b'%' && bytes.get(i + 1) == Some(&b'>') => return Some(i),
            None => {}
        }
        i += 1;
    }
    None
}

/// Expands templates against an environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct TemplateEngine;

impl TemplateEngine {
    pub fn new() -> Self {
        Self
    }

    /// Render `template`, attaching `origin`'s location to any failure.
    pub fn render<E: Env + ?Sized>(&self, template: &str, origin: &Origin, env: &mut E) -> Result<String> {
        let quoted = format!("'{}'", origin.reference);
        let template = template.replace(METHOD_PLACEHOLDER, &quoted);
        let segments = scan(&template).map_err(|err| err.with_frame(origin.frame(0)))?;

        let mut out = String::with_capacity(template.len());
        let mut locals = Locals::new();
        for segment in &segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Output { code, line } => {
                    let value = expr::parse_expr(code)
                        .and_then(|parsed| eval::eval(&parsed, env, &mut locals))
                        .map_err(|err| err.with_frame(origin.frame(*line)))?;
                    out.push_str(&value.to_display());
                }
                Segment::Exec { code, line } => {
                    expr::parse_program(code)
                        .and_then(|stmts| eval::eval_program(&stmts, env, &mut locals))
                        .map_err(|err| err.with_frame(origin.frame(*line)))?;
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::eval::Args;

    struct Echo;

    impl Env for Echo {
        fn call(&mut self, name: &str, args: Option<Args>) -> Result<Value> {
            match name {
                "shout" => {
                    let args = args.unwrap_or_default();
                    Ok(Value::str(args.str(0, "shout")?.to_uppercase()))
                }
                other => Err(Error::eval(format!(
                    "undefined local variable or method `{}'",
                    other
                ))),
            }
        }

        fn constant(&mut self, path: &str) -> Result<Value> {
            Err(Error::eval(format!("uninitialized constant {}", path)))
        }

        fn call_on_constant(&mut self, path: &str, _: &str, _: Args) -> Result<Value> {
            Err(Error::eval(format!("uninitialized constant {}", path)))
        }
    }

    fn origin() -> Origin {
        Origin {
            file: "lib/test.rb".to_string(),
            line: 10,
            member: "method2".to_string(),
            reference: "Test#method2".to_string(),
        }
    }

    fn render(template: &str) -> Result<String> {
        TemplateEngine::new().render(template, &origin(), &mut Echo)
    }

    #[test]
    fn interpolates_and_keeps_text() {
        assert_eq!(render("a <%= shout 'b' %> c\n").unwrap(), "a B c\n");
    }

    #[test]
    fn trim_right_swallows_newline() {
        assert_eq!(render("<%= 1 -%>\nnext\n").unwrap(), "1next\n");
    }

    #[test]
    fn trim_left_swallows_indentation() {
        assert_eq!(render("x\n    <%- x = 1 %>y").unwrap(), "x\ny");
    }

    #[test]
    fn comments_and_literal_tags() {
        assert_eq!(render("<%# ignored %>a<%% b").unwrap(), "a<% b");
    }

    #[test]
    fn statements_bind_locals() {
        assert_eq!(render("<% n = 2 %><%= n * 3 %>").unwrap(), "6");
    }

    #[test]
    fn placeholder_is_quoted_reference() {
        assert_eq!(render("<%= __method__ %>\n").unwrap(), "Test#method2\n");
    }

    #[test]
    fn close_marker_inside_string_is_not_a_close() {
        assert_eq!(render("<%= shout '%>' %>").unwrap(), "%>");
    }

    #[test]
    fn errors_carry_comment_location() {
        let err = render("first\nsecond <%= nope %>\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "undefined local variable or method `nope'\n    from lib/test.rb:11:in `method2'"
        );
    }

    #[test]
    fn unterminated_tag_is_an_error() {
        assert!(render("<%= 1").is_err());
    }
}
