//! Expression grammar shared by template tags and member-body evaluation.
//!
//! A small Ruby-flavored subset: literals, arrays, hashes, constants,
//! calls with or without parentheses, keyword and splat arguments, postfix
//! value methods, indexing and the usual binary operators.

use crate::error::{Error, Result};
use crate::template::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Lit(Value),
    Array(Vec<Expr>),
    Hash(Vec<(Expr, Expr)>),
    /// Identifier with no arguments; may name a local, a macro or a member.
    Var(String),
    Call { name: String, args: Vec<Arg> },
    Const(String),
    ConstCall {
        path: String,
        method: String,
        args: Vec<Arg>,
    },
    Send {
        recv: Box<Expr>,
        method: String,
        args: Vec<Arg>,
    },
    Index { recv: Box<Expr>, index: Box<Expr> },
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Neg(Box<Expr>),
    Not(Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Positional(Expr),
    Splat(Expr),
    Keyword(String, Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Assign(String, Expr),
    Expr(Expr),
}

/// Parse a single expression (the body of a `<%= %>` tag).
pub fn parse_expr(src: &str) -> Result<Expr> {
    let mut parser = Parser::new(src)?;
    parser.skip_separators();
    let expr = parser.expr()?;
    parser.skip_separators();
    parser.expect_end()?;
    Ok(expr)
}

/// Parse a statement sequence separated by newlines or `;`.
pub fn parse_program(src: &str) -> Result<Vec<Stmt>> {
    let mut parser = Parser::new(src)?;
    let mut stmts = Vec::new();
    loop {
        parser.skip_separators();
        if parser.at_end() {
            break;
        }
        stmts.push(parser.stmt()?);
        if !parser.at_end() && !parser.eat(&Tok::Sep) {
            return Err(parser.error("expected end of statement"));
        }
    }
    Ok(stmts)
}

// -- Lexer --------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Str(String),
    Int(i64),
    Float(f64),
    Ident(String),
    Const(String),
    Symbol(String),
    Label(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Dot,
    ColonColon,
    Plus,
    Minus,
    Star,
    Bang,
    Arrow,
    Assign,
    EqEq,
    NotEq,
    Lt,
    Gt,
    Le,
    Ge,
    AndAnd,
    OrOr,
    Sep,
}

#[derive(Debug, Clone)]
struct Token {
    tok: Tok,
    space_before: bool,
    offset: usize,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_lowercase() || c == '_' || c == '@'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn lex(src: &str) -> Result<Vec<Token>> {
    let chars: Vec<(usize, char)> = src.char_indices().collect();
    let mut tokens: Vec<Token> = Vec::new();
    let mut depth: usize = 0;
    let mut i = 0;
    let mut space_before = false;

    let peek = |at: usize| chars.get(at).map(|&(_, c)| c);

    while i < chars.len() {
        let (offset, c) = chars[i];

        if c == ' ' || c == '\t' || c == '\r' {
            space_before = true;
            i += 1;
            continue;
        }
        if c == '#' {
            while i < chars.len() && chars[i].1 != '\n' {
                i += 1;
            }
            continue;
        }
        if c == '\n' || c == ';' {
            let continues = tokens.last().is_some_and(|t| {
                matches!(
                    t.tok,
                    Tok::Comma
                        | Tok::Plus
                        | Tok::Minus
                        | Tok::Star
                        | Tok::Arrow
                        | Tok::Assign
                        | Tok::AndAnd
                        | Tok::OrOr
                        | Tok::Dot
                        | Tok::Sep
                )
            });
            if depth == 0 && !continues && !tokens.is_empty() {
                tokens.push(Token {
                    tok: Tok::Sep,
                    space_before,
                    offset,
                });
            }
            space_before = true;
            i += 1;
            continue;
        }

        let start = i;
        let tok = match c {
            '\'' | '"' => {
                let (text, next) = lex_string(&chars, i)?;
                i = next;
                Tok::Str(text)
            }
            '0'..='9' => {
                let mut text = String::new();
                while let Some(d) = peek(i).filter(|d| d.is_ascii_digit() || *d == '_') {
                    if d != '_' {
                        text.push(d);
                    }
                    i += 1;
                }
                let fractional = peek(i) == Some('.') && peek(i + 1).is_some_and(|d| d.is_ascii_digit());
                if fractional {
                    text.push('.');
                    i += 1;
                    while let Some(d) = peek(i).filter(|d| d.is_ascii_digit() || *d == '_') {
                        if d != '_' {
                            text.push(d);
                        }
                        i += 1;
                    }
                    Tok::Float(text.parse().map_err(|_| lex_error(offset, "bad float"))?)
                } else {
                    Tok::Int(text.parse().map_err(|_| lex_error(offset, "integer too large"))?)
                }
            }
            c if is_ident_start(c) => {
                let mut name = String::new();
                name.push(c);
                i += 1;
                while let Some(d) = peek(i).filter(|d| is_ident_char(*d)) {
                    name.push(d);
                    i += 1;
                }
                if matches!(peek(i), Some('?') | Some('!')) && peek(i + 1) != Some('=') {
                    name.push(chars[i].1);
                    i += 1;
                }
                if peek(i) == Some(':') && peek(i + 1) != Some(':') {
                    i += 1;
                    Tok::Label(name)
                } else {
                    Tok::Ident(name)
                }
            }
            c if c.is_ascii_uppercase() => {
                let mut name = String::new();
                while let Some(d) = peek(i).filter(|d| is_ident_char(*d)) {
                    name.push(d);
                    i += 1;
                }
                Tok::Const(name)
            }
            ':' if peek(i + 1) == Some(':') => {
                i += 2;
                Tok::ColonColon
            }
            ':' if peek(i + 1).is_some_and(|d| is_ident_start(d) || d.is_ascii_uppercase()) => {
                i += 1;
                let mut name = String::new();
                while let Some(d) = peek(i).filter(|d| is_ident_char(*d)) {
                    name.push(d);
                    i += 1;
                }
                if matches!(peek(i), Some('?') | Some('!')) {
                    name.push(chars[i].1);
                    i += 1;
                }
                Tok::Symbol(name)
            }
            ':' if matches!(peek(i + 1), Some('"') | Some('\'')) => {
                let (text, next) = lex_string(&chars, i + 1)?;
                i = next;
                Tok::Symbol(text)
            }
            _ => {
                let two: String = chars[i..chars.len().min(i + 2)].iter().map(|&(_, c)| c).collect();
                let (tok, width) = match two.as_str() {
                    "=>" => (Tok::Arrow, 2),
                    "==" => (Tok::EqEq, 2),
                    "!=" => (Tok::NotEq, 2),
                    "<=" => (Tok::Le, 2),
                    ">=" => (Tok::Ge, 2),
                    "&&" => (Tok::AndAnd, 2),
                    "||" => (Tok::OrOr, 2),
                    _ => {
                        let single = match c {
                            '(' => Tok::LParen,
                            ')' => Tok::RParen,
                            '[' => Tok::LBracket,
                            ']' => Tok::RBracket,
                            '{' => Tok::LBrace,
                            '}' => Tok::RBrace,
                            ',' => Tok::Comma,
                            '.' => Tok::Dot,
                            '+' => Tok::Plus,
                            '-' => Tok::Minus,
                            '*' => Tok::Star,
                            '!' => Tok::Bang,
                            '=' => Tok::Assign,
                            '<' => Tok::Lt,
                            '>' => Tok::Gt,
                            other => {
                                return Err(lex_error(
                                    offset,
                                    &format!("unexpected character `{}`", other),
                                ))
                            }
                        };
                        (single, 1)
                    }
                };
                i += width;
                tok
            }
        };

        match tok {
            Tok::LParen | Tok::LBracket | Tok::LBrace => depth += 1,
            Tok::RParen | Tok::RBracket | Tok::RBrace => depth = depth.saturating_sub(1),
            _ => {}
        }
        debug_assert!(i > start);
        tokens.push(Token {
            tok,
            space_before,
            offset,
        });
        space_before = false;
    }

    while tokens.last().is_some_and(|t| t.tok == Tok::Sep) {
        tokens.pop();
    }
    Ok(tokens)
}

fn lex_string(chars: &[(usize, char)], start: usize) -> Result<(String, usize)> {
    let quote = chars[start].1;
    let mut text = String::new();
    let mut i = start + 1;
    while i < chars.len() {
        let c = chars[i].1;
        if c == quote {
            return Ok((text, i + 1));
        }
        if c == '\\' && i + 1 < chars.len() {
            let next = chars[i + 1].1;
            let escaped = match (quote, next) {
                ('"', 'n') => Some('\n'),
                ('"', 't') => Some('\t'),
                (_, '\\') => Some('\\'),
                (q, n) if n == q => Some(n),
                _ => None,
            };
            if let Some(e) = escaped {
                text.push(e);
                i += 2;
                continue;
            }
        }
        text.push(c);
        i += 1;
    }
    Err(lex_error(chars[start].0, "unterminated string"))
}

fn lex_error(offset: usize, message: &str) -> Error {
    Error::eval(format!("syntax error at offset {}: {}", offset, message))
}

// -- Parser -------------------------------------------------------------------

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(src: &str) -> Result<Self> {
        Ok(Self {
            tokens: lex(src)?,
            pos: 0,
        })
    }

    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos).map(|t| &t.tok)
    }

    fn peek_at(&self, ahead: usize) -> Option<&Token> {
        self.tokens.get(self.pos + ahead)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn advance(&mut self) -> Option<Tok> {
        let tok = self.tokens.get(self.pos).map(|t| t.tok.clone());
        self.pos += 1;
        tok
    }

    fn eat(&mut self, tok: &Tok) -> bool {
        if self.peek() == Some(tok) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, tok: &Tok, what: &str) -> Result<()> {
        if self.eat(tok) {
            Ok(())
        } else {
            Err(self.error(&format!("expected {}", what)))
        }
    }

    fn expect_end(&self) -> Result<()> {
        if self.at_end() {
            Ok(())
        } else {
            Err(self.error("unexpected trailing input"))
        }
    }

    fn skip_separators(&mut self) {
        while self.eat(&Tok::Sep) {}
    }

    fn error(&self, message: &str) -> Error {
        match self.tokens.get(self.pos) {
            Some(t) => Error::eval(format!(
                "syntax error at offset {}: {} (found {:?})",
                t.offset, message, t.tok
            )),
            None => Error::eval(format!("syntax error: {} (found end of input)", message)),
        }
    }

    fn stmt(&mut self) -> Result<Stmt> {
        if let (Some(Tok::Ident(name)), Some(Token { tok: Tok::Assign, .. })) =
            (self.peek().cloned(), self.peek_at(1))
        {
            self.pos += 2;
            return Ok(Stmt::Assign(name, self.expr()?));
        }
        Ok(Stmt::Expr(self.expr()?))
    }

    fn expr(&mut self) -> Result<Expr> {
        self.or()
    }

    fn or(&mut self) -> Result<Expr> {
        let mut lhs = self.and()?;
        while self.eat(&Tok::OrOr) {
            let rhs = self.and()?;
            lhs = binary(BinOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn and(&mut self) -> Result<Expr> {
        let mut lhs = self.equality()?;
        while self.eat(&Tok::AndAnd) {
            let rhs = self.equality()?;
            lhs = binary(BinOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn equality(&mut self) -> Result<Expr> {
        let mut lhs = self.comparison()?;
        loop {
            let op = match self.peek() {
                Some(Tok::EqEq) => BinOp::Eq,
                Some(Tok::NotEq) => BinOp::Ne,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.comparison()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn comparison(&mut self) -> Result<Expr> {
        let mut lhs = self.additive()?;
        loop {
            let op = match self.peek() {
                Some(Tok::Lt) => BinOp::Lt,
                Some(Tok::Gt) => BinOp::Gt,
                Some(Tok::Le) => BinOp::Le,
                Some(Tok::Ge) => BinOp::Ge,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.additive()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn additive(&mut self) -> Result<Expr> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Tok::Plus) => BinOp::Add,
                Some(Tok::Minus) => BinOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.multiplicative()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn multiplicative(&mut self) -> Result<Expr> {
        let mut lhs = self.unary()?;
        while self.eat(&Tok::Star) {
            let rhs = self.unary()?;
            lhs = binary(BinOp::Mul, lhs, rhs);
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.eat(&Tok::Minus) {
            return Ok(Expr::Neg(Box::new(self.unary()?)));
        }
        if self.eat(&Tok::Bang) {
            return Ok(Expr::Not(Box::new(self.unary()?)));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr> {
        let mut expr = self.primary()?;
        loop {
            match self.peek() {
                Some(Tok::Dot) => {
                    self.pos += 1;
                    let method = match self.advance() {
                        Some(Tok::Ident(name)) | Some(Tok::Const(name)) => name,
                        _ => {
                            self.pos -= 1;
                            return Err(self.error("expected method name after `.`"));
                        }
                    };
                    let args = if self.paren_follows() {
                        self.paren_args()?
                    } else {
                        Vec::new()
                    };
                    expr = match expr {
                        Expr::Const(path) => Expr::ConstCall { path, method, args },
                        recv => Expr::Send {
                            recv: Box::new(recv),
                            method,
                            args,
                        },
                    };
                }
                Some(Tok::LBracket) if !self.tokens[self.pos].space_before => {
                    self.pos += 1;
                    let index = self.expr()?;
                    self.expect(&Tok::RBracket, "`]`")?;
                    expr = Expr::Index {
                        recv: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    fn primary(&mut self) -> Result<Expr> {
        let tok = match self.advance() {
            Some(tok) => tok,
            None => {
                self.pos -= 1;
                return Err(self.error("expected expression"));
            }
        };
        match tok {
            Tok::Str(s) => Ok(Expr::Lit(Value::Str(s))),
            Tok::Int(i) => Ok(Expr::Lit(Value::Int(i))),
            Tok::Float(f) => Ok(Expr::Lit(Value::Float(f))),
            Tok::Symbol(s) => Ok(Expr::Lit(Value::Symbol(s))),
            Tok::LParen => {
                self.skip_separators();
                let inner = self.expr()?;
                self.skip_separators();
                self.expect(&Tok::RParen, "`)`")?;
                Ok(inner)
            }
            Tok::LBracket => {
                let mut items = Vec::new();
                while !self.eat(&Tok::RBracket) {
                    items.push(self.expr()?);
                    if !self.eat(&Tok::Comma) {
                        self.expect(&Tok::RBracket, "`,` or `]`")?;
                        break;
                    }
                }
                Ok(Expr::Array(items))
            }
            Tok::LBrace => self.hash_literal(),
            Tok::Const(first) => {
                let mut path = first;
                while self.peek() == Some(&Tok::ColonColon) {
                    self.pos += 1;
                    match self.advance() {
                        Some(Tok::Const(next)) => {
                            path.push_str("::");
                            path.push_str(&next);
                        }
                        _ => {
                            self.pos -= 1;
                            return Err(self.error("expected constant after `::`"));
                        }
                    }
                }
                Ok(Expr::Const(path))
            }
            Tok::Ident(name) => match name.as_str() {
                "nil" => Ok(Expr::Lit(Value::Nil)),
                "true" => Ok(Expr::Lit(Value::Bool(true))),
                "false" => Ok(Expr::Lit(Value::Bool(false))),
                "if" | "unless" | "case" | "when" | "while" | "until" | "do" | "end"
                | "return" | "begin" | "rescue" | "yield" | "def" => {
                    self.pos -= 1;
                    Err(self.error(&format!("`{}` is not supported", name)))
                }
                _ => {
                    if self.paren_follows() {
                        let args = self.paren_args()?;
                        Ok(Expr::Call { name, args })
                    } else if self.command_args_follow() {
                        let args = self.command_args()?;
                        Ok(Expr::Call { name, args })
                    } else {
                        Ok(Expr::Var(name))
                    }
                }
            },
            _ => {
                self.pos -= 1;
                Err(self.error("expected expression"))
            }
        }
    }

    fn hash_literal(&mut self) -> Result<Expr> {
        let mut entries = Vec::new();
        while !self.eat(&Tok::RBrace) {
            let entry = if let Some(Tok::Label(key)) = self.peek().cloned() {
                self.pos += 1;
                (Expr::Lit(Value::Str(key)), self.expr()?)
            } else {
                let key = self.expr()?;
                self.expect(&Tok::Arrow, "`=>`")?;
                (key, self.expr()?)
            };
            entries.push(entry);
            if !self.eat(&Tok::Comma) {
                self.expect(&Tok::RBrace, "`,` or `}`")?;
                break;
            }
        }
        Ok(Expr::Hash(entries))
    }

    /// `name(` with no whitespace before the parenthesis.
    fn paren_follows(&self) -> bool {
        matches!(self.peek_at(0), Some(Token { tok: Tok::LParen, space_before: false, .. }))
    }

    /// Ruby command-call heuristic: `name arg` where the argument starts an
    /// expression and is separated from the name by whitespace.
    fn command_args_follow(&self) -> bool {
        let Some(next) = self.peek_at(0) else {
            return false;
        };
        if !next.space_before {
            return false;
        }
        match &next.tok {
            Tok::Str(_)
            | Tok::Int(_)
            | Tok::Float(_)
            | Tok::Ident(_)
            | Tok::Const(_)
            | Tok::Symbol(_)
            | Tok::Label(_)
            | Tok::LBracket
            | Tok::LParen => !matches!(&next.tok, Tok::Ident(w) if is_keyword_operator(w)),
            Tok::Star | Tok::Minus | Tok::Bang => self
                .peek_at(1)
                .is_some_and(|after| !after.space_before),
            _ => false,
        }
    }

    fn paren_args(&mut self) -> Result<Vec<Arg>> {
        self.expect(&Tok::LParen, "`(`")?;
        self.skip_separators();
        let mut args = Vec::new();
        while !self.eat(&Tok::RParen) {
            args.push(self.arg()?);
            self.skip_separators();
            if !self.eat(&Tok::Comma) {
                self.skip_separators();
                self.expect(&Tok::RParen, "`,` or `)`")?;
                break;
            }
            self.skip_separators();
        }
        Ok(args)
    }

    fn command_args(&mut self) -> Result<Vec<Arg>> {
        let mut args = vec![self.arg()?];
        while self.eat(&Tok::Comma) {
            args.push(self.arg()?);
        }
        Ok(args)
    }

    fn arg(&mut self) -> Result<Arg> {
        match self.peek().cloned() {
            Some(Tok::Label(key)) => {
                self.pos += 1;
                Ok(Arg::Keyword(key, self.expr()?))
            }
            Some(Tok::Star) => {
                self.pos += 1;
                Ok(Arg::Splat(self.expr()?))
            }
            _ => Ok(Arg::Positional(self.expr()?)),
        }
    }
}

fn is_keyword_operator(word: &str) -> bool {
    matches!(
        word,
        "if" | "unless" | "and" | "or" | "then" | "do" | "end" | "rescue" | "while" | "until"
    )
}

fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: Vec<Arg>) -> Expr {
        Expr::Call {
            name: name.to_string(),
            args,
        }
    }

    fn string(s: &str) -> Expr {
        Expr::Lit(Value::str(s))
    }

    #[test]
    fn parenthesized_call() {
        assert_eq!(
            parse_expr(r##"print_method_source("#a")"##).unwrap(),
            call("print_method_source", vec![Arg::Positional(string("#a"))])
        );
    }

    #[test]
    fn command_call_without_parens() {
        assert_eq!(
            parse_expr(r##"print_mark_doc_from "#method3""##).unwrap(),
            call("print_mark_doc_from", vec![Arg::Positional(string("#method3"))])
        );
    }

    #[test]
    fn nested_command_calls() {
        let parsed = parse_expr("convert_early_return_to_if_else print_method_source 'A#b'").unwrap();
        assert_eq!(
            parsed,
            call(
                "convert_early_return_to_if_else",
                vec![Arg::Positional(call(
                    "print_method_source",
                    vec![Arg::Positional(string("A#b"))]
                ))]
            )
        );
    }

    #[test]
    fn splat_and_keywords() {
        let parsed = parse_expr(r##"format_link *title_from_link("#x")"##).unwrap();
        assert_eq!(
            parsed,
            call(
                "format_link",
                vec![Arg::Splat(call(
                    "title_from_link",
                    vec![Arg::Positional(string("#x"))]
                ))]
            )
        );

        let parsed = parse_expr(r#"hash_to_markdown_table(h, key_name: "k", value_name: "v")"#).unwrap();
        match parsed {
            Expr::Call { args, .. } => {
                assert_eq!(args.len(), 3);
                assert!(matches!(&args[1], Arg::Keyword(k, _) if k == "key_name"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn binary_operators_are_not_command_args() {
        let parsed = parse_expr("a + b").unwrap();
        assert!(matches!(parsed, Expr::Binary { op: BinOp::Add, .. }));

        let parsed = parse_expr("a * b").unwrap();
        assert!(matches!(parsed, Expr::Binary { op: BinOp::Mul, .. }));
    }

    #[test]
    fn hash_and_array_literals() {
        let parsed = parse_expr(r#"{ key: "fun", "abc" => [1, 2] }"#).unwrap();
        match parsed {
            Expr::Hash(entries) => assert_eq!(entries.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
        let parsed = parse_expr("[1,\n 2,\n 3,\n 0]").unwrap();
        assert!(matches!(parsed, Expr::Array(items) if items.len() == 4));
    }

    #[test]
    fn constants_and_class_calls() {
        assert_eq!(
            parse_expr("Test::CONSTANT").unwrap(),
            Expr::Const("Test::CONSTANT".to_string())
        );
        assert!(matches!(
            parse_expr("Test2.method7").unwrap(),
            Expr::ConstCall { ref path, ref method, .. } if path == "Test2" && method == "method7"
        ));
    }

    #[test]
    fn postfix_methods_chain() {
        let parsed = parse_expr(r#"eval_method("Resource#table").to_json"#).unwrap();
        assert!(matches!(parsed, Expr::Send { ref method, .. } if method == "to_json"));
    }

    #[test]
    fn numbers_with_underscores() {
        assert_eq!(parse_expr("1_000").unwrap(), Expr::Lit(Value::Int(1000)));
        assert_eq!(parse_expr("0.15").unwrap(), Expr::Lit(Value::Float(0.15)));
    }

    #[test]
    fn program_statements() {
        let stmts = parse_program("x = 1\ny = x + 2; y").unwrap();
        assert_eq!(stmts.len(), 3);
        assert!(matches!(&stmts[0], Stmt::Assign(name, _) if name == "x"));
    }

    #[test]
    fn control_flow_is_rejected() {
        let err = parse_program("return true if false").unwrap_err();
        assert!(err.to_string().contains("`return` is not supported"));
    }

    #[test]
    fn unterminated_string_is_an_error() {
        assert!(parse_expr("\"oops").is_err());
    }
}
