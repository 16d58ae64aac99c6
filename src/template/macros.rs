//! Macros callable from doc templates.
//!
//! A [`MacroSet`] maps names to functions over a [`MacroContext`]. The
//! builtin catalogue is registered by [`Builtins`]; projects add or replace
//! macros with their own [`MacroModule`], merged after the builtins.

use crate::error::{Error, Result};
use crate::inflect;
use crate::reference::{MethodReference, ReferenceKind, Visibility};
use crate::template::context::MacroContext;
use crate::template::eval::Args;
use crate::template::{prose, tables, Value};
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

pub type MacroFn = dyn Fn(&mut MacroContext<'_>, &Args) -> Result<Value> + Send + Sync;

/// Named template macros. Later definitions replace earlier ones.
#[derive(Clone, Default)]
pub struct MacroSet {
    table: IndexMap<String, Arc<MacroFn>>,
}

impl fmt::Debug for MacroSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.table.keys()).finish()
    }
}

impl MacroSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The builtin catalogue.
    pub fn builtin() -> Self {
        let mut set = Self::new();
        set.register(&Builtins);
        set
    }

    pub fn define<F>(&mut self, name: &str, f: F)
    where
        F: Fn(&mut MacroContext<'_>, &Args) -> Result<Value> + Send + Sync + 'static,
    {
        self.table.insert(name.to_string(), Arc::new(f));
    }

    pub fn register(&mut self, module: &dyn MacroModule) {
        module.register(self);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<MacroFn>> {
        self.table.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.table.keys().map(String::as_str)
    }
}

/// A bundle of macros.
pub trait MacroModule: Send + Sync {
    fn register(&self, macros: &mut MacroSet);
}

/// The builtin catalogue.
#[derive(Debug, Default, Clone, Copy)]
pub struct Builtins;

impl MacroModule for Builtins {
    fn register(&self, m: &mut MacroSet) {
        m.define("print_method_source", print_method_source);
        m.define("print_raw_comment", print_raw_comment);
        m.define("print_mark_doc_from", print_mark_doc_from);
        m.define("eval_method", eval_method);

        m.define("link_to_markdown", link_to_markdown);
        m.define("format_link", format_link);
        m.define("title_from_link", title_from_link);
        m.define("git_hub_method_url", git_hub_method_url);
        m.define("git_hub_file_url", git_hub_file_url);
        m.define("method_page_url", method_page_url);
        m.define("link_to_method", link_to_method);

        m.define("ruby_to_markdown", ruby_to_markdown);
        m.define("pretty_code", pretty_code);
        m.define("readable_ruby_numbers", |_, args| text_pass(args, "readable_ruby_numbers", prose::readable_numbers));
        m.define("pretty_early_return", |_, args| text_pass(args, "pretty_early_return", prose::pretty_early_return));
        m.define("convert_early_return_to_if_else", |_, args| {
            text_pass(args, "convert_early_return_to_if_else", prose::convert_early_return_to_if_else)
        });
        m.define("ternary_to_if_else", |_, args| text_pass(args, "ternary_to_if_else", prose::ternary_to_if_else));
        m.define("methods_as_local_links", methods_as_local_links);
        m.define("variables_as_local_links", methods_as_local_links);
        m.define("quoted_strings_as_local_links", quoted_strings_as_local_links);
        m.define("link_local_methods_from_pretty_code", link_local_methods_from_pretty_code);
        m.define("constants_with_name_and_value", constants_with_name_and_value);

        m.define("hash_to_markdown_table", hash_to_markdown_table);
        m.define("array_to_markdown_table", array_to_markdown_table);
        m.define("markdown_table_header", markdown_table_header);
    }
}

fn text_pass(args: &Args, name: &str, pass: fn(&str) -> String) -> Result<Value> {
    Ok(Value::str(pass(args.str(0, name)?)))
}

fn required_option(args: &Args, macro_name: &str, key: &str) -> Result<String> {
    match args.option(key) {
        Some(value) => Ok(value.to_display()),
        None => Err(Error::eval(format!("{}: missing keyword: :{}", macro_name, key))),
    }
}

/// `include:` option as a list of names.
fn include_option(args: &Args) -> Option<Vec<String>> {
    match args.option("include")? {
        Value::Array(items) => Some(items.iter().map(Value::to_display).collect()),
        Value::Nil => None,
        other => Some(vec![other.to_display()]),
    }
}

// --- Source & comments ---

fn print_method_source(ctx: &mut MacroContext<'_>, args: &Args) -> Result<Value> {
    let reference = ctx.reference_arg(args, 0, "print_method_source")?;
    ctx.method_source(&reference).map(Value::Str)
}

fn print_raw_comment(ctx: &mut MacroContext<'_>, args: &Args) -> Result<Value> {
    let reference = ctx.reference_arg(args, 0, "print_raw_comment")?;
    ctx.raw_comment(&reference).map(Value::Str)
}

fn print_mark_doc_from(ctx: &mut MacroContext<'_>, args: &Args) -> Result<Value> {
    let reference = ctx.reference(args.str(0, "print_mark_doc_from")?)?;
    ctx.mark_doc(&reference).map(Value::Str)
}

fn eval_method(ctx: &mut MacroContext<'_>, args: &Args) -> Result<Value> {
    let reference = ctx.reference_arg(args, 0, "eval_method")?;
    ctx.eval_method(&reference)
}

// --- Links ---

fn link_to_markdown(_: &mut MacroContext<'_>, args: &Args) -> Result<Value> {
    let target = args.str(0, "link_to_markdown")?;
    let title = required_option(args, "link_to_markdown", "title")?;
    Ok(Value::str(format!("[{}]({})", title, target)))
}

fn format_link(_: &mut MacroContext<'_>, args: &Args) -> Result<Value> {
    let title = args.str(0, "format_link")?;
    let link = args.str(1, "format_link")?;
    let target = match link.split_once('#') {
        Some((path, anchor)) => format!("{}#{}", path, inflect::dasherize(anchor).replace('?', "")),
        None => link.to_string(),
    };
    Ok(Value::str(format!("[{}]({})", title, target)))
}

/// `[humanized last segment, link]`
fn title_from_link(_: &mut MacroContext<'_>, args: &Args) -> Result<Value> {
    let link = args.str(0, "title_from_link")?;
    let last = link.rsplit('/').next().unwrap_or(link);
    let last = last.rsplit('#').next().unwrap_or(last);
    Ok(Value::Array(vec![
        Value::str(inflect::humanize(last, true)),
        Value::str(link),
    ]))
}

fn git_hub_method_url(ctx: &mut MacroContext<'_>, args: &Args) -> Result<Value> {
    let reference = ctx.reference_arg(args, 0, "git_hub_method_url")?;
    let site = ctx.locate(&reference)?;
    Ok(Value::str(ctx.workspace().links.method_url(&site.file, site.line)))
}

/// A path links to the file; a subject name links to its first located
/// member, else to its declaration.
fn git_hub_file_url(ctx: &mut MacroContext<'_>, args: &Args) -> Result<Value> {
    let target = args.str(0, "git_hub_file_url")?;
    let ws = ctx.workspace();
    if target.contains('/') {
        return Ok(Value::str(ws.links.file_url(target)));
    }
    let subject = ws.registry.resolve(target, &ctx.subject().name)?;
    let first_member = subject
        .members
        .iter()
        .filter(|m| m.kind == ReferenceKind::Instance)
        .find_map(|m| {
            let reference = MethodReference::member(&subject.name, &m.name, m.kind, Visibility::Public);
            ws.locator.locate(&reference, subject, ws.registry).ok()
        });
    let site = match first_member {
        Some(site) => site,
        None => ws
            .locator
            .locate_subject(subject)
            .map_err(|err| Error::SourceNotFound {
                reference: subject.name.clone(),
                reason: err.to_string(),
            })?,
    };
    Ok(Value::str(ws.links.method_url(&site.file, site.line)))
}

fn method_page_url(ctx: &mut MacroContext<'_>, args: &Args) -> Result<Value> {
    let reference = ctx.reference_arg(args, 0, "method_page_url")?;
    let owner = ctx.owner(&reference)?;
    Ok(Value::str(ctx.member_url(&owner.name, reference.name())))
}

fn link_to_method(ctx: &mut MacroContext<'_>, args: &Args) -> Result<Value> {
    let reference = ctx.reference_arg(args, 0, "link_to_method")?;
    let owner = ctx.owner(&reference)?;
    let title = match args.option("title") {
        Some(title) if !title.is_nil() => title.to_display(),
        _ => inflect::titleize(reference.name()),
    };
    Ok(Value::str(format!(
        "[{}]({})",
        title,
        ctx.member_url(&owner.name, reference.name())
    )))
}

// --- Prose ---

/// How member links are titled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkTitle {
    /// Inline marker, titleized by the linker.
    Marker,
    /// The raw member name.
    Raw,
    Humanized,
}

impl LinkTitle {
    fn from_options(options: &IndexMap<String, Value>) -> Self {
        match options.get("call_on_title") {
            Some(Value::Bool(false)) | Some(Value::Nil) => LinkTitle::Raw,
            Some(value) if value.as_str() == Some("humanize") => LinkTitle::Humanized,
            _ => LinkTitle::Marker,
        }
    }
}

fn local_links(ctx: &MacroContext<'_>, src: &str, include: Option<&[String]>, title: LinkTitle) -> String {
    let subject = &ctx.subject().name;
    prose::methods_as_links(
        src,
        |name| include.map_or(true, |names| names.iter().any(|n| n == name)) && ctx.is_member(name),
        |name| match title {
            LinkTitle::Marker => format!("^`{}`", name),
            LinkTitle::Raw => format!("[{}]({})", name, ctx.member_url(subject, name)),
            LinkTitle::Humanized => format!(
                "[{}]({})",
                inflect::humanize(name, true),
                ctx.member_url(subject, name)
            ),
        },
    )
}

fn methods_as_local_links(ctx: &mut MacroContext<'_>, args: &Args) -> Result<Value> {
    let src = args.str(0, "methods_as_local_links")?;
    let include = include_option(args);
    let title = LinkTitle::from_options(&args.options());
    Ok(Value::str(local_links(ctx, src, include.as_deref(), title)))
}

fn quoted_strings_as_local_links(_: &mut MacroContext<'_>, args: &Args) -> Result<Value> {
    let text = args.str(0, "quoted_strings_as_local_links")?;
    let include = include_option(args);
    Ok(Value::str(prose::quoted_strings_as_local_links(text, include.as_deref())))
}

fn link_local_methods_from_pretty_code(ctx: &mut MacroContext<'_>, args: &Args) -> Result<Value> {
    let code = args.str(0, "link_local_methods_from_pretty_code")?;
    let include = include_option(args);
    let ctx = &*ctx;
    Ok(Value::str(prose::link_local_methods_from_pretty_code(
        code,
        include.as_deref(),
        |name| ctx.is_member(name),
        |name| format!("^`{}`", name),
    )))
}

fn constants_with_name_and_value(ctx: &mut MacroContext<'_>, args: &Args) -> Result<Value> {
    let src = match args.get(0) {
        Some(_) => args.str(0, "constants_with_name_and_value")?.to_string(),
        None => {
            let reference = ctx.reference_arg(args, 0, "constants_with_name_and_value")?;
            ctx.method_source(&reference)?
        }
    };
    let ctx = &*ctx;
    Ok(Value::str(prose::constants_as_links(&src, |name| ctx.constant_value(name))))
}

fn pretty_code(_: &mut MacroContext<'_>, args: &Args) -> Result<Value> {
    let src = args.str(0, "pretty_code")?;
    Ok(Value::str(prose::pretty_code(src, args.flag("humanize", true))))
}

/// Passes of `ruby_to_markdown`, in application order.
const PROSE_PASSES: [&str; 11] = [
    "readable_ruby_numbers",
    "pretty_early_return",
    "convert_early_return_to_if_else",
    "ternary_to_if_else",
    "ruby_if_statement_to_md",
    "ruby_case_statement_to_md",
    "remove_end_keyword",
    "comment_to_markdown",
    "ruby_operators_to_english",
    "constants_with_name_and_value",
    "methods_as_local_links",
];

/// Source of a member (positional string, `method_reference:` option or
/// the current member) rewritten as markdown prose.
fn ruby_to_markdown(ctx: &mut MacroContext<'_>, args: &Args) -> Result<Value> {
    let options = args.options();
    let mut text = match args.opt_str(0) {
        Some(src) => src.to_string(),
        None => {
            let reference = match options.get("method_reference") {
                Some(value) => ctx.reference(&value.to_display())?,
                None => ctx.reference_arg(&Args::default(), 0, "ruby_to_markdown")?,
            };
            ctx.method_source(&reference)?
        }
    };

    let ctx = &*ctx;
    for pass in PROSE_PASSES {
        let setting = options.get(pass);
        if matches!(setting, Some(Value::Bool(false))) {
            continue;
        }
        text = match pass {
            "readable_ruby_numbers" => prose::readable_numbers(&text),
            "pretty_early_return" => prose::pretty_early_return(&text),
            "convert_early_return_to_if_else" => prose::convert_early_return_to_if_else(&text),
            "ternary_to_if_else" => prose::ternary_to_if_else(&text),
            "ruby_if_statement_to_md" => prose::if_statements_to_bullets(&text),
            "ruby_case_statement_to_md" => prose::case_statements_to_bullets(&text),
            "remove_end_keyword" => prose::remove_end_keyword(&text),
            "comment_to_markdown" => prose::comments_to_prose(&text),
            "ruby_operators_to_english" => prose::operators_to_words(&text),
            "constants_with_name_and_value" => prose::constants_as_links(&text, |name| ctx.constant_value(name)),
            _ => {
                let title = match setting {
                    Some(Value::Hash(opts)) => LinkTitle::from_options(opts),
                    _ => LinkTitle::Marker,
                };
                local_links(ctx, &text, None, title)
            }
        };
    }
    Ok(Value::Str(text))
}

// --- Tables ---

fn hash_to_markdown_table(_: &mut MacroContext<'_>, args: &Args) -> Result<Value> {
    let Some(Value::Hash(map)) = args.get(0) else {
        return Err(Error::eval("hash_to_markdown_table: expected a hash"));
    };
    let key_name = required_option(args, "hash_to_markdown_table", "key_name")?;
    let value_name = required_option(args, "hash_to_markdown_table", "value_name")?;
    let rows: Vec<(String, Value)> = map.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    Ok(Value::str(tables::hash_table(&rows, &key_name, &value_name)))
}

fn array_to_markdown_table(_: &mut MacroContext<'_>, args: &Args) -> Result<Value> {
    let Some(Value::Array(items)) = args.get(0) else {
        return Err(Error::eval("array_to_markdown_table: expected an array"));
    };
    let key_name = required_option(args, "array_to_markdown_table", "key_name")?;
    Ok(Value::str(tables::array_table(items, &key_name)))
}

/// `[[title, width], ...]`; a missing width is 0.
fn markdown_table_header(_: &mut MacroContext<'_>, args: &Args) -> Result<Value> {
    let Some(Value::Array(pairs)) = args.get(0) else {
        return Err(Error::eval("markdown_table_header: expected an array of [title, width] pairs"));
    };
    let mut columns = Vec::with_capacity(pairs.len());
    for pair in pairs {
        let (title, width) = match pair {
            Value::Array(parts) => match parts.as_slice() {
                [title] => (title.to_display(), 0),
                [title, Value::Int(width), ..] => (title.to_display(), usize::try_from(*width).unwrap_or(0)),
                _ => return Err(Error::eval("markdown_table_header: malformed column")),
            },
            other => (other.to_display(), 0),
        };
        columns.push((title, width));
    }
    Ok(Value::str(tables::table_header(&columns)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_override_builtins() {
        struct Custom;
        impl MacroModule for Custom {
            fn register(&self, macros: &mut MacroSet) {
                macros.define("link_to_markdown", |_, args| {
                    Ok(Value::str(format!("<{}>", args.str(0, "link_to_markdown")?)))
                });
                macros.define("shout", |_, args| Ok(Value::str(args.str(0, "shout")?.to_uppercase())));
            }
        }
        let mut set = MacroSet::builtin();
        let before = set.names().count();
        set.register(&Custom);
        assert_eq!(set.names().count(), before + 1);
        assert!(set.contains("shout"));
        assert!(set.contains("variables_as_local_links"));
    }

    #[test]
    fn link_title_options() {
        let mut opts = IndexMap::new();
        assert_eq!(LinkTitle::from_options(&opts), LinkTitle::Marker);
        opts.insert("call_on_title".to_string(), Value::Bool(false));
        assert_eq!(LinkTitle::from_options(&opts), LinkTitle::Raw);
        opts.insert("call_on_title".to_string(), Value::Symbol("humanize".to_string()));
        assert_eq!(LinkTitle::from_options(&opts), LinkTitle::Humanized);
    }
}
