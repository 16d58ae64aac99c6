//! Tree-walking evaluator for [`Expr`] programs.
//!
//! Name resolution is delegated to an [`Env`]; the evaluator only owns local
//! variables and operator semantics.

use crate::error::{Error, Result};
use crate::template::expr::{Arg, BinOp, Expr, Stmt};
use crate::template::value::Value;
use indexmap::IndexMap;

/// Evaluated call arguments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    pub positional: Vec<Value>,
    pub keywords: IndexMap<String, Value>,
}

impl Args {
    pub fn new(positional: Vec<Value>) -> Self {
        Self {
            positional,
            keywords: IndexMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keywords.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.positional.get(index)
    }

    /// Optional string positional argument.
    pub fn opt_str(&self, index: usize) -> Option<&str> {
        self.get(index).and_then(Value::as_str)
    }

    /// Required string positional argument.
    pub fn str(&self, index: usize, macro_name: &str) -> Result<&str> {
        match self.get(index) {
            Some(value) => value.as_str().ok_or_else(|| {
                Error::eval(format!(
                    "{}: expected a string for argument {}, got {}",
                    macro_name,
                    index + 1,
                    value.type_name()
                ))
            }),
            None => Err(Error::eval(format!(
                "{}: wrong number of arguments (given {}, expected at least {})",
                macro_name,
                self.positional.len(),
                index + 1
            ))),
        }
    }

    /// Options passed either as keywords or as a trailing hash argument.
    pub fn options(&self) -> IndexMap<String, Value> {
        if !self.keywords.is_empty() {
            return self.keywords.clone();
        }
        match self.positional.last() {
            Some(Value::Hash(map)) => map.clone(),
            _ => IndexMap::new(),
        }
    }

    pub fn option(&self, name: &str) -> Option<Value> {
        self.options().get(name).cloned()
    }

    /// A boolean option; absent means `default`.
    pub fn flag(&self, name: &str, default: bool) -> bool {
        self.option(name).map_or(default, |v| v.truthy())
    }
}

/// Name resolution for the evaluator.
pub trait Env {
    /// Resolve an identifier. `args` is `None` for a bare identifier
    /// (`name`) and `Some` for a call (`name(...)` or `name arg`).
    fn call(&mut self, name: &str, args: Option<Args>) -> Result<Value>;

    /// Resolve a constant path such as `NAME` or `A::B::NAME`.
    fn constant(&mut self, path: &str) -> Result<Value>;

    /// `Const.method(args)`
    fn call_on_constant(&mut self, path: &str, method: &str, args: Args) -> Result<Value>;
}

pub type Locals = IndexMap<String, Value>;

/// Evaluate statements in order and return the last value.
pub fn eval_program<E: Env + ?Sized>(stmts: &[Stmt], env: &mut E, locals: &mut Locals) -> Result<Value> {
    let mut last = Value::Nil;
    for stmt in stmts {
        last = match stmt {
            Stmt::Assign(name, expr) => {
                let value = eval(expr, env, locals)?;
                locals.insert(name.clone(), value.clone());
                value
            }
            Stmt::Expr(expr) => eval(expr, env, locals)?,
        };
    }
    Ok(last)
}

pub fn eval<E: Env + ?Sized>(expr: &Expr, env: &mut E, locals: &mut Locals) -> Result<Value> {
    match expr {
        Expr::Lit(value) => Ok(value.clone()),
        Expr::Array(items) => items
            .iter()
            .map(|item| eval(item, env, locals))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        Expr::Hash(entries) => {
            let mut map = IndexMap::with_capacity(entries.len());
            for (key, value) in entries {
                let key = eval(key, env, locals)?;
                let key = key.as_str().map(str::to_string).unwrap_or_else(|| key.to_display());
                map.insert(key, eval(value, env, locals)?);
            }
            Ok(Value::Hash(map))
        }
        Expr::Var(name) => match locals.get(name) {
            Some(value) => Ok(value.clone()),
            None => env.call(name, None),
        },
        Expr::Call { name, args } => {
            let args = eval_args(args, env, locals)?;
            env.call(name, Some(args))
        }
        Expr::Const(path) => env.constant(path),
        Expr::ConstCall { path, method, args } => {
            let args = eval_args(args, env, locals)?;
            env.call_on_constant(path, method, args)
        }
        Expr::Send { recv, method, args } => {
            let recv = eval(recv, env, locals)?;
            let args = eval_args(args, env, locals)?;
            recv.send(method, &args.positional)
        }
        Expr::Index { recv, index } => {
            let recv = eval(recv, env, locals)?;
            let index = eval(index, env, locals)?;
            recv.index(&index)
        }
        Expr::Neg(inner) => match eval(inner, env, locals)? {
            Value::Int(i) => Ok(Value::Int(-i)),
            Value::Float(f) => Ok(Value::Float(-f)),
            other => Err(Error::eval(format!(
                "undefined method `-@' for {}",
                other.type_name()
            ))),
        },
        Expr::Not(inner) => Ok(Value::Bool(!eval(inner, env, locals)?.truthy())),
        Expr::Binary { op, lhs, rhs } => {
            let lhs = eval(lhs, env, locals)?;
            match op {
                BinOp::And if !lhs.truthy() => return Ok(lhs),
                BinOp::Or if lhs.truthy() => return Ok(lhs),
                BinOp::And | BinOp::Or => return eval(rhs, env, locals),
                _ => {}
            }
            let rhs = eval(rhs, env, locals)?;
            binary(*op, &lhs, &rhs)
        }
    }
}

fn eval_args<E: Env + ?Sized>(args: &[Arg], env: &mut E, locals: &mut Locals) -> Result<Args> {
    let mut out = Args::default();
    for arg in args {
        match arg {
            Arg::Positional(expr) => out.positional.push(eval(expr, env, locals)?),
            Arg::Splat(expr) => match eval(expr, env, locals)? {
                Value::Array(items) => out.positional.extend(items),
                Value::Nil => {}
                other => out.positional.push(other),
            },
            Arg::Keyword(key, expr) => {
                let value = eval(expr, env, locals)?;
                out.keywords.insert(key.clone(), value);
            }
        }
    }
    Ok(out)
}

fn binary(op: BinOp, lhs: &Value, rhs: &Value) -> Result<Value> {
    use std::cmp::Ordering;

    let ordering = || -> Result<Ordering> {
        let ord = match (lhs, rhs) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            _ => None,
        };
        ord.ok_or_else(|| {
            Error::eval(format!(
                "comparison of {} with {} failed",
                lhs.type_name(),
                rhs.type_name()
            ))
        })
    };

    match op {
        BinOp::Add => lhs.add(rhs),
        BinOp::Sub => lhs.sub(rhs),
        BinOp::Mul => lhs.mul(rhs),
        BinOp::Eq => Ok(Value::Bool(equal(lhs, rhs))),
        BinOp::Ne => Ok(Value::Bool(!equal(lhs, rhs))),
        BinOp::Lt => Ok(Value::Bool(ordering()? == Ordering::Less)),
        BinOp::Gt => Ok(Value::Bool(ordering()? == Ordering::Greater)),
        BinOp::Le => Ok(Value::Bool(ordering()? != Ordering::Greater)),
        BinOp::Ge => Ok(Value::Bool(ordering()? != Ordering::Less)),
        // Short-circuiting already happened in `eval`; only the rhs decides.
        BinOp::And | BinOp::Or => Ok(rhs.clone()),
    }
}

fn equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => (*a as f64) == *b,
        _ => lhs == rhs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::expr::{parse_expr, parse_program};

    /// Resolves `double(x)` and a single constant; everything else is unknown.
    struct TestEnv;

    impl Env for TestEnv {
        fn call(&mut self, name: &str, args: Option<Args>) -> Result<Value> {
            match (name, args) {
                ("double", Some(args)) => args.positional[0].mul(&Value::Int(2)),
                ("four", None) => Ok(Value::Int(4)),
                (other, _) => Err(Error::eval(format!("undefined local variable or method `{}'", other))),
            }
        }

        fn constant(&mut self, path: &str) -> Result<Value> {
            match path {
                "Test::CONSTANT" => Ok(Value::str("hey")),
                other => Err(Error::eval(format!("uninitialized constant {}", other))),
            }
        }

        fn call_on_constant(&mut self, path: &str, method: &str, _args: Args) -> Result<Value> {
            Ok(Value::str(format!("{}.{}", path, method)))
        }
    }

    fn run(src: &str) -> Result<Value> {
        let expr = parse_expr(src)?;
        eval(&expr, &mut TestEnv, &mut Locals::new())
    }

    #[test]
    fn arithmetic_and_calls() {
        assert_eq!(run("double(2) + four").unwrap(), Value::Int(8));
        assert_eq!(run("double four").unwrap(), Value::Int(8));
        assert_eq!(run("-four * 2").unwrap(), Value::Int(-8));
    }

    #[test]
    fn constants_and_class_calls() {
        assert_eq!(run("Test::CONSTANT").unwrap(), Value::str("hey"));
        assert_eq!(run("Test2.method7").unwrap(), Value::str("Test2.method7"));
    }

    #[test]
    fn splat_expands_arrays() {
        struct Capture(Vec<Value>);
        impl Env for Capture {
            fn call(&mut self, _name: &str, args: Option<Args>) -> Result<Value> {
                self.0 = args.unwrap_or_default().positional;
                Ok(Value::Nil)
            }
            fn constant(&mut self, _path: &str) -> Result<Value> {
                Ok(Value::Nil)
            }
            fn call_on_constant(&mut self, _: &str, _: &str, _: Args) -> Result<Value> {
                Ok(Value::Nil)
            }
        }
        let mut env = Capture(Vec::new());
        let expr = parse_expr(r#"f(*["a", "b"], "c")"#).unwrap();
        eval(&expr, &mut env, &mut Locals::new()).unwrap();
        assert_eq!(env.0, vec![Value::str("a"), Value::str("b"), Value::str("c")]);
    }

    #[test]
    fn locals_shadow_env() {
        let stmts = parse_program("four = 10\nfour + 1").unwrap();
        let value = eval_program(&stmts, &mut TestEnv, &mut Locals::new()).unwrap();
        assert_eq!(value, Value::Int(11));
    }

    #[test]
    fn comparisons_and_logic() {
        assert_eq!(run("four > 3 && four != 5").unwrap(), Value::Bool(true));
        assert_eq!(run("nil || \"fallback\"").unwrap(), Value::str("fallback"));
        assert_eq!(run("4 == 4.0").unwrap(), Value::Bool(true));
        assert!(run("\"a\" < 1").is_err());
    }

    #[test]
    fn indexing_and_value_methods() {
        assert_eq!(run(r#"{ a: [1, 2] }["a"][1]"#).unwrap(), Value::Int(2));
        assert_eq!(run(r#""abc".upcase"#).unwrap(), Value::str("ABC"));
    }

    #[test]
    fn options_accept_trailing_hash() {
        let args = Args::new(vec![Value::str("x"), Value::Hash(
            [("humanize".to_string(), Value::Bool(false))].into_iter().collect(),
        )]);
        assert!(!args.flag("humanize", true));
        assert!(args.flag("missing", true));
    }
}
