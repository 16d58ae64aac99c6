//! Runtime values produced by template expressions and member evaluation.

use crate::error::{Error, Result};
use crate::inflect;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// A template value.
///
/// Manifests supply values (declared results, constants, stubs) through the
/// untagged deserializer, so TOML `42`, `"text"` and `[1, 2]` map directly.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Array(Vec<Value>),
    Hash(IndexMap<String, Value>),
    #[serde(skip)]
    Symbol(String),
    /// Source text that could not be evaluated (e.g. `Mutex.new`).
    #[serde(skip)]
    Opaque(String),
}

impl Value {
    pub fn str(text: impl Into<String>) -> Self {
        Value::Str(text.into())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::Array(_) => "array",
            Value::Hash(_) => "hash",
            Value::Opaque(_) => "expression",
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// `false` and `nil` are falsy; everything else is truthy.
    pub fn truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// String content of strings and symbols.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) | Value::Symbol(s) => Some(s),
            _ => None,
        }
    }

    /// Display form used by `<%= %>` interpolation.
    pub fn to_display(&self) -> String {
        match self {
            Value::Nil => String::new(),
            Value::Str(s) | Value::Symbol(s) | Value::Opaque(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => format_float(*f),
            Value::Array(_) | Value::Hash(_) => self.inspect(),
        }
    }

    /// Source-like representation: strings quoted, collections expanded.
    pub fn inspect(&self) -> String {
        match self {
            Value::Nil => "nil".to_string(),
            Value::Str(s) => format!("{:?}", s),
            Value::Symbol(s) => format!(":{}", s),
            Value::Array(items) => {
                let inner: Vec<String> = items.iter().map(Value::inspect).collect();
                format!("[{}]", inner.join(", "))
            }
            Value::Hash(map) => {
                let inner: Vec<String> = map
                    .iter()
                    .map(|(k, v)| {
                        if is_label(k) {
                            format!("{}: {}", k, v.inspect())
                        } else {
                            format!("{:?} => {}", k, v.inspect())
                        }
                    })
                    .collect();
                format!("{{{}}}", inner.join(", "))
            }
            other => other.to_display(),
        }
    }

    /// Reference-value presentation: integers digit-grouped, strings quoted.
    pub fn present(&self) -> String {
        match self {
            Value::Int(i) => inflect::delimit(i128::from(*i)),
            Value::Str(_) => self.inspect(),
            other => other.to_display(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Apply a postfix value method (`value.name(args)`).
    pub fn send(&self, method: &str, args: &[Value]) -> Result<Value> {
        let unsupported = || {
            Error::eval(format!(
                "undefined method `{}' for {}",
                method,
                self.type_name()
            ))
        };
        let text = || self.as_str().map(str::to_string).ok_or_else(unsupported);

        let value = match method {
            "to_s" => Value::Str(self.to_display()),
            "inspect" => Value::Str(self.inspect()),
            "to_json" => Value::Str(self.to_json()?),
            "to_sym" => Value::Symbol(text()?),
            "nil?" => Value::Bool(self.is_nil()),
            "upcase" => Value::Str(text()?.to_uppercase()),
            "downcase" => Value::Str(text()?.to_lowercase()),
            "strip" => Value::Str(text()?.trim().to_string()),
            "humanize" => Value::Str(inflect::humanize(&text()?, true)),
            "titleize" => Value::Str(inflect::titleize(&text()?)),
            "underscore" => Value::Str(inflect::underscore(&text()?)),
            "dasherize" => Value::Str(inflect::dasherize(&text()?)),
            "size" | "length" | "count" => match self {
                Value::Str(s) => Value::Int(s.chars().count() as i64),
                Value::Array(items) => Value::Int(items.len() as i64),
                Value::Hash(map) => Value::Int(map.len() as i64),
                _ => return Err(unsupported()),
            },
            "first" | "last" => match self {
                Value::Array(items) => {
                    let item = if method == "first" {
                        items.first()
                    } else {
                        items.last()
                    };
                    item.cloned().unwrap_or(Value::Nil)
                }
                _ => return Err(unsupported()),
            },
            "keys" => match self {
                Value::Hash(map) => Value::Array(map.keys().cloned().map(Value::Str).collect()),
                _ => return Err(unsupported()),
            },
            "values" => match self {
                Value::Hash(map) => Value::Array(map.values().cloned().collect()),
                _ => return Err(unsupported()),
            },
            "join" => match self {
                Value::Array(items) => {
                    let sep = args.first().and_then(Value::as_str).unwrap_or("");
                    let parts: Vec<String> = items.iter().map(Value::to_display).collect();
                    Value::Str(parts.join(sep))
                }
                _ => return Err(unsupported()),
            },
            "reverse" => match self {
                Value::Array(items) => Value::Array(items.iter().rev().cloned().collect()),
                Value::Str(s) => Value::Str(s.chars().rev().collect()),
                _ => return Err(unsupported()),
            },
            "sort" | "max" | "min" => match self {
                Value::Array(items) => {
                    let mut sorted = items.clone();
                    sorted.sort_by(compare);
                    match method {
                        "sort" => Value::Array(sorted),
                        "max" => sorted.pop().unwrap_or(Value::Nil),
                        _ => sorted.into_iter().next().unwrap_or(Value::Nil),
                    }
                }
                _ => return Err(unsupported()),
            },
            _ => return Err(unsupported()),
        };
        Ok(value)
    }

    /// `value[index]`
    pub fn index(&self, index: &Value) -> Result<Value> {
        match (self, index) {
            (Value::Array(items), Value::Int(i)) => {
                let len = items.len() as i64;
                let at = if *i < 0 { len + i } else { *i };
                Ok(usize::try_from(at)
                    .ok()
                    .and_then(|at| items.get(at))
                    .cloned()
                    .unwrap_or(Value::Nil))
            }
            (Value::Hash(map), key) => Ok(key
                .as_str()
                .and_then(|k| map.get(k))
                .cloned()
                .unwrap_or(Value::Nil)),
            _ => Err(Error::eval(format!(
                "cannot index {} with {}",
                self.type_name(),
                index.type_name()
            ))),
        }
    }

    pub fn add(&self, rhs: &Value) -> Result<Value> {
        match (self, rhs) {
            (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{}{}", a, b))),
            (Value::Array(a), Value::Array(b)) => {
                Ok(Value::Array(a.iter().chain(b.iter()).cloned().collect()))
            }
            _ => self.arith(rhs, "+", i64::checked_add, |a, b| a + b),
        }
    }

    pub fn sub(&self, rhs: &Value) -> Result<Value> {
        self.arith(rhs, "-", i64::checked_sub, |a, b| a - b)
    }

    pub fn mul(&self, rhs: &Value) -> Result<Value> {
        self.arith(rhs, "*", i64::checked_mul, |a, b| a * b)
    }

    fn arith(
        &self,
        rhs: &Value,
        op: &str,
        int_op: fn(i64, i64) -> Option<i64>,
        float_op: fn(f64, f64) -> f64,
    ) -> Result<Value> {
        match (self, rhs) {
            (Value::Int(a), Value::Int(b)) => int_op(*a, *b)
                .map(Value::Int)
                .ok_or_else(|| Error::eval(format!("integer overflow in {} {} {}", a, op, b))),
            (Value::Int(a), Value::Float(b)) => Ok(Value::Float(float_op(*a as f64, *b))),
            (Value::Float(a), Value::Int(b)) => Ok(Value::Float(float_op(*a, *b as f64))),
            (Value::Float(a), Value::Float(b)) => Ok(Value::Float(float_op(*a, *b))),
            _ => Err(Error::eval(format!(
                "no implicit conversion of {} into {} for `{}'",
                rhs.type_name(),
                self.type_name(),
                op
            ))),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display())
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Nil => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Str(s) | Value::Symbol(s) | Value::Opaque(s) => serializer.serialize_str(s),
            Value::Array(items) => items.serialize(serializer),
            Value::Hash(map) => map.serialize(serializer),
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Str(text.to_string())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::Str(text)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

fn format_float(f: f64) -> String {
    if f.fract() == 0.0 && f.is_finite() {
        format!("{:.1}", f)
    } else {
        f.to_string()
    }
}

fn is_label(key: &str) -> bool {
    let mut chars = key.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn compare(a: &Value, b: &Value) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => x.cmp(y),
        (Value::Int(x), Value::Float(y)) => (*x as f64).partial_cmp(y).unwrap_or(Ordering::Equal),
        (Value::Float(x), Value::Int(y)) => x.partial_cmp(&(*y as f64)).unwrap_or(Ordering::Equal),
        (Value::Float(x), Value::Float(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        _ => a.to_display().cmp(&b.to_display()),
    }
}
