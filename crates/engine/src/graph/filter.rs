//! Property conditions and their SQL rendering.
//!
//! A condition compares one top-level property against a value. Comparisons
//! are type-aware: a number never equals a string, and a missing property
//! only matches `Eq(Null)`. Rendering and in-memory evaluation
//! ([`Comparison::matches`]) implement the same semantics.

use std::cmp::Ordering;

use trellis_core::{TrellisError, TrellisResult, Value};
use trellis_storage::SqlValue;

use super::validate::{json_path, validate_property_key};

/// A comparison against a property value.
#[derive(Debug, Clone, PartialEq)]
pub enum Comparison {
    /// Equal. `Eq(Null)` also matches a missing property.
    Eq(Value),
    /// Present, not null, and not equal.
    Ne(Value),
    /// Greater than (numbers and strings only).
    Gt(Value),
    /// Greater than or equal.
    Gte(Value),
    /// Less than.
    Lt(Value),
    /// Less than or equal.
    Lte(Value),
    /// Equal to any member. An empty set matches nothing.
    In(Vec<Value>),
}

impl Comparison {
    /// Build an `Eq`.
    pub fn eq(v: impl Into<Value>) -> Self {
        Comparison::Eq(v.into())
    }

    /// Build a `Ne`.
    pub fn ne(v: impl Into<Value>) -> Self {
        Comparison::Ne(v.into())
    }

    /// Build a `Gt`.
    pub fn gt(v: impl Into<Value>) -> Self {
        Comparison::Gt(v.into())
    }

    /// Build a `Gte`.
    pub fn gte(v: impl Into<Value>) -> Self {
        Comparison::Gte(v.into())
    }

    /// Build a `Lt`.
    pub fn lt(v: impl Into<Value>) -> Self {
        Comparison::Lt(v.into())
    }

    /// Build a `Lte`.
    pub fn lte(v: impl Into<Value>) -> Self {
        Comparison::Lte(v.into())
    }

    /// Build an `In`.
    pub fn one_of<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Comparison::In(values.into_iter().map(Into::into).collect())
    }

    fn validate(&self) -> TrellisResult<()> {
        match self {
            Comparison::Gt(v) | Comparison::Gte(v) | Comparison::Lt(v) | Comparison::Lte(v)
                if !v.is_orderable() =>
            {
                Err(TrellisError::invalid_input(format!(
                    "ordering comparison needs a number or string, got {}",
                    v.type_name()
                )))
            }
            _ => Ok(()),
        }
    }

    /// Evaluate against a property value (`None` when the key is absent).
    pub fn matches(&self, actual: Option<&Value>) -> bool {
        match self {
            Comparison::Eq(Value::Null) => actual.map_or(true, Value::is_null),
            Comparison::Eq(v) => actual.map_or(false, |a| typed_eq(a, v)),
            Comparison::Ne(Value::Null) => actual.map_or(false, |a| !a.is_null()),
            Comparison::Ne(v) => actual.map_or(false, |a| !a.is_null() && !typed_eq(a, v)),
            Comparison::Gt(v) => ordered(actual, v, |o| o == Ordering::Greater),
            Comparison::Gte(v) => ordered(actual, v, |o| o != Ordering::Less),
            Comparison::Lt(v) => ordered(actual, v, |o| o == Ordering::Less),
            Comparison::Lte(v) => ordered(actual, v, |o| o != Ordering::Greater),
            Comparison::In(vs) => vs.iter().any(|v| Comparison::Eq(v.clone()).matches(actual)),
        }
    }
}

fn typed_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            a.as_f64() == b.as_f64()
        }
        (Value::List(_) | Value::Map(_), Value::List(_) | Value::Map(_)) => {
            a.to_json() == b.to_json()
        }
        _ => a == b,
    }
}

fn ordered(actual: Option<&Value>, bound: &Value, pred: impl Fn(Ordering) -> bool) -> bool {
    let ord = match (actual, bound) {
        (Some(Value::Int(x)), Value::Int(y)) => Some(x.cmp(y)),
        (Some(a @ (Value::Int(_) | Value::Float(_))), Value::Int(_) | Value::Float(_)) => a
            .as_f64()
            .and_then(|x| bound.as_f64().and_then(|y| x.partial_cmp(&y))),
        (Some(Value::String(x)), Value::String(y)) => Some(x.as_bytes().cmp(y.as_bytes())),
        _ => None,
    };
    ord.map_or(false, pred)
}

/// A condition on one property.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// Property key.
    pub key: String,
    /// Comparison applied to its value.
    pub cmp: Comparison,
}

impl Condition {
    /// Create a condition.
    pub fn new(key: impl Into<String>, cmp: Comparison) -> Self {
        Self {
            key: key.into(),
            cmp,
        }
    }

    /// Validate the key and operand.
    pub fn validate(&self) -> TrellisResult<()> {
        validate_property_key(&self.key)?;
        self.cmp.validate()
    }

    /// Render as a boolean SQL expression over `{alias}.properties`,
    /// appending bound parameters to `params` in placeholder order.
    pub(crate) fn render(&self, alias: &str, params: &mut Vec<SqlValue>) -> TrellisResult<String> {
        self.validate()?;
        let r = Renderer {
            col: format!("{}.properties", alias),
            path: json_path(&self.key),
        };
        Ok(match &self.cmp {
            Comparison::Eq(v) => r.eq(v, params),
            Comparison::Ne(Value::Null) => {
                params.push(r.path());
                format!("json_extract({}, ?) IS NOT NULL", r.col)
            }
            Comparison::Ne(v) => {
                params.push(r.path());
                let eq = r.eq(v, params);
                format!("(json_type({}, ?) <> 'null' AND NOT {})", r.col, eq)
            }
            Comparison::Gt(v) => r.ordered(">", v, params),
            Comparison::Gte(v) => r.ordered(">=", v, params),
            Comparison::Lt(v) => r.ordered("<", v, params),
            Comparison::Lte(v) => r.ordered("<=", v, params),
            Comparison::In(vs) if vs.is_empty() => "0".to_string(),
            Comparison::In(vs) => {
                let parts: Vec<String> = vs.iter().map(|v| r.eq(v, params)).collect();
                format!("({})", parts.join(" OR "))
            }
        })
    }
}

struct Renderer {
    col: String,
    path: String,
}

impl Renderer {
    fn path(&self) -> SqlValue {
        SqlValue::Text(self.path.clone())
    }

    fn eq(&self, v: &Value, params: &mut Vec<SqlValue>) -> String {
        match v {
            Value::Null => {
                params.push(self.path());
                format!("json_extract({}, ?) IS NULL", self.col)
            }
            Value::Bool(b) => {
                params.push(self.path());
                format!("json_type({}, ?) = '{}'", self.col, b)
            }
            Value::Int(_) | Value::Float(_) => {
                params.extend([self.path(), self.path(), scalar(v)]);
                format!(
                    "(json_type({c}, ?) IN ('integer', 'real') AND json_extract({c}, ?) = ?)",
                    c = self.col
                )
            }
            Value::String(_) => {
                params.extend([self.path(), self.path(), scalar(v)]);
                format!(
                    "(json_type({c}, ?) = 'text' AND json_extract({c}, ?) = ?)",
                    c = self.col
                )
            }
            Value::List(_) | Value::Map(_) => {
                params.extend([self.path(), self.path(), SqlValue::Text(v.to_json().to_string())]);
                format!(
                    "(json_type({c}, ?) IN ('array', 'object') AND json_extract({c}, ?) = json(?))",
                    c = self.col
                )
            }
        }
    }

    fn ordered(&self, op: &str, v: &Value, params: &mut Vec<SqlValue>) -> String {
        let types = if matches!(v, Value::String(_)) {
            "('text')"
        } else {
            "('integer', 'real')"
        };
        params.extend([self.path(), self.path(), scalar(v)]);
        format!(
            "(json_type({c}, ?) IN {t} AND json_extract({c}, ?) {op} ?)",
            c = self.col,
            t = types,
            op = op
        )
    }
}

/// Bind a scalar value as a SQL parameter.
pub(crate) fn scalar(v: &Value) -> SqlValue {
    match v {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Int(i) => SqlValue::Integer(*i),
        Value::Float(f) => SqlValue::Real(*f),
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::List(_) | Value::Map(_) => SqlValue::Text(v.to_json().to_string()),
    }
}
