//! Runtime values and the render context

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Numeric value, integer or floating point
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn is_zero(&self) -> bool {
        match self {
            Number::Int(n) => *n == 0,
            Number::Float(f) => *f == 0.0,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(n) => write!(f, "{}", n),
            Number::Float(x) => write!(f, "{}", x),
        }
    }
}

impl std::ops::Neg for Number {
    type Output = Number;

    fn neg(self) -> Number {
        match self {
            Number::Int(n) => Number::Int(-n),
            Number::Float(f) => Number::Float(-f),
        }
    }
}

/// A structured value: a type name plus named fields.
///
/// Unlike [`Value::Map`], a record carries the name of the shape it came
/// from, which shows up in error messages and debug output.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    name: String,
    fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field insertion
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn type_name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

/// A dynamically-typed template value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Sentinel for an unresolved name, key, field, or index.
    /// Falsy; renders as the empty string.
    Undefined,
    Null,
    Bool(bool),
    Number(Number),
    Text(String),
    Seq(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Record(Record),
}

impl Value {
    /// Short kind name used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Text(_) => "text",
            Value::Seq(_) => "sequence",
            Value::Map(_) => "mapping",
            Value::Record(_) => "record",
        }
    }

    /// Truthiness used by conditionals: undefined, null, false, zero, and
    /// empty text/sequences/mappings are falsy; everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => !n.is_zero(),
            Value::Text(s) => !s.is_empty(),
            Value::Seq(items) => !items.is_empty(),
            Value::Map(entries) => !entries.is_empty(),
            Value::Record(_) => true,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Text form for scalar values; `None` for sequences, mappings, and
    /// records, which have no direct text rendering.
    pub(crate) fn to_text(&self) -> Option<String> {
        match self {
            Value::Undefined | Value::Null => Some(String::new()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::Text(s) => Some(s.clone()),
            Value::Seq(_) | Value::Map(_) | Value::Record(_) => None,
        }
    }

    /// Convert a `serde_json` value into a template value
    pub fn from_json(json: serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Number(Number::Int(i))
                } else {
                    Value::Number(Number::Float(n.as_f64().unwrap_or(f64::NAN)))
                }
            }
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => {
                Value::Seq(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(entries) => Value::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Value::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Value {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Value {
        Value::Number(Number::Int(n))
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Value {
        Value::Number(Number::Int(n as i64))
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Value {
        Value::Number(Number::Int(n as i64))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Value {
        Value::Number(Number::Float(f))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Value {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Value {
        Value::Text(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Value {
        Value::Seq(items.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(entries: BTreeMap<String, Value>) -> Value {
        Value::Map(entries)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Value {
        Value::Record(record)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Value {
        Value::from_json(json)
    }
}

/// Caller-supplied variable bindings for one render call.
///
/// The engine never mutates a context; the same context can back multiple
/// concurrent renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    vars: BTreeMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    /// Build a context from any `Serialize` type that serializes to an
    /// object (a struct or a map).
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        use serde::ser::Error;

        match serde_json::to_value(value)? {
            serde_json::Value::Object(entries) => Ok(Self {
                vars: entries
                    .into_iter()
                    .map(|(k, v)| (k, Value::from_json(v)))
                    .collect(),
            }),
            other => Err(serde_json::Error::custom(format!(
                "context must serialize to an object, got {}",
                Value::from_json(other).kind()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!Value::Undefined.is_truthy());
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(!Value::Number(Number::Int(0)).is_truthy());
        assert!(!Value::Number(Number::Float(0.0)).is_truthy());
        assert!(!Value::Text(String::new()).is_truthy());
        assert!(!Value::Seq(vec![]).is_truthy());
        assert!(!Value::Map(BTreeMap::new()).is_truthy());

        assert!(Value::Bool(true).is_truthy());
        assert!(Value::Number(Number::Int(-1)).is_truthy());
        assert!(Value::Text("x".into()).is_truthy());
        assert!(Value::Seq(vec![Value::Null]).is_truthy());
        assert!(Value::from(Record::new("Point")).is_truthy());
    }

    #[test]
    fn test_number_display() {
        assert_eq!(Number::Int(42).to_string(), "42");
        assert_eq!(Number::Int(-7).to_string(), "-7");
        assert_eq!(Number::Float(3.14).to_string(), "3.14");
        assert_eq!(Number::Float(5.0).to_string(), "5");
    }

    #[test]
    fn test_scalar_text_forms() {
        assert_eq!(Value::Null.to_text().as_deref(), Some(""));
        assert_eq!(Value::Bool(true).to_text().as_deref(), Some("true"));
        assert_eq!(Value::from(10).to_text().as_deref(), Some("10"));
        assert_eq!(Value::from("hi").to_text().as_deref(), Some("hi"));
        assert!(Value::Seq(vec![]).to_text().is_none());
    }

    #[test]
    fn test_from_json() {
        let json = serde_json::json!({
            "title": "APUE",
            "rank": 1,
            "tags": ["unix", "c"],
            "weight": 1.5,
            "out_of_print": false,
            "isbn": null,
        });
        let value = Value::from_json(json);
        let Value::Map(entries) = value else {
            panic!("Expected mapping");
        };
        assert_eq!(entries["title"], Value::from("APUE"));
        assert_eq!(entries["rank"], Value::from(1));
        assert_eq!(
            entries["tags"],
            Value::from(vec!["unix".to_string(), "c".to_string()])
        );
        assert_eq!(entries["weight"], Value::from(1.5));
        assert_eq!(entries["out_of_print"], Value::from(false));
        assert_eq!(entries["isbn"], Value::Null);
    }

    #[test]
    fn test_record_fields() {
        let record = Record::new("Book")
            .with_field("title", "CSAPP")
            .with_field("rank", 2);
        assert_eq!(record.type_name(), "Book");
        assert_eq!(record.get("title"), Some(&Value::from("CSAPP")));
        assert_eq!(record.get("rank"), Some(&Value::from(2)));
        assert!(record.get("missing").is_none());
    }

    #[test]
    fn test_context_from_serialize() {
        #[derive(Serialize)]
        struct Page {
            user: String,
            visits: u32,
        }

        let ctx = Context::from_serialize(&Page {
            user: "neo".into(),
            visits: 3,
        })
        .expect("Should convert");
        assert_eq!(ctx.get("user"), Some(&Value::from("neo")));
        assert_eq!(ctx.get("visits"), Some(&Value::from(3)));
    }

    #[test]
    fn test_context_from_serialize_rejects_scalars() {
        assert!(Context::from_serialize(&42).is_err());
    }
}
