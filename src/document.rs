//! The status document served by the device at `/json`.
//!
//! The firmware emits a flat JSON object. Every value is currently sent as a
//! string (`"ts":"1700000000"`, `"temp":"21.50"`), but numeric values are
//! accepted as well. Field order is preserved as received.

use serde_json::{Map, Number, Value};

use crate::error::PollError;

/// One status document, field name to scalar value, in received order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusDocument {
    fields: Map<String, Value>,
}

impl StatusDocument {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a document from a JSON string.
    pub fn parse(content: &str) -> Result<Self, PollError> {
        let value: Value = serde_json::from_str(content)?;
        Self::from_value(value)
    }

    /// Parse a document from raw response bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, PollError> {
        let value: Value = serde_json::from_slice(bytes)?;
        Self::from_value(value)
    }

    /// Wrap an already-parsed JSON value. Anything but an object is rejected.
    pub fn from_value(value: Value) -> Result<Self, PollError> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            _ => Err(PollError::NotAnObject),
        }
    }

    /// Append a field, replacing any previous value under the same key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Look up a single field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Iterate fields in the order they appeared in the response.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for StatusDocument {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut doc = Self::new();
        for (k, v) in iter {
            doc.insert(k, v);
        }
        doc
    }
}

/// String form of a value as a browser would display it.
///
/// Strings are shown verbatim, numbers without locale formatting, and
/// integral floats without a trailing `.0`.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => display_number(n),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => display_value(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

fn display_number(n: &Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        Some(f) if f == 0.0 => "0".to_string(),
        Some(f) if f.abs() >= 1e21 || f.abs() < 1e-6 => exponent_form(f),
        Some(f) if f.fract() == 0.0 && f.abs() < 1e21 => format!("{:.0}", f),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

/// `1e-7`, `1.5e+21`: exponent notation with an explicit sign on positive exponents.
fn exponent_form(f: f64) -> String {
    let s = format!("{:e}", f);
    match s.split_once('e') {
        Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
        _ => s,
    }
}

/// Numeric interpretation of a value using loose browser coercion.
///
/// Numeric strings are parsed after trimming, and the empty string counts as
/// zero. Returns `None` when the value has no finite numeric meaning.
pub fn numeric_value(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                0.0
            } else {
                s.parse::<f64>().ok()?
            }
        }
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Null => 0.0,
        Value::Array(_) | Value::Object(_) => return None,
    };
    n.is_finite().then_some(n)
}

/// Whether `value == 0` holds under loose browser equality.
///
/// Unlike [`numeric_value`], `null` is not equal to zero here.
pub fn loosely_equals_zero(value: &Value) -> bool {
    !value.is_null() && numeric_value(value) == Some(0.0)
}
