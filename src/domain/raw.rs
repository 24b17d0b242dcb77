use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One raw shipment record as returned by the upstream provider.
///
/// Field names and types vary by (trade type × trade country), so the record
/// is kept as an untyped key→value map at the ingestion edge. Only the
/// normalizer interprets it; everything downstream consumes the canonical
/// shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(pub Map<String, Value>);

impl RawRecord {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Wrap a JSON value; non-object values yield an empty record.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self(Map::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// A trimmed, non-empty string field. Numbers are stringified, so HS
    /// codes arriving as integers still read back.
    pub fn str_field(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// A numeric field. Upstream sends numbers both as JSON numbers and as
    /// strings ("1500000.00"); both parse here.
    pub fn f64_field(&self, key: &str) -> Option<f64> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// First present value among several candidate field names.
    pub fn first_str(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|k| self.str_field(k))
    }

    pub fn first_f64(&self, keys: &[&str]) -> Option<f64> {
        keys.iter().find_map(|k| self.f64_field(k))
    }

    /// Positive numeric field; zero and negative values read as absent,
    /// matching how the price ladder treats them.
    pub fn positive_f64(&self, key: &str) -> Option<f64> {
        self.f64_field(key).filter(|v| *v > 0.0)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
