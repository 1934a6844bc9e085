use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Keys the detector writes on results; stripped from pass-through fields
const RESERVED_KEYS: &[&str] = &["message", "predict_id", "anomaly_score", "anomaly", "scored_at"];

/// One raw log line as delivered by a data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub message: String,

    /// Every other field of the original document
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl LogRecord {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fields: Map::new(),
        }
    }

    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// Build from a JSON document. Elasticsearch-style `_source` wrappers are
    /// unwrapped; non-object values become the message text.
    pub fn from_json(value: Value) -> Self {
        let value = match value {
            Value::Object(mut obj) if obj.contains_key("_source") => {
                obj.remove("_source").unwrap_or(Value::Object(obj))
            }
            other => other,
        };

        match value {
            Value::Object(mut fields) => {
                let message = match fields.remove("message") {
                    Some(Value::String(s)) => s,
                    Some(Value::Null) | None => String::new(),
                    Some(other) => other.to_string(),
                };
                Self { message, fields }
            }
            Value::String(s) => Self::new(s),
            other => Self::new(other.to_string()),
        }
    }
}

/// A scored record, emitted downstream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyResult {
    pub predict_id: Uuid,
    pub message: String,
    pub anomaly_score: f64,
    pub anomaly: bool,
    pub scored_at: DateTime<Utc>,

    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl AnomalyResult {
    /// Attach a score, decision and a fresh prediction id to a record
    pub fn new(record: &LogRecord, score: f64, anomaly: bool) -> Self {
        let mut fields = record.fields.clone();
        for key in RESERVED_KEYS {
            fields.remove(*key);
        }

        Self {
            predict_id: Uuid::new_v4(),
            message: record.message.clone(),
            anomaly_score: score,
            anomaly,
            scored_at: Utc::now(),
            fields,
        }
    }
}
