//! Known JSON log line schemas and the classifier that picks one.
//!
//! Each schema is identified by its marker key (`MessageTemplate` or `@mt`)
//! and then decoded with `serde`. Markers are checked in a fixed priority
//! order; the first one present decides the schema.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Which schema a line was decoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaKind {
    /// Verbose named-field format (`MessageTemplate`, `Level`, ...).
    Default,
    /// Terse `@`-prefixed format (`@mt`, `@l`, ...).
    Compact,
}

impl SchemaKind {
    /// Short name used in logs and CLI output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SchemaKind::Default => "default",
            SchemaKind::Compact => "compact",
        }
    }
}

impl std::fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A line in the verbose schema.
///
/// Only `MessageTemplate` is required; every other field may be absent.
///
/// ```json
/// {"Timestamp":"...","Level":"Information","MessageTemplate":"...","SourceContext":"...","Properties":{}}
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DefaultLine {
    #[serde(default, deserialize_with = "lenient_string")]
    pub timestamp: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub level: Option<String>,
    pub message_template: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub source_context: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub exception: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub renderings: Option<String>,
    #[serde(default)]
    pub properties: Option<Map<String, Value>>,
}

/// A line in the compact schema.
///
/// Every top-level key that does not start with `@` and is not
/// `SourceContext` ends up in [`CompactLine::extra`].
#[derive(Debug, Clone, Deserialize)]
pub struct CompactLine {
    #[serde(rename = "@mt")]
    pub message_template: String,
    #[serde(rename = "@t", default, deserialize_with = "lenient_string")]
    pub timestamp: Option<String>,
    #[serde(rename = "@l", default, deserialize_with = "lenient_string")]
    pub level: Option<String>,
    #[serde(rename = "@x", default, deserialize_with = "lenient_string")]
    pub exception: Option<String>,
    #[serde(rename = "@i", default, deserialize_with = "lenient_string")]
    pub event_id: Option<String>,
    #[serde(rename = "@r", default, deserialize_with = "lenient_string")]
    pub renderings: Option<String>,
    #[serde(rename = "@tr", default, deserialize_with = "lenient_string")]
    pub trace_id: Option<String>,
    #[serde(rename = "@sp", default, deserialize_with = "lenient_string")]
    pub span_id: Option<String>,
    #[serde(rename = "SourceContext", default, deserialize_with = "lenient_string")]
    pub source_context: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CompactLine {
    /// Split off the user properties, dropping any unmapped `@` keys.
    #[must_use]
    pub fn take_properties(&mut self) -> Map<String, Value> {
        std::mem::take(&mut self.extra)
            .into_iter()
            .filter(|(key, _)| !key.starts_with('@'))
            .collect()
    }
}

/// Outcome of classifying one decoded line.
#[derive(Debug, Clone)]
pub enum ClassifiedLine {
    Default(DefaultLine),
    Compact(CompactLine),
    /// JSON that fits none of the known schemas.
    Unrecognized,
}

impl ClassifiedLine {
    /// The matched schema, if any.
    #[must_use]
    pub fn kind(&self) -> Option<SchemaKind> {
        match self {
            ClassifiedLine::Default(_) => Some(SchemaKind::Default),
            ClassifiedLine::Compact(_) => Some(SchemaKind::Compact),
            ClassifiedLine::Unrecognized => None,
        }
    }
}

/// Marker key of the verbose schema.
const DEFAULT_MARKER: &str = "MessageTemplate";

/// Marker key of the compact schema.
const COMPACT_MARKER: &str = "@mt";

/// Classify a decoded JSON value.
///
/// Markers are checked in priority order: default, then compact. A value
/// carrying both is decoded as default only. A line whose marker is present
/// but whose fields do not decode (for example a non-string template) is
/// unrecognized; it never falls back to the other schema.
#[must_use]
pub fn classify(value: &Value) -> ClassifiedLine {
    let Some(object) = value.as_object() else {
        return ClassifiedLine::Unrecognized;
    };
    if object.contains_key(DEFAULT_MARKER) {
        return DefaultLine::deserialize(value)
            .map_or(ClassifiedLine::Unrecognized, ClassifiedLine::Default);
    }
    if object.contains_key(COMPACT_MARKER) {
        return CompactLine::deserialize(value)
            .map_or(ClassifiedLine::Unrecognized, ClassifiedLine::Compact);
    }
    ClassifiedLine::Unrecognized
}

/// Accept any JSON value for an optional text field.
///
/// `null` is absent, strings pass through, everything else is kept as
/// compact JSON text.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}
