//! Canonical log record and the line normalizer.

use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::error::NormalizeError;
use super::schema::{classify, ClassifiedLine, CompactLine, DefaultLine};

/// Stand-in for a timestamp or level whose key is missing entirely.
const MISSING_FIELD: &str = "-";

/// One parsed log line, independent of the schema it came from.
///
/// Records are immutable once built; optional fields are `None` exactly when
/// the source line did not carry them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    /// Unique per record. Identity only, never used for ordering.
    pub id: String,
    pub timestamp: String,
    pub level: String,
    pub message_template: String,
    pub properties: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renderings: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span_id: Option<String>,
}

impl LogRecord {
    /// Parse and normalize one raw line.
    ///
    /// # Errors
    ///
    /// Returns `NormalizeError::InvalidJson` if the line is not JSON, or
    /// `NormalizeError::Unrecognized` if it matches no known schema.
    pub fn parse(line: &str) -> Result<Self, NormalizeError> {
        let value: Value = serde_json::from_str(line.trim())?;
        match classify(&value) {
            ClassifiedLine::Default(line) => Ok(line.into()),
            ClassifiedLine::Compact(line) => Ok(line.into()),
            ClassifiedLine::Unrecognized => Err(NormalizeError::Unrecognized),
        }
    }

    /// Look up a property value as display text.
    ///
    /// Strings are returned verbatim, other values as compact JSON.
    #[must_use]
    pub fn property_text(&self, key: &str) -> Option<String> {
        self.properties.get(key).map(property_text)
    }
}

/// Render a property value for display.
#[must_use]
pub fn property_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn next_id() -> String {
    Uuid::new_v4().to_string()
}

impl From<DefaultLine> for LogRecord {
    fn from(line: DefaultLine) -> Self {
        let properties = line.properties.unwrap_or_default();
        // Serilog's JSON formatter nests the logger name inside the properties.
        let source_context = line.source_context.or_else(|| {
            properties
                .get("SourceContext")
                .and_then(Value::as_str)
                .map(String::from)
        });

        Self {
            id: next_id(),
            timestamp: line
                .timestamp
                .unwrap_or_else(|| MISSING_FIELD.to_string()),
            level: line.level.unwrap_or_else(|| MISSING_FIELD.to_string()),
            message_template: line.message_template,
            properties,
            source_context,
            exception: line.exception,
            event_id: None,
            renderings: line.renderings,
            trace_id: None,
            span_id: None,
        }
    }
}

impl From<CompactLine> for LogRecord {
    fn from(mut line: CompactLine) -> Self {
        let properties = line.take_properties();

        Self {
            id: next_id(),
            timestamp: line
                .timestamp
                .unwrap_or_else(|| MISSING_FIELD.to_string()),
            level: line.level.unwrap_or_else(|| MISSING_FIELD.to_string()),
            message_template: line.message_template,
            properties,
            source_context: line.source_context,
            exception: line.exception,
            event_id: line.event_id,
            renderings: line.renderings,
            trace_id: line.trace_id,
            span_id: line.span_id,
        }
    }
}

/// Normalize one raw line, logging a warning when it yields no record.
#[must_use]
pub fn normalize(line: &str) -> Option<LogRecord> {
    match LogRecord::parse(line) {
        Ok(record) => Some(record),
        Err(e) => {
            tracing::warn!(line = %line, error = %e, "Skipping unparseable log line");
            None
        }
    }
}

/// Normalize every non-blank line of already-loaded content.
///
/// Lines that fail to normalize are skipped with a warning.
#[must_use]
pub fn parse_log_content(content: &str) -> Vec<LogRecord> {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(normalize)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const DEFAULT_LINE: &str = r#"{"Timestamp":"2024-01-01T00:00:00Z","Level":"Information","MessageTemplate":"hello","SourceContext":"App.Main","Properties":{"User":"alice","Nested":{"a":1}}}"#;

    const COMPACT_LINE: &str = r#"{"@t":"2024-01-01T00:00:01.123Z","@mt":"world","@l":"Error","@x":"System.Exception: boom","@i":"a1b2","@r":"rendered","@tr":"trace-1","@sp":"span-1","SourceContext":"App.Worker","CustomKey":"value"}"#;

    #[test]
    fn test_default_fields_pass_through() {
        let record = LogRecord::parse(DEFAULT_LINE).unwrap();
        assert_eq!(record.timestamp, "2024-01-01T00:00:00Z");
        assert_eq!(record.level, "Information");
        assert_eq!(record.message_template, "hello");
        assert_eq!(record.source_context.as_deref(), Some("App.Main"));
        assert_eq!(record.properties.get("Nested"), Some(&json!({"a": 1})));
        assert_eq!(record.exception, None);
        assert_eq!(record.trace_id, None);
    }

    #[test]
    fn test_compact_fields_mapped() {
        let record = LogRecord::parse(COMPACT_LINE).unwrap();
        assert_eq!(record.timestamp, "2024-01-01T00:00:01.123Z");
        assert_eq!(record.level, "Error");
        assert_eq!(record.message_template, "world");
        assert_eq!(record.exception.as_deref(), Some("System.Exception: boom"));
        assert_eq!(record.event_id.as_deref(), Some("a1b2"));
        assert_eq!(record.renderings.as_deref(), Some("rendered"));
        assert_eq!(record.trace_id.as_deref(), Some("trace-1"));
        assert_eq!(record.span_id.as_deref(), Some("span-1"));
        assert_eq!(record.source_context.as_deref(), Some("App.Worker"));
        assert_eq!(record.properties.len(), 1);
        assert_eq!(record.property_text("CustomKey").as_deref(), Some("value"));
    }

    #[test]
    fn test_compact_placeholders_only_when_absent() {
        let record = LogRecord::parse(r#"{"@mt":"bare"}"#).unwrap();
        assert_eq!(record.timestamp, "-");
        assert_eq!(record.level, "-");

        let record = LogRecord::parse(r#"{"@mt":"empty","@t":"","@l":""}"#).unwrap();
        assert_eq!(record.timestamp, "");
        assert_eq!(record.level, "");
    }

    #[test]
    fn test_level_is_not_coerced() {
        let record = LogRecord::parse(r#"{"@mt":"m","@l":"WaRnInG"}"#).unwrap();
        assert_eq!(record.level, "WaRnInG");
    }

    #[test]
    fn test_default_source_context_from_properties() {
        let line = r#"{"Timestamp":"t","Level":"Debug","MessageTemplate":"m","Properties":{"SourceContext":"App.Nested"}}"#;
        let record = LogRecord::parse(line).unwrap();
        assert_eq!(record.source_context.as_deref(), Some("App.Nested"));
    }

    #[test]
    fn test_default_missing_properties_is_empty() {
        let line = r#"{"Timestamp":"t","Level":"Debug","MessageTemplate":"m"}"#;
        let record = LogRecord::parse(line).unwrap();
        assert!(record.properties.is_empty());
        assert_eq!(record.source_context, None);
    }

    #[test]
    fn test_default_without_level_or_timestamp_uses_placeholders() {
        let record = LogRecord::parse(r#"{"Timestamp":"t","MessageTemplate":"no level"}"#).unwrap();
        assert_eq!(record.timestamp, "t");
        assert_eq!(record.level, "-");

        let record = LogRecord::parse(r#"{"MessageTemplate":"verbose","@mt":"terse"}"#).unwrap();
        assert_eq!(record.message_template, "verbose");
        assert_eq!(record.timestamp, "-");
        assert!(record.properties.is_empty());
    }

    #[test]
    fn test_default_numeric_timestamp_is_kept() {
        let line = r#"{"Timestamp":1704067200,"Level":"Error","MessageTemplate":"m"}"#;
        let record = LogRecord::parse(line).unwrap();
        assert_eq!(record.timestamp, "1704067200");
        assert_eq!(record.level, "Error");
    }

    #[test]
    fn test_invalid_json() {
        let err = LogRecord::parse("not-json").unwrap_err();
        assert!(matches!(err, NormalizeError::InvalidJson(_)));
        assert!(normalize("not-json").is_none());
    }

    #[test]
    fn test_unrecognized_json() {
        let err = LogRecord::parse(r#"{"foo":"bar"}"#).unwrap_err();
        assert!(matches!(err, NormalizeError::Unrecognized));
    }

    #[test]
    fn test_same_line_twice_differs_only_in_id() {
        let a = LogRecord::parse(COMPACT_LINE).unwrap();
        let b = LogRecord::parse(COMPACT_LINE).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(LogRecord { id: String::new(), ..a }, LogRecord { id: String::new(), ..b });
    }

    #[test]
    fn test_serialized_shape_omits_absent_fields() {
        let record = LogRecord::parse(r#"{"@mt":"m","@l":"Error"}"#).unwrap();
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["messageTemplate"], "m");
        assert!(value.get("exception").is_none());
        assert!(value.get("traceId").is_none());
    }

    #[test]
    fn test_parse_log_content_skips_bad_lines() {
        let content = format!("{DEFAULT_LINE}\nnot-json\n\n{COMPACT_LINE}\n{{\"foo\":1}}\n");
        let records = parse_log_content(&content);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].message_template, "hello");
        assert_eq!(records[1].message_template, "world");
    }

    #[test]
    fn test_property_text_renders_non_strings_as_json() {
        assert_eq!(property_text(&json!("plain")), "plain");
        assert_eq!(property_text(&json!(3)), "3");
        assert_eq!(property_text(&json!({"k": [1]})), r#"{"k":[1]}"#);
    }
}
