use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// A single unit of telemetry flowing through the pipeline.
///
/// Records are created by instrumentation and treated as read-only by
/// processors and exporters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// What kind of telemetry this record carries.
    pub kind: RecordKind,

    /// Span name or log event name (e.g., "db.query", "agent.heartbeat").
    pub name: String,

    /// Hex-encoded trace identifier, if the record belongs to a trace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,

    /// Hex-encoded span identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span_id: Option<String>,

    /// Unix epoch milliseconds when the span started or the log was emitted.
    pub start_time: i64,

    /// Unix epoch milliseconds when the span ended (equal to `start_time` for logs).
    pub end_time: i64,

    /// Log severity, only meaningful for `RecordKind::Log`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,

    /// Log body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    /// Structured attributes.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl Record {
    /// Create a span record that starts now.
    pub fn span(name: impl Into<String>) -> Self {
        let now = current_timestamp_millis();
        Self {
            kind: RecordKind::Span,
            name: name.into(),
            trace_id: None,
            span_id: None,
            start_time: now,
            end_time: now,
            severity: None,
            body: None,
            attributes: BTreeMap::new(),
        }
    }

    /// Create a log record emitted now.
    pub fn log(name: impl Into<String>, severity: Severity, body: impl Into<String>) -> Self {
        let now = current_timestamp_millis();
        Self {
            kind: RecordKind::Log,
            name: name.into(),
            trace_id: None,
            span_id: None,
            start_time: now,
            end_time: now,
            severity: Some(severity),
            body: Some(body.into()),
            attributes: BTreeMap::new(),
        }
    }

    /// Attach trace and span identifiers.
    pub fn with_ids(mut self, trace_id: impl Into<String>, span_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self.span_id = Some(span_id.into());
        self
    }

    /// Add an attribute to this record.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Mark the record as finished at the given time.
    pub fn ended_at(mut self, end_time: i64) -> Self {
        self.end_time = end_time;
        self
    }

    /// Duration between start and end in milliseconds.
    pub fn duration_millis(&self) -> i64 {
        self.end_time.saturating_sub(self.start_time).max(0)
    }
}

/// Kind of telemetry carried by a [`Record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Span,
    Log,
}

impl RecordKind {
    /// Signal name used in key expressions.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Span => "spans",
            RecordKind::Log => "logs",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Log severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "trace",
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        }
    }
}

/// Typed attribute value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Double(f64),
    Text(String),
}

impl AttributeValue {
    /// Truncate text values to at most `max_chars` characters.
    ///
    /// Non-text values are left untouched.
    pub fn truncate(&mut self, max_chars: usize) {
        if let AttributeValue::Text(s) = self
            && let Some((idx, _)) = s.char_indices().nth(max_chars)
        {
            s.truncate(idx);
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        AttributeValue::Bool(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Int(v)
    }
}

impl From<u32> for AttributeValue {
    fn from(v: u32) -> Self {
        AttributeValue::Int(i64::from(v))
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Double(v)
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::Text(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::Text(v.to_string())
    }
}

/// Get the current timestamp in milliseconds since Unix epoch.
///
/// Returns 0 if system time is before Unix epoch (should never happen in practice).
pub fn current_timestamp_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_creation() {
        let record = Record::span("db.query")
            .with_ids("4bf92f3577b34da6a3ce929d0e0e4736", "00f067aa0ba902b7")
            .with_attribute("db.system", "postgresql")
            .with_attribute("db.rows", 42i64);

        assert_eq!(record.kind, RecordKind::Span);
        assert_eq!(record.name, "db.query");
        assert_eq!(record.span_id.as_deref(), Some("00f067aa0ba902b7"));
        assert_eq!(
            record.attributes.get("db.system"),
            Some(&AttributeValue::Text("postgresql".to_string()))
        );
        assert_eq!(record.attributes.get("db.rows"), Some(&AttributeValue::Int(42)));
        assert!(record.severity.is_none());
    }

    #[test]
    fn test_log_creation() {
        let record = Record::log("auth.failure", Severity::Warn, "invalid token");

        assert_eq!(record.kind, RecordKind::Log);
        assert_eq!(record.severity, Some(Severity::Warn));
        assert_eq!(record.body.as_deref(), Some("invalid token"));
        assert_eq!(record.start_time, record.end_time);
    }

    #[test]
    fn test_duration_never_negative() {
        let record = Record::span("clock.skew");
        let earlier = record.start_time - 10;
        let record = record.ended_at(earlier);
        assert_eq!(record.duration_millis(), 0);

        let record = Record::span("ok");
        let later = record.start_time + 25;
        assert_eq!(record.ended_at(later).duration_millis(), 25);
    }

    #[test]
    fn test_duration_with_extreme_timestamps() {
        let mut record = Record::span("decoded");
        record.start_time = i64::MIN;
        record.end_time = i64::MAX;
        assert_eq!(record.duration_millis(), i64::MAX);

        record.start_time = i64::MAX;
        record.end_time = i64::MIN;
        assert_eq!(record.duration_millis(), 0);
    }

    #[test]
    fn test_truncate_on_char_boundary() {
        let mut value = AttributeValue::from("héllo wörld");
        value.truncate(4);
        assert_eq!(value, AttributeValue::Text("héll".to_string()));

        let mut short = AttributeValue::from("ab");
        short.truncate(4);
        assert_eq!(short, AttributeValue::Text("ab".to_string()));

        let mut number = AttributeValue::Int(123456);
        number.truncate(2);
        assert_eq!(number, AttributeValue::Int(123456));
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(RecordKind::Span.to_string(), "spans");
        assert_eq!(RecordKind::Log.as_str(), "logs");
    }
}
