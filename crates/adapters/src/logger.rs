//! Structured logger adapters.
//!
//! [`JsonLogger`] writes one JSON object per line to a [`LogSink`].
//! [`TracingLogger`] forwards events to `tracing` so they share the
//! subscriber's text formatting. Both redact fields whose key looks secret.

use crate::log_sink::LogSink;
use prcheck_ports::{LogEvent, LogFields, LogLevel, LoggerPort};
use prcheck_shared::{REDACTED, is_secret_key};
use serde_json::Value;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// JSON logger emitting one line per event.
#[derive(Clone)]
pub struct JsonLogger {
    sink: Arc<dyn LogSink>,
    base_fields: LogFields,
    min_level: LogLevel,
}

impl JsonLogger {
    /// Create a JSON logger backed by the provided sink.
    #[must_use]
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self {
            sink,
            base_fields: LogFields::new(),
            min_level: LogLevel::Info,
        }
    }

    /// Set base fields applied to every event.
    #[must_use]
    pub fn with_base_fields(mut self, fields: LogFields) -> Self {
        self.base_fields = fields;
        self
    }

    /// Set the minimum log level.
    #[must_use]
    pub const fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }
}

impl LoggerPort for JsonLogger {
    fn log(&self, event: LogEvent) {
        if event.level < self.min_level {
            return;
        }

        let fields = merge_fields(&self.base_fields, event.fields);
        let mut error = event.error;
        if let Some(ref mut value) = error {
            redact_value(value);
        }

        let mut payload = serde_json::Map::new();
        payload.insert("timestamp_ms".to_owned(), Value::from(now_epoch_ms()));
        payload.insert("level".to_owned(), Value::from(event.level.as_str()));
        payload.insert("event".to_owned(), Value::from(event.event.as_ref()));
        payload.insert("message".to_owned(), Value::from(event.message.as_ref()));
        if !fields.is_empty() {
            payload.insert("fields".to_owned(), fields_to_json(&fields));
        }
        if let Some(error) = error {
            payload.insert("error".to_owned(), error);
        }

        let line = serde_json::to_string(&Value::Object(payload)).map_or_else(
            |_| {
                "{\"timestamp_ms\":0,\"level\":\"error\",\"event\":\"logger.serialize_failed\",\"message\":\"log serialization failed\"}\n"
                    .to_owned()
            },
            |mut encoded| {
                encoded.push('\n');
                encoded
            },
        );
        self.sink.write_line(&line);
    }

    fn child(&self, fields: LogFields) -> Box<dyn LoggerPort> {
        Box::new(Self {
            sink: Arc::clone(&self.sink),
            base_fields: merge_fields(&self.base_fields, Some(fields)),
            min_level: self.min_level,
        })
    }
}

/// Logger forwarding events to the `tracing` subscriber.
#[derive(Debug, Clone, Default)]
pub struct TracingLogger {
    base_fields: LogFields,
}

impl TracingLogger {
    /// Create a logger with the given base fields.
    #[must_use]
    pub const fn new(base_fields: LogFields) -> Self {
        Self { base_fields }
    }
}

impl LoggerPort for TracingLogger {
    fn log(&self, event: LogEvent) {
        let fields = merge_fields(&self.base_fields, event.fields);
        let fields = if fields.is_empty() {
            String::new()
        } else {
            fields_to_json(&fields).to_string()
        };
        let error = event.error.map(|mut error| {
            redact_value(&mut error);
            error.to_string()
        });
        let error = error.as_deref().unwrap_or_default();
        let name = event.event.as_ref();
        let message = event.message.as_ref();

        match event.level {
            LogLevel::Debug => {
                tracing::debug!(event = name, fields = %fields, error = error, "{message}");
            },
            LogLevel::Info => {
                tracing::info!(event = name, fields = %fields, error = error, "{message}");
            },
            LogLevel::Warn => {
                tracing::warn!(event = name, fields = %fields, error = error, "{message}");
            },
            LogLevel::Error => {
                tracing::error!(event = name, fields = %fields, error = error, "{message}");
            },
        }
    }

    fn child(&self, fields: LogFields) -> Box<dyn LoggerPort> {
        Box::new(Self {
            base_fields: merge_fields(&self.base_fields, Some(fields)),
        })
    }
}

fn merge_fields(base: &LogFields, extra: Option<LogFields>) -> LogFields {
    let mut merged = base.clone();
    merged.extend(extra.into_iter().flatten());
    redact_fields(&mut merged);
    merged
}

fn fields_to_json(fields: &LogFields) -> Value {
    Value::Object(
        fields
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect(),
    )
}

fn redact_fields(fields: &mut LogFields) {
    for (key, value) in fields.iter_mut() {
        if is_secret_key(key) {
            *value = Value::String(REDACTED.to_owned());
        } else {
            redact_value(value);
        }
    }
}

fn redact_value(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, nested) in map.iter_mut() {
                if is_secret_key(key) {
                    *nested = Value::String(REDACTED.to_owned());
                } else {
                    redact_value(nested);
                }
            }
        },
        Value::Array(items) => {
            for item in items {
                redact_value(item);
            }
        },
        _ => {},
    }
}

fn now_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|duration| u64::try_from(duration.as_millis()).ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_sink::MemoryLogSink;
    use serde_json::json;

    fn field(key: &str, value: Value) -> LogFields {
        let mut fields = LogFields::new();
        fields.insert(key.into(), value);
        fields
    }

    #[test]
    fn json_logger_redacts_sensitive_fields() -> Result<(), Box<dyn std::error::Error>> {
        let sink = Arc::new(MemoryLogSink::default());
        let logger = JsonLogger::new(sink.clone()).with_min_level(LogLevel::Debug);

        let mut fields = field("access_token", json!("oauthtoken"));
        fields.insert("repository".into(), json!("itsdalmo/test-repository"));
        logger.log(
            LogEvent::new(LogLevel::Info, "check.start", "checking", Some(fields)).with_error(
                json!({
                    "authorization": "bearer oauthtoken",
                    "nested": { "password": "nope", "status": 401 }
                }),
            ),
        );

        let lines = sink.take();
        assert_eq!(lines.len(), 1);
        assert!(!lines[0].contains("oauthtoken"));
        let payload: Value = serde_json::from_str(lines[0].trim())?;
        assert_eq!(payload["level"], json!("info"));
        assert_eq!(payload["event"], json!("check.start"));
        assert_eq!(payload["fields"]["access_token"], json!(REDACTED));
        assert_eq!(payload["fields"]["repository"], json!("itsdalmo/test-repository"));
        assert_eq!(payload["error"]["authorization"], json!(REDACTED));
        assert_eq!(payload["error"]["nested"]["password"], json!(REDACTED));
        assert_eq!(payload["error"]["nested"]["status"], json!(401));
        Ok(())
    }

    #[test]
    fn json_logger_filters_below_min_level() {
        let sink = Arc::new(MemoryLogSink::default());
        let logger = JsonLogger::new(sink.clone());

        logger.debug("check.predicate", "skipped", None);
        logger.warn("check.slow", "kept", None);

        let lines = sink.take();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("check.slow"));
    }

    #[test]
    fn child_logger_merges_fields() -> Result<(), Box<dyn std::error::Error>> {
        let sink = Arc::new(MemoryLogSink::default());
        let logger = JsonLogger::new(sink.clone())
            .with_base_fields(field("pipeline", json!("infra")))
            .with_min_level(LogLevel::Debug);

        let child = logger.child(field("correlation_id", json!("check_1")));
        child.info("check.completed", "done", Some(field("versions", json!(1))));

        let lines = sink.take();
        let payload: Value = serde_json::from_str(lines[0].trim())?;
        assert_eq!(payload["fields"]["pipeline"], json!("infra"));
        assert_eq!(payload["fields"]["correlation_id"], json!("check_1"));
        assert_eq!(payload["fields"]["versions"], json!(1));
        Ok(())
    }

    #[test]
    fn tracing_logger_child_keeps_base_fields_redacted() {
        let logger = TracingLogger::new(field("token", json!("secret")));
        let merged = merge_fields(&logger.base_fields, Some(field("job", json!("check"))));
        assert_eq!(merged.get("token"), Some(&json!(REDACTED)));
        assert_eq!(merged.get("job"), Some(&json!("check")));
        logger.child(LogFields::new()).info("check.start", "forwarded", None);
    }
}
