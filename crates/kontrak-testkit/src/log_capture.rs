//! Structured JSONL capture for test result entries.

use parking_lot::Mutex;
use serde_json::Value;
use thiserror::Error;

/// Fields every captured entry must carry.
pub const REQUIRED_FIELDS: &[&str] = &["timestamp", "level", "test_name", "module", "result"];

/// Rejected capture entry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LogCaptureError {
    /// The entry is not a JSON object.
    #[error("log entry must be a JSON object")]
    NotAnObject,
    /// A required field is missing.
    #[error("log entry is missing required field `{0}`")]
    MissingField(&'static str),
}

/// Collects structured test log entries as JSON lines.
#[derive(Debug, Default)]
pub struct LogCapture {
    lines: Mutex<Vec<String>>,
}

impl LogCapture {
    /// Create an empty capture.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and append an entry.
    pub fn push_value(&self, entry: &Value) -> Result<(), LogCaptureError> {
        let object = entry.as_object().ok_or(LogCaptureError::NotAnObject)?;
        if let Some(missing) = REQUIRED_FIELDS
            .iter()
            .find(|field| !object.contains_key(**field))
        {
            return Err(LogCaptureError::MissingField(missing));
        }
        self.lines.lock().push(entry.to_string());
        Ok(())
    }

    /// Captured entries.
    #[must_use]
    pub fn entries(&self) -> Vec<Value> {
        self.lines
            .lock()
            .iter()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }

    /// Captured entries rendered as JSONL.
    #[must_use]
    pub fn to_jsonl(&self) -> String {
        let lines = self.lines.lock();
        let mut out = lines.join("\n");
        if !lines.is_empty() {
            out.push('\n');
        }
        out
    }

    /// Assert that every entry parses and that no bearer credential leaked.
    ///
    /// # Panics
    ///
    /// Panics on an unparsable line or a line containing `Bearer `.
    pub fn assert_valid(&self) {
        for (idx, line) in self.lines.lock().iter().enumerate() {
            assert!(
                serde_json::from_str::<Value>(line).is_ok(),
                "line {} is not valid JSON: {line}",
                idx + 1
            );
            assert!(
                !line.contains("Bearer "),
                "line {} leaks a bearer credential",
                idx + 1
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry() -> Value {
        json!({
            "timestamp": "2026-01-01T00:00:00Z",
            "level": "info",
            "test_name": "t",
            "module": "m",
            "result": "pass"
        })
    }

    #[test]
    fn accepts_complete_entries() {
        let capture = LogCapture::new();
        capture.push_value(&entry()).expect("valid entry");
        assert_eq!(capture.entries().len(), 1);
        assert!(capture.to_jsonl().ends_with('\n'));
        capture.assert_valid();
    }

    #[test]
    fn rejects_incomplete_entries() {
        let capture = LogCapture::new();
        let mut incomplete = entry();
        incomplete.as_object_mut().expect("object").remove("module");
        assert_eq!(
            capture.push_value(&incomplete),
            Err(LogCaptureError::MissingField("module"))
        );
        assert_eq!(
            capture.push_value(&json!("text")),
            Err(LogCaptureError::NotAnObject)
        );
        assert!(capture.entries().is_empty());
    }

    #[test]
    #[should_panic(expected = "leaks a bearer credential")]
    fn flags_leaked_tokens() {
        let capture = LogCapture::new();
        let mut leaky = entry();
        leaky["details"] = json!({"header": "Bearer abc"});
        capture.push_value(&leaky).expect("valid shape");
        capture.assert_valid();
    }
}
