use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
};

use chrono::Utc;
use serde::Serialize;

use crate::{diagnosis::Outcome, errors::Error, Result};

// ============== Timestamp Helpers ==============

/// RFC3339 timestamp in UTC (for logs/telemetry).
pub fn iso_timestamp_utc() -> String {
    Utc::now().to_rfc3339()
}

// ============== Audit Logging ==============

const AUDIT_MAX_TEXT: usize = 500;

#[derive(Clone, Debug, Serialize)]
pub struct AuditEvent {
    pub timestamp: String,
    pub event: String,
    pub user_id: i64,
    pub username: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorized: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answered: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<f64>,
}

impl AuditEvent {
    fn base(event: &str, user_id: i64, username: &str) -> Self {
        Self {
            timestamp: iso_timestamp_utc(),
            event: event.to_string(),
            user_id,
            username: username.to_string(),
            authorized: None,
            question_index: None,
            content: None,
            score: None,
            answered: None,
            diagnosis: None,
            error: None,
            retry_after: None,
        }
    }

    pub fn auth(user_id: i64, username: &str, authorized: bool) -> Self {
        Self {
            authorized: Some(authorized),
            ..Self::base("auth", user_id, username)
        }
    }

    pub fn quiz_start(user_id: i64, username: &str, restarted: bool) -> Self {
        Self {
            content: restarted.then(|| "restarted".to_string()),
            ..Self::base("quiz_start", user_id, username)
        }
    }

    /// `question_index` is the question the raw text answered.
    pub fn answer(user_id: i64, username: &str, question_index: usize, raw: &str) -> Self {
        Self {
            question_index: Some(question_index),
            content: Some(raw.to_string()),
            ..Self::base("answer", user_id, username)
        }
    }

    pub fn quiz_result(user_id: i64, username: &str, outcome: &Outcome) -> Self {
        Self {
            score: Some(outcome.score),
            answered: Some(outcome.answered),
            diagnosis: Some(format!("{:?}", outcome.diagnosis).to_lowercase()),
            ..Self::base("quiz_result", user_id, username)
        }
    }

    pub fn quiz_cancel(user_id: i64, username: &str, had_session: bool) -> Self {
        Self {
            content: (!had_session).then(|| "no active quiz".to_string()),
            ..Self::base("quiz_cancel", user_id, username)
        }
    }

    pub fn error(user_id: i64, username: &str, error: &str) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::base("error", user_id, username)
        }
    }

    pub fn rate_limit(user_id: i64, username: &str, retry_after: f64) -> Self {
        Self {
            retry_after: Some(retry_after),
            ..Self::base("rate_limit", user_id, username)
        }
    }
}

/// Append-only audit trail (JSON lines or readable blocks).
#[derive(Clone, Debug)]
pub struct AuditLogger {
    path: PathBuf,
    json: bool,
}

impl AuditLogger {
    pub fn new(path: impl Into<PathBuf>, json: bool) -> Self {
        Self {
            path: path.into(),
            json,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, mut event: AuditEvent) -> Result<()> {
        if let Some(s) = &event.content {
            event.content = Some(truncate_text(s, AUDIT_MAX_TEXT));
        }
        if let Some(s) = &event.error {
            event.error = Some(truncate_text(s, AUDIT_MAX_TEXT));
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        if self.json {
            let line = serde_json::to_string(&event)?;
            writeln!(file, "{line}")?;
            return Ok(());
        }

        // Plain text format for readability.
        let mut out = String::new();
        out.push('\n');
        out.push_str(&"=".repeat(60));

        let value = serde_json::to_value(&event)?;
        let Some(obj) = value.as_object() else {
            return Err(Error::External(
                "audit event is not a JSON object".to_string(),
            ));
        };
        for (k, v) in obj {
            out.push('\n');
            out.push_str(k);
            out.push_str(": ");
            out.push_str(&json_value_to_display(v));
        }
        out.push('\n');

        file.write_all(out.as_bytes())?;
        Ok(())
    }

    /// Write and only log failures; auditing never breaks a conversation.
    pub fn record(&self, event: AuditEvent) {
        let name = event.event.clone();
        if let Err(e) = self.write(event) {
            tracing::warn!(event = %name, path = %self.path.display(), "audit write failed: {e}");
        }
    }
}

pub fn truncate_text(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let mut out = s.chars().take(max_len).collect::<String>();
    out.push_str("...");
    out
}

fn json_value_to_display(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::Null => "null".to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.to_string(),
        other => serde_json::to_string(other).unwrap_or_else(|_| "<unprintable>".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnosis::Diagnosis;

    fn tmp_file(prefix: &str) -> PathBuf {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let pid = std::process::id();
        PathBuf::from(format!("/tmp/{prefix}-{pid}-{ts}.log"))
    }

    #[test]
    fn truncate_text_adds_ellipsis() {
        let s = "a".repeat(AUDIT_MAX_TEXT + 10);
        let t = truncate_text(&s, AUDIT_MAX_TEXT);
        assert!(t.ends_with("..."));
        assert_eq!(t.chars().count(), AUDIT_MAX_TEXT + 3);
        assert_eq!(truncate_text("short", AUDIT_MAX_TEXT), "short");
    }

    #[test]
    fn audit_truncates_answer_text() {
        let log = AuditLogger::new(tmp_file("scb-audit-test"), true);
        let content = "x".repeat(AUDIT_MAX_TEXT + 1);
        let ev = AuditEvent::answer(1, "u", 3, &content);

        log.write(ev).unwrap();
        let written = std::fs::read_to_string(log.path()).unwrap();
        assert!(written.contains("..."));
        assert!(written.contains("\"question_index\":3"));

        let _ = std::fs::remove_file(log.path());
    }

    #[test]
    fn plain_format_writes_result_fields() {
        let log = AuditLogger::new(tmp_file("scb-audit-plain"), false);
        let outcome = Outcome {
            score: 35,
            answered: 57,
            total: 57,
            threshold: 35,
            diagnosis: Diagnosis::Positive,
        };
        log.write(AuditEvent::quiz_result(7, "sleepy", &outcome)).unwrap();

        let written = std::fs::read_to_string(log.path()).unwrap();
        assert!(written.contains("event: quiz_result"));
        assert!(written.contains("score: 35"));
        assert!(written.contains("diagnosis: positive"));
        assert!(!written.contains("retry_after"));

        let _ = std::fs::remove_file(log.path());
    }
}
