use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub status: CommandStatus,
    pub message: String,
    #[serde(default)]
    pub details: Value,
}

impl ExecutionOutcome {
    pub fn success(message: impl Into<String>, details: Value) -> Self {
        Self {
            status: CommandStatus::Ok,
            message: message.into(),
            details,
        }
    }

    pub fn failure(message: impl Into<String>, details: Value) -> Self {
        Self {
            status: CommandStatus::Failure,
            message: message.into(),
            details,
        }
    }

    /// Whether the message should be printed verbatim instead of as a status line.
    #[must_use]
    pub fn is_passthrough(&self) -> bool {
        self.details
            .as_object()
            .and_then(|map| map.get("passthrough"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CommandStatus {
    Ok,
    Failure,
}

impl CommandStatus {
    #[must_use]
    pub fn exit_code(self) -> i32 {
        match self {
            CommandStatus::Ok => 0,
            CommandStatus::Failure => 2,
        }
    }
}

#[must_use]
pub fn to_json_response(outcome: &ExecutionOutcome) -> Value {
    let status = match outcome.status {
        CommandStatus::Ok => "ok",
        CommandStatus::Failure => "error",
    };
    let details = match &outcome.details {
        Value::Object(_) => outcome.details.clone(),
        Value::Null => json!({}),
        other => json!({ "value": other }),
    };
    json!({
        "status": status,
        "message": outcome.message,
        "details": details,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_response_wraps_scalar_details() {
        let outcome = ExecutionOutcome::success("done", json!(3));
        let payload = to_json_response(&outcome);
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["message"], "done");
        assert_eq!(payload["details"]["value"], 3);
    }

    #[test]
    fn json_response_marks_failures_as_errors() {
        let outcome = ExecutionOutcome::failure("boom", Value::Null);
        let payload = to_json_response(&outcome);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["details"], json!({}));
        assert_eq!(outcome.status.exit_code(), 2);
    }

    #[test]
    fn passthrough_flag_is_read_from_details() {
        let plain = ExecutionOutcome::success("x", json!({ "archive": {} }));
        assert!(!plain.is_passthrough());
        let raw = ExecutionOutcome::success("{}", json!({ "passthrough": true }));
        assert!(raw.is_passthrough());
    }
}
