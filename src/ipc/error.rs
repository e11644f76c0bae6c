use serde_json::{json, Value};

use crate::error::LedgerError;

pub fn ok(id: &str, result: Value) -> Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(id: &str, code: &str, message: impl Into<String>, details: Option<Value>) -> Value {
    json!({
        "id": id,
        "ok": false,
        "error": error_body(code, message.into(), details),
    })
}

/// Reply to a line that did not parse, so there is no id to echo.
pub fn bad_json(message: impl Into<String>) -> Value {
    json!({
        "ok": false,
        "error": error_body("bad_json", message.into(), None),
    })
}

fn error_body(code: &str, message: String, details: Option<Value>) -> Value {
    let mut error = json!({
        "code": code,
        "message": message,
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    error
}

/// Handler failure carrying the wire code.
pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<Value>,
}

impl HandlerErr {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn bad_params(message: impl Into<String>) -> Self {
        Self::new("bad_params", message)
    }

    pub fn response(self, id: &str) -> Value {
        err(id, self.code, self.message, self.details)
    }
}

impl From<LedgerError> for HandlerErr {
    fn from(e: LedgerError) -> Self {
        if matches!(e, LedgerError::Storage(_) | LedgerError::CorruptLedger { .. }) {
            tracing::warn!(code = e.code(), error = %e, "ledger operation failed");
        }
        Self {
            code: e.code(),
            message: e.to_string(),
            details: e.details(),
        }
    }
}

pub fn respond(id: &str, result: Result<Value, HandlerErr>) -> Value {
    match result {
        Ok(v) => ok(id, v),
        Err(e) => e.response(id),
    }
}
