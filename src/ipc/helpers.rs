use serde_json::{json, Value};

use crate::branch::BranchCode;
use crate::ipc::error::HandlerErr;
use crate::ipc::types::{AppState, Request};
use crate::kv::SqliteKv;
use crate::ledger::{AcademicRecordStore, LedgerKey};

pub fn store_mut(state: &mut AppState) -> Result<&mut AcademicRecordStore<SqliteKv>, HandlerErr> {
    state
        .store
        .as_mut()
        .ok_or_else(|| HandlerErr::new("no_workspace", "select a workspace first"))
}

pub fn store(state: &AppState) -> Result<&AcademicRecordStore<SqliteKv>, HandlerErr> {
    state
        .store
        .as_ref()
        .ok_or_else(|| HandlerErr::new("no_workspace", "select a workspace first"))
}

pub fn required_str<'a>(req: &'a Request, name: &str) -> Result<&'a str, HandlerErr> {
    req.params
        .get(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {name}")))
}

/// Form field that the UI may send as a string or a number. Absent and null
/// read as empty text so that validation reports the missing field.
pub fn form_text(req: &Request, name: &str) -> Result<String, HandlerErr> {
    match req.params.get(name) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(other) => Err(HandlerErr {
            code: "bad_params",
            message: format!("{name} must be a string or number"),
            details: Some(json!({ name: other })),
        }),
    }
}

pub fn branch_param(req: &Request) -> Result<BranchCode, HandlerErr> {
    match req.params.get("branch") {
        None | Some(Value::Null) => Ok(BranchCode::default()),
        Some(Value::String(s)) => Ok(BranchCode::parse(s)?),
        Some(_) => Err(HandlerErr::bad_params("branch must be a string")),
    }
}

pub fn ledger_key(req: &Request) -> Result<LedgerKey, HandlerErr> {
    let email = required_str(req, "userEmail")?;
    let branch = branch_param(req)?;
    if !branch.is_known() {
        tracing::debug!(branch = %branch, "branch code outside the catalog");
    }
    Ok(LedgerKey::new(email, branch)?)
}

/// Destructive methods need `confirmed: true`, set once the user has accepted
/// the confirmation prompt.
pub fn require_confirmation(req: &Request, what: &str) -> Result<(), HandlerErr> {
    if req.params.get("confirmed").and_then(|v| v.as_bool()) == Some(true) {
        return Ok(());
    }
    Err(HandlerErr::new(
        "confirmation_required",
        format!("deleting a {what} must be confirmed"),
    ))
}
