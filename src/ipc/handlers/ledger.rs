use serde_json::json;

use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{
    form_text, ledger_key, require_confirmation, required_str, store, store_mut,
};
use crate::ipc::types::{AppState, Request};
use crate::metrics;
use crate::model::{SubjectDraft, DEFAULT_CREDITS};

fn semesters_list(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let key = ledger_key(req)?;
    let ledger = store(state)?.ledger(&key)?;

    let mut rows = Vec::with_capacity(ledger.semesters().len());
    for sem in ledger.semesters() {
        let mut row = serde_json::to_value(sem).map_err(|e| HandlerErr::new("serialize_failed", e.to_string()))?;
        row["sgpa"] = json!(metrics::sgpa(&sem.subjects));
        row["totalCredits"] = json!(sem.total_credits());
        rows.push(row);
    }
    let cgpa = metrics::cgpa(ledger.semesters(), state.config.metrics.missing_sgpa);

    Ok(json!({ "semesters": rows, "cgpa": cgpa }))
}

fn semesters_add(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let key = ledger_key(req)?;
    let semester = store_mut(state)?.add_semester(&key)?;
    Ok(json!({ "semester": semester }))
}

fn semesters_delete(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let key = ledger_key(req)?;
    let semester_id = required_str(req, "semesterId")?;
    require_confirmation(req, "semester")?;
    let removed = store_mut(state)?.delete_semester(&key, semester_id)?;
    Ok(json!({ "deleted": removed.id }))
}

/// Subject form fields with `credits` already resolved by the caller.
fn subject_draft(req: &Request, credits: String) -> Result<SubjectDraft, HandlerErr> {
    let name = form_text(req, "name")?;
    let marks = form_text(req, "marks")?;
    let mut draft = SubjectDraft::new(&name, &marks, &credits);
    if let Some(custom) = req.params.get("customName").and_then(|v| v.as_str()) {
        draft = draft.with_custom_name(custom);
    }
    Ok(draft)
}

/// Sent credits, or `fallback` when the field is absent. An explicit empty
/// value is passed through so validation rejects it.
fn credits_or(req: &Request, fallback: impl FnOnce() -> String) -> Result<String, HandlerErr> {
    match req.params.get("credits") {
        None => Ok(fallback()),
        Some(_) => form_text(req, "credits"),
    }
}

fn subjects_add(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let key = ledger_key(req)?;
    let semester_id = required_str(req, "semesterId")?;
    let credits = credits_or(req, || DEFAULT_CREDITS.to_string())?;
    let draft = subject_draft(req, credits)?;
    let subject = store_mut(state)?.add_subject(&key, semester_id, &draft)?;
    Ok(json!({ "subject": subject }))
}

fn subjects_update(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let key = ledger_key(req)?;
    let semester_id = required_str(req, "semesterId")?;
    let subject_id = required_str(req, "subjectId")?;
    // Leaving credits out of an edit keeps the stored value. An unknown id
    // resolves to empty credits and the store reports not_found first.
    let ledger = store(state)?.ledger(&key)?;
    let current = ledger
        .semester(semester_id)
        .ok()
        .and_then(|sem| sem.subjects.iter().find(|s| s.id() == subject_id))
        .map(|s| s.credits().to_string());
    let credits = credits_or(req, || current.unwrap_or_default())?;
    let draft = subject_draft(req, credits)?;
    let subject = store_mut(state)?.update_subject(&key, semester_id, subject_id, &draft)?;
    Ok(json!({ "subject": subject }))
}

fn subjects_delete(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let key = ledger_key(req)?;
    let semester_id = required_str(req, "semesterId")?;
    let subject_id = required_str(req, "subjectId")?;
    require_confirmation(req, "subject")?;
    let removed = store_mut(state)?.delete_subject(&key, semester_id, subject_id)?;
    Ok(json!({ "deleted": removed.id() }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "semesters.list" => semesters_list(state, req),
        "semesters.add" => semesters_add(state, req),
        "semesters.delete" => semesters_delete(state, req),
        "subjects.add" => subjects_add(state, req),
        "subjects.update" => subjects_update(state, req),
        "subjects.delete" => subjects_delete(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
