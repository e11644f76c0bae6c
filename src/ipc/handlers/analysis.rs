use serde_json::json;

use crate::analysis::{self, HttpAnalysisClient};
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{ledger_key, store};
use crate::ipc::types::{AppState, Request};

fn analysis_prepare(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let key = ledger_key(req)?;
    let store = store(state)?;
    let prepared = analysis::prepare_analysis(
        store.kv(),
        key.user_email(),
        key.branch(),
        state.config.aggregation_options(),
        state.config.metrics.missing_sgpa,
    )?;
    Ok(json!(prepared))
}

fn analysis_run(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let key = ledger_key(req)?;
    let store = store(state)?;
    let client = HttpAnalysisClient::new(&state.config.analysis.endpoint);
    let outcome = analysis::run_analysis(
        store.kv(),
        &client,
        key.user_email(),
        key.branch(),
        state.config.aggregation_options(),
        state.config.metrics.missing_sgpa,
    )?;
    Ok(json!(outcome))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "analysis.prepare" => analysis_prepare(state, req),
        "analysis.run" => analysis_run(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
