use crate::branch::{BRANCHES, DEFAULT_BRANCH};
use crate::config;
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::kv::SqliteKv;
use crate::ledger::AcademicRecordStore;
use serde_json::json;
use std::path::PathBuf;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string())
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    // Config first: a broken config.toml must not leave a half-opened workspace.
    let cfg = match config::ensure_workspace_config(&path) {
        Ok(cfg) => cfg,
        Err(e) => {
            return err(
                &req.id,
                "config_failed",
                e.to_string(),
                Some(json!({ "path": config::config_path(&path).to_string_lossy() })),
            )
        }
    };

    match db::open_db(&path) {
        Ok(conn) => {
            tracing::info!(workspace = %path.display(), "workspace opened");
            state.workspace = Some(path.clone());
            state.store = Some(AcademicRecordStore::new(SqliteKv::new(conn)));
            state.config = cfg;
            ok(
                &req.id,
                json!({
                    "workspacePath": path.to_string_lossy(),
                    "config": state.config,
                }),
            )
        }
        Err(e) => err(&req.id, "db_open_failed", format!("{e:?}"), None),
    }
}

fn handle_config_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, json!(state.config))
}

fn handle_branches_list(req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "branches": BRANCHES,
            "defaultBranch": DEFAULT_BRANCH,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        "config.get" => Some(handle_config_get(state, req)),
        "branches.list" => Some(handle_branches_list(req)),
        _ => None,
    }
}
