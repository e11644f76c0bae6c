use std::io;

use gradeledger::ipc;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    // stdout carries responses, so logs go to stderr.
    let filter = EnvFilter::try_from_env("GRADELEDGER_LOG")
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(false)
        .try_init();
}

fn main() {
    init_tracing();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "gradeledgerd started");

    let mut state = ipc::AppState::default();
    match ipc::serve(io::stdin().lock(), io::stdout().lock(), &mut state) {
        Ok(answered) => tracing::info!(answered, "stdin closed; exiting"),
        Err(e) => tracing::warn!(error = %e, "stdout closed; exiting"),
    }
}
