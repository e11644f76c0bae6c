use std::io::{self, BufRead, Write};

use super::error::bad_json;
use super::router::handle_request;
use super::types::{AppState, Request};

/// Answers one JSON request per input line until EOF. Blank lines are
/// ignored; a line that is not a request gets a `bad_json` reply without id.
/// Returns the number of lines answered. A failed write ends the session
/// since the peer is gone.
pub fn serve<R: BufRead, W: Write>(input: R, mut output: W, state: &mut AppState) -> io::Result<usize> {
    let mut answered = 0usize;
    for line in input.lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "stdin read failed; stopping");
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let resp = match serde_json::from_str::<Request>(line) {
            Ok(req) => handle_request(state, req),
            Err(e) => {
                tracing::warn!(error = %e, "unparseable request line");
                bad_json(e.to_string())
            }
        };
        writeln!(output, "{resp}")?;
        output.flush()?;
        answered += 1;
    }
    Ok(answered)
}
