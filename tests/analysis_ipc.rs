use serde_json::json;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::mpsc;
use std::thread;

const USER: &str = "student@uni.edu";

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_gradeledgerd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn gradeledgerd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(true),
        "{method} failed: {value}"
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn write_config(workspace: &Path, endpoint: &str) {
    let dir = workspace.join(".gradeledger");
    std::fs::create_dir_all(&dir).expect("config dir");
    std::fs::write(
        dir.join("config.toml"),
        format!("[analysis]\nendpoint = \"{endpoint}\"\n"),
    )
    .expect("write config");
}

/// Serves a single HTTP request with `body` and hands back the request body.
fn one_shot_server(body: serde_json::Value) -> (String, mpsc::Receiver<serde_json::Value>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept");
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        let (head_end, content_length) = loop {
            let n = stream.read(&mut chunk).expect("read request");
            assert!(n > 0, "connection closed before headers");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..pos]).to_ascii_lowercase();
                let len = head
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                break (pos + 4, len);
            }
        };
        while buf.len() < head_end + content_length {
            let n = stream.read(&mut chunk).expect("read body");
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        let sent: serde_json::Value =
            serde_json::from_slice(&buf[head_end..head_end + content_length]).expect("json body");
        let _ = tx.send(sent);

        let payload = body.to_string();
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            payload.len(),
            payload
        );
        stream.write_all(response.as_bytes()).expect("write response");
    });
    (format!("http://{addr}/api/analyze-performance/"), rx)
}

fn add_semester_with(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    branch: &str,
    subjects: &[(&str, &str, &str)],
) -> String {
    let sem = request_ok(
        stdin,
        reader,
        "sem",
        "semesters.add",
        json!({ "userEmail": USER, "branch": branch }),
    );
    let sem_id = sem["semester"]["id"].as_str().expect("id").to_string();
    for (name, marks, credits) in subjects {
        let _ = request_ok(
            stdin,
            reader,
            "subj",
            "subjects.add",
            json!({
                "userEmail": USER,
                "branch": branch,
                "semesterId": sem_id,
                "name": name,
                "marks": marks,
                "credits": credits
            }),
        );
    }
    sem_id
}

#[test]
fn prepare_reports_insufficient_data_then_builds_payload() {
    let workspace = tempfile::tempdir().expect("tempdir");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "ws",
        "workspace.select",
        json!({ "path": workspace.path().to_string_lossy() }),
    );

    let empty = request(
        &mut stdin,
        &mut reader,
        "p0",
        "analysis.prepare",
        json!({ "userEmail": USER }),
    );
    assert_eq!(empty["error"]["code"], "insufficient_data");
    assert_eq!(empty["error"]["details"]["reason"], "noSemesters");

    let _ = add_semester_with(&mut stdin, &mut reader, "CSE", &[]);
    let no_subjects = request(
        &mut stdin,
        &mut reader,
        "p1",
        "analysis.prepare",
        json!({ "userEmail": USER }),
    );
    assert_eq!(no_subjects["error"]["details"]["reason"], "noSubjects");

    // ECE semester 1 is written later than the empty CSE semester 1.
    std::thread::sleep(std::time::Duration::from_millis(5));
    let _ = add_semester_with(
        &mut stdin,
        &mut reader,
        "ECE",
        &[("Calculus", "80", "3"), ("Physics", "60", "1")],
    );

    let prepared = request_ok(
        &mut stdin,
        &mut reader,
        "p2",
        "analysis.prepare",
        json!({ "userEmail": USER, "branch": "CSE" }),
    );
    assert_eq!(prepared["semesters"].as_array().map(Vec::len), Some(1));
    assert_eq!(prepared["semesters"][0]["sgpa"], 7.5);
    assert_eq!(prepared["cgpa"], 7.5);
    assert_eq!(prepared["payload"]["semesters"][0]["subjects"][0]["grade"], "B");
    assert!(!prepared.to_string().contains("N/A"));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn run_posts_payload_and_returns_trend() {
    let workspace = tempfile::tempdir().expect("tempdir");
    let (endpoint, seen) = one_shot_server(json!({
        "sgpa_prediction": {
            "future_semesters": [3],
            "predicted_sgpas": [9.1],
            "performance_trend": "Improving",
            "slope": 0.8
        },
        "strengths_weaknesses": null,
        "elective_recommendations": null,
        "specialization_recommendations": null
    }));
    write_config(workspace.path(), &endpoint);

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "ws",
        "workspace.select",
        json!({ "path": workspace.path().to_string_lossy() }),
    );
    let _ = add_semester_with(&mut stdin, &mut reader, "CSE", &[("Calculus", "80", "3")]);
    let _ = add_semester_with(
        &mut stdin,
        &mut reader,
        "CSE",
        &[("Data Structures", "92", "4")],
    );

    let run = request_ok(
        &mut stdin,
        &mut reader,
        "r1",
        "analysis.run",
        json!({ "userEmail": USER }),
    );
    let sent = seen.recv().expect("request body");
    assert_eq!(sent["semesters"][0]["sgpa"], 8.0);
    assert_eq!(sent["semesters"][1]["subjects"][0]["name"], "Data Structures");

    assert_eq!(run["cgpa"], 9.0);
    assert_eq!(run["analysis"]["sgpa_prediction"]["slope"], 0.8);
    assert_eq!(run["trend"]["labels"], json!(["S1", "S2", "S3"]));
    assert_eq!(run["trend"]["connection"], json!([null, 10.0, 9.1]));
    assert_eq!(run["trendMessage"], "Keep up the good work!");

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn unreachable_service_is_transport_error_and_ledger_unchanged() {
    let workspace = tempfile::tempdir().expect("tempdir");
    write_config(workspace.path(), "http://127.0.0.1:9/api/analyze-performance/");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "ws",
        "workspace.select",
        json!({ "path": workspace.path().to_string_lossy() }),
    );
    let _ = add_semester_with(&mut stdin, &mut reader, "CSE", &[("Calculus", "80", "3")]);
    let before = request_ok(
        &mut stdin,
        &mut reader,
        "l1",
        "semesters.list",
        json!({ "userEmail": USER }),
    );

    let run = request(
        &mut stdin,
        &mut reader,
        "r1",
        "analysis.run",
        json!({ "userEmail": USER }),
    );
    assert_eq!(run["ok"], false);
    assert_eq!(run["error"]["code"], "transport_error");
    assert_eq!(run["error"]["details"]["retryable"], true);

    let after = request_ok(
        &mut stdin,
        &mut reader,
        "l2",
        "semesters.list",
        json!({ "userEmail": USER }),
    );
    assert_eq!(before, after);

    drop(stdin);
    let _ = child.wait();
}
