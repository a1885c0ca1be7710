use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_attendd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn attendd");
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
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    if value.get("ok").and_then(|v| v.as_bool()) == Some(false) {
        let code = value
            .get("error")
            .and_then(|e| e.get("code"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown");
        assert_ne!(
            code, "not_implemented",
            "unexpected unknown method for {}",
            method
        );
    }
    value
}

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let workspace = temp_dir("attendd-router-smoke");
    let bundle_out = workspace.join("smoke-backup.attbackup.zip");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request(&mut stdin, &mut reader, "1", "health", json!({}));
    let _ = request(
        &mut stdin,
        &mut reader,
        "2",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request(
        &mut stdin,
        &mut reader,
        "3",
        "students.seedDefaults",
        json!({}),
    );
    let _ = request(&mut stdin, &mut reader, "4", "students.list", json!({}));
    let _ = request(
        &mut stdin,
        &mut reader,
        "5",
        "students.create",
        json!({
            "id": "ST900",
            "name": "Smoke Student",
            "email": "smoke.student@email.com"
        }),
    );
    let started = request(
        &mut stdin,
        &mut reader,
        "6",
        "sessions.start",
        json!({ "subject": "Mathematics", "date": "2024-09-02" }),
    );
    let session_id = started
        .get("result")
        .and_then(|v| v.get("session"))
        .and_then(|v| v.get("id"))
        .and_then(|v| v.as_str())
        .expect("sessionId")
        .to_string();

    let _ = request(&mut stdin, &mut reader, "7", "sessions.list", json!({}));
    let _ = request(
        &mut stdin,
        &mut reader,
        "8",
        "attendance.checkIn",
        json!({ "studentId": "ST001" }),
    );
    let _ = request(
        &mut stdin,
        &mut reader,
        "9",
        "attendance.mark",
        json!({ "sessionId": session_id, "studentId": "ST900" }),
    );
    let _ = request(
        &mut stdin,
        &mut reader,
        "10",
        "attendance.list",
        json!({ "sessionId": session_id }),
    );
    let _ = request(
        &mut stdin,
        &mut reader,
        "11",
        "sessions.detail",
        json!({ "sessionId": session_id }),
    );
    let _ = request(
        &mut stdin,
        &mut reader,
        "12",
        "reports.studentDashboard",
        json!({ "studentId": "ST001" }),
    );
    let _ = request(
        &mut stdin,
        &mut reader,
        "13",
        "reports.studentRecords",
        json!({ "studentId": "ST001", "subject": "Mathematics" }),
    );
    let _ = request(
        &mut stdin,
        &mut reader,
        "14",
        "reports.subjectWise",
        json!({}),
    );
    let _ = request(&mut stdin, &mut reader, "15", "reports.dateWise", json!({}));
    let _ = request(
        &mut stdin,
        &mut reader,
        "16",
        "reports.studentWise",
        json!({ "filters": { "from": "2024-09-01", "to": "2024-09-30" } }),
    );
    let _ = request(
        &mut stdin,
        &mut reader,
        "17",
        "reports.defaulters",
        json!({ "threshold": 75 }),
    );
    let _ = request(
        &mut stdin,
        &mut reader,
        "18",
        "sessions.end",
        json!({ "sessionId": session_id }),
    );
    let _ = request(
        &mut stdin,
        &mut reader,
        "19",
        "backup.exportWorkspaceBundle",
        json!({
            "workspacePath": workspace.to_string_lossy(),
            "outPath": bundle_out.to_string_lossy()
        }),
    );
    let _ = request(
        &mut stdin,
        &mut reader,
        "20",
        "backup.importWorkspaceBundle",
        json!({
            "workspacePath": workspace.to_string_lossy(),
            "inPath": bundle_out.to_string_lossy()
        }),
    );
    let _ = request(
        &mut stdin,
        &mut reader,
        "21",
        "students.delete",
        json!({ "studentId": "ST900" }),
    );

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
