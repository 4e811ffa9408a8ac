#![allow(dead_code)]

use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

pub fn temp_dir(prefix: &str) -> PathBuf {
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

pub fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    spawn_sidecar_with(&[])
}

pub fn spawn_sidecar_with(args: &[&str]) -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_filtertabled");
    let mut child = Command::new(exe)
        .args(args)
        .env_remove("FILTERTABLED_WORKSPACE")
        .env_remove("FILTERTABLED_SESSIONS")
        .env_remove("FILTERTABLED_PER_PAGE")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn filtertabled");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

pub fn request(
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
    value
}

pub fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown error")
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

/// Sends a request that must fail and returns its error code.
pub fn request_err_code(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> String {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(false),
        "{} unexpectedly succeeded: {}",
        method,
        value
    );
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .expect("error code")
        .to_string()
}

pub fn create_user(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    username: &str,
) -> String {
    request_ok(stdin, reader, id, "users.create", json!({ "username": username }))
        .get("userId")
        .and_then(|v| v.as_str())
        .expect("userId")
        .to_string()
}

pub struct Seeded {
    pub admin_id: String,
    pub outsider_id: String,
    pub assignment_id: String,
    pub group_ids: Vec<String>,
}

/// Seeds one assignment administered by `thor` with `groups` groups.
///
/// Group `i` has candidate `cand{i:02}`, status `i % 4`, and examiner
/// none / `ex1` / `ex2` for `i % 3` of 0 / 1 / 2.
pub fn seed_assignment(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    groups: usize,
) -> Seeded {
    let mut n = 0;
    let mut next_id = || {
        n += 1;
        format!("seed-{n}")
    };

    let admin_id = create_user(stdin, reader, &next_id(), "thor");
    let outsider_id = create_user(stdin, reader, &next_id(), "loki");
    create_user(stdin, reader, &next_id(), "ex1");
    create_user(stdin, reader, &next_id(), "ex2");
    for i in 0..groups {
        create_user(stdin, reader, &next_id(), &format!("cand{i:02}"));
    }

    let assignment_id = request_ok(
        stdin,
        reader,
        &next_id(),
        "assignments.create",
        json!({ "name": "Oblig 1", "admins": ["thor"] }),
    )
    .get("assignmentId")
    .and_then(|v| v.as_str())
    .expect("assignmentId")
    .to_string();

    let mut group_ids = Vec::with_capacity(groups);
    for i in 0..groups {
        let examiners = match i % 3 {
            0 => json!([]),
            1 => json!(["ex1"]),
            _ => json!(["ex2"]),
        };
        let created = request_ok(
            stdin,
            reader,
            &next_id(),
            "groups.create",
            json!({
                "assignmentId": assignment_id.clone(),
                "name": format!("group {i}"),
                "status": i % 4,
                "candidates": [format!("cand{i:02}")],
                "examiners": examiners,
            }),
        );
        group_ids.push(
            created
                .get("groupId")
                .and_then(|v| v.as_str())
                .expect("groupId")
                .to_string(),
        );
    }

    Seeded {
        admin_id,
        outsider_id,
        assignment_id,
        group_ids,
    }
}

pub fn fetch_params(seeded: &Seeded, query: serde_json::Value) -> serde_json::Value {
    json!({
        "table": "assignmentgroups",
        "userId": seeded.admin_id.clone(),
        "assignmentId": seeded.assignment_id.clone(),
        "query": query,
    })
}

pub fn data_len(envelope: &serde_json::Value) -> usize {
    envelope
        .get("data")
        .and_then(|v| v.as_array())
        .map(|a| a.len())
        .expect("data array")
}

pub fn usize_field(envelope: &serde_json::Value, key: &str) -> usize {
    envelope
        .get(key)
        .and_then(|v| v.as_u64())
        .unwrap_or_else(|| panic!("missing {key}")) as usize
}
