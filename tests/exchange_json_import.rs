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
    let exe = env!("CARGO_BIN_EXE_placementd");
    let mut child = Command::new(exe)
        .env_remove("PLACEMENTD_WORKSPACE")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn placementd");
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
    let payload = json!({ "id": id, "method": method, "params": params });
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
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or(serde_json::Value::Null)
}

fn str_at<'a>(v: &'a serde_json::Value, key: &str) -> &'a str {
    v.get(key).and_then(|x| x.as_str()).expect(key)
}

#[test]
fn exported_document_imports_into_a_fresh_workspace() {
    let source = temp_dir("placementd-exchange-src");
    let target = temp_dir("placementd-exchange-dst");
    let doc_path = source.join("export").join("placements.json");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": source.to_string_lossy() }),
    );
    let company = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "companies.create",
        json!({ "name": "Stark Industries" }),
    );
    let drive = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "drives.create",
        json!({ "companyId": str_at(&company, "companyId"), "title": "R&D Intern" }),
    );
    let drive_id = str_at(&drive, "driveId").to_string();
    let student = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "students.upsert",
        json!({ "student": { "rollNo": "R900", "name": "Farah", "branch": "EEE", "cgpa": 8.8 } }),
    );
    request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "applications.create",
        json!({ "driveId": drive_id, "studentId": str_at(&student, "studentId") }),
    );
    request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "slots.create",
        json!({ "driveId": drive_id, "startTime": "2026-12-05T14:00", "room": "C-3", "capacity": 3 }),
    );
    request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "placements.runShortlist",
        json!({ "driveId": drive_id }),
    );
    request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "placements.autoAssign",
        json!({ "driveId": drive_id }),
    );

    let export = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "exchange.exportJson",
        json!({ "outPath": doc_path.to_string_lossy() }),
    );
    assert_eq!(export["counts"]["assignments"], 1);
    assert_eq!(export["counts"]["runs"], 1);

    request_ok(
        &mut stdin,
        &mut reader,
        "10",
        "workspace.select",
        json!({ "path": target.to_string_lossy() }),
    );
    let import = request_ok(
        &mut stdin,
        &mut reader,
        "11",
        "exchange.importJson",
        json!({ "inPath": doc_path.to_string_lossy() }),
    );
    assert_eq!(import["counts"]["companies"], 1);
    assert_eq!(import["counts"]["students"], 1);

    let rows = request_ok(
        &mut stdin,
        &mut reader,
        "12",
        "placements.assignments",
        json!({ "driveId": drive_id }),
    );
    assert_eq!(rows["assignments"][0]["rollNo"], "R900");
    assert_eq!(rows["assignments"][0]["room"], "C-3");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(source);
    let _ = std::fs::remove_dir_all(target);
}

#[test]
fn invalid_documents_leave_the_workspace_untouched() {
    let workspace = temp_dir("placementd-exchange-invalid");
    let dangling = workspace.join("dangling.json");
    std::fs::write(
        &dangling,
        json!({
            "drives": [{
                "id": "d1",
                "companyId": "ghost",
                "title": "Orphan",
                "criteria": {},
                "createdAt": "2026-10-01T09:00:00Z"
            }]
        })
        .to_string(),
    )
    .expect("write document");
    let garbage = workspace.join("garbage.json");
    std::fs::write(&garbage, "[1, 2, 3]").expect("write document");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "companies.create",
        json!({ "name": "Keepers" }),
    );

    for (i, path) in [&dangling, &garbage].iter().enumerate() {
        let resp = request(
            &mut stdin,
            &mut reader,
            &format!("bad-{}", i),
            "exchange.importJson",
            json!({ "inPath": path.to_string_lossy() }),
        );
        assert_eq!(resp["ok"], false);
        assert_eq!(resp["error"]["code"], "bad_bundle");
    }

    let companies = request_ok(&mut stdin, &mut reader, "3", "companies.list", json!({}));
    assert_eq!(companies["companies"][0]["name"], "Keepers");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
