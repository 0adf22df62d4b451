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

fn seed_company_and_student(stdin: &mut ChildStdin, reader: &mut BufReader<ChildStdout>) {
    request_ok(stdin, reader, "seed-1", "companies.create", json!({ "name": "Wayne Corp" }));
    request_ok(
        stdin,
        reader,
        "seed-2",
        "students.upsert",
        json!({ "student": { "rollNo": "R500", "name": "Esha", "branch": "CSE", "cgpa": 9.1 } }),
    );
}

#[test]
fn workspace_bundle_restores_earlier_state() {
    let workspace = temp_dir("placementd-bundle");
    let out_dir = temp_dir("placementd-bundle-out");
    let bundle = out_dir.join("workspace.placements.zip");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    seed_company_and_student(&mut stdin, &mut reader);

    let export = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "backup.exportWorkspaceBundle",
        json!({ "outPath": bundle.to_string_lossy() }),
    );
    assert_eq!(export["bundleFormat"], "placementd-workspace-v1");
    assert_eq!(export["entryCount"], 2);
    assert_eq!(str_at(&export, "dbSha256").len(), 64);

    let companies = request_ok(&mut stdin, &mut reader, "3", "companies.list", json!({}));
    let company_id = companies["companies"][0]["id"].as_str().expect("id").to_string();
    request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "companies.delete",
        json!({ "companyId": company_id }),
    );
    let companies = request_ok(&mut stdin, &mut reader, "5", "companies.list", json!({}));
    assert_eq!(companies["companies"], json!([]));

    let import = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "backup.importWorkspaceBundle",
        json!({ "inPath": bundle.to_string_lossy() }),
    );
    assert_eq!(import["bundleFormatDetected"], "placementd-workspace-v1");

    let companies = request_ok(&mut stdin, &mut reader, "7", "companies.list", json!({}));
    assert_eq!(companies["companies"][0]["name"], "Wayne Corp");
    let students = request_ok(&mut stdin, &mut reader, "8", "students.list", json!({}));
    assert_eq!(students["students"][0]["rollNo"], "R500");

    let missing = request(
        &mut stdin,
        &mut reader,
        "9",
        "backup.importWorkspaceBundle",
        json!({ "inPath": out_dir.join("nope.zip").to_string_lossy() }),
    );
    assert_eq!(missing["error"]["code"], "not_found");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
    let _ = std::fs::remove_dir_all(out_dir);
}

#[test]
fn tampered_bundle_is_rejected_and_workspace_stays_usable() {
    let workspace = temp_dir("placementd-bundle-tamper");
    let out_dir = temp_dir("placementd-bundle-tamper-out");
    let bundle = out_dir.join("tampered.zip");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    seed_company_and_student(&mut stdin, &mut reader);

    {
        let file = std::fs::File::create(&bundle).expect("create bundle");
        let mut zip = zip::ZipWriter::new(file);
        let opts = zip::write::FileOptions::default();
        zip.start_file("manifest.json", opts).expect("manifest entry");
        zip.write_all(
            json!({ "format": "placementd-workspace-v1", "dbSha256": "00" })
                .to_string()
                .as_bytes(),
        )
        .expect("write manifest");
        zip.start_file("db/placements.sqlite3", opts).expect("db entry");
        zip.write_all(b"not a database").expect("write db");
        zip.finish().expect("finish zip");
    }

    let rejected = request(
        &mut stdin,
        &mut reader,
        "2",
        "backup.importWorkspaceBundle",
        json!({ "inPath": bundle.to_string_lossy() }),
    );
    assert_eq!(rejected["ok"], false);
    assert_eq!(rejected["error"]["code"], "bad_bundle");

    let companies = request_ok(&mut stdin, &mut reader, "3", "companies.list", json!({}));
    assert_eq!(companies["companies"][0]["name"], "Wayne Corp");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
    let _ = std::fs::remove_dir_all(out_dir);
}
