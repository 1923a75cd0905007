use std::io::Write;
use std::process::Command;

const SETTINGS: &str = "environment: ci\npii_body_fields:\n  account/login: [password]\n";

const FIXTURE: &str = r#"{
    "request": {
        "method": "POST",
        "url": "/account/login",
        "headers": {"Content-Type": "application/x-www-form-urlencoded"},
        "raw_body": "login=ann&password=hunter2"
    },
    "route": "account/login",
    "records": [
        {"body": {"kind": "text", "value": "denied"}, "level": "warning", "timestamp": 1700000000.0}
    ]
}"#;

fn write_temp(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn scopebridge() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_scopebridge"));
    cmd.env_remove("RUST_LOG")
        .env_remove("SCOPEBRIDGE_DSN")
        .env_remove("SCOPEBRIDGE_ENVIRONMENT")
        .env_remove("SCOPEBRIDGE_SEND_DEFAULT_PII");
    cmd
}

#[test]
fn test_replay_prints_event() {
    let settings = write_temp(SETTINGS);
    let fixture = write_temp(FIXTURE);

    let output = scopebridge()
        .arg("replay")
        .arg("--config")
        .arg(settings.path())
        .arg("--fixture")
        .arg(fixture.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<_> = stdout.lines().collect();
    assert_eq!(lines.len(), 1);

    let event: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(event["level"], "warning");
    assert_eq!(event["environment"], "ci");
    assert_eq!(event["tags"]["route"], "account/login");
    assert_eq!(event["extra"]["decodedParams"]["password"], "[Filtered PII]");
    assert_eq!(event["extra"]["logs"], "N/A");
}

#[test]
fn test_check_config_rejects_unknown_integration() {
    let settings = write_temp("integrations: [request, profiler]\n");

    let output = scopebridge()
        .arg("check-config")
        .arg("--config")
        .arg(settings.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("profiler"));
}

#[test]
fn test_check_config_accepts_valid_file() {
    let settings = write_temp(SETTINGS);

    let output = scopebridge()
        .arg("check-config")
        .arg("--config")
        .arg(settings.path())
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("is valid"));
    assert!(stdout.contains("account/login"));
}
