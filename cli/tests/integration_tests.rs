use std::fs;
use std::process::{Command, Output};

fn agent_schema(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_agent-schema"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run agent-schema")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

// ---------------------------------------------------------------------------
// Listing and help
// ---------------------------------------------------------------------------

#[test]
fn agents_lists_builtin_variants() {
    let output = agent_schema(&["agents"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let text = stdout(&output);
    assert!(text.contains("beacon: http/windows, smb/windows, tcp/windows"));
    assert!(text.contains("gopher: tcp/windows, tcp/linux, tcp/macos"));
}

#[test]
fn commands_as_json() {
    let output = agent_schema(&[
        "commands",
        "--agent",
        "gopher",
        "--variant",
        "tcp/linux",
        "--format",
        "json",
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(value["group"], "gopher");
    assert_eq!(value["commands"][0]["name"], "cat");
}

#[test]
fn help_for_nested_command() {
    let output = agent_schema(&[
        "help", "--agent", "beacon", "--variant", "http/windows", "job", "kill",
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let text = stdout(&output);
    assert!(text.contains("job kill"));
    assert!(text.contains("task_id"));
}

#[test]
fn help_overview_marks_nodes() {
    let output = agent_schema(&["help", "--agent", "beacon", "--variant", "smb/windows"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("job*"));
    assert!(!text.contains("sleep"));
}

#[test]
fn unknown_agent_fails() {
    let output = agent_schema(&["commands", "--agent", "apollo", "--variant", "http/windows"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("error: unknown agent: apollo"));
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

#[test]
fn dispatch_rewrites_shell_alias() {
    let output = agent_schema(&[
        "dispatch",
        "--agent",
        "beacon",
        "--variant",
        "http/windows",
        "shell whoami /all",
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(
        stdout(&output).trim(),
        "rewrite: shell \"whoami /all\" -> ps run -o C:\\Windows\\System32\\cmd.exe \"/c whoami /all\""
    );
}

#[test]
fn dispatch_forwards_as_json() {
    let output = agent_schema(&[
        "dispatch",
        "--agent",
        "beacon",
        "--variant",
        "tcp/windows",
        "--json",
        "link tcp 10.0.0.5 4444",
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(value["outcome"], "forward");
    assert_eq!(value["invocation"]["path"], serde_json::json!(["link", "tcp"]));
}

#[test]
fn dispatch_reports_bind_errors() {
    let output = agent_schema(&[
        "dispatch",
        "--agent",
        "beacon",
        "--variant",
        "smb/windows",
        "shell whoami",
    ]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("unknown command: shell"));
}

// ---------------------------------------------------------------------------
// Forms
// ---------------------------------------------------------------------------

#[test]
fn form_set_runs_rules() {
    let output = agent_schema(&[
        "form",
        "--agent",
        "gopher",
        "--variant",
        "tcp/windows",
        "--set",
        "os=linux",
        "--set",
        "reconn_count=5",
        "--values-only",
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let values: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(values["os"], "linux");
    assert_eq!(values["format"], "Binary .ELF");
    assert_eq!(values["reconn_count"], 5);
}

#[test]
fn form_restores_saved_values() {
    let dir = tempfile::tempdir().unwrap();
    let saved = dir.path().join("values.json");
    fs::write(
        &saved,
        r#"{"format": "Service Exe", "kill_date": "28.02.2030", "is_killdate": true}"#,
    )
    .unwrap();

    let output = agent_schema(&[
        "form",
        "--agent",
        "beacon",
        "--variant",
        "http/windows",
        "--values",
        saved.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let schema: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let svcname = schema["fields"]
        .as_array()
        .unwrap()
        .iter()
        .find(|f| f["key"] == "svcname")
        .unwrap();
    assert_eq!(svcname["visible"], true);
}

#[test]
fn form_rejects_out_of_range_value() {
    let output = agent_schema(&[
        "form",
        "--agent",
        "beacon",
        "--variant",
        "http/windows",
        "--set",
        "jitter=150",
    ]);
    assert!(!output.status.success());
    assert!(stderr(&output).starts_with("error:"));
}

// ---------------------------------------------------------------------------
// Export, check and config
// ---------------------------------------------------------------------------

#[test]
fn export_writes_verifiable_packages() {
    let dir = tempfile::tempdir().unwrap();
    let output = agent_schema(&[
        "export",
        "--agent",
        "gopher",
        "--output",
        dir.path().to_str().unwrap(),
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Exported 3 package(s)"));

    let path = dir.path().join("gopher-tcp-macos.json");
    let package = agent_schema_catalog::CapabilityPackage::load(&path).unwrap();
    package.verify().unwrap();
    assert_eq!(package.agent, "gopher");
}

#[test]
fn check_builtin_is_consistent() {
    let output = agent_schema(&["check"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Checked 2 agent(s): consistent."));
}

#[test]
fn config_hides_commands_and_agents() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("catalog.yml");
    fs::write(&config, "exclude: [gopher]\nhidden_commands: [shell]\n").unwrap();

    let output = agent_schema(&["--config", config.to_str().unwrap(), "agents"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(!stdout(&output).contains("gopher"));

    let output = agent_schema(&[
        "--config",
        config.to_str().unwrap(),
        "dispatch",
        "--agent",
        "beacon",
        "--variant",
        "http/windows",
        "shell whoami",
    ]);
    assert!(!output.status.success());
}
