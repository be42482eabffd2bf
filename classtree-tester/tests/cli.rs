use std::process::Command;

fn temp_path(label: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "classtree-cli-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

#[test]
fn cli_list_scenarios_writes_output() {
    let exe = env!("CARGO_BIN_EXE_classtree-tester");
    let output_path = temp_path("list");
    let status = Command::new(exe)
        .args(["--list-scenarios", "--output"])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(output_path).expect("read output");
    assert!(content.contains("Available scenarios"));
    assert!(content.contains("tree-invariants"));
}

#[test]
fn cli_runs_unlock_flow_with_json_report() {
    let exe = env!("CARGO_BIN_EXE_classtree-tester");
    let output_path = temp_path("run");
    let output = Command::new(exe)
        .args([
            "--report",
            "json",
            "--scenarios",
            "unlock-flow,sampler-floor",
            "--iterations",
            "1",
            "--seeds",
            "1,0x2a",
            "--output",
        ])
        .arg(&output_path)
        .output()
        .expect("run cli");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Class Tree Automated Tester"));

    let content = std::fs::read_to_string(output_path).expect("read output");
    let report: serde_json::Value = serde_json::from_str(&content).expect("json report");
    let runs = report.as_array().expect("array");
    assert_eq!(runs.len(), 4);
    assert!(runs.iter().all(|run| run["passed"] == true));
}

#[test]
fn cli_unknown_scenario_reports_nothing() {
    let exe = env!("CARGO_BIN_EXE_classtree-tester");
    let output_path = temp_path("unknown");
    let output = Command::new(exe)
        .args(["--report", "json", "--scenarios", "bogus", "--output"])
        .arg(&output_path)
        .output()
        .expect("run cli");
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unknown scenario"));
    let content = std::fs::read_to_string(output_path).expect("read output");
    assert_eq!(content.trim(), "[]");
}

#[test]
fn cli_rejects_bad_seed() {
    let exe = env!("CARGO_BIN_EXE_classtree-tester");
    let output = Command::new(exe)
        .args(["--seeds", "not-a-seed", "--scenarios", "unlock-flow"])
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unrecognized seed token"));
}

#[test]
fn cli_dumps_catalog() {
    let exe = env!("CARGO_BIN_EXE_classtree-tester");
    let catalog_path = temp_path("catalog");
    let output = Command::new(exe)
        .args([
            "--scenarios",
            "deterministic-build",
            "--iterations",
            "1",
            "--target",
            "40",
            "--report",
            "markdown",
            "--dump-catalog",
        ])
        .arg(&catalog_path)
        .output()
        .expect("run cli");
    assert!(output.status.success());
    let content = std::fs::read_to_string(catalog_path).expect("read catalog");
    let catalog: serde_json::Value = serde_json::from_str(&content).expect("catalog json");
    assert!(catalog["generated_classes"].as_array().is_some_and(|c| !c.is_empty()));
    assert!(catalog["tree_structure"]["connections"].is_array());
}
