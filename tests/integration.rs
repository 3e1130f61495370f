use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn ragdesk_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("ragdesk");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let files_dir = root.join("files");
    fs::create_dir_all(files_dir.join("circulars")).unwrap();
    fs::write(
        files_dir.join("kyc.md"),
        "# KYC Master Direction\n\nKYC updation is mandatory every two years for high-risk customers.\n\nLow-risk customers update every ten years.",
    )
    .unwrap();
    fs::write(
        files_dir.join("circulars/lending.txt"),
        "Priority sector lending targets are 40 percent of adjusted net bank credit.",
    )
    .unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/ragdesk.sqlite"

[chunking]
chunk_chars = 1000
overlap_chars = 200

[retrieval]
top_k = 5
keyword_limit = 3

[embedding]
provider = "disabled"

[generation]
provider = "disabled"

[server]
bind = "127.0.0.1:7332"
"#,
        root.display()
    );

    let config_path = config_dir.join("ragdesk.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_ragdesk(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = ragdesk_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run ragdesk binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn files_dir(config_path: &Path) -> PathBuf {
    config_path.parent().unwrap().parent().unwrap().join("files")
}

fn ingest_fixtures(config_path: &Path) {
    run_ragdesk(config_path, &["init"]);
    let dir = files_dir(config_path);
    let (stdout, stderr, success) = run_ragdesk(
        config_path,
        &["ingest", dir.to_str().unwrap(), "--category", "Regulatory"],
    );
    assert!(success, "ingest failed: stdout={}, stderr={}", stdout, stderr);
}

#[test]
fn test_init_creates_database() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_ragdesk(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_ragdesk(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_ragdesk(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_init_seed_only_once() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_ragdesk(&config_path, &["init", "--seed"]);
    assert!(success);
    assert!(stdout.contains("Sample document added"));

    let (stdout, _, success) = run_ragdesk(&config_path, &["init", "--seed"]);
    assert!(success);
    assert!(stdout.contains("sample skipped"));

    let (stdout, _, _) = run_ragdesk(&config_path, &["documents", "list"]);
    assert!(stdout.contains("RBI_Master_Circular_2024.pdf"));
}

#[test]
fn test_ingest_directory() {
    let (_tmp, config_path) = setup_test_env();

    run_ragdesk(&config_path, &["init"]);
    let dir = files_dir(&config_path);
    let (stdout, stderr, success) = run_ragdesk(&config_path, &["ingest", dir.to_str().unwrap()]);
    assert!(success, "ingest failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("ingested kyc.md"));
    assert!(stdout.contains("ingested lending.txt"));
    assert!(stdout.contains("ingest complete: 2 documents, 2 chunks, 0 embedded"));
}

#[test]
fn test_ingest_missing_path_fails() {
    let (_tmp, config_path) = setup_test_env();

    run_ragdesk(&config_path, &["init"]);
    let (_, _, success) = run_ragdesk(&config_path, &["ingest", "/no/such/dir"]);
    assert!(!success);
}

#[test]
fn test_ask_json_without_providers() {
    let (_tmp, config_path) = setup_test_env();
    ingest_fixtures(&config_path);

    let (stdout, stderr, success) =
        run_ragdesk(&config_path, &["ask", "KYC updation rules?", "--json"]);
    assert!(success, "ask failed: stdout={}, stderr={}", stdout, stderr);

    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["strategy"], "keyword");
    assert_eq!(json["fallbackReason"], "provider_unavailable");
    assert_eq!(json["outcome"], "demo");

    let sources = json["sources"].as_array().unwrap();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0]["documentName"], "kyc.md");
    assert!(json["answer"].as_str().unwrap().contains("KYC Master Direction"));
}

#[test]
fn test_ask_without_match_uses_first_chunk() {
    let (_tmp, config_path) = setup_test_env();
    ingest_fixtures(&config_path);

    let (stdout, _, success) = run_ragdesk(&config_path, &["ask", "zebra crossings", "--json"]);
    assert!(success);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["sources"].as_array().unwrap().len(), 1);
}

#[test]
fn test_ask_blank_question_fails() {
    let (_tmp, config_path) = setup_test_env();
    run_ragdesk(&config_path, &["init"]);

    let (_, stderr, success) = run_ragdesk(&config_path, &["ask", "   "]);
    assert!(!success);
    assert!(stderr.contains("must not be empty"));
}

#[test]
fn test_history_lists_questions() {
    let (_tmp, config_path) = setup_test_env();
    ingest_fixtures(&config_path);

    run_ragdesk(&config_path, &["ask", "priority sector targets"]);
    let (stdout, _, success) = run_ragdesk(&config_path, &["history", "--limit", "5"]);
    assert!(success);
    assert!(stdout.contains("priority sector targets"));
}

#[test]
fn test_documents_delete_cascades() {
    let (_tmp, config_path) = setup_test_env();
    ingest_fixtures(&config_path);

    let (stdout, _, success) = run_ragdesk(&config_path, &["documents", "list"]);
    assert!(success);
    assert!(stdout.contains("kyc.md"));
    assert!(stdout.contains("Regulatory"));

    let (stdout, stderr, success) = run_ragdesk(&config_path, &["documents", "delete", "1"]);
    assert!(success, "delete failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("deleted document 1 (1 chunks)"));

    let (stdout, _, _) = run_ragdesk(&config_path, &["stats"]);
    assert!(stdout.contains("Documents:   1"));
    assert!(stdout.contains("Chunks:      1"));

    let (_, _, success) = run_ragdesk(&config_path, &["documents", "delete", "1"]);
    assert!(!success, "deleting a missing document should fail");
}

#[test]
fn test_stats_counts() {
    let (_tmp, config_path) = setup_test_env();
    ingest_fixtures(&config_path);
    run_ragdesk(&config_path, &["ask", "kyc"]);

    let (stdout, stderr, success) = run_ragdesk(&config_path, &["stats"]);
    assert!(success, "stats failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Documents:   2"));
    assert!(stdout.contains("Embedded:    0 / 2 (0%)"));
    assert!(stdout.contains("Queries:     1"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let (_tmp, config_path) = setup_test_env();
    let content = fs::read_to_string(&config_path)
        .unwrap()
        .replace("overlap_chars = 200", "overlap_chars = 1000");
    fs::write(&config_path, content).unwrap();

    let (_, _, success) = run_ragdesk(&config_path, &["init"]);
    assert!(!success);
}
