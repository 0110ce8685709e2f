//! CLI integration tests using assert_cmd.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn panelscore(dir: &Path) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("panelscore").unwrap();
    // Keep config discovery inside the temp dir.
    cmd.current_dir(dir).env("HOME", dir).env_remove("RUST_LOG");
    cmd
}

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

const TWO_RATERS: &str = r#"{
  "interview_id": "iv-1",
  "submissions": [
    {"rater_id": "alice", "scores": {"LOGIC": 80, "PROGRAMMING_SKILL": 90}},
    {"rater_id": "bob", "scores": {"LOGIC": 90, "PROGRAMMING_SKILL": 70}}
  ]
}"#;

const AI_RESPONSE: &str = r#"{"choices":[{"message":{"content":"Here you go: {\"dimension_scores\":{\"LOGIC\":{\"score\":60,\"comment\":\"ok\"},\"BASIC_MATH\":55},\"overall_comment\":\"fine\"}"}}]}"#;

#[test]
fn dimensions_lists_catalog() {
    let dir = TempDir::new().unwrap();
    panelscore(dir.path())
        .arg("dimensions")
        .assert()
        .success()
        .stdout(predicate::str::contains("PROGRAMMING_SKILL"))
        .stdout(predicate::str::contains("OPEN_SOURCE"))
        .stdout(predicate::str::contains("total weight"));
}

#[test]
fn dimensions_json_has_every_dimension() {
    let dir = TempDir::new().unwrap();
    let output = panelscore(dir.path())
        .args(["dimensions", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(rows.as_array().unwrap().len(), 18);
    assert_eq!(rows[0]["key"], "PROGRAMMING_SKILL");
}

#[test]
fn extract_reads_envelope() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), "response.json", AI_RESPONSE);
    panelscore(dir.path())
        .arg("extract")
        .arg("--input")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"ok\": true"))
        .stdout(predicate::str::contains("\"LOGIC\": 60"));
}

#[test]
fn extract_garbage_reports_not_ok() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), "response.txt", "the model refused to answer");
    panelscore(dir.path())
        .arg("extract")
        .arg("--input")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"ok\": false"));
}

#[test]
fn extract_missing_file() {
    let dir = TempDir::new().unwrap();
    panelscore(dir.path())
        .args(["extract", "--input", "nope.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn summarize_json() {
    let dir = TempDir::new().unwrap();
    let session = write(dir.path(), "session.json", TWO_RATERS);
    let output = panelscore(dir.path())
        .arg("summarize")
        .arg("--session")
        .arg(&session)
        .args(["--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["rater_count"], 2);
    assert_eq!(summary["dimensions"]["LOGIC"]["mean"], 85.0);
    assert_eq!(summary["dimensions"]["PROGRAMMING_SKILL"]["stddev"], 10.0);
    assert_eq!(summary["revision"], 2);
}

#[test]
fn summarize_text_with_override() {
    let dir = TempDir::new().unwrap();
    let session = write(
        dir.path(),
        "session.json",
        r#"{
  "interview_id": "iv-2",
  "submissions": [
    {"rater_id": "alice", "scores": {"LOGIC": 70}},
    {"rater_id": "bob", "scores": {"LOGIC": 72}}
  ],
  "overrides": [{"lead_id": "lead-1", "scores": {"LOGIC": 95}, "reason": "calibrated"}]
}"#,
    );
    panelscore(dir.path())
        .arg("summarize")
        .arg("--session")
        .arg(&session)
        .assert()
        .success()
        .stdout(predicate::str::contains("Raters: 2"))
        .stdout(predicate::str::contains("high agreement"))
        .stdout(predicate::str::contains("[lead lead-1] calibrated"));
}

#[test]
fn summarize_rejects_duplicate_rater() {
    let dir = TempDir::new().unwrap();
    let session = write(
        dir.path(),
        "session.json",
        r#"{
  "interview_id": "iv-3",
  "submissions": [
    {"rater_id": "alice", "scores": {"LOGIC": 70}},
    {"rater_id": "alice", "scores": {"LOGIC": 75}}
  ]
}"#,
    );
    panelscore(dir.path())
        .arg("summarize")
        .arg("--session")
        .arg(&session)
        .assert()
        .failure()
        .stderr(predicate::str::contains("rater 'alice'"))
        .stderr(predicate::str::contains("already scored"));
}

#[test]
fn summarize_rejects_out_of_range_score() {
    let dir = TempDir::new().unwrap();
    let session = write(
        dir.path(),
        "session.json",
        r#"{"interview_id": "iv-4", "submissions": [{"rater_id": "a", "scores": {"LOGIC": 101}}]}"#,
    );
    panelscore(dir.path())
        .arg("summarize")
        .arg("--session")
        .arg(&session)
        .assert()
        .failure()
        .stderr(predicate::str::contains("validation failed"));
}

#[test]
fn report_human_only() {
    let dir = TempDir::new().unwrap();
    let session = write(dir.path(), "session.json", TWO_RATERS);
    panelscore(dir.path())
        .arg("report")
        .arg("--session")
        .arg(&session)
        .args(["--seed", "7"])
        .assert()
        .success()
        .stdout(predicate::str::contains("the human panel only"))
        .stdout(predicate::str::contains("Suitable positions"));
}

#[test]
fn report_blends_ai_response() {
    let dir = TempDir::new().unwrap();
    let session = write(dir.path(), "session.json", TWO_RATERS);
    let ai = write(dir.path(), "ai.json", AI_RESPONSE);
    let output = panelscore(dir.path())
        .arg("report")
        .arg("--session")
        .arg(&session)
        .arg("--ai-response")
        .arg(&ai)
        .args(["--human-weight", "0.5", "--ai-weight", "0.5"])
        .args(["--format", "json", "--seed", "1"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["basis"], "both");
    // LOGIC: human mean 85, AI 60.
    assert_eq!(report["dimension_scores"]["LOGIC"], 72.5);
    // Only the AI scored BASIC_MATH, so it is taken unscaled.
    assert_eq!(report["dimension_scores"]["BASIC_MATH"], 55.0);
}

#[test]
fn report_continues_without_unusable_ai_response() {
    let dir = TempDir::new().unwrap();
    let session = write(dir.path(), "session.json", TWO_RATERS);
    let ai = write(dir.path(), "ai.txt", "{\"dimension_scores\": {\"LOGIC\": 8");
    panelscore(dir.path())
        .arg("report")
        .arg("--session")
        .arg(&session)
        .arg("--ai-response")
        .arg(&ai)
        .assert()
        .success()
        .stdout(predicate::str::contains("the human panel only"));
}

#[test]
fn report_rejects_zero_weights() {
    let dir = TempDir::new().unwrap();
    let session = write(dir.path(), "session.json", TWO_RATERS);
    panelscore(dir.path())
        .arg("report")
        .arg("--session")
        .arg(&session)
        .args(["--human-weight", "0", "--ai-weight", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid blend weights"));
}

#[test]
fn report_without_scores_fails() {
    let dir = TempDir::new().unwrap();
    let session = write(dir.path(), "session.json", r#"{"interview_id": "empty"}"#);
    panelscore(dir.path())
        .arg("report")
        .arg("--session")
        .arg(&session)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn init_creates_files() {
    let dir = TempDir::new().unwrap();

    panelscore(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created panelscore.toml"))
        .stdout(predicate::str::contains("Created session.json"));

    assert!(dir.path().join("panelscore.toml").exists());

    panelscore(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));

    // The generated files work together.
    panelscore(dir.path())
        .args(["summarize", "--session", "session.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("interview-001"));
}

#[test]
fn analyze_unknown_provider() {
    let dir = TempDir::new().unwrap();
    let prompt = write(dir.path(), "prompt.txt", "Evaluate this transcript.");
    panelscore(dir.path())
        .args(["analyze", "--interview-id", "iv-9", "--provider", "missing"])
        .arg("--prompt")
        .arg(&prompt)
        .assert()
        .failure()
        .stderr(predicate::str::contains("provider 'missing' is not configured"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn analyze_against_local_provider() {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_string(AI_RESPONSE))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = write(
        dir.path(),
        "panelscore.toml",
        &format!(
            "default_provider = \"lab\"\n\n[providers.lab]\ntype = \"local\"\nendpoint = \"{}\"\n",
            server.uri()
        ),
    );
    let prompt = write(dir.path(), "prompt.txt", "Evaluate this transcript.");

    let dir_path = dir.path().to_path_buf();
    let output = tokio::task::spawn_blocking(move || {
        panelscore(&dir_path)
            .args(["analyze", "--interview-id", "iv-10"])
            .arg("--prompt")
            .arg(&prompt)
            .arg("--config")
            .arg(&config)
            .output()
            .unwrap()
    })
    .await
    .unwrap();

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let record: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(record["rater_id"], "lab");
    assert_eq!(record["kind"], "AI");
    assert_eq!(record["scores"]["LOGIC"], 60);
}
