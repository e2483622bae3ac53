//! CLI tests for parley

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;

/// Binary with a clean environment rooted in `home`
fn parley(home: &TempDir) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_parley"));
    cmd.env_clear()
        .env("HOME", home.path())
        .env("PATH", std::env::var("PATH").unwrap_or_default())
        .current_dir(home.path());
    cmd
}

fn sse(payloads: &[&str]) -> String {
    payloads
        .iter()
        .map(|data| format!("data: {}\n\n", data))
        .collect()
}

#[test]
fn test_help_lists_flags() {
    let home = TempDir::new().unwrap();
    parley(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Streaming chat with tool calling"))
        .stdout(predicate::str::contains("--max-tool-rounds"))
        .stdout(predicate::str::contains("--mcp-config"))
        .stdout(predicate::str::contains("--no-builtin-tools"));
}

#[test]
fn test_version_flag() {
    let home = TempDir::new().unwrap();
    parley(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.1.0"));
}

#[test]
fn test_missing_api_key_is_fatal() {
    let home = TempDir::new().unwrap();
    parley(&home)
        .arg("hello")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("OPENAI_API_KEY"));
}

#[test]
fn test_unsupported_provider() {
    let home = TempDir::new().unwrap();
    parley(&home)
        .args(["--provider", "bard", "hello"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("UNSUPPORTED PROVIDER"));
}

#[test]
fn test_invalid_round_limit_from_env() {
    let home = TempDir::new().unwrap();
    parley(&home)
        .env("OPENAI_API_KEY", "sk-test")
        .env("PARLEY_MAX_TOOL_ROUNDS", "many")
        .arg("hello")
        .assert()
        .failure()
        .stderr(predicate::str::contains("PARLEY_MAX_TOOL_ROUNDS"));
}

#[test]
fn test_one_shot_message_streams_reply() {
    let home = TempDir::new().unwrap();
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/v1/chat/completions")
        .match_body(mockito::Matcher::PartialJson(
            json!({"model": "tiny", "stream": true}),
        ))
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(sse(&[
            r#"{"choices":[{"index":0,"delta":{"content":"Hello "}}]}"#,
            r#"{"choices":[{"index":0,"delta":{"content":"from the stub"},"finish_reason":"stop"}]}"#,
            "[DONE]",
        ]))
        .create();

    let base_url = format!("{}/v1", server.url());
    parley(&home)
        .args([
            "--provider",
            "ollama",
            "--base-url",
            base_url.as_str(),
            "--model",
            "tiny",
            "--no-builtin-tools",
            "--mcp-config",
        ])
        .arg(home.path().join("absent.json"))
        .arg("hi")
        .assert()
        .success()
        .stdout(predicate::str::contains("Hello from the stub"));

    mock.assert();
}

#[test]
fn test_interactive_session_exits_on_quit() {
    let home = TempDir::new().unwrap();
    parley(&home)
        .args(["--provider", "ollama", "--no-builtin-tools", "--model", "tiny"])
        .write_stdin("\nquit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("tiny"))
        .stdout(predicate::str::contains("> "));
}
