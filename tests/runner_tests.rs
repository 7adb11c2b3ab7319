//! Tests for the sandboxed runner: interpreter execution, input data
//! plumbing, timeout enforcement, and scratch-file cleanup.
//!
//! These tests spawn real `python3` and `bash` subprocesses.

use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;

use taskgrid::config::RunnerConfig;
use taskgrid::error::GridError;
use taskgrid::executor::{CodeRequest, SandboxRunner};

fn runner_with_scratch(scratch: &TempDir) -> SandboxRunner {
    let mut config = RunnerConfig::default();
    config.scratch_dir = Some(scratch.path().to_path_buf());
    SandboxRunner::new(config)
}

fn scratch_file_count(scratch: &TempDir) -> usize {
    std::fs::read_dir(scratch.path()).unwrap().count()
}

fn code_request(language: &str, code: &str) -> CodeRequest {
    CodeRequest {
        language: language.to_string(),
        code: code.to_string(),
        input: None,
    }
}

#[tokio::test]
async fn test_python_execution() {
    let scratch = TempDir::new().unwrap();
    let runner = runner_with_scratch(&scratch);

    let result = runner
        .execute(&code_request("python", "print(2+2)"))
        .await
        .unwrap();

    assert!(result.success);
    assert!(result.stdout.contains('4'));
    assert_eq!(result.returncode, 0);
}

#[tokio::test]
async fn test_python_nonzero_exit() {
    let scratch = TempDir::new().unwrap();
    let runner = runner_with_scratch(&scratch);

    let result = runner
        .execute(&code_request(
            "python",
            "import sys\nsys.stderr.write('boom')\nsys.exit(3)",
        ))
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.returncode, 3);
    assert!(result.stderr.contains("boom"));
}

#[tokio::test]
async fn test_python_receives_input_through_environment() {
    let scratch = TempDir::new().unwrap();
    let runner = runner_with_scratch(&scratch);

    let request = CodeRequest {
        language: "python".to_string(),
        code: "import os\nprint(os.environ['INPUT_DATA'])".to_string(),
        input: Some(json!("grid-input")),
    };
    let result = runner.execute(&request).await.unwrap();

    assert!(result.success);
    assert!(result.stdout.contains("grid-input"));
}

#[tokio::test]
async fn test_bash_execution() {
    let scratch = TempDir::new().unwrap();
    let runner = runner_with_scratch(&scratch);

    let result = runner
        .execute(&code_request("bash", "echo hello from bash"))
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.stdout, "hello from bash\n");
}

#[tokio::test]
async fn test_bash_receives_input_variable() {
    let scratch = TempDir::new().unwrap();
    let runner = runner_with_scratch(&scratch);

    let request = CodeRequest {
        language: "bash".to_string(),
        code: "echo $INPUT_DATA".to_string(),
        input: Some(json!("from-the-grid")),
    };
    let result = runner.execute(&request).await.unwrap();

    assert!(result.success);
    assert_eq!(result.stdout, "from-the-grid\n");
}

#[tokio::test]
async fn test_unsupported_language_spawns_nothing() {
    let scratch = TempDir::new().unwrap();
    let runner = runner_with_scratch(&scratch);

    let err = runner
        .execute(&code_request("ruby", "puts 1"))
        .await
        .unwrap_err();

    assert!(matches!(err, GridError::UnsupportedLanguage(ref tag) if tag == "ruby"));
    assert_eq!(err.classification(), "unsupported_language");
    // No scratch file was ever created for the rejected request
    assert_eq!(scratch_file_count(&scratch), 0);
}

#[tokio::test]
async fn test_missing_interpreter_is_reported() {
    let scratch = TempDir::new().unwrap();
    let mut config = RunnerConfig::default();
    config.scratch_dir = Some(scratch.path().to_path_buf());
    config.node_bin = "taskgrid-no-such-interpreter".to_string();
    let runner = SandboxRunner::new(config);

    let err = runner
        .execute(&code_request("javascript", "console.log(1)"))
        .await
        .unwrap_err();

    assert!(matches!(err, GridError::InterpreterNotFound(_)));
    assert_eq!(err.classification(), "interpreter_not_found");
    // The scratch file is cleaned up even on the spawn-failure path
    assert_eq!(scratch_file_count(&scratch), 0);
}

#[tokio::test]
async fn test_timeout_kills_process_and_cleans_up() {
    let scratch = TempDir::new().unwrap();
    let mut config = RunnerConfig::default();
    config.scratch_dir = Some(scratch.path().to_path_buf());
    config.timeout = Duration::from_millis(300);
    let runner = SandboxRunner::new(config);

    let err = runner
        .execute(&code_request("bash", "sleep 10"))
        .await
        .unwrap_err();

    assert!(matches!(err, GridError::ExecutionTimeout(_)));
    assert_eq!(err.classification(), "execution_timeout");
    assert_eq!(scratch_file_count(&scratch), 0);
}

#[tokio::test]
async fn test_scratch_file_removed_after_success() {
    let scratch = TempDir::new().unwrap();
    let runner = runner_with_scratch(&scratch);

    let result = runner
        .execute(&code_request("bash", "true"))
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(scratch_file_count(&scratch), 0);
}

#[tokio::test]
async fn test_runner_is_stateless_across_invocations() {
    let scratch = TempDir::new().unwrap();
    let runner = runner_with_scratch(&scratch);

    let first = runner
        .execute(&code_request("bash", "echo one"))
        .await
        .unwrap();
    let second = runner
        .execute(&code_request("bash", "echo two"))
        .await
        .unwrap();

    assert_eq!(first.stdout, "one\n");
    assert_eq!(second.stdout, "two\n");
    assert_eq!(scratch_file_count(&scratch), 0);
}

#[tokio::test]
async fn test_stdout_and_stderr_are_captured_separately() {
    let scratch = TempDir::new().unwrap();
    let runner = runner_with_scratch(&scratch);

    let result = runner
        .execute(&code_request("bash", "echo out; echo err >&2"))
        .await
        .unwrap();

    assert_eq!(result.stdout, "out\n");
    assert_eq!(result.stderr, "err\n");
}
