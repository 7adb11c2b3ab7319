//! Sandboxed multi-language code execution.
//!
//! Each invocation writes the fragment to a fresh scratch file, spawns the
//! matching interpreter in its own subprocess, and waits bounded by the
//! configured wall-clock timeout. The scratch file is unlinked on every
//! exit path, including timeout and spawn failure. The runner keeps no
//! state between invocations; serialization of executions on one node is
//! the task engine's job, not the runner's.

use std::io::{self, Write};
use std::process::Stdio;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tempfile::TempPath;
use tokio::process::Command;

use crate::config::RunnerConfig;
use crate::error::{GridError, Result};

/// A code fragment to run in one subprocess.
///
/// The language tag is matched at execution time so unsupported tags fail
/// with a classification instead of a deserialization error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeRequest {
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
}

fn default_language() -> String {
    "python".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Language {
    Python,
    Javascript,
    Bash,
}

impl Language {
    /// Map a request tag to a supported language. `node` and `shell` are
    /// accepted aliases.
    fn from_tag(tag: &str) -> Result<Language> {
        match tag {
            "python" => Ok(Language::Python),
            "javascript" | "node" => Ok(Language::Javascript),
            "bash" | "shell" => Ok(Language::Bash),
            other => Err(GridError::UnsupportedLanguage(other.to_string())),
        }
    }

    fn extension(&self) -> &'static str {
        match self {
            Language::Python => ".py",
            Language::Javascript => ".js",
            Language::Bash => ".sh",
        }
    }
}

/// Captured output of one completed subprocess.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub returncode: i32,
    pub success: bool,
}

/// Runs one code fragment per invocation in a fresh subprocess.
#[derive(Debug, Clone)]
pub struct SandboxRunner {
    config: RunnerConfig,
}

impl SandboxRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    /// Execute a code fragment and capture its output.
    ///
    /// Fails with `UnsupportedLanguage` before any file or process is
    /// created, `InterpreterNotFound` when the interpreter binary is
    /// missing, and `ExecutionTimeout` when the wall-clock bound elapses
    /// (the subprocess is killed in that case).
    pub async fn execute(&self, request: &CodeRequest) -> Result<ExecutionResult> {
        let language = Language::from_tag(&request.language)?;
        let source = compose_source(language, &request.code, request.input.as_ref());
        let script = self.write_script(language, &source)?;

        let mut command = Command::new(self.interpreter(language));
        command
            .arg(&*script)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Python receives input through the environment; the other
        // languages get it inlined into the scratch file.
        if language == Language::Python {
            if let Some(input) = &request.input {
                command.env("INPUT_DATA", render_input(input));
            }
        }

        let child = match command.spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(GridError::InterpreterNotFound(
                    self.interpreter(language).to_string(),
                ));
            }
            Err(e) => {
                return Err(GridError::Internal(format!(
                    "failed to spawn interpreter: {}",
                    e
                )));
            }
        };

        let output = match tokio::time::timeout(self.config.timeout, child.wait_with_output()).await
        {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(GridError::Internal(format!(
                    "failed to collect output: {}",
                    e
                )));
            }
            // Dropping the timed-out wait drops the child handle, and
            // kill_on_drop reaps the process.
            Err(_) => {
                tracing::warn!(timeout = ?self.config.timeout, "Execution timed out");
                return Err(GridError::ExecutionTimeout(self.config.timeout.as_secs()));
            }
        };

        drop(script);

        Ok(ExecutionResult {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            returncode: output.status.code().unwrap_or(-1),
            success: output.status.success(),
        })
    }

    fn interpreter(&self, language: Language) -> &str {
        match language {
            Language::Python => &self.config.python_bin,
            Language::Javascript => &self.config.node_bin,
            Language::Bash => &self.config.bash_bin,
        }
    }

    /// Write the composed source to a scratch file. The returned `TempPath`
    /// guard unlinks the file when it drops.
    fn write_script(&self, language: Language, source: &str) -> Result<TempPath> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("taskgrid-").suffix(language.extension());

        let mut file = match &self.config.scratch_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(|e| GridError::Internal(format!("failed to create scratch file: {}", e)))?;

        file.write_all(source.as_bytes())
            .map_err(|e| GridError::Internal(format!("failed to write scratch file: {}", e)))?;

        Ok(file.into_temp_path())
    }
}

fn compose_source(language: Language, code: &str, input: Option<&Value>) -> String {
    match language {
        Language::Python => code.to_string(),
        Language::Javascript => match input {
            Some(value) => format!("const INPUT_DATA = {};\n{}", value, code),
            None => code.to_string(),
        },
        Language::Bash => {
            let mut source = String::from("#!/bin/bash\n");
            if let Some(value) = input {
                source.push_str(&format!("INPUT_DATA=\"{}\"\n", render_input(value)));
            }
            source.push_str(code);
            source
        }
    }
}

/// Strings are passed through bare; everything else is rendered as JSON.
fn render_input(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
