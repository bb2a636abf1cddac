//! External program execution.
//!
//! Everything teststack runs on the host (the container engine, `git`)
//! goes through [`execute`]. Programs are run directly with an argument
//! vector; nothing here interprets shell syntax.

use crate::error::{Result, TeststackError};
use std::collections::HashMap;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// Result of executing a program.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Exit code (None if killed by signal).
    pub exit_code: Option<i32>,

    /// Standard output.
    pub stdout: String,

    /// Standard error.
    pub stderr: String,

    /// Execution duration.
    pub duration: Duration,

    /// Whether the program succeeded (exit code 0).
    pub success: bool,
}

impl CommandResult {
    /// Create a success result.
    pub fn success(stdout: String, stderr: String, duration: Duration) -> Self {
        Self {
            exit_code: Some(0),
            stdout,
            stderr,
            duration,
            success: true,
        }
    }

    /// Create a failure result.
    pub fn failure(
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
        duration: Duration,
    ) -> Self {
        Self {
            exit_code,
            stdout,
            stderr,
            duration,
            success: false,
        }
    }

    /// Exit code as reported to callers that sum codes.
    ///
    /// A process killed by a signal counts as `1`.
    pub fn code(&self) -> i32 {
        self.exit_code.unwrap_or(1)
    }

    /// Trimmed standard output, or `None` if the program failed or printed nothing.
    pub fn trimmed_stdout(&self) -> Option<String> {
        let out = self.stdout.trim();
        if self.success && !out.is_empty() {
            Some(out.to_string())
        } else {
            None
        }
    }
}

/// Options for program execution.
#[derive(Debug, Clone, Default)]
pub struct CommandOptions {
    /// Working directory.
    pub cwd: Option<std::path::PathBuf>,

    /// Environment variables (merged with system env).
    pub env: HashMap<String, String>,

    /// Capture stdout (if false, inherits from parent).
    pub capture_stdout: bool,

    /// Capture stderr (if false, inherits from parent).
    pub capture_stderr: bool,

    /// Connect stdin to the parent's stdin instead of `/dev/null`.
    pub inherit_stdin: bool,
}

/// Render a program and its arguments for display and error messages.
pub fn command_line(program: &str, args: &[String]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

/// Execute `program` with `args`.
///
/// Failing to spawn the program at all is an error. A nonzero exit status is
/// reported through the returned [`CommandResult`].
pub fn execute(program: &str, args: &[String], options: &CommandOptions) -> Result<CommandResult> {
    let start = Instant::now();

    let mut cmd = Command::new(program);
    cmd.args(args);

    if let Some(cwd) = &options.cwd {
        cmd.current_dir(cwd);
    }

    for (key, value) in &options.env {
        cmd.env(key, value);
    }

    if options.inherit_stdin {
        cmd.stdin(Stdio::inherit());
    } else {
        cmd.stdin(Stdio::null());
    }

    if options.capture_stdout {
        cmd.stdout(Stdio::piped());
    } else {
        cmd.stdout(Stdio::inherit());
    }

    if options.capture_stderr {
        cmd.stderr(Stdio::piped());
    } else {
        cmd.stderr(Stdio::inherit());
    }

    tracing::debug!("Executing: {}", command_line(program, args));

    let output = cmd.output().map_err(|e| {
        tracing::debug!("Failed to spawn {}: {}", program, e);
        TeststackError::CommandFailed {
            command: command_line(program, args),
            code: None,
        }
    })?;

    let duration = start.elapsed();

    let stdout = if options.capture_stdout {
        String::from_utf8_lossy(&output.stdout).to_string()
    } else {
        String::new()
    };

    let stderr = if options.capture_stderr {
        String::from_utf8_lossy(&output.stderr).to_string()
    } else {
        String::new()
    };

    if output.status.success() {
        Ok(CommandResult::success(stdout, stderr, duration))
    } else {
        Ok(CommandResult::failure(
            output.status.code(),
            stdout,
            stderr,
            duration,
        ))
    }
}

/// Execute with stdio attached to the terminal and return the exit code.
pub fn execute_interactive(program: &str, args: &[String], env: &HashMap<String, String>) -> Result<i32> {
    let options = CommandOptions {
        env: env.clone(),
        inherit_stdin: true,
        ..Default::default()
    };
    execute(program, args, &options).map(|r| r.code())
}

/// Execute and collect output without streaming.
pub fn execute_quiet(program: &str, args: &[String], cwd: Option<&Path>) -> Result<CommandResult> {
    let options = CommandOptions {
        cwd: cwd.map(|p| p.to_path_buf()),
        capture_stdout: true,
        capture_stderr: true,
        ..Default::default()
    };
    execute(program, args, &options)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn command_line_joins_arguments() {
        assert_eq!(
            command_line("docker", &args(&["ps", "-a"])),
            "docker ps -a"
        );
        assert_eq!(command_line("docker", &[]), "docker");
    }

    #[cfg(unix)]
    #[test]
    fn execute_successful_program() {
        let result = execute_quiet("echo", &args(&["hello"]), None).unwrap();

        assert!(result.success);
        assert_eq!(result.exit_code, Some(0));
        assert_eq!(result.trimmed_stdout().as_deref(), Some("hello"));
    }

    #[cfg(unix)]
    #[test]
    fn execute_failing_program() {
        let result = execute_quiet("sh", &args(&["-c", "exit 3"]), None).unwrap();

        assert!(!result.success);
        assert_eq!(result.exit_code, Some(3));
        assert_eq!(result.code(), 3);
        assert_eq!(result.trimmed_stdout(), None);
    }

    #[cfg(unix)]
    #[test]
    fn execute_with_env() {
        let mut options = CommandOptions {
            capture_stdout: true,
            ..Default::default()
        };
        options
            .env
            .insert("MY_VAR".to_string(), "my_value".to_string());

        let result = execute("sh", &args(&["-c", "echo $MY_VAR"]), &options).unwrap();

        assert!(result.stdout.contains("my_value"));
    }

    #[cfg(unix)]
    #[test]
    fn execute_with_cwd() {
        let temp = tempfile::TempDir::new().unwrap();
        let result = execute_quiet("pwd", &[], Some(temp.path())).unwrap();
        assert!(result.success);
    }

    #[test]
    fn missing_program_is_a_command_failure() {
        let err = execute_quiet("teststack-no-such-binary", &args(&["x"]), None).unwrap_err();
        match err {
            TeststackError::CommandFailed { command, code } => {
                assert_eq!(command, "teststack-no-such-binary x");
                assert_eq!(code, None);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn signal_exit_counts_as_one() {
        let result = CommandResult::failure(None, String::new(), String::new(), Duration::ZERO);
        assert_eq!(result.code(), 1);
    }
}
