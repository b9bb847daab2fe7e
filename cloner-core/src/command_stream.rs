// Standard library
use std::ffi::OsStr;
use std::process::Output;
use std::sync::Arc;
use std::time::Duration;

// External crates
use crate::error::{CoreError, Result};
use duct::{cmd, Expression, Handle};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use which::which;

/// Lines of combined output attached to a failure message.
const ERROR_CONTEXT_LINES: usize = 20;

fn describe<A: AsRef<OsStr>>(command: &str, args: &[A]) -> String {
    let mut full = command.to_string();
    for arg in args {
        full.push(' ');
        full.push_str(&arg.as_ref().to_string_lossy());
    }
    full
}

fn output_tail(output: &[u8]) -> String {
    let text = String::from_utf8_lossy(output);
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(ERROR_CONTEXT_LINES);
    lines[start..].join("\n")
}

fn expression<A: AsRef<OsStr>>(command: &str, args: &[A]) -> Expression {
    cmd(command, args.iter().map(|a| a.as_ref().to_os_string()))
        .stdin_null()
        .unchecked()
}

/// Run an external command to completion, logging its combined output.
///
/// The child is killed when `timeout` elapses or `cancel` fires, so a hung
/// remote never pins the caller. A non-zero exit becomes
/// [`CoreError::Command`] carrying the exit code and the tail of the output.
pub async fn run_command<A: AsRef<OsStr>>(
    command: &str,
    args: &[A],
    timeout: Option<Duration>,
    cancel: &CancellationToken,
) -> Result<()> {
    let full_command = describe(command, args);
    debug!(command = %full_command, "Starting external command");

    let expression = expression(command, args)
        .stderr_to_stdout()
        .stdout_capture();
    supervise(expression, full_command, timeout, cancel).await
}

/// Like [`run_command`], with stdout and stderr sent to the null device.
///
/// For launchers that hand off to a long-lived process (GUI editors), which
/// would otherwise keep the output pipe open after the launcher exits.
pub async fn run_command_quiet<A: AsRef<OsStr>>(
    command: &str,
    args: &[A],
    timeout: Option<Duration>,
    cancel: &CancellationToken,
) -> Result<()> {
    let full_command = describe(command, args);
    debug!(command = %full_command, "Starting external command without output");

    let expression = expression(command, args).stdout_null().stderr_null();
    supervise(expression, full_command, timeout, cancel).await
}

async fn supervise(
    expression: Expression,
    full_command: String,
    timeout: Option<Duration>,
    cancel: &CancellationToken,
) -> Result<()> {
    let handle = Arc::new(
        expression
            .start()
            .map_err(|e| CoreError::Command(format!("failed to start '{}': {}", full_command, e)))?,
    );

    // Waiting joins the output reader, which blocks until every holder of
    // the pipe exits; keep that off the async workers.
    let waiter = Arc::clone(&handle);
    let mut wait = tokio::task::spawn_blocking(move || waiter.wait().cloned());

    let deadline = async {
        match timeout {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        joined = &mut wait => {
            let output = joined
                .map_err(|e| CoreError::Command(format!("waiting for '{}' failed: {}", full_command, e)))?
                .map_err(|e| CoreError::Command(format!("error waiting for '{}': {}", full_command, e)))?;
            check_output(&full_command, &output)
        }
        _ = cancel.cancelled() => {
            kill_in_background(handle);
            Err(CoreError::Cancelled(full_command))
        }
        _ = deadline => {
            kill_in_background(handle);
            Err(CoreError::Timeout(format!(
                "'{}' exceeded {}s",
                full_command,
                timeout.map(|limit| limit.as_secs()).unwrap_or_default()
            )))
        }
    }
}

fn kill_in_background(handle: Arc<Handle>) {
    tokio::task::spawn_blocking(move || {
        let _ = handle.kill();
    });
}

fn check_output(full_command: &str, output: &Output) -> Result<()> {
    for line in String::from_utf8_lossy(&output.stdout).lines() {
        debug!(command = full_command, "{}", line);
    }

    if output.status.success() {
        return Ok(());
    }

    let code = output
        .status
        .code()
        .map(|c| c.to_string())
        .unwrap_or_else(|| "signal".to_string());
    let tail = output_tail(&output.stdout);
    let message = if tail.is_empty() {
        format!("'{}' exited with status {}", full_command, code)
    } else {
        format!("'{}' exited with status {}: {}", full_command, code, tail)
    };
    Err(CoreError::Command(message))
}

/// Checks if a command-line tool is available in the system's PATH.
pub fn is_tool_installed(tool_name: &str) -> bool {
    which(tool_name).is_ok()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn successful_command_returns_ok() {
        let cancel = CancellationToken::new();
        run_command("sh", &["-c", "exit 0"], None, &cancel)
            .await
            .expect("sh should succeed");
    }

    #[tokio::test]
    async fn failing_command_reports_status_and_output() {
        let cancel = CancellationToken::new();
        let err = run_command("sh", &["-c", "echo boom; exit 3"], None, &cancel)
            .await
            .unwrap_err();

        let message = err.to_string();
        assert!(matches!(err, CoreError::Command(_)));
        assert!(message.contains("status 3"), "{}", message);
        assert!(message.contains("boom"), "{}", message);
    }

    #[tokio::test]
    async fn missing_program_fails_to_start() {
        let cancel = CancellationToken::new();
        let err = run_command(
            "definitely-not-a-real-binary-xyz",
            &["--version"],
            None,
            &cancel,
        )
        .await
        .unwrap_err();

        assert!(err.to_string().contains("failed to start"));
    }

    #[tokio::test]
    async fn slow_command_is_killed_on_timeout() {
        let cancel = CancellationToken::new();
        let err = run_command(
            "sh",
            &["-c", "sleep 5"],
            Some(Duration::from_millis(200)),
            &cancel,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, CoreError::Timeout(_)));
    }

    #[tokio::test]
    async fn cancelled_command_is_killed() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(150)).await;
            trigger.cancel();
        });

        let err = run_command("sh", &["-c", "sleep 5"], None, &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::Cancelled(_)));
    }

    #[test]
    fn output_tail_keeps_last_lines() {
        let text: String = (0..30).map(|i| format!("line{}\n", i)).collect();
        let tail = output_tail(text.as_bytes());

        assert!(tail.starts_with("line10"));
        assert!(tail.ends_with("line29"));
    }

    #[tokio::test]
    async fn lingering_grandchild_does_not_block_the_runtime() {
        let cancel = CancellationToken::new();
        let started = std::time::Instant::now();

        // The background sleep keeps the captured pipe open after `sh` exits.
        let err = run_command(
            "sh",
            &["-c", "sleep 3 & exit 0"],
            Some(Duration::from_millis(300)),
            &cancel,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, CoreError::Timeout(_)));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn quiet_command_returns_when_launcher_exits() {
        let cancel = CancellationToken::new();
        let started = std::time::Instant::now();

        run_command_quiet(
            "sh",
            &["-c", "sleep 3 & exit 0"],
            Some(Duration::from_secs(10)),
            &cancel,
        )
        .await
        .expect("launcher exits immediately");

        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn quiet_command_reports_failure_status() {
        let cancel = CancellationToken::new();
        let err = run_command_quiet("sh", &["-c", "exit 4"], None, &cancel)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("status 4"));
    }
}
