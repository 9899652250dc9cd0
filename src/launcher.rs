//! Process launcher - spawns the Selenium server command with stdio capture.
//!
//! The command string is handed to the platform shell verbatim, stdout and
//! stderr are decoded as UTF-8 and multiplexed into a single tagged line
//! stream, and process exit fires a watch channel exactly once. No ordering
//! is guaranteed between the two pipes; consumers must not rely on it.

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, watch};

use crate::error::SupervisorError;

/// Where an output line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSource {
    Stdout,
    Stderr,
}

/// A single line of console output from the launched process.
#[derive(Debug, Clone)]
pub struct OutputLine {
    pub source: OutputSource,
    pub text: String,
}

/// Handle to a launched server process.
///
/// Dropping the handle abandons the process without killing it; shutting
/// the server down is the supervisor's job, via the remote control call.
pub struct SpawnedServer {
    /// Interleaved stdout/stderr lines. Closed once both pipes are done.
    pub lines: mpsc::Receiver<OutputLine>,
    /// Flips to `true` exactly once, when the process exits.
    pub exited: watch::Receiver<bool>,
    /// PID of the shell wrapping the server command, for log correlation.
    pub pid: u32,
}

/// Spawn `command_line` through the platform shell.
///
/// POSIX: `/bin/sh -c <command>`. Windows: `cmd.exe /s /c` with forward
/// slashes normalized to backslashes and the command passed verbatim so
/// `cmd.exe` sees its own quoting.
pub fn launch(command_line: &str) -> Result<SpawnedServer, SupervisorError> {
    let mut cmd = shell_command(command_line);
    cmd.stdin(std::process::Stdio::inherit())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .kill_on_drop(false);

    crate::utils::apply_creation_flags(&mut cmd);

    let mut child = cmd.spawn().map_err(|source| SupervisorError::Spawn {
        command: command_line.to_string(),
        source,
    })?;

    let pid = child.id().unwrap_or(0);
    tracing::debug!("Spawned '{}' with PID {}", command_line, pid);

    let (line_tx, line_rx) = mpsc::channel::<OutputLine>(256);
    let (exit_tx, exit_rx) = watch::channel(false);

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    // stdout reader
    if let Some(stdout) = stdout {
        let tx = line_tx.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(text)) = lines.next_line().await {
                if tx
                    .send(OutputLine { source: OutputSource::Stdout, text })
                    .await
                    .is_err()
                {
                    // Receiver dropped: the instance was abandoned.
                    break;
                }
            }
        });
    }

    // stderr reader
    if let Some(stderr) = stderr {
        let tx = line_tx;
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(text)) = lines.next_line().await {
                if tx
                    .send(OutputLine { source: OutputSource::Stderr, text })
                    .await
                    .is_err()
                {
                    break;
                }
            }
        });
    }

    // process waiter
    tokio::spawn(async move {
        match child.wait().await {
            Ok(status) => tracing::debug!("PID {} exited with {}", pid, status),
            Err(e) => tracing::warn!("Failed to wait for PID {}: {}", pid, e),
        }
        let _ = exit_tx.send(true);
    });

    Ok(SpawnedServer { lines: line_rx, exited: exit_rx, pid })
}

#[cfg(windows)]
fn shell_command(command_line: &str) -> Command {
    let mut cmd = Command::new("cmd.exe");
    cmd.arg("/s").arg("/c");
    cmd.raw_arg(command_line.replace('/', "\\"));
    cmd
}

#[cfg(not(windows))]
fn shell_command(command_line: &str) -> Command {
    let mut cmd = Command::new("/bin/sh");
    cmd.arg("-c").arg(command_line);
    cmd
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    async fn collect_lines(server: &mut SpawnedServer) -> Vec<OutputLine> {
        let mut out = Vec::new();
        while let Some(line) = server.lines.recv().await {
            out.push(line);
        }
        out
    }

    #[tokio::test]
    async fn captures_stdout_lines() {
        let mut server = launch("echo one; echo two").unwrap();
        let lines = collect_lines(&mut server).await;
        let texts: Vec<_> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "two"]);
        assert!(lines.iter().all(|l| l.source == OutputSource::Stdout));
    }

    #[tokio::test]
    async fn tags_stderr_lines() {
        let mut server = launch("echo oops >&2").unwrap();
        let lines = collect_lines(&mut server).await;
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].source, OutputSource::Stderr);
        assert_eq!(lines[0].text, "oops");
    }

    #[tokio::test]
    async fn exit_signal_fires_once() {
        let mut server = launch("true").unwrap();
        server.exited.changed().await.unwrap();
        assert!(*server.exited.borrow());
        // Sender is dropped after the single send; a second wait errors
        // rather than firing again.
        assert!(server.exited.changed().await.is_err());
    }

    #[tokio::test]
    async fn dropping_the_receiver_is_safe() {
        let server = launch("echo a; echo b; echo c").unwrap();
        // Abandoning the stream mid-flight must not panic the readers.
        drop(server);
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
}
