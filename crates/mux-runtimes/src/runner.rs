//! Subprocess launch and capture.
//!
//! The child is spawned non-blocking so its pid is known (and can be written
//! to the tracking file) before any output arrives. Reader threads feed
//! combined stdout/stderr lines over a channel; the collecting loop drains it
//! incrementally so the caller can mirror progress into the tracking file
//! while the process runs.

use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::error::RuntimeError;
use crate::types::{RunOutcome, RuntimeCommand, StopReason};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryRunner {
    pub poll_interval: Duration,
}

impl Default for QueryRunner {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(50),
        }
    }
}

impl QueryRunner {
    /// Spawns the rendered command in `working_dir`. A missing binary or
    /// working directory surfaces here as a spawn failure.
    pub fn spawn(
        &self,
        command: &RuntimeCommand,
        working_dir: &Path,
    ) -> Result<ActiveQuery, RuntimeError> {
        let mut child = Command::new(&command.executable)
            .args(&command.args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| RuntimeError::Spawn {
                executable: command.executable.clone(),
                source,
            })?;

        let (tx, rx) = mpsc::channel::<String>();
        let mut readers = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_reader(stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_reader(stderr, tx.clone()));
        }
        drop(tx);

        Ok(ActiveQuery {
            child,
            rx,
            readers,
            poll_interval: self.poll_interval,
        })
    }
}

pub struct ActiveQuery {
    child: Child,
    rx: mpsc::Receiver<String>,
    readers: Vec<JoinHandle<()>>,
    poll_interval: Duration,
}

impl ActiveQuery {
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Blocks until the child exits, invoking `on_line` for every line of
    /// output as it arrives. Returns the full captured output alongside the
    /// exit classification.
    pub fn collect(mut self, on_line: &mut dyn FnMut(&str)) -> Result<RunOutcome, RuntimeError> {
        let mut output = String::new();

        let status = loop {
            drain(&self.rx, &mut output, on_line);

            match self.child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(source) => {
                    return Err(RuntimeError::Subprocess {
                        message: source.to_string(),
                    })
                }
            }
            thread::sleep(self.poll_interval);
        };

        for reader in self.readers {
            let _ = reader.join();
        }
        drain(&self.rx, &mut output, on_line);

        let exit_code = status.code();
        let stop_reason = if status.success() {
            StopReason::Completed
        } else if exit_code.is_none() {
            // Terminated by a signal, e.g. a concurrent cancel.
            StopReason::Killed
        } else {
            StopReason::Failed
        };

        Ok(RunOutcome {
            stop_reason,
            exit_code,
            output,
        })
    }
}

fn spawn_reader(stream: impl Read + Send + 'static, tx: mpsc::Sender<String>) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut reader = BufReader::new(stream);
        loop {
            let mut line = String::new();
            match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    })
}

fn drain(rx: &mpsc::Receiver<String>, output: &mut String, on_line: &mut dyn FnMut(&str)) {
    while let Ok(line) = rx.try_recv() {
        on_line(&line);
        output.push_str(&line);
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::QueryRunner;
    use crate::error::RuntimeError;
    use crate::types::{RuntimeCommand, StopReason};

    fn sh(script: &str) -> RuntimeCommand {
        RuntimeCommand::new("sh").arg("-c").arg(script)
    }

    #[test]
    fn collect_captures_stdout_and_reports_success() {
        let runner = QueryRunner::default();
        let active = runner
            .spawn(&sh("printf 'line one\\nline two\\n'"), Path::new("/tmp"))
            .expect("spawn");
        assert!(active.pid() > 0);

        let mut seen = Vec::new();
        let outcome = active
            .collect(&mut |line| seen.push(line.to_string()))
            .expect("collect");

        assert_eq!(outcome.stop_reason, StopReason::Completed);
        assert_eq!(outcome.exit_code, Some(0));
        assert_eq!(outcome.output, "line one\nline two\n");
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn collect_includes_stderr_in_output() {
        let runner = QueryRunner::default();
        let active = runner
            .spawn(&sh("echo err >&2"), Path::new("/tmp"))
            .expect("spawn");
        let outcome = active.collect(&mut |_| {}).expect("collect");
        assert!(outcome.output.contains("err"));
    }

    #[test]
    fn nonzero_exit_is_reported_as_failed_with_code() {
        let runner = QueryRunner::default();
        let active = runner
            .spawn(&sh("echo partial; exit 3"), Path::new("/tmp"))
            .expect("spawn");
        let outcome = active.collect(&mut |_| {}).expect("collect");

        assert_eq!(outcome.stop_reason, StopReason::Failed);
        assert_eq!(outcome.exit_code, Some(3));
        assert!(outcome.output.contains("partial"));
    }

    #[test]
    fn missing_binary_is_a_spawn_error() {
        let runner = QueryRunner::default();
        let command = RuntimeCommand::new("/definitely/not/a/binary").arg("x");
        let err = runner
            .spawn(&command, Path::new("/tmp"))
            .err()
            .expect("spawn must fail");
        assert!(matches!(err, RuntimeError::Spawn { .. }));
    }

    #[test]
    fn missing_working_dir_is_a_spawn_error() {
        let runner = QueryRunner::default();
        let err = runner
            .spawn(&sh("true"), Path::new("/definitely/not/a/dir"))
            .err()
            .expect("spawn must fail");
        assert!(matches!(err, RuntimeError::Spawn { .. }));
    }
}
