//! Command-backed synthesis collaborator
//!
//! Spawns the configured command once per call, writes the rendered payload
//! to its stdin and takes its stdout as the synthesis text. A command still
//! running at its deadline is killed and reaped, so an abandoned gateway
//! call never leaves a child behind.

use floral_intent::{SynthesisError, SynthesisPayload, Synthesizer};
use std::io::{ErrorKind, Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Longest stderr excerpt carried into a failure message.
const MAX_STDERR_CHARS: usize = 300;

/// Interval between exit checks while the command runs.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone)]
pub struct CommandSynthesizer {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandSynthesizer {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    /// Poll until the child exits or the deadline passes. On expiry the
    /// child is killed and reaped.
    fn wait_until_deadline(&self, child: &mut Child) -> Result<ExitStatus, SynthesisError> {
        let deadline = Instant::now() + self.timeout;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) if Instant::now() >= deadline => {
                    warn!(program = %self.program, timeout_ms = self.timeout.as_millis() as u64, "Killing synthesis command");
                    if let Err(e) = child.kill() {
                        debug!(program = %self.program, error = %e, "Kill failed");
                    }
                    let _ = child.wait();
                    return Err(SynthesisError::Timeout(self.timeout));
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(SynthesisError::Failed(format!(
                        "failed to wait for '{}': {}",
                        self.program, e
                    )));
                }
            }
        }
    }
}

/// Read a pipe to the end on its own thread so a chatty child never blocks
/// on a full pipe.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

fn collect(handle: JoinHandle<Vec<u8>>) -> Vec<u8> {
    handle.join().unwrap_or_default()
}

impl Synthesizer for CommandSynthesizer {
    fn synthesize(&self, payload: &SynthesisPayload) -> Result<String, SynthesisError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SynthesisError::Failed(format!("failed to start '{}': {}", self.program, e)))?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());
        let prompt = payload.render_prompt();
        let writer = child.stdin.take().map(|mut stdin| {
            thread::spawn(move || match stdin.write_all(prompt.as_bytes()) {
                // The exit status explains a command that stopped reading.
                Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(()),
                other => other,
            })
        });

        // On timeout the pipe threads are left to finish on their own: a
        // grandchild may still hold the pipes open.
        let status = self.wait_until_deadline(&mut child)?;
        let write_result = writer.map(|handle| handle.join().unwrap_or(Ok(())));
        let stdout = collect(stdout);
        let stderr = collect(stderr);

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr);
            let excerpt: String = stderr.trim().chars().take(MAX_STDERR_CHARS).collect();
            return Err(SynthesisError::Failed(if excerpt.is_empty() {
                format!("'{}' exited with {}", self.program, status)
            } else {
                format!("'{}' exited with {}: {}", self.program, status, excerpt)
            }));
        }
        if let Some(Err(e)) = write_result {
            return Err(SynthesisError::Failed(format!("failed to write prompt: {e}")));
        }

        let text = String::from_utf8_lossy(&stdout).trim().to_string();
        debug!(program = %self.program, bytes = text.len(), "Synthesis command finished");
        if text.is_empty() {
            return Err(SynthesisError::Empty);
        }
        Ok(text)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SECOND: Duration = Duration::from_secs(1);

    fn payload() -> SynthesisPayload {
        SynthesisPayload {
            request: "romantic spring wedding".to_string(),
            selections: Vec::new(),
            alternates: Vec::new(),
            confidence: 0.4,
            notes: Vec::new(),
            instruction: "Describe it.".to_string(),
        }
    }

    #[test]
    fn test_stdout_becomes_text() {
        let synth = CommandSynthesizer::new("cat", Vec::new(), SECOND);
        let text = synth.synthesize(&payload()).unwrap();
        assert!(text.starts_with("Request: romantic spring wedding"));
        assert!(text.ends_with("Describe it."));
    }

    #[test]
    fn test_non_zero_exit_is_failure() {
        let synth = CommandSynthesizer::new(
            "sh",
            vec!["-c".to_string(), "cat >/dev/null; echo quota exceeded >&2; exit 3".to_string()],
            SECOND,
        );
        match synth.synthesize(&payload()) {
            Err(SynthesisError::Failed(message)) => assert!(message.contains("quota exceeded")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn test_blank_output_is_empty() {
        let synth = CommandSynthesizer::new("sh", vec!["-c".to_string(), "cat >/dev/null; echo".to_string()], SECOND);
        assert_eq!(synth.synthesize(&payload()), Err(SynthesisError::Empty));
    }

    #[test]
    fn test_missing_program_is_failure() {
        let synth = CommandSynthesizer::new("floral-no-such-command", Vec::new(), SECOND);
        assert!(matches!(synth.synthesize(&payload()), Err(SynthesisError::Failed(_))));
    }

    #[test]
    fn test_overdue_command_is_killed() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("finished");
        let script = format!("sleep 1; touch '{}'", marker.display());
        let synth = CommandSynthesizer::new(
            "sh",
            vec!["-c".to_string(), script],
            Duration::from_millis(50),
        );

        let started = Instant::now();
        assert_eq!(
            synth.synthesize(&payload()),
            Err(SynthesisError::Timeout(Duration::from_millis(50)))
        );
        assert!(started.elapsed() < SECOND);

        thread::sleep(Duration::from_millis(1500));
        assert!(!marker.exists(), "command kept running past its deadline");
    }

    #[test]
    fn test_large_prompt_with_large_output() {
        // Echoes stdin back, so both pipes exceed their buffers at once.
        let mut payload = payload();
        payload.instruction = "petal ".repeat(50_000);
        let synth = CommandSynthesizer::new("cat", Vec::new(), Duration::from_secs(10));
        let text = synth.synthesize(&payload).unwrap();
        assert!(text.len() > 250_000);
    }
}
