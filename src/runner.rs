//! External process execution

use crate::command::CommandLine;
use crate::utils::Timer;
use crate::{SentieonError, SentieonResult};
use std::collections::VecDeque;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;

/// Stderr lines kept for the error of a failed command
pub const STDERR_TAIL_LINES: usize = 200;

/// Executes a command line, failing on a non-zero exit
pub trait CommandRunner {
    fn run(&self, command: &CommandLine, description: &str) -> SentieonResult<()>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, command: &CommandLine, description: &str) -> SentieonResult<()> {
        (**self).run(command, description)
    }
}

/// Runs commands through `bash -o pipefail -c`
#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: PathBuf,
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self {
            shell: PathBuf::from("bash"),
        }
    }
}

impl ShellRunner {
    pub fn new(shell: impl Into<PathBuf>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl CommandRunner for ShellRunner {
    fn run(&self, command: &CommandLine, description: &str) -> SentieonResult<()> {
        let rendered = command.render()?;
        log::info!("{}", description);
        log::debug!("{}", rendered);

        let _timer = Timer::new(description);
        let mut child = Command::new(&self.shell)
            .arg("-o")
            .arg("pipefail")
            .arg("-c")
            .arg(&rendered)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                SentieonError::Io(std::io::Error::new(
                    e.kind(),
                    format!("Could not start {}: {}", self.shell.display(), e),
                ))
            })?;

        // Drain stdout on its own thread so neither pipe can fill up and block
        let stdout = child.stdout.take().map(|out| {
            thread::spawn(move || {
                for line in BufReader::new(out).lines().map_while(Result::ok) {
                    log::debug!("[stdout] {}", line);
                }
            })
        });

        let mut stderr_tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
        if let Some(err) = child.stderr.take() {
            for line in BufReader::new(err).lines().map_while(Result::ok) {
                log::info!("[stderr] {}", line);
                if stderr_tail.len() == STDERR_TAIL_LINES {
                    stderr_tail.pop_front();
                }
                stderr_tail.push_back(line);
            }
        }

        let status = child.wait()?;
        if let Some(handle) = stdout {
            if handle.join().is_err() {
                log::warn!("stdout reader for {} panicked", description);
            }
        }

        if !status.success() {
            let stderr = Vec::from(stderr_tail).join("\n");
            return Err(SentieonError::Execution {
                description: description.to_string(),
                command: rendered,
                status: status.code(),
                stderr: stderr.trim().to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_successful_command() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("touched.txt");
        let cmd = CommandLine::new("touch").path_arg(&target);

        ShellRunner::default().run(&cmd, "touch file").unwrap();
        assert!(target.exists());
    }

    #[test]
    fn test_exports_reach_the_command() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("license.txt");
        let cmd = CommandLine::new("sh")
            .export("SENTIEON_LICENSE", "1234@license-server:8990")
            .arg("-c")
            .arg(format!("printenv SENTIEON_LICENSE > {}", target.display()));

        ShellRunner::default().run(&cmd, "print license").unwrap();
        assert_eq!(
            std::fs::read_to_string(&target).unwrap().trim(),
            "1234@license-server:8990"
        );
    }

    #[test]
    fn test_failing_command() {
        let cmd = CommandLine::new("sh").arg("-c").arg("echo broken >&2; exit 3");
        let err = ShellRunner::default().run(&cmd, "failing step").unwrap_err();

        match err {
            SentieonError::Execution {
                description,
                status,
                stderr,
                ..
            } => {
                assert_eq!(description, "failing step");
                assert_eq!(status, Some(3));
                assert_eq!(stderr, "broken");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_long_output_is_streamed() {
        let script = "seq 1 100000; for i in $(seq 1 300); do echo line$i >&2; done; exit 1";
        let cmd = CommandLine::new("sh").arg("-c").arg(script);
        let err = ShellRunner::default().run(&cmd, "chatty step").unwrap_err();

        match err {
            SentieonError::Execution { status, stderr, .. } => {
                assert_eq!(status, Some(1));
                let lines: Vec<&str> = stderr.lines().collect();
                assert_eq!(lines.len(), STDERR_TAIL_LINES);
                assert_eq!(lines.first(), Some(&"line101"));
                assert_eq!(lines.last(), Some(&"line300"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_missing_shell() {
        let cmd = CommandLine::new("true");
        let runner = ShellRunner::new("/nonexistent/shell");
        assert!(matches!(runner.run(&cmd, "noop"), Err(SentieonError::Io(_))));
    }
}
