//! One solver subprocess and its pipes.

use std::io::{BufRead, BufReader, BufWriter, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use crate::config::SolverConfig;

use super::{SolverError, SolverResult};

/// Poll interval while waiting for the solver to exit.
const WAIT_POLL: Duration = Duration::from_millis(50);

/// A solver process fed through stdin and read through stdout.
///
/// With `separate_diagnostics` set, stderr is drained on a background thread
/// and forwarded to the `chaseward::solver` log target. Otherwise the solver
/// inherits this process's stderr.
pub struct SolverProcess {
    config: SolverConfig,
    child: Option<Child>,
    writer: Option<BufWriter<ChildStdin>>,
    reader: Option<BufReader<ChildStdout>>,
}

impl SolverProcess {
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            child: None,
            writer: None,
            reader: None,
        }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Start the solver. A previously started process is terminated first.
    pub fn exec(&mut self) -> SolverResult<()> {
        self.close();

        let stderr = if self.config.separate_diagnostics {
            Stdio::piped()
        } else {
            Stdio::inherit()
        };
        let mut child = Command::new(&self.config.binary)
            .args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(stderr)
            .spawn()
            .map_err(|source| SolverError::Spawn {
                command: self.config.command_line(),
                source,
            })?;
        tracing::debug!(command = %self.config.command_line(), pid = child.id(), "solver started");

        if let Some(stderr) = child.stderr.take() {
            let spawned = std::thread::Builder::new()
                .name("chaseward-solver-stderr".into())
                .spawn(move || {
                    for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                        tracing::warn!(target: "chaseward::solver", "{line}");
                    }
                });
            if let Err(source) = spawned {
                let _ = child.kill();
                let _ = child.wait();
                return Err(SolverError::Io { source });
            }
        }

        self.writer = child.stdin.take().map(BufWriter::new);
        self.reader = child.stdout.take().map(BufReader::new);
        self.child = Some(child);
        Ok(())
    }

    /// Buffered input of the solver. Closed by [`solve`](Self::solve).
    pub fn writer(&mut self) -> SolverResult<&mut BufWriter<ChildStdin>> {
        self.writer.as_mut().ok_or(SolverError::NotStarted)
    }

    /// Take ownership of the solver input, e.g. to stream it on another
    /// thread while waiting in [`solve`](Self::solve). Dropping it closes the
    /// input.
    pub fn take_writer(&mut self) -> SolverResult<BufWriter<ChildStdin>> {
        self.writer.take().ok_or(SolverError::NotStarted)
    }

    /// Buffered output of the solver.
    pub fn reader(&mut self) -> SolverResult<&mut BufReader<ChildStdout>> {
        self.reader.as_mut().ok_or(SolverError::NotStarted)
    }

    /// Take ownership of the solver output, e.g. to read it on another
    /// thread while waiting in [`solve`](Self::solve).
    pub fn take_reader(&mut self) -> SolverResult<BufReader<ChildStdout>> {
        self.reader.take().ok_or(SolverError::NotStarted)
    }

    pub fn id(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    /// Close the solver input and wait for the solver to exit.
    ///
    /// Returns `None` if the configured timeout elapsed first. The process is
    /// left running in that case; call [`close`](Self::close) to stop it.
    pub fn solve(&mut self) -> SolverResult<Option<ExitStatus>> {
        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.flush() {
                tracing::warn!(error = %e, "failed to flush solver input");
            }
        }
        let child = self.child.as_mut().ok_or(SolverError::NotStarted)?;

        let Some(seconds) = self.config.timeout_seconds else {
            return child
                .wait()
                .map(Some)
                .map_err(|source| SolverError::Io { source });
        };

        let deadline = Instant::now() + Duration::from_secs(seconds);
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(Some(status)),
                Ok(None) => {
                    if Instant::now() >= deadline {
                        tracing::warn!(seconds, "solver did not exit before the timeout");
                        return Ok(None);
                    }
                    std::thread::sleep(WAIT_POLL);
                }
                Err(source) => return Err(SolverError::Io { source }),
            }
        }
    }

    /// Terminate the solver. Safe to call any number of times.
    pub fn close(&mut self) {
        self.writer = None;
        self.reader = None;
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Drop for SolverProcess {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::io::Read;

    use super::*;

    fn shell(script: &str) -> SolverConfig {
        SolverConfig {
            binary: "/bin/sh".into(),
            args: vec!["-c".into(), script.into()],
            timeout_seconds: None,
            separate_diagnostics: false,
        }
    }

    #[test]
    fn pipes_round_trip_through_cat() {
        let mut process = SolverProcess::new(shell("cat"));
        process.exec().unwrap();
        writeln!(process.writer().unwrap(), "p(a, b) .").unwrap();

        let status = process.solve().unwrap().unwrap();
        assert!(status.success());

        let mut output = String::new();
        process.reader().unwrap().read_to_string(&mut output).unwrap();
        assert_eq!(output, "p(a, b) .\n");
    }

    #[test]
    fn solve_returns_on_timeout_without_killing() {
        let mut config = shell("exec sleep 5");
        config.timeout_seconds = Some(1);
        let mut process = SolverProcess::new(config);
        process.exec().unwrap();

        let started = Instant::now();
        assert!(process.solve().unwrap().is_none());
        assert!(started.elapsed() < Duration::from_secs(4));
        assert!(process.id().is_some());

        process.close();
        process.close();
        assert!(process.id().is_none());
    }

    #[test]
    fn diagnostics_do_not_block_the_solver() {
        let mut config = shell("i=0; while [ $i -lt 2000 ]; do echo 'warning: line' >&2; i=$((i+1)); done; echo done");
        config.separate_diagnostics = true;
        let mut process = SolverProcess::new(config);
        process.exec().unwrap();

        assert!(process.solve().unwrap().unwrap().success());
        let mut output = String::new();
        process.reader().unwrap().read_to_string(&mut output).unwrap();
        assert_eq!(output, "done\n");
    }

    #[test]
    fn taken_writer_closes_input_on_drop() {
        let mut process = SolverProcess::new(shell("cat"));
        process.exec().unwrap();
        let mut writer = process.take_writer().unwrap();
        writeln!(writer, "q(c) .").unwrap();
        drop(writer);

        assert!(matches!(process.writer(), Err(SolverError::NotStarted)));
        assert!(process.solve().unwrap().unwrap().success());
        let mut output = String::new();
        process.reader().unwrap().read_to_string(&mut output).unwrap();
        assert_eq!(output, "q(c) .\n");
    }

    #[test]
    fn missing_binary_is_a_spawn_error() {
        let mut process = SolverProcess::new(SolverConfig {
            binary: "/nonexistent/clingo".into(),
            args: vec![],
            timeout_seconds: None,
            separate_diagnostics: false,
        });
        assert!(matches!(process.exec(), Err(SolverError::Spawn { .. })));
    }

    #[test]
    fn use_before_exec_fails() {
        let mut process = SolverProcess::new(SolverConfig::clingo());
        assert!(matches!(process.writer(), Err(SolverError::NotStarted)));
        assert!(matches!(process.solve(), Err(SolverError::NotStarted)));
    }
}
