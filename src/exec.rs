use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::debug;

use crate::error::{LionpError, Result};

/// Captured output of a successful command, trimmed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// An external program invocation (git, npm, pnpm, git-cliff).
///
/// Any non-zero exit status becomes an `ExternalTool` error that keeps the
/// program's stderr so callers can classify the failure (OTP challenges,
/// missing packages, branch protection).
#[derive(Debug, Clone)]
pub struct ExternalCommand {
    program: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
}

impl ExternalCommand {
    pub fn new(program: impl Into<String>) -> Self {
        ExternalCommand {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.cwd = Some(dir.to_path_buf());
        self
    }

    /// The command line as a user would type it
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }
        cmd
    }

    /// Run to completion and capture output.
    pub fn run(&self) -> Result<CommandOutput> {
        debug!("running `{}`", self.display());

        let output = self.command().output().map_err(|e| {
            LionpError::external(format!("Failed to execute `{}`: {}", self.display(), e))
        })?;

        self.finish(output)
    }

    /// Like [`run`](Self::run) but kills the process once `timeout` elapses.
    pub fn run_with_timeout(&self, timeout: Duration, timeout_message: &str) -> Result<CommandOutput> {
        debug!("running `{}` (timeout {:?})", self.display(), timeout);

        let mut child = self
            .command()
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                LionpError::external(format!("Failed to execute `{}`: {}", self.display(), e))
            })?;

        // read while waiting, or a chatty child blocks on a full pipe
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let started = Instant::now();
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if started.elapsed() >= timeout {
                // already-exited races are fine here
                let _ = child.kill();
                let _ = child.wait();
                return Err(LionpError::external(timeout_message));
            }
            thread::sleep(Duration::from_millis(50));
        };

        self.finish(Output {
            status,
            stdout: stdout.join().unwrap_or_default(),
            stderr: stderr.join().unwrap_or_default(),
        })
    }

    fn finish(&self, output: Output) -> Result<CommandOutput> {
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !output.status.success() {
            let code = output
                .status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            let mut message = format!("Command failed with exit code {}: {}", code, self.display());
            if !stderr.is_empty() {
                message.push('\n');
                message.push_str(&stderr);
            }
            debug!("`{}` failed: {}", self.display(), stderr);
            return Err(LionpError::external_with_stderr(message, stderr));
        }

        Ok(CommandOutput { stdout, stderr })
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}
