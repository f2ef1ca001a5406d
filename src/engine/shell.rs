//! Shell command execution
//!
//! Every engine interaction goes through [`Shell`], so the command sequence a
//! run produces can be recorded and asserted in tests.

use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::{Result, SandockError};

/// Outcome of one shell command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ShellOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

pub trait Shell {
    /// Run `command` through `sh -c`
    ///
    /// With `capture` the output is collected, otherwise the command inherits
    /// the terminal and only the exit code is reported.
    fn run(&self, command: &str, capture: bool) -> Result<ShellOutput>;

    /// Run capturing output, turning a non-zero exit into an error
    fn run_checked(&self, command: &str) -> Result<ShellOutput> {
        let output = self.run(command, true)?;
        if !output.success() {
            return Err(SandockError::Shell {
                command: command.to_string(),
                code: output.code,
                stdout: output.stdout,
                stderr: output.stderr,
            });
        }
        Ok(output)
    }
}

/// Join an argument vector into the command line handed to the shell
pub fn join_cmd(args: &[String]) -> String {
    args.join(" ")
}

/// Shell backed by the system `sh`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemShell;

impl Shell for SystemShell {
    fn run(&self, command: &str, capture: bool) -> Result<ShellOutput> {
        debug!(command, capture, "executing shell command");

        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);

        if !capture {
            let status = cmd
                .stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit())
                .status()?;
            return Ok(ShellOutput {
                code: exit_code(status),
                ..ShellOutput::default()
            });
        }

        let output = cmd.stdin(Stdio::null()).output()?;
        let result = ShellOutput {
            code: exit_code(output.status),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };
        debug!(code = result.code, "shell command finished");
        Ok(result)
    }
}

/// Signal terminations map to `128 + signal` like a shell does
fn exit_code(status: std::process::ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}
