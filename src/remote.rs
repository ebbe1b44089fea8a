//! Remote shell and transfer seam
//!
//! The Deployer talks to the remote host through the [`RemoteShell`] trait:
//! one operation copies files (scp), the other runs a literal command string
//! (ssh). [`SshShell`] is the production implementation; tests use a
//! recording double so no network is involved.
//!
//! Remote commands block until completion. No timeout is configured, so a
//! hung remote command blocks the whole deployment.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::{GreetctlError, GreetctlResult};

/// Abstract secure-transfer / remote-command interface
pub trait RemoteShell {
    /// Copy local files into a remote directory, overwriting by name
    fn copy(&self, sources: &[PathBuf], dest_dir: &Path) -> GreetctlResult<()>;

    /// Run a literal shell command string on the remote host
    fn run(&self, command: &str) -> GreetctlResult<String>;

    /// Human-readable destination for reporting
    fn destination(&self) -> &str;
}

/// Remote shell implementation using ssh/scp subprocesses
pub struct SshShell {
    /// SSH destination (user@host or host)
    destination: String,
    ssh_program: String,
    scp_program: String,
}

impl SshShell {
    pub fn new(destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            ssh_program: "ssh".to_string(),
            scp_program: "scp".to_string(),
        }
    }

    /// Override the ssh/scp binaries (test seam, unusual environments)
    pub fn with_programs(
        mut self,
        ssh_program: impl Into<String>,
        scp_program: impl Into<String>,
    ) -> Self {
        self.ssh_program = ssh_program.into();
        self.scp_program = scp_program.into();
        self
    }

    /// Quote a path for safe use in remote shell commands
    pub fn quote_path(path: &Path) -> String {
        format!("'{}'", path.to_string_lossy().replace('\'', "'\\''"))
    }

    /// Build the scp argument list: sources followed by `dest:dir`
    fn scp_args(&self, sources: &[PathBuf], dest_dir: &Path) -> Vec<String> {
        let mut args: Vec<String> = sources
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        args.push(format!("{}:{}", self.destination, dest_dir.display()));
        args
    }
}

impl RemoteShell for SshShell {
    fn copy(&self, sources: &[PathBuf], dest_dir: &Path) -> GreetctlResult<()> {
        let args = self.scp_args(sources, dest_dir);
        let output = Command::new(&self.scp_program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| GreetctlError::Transfer {
                dest: format!("{}:{}", self.destination, dest_dir.display()),
                message: format!("failed to launch {}: {}", self.scp_program, e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GreetctlError::Transfer {
                dest: format!("{}:{}", self.destination, dest_dir.display()),
                message: stderr.trim().to_string(),
            });
        }

        Ok(())
    }

    fn run(&self, command: &str) -> GreetctlResult<String> {
        let output = Command::new(&self.ssh_program)
            .arg(&self.destination)
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| GreetctlError::RemoteCommand {
                command: command.to_string(),
                message: format!("failed to launch {}: {}", self.ssh_program, e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GreetctlError::RemoteCommand {
                command: command.to_string(),
                message: stderr.trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn destination(&self) -> &str {
        &self.destination
    }
}

/// Recording remote shell for tests
///
/// Records every call in order. Failures can be injected per step by
/// substring match against the command (or `"copy"` for transfers).
#[cfg(test)]
pub struct RecordingShell {
    pub calls: std::sync::Mutex<Vec<ShellCall>>,
    fail_on: Option<String>,
}

#[cfg(test)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCall {
    Copy {
        sources: Vec<PathBuf>,
        dest_dir: PathBuf,
    },
    Run {
        command: String,
    },
}

#[cfg(test)]
impl RecordingShell {
    pub fn new() -> Self {
        Self {
            calls: std::sync::Mutex::new(Vec::new()),
            fail_on: None,
        }
    }

    /// Fail any call whose description contains `needle`
    pub fn failing_on(needle: impl Into<String>) -> Self {
        Self {
            calls: std::sync::Mutex::new(Vec::new()),
            fail_on: Some(needle.into()),
        }
    }

    pub fn calls(&self) -> Vec<ShellCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl RemoteShell for RecordingShell {
    fn copy(&self, sources: &[PathBuf], dest_dir: &Path) -> GreetctlResult<()> {
        self.calls.lock().unwrap().push(ShellCall::Copy {
            sources: sources.to_vec(),
            dest_dir: dest_dir.to_path_buf(),
        });
        if self.fail_on.as_deref() == Some("copy") {
            return Err(GreetctlError::Transfer {
                dest: dest_dir.display().to_string(),
                message: "injected transfer failure".to_string(),
            });
        }
        Ok(())
    }

    fn run(&self, command: &str) -> GreetctlResult<String> {
        self.calls.lock().unwrap().push(ShellCall::Run {
            command: command.to_string(),
        });
        if let Some(needle) = &self.fail_on {
            if command.contains(needle.as_str()) {
                return Err(GreetctlError::RemoteCommand {
                    command: command.to_string(),
                    message: "injected remote failure".to_string(),
                });
            }
        }
        Ok(String::new())
    }

    fn destination(&self) -> &str {
        "test@remote"
    }
}
