//! Deployer pipeline
//!
//! Orchestrates the deployment flow as an explicit ordered pipeline of typed
//! steps:
//! 1. Preflight - every artifact must exist locally (no remote side effect on
//!    failure)
//! 2. Transfer - copy the whole artifact set to the remote directory
//! 3. SetPermissions - chmod 755 each executable, after transfer
//! 4. RestartNamespace - delete all pods in the namespace, always last
//!
//! The run aborts on the first failure with no rollback. A failed step after
//! a succeeded one stays visible in the report instead of being collapsed
//! into a bare script abort.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::config::Config;
use crate::error::{GreetctlError, GreetctlResult};
use crate::remote::{RemoteShell, SshShell};

/// Pipeline step identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Transfer,
    SetPermissions,
    RestartNamespace,
}

impl StepKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            StepKind::Transfer => "transfer",
            StepKind::SetPermissions => "set-permissions",
            StepKind::RestartNamespace => "restart-namespace",
        }
    }
}

/// Outcome of a single pipeline step
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub kind: StepKind,
    pub succeeded: bool,
    /// Error text when the step failed
    pub error: Option<String>,
}

impl StepOutcome {
    fn ok(kind: StepKind) -> Self {
        Self {
            kind,
            succeeded: true,
            error: None,
        }
    }

    fn failed(kind: StepKind, error: impl Into<String>) -> Self {
        Self {
            kind,
            succeeded: false,
            error: Some(error.into()),
        }
    }
}

/// An artifact that passed preflight, with its content digest
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactDigest {
    pub path: PathBuf,
    pub sha256: String,
}

/// Result of a deploy run
#[derive(Debug, Clone, Serialize)]
pub struct DeployReport {
    pub started_at: DateTime<Utc>,
    pub destination: String,
    /// Artifacts verified locally before any remote command
    pub artifacts: Vec<ArtifactDigest>,
    /// Step outcomes in execution order
    pub steps: Vec<StepOutcome>,
    pub dry_run: bool,
}

impl DeployReport {
    pub fn is_success(&self) -> bool {
        self.steps.iter().all(|s| s.succeeded)
    }

    /// First error in step order, if any
    pub fn first_error(&self) -> Option<&str> {
        self.steps
            .iter()
            .find_map(|s| s.error.as_deref())
    }
}

/// Options for a deploy run
#[derive(Debug, Clone, Default)]
pub struct DeployOptions {
    /// Print the plan, issue no remote command
    pub dry_run: bool,
}

/// Deployer - runs the typed pipeline against a remote shell
///
/// Parameterized by [`RemoteShell`] so tests can observe ordering without a
/// network. Concurrent deploys against the same target are unguarded.
pub struct Deployer<'a, S: RemoteShell> {
    config: &'a Config,
    shell: &'a S,
}

impl<'a, S: RemoteShell> Deployer<'a, S> {
    pub fn new(config: &'a Config, shell: &'a S) -> Self {
        Self { config, shell }
    }

    /// Check local preconditions without touching the remote host.
    ///
    /// Every artifact must resolve to an existing local file. Returns the
    /// artifact digests on success so reports can show what would ship.
    pub fn preflight(&self, local_root: &Path) -> GreetctlResult<Vec<ArtifactDigest>> {
        self.config.validate()?;

        let mut digests = Vec::new();
        for file in &self.config.artifacts.files {
            let path = local_root.join(file);
            if !path.is_file() {
                return Err(GreetctlError::MissingArtifact { path });
            }
            let content = fs::read(&path)?;
            let mut hasher = Sha256::new();
            hasher.update(&content);
            digests.push(ArtifactDigest {
                path: file.clone(),
                sha256: format!("sha256:{:x}", hasher.finalize()),
            });
        }
        Ok(digests)
    }

    /// Execute the pipeline. Preflight failures abort before any remote
    /// command; later failures stop the pipeline and stay in the report.
    pub fn run(&self, local_root: &Path, options: &DeployOptions) -> GreetctlResult<DeployReport> {
        let artifacts = self.preflight(local_root)?;

        let mut report = DeployReport {
            started_at: Utc::now(),
            destination: format!(
                "{}:{}",
                self.shell.destination(),
                self.config.remote.path.display()
            ),
            artifacts,
            steps: Vec::new(),
            dry_run: options.dry_run,
        };

        if options.dry_run {
            return Ok(report);
        }

        // Step 1: transfer the whole artifact set in one copy
        let sources: Vec<PathBuf> = self
            .config
            .artifacts
            .files
            .iter()
            .map(|f| local_root.join(f))
            .collect();
        match self.shell.copy(&sources, &self.config.remote.path) {
            Ok(()) => report.steps.push(StepOutcome::ok(StepKind::Transfer)),
            Err(e) => {
                report
                    .steps
                    .push(StepOutcome::failed(StepKind::Transfer, e.to_string()));
                return Ok(report);
            }
        }

        // Step 2: scripts must be executable before they run again
        for exe in &self.config.artifacts.executable {
            let remote_path = self.config.remote.path.join(exe);
            let command = format!("chmod 755 {}", SshShell::quote_path(&remote_path));
            if let Err(e) = self.shell.run(&command) {
                report
                    .steps
                    .push(StepOutcome::failed(StepKind::SetPermissions, e.to_string()));
                return Ok(report);
            }
        }
        if !self.config.artifacts.executable.is_empty() {
            report.steps.push(StepOutcome::ok(StepKind::SetPermissions));
        }

        // Step 3: cycle the namespace so the orchestrator picks up new code.
        // Fire and forget: no health verification afterwards.
        let restart = format!(
            "kubectl delete pods --all --namespace={}",
            self.config.cluster.namespace
        );
        match self.shell.run(&restart) {
            Ok(_) => report
                .steps
                .push(StepOutcome::ok(StepKind::RestartNamespace)),
            Err(e) => report.steps.push(StepOutcome::failed(
                StepKind::RestartNamespace,
                e.to_string(),
            )),
        }

        Ok(report)
    }

    /// Verify the remote path exists and is writable (used by `check --remote`)
    pub fn check_remote_path(&self) -> GreetctlResult<()> {
        let quoted = SshShell::quote_path(&self.config.remote.path);
        let command = format!("test -d {q} -a -w {q}", q = quoted);
        self.shell.run(&command)?;
        Ok(())
    }
}
