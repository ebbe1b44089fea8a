//! Configuration module for greetctl
//!
//! All deployment state that used to live in ambient shell variables is an
//! explicit `Config` struct loaded from a TOML file (`greetctl.toml` by
//! default). Unknown keys are collected as non-fatal warnings rather than
//! rejected, so older config files keep working.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{GreetctlError, GreetctlResult};
use crate::manifest::validate_cron;

/// Remote target: where artifacts land and how to reach it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_user")]
    pub user: String,

    /// Absolute remote directory the artifact set is copied into
    #[serde(default = "default_remote_path")]
    pub path: PathBuf,

    /// Transport overrides, mainly for tests and unusual environments
    #[serde(default = "default_ssh_program")]
    pub ssh_program: String,

    #[serde(default = "default_scp_program")]
    pub scp_program: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            user: default_user(),
            path: default_remote_path(),
            ssh_program: default_ssh_program(),
            scp_program: default_scp_program(),
        }
    }
}

impl RemoteConfig {
    /// The `user@host` ssh destination
    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }
}

fn default_host() -> String {
    "tools-login.wmflabs.org".to_string()
}

fn default_user() -> String {
    "tools.dewikigreetbot".to_string()
}

fn default_remote_path() -> PathBuf {
    PathBuf::from("/data/project/dewikigreetbot/")
}

fn default_ssh_program() -> String {
    "ssh".to_string()
}

fn default_scp_program() -> String {
    "scp".to_string()
}

/// Artifact set configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactsConfig {
    /// Ordered list of local files that form the unit of transfer
    #[serde(default = "default_artifact_files")]
    pub files: Vec<PathBuf>,

    /// Subset of `files` that must be executable remotely after transfer
    #[serde(default)]
    pub executable: Vec<PathBuf>,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            files: default_artifact_files(),
            executable: Vec::new(),
        }
    }
}

fn default_artifact_files() -> Vec<PathBuf> {
    vec![
        PathBuf::from("greetbot.py"),
        PathBuf::from("Pipfile"),
        PathBuf::from("Pipfile.lock"),
    ]
}

/// Workload namespace configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Namespace whose pods are deleted so the orchestrator restarts them
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
        }
    }
}

fn default_namespace() -> String {
    "dewikigreetbot".to_string()
}

/// Host-path volume mounted into the scheduled container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeConfig {
    pub name: String,
    pub host_path: PathBuf,
    pub mount_path: PathBuf,
}

/// Scheduled runner configuration: when and how the update job fires
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Five-field cron expression
    #[serde(default = "default_cron")]
    pub cron: String,

    #[serde(default = "default_image")]
    pub image: String,

    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,

    #[serde(default = "default_update_command")]
    pub command: Vec<String>,

    /// Extra environment passed to the container
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    #[serde(default)]
    pub volumes: Vec<VolumeConfig>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            cron: default_cron(),
            image: default_image(),
            working_dir: default_working_dir(),
            command: default_update_command(),
            env: BTreeMap::new(),
            volumes: Vec::new(),
        }
    }
}

fn default_cron() -> String {
    "15 21 * * *".to_string()
}

fn default_image() -> String {
    "docker-registry.tools.wmflabs.org/toolforge-python37-sssd-base:latest".to_string()
}

fn default_working_dir() -> PathBuf {
    PathBuf::from("/data/project/dewikigreetbot")
}

fn default_update_command() -> Vec<String> {
    vec!["./update-stats.sh".to_string()]
}

/// Environment the `run-update` entrypoint sets before invoking the program
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Exported as HOME and used as the working directory
    #[serde(default = "default_working_dir")]
    pub home: PathBuf,

    /// Shared dependency location, exported as LD_LIBRARY_PATH
    #[serde(default)]
    pub library_path: Option<PathBuf>,

    /// Local file the secret is read from at startup (supports `~`)
    #[serde(default = "default_secret_file")]
    pub secret_file: PathBuf,

    /// Environment variable name the secret is exposed under
    #[serde(default = "default_secret_env")]
    pub secret_env: String,

    /// Program the scheduled run invokes synchronously
    #[serde(default = "default_program")]
    pub program: Vec<String>,

    /// Extra environment for the program
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            home: default_working_dir(),
            library_path: None,
            secret_file: default_secret_file(),
            secret_env: default_secret_env(),
            program: default_program(),
            env: BTreeMap::new(),
        }
    }
}

fn default_secret_file() -> PathBuf {
    PathBuf::from("~/.greeting-password")
}

fn default_secret_env() -> String {
    "GREETBOT_PASSWORD".to_string()
}

fn default_program() -> Vec<String> {
    vec![
        "pipenv".to_string(),
        "run".to_string(),
        "python".to_string(),
        "stats.py".to_string(),
    ]
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub remote: RemoteConfig,

    #[serde(default)]
    pub artifacts: ArtifactsConfig,

    #[serde(default)]
    pub cluster: ClusterConfig,

    #[serde(default)]
    pub schedule: ScheduleConfig,

    #[serde(default)]
    pub runner: RunnerConfig,
}

/// Non-fatal configuration warning surfaced to CLI users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub key: String,
    pub file: PathBuf,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> GreetctlResult<Self> {
        let (config, _warnings) = Self::load_with_warnings(path)?;
        Ok(config)
    }

    /// Load configuration and collect non-fatal warnings (e.g. unknown keys).
    pub fn load_with_warnings(path: &Path) -> GreetctlResult<(Self, Vec<ConfigWarning>)> {
        let content = fs::read_to_string(path)?;

        let mut unknown_paths: Vec<String> = Vec::new();
        let deserializer = toml::de::Deserializer::new(&content);

        let config: Self = serde_ignored::deserialize(deserializer, |p| {
            unknown_paths.push(p.to_string());
        })
        .map_err(|e| GreetctlError::InvalidConfig {
            file: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let warnings = unknown_paths
            .into_iter()
            .map(|key| ConfigWarning {
                key,
                file: path.to_path_buf(),
            })
            .collect();

        Ok((config, warnings))
    }

    /// Load from an explicit path, falling back to defaults when absent
    pub fn load_or_default(path: &Path) -> GreetctlResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Check structural invariants before any side effect.
    ///
    /// Invariants: artifact set non-empty, executable set is a subset of the
    /// artifact set, remote path absolute, cron expression valid.
    pub fn validate(&self) -> GreetctlResult<()> {
        if self.artifacts.files.is_empty() {
            return Err(GreetctlError::EmptyArtifactSet);
        }

        for exe in &self.artifacts.executable {
            if !self.artifacts.files.contains(exe) {
                return Err(GreetctlError::ExecutableNotInArtifacts {
                    name: exe.display().to_string(),
                });
            }
        }

        if !self.remote.path.is_absolute() {
            return Err(GreetctlError::InvalidConfig {
                file: PathBuf::from("greetctl.toml"),
                message: format!(
                    "remote path must be absolute: {}",
                    self.remote.path.display()
                ),
            });
        }

        validate_cron(&self.schedule.cron)?;

        Ok(())
    }
}
