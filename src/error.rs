//! Error types for greetctl
//!
//! Uses `thiserror` for library errors. Every failure category surfaces as a
//! non-zero process exit; nothing is retried or translated.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for greetctl operations
pub type GreetctlResult<T> = Result<T, GreetctlError>;

/// Main error type for greetctl operations
#[derive(Error, Debug)]
pub enum GreetctlError {
    /// A named artifact does not exist locally (precondition failure)
    #[error("artifact not found: {path}")]
    MissingArtifact { path: PathBuf },

    /// The configured artifact set is empty
    #[error("artifact set is empty - nothing to deploy")]
    EmptyArtifactSet,

    /// An executable entry is not part of the artifact set
    #[error("executable '{name}' is not listed in the artifact set")]
    ExecutableNotInArtifacts { name: String },

    /// Secure-copy transfer failed
    #[error("transfer to {dest} failed: {message}")]
    Transfer { dest: String, message: String },

    /// A remote command exited non-zero
    #[error("remote command '{command}' failed: {message}")]
    RemoteCommand { command: String, message: String },

    /// Invalid configuration file
    #[error("invalid config in {file}: {message}")]
    InvalidConfig { file: PathBuf, message: String },

    /// Invalid cron schedule expression
    #[error("invalid schedule '{expr}': {message}")]
    InvalidSchedule { expr: String, message: String },

    /// Secret file does not exist
    #[error("secret file not found: {path}")]
    SecretNotFound { path: PathBuf },

    /// Secret file exists but holds no value
    #[error("secret file is empty: {path}")]
    SecretEmpty { path: PathBuf },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_error_display_missing_artifact() {
        let err = GreetctlError::MissingArtifact {
            path: PathBuf::from("greetbot.py"),
        };
        assert_eq!(err.to_string(), "artifact not found: greetbot.py");
    }

    #[test]
    fn test_error_display_remote_command() {
        let err = GreetctlError::RemoteCommand {
            command: "chmod 755 '/data/project/dewikigreetbot/update-stats.sh'".to_string(),
            message: "Permission denied".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "remote command 'chmod 755 '/data/project/dewikigreetbot/update-stats.sh'' failed: Permission denied"
        );
    }

    #[test]
    fn test_error_display_secret_not_found() {
        let err = GreetctlError::SecretNotFound {
            path: PathBuf::from("/data/project/dewikigreetbot/.greeting-password"),
        };
        assert_eq!(
            err.to_string(),
            "secret file not found: /data/project/dewikigreetbot/.greeting-password"
        );
    }

    #[test]
    fn test_error_display_invalid_schedule() {
        let err = GreetctlError::InvalidSchedule {
            expr: "99 21 * * *".to_string(),
            message: "minute field out of range".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid schedule '99 21 * * *': minute field out of range"
        );
    }

    #[test]
    fn test_error_display_executable_not_in_artifacts() {
        let err = GreetctlError::ExecutableNotInArtifacts {
            name: "update-stats.sh".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "executable 'update-stats.sh' is not listed in the artifact set"
        );
    }
}
