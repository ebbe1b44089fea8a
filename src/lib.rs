//! greetctl - deployment and scheduled-run tooling for the dewiki greeting bot
//!
//! greetctl packages the recurring operational workflow around the bot into a
//! single utility: copy the artifact set to the remote project directory, set
//! script permissions, cycle the workload namespace, and render/run the daily
//! statistics update job.

pub mod config;
pub mod deploy;
pub mod error;
pub mod manifest;
pub mod remote;
pub mod runner;
pub mod secrets;

// Re-exports for convenience
pub use config::{Config, ConfigWarning};
pub use deploy::{DeployOptions, DeployReport, Deployer, StepKind, StepOutcome};
pub use error::{GreetctlError, GreetctlResult};
pub use manifest::{render, validate_cron, CronJob};
pub use remote::{RemoteShell, SshShell};
pub use secrets::Secret;
