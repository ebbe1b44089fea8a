//! Scheduled update runner
//!
//! The entrypoint the CronJob container executes once per firing: set the
//! process environment (home directory, library search path, the secret from
//! its local file), invoke the statistics program synchronously, and hand the
//! child's exit status back unchanged. No retry, no custom exit codes; a
//! non-zero exit simply leaves the job Failed until the next firing.

use std::process::{Command, Stdio};

use crate::config::RunnerConfig;
use crate::error::{GreetctlError, GreetctlResult};
use crate::secrets;

/// Run the configured update program once and return its exit code.
///
/// The secret is acquired before the program starts; a missing or empty
/// secret file fails the run without spawning anything.
pub fn run_update(config: &RunnerConfig) -> GreetctlResult<i32> {
    let secret = secrets::acquire(&config.secret_file)?;

    let (program, args) = config.program.split_first().ok_or_else(|| {
        GreetctlError::InvalidConfig {
            file: "greetctl.toml".into(),
            message: "runner program is empty".to_string(),
        }
    })?;

    let mut command = Command::new(program);
    command
        .args(args)
        .current_dir(&config.home)
        .env("HOME", &config.home)
        .env(&config.secret_env, secret.expose())
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

    if let Some(library_path) = &config.library_path {
        command.env("LD_LIBRARY_PATH", library_path);
    }

    for (name, value) in &config.env {
        command.env(name, value);
    }

    let status = command.status()?;

    // A signal-terminated child has no code; report generic failure.
    Ok(status.code().unwrap_or(1))
}
