//! Common test utilities for greetctl integration tests.
//!
//! Provides `TestEnv` - an isolated temp directory with artifact fixtures,
//! a config file pointing at stub `ssh`/`scp` scripts that record their
//! invocations to a log, and helpers to run the built binary.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Result of running a greetctl CLI command
#[derive(Debug)]
pub struct TestResult {
    pub success: bool,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl TestResult {
    pub fn combined_output(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }
}

/// Isolated test environment.
///
/// Remote side effects are observable through `remote_log()`: the stub scp
/// records `scp <args...>`, the stub ssh records `ssh <dest> <command>`.
pub struct TestEnv {
    pub root: TempDir,
    bin: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            root: TempDir::new().expect("create temp dir"),
            bin: PathBuf::from(env!("CARGO_BIN_EXE_greetctl")),
        }
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.path().join(relative)
    }

    pub fn write_artifact(&self, name: &str, content: &str) {
        fs::write(self.path(name), content).expect("write artifact");
    }

    pub fn write_config(&self, toml: &str) {
        fs::write(self.path("greetctl.toml"), toml).expect("write config");
    }

    /// Standard config wired to the stub transports.
    ///
    /// `fail_pattern` makes the stub ssh fail any command containing it.
    pub fn write_standard_config(&self, fail_pattern: Option<&str>) {
        self.install_stub_tools(fail_pattern);
        let toml = format!(
            r#"
[remote]
host = "tools-login.wmflabs.org"
user = "tools.dewikigreetbot"
path = "/data/project/dewikigreetbot/"
ssh_program = "{ssh}"
scp_program = "{scp}"

[artifacts]
files = ["greetbot.py", "Pipfile", "Pipfile.lock", "update-stats.sh"]
executable = ["update-stats.sh"]

[cluster]
namespace = "dewikigreetbot"

[schedule]
cron = "15 21 * * *"
"#,
            ssh = self.path("fake-ssh").display(),
            scp = self.path("fake-scp").display(),
        );
        self.write_config(&toml);
    }

    /// Write the default artifact fixtures the standard config expects.
    pub fn write_standard_artifacts(&self) {
        self.write_artifact("greetbot.py", "#!/usr/bin/python\n");
        self.write_artifact("Pipfile", "[packages]\n");
        self.write_artifact("Pipfile.lock", "{}\n");
        self.write_artifact("update-stats.sh", "#!/bin/sh\n");
    }

    fn install_stub_tools(&self, fail_pattern: Option<&str>) {
        let log = self.remote_log_path();

        let scp = format!("#!/bin/sh\necho \"scp $*\" >> '{}'\nexit 0\n", log.display());
        self.install_script("fake-scp", &scp);

        let fail_clause = match fail_pattern {
            Some(pattern) => format!(
                "case \"$*\" in *\"{}\"*) echo 'injected failure' >&2; exit 1;; esac\n",
                pattern
            ),
            None => String::new(),
        };
        let ssh = format!(
            "#!/bin/sh\ndest=\"$1\"\nshift\necho \"ssh $dest $*\" >> '{log}'\n{fail}exit 0\n",
            log = log.display(),
            fail = fail_clause,
        );
        self.install_script("fake-ssh", &ssh);
    }

    fn install_script(&self, name: &str, content: &str) {
        let path = self.path(name);
        fs::write(&path, content).expect("write stub script");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
                .expect("chmod stub script");
        }
    }

    pub fn remote_log_path(&self) -> PathBuf {
        self.path("remote.log")
    }

    /// Recorded remote invocations, one per line, in order. Empty when no
    /// remote call was made.
    pub fn remote_log(&self) -> Vec<String> {
        match fs::read_to_string(self.remote_log_path()) {
            Ok(content) => content.lines().map(|l| l.to_string()).collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn run(&self, args: &[&str]) -> TestResult {
        self.run_from(self.root.path(), args)
    }

    pub fn run_from(&self, cwd: &Path, args: &[&str]) -> TestResult {
        let output = Command::new(&self.bin)
            .current_dir(cwd)
            .args(args)
            .output()
            .expect("failed to execute greetctl");
        self.output_to_result(output)
    }

    fn output_to_result(&self, output: Output) -> TestResult {
        TestResult {
            success: output.status.success(),
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }
}
