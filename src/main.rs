//! greetctl CLI - deployment and scheduled-run tooling
//!
//! Usage: greetctl <COMMAND>
//!
//! Commands:
//!   deploy      Copy artifacts to the remote host and cycle the namespace
//!   check       Validate config and artifacts without deploying
//!   manifest    Render the update CronJob manifest
//!   run-update  Scheduled entrypoint: run the statistics update once

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use greetctl::config::Config;
use greetctl::deploy::{DeployOptions, Deployer};
use greetctl::remote::SshShell;

/// greetctl - deployment and scheduled-run tooling for the dewiki greeting bot
#[derive(Parser, Debug)]
#[command(name = "greetctl")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Output format for CI
    #[arg(long, default_value = "false")]
    json: bool,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Copy artifacts to the remote host, set permissions, cycle the namespace
    Deploy {
        /// Path to the config file
        #[arg(short, long, default_value = "greetctl.toml")]
        config: PathBuf,

        /// Dry run - validate and show the plan without remote side effects
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate config and artifacts without deploying
    Check {
        /// Path to the config file
        #[arg(short, long, default_value = "greetctl.toml")]
        config: PathBuf,

        /// Also verify the remote path exists and is writable
        #[arg(long)]
        remote: bool,
    },

    /// Render the update CronJob manifest
    Manifest {
        /// Path to the config file
        #[arg(short, long, default_value = "greetctl.toml")]
        config: PathBuf,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Scheduled entrypoint: run the statistics update once and exit
    RunUpdate {
        /// Path to the config file
        #[arg(short, long, default_value = "greetctl.toml")]
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Deploy { config, dry_run } => cmd_deploy(&config, dry_run, cli.json, cli.verbose),
        Commands::Check { config, remote } => cmd_check(&config, remote, cli.json),
        Commands::Manifest { config, output } => cmd_manifest(&config, output.as_deref(), cli.json),
        Commands::RunUpdate { config } => cmd_run_update(&config),
    }
}

fn load_config(path: &std::path::Path, json: bool) -> Result<Config> {
    let (config, warnings) = if path.exists() {
        Config::load_with_warnings(path)?
    } else {
        (Config::default(), Vec::new())
    };

    for warning in &warnings {
        if json {
            let event = serde_json::json!({
                "event": "config-warning",
                "key": warning.key,
                "file": warning.file.display().to_string(),
            });
            println!("{}", serde_json::to_string(&event)?);
        } else {
            eprintln!(
                "⚠ Unknown config key '{}' in {}",
                warning.key,
                warning.file.display()
            );
        }
    }

    Ok(config)
}

fn cmd_deploy(config_path: &std::path::Path, dry_run: bool, json: bool, verbose: u8) -> Result<()> {
    let config = load_config(config_path, json)?;

    if !json {
        println!("🚀 greetctl deploy");
        println!(
            "Target: {}:{}",
            config.remote.destination(),
            config.remote.path.display()
        );
        if dry_run {
            println!("Mode: Dry run");
        }
    }

    let shell = SshShell::new(config.remote.destination())
        .with_programs(&config.remote.ssh_program, &config.remote.scp_program);
    let deployer = Deployer::new(&config, &shell);
    let local_root = std::env::current_dir()?;

    let report = deployer.run(&local_root, &DeployOptions { dry_run })?;

    if json {
        println!("{}", serde_json::to_string(&report)?);
    } else {
        println!("\n📦 Artifacts ({}):", report.artifacts.len());
        for artifact in &report.artifacts {
            if verbose > 0 {
                println!("  - {} ({})", artifact.path.display(), artifact.sha256);
            } else {
                println!("  - {}", artifact.path.display());
            }
        }

        if dry_run {
            println!("\nDry run: no remote command issued.");
        } else {
            println!("\n📊 Steps:");
            for step in &report.steps {
                if step.succeeded {
                    println!("  ✓ {}", step.kind.display_name());
                } else {
                    println!(
                        "  ✗ {} - {}",
                        step.kind.display_name(),
                        step.error.as_deref().unwrap_or("failed")
                    );
                }
            }
        }
    }

    if !report.is_success() {
        if !json {
            println!("\n🔴 Deploy FAILED");
        }
        std::process::exit(1);
    }

    if !json && !dry_run {
        println!("\n🟢 Deploy complete - namespace restarted");
    }

    Ok(())
}

fn cmd_check(config_path: &std::path::Path, remote: bool, json: bool) -> Result<()> {
    let config = load_config(config_path, json)?;

    if !json {
        println!("🩺 greetctl check");
    }

    let shell = SshShell::new(config.remote.destination())
        .with_programs(&config.remote.ssh_program, &config.remote.scp_program);
    let deployer = Deployer::new(&config, &shell);
    let local_root = std::env::current_dir()?;

    let artifacts = deployer.preflight(&local_root)?;

    if remote {
        deployer.check_remote_path()?;
    }

    if json {
        let event = serde_json::json!({
            "event": "check",
            "status": "success",
            "artifacts": artifacts.len(),
            "remote_checked": remote,
        });
        println!("{}", serde_json::to_string(&event)?);
    } else {
        println!("✓ Config valid (schedule '{}')", config.schedule.cron);
        println!("✓ {} artifacts present:", artifacts.len());
        for artifact in &artifacts {
            println!("  - {} ({})", artifact.path.display(), artifact.sha256);
        }
        if remote {
            println!("✓ Remote path {} is writable", config.remote.path.display());
        }
        println!("\n🟢 All checks passed!");
    }

    Ok(())
}

fn cmd_manifest(
    config_path: &std::path::Path,
    output: Option<&std::path::Path>,
    json: bool,
) -> Result<()> {
    let config = load_config(config_path, json)?;
    let yaml = greetctl::manifest::render(&config)?;

    match output {
        Some(path) => {
            greetctl::manifest::write_manifest(path, &yaml)?;
            if json {
                let event = serde_json::json!({
                    "event": "manifest",
                    "status": "written",
                    "path": path.display().to_string(),
                });
                println!("{}", serde_json::to_string(&event)?);
            } else {
                println!("✓ Manifest written to {}", path.display());
            }
        }
        None => {
            print!("{}", yaml);
        }
    }

    Ok(())
}

fn cmd_run_update(config_path: &std::path::Path) -> Result<()> {
    let config = load_config(config_path, false)?;

    // The job's exit status is the invoked program's exit status, verbatim.
    let code = greetctl::runner::run_update(&config.runner)?;
    std::process::exit(code);
}
