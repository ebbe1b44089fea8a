//! Scheduled-job manifest
//!
//! Renders the Kubernetes CronJob that fires the daily update run. The
//! manifest is declarative state: authored here, applied by the cluster
//! control plane, never mutated at runtime. The secret is never embedded in
//! the manifest; the entrypoint reads it from a local file at startup.
//!
//! `concurrencyPolicy: Forbid` makes non-overlap of consecutive firings an
//! enforced property instead of an assumption about firing intervals.
//! `restartPolicy: Never` means a failed firing is not retried before the
//! next scheduled time.

use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{GreetctlError, GreetctlResult};

/// Kubernetes CronJob (batch/v1)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CronJob {
    pub api_version: String,
    pub kind: String,
    pub metadata: Metadata,
    pub spec: CronJobSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CronJobSpec {
    pub schedule: String,
    pub concurrency_policy: String,
    pub job_template: JobTemplate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobTemplate {
    pub spec: JobSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSpec {
    pub template: PodTemplate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodTemplate {
    pub spec: PodSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodSpec {
    pub containers: Vec<Container>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<Volume>,
    pub restart_policy: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub name: String,
    pub image: String,
    pub working_dir: String,
    pub command: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volume_mounts: Vec<VolumeMount>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeMount {
    pub name: String,
    pub mount_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    pub name: String,
    pub host_path: HostPath,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostPath {
    pub path: String,
}

/// Build the CronJob for the configured schedule
pub fn cron_job(config: &Config) -> GreetctlResult<CronJob> {
    validate_cron(&config.schedule.cron)?;

    let env: Vec<EnvVar> = config
        .schedule
        .env
        .iter()
        .map(|(name, value)| EnvVar {
            name: name.clone(),
            value: value.clone(),
        })
        .collect();

    let volume_mounts: Vec<VolumeMount> = config
        .schedule
        .volumes
        .iter()
        .map(|v| VolumeMount {
            name: v.name.clone(),
            mount_path: v.mount_path.display().to_string(),
        })
        .collect();

    let volumes: Vec<Volume> = config
        .schedule
        .volumes
        .iter()
        .map(|v| Volume {
            name: v.name.clone(),
            host_path: HostPath {
                path: v.host_path.display().to_string(),
            },
        })
        .collect();

    Ok(CronJob {
        api_version: "batch/v1".to_string(),
        kind: "CronJob".to_string(),
        metadata: Metadata {
            name: format!("{}-update", config.cluster.namespace),
        },
        spec: CronJobSpec {
            schedule: config.schedule.cron.clone(),
            concurrency_policy: "Forbid".to_string(),
            job_template: JobTemplate {
                spec: JobSpec {
                    template: PodTemplate {
                        spec: PodSpec {
                            containers: vec![Container {
                                name: "update".to_string(),
                                image: config.schedule.image.clone(),
                                working_dir: config.schedule.working_dir.display().to_string(),
                                command: config.schedule.command.clone(),
                                env,
                                volume_mounts,
                            }],
                            volumes,
                            restart_policy: "Never".to_string(),
                        },
                    },
                },
            },
        },
    })
}

/// Render the CronJob manifest as YAML
pub fn render(config: &Config) -> GreetctlResult<String> {
    let job = cron_job(config)?;
    Ok(serde_yaml_ng::to_string(&job)?)
}

/// Write rendered YAML atomically (temp file + rename)
pub fn write_manifest(path: &Path, content: &str) -> GreetctlResult<()> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    let mut tmp = match dir {
        Some(d) => tempfile::NamedTempFile::new_in(d)?,
        None => tempfile::NamedTempFile::new_in(".")?,
    };
    tmp.write_all(content.as_bytes())?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Validate a five-field cron expression.
///
/// Accepts `*`, `*/n`, `a`, `a-b` and comma lists of those, with numeric
/// bounds per field (minute 0-59, hour 0-23, day 1-31, month 1-12, weekday
/// 0-7). Names and `@`-shortcuts are not supported.
pub fn validate_cron(expr: &str) -> GreetctlResult<()> {
    const BOUNDS: [(u32, u32, &str); 5] = [
        (0, 59, "minute"),
        (0, 23, "hour"),
        (1, 31, "day of month"),
        (1, 12, "month"),
        (0, 7, "day of week"),
    ];

    let invalid = |message: String| GreetctlError::InvalidSchedule {
        expr: expr.to_string(),
        message,
    };

    let fields: Vec<&str> = expr.split_whitespace().collect();
    if fields.len() != 5 {
        return Err(invalid(format!(
            "expected 5 fields, found {}",
            fields.len()
        )));
    }

    for (field, (min, max, name)) in fields.iter().zip(BOUNDS.iter()) {
        for item in field.split(',') {
            validate_cron_item(item, *min, *max).map_err(|message| {
                invalid(format!("{} field '{}': {}", name, field, message))
            })?;
        }
    }

    Ok(())
}

fn validate_cron_item(item: &str, min: u32, max: u32) -> Result<(), String> {
    if item == "*" {
        return Ok(());
    }

    if let Some(step) = item.strip_prefix("*/") {
        let n: u32 = step.parse().map_err(|_| format!("bad step '{}'", step))?;
        if n == 0 {
            return Err("step must be positive".to_string());
        }
        return Ok(());
    }

    let parse_bounded = |s: &str| -> Result<u32, String> {
        let v: u32 = s.parse().map_err(|_| format!("bad value '{}'", s))?;
        if v < min || v > max {
            return Err(format!("value {} out of range {}-{}", v, min, max));
        }
        Ok(v)
    };

    if let Some((a, b)) = item.split_once('-') {
        let a = parse_bounded(a)?;
        let b = parse_bounded(b)?;
        if a > b {
            return Err(format!("range {}-{} is inverted", a, b));
        }
        return Ok(());
    }

    parse_bounded(item)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VolumeConfig;
    use proptest::prelude::*;
    use std::path::PathBuf;

    fn schedule_config() -> Config {
        let mut config = Config::default();
        config
            .schedule
            .env
            .insert("HOME".to_string(), "/data/project/dewikigreetbot".to_string());
        config.schedule.volumes.push(VolumeConfig {
            name: "project".to_string(),
            host_path: PathBuf::from("/data/project/dewikigreetbot"),
            mount_path: PathBuf::from("/data/project/dewikigreetbot"),
        });
        config
    }

    #[test]
    fn render_carries_schedule_and_restart_policy() {
        let yaml = render(&schedule_config()).unwrap();
        assert!(yaml.contains("schedule: 15 21 * * *"), "yaml:\n{}", yaml);
        assert!(yaml.contains("restartPolicy: Never"));
        assert!(yaml.contains("concurrencyPolicy: Forbid"));
        assert!(yaml.contains("apiVersion: batch/v1"));
        assert!(yaml.contains("kind: CronJob"));
    }

    #[test]
    fn render_round_trips_through_yaml() {
        let yaml = render(&schedule_config()).unwrap();
        let job: CronJob = serde_yaml_ng::from_str(&yaml).unwrap();
        assert_eq!(job.metadata.name, "dewikigreetbot-update");
        assert_eq!(job.spec.schedule, "15 21 * * *");
        let pod = &job.spec.job_template.spec.template.spec;
        assert_eq!(pod.restart_policy, "Never");
        assert_eq!(pod.containers.len(), 1);
        assert_eq!(pod.containers[0].command, vec!["./update-stats.sh"]);
        assert_eq!(pod.containers[0].env[0].name, "HOME");
        assert_eq!(pod.volumes[0].host_path.path, "/data/project/dewikigreetbot");
    }

    #[test]
    fn render_never_embeds_the_secret_env_var() {
        let config = schedule_config();
        let yaml = render(&config).unwrap();
        assert!(!yaml.contains(&config.runner.secret_env));
    }

    #[test]
    fn manifest_without_volumes_omits_volume_sections() {
        let config = Config::default();
        let yaml = render(&config).unwrap();
        assert!(!yaml.contains("volumeMounts"));
        assert!(!yaml.contains("hostPath"));
    }

    #[test]
    fn write_manifest_is_atomic_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cronjob.yaml");
        write_manifest(&path, "first\n").unwrap();
        write_manifest(&path, "second\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second\n");
    }

    #[test]
    fn validate_cron_accepts_original_schedule() {
        assert!(validate_cron("15 21 * * *").is_ok());
    }

    #[test]
    fn validate_cron_accepts_steps_ranges_and_lists() {
        assert!(validate_cron("*/5 0-6 1,15 * 1-5").is_ok());
    }

    #[test]
    fn validate_cron_rejects_wrong_field_count() {
        assert!(validate_cron("15 21 * *").is_err());
        assert!(validate_cron("15 21 * * * *").is_err());
    }

    #[test]
    fn validate_cron_rejects_out_of_range_values() {
        assert!(validate_cron("60 21 * * *").is_err());
        assert!(validate_cron("15 24 * * *").is_err());
        assert!(validate_cron("15 21 0 * *").is_err());
        assert!(validate_cron("15 21 * 13 *").is_err());
        assert!(validate_cron("15 21 * * 8").is_err());
    }

    #[test]
    fn validate_cron_rejects_inverted_range_and_zero_step() {
        assert!(validate_cron("30-10 * * * *").is_err());
        assert!(validate_cron("*/0 * * * *").is_err());
    }

    proptest! {
        /// Any in-bounds minute/hour pair forms a valid daily schedule.
        #[test]
        fn validate_cron_accepts_all_in_bounds_times(minute in 0u32..=59, hour in 0u32..=23) {
            let expr = format!("{} {} * * *", minute, hour);
            prop_assert!(validate_cron(&expr).is_ok());
        }

        /// Out-of-bounds minutes are always rejected.
        #[test]
        fn validate_cron_rejects_out_of_bounds_minutes(minute in 60u32..=500) {
            let expr = format!("{} 0 * * *", minute);
            prop_assert!(validate_cron(&expr).is_err());
        }
    }
}
