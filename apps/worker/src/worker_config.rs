use std::env;
use std::str::FromStr;
use std::time::Duration;

use tutela_application::{OrphanCleanupMode, SyncSettings};
use tutela_core::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    pub redis_url: Option<String>,
    pub worker_id: String,
    pub interval: Duration,
    pub max_concurrency: usize,
    pub orphan_mode: OrphanCleanupMode,
    pub run_once: bool,
    pub sync_settings: SyncSettings,
}

impl WorkerConfig {
    pub fn load() -> AppResult<Self> {
        let database_url = required_env("DATABASE_URL")?;
        let redis_url = optional_env("REDIS_URL");
        let worker_id = optional_env("WORKER_ID")
            .map(|value| value.trim().to_owned())
            .unwrap_or_else(|| format!("worker-{}", std::process::id()));
        let interval_seconds = parse_env_or("WORKER_INTERVAL_SECONDS", 900_u64)?;
        let max_concurrency = parse_env_or("WORKER_MAX_CONCURRENCY", 4_usize)?;
        let remove_orphans = parse_flag("WORKER_REMOVE_ORPHANS")?;
        let run_once = parse_flag("WORKER_RUN_ONCE")?;

        if interval_seconds == 0 {
            return Err(AppError::Validation(
                "WORKER_INTERVAL_SECONDS must be greater than zero".to_owned(),
            ));
        }

        if max_concurrency == 0 {
            return Err(AppError::Validation(
                "WORKER_MAX_CONCURRENCY must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            database_url,
            redis_url,
            worker_id,
            interval: Duration::from_secs(interval_seconds),
            max_concurrency,
            orphan_mode: if remove_orphans {
                OrphanCleanupMode::Remove
            } else {
                OrphanCleanupMode::Report
            },
            run_once,
            sync_settings: load_sync_settings()?,
        })
    }
}

fn load_sync_settings() -> AppResult<SyncSettings> {
    let defaults = SyncSettings::default();
    let lock_wait_ms = parse_env_or(
        "SYNC_LOCK_WAIT_MS",
        u64::try_from(defaults.lock_wait.as_millis()).unwrap_or(u64::MAX),
    )?;
    let default_due_days = match optional_env("ASSIGNMENT_DEFAULT_DUE_DAYS") {
        Some(value) => Some(parse_value("ASSIGNMENT_DEFAULT_DUE_DAYS", value.as_str())?),
        None => None,
    };

    let settings = SyncSettings {
        lock_wait: Duration::from_millis(lock_wait_ms),
        lease_seconds: parse_env_or("SYNC_LEASE_SECONDS", defaults.lease_seconds)?,
        max_concurrency: parse_env_or("SYNC_MAX_CONCURRENCY", defaults.max_concurrency)?,
        default_due_days,
    };
    settings.validate()?;

    Ok(settings)
}

fn required_env(name: &str) -> AppResult<String> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn optional_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn parse_env_or<T>(name: &str, default: T) -> AppResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional_env(name) {
        Some(value) => parse_value(name, value.as_str()),
        None => Ok(default),
    }
}

fn parse_value<T>(name: &str, value: &str) -> AppResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse::<T>().map_err(|error| {
        AppError::Validation(format!("invalid {name} value '{value}': {error}"))
    })
}

fn parse_flag(name: &str) -> AppResult<bool> {
    match optional_env(name) {
        Some(value) => parse_bool(name, value.as_str()),
        None => Ok(false),
    }
}

fn parse_bool(name: &str, value: &str) -> AppResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(AppError::Validation(format!(
            "{name} must be a boolean, got '{value}'"
        ))),
    }
}
