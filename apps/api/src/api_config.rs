use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use tracing_subscriber::EnvFilter;
use tutela_application::SyncSettings;
use tutela_core::AppError;

const MIN_SHARED_SECRET_LENGTH: usize = 32;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub migrate_only: bool,
    pub database_url: String,
    pub api_host: String,
    pub api_port: u16,
    pub shared_secret: String,
    pub redis_url: Option<String>,
    pub lease_holder_id: String,
    pub sync_settings: SyncSettings,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let migrate_only = env::args().nth(1).as_deref() == Some("migrate");

        let database_url = required_non_empty_env("DATABASE_URL")?;
        let shared_secret = required_non_empty_env("API_SHARED_SECRET")?;
        if shared_secret.len() < MIN_SHARED_SECRET_LENGTH {
            return Err(AppError::Validation(format!(
                "API_SHARED_SECRET must be at least {MIN_SHARED_SECRET_LENGTH} characters"
            )));
        }

        let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
        let api_port = parse_env_or("API_PORT", 3001_u16)?;
        let redis_url = optional_env("REDIS_URL");
        let lease_holder_id = optional_env("API_INSTANCE_ID")
            .unwrap_or_else(|| format!("api-{}", std::process::id()));

        Ok(Self {
            migrate_only,
            database_url,
            api_host,
            api_port,
            shared_secret,
            redis_url,
            lease_holder_id,
            sync_settings: load_sync_settings()?,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

/// Reads the engine tuning knobs shared by the api and the worker.
pub fn load_sync_settings() -> Result<SyncSettings, AppError> {
    let defaults = SyncSettings::default();
    let lock_wait_ms = parse_env_or(
        "SYNC_LOCK_WAIT_MS",
        u64::try_from(defaults.lock_wait.as_millis()).unwrap_or(u64::MAX),
    )?;

    let settings = SyncSettings {
        lock_wait: Duration::from_millis(lock_wait_ms),
        lease_seconds: parse_env_or("SYNC_LEASE_SECONDS", defaults.lease_seconds)?,
        max_concurrency: parse_env_or("SYNC_MAX_CONCURRENCY", defaults.max_concurrency)?,
        default_due_days: optional_env("ASSIGNMENT_DEFAULT_DUE_DAYS")
            .map(|value| parse_value("ASSIGNMENT_DEFAULT_DUE_DAYS", value.as_str()))
            .transpose()?,
    };
    settings.validate()?;

    Ok(settings)
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn required_non_empty_env(name: &str) -> Result<String, AppError> {
    let value = required_env(name)?;
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{name} must not be empty")));
    }

    Ok(value)
}

fn optional_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn parse_env_or<T>(name: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional_env(name) {
        Some(value) => parse_value(name, value.as_str()),
        None => Ok(default),
    }
}

fn parse_value<T>(name: &str, value: &str) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|error| AppError::Validation(format!("invalid {name} '{value}': {error}")))
}

#[cfg(test)]
mod tests {
    use super::parse_value;

    #[test]
    fn parse_value_reports_variable_name() {
        let parsed = parse_value::<u32>("SYNC_LEASE_SECONDS", "soon");

        assert!(matches!(
            parsed,
            Err(tutela_core::AppError::Validation(ref message))
                if message.contains("SYNC_LEASE_SECONDS")
        ));
    }

    #[test]
    fn parse_value_trims_whitespace() {
        assert_eq!(parse_value::<u16>("API_PORT", " 8080 ").ok(), Some(8080));
    }
}
