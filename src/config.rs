use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} has an invalid value {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub cors_allowed_origins: Vec<String>,
    pub session: SessionConfig,
    pub mail: Option<MailConfig>,
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub secure_cookie: bool,
    pub idle_timeout: Duration,
    pub max_age: Duration,
    /// Zero disables the background sweeper.
    pub sweep_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "twodo_session".to_string(),
            secure_cookie: false,
            idle_timeout: Duration::from_secs(7 * 24 * 60 * 60),
            max_age: Duration::from_secs(30 * 24 * 60 * 60),
            sweep_interval: Duration::from_secs(60 * 60),
        }
    }
}

#[derive(Clone, Debug)]
pub struct MailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = SessionConfig::default();

        let session = SessionConfig {
            cookie_name: env::var("SESSION_COOKIE_NAME").unwrap_or(defaults.cookie_name),
            secure_cookie: parse_var("SESSION_COOKIE_SECURE")?.unwrap_or(defaults.secure_cookie),
            idle_timeout: parse_var("SESSION_IDLE_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.idle_timeout),
            max_age: parse_var("SESSION_MAX_AGE_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.max_age),
            sweep_interval: parse_var("SESSION_SWEEP_INTERVAL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.sweep_interval),
        };

        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://twodo.db?mode=rwc".to_string()),
            bind_addr: parse_var("BIND_ADDR")?
                .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 5001))),
            cors_allowed_origins,
            session,
            mail: MailConfig::new_from_env()?,
        })
    }
}

impl MailConfig {
    /// Returns `None` when `SMTP_HOST` is not set.
    pub fn new_from_env() -> Result<Option<Self>, ConfigError> {
        let Ok(smtp_host) = env::var("SMTP_HOST") else {
            return Ok(None);
        };
        let username = env::var("SMTP_USERNAME").ok();
        let from = env::var("MAIL_FROM")
            .ok()
            .or_else(|| username.clone())
            .unwrap_or_else(|| format!("twodo@{}", smtp_host));

        Ok(Some(Self {
            smtp_port: parse_var("SMTP_PORT")?.unwrap_or(587),
            username,
            password: env::var("SMTP_PASSWORD").ok(),
            from,
            smtp_host,
        }))
    }
}

fn parse_var<T: FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_defaults_are_bounded() {
        let session = SessionConfig::default();
        assert_eq!(session.cookie_name, "twodo_session");
        assert!(session.idle_timeout < session.max_age);
        assert!(!session.sweep_interval.is_zero());
    }

    #[test]
    fn unset_variable_parses_to_none() {
        let parsed: Option<u64> = parse_var("TWODO_TEST_SURELY_UNSET").expect("parse");
        assert!(parsed.is_none());
    }
}
