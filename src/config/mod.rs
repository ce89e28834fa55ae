//! Configuration module for the fleet backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::errors::AppError;

/// SMTP relay settings. Absent when `FLEET_SMTP_HOST` is unset.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Shared secret the external scheduler presents as a bearer token
    pub job_secret: Option<String>,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit logs as JSON lines
    pub log_json: bool,
    /// Prefixed to notification links in emails
    pub app_base_url: Option<String>,
    pub smtp: Option<SmtpConfig>,
    /// Sender address for notification emails
    pub mail_from: String,
    /// Interval of the in-process expiry scheduler; disabled when unset
    pub expiry_schedule_secs: Option<u64>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let job_secret = env::var("FLEET_JOB_SECRET")
            .ok()
            .filter(|s| !s.trim().is_empty());

        let db_path = env::var("FLEET_DB_PATH")
            .unwrap_or_else(|_| "./data/fleet.sqlite".to_string())
            .into();

        let bind_addr = env::var("FLEET_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .map_err(|e| AppError::Configuration(format!("Invalid FLEET_BIND_ADDR: {}", e)))?;

        let log_level = env::var("FLEET_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_json = parse_bool(env::var("FLEET_LOG_JSON").ok().as_deref());

        let app_base_url = env::var("FLEET_APP_BASE_URL")
            .ok()
            .map(|s| s.trim_end_matches('/').to_string());

        let smtp = match env::var("FLEET_SMTP_HOST") {
            Ok(host) if !host.trim().is_empty() => {
                let port = match env::var("FLEET_SMTP_PORT") {
                    Ok(raw) => raw.parse().map_err(|e| {
                        AppError::Configuration(format!("Invalid FLEET_SMTP_PORT: {}", e))
                    })?,
                    Err(_) => 587,
                };
                Some(SmtpConfig {
                    host,
                    port,
                    username: env::var("FLEET_SMTP_USERNAME").ok(),
                    password: env::var("FLEET_SMTP_PASSWORD").ok(),
                })
            }
            _ => None,
        };

        let mail_from =
            env::var("FLEET_MAIL_FROM").unwrap_or_else(|_| "no-reply@fleet.local".to_string());

        let expiry_schedule_secs = match env::var("FLEET_EXPIRY_SCHEDULE_SECS") {
            Ok(raw) => {
                let secs: u64 = raw.parse().map_err(|e| {
                    AppError::Configuration(format!("Invalid FLEET_EXPIRY_SCHEDULE_SECS: {}", e))
                })?;
                (secs > 0).then_some(secs)
            }
            Err(_) => None,
        };

        Ok(Self {
            job_secret,
            db_path,
            bind_addr,
            log_level,
            log_json,
            app_base_url,
            smtp,
            mail_from,
            expiry_schedule_secs,
        })
    }
}

fn parse_bool(raw: Option<&str>) -> bool {
    matches!(
        raw.map(|s| s.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: &[&str] = &[
        "FLEET_JOB_SECRET",
        "FLEET_DB_PATH",
        "FLEET_BIND_ADDR",
        "FLEET_LOG_LEVEL",
        "FLEET_LOG_JSON",
        "FLEET_APP_BASE_URL",
        "FLEET_SMTP_HOST",
        "FLEET_SMTP_PORT",
        "FLEET_SMTP_USERNAME",
        "FLEET_SMTP_PASSWORD",
        "FLEET_MAIL_FROM",
        "FLEET_EXPIRY_SCHEDULE_SECS",
    ];

    #[test]
    fn test_default_config() {
        // Clear any existing env vars
        for var in VARS {
            env::remove_var(var);
        }

        let config = Config::from_env().unwrap();

        assert!(config.job_secret.is_none());
        assert_eq!(config.db_path, PathBuf::from("./data/fleet.sqlite"));
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.log_level, "info");
        assert!(!config.log_json);
        assert!(config.smtp.is_none());
        assert_eq!(config.mail_from, "no-reply@fleet.local");
        assert!(config.expiry_schedule_secs.is_none());
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool(Some("true")));
        assert!(parse_bool(Some(" ON ")));
        assert!(parse_bool(Some("1")));
        assert!(!parse_bool(Some("no")));
        assert!(!parse_bool(None));
    }
}
