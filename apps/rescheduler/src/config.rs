use anyhow::{Context, Result};

use crate::workflow::CompletionMode;

/// Database connection parameters, kept separate so the pool can be built
/// without string-formatting credentials into a URL.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub username: String,
    pub password: String,
    pub max_connections: u32,
}

/// Application configuration loaded from environment variables.
/// Built once at startup and passed to constructors; never mutated.
#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub sqs_queue_url: String,
    pub aws_region: String,
    /// Endpoint override for local SQS emulators.
    pub sqs_endpoint: Option<String>,
    pub notify_delay_seconds: i32,
    pub completion_mode: CompletionMode,
    pub scope_to_study: bool,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database: DatabaseConfig {
                host: require_env("DB_HOST")?,
                port: parse_env("DB_PORT", 5432)?,
                name: require_env("DB_NAME")?,
                username: require_env("DB_USERNAME")?,
                password: require_env("DB_PASSWORD")?,
                max_connections: parse_env("DB_MAX_CONNECTIONS", 10)?,
            },
            sqs_queue_url: require_env("SQS_QUEUE_URL")?,
            aws_region: std::env::var("AWS_REGION").unwrap_or_else(|_| "eu-west-1".to_string()),
            sqs_endpoint: std::env::var("SQS_ENDPOINT").ok(),
            notify_delay_seconds: check_delay_seconds(parse_env("NOTIFY_DELAY_SECONDS", 0)?)?,
            completion_mode: parse_env("COMPLETION_MODE", CompletionMode::Await)?,
            scope_to_study: parse_flag(
                "SCOPE_TO_STUDY",
                std::env::var("SCOPE_TO_STUDY").ok().as_deref(),
            )?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{key} has an invalid value '{raw}': {e}")),
        Err(_) => Ok(default),
    }
}

/// SQS accepts message delays from 0 to 15 minutes.
const MAX_DELAY_SECONDS: i32 = 900;

fn check_delay_seconds(delay: i32) -> Result<i32> {
    if !(0..=MAX_DELAY_SECONDS).contains(&delay) {
        anyhow::bail!("NOTIFY_DELAY_SECONDS must be between 0 and {MAX_DELAY_SECONDS}, got {delay}");
    }
    Ok(delay)
}

fn parse_flag(key: &str, raw: Option<&str>) -> Result<bool> {
    match raw.map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(false),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" | "" => Ok(false),
            _ => anyhow::bail!("{key} must be a boolean, got '{v}'"),
        },
    }
}
