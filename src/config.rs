use std::env;
use std::str::FromStr;

use crate::error::AppError;

const DEFAULT_DB_HOST: &str = "cluster0.v9x5iie.mongodb.net";
const DEFAULT_DB_NAME: &str = "SafeShip";
const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Mongo,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(Self::Mongo),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown backend {other}, expected mongo or memory")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format {other}, expected compact or json")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    pub api_base: String,
    pub currency: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub backend: StoreBackend,
    pub mongo: Option<MongoConfig>,
    pub stripe: StripeConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup, so tests never touch the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = parse_or_default(&lookup, "DATABASE_BACKEND", StoreBackend::Mongo)?;

        let mongo = match backend {
            StoreBackend::Mongo => Some(MongoConfig {
                uri: mongo_uri(&lookup)?,
                database: lookup("DB_NAME").unwrap_or_else(|| DEFAULT_DB_NAME.to_string()),
            }),
            StoreBackend::Memory => None,
        };

        Ok(Self {
            http_port: parse_or_default(&lookup, "PORT", 5000)?,
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_format: parse_or_default(&lookup, "LOG_FORMAT", LogFormat::Compact)?,
            backend,
            mongo,
            stripe: StripeConfig {
                secret_key: required(&lookup, "STRIPE_SECRET_KEY")?,
                api_base: lookup("STRIPE_API_BASE")
                    .unwrap_or_else(|| DEFAULT_STRIPE_API_BASE.to_string()),
                currency: lookup("PAYMENT_CURRENCY").unwrap_or_else(|| "usd".to_string()),
            },
        })
    }
}

fn mongo_uri<F>(lookup: &F) -> Result<String, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(uri) = lookup("MONGODB_URI") {
        return Ok(uri);
    }

    let user = required(lookup, "DB_USER")?;
    let pass = required(lookup, "DB_PASS")?;
    let host = lookup("DB_HOST").unwrap_or_else(|| DEFAULT_DB_HOST.to_string());

    Ok(format!("mongodb+srv://{user}:{pass}@{host}/?appName=Cluster0"))
}

fn required<F>(lookup: &F, key: &str) -> Result<String, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::Internal(format!("missing required {key}")))
}

fn parse_or_default<F, T>(lookup: &F, key: &str, default: T) -> Result<T, AppError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        None => Ok(default),
    }
}
