//! Process configuration, read from environment variables.

use std::ops::RangeInclusive;
use std::str::FromStr;

use devtrack_auth::{DEFAULT_HASH_COST, MAX_HASH_COST, MIN_HASH_COST};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEV_JWT_SECRET: &str = "dev-secret";
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;
/// One year.
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("DATABASE_URL must be set when USE_PERSISTENT_STORES=true")]
    MissingDatabaseUrl,
}

/// Which backend the services run on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    InMemory,
    Postgres {
        database_url: String,
        max_connections: u32,
    },
}

#[derive(Clone)]
pub struct ApiConfig {
    pub bind_addr: String,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
    pub bcrypt_cost: u32,
    pub storage: StorageConfig,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("bind_addr", &self.bind_addr)
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("storage", &self.storage.kind())
            .finish()
    }
}

impl StorageConfig {
    fn kind(&self) -> &'static str {
        match self {
            StorageConfig::InMemory => "in_memory",
            StorageConfig::Postgres { .. } => "postgres",
        }
    }
}

impl ApiConfig {
    /// In-memory configuration with a cheap hashing cost, for tests and local runs.
    pub fn in_memory(jwt_secret: impl Into<String>) -> Self {
        Self {
            bind_addr: "127.0.0.1:0".to_string(),
            jwt_secret: jwt_secret.into(),
            token_ttl: chrono::Duration::hours(DEFAULT_TOKEN_TTL_HOURS),
            bcrypt_cost: 4,
            storage: StorageConfig::InMemory,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unparseable or out-of-range values
    /// fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let jwt_secret = lookup("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });

        let use_persistent: bool = parse_or(&lookup, "USE_PERSISTENT_STORES", false);
        let storage = if use_persistent {
            StorageConfig::Postgres {
                database_url: lookup("DATABASE_URL").ok_or(ConfigError::MissingDatabaseUrl)?,
                max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS),
            }
        } else {
            StorageConfig::InMemory
        };

        Ok(Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            jwt_secret,
            token_ttl: token_ttl(&lookup),
            bcrypt_cost: parse_in(
                &lookup,
                "BCRYPT_COST",
                DEFAULT_HASH_COST,
                MIN_HASH_COST..=MAX_HASH_COST,
            ),
            storage,
        })
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "unparseable config value; using default");
            default
        }),
    }
}

fn parse_in<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
    range: RangeInclusive<T>,
) -> T
where
    T: FromStr + PartialOrd + Copy + std::fmt::Display,
{
    let value = parse_or(lookup, key, default);
    if range.contains(&value) {
        value
    } else {
        tracing::warn!(
            key,
            %value,
            min = %range.start(),
            max = %range.end(),
            "config value out of range; using default"
        );
        default
    }
}

fn token_ttl(lookup: &impl Fn(&str) -> Option<String>) -> chrono::Duration {
    let hours = parse_in(
        lookup,
        "TOKEN_TTL_HOURS",
        DEFAULT_TOKEN_TTL_HOURS,
        1..=MAX_TOKEN_TTL_HOURS,
    );
    chrono::TimeDelta::try_hours(hours).unwrap_or(chrono::TimeDelta::hours(DEFAULT_TOKEN_TTL_HOURS))
}
