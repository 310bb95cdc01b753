use std::{env, net::SocketAddr, str::FromStr};

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshStoreKind {
    Memory,
    Postgres,
}

impl FromStr for RefreshStoreKind {
    type Err = ();

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "memory" | "in-memory" | "inmemory" => Ok(Self::Memory),
            "postgres" | "postgresql" | "db" => Ok(Self::Postgres),
            _ => Err(()),
        }
    }
}

#[derive(Clone)]
pub struct AuthSettings {
    pub access_secret: String,
    pub refresh_secret: String,
    pub issuer: String,
    pub audience: String,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_days: i64,
    pub refresh_store: RefreshStoreKind,
}

impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSettings")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("access_ttl_minutes", &self.access_ttl_minutes)
            .field("refresh_ttl_days", &self.refresh_ttl_days)
            .field("refresh_store", &self.refresh_store)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimitSettings {
    pub per_millisecond: u64,
    pub burst: u32,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub frontend_origin: String,
    pub bind_addr: SocketAddr,
    pub auth: AuthSettings,
    pub rate_limit: RateLimitSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };
        let optional = |name: &'static str, default: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let database_url = required("DATABASE_URL")?;
        let frontend_origin = required("FRONTEND_ORIGIN")?;

        let refresh_store = {
            let raw = optional("REFRESH_TOKEN_STORE", "memory");
            raw.parse().map_err(|_| ConfigError::Invalid {
                name: "REFRESH_TOKEN_STORE",
                value: raw,
            })?
        };

        let auth = AuthSettings {
            access_secret: required("JWT_ACCESS_SECRET")?,
            refresh_secret: required("JWT_REFRESH_SECRET")?,
            issuer: optional("JWT_ISSUER", "crm-backend"),
            audience: optional("JWT_AUDIENCE", "crm-clients"),
            access_ttl_minutes: parse_positive(
                "ACCESS_TOKEN_TTL_MINUTES",
                &optional("ACCESS_TOKEN_TTL_MINUTES", "15"),
            )?,
            refresh_ttl_days: parse_positive(
                "REFRESH_TOKEN_TTL_DAYS",
                &optional("REFRESH_TOKEN_TTL_DAYS", "7"),
            )?,
            refresh_store,
        };

        let bind_addr = {
            let raw = optional("BIND_ADDR", "127.0.0.1:3000");
            raw.parse().map_err(|_| ConfigError::Invalid {
                name: "BIND_ADDR",
                value: raw,
            })?
        };

        // Default: 200ms/token (~5 req/sec), bursts of 20 for client polling
        let rate_limit = RateLimitSettings {
            per_millisecond: parse_positive(
                "RATE_LIMITER_MILLISECONDS",
                &optional("RATE_LIMITER_MILLISECONDS", "200"),
            )?,
            burst: parse_positive("RATE_LIMITER_BURST", &optional("RATE_LIMITER_BURST", "20"))?,
        };

        Ok(Config {
            database_url,
            frontend_origin,
            bind_addr,
            auth,
            rate_limit,
        })
    }
}

/// Parses into the target type directly, so out-of-range values are rejected
/// rather than truncated.
fn parse_positive<T>(name: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Default,
{
    match raw.trim().parse::<T>() {
        Ok(value) if value > T::default() => Ok(value),
        _ => Err(ConfigError::Invalid {
            name,
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
impl AuthSettings {
    pub fn for_tests() -> Self {
        Self {
            access_secret: "access-0123456789abcdef0123456789abcdef".into(),
            refresh_secret: "refresh-fedcba9876543210fedcba9876543210".into(),
            issuer: "test-issuer".into(),
            audience: "test-audience".into(),
            access_ttl_minutes: 15,
            refresh_ttl_days: 7,
            refresh_store: RefreshStoreKind::Memory,
        }
    }
}
