//! API server configuration.

use std::time::Duration;

use axum::http::HeaderName;
use portal_core::auth::api_keys::{ApiKeyRegistry, ParseApiKeysError};
use portal_core::auth::jwt::{
    ACCESS_TOKEN_EXPIRY_SECS, REFRESH_TOKEN_EXPIRY_SECS, TokenSettings, resolve_jwt_secret,
};
use portal_core::rate_limit::{DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: '{value}'")]
    InvalidValue { name: &'static str, value: String },

    #[error(transparent)]
    ApiKeys(#[from] ParseApiKeysError),
}

/// Cross-origin policy.
#[derive(Clone, Debug)]
pub struct CorsConfig {
    /// Exact origins allowed; `*` allows any origin.
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    /// Preflight cache lifetime, in seconds.
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:3000".into()],
            allow_credentials: true,
            allowed_methods: ["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"]
                .map(String::from)
                .to_vec(),
            allowed_headers: ["Authorization", "Content-Type", "X-API-Key", "X-Request-Id"]
                .map(String::from)
                .to_vec(),
            max_age_secs: 86_400,
        }
    }
}

/// Sliding-window limits.
#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_MAX_REQUESTS,
            window: DEFAULT_WINDOW,
        }
    }
}

/// Where webhook callers present their key.
#[derive(Clone, Debug)]
pub struct ApiKeyConfig {
    pub header: HeaderName,
    pub query_param: String,
    pub registry: ApiKeyRegistry,
}

impl Default for ApiKeyConfig {
    fn default() -> Self {
        Self {
            header: HeaderName::from_static("x-api-key"),
            query_param: "api_key".into(),
            registry: ApiKeyRegistry::default(),
        }
    }
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3100").
    pub bind_addr: String,
    /// JWT signing secret.
    pub jwt_secret: String,
    pub tokens: TokenSettings,
    pub cors: CorsConfig,
    pub rate_limit: RateLimitConfig,
    pub api_keys: ApiKeyConfig,
    /// Emit `Strict-Transport-Security`.
    pub hsts: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3100".into(),
            jwt_secret: String::new(),
            tokens: TokenSettings::default(),
            cors: CorsConfig::default(),
            rate_limit: RateLimitConfig::default(),
            api_keys: ApiKeyConfig::default(),
            hsts: false,
        }
    }
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                  | Default                          |
    /// |---------------------------|----------------------------------|
    /// | `BIND_ADDR`               | `127.0.0.1:3100`                 |
    /// | `JWT_SECRET` / `AUTH_SECRET` | generated & persisted to file |
    /// | `JWT_ISSUER`              | `portal`                         |
    /// | `ACCESS_TOKEN_TTL_SECS`   | `900`                            |
    /// | `REFRESH_TOKEN_TTL_SECS`  | `2592000`                        |
    /// | `ROTATE_REFRESH_TOKENS`   | `true`                           |
    /// | `CORS_ALLOWED_ORIGINS`    | `http://localhost:3000`          |
    /// | `CORS_ALLOW_CREDENTIALS`  | `true`                           |
    /// | `RATE_LIMIT_MAX_REQUESTS` | `100`                            |
    /// | `RATE_LIMIT_WINDOW_SECS`  | `60`                             |
    /// | `API_KEYS`                | empty (`name:key,name:key`)      |
    /// | `API_KEY_HEADER`          | `X-API-Key`                      |
    /// | `API_KEY_QUERY_PARAM`     | `api_key`                        |
    /// | `HSTS_ENABLED`            | `false`                          |
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::from_lookup(|name| std::env::var(name).ok())?;
        if config.jwt_secret.is_empty() {
            config.jwt_secret = resolve_jwt_secret();
        }
        Ok(config)
    }

    /// Build a configuration from an arbitrary variable source.
    ///
    /// Leaves `jwt_secret` empty when neither `JWT_SECRET` nor `AUTH_SECRET` is set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let tokens = TokenSettings {
            issuer: var("JWT_ISSUER").unwrap_or(defaults.tokens.issuer),
            access_ttl: chrono::Duration::seconds(parse_or(
                &var,
                "ACCESS_TOKEN_TTL_SECS",
                ACCESS_TOKEN_EXPIRY_SECS,
            )?),
            refresh_ttl: chrono::Duration::seconds(parse_or(
                &var,
                "REFRESH_TOKEN_TTL_SECS",
                REFRESH_TOKEN_EXPIRY_SECS,
            )?),
            leeway_secs: defaults.tokens.leeway_secs,
            rotate_refresh_tokens: parse_or(
                &var,
                "ROTATE_REFRESH_TOKENS",
                defaults.tokens.rotate_refresh_tokens,
            )?,
        };

        let cors = CorsConfig {
            allowed_origins: var("CORS_ALLOWED_ORIGINS")
                .map(|v| split_list(&v))
                .unwrap_or(defaults.cors.allowed_origins),
            allow_credentials: parse_or(
                &var,
                "CORS_ALLOW_CREDENTIALS",
                defaults.cors.allow_credentials,
            )?,
            ..defaults.cors
        };

        let rate_limit = RateLimitConfig {
            max_requests: parse_or(
                &var,
                "RATE_LIMIT_MAX_REQUESTS",
                defaults.rate_limit.max_requests,
            )?,
            window: Duration::from_secs(parse_or(
                &var,
                "RATE_LIMIT_WINDOW_SECS",
                defaults.rate_limit.window.as_secs(),
            )?),
        };

        let api_keys = ApiKeyConfig {
            header: match var("API_KEY_HEADER") {
                Some(value) => HeaderName::try_from(value.as_str()).map_err(|_| {
                    ConfigError::InvalidValue {
                        name: "API_KEY_HEADER",
                        value,
                    }
                })?,
                None => defaults.api_keys.header,
            },
            query_param: var("API_KEY_QUERY_PARAM").unwrap_or(defaults.api_keys.query_param),
            registry: match var("API_KEYS") {
                Some(list) => ApiKeyRegistry::parse(&list)?,
                None => defaults.api_keys.registry,
            },
        };

        Ok(Self {
            bind_addr: var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            jwt_secret: var("JWT_SECRET")
                .or_else(|| var("AUTH_SECRET"))
                .unwrap_or_default(),
            tokens,
            cors,
            rate_limit,
            api_keys,
            hsts: parse_or(&var, "HSTS_ENABLED", defaults.hsts)?,
        })
    }
}

fn parse_or<T, F>(var: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match var(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        None => Ok(default),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
