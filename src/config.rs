// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! once at startup and is read-only afterwards.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `TOKEN_SECRET` | Key material for session tokens (at least 32 bytes) | Required |
//! | `TOKEN_ISSUER` | `iss` claim of minted tokens | `otp-auth-server` |
//! | `TOKEN_AUDIENCE` | `aud` claim of minted tokens | `otp-auth-clients` |
//! | `TOKEN_TTL_MINUTES` | Access token lifetime | `60` |
//! | `REFRESH_TTL_MINUTES` | Refresh token lifetime | `10080` |
//! | `OTP_TTL_SECONDS` | Lifetime of a verification code | `180` |
//! | `RATE_LIMIT_ENABLED` | Install the admission filter | `true` |
//! | `RATE_LIMIT_REQUESTS` | Requests allowed per window and client | `60` |
//! | `RATE_LIMIT_WINDOW_SECONDS` | Fixed window length | `60` |
//! | `RATE_LIMIT_EXCLUDE_PATHS` | Comma separated path prefixes never limited | `/metrics,/health` |
//! | `TRUSTED_PROXIES` | Peers whose forwarding headers are honoured | `127.0.0.1` |
//! | `DATABASE_PATH` | redb file for accounts (unset keeps accounts in memory) | unset |
//! | `SCHEMA_DIR` | Directory overriding the embedded request schemas | unset |
//! | `READ_TIMEOUT_SECONDS` | Per-request deadline | `10` |
//! | `SHUTDOWN_GRACE_SECONDS` | Time in-flight requests get on shutdown | `30` |
//! | `SWAGGER_ENABLED` | Mount Swagger UI at `/swagger` | `false` |
//! | `CORS_ENABLED` | Install a permissive CORS layer | `false` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::{
    net::{IpAddr, SocketAddr},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const TOKEN_SECRET_ENV: &str = "TOKEN_SECRET";
pub const TOKEN_ISSUER_ENV: &str = "TOKEN_ISSUER";
pub const TOKEN_AUDIENCE_ENV: &str = "TOKEN_AUDIENCE";
pub const TOKEN_TTL_MINUTES_ENV: &str = "TOKEN_TTL_MINUTES";
pub const REFRESH_TTL_MINUTES_ENV: &str = "REFRESH_TTL_MINUTES";
pub const OTP_TTL_SECONDS_ENV: &str = "OTP_TTL_SECONDS";
pub const RATE_LIMIT_ENABLED_ENV: &str = "RATE_LIMIT_ENABLED";
pub const RATE_LIMIT_REQUESTS_ENV: &str = "RATE_LIMIT_REQUESTS";
pub const RATE_LIMIT_WINDOW_SECONDS_ENV: &str = "RATE_LIMIT_WINDOW_SECONDS";
pub const RATE_LIMIT_EXCLUDE_PATHS_ENV: &str = "RATE_LIMIT_EXCLUDE_PATHS";
pub const TRUSTED_PROXIES_ENV: &str = "TRUSTED_PROXIES";
pub const DATABASE_PATH_ENV: &str = "DATABASE_PATH";
pub const SCHEMA_DIR_ENV: &str = "SCHEMA_DIR";
pub const READ_TIMEOUT_SECONDS_ENV: &str = "READ_TIMEOUT_SECONDS";
pub const SHUTDOWN_GRACE_SECONDS_ENV: &str = "SHUTDOWN_GRACE_SECONDS";
pub const SWAGGER_ENABLED_ENV: &str = "SWAGGER_ENABLED";
pub const CORS_ENABLED_ENV: &str = "CORS_ENABLED";

/// Environment variable selecting the log output format.
///
/// `json` emits one JSON object per line; anything else is human readable.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// Minimum length of `TOKEN_SECRET`.
pub const MIN_TOKEN_SECRET_LEN: usize = 32;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },

    #[error("TOKEN_SECRET must be at least 32 bytes")]
    SecretTooShort,
}

/// Session token settings.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

/// Admission filter settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub requests_per_window: u64,
    pub window: Duration,
    pub exclude_paths: Vec<String>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_window: 60,
            window: Duration::from_secs(60),
            exclude_paths: vec!["/metrics".to_string(), "/health".to_string()],
        }
    }
}

/// Process-wide configuration, read-only after startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind: SocketAddr,
    pub token: TokenConfig,
    pub otp_ttl: Duration,
    pub rate_limit: RateLimitConfig,
    pub trusted_proxies: Vec<IpAddr>,
    pub database_path: Option<PathBuf>,
    pub schema_dir: Option<PathBuf>,
    pub read_timeout: Duration,
    pub shutdown_grace: Duration,
    pub swagger_enabled: bool,
    pub cors_enabled: bool,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &'static str| lookup(name).filter(|v| !v.trim().is_empty());

        let host = var(HOST_ENV).unwrap_or_else(|| "0.0.0.0".to_string());
        let port: u16 = parse_or(&var, PORT_ENV, 8080)?;
        let bind = format!("{host}:{port}")
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::Invalid {
                name: HOST_ENV,
                value: host.clone(),
            })?;

        let secret = var(TOKEN_SECRET_ENV).ok_or(ConfigError::Missing(TOKEN_SECRET_ENV))?;
        if secret.len() < MIN_TOKEN_SECRET_LEN {
            return Err(ConfigError::SecretTooShort);
        }

        let token = TokenConfig {
            secret,
            issuer: var(TOKEN_ISSUER_ENV).unwrap_or_else(|| "otp-auth-server".to_string()),
            audience: var(TOKEN_AUDIENCE_ENV).unwrap_or_else(|| "otp-auth-clients".to_string()),
            access_ttl: minutes(positive_or(&var, TOKEN_TTL_MINUTES_ENV, 60)?),
            refresh_ttl: minutes(positive_or(&var, REFRESH_TTL_MINUTES_ENV, 7 * 24 * 60)?),
        };

        let defaults = RateLimitConfig::default();
        let rate_limit = RateLimitConfig {
            enabled: flag_or(&var, RATE_LIMIT_ENABLED_ENV, defaults.enabled)?,
            requests_per_window: positive_or(
                &var,
                RATE_LIMIT_REQUESTS_ENV,
                defaults.requests_per_window,
            )?,
            window: Duration::from_secs(positive_or(
                &var,
                RATE_LIMIT_WINDOW_SECONDS_ENV,
                defaults.window.as_secs(),
            )?),
            exclude_paths: var(RATE_LIMIT_EXCLUDE_PATHS_ENV)
                .map(|raw| split_list(&raw))
                .unwrap_or(defaults.exclude_paths),
        };

        let trusted_proxies = match var(TRUSTED_PROXIES_ENV) {
            Some(raw) => split_list(&raw)
                .into_iter()
                .map(|entry| {
                    entry.parse::<IpAddr>().map_err(|_| ConfigError::Invalid {
                        name: TRUSTED_PROXIES_ENV,
                        value: entry,
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
            None => vec![IpAddr::from([127, 0, 0, 1])],
        };

        Ok(Self {
            bind,
            token,
            otp_ttl: Duration::from_secs(positive_or(&var, OTP_TTL_SECONDS_ENV, 180)?),
            rate_limit,
            trusted_proxies,
            database_path: var(DATABASE_PATH_ENV).map(PathBuf::from),
            schema_dir: var(SCHEMA_DIR_ENV).map(PathBuf::from),
            read_timeout: Duration::from_secs(positive_or(&var, READ_TIMEOUT_SECONDS_ENV, 10)?),
            shutdown_grace: Duration::from_secs(positive_or(
                &var,
                SHUTDOWN_GRACE_SECONDS_ENV,
                30,
            )?),
            swagger_enabled: flag_or(&var, SWAGGER_ENABLED_ENV, false)?,
            cors_enabled: flag_or(&var, CORS_ENABLED_ENV, false)?,
        })
    }
}

fn minutes(value: u64) -> Duration {
    Duration::from_secs(value.saturating_mul(60))
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_or<T, F>(var: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&'static str) -> Option<String>,
{
    match var(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
        None => Ok(default),
    }
}

fn positive_or<F>(var: &F, name: &'static str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&'static str) -> Option<String>,
{
    let value = parse_or(var, name, default)?;
    if value == 0 {
        return Err(ConfigError::Invalid {
            name,
            value: "0".to_string(),
        });
    }
    Ok(value)
}

fn flag_or<F>(var: &F, name: &'static str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&'static str) -> Option<String>,
{
    match var(name) {
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid { name, value: raw }),
        },
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_only_secret_is_set() {
        let config = load(&[(TOKEN_SECRET_ENV, SECRET)]).expect("config loads");

        assert_eq!(config.bind, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.otp_ttl, Duration::from_secs(180));
        assert_eq!(config.token.access_ttl, Duration::from_secs(3600));
        assert_eq!(config.rate_limit, RateLimitConfig::default());
        assert_eq!(config.trusted_proxies, vec![IpAddr::from([127, 0, 0, 1])]);
        assert_eq!(config.shutdown_grace, Duration::from_secs(30));
        assert!(config.database_path.is_none());
        assert!(!config.swagger_enabled);
    }

    #[test]
    fn missing_secret_is_rejected() {
        assert_eq!(
            load(&[]).unwrap_err(),
            ConfigError::Missing(TOKEN_SECRET_ENV)
        );
    }

    #[test]
    fn short_secret_is_rejected() {
        assert_eq!(
            load(&[(TOKEN_SECRET_ENV, "short")]).unwrap_err(),
            ConfigError::SecretTooShort
        );
    }

    #[test]
    fn rate_limit_settings_are_parsed() {
        let config = load(&[
            (TOKEN_SECRET_ENV, SECRET),
            (RATE_LIMIT_ENABLED_ENV, "false"),
            (RATE_LIMIT_REQUESTS_ENV, "5"),
            (RATE_LIMIT_WINDOW_SECONDS_ENV, "10"),
            (RATE_LIMIT_EXCLUDE_PATHS_ENV, " /metrics , /swagger ,"),
        ])
        .expect("config loads");

        assert!(!config.rate_limit.enabled);
        assert_eq!(config.rate_limit.requests_per_window, 5);
        assert_eq!(config.rate_limit.window, Duration::from_secs(10));
        assert_eq!(
            config.rate_limit.exclude_paths,
            vec!["/metrics".to_string(), "/swagger".to_string()]
        );
    }

    #[test]
    fn zero_threshold_is_invalid() {
        let err = load(&[(TOKEN_SECRET_ENV, SECRET), (RATE_LIMIT_REQUESTS_ENV, "0")])
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                name: RATE_LIMIT_REQUESTS_ENV,
                ..
            }
        ));
    }

    #[test]
    fn bad_port_and_proxy_are_invalid() {
        assert!(matches!(
            load(&[(TOKEN_SECRET_ENV, SECRET), (PORT_ENV, "http")]).unwrap_err(),
            ConfigError::Invalid { name: PORT_ENV, .. }
        ));
        assert!(matches!(
            load(&[(TOKEN_SECRET_ENV, SECRET), (TRUSTED_PROXIES_ENV, "10.0.0.1,nope")])
                .unwrap_err(),
            ConfigError::Invalid {
                name: TRUSTED_PROXIES_ENV,
                ..
            }
        ));
    }

    #[test]
    fn flags_accept_common_spellings() {
        let config = load(&[
            (TOKEN_SECRET_ENV, SECRET),
            (SWAGGER_ENABLED_ENV, "YES"),
            (CORS_ENABLED_ENV, "1"),
        ])
        .expect("config loads");
        assert!(config.swagger_enabled);
        assert!(config.cors_enabled);
    }
}
