use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use datastore::DEFAULT_REVALIDATE_AFTER;
use playlist_fetcher::DEFAULT_API_BASE;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
const MOCK_API_KEY: &str = "mock-key";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("environment variable {0} is required")]
    Missing(&'static str),

    #[error("environment variable {var} has invalid value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

/// Service configuration, read once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub playlist_id: String,
    pub api_key: String,
    pub api_base: String,
    pub bind_addr: SocketAddr,
    pub revalidate_after: Duration,
    /// Serve the mock upstream from this process and fetch from it
    pub mock_upstream: bool,
    pub tls: Option<TlsPaths>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let mock_upstream = match get("MOCK_UPSTREAM") {
            Some(value) => parse_flag("MOCK_UPSTREAM", value)?,
            None => false,
        };

        let bind_addr = match get("BIND_ADDR") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                var: "BIND_ADDR",
                value,
                reason: "expected host:port",
            })?,
            None => DEFAULT_BIND_ADDR
                .parse()
                .expect("default bind address is valid"),
        };

        let revalidate_after = match get("REVALIDATE_SECS") {
            Some(value) => match value.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "REVALIDATE_SECS",
                        value,
                        reason: "expected a positive number of seconds",
                    });
                }
            },
            None => DEFAULT_REVALIDATE_AFTER,
        };

        let tls = match (get("TLS_CERT_PATH"), get("TLS_KEY_PATH")) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert_path: PathBuf::from(cert),
                key_path: PathBuf::from(key),
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing("TLS_KEY_PATH")),
            (None, Some(_)) => return Err(ConfigError::Missing("TLS_CERT_PATH")),
        };

        let (playlist_id, api_key, api_base) = if mock_upstream {
            if tls.is_some() {
                return Err(ConfigError::Invalid {
                    var: "MOCK_UPSTREAM",
                    value: "true".to_string(),
                    reason: "the mock upstream is served over plain HTTP only",
                });
            }
            (
                get("PLAYLIST_ID").unwrap_or_else(|| mock_upstream::SEEDED_PLAYLIST_ID.to_string()),
                get("YOUTUBE_API_KEY").unwrap_or_else(|| MOCK_API_KEY.to_string()),
                get("YOUTUBE_API_BASE").unwrap_or_else(|| format!("http://{bind_addr}")),
            )
        } else {
            (
                get("PLAYLIST_ID").ok_or(ConfigError::Missing("PLAYLIST_ID"))?,
                get("YOUTUBE_API_KEY").ok_or(ConfigError::Missing("YOUTUBE_API_KEY"))?,
                get("YOUTUBE_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            )
        };

        Ok(Self {
            playlist_id,
            api_key,
            api_base,
            bind_addr,
            revalidate_after,
            mock_upstream,
            tls,
        })
    }
}

fn parse_flag(var: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            var,
            value,
            reason: "expected true or false",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_credentials_are_set() {
        let config = config(&[("PLAYLIST_ID", "PL1"), ("YOUTUBE_API_KEY", "key")]).unwrap();
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.bind_addr, "127.0.0.1:3000".parse().unwrap());
        assert_eq!(config.revalidate_after, Duration::from_secs(20));
        assert!(!config.mock_upstream);
        assert!(config.tls.is_none());
    }

    #[test]
    fn credentials_are_required_without_mock() {
        assert_eq!(
            config(&[("YOUTUBE_API_KEY", "key")]).unwrap_err(),
            ConfigError::Missing("PLAYLIST_ID")
        );
        assert_eq!(
            config(&[("PLAYLIST_ID", "PL1"), ("YOUTUBE_API_KEY", "  ")]).unwrap_err(),
            ConfigError::Missing("YOUTUBE_API_KEY")
        );
    }

    #[test]
    fn mock_upstream_points_fetcher_at_itself() {
        let config = config(&[("MOCK_UPSTREAM", "1"), ("BIND_ADDR", "127.0.0.1:8080")]).unwrap();
        assert!(config.mock_upstream);
        assert_eq!(config.playlist_id, mock_upstream::SEEDED_PLAYLIST_ID);
        assert_eq!(config.api_base, "http://127.0.0.1:8080");
    }

    #[test]
    fn invalid_values_name_the_variable() {
        let err = config(&[
            ("PLAYLIST_ID", "PL1"),
            ("YOUTUBE_API_KEY", "key"),
            ("REVALIDATE_SECS", "0"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "REVALIDATE_SECS", .. }));

        let err = config(&[("MOCK_UPSTREAM", "maybe")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "MOCK_UPSTREAM", .. }));
    }

    #[test]
    fn tls_needs_both_paths() {
        let err = config(&[
            ("PLAYLIST_ID", "PL1"),
            ("YOUTUBE_API_KEY", "key"),
            ("TLS_CERT_PATH", "cert.pem"),
        ])
        .unwrap_err();
        assert_eq!(err, ConfigError::Missing("TLS_KEY_PATH"));
    }
}
