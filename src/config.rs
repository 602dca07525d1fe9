//! Service configuration, read once at startup and passed down explicitly.
use crate::normalize::NormalizeOptions;
use crate::persistence::DEFAULT_COLLECTION;
use crate::search::{Provider, UpstreamConfig, RAPIDAPI_HOST, REQUEST_TIMEOUT};
use crate::watchlist::SyncPolicy;
use anyhow::{anyhow, bail, Context, Result};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

const DEFAULT_BIND: &str = "0.0.0.0:3146";
const DEFAULT_DATA_DIR: &str = "data";

#[derive(Debug, Clone)]
pub struct Config {
    pub upstream: UpstreamConfig,
    pub storage: StorageConfig,
    pub sync_policy: SyncPolicy,
    pub bind_addr: SocketAddr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    Local { dir: PathBuf },
    Remote { base_url: String, collection: String },
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_key = get("UPSTREAM_API_KEY")
            .ok_or_else(|| anyhow!("Missing required environment variable: UPSTREAM_API_KEY"))?;

        let provider = match get("UPSTREAM_PROVIDER").as_deref().map(str::to_lowercase).as_deref() {
            None | Some("rapidapi") => Provider::RapidApiImdb {
                host: get("UPSTREAM_HOST").unwrap_or_else(|| RAPIDAPI_HOST.to_string()),
            },
            Some("omdb") => Provider::Omdb,
            Some(other) => bail!("UPSTREAM_PROVIDER must be 'rapidapi' or 'omdb', got '{}'", other),
        };
        let base_url = get("UPSTREAM_BASE_URL")
            .unwrap_or_else(|| provider.default_base_url().to_string());

        let require_image = match get("REQUIRE_IMAGE") {
            Some(v) => parse_bool(&v).context("REQUIRE_IMAGE")?,
            None => true,
        };

        let storage = match get("WATCHLIST_BACKEND_URL") {
            Some(base_url) => StorageConfig::Remote {
                base_url,
                collection: get("WATCHLIST_COLLECTION")
                    .unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            },
            None => StorageConfig::Local {
                dir: PathBuf::from(
                    get("WATCHLIST_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()),
                ),
            },
        };

        let sync_policy = match get("SYNC_POLICY").as_deref().map(str::to_lowercase).as_deref() {
            None | Some("optimistic") => SyncPolicy::Optimistic,
            Some("confirmed") => SyncPolicy::Confirmed,
            Some(other) => bail!("SYNC_POLICY must be 'optimistic' or 'confirmed', got '{}'", other),
        };

        let bind = get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind_addr = bind
            .parse::<SocketAddr>()
            .with_context(|| format!("BIND_ADDR is not a socket address: {}", bind))?;

        Ok(Self {
            upstream: UpstreamConfig {
                provider,
                base_url,
                api_key,
                normalize: NormalizeOptions { require_image },
                timeout: REQUEST_TIMEOUT,
            },
            storage,
            sync_policy,
            bind_addr,
        })
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => bail!("expected a boolean, got '{}'", value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{OMDB_BASE, RAPIDAPI_BASE};
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_with_only_api_key() {
        let cfg = config(&[("UPSTREAM_API_KEY", "k")]).unwrap();
        assert_eq!(cfg.upstream.api_key, "k");
        assert_eq!(
            cfg.upstream.provider,
            Provider::RapidApiImdb {
                host: RAPIDAPI_HOST.to_string()
            }
        );
        assert_eq!(cfg.upstream.base_url, RAPIDAPI_BASE);
        assert!(cfg.upstream.normalize.require_image);
        assert_eq!(
            cfg.storage,
            StorageConfig::Local {
                dir: PathBuf::from("data")
            }
        );
        assert_eq!(cfg.sync_policy, SyncPolicy::Optimistic);
        assert_eq!(cfg.bind_addr.port(), 3146);
    }

    #[test]
    fn missing_or_blank_api_key_fails() {
        let err = config(&[]).unwrap_err();
        assert!(err.to_string().contains("UPSTREAM_API_KEY"));
        assert!(config(&[("UPSTREAM_API_KEY", "  ")]).is_err());
    }

    #[test]
    fn remote_backend_and_omdb_provider() {
        let cfg = config(&[
            ("UPSTREAM_API_KEY", "k"),
            ("UPSTREAM_PROVIDER", "OMDb"),
            ("WATCHLIST_BACKEND_URL", "https://backend.example"),
            ("WATCHLIST_COLLECTION", "watched-movies"),
            ("SYNC_POLICY", "confirmed"),
            ("REQUIRE_IMAGE", "false"),
        ])
        .unwrap();
        assert_eq!(cfg.upstream.provider, Provider::Omdb);
        assert_eq!(cfg.upstream.base_url, OMDB_BASE);
        assert!(!cfg.upstream.normalize.require_image);
        assert_eq!(
            cfg.storage,
            StorageConfig::Remote {
                base_url: "https://backend.example".to_string(),
                collection: "watched-movies".to_string()
            }
        );
        assert_eq!(cfg.sync_policy, SyncPolicy::Confirmed);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(config(&[("UPSTREAM_API_KEY", "k"), ("UPSTREAM_PROVIDER", "tvdb")]).is_err());
        assert!(config(&[("UPSTREAM_API_KEY", "k"), ("SYNC_POLICY", "eventual")]).is_err());
        assert!(config(&[("UPSTREAM_API_KEY", "k"), ("REQUIRE_IMAGE", "maybe")]).is_err());
        assert!(config(&[("UPSTREAM_API_KEY", "k"), ("BIND_ADDR", "nowhere")]).is_err());
    }
}
