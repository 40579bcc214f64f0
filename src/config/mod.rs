//! Application configuration management

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::indexer::torznab::{DEFAULT_CHARSET, DEFAULT_CONTENT_TYPE};

/// Application configuration loaded from environment variables
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// JSON catalog of media item records loaded at startup
    pub catalog_path: Option<PathBuf>,

    /// Lifetime of cached media items (None = until replaced by a resync)
    pub cache_ttl: Option<Duration>,

    /// Record rewritten titles for reverse lookups
    pub enable_changed_title_cache: bool,

    /// Content type of aggregated feeds when no indexer declares one
    pub default_content_type: String,

    /// Charset of aggregated feeds when no indexer declares one
    pub default_charset: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog_path: None,
            cache_ttl: None,
            enable_changed_title_cache: false,
            default_content_type: DEFAULT_CONTENT_TYPE.to_string(),
            default_charset: DEFAULT_CHARSET.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let cache_ttl_minutes: u64 = lookup("CACHE_TTL_MINUTES")
            .filter(|v| !v.trim().is_empty())
            .map(|v| v.trim().parse())
            .transpose()
            .context("Invalid CACHE_TTL_MINUTES")?
            .unwrap_or(0);

        Ok(Self {
            catalog_path: lookup("CATALOG_PATH")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),

            cache_ttl: (cache_ttl_minutes > 0).then(|| Duration::from_secs(cache_ttl_minutes * 60)),

            enable_changed_title_cache: lookup("ENABLE_CHANGED_TITLE_CACHE")
                .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
                .unwrap_or(false),

            default_content_type: lookup("DEFAULT_CONTENT_TYPE")
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),

            default_charset: lookup("DEFAULT_CHARSET").unwrap_or_else(|| DEFAULT_CHARSET.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        assert_eq!(config(&[]).unwrap(), Config::default());
    }

    #[test]
    fn test_values_are_parsed() {
        let config = config(&[
            ("CATALOG_PATH", "/data/catalog.json"),
            ("CACHE_TTL_MINUTES", "720"),
            ("ENABLE_CHANGED_TITLE_CACHE", "TRUE"),
            ("DEFAULT_CHARSET", "iso-8859-1"),
        ])
        .unwrap();

        assert_eq!(config.catalog_path, Some(PathBuf::from("/data/catalog.json")));
        assert_eq!(config.cache_ttl, Some(Duration::from_secs(720 * 60)));
        assert!(config.enable_changed_title_cache);
        assert_eq!(config.default_charset, "iso-8859-1");
        assert_eq!(config.default_content_type, "application/xml");
    }

    #[test]
    fn test_zero_ttl_never_expires() {
        assert_eq!(config(&[("CACHE_TTL_MINUTES", "0")]).unwrap().cache_ttl, None);
    }

    #[test]
    fn test_invalid_ttl_is_an_error() {
        let err = config(&[("CACHE_TTL_MINUTES", "soon")]).unwrap_err();
        assert!(err.to_string().contains("CACHE_TTL_MINUTES"));
    }
}
