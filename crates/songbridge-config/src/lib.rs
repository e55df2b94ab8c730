// SPDX-License-Identifier: GPL-3.0-or-later
use std::path::Path;

use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub base_url: String,
    /// Bearer token sent with every catalog request.
    pub access_token: Option<String>,
    pub request_timeout_secs: u64,
    /// Minimum spacing between requests, shared by every caller of one client.
    pub min_request_interval_ms: u64,
    /// Added on top of the server's retry-after value before the single retry.
    pub retry_margin_secs: u64,
    pub search_kind: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.spotify.com/v1".to_string(),
            access_token: None,
            request_timeout_secs: 30,
            min_request_interval_ms: 100,
            retry_margin_secs: 1,
            search_kind: "track".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionConfig {
    pub max_concurrent_entries: usize,
    pub upload_batch_size: usize,
    pub playlist_name: Option<String>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            max_concurrent_entries: 4,
            upload_batch_size: 100,
            playlist_name: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub catalog: CatalogConfig,
    pub conversion: ConversionConfig,
}

/// Load configuration from defaults, optional TOML file, and environment overrides (prefix: SONGBRIDGE_).
pub fn load(config_path: Option<&Path>) -> Result<AppConfig> {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

    if let Some(path) = config_path {
        figment = figment.merge(Toml::file(path));
    }

    figment = figment.merge(Env::prefixed("SONGBRIDGE_").split("__"));

    let config: AppConfig = figment.extract()?;
    info!(
        target: "config",
        base_url = %config.catalog.base_url,
        max_concurrent_entries = config.conversion.max_concurrent_entries,
        "configuration loaded"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_without_file_or_env() {
        Jail::expect_with(|_jail| {
            let config = load(None).expect("defaults should load");
            assert_eq!(config.catalog.base_url, "https://api.spotify.com/v1");
            assert_eq!(config.catalog.search_kind, "track");
            assert_eq!(config.catalog.retry_margin_secs, 1);
            assert!(config.catalog.access_token.is_none());
            assert_eq!(config.conversion.upload_batch_size, 100);
            Ok(())
        });
    }

    #[test]
    fn toml_file_overrides_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "songbridge.toml",
                r#"
                [catalog]
                base_url = "http://localhost:9000"
                min_request_interval_ms = 0

                [conversion]
                max_concurrent_entries = 1
                playlist_name = "Imported"
                "#,
            )?;

            let config = load(Some(Path::new("songbridge.toml"))).expect("file should load");
            assert_eq!(config.catalog.base_url, "http://localhost:9000");
            assert_eq!(config.catalog.min_request_interval_ms, 0);
            assert_eq!(config.catalog.request_timeout_secs, 30);
            assert_eq!(config.conversion.max_concurrent_entries, 1);
            assert_eq!(config.conversion.playlist_name.as_deref(), Some("Imported"));
            Ok(())
        });
    }

    #[test]
    fn environment_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "songbridge.toml",
                r#"
                [catalog]
                access_token = "from-file"
                "#,
            )?;
            jail.set_env("SONGBRIDGE_CATALOG__ACCESS_TOKEN", "from-env");
            jail.set_env("SONGBRIDGE_CONVERSION__UPLOAD_BATCH_SIZE", "50");

            let config = load(Some(Path::new("songbridge.toml"))).expect("env should load");
            assert_eq!(config.catalog.access_token.as_deref(), Some("from-env"));
            assert_eq!(config.conversion.upload_batch_size, 50);
            Ok(())
        });
    }
}
