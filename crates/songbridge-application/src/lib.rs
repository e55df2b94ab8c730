// SPDX-License-Identifier: GPL-3.0-or-later
use std::time::Duration;

use anyhow::{bail, Context, Result};
use songbridge_catalog::{CatalogClient, SearchKind};
use songbridge_config::{AppConfig, CatalogConfig};

pub mod adapter;
pub mod conversion;
pub mod events;
pub mod matching;
pub mod normalize;
pub mod playlist;
pub mod scoring;
pub mod search;
#[cfg(test)]
mod test_support;

pub use conversion::{AssumedMatch, ConversionReport, PlaylistConverter};
pub use events::{EventPublisher, InMemoryEventBus, NullEventPublisher};
pub use matching::{EntryResolution, MatchOutcome, MatchingError, MatchingResult, TrackMatcher};
pub use playlist::{
    publish_playlist, upload_in_batches, BatchOutcome, JsonPlaylist, PlaylistError,
    PlaylistUploader, SourcePlaylist, UploadReport,
};
pub use search::TrackSearch;

use tracing::info;

/// Playlist name used when `conversion.playlist_name` is unset.
pub const DEFAULT_PLAYLIST_NAME: &str = "songbridge import";

/// Build a catalog client from the `catalog` config section.
pub fn catalog_client(config: &CatalogConfig) -> Result<CatalogClient> {
    let Some(token) = config.access_token.as_deref().filter(|t| !t.trim().is_empty()) else {
        bail!("catalog.access_token is not set");
    };

    CatalogClient::builder()
        .base_url(config.base_url.clone())
        .access_token(token)
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .rate_limit_interval(Duration::from_millis(config.min_request_interval_ms))
        .retry_margin(Duration::from_secs(config.retry_margin_secs))
        .build()
        .context("failed to build catalog client")
}

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn on_start(&self) {
        info!(
            target: "application",
            base_url = %self.config.catalog.base_url,
            search_kind = %self.config.catalog.search_kind,
            "application state initialized"
        );
    }

    pub fn search_kind(&self) -> Result<SearchKind> {
        self.config
            .catalog
            .search_kind
            .parse()
            .context("invalid catalog.search_kind")
    }

    pub fn catalog_client(&self) -> Result<CatalogClient> {
        catalog_client(&self.config.catalog)
    }

    pub fn playlist_name(&self) -> &str {
        self.config
            .conversion
            .playlist_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_PLAYLIST_NAME)
    }

    /// Create the destination playlist and upload every matched identifier,
    /// in `conversion.upload_batch_size` chunks.
    pub async fn publish<U>(&self, uploader: &U, report: &ConversionReport) -> Result<UploadReport>
    where
        U: PlaylistUploader + ?Sized,
    {
        let identifiers = report.identifiers();
        let description = format!(
            "Converted by songbridge: {} of {} tracks matched",
            identifiers.len(),
            report.len()
        );

        publish_playlist(
            uploader,
            self.playlist_name(),
            &description,
            &identifiers,
            self.config.conversion.upload_batch_size,
        )
        .await
        .context("failed to publish playlist")
    }

    /// Converter over `search` configured from the `conversion` section.
    pub fn converter<S, P>(&self, search: S, publisher: P) -> Result<PlaylistConverter<S, P>>
    where
        S: TrackSearch,
        P: EventPublisher,
    {
        let matcher = TrackMatcher::with_publisher(search, publisher).search_kind(self.search_kind()?);
        Ok(PlaylistConverter::new(matcher)
            .with_concurrency(self.config.conversion.max_concurrent_entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingUploader;

    fn config_with_token() -> AppConfig {
        let mut config = AppConfig::default();
        config.catalog.access_token = Some("token".to_string());
        config
    }

    #[test]
    fn catalog_client_requires_token() {
        let err = catalog_client(&AppConfig::default().catalog).unwrap_err();
        assert!(err.to_string().contains("access_token"));

        let mut config = AppConfig::default();
        config.catalog.access_token = Some("   ".to_string());
        assert!(catalog_client(&config.catalog).is_err());
    }

    #[test]
    fn catalog_client_uses_configured_base_url() {
        let mut config = config_with_token();
        config.catalog.base_url = "http://localhost:9000/v1/".to_string();

        let client = AppState::new(config).catalog_client().unwrap();
        assert_eq!(client.base_url(), "http://localhost:9000/v1");
    }

    #[test]
    fn invalid_search_kind_is_rejected() {
        let mut config = config_with_token();
        config.catalog.search_kind = "podcast".to_string();

        let state = AppState::new(config);
        assert!(state.search_kind().is_err());
        assert!(state
            .converter(crate::test_support::ScriptedSearch::empty(), NullEventPublisher)
            .is_err());
    }

    fn report_with(identifiers: &[&str], skipped: usize) -> ConversionReport {
        use songbridge_domain::{Candidate, Entry, MatchResult};

        let mut resolutions: Vec<_> = identifiers
            .iter()
            .map(|id| EntryResolution {
                entry: Entry::new("Song", ["A"], ""),
                outcome: MatchOutcome::Matched(MatchResult::new(
                    Entry::new("Song", ["A"], ""),
                    Candidate::new("Song", ["A"], "", *id).with_similarity(1.0),
                )),
                attempts: Vec::new(),
            })
            .collect();
        resolutions.extend((0..skipped).map(|_| EntryResolution {
            entry: Entry::new("Missing", ["B"], ""),
            outcome: MatchOutcome::Unmatched,
            attempts: Vec::new(),
        }));
        ConversionReport { resolutions }
    }

    #[tokio::test]
    async fn publish_uses_configured_name_and_batch_size() {
        let mut config = AppConfig::default();
        config.conversion.playlist_name = Some("Road Trip".to_string());
        config.conversion.upload_batch_size = 2;
        let state = AppState::new(config);
        let uploader = RecordingUploader::default();

        let upload = state
            .publish(&uploader, &report_with(&["a", "b", "c", "d", "e"], 1))
            .await
            .unwrap();

        assert_eq!(upload.playlist_id, "pl-Road Trip");
        assert_eq!(upload.uploaded(), 5);
        assert_eq!(
            *uploader.created.lock().unwrap(),
            vec![(
                "Road Trip".to_string(),
                "Converted by songbridge: 5 of 6 tracks matched".to_string()
            )]
        );
        let sizes: Vec<_> = uploader.calls.lock().unwrap().iter().map(|(_, n)| *n).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[tokio::test]
    async fn publish_falls_back_to_default_name() {
        let state = AppState::new(AppConfig::default());
        let uploader = RecordingUploader::default();

        let upload = state.publish(&uploader, &report_with(&["a"], 0)).await.unwrap();

        assert_eq!(upload.playlist_id, format!("pl-{DEFAULT_PLAYLIST_NAME}"));
        assert_eq!(uploader.calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn search_kind_defaults_to_track() {
        let state = AppState::new(AppConfig::default());
        assert_eq!(state.search_kind().unwrap(), SearchKind::Track);
    }
}
