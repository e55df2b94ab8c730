// SPDX-License-Identifier: GPL-3.0-or-later

//! Playlist sources and destination upload.

use async_trait::async_trait;
use songbridge_catalog::{CatalogClient, CatalogError, NewPlaylist, MAX_TRACKS_PER_REQUEST};
use songbridge_domain::Entry;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum PlaylistError {
    #[error("Failed to read playlist {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed playlist: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

pub type PlaylistResult<T> = Result<T, PlaylistError>;

/// Ordered supply of source entries.
#[async_trait]
pub trait SourcePlaylist: Send + Sync {
    async fn entries(&self) -> PlaylistResult<Vec<Entry>>;
}

/// Entries stored as a JSON array of `{song, artist, album}` objects.
#[derive(Debug, Clone)]
pub struct JsonPlaylist {
    path: PathBuf,
}

impl JsonPlaylist {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SourcePlaylist for JsonPlaylist {
    async fn entries(&self) -> PlaylistResult<Vec<Entry>> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| PlaylistError::Io {
                path: self.path.clone(),
                source,
            })?;
        let entries = parse_entries(&raw)?;
        debug!(target: "conversion", path = %self.path.display(), entries = entries.len(), "loaded source playlist");
        Ok(entries)
    }
}

pub fn parse_entries(json: &str) -> PlaylistResult<Vec<Entry>> {
    Ok(serde_json::from_str(json)?)
}

/// Destination side of a conversion.
#[async_trait]
pub trait PlaylistUploader: Send + Sync {
    /// Create an empty playlist and return its id.
    async fn create_playlist(&self, name: &str, description: &str) -> Result<String, CatalogError>;

    async fn add_tracks(&self, playlist_id: &str, identifiers: &[String]) -> Result<(), CatalogError>;
}

#[async_trait]
impl PlaylistUploader for CatalogClient {
    async fn create_playlist(&self, name: &str, description: &str) -> Result<String, CatalogError> {
        let user = self.current_user().await?;
        let playlist = CatalogClient::create_playlist(
            self,
            &user.id,
            &NewPlaylist {
                name: name.to_string(),
                description: description.to_string(),
                public: false,
            },
        )
        .await?;
        info!(target: "catalog", user = %user.id, playlist = %playlist.id, "playlist created");
        Ok(playlist.id)
    }

    async fn add_tracks(&self, playlist_id: &str, identifiers: &[String]) -> Result<(), CatalogError> {
        CatalogClient::add_tracks(self, playlist_id, identifiers)
            .await
            .map(|_| ())
    }
}

/// Result of uploading one chunk of identifiers.
#[derive(Debug)]
pub struct BatchOutcome {
    pub index: usize,
    pub size: usize,
    pub result: Result<(), CatalogError>,
}

impl BatchOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Split identifiers into upload chunks; `batch_size` is clamped to `1..=100`.
pub fn chunk_identifiers(identifiers: &[String], batch_size: usize) -> Vec<&[String]> {
    identifiers
        .chunks(batch_size.clamp(1, MAX_TRACKS_PER_REQUEST))
        .collect()
}

/// Upload identifiers chunk by chunk, one outcome per attempted chunk.
///
/// A failed chunk does not stop the upload unless the failure is an
/// authorization error, after which no further chunks are sent.
pub async fn upload_in_batches<U>(
    uploader: &U,
    playlist_id: &str,
    identifiers: &[String],
    batch_size: usize,
) -> Vec<BatchOutcome>
where
    U: PlaylistUploader + ?Sized,
{
    let chunks = chunk_identifiers(identifiers, batch_size);
    let total = chunks.len();
    let mut outcomes = Vec::with_capacity(total);

    for (index, chunk) in chunks.into_iter().enumerate() {
        let result = uploader.add_tracks(playlist_id, chunk).await;
        let fatal = matches!(&result, Err(err) if err.is_auth());

        match &result {
            Ok(()) => debug!(target: "conversion", batch = index, size = chunk.len(), "batch uploaded"),
            Err(err) => warn!(target: "conversion", batch = index, size = chunk.len(), error = %err, "batch upload failed"),
        }

        outcomes.push(BatchOutcome {
            index,
            size: chunk.len(),
            result,
        });

        if fatal {
            warn!(
                target: "conversion",
                remaining = total - index - 1,
                "catalog rejected credentials, stopping upload"
            );
            break;
        }
    }

    outcomes
}

/// A created playlist and the outcome of every upload chunk.
#[derive(Debug)]
pub struct UploadReport {
    pub playlist_id: String,
    pub batches: Vec<BatchOutcome>,
}

impl UploadReport {
    /// Number of identifiers in successful chunks.
    pub fn uploaded(&self) -> usize {
        self.batches
            .iter()
            .filter(|batch| batch.is_success())
            .map(|batch| batch.size)
            .sum()
    }

    pub fn failed_batches(&self) -> usize {
        self.batches.iter().filter(|batch| !batch.is_success()).count()
    }
}

/// Create a playlist named `name` and fill it with `identifiers`.
pub async fn publish_playlist<U>(
    uploader: &U,
    name: &str,
    description: &str,
    identifiers: &[String],
    batch_size: usize,
) -> PlaylistResult<UploadReport>
where
    U: PlaylistUploader + ?Sized,
{
    let playlist_id = uploader.create_playlist(name, description).await?;
    let batches = upload_in_batches(uploader, &playlist_id, identifiers, batch_size).await;
    let report = UploadReport {
        playlist_id,
        batches,
    };

    info!(
        target: "conversion",
        playlist = %report.playlist_id,
        uploaded = report.uploaded(),
        failed_batches = report.failed_batches(),
        "playlist published"
    );
    Ok(report)
}
