// SPDX-License-Identifier: GPL-3.0-or-later

use crate::error::CatalogError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Kind of catalog object a search is filtered to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchKind {
    #[default]
    Track,
    Album,
    Artist,
}

impl SearchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Track => "track",
            Self::Album => "album",
            Self::Artist => "artist",
        }
    }
}

impl FromStr for SearchKind {
    type Err = CatalogError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "track" => Ok(Self::Track),
            "album" => Ok(Self::Album),
            "artist" => Ok(Self::Artist),
            other => Err(CatalogError::InvalidQuery(format!(
                "unsupported search kind '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for SearchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Search query parameters.
///
/// Empty fields are left out of the rendered query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackQuery {
    pub song: String,
    /// Artist names already joined into one fragment.
    pub artist: String,
    pub album: String,
    pub kind: SearchKind,
}

impl TrackQuery {
    pub fn new(song: impl Into<String>) -> Self {
        Self {
            song: song.into(),
            ..Self::default()
        }
    }

    pub fn artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = artist.into();
        self
    }

    pub fn album(mut self, album: impl Into<String>) -> Self {
        self.album = album.into();
        self
    }

    pub fn kind(mut self, kind: SearchKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.song.trim().is_empty() && self.artist.trim().is_empty() && self.album.trim().is_empty()
    }

    /// Render the unencoded `q` value: song, then `artist:`, then `album:`.
    pub fn render(&self) -> String {
        let mut parts = Vec::with_capacity(3);
        let song = self.song.trim();
        if !song.is_empty() {
            parts.push(song.to_string());
        }
        let artist = self.artist.trim();
        if !artist.is_empty() {
            parts.push(format!("artist:{artist}"));
        }
        let album = self.album.trim();
        if !album.is_empty() {
            parts.push(format!("album:{album}"));
        }
        parts.join(" ")
    }
}

/// Search response envelope. Only the track page is read.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub tracks: TrackPage,
}

impl SearchResponse {
    pub fn items(&self) -> &[TrackItem] {
        &self.tracks.items
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackPage {
    #[serde(default)]
    pub items: Vec<TrackItem>,
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

/// One track in a search result page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackItem {
    /// Track title.
    pub name: String,
    /// Opaque catalog URI.
    pub uri: String,
    /// Credited artists, in catalog order.
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
    #[serde(default)]
    pub album: AlbumRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtistRef {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlbumRef {
    #[serde(default)]
    pub name: String,
}

/// Current user profile, needed to create playlists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPlaylist {
    pub name: String,
    pub description: String,
    pub public: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub uri: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotResponse {
    pub snapshot_id: String,
}
