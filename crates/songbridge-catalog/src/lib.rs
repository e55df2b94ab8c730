// SPDX-License-Identifier: GPL-3.0-or-later

//! Catalog API client for resolving and uploading tracks.
//!
//! Provides track search with percent-encoded field queries, playlist
//! creation and track upload, and a rate limiter shared across clones so
//! concurrent callers back off together when the catalog answers 429.

pub mod client;
pub mod error;
pub mod models;
pub mod rate_limiter;

pub use client::{CatalogClient, CatalogClientBuilder, MAX_TRACKS_PER_REQUEST};
pub use error::{CatalogError, Result};
pub use models::{
    AlbumRef, ArtistRef, NewPlaylist, Playlist, SearchKind, SearchResponse, SnapshotResponse,
    TrackItem, TrackPage, TrackQuery, UserProfile,
};
pub use rate_limiter::RateLimiter;
