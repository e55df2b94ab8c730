// SPDX-License-Identifier: GPL-3.0-or-later

//! Scripted catalog fakes for unit tests.

use crate::playlist::PlaylistUploader;
use crate::search::TrackSearch;
use async_trait::async_trait;
use songbridge_catalog::{
    AlbumRef, ArtistRef, CatalogError, SearchResponse, TrackItem, TrackPage, TrackQuery,
};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

type Responder = Box<dyn Fn(&TrackQuery) -> Result<SearchResponse, CatalogError> + Send + Sync>;

pub(crate) struct ScriptedSearch {
    responder: Responder,
    queries: Mutex<Vec<TrackQuery>>,
}

impl ScriptedSearch {
    pub(crate) fn new(
        responder: impl Fn(&TrackQuery) -> Result<SearchResponse, CatalogError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Replies in order, then with empty pages once the script runs out.
    pub(crate) fn sequence(responses: Vec<Result<SearchResponse, CatalogError>>) -> Self {
        let queue = Mutex::new(VecDeque::from(responses));
        Self::new(move |_| {
            queue
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(SearchResponse::default()))
        })
    }

    pub(crate) fn empty() -> Self {
        Self::new(|_| Ok(SearchResponse::default()))
    }

    pub(crate) fn queries(&self) -> Vec<TrackQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl TrackSearch for ScriptedSearch {
    async fn search(&self, query: &TrackQuery) -> Result<SearchResponse, CatalogError> {
        self.queries.lock().unwrap().push(query.clone());
        (self.responder)(query)
    }
}

/// Build a search page from `(title, artists, album, uri)` tuples.
pub(crate) fn page(items: &[(&str, &[&str], &str, &str)]) -> SearchResponse {
    SearchResponse {
        tracks: TrackPage {
            items: items
                .iter()
                .map(|(name, artists, album, uri)| TrackItem {
                    name: name.to_string(),
                    uri: uri.to_string(),
                    artists: artists
                        .iter()
                        .map(|artist| ArtistRef {
                            name: artist.to_string(),
                        })
                        .collect(),
                    album: AlbumRef {
                        name: album.to_string(),
                    },
                })
                .collect(),
            total: items.len() as u32,
            limit: 20,
            offset: 0,
        },
    }
}

pub(crate) fn auth_error() -> CatalogError {
    CatalogError::Auth {
        status: 401,
        message: "The access token expired".to_string(),
    }
}

pub(crate) fn remote_error(status: u16) -> CatalogError {
    CatalogError::Remote {
        status,
        message: "upstream failure".to_string(),
    }
}

/// Records uploads; fails the batches listed in `failures`.
#[derive(Default)]
pub(crate) struct RecordingUploader {
    pub(crate) failures: HashMap<usize, fn() -> CatalogError>,
    pub(crate) created: Mutex<Vec<(String, String)>>,
    pub(crate) calls: Mutex<Vec<(String, usize)>>,
}

#[async_trait]
impl PlaylistUploader for RecordingUploader {
    async fn create_playlist(&self, name: &str, description: &str) -> Result<String, CatalogError> {
        self.created
            .lock()
            .unwrap()
            .push((name.to_string(), description.to_string()));
        Ok(format!("pl-{name}"))
    }

    async fn add_tracks(&self, playlist_id: &str, identifiers: &[String]) -> Result<(), CatalogError> {
        let mut calls = self.calls.lock().unwrap();
        let index = calls.len();
        calls.push((playlist_id.to_string(), identifiers.len()));
        match self.failures.get(&index) {
            Some(make_error) => Err(make_error()),
            None => Ok(()),
        }
    }
}
