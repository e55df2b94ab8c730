// SPDX-License-Identifier: GPL-3.0-or-later

use async_trait::async_trait;
use songbridge_catalog::{CatalogClient, CatalogError, SearchResponse, TrackQuery};

/// Catalog search seam used by the matcher.
#[async_trait]
pub trait TrackSearch: Send + Sync {
    async fn search(&self, query: &TrackQuery) -> Result<SearchResponse, CatalogError>;
}

#[async_trait]
impl TrackSearch for CatalogClient {
    async fn search(&self, query: &TrackQuery) -> Result<SearchResponse, CatalogError> {
        CatalogClient::search(self, query).await
    }
}

#[async_trait]
impl<T: TrackSearch + ?Sized> TrackSearch for std::sync::Arc<T> {
    async fn search(&self, query: &TrackQuery) -> Result<SearchResponse, CatalogError> {
        (**self).search(query).await
    }
}
