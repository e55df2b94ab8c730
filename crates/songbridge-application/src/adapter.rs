// SPDX-License-Identifier: GPL-3.0-or-later

//! Reshapes catalog search responses into [`Candidate`]s.

use songbridge_catalog::{SearchResponse, TrackItem};
use songbridge_domain::Candidate;

pub fn adapt(response: &SearchResponse) -> Vec<Candidate> {
    response.items().iter().map(adapt_item).collect()
}

pub fn adapt_item(item: &TrackItem) -> Candidate {
    Candidate::new(
        item.name.clone(),
        item.artists.iter().map(|artist| artist.name.clone()),
        item.album.name.clone(),
        item.uri.clone(),
    )
}
