// SPDX-License-Identifier: GPL-3.0-or-later

//! Playlist-wide conversion on top of [`TrackMatcher`].
//!
//! Entries are resolved with bounded parallelism. Results always come back in
//! source order, whatever order the searches complete in. An authorization
//! failure on any entry aborts the whole run.

use crate::events::{EventPublisher, NullEventPublisher};
use crate::matching::{EntryResolution, MatchingResult, TrackMatcher};
use crate::search::TrackSearch;
use futures_util::stream::{self, StreamExt, TryStreamExt};
use songbridge_domain::{Entry, MatchResult};
use std::fmt;
use tracing::{debug, info};

pub const DEFAULT_MAX_CONCURRENT_ENTRIES: usize = 4;

/// Per-entry outcome of a conversion run, in source order.
#[derive(Debug, Clone, Default)]
pub struct ConversionReport {
    pub resolutions: Vec<EntryResolution>,
}

impl ConversionReport {
    pub fn len(&self) -> usize {
        self.resolutions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolutions.is_empty()
    }

    pub fn matched(&self) -> Vec<&MatchResult> {
        self.resolutions
            .iter()
            .filter_map(EntryResolution::matched)
            .collect()
    }

    pub fn skipped(&self) -> Vec<&Entry> {
        self.resolutions
            .iter()
            .filter(|resolution| !resolution.is_matched())
            .map(|resolution| &resolution.entry)
            .collect()
    }

    /// Catalog identifiers of every matched entry, ready for upload.
    pub fn identifiers(&self) -> Vec<String> {
        self.matched()
            .into_iter()
            .map(|result| result.identifier().to_string())
            .collect()
    }

    /// Matches whose title and artists agree with the request verbatim.
    pub fn exact_count(&self) -> usize {
        self.matched()
            .into_iter()
            .filter(|result| result.is_exact())
            .count()
    }

    /// Review lines for matches whose resolved title differs from the request.
    pub fn assumed_matches(&self) -> Vec<AssumedMatch> {
        self.matched()
            .into_iter()
            .filter(|result| result.titles_differ())
            .map(AssumedMatch::from)
            .collect()
    }
}

/// A match accepted on similarity alone, listed for manual review.
#[derive(Debug, Clone, PartialEq)]
pub struct AssumedMatch {
    pub requested_song: String,
    pub requested_artist: Vec<String>,
    pub resolved_song: String,
    pub resolved_artist: Vec<String>,
    pub identifier: String,
    pub similarity: f32,
    pub artists_agree: bool,
}

impl From<&MatchResult> for AssumedMatch {
    fn from(result: &MatchResult) -> Self {
        let artists_agree = result
            .entry
            .artist
            .iter()
            .all(|requested| result.candidate.artist.contains(requested));

        Self {
            requested_song: result.entry.song.clone(),
            requested_artist: result.entry.artist.clone(),
            resolved_song: result.candidate.song.clone(),
            resolved_artist: result.candidate.artist.clone(),
            identifier: result.identifier().to_string(),
            similarity: result.similarity(),
            artists_agree,
        }
    }
}

impl fmt::Display for AssumedMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "\"{}\" by {} -> \"{}\" by {} [{}, similarity {:.2}]",
            self.requested_song,
            self.requested_artist.join(", "),
            self.resolved_song,
            self.resolved_artist.join(", "),
            self.identifier,
            self.similarity
        )?;
        if !self.artists_agree {
            f.write_str(" (artists differ)")?;
        }
        Ok(())
    }
}

/// Resolves whole playlists with a shared matcher.
pub struct PlaylistConverter<S, P = NullEventPublisher> {
    matcher: TrackMatcher<S, P>,
    max_concurrent: usize,
}

impl<S: TrackSearch, P: EventPublisher> PlaylistConverter<S, P> {
    pub fn new(matcher: TrackMatcher<S, P>) -> Self {
        Self {
            matcher,
            max_concurrent: DEFAULT_MAX_CONCURRENT_ENTRIES,
        }
    }

    /// Limit how many entries are resolved at once. Zero is treated as one.
    pub fn with_concurrency(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub fn matcher(&self) -> &TrackMatcher<S, P> {
        &self.matcher
    }

    pub async fn convert(&self, entries: &[Entry]) -> MatchingResult<ConversionReport> {
        info!(
            target: "conversion",
            entries = entries.len(),
            max_concurrent = self.max_concurrent,
            "starting conversion"
        );

        let resolutions = self.resolve_all(entries.iter()).await?;
        let report = ConversionReport { resolutions };

        info!(
            target: "conversion",
            matched = report.matched().len(),
            exact = report.exact_count(),
            skipped = report.skipped().len(),
            assumed = report.assumed_matches().len(),
            "conversion complete"
        );
        Ok(report)
    }

    /// Re-run matching for skipped entries only, updating `report` in place.
    ///
    /// Returns how many previously skipped entries are now matched.
    pub async fn retry_unmatched(&self, report: &mut ConversionReport) -> MatchingResult<usize> {
        let pending: Vec<usize> = report
            .resolutions
            .iter()
            .enumerate()
            .filter(|(_, resolution)| !resolution.is_matched())
            .map(|(index, _)| index)
            .collect();

        if pending.is_empty() {
            debug!(target: "conversion", "nothing to retry");
            return Ok(0);
        }

        let entries: Vec<Entry> = pending
            .iter()
            .map(|&index| report.resolutions[index].entry.clone())
            .collect();
        let retried = self.resolve_all(entries.iter()).await?;

        let mut recovered = 0;
        for (index, resolution) in pending.into_iter().zip(retried) {
            if resolution.is_matched() {
                recovered += 1;
            }
            report.resolutions[index] = resolution;
        }

        info!(target: "conversion", retried = entries.len(), recovered, "retry complete");
        Ok(recovered)
    }

    async fn resolve_all<'a>(
        &self,
        entries: impl Iterator<Item = &'a Entry>,
    ) -> MatchingResult<Vec<EntryResolution>> {
        stream::iter(entries.map(|entry| self.matcher.resolve(entry)))
            .buffered(self.max_concurrent)
            .try_collect()
            .await
    }
}
