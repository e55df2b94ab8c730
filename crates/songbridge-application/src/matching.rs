// SPDX-License-Identifier: GPL-3.0-or-later

//! Track matching engine driven by query relaxation.
//!
//! For one source entry the matcher walks every step of
//! [`Relaxation::SEQUENCE`], searching the catalog with each variant and
//! scoring the results against the *original* entry. Every step runs even
//! after a hit: a looser query can surface a better candidate when the
//! stricter query's artist formatting disagrees with the catalog. The
//! candidate with the highest similarity across all steps wins.

use crate::adapter::adapt;
use crate::events::{EventPublisher, NullEventPublisher};
use crate::normalize::{relaxations, Relaxation};
use crate::scoring::best_of;
use crate::search::TrackSearch;
use songbridge_catalog::{CatalogError, SearchKind, TrackQuery};
use songbridge_domain::{
    AttemptCompletedPayload, AttemptFailedPayload, Candidate, DomainEvent, Entry,
    EntryMatchedPayload, EntrySkippedPayload, MatchResult, QueryVariant, Validate,
};
use thiserror::Error;
use tracing::{debug, error, warn};

pub const ATTEMPT_COMPLETED: &str = "match.attempt.completed";
pub const ATTEMPT_FAILED: &str = "match.attempt.failed";
pub const ENTRY_MATCHED: &str = "match.entry.matched";
pub const ENTRY_SKIPPED: &str = "match.entry.skipped";

/// Errors that abort matching. Anything else only abandons one attempt.
#[derive(Debug, Error)]
pub enum MatchingError {
    #[error("Catalog rejected credentials: {0}")]
    Unauthorized(#[source] CatalogError),
}

/// Result type for matching operations
pub type MatchingResult<T> = Result<T, MatchingError>;

/// What one relaxation step produced.
#[derive(Debug, Clone)]
pub struct AttemptSummary {
    pub attempt: usize,
    pub step: Relaxation,
    pub variant: QueryVariant,
    pub candidate_count: usize,
    /// This attempt's top candidate, only kept when its score is positive.
    pub best: Option<Candidate>,
    /// Set when the search failed and the attempt was abandoned.
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub enum MatchOutcome {
    Matched(MatchResult),
    Unmatched,
}

/// Final state for one entry plus the trail of attempts that led to it.
#[derive(Debug, Clone)]
pub struct EntryResolution {
    pub entry: Entry,
    pub outcome: MatchOutcome,
    pub attempts: Vec<AttemptSummary>,
}

impl EntryResolution {
    pub fn matched(&self) -> Option<&MatchResult> {
        match &self.outcome {
            MatchOutcome::Matched(result) => Some(result),
            MatchOutcome::Unmatched => None,
        }
    }

    pub fn is_matched(&self) -> bool {
        self.matched().is_some()
    }

    pub fn failed_attempts(&self) -> usize {
        self.attempts.iter().filter(|a| a.error.is_some()).count()
    }
}

/// Relaxation-based matcher over any [`TrackSearch`] backend.
pub struct TrackMatcher<S, P = NullEventPublisher> {
    search: S,
    publisher: P,
    kind: SearchKind,
}

impl<S: TrackSearch> TrackMatcher<S> {
    pub fn new(search: S) -> Self {
        Self::with_publisher(search, NullEventPublisher)
    }
}

impl<S: TrackSearch, P: EventPublisher> TrackMatcher<S, P> {
    pub fn with_publisher(search: S, publisher: P) -> Self {
        Self {
            search,
            publisher,
            kind: SearchKind::Track,
        }
    }

    pub fn search_kind(mut self, kind: SearchKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Resolve one entry.
    ///
    /// # Returns
    ///
    /// * `Ok(EntryResolution)` - matched or unmatched, with every attempt recorded
    /// * `Err(MatchingError::Unauthorized)` - the catalog rejected the token;
    ///   remaining attempts are not run
    pub async fn resolve(&self, entry: &Entry) -> MatchingResult<EntryResolution> {
        if let Err(errors) = entry.validate() {
            let reason = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            warn!(target: "matching", song = %entry.song, %reason, "entry cannot be scored, skipping");
            self.publish_skipped(entry, reason);
            return Ok(EntryResolution {
                entry: entry.clone(),
                outcome: MatchOutcome::Unmatched,
                attempts: Vec::new(),
            });
        }

        let mut attempts = Vec::with_capacity(Relaxation::SEQUENCE.len());
        for (attempt, (step, variant)) in relaxations(entry).into_iter().enumerate() {
            attempts.push(self.run_attempt(entry, attempt, step, variant).await?);
        }

        let outcome = match select_best(&attempts) {
            Some((attempt, candidate)) => {
                debug!(
                    target: "matching",
                    song = %entry.song,
                    identifier = %candidate.identifier,
                    similarity = candidate.score(),
                    attempt,
                    "entry matched"
                );
                self.publisher.publish(&DomainEvent::new(
                    ENTRY_MATCHED,
                    EntryMatchedPayload {
                        song: entry.song.clone(),
                        artist: entry.artist.clone(),
                        identifier: candidate.identifier.clone(),
                        similarity: candidate.score(),
                        attempt,
                    },
                ));
                MatchOutcome::Matched(MatchResult::new(entry.clone(), candidate))
            }
            None => {
                warn!(
                    target: "matching",
                    song = %entry.song,
                    artist = ?entry.artist,
                    "no attempt produced a candidate, skipping"
                );
                self.publish_skipped(entry, "no candidate with positive similarity".to_string());
                MatchOutcome::Unmatched
            }
        };

        Ok(EntryResolution {
            entry: entry.clone(),
            outcome,
            attempts,
        })
    }

    async fn run_attempt(
        &self,
        entry: &Entry,
        attempt: usize,
        step: Relaxation,
        variant: QueryVariant,
    ) -> MatchingResult<AttemptSummary> {
        let query = TrackQuery::new(variant.song.clone())
            .artist(variant.artist_query())
            .album(variant.album.clone())
            .kind(self.kind);

        match self.search.search(&query).await {
            Ok(response) => {
                let candidates = adapt(&response);
                let candidate_count = candidates.len();
                let best = best_of(entry, candidates).filter(|c| c.score() > 0.0);
                let best_score = best.as_ref().map(Candidate::score);

                debug!(
                    target: "matching",
                    attempt,
                    step = %step,
                    query = %query.render(),
                    candidate_count,
                    best_score = ?best_score,
                    "attempt complete"
                );
                self.publisher.publish(&DomainEvent::new(
                    ATTEMPT_COMPLETED,
                    AttemptCompletedPayload {
                        attempt,
                        step: step.to_string(),
                        variant: variant.clone(),
                        candidate_count,
                        best_score,
                    },
                ));

                Ok(AttemptSummary {
                    attempt,
                    step,
                    variant,
                    candidate_count,
                    best,
                    error: None,
                })
            }
            Err(err) if err.is_auth() => {
                error!(target: "matching", attempt, step = %step, error = %err, "catalog rejected credentials");
                Err(MatchingError::Unauthorized(err))
            }
            Err(err) => {
                warn!(
                    target: "matching",
                    attempt,
                    step = %step,
                    query = %query.render(),
                    error = %err,
                    "search failed, abandoning attempt"
                );
                self.publisher.publish(&DomainEvent::new(
                    ATTEMPT_FAILED,
                    AttemptFailedPayload {
                        attempt,
                        step: step.to_string(),
                        variant: variant.clone(),
                        error: err.to_string(),
                    },
                ));

                Ok(AttemptSummary {
                    attempt,
                    step,
                    variant,
                    candidate_count: 0,
                    best: None,
                    error: Some(err.to_string()),
                })
            }
        }
    }

    fn publish_skipped(&self, entry: &Entry, reason: String) {
        self.publisher.publish(&DomainEvent::new(
            ENTRY_SKIPPED,
            EntrySkippedPayload {
                song: entry.song.clone(),
                artist: entry.artist.clone(),
                reason,
            },
        ));
    }
}

/// Highest-scoring attempt winner; ties keep the earliest attempt.
fn select_best(attempts: &[AttemptSummary]) -> Option<(usize, Candidate)> {
    attempts
        .iter()
        .filter_map(|summary| summary.best.as_ref().map(|c| (summary.attempt, c)))
        .fold(None, |best: Option<(usize, &Candidate)>, (attempt, candidate)| match best {
            Some((_, current)) if current.score() >= candidate.score() => best,
            _ => Some((attempt, candidate)),
        })
        .map(|(attempt, candidate)| (attempt, candidate.clone()))
}
