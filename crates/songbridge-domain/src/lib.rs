// SPDX-License-Identifier: GPL-3.0-or-later
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Entries & Candidates
// ============================================================================

/// A song reference taken from the source playlist.
///
/// `artist` is ordered by relevance; the first name is the primary artist.
/// Entries are only ever read by the matcher, never modified in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub song: String,
    pub artist: Vec<String>,
    #[serde(default)]
    pub album: String,
}

impl Entry {
    pub fn new<I, S>(song: impl Into<String>, artist: I, album: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            song: song.into(),
            artist: artist.into_iter().map(Into::into).collect(),
            album: album.into(),
        }
    }

    pub fn primary_artist(&self) -> Option<&str> {
        self.artist.first().map(String::as_str)
    }
}

/// A relaxed copy of an [`Entry`] used only to build a search query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryVariant {
    pub song: String,
    pub artist: Vec<String>,
    pub album: String,
}

impl QueryVariant {
    /// Artist names as a single query fragment.
    pub fn artist_query(&self) -> String {
        self.artist.join(" ")
    }
}

impl From<&Entry> for QueryVariant {
    fn from(entry: &Entry) -> Self {
        Self {
            song: entry.song.clone(),
            artist: entry.artist.clone(),
            album: entry.album.clone(),
        }
    }
}

/// A catalog search result reshaped into entry form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub song: String,
    pub artist: Vec<String>,
    pub album: String,
    /// Opaque catalog reference, e.g. `spotify:track:...`.
    pub identifier: String,
    /// Set once the candidate has been scored against a source entry.
    #[serde(default)]
    pub similarity: Option<f32>,
}

impl Candidate {
    pub fn new<I, S>(
        song: impl Into<String>,
        artist: I,
        album: impl Into<String>,
        identifier: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            song: song.into(),
            artist: artist.into_iter().map(Into::into).collect(),
            album: album.into(),
            identifier: identifier.into(),
            similarity: None,
        }
    }

    pub fn with_similarity(mut self, similarity: f32) -> Self {
        self.similarity = Some(similarity);
        self
    }

    /// Score, or `0.0` when the candidate has not been scored.
    pub fn score(&self) -> f32 {
        self.similarity.unwrap_or(0.0)
    }
}

/// The chosen candidate for one source entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub entry: Entry,
    pub candidate: Candidate,
}

impl MatchResult {
    pub fn new(entry: Entry, candidate: Candidate) -> Self {
        Self { entry, candidate }
    }

    pub fn identifier(&self) -> &str {
        &self.candidate.identifier
    }

    pub fn similarity(&self) -> f32 {
        self.candidate.score()
    }

    /// True when the resolved title differs from the requested one, ignoring case.
    pub fn titles_differ(&self) -> bool {
        self.entry.song.to_lowercase() != self.candidate.song.to_lowercase()
    }

    /// Same title and every requested artist credited on the candidate.
    pub fn is_exact(&self) -> bool {
        self.entry.song == self.candidate.song
            && self
                .entry
                .artist
                .iter()
                .all(|requested| self.candidate.artist.contains(requested))
    }
}

// ============================================================================
// Domain Validation
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub trait Validate {
    fn validate(&self) -> Result<(), Vec<ValidationError>>;
}

impl Validate for Entry {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        if self.song.trim().is_empty() {
            errors.push(ValidationError {
                field: "song",
                message: "song cannot be empty".into(),
            });
        }
        if self.artist.iter().all(|name| name.trim().is_empty()) {
            errors.push(ValidationError {
                field: "artist",
                message: "at least one artist is required for scoring".into(),
            });
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

// ============================================================================
// Domain Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent<TPayload> {
    pub name: &'static str,
    pub occurred_at: DateTime<Utc>,
    pub payload: TPayload,
}

impl<TPayload> DomainEvent<TPayload> {
    pub fn new(name: &'static str, payload: TPayload) -> Self {
        Self {
            name,
            occurred_at: Utc::now(),
            payload,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptCompletedPayload {
    pub attempt: usize,
    pub step: String,
    pub variant: QueryVariant,
    pub candidate_count: usize,
    pub best_score: Option<f32>,
}

pub type AttemptCompleted = DomainEvent<AttemptCompletedPayload>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptFailedPayload {
    pub attempt: usize,
    pub step: String,
    pub variant: QueryVariant,
    pub error: String,
}

pub type AttemptFailed = DomainEvent<AttemptFailedPayload>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryMatchedPayload {
    pub song: String,
    pub artist: Vec<String>,
    pub identifier: String,
    pub similarity: f32,
    pub attempt: usize,
}

pub type EntryMatched = DomainEvent<EntryMatchedPayload>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntrySkippedPayload {
    pub song: String,
    pub artist: Vec<String>,
    pub reason: String,
}

pub type EntrySkipped = DomainEvent<EntrySkippedPayload>;
