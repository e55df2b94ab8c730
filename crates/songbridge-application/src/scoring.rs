// SPDX-License-Identifier: GPL-3.0-or-later

//! Bag-of-words similarity between entries and candidates.
//!
//! Both sides are reduced to the set of distinct lower-cased whitespace
//! tokens drawn from song, album and every artist name. The score is the
//! binary cosine `|common| / sqrt(|left| * |right|)`, so repeated tokens
//! carry no extra weight.

use songbridge_domain::{Candidate, Entry};
use std::collections::HashSet;

/// Records that can be scored: source entries and catalog candidates.
pub trait TokenFields {
    fn token_fields(&self) -> Vec<&str>;
}

impl TokenFields for Entry {
    fn token_fields(&self) -> Vec<&str> {
        fields(&self.song, &self.album, &self.artist)
    }
}

impl TokenFields for Candidate {
    fn token_fields(&self) -> Vec<&str> {
        fields(&self.song, &self.album, &self.artist)
    }
}

fn fields<'a>(song: &'a str, album: &'a str, artist: &'a [String]) -> Vec<&'a str> {
    let mut fields = Vec::with_capacity(artist.len() + 2);
    fields.push(song);
    fields.push(album);
    fields.extend(artist.iter().map(String::as_str));
    fields
}

/// Distinct lower-cased tokens of every field.
pub fn tokens<T: TokenFields + ?Sized>(item: &T) -> HashSet<String> {
    item.token_fields()
        .into_iter()
        .flat_map(|field| {
            field
                .to_lowercase()
                .split_whitespace()
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Binary cosine similarity in `[0, 1]`; `0` when either side has no tokens.
pub fn score<A, B>(left: &A, right: &B) -> f32
where
    A: TokenFields + ?Sized,
    B: TokenFields + ?Sized,
{
    let left = tokens(left);
    let right = tokens(right);
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }

    let common = left.intersection(&right).count() as f64;
    let norm = ((left.len() * right.len()) as f64).sqrt();
    (common / norm).clamp(0.0, 1.0) as f32
}

/// Score every candidate against `entry`, keeping response order.
pub fn score_candidates(entry: &Entry, candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates
        .into_iter()
        .map(|candidate| {
            let similarity = score(entry, &candidate);
            candidate.with_similarity(similarity)
        })
        .collect()
}

/// Highest-scoring candidate; ties keep the one seen first.
pub fn best_of(entry: &Entry, candidates: Vec<Candidate>) -> Option<Candidate> {
    score_candidates(entry, candidates)
        .into_iter()
        .fold(None, |best: Option<Candidate>, candidate| match best {
            Some(current) if current.score() >= candidate.score() => Some(current),
            _ => Some(candidate),
        })
}
