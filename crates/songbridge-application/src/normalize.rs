// SPDX-License-Identifier: GPL-3.0-or-later

//! Query relaxation steps.
//!
//! Each step is a pure function from one [`QueryVariant`] to a new, looser
//! one. [`Relaxation::SEQUENCE`] is the fixed escalation the matcher walks,
//! each step seeded with the previous step's output.

use lazy_static::lazy_static;
use regex::Regex;
use songbridge_domain::{Entry, QueryVariant};

lazy_static! {
    static ref AMPERSAND: Regex = Regex::new(r"\s*&\s*").expect("ampersand regex is valid");
}

/// Segment prefixes that mark a featured artist, matched case-sensitively.
const FEATURE_PREFIXES: [&str; 2] = ["feat.", "with "];

/// One named relaxation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relaxation {
    /// Move a `(feat. X)` / `(with X)` segment into the artist list and drop the album.
    ExtractFeaturedArtist,
    StripAnnotations,
    LoosenSeparators,
    StripSymbols,
}

impl Relaxation {
    pub const SEQUENCE: [Relaxation; 4] = [
        Relaxation::ExtractFeaturedArtist,
        Relaxation::StripAnnotations,
        Relaxation::LoosenSeparators,
        Relaxation::StripSymbols,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExtractFeaturedArtist => "extract-featured-artist",
            Self::StripAnnotations => "strip-annotations",
            Self::LoosenSeparators => "loosen-separators",
            Self::StripSymbols => "strip-symbols",
        }
    }

    pub fn apply(&self, variant: &QueryVariant) -> QueryVariant {
        match self {
            Self::ExtractFeaturedArtist => drop_album(&extract_embedded_artist(variant)),
            Self::StripAnnotations => strip_annotations(variant),
            Self::LoosenSeparators => loosen_artist_separators(variant),
            Self::StripSymbols => strip_symbols(variant),
        }
    }
}

impl std::fmt::Display for Relaxation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every variant of [`Relaxation::SEQUENCE`] for an entry, in order.
pub fn relaxations(entry: &Entry) -> Vec<(Relaxation, QueryVariant)> {
    let mut variant = QueryVariant::from(entry);
    Relaxation::SEQUENCE
        .iter()
        .map(|step| {
            variant = step.apply(&variant);
            (*step, variant.clone())
        })
        .collect()
}

/// Move the first featuring segment of the title into the artist list.
///
/// Later featuring segments stay in the title until the next call.
pub fn extract_embedded_artist(variant: &QueryVariant) -> QueryVariant {
    let featured = bracket_spans(&variant.song, '(', ')')
        .into_iter()
        .find_map(|(start, end)| {
            let inner = variant.song[start + 1..end - 1].trim_start();
            FEATURE_PREFIXES
                .iter()
                .find(|prefix| inner.starts_with(*prefix))
                .map(|prefix| (start, end, inner[prefix.len()..].trim().to_string()))
        });

    let Some((start, end, artist)) = featured else {
        return variant.clone();
    };

    let mut song = String::with_capacity(variant.song.len());
    song.push_str(&variant.song[..start]);
    song.push_str(&variant.song[end..]);

    let mut artists = variant.artist.clone();
    if !artist.is_empty() {
        artists.push(artist);
    }

    QueryVariant {
        song: collapse_whitespace(&song),
        artist: artists,
        album: variant.album.clone(),
    }
}

/// Remove every top-level `(...)` and `[...]` segment, field by field.
pub fn strip_annotations(variant: &QueryVariant) -> QueryVariant {
    QueryVariant {
        song: strip_brackets(&variant.song),
        artist: clean_artists(variant.artist.iter().map(|name| strip_brackets(name))),
        album: strip_brackets(&variant.album),
    }
}

/// Rewrite `A & B` as `A, B` in each artist name.
pub fn loosen_artist_separators(variant: &QueryVariant) -> QueryVariant {
    QueryVariant {
        song: variant.song.clone(),
        artist: clean_artists(
            variant
                .artist
                .iter()
                .map(|name| collapse_whitespace(&AMPERSAND.replace_all(name, ", "))),
        ),
        album: variant.album.clone(),
    }
}

/// Keep only alphanumerics and spaces in artist names.
pub fn strip_symbols(variant: &QueryVariant) -> QueryVariant {
    QueryVariant {
        song: variant.song.clone(),
        artist: clean_artists(variant.artist.iter().map(|name| {
            let kept: String = name
                .chars()
                .filter(|c| c.is_alphanumeric() || *c == ' ')
                .collect();
            collapse_whitespace(&kept)
        })),
        album: variant.album.clone(),
    }
}

pub fn drop_album(variant: &QueryVariant) -> QueryVariant {
    QueryVariant {
        album: String::new(),
        ..variant.clone()
    }
}

fn strip_brackets(text: &str) -> String {
    let without_parens = remove_spans(text, &bracket_spans(text, '(', ')'));
    let without_brackets = remove_spans(&without_parens, &bracket_spans(&without_parens, '[', ']'));
    collapse_whitespace(&without_brackets)
}

/// Byte ranges of balanced top-level `open ... close` segments.
fn bracket_spans(text: &str, open: char, close: char) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;

    for (index, ch) in text.char_indices() {
        if ch == open {
            if depth == 0 {
                start = index;
            }
            depth += 1;
        } else if ch == close && depth > 0 {
            depth -= 1;
            if depth == 0 {
                spans.push((start, index + ch.len_utf8()));
            }
        }
    }

    spans
}

fn remove_spans(text: &str, spans: &[(usize, usize)]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for &(start, end) in spans {
        out.push_str(&text[cursor..start]);
        out.push(' ');
        cursor = end;
    }
    out.push_str(&text[cursor..]);
    out
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn clean_artists(names: impl Iterator<Item = String>) -> Vec<String> {
    names.filter(|name| !name.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(song: &str, artist: &[&str], album: &str) -> QueryVariant {
        QueryVariant {
            song: song.to_string(),
            artist: artist.iter().map(|a| a.to_string()).collect(),
            album: album.to_string(),
        }
    }

    #[test]
    fn extract_moves_featured_artist_out_of_title() {
        let relaxed = extract_embedded_artist(&variant("Run Away (feat. Jay)", &["Main"], "X"));
        assert_eq!(relaxed.song, "Run Away");
        assert_eq!(relaxed.artist, vec!["Main", "Jay"]);
        assert_eq!(relaxed.album, "X");
    }

    #[test]
    fn extract_handles_with_prefix_and_trailing_text() {
        let relaxed =
            extract_embedded_artist(&variant("Stay (with Justin Bieber) - Edit", &["Kid"], ""));
        assert_eq!(relaxed.song, "Stay - Edit");
        assert_eq!(relaxed.artist, vec!["Kid", "Justin Bieber"]);
    }

    #[test]
    fn extract_only_considers_first_matching_segment() {
        let relaxed = extract_embedded_artist(&variant(
            "Song (Remix) (feat. A) (feat. B)",
            &["Main"],
            "",
        ));
        assert_eq!(relaxed.song, "Song (Remix) (feat. B)");
        assert_eq!(relaxed.artist, vec!["Main", "A"]);
    }

    #[test]
    fn extract_is_case_sensitive_and_requires_prefix() {
        let original = variant("Song (Feat. A)", &["Main"], "");
        assert_eq!(extract_embedded_artist(&original), original);

        let original = variant("Song (Live with strings)", &["Main"], "");
        assert_eq!(extract_embedded_artist(&original), original);

        let original = variant("Within (Reprise)", &["Main"], "");
        assert_eq!(extract_embedded_artist(&original), original);
    }

    #[test]
    fn extract_is_idempotent_with_at_most_one_featuring_segment() {
        let inputs = [
            variant("Run Away (feat. Jay)", &["Main"], "X"),
            variant("Plain Song", &["Main"], ""),
            variant("Song (with A & B) [Live]", &["Main"], ""),
        ];
        for input in inputs {
            let once = extract_embedded_artist(&input);
            let twice = extract_embedded_artist(&once);
            assert_eq!(once, twice);
        }
    }

    // One segment per application: a second featuring segment only moves on
    // the next pass, so the step is idempotent only for titles with at most one.
    #[test]
    fn extract_moves_one_featuring_segment_per_pass() {
        let once = extract_embedded_artist(&variant("Song (feat. A) (feat. B)", &["Main"], ""));
        assert_eq!(once, variant("Song (feat. B)", &["Main", "A"], ""));

        let twice = extract_embedded_artist(&once);
        assert_ne!(once, twice);
        assert_eq!(twice, variant("Song", &["Main", "A", "B"], ""));

        assert_eq!(extract_embedded_artist(&twice), twice);
    }

    #[test]
    fn strip_annotations_removes_parens_and_brackets() {
        let relaxed = strip_annotations(&variant("Song (Remix) [Live]", &["A (US)", "B"], ""));
        assert_eq!(relaxed.song, "Song");
        assert_eq!(relaxed.artist, vec!["A", "B"]);
    }

    #[test]
    fn strip_annotations_handles_nesting_and_inner_text() {
        let relaxed = strip_annotations(&variant("Intro (Part (1)) Outro [x]", &["A"], ""));
        assert_eq!(relaxed.song, "Intro Outro");
    }

    #[test]
    fn strip_annotations_keeps_fields_independent() {
        let relaxed = strip_annotations(&variant("Song (Live)", &["A"], "Album [Deluxe]"));
        assert_eq!(relaxed.song, "Song");
        assert_eq!(relaxed.album, "Album");
    }

    #[test]
    fn strip_annotations_leaves_unbalanced_text() {
        let relaxed = strip_annotations(&variant("Song (unfinished", &["A"], ""));
        assert_eq!(relaxed.song, "Song (unfinished");
    }

    #[test]
    fn strip_annotations_drops_artists_that_become_empty() {
        let relaxed = strip_annotations(&variant("Song", &["[Unknown]", "B"], ""));
        assert_eq!(relaxed.artist, vec!["B"]);
    }

    #[test]
    fn loosen_replaces_ampersand_with_comma() {
        let relaxed = loosen_artist_separators(&variant("Song", &["Simon & Garfunkel"], ""));
        assert_eq!(relaxed.artist, vec!["Simon, Garfunkel"]);

        let unchanged = loosen_artist_separators(&relaxed);
        assert_eq!(unchanged, relaxed);
    }

    #[test]
    fn strip_symbols_keeps_alphanumerics_and_spaces() {
        let relaxed = strip_symbols(&variant("Song!", &["AC/DC", "Beyoncé", "Simon, Garfunkel"], ""));
        assert_eq!(relaxed.song, "Song!");
        assert_eq!(relaxed.artist, vec!["ACDC", "Beyoncé", "Simon Garfunkel"]);
    }

    #[test]
    fn drop_album_clears_only_album() {
        let relaxed = drop_album(&variant("Song", &["A"], "Album"));
        assert_eq!(relaxed, variant("Song", &["A"], ""));
    }

    #[test]
    fn relaxations_escalate_in_order() {
        let entry = Entry::new("Run Away (feat. Jay & Kay) [Live]", ["Main (UK)"], "X");
        let steps = relaxations(&entry);
        let names: Vec<_> = steps.iter().map(|(step, _)| *step).collect();
        assert_eq!(names, Relaxation::SEQUENCE.to_vec());

        assert_eq!(steps[0].1.song, "Run Away [Live]");
        assert_eq!(steps[0].1.artist, vec!["Main (UK)", "Jay & Kay"]);
        assert_eq!(steps[0].1.album, "");

        assert_eq!(steps[1].1.song, "Run Away");
        assert_eq!(steps[1].1.artist, vec!["Main", "Jay & Kay"]);

        assert_eq!(steps[2].1.artist, vec!["Main", "Jay, Kay"]);
        assert_eq!(steps[3].1.artist, vec!["Main", "Jay Kay"]);

        assert_eq!(entry.song, "Run Away (feat. Jay & Kay) [Live]");
    }
}
