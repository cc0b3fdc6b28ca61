//! Suffix-stripping stemmer for TF-IDF tokens.
//!
//! Conflates plural and inflected forms ("adults" / "adult",
//! "treated" / "treating" / "treatment") before weighting.

use std::borrow::Cow;

/// Shortest stem a rule may leave behind.
const MIN_STEM: usize = 3;

/// Endings that look inflected but usually are not ("illness", "virus",
/// "arthritis").
const PROTECTED: &[&str] = &["ss", "us", "is"];

/// (suffix, replacement, undouble). Longer suffixes first; first match wins.
/// `undouble` collapses a doubled final consonant left behind ("running").
const RULES: &[(&str, &str, bool)] = &[
    ("sses", "ss", false),
    ("ies", "y", false),
    ("ied", "y", false),
    ("ment", "", false),
    ("ness", "", false),
    ("ing", "", true),
    ("ed", "", true),
    ("ly", "", false),
    ("s", "", false),
];

/// Stem a lowercase token. Non-ASCII and short tokens pass through.
pub fn stem(word: &str) -> Cow<'_, str> {
    if word.len() <= MIN_STEM || !word.is_ascii() {
        return Cow::Borrowed(word);
    }
    if PROTECTED.iter().any(|p| word.ends_with(p)) {
        return Cow::Borrowed(word);
    }

    let mut stemmed = strip_suffix(word);
    if stemmed.len() > MIN_STEM && stemmed.ends_with('e') && !stemmed.ends_with("ee") {
        stemmed.pop();
    }
    if stemmed == word {
        Cow::Borrowed(word)
    } else {
        Cow::Owned(stemmed)
    }
}

fn strip_suffix(word: &str) -> String {
    for &(suffix, replacement, undouble) in RULES {
        let Some(base) = word.strip_suffix(suffix) else {
            continue;
        };
        if base.len() < MIN_STEM {
            continue;
        }
        let mut stemmed = format!("{}{}", base, replacement);
        if undouble && ends_with_double_consonant(&stemmed) {
            stemmed.pop();
        }
        return stemmed;
    }
    word.to_string()
}

fn ends_with_double_consonant(s: &str) -> bool {
    let bytes = s.as_bytes();
    match bytes {
        [.., a, b] if a == b => !matches!(*a, b'a' | b'e' | b'i' | b'o' | b'u' | b'l' | b's' | b'z'),
        _ => false,
    }
}
