//! Indication text normalization.

use once_cell::sync::Lazy;
use regex::Regex;

/// Leading section number or "INDICATIONS AND USAGE" heading.
static HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\d+(?:\.\d+)*\s+|(?i:indications\s*(?:and|&)\s*usage)\b[:.]?\s*)")
        .unwrap()
});

fn is_printable_ascii(c: char) -> bool {
    matches!(c, ' '..='~')
}

/// Canonicalize whitespace and drop characters outside printable ASCII.
///
/// Runs of two or more whitespace characters become a single `\n`; a lone
/// `\n` is kept and any other lone whitespace character becomes a space.
/// Leading and trailing whitespace is removed. Only ASCII whitespace counts
/// as whitespace: every other character outside printable ASCII, including
/// U+00A0 and the other Unicode spaces, is discarded before runs are
/// measured, so dropping never splits or creates a run. Idempotent.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut run = 0usize;
    let mut last_ws = ' ';

    for c in text.chars() {
        if c.is_ascii_whitespace() {
            run += 1;
            last_ws = c;
            continue;
        }
        if !is_printable_ascii(c) {
            continue;
        }
        if run > 0 && !out.is_empty() {
            out.push(if run > 1 || last_ws == '\n' { '\n' } else { ' ' });
        }
        run = 0;
        out.push(c);
    }
    out
}

/// Remove leading section numbers and "INDICATIONS AND USAGE" headings.
/// Expects normalized text; the result is normalized as well.
pub fn strip_heading(text: &str) -> &str {
    let mut rest = text;
    while let Some(m) = HEADING.find(rest) {
        if m.end() == 0 {
            break;
        }
        rest = &rest[m.end()..];
    }
    rest
}

/// Normalize extracted section text, optionally dropping its heading.
pub fn normalize_indication(text: &str, drop_heading: bool) -> String {
    let normalized = normalize(text);
    if drop_heading {
        normalize(strip_heading(&normalized))
    } else {
        normalized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_collapses_whitespace_runs() {
        assert_eq!(normalize("  Treats  flu. "), "Treats\nflu.");
        assert_eq!(normalize("a\n\n\nb"), "a\nb");
        assert_eq!(normalize("a\nb"), "a\nb");
        assert_eq!(normalize("a\tb"), "a b");
        assert_eq!(normalize("a\r\nb"), "a\nb");
    }

    #[test]
    fn test_drops_non_ascii() {
        assert_eq!(normalize("caf\u{e9} \u{2022} tea"), "caf\ntea");
        assert_eq!(normalize("x\u{0}y\u{7f}z"), "xyz");
        assert_eq!(normalize("\u{a0}lead"), "lead");
    }

    #[test]
    fn test_unicode_spaces_are_dropped() {
        assert_eq!(normalize("a\u{a0}b"), "ab");
        assert_eq!(normalize("a\u{2003}\u{2003}b"), "ab");
        assert_eq!(normalize("a \u{a0} b"), "a\nb");
    }

    #[test]
    fn test_dropping_never_creates_runs() {
        // The bullet sits between two single spaces: one run of two.
        assert_eq!(normalize("a \u{2022} b"), "a\nb");
        // A single space next to a dropped char stays a single space.
        assert_eq!(normalize("a\u{2022} b"), "a b");
    }

    #[test]
    fn test_empty_and_blank() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize(" \n\t "), "");
    }

    #[test]
    fn test_whitespace_variants_agree() {
        assert_eq!(normalize("Treats flu."), normalize(" Treats flu.\t"));
        assert_eq!(normalize("Treats  flu. "), normalize("Treats \n flu."));
    }

    #[test]
    fn test_idempotent_on_random_input() {
        let alphabet: Vec<char> = vec![
            'a', 'B', '7', '.', ',', ' ', ' ', '\n', '\t', '\r', '\u{a0}', '\u{2003}', '\u{e9}',
            '\u{2022}', '\u{0}', '\u{7f}', '\u{200b}',
        ];
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..2000 {
            let len = rng.gen_range(0..40);
            let input: String = (0..len)
                .map(|_| alphabet[rng.gen_range(0..alphabet.len())])
                .collect();
            let once = normalize(&input);
            assert_eq!(normalize(&once), once, "input {:?}", input);
            assert!(once.chars().all(|c| c == '\n' || is_printable_ascii(c)));
            assert_eq!(once.trim(), once);

            let indication = normalize_indication(&input, true);
            assert_eq!(normalize_indication(&indication, true), indication);
        }
    }

    #[test]
    fn test_strip_heading() {
        assert_eq!(
            normalize_indication("1 INDICATIONS AND USAGE\n  Treats flu.", true),
            "Treats flu."
        );
        assert_eq!(
            normalize_indication("1.1 Indications & Usage: Pain relief", true),
            "Pain relief"
        );
        assert_eq!(
            normalize_indication("INDICATIONS AND USAGE INDICATIONS AND USAGE x", true),
            "x"
        );
        assert_eq!(normalize_indication("Treats flu.", true), "Treats flu.");
        assert_eq!(
            normalize_indication("1 INDICATIONS AND USAGE Treats flu.", false),
            "1 INDICATIONS AND USAGE Treats flu."
        );
        assert_eq!(normalize_indication("INDICATIONS AND USAGE", true), "");
    }
}
