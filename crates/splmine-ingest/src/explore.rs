//! Section-code and term frequency exploration across a corpus.

use std::collections::{BTreeMap, HashMap};

use regex::{Regex, RegexBuilder};
use serde::Serialize;
use tracing::{info, warn};

use crate::parse::{DocumentParser, SectionText};
use splmine_core::{Error, RawDocument, Result};

/// One row of `code_occr.csv`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeRow {
    pub code: String,
    pub display_name: String,
    pub occurrences: usize,
    pub matches: usize,
}

/// One row of `code_occr_dist.csv`: a [`CodeRow`] plus its term distribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeDistRow {
    pub code: String,
    pub display_name: String,
    pub occurrences: usize,
    pub matches: usize,
    /// `term: count` pairs, most frequent first, joined by `; `.
    pub term_distribution: String,
}

/// One row of `term_occr.csv`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TermRow {
    pub term: String,
    pub occurrences: usize,
}

#[derive(Debug, Default)]
struct CodeStats {
    display_name: String,
    occurrences: usize,
    matches: usize,
    terms: HashMap<String, usize>,
}

/// Counts how often each section code appears and how often its text
/// mentions one of a list of terms.
pub struct SectionExplorer {
    parser: DocumentParser,
    /// `[^.]*\b(term|…)\b[^.]*\.`, case-insensitive.
    sentence: Option<Regex>,
    /// Lowercased term → term as given.
    canonical: HashMap<String, String>,
    codes: BTreeMap<String, CodeStats>,
    terms: HashMap<String, usize>,
    documents: usize,
    skipped: usize,
}

impl SectionExplorer {
    pub fn new<S: AsRef<str>>(terms: &[S]) -> Result<Self> {
        let terms: Vec<&str> = terms
            .iter()
            .map(|t| t.as_ref().trim())
            .filter(|t| !t.is_empty())
            .collect();

        let sentence = if terms.is_empty() {
            None
        } else {
            let alternation = terms
                .iter()
                .map(|t| regex::escape(t))
                .collect::<Vec<_>>()
                .join("|");
            let pattern = format!(r"[^.]*\b({})\b[^.]*\.", alternation);
            let regex = RegexBuilder::new(&pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| Error::Config(format!("invalid term list: {}", e)))?;
            Some(regex)
        };

        Ok(Self {
            parser: DocumentParser::all_sections(),
            sentence,
            canonical: terms
                .iter()
                .map(|t| (t.to_lowercase(), t.to_string()))
                .collect(),
            codes: BTreeMap::new(),
            terms: HashMap::new(),
            documents: 0,
            skipped: 0,
        })
    }

    /// Scan and observe every payload; malformed payloads are skipped.
    /// Identity fields are not required.
    pub fn explore<I>(&mut self, documents: I)
    where
        I: IntoIterator<Item = Result<RawDocument>>,
    {
        for item in documents {
            match item.and_then(|doc| self.parser.scan(&doc)) {
                Ok(scan) => self.observe(&scan.sections),
                Err(e) => {
                    warn!("Skipping: {}", e);
                    self.skipped += 1;
                }
            }
        }
        info!(
            "Explored {} documents ({} skipped), {} distinct section codes",
            self.documents,
            self.skipped,
            self.codes.len()
        );
    }

    /// Count the coded sections of one document.
    pub fn observe(&mut self, sections: &[SectionText]) {
        self.documents += 1;
        for section in sections {
            let stats = self.codes.entry(section.code.clone()).or_default();
            stats.occurrences += 1;
            if stats.display_name.is_empty() {
                if let Some(name) = &section.display_name {
                    stats.display_name = name.clone();
                }
            }

            let Some(sentence) = &self.sentence else {
                continue;
            };
            let mut matched = false;
            for caps in sentence.captures_iter(&section.text) {
                let Some(found) = caps.get(1) else { continue };
                let lowered = found.as_str().to_lowercase();
                let term = self.canonical.get(&lowered).cloned().unwrap_or(lowered);
                *stats.terms.entry(term.clone()).or_default() += 1;
                *self.terms.entry(term).or_default() += 1;
                matched = true;
            }
            if matched {
                stats.matches += 1;
            }
        }
    }

    pub fn documents(&self) -> usize {
        self.documents
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Codes by matching occurrences (descending), then by code.
    pub fn code_rows(&self) -> Vec<CodeRow> {
        let mut rows: Vec<CodeRow> = self
            .codes
            .iter()
            .map(|(code, stats)| CodeRow {
                code: code.clone(),
                display_name: stats.display_name.clone(),
                occurrences: stats.occurrences,
                matches: stats.matches,
            })
            .collect();
        rows.sort_by(|a, b| b.matches.cmp(&a.matches).then_with(|| a.code.cmp(&b.code)));
        rows
    }

    /// [`Self::code_rows`] with each code's term distribution attached.
    pub fn code_dist_rows(&self) -> Vec<CodeDistRow> {
        self.code_rows()
            .into_iter()
            .map(|row| {
                let term_distribution = self
                    .code_terms(&row.code)
                    .iter()
                    .map(|t| format!("{}: {}", t.term, t.occurrences))
                    .collect::<Vec<_>>()
                    .join("; ");
                CodeDistRow {
                    code: row.code,
                    display_name: row.display_name,
                    occurrences: row.occurrences,
                    matches: row.matches,
                    term_distribution,
                }
            })
            .collect()
    }

    /// Terms by occurrences (descending), then alphabetically.
    pub fn term_rows(&self) -> Vec<TermRow> {
        let mut rows: Vec<TermRow> = self
            .terms
            .iter()
            .map(|(term, &occurrences)| TermRow {
                term: term.clone(),
                occurrences,
            })
            .collect();
        rows.sort_by(|a, b| b.occurrences.cmp(&a.occurrences).then_with(|| a.term.cmp(&b.term)));
        rows
    }

    /// Term distribution within one section code.
    pub fn code_terms(&self, code: &str) -> Vec<TermRow> {
        let mut rows: Vec<TermRow> = self
            .codes
            .get(code)
            .map(|stats| {
                stats
                    .terms
                    .iter()
                    .map(|(term, &occurrences)| TermRow {
                        term: term.clone(),
                        occurrences,
                    })
                    .collect()
            })
            .unwrap_or_default();
        rows.sort_by(|a, b| b.occurrences.cmp(&a.occurrences).then_with(|| a.term.cmp(&b.term)));
        rows
    }
}

/// Read a term list: one term per line, blank lines and `#` comments ignored.
pub fn parse_terms(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}
