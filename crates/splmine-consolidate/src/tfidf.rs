//! Sparse TF-IDF vectors.
//!
//! Tokens are runs of two or more word characters, lowercased and
//! optionally stemmed. Weights are raw counts times the smoothed idf
//! `ln((1 + n) / (1 + df)) + 1`, and every vector is L2-normalized, so the
//! dot product of two vectors is their cosine similarity.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::stemmer::stem;

static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w\w+").unwrap());

/// Split text into lowercased (and optionally stemmed) tokens.
pub fn tokenize(text: &str, stem_tokens: bool) -> Vec<String> {
    let lowered = text.to_lowercase();
    TOKEN
        .find_iter(&lowered)
        .map(|m| {
            if stem_tokens {
                stem(m.as_str()).into_owned()
            } else {
                m.as_str().to_string()
            }
        })
        .collect()
}

/// L2-normalized sparse vector: (term id, weight) sorted by term id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    entries: Vec<(u32, f64)>,
}

impl SparseVector {
    pub fn entries(&self) -> &[(u32, f64)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cosine similarity with another normalized vector, clamped to [0, 1].
    pub fn cosine(&self, other: &SparseVector) -> f64 {
        let (mut i, mut j) = (0, 0);
        let mut dot = 0.0;
        while i < self.entries.len() && j < other.entries.len() {
            let (ta, wa) = self.entries[i];
            let (tb, wb) = other.entries[j];
            match ta.cmp(&tb) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    dot += wa * wb;
                    i += 1;
                    j += 1;
                }
            }
        }
        dot.clamp(0.0, 1.0)
    }
}

/// Vocabulary and document frequencies of a fitted corpus.
#[derive(Debug, Default)]
pub struct TfIdf {
    vocabulary: HashMap<String, u32>,
    idf: Vec<f64>,
}

impl TfIdf {
    /// Fit on tokenized documents and return one vector per document.
    pub fn fit_transform(documents: &[Vec<String>]) -> (Self, Vec<SparseVector>) {
        let mut vocabulary: HashMap<String, u32> = HashMap::new();
        let mut df: Vec<usize> = Vec::new();
        let mut counts: Vec<HashMap<u32, usize>> = Vec::with_capacity(documents.len());

        for tokens in documents {
            let mut tf: HashMap<u32, usize> = HashMap::new();
            for token in tokens {
                let next_id = vocabulary.len() as u32;
                let id = *vocabulary.entry(token.clone()).or_insert(next_id);
                if id as usize == df.len() {
                    df.push(0);
                }
                *tf.entry(id).or_default() += 1;
            }
            for id in tf.keys() {
                df[*id as usize] += 1;
            }
            counts.push(tf);
        }

        let n = documents.len() as f64;
        let idf: Vec<f64> = df
            .iter()
            .map(|&d| ((1.0 + n) / (1.0 + d as f64)).ln() + 1.0)
            .collect();

        let vectors = counts
            .into_iter()
            .map(|tf| {
                let mut entries: Vec<(u32, f64)> = tf
                    .into_iter()
                    .map(|(id, count)| (id, count as f64 * idf[id as usize]))
                    .collect();
                entries.sort_by_key(|(id, _)| *id);
                let norm = entries.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
                if norm > 0.0 {
                    for (_, w) in &mut entries {
                        *w /= norm;
                    }
                }
                SparseVector { entries }
            })
            .collect();

        (Self { vocabulary, idf }, vectors)
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    #[cfg(test)]
    fn idf(&self, term: &str) -> Option<f64> {
        self.vocabulary.get(term).map(|&id| self.idf[id as usize])
    }
}
