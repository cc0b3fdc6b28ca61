//! Exact and near-duplicate removal over label records.

use std::collections::{HashMap, HashSet};

use rayon::prelude::*;
use tracing::debug;

use crate::tfidf::{tokenize, SparseVector, TfIdf};
use splmine_core::{ClusterPolicy, LabelRecord};

/// Slack for floating point error when comparing against the threshold,
/// so identical term bags still reach a threshold of 1.0.
const SIMILARITY_EPSILON: f64 = 1e-9;

/// Drop records whose text hashes equal an earlier record's.
/// Returns the retained records and the number removed.
pub fn remove_exact(records: Vec<LabelRecord>) -> (Vec<LabelRecord>, usize) {
    let before = records.len();
    let mut seen = HashSet::new();
    let retained: Vec<LabelRecord> = records
        .into_iter()
        .filter(|r| seen.insert(r.content_hash()))
        .collect();
    let removed = before - retained.len();
    (retained, removed)
}

/// TF-IDF vectors of a corpus plus an inverted index for pairwise lookups.
pub struct SimilarityIndex {
    vectors: Vec<SparseVector>,
    /// term id → (document, weight), ascending by document.
    postings: HashMap<u32, Vec<(usize, f64)>>,
}

impl SimilarityIndex {
    pub fn build<S: AsRef<str> + Sync>(texts: &[S], stem_tokens: bool) -> Self {
        let tokens: Vec<Vec<String>> = texts
            .par_iter()
            .map(|t| tokenize(t.as_ref(), stem_tokens))
            .collect();
        let (model, vectors) = TfIdf::fit_transform(&tokens);
        debug!(
            "TF-IDF over {} texts, {} terms",
            vectors.len(),
            model.vocabulary_size()
        );

        let mut postings: HashMap<u32, Vec<(usize, f64)>> = HashMap::new();
        for (doc, vector) in vectors.iter().enumerate() {
            for &(term, weight) in vector.entries() {
                postings.entry(term).or_default().push((doc, weight));
            }
        }
        Self { vectors, postings }
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn similarity(&self, a: usize, b: usize) -> f64 {
        self.vectors[a].cosine(&self.vectors[b])
    }

    /// Later documents whose similarity to `doc` is at least `threshold`,
    /// ascending. Only documents sharing a term are considered, so a
    /// threshold of 0.0 needs handling by the caller.
    pub fn later_neighbors(&self, doc: usize, threshold: f64) -> Vec<usize> {
        let mut dots: HashMap<usize, f64> = HashMap::new();
        for &(term, weight) in self.vectors[doc].entries() {
            let Some(docs) = self.postings.get(&term) else {
                continue;
            };
            let start = docs.partition_point(|&(d, _)| d <= doc);
            for &(other, other_weight) in &docs[start..] {
                *dots.entry(other).or_default() += weight * other_weight;
            }
        }
        let mut neighbors: Vec<usize> = dots
            .into_iter()
            .filter(|(_, dot)| dot.clamp(0.0, 1.0) + SIMILARITY_EPSILON >= threshold)
            .map(|(other, _)| other)
            .collect();
        neighbors.sort_unstable();
        neighbors
    }

    /// Neighbor rows for every document, computed in parallel.
    pub fn all_later_neighbors(&self, threshold: f64) -> Vec<Vec<usize>> {
        (0..self.len())
            .into_par_iter()
            .map(|doc| self.later_neighbors(doc, threshold))
            .collect()
    }
}

/// Indices to keep, in ascending order, for `texts` at `threshold`.
pub fn retained_indices<S: AsRef<str> + Sync>(
    texts: &[S],
    threshold: f64,
    policy: ClusterPolicy,
    stem_tokens: bool,
) -> Vec<usize> {
    let n = texts.len();
    if n <= 1 {
        return (0..n).collect();
    }
    // Every pair scores at least 0.0, including pairs with no shared term.
    if threshold <= SIMILARITY_EPSILON {
        return vec![0];
    }

    let index = SimilarityIndex::build(texts, stem_tokens);
    let rows = index.all_later_neighbors(threshold);
    let pairs: usize = rows.iter().map(Vec::len).sum();
    debug!("{} record pairs at or above {}", pairs, threshold);

    match policy {
        ClusterPolicy::FirstAnchor => {
            let mut dropped = vec![false; n];
            for (doc, neighbors) in rows.iter().enumerate() {
                if dropped[doc] {
                    continue;
                }
                for &other in neighbors {
                    dropped[other] = true;
                }
            }
            (0..n).filter(|&i| !dropped[i]).collect()
        }
        ClusterPolicy::ConnectedComponent => {
            let mut components = DisjointSet::new(n);
            for (doc, neighbors) in rows.iter().enumerate() {
                for &other in neighbors {
                    components.union(doc, other);
                }
            }
            (0..n).filter(|&i| components.find(i) == i).collect()
        }
    }
}

/// Union-find whose representative is always the smallest member.
struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut cur = x;
        while self.parent[cur] != root {
            let next = self.parent[cur];
            self.parent[cur] = root;
            cur = next;
        }
        root
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra < rb {
            self.parent[rb] = ra;
        } else if rb < ra {
            self.parent[ra] = rb;
        }
    }
}

/// Drop near-duplicates, keeping the earliest record of each group.
/// Returns the retained records and the number removed.
pub fn remove_near(
    records: Vec<LabelRecord>,
    threshold: f64,
    policy: ClusterPolicy,
    stem_tokens: bool,
) -> (Vec<LabelRecord>, usize) {
    let before = records.len();
    let texts: Vec<&str> = records.iter().map(|r| r.indication_text.as_str()).collect();
    let keep: HashSet<usize> = retained_indices(&texts, threshold, policy, stem_tokens)
        .into_iter()
        .collect();
    let retained: Vec<LabelRecord> = records
        .into_iter()
        .enumerate()
        .filter(|(i, _)| keep.contains(i))
        .map(|(_, r)| r)
        .collect();
    let removed = before - retained.len();
    (retained, removed)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use splmine_core::LabelIdentity;

    pub(crate) fn record(id: &str, text: &str) -> LabelRecord {
        LabelRecord {
            identity: LabelIdentity {
                document_id: id.into(),
                set_id: format!("set-{id}"),
                version_number: 1,
            },
            section_code: "34067-9".into(),
            indication_text: text.into(),
            source: String::new(),
        }
    }

    fn ids(records: &[LabelRecord]) -> Vec<&str> {
        records.iter().map(|r| r.identity.document_id.as_str()).collect()
    }

    #[test]
    fn test_remove_exact_keeps_first() {
        let (kept, removed) = remove_exact(vec![
            record("a", "Treats flu."),
            record("b", "Treats colds."),
            record("c", "Treats flu."),
        ]);
        assert_eq!(ids(&kept), vec!["a", "b"]);
        assert_eq!(removed, 1);
    }

    #[test]
    fn test_trivial_inputs_unchanged() {
        assert!(retained_indices::<&str>(&[], 0.5, ClusterPolicy::FirstAnchor, true).is_empty());
        assert_eq!(retained_indices(&["x"], 0.0, ClusterPolicy::FirstAnchor, true), vec![0]);
    }

    #[test]
    fn test_threshold_zero_keeps_only_first() {
        let texts = ["alpha beta", "gamma delta", "epsilon zeta"];
        for policy in [ClusterPolicy::FirstAnchor, ClusterPolicy::ConnectedComponent] {
            assert_eq!(retained_indices(&texts, 0.0, policy, true), vec![0]);
        }
    }

    #[test]
    fn test_threshold_one_keeps_near_duplicates() {
        let texts = [
            "Treat high blood pressure in adults.",
            "Treat high blood pressure in adult patients.",
            // Same stemmed term bag as the first.
            "In adults, treat high blood pressure.",
        ];
        assert_eq!(
            retained_indices(&texts, 1.0, ClusterPolicy::FirstAnchor, true),
            vec![0, 1]
        );
    }

    #[test]
    fn test_first_anchor_vs_connected_component() {
        // a~b and b~c are similar, a and c are not.
        let texts = [
            "aa bb cc dd ee ff gg hh",
            "ee ff gg hh ii jj kk ll",
            "ii jj kk ll mm nn oo pp",
        ];
        let index = SimilarityIndex::build(&texts, false);
        let threshold = 0.4;
        assert!(index.similarity(0, 1) >= threshold);
        assert!(index.similarity(1, 2) >= threshold);
        assert!(index.similarity(0, 2) < threshold);

        // b is dropped by a, so it never anchors c.
        assert_eq!(
            retained_indices(&texts, threshold, ClusterPolicy::FirstAnchor, false),
            vec![0, 2]
        );
        // c is reachable from a through b.
        assert_eq!(
            retained_indices(&texts, threshold, ClusterPolicy::ConnectedComponent, false),
            vec![0]
        );
    }

    #[test]
    fn test_neighbors_match_brute_force() {
        let words = ["pain", "fever", "adult", "child", "tablet", "relief", "acute", "chronic"];
        let mut rng = StdRng::seed_from_u64(7);
        let texts: Vec<String> = (0..40)
            .map(|_| {
                (0..rng.gen_range(1..6))
                    .map(|_| words[rng.gen_range(0..words.len())])
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect();
        let index = SimilarityIndex::build(&texts, false);
        for threshold in [0.3, 0.6, 0.9] {
            for doc in 0..texts.len() {
                let expected: Vec<usize> = (doc + 1..texts.len())
                    .filter(|&o| index.similarity(doc, o) + SIMILARITY_EPSILON >= threshold)
                    .collect();
                assert_eq!(index.later_neighbors(doc, threshold), expected);
            }
        }
    }

    #[test]
    fn test_remove_near_preserves_order_and_never_grows() {
        let mut rng = StdRng::seed_from_u64(42);
        let words = ["flu", "cold", "pain", "adults", "children", "fever", "cough"];
        for _ in 0..20 {
            let records: Vec<LabelRecord> = (0..rng.gen_range(0..15))
                .map(|i| {
                    let text = (0..3)
                        .map(|_| words[rng.gen_range(0..words.len())])
                        .collect::<Vec<_>>()
                        .join(" ");
                    record(&i.to_string(), &text)
                })
                .collect();
            let before: Vec<String> = records.iter().map(|r| r.identity.document_id.clone()).collect();
            let threshold = rng.gen_range(0.0..=1.0);
            let (kept, removed) = remove_near(records, threshold, ClusterPolicy::FirstAnchor, true);
            assert_eq!(kept.len() + removed, before.len());
            let positions: Vec<usize> = kept
                .iter()
                .map(|r| before.iter().position(|id| *id == r.identity.document_id).unwrap())
                .collect();
            assert!(positions.windows(2).all(|w| w[0] < w[1]));
            if !before.is_empty() {
                assert_eq!(positions[0], 0);
            }
        }
    }
}
