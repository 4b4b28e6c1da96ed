//! Blended Retriever: fans a query out across every corpus index, rescales
//! each corpus's raw scores by its static importance weight, then merges,
//! sorts and truncates to one global candidate list.

use rayon::prelude::*;

use crate::corpus::TextNormalizer;
use crate::index::Corpus;
use crate::types::Hit;

/// Query every corpus for its own top-N (N = max(per_corpus_k, k_total)),
/// apply corpus weights, merge and keep the global `k_total` best.
///
/// Stable tie-break: among exactly-equal weighted scores, the corpus queried
/// first wins, then original record order. All corpora empty yields an empty
/// list, never an error.
pub fn blended_search(
    corpora: &[(Corpus, f32)],
    normalizer: &dyn TextNormalizer,
    query: &str,
    k_total: usize,
    per_corpus_k: usize,
) -> Vec<Hit> {
    let per_corpus = per_corpus_k.max(k_total);

    // Fan out per corpus; collect preserves corpus order for the stable merge.
    let per_corpus_hits: Vec<Vec<Hit>> = corpora
        .par_iter()
        .map(|(corpus, weight)| {
            let mut hits = corpus.query(normalizer, query, per_corpus);
            for hit in &mut hits {
                hit.score *= weight;
            }
            hits
        })
        .collect();

    let mut merged: Vec<Hit> = per_corpus_hits.into_iter().flatten().collect();

    // Stable sort: equal scores keep corpus order, then record order.
    merged.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    merged.truncate(k_total);

    tracing::debug!(
        query = %query,
        candidates = merged.len(),
        top_score = merged.first().map(|h| h.score).unwrap_or(0.0),
        "Blended search"
    );

    merged
}
