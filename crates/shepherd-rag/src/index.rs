//! Per-corpus weighted term-frequency index.
//!
//! Fits a unigram+bigram TF-IDF vector space over a corpus's normalized
//! passages and answers cosine-similarity queries against it. Scores are
//! unit-less relative similarities in [0, ~1]; they are comparable within one
//! corpus's results and only across corpora once the corpus weight has been
//! applied.

use std::collections::HashMap;

use crate::corpus::TextNormalizer;
use crate::types::{Hit, Passage};

/// A fitted vector space: vocabulary, smoothed IDF, and L2-normalized rows.
/// Row count always equals the owning corpus's passage count.
pub struct TfidfIndex {
    vocab: HashMap<String, u32>,
    idf: Vec<f32>,
    rows: Vec<Vec<(u32, f32)>>,
}

impl TfidfIndex {
    /// Fit the vector space. Returns None for zero passages or degenerate
    /// input (nothing survives normalization); callers treat a None index as
    /// "no results", never as an error.
    pub fn build(normalizer: &dyn TextNormalizer, passages: &[Passage]) -> Option<Self> {
        if passages.is_empty() {
            return None;
        }

        let docs: Vec<Vec<String>> = passages
            .iter()
            .map(|p| terms(&normalizer.normalize(&p.text)))
            .collect();

        // Document frequency over unique terms per doc.
        let mut df: HashMap<&str, u32> = HashMap::new();
        for doc in &docs {
            let mut seen: Vec<&str> = doc.iter().map(|t| t.as_str()).collect();
            seen.sort_unstable();
            seen.dedup();
            for term in seen {
                *df.entry(term).or_insert(0) += 1;
            }
        }

        if df.is_empty() {
            return None;
        }

        // Deterministic term ids: sorted vocabulary, so two builds over the
        // same passages produce identical spaces.
        let mut vocab_terms: Vec<&str> = df.keys().copied().collect();
        vocab_terms.sort_unstable();

        let n_docs = docs.len() as f32;
        let mut vocab = HashMap::with_capacity(vocab_terms.len());
        let mut idf = Vec::with_capacity(vocab_terms.len());
        for (term_id, term) in vocab_terms.iter().enumerate() {
            vocab.insert(term.to_string(), term_id as u32);
            let df_t = df[term] as f32;
            // Smoothed IDF, strictly positive so present terms always count.
            idf.push(((1.0 + n_docs) / (1.0 + df_t)).ln() + 1.0);
        }

        let rows = docs
            .iter()
            .map(|doc| vectorize(doc, &vocab, &idf))
            .collect();

        tracing::debug!(
            passages = passages.len(),
            terms = vocab.len(),
            "Fitted TF-IDF space"
        );

        Some(Self { vocab, idf, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Project the query into the fitted space and return the `top_k` rows by
    /// cosine score descending. Ties break by original record order.
    pub fn query(
        &self,
        normalizer: &dyn TextNormalizer,
        text: &str,
        top_k: usize,
    ) -> Vec<(usize, f32)> {
        let query_terms = terms(&normalizer.normalize(text));
        let query_vec = vectorize(&query_terms, &self.vocab, &self.idf);
        if query_vec.is_empty() {
            return Vec::new();
        }
        let query_map: HashMap<u32, f32> = query_vec.into_iter().collect();

        let mut scored: Vec<(usize, f32)> = self
            .rows
            .iter()
            .enumerate()
            .filter_map(|(row_id, row)| {
                let mut dot = 0.0f32;
                for (term_id, weight) in row {
                    if let Some(qw) = query_map.get(term_id) {
                        dot += qw * weight;
                    }
                }
                if dot > 0.0 {
                    Some((row_id, dot))
                } else {
                    None
                }
            })
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(top_k);
        scored
    }
}

/// Unigrams plus adjacent bigrams (space-joined) over normalized text.
fn terms(normalized: &str) -> Vec<String> {
    let tokens: Vec<&str> = normalized.split_whitespace().collect();
    let mut out = Vec::with_capacity(tokens.len() * 2);
    for token in &tokens {
        out.push((*token).to_string());
    }
    for pair in tokens.windows(2) {
        out.push(format!("{} {}", pair[0], pair[1]));
    }
    out
}

/// TF x IDF over known vocabulary, L2-normalized. Unknown terms are ignored.
fn vectorize(doc: &[String], vocab: &HashMap<String, u32>, idf: &[f32]) -> Vec<(u32, f32)> {
    let mut tf: HashMap<u32, f32> = HashMap::new();
    for term in doc {
        if let Some(&term_id) = vocab.get(term) {
            *tf.entry(term_id).or_insert(0.0) += 1.0;
        }
    }
    if tf.is_empty() {
        return Vec::new();
    }

    let mut vec: Vec<(u32, f32)> = tf
        .into_iter()
        .map(|(term_id, count)| (term_id, count * idf[term_id as usize]))
        .collect();

    let norm: f32 = vec.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
    if norm > 0.0 {
        for (_, w) in &mut vec {
            *w /= norm;
        }
    }
    vec.sort_unstable_by_key(|(term_id, _)| *term_id);
    vec
}

/// One named corpus: its passages and the index fitted over them. The two are
/// always rebuilt together and swapped atomically inside a snapshot.
pub struct Corpus {
    pub id: String,
    pub passages: Vec<Passage>,
    pub index: Option<TfidfIndex>,
}

impl Corpus {
    pub fn build(id: String, passages: Vec<Passage>, normalizer: &dyn TextNormalizer) -> Self {
        let index = TfidfIndex::build(normalizer, &passages);
        if index.is_none() && !passages.is_empty() {
            tracing::warn!(corpus = %id, "Index fit failed on degenerate input, corpus disabled");
        }
        Self { id, passages, index }
    }

    /// Raw (unweighted) top-k hits for this corpus. A None index yields no
    /// hits rather than an error.
    pub fn query(&self, normalizer: &dyn TextNormalizer, text: &str, top_k: usize) -> Vec<Hit> {
        let index = match &self.index {
            Some(index) => index,
            None => return Vec::new(),
        };
        index
            .query(normalizer, text, top_k)
            .into_iter()
            .map(|(row_id, score)| {
                let passage = &self.passages[row_id];
                Hit {
                    score,
                    text: passage.text.clone(),
                    metadata: passage.metadata.clone(),
                    corpus_id: self.id.clone(),
                }
            })
            .collect()
    }
}
