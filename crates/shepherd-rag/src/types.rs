use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Original record metadata carried alongside a passage, untouched by indexing.
pub type Metadata = HashMap<String, serde_json::Value>;

/// Flattened, searchable text form of one source record.
///
/// Built once per record when the owning corpus is loaded; never mutated
/// in place. A record that yields no non-empty text never becomes a Passage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passage {
    pub text: String,
    pub metadata: Metadata,
    pub corpus_id: String,
}

/// A scored (passage, corpus) pair returned by a single-corpus or blended query.
///
/// `score` is non-negative; ordering is meaningful within one query. Once the
/// corpus weight has been applied, scores are comparable across corpora.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hit {
    pub score: f32,
    pub text: String,
    pub metadata: Metadata,
    pub corpus_id: String,
}

/// Coarse classification of user input, used to bias retrieval and routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Teachings,
    Destiny,
    Advice,
    General,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Teachings => "teachings",
            Intent::Destiny => "destiny",
            Intent::Advice => "advice",
            Intent::General => "general",
        }
    }
}

/// Which generation backend handled (or should handle) a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    Local,
    Remote,
    Fallback,
}

/// Context snippet cited in a chat reply, with its retrieval provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    pub corpus_id: String,
    pub score: f32,
    pub snippet: String,
}

impl Citation {
    /// Snippets are display material, not full passages, so keep them short.
    pub fn from_hit(hit: &Hit) -> Self {
        const SNIPPET_LEN: usize = 240;
        let snippet = if hit.text.len() > SNIPPET_LEN {
            let mut end = SNIPPET_LEN;
            while !hit.text.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}…", &hit.text[..end])
        } else {
            hit.text.clone()
        };
        Self {
            corpus_id: hit.corpus_id.clone(),
            score: hit.score,
            snippet,
        }
    }
}

/// Lightweight profile hints consumed only by the destiny/advice prompt paths.
/// The numerology calculators themselves live outside this crate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileHints {
    pub name: Option<String>,
    pub birth_date: Option<String>,
}

impl ProfileHints {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.birth_date.is_none()
    }
}

/// Response envelope for one chat turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub id: Uuid,
    pub text: String,
    pub backend: Backend,
    pub intent: Intent,
    pub citations: Vec<Citation>,
    pub cached: bool,
}

/// Per-corpus passage counts reported after a reload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReloadSummary {
    pub corpora: HashMap<String, usize>,
}

impl ReloadSummary {
    pub fn total_passages(&self) -> usize {
        self.corpora.values().sum()
    }
}

/// Health summary: corpus state, backend wiring, budget position. The
/// `*_configured` flags report whether a backend is attached at all; per-turn
/// availability additionally depends on readiness and budget headroom, which
/// the budget fields expose alongside.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStats {
    pub corpora: HashMap<String, usize>,
    pub total_passages: usize,
    pub local_configured: bool,
    pub remote_configured: bool,
    pub budget_spent: f64,
    pub budget_ceiling: f64,
}
