//! Query/passage text normalization.
//!
//! Two strategies behind one trait, selected once at startup: the full
//! normalizer additionally drops stopwords and folds plural suffixes; the
//! basic one only case-folds and strips punctuation. Retrieval quality
//! degrades gracefully on the basic path, it never fails.

/// Normalizes text before vectorization. Query and passage text must go
/// through the same instance so they land in the same term space.
pub trait TextNormalizer: Send + Sync {
    fn normalize(&self, text: &str) -> String;
}

/// Choose the normalizer once at startup; the hot path never branches on it.
pub fn select(full: bool) -> Box<dyn TextNormalizer> {
    if full {
        Box::new(FullNormalizer)
    } else {
        Box::new(BasicNormalizer)
    }
}

/// Lowercase, keep `[a-z0-9 :-]`, collapse whitespace.
pub struct BasicNormalizer;

impl TextNormalizer for BasicNormalizer {
    fn normalize(&self, text: &str) -> String {
        fold(text)
    }
}

/// BasicNormalizer plus stopword removal and light plural folding.
pub struct FullNormalizer;

impl TextNormalizer for FullNormalizer {
    fn normalize(&self, text: &str) -> String {
        let folded = fold(text);
        let kept: Vec<String> = folded
            .split_whitespace()
            .filter(|token| !STOPWORDS.contains(token))
            .map(strip_plural)
            .collect();
        kept.join(" ")
    }
}

fn fold(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_space = true;
    for ch in text.chars() {
        let ch = ch.to_ascii_lowercase();
        if ch.is_ascii_alphanumeric() || ch == ':' || ch == '-' {
            out.push(ch);
            last_space = false;
        } else if !last_space {
            out.push(' ');
            last_space = true;
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

/// Fold trivial plurals ("blessings" -> "blessing"). Deliberately shallow:
/// anything cleverer needs a real lemmatizer, and a wrong fold is worse than
/// no fold.
fn strip_plural(token: &str) -> String {
    if token.len() > 3 && token.ends_with('s') && !token.ends_with("ss") && !token.ends_with("us") {
        token[..token.len() - 1].to_string()
    } else {
        token.to_string()
    }
}

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "can", "do", "does", "for", "from",
    "had", "has", "have", "he", "her", "his", "how", "i", "if", "in", "is", "it", "its", "me",
    "my", "of", "on", "or", "our", "she", "so", "than", "that", "the", "their", "them", "then",
    "there", "they", "this", "to", "us", "was", "we", "were", "what", "when", "where", "which",
    "who", "why", "will", "with", "you", "your",
];
