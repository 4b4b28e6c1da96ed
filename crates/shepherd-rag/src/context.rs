//! Context Filter: keeps only blended candidates from intent-preferred
//! corpora that clear the minimum-context-score bar, capped to a small count.
//! An empty result means "answer ungrounded"; there is no fallback to
//! unfiltered top-K, the router's weak-context branch handles thin-evidence
//! turns instead.

use crate::types::{Hit, Intent};

/// Corpora considered relevant per intent. `None` means every corpus,
/// including ones this table has never heard of.
fn preferred_corpora(intent: Intent) -> Option<&'static [&'static str]> {
    match intent {
        Intent::Teachings => Some(&["primary_qa", "thematic_qa"]),
        Intent::Destiny => Some(&["numbered_themes", "thematic_qa"]),
        Intent::Advice => Some(&["primary_qa", "session_notes", "thematic_qa"]),
        Intent::General => None,
    }
}

pub fn filter_context(hits: &[Hit], intent: Intent, min_score: f32, cap: usize) -> Vec<Hit> {
    let preferred = preferred_corpora(intent);

    let mut survivors: Vec<Hit> = hits
        .iter()
        .filter(|hit| {
            let corpus_ok = match preferred {
                Some(ids) => ids.contains(&hit.corpus_id.as_str()),
                None => true,
            };
            corpus_ok && hit.score >= min_score
        })
        .cloned()
        .collect();

    survivors.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    survivors.truncate(cap);

    tracing::debug!(
        intent = intent.as_str(),
        candidates = hits.len(),
        kept = survivors.len(),
        "Context filter"
    );

    survivors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Metadata;

    fn hit(corpus_id: &str, score: f32) -> Hit {
        Hit {
            score,
            text: format!("{corpus_id} passage"),
            metadata: Metadata::new(),
            corpus_id: corpus_id.to_string(),
        }
    }

    const MIN: f32 = 0.22;
    const CAP: usize = 3;

    #[test]
    fn no_hit_below_threshold_survives_any_intent() {
        let hits = vec![
            hit("primary_qa", 0.90),
            hit("primary_qa", 0.2199),
            hit("thematic_qa", 0.10),
            hit("numbered_themes", 0.05),
        ];
        for intent in [Intent::Teachings, Intent::Destiny, Intent::Advice, Intent::General] {
            let kept = filter_context(&hits, intent, MIN, CAP);
            assert!(kept.iter().all(|h| h.score >= MIN), "intent {:?}", intent);
        }
    }

    #[test]
    fn score_exactly_at_threshold_survives() {
        let hits = vec![hit("primary_qa", MIN)];
        assert_eq!(filter_context(&hits, Intent::General, MIN, CAP).len(), 1);
    }

    #[test]
    fn output_never_exceeds_cap() {
        let hits: Vec<Hit> = (0..10).map(|i| hit("primary_qa", 0.9 - i as f32 * 0.01)).collect();
        for intent in [Intent::Teachings, Intent::Destiny, Intent::Advice, Intent::General] {
            assert!(filter_context(&hits, intent, MIN, CAP).len() <= CAP);
        }
    }

    #[test]
    fn teachings_excludes_session_notes() {
        let hits = vec![hit("session_notes", 0.9), hit("primary_qa", 0.5)];
        let kept = filter_context(&hits, Intent::Teachings, MIN, CAP);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].corpus_id, "primary_qa");
    }

    #[test]
    fn destiny_prefers_numbered_themes() {
        let hits = vec![
            hit("primary_qa", 0.9),
            hit("numbered_themes", 0.5),
            hit("thematic_qa", 0.4),
        ];
        let kept = filter_context(&hits, Intent::Destiny, MIN, CAP);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].corpus_id, "numbered_themes");
    }

    #[test]
    fn general_admits_every_corpus() {
        let hits = vec![
            hit("primary_qa", 0.5),
            hit("session_notes", 0.5),
            hit("never_configured", 0.5),
        ];
        let kept = filter_context(&hits, Intent::General, MIN, CAP);
        assert_eq!(kept.len(), 3);
    }

    #[test]
    fn survivors_are_sorted_descending() {
        let hits = vec![
            hit("primary_qa", 0.3),
            hit("thematic_qa", 0.8),
            hit("primary_qa", 0.5),
        ];
        let kept = filter_context(&hits, Intent::General, MIN, CAP);
        let scores: Vec<f32> = kept.iter().map(|h| h.score).collect();
        assert_eq!(scores, vec![0.8, 0.5, 0.3]);
    }

    #[test]
    fn empty_when_nothing_clears_the_bar() {
        let hits = vec![hit("primary_qa", 0.1), hit("thematic_qa", 0.05)];
        assert!(filter_context(&hits, Intent::General, MIN, CAP).is_empty());
    }
}
