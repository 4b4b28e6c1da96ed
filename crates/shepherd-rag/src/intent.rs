//! Intent Classifier: an explicit, priority-ordered table of
//! (predicate, label) rules with a mandatory catch-all, so exactly one intent
//! is returned for every input. Pure function of the text: same input (mod
//! case and whitespace) always yields the same label.

use std::sync::OnceLock;

use regex::Regex;

use crate::types::Intent;

struct Rule {
    name: &'static str,
    predicate: fn(&str) -> bool,
    intent: Intent,
}

/// Evaluated top to bottom; first match wins. The final rule is unconditional.
const RULES: &[Rule] = &[
    Rule {
        name: "theological-vocabulary",
        predicate: mentions_teachings,
        intent: Intent::Teachings,
    },
    Rule {
        name: "numbered-theme-with-profile",
        predicate: mentions_destiny,
        intent: Intent::Destiny,
    },
    Rule {
        name: "help-seeking-vocabulary",
        predicate: mentions_advice,
        intent: Intent::Advice,
    },
    Rule {
        name: "catch-all",
        predicate: |_| true,
        intent: Intent::General,
    },
];

pub fn detect_intent(text: &str) -> Intent {
    let normalized = normalize_for_matching(text);
    for rule in RULES {
        if (rule.predicate)(&normalized) {
            tracing::debug!(rule = rule.name, intent = rule.intent.as_str(), "Intent detected");
            return rule.intent;
        }
    }
    // The catch-all above is unconditional.
    Intent::General
}

/// Lowercase and strip punctuation so keyword containment is robust to
/// surface form. Matching never depends on the retrieval normalizer.
fn normalize_for_matching(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push(' ');
    let mut last_space = true;
    for ch in text.chars() {
        let ch = ch.to_ascii_lowercase();
        if ch.is_ascii_alphanumeric() {
            out.push(ch);
            last_space = false;
        } else if !last_space {
            out.push(' ');
            last_space = true;
        }
    }
    if !last_space {
        out.push(' ');
    }
    out
}

/// Whole-word containment against space-delimited normalized text.
fn contains_word(haystack: &str, word: &str) -> bool {
    haystack.contains(&format!(" {} ", word))
}

fn contains_any(haystack: &str, words: &[&str]) -> bool {
    words.iter().any(|w| contains_word(haystack, w))
}

fn mentions_teachings(text: &str) -> bool {
    const VOCABULARY: &[&str] = &[
        "scripture", "bible", "verse", "psalm", "psalms", "genesis", "eve", "eden", "adam",
        "theology", "covenant", "prophetic", "prophecy", "anointing", "ezer", "kenegdo",
        "righteousness", "shekinah", "womanist", "ministry", "sermon", "gospel", "kingdom",
    ];
    contains_any(text, VOCABULARY) || text.contains(" god say") || text.contains(" word of god ")
}

fn mentions_destiny(text: &str) -> bool {
    static NUMBERED_THEME: OnceLock<Regex> = OnceLock::new();
    let numbered = NUMBERED_THEME.get_or_init(|| {
        Regex::new(r"(?:destiny|life path|theme)\s+(?:number\s+)?\d{1,2}\b")
            .expect("numbered-theme pattern is valid")
    });

    const PROFILE_MARKERS: &[&str] = &["born", "birth", "birthday", "dob"];
    let has_profile = contains_any(text, PROFILE_MARKERS) || text.contains(" my name ");

    numbered.is_match(text) && has_profile
}

fn mentions_advice(text: &str) -> bool {
    const VOCABULARY: &[&str] = &[
        "help", "advice", "struggling", "struggle", "afraid", "scared", "anxious", "anxiety",
        "depressed", "lonely", "hurt", "hurting", "grief", "grieving", "worried", "overwhelmed",
        "hopeless", "lost", "broken", "crying",
    ];
    // Matching runs on normalized text, where "don't" becomes "don t".
    contains_any(text, VOCABULARY)
        || text.contains(" what should i do ")
        || text.contains(" i feel ")
        || text.contains(" i dont know ")
        || text.contains(" i don t know ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theological_vocabulary_maps_to_teachings() {
        assert_eq!(detect_intent("What does Genesis say about Eve?"), Intent::Teachings);
        assert_eq!(detect_intent("explain ezer kenegdo"), Intent::Teachings);
        assert_eq!(detect_intent("what does God say about me"), Intent::Teachings);
    }

    #[test]
    fn numbered_theme_with_profile_maps_to_destiny() {
        assert_eq!(
            detect_intent("I was born on 3/14, what is my destiny number 7 about?"),
            Intent::Destiny
        );
        assert_eq!(
            detect_intent("my name is Ruth, tell me about theme 4"),
            Intent::Destiny
        );
    }

    #[test]
    fn numbered_theme_without_profile_is_not_destiny() {
        // No profile marker, no theological vocabulary, no help-seeking words.
        assert_eq!(detect_intent("tell me about destiny number 7"), Intent::General);
    }

    #[test]
    fn help_seeking_maps_to_advice() {
        assert_eq!(detect_intent("I'm struggling and need help"), Intent::Advice);
        assert_eq!(detect_intent("what should I do about my job?"), Intent::Advice);
        assert_eq!(detect_intent("I feel so alone lately"), Intent::Advice);
    }

    #[test]
    fn uncertainty_phrase_matches_with_and_without_apostrophe() {
        assert_eq!(detect_intent("I don't know anymore"), Intent::Advice);
        assert_eq!(detect_intent("i dont know anymore"), Intent::Advice);
    }

    #[test]
    fn everything_else_is_general() {
        assert_eq!(detect_intent("hello"), Intent::General);
        assert_eq!(detect_intent(""), Intent::General);
        assert_eq!(detect_intent("what time is the service"), Intent::General);
    }

    #[test]
    fn priority_order_resolves_overlap() {
        // Theological vocabulary outranks help-seeking vocabulary.
        assert_eq!(
            detect_intent("help me understand this psalm"),
            Intent::Teachings
        );
    }

    #[test]
    fn matching_ignores_case_and_whitespace() {
        assert_eq!(
            detect_intent("  WHAT   does   GENESIS  say? "),
            detect_intent("what does genesis say"),
        );
    }

    #[test]
    fn classifier_is_deterministic() {
        for _ in 0..5 {
            assert_eq!(detect_intent("I need advice today"), Intent::Advice);
        }
    }

    #[test]
    fn no_partial_word_matches() {
        // "eve" must not fire inside "everyone".
        assert_eq!(detect_intent("is everyone welcome"), Intent::General);
    }
}
