//! Generation backends.
//!
//! Both the local seq2seq runtime and the remote chat API sit behind one
//! trait with a deliberately blunt contract: prompt in, text out, empty
//! string on any internal failure. Exceptions never cross this boundary;
//! the router and engine reason only about empty-vs-nonempty.

pub mod remote;

pub use remote::RemoteChatClient;

use async_trait::async_trait;

use crate::types::{Intent, ProfileHints};

#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate a completion. An empty string means "no answer"; callers
    /// cascade to their next preference. Implementations must convert every
    /// internal failure into the empty-string sentinel.
    async fn generate(&self, prompt: &str, max_tokens: usize) -> String;

    /// Cheap readiness probe, consulted when computing availability flags.
    async fn is_ready(&self) -> bool {
        true
    }

    /// Stable identifier, part of the response-cache key.
    fn model_id(&self) -> &str;
}

/// Persona framing sent as the system prompt on every generation call.
/// The exact wording of persona responses is not standardized; this only
/// anchors voice and guardrails.
pub const PERSONA_SYSTEM_PROMPT: &str = "You are a warm, encouraging pastoral \
counselor. Answer in a pastoral voice: direct, scripturally grounded, and \
hopeful. Keep answers short. When context passages are provided, stay \
faithful to them; never invent quotations.";

/// Assemble the user prompt: numbered context snippets, optional profile
/// hints (destiny/advice turns only), then the question.
pub fn build_prompt(
    question: &str,
    context: &[String],
    profile: Option<&ProfileHints>,
    intent: Intent,
) -> String {
    let mut parts = Vec::with_capacity(4);

    if !context.is_empty() {
        let snippets: Vec<String> = context
            .iter()
            .enumerate()
            .map(|(i, snippet)| format!("[{}] {}", i + 1, snippet))
            .collect();
        parts.push(format!("Context:\n{}", snippets.join("\n")));
    }

    if matches!(intent, Intent::Destiny | Intent::Advice) {
        if let Some(profile) = profile.filter(|p| !p.is_empty()) {
            let mut hints = Vec::with_capacity(2);
            if let Some(name) = &profile.name {
                hints.push(format!("name: {name}"));
            }
            if let Some(birth_date) = &profile.birth_date {
                hints.push(format!("birth date: {birth_date}"));
            }
            parts.push(format!("About the person: {}", hints.join(", ")));
        }
    }

    parts.push(format!("Question: {question}"));
    parts.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_numbers_context_snippets() {
        let context = vec!["first snippet".to_string(), "second snippet".to_string()];
        let prompt = build_prompt("what is grace?", &context, None, Intent::General);
        assert!(prompt.contains("[1] first snippet"));
        assert!(prompt.contains("[2] second snippet"));
        assert!(prompt.ends_with("Question: what is grace?"));
    }

    #[test]
    fn prompt_without_context_is_just_the_question() {
        let prompt = build_prompt("hello", &[], None, Intent::General);
        assert_eq!(prompt, "Question: hello");
    }

    #[test]
    fn profile_hints_only_apply_to_destiny_and_advice() {
        let profile = ProfileHints {
            name: Some("Ruth".into()),
            birth_date: Some("1990-03-14".into()),
        };
        let destiny = build_prompt("theme 7?", &[], Some(&profile), Intent::Destiny);
        assert!(destiny.contains("name: Ruth"));
        assert!(destiny.contains("birth date: 1990-03-14"));

        let teachings = build_prompt("theme 7?", &[], Some(&profile), Intent::Teachings);
        assert!(!teachings.contains("Ruth"));
    }

    #[test]
    fn empty_profile_adds_nothing() {
        let prompt = build_prompt("q", &[], Some(&ProfileHints::default()), Intent::Advice);
        assert!(!prompt.contains("About the person"));
    }
}
