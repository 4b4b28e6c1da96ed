//! ChatEngine: the facade over the whole pipeline.
//!
//! Per request: rate limiter -> intent -> blended retrieval -> context filter
//! -> cache probe -> model routing -> generation -> cache write. Corpus state
//! lives in an immutable snapshot behind an RwLock'd Arc: readers clone the
//! Arc at the start of a request and never observe a rebuild mid-query;
//! reload builds a whole new snapshot and swaps the pointer.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::cache::{cache_key, estimate_tokens, BudgetGuard, ResponseCache};
use crate::config::EngineConfig;
use crate::context::filter_context;
use crate::corpus::{select_normalizer, store, TextNormalizer};
use crate::index::Corpus;
use crate::intent::detect_intent;
use crate::llm::{build_prompt, GenerationBackend, RemoteChatClient};
use crate::ratelimit::RateLimiter;
use crate::router::choose_backend;
use crate::search::blended_search;
use crate::types::{
    Backend, ChatReply, Citation, EngineStats, Hit, Intent, ProfileHints, ReloadSummary,
};

/// Deterministic copy for turns no backend could serve. The end user always
/// receives some text and never an error.
pub const FALLBACK_MESSAGE: &str = "I hear you, and I want to give your question \
the care it deserves. I can't answer it properly right now. Please ask me \
again in a little while.";

/// Polite rejection for rate-limited clients.
pub const RATE_LIMIT_MESSAGE: &str = "You're asking faster than I can keep up! \
Give me just a moment, then ask again.";

/// All corpora plus their fitted indexes, built together and swapped as one.
struct CorpusSnapshot {
    corpora: Vec<(Corpus, f32)>,
}

pub struct ChatEngine {
    config: EngineConfig,
    normalizer: Box<dyn TextNormalizer>,
    snapshot: RwLock<Arc<CorpusSnapshot>>,
    local: Option<Arc<dyn GenerationBackend>>,
    remote: Option<Arc<dyn GenerationBackend>>,
    cache: ResponseCache,
    budget: BudgetGuard,
    limiter: RateLimiter,
}

impl ChatEngine {
    /// Load all configured corpora, fit their indexes, and wire the remote
    /// backend if one is configured. Missing corpus files degrade to empty
    /// corpora; construction only fails on invalid configuration.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;

        let normalizer = select_normalizer(config.full_normalizer);
        let (snapshot, summary) = build_snapshot(&config, normalizer.as_ref());
        tracing::info!(
            corpora = summary.corpora.len(),
            passages = summary.total_passages(),
            "Engine initialized"
        );

        let remote: Option<Arc<dyn GenerationBackend>> = match &config.remote {
            Some(remote_config) => match RemoteChatClient::new(remote_config) {
                Ok(client) => Some(Arc::new(client)),
                Err(e) => {
                    tracing::warn!(error = %e, "Remote backend unavailable, continuing without it");
                    None
                }
            },
            None => None,
        };

        let cache = ResponseCache::new(
            Duration::from_secs(config.cache.ttl_secs),
            config.cache.max_entries,
        );
        let budget = BudgetGuard::new(config.budget.daily_ceiling, config.budget.cost_per_1k_tokens);
        let limiter = RateLimiter::new(
            Duration::from_secs(config.rate_limit.window_secs),
            config.rate_limit.max_hits,
        );

        Ok(Self {
            snapshot: RwLock::new(Arc::new(snapshot)),
            normalizer,
            local: None,
            remote,
            cache,
            budget,
            limiter,
            config,
        })
    }

    /// Attach the local seq2seq backend (an external collaborator implementing
    /// the generation contract).
    pub fn with_local_backend(mut self, backend: Arc<dyn GenerationBackend>) -> Self {
        self.local = Some(backend);
        self
    }

    /// Replace the remote backend (tests, alternative providers).
    pub fn with_remote_backend(mut self, backend: Arc<dyn GenerationBackend>) -> Self {
        self.remote = Some(backend);
        self
    }

    /// Hot reload: rebuild every corpus and its index, then swap the snapshot
    /// atomically. Concurrent queries keep reading the old snapshot until the
    /// swap and never see a half-rebuilt index.
    pub fn reload(&self) -> ReloadSummary {
        let (snapshot, summary) = build_snapshot(&self.config, self.normalizer.as_ref());
        *self.snapshot.write() = Arc::new(snapshot);
        tracing::info!(passages = summary.total_passages(), "Corpora reloaded");
        summary
    }

    /// Debug blended retrieval: ranked weighted hits with scores and corpus
    /// ids, for offline tuning of weights and thresholds.
    pub fn search(&self, query: &str, k: usize) -> Vec<Hit> {
        let snapshot = self.snapshot.read().clone();
        blended_search(
            &snapshot.corpora,
            self.normalizer.as_ref(),
            query,
            k,
            self.config.retrieval.per_corpus_k,
        )
    }

    /// One chat turn. Infallible by contract: every failure mode inside
    /// degrades to a deterministic static message.
    pub async fn chat(
        &self,
        client_id: &str,
        text: &str,
        profile: Option<&ProfileHints>,
    ) -> ChatReply {
        if !self.limiter.allow(client_id) {
            tracing::info!(client = %client_id, "Rate limited");
            return reply(RATE_LIMIT_MESSAGE.to_string(), Backend::Fallback, Intent::General, Vec::new(), false);
        }

        let intent = detect_intent(text);
        let snapshot = self.snapshot.read().clone();

        let candidates = blended_search(
            &snapshot.corpora,
            self.normalizer.as_ref(),
            text,
            self.config.retrieval.top_k,
            self.config.retrieval.per_corpus_k,
        );
        let context = filter_context(
            &candidates,
            intent,
            self.config.retrieval.min_context_score,
            self.config.retrieval.context_cap,
        );

        // Empty context is "answer ungrounded", which the weak-context
        // routing branch handles; it is not an error.
        let top_score = context.first().map(|hit| hit.score).unwrap_or(0.0);
        let snippets: Vec<String> = context.iter().map(|hit| hit.text.clone()).collect();
        let citations: Vec<Citation> = context.iter().map(Citation::from_hit).collect();

        let prompt = build_prompt(text, &snippets, profile, intent);
        let estimated_tokens = estimate_tokens(&prompt);

        let local_available = match &self.local {
            Some(backend) => backend.is_ready().await,
            None => false,
        };
        // A budget rejection is normal control flow: the router simply sees
        // the remote backend as unavailable for this turn.
        let remote_available = match &self.remote {
            Some(backend) => backend.is_ready().await && self.budget.budget_ok(estimated_tokens),
            None => false,
        };

        let choice = choose_backend(
            intent,
            top_score,
            local_available,
            remote_available,
            &self.config.routing,
        );
        tracing::debug!(
            intent = intent.as_str(),
            top_score = top_score,
            choice = ?choice,
            "Turn routed"
        );

        match choice {
            Backend::Local => {
                let answer = self.generate_local(&prompt).await;
                if !answer.is_empty() {
                    return reply(answer, Backend::Local, intent, citations, false);
                }
                // Empty means "no answer": cascade to remote, then fallback.
                if remote_available {
                    if let Some((answer, cached)) = self
                        .generate_remote(&prompt, &snippets, estimated_tokens, text)
                        .await
                    {
                        return reply(answer, Backend::Remote, intent, citations, cached);
                    }
                }
                reply(FALLBACK_MESSAGE.to_string(), Backend::Fallback, intent, citations, false)
            }
            Backend::Remote => {
                if let Some((answer, cached)) = self
                    .generate_remote(&prompt, &snippets, estimated_tokens, text)
                    .await
                {
                    return reply(answer, Backend::Remote, intent, citations, cached);
                }
                if local_available {
                    let answer = self.generate_local(&prompt).await;
                    if !answer.is_empty() {
                        return reply(answer, Backend::Local, intent, citations, false);
                    }
                }
                reply(FALLBACK_MESSAGE.to_string(), Backend::Fallback, intent, citations, false)
            }
            Backend::Fallback => {
                reply(FALLBACK_MESSAGE.to_string(), Backend::Fallback, intent, citations, false)
            }
        }
    }

    /// Health summary.
    pub fn stats(&self) -> EngineStats {
        let snapshot = self.snapshot.read().clone();
        let corpora: std::collections::HashMap<String, usize> = snapshot
            .corpora
            .iter()
            .map(|(corpus, _)| (corpus.id.clone(), corpus.passages.len()))
            .collect();
        let total_passages = corpora.values().sum();
        EngineStats {
            corpora,
            total_passages,
            local_configured: self.local.is_some(),
            remote_configured: self.remote.is_some(),
            budget_spent: self.budget.spent(),
            budget_ceiling: self.budget.ceiling(),
        }
    }

    async fn generate_local(&self, prompt: &str) -> String {
        let backend = match &self.local {
            Some(backend) => backend,
            None => return String::new(),
        };
        self.generate_bounded(backend, prompt).await
    }

    /// Remote generation with the response cache in front: probe by content
    /// hash, then reserve the estimated budget under one lock before
    /// generating, so concurrent turns cannot jointly exceed the daily
    /// ceiling. A reservation for a call that yields no text is refunded.
    /// Returns None when the backend produced no answer.
    async fn generate_remote(
        &self,
        prompt: &str,
        snippets: &[String],
        estimated_tokens: usize,
        user_text: &str,
    ) -> Option<(String, bool)> {
        let backend = self.remote.as_ref()?;
        let key = cache_key(
            &self.normalizer.normalize(user_text),
            snippets,
            backend.model_id(),
        );

        if let Some(text) = self.cache.get(key) {
            tracing::debug!("Response cache hit");
            return Some((text, true));
        }

        if !self.budget.try_reserve(estimated_tokens) {
            tracing::debug!("Daily budget exhausted, skipping remote call");
            return None;
        }

        let text = self.generate_bounded(backend, prompt).await;
        if text.is_empty() {
            self.budget.refund(estimated_tokens);
            return None;
        }

        self.cache.put(key, text.clone());
        Some((text, false))
    }

    /// Apply the generation timeout. A timed-out call is abandoned and
    /// reported as the empty-string sentinel.
    async fn generate_bounded(&self, backend: &Arc<dyn GenerationBackend>, prompt: &str) -> String {
        let timeout = Duration::from_secs(self.config.routing.generation_timeout_secs);
        match tokio::time::timeout(timeout, backend.generate(prompt, self.config.routing.max_tokens))
            .await
        {
            Ok(text) => text,
            Err(_) => {
                tracing::warn!(model = backend.model_id(), "Generation timed out");
                String::new()
            }
        }
    }
}

fn build_snapshot(
    config: &EngineConfig,
    normalizer: &dyn TextNormalizer,
) -> (CorpusSnapshot, ReloadSummary) {
    let mut corpora = Vec::with_capacity(config.corpora.len());
    let mut summary = ReloadSummary::default();

    for corpus_config in &config.corpora {
        let passages = store::load_file(&corpus_config.id, &corpus_config.file);
        summary
            .corpora
            .insert(corpus_config.id.clone(), passages.len());
        let corpus = Corpus::build(corpus_config.id.clone(), passages, normalizer);
        corpora.push((corpus, config.corpus_weight(&corpus_config.id)));
    }

    (CorpusSnapshot { corpora }, summary)
}

fn reply(
    text: String,
    backend: Backend,
    intent: Intent,
    citations: Vec<Citation>,
    cached: bool,
) -> ChatReply {
    ChatReply {
        id: Uuid::new_v4(),
        text,
        backend,
        intent,
        citations,
        cached,
    }
}
