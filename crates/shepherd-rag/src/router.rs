//! Model Router: decides, per turn, whether the local seq2seq model, the
//! remote large model, or the static fallback answers. Retrieval confidence
//! gates the choice: the narrow local model is cheap and on-topic but cannot
//! generalize, while the remote model is broad but costly and ungrounded.
//! Pure function, no state across turns.

use crate::config::RoutingConfig;
use crate::types::{Backend, Intent};

/// Evaluated in fixed priority order. Always returns exactly one backend.
pub fn choose_backend(
    intent: Intent,
    top_score: f32,
    local_available: bool,
    remote_available: bool,
    config: &RoutingConfig,
) -> Backend {
    // 1. Nothing to generate with: degrade gracefully, never error.
    if !local_available && !remote_available {
        return Backend::Fallback;
    }

    // 2. Thin retrieval evidence on open-ended intents favors broad generation.
    if remote_available
        && matches!(intent, Intent::Advice | Intent::General)
        && top_score < config.weak_context_threshold
    {
        return Backend::Remote;
    }

    // 3. Theology-flavored turns go local once confidence clears the floor.
    if matches!(intent, Intent::Teachings | Intent::Destiny) {
        if local_available && top_score >= config.teaching_floor {
            return Backend::Local;
        }
        if remote_available {
            return Backend::Remote;
        }
        return Backend::Fallback;
    }

    // 4. Everything else: local with modest confidence, else remote, else fallback.
    if local_available && top_score >= config.general_floor {
        return Backend::Local;
    }
    if remote_available {
        return Backend::Remote;
    }
    Backend::Fallback
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RoutingConfig {
        RoutingConfig {
            weak_context_threshold: 0.35,
            teaching_floor: 0.30,
            general_floor: 0.15,
            max_tokens: 256,
            generation_timeout_secs: 30,
        }
    }

    const INTENTS: [Intent; 4] = [
        Intent::Teachings,
        Intent::Destiny,
        Intent::Advice,
        Intent::General,
    ];

    #[test]
    fn router_is_total() {
        let config = config();
        for intent in INTENTS {
            for local in [false, true] {
                for remote in [false, true] {
                    for score in [0.0, 0.14, 0.15, 0.29, 0.30, 0.34, 0.35, 0.5, 1.0] {
                        // Must neither panic nor return anything outside the enum.
                        let backend = choose_backend(intent, score, local, remote, &config);
                        assert!(matches!(
                            backend,
                            Backend::Local | Backend::Remote | Backend::Fallback
                        ));
                    }
                }
            }
        }
    }

    #[test]
    fn total_outage_always_falls_back() {
        let config = config();
        for intent in INTENTS {
            for score in [0.0, 0.3, 0.9] {
                assert_eq!(
                    choose_backend(intent, score, false, false, &config),
                    Backend::Fallback
                );
            }
        }
    }

    #[test]
    fn destiny_with_confident_context_goes_local() {
        assert_eq!(
            choose_backend(Intent::Destiny, 0.40, true, true, &config()),
            Backend::Local
        );
    }

    #[test]
    fn weak_general_context_prefers_remote_over_local() {
        assert_eq!(
            choose_backend(Intent::General, 0.10, true, true, &config()),
            Backend::Remote
        );
    }

    #[test]
    fn weak_advice_context_prefers_remote() {
        assert_eq!(
            choose_backend(Intent::Advice, 0.20, true, true, &config()),
            Backend::Remote
        );
    }

    #[test]
    fn teachings_below_floor_defers_to_remote() {
        assert_eq!(
            choose_backend(Intent::Teachings, 0.20, true, true, &config()),
            Backend::Remote
        );
    }

    #[test]
    fn teachings_below_floor_without_remote_falls_back() {
        assert_eq!(
            choose_backend(Intent::Teachings, 0.20, true, false, &config()),
            Backend::Fallback
        );
    }

    #[test]
    fn teachings_local_only_needs_the_floor() {
        assert_eq!(
            choose_backend(Intent::Teachings, 0.30, true, false, &config()),
            Backend::Local
        );
    }

    #[test]
    fn general_with_confident_context_goes_local() {
        // 0.5 >= weak threshold, so rule 2 does not fire even with remote up.
        assert_eq!(
            choose_backend(Intent::General, 0.5, true, true, &config()),
            Backend::Local
        );
    }

    #[test]
    fn general_between_floors_without_remote_goes_local() {
        assert_eq!(
            choose_backend(Intent::General, 0.20, true, false, &config()),
            Backend::Local
        );
    }

    #[test]
    fn general_below_floor_without_remote_falls_back() {
        assert_eq!(
            choose_backend(Intent::General, 0.10, true, false, &config()),
            Backend::Fallback
        );
    }

    #[test]
    fn remote_only_serves_every_intent() {
        let config = config();
        for intent in INTENTS {
            assert_eq!(
                choose_backend(intent, 0.5, false, true, &config),
                Backend::Remote
            );
        }
    }
}
