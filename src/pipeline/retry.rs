//! Retry-vs-fail policy.
//!
//! | outcome           | on-block    | on-all-errors | never-retry |
//! |-------------------|-------------|---------------|-------------|
//! | Success           | success     | success       | success     |
//! | SoftNotFound      | fail        | fail          | fail        |
//! | ServerError       | retry*      | retry*        | fail        |
//! | Blocked           | retry*      | retry*        | fail        |
//! | SelectorFailure   | fail        | retry*        | fail        |
//!
//! `*` only while `attempt < max_attempts`; otherwise fail.

use serde::Serialize;

use crate::models::{Outcome, RetryStrategy};

/// What to do after classifying an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RetryDecision {
    Retry,
    FinalFailure,
    FinalSuccess,
}

/// Decide the next step for `outcome` seen on attempt `attempt` (1-based).
pub fn decide(
    outcome: &Outcome,
    strategy: RetryStrategy,
    attempt: u32,
    max_attempts: u32,
) -> RetryDecision {
    match outcome {
        Outcome::Success { .. } => RetryDecision::FinalSuccess,
        Outcome::SoftNotFound => RetryDecision::FinalFailure,
        Outcome::ServerError { .. } | Outcome::Blocked { .. } => {
            decide_transient(strategy, attempt, max_attempts)
        }
        Outcome::SelectorFailure { .. } => match strategy {
            RetryStrategy::OnAllErrors if attempt < max_attempts => RetryDecision::Retry,
            _ => RetryDecision::FinalFailure,
        },
    }
}

/// Decision for transient failures, navigation errors included.
pub fn decide_transient(strategy: RetryStrategy, attempt: u32, max_attempts: u32) -> RetryDecision {
    match strategy {
        RetryStrategy::NeverRetry => RetryDecision::FinalFailure,
        _ if attempt < max_attempts => RetryDecision::Retry,
        _ => RetryDecision::FinalFailure,
    }
}

/// Retry settings for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub strategy: RetryStrategy,
    pub max_attempts: u32,
}

impl RetryPolicy {
    /// Build from the configured strategy and retry count.
    ///
    /// `never-retry` allows a single attempt; the others allow the first
    /// attempt plus `max_retries` retries, capped at `u32::MAX` attempts.
    pub fn new(strategy: RetryStrategy, max_retries: u32) -> Self {
        Self {
            strategy,
            max_attempts: max_request_retries(strategy, max_retries).saturating_add(1),
        }
    }

    pub fn decide(&self, outcome: &Outcome, attempt: u32) -> RetryDecision {
        decide(outcome, self.strategy, attempt, self.max_attempts)
    }

    pub fn decide_transient(&self, attempt: u32) -> RetryDecision {
        decide_transient(self.strategy, attempt, self.max_attempts)
    }
}

/// Retries handed to the crawl collaborator for a strategy.
pub fn max_request_retries(strategy: RetryStrategy, max_retries: u32) -> u32 {
    match strategy {
        RetryStrategy::NeverRetry => 0,
        RetryStrategy::OnBlock | RetryStrategy::OnAllErrors => max_retries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::RetryDecision::*;
    use crate::models::RetryStrategy::*;
    use crate::models::{SelectorKind, Snapshot};

    fn outcomes() -> Vec<(&'static str, Outcome)> {
        let shot = Snapshot::png(vec![1]);
        vec![
            (
                "success",
                Outcome::Success {
                    content: "c".into(),
                    screenshot: shot.clone(),
                },
            ),
            ("not_found", Outcome::SoftNotFound),
            (
                "server_error",
                Outcome::ServerError {
                    status: 503,
                    full_page_screenshot: None,
                },
            ),
            (
                "blocked",
                Outcome::Blocked {
                    full_page_screenshot: shot.clone(),
                },
            ),
            (
                "selector",
                Outcome::SelectorFailure {
                    kind: SelectorKind::Content,
                    full_page_screenshot: shot,
                },
            ),
        ]
    }

    fn expected(name: &str, strategy: RetryStrategy, attempts_left: bool) -> RetryDecision {
        match (name, strategy) {
            ("success", _) => FinalSuccess,
            ("not_found", _) => FinalFailure,
            ("server_error" | "blocked", NeverRetry) => FinalFailure,
            ("server_error" | "blocked", _) if attempts_left => Retry,
            ("selector", OnAllErrors) if attempts_left => Retry,
            _ => FinalFailure,
        }
    }

    #[test]
    fn test_decision_table() {
        for strategy in [OnBlock, OnAllErrors, NeverRetry] {
            for (name, outcome) in outcomes() {
                for (attempt, max) in [(1, 6), (5, 6), (6, 6), (7, 6), (1, 1)] {
                    let got = decide(&outcome, strategy, attempt, max);
                    let want = expected(name, strategy, attempt < max);
                    assert_eq!(
                        got, want,
                        "{name} under {strategy} at attempt {attempt}/{max}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_decision_is_deterministic() {
        for (_, outcome) in outcomes() {
            let a = decide(&outcome, OnBlock, 2, 3);
            let b = decide(&outcome, OnBlock, 2, 3);
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_not_found_never_retries() {
        for strategy in [OnBlock, OnAllErrors, NeverRetry] {
            assert_eq!(decide(&Outcome::SoftNotFound, strategy, 1, 100), FinalFailure);
        }
    }

    #[test]
    fn test_policy_attempt_budget() {
        assert_eq!(RetryPolicy::new(OnBlock, 5).max_attempts, 6);
        assert_eq!(RetryPolicy::new(OnAllErrors, 0).max_attempts, 1);
        assert_eq!(RetryPolicy::new(NeverRetry, 5).max_attempts, 1);
    }

    #[test]
    fn test_policy_saturates_huge_retry_count() {
        let policy = RetryPolicy::new(OnBlock, u32::MAX);
        assert_eq!(policy.max_attempts, u32::MAX);
        assert_eq!(policy.decide_transient(1), Retry);
        assert_eq!(policy.decide_transient(u32::MAX), FinalFailure);
        assert_eq!(RetryPolicy::new(NeverRetry, u32::MAX).max_attempts, 1);
    }

    #[test]
    fn test_transient_decision() {
        let policy = RetryPolicy::new(OnBlock, 2);
        assert_eq!(policy.decide_transient(1), Retry);
        assert_eq!(policy.decide_transient(2), Retry);
        assert_eq!(policy.decide_transient(3), FinalFailure);
        assert_eq!(RetryPolicy::new(NeverRetry, 2).decide_transient(1), FinalFailure);
    }
}
