/*!
 * Per-segment strategy fallback.
 *
 * `Primary(strategy)` moves to `Retry(fallback)` on failure, and any failure
 * while retrying (or a primary failure with no fallback) ends in `Exhausted`.
 * A primary strategy that already is the fallback model gets no retry.
 */

use log::{debug, warn};
use serde::Serialize;
use std::future::Future;

use crate::errors::TranslationError;
use crate::translation::registry::TranslationStrategy;

/// State of a segment's strategy chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainState {
    Primary(TranslationStrategy),
    Retry(TranslationStrategy),
    Exhausted,
}

/// A strategy that failed for the segment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrategyFailure {
    pub strategy: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct StrategyChain {
    state: ChainState,
    fallback: Option<TranslationStrategy>,
    failures: Vec<StrategyFailure>,
}

impl StrategyChain {
    pub fn new(primary: TranslationStrategy, fallback: Option<TranslationStrategy>) -> Self {
        let fallback = if primary.is_fallback() { None } else { fallback };
        Self {
            state: ChainState::Primary(primary),
            fallback,
            failures: Vec::new(),
        }
    }

    pub fn state(&self) -> &ChainState {
        &self.state
    }

    /// Strategy to try next, `None` once exhausted
    pub fn current(&self) -> Option<&TranslationStrategy> {
        match &self.state {
            ChainState::Primary(strategy) | ChainState::Retry(strategy) => Some(strategy),
            ChainState::Exhausted => None,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.state == ChainState::Exhausted
    }

    pub fn failures(&self) -> &[StrategyFailure] {
        &self.failures
    }

    /// Record a failure of the current strategy and advance.
    /// A fatal error exhausts the chain without trying the fallback.
    pub fn fail(&mut self, error: &TranslationError) {
        let state = std::mem::replace(&mut self.state, ChainState::Exhausted);
        match state {
            ChainState::Primary(strategy) => {
                self.failures.push(StrategyFailure {
                    strategy: strategy.to_string(),
                    message: error.to_string(),
                });
                if let Some(fallback) = self.fallback.take().filter(|_| !error.is_fatal()) {
                    debug!("Strategy {} failed, retrying with {}", strategy.name(), fallback);
                    self.state = ChainState::Retry(fallback);
                }
            }
            ChainState::Retry(strategy) => {
                self.failures.push(StrategyFailure {
                    strategy: strategy.to_string(),
                    message: error.to_string(),
                });
            }
            ChainState::Exhausted => {}
        }
    }

    /// Drive the chain with `attempt` until a strategy succeeds or none is left.
    /// Returns the strategy that succeeded with its output.
    pub async fn run<F, Fut>(&mut self, mut attempt: F) -> Option<(TranslationStrategy, String)>
    where
        F: FnMut(TranslationStrategy) -> Fut,
        Fut: Future<Output = Result<String, TranslationError>>,
    {
        while let Some(strategy) = self.current().cloned() {
            match attempt(strategy.clone()).await {
                Ok(output) => return Some((strategy, output)),
                Err(e) => {
                    warn!("Translation with {} failed: {}", strategy, e);
                    self.fail(&e);
                }
            }
        }
        None
    }
}
