use anyhow::Result;
use tracing::{info, warn};

/// A fallible way of producing `O` from `I`. An `Err` hands control to the next strategy.
#[async_trait::async_trait]
pub trait Strategy<I: ?Sized + Sync, O: Send>: Send + Sync {
    fn name(&self) -> &'static str;

    async fn attempt(&self, input: &I) -> Result<O>;
}

/// The final, total step of a chain. It cannot fail.
#[async_trait::async_trait]
pub trait LastResort<I: ?Sized + Sync, O: Send>: Send + Sync {
    fn name(&self) -> &'static str;

    async fn produce(&self, input: &I) -> O;
}

/// Ordered strategies tried in turn; the last resort runs only when all of them fail.
pub struct StrategyChain<I: ?Sized + Sync, O: Send> {
    strategies: Vec<Box<dyn Strategy<I, O>>>,
    last_resort: Box<dyn LastResort<I, O>>,
}

impl<I: ?Sized + Sync, O: Send> StrategyChain<I, O> {
    pub fn new(last_resort: impl LastResort<I, O> + 'static) -> Self {
        Self {
            strategies: Vec::new(),
            last_resort: Box::new(last_resort),
        }
    }

    /// Append a strategy; strategies run in the order they were added.
    pub fn with_strategy(mut self, strategy: impl Strategy<I, O> + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    pub async fn run(&self, input: &I) -> O {
        for strategy in &self.strategies {
            match strategy.attempt(input).await {
                Ok(output) => {
                    info!(strategy = strategy.name(), "strategy succeeded");
                    return output;
                }
                Err(e) => {
                    warn!(strategy = strategy.name(), error = %e, "strategy failed, trying next");
                }
            }
        }
        info!(strategy = self.last_resort.name(), "falling back to last resort");
        self.last_resort.produce(input).await
    }
}
