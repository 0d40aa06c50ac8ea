//! Answer mediation for Spark.
//!
//! Sits between the user and the generation engine: classifies each question,
//! deflects unsafe and diagnosis questions with fixed replies, softens the
//! tone of generated answers and caches every final answer.
//!
//! # Example
//! ```no_run
//! use spark_mediation::build_dispatcher;
//! use spark_core::AppConfig;
//!
//! # async fn example() -> spark_core::AppResult<()> {
//! let dispatcher = build_dispatcher(&AppConfig::load()?)?;
//! println!("{}", dispatcher.answer("What is dyslexia?").await?);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod classify;
pub mod dispatch;
pub mod engine;
pub mod normalize;
pub mod policy;

#[cfg(test)]
mod tests;

pub use cache::ResponseCache;
pub use classify::{ClassificationOutcome, ClassificationRule, Classifier, Matcher};
pub use dispatch::{Answer, AnswerDispatcher, AnswerSource, FixedReplies};
pub use engine::{LlmQueryEngine, QueryEngine, SPARK_SYSTEM_PROMPT};
pub use normalize::{Normalizer, Replacement};
pub use policy::{load_policy, Policy};

use spark_core::{AppConfig, AppResult};
use std::sync::Arc;

/// Wire a dispatcher from configuration: policy file (or built-in policy),
/// cache bound and LLM-backed engine.
pub fn build_dispatcher(config: &AppConfig) -> AppResult<AnswerDispatcher> {
    let policy = load_policy(config.resolve_policy_file().as_deref())?;
    let cache = Arc::new(ResponseCache::from_capacity(config.cache.capacity));
    let engine = Arc::new(LlmQueryEngine::from_config(config)?);

    tracing::info!(
        provider = %config.engine.provider,
        model = %config.engine.model,
        cache_capacity = ?cache.capacity(),
        "Answer dispatcher ready"
    );

    AnswerDispatcher::from_policy(&policy, cache, engine)
}
