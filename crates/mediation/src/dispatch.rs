//! Answer dispatching.
//!
//! For each question, in order:
//! 1. Return the cached answer if there is one.
//! 2. Classify the question.
//! 3. Unsafe: cache and return the crisis reply.
//! 4. Diagnosis request: cache and return the deflection reply.
//! 5. Ordinary: query the engine, normalize, cache and return.
//!
//! Only ordinary questions reach the engine. Calls for the same question are
//! serialized, so concurrent requests for one novel question cost a single
//! engine call; the others wait and read the cached result. A failed engine
//! call caches nothing and surfaces as `AppError::EngineUnavailable`.

use crate::cache::ResponseCache;
use crate::classify::{ClassificationOutcome, Classifier};
use crate::engine::QueryEngine;
use crate::normalize::Normalizer;
use crate::policy::Policy;
use serde::Serialize;
use spark_core::{AppError, AppResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Mutex as AsyncMutex;

/// Where an answer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerSource {
    Cache,
    Crisis,
    DiagnosisDeflection,
    Engine,
}

/// Final answer text and its origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Answer {
    pub text: String,
    pub source: AnswerSource,
}

impl Answer {
    fn new(text: impl Into<String>, source: AnswerSource) -> Self {
        Self {
            text: text.into(),
            source,
        }
    }
}

/// The two policy-fixed replies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedReplies {
    pub crisis: String,
    pub diagnosis: String,
}

impl FixedReplies {
    pub fn from_policy(policy: &Policy) -> Self {
        Self {
            crisis: policy.crisis_reply.clone(),
            diagnosis: policy.diagnosis_reply.clone(),
        }
    }
}

impl Default for FixedReplies {
    fn default() -> Self {
        Self::from_policy(&Policy::default())
    }
}

type FlightSlots = Mutex<HashMap<String, Arc<AsyncMutex<()>>>>;

fn lock_slots(slots: &FlightSlots) -> MutexGuard<'_, HashMap<String, Arc<AsyncMutex<()>>>> {
    slots.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Registration of one caller in the per-question slot table.
///
/// Dropping it removes the slot once no other caller holds it.
struct Flight<'a> {
    slots: &'a FlightSlots,
    question: &'a str,
    slot: Arc<AsyncMutex<()>>,
}

impl<'a> Flight<'a> {
    fn join(slots: &'a FlightSlots, question: &'a str) -> Self {
        let slot = lock_slots(slots)
            .entry(question.to_string())
            .or_default()
            .clone();
        Self {
            slots,
            question,
            slot,
        }
    }
}

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        let mut slots = lock_slots(self.slots);
        // Held by the table and by us only: nobody else is waiting
        if Arc::strong_count(&self.slot) == 2
            && slots
                .get(self.question)
                .is_some_and(|slot| Arc::ptr_eq(slot, &self.slot))
        {
            slots.remove(self.question);
        }
    }
}

/// Orchestrates cache, classifier, engine and normalizer.
pub struct AnswerDispatcher {
    classifier: Classifier,
    normalizer: Normalizer,
    replies: FixedReplies,
    cache: Arc<ResponseCache>,
    engine: Arc<dyn QueryEngine>,
    in_flight: FlightSlots,
}

impl AnswerDispatcher {
    /// Assemble a dispatcher from prepared parts.
    pub fn new(
        classifier: Classifier,
        normalizer: Normalizer,
        replies: FixedReplies,
        cache: Arc<ResponseCache>,
        engine: Arc<dyn QueryEngine>,
    ) -> Self {
        Self {
            classifier,
            normalizer,
            replies,
            cache,
            engine,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Build the classifier, normalizer and replies described by `policy`.
    pub fn from_policy(
        policy: &Policy,
        cache: Arc<ResponseCache>,
        engine: Arc<dyn QueryEngine>,
    ) -> AppResult<Self> {
        policy.validate()?;
        Ok(Self::new(
            Classifier::from_policy(policy)?,
            Normalizer::new(policy.replacements.clone())?,
            FixedReplies::from_policy(policy),
            cache,
            engine,
        ))
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Answer text for `question`.
    pub async fn answer(&self, question: &str) -> AppResult<String> {
        self.respond(question).await.map(|answer| answer.text)
    }

    /// Answer for `question`, with its source.
    pub async fn respond(&self, question: &str) -> AppResult<Answer> {
        tracing::debug!(question, "Dispatching question");

        if let Some(text) = self.cache.get(question) {
            tracing::info!("Answer served from cache");
            return Ok(Answer::new(text, AnswerSource::Cache));
        }

        let outcome = self.classifier.classify(question);
        tracing::info!(%outcome, "Question classified");

        match outcome {
            ClassificationOutcome::Unsafe => {
                Ok(self.store(question, &self.replies.crisis, AnswerSource::Crisis))
            }
            ClassificationOutcome::DiagnosisRequest => Ok(self.store(
                question,
                &self.replies.diagnosis,
                AnswerSource::DiagnosisDeflection,
            )),
            ClassificationOutcome::Ordinary => self.respond_from_engine(question).await,
        }
    }

    fn store(&self, question: &str, text: &str, source: AnswerSource) -> Answer {
        self.cache.put(question, text);
        Answer::new(text, source)
    }

    async fn respond_from_engine(&self, question: &str) -> AppResult<Answer> {
        let flight = Flight::join(&self.in_flight, question);
        let _turn = flight.slot.lock().await;

        // A caller ahead of us may have finished while we waited
        if let Some(text) = self.cache.get(question) {
            tracing::info!("Answer served from cache after waiting on in-flight query");
            return Ok(Answer::new(text, AnswerSource::Cache));
        }

        let raw = self.engine.query(question).await.map_err(|e| {
            tracing::warn!(engine = self.engine.name(), "Engine query failed: {}", e);
            match e {
                AppError::EngineUnavailable(_) => e,
                other => AppError::EngineUnavailable(other.to_string()),
            }
        })?;

        if raw.trim().is_empty() {
            tracing::warn!(engine = self.engine.name(), "Engine returned an empty answer");
            return Err(AppError::EngineUnavailable(format!(
                "{} returned an empty answer",
                self.engine.name()
            )));
        }

        let text = self.normalizer.normalize(&raw);
        if text.trim().is_empty() {
            tracing::warn!(engine = self.engine.name(), "Answer empty after normalization");
            return Err(AppError::EngineUnavailable(format!(
                "{} answer was empty after normalization",
                self.engine.name()
            )));
        }
        if text != raw {
            tracing::debug!("Directive phrasing softened");
        }

        Ok(self.store(question, &text, AnswerSource::Engine))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EchoEngine {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl QueryEngine for EchoEngine {
        fn name(&self) -> &str {
            "echo"
        }

        async fn query(&self, question: &str) -> AppResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("you should know: {question}"))
        }
    }

    fn dispatcher() -> (AnswerDispatcher, Arc<EchoEngine>) {
        let engine = Arc::new(EchoEngine {
            calls: AtomicUsize::new(0),
        });
        let dispatcher = AnswerDispatcher::from_policy(
            &Policy::default(),
            Arc::new(ResponseCache::new()),
            engine.clone(),
        )
        .unwrap();
        (dispatcher, engine)
    }

    #[tokio::test]
    async fn test_sources() {
        let (dispatcher, engine) = dispatcher();

        let first = dispatcher.respond("What is autism?").await.unwrap();
        assert_eq!(first.source, AnswerSource::Engine);
        assert_eq!(first.text, "you could know: What is autism?");

        let second = dispatcher.respond("What is autism?").await.unwrap();
        assert_eq!(second, Answer::new(first.text, AnswerSource::Cache));

        let crisis = dispatcher.respond("I want to cut myself").await.unwrap();
        assert_eq!(crisis.source, AnswerSource::Crisis);

        let deflection = dispatcher.respond("diagnose me please").await.unwrap();
        assert_eq!(deflection.source, AnswerSource::DiagnosisDeflection);

        assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_flight_slot_released() {
        let (dispatcher, _engine) = dispatcher();
        dispatcher.answer("What is dyspraxia?").await.unwrap();
        assert!(lock_slots(&dispatcher.in_flight).is_empty());
    }

    #[test]
    fn test_invalid_policy_rejected() {
        let policy = Policy {
            unsafe_patterns: vec!["[".to_string()],
            ..Policy::default()
        };
        let engine = Arc::new(EchoEngine {
            calls: AtomicUsize::new(0),
        });
        let result =
            AnswerDispatcher::from_policy(&policy, Arc::new(ResponseCache::new()), engine);
        assert!(matches!(result, Err(AppError::Policy(_))));
    }
}
