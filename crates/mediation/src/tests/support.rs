//! Test doubles for the generation engine.

use crate::cache::ResponseCache;
use crate::dispatch::AnswerDispatcher;
use crate::engine::QueryEngine;
use crate::policy::Policy;
use spark_core::{AppError, AppResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Engine with canned answers that records every question it receives.
pub struct ScriptedEngine {
    answers: HashMap<String, String>,
    fallback: String,
    delay: Option<Duration>,
    failing: AtomicBool,
    calls: AtomicUsize,
    questions: Mutex<Vec<String>>,
}

impl ScriptedEngine {
    pub fn new(fallback: &str) -> Self {
        Self {
            answers: HashMap::new(),
            fallback: fallback.to_string(),
            delay: None,
            failing: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
            questions: Mutex::new(Vec::new()),
        }
    }

    pub fn with_answer(mut self, question: &str, answer: &str) -> Self {
        self.answers.insert(question.to_string(), answer.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn questions(&self) -> Vec<String> {
        self.questions.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl QueryEngine for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn query(&self, question: &str) -> AppResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.questions.lock().unwrap().push(question.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::Llm("upstream returned 503".to_string()));
        }

        Ok(self
            .answers
            .get(question)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone()))
    }
}

/// Dispatcher over the built-in policy, an unbounded cache and `engine`.
pub fn dispatcher_with(engine: Arc<ScriptedEngine>) -> AnswerDispatcher {
    AnswerDispatcher::from_policy(&Policy::default(), Arc::new(ResponseCache::new()), engine)
        .unwrap()
}
