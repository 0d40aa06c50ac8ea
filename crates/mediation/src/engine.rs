//! Retrieval/generation engine seam.
//!
//! The dispatcher only needs `query(question) -> text`. [`LlmQueryEngine`]
//! provides it by sending the question, under the Spark persona, to an
//! [`LlmClient`]. Any failure comes back as `AppError::EngineUnavailable`.

use spark_core::config::AppConfig;
use spark_core::{AppError, AppResult};
use spark_llm::{create_client, LlmClient, LlmRequest};
use std::sync::Arc;

/// Persona and house rules for generated answers.
pub const SPARK_SYSTEM_PROMPT: &str = "\
You are Spark, a friendly and kind Brain Buddy. You help kids and teens \
(ages 8-17) learn about neurodiversity in a fun, positive way and support \
their neurodivergent peers.

Follow these rules every time:
- Use simple words and short sentences, like talking to a friend.
- Be encouraging, positive and empowering.
- Explain neurodiversity as: 'Everyone's brain is unique and special.'
- Talk about strengths first for ADHD, autism, dyslexia and similar.
- Do not use the word disorder.
- Never give medical advice or diagnoses.
- If a topic feels unsafe, sad or too serious, suggest talking to a trusted grown-up.
- Never make anyone feel broken or wrong.
- End with something positive or a friendly emoji.
- Encourage learning with Youth for Neurodiversity (youthfornd.org).
";

/// Anything that can turn an ordinary question into a candidate answer.
#[async_trait::async_trait]
pub trait QueryEngine: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Produce raw answer text for `question`.
    ///
    /// Failures must be returned as errors, never as placeholder text.
    async fn query(&self, question: &str) -> AppResult<String>;
}

/// Generation engine backed by an LLM provider.
pub struct LlmQueryEngine {
    client: Arc<dyn LlmClient>,
    model: String,
    system_prompt: String,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

impl LlmQueryEngine {
    /// Create an engine using the Spark persona and no sampling overrides.
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            system_prompt: SPARK_SYSTEM_PROMPT.to_string(),
            max_tokens: None,
            temperature: None,
        }
    }

    /// Build the engine from application configuration.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let api_key = config.resolve_api_key();
        let client = create_client(
            &config.engine.provider,
            config.engine.endpoint.as_deref(),
            api_key.as_deref(),
        )?;

        let mut engine =
            Self::new(client, &config.engine.model).with_max_tokens(config.engine.max_tokens);
        if let Some(temperature) = config.engine.temperature {
            engine = engine.with_temperature(temperature);
        }
        Ok(engine)
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    fn build_request(&self, question: &str) -> LlmRequest {
        let mut request =
            LlmRequest::new(question, &self.model).with_system(self.system_prompt.as_str());
        if let Some(max_tokens) = self.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }
        if let Some(temperature) = self.temperature {
            request = request.with_temperature(temperature);
        }
        request
    }
}

#[async_trait::async_trait]
impl QueryEngine for LlmQueryEngine {
    fn name(&self) -> &str {
        self.client.provider_name()
    }

    async fn query(&self, question: &str) -> AppResult<String> {
        let request = self.build_request(question);

        let response = self.client.complete(&request).await.map_err(|e| match e {
            AppError::EngineUnavailable(_) => e,
            other => AppError::EngineUnavailable(other.to_string()),
        })?;

        tracing::debug!(
            model = %response.model,
            prompt_tokens = response.usage.prompt_tokens,
            completion_tokens = response.usage.completion_tokens,
            "Engine produced answer"
        );

        Ok(response.content)
    }
}
