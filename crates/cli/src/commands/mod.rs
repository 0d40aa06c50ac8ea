//! Command handlers for the Spark CLI.

pub mod ask;
pub mod classify;
pub mod serve;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use classify::ClassifyCommand;
pub use serve::ServeCommand;

use spark_core::{AppError, AppResult};
use spark_mediation::{Answer, AnswerDispatcher};
use std::time::Duration;

/// Run one dispatch under a deadline; running out of time counts as an
/// engine failure.
pub(crate) async fn respond_within(
    dispatcher: &AnswerDispatcher,
    question: &str,
    timeout: Duration,
) -> AppResult<Answer> {
    tokio::time::timeout(timeout, dispatcher.respond(question))
        .await
        .map_err(|_| {
            AppError::EngineUnavailable(format!("no answer within {}s", timeout.as_secs()))
        })?
}
