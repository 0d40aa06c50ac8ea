//! Ask command handler.
//!
//! Runs a single question through the mediation pipeline and prints the answer.

use clap::Args;
use spark_core::{config::AppConfig, AppError, AppResult};
use spark_mediation::build_dispatcher;
use std::path::PathBuf;
use std::time::Duration;

/// Ask a question
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: Option<String>,

    /// Read the question from a file
    #[arg(short, long, conflicts_with = "question")]
    pub file: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        config.validate()?;

        let question = self.get_question()?;
        let dispatcher = build_dispatcher(config)?;
        let timeout = Duration::from_secs(config.engine.timeout_secs);

        let answer = super::respond_within(&dispatcher, &question, timeout).await?;

        if self.json {
            let output = serde_json::json!({
                "answer": answer.text,
                "source": answer.source,
                "agent": "Spark",
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("{}", answer.text);
        }

        Ok(())
    }

    /// Question from the positional argument or the file.
    fn get_question(&self) -> AppResult<String> {
        if let Some(ref question) = self.question {
            return Ok(question.clone());
        }

        match self.file {
            Some(ref path) => Ok(std::fs::read_to_string(path)?),
            None => Err(AppError::Config("No question provided".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_required() {
        let cmd = AskCommand {
            question: None,
            file: None,
            json: false,
        };
        assert!(matches!(cmd.get_question(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_question_from_argument() {
        let cmd = AskCommand {
            question: Some("What is dyslexia?".to_string()),
            file: None,
            json: true,
        };
        assert_eq!(cmd.get_question().unwrap(), "What is dyslexia?");
    }
}
