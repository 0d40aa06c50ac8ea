//! Classify command handler.
//!
//! Reports the policy outcome for a question and the rule that decided it.
//! Nothing is sent to the engine.

use clap::Args;
use spark_core::{config::AppConfig, AppResult};
use spark_mediation::{load_policy, ClassificationOutcome, Classifier};

/// Show how a question would be classified
#[derive(Args, Debug)]
pub struct ClassifyCommand {
    /// The question to classify
    pub question: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ClassifyCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing classify command");

        let policy = load_policy(config.resolve_policy_file().as_deref())?;
        let classifier = Classifier::from_policy(&policy)?;

        let rule = classifier.matching_rule(&self.question);
        let outcome = rule
            .map(|rule| rule.outcome)
            .unwrap_or(ClassificationOutcome::Ordinary);
        let matched = rule.map(|rule| rule.matcher.as_str());

        if self.json {
            let output = serde_json::json!({
                "outcome": outcome,
                "matched": matched,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            match matched {
                Some(pattern) => println!("{} (matched {:?})", outcome, pattern),
                None => println!("{}", outcome),
            }
        }

        Ok(())
    }
}
