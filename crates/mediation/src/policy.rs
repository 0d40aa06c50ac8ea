//! Safety and tone policy.
//!
//! The policy is plain data: the unsafe-topic patterns, the diagnosis-request
//! phrases, the two fixed replies and the softening replacements. The built-in
//! defaults are used unless a YAML policy file overrides some or all of them.
//!
//! ```yaml
//! unsafePatterns: ["kill myself", "suicide"]
//! diagnosisPatterns: ["do i have", "diagnose me"]
//! crisisReply: "Please talk to a trusted grown-up."
//! replacements:
//!   - from: you should
//!     to: you could
//! ```

use crate::normalize::Replacement;
use serde::{Deserialize, Serialize};
use spark_core::{AppError, AppResult};
use std::path::Path;

/// Regular expressions for crisis and sensitive topics, matched against the
/// lower-cased question.
pub const DEFAULT_UNSAFE_PATTERNS: &[&str] = &[
    r"kill myself",
    r"suicide",
    r"self harm",
    r"cut myself",
    r"want to die",
    r"eating disorder",
    r"starving myself",
    r"abuse",
    r"sexual",
    r"drugs",
];

/// Plain phrases that ask for a clinical label, matched by containment.
pub const DEFAULT_DIAGNOSIS_PATTERNS: &[&str] = &[
    "do i have",
    "am i autistic",
    "am i adhd",
    "diagnose me",
    "what disorder do i have",
];

pub const DEFAULT_CRISIS_REPLY: &str = "That sounds like a really big and serious topic. 💛 \
I'm not a doctor or therapist, but talking to a trusted grown-up, \
teacher, parent, or counselor is the best next step. \
You matter and you're not alone 🌈";

pub const DEFAULT_DIAGNOSIS_REPLY: &str = "As an AI agent, I can't diagnose, but I *can* help explain \
what those words mean in a friendly way 💡 \
A real doctor or psychologist is the one who helps with diagnoses. \
You're awesome just as you are 💙";

/// Directive phrasing and its softer alternative, in application order.
pub const DEFAULT_REPLACEMENTS: &[(&str, &str)] = &[
    ("you should", "you could"),
    ("you must", "it might help to"),
    ("the correct way", "one way"),
];

/// Complete mediation policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Policy {
    /// Regex patterns; a match classifies the question as unsafe
    pub unsafe_patterns: Vec<String>,

    /// Substrings; a match classifies the question as a diagnosis request
    pub diagnosis_patterns: Vec<String>,

    /// Reply for unsafe questions
    pub crisis_reply: String,

    /// Reply for diagnosis requests
    pub diagnosis_reply: String,

    /// Ordered literal replacements applied to engine output
    pub replacements: Vec<Replacement>,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            unsafe_patterns: DEFAULT_UNSAFE_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
            diagnosis_patterns: DEFAULT_DIAGNOSIS_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
            crisis_reply: DEFAULT_CRISIS_REPLY.to_string(),
            diagnosis_reply: DEFAULT_DIAGNOSIS_REPLY.to_string(),
            replacements: DEFAULT_REPLACEMENTS
                .iter()
                .map(|(from, to)| Replacement::new(*from, *to))
                .collect(),
        }
    }
}

impl Policy {
    /// Check the parts of the policy that do not need compiling.
    ///
    /// Pattern and replacement validity is checked when the classifier and
    /// normalizer are built from the policy.
    pub fn validate(&self) -> AppResult<()> {
        if self.crisis_reply.trim().is_empty() {
            return Err(AppError::Policy("crisisReply must not be empty".to_string()));
        }
        if self.diagnosis_reply.trim().is_empty() {
            return Err(AppError::Policy(
                "diagnosisReply must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load the policy from a YAML file, or the built-in policy when `path` is `None`.
///
/// Keys missing from the file keep their built-in values.
pub fn load_policy(path: Option<&Path>) -> AppResult<Policy> {
    let policy = match path {
        Some(path) => {
            let content = std::fs::read_to_string(path).map_err(|e| {
                AppError::Policy(format!("Failed to read policy at {:?}: {}", path, e))
            })?;

            let policy: Policy = serde_yaml::from_str(&content).map_err(|e| {
                AppError::Policy(format!("Failed to parse policy at {:?}: {}", path, e))
            })?;

            tracing::info!(
                "Loaded policy from {:?} ({} unsafe, {} diagnosis, {} replacements)",
                path,
                policy.unsafe_patterns.len(),
                policy.diagnosis_patterns.len(),
                policy.replacements.len()
            );
            policy
        }
        None => {
            tracing::debug!("Using built-in policy");
            Policy::default()
        }
    };

    policy.validate()?;
    Ok(policy)
}
