//! Tone normalization for generated answers.
//!
//! Directive phrasing ("you should", "you must") is swapped for softer
//! alternatives by literal substring replacement. Matching is case-sensitive
//! and ignores word boundaries; each rule also fires on its sentence-initial
//! form, so "You should" becomes "You could". Nothing else in the text is
//! touched: no truncation, list markers and line breaks survive as-is.

use serde::{Deserialize, Serialize};
use spark_core::{AppError, AppResult};

/// A single literal replacement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replacement {
    pub from: String,
    pub to: String,
}

impl Replacement {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// The declared form, followed by the capitalised form when it differs.
    fn forms(&self) -> Vec<(String, String)> {
        let mut forms = vec![(self.from.clone(), self.to.clone())];
        let capitalised = capitalise_first(&self.from);
        if capitalised != self.from {
            forms.push((capitalised, capitalise_first(&self.to)));
        }
        forms
    }
}

fn capitalise_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Ordered replacement rules, validated once at construction.
#[derive(Debug, Clone)]
pub struct Normalizer {
    // One entry per declared rule, holding its expanded forms
    rules: Vec<Vec<(String, String)>>,
}

impl Normalizer {
    /// Build a normalizer from replacements in application order.
    ///
    /// # Errors
    /// `AppError::Policy` when a trigger is empty, or when the output of a
    /// rule contains the trigger of a later rule (the later rule would
    /// rewrite text the earlier one produced).
    pub fn new(replacements: Vec<Replacement>) -> AppResult<Self> {
        for replacement in &replacements {
            if replacement.from.is_empty() {
                return Err(AppError::Policy(
                    "Replacement trigger must not be empty".to_string(),
                ));
            }
        }

        let rules: Vec<Vec<(String, String)>> =
            replacements.iter().map(Replacement::forms).collect();

        for (i, earlier) in rules.iter().enumerate() {
            for later in &rules[i + 1..] {
                for (_, output) in earlier {
                    if let Some((trigger, _)) =
                        later.iter().find(|(trigger, _)| output.contains(trigger.as_str()))
                    {
                        return Err(AppError::Policy(format!(
                            "Replacement output {:?} contains later trigger {:?}",
                            output, trigger
                        )));
                    }
                }
            }
        }

        Ok(Self { rules })
    }

    /// Rewrite `text` with every rule, in declared order.
    pub fn normalize(&self, text: &str) -> String {
        let mut result = text.to_string();
        for (from, to) in self.rules.iter().flatten() {
            if result.contains(from.as_str()) {
                result = result.replace(from.as_str(), to);
            }
        }
        result
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
