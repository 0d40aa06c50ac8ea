//! Question classification.
//!
//! A classifier is an ordered list of rules, each pairing a lexical matcher
//! with the outcome it produces. The question is lower-cased once, rules are
//! tried in order and the first match decides. A question no rule matches is
//! `Ordinary`.
//!
//! The policy-built classifier places every unsafe rule before every
//! diagnosis rule, so a question that matches both is `Unsafe`.

use crate::policy::Policy;
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use spark_core::{AppError, AppResult};
use std::fmt;

/// Result of classifying one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationOutcome {
    /// Crisis or sensitive topic; deflect to a trusted adult
    Unsafe,
    /// The asker wants a clinical label assigned to them
    DiagnosisRequest,
    /// Everything else; forwarded to the engine
    Ordinary,
}

impl ClassificationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unsafe => "unsafe",
            Self::DiagnosisRequest => "diagnosis_request",
            Self::Ordinary => "ordinary",
        }
    }
}

impl fmt::Display for ClassificationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lexical test applied to the lower-cased question.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Regex search anywhere in the text
    Pattern(Regex),
    /// Plain substring containment
    Phrase(String),
}

impl Matcher {
    /// Compile a case-insensitive regex matcher.
    pub fn pattern(pattern: &str) -> AppResult<Self> {
        RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map(Self::Pattern)
            .map_err(|e| AppError::Policy(format!("Invalid pattern {:?}: {}", pattern, e)))
    }

    /// Build a substring matcher. The phrase is lower-cased to match the
    /// lower-cased question.
    pub fn phrase(phrase: &str) -> Self {
        Self::Phrase(phrase.to_lowercase())
    }

    fn is_match(&self, lowered: &str) -> bool {
        match self {
            Self::Pattern(regex) => regex.is_match(lowered),
            Self::Phrase(phrase) => lowered.contains(phrase.as_str()),
        }
    }

    /// The source text of the matcher.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pattern(regex) => regex.as_str(),
            Self::Phrase(phrase) => phrase,
        }
    }
}

/// One (matcher, outcome) pair.
#[derive(Debug, Clone)]
pub struct ClassificationRule {
    pub matcher: Matcher,
    pub outcome: ClassificationOutcome,
}

impl ClassificationRule {
    pub fn new(matcher: Matcher, outcome: ClassificationOutcome) -> Self {
        Self { matcher, outcome }
    }
}

/// Ordered, immutable rule list.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    rules: Vec<ClassificationRule>,
}

impl Classifier {
    /// Build a classifier from rules in evaluation order.
    pub fn new(rules: Vec<ClassificationRule>) -> Self {
        Self { rules }
    }

    /// Unsafe regex rules first, then diagnosis phrase rules.
    pub fn from_pattern_sets<S: AsRef<str>>(
        unsafe_patterns: &[S],
        diagnosis_patterns: &[S],
    ) -> AppResult<Self> {
        let mut rules = Vec::with_capacity(unsafe_patterns.len() + diagnosis_patterns.len());

        for pattern in unsafe_patterns {
            rules.push(ClassificationRule::new(
                Matcher::pattern(pattern.as_ref())?,
                ClassificationOutcome::Unsafe,
            ));
        }

        for phrase in diagnosis_patterns {
            rules.push(ClassificationRule::new(
                Matcher::phrase(phrase.as_ref()),
                ClassificationOutcome::DiagnosisRequest,
            ));
        }

        Ok(Self::new(rules))
    }

    /// Build the classifier described by a policy.
    pub fn from_policy(policy: &Policy) -> AppResult<Self> {
        Self::from_pattern_sets(&policy.unsafe_patterns, &policy.diagnosis_patterns)
    }

    /// First rule matching the question, if any.
    pub fn matching_rule(&self, question: &str) -> Option<&ClassificationRule> {
        let lowered = question.to_lowercase();
        self.rules.iter().find(|rule| rule.matcher.is_match(&lowered))
    }

    /// Classify a question.
    pub fn classify(&self, question: &str) -> ClassificationOutcome {
        self.matching_rule(question)
            .map(|rule| rule.outcome)
            .unwrap_or(ClassificationOutcome::Ordinary)
    }

    pub fn rules(&self) -> &[ClassificationRule] {
        &self.rules
    }
}
