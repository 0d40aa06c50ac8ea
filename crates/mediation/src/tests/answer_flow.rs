//! End-to-end behaviour of `AnswerDispatcher::answer`.

use super::support::{dispatcher_with, ScriptedEngine};
use crate::cache::ResponseCache;
use crate::classify::{ClassificationOutcome, ClassificationRule, Classifier, Matcher};
use crate::dispatch::{AnswerDispatcher, AnswerSource, FixedReplies};
use crate::normalize::{Normalizer, Replacement};
use crate::policy::{Policy, DEFAULT_CRISIS_REPLY, DEFAULT_DIAGNOSIS_REPLY};
use spark_core::AppError;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_unsafe_questions_get_crisis_reply_without_engine() {
    let engine = Arc::new(ScriptedEngine::new("should never be used"));
    let dispatcher = dispatcher_with(engine.clone());

    for question in [
        "I want to KILL MYSELF",
        "what is an eating disorder",
        "Is it bad if I keep starving myself?",
        "my uncle's abuse",
    ] {
        assert_eq!(
            dispatcher.answer(question).await.unwrap(),
            DEFAULT_CRISIS_REPLY,
            "{question}"
        );
    }

    assert_eq!(engine.calls(), 0);
}

#[tokio::test]
async fn test_diagnosis_requests_get_deflection_without_engine() {
    let engine = Arc::new(ScriptedEngine::new("should never be used"));
    let dispatcher = dispatcher_with(engine.clone());

    assert_eq!(
        dispatcher.answer("Do I have autism?").await.unwrap(),
        DEFAULT_DIAGNOSIS_REPLY
    );
    assert_eq!(
        dispatcher.answer("What disorder do I have?").await.unwrap(),
        DEFAULT_DIAGNOSIS_REPLY
    );
    assert_eq!(engine.calls(), 0);
}

#[tokio::test]
async fn test_ordinary_question_is_normalized_engine_output() {
    let engine = Arc::new(
        ScriptedEngine::new("unused").with_answer(
            "How can I focus better?",
            "You should try a new routine and you must ask for help.",
        ),
    );
    let dispatcher = dispatcher_with(engine.clone());

    assert_eq!(
        dispatcher.answer("How can I focus better?").await.unwrap(),
        "You could try a new routine and it might help to ask for help."
    );
    assert_eq!(engine.questions(), vec!["How can I focus better?".to_string()]);
}

#[tokio::test]
async fn test_repeated_question_served_from_cache() {
    let engine = Arc::new(ScriptedEngine::new(
        "Dyslexia means your brain reads words in its own way! 📚",
    ));
    let dispatcher = dispatcher_with(engine.clone());

    let first = dispatcher.answer("What is dyslexia?").await.unwrap();
    let second = dispatcher.respond("What is dyslexia?").await.unwrap();

    assert_eq!(first, second.text);
    assert_eq!(second.source, AnswerSource::Cache);
    assert_eq!(engine.calls(), 1);
}

#[tokio::test]
async fn test_fixed_replies_are_cached() {
    let engine = Arc::new(ScriptedEngine::new("unused"));
    let dispatcher = dispatcher_with(engine.clone());

    dispatcher.answer("am i adhd?").await.unwrap();
    assert_eq!(
        dispatcher.cache().get("am i adhd?").as_deref(),
        Some(DEFAULT_DIAGNOSIS_REPLY)
    );

    let again = dispatcher.respond("am i adhd?").await.unwrap();
    assert_eq!(again.source, AnswerSource::Cache);
}

#[tokio::test]
async fn test_unsafe_takes_precedence_over_diagnosis() {
    let engine = Arc::new(ScriptedEngine::new("unused"));
    let dispatcher = dispatcher_with(engine.clone());

    assert_eq!(
        dispatcher.classifier().classify("I want to die, am I autistic?"),
        ClassificationOutcome::Unsafe
    );
    assert_eq!(
        dispatcher.answer("I want to die, am I autistic?").await.unwrap(),
        DEFAULT_CRISIS_REPLY
    );
    assert_eq!(engine.calls(), 0);
}

#[tokio::test]
async fn test_classification_ignores_case() {
    let engine = Arc::new(ScriptedEngine::new("unused"));
    let dispatcher = dispatcher_with(engine.clone());

    let upper = dispatcher.respond("AM I ADHD?").await.unwrap();
    let lower = dispatcher.respond("am i adhd?").await.unwrap();

    assert_eq!(upper.source, AnswerSource::DiagnosisDeflection);
    assert_eq!(lower.source, AnswerSource::DiagnosisDeflection);
    assert_eq!(upper.text, lower.text);
}

#[tokio::test]
async fn test_cache_keys_are_case_sensitive() {
    let engine = Arc::new(
        ScriptedEngine::new("unused")
            .with_answer("What is ADHD?", "ADHD brains are full of energy!")
            .with_answer("what is adhd?", "ADHD is one way a brain can work."),
    );
    let dispatcher = dispatcher_with(engine.clone());

    let a = dispatcher.answer("What is ADHD?").await.unwrap();
    let b = dispatcher.answer("what is adhd?").await.unwrap();

    assert_ne!(a, b);
    assert_eq!(engine.calls(), 2);
    assert_eq!(dispatcher.cache().len(), 2);
}

#[tokio::test]
async fn test_cache_checked_before_classification() {
    let engine = Arc::new(ScriptedEngine::new("unused"));
    let dispatcher = dispatcher_with(engine.clone());

    dispatcher.cache().put("tell me about drugs", "seeded");
    let answer = dispatcher.respond("tell me about drugs").await.unwrap();

    assert_eq!(answer.text, "seeded");
    assert_eq!(answer.source, AnswerSource::Cache);
}

#[tokio::test]
async fn test_blank_question_is_ordinary() {
    let engine = Arc::new(ScriptedEngine::new("Ask me anything about brains! 🧠"));
    let dispatcher = dispatcher_with(engine.clone());

    let answer = dispatcher.respond("   ").await.unwrap();
    assert_eq!(answer.source, AnswerSource::Engine);
    assert_eq!(engine.questions(), vec!["   ".to_string()]);
}

#[tokio::test]
async fn test_engine_failure_propagates_and_is_not_cached() {
    let engine = Arc::new(ScriptedEngine::new("Autism is a different way of thinking! 💙"));
    let dispatcher = dispatcher_with(engine.clone());

    engine.set_failing(true);
    let err = dispatcher.answer("What is autism?").await.unwrap_err();
    assert!(matches!(err, AppError::EngineUnavailable(_)));
    assert!(err.to_string().contains("503"));
    assert!(dispatcher.cache().is_empty());

    engine.set_failing(false);
    let answer = dispatcher.answer("What is autism?").await.unwrap();
    assert_eq!(answer, "Autism is a different way of thinking! 💙");
    assert_eq!(engine.calls(), 2);
}

#[tokio::test]
async fn test_empty_engine_output_is_engine_failure() {
    let engine = Arc::new(ScriptedEngine::new("  \n"));
    let dispatcher = dispatcher_with(engine.clone());

    let err = dispatcher.answer("What is dyscalculia?").await.unwrap_err();
    assert!(err.is_engine_unavailable());
    assert!(dispatcher.cache().get("What is dyscalculia?").is_none());
}

#[tokio::test]
async fn test_answer_erased_by_replacements_is_engine_failure() {
    let policy = Policy {
        replacements: vec![Replacement::new("you must", "")],
        ..Policy::default()
    };
    let engine = Arc::new(ScriptedEngine::new("you must"));
    let dispatcher =
        AnswerDispatcher::from_policy(&policy, Arc::new(ResponseCache::new()), engine.clone())
            .unwrap();

    let err = dispatcher.answer("What is ADHD?").await.unwrap_err();
    assert!(err.is_engine_unavailable());
    assert!(dispatcher.cache().is_empty());

    // Removal rules are fine while something is left over
    let engine = Arc::new(ScriptedEngine::new("you must rest"));
    let dispatcher =
        AnswerDispatcher::from_policy(&policy, Arc::new(ResponseCache::new()), engine).unwrap();
    assert_eq!(dispatcher.answer("What is ADHD?").await.unwrap(), " rest");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_identical_questions_share_one_engine_call() {
    let engine = Arc::new(
        ScriptedEngine::new("you should celebrate your strengths!")
            .with_delay(Duration::from_millis(50)),
    );
    let dispatcher = Arc::new(dispatcher_with(engine.clone()));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let dispatcher = Arc::clone(&dispatcher);
            tokio::spawn(async move { dispatcher.answer("What is Tourette's?").await })
        })
        .collect();

    for handle in handles {
        assert_eq!(
            handle.await.unwrap().unwrap(),
            "you could celebrate your strengths!"
        );
    }

    assert_eq!(engine.calls(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_distinct_questions_each_reach_engine() {
    let engine = Arc::new(
        ScriptedEngine::new("Brains are cool!").with_delay(Duration::from_millis(20)),
    );
    let dispatcher = Arc::new(dispatcher_with(engine.clone()));

    let questions = ["What is ADHD?", "What is autism?", "What is dyslexia?"];
    let handles: Vec<_> = questions
        .into_iter()
        .map(|question| {
            let dispatcher = Arc::clone(&dispatcher);
            tokio::spawn(async move { dispatcher.answer(question).await })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(engine.calls(), 3);
    assert_eq!(dispatcher.cache().len(), 3);
}

#[tokio::test]
async fn test_bounded_cache_requeries_after_eviction() {
    let engine = Arc::new(ScriptedEngine::new("Every brain is unique!"));
    let dispatcher = AnswerDispatcher::from_policy(
        &Policy::default(),
        Arc::new(ResponseCache::from_capacity(Some(1))),
        engine.clone(),
    )
    .unwrap();

    dispatcher.answer("What is ADHD?").await.unwrap();
    dispatcher.answer("What is autism?").await.unwrap();
    dispatcher.answer("What is ADHD?").await.unwrap();

    assert_eq!(engine.calls(), 3);
    assert_eq!(dispatcher.cache().len(), 1);
}

#[tokio::test]
async fn test_synthetic_rules_and_replies() {
    let engine = Arc::new(ScriptedEngine::new("Always stay calm."));
    let dispatcher = AnswerDispatcher::new(
        Classifier::new(vec![ClassificationRule::new(
            Matcher::pattern(r"\bscary\b").unwrap(),
            ClassificationOutcome::Unsafe,
        )]),
        Normalizer::new(vec![Replacement::new("Always", "Try to")]).unwrap(),
        FixedReplies {
            crisis: "Find a grown-up.".to_string(),
            diagnosis: "Ask a doctor.".to_string(),
        },
        Arc::new(ResponseCache::new()),
        engine.clone(),
    );

    assert_eq!(
        dispatcher.answer("Something SCARY happened").await.unwrap(),
        "Find a grown-up."
    );
    // No diagnosis rules in this classifier
    assert_eq!(
        dispatcher.answer("do i have adhd").await.unwrap(),
        "Try to stay calm."
    );
    assert_eq!(engine.calls(), 1);
}
