//! Confirmation loop tests
//!
//! Exercises the gate through scripted humans and backends:
//! - Only a case-insensitive "yes" confirms
//! - Every rejection costs exactly one revision round
//! - Revisions replace the candidate; the confirmed task is the last one shown
//! - Revision failures abort the loop without retry

use pretty_assertions::assert_eq;
use research_core::gate::{CHANGES_PROMPT, CONFIRM_PROMPT};
use research_core::{
    ConfirmationGate, GenerationError, PromptTemplates, ResearchError, ResearchTask,
    StructuredGenerator,
};
use research_test_utils::{scripted, ChannelEvent, ScriptedBackend, ScriptedChannel};
use serde_json::json;
use std::sync::Arc;

fn gate(backend: &Arc<ScriptedBackend>, channel: &Arc<ScriptedChannel>) -> ConfirmationGate {
    ConfirmationGate::new(
        Arc::clone(backend) as Arc<dyn StructuredGenerator>,
        Arc::clone(channel) as Arc<dyn research_core::HumanChannel>,
        Arc::new(PromptTemplates::default()),
    )
}

fn t1() -> ResearchTask {
    ResearchTask::draft(
        "Eiffel Tower",
        vec!["Who built it?".into(), "Why was it kept?".into()],
    )
}

#[tokio::test]
async fn yes_returns_same_task_confirmed() {
    let (backend, channel) = scripted(ScriptedBackend::new(), ScriptedChannel::new(["YeS"]));

    let confirmed = gate(&backend, &channel).confirm(t1()).await.unwrap();

    assert!(confirmed.is_confirmed());
    assert_eq!(confirmed.topic(), t1().topic());
    assert_eq!(confirmed.queries(), t1().queries());
    assert!(backend.structured_calls().is_empty());
}

#[tokio::test]
async fn task_is_presented_verbatim_before_question() {
    let (backend, channel) = scripted(ScriptedBackend::new(), ScriptedChannel::new(["yes"]));

    gate(&backend, &channel).confirm(t1()).await.unwrap();

    assert_eq!(
        channel.events(),
        vec![
            ChannelEvent::Presented {
                topic: "Eiffel Tower".into(),
                queries: vec!["Who built it?".into(), "Why was it kept?".into()],
            },
            ChannelEvent::AskedYesNo(CONFIRM_PROMPT.into()),
        ]
    );
}

#[tokio::test]
async fn rejection_revises_and_confirms_new_task() {
    let backend = ScriptedBackend::new().with_task(
        "Eiffel Tower Military History",
        &["What was its role in WWI radio interception?"],
    );
    let channel = ScriptedChannel::new(["no", "focus only on military history", "yes"]);
    let (backend, channel) = scripted(backend, channel);

    let confirmed = gate(&backend, &channel).confirm(t1()).await.unwrap();

    assert!(confirmed.is_confirmed());
    assert_eq!(confirmed.topic(), "Eiffel Tower Military History");
    assert_ne!(confirmed.topic(), t1().topic());

    let calls = backend.structured_calls();
    assert_eq!(calls.len(), 1);
    let prompt = &calls[0].prompt;
    assert!(prompt.contains("Topic: Eiffel Tower"));
    assert!(prompt.contains("Who built it?\nWhy was it kept?"));
    assert!(prompt.contains("focus only on military history"));

    assert!(channel
        .events()
        .contains(&ChannelEvent::AskedFreeText(CHANGES_PROMPT.into())));
    assert_eq!(channel.presented().len(), 2);
}

#[tokio::test]
async fn three_rejections_yield_fourth_generation() {
    let backend = ScriptedBackend::new()
        .with_task("gen 2", &["q2"])
        .with_task("gen 3", &["q3"])
        .with_task("gen 4", &["q4"]);
    let channel = ScriptedChannel::new([
        "no", "change a", "No", "change b", "nope", "change c", "yes",
    ]);
    let (backend, channel) = scripted(backend, channel);

    let confirmed = gate(&backend, &channel).confirm(t1()).await.unwrap();

    assert_eq!(backend.structured_calls().len(), 3);
    assert_eq!(confirmed.topic(), "gen 4");
    assert_eq!(confirmed.queries(), ["q4".to_string()]);
    assert!(confirmed.is_confirmed());
}

#[tokio::test]
async fn near_misses_never_confirm() {
    let backend = ScriptedBackend::new()
        .with_task("r1", &[])
        .with_task("r2", &[])
        .with_task("r3", &[])
        .with_task("r4", &[]);
    // "", "y", "maybe", "yes " each followed by an (empty) change request
    let channel = ScriptedChannel::new(["", "", "y", "", "maybe", "", "yes ", "", "YES"]);
    let (backend, channel) = scripted(backend, channel);

    let confirmed = gate(&backend, &channel).confirm(t1()).await.unwrap();

    assert_eq!(backend.structured_calls().len(), 4);
    assert_eq!(confirmed.topic(), "r4");
}

#[tokio::test]
async fn revised_candidates_are_unconfirmed_even_if_backend_claims_otherwise() {
    let backend = ScriptedBackend::new().with_structured(Ok(json!({
        "topic": "claimed",
        "queries": ["q"],
        "confirmed_by_user": true
    })));
    // Second decision is not "yes": a confirmed-by-backend candidate must
    // still go through the human.
    let channel = ScriptedChannel::new(["no", "x", "no"]);
    let (backend, channel) = scripted(backend, channel);

    let err = gate(&backend, &channel)
        .with_max_revisions(1)
        .confirm(t1())
        .await
        .unwrap_err();

    assert!(matches!(err, ResearchError::RevisionLimitExceeded { limit: 1 }));
    assert_eq!(channel.presented().len(), 2);
}

#[tokio::test]
async fn revision_schema_error_aborts_without_retry() {
    let backend = ScriptedBackend::new()
        .with_structured(Err(GenerationError::Schema("missing topic".into())))
        .with_task("never used", &[]);
    let channel = ScriptedChannel::new(["no", "more detail", "yes"]);
    let (backend, channel) = scripted(backend, channel);

    let err = gate(&backend, &channel).confirm(t1()).await.unwrap_err();

    assert!(matches!(err, ResearchError::GenerationSchema(_)));
    assert_eq!(backend.structured_calls().len(), 1);
}

#[tokio::test]
async fn malformed_revision_is_schema_error() {
    let backend = ScriptedBackend::new().with_structured(Ok(json!({"queries": ["q"]})));
    let channel = ScriptedChannel::new(["no", "more detail"]);
    let (backend, channel) = scripted(backend, channel);

    let err = gate(&backend, &channel).confirm(t1()).await.unwrap_err();
    assert!(matches!(err, ResearchError::GenerationSchema(_)));
}

#[tokio::test]
async fn revision_limit_checked_before_asking_for_changes() {
    let (backend, channel) = scripted(ScriptedBackend::new(), ScriptedChannel::new(["no"]));

    let err = gate(&backend, &channel)
        .with_max_revisions(0)
        .confirm(t1())
        .await
        .unwrap_err();

    assert!(matches!(err, ResearchError::RevisionLimitExceeded { limit: 0 }));
    assert!(!channel
        .events()
        .iter()
        .any(|e| matches!(e, ChannelEvent::AskedFreeText(_))));
    assert!(backend.structured_calls().is_empty());
}

#[tokio::test]
async fn closed_input_is_channel_error() {
    let (backend, channel) = scripted(ScriptedBackend::new(), ScriptedChannel::new(Vec::<String>::new()));

    let err = gate(&backend, &channel).confirm(t1()).await.unwrap_err();
    assert!(matches!(err, ResearchError::Channel(_)));
}

#[tokio::test]
async fn empty_query_list_is_presented_and_confirmable() {
    let (backend, channel) = scripted(ScriptedBackend::new(), ScriptedChannel::new(["yes"]));

    let confirmed = gate(&backend, &channel)
        .confirm(ResearchTask::draft("Degenerate", vec![]))
        .await
        .unwrap();

    assert!(confirmed.queries().is_empty());
    assert_eq!(channel.presented(), vec![("Degenerate".to_string(), vec![])]);
}
