use forge_blueprint::{PlacementMode, Vec3};
use forge_core::{
    BuildRejection, BuildService, ForgeConfig, GateRejection, GenerationError, OwnerId, ReviewError,
};
use forge_test_utils::{
    cottage_response, fast_config, invalid_response, response_text, blueprint_doc, PatternSink,
    RecordingSink, ScriptedBackend,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

fn service(backend: &Arc<ScriptedBackend>, sink: &Arc<RecordingSink>) -> BuildService {
    BuildService::new(fast_config(), Arc::clone(backend) as _, Arc::clone(sink) as _).with_raster_seed(7)
}

#[tokio::test]
async fn request_inspect_accept() {
    let backend = Arc::new(ScriptedBackend::always(cottage_response()));
    let sink = Arc::new(RecordingSink::new());
    let service = service(&backend, &sink);
    let owner = OwnerId::new("alex");

    let proposal = service
        .request_build(&owner, Vec3::new(100, 64, 100), "a cozy cottage")
        .await
        .unwrap();
    assert_eq!(proposal.description, "Cozy cobblestone cottage");
    assert_eq!(proposal.source_label, "gemini-2.0-flash");

    let summary = service.inspect(&owner).unwrap();
    assert_eq!(summary.definition_count, 3);
    assert_eq!(summary.anchor, Vec3::new(100, 64, 100));
    assert!(summary.remaining > Duration::ZERO);

    let outcome = service.accept(&owner).await.unwrap();
    assert!(outcome.report.is_clean());
    assert_eq!(outcome.command_count, 4);
    assert_eq!(outcome.report.executed, 4);
    assert_eq!(sink.len(), 4);
    assert!(service.store().is_empty());

    let commands = sink.commands();
    assert!(commands.iter().any(|c| c.origin_mode() == PlacementMode::HollowCuboid));
    assert!(commands
        .iter()
        .any(|c| c.to_string() == "/setblock 102 65 100 minecraft:air replace"));
}

#[tokio::test]
async fn prompt_carries_request_and_anchor() {
    let backend = Arc::new(ScriptedBackend::always(cottage_response()));
    let sink = Arc::new(RecordingSink::new());
    let service = service(&backend, &sink);

    service
        .request_build(&OwnerId::new("alex"), Vec3::new(-5, 70, 12), "  stone bridge  ")
        .await
        .unwrap();

    let calls = backend.calls();
    assert_eq!(calls.len(), 1);
    let (prompt, model) = &calls[0];
    assert!(prompt.contains("User Request: stone bridge"));
    assert!(prompt.contains("-5, 70, 12"));
    assert_eq!(model, "gemini-2.0-flash");
}

#[tokio::test]
async fn second_request_rejected_while_first_in_flight() {
    let hold = Arc::new(Notify::new());
    let backend = Arc::new(ScriptedBackend::always(cottage_response()).with_hold(Arc::clone(&hold)));
    let entered = backend.entered();
    let sink = Arc::new(RecordingSink::new());
    let service = Arc::new(service(&backend, &sink));
    let owner = OwnerId::new("alex");

    let first = tokio::spawn({
        let service = Arc::clone(&service);
        let owner = owner.clone();
        async move { service.request_build(&owner, Vec3::ZERO, "tower").await }
    });
    entered.notified().await;

    let second = service.request_build(&owner, Vec3::ZERO, "bridge").await;
    assert!(matches!(second, Err(BuildRejection::Busy(GateRejection::OwnerBusy(_)))));
    assert!(service.gate().is_in_flight(&owner));

    hold.notify_one();
    first.await.unwrap().unwrap();
    assert!(!service.gate().is_in_flight(&owner));

    // Slot is free again once the first request settles
    hold.notify_one();
    service.request_build(&owner, Vec3::ZERO, "bridge").await.unwrap();
    assert_eq!(backend.call_count(), 2);
}

#[tokio::test]
async fn global_cap_rejects_other_owners() {
    let hold = Arc::new(Notify::new());
    let backend = Arc::new(ScriptedBackend::always(cottage_response()).with_hold(Arc::clone(&hold)));
    let entered = backend.entered();
    let sink = Arc::new(RecordingSink::new());
    let mut config = fast_config();
    config.generation.max_concurrent = 1;
    let service = Arc::new(BuildService::new(config, Arc::clone(&backend) as _, Arc::clone(&sink) as _));

    let first = tokio::spawn({
        let service = Arc::clone(&service);
        async move { service.request_build(&OwnerId::new("alex"), Vec3::ZERO, "tower").await }
    });
    entered.notified().await;

    let other = service.request_build(&OwnerId::new("sam"), Vec3::ZERO, "hut").await;
    assert!(matches!(other, Err(BuildRejection::Busy(GateRejection::AtCapacity(1)))));

    hold.notify_one();
    first.await.unwrap().unwrap();
    assert_eq!(service.gate().stats().total_rejected, 1);
}

#[tokio::test]
async fn slot_released_after_backend_error() {
    let backend = Arc::new(ScriptedBackend::new());
    backend.push_error(GenerationError::Timeout { secs: 120 });
    backend.push_response(cottage_response());
    let sink = Arc::new(RecordingSink::new());
    let service = service(&backend, &sink);
    let owner = OwnerId::new("alex");

    let err = service.request_build(&owner, Vec3::ZERO, "tower").await.unwrap_err();
    assert!(matches!(err, BuildRejection::Generation(GenerationError::Timeout { .. })));
    assert!(err.is_retryable());
    assert!(!service.gate().is_in_flight(&owner));
    assert!(service.inspect(&owner).is_err());

    service.request_build(&owner, Vec3::ZERO, "tower").await.unwrap();
}

#[tokio::test]
async fn invalid_blueprint_keeps_previous_proposal() {
    let backend = Arc::new(ScriptedBackend::new());
    backend.push_response(cottage_response());
    backend.push_response(invalid_response());
    let sink = Arc::new(RecordingSink::new());
    let service = service(&backend, &sink);
    let owner = OwnerId::new("alex");

    service.request_build(&owner, Vec3::ZERO, "cottage").await.unwrap();
    let err = service.request_build(&owner, Vec3::ZERO, "tower").await.unwrap_err();

    assert!(matches!(err, BuildRejection::Invalid(_)));
    assert!(!err.is_retryable());
    assert_eq!(service.inspect(&owner).unwrap().description, "Cozy cobblestone cottage");
}

#[tokio::test]
async fn new_proposal_replaces_pending_one() {
    let backend = Arc::new(ScriptedBackend::new());
    backend.push_response(cottage_response());
    backend.push_response(response_text(
        "Lonely pillar",
        &blueprint_doc(json!([
            { "position": { "x": 0, "y": 0, "z": 0 }, "block": { "id": "stone" } }
        ])),
    ));
    let sink = Arc::new(RecordingSink::new());
    let service = service(&backend, &sink);
    let owner = OwnerId::new("alex");

    service.request_build(&owner, Vec3::ZERO, "cottage").await.unwrap();
    service.request_build(&owner, Vec3::ZERO, "pillar").await.unwrap();

    assert_eq!(service.store().len(), 1);
    assert_eq!(service.inspect(&owner).unwrap().description, "Lonely pillar");
}

#[tokio::test]
async fn empty_prompt_rejected_without_backend_call() {
    let backend = Arc::new(ScriptedBackend::always(cottage_response()));
    let sink = Arc::new(RecordingSink::new());
    let service = service(&backend, &sink);

    let err = service.request_build(&OwnerId::new("alex"), Vec3::ZERO, "   ").await.unwrap_err();
    assert!(matches!(err, BuildRejection::EmptyPrompt));
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn review_without_proposal() {
    let backend = Arc::new(ScriptedBackend::new());
    let sink = Arc::new(RecordingSink::new());
    let service = service(&backend, &sink);
    let owner = OwnerId::new("nobody");

    assert_eq!(
        service.accept(&owner).await.unwrap_err(),
        ReviewError::NoPendingProposal(owner.clone())
    );
    assert!(service.deny(&owner).is_err());
    assert!(service.inspect(&owner).is_err());
    assert!(sink.is_empty());
}

#[tokio::test]
async fn deny_discards_without_building() {
    let backend = Arc::new(ScriptedBackend::always(cottage_response()));
    let sink = Arc::new(RecordingSink::new());
    let service = service(&backend, &sink);
    let owner = OwnerId::new("alex");

    service.request_build(&owner, Vec3::ZERO, "cottage").await.unwrap();
    let denied = service.deny(&owner).unwrap();

    assert_eq!(denied.description, "Cozy cobblestone cottage");
    assert!(service.accept(&owner).await.is_err());
    assert!(sink.is_empty());
}

#[tokio::test]
async fn model_override_becomes_source_label() {
    let backend = Arc::new(ScriptedBackend::always(cottage_response()));
    let sink = Arc::new(RecordingSink::new());
    let service = service(&backend, &sink);
    let owner = OwnerId::new("alex");

    assert!(service.set_model(&owner, "llama3"));
    let proposal = service.request_build(&owner, Vec3::ZERO, "cottage").await.unwrap();
    assert_eq!(proposal.source_label, "llama3");
    assert_eq!(backend.calls()[0].1, "llama3");

    service.clear_model(&owner);
    assert_eq!(service.model_for(&owner), "gemini-2.0-flash");
}

#[tokio::test]
async fn model_override_can_be_disabled() {
    let backend = Arc::new(ScriptedBackend::always(cottage_response()));
    let sink = Arc::new(RecordingSink::new());
    let mut config = ForgeConfig::new();
    config.generation.allow_model_override = false;
    let service = BuildService::new(config, Arc::clone(&backend) as _, Arc::clone(&sink) as _);
    let owner = OwnerId::new("alex");

    assert!(!service.set_model(&owner, "llama3"));
    assert_eq!(service.model_for(&owner), "gemini-2.0-flash");
}

#[tokio::test]
async fn failing_world_reports_partial_build() {
    let backend = Arc::new(ScriptedBackend::always(cottage_response()));
    let sink = Arc::new(PatternSink::new(1, 4));
    let service = BuildService::new(fast_config(), Arc::clone(&backend) as _, Arc::clone(&sink) as _);
    let owner = OwnerId::new("alex");

    service.request_build(&owner, Vec3::ZERO, "cottage").await.unwrap();
    let outcome = service.accept(&owner).await.unwrap();

    // Four commands, one rejected; too few to abort
    assert_eq!(outcome.report.failed, 1);
    assert_eq!(outcome.report.executed, 3);
    assert!(!outcome.report.aborted);
    assert!(outcome.to_string().contains("partially completed"));
}
