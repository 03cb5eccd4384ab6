use forge_blueprint::Vec3;
use forge_core::{BuildService, OwnerId, ReviewError};
use forge_test_utils::{cottage_response, fast_config, RecordingSink, ScriptedBackend};
use std::sync::Arc;
use std::time::Duration;

fn short_lived_service() -> (BuildService, Arc<RecordingSink>) {
    let mut config = fast_config();
    config.proposals.ttl_secs = 5;
    config.proposals.sweep_interval_secs = 1;
    let backend = Arc::new(ScriptedBackend::always(cottage_response()));
    let sink = Arc::new(RecordingSink::new());
    let service = BuildService::new(config, backend as _, Arc::clone(&sink) as _);
    (service, sink)
}

#[tokio::test(start_paused = true)]
async fn sweeper_drops_expired_proposal() {
    let (service, sink) = short_lived_service();
    let sweeper = service.spawn_sweeper();
    let owner = OwnerId::new("alex");

    service.request_build(&owner, Vec3::ZERO, "cottage").await.unwrap();

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(service.inspect(&owner).is_ok());

    tokio::time::sleep(Duration::from_secs(4)).await;
    assert!(service.store().is_empty());
    assert_eq!(
        service.accept(&owner).await.unwrap_err(),
        ReviewError::NoPendingProposal(owner.clone())
    );
    assert!(sink.is_empty());

    sweeper.abort();
}

#[tokio::test(start_paused = true)]
async fn inspect_counts_down() {
    let (service, _sink) = short_lived_service();
    let owner = OwnerId::new("alex");

    service.request_build(&owner, Vec3::ZERO, "cottage").await.unwrap();
    tokio::time::advance(Duration::from_secs(2)).await;

    let summary = service.inspect(&owner).unwrap();
    assert!(summary.remaining <= Duration::from_secs(3));
    assert!(summary.remaining > Duration::from_secs(2));
    assert!(summary.to_string().starts_with("'Cozy cobblestone cottage' at (0 0 0)"));
}

#[tokio::test(start_paused = true)]
async fn sweep_spares_fresh_proposals() {
    let (service, _sink) = short_lived_service();
    let sweeper = service.spawn_sweeper();

    service.request_build(&OwnerId::new("alex"), Vec3::ZERO, "cottage").await.unwrap();
    tokio::time::sleep(Duration::from_secs(4)).await;
    service.request_build(&OwnerId::new("sam"), Vec3::ZERO, "cottage").await.unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;

    assert_eq!(service.store().len(), 1);
    assert!(service.inspect(&OwnerId::new("sam")).is_ok());

    sweeper.abort();
}
