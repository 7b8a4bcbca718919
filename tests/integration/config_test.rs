//! Configuration Integration Tests
//!
//! Config files round-trip through `BridgeConfigService` and drive a
//! service built with `BridgeService::from_config`.

use std::collections::HashMap;
use std::fs;

use batch_bridge::storage::BridgeConfigUpdate;
use batch_bridge::{
    AppError, BatchOptionsBuilder, BatchTermination, BridgeConfigService, BridgeRequest,
    BridgeService, FaultKind,
};
use tempfile::TempDir;

use crate::support::{destination, ScriptedChain, ScriptedSimulator, ScriptedWallet, SOURCE_NETWORK};

fn configured(temp: &TempDir) -> BridgeConfigService {
    let mut service = BridgeConfigService::open(temp.path().join("bridge.json")).unwrap();
    let mut destinations = HashMap::new();
    destinations.insert("optimism".to_string(), destination());
    service
        .update_config(BridgeConfigUpdate {
            default_options: Some(BatchOptionsBuilder::new().concurrency(2).build().unwrap()),
            source_network: Some(SOURCE_NETWORK),
            destinations,
            ..Default::default()
        })
        .unwrap();
    service
}

#[test]
fn test_config_round_trips_through_file() {
    let temp = TempDir::new().unwrap();
    let written = configured(&temp).get_config().clone();

    let content = fs::read_to_string(temp.path().join("bridge.json")).unwrap();
    assert!(content.contains("\"defaultOptions\""));
    assert!(content.contains("\"sourceNetwork\": 1"));
    assert!(content.contains("\"endpointId\": 30111"));

    let reopened = BridgeConfigService::open(temp.path().join("bridge.json")).unwrap();
    assert_eq!(reopened.get_config(), &written);
    assert!(reopened.is_healthy());
}

#[test]
fn test_corrupt_config_file_is_rejected() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("bridge.json");
    fs::write(&path, "{ not json").unwrap();

    let err = BridgeConfigService::open(&path).unwrap_err();
    assert!(matches!(err, AppError::Serialization(_)));
}

#[tokio::test]
async fn test_service_from_config_uses_defaults() {
    let temp = TempDir::new().unwrap();
    let config = configured(&temp).get_config().clone();
    let optimism = config.destination("optimism").unwrap().clone();

    let service = BridgeService::from_config(
        ScriptedChain::new(),
        ScriptedSimulator::new(),
        ScriptedWallet::on(SOURCE_NETWORK),
        &config,
    )
    .unwrap();
    assert_eq!(service.default_options().concurrency, 2);

    let handle = service
        .start_default_batch(BridgeRequest::many([1u64, 2, 3], &optimism))
        .await
        .unwrap();
    let report = service.wait(&handle).await.unwrap();
    assert!(report.is_success());
}

#[tokio::test]
async fn test_configured_source_network_is_enforced() {
    let temp = TempDir::new().unwrap();
    let config = configured(&temp).get_config().clone();

    let service = BridgeService::from_config(
        ScriptedChain::new(),
        ScriptedSimulator::new(),
        ScriptedWallet::on(137),
        &config,
    )
    .unwrap();

    let handle = service
        .start_batch(
            BridgeRequest::many([1u64, 2, 3], &destination()),
            BatchOptionsBuilder::new().build().unwrap(),
        )
        .await
        .unwrap();
    let report = service.wait(&handle).await.unwrap();

    match report.termination {
        BatchTermination::Aborted { fault } => assert_eq!(fault.kind, FaultKind::NetworkMismatch),
        other => panic!("expected abort, got {:?}", other),
    }
    assert_eq!(report.progress.failed, 1);
    assert_eq!(report.undispatched.len(), 2);
}
