//! Cycle-isolation integration test (§8): one misbehaving input must not
//! prevent its siblings' cycle, or the next cycle, from completing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use video_quality_monitor::config::Config;
use video_quality_monitor::errors::ConfigStoreError;
use video_quality_monitor::models::{InputKind, InputSource};
use video_quality_monitor::scheduler::Scheduler;
use video_quality_monitor::store::InputStore;

/// A fixed set of inputs: one with an unparseable URL (fails immediately),
/// one well-formed UDP input that will simply time out with no datagrams
/// (no live source on the test machine) — both should be handled without
/// panicking.
struct FixedInputStore {
    inputs: Vec<InputSource>,
}

#[async_trait]
impl InputStore for FixedInputStore {
    async fn enumerate_enabled(&self) -> Result<Vec<InputSource>, ConfigStoreError> {
        Ok(self.inputs.clone())
    }

    async fn record_snapshot(&self, _input_id: Uuid, _path: &str, _at: DateTime<Utc>) -> Result<(), ConfigStoreError> {
        Ok(())
    }
}

fn fast_test_config() -> Config {
    let mut config = Config::default();
    config.udp.timeout_secs = 1;
    config.udp.min_ts_packets = 1_000_000; // unreachable in the test window, forces a timeout
    config.scheduler.input_deadline_secs = 3;
    config.scheduler.worker_count = 4;
    config.hls.request_timeout_secs = 1;
    config.metrics.sink_endpoint = "http://127.0.0.1:0/write".to_string();
    config.metrics.max_retries = 0;
    config
}

#[tokio::test]
async fn malformed_input_does_not_stop_its_siblings_or_the_next_cycle() {
    let broken = InputSource {
        id: Uuid::new_v4(),
        name: "broken-udp".to_string(),
        url: "not-a-udp-url".to_string(),
        kind: InputKind::MpegtsUdp,
        port: None,
        channel_ref: None,
        probe_ref: None,
        is_primary: true,
        enabled: true,
        snapshot_path: None,
        last_snapshot_instant: None,
    };

    let healthy = InputSource {
        id: Uuid::new_v4(),
        name: "healthy-udp".to_string(),
        url: "udp://127.0.0.1:39001".to_string(),
        kind: InputKind::MpegtsUdp,
        port: Some(39001),
        channel_ref: None,
        probe_ref: None,
        is_primary: true,
        enabled: true,
        snapshot_path: None,
        last_snapshot_instant: None,
    };

    let store = std::sync::Arc::new(FixedInputStore {
        inputs: vec![broken, healthy],
    });

    let scheduler = Scheduler::new(store, fast_test_config());

    // Cycle C: the malformed input errors out; the well-formed one times out
    // cleanly (no datagrams on the test machine). Neither should panic the
    // cycle, and run_cycle() must return.
    scheduler.run_cycle().await;

    // Cycle C+1: still runs to completion.
    scheduler.run_cycle().await;
}

#[tokio::test]
async fn empty_enabled_set_returns_without_emitting() {
    let store = std::sync::Arc::new(FixedInputStore { inputs: vec![] });
    let scheduler = Scheduler::new(store, fast_test_config());
    scheduler.run_cycle().await;
}

struct FailingInputStore;

#[async_trait]
impl InputStore for FailingInputStore {
    async fn enumerate_enabled(&self) -> Result<Vec<InputSource>, ConfigStoreError> {
        Err(ConfigStoreError::EnumerationFailed("store unreachable".to_string()))
    }

    async fn record_snapshot(&self, _input_id: Uuid, _path: &str, _at: DateTime<Utc>) -> Result<(), ConfigStoreError> {
        Ok(())
    }
}

#[tokio::test]
async fn unreachable_config_store_skips_the_cycle_without_panicking() {
    let scheduler = Scheduler::new(std::sync::Arc::new(FailingInputStore), fast_test_config());
    scheduler.run_cycle().await;
    scheduler.run_cycle().await;
}
