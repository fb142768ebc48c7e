//! Snapshot Coordinator (§4.7): throttled invocation of an external
//! frame-grabber subprocess, write-back of the resulting artifact path.
//!
//! The only state shared across cycles lives here — a map of input id to
//! last-snapshot wall-clock instant — owned by the scheduler value, not
//! module-level state (§9 "Global state").

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::warn;
use uuid::Uuid;

use crate::config::SnapshotConfig;
use crate::errors::SubprocessError;
use crate::store::InputStore;

/// Last-snapshot-instant map, keyed by input id. A simple mutex suffices:
/// the scheduler never dispatches the same input twice concurrently, so
/// contention is never more than incidental (§5).
#[derive(Default)]
pub struct SnapshotThrottle {
    last_snapshot_at: Mutex<HashMap<Uuid, DateTime<Utc>>>,
}

impl SnapshotThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when enough wall-clock time has passed since the last snapshot
    /// for this input (or none has ever been taken).
    fn due(&self, input_id: Uuid, interval: chrono::Duration, now: DateTime<Utc>) -> bool {
        let guard = self.last_snapshot_at.lock().expect("snapshot throttle mutex poisoned");
        match guard.get(&input_id) {
            Some(last) => now.signed_duration_since(*last) >= interval,
            None => true,
        }
    }

    fn record(&self, input_id: Uuid, at: DateTime<Utc>) {
        let mut guard = self.last_snapshot_at.lock().expect("snapshot throttle mutex poisoned");
        guard.insert(input_id, at);
    }
}

/// Invoke the frame-grabber for `input_id` if due, on `url`, writing the
/// artifact path back to the store on success. Timeouts and non-zero exits
/// are warnings only — this never fails the calling task (§4.7, §7).
pub async fn maybe_snapshot(
    throttle: &SnapshotThrottle,
    store: &dyn InputStore,
    input_id: Uuid,
    url: &str,
    config: &SnapshotConfig,
) {
    if !config.enabled {
        return;
    }

    let now = Utc::now();
    let interval = chrono::Duration::seconds(config.interval_secs);
    if !throttle.due(input_id, interval, now) {
        return;
    }

    match take_snapshot(input_id, url, config).await {
        Ok(path) => {
            throttle.record(input_id, now);
            if let Err(e) = store.record_snapshot(input_id, &path, now).await {
                warn!("failed to record snapshot path for input {input_id}: {e}");
            }
        }
        Err(e) => {
            warn!("snapshot failed for input {input_id}: {e}");
        }
    }
}

async fn take_snapshot(input_id: Uuid, url: &str, config: &SnapshotConfig) -> Result<String, SubprocessError> {
    let output_path = PathBuf::from(&config.directory).join(format!("{input_id}.jpg"));
    std::fs::create_dir_all(&config.directory).ok();

    let mut command = Command::new(&config.frame_grabber_path);
    command
        .arg("-i")
        .arg(url)
        .arg("-frames:v")
        .arg("1")
        .arg("-y")
        .arg(&output_path);

    let wait_budget = Duration::from_secs(config.capture_duration_secs + 5);

    let spawned = command.spawn().map_err(|e| SubprocessError::SpawnFailed {
        input_id,
        message: e.to_string(),
    })?;

    let status = match timeout(wait_budget, spawned.wait_with_output()).await {
        Ok(Ok(output)) => output.status,
        Ok(Err(e)) => {
            return Err(SubprocessError::SpawnFailed {
                input_id,
                message: e.to_string(),
            })
        }
        Err(_elapsed) => {
            return Err(SubprocessError::Timeout {
                input_id,
                millis: wait_budget.as_millis() as u64,
            })
        }
    };

    if !status.success() {
        return Err(SubprocessError::NonZeroExit {
            input_id,
            status: status.code().unwrap_or(-1),
        });
    }

    if !output_path.exists() {
        return Err(SubprocessError::NonZeroExit { input_id, status: 0 });
    }

    Ok(output_path.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_due_immediately_after_recording() {
        let throttle = SnapshotThrottle::new();
        let id = Uuid::new_v4();
        let now = Utc::now();
        throttle.record(id, now);
        assert!(!throttle.due(id, chrono::Duration::seconds(60), now));
    }

    #[test]
    fn due_after_interval_elapses() {
        let throttle = SnapshotThrottle::new();
        let id = Uuid::new_v4();
        let t0 = Utc::now();
        throttle.record(id, t0);
        let t1 = t0 + chrono::Duration::seconds(61);
        assert!(throttle.due(id, chrono::Duration::seconds(60), t1));
    }

    #[test]
    fn due_before_any_snapshot_recorded() {
        let throttle = SnapshotThrottle::new();
        let id = Uuid::new_v4();
        assert!(throttle.due(id, chrono::Duration::seconds(60), Utc::now()));
    }

    #[test]
    fn second_probe_within_interval_stays_throttled() {
        // Mirrors scenario 6: snapshotInterval=60, probes at T and T+30.
        let throttle = SnapshotThrottle::new();
        let id = Uuid::new_v4();
        let t0 = Utc::now();
        assert!(throttle.due(id, chrono::Duration::seconds(60), t0));
        throttle.record(id, t0);

        let t_plus_30 = t0 + chrono::Duration::seconds(30);
        assert!(!throttle.due(id, chrono::Duration::seconds(60), t_plus_30));
    }
}
