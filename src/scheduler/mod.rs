//! Input Enumerator & Scheduler (§4.1, §5): drives one monitoring cycle at
//! a time, bounded concurrency, per-input deadlines, and cycle isolation —
//! one input's failure or cancellation never stops its siblings or the next
//! cycle.
//!
//! Grounded on the tick-loop shape of the teacher's `SchedulerService::start`,
//! replacing its cron-cache refresh with a fixed-concurrency fan-out bounded
//! by a semaphore (per §4.1's "at most W concurrent input tasks").

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::analyzer::{analyze_ts, compute_mdi, score_qoe};
use crate::capture::{self, UdpTarget};
use crate::config::Config;
use crate::errors::{ProbeError, TimeoutError};
use crate::hls;
use crate::metrics::{self, HttpMetricsSink, MetricsSink, Point};
use crate::models::{InputKind, InputSource};
use crate::snapshot::{self, SnapshotThrottle};
use crate::store::InputStore;

pub struct Scheduler {
    store: Arc<dyn InputStore>,
    sink: Arc<dyn MetricsSink>,
    http_client: Client,
    config: Config,
    snapshot_throttle: Arc<SnapshotThrottle>,
}

impl Scheduler {
    pub fn new(store: Arc<dyn InputStore>, config: Config) -> Self {
        let sink: Arc<dyn MetricsSink> = Arc::new(HttpMetricsSink::new(&config.metrics));
        Self {
            store,
            sink,
            http_client: Client::new(),
            config,
            snapshot_throttle: Arc::new(SnapshotThrottle::new()),
        }
    }

    /// Run cycles forever: one `run_cycle()`, then sleep `poll_interval_secs`,
    /// repeat. Cycles never overlap (§4.1, §5).
    pub async fn run_forever(&self) {
        loop {
            self.run_cycle().await;
            tokio::time::sleep(Duration::from_secs(self.config.scheduler.poll_interval_secs)).await;
        }
    }

    /// One monitoring cycle: enumerate enabled inputs, fan out bounded by
    /// `worker_count`, each under its own deadline. A single input's failure
    /// or panic never prevents the others, or the next cycle, from running.
    pub async fn run_cycle(&self) {
        let inputs = match self.store.enumerate_enabled().await {
            Ok(inputs) => inputs,
            Err(e) => {
                warn!("configuration store unreachable this cycle: {e}");
                return;
            }
        };

        if inputs.is_empty() {
            info!("no enabled inputs this cycle");
            return;
        }

        let semaphore = Arc::new(Semaphore::new(self.config.scheduler.worker_count));
        let deadline = Duration::from_secs(self.config.scheduler.input_deadline_secs);

        let mut handles = Vec::with_capacity(inputs.len());
        for input in inputs {
            let semaphore = semaphore.clone();
            let store = self.store.clone();
            let sink = self.sink.clone();
            let http_client = self.http_client.clone();
            let config = self.config.clone();
            let snapshot_throttle = self.snapshot_throttle.clone();

            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore never closed");
                let input_id = input.id;
                let input_name = input.name.clone();

                let outcome = timeout(
                    deadline,
                    dispatch_input(&input, &*store, &*sink, &http_client, &config, &snapshot_throttle),
                )
                .await;

                match outcome {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => error!("input {input_name} ({input_id}) failed: {e}"),
                    Err(_elapsed) => {
                        error!(
                            "input {input_name} ({input_id}) exceeded its {}s deadline and was cancelled",
                            deadline.as_secs()
                        );
                    }
                }
            }));
        }

        for handle in handles {
            if let Err(join_error) = handle.await {
                error!("input task panicked: {join_error}");
            }
        }
    }
}

/// Fixed dispatch table: kind → capture+analyze pipeline (§9 "collapses into
/// a discriminated union of input kinds").
async fn dispatch_input(
    input: &InputSource,
    store: &dyn InputStore,
    sink: &dyn MetricsSink,
    http_client: &Client,
    config: &Config,
    snapshot_throttle: &SnapshotThrottle,
) -> Result<(), ProbeError> {
    match input.kind {
        InputKind::MpegtsUdp => run_udp_probe(input, store, sink, config, snapshot_throttle).await,
        InputKind::Hls | InputKind::Http => run_hls_probe(input, sink, http_client, config).await,
    }
}

async fn run_udp_probe(
    input: &InputSource,
    store: &dyn InputStore,
    sink: &dyn MetricsSink,
    config: &Config,
    snapshot_throttle: &SnapshotThrottle,
) -> Result<(), ProbeError> {
    let target = UdpTarget::parse(&input.url, input.id)?;

    let window = capture::capture_window(
        &target,
        Duration::from_secs(config.udp.timeout_secs),
        config.udp.min_ts_packets,
        64 * 1024 * config.udp.min_ts_packets / 7,
    )
    .await?;

    if !window.is_valid {
        let zeroed = metrics::udp_probe_point(
            input.id,
            &input.name,
            window.packets_received() as u64,
            window.total_bytes as u64,
            window.duration.as_secs_f64(),
            window.rate_mbps(),
            false,
            1,
        );
        sink.write(&[zeroed]).await.map_err(ProbeError::from)?;
        return Err(ProbeError::from(TimeoutError::UdpReceive {
            millis: config.udp.timeout_secs * 1000,
            datagrams_received: window.packets_received(),
        }));
    }

    let analysis = analyze_ts(&window.buffer);
    let rate_mbps = window.rate_mbps();

    let mdi = compute_mdi(
        &window.arrival_instants().collect::<Vec<_>>(),
        window.duration.as_secs_f64(),
        rate_mbps,
        0,
    );
    let qoe = score_qoe(&analysis.tr101290, &analysis.pid_stats, rate_mbps);

    let mut points = vec![
        metrics::udp_probe_point(
            input.id,
            &input.name,
            window.packets_received() as u64,
            window.total_bytes as u64,
            window.duration.as_secs_f64(),
            rate_mbps,
            true,
            (analysis.tr101290.total_p1_errors() + analysis.tr101290.total_p2_errors()) as u64,
        ),
        metrics::mdi_point(input.id, &input.name, &mdi, rate_mbps),
        metrics::qoe_point(input.id, &input.name, &qoe),
    ];
    push_tr101290_points(&mut points, input.id, &input.name, &analysis.tr101290);

    sink.write(&points).await.map_err(ProbeError::from)?;

    snapshot::maybe_snapshot(snapshot_throttle, store, input.id, &input.url, &config.snapshot).await;

    Ok(())
}

fn push_tr101290_points(
    points: &mut Vec<Point>,
    input_id: uuid::Uuid,
    input_name: &str,
    result: &crate::models::TR101290Result,
) {
    points.push(metrics::tr101290_metadata_point(input_id, input_name, result));
    points.push(metrics::tr101290_p1_point(input_id, input_name, result));
    points.push(metrics::tr101290_p2_point(input_id, input_name, result));
    points.push(metrics::tr101290_p3_point(input_id, input_name, result));
}

async fn run_hls_probe(
    input: &InputSource,
    sink: &dyn MetricsSink,
    http_client: &Client,
    config: &Config,
) -> Result<(), ProbeError> {
    let channel_id = input.channel_ref.as_deref().unwrap_or(&input.name);
    let request_timeout = Duration::from_secs(config.hls.request_timeout_secs);

    let ladder = match hls::fetch_ladder(http_client, &config.hls.packager_base_url, channel_id, request_timeout).await
    {
        Ok(ladder) => ladder,
        Err(e) => {
            sink.write(&[metrics::channel_error_point(channel_id, &e.to_string())])
                .await
                .map_err(ProbeError::from)?;
            return Err(ProbeError::from(e));
        }
    };

    if !ladder.is_empty() {
        let min_bw = ladder.iter().map(|r| r.bandwidth_kbps).min().unwrap_or(0);
        let max_bw = ladder.iter().map(|r| r.bandwidth_kbps).max().unwrap_or(0);
        sink.write(&[metrics::abr_ladder_point(channel_id, ladder.len() as u64, min_bw, max_bw)])
            .await
            .map_err(ProbeError::from)?;
    }

    for rung in &ladder {
        let (validation, segments) =
            match hls::validate_variant(http_client, channel_id, rung, &config.hls, request_timeout).await {
                Ok(result) => result,
                Err(e) => {
                    sink.write(&[metrics::channel_error_point(channel_id, &e.to_string())])
                        .await
                        .map_err(ProbeError::from)?;
                    continue;
                }
            };

        let is_valid = validation.is_valid;
        sink.write(&[metrics::playlist_validation_point(&validation)])
            .await
            .map_err(ProbeError::from)?;

        if !is_valid {
            continue;
        }

        let samples = hls::sample_recent_segments(http_client, channel_id, rung, &segments, &config.hls).await;
        let sample_points: Vec<Point> = samples.iter().map(metrics::segment_metric_point).collect();
        if !sample_points.is_empty() {
            sink.write(&sample_points).await.map_err(ProbeError::from)?;
        }
    }

    Ok(())
}
