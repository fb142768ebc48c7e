//! Metric Emitter (§4.8, §6): typed records flattened to line-protocol
//! points and POSTed to the time-series sink. Fire-and-forget: a write
//! failure is logged, retried a bounded number of times with jittered
//! backoff, and otherwise swallowed — it never aborts the calling task.

use std::time::Duration;

use reqwest::Client;
use tracing::warn;
use uuid::Uuid;

use crate::config::MetricsConfig;
use crate::errors::SinkWriteError;
use crate::models::{MDIResult, PlaylistValidation, QoEResult, SegmentSample, TR101290Result};

/// One line-protocol point: `measurement,tag=v,... field=v,... `
/// (no trailing timestamp — the sink stamps on receipt).
pub struct Point {
    measurement: &'static str,
    tags: Vec<(String, String)>,
    fields: Vec<(String, String)>,
}

impl Point {
    fn new(measurement: &'static str) -> Self {
        Self {
            measurement,
            tags: Vec::new(),
            fields: Vec::new(),
        }
    }

    fn tag(mut self, key: &str, value: impl Into<String>) -> Self {
        self.tags.push((key.to_string(), escape_tag(&value.into())));
        self
    }

    fn field_f64(mut self, key: &str, value: f64) -> Self {
        self.fields.push((key.to_string(), format!("{value}")));
        self
    }

    fn field_u64(mut self, key: &str, value: u64) -> Self {
        self.fields.push((key.to_string(), format!("{value}i")));
        self
    }

    fn field_bool(mut self, key: &str, value: bool) -> Self {
        self.fields.push((key.to_string(), value.to_string()));
        self
    }

    fn field_str(mut self, key: &str, value: &str) -> Self {
        self.fields.push((key.to_string(), format!("\"{}\"", escape_field_string(value))));
        self
    }

    fn render(&self) -> String {
        let mut line = self.measurement.to_string();
        for (k, v) in &self.tags {
            line.push(',');
            line.push_str(k);
            line.push('=');
            line.push_str(v);
        }
        line.push(' ');
        let fields: Vec<String> = self.fields.iter().map(|(k, v)| format!("{k}={v}")).collect();
        line.push_str(&fields.join(","));
        line
    }
}

fn escape_tag(value: &str) -> String {
    value.replace(' ', "\\ ").replace(',', "\\,").replace('=', "\\=")
}

fn escape_field_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

pub fn tr101290_p1_point(input_id: Uuid, input_name: &str, r: &TR101290Result) -> Point {
    Point::new("tr101290_p1")
        .tag("input_id", input_id.to_string())
        .tag("input_name", input_name)
        .field_u64("ts_sync_loss", r.ts_sync_loss as u64)
        .field_u64("sync_byte_error", r.sync_byte_error as u64)
        .field_u64("pat_error", r.pat_error as u64)
        .field_u64("continuity_count_error", r.continuity_count_error as u64)
        .field_u64("pmt_error", r.pmt_error as u64)
        .field_u64("pid_error", r.pid_error as u64)
        .field_u64("total_p1_errors", r.total_p1_errors() as u64)
}

pub fn tr101290_p2_point(input_id: Uuid, input_name: &str, r: &TR101290Result) -> Point {
    Point::new("tr101290_p2")
        .tag("input_id", input_id.to_string())
        .tag("input_name", input_name)
        .field_u64("transport_error", r.transport_error as u64)
        .field_u64("crc_error", r.crc_error as u64)
        .field_u64("pcr_error", r.pcr_error as u64)
        .field_u64("pcr_repetition_error", r.pcr_repetition_error as u64)
        .field_u64("pcr_discontinuity", r.pcr_discontinuity as u64)
        .field_u64("pcr_accuracy_error", r.pcr_accuracy_error as u64)
        .field_u64("pts_error", r.pts_error as u64)
        .field_u64("cat_error", r.cat_error as u64)
        .field_u64("total_p2_errors", r.total_p2_errors() as u64)
}

pub fn tr101290_p3_point(input_id: Uuid, input_name: &str, r: &TR101290Result) -> Point {
    Point::new("tr101290_p3")
        .tag("input_id", input_id.to_string())
        .tag("input_name", input_name)
        .field_u64("nit_error", r.nit_error as u64)
        .field_u64("si_repetition_error", r.si_repetition_error as u64)
        .field_u64("unreferenced_pid", r.unreferenced_pid as u64)
        .field_u64("sdt_error", r.sdt_error as u64)
        .field_u64("eit_error", r.eit_error as u64)
        .field_u64("rst_error", r.rst_error as u64)
        .field_u64("tdt_error", r.tdt_error as u64)
        .field_u64("total_p3_errors", r.total_p3_errors() as u64)
}

pub fn tr101290_metadata_point(input_id: Uuid, input_name: &str, r: &TR101290Result) -> Point {
    Point::new("tr101290_metadata")
        .tag("input_id", input_id.to_string())
        .tag("input_name", input_name)
        .field_u64("total_packets", r.total_packets)
        .field_bool("pat_received", r.pat_seen)
        .field_bool("pmt_received", r.pmt_seen)
        .field_f64("pcr_interval_ms", r.pcr_interval_millis)
}

/// `udp_probe_metric`: basic capture shape, emitted whether or not the
/// capture was valid (§7: a zeroed point still gets emitted on failure).
pub fn udp_probe_point(
    input_id: Uuid,
    input_name: &str,
    packets_received: u64,
    bytes_received: u64,
    duration_sec: f64,
    bitrate_mbps: f64,
    is_valid: bool,
    error_count: u64,
) -> Point {
    Point::new("udp_probe_metric")
        .tag("input_id", input_id.to_string())
        .tag("input_name", input_name)
        .field_u64("packets_received", packets_received)
        .field_u64("bytes_received", bytes_received)
        .field_f64("duration_sec", duration_sec)
        .field_f64("bitrate_mbps", bitrate_mbps)
        .field_bool("is_valid", is_valid)
        .field_u64("error_count", error_count)
}

pub fn mdi_point(input_id: Uuid, input_name: &str, m: &MDIResult, rate_mbps: f64) -> Point {
    Point::new("mdi_metrics")
        .tag("input_id", input_id.to_string())
        .tag("input_name", input_name)
        .field_f64("df", m.delay_factor_millis)
        .field_f64("mlr", m.media_loss_rate)
        .field_f64("jitter_ms", m.jitter_millis)
        .field_f64("max_jitter_ms", m.max_jitter_millis)
        .field_f64("inter_arrival_time_ms", m.mean_inter_arrival_millis)
        .field_f64("buffer_depth", m.buffer_depth_bytes)
        .field_f64("buffer_max", m.buffer_max_bytes)
        .field_f64("buffer_utilization", m.buffer_utilization)
        .field_f64("input_rate_mbps", rate_mbps)
        .field_u64("packets_lost", m.packets_lost)
        .field_u64("packets_out_of_order", m.packets_out_of_order)
}

pub fn qoe_point(input_id: Uuid, input_name: &str, q: &QoEResult) -> Point {
    Point::new("qoe_metrics")
        .tag("input_id", input_id.to_string())
        .tag("input_name", input_name)
        .field_f64("overall_mos", q.composite_mos)
        .field_f64("video_quality_score", q.video_score)
        .field_f64("audio_quality_score", q.audio_score)
        .field_bool("video_pid_active", q.video_active)
        .field_bool("audio_pid_active", q.audio_active)
        .field_f64("video_bitrate_mbps", q.video_bitrate_mbps)
        .field_f64("audio_bitrate_kbps", q.audio_bitrate_kbps)
}

pub fn abr_ladder_point(channel: &str, rung_count: u64, min_bitrate_kbps: u64, max_bitrate_kbps: u64) -> Point {
    Point::new("abr_ladder")
        .tag("channel", channel)
        .field_u64("rung_count", rung_count)
        .field_u64("min_bitrate_kbps", min_bitrate_kbps)
        .field_u64("max_bitrate_kbps", max_bitrate_kbps)
}

pub fn playlist_validation_point(v: &PlaylistValidation) -> Point {
    Point::new("playlist_validation")
        .tag("channel", v.channel.clone())
        .tag("rung", v.rung_id.clone())
        .field_bool("is_valid", v.is_valid)
        .field_f64("duration_sec", v.avg_segment_duration)
        .field_u64("segment_count", v.segment_count as u64)
        .field_u64("error_count", v.errors.len() as u64)
        .field_u64("discontinuity_count", v.discontinuity_count)
}

pub fn segment_metric_point(s: &SegmentSample) -> Point {
    let mut point = Point::new("segment_metric")
        .tag("channel", s.channel.clone())
        .tag("rung", s.rung_id.clone())
        .field_f64("duration_sec", s.duration_seconds)
        .field_u64("size_bytes", s.size_bytes as u64)
        .field_u64("download_time_ms", s.download_millis)
        .field_u64("http_status", s.http_status as u64);
    if let Some(n) = s.segment_number {
        point = point.field_u64("segment_number", n);
    }
    point
}

pub fn channel_error_point(channel: &str, error_message: &str) -> Point {
    Point::new("channel_error")
        .tag("channel", channel)
        .field_str("error_message", error_message)
}

/// A metrics sink a probe task can write points to.
#[async_trait::async_trait]
pub trait MetricsSink: Send + Sync {
    async fn write(&self, points: &[Point]) -> Result<(), SinkWriteError>;
}

/// POSTs line-protocol bodies to an HTTP sink endpoint, retrying transient
/// failures a bounded number of times with jittered backoff.
pub struct HttpMetricsSink {
    client: Client,
    endpoint: String,
    token: Option<String>,
    max_retries: u32,
}

impl HttpMetricsSink {
    pub fn new(config: &MetricsConfig) -> Self {
        Self {
            client: Client::new(),
            endpoint: config.sink_endpoint.clone(),
            token: config.sink_token.clone(),
            max_retries: config.max_retries,
        }
    }
}

#[async_trait::async_trait]
impl MetricsSink for HttpMetricsSink {
    async fn write(&self, points: &[Point]) -> Result<(), SinkWriteError> {
        if points.is_empty() {
            return Ok(());
        }
        let body = points.iter().map(Point::render).collect::<Vec<_>>().join("\n");

        let mut attempt = 0;
        loop {
            let mut request = self.client.post(&self.endpoint).body(body.clone());
            if let Some(token) = &self.token {
                request = request.bearer_auth(token);
            }

            match request.send().await {
                Ok(resp) if resp.status().is_success() => return Ok(()),
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt >= self.max_retries {
                        return Err(SinkWriteError::Rejected { status });
                    }
                }
                Err(e) => {
                    if attempt >= self.max_retries {
                        return Err(SinkWriteError::Unreachable { message: e.to_string() });
                    }
                }
            }

            attempt += 1;
            let backoff_ms = 100 * 2u64.pow(attempt.min(5)) + fastrand::u64(0..50);
            warn!("metrics sink write failed, retrying in {backoff_ms}ms (attempt {attempt}/{})", self.max_retries);
            tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_renders_tags_and_fields() {
        let point = Point::new("udp_probe_metric")
            .tag("input_id", "abc")
            .field_u64("packets_received", 40)
            .field_bool("is_valid", true);
        let rendered = point.render();
        assert!(rendered.starts_with("udp_probe_metric,input_id=abc "));
        assert!(rendered.contains("packets_received=40i"));
        assert!(rendered.contains("is_valid=true"));
    }

    #[test]
    fn tag_values_with_spaces_are_escaped() {
        let point = Point::new("channel_error").tag("channel", "my channel").field_str("error_message", "boom");
        let rendered = point.render();
        assert!(rendered.contains("channel=my\\ channel"));
    }

    #[test]
    fn field_string_quotes_are_escaped() {
        let point = Point::new("channel_error")
            .tag("channel", "ch1")
            .field_str("error_message", "bad \"thing\"");
        let rendered = point.render();
        assert!(rendered.contains("error_message=\"bad \\\"thing\\\"\""));
    }

    #[test]
    fn qoe_point_carries_all_declared_fields() {
        let q = QoEResult {
            video_score: 4.5,
            audio_score: 5.0,
            composite_mos: 4.65,
            video_active: true,
            audio_active: true,
            video_bitrate_mbps: 8.5,
            audio_bitrate_kbps: 150.0,
        };
        let rendered = qoe_point(Uuid::nil(), "chan", &q).render();
        assert!(rendered.contains("overall_mos=4.65"));
        assert!(rendered.contains("video_pid_active=true"));
    }
}
