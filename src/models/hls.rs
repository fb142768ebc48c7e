//! `PlaylistValidation`, `SegmentSample` — §3, §4.6.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistValidation {
    pub channel: String,
    pub rung_id: String,
    pub is_valid: bool,
    pub avg_segment_duration: f64,
    pub segment_count: usize,
    /// Count of segments carrying `EXT-X-DISCONTINUITY` — an observation,
    /// not itself a validation failure (spec.md §4.6 "Record a discontinuity
    /// observation when signalled").
    pub discontinuity_count: u64,
    pub errors: Vec<String>,
}

impl PlaylistValidation {
    /// `is_valid` is derived, not stored independently — §3 invariant
    /// `isValid ⇔ errors is empty`.
    pub fn new(
        channel: String,
        rung_id: String,
        avg_segment_duration: f64,
        segment_count: usize,
        discontinuity_count: u64,
        errors: Vec<String>,
    ) -> Self {
        Self {
            is_valid: errors.is_empty(),
            channel,
            rung_id,
            avg_segment_duration,
            segment_count,
            discontinuity_count,
            errors,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentSample {
    pub channel: String,
    pub rung_id: String,
    pub segment_number: Option<u64>,
    pub duration_seconds: f64,
    pub size_bytes: usize,
    pub download_millis: u64,
    pub http_status: u16,
    pub content_hash: String,
}

/// One rendition entry extracted from the master playlist's bitrate ladder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rung {
    pub id: String,
    pub uri: String,
    pub bandwidth_kbps: u64,
    pub resolution: Option<(u64, u64)>,
}
