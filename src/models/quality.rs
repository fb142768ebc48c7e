//! `TR101290Result`, `MDIResult`, `QoEResult` — §3, §4.3-4.5.

use serde::{Deserialize, Serialize};

/// ETSI TR 101 290 priority 1/2/3 counters plus the auxiliary PID statistics
/// the analyzer needs to derive them (PAT/PMT presence, PCR spacing).
///
/// All counters are non-negative and saturate at the native integer width;
/// they never wrap observably within a normal cycle (see `saturating_add`
/// call sites in `analyzer::ts`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TR101290Result {
    // Priority 1
    pub ts_sync_loss: u32,
    pub sync_byte_error: u32,
    pub pat_error: u32,
    pub continuity_count_error: u32,
    pub pmt_error: u32,
    pub pid_error: u32,

    // Priority 2
    pub transport_error: u32,
    pub crc_error: u32,
    pub pcr_error: u32,
    pub pcr_repetition_error: u32,
    pub pcr_discontinuity: u32,
    pub pcr_accuracy_error: u32,
    pub pts_error: u32,
    pub cat_error: u32,

    // Priority 3 — always zero without a full SI parser; declared behavior,
    // kept so the field shape matches a stream that does parse NIT/SDT/EIT/TDT.
    pub nit_error: u32,
    pub si_repetition_error: u32,
    pub unreferenced_pid: u32,
    pub sdt_error: u32,
    pub eit_error: u32,
    pub rst_error: u32,
    pub tdt_error: u32,

    pub total_packets: u64,
    pub pat_seen: bool,
    pub pmt_seen: bool,
    pub pcr_interval_millis: f64,
}

impl TR101290Result {
    pub fn total_p1_errors(&self) -> u32 {
        self.ts_sync_loss
            .saturating_add(self.sync_byte_error)
            .saturating_add(self.pat_error)
            .saturating_add(self.continuity_count_error)
            .saturating_add(self.pmt_error)
            .saturating_add(self.pid_error)
    }

    pub fn total_p2_errors(&self) -> u32 {
        self.transport_error
            .saturating_add(self.crc_error)
            .saturating_add(self.pcr_error)
            .saturating_add(self.pcr_repetition_error)
            .saturating_add(self.pcr_discontinuity)
            .saturating_add(self.pcr_accuracy_error)
            .saturating_add(self.pts_error)
            .saturating_add(self.cat_error)
    }

    pub fn total_p3_errors(&self) -> u32 {
        self.nit_error
            .saturating_add(self.si_repetition_error)
            .saturating_add(self.unreferenced_pid)
            .saturating_add(self.sdt_error)
            .saturating_add(self.eit_error)
            .saturating_add(self.rst_error)
            .saturating_add(self.tdt_error)
    }
}

/// RFC 4445 Media Delivery Index plus the buffer-sizing estimate derived
/// from it (§4.4).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MDIResult {
    pub delay_factor_millis: f64,
    pub media_loss_rate: f64,
    pub mean_inter_arrival_millis: f64,
    pub jitter_millis: f64,
    pub max_jitter_millis: f64,
    pub buffer_depth_bytes: f64,
    pub buffer_max_bytes: f64,
    pub buffer_utilization: f64,
    pub packets_lost: u64,
    pub packets_out_of_order: u64,
}

/// Derived video/audio quality score and composite MOS (§4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QoEResult {
    pub video_score: f64,
    pub audio_score: f64,
    pub composite_mos: f64,
    pub video_active: bool,
    pub audio_active: bool,
    pub video_bitrate_mbps: f64,
    pub audio_bitrate_kbps: f64,
}
