//! `CaptureWindow`: the output of the UDP Capture component (§4.2).
//!
//! Never serialized — it is produced and consumed within a single per-input
//! task and carries `Instant` arrival timestamps, which aren't meaningful
//! outside the process that recorded them.

use std::time::{Duration, Instant};

/// One received UDP datagram: arrival time and length in bytes.
#[derive(Debug, Clone, Copy)]
pub struct Datagram {
    pub arrival: Instant,
    pub bytes: usize,
}

/// A bounded window of captured traffic for one input, one cycle.
///
/// Invariants (enforced by the capture loop, not re-checked here):
/// datagrams are ordered by `arrival` non-decreasing; `duration` never
/// exceeds the configured cap; `total_bytes` never exceeds the buffer cap.
#[derive(Debug, Clone)]
pub struct CaptureWindow {
    pub start: Instant,
    pub duration: Duration,
    pub datagrams: Vec<Datagram>,
    pub total_bytes: usize,
    /// Rolling buffer of concatenated payload bytes, capped at construction.
    pub buffer: Vec<u8>,
    pub buffer_cap: usize,
    /// True once the minimum-datagram-count AND TS-framing heuristics pass.
    pub is_valid: bool,
}

impl CaptureWindow {
    pub fn new(start: Instant, buffer_cap: usize) -> Self {
        Self {
            start,
            duration: Duration::ZERO,
            datagrams: Vec::new(),
            total_bytes: 0,
            buffer: Vec::new(),
            buffer_cap,
            is_valid: false,
        }
    }

    /// Record one received datagram, appending its payload to the rolling
    /// buffer up to `buffer_cap`. Bytes beyond the cap are still counted in
    /// `total_bytes` but dropped from `buffer`.
    pub fn record(&mut self, arrival: Instant, payload: &[u8]) {
        self.datagrams.push(Datagram {
            arrival,
            bytes: payload.len(),
        });
        self.total_bytes += payload.len();

        let remaining = self.buffer_cap.saturating_sub(self.buffer.len());
        if remaining > 0 {
            let take = remaining.min(payload.len());
            self.buffer.extend_from_slice(&payload[..take]);
        }
    }

    pub fn packets_received(&self) -> usize {
        self.datagrams.len()
    }

    pub fn arrival_instants(&self) -> impl Iterator<Item = Instant> + '_ {
        self.datagrams.iter().map(|d| d.arrival)
    }

    /// Bit-rate of the captured window in Mbps, derived from total bytes over
    /// the elapsed capture duration.
    pub fn rate_mbps(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        (self.total_bytes as f64 * 8.0) / secs / 1_000_000.0
    }
}
