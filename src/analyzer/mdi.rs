//! RFC 4445 Media Delivery Index (§4.4).
//!
//! Operates purely on inter-arrival gaps from a `CaptureWindow` plus the
//! observed rate — no TS framing knowledge needed here, unlike `analyzer::ts`.

use std::time::Instant;

use crate::models::MDIResult;

/// Compute MDI statistics from a chronological sequence of arrival instants,
/// the elapsed capture duration, the observed rate in Mbps, and a loss count
/// supplied by the caller (always zero for pure UDP — no sequence numbers to
/// detect loss from).
pub fn compute_mdi(
    arrivals: &[Instant],
    duration_secs: f64,
    rate_mbps: f64,
    packets_lost: u64,
) -> MDIResult {
    if arrivals.len() < 2 {
        return MDIResult::default();
    }

    let deltas_millis: Vec<f64> = arrivals
        .windows(2)
        .map(|w| w[1].duration_since(w[0]).as_secs_f64() * 1000.0)
        .collect();

    let mean = deltas_millis.iter().sum::<f64>() / deltas_millis.len() as f64;

    let variance = deltas_millis
        .iter()
        .map(|d| (d - mean).powi(2))
        .sum::<f64>()
        / deltas_millis.len() as f64;
    let jitter = variance.sqrt();

    let max_jitter = deltas_millis
        .iter()
        .map(|d| (d - mean).abs())
        .fold(0.0_f64, f64::max);

    // Delay Factor (RFC 4445): operational stand-in for the full drain-fill
    // buffer model — max deviation of arrival from the nominal rate (§9).
    let delay_factor_millis = max_jitter;

    let rate_bytes_per_sec = rate_mbps * 1_000_000.0 / 8.0;
    let buffer_depth_bytes = if rate_mbps > 0.0 {
        rate_bytes_per_sec * (max_jitter / 1000.0)
    } else {
        0.0
    };
    let buffer_max_bytes = buffer_depth_bytes * 1.5;
    let buffer_utilization = if buffer_max_bytes > 0.0 {
        buffer_depth_bytes / buffer_max_bytes
    } else {
        0.0
    };

    let media_loss_rate = if duration_secs > 0.0 {
        packets_lost as f64 / duration_secs
    } else {
        0.0
    };

    MDIResult {
        delay_factor_millis,
        media_loss_rate,
        mean_inter_arrival_millis: mean,
        jitter_millis: jitter,
        max_jitter_millis: max_jitter,
        buffer_depth_bytes,
        buffer_max_bytes,
        buffer_utilization,
        packets_lost,
        packets_out_of_order: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn arrivals_from_offsets_millis(offsets: &[u64]) -> Vec<Instant> {
        let base = Instant::now();
        offsets
            .iter()
            .map(|&ms| base + Duration::from_millis(ms))
            .collect()
    }

    #[test]
    fn matches_worked_example() {
        let arrivals = arrivals_from_offsets_millis(&[0, 10, 20, 30, 40, 100]);
        let result = compute_mdi(&arrivals, 0.1, 10.0, 0);

        assert!((result.mean_inter_arrival_millis - 20.0).abs() < 1e-6);
        assert!((result.jitter_millis - 20.0).abs() < 0.5);
        assert!((result.max_jitter_millis - 40.0).abs() < 1e-6);
        assert!((result.delay_factor_millis - 40.0).abs() < 1e-6);
        assert!(result.jitter_millis <= result.max_jitter_millis);
    }

    #[test]
    fn constant_rate_has_zero_jitter() {
        let arrivals = arrivals_from_offsets_millis(&[0, 10, 20, 30, 40]);
        let result = compute_mdi(&arrivals, 0.04, 10.0, 0);
        assert!(result.jitter_millis < 1e-9);
        assert!(result.max_jitter_millis < 1e-9);
    }

    #[test]
    fn fewer_than_two_arrivals_yields_default() {
        let arrivals = arrivals_from_offsets_millis(&[0]);
        let result = compute_mdi(&arrivals, 0.0, 10.0, 0);
        assert_eq!(result.mean_inter_arrival_millis, 0.0);
        assert_eq!(result.delay_factor_millis, 0.0);
    }

    #[test]
    fn zero_rate_yields_zero_buffer_and_df_unaffected() {
        let arrivals = arrivals_from_offsets_millis(&[0, 10, 20]);
        let result = compute_mdi(&arrivals, 0.02, 0.0, 0);
        assert_eq!(result.buffer_depth_bytes, 0.0);
        assert_eq!(result.buffer_max_bytes, 0.0);
        assert_eq!(result.buffer_utilization, 0.0);
    }

    #[test]
    fn zero_duration_yields_zero_media_loss_rate() {
        let arrivals = arrivals_from_offsets_millis(&[0, 10]);
        let result = compute_mdi(&arrivals, 0.0, 10.0, 5);
        assert_eq!(result.media_loss_rate, 0.0);
    }

    #[test]
    fn buffer_utilization_is_constant_ratio() {
        let arrivals = arrivals_from_offsets_millis(&[0, 10, 20]);
        let result = compute_mdi(&arrivals, 0.02, 5.0, 0);
        assert!((result.buffer_utilization - (1.0 / 1.5)).abs() < 1e-9);
    }
}
