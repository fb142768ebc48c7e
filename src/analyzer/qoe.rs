//! QoE Scorer (§4.5): a derived composite score over the TR 101 290 result
//! and the observed rate. Declared as a heuristic, reproducible bit-for-bit
//! from its inputs — no randomness, no wall-clock.

use crate::analyzer::ts::PidStats;
use crate::models::{QoEResult, TR101290Result};

const VIDEO_PID_RANGE: std::ops::RangeInclusive<u16> = 0x0100..=0x01FF;
const AUDIO_PID_RANGE: std::ops::RangeInclusive<u16> = 0x0200..=0x02FF;

const MIN_SCORE: f64 = 1.0;
const MAX_SCORE: f64 = 5.0;

/// Derive a video/audio quality score and composite MOS from the analyzer
/// output, the coarse PID-presence heuristic, and the observed rate.
pub fn score_qoe(tr101290: &TR101290Result, pid_stats: &PidStats, rate_mbps: f64) -> QoEResult {
    let video_penalty = (tr101290.sync_byte_error as f64 * 0.5).min(2.0)
        + (tr101290.continuity_count_error as f64 * 0.1).min(1.5)
        + (tr101290.pmt_error as f64 * 0.3).min(1.0);
    let video_score = (MAX_SCORE - video_penalty).max(MIN_SCORE);

    let audio_penalty = (tr101290.continuity_count_error as f64 * 0.1).min(1.5);
    let audio_score = (MAX_SCORE - audio_penalty).max(MIN_SCORE);

    let composite_mos = 0.7 * video_score + 0.3 * audio_score;

    let video_active = pid_stats.seen_pids.iter().any(|pid| VIDEO_PID_RANGE.contains(pid));
    let audio_active = pid_stats.seen_pids.iter().any(|pid| AUDIO_PID_RANGE.contains(pid));

    let video_bitrate_mbps = if video_active { rate_mbps * 0.85 } else { 0.0 };
    let audio_bitrate_kbps = if audio_active { rate_mbps * 0.15 * 1000.0 } else { 0.0 };

    QoEResult {
        video_score,
        audio_score,
        composite_mos,
        video_active,
        audio_active,
        video_bitrate_mbps,
        audio_bitrate_kbps,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid_stats(pids: &[u16]) -> PidStats {
        PidStats {
            seen_pids: pids.iter().copied().collect(),
        }
    }

    #[test]
    fn clean_stream_scores_perfect() {
        let tr = TR101290Result::default();
        let stats = pid_stats(&[0x0000, 0x0100, 0x0200]);
        let qoe = score_qoe(&tr, &stats, 10.0);
        assert_eq!(qoe.video_score, 5.0);
        assert_eq!(qoe.audio_score, 5.0);
        assert!((qoe.composite_mos - 5.0).abs() < 1e-9);
        assert!(qoe.video_active);
        assert!(qoe.audio_active);
    }

    #[test]
    fn composite_mos_matches_weighted_formula() {
        let mut tr = TR101290Result::default();
        tr.continuity_count_error = 3;
        let stats = pid_stats(&[]);
        let qoe = score_qoe(&tr, &stats, 5.0);
        let expected = 0.7 * qoe.video_score + 0.3 * qoe.audio_score;
        assert!((qoe.composite_mos - expected).abs() < 1e-9);
    }

    #[test]
    fn scores_never_leave_one_to_five() {
        let mut tr = TR101290Result::default();
        tr.sync_byte_error = 1000;
        tr.continuity_count_error = 1000;
        tr.pmt_error = 1000;
        let stats = pid_stats(&[]);
        let qoe = score_qoe(&tr, &stats, 10.0);
        assert!((1.0..=5.0).contains(&qoe.video_score));
        assert!((1.0..=5.0).contains(&qoe.audio_score));
        assert!((1.0..=5.0).contains(&qoe.composite_mos));
    }

    #[test]
    fn inactive_pid_ranges_zero_the_bitrate_split() {
        let tr = TR101290Result::default();
        let stats = pid_stats(&[0x0000]);
        let qoe = score_qoe(&tr, &stats, 10.0);
        assert!(!qoe.video_active);
        assert!(!qoe.audio_active);
        assert_eq!(qoe.video_bitrate_mbps, 0.0);
        assert_eq!(qoe.audio_bitrate_kbps, 0.0);
    }

    #[test]
    fn idempotent_given_same_inputs() {
        let mut tr = TR101290Result::default();
        tr.continuity_count_error = 2;
        tr.sync_byte_error = 1;
        let stats = pid_stats(&[0x0100, 0x0200]);
        let a = score_qoe(&tr, &stats, 8.0);
        let b = score_qoe(&tr, &stats, 8.0);
        assert_eq!(a.video_score, b.video_score);
        assert_eq!(a.audio_score, b.audio_score);
        assert_eq!(a.composite_mos, b.composite_mos);
    }
}
