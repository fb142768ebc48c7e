//! End-to-end pipeline tests: capture → analyze → MDI → QoE, exercising the
//! testable properties in the design document rather than re-testing any
//! single module's internals.

use std::time::{Duration, Instant};

use video_quality_monitor::analyzer::{analyze_ts, compute_mdi, score_qoe};

const PACKET_LEN: usize = 188;

fn synthetic_well_formed_stream(n: usize) -> Vec<u8> {
    let mut buf = vec![0u8; n * PACKET_LEN];
    let mut cc: u8 = 0;
    for i in 0..n {
        let packet = &mut buf[i * PACKET_LEN..(i + 1) * PACKET_LEN];
        packet[0] = 0x47;
        let (pid, pusi, first_byte) = if i == 0 {
            (0x0000u16, true, 0x00)
        } else if i == 1 {
            (0x0100u16, true, 0x02)
        } else if i % 2 == 0 {
            (0x0100u16, false, 0x00)
        } else {
            (0x0200u16, false, 0x00)
        };
        packet[1] = if pusi { 0x40 } else { 0x00 } | ((pid >> 8) as u8 & 0x1F);
        packet[2] = (pid & 0xFF) as u8;
        packet[3] = 0x10 | cc;
        packet[4] = first_byte;
        cc = (cc + 1) % 16;
    }
    buf
}

#[test]
fn well_formed_buffer_satisfies_sync_error_bound() {
    let buf = synthetic_well_formed_stream(40);
    let analysis = analyze_ts(&buf);
    let total_188_chunks = (buf.len() / PACKET_LEN) as u32;
    assert!(analysis.tr101290.sync_byte_error <= total_188_chunks);
    assert!(analysis.tr101290.total_packets <= total_188_chunks as u64);
}

#[test]
fn full_pipeline_produces_in_range_qoe_and_consistent_mdi() {
    let buf = synthetic_well_formed_stream(100);
    let analysis = analyze_ts(&buf);

    let base = Instant::now();
    let arrivals: Vec<Instant> = (0..20).map(|i| base + Duration::from_millis(i * 7)).collect();
    let mdi = compute_mdi(&arrivals, 0.14, 5.0, 0);
    assert!(mdi.jitter_millis <= mdi.max_jitter_millis);

    let qoe = score_qoe(&analysis.tr101290, &analysis.pid_stats, 5.0);
    assert!((1.0..=5.0).contains(&qoe.video_score));
    assert!((1.0..=5.0).contains(&qoe.audio_score));
    assert!((1.0..=5.0).contains(&qoe.composite_mos));
    assert!((qoe.composite_mos - (0.7 * qoe.video_score + 0.3 * qoe.audio_score)).abs() < 1e-9);
    assert!(qoe.video_active);
    assert!(qoe.audio_active);
}

#[test]
fn analysis_is_idempotent_across_repeated_calls() {
    let buf = synthetic_well_formed_stream(40);
    let first = analyze_ts(&buf);
    let second = analyze_ts(&buf);

    assert_eq!(first.tr101290.total_packets, second.tr101290.total_packets);
    assert_eq!(first.tr101290.continuity_count_error, second.tr101290.continuity_count_error);
    assert_eq!(first.pid_stats.seen_pids, second.pid_stats.seen_pids);

    let qoe_first = score_qoe(&first.tr101290, &first.pid_stats, 5.0);
    let qoe_second = score_qoe(&second.tr101290, &second.pid_stats, 5.0);
    assert_eq!(qoe_first.video_score, qoe_second.video_score);
    assert_eq!(qoe_first.composite_mos, qoe_second.composite_mos);
}
