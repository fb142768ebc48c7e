//! Pure analyzers over a captured byte buffer: TR 101 290 (§4.3), RFC 4445
//! MDI (§4.4), and the derived QoE score (§4.5). No I/O, no shared state —
//! each is a single-pass function over its inputs.

pub mod mdi;
pub mod qoe;
pub mod ts;

pub use mdi::compute_mdi;
pub use qoe::score_qoe;
pub use ts::{analyze_ts, PidStats, TsAnalysis};
