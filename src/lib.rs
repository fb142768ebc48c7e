//! Multi-probe live-video quality monitoring service for an IPTV/OTT headend.
//!
//! The core pipeline per monitoring cycle: `scheduler` enumerates enabled
//! inputs from `store` and, per input, drives either the UDP path
//! (`capture` → `analyzer`) or the `hls` path, publishing results through
//! `metrics` and, for UDP inputs, throttled frame grabs via `snapshot`.

pub mod analyzer;
pub mod capture;
pub mod config;
pub mod errors;
pub mod hls;
pub mod metrics;
pub mod models;
pub mod scheduler;
pub mod snapshot;
pub mod store;
pub mod web;
