//! Core data model: §3 of the design document.
//!
//! Entities here are short-lived — nothing outlives a single monitoring
//! cycle except `InputSource`, which the core only ever holds a refreshed
//! copy of.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod capture;
pub mod hls;
pub mod quality;

pub use capture::{CaptureWindow, Datagram};
pub use hls::{PlaylistValidation, Rung, SegmentSample};
pub use quality::{MDIResult, QoEResult, TR101290Result};

/// Kind of stream input, dispatched to a different probe flavor by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "input_kind", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum InputKind {
    MpegtsUdp,
    Hls,
    Http,
}

/// A single monitored stream input, owned by the external configuration store.
///
/// The core only ever holds a short-lived copy, refreshed at the start of
/// each cycle; it never writes back anything except `snapshot_path` /
/// `last_snapshot_instant`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct InputSource {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    pub kind: InputKind,
    pub port: Option<u16>,
    pub channel_ref: Option<String>,
    pub probe_ref: Option<String>,
    pub is_primary: bool,
    pub enabled: bool,
    pub snapshot_path: Option<String>,
    pub last_snapshot_instant: Option<DateTime<Utc>>,
}
