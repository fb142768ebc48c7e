//! Error type definitions for the video quality monitor.
//!
//! Mirrors the taxonomy in the design document: every external step returns
//! a structured error kind instead of panicking, and the scheduler is the
//! only place that turns an `Err` into a log line.

use thiserror::Error;

/// Top-level error type for a single probe task.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// The configuration store could not be reached or returned garbage this cycle.
    #[error("config store error: {0}")]
    ConfigStore(#[from] ConfigStoreError),

    /// The input's `url` field didn't parse for its declared kind.
    #[error("url parse error: {0}")]
    UrlParse(#[from] UrlParseError),

    /// Socket bind/join/receive failed.
    #[error("socket error: {0}")]
    Socket(#[from] SocketError),

    /// A receive or HTTP operation hit its deadline.
    #[error("timeout: {0}")]
    Timeout(#[from] TimeoutError),

    /// Non-2xx or transport failure talking to an HTTP(S) endpoint.
    #[error("http error: {0}")]
    Http(#[from] HttpError),

    /// A manifest or playlist failed to parse.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// The external frame-grabber subprocess misbehaved.
    #[error("subprocess error: {0}")]
    Subprocess(#[from] SubprocessError),

    /// The metrics sink rejected or dropped a write.
    #[error("sink write error: {0}")]
    SinkWrite(#[from] SinkWriteError),
}

#[derive(Error, Debug)]
pub enum ConfigStoreError {
    #[error("cannot enumerate inputs: {0}")]
    EnumerationFailed(String),
    #[error("cannot record snapshot for input {input_id}: {message}")]
    SnapshotWriteFailed { input_id: uuid::Uuid, message: String },
}

#[derive(Error, Debug)]
pub enum UrlParseError {
    #[error("input {input_id} has malformed url '{url}': {message}")]
    Malformed {
        input_id: uuid::Uuid,
        url: String,
        message: String,
    },
    #[error("unsupported scheme '{scheme}' for input {input_id}")]
    UnsupportedScheme { input_id: uuid::Uuid, scheme: String },
}

#[derive(Error, Debug)]
pub enum SocketError {
    #[error("bind failed on port {port}: {message}")]
    BindFailed { port: u16, message: String },
    #[error("failed to join multicast group {group}: {message}")]
    JoinFailed { group: String, message: String },
    #[error("receive failed: {0}")]
    ReceiveFailed(String),
}

#[derive(Error, Debug)]
pub enum TimeoutError {
    #[error("udp receive timed out after {millis}ms with {datagrams_received} datagrams")]
    UdpReceive { millis: u64, datagrams_received: usize },
    #[error("http request to {url} timed out after {millis}ms")]
    Http { url: String, millis: u64 },
    #[error("task exceeded its per-input deadline of {millis}ms")]
    Deadline { millis: u64 },
}

#[derive(Error, Debug)]
pub enum HttpError {
    #[error("http {status} fetching {url}")]
    Status { url: String, status: u16 },
    #[error("transport failure fetching {url}: {message}")]
    Transport { url: String, message: String },
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("failed to parse {kind} at {url}: {message}")]
    Manifest {
        kind: &'static str,
        url: String,
        message: String,
    },
}

#[derive(Error, Debug)]
pub enum SubprocessError {
    #[error("frame grabber for input {input_id} timed out after {millis}ms")]
    Timeout { input_id: uuid::Uuid, millis: u64 },
    #[error("frame grabber for input {input_id} exited with status {status}")]
    NonZeroExit { input_id: uuid::Uuid, status: i32 },
    #[error("frame grabber for input {input_id} failed to spawn: {message}")]
    SpawnFailed { input_id: uuid::Uuid, message: String },
}

#[derive(Error, Debug)]
pub enum SinkWriteError {
    #[error("metrics sink rejected write: http {status}")]
    Rejected { status: u16 },
    #[error("metrics sink unreachable: {message}")]
    Unreachable { message: String },
}
