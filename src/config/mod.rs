//! Daemon configuration: file-backed defaults layered with environment
//! variable overrides, following the teacher's `Config::load()` shape.

use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub web: WebConfig,
    pub database: DatabaseConfig,
    pub scheduler: SchedulerConfig,
    pub udp: UdpConfig,
    pub hls: HlsConfig,
    pub snapshot: SnapshotConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// DSN for the read-only configuration store.
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds to sleep between the end of one cycle and the start of the next.
    pub poll_interval_secs: u64,
    /// Maximum concurrent per-input tasks.
    pub worker_count: usize,
    /// Hard per-input deadline in seconds.
    pub input_deadline_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UdpConfig {
    /// Receive timeout signalling end-of-capture-window.
    pub timeout_secs: u64,
    /// Minimum datagrams to capture before ending the window early.
    pub min_ts_packets: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HlsConfig {
    pub packager_base_url: String,
    pub request_timeout_secs: u64,
    pub target_segment_duration_secs: f64,
    pub tolerance: f64,
    pub min_playlist_segments: usize,
    pub min_segment_size_bytes: usize,
    pub max_download_time_secs: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotConfig {
    pub enabled: bool,
    pub interval_secs: i64,
    pub directory: String,
    pub frame_grabber_path: String,
    pub capture_duration_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    pub sink_endpoint: String,
    pub sink_token: Option<String>,
    pub max_retries: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            web: WebConfig {
                host: "0.0.0.0".to_string(),
                port: 9090,
            },
            database: DatabaseConfig {
                url: "sqlite://./video-quality-monitor.db".to_string(),
            },
            scheduler: SchedulerConfig {
                poll_interval_secs: 60,
                worker_count: 10,
                input_deadline_secs: 60,
            },
            udp: UdpConfig {
                timeout_secs: 5,
                min_ts_packets: 100,
            },
            hls: HlsConfig {
                packager_base_url: "http://localhost:8088".to_string(),
                request_timeout_secs: 10,
                target_segment_duration_secs: 6.0,
                tolerance: 0.10,
                min_playlist_segments: 3,
                min_segment_size_bytes: 50_000,
                max_download_time_secs: 2.0,
            },
            snapshot: SnapshotConfig {
                enabled: false,
                interval_secs: 300,
                directory: "./data/snapshots".to_string(),
                frame_grabber_path: "ffmpeg".to_string(),
                capture_duration_secs: 2,
            },
            metrics: MetricsConfig {
                sink_endpoint: "http://localhost:8086/write?db=video_quality".to_string(),
                sink_token: None,
                max_retries: 3,
            },
        }
    }
}

impl Config {
    /// Load from `CONFIG_FILE` (default `config.toml`), writing out the
    /// defaults on first run, then layer environment variable overrides.
    pub fn load() -> Result<Self> {
        let config_file =
            std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".to_string());

        let mut cfg = if std::path::Path::new(&config_file).exists() {
            let contents = std::fs::read_to_string(&config_file)?;
            toml::from_str(&contents)?
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config)?;
            std::fs::write(&config_file, contents)?;
            default_config
        };

        cfg.apply_env_overrides();
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("VQM_POLL_INTERVAL_SECS") {
            if let Ok(n) = v.parse() {
                self.scheduler.poll_interval_secs = n;
            }
        }
        if let Ok(v) = std::env::var("VQM_WORKER_COUNT") {
            if let Ok(n) = v.parse() {
                self.scheduler.worker_count = n;
            }
        }
        if let Ok(v) = std::env::var("VQM_INPUT_DEADLINE_SECS") {
            if let Ok(n) = v.parse() {
                self.scheduler.input_deadline_secs = n;
            }
        }
        if let Ok(v) = std::env::var("VQM_UDP_TIMEOUT_SECS") {
            if let Ok(n) = v.parse() {
                self.udp.timeout_secs = n;
            }
        }
        if let Ok(v) = std::env::var("VQM_MIN_TS_PACKETS") {
            if let Ok(n) = v.parse() {
                self.udp.min_ts_packets = n;
            }
        }
        if let Ok(v) = std::env::var("VQM_PACKAGER_BASE_URL") {
            self.hls.packager_base_url = v;
        }
        if let Ok(v) = std::env::var("VQM_SNAPSHOT_ENABLED") {
            if let Ok(b) = v.parse() {
                self.snapshot.enabled = b;
            }
        }
        if let Ok(v) = std::env::var("VQM_SNAPSHOT_INTERVAL_SECS") {
            if let Ok(n) = v.parse() {
                self.snapshot.interval_secs = n;
            }
        }
        if let Ok(v) = std::env::var("VQM_SNAPSHOT_DIR") {
            self.snapshot.directory = v;
        }
        if let Ok(v) = std::env::var("VQM_METRICS_SINK_ENDPOINT") {
            self.metrics.sink_endpoint = v;
        }
        if let Ok(v) = std::env::var("VQM_METRICS_SINK_TOKEN") {
            self.metrics.sink_token = Some(v);
        }
        if let Ok(v) = std::env::var("VQM_DATABASE_URL") {
            self.database.url = v;
        }
    }
}
