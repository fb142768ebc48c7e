//! HLS Validator (§4.6): master manifest fetch, ABR ladder extraction,
//! per-rendition variant validation, and last-two-segment sampling.
//!
//! Grounded on the `m3u8_rs::parse_playlist_res` usage pattern from
//! `mesio::hls::playlist`, adapted from a long-lived monitor to a
//! one-shot-per-cycle fetch-and-validate.

use std::time::{Duration, Instant};

use m3u8_rs::Playlist;
use reqwest::Client;
use tracing::warn;
use url::Url;

use crate::config::HlsConfig;
use crate::errors::{HttpError, ParseError};
use crate::models::{PlaylistValidation, Rung, SegmentSample};

/// Build the master manifest URL for a channel, per §4.6's fixed layout.
pub fn master_manifest_url(packager_base: &str, channel_id: &str) -> String {
    format!("{}/live/{}/master.m3u8", packager_base.trim_end_matches('/'), channel_id)
}

/// Resolve a variant/segment URI against the playlist it was read from
/// (RFC 8216 §4.1: URI lines may be relative). Absolute URIs pass through.
fn resolve_url(uri: &str, base: &Url) -> Result<Url, HttpError> {
    if uri.starts_with("http://") || uri.starts_with("https://") {
        uri.parse::<Url>().map_err(|_| HttpError::Transport {
            url: uri.to_string(),
            message: "unparseable absolute uri".to_string(),
        })
    } else {
        base.join(uri).map_err(|_| HttpError::Transport {
            url: uri.to_string(),
            message: format!("cannot resolve relative uri against base {base}"),
        })
    }
}

/// Fetch and parse the master playlist, returning the rendition ladder with
/// variant URIs resolved to absolute URLs.
pub async fn fetch_ladder(
    client: &Client,
    packager_base: &str,
    channel_id: &str,
    timeout: Duration,
) -> Result<Vec<Rung>, HttpError> {
    let url = master_manifest_url(packager_base, channel_id);
    let base = url.parse::<Url>().map_err(|_| HttpError::Transport {
        url: url.clone(),
        message: "master manifest url is not a valid url".to_string(),
    })?;
    let bytes = fetch_bytes(client, &url, timeout).await?;

    let playlist = m3u8_rs::parse_playlist_res(&bytes).map_err(|e| HttpError::Transport {
        url: url.clone(),
        message: format!("master manifest parse error: {e:?}"),
    })?;

    let master = match playlist {
        Playlist::MasterPlaylist(m) => m,
        Playlist::MediaPlaylist(_) => {
            return Err(HttpError::Transport {
                url,
                message: "expected master playlist, got media playlist".to_string(),
            })
        }
    };

    let mut rungs = Vec::with_capacity(master.variants.len());
    for variant in &master.variants {
        let resolved = resolve_url(&variant.uri, &base)?;
        rungs.push(Rung {
            id: rung_id_from_uri(&variant.uri),
            uri: resolved.to_string(),
            bandwidth_kbps: variant.bandwidth / 1000,
            resolution: variant.resolution.map(|r| (r.width, r.height)),
        });
    }

    Ok(rungs)
}

/// Derive a rendition id from the variant URI stem (filename without extension).
fn rung_id_from_uri(uri: &str) -> String {
    uri.rsplit('/')
        .next()
        .unwrap_or(uri)
        .rsplit_once('.')
        .map(|(stem, _ext)| stem.to_string())
        .unwrap_or_else(|| uri.to_string())
}

/// Fetch and validate one rendition's variant playlist against the shape
/// rules in §4.6. Returns the validation result, and — when valid — the
/// parsed segment URIs so the caller can sample the last two.
pub async fn validate_variant(
    client: &Client,
    channel_id: &str,
    rung: &Rung,
    config: &HlsConfig,
    timeout: Duration,
) -> Result<(PlaylistValidation, Vec<(String, f64)>), ParseError> {
    let base = rung.uri.parse::<Url>().map_err(|_| ParseError::Manifest {
        kind: "variant playlist",
        url: rung.uri.clone(),
        message: "rung url is not a valid url".to_string(),
    })?;

    let bytes = fetch_bytes(client, &rung.uri, timeout)
        .await
        .map_err(|e| ParseError::Manifest {
            kind: "variant playlist",
            url: rung.uri.clone(),
            message: e.to_string(),
        })?;

    let playlist = m3u8_rs::parse_playlist_res(&bytes).map_err(|e| ParseError::Manifest {
        kind: "variant playlist",
        url: rung.uri.clone(),
        message: format!("{e:?}"),
    })?;

    let media = match playlist {
        Playlist::MediaPlaylist(m) => m,
        Playlist::MasterPlaylist(_) => {
            return Err(ParseError::Manifest {
                kind: "variant playlist",
                url: rung.uri.clone(),
                message: "expected media playlist, got master playlist".to_string(),
            })
        }
    };

    let mut errors = Vec::new();
    let segment_count = media.segments.len();

    if segment_count < config.min_playlist_segments {
        errors.push(format!(
            "Too few segments: found {segment_count}, need at least {}",
            config.min_playlist_segments
        ));
    }

    let target = config.target_segment_duration_secs;
    let tolerance_abs = config.tolerance * target;
    let reported_target = media.target_duration as f64;
    if (reported_target - target).abs() > tolerance_abs {
        errors.push(format!(
            "targetDuration {reported_target} deviates from expected {target} by more than {:.0}%",
            config.tolerance * 100.0
        ));
    }

    let avg_segment_duration = if segment_count > 0 {
        media.segments.iter().map(|s| s.duration as f64).sum::<f64>() / segment_count as f64
    } else {
        0.0
    };
    if segment_count > 0 && (avg_segment_duration - target).abs() > tolerance_abs {
        errors.push(format!(
            "mean segment duration {avg_segment_duration:.2}s deviates from expected {target}s by more than {:.0}%",
            config.tolerance * 100.0
        ));
    }

    let discontinuity_count = media.segments.iter().filter(|s| s.discontinuity).count() as u64;
    if discontinuity_count > 0 {
        warn!(
            "variant {} ({}) signalled {discontinuity_count} discontinuit{}",
            rung.id,
            channel_id,
            if discontinuity_count == 1 { "y" } else { "ies" }
        );
    }

    let mut segments = Vec::with_capacity(media.segments.len());
    for s in &media.segments {
        let resolved = resolve_url(&s.uri, &base).map_err(|e| ParseError::Manifest {
            kind: "segment uri",
            url: s.uri.clone(),
            message: e.to_string(),
        })?;
        segments.push((resolved.to_string(), s.duration as f64));
    }

    let validation = PlaylistValidation::new(
        channel_id.to_string(),
        rung.id.clone(),
        avg_segment_duration,
        segment_count,
        discontinuity_count,
        errors,
    );

    Ok((validation, segments))
}

/// Sample the **last two** segments of a rendition: time the fetch, hash
/// the body, and extract the segment number from the URI stem.
pub async fn sample_recent_segments(
    client: &Client,
    channel_id: &str,
    rung: &Rung,
    segments: &[(String, f64)],
    config: &HlsConfig,
) -> Vec<SegmentSample> {
    let recent = segments.iter().rev().take(2).rev();
    let mut samples = Vec::new();

    for (uri, extinf_duration) in recent {
        let started = Instant::now();
        let response = client
            .get(uri)
            .timeout(Duration::from_secs_f64(config.max_download_time_secs.max(1.0)))
            .send()
            .await;

        let sample = match response {
            Ok(resp) => {
                let status = resp.status().as_u16();
                let body = resp.bytes().await.unwrap_or_default();
                let download_millis = started.elapsed().as_millis() as u64;
                let size_bytes = body.len();
                let content_hash = format!("{:x}", md5::compute(&body));

                if size_bytes < config.min_segment_size_bytes {
                    warn!("segment {uri} is only {size_bytes} bytes, below the configured minimum");
                }
                if download_millis as f64 > config.max_download_time_secs * 1000.0 {
                    warn!("segment {uri} took {download_millis}ms to download");
                }
                if status != 200 {
                    warn!("segment {uri} returned http status {status}");
                }

                SegmentSample {
                    channel: channel_id.to_string(),
                    rung_id: rung.id.clone(),
                    segment_number: segment_number_from_uri(uri),
                    duration_seconds: *extinf_duration,
                    size_bytes,
                    download_millis,
                    http_status: status,
                    content_hash,
                }
            }
            Err(e) => {
                warn!("failed to fetch segment {uri}: {e}");
                SegmentSample {
                    channel: channel_id.to_string(),
                    rung_id: rung.id.clone(),
                    segment_number: segment_number_from_uri(uri),
                    duration_seconds: *extinf_duration,
                    size_bytes: 0,
                    download_millis: started.elapsed().as_millis() as u64,
                    http_status: 0,
                    content_hash: String::new(),
                }
            }
        };
        samples.push(sample);
    }

    samples
}

/// Segment number is the last hyphen-separated token before the extension.
fn segment_number_from_uri(uri: &str) -> Option<u64> {
    let stem = uri.rsplit('/').next().unwrap_or(uri).rsplit_once('.').map(|(s, _)| s)?;
    stem.rsplit('-').next()?.parse().ok()
}

async fn fetch_bytes(client: &Client, url: &str, timeout: Duration) -> Result<bytes::Bytes, HttpError> {
    let response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| HttpError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(HttpError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    response.bytes().await.map_err(|e| HttpError::Transport {
        url: url.to_string(),
        message: e.to_string(),
    })
}
