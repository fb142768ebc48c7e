//! UDP Capture (§4.2): join a multicast group (or just bind, for unicast
//! sources), and record arrival timestamps and lengths until either enough
//! datagrams have arrived or a receive times out.
//!
//! Grounded on `casterplay-BassAES67`'s multicast socket setup, adapted to
//! `tokio::net::UdpSocket` with `tokio::time::timeout` standing in for the
//! blocking variant's `set_read_timeout`.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};

use tokio::net::UdpSocket;
use tracing::{debug, warn};

use crate::errors::{SocketError, UrlParseError};
use crate::models::CaptureWindow;

const RECV_BUF_LEN: usize = 65536;

/// Parsed `udp://<host>:<port>` input URL.
pub struct UdpTarget {
    pub host: IpAddr,
    pub port: u16,
    pub is_multicast: bool,
}

impl UdpTarget {
    pub fn parse(url: &str, input_id: uuid::Uuid) -> Result<Self, UrlParseError> {
        let rest = url.strip_prefix("udp://").ok_or_else(|| UrlParseError::Malformed {
            input_id,
            url: url.to_string(),
            message: "expected udp:// scheme".to_string(),
        })?;

        let (host_str, port_str) = rest.rsplit_once(':').ok_or_else(|| UrlParseError::Malformed {
            input_id,
            url: url.to_string(),
            message: "missing :port".to_string(),
        })?;

        let host: IpAddr = host_str.parse().map_err(|_| UrlParseError::Malformed {
            input_id,
            url: url.to_string(),
            message: format!("invalid host '{host_str}'"),
        })?;

        let port: u16 = port_str.parse().map_err(|_| UrlParseError::Malformed {
            input_id,
            url: url.to_string(),
            message: format!("invalid port '{port_str}'"),
        })?;

        let is_multicast = match host {
            IpAddr::V4(v4) => v4.is_multicast(),
            IpAddr::V6(v6) => v6.is_multicast(),
        };

        Ok(Self { host, port, is_multicast })
    }
}

/// Capture a bounded window of traffic for one input.
///
/// Ends the receive loop when either `min_ts_packets` datagrams have arrived
/// or a receive exceeds `timeout`. The socket is always closed on return
/// (it's a local `UdpSocket`, dropped at the end of scope, including on the
/// early-return error paths).
pub async fn capture_window(
    target: &UdpTarget,
    timeout: Duration,
    min_ts_packets: usize,
    buffer_cap: usize,
) -> Result<CaptureWindow, SocketError> {
    let bind_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), target.port);
    let socket = UdpSocket::bind(bind_addr).await.map_err(|e| SocketError::BindFailed {
        port: target.port,
        message: e.to_string(),
    })?;

    if target.is_multicast {
        if let IpAddr::V4(group) = target.host {
            socket
                .join_multicast_v4(group, Ipv4Addr::UNSPECIFIED)
                .map_err(|e| SocketError::JoinFailed {
                    group: group.to_string(),
                    message: e.to_string(),
                })?;
        } else {
            warn!("ipv6 multicast join not supported for {}", target.host);
        }
    }

    let start = Instant::now();
    let mut window = CaptureWindow::new(start, buffer_cap);
    let mut buf = vec![0u8; RECV_BUF_LEN];

    loop {
        match tokio::time::timeout(timeout, socket.recv(&mut buf)).await {
            Ok(Ok(len)) => {
                window.record(Instant::now(), &buf[..len]);
                if window.packets_received() >= min_ts_packets {
                    break;
                }
            }
            Ok(Err(e)) => {
                return Err(SocketError::ReceiveFailed(e.to_string()));
            }
            Err(_elapsed) => {
                debug!(
                    "udp receive timed out after {} datagrams for port {}",
                    window.packets_received(),
                    target.port
                );
                break;
            }
        }
    }

    window.duration = start.elapsed();
    window.is_valid = is_valid_ts_capture(&window, min_ts_packets);

    // Socket is dropped here on every exit path, including the error returns above.
    Ok(window)
}

/// A capture is valid when at least one datagram's length is a whole number
/// of 188-byte TS packets starting with the sync byte, and the minimum
/// datagram count was met.
fn is_valid_ts_capture(window: &CaptureWindow, min_ts_packets: usize) -> bool {
    if window.packets_received() < min_ts_packets {
        return false;
    }
    window.datagrams.iter().enumerate().any(|(i, d)| {
        d.bytes > 0 && d.bytes % 188 == 0 && {
            let offset: usize = window.datagrams[..i].iter().map(|d| d.bytes).sum();
            window.buffer.get(offset).copied() == Some(0x47)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_multicast_udp_url() {
        let id = uuid::Uuid::new_v4();
        let target = UdpTarget::parse("udp://239.1.1.1:5000", id).unwrap();
        assert_eq!(target.port, 5000);
        assert!(target.is_multicast);
    }

    #[test]
    fn parses_unicast_udp_url() {
        let id = uuid::Uuid::new_v4();
        let target = UdpTarget::parse("udp://10.0.0.5:5000", id).unwrap();
        assert!(!target.is_multicast);
    }

    #[test]
    fn rejects_missing_scheme() {
        let id = uuid::Uuid::new_v4();
        assert!(UdpTarget::parse("10.0.0.5:5000", id).is_err());
    }

    #[test]
    fn rejects_missing_port() {
        let id = uuid::Uuid::new_v4();
        assert!(UdpTarget::parse("udp://10.0.0.5", id).is_err());
    }
}
