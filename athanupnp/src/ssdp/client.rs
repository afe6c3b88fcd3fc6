//! SSDP client for UPnP device discovery.
//!
//! The client is a *control point* only. It binds an ephemeral port
//! (`0.0.0.0:0`), never 1900: answers to an M-SEARCH come back unicast to
//! the sending socket, and sharing 1900 with a local SSDP server makes the
//! kernel load-balance datagrams between the two sockets.

use super::{SSDP_MULTICAST_ADDR, SSDP_PORT, SearchResponse, SsdpError, build_msearch, parse_search_response};
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, warn};

/// Async SSDP client sending M-SEARCH requests
pub struct SsdpClient {
    socket: UdpSocket,
}

impl SsdpClient {
    /// Creates the client socket. Must be called inside a tokio runtime.
    pub fn new() -> Result<Self, SsdpError> {
        let socket2 = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket2.set_reuse_address(true)?;
        socket2.set_nonblocking(true)?;

        let bind_addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0));
        socket2.bind(&bind_addr.into())?;

        let std_socket: std::net::UdpSocket = socket2.into();
        std_socket.set_multicast_loop_v4(true)?;

        let group: Ipv4Addr = SSDP_MULTICAST_ADDR.parse()?;
        for iface in get_if_addrs::get_if_addrs()? {
            if let std::net::IpAddr::V4(ipv4) = iface.ip() {
                if ipv4.is_loopback() {
                    continue;
                }
                match std_socket.join_multicast_v4(&group, &ipv4) {
                    Ok(()) => debug!("SSDP: joined {} on {}", SSDP_MULTICAST_ADDR, ipv4),
                    Err(e) => warn!(
                        "SSDP: failed to join {} on {}: {}",
                        SSDP_MULTICAST_ADDR, ipv4, e
                    ),
                }
            }
        }

        let socket = UdpSocket::from_std(std_socket)?;
        debug!("SSDP client bound on {:?}", socket.local_addr().ok());

        Ok(Self { socket })
    }

    /// Sends one M-SEARCH for `st` and collects the answers received before
    /// `window` elapses, in arrival order.
    pub async fn search(
        &self,
        st: &str,
        window: Duration,
    ) -> Result<Vec<SearchResponse>, SsdpError> {
        let mx = window.as_secs().max(1) as u32;
        let msg = build_msearch(st, mx);
        let target: SocketAddr = format!("{}:{}", SSDP_MULTICAST_ADDR, SSDP_PORT).parse()?;

        self.socket.send_to(msg.as_bytes(), target).await?;
        info!("📤 M-SEARCH sent (ST={}, MX={})", st, mx);

        let deadline = Instant::now() + window;
        let mut responses = Vec::new();
        let mut buf = [0u8; 8192];

        loop {
            match timeout_at(deadline, self.socket.recv_from(&mut buf)).await {
                Err(_) => break,
                Ok(Ok((n, from))) => {
                    let data = String::from_utf8_lossy(&buf[..n]);
                    if let Some(resp) = parse_search_response(&data, from) {
                        if resp.st.eq_ignore_ascii_case(st) || st == "ssdp:all" {
                            debug!("📥 SSDP answer from {}: {}", from, resp.location);
                            responses.push(resp);
                        }
                    }
                }
                Ok(Err(e)) => {
                    warn!("❌ SSDP client read error: {}", e);
                }
            }
        }

        info!("🔎 SSDP search for {} got {} answer(s)", st, responses.len());
        Ok(responses)
    }
}
