//! # Module SSDP - Simple Service Discovery Protocol
//!
//! Control-point side of SSDP: send one `M-SEARCH` for a search target and
//! collect the unicast `HTTP/1.1 200 OK` answers during a bounded window.
//!
//! - [`SsdpClient`] : async M-SEARCH client
//! - [`SearchResponse`] : one parsed answer
//! - [`location_host`] : host part of a `LOCATION` header
//!
//! ## SSDP constants
//!
//! - **Multicast Address**: 239.255.255.250:1900
//! - **Max-Age**: 1800 seconds (30 minutes)

mod client;
mod message;

pub use client::SsdpClient;
pub use message::{SearchResponse, build_msearch, location_host, parse_search_response};

use thiserror::Error;

/// SSDP multicast address
pub const SSDP_MULTICAST_ADDR: &str = "239.255.255.250";

/// SSDP port
pub const SSDP_PORT: u16 = 1900;

/// Announcement lifetime in seconds
pub const MAX_AGE: u32 = 1800;

#[derive(Debug, Error)]
pub enum SsdpError {
    #[error("SSDP socket error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid SSDP address: {0}")]
    Address(#[from] std::net::AddrParseError),
}
