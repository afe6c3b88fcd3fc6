//! SSDP wire messages: M-SEARCH construction and search response parsing

use super::{MAX_AGE, SSDP_MULTICAST_ADDR, SSDP_PORT};
use std::collections::HashMap;
use std::net::SocketAddr;
use tracing::trace;
use url::Url;

/// Unicast answer to an M-SEARCH
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResponse {
    pub usn: String,
    pub st: String,
    pub location: String,
    pub server: String,
    pub max_age: u32,
    pub from: SocketAddr,
}

impl SearchResponse {
    /// Host of the device description URL, the address used for control
    pub fn host(&self) -> Option<String> {
        location_host(&self.location)
    }
}

/// Builds the M-SEARCH datagram for the search target `st`
pub fn build_msearch(st: &str, mx: u32) -> String {
    let mx = mx.max(1); // MX must be >= 1
    format!(
        "M-SEARCH * HTTP/1.1\r\n\
         HOST: {}:{}\r\n\
         MAN: \"ssdp:discover\"\r\n\
         MX: {}\r\n\
         ST: {}\r\n\
         USER-AGENT: Athan SSDP Client\r\n\
         \r\n",
        SSDP_MULTICAST_ADDR, SSDP_PORT, mx, st
    )
}

/// Host part of a `LOCATION` URL: `http://192.168.1.20:1400/xml/device_description.xml`
/// yields `192.168.1.20`
pub fn location_host(location: &str) -> Option<String> {
    let url = Url::parse(location.trim()).ok()?;
    url.host_str()
        .filter(|h| !h.is_empty())
        .map(|h| h.trim_start_matches('[').trim_end_matches(']').to_string())
}

/// Parses a datagram received on the search socket.
///
/// Only `HTTP/1.1 200` answers carrying `ST`, `USN` and `LOCATION` are kept.
pub fn parse_search_response(data: &str, from: SocketAddr) -> Option<SearchResponse> {
    let mut lines = data.lines();
    let first_line = lines.next()?.trim();
    let upper = first_line.to_ascii_uppercase();

    if !(upper.starts_with("HTTP/") && upper.contains(" 200")) {
        trace!("Ignoring SSDP message from {}: {}", from, first_line);
        return None;
    }

    let headers = parse_headers(lines);

    let Some(st) = headers.get("ST") else {
        trace!("M-SEARCH response from {} missing ST header, ignoring", from);
        return None;
    };
    let Some(usn) = headers.get("USN") else {
        trace!("M-SEARCH response from {} missing USN header, ignoring", from);
        return None;
    };
    let Some(location) = headers.get("LOCATION") else {
        trace!(
            "M-SEARCH response from {} missing LOCATION header, ignoring",
            from
        );
        return None;
    };

    let server = headers
        .get("SERVER")
        .cloned()
        .unwrap_or_else(|| "Unknown".to_string());
    let max_age = parse_max_age(headers.get("CACHE-CONTROL"));

    Some(SearchResponse {
        usn: usn.clone(),
        st: st.clone(),
        location: location.clone(),
        server,
        max_age,
        from,
    })
}

fn parse_headers<'a, I>(lines: I) -> HashMap<String, String>
where
    I: Iterator<Item = &'a str>,
{
    let mut headers = HashMap::new();
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            break;
        }

        // Values may contain ':' (URLs), split on the first one only
        match line.split_once(':') {
            Some((name, value)) => {
                let name = name.trim().to_ascii_uppercase();
                let value = value.trim();
                if !name.is_empty() && !value.is_empty() {
                    headers.insert(name, value.to_string());
                }
            }
            None => trace!("Skipping line without colon: '{}'", line),
        }
    }
    headers
}

fn parse_max_age(value: Option<&String>) -> u32 {
    let Some(v) = value else {
        return MAX_AGE;
    };

    let lower = v.to_ascii_lowercase();
    if let Some(idx) = lower.find("max-age") {
        let after_eq = lower[idx + 7..]
            .trim_start()
            .trim_start_matches('=')
            .trim_start();
        let digits: String = after_eq
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        if let Ok(age) = digits.parse::<u32>() {
            return age;
        }
    }
    trace!("Could not parse max-age from CACHE-CONTROL: '{}'", v);
    MAX_AGE
}
