use athanupnp::soap::{SoapError, UpnpFault};
use athanupnp::ssdp::SsdpError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ControlError {
    #[error("Soap Error: {0}")]
    Soap(#[from] SoapError),
    #[error("{action} to {url} failed: {source}")]
    Transport {
        action: String,
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{action} timed out after {secs}s")]
    Timeout { action: String, secs: u64 },
    #[error("{action} returned {fault} (HTTP status {status})")]
    Upnp {
        action: String,
        fault: UpnpFault,
        status: u16,
    },
    #[error("{action} failed with HTTP status {status} and body: {body}")]
    HttpStatus {
        action: String,
        status: u16,
        body: String,
    },
    #[error("Discovery Error: {0}")]
    Discovery(#[from] SsdpError),
}

impl ControlError {
    pub fn is_timeout(&self) -> bool {
        match self {
            ControlError::Timeout { .. } => true,
            ControlError::Transport { source, .. } => source.is_timeout(),
            _ => false,
        }
    }
}
