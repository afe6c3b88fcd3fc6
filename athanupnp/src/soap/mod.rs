//! # Module SOAP - Simple Object Access Protocol
//!
//! Client-side SOAP support for UPnP control:
//!
//! - [`build_soap_request`] : builds the envelope for one action invocation
//! - [`parse_soap_envelope`] : parses a response envelope
//! - [`parse_upnp_fault`] : extracts the `UPnPError` detail of a SOAP fault
//!
//! ## Example
//!
//! ```
//! use athanupnp::soap::build_soap_request;
//!
//! let xml = build_soap_request(
//!     "urn:schemas-upnp-org:service:AVTransport:1",
//!     "Play",
//!     &[("InstanceID", "0"), ("Speed", "1")],
//! )
//! .unwrap();
//! assert!(xml.contains("<u:Play xmlns:u=\"urn:schemas-upnp-org:service:AVTransport:1\">"));
//! ```

mod builder;
mod envelope;
mod fault;

pub use builder::build_soap_request;
pub use envelope::{SoapBody, SoapEnvelope, parse_soap_envelope};
pub use fault::{UpnpFault, find_child_with_suffix, parse_upnp_fault};

use thiserror::Error;

/// Errors raised while building or decoding SOAP documents
#[derive(Debug, Error)]
pub enum SoapError {
    #[error("XML write error: {0}")]
    XmlWrite(#[from] xmltree::Error),

    #[error("XML parse error: {0}")]
    XmlParse(#[from] xmltree::ParseError),

    #[error("SOAP document is not valid UTF-8")]
    InvalidUtf8,

    #[error("Missing SOAP Envelope")]
    MissingEnvelope,

    #[error("Missing SOAP Body")]
    MissingBody,
}

/// Standard UPnP error codes reported in SOAP faults
pub mod error_codes {
    pub const INVALID_ACTION: u32 = 401;
    pub const INVALID_ARGS: u32 = 402;
    pub const ACTION_FAILED: u32 = 501;
    pub const ARGUMENT_VALUE_INVALID: u32 = 600;
    pub const ARGUMENT_VALUE_OUT_OF_RANGE: u32 = 601;
    pub const OPTIONAL_ACTION_NOT_IMPLEMENTED: u32 = 602;
    /// AVTransport: the requested transition is not available
    pub const TRANSITION_NOT_AVAILABLE: u32 = 701;
    /// AVTransport: illegal MIME type of the resource
    pub const ILLEGAL_MIME_TYPE: u32 = 714;
    /// AVTransport: resource not found
    pub const RESOURCE_NOT_FOUND: u32 = 716;

    /// Short name of a known error code
    pub fn name(code: u32) -> Option<&'static str> {
        match code {
            INVALID_ACTION => Some("Invalid Action"),
            INVALID_ARGS => Some("Invalid Args"),
            ACTION_FAILED => Some("Action Failed"),
            ARGUMENT_VALUE_INVALID => Some("Argument Value Invalid"),
            ARGUMENT_VALUE_OUT_OF_RANGE => Some("Argument Value Out of Range"),
            OPTIONAL_ACTION_NOT_IMPLEMENTED => Some("Optional Action Not Implemented"),
            TRANSITION_NOT_AVAILABLE => Some("Transition Not Available"),
            ILLEGAL_MIME_TYPE => Some("Illegal MIME-type"),
            RESOURCE_NOT_FOUND => Some("Resource Not Found"),
            _ => None,
        }
    }
}
