//! SOAP Faults returned by UPnP devices

use super::{SoapEnvelope, error_codes};
use std::fmt;
use xmltree::{Element, XMLNode};

/// `UPnPError` detail carried by a SOAP fault
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpnpFault {
    pub error_code: u32,
    pub error_description: String,
}

impl fmt::Display for UpnpFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let description = if self.error_description.is_empty() {
            error_codes::name(self.error_code).unwrap_or("")
        } else {
            self.error_description.as_str()
        };
        write!(f, "UPnP error {}: {}", self.error_code, description)
    }
}

/// First element child whose (prefix-less) name ends with `suffix`
pub fn find_child_with_suffix<'a>(parent: &'a Element, suffix: &str) -> Option<&'a Element> {
    parent.children.iter().find_map(|node| match node {
        XMLNode::Element(elem) if elem.name.ends_with(suffix) => Some(elem),
        _ => None,
    })
}

/// Extracts `Fault/detail/UPnPError` from a response envelope.
///
/// Returns `None` when the body is not a fault or the fault carries no
/// parseable UPnP error code.
pub fn parse_upnp_fault(envelope: &SoapEnvelope) -> Option<UpnpFault> {
    let fault = find_child_with_suffix(&envelope.body.content, "Fault")?;
    let detail = find_child_with_suffix(fault, "detail")?;
    let upnp_error = find_child_with_suffix(detail, "UPnPError")?;

    let binding = find_child_with_suffix(upnp_error, "errorCode")?.get_text()?;
    let error_code = binding.trim().parse::<u32>().ok()?;

    let error_description = find_child_with_suffix(upnp_error, "errorDescription")
        .and_then(|elem| elem.get_text())
        .map(|t| t.trim().to_string())
        .unwrap_or_default();

    Some(UpnpFault {
        error_code,
        error_description,
    })
}
