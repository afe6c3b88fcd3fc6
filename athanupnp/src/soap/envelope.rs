//! SOAP envelope of a control response

use super::SoapError;
use std::io::BufReader;
use xmltree::Element;

/// Parsed SOAP envelope. The header is not used by UPnP control responses
/// and is dropped.
#[derive(Debug, Clone)]
pub struct SoapEnvelope {
    pub body: SoapBody,
}

/// SOAP body, kept as raw XML
#[derive(Debug, Clone)]
pub struct SoapBody {
    pub content: Element,
}

impl SoapEnvelope {
    /// First element child of the body: the `*Response` or the `Fault`
    pub fn payload(&self) -> Option<&Element> {
        self.body
            .content
            .children
            .iter()
            .find_map(|n| n.as_element())
    }
}

/// Parses a complete SOAP envelope
pub fn parse_soap_envelope(xml: &[u8]) -> Result<SoapEnvelope, SoapError> {
    let reader = BufReader::new(xml);
    let root = Element::parse(reader)?;

    if !root.name.ends_with("Envelope") {
        return Err(SoapError::MissingEnvelope);
    }

    let body_elem = root
        .children
        .iter()
        .find_map(|n| n.as_element().filter(|e| e.name.ends_with("Body")))
        .ok_or(SoapError::MissingBody)?;

    Ok(SoapEnvelope {
        body: SoapBody {
            content: body_elem.clone(),
        },
    })
}
