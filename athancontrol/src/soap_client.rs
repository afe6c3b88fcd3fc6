use crate::errors::ControlError;
use athanupnp::soap::{SoapEnvelope, build_soap_request, parse_soap_envelope, parse_upnp_fault};
use std::time::Duration;
use tracing::{debug, trace};

/// Result of a SOAP call:
/// - HTTP status code
/// - raw XML body (always)
/// - parsed SOAP envelope if parsing succeeded
#[derive(Debug)]
pub struct SoapCallResult {
    pub status: u16,
    pub raw_body: String,
    pub envelope: Option<SoapEnvelope>,
}

impl SoapCallResult {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Async SOAP client shared by the service clients.
///
/// Every request is bounded by `timeout`, connection included.
#[derive(Debug, Clone)]
pub struct SoapClient {
    http: reqwest::Client,
    timeout: Duration,
}

impl SoapClient {
    pub fn new(timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Invoke a UPnP SOAP action on a control URL.
    ///
    /// - `control_url`: full HTTP URL of the service control endpoint
    /// - `service_type`: service URN, e.g. "urn:schemas-upnp-org:service:AVTransport:1"
    /// - `action`: action name, e.g. "Play"
    /// - `args`: list of (name, value) pairs, e.g. &[("InstanceID", "0")]
    ///
    /// 4xx/5xx answers are not errors at this level: the body of an HTTP 500
    /// carries the SOAP fault.
    pub async fn invoke_upnp_action(
        &self,
        control_url: &str,
        service_type: &str,
        action: &str,
        args: &[(&str, &str)],
    ) -> Result<SoapCallResult, ControlError> {
        let body_xml = build_soap_request(service_type, action, args)?;
        let soap_action_header = format!(r#""{}#{}""#, service_type, action);

        trace!("SOAP {} -> {}\n{}", action, control_url, body_xml);

        let response = self
            .http
            .post(control_url)
            .timeout(self.timeout)
            .header("Content-Type", r#"text/xml; charset="utf-8""#)
            .header("SOAPACTION", soap_action_header)
            .body(body_xml)
            .send()
            .await
            .map_err(|e| self.transport_error(action, control_url, e))?;

        let status = response.status().as_u16();
        let raw_body = response
            .text()
            .await
            .map_err(|e| self.transport_error(action, control_url, e))?;

        // An unparseable body is not fatal: the status still decides
        let envelope = parse_soap_envelope(raw_body.as_bytes()).ok();

        debug!("SOAP {} on {} -> HTTP {}", action, control_url, status);

        Ok(SoapCallResult {
            status,
            raw_body,
            envelope,
        })
    }

    /// Invokes an action whose response carries no value we need.
    pub async fn call_action(
        &self,
        control_url: &str,
        service_type: &str,
        action: &str,
        args: &[(&str, &str)],
    ) -> Result<(), ControlError> {
        let call_result = self
            .invoke_upnp_action(control_url, service_type, action, args)
            .await?;
        handle_action_response(action, &call_result)
    }

    fn transport_error(&self, action: &str, url: &str, source: reqwest::Error) -> ControlError {
        if source.is_timeout() {
            ControlError::Timeout {
                action: action.to_string(),
                secs: self.timeout.as_secs(),
            }
        } else {
            ControlError::Transport {
                action: action.to_string(),
                url: url.to_string(),
                source,
            }
        }
    }
}

/// Maps a call result to success, UPnP fault or plain HTTP failure.
pub fn handle_action_response(action: &str, call_result: &SoapCallResult) -> Result<(), ControlError> {
    if let Some(fault) = call_result.envelope.as_ref().and_then(parse_upnp_fault) {
        return Err(ControlError::Upnp {
            action: action.to_string(),
            fault,
            status: call_result.status,
        });
    }

    if call_result.is_success() {
        return Ok(());
    }

    Err(ControlError::HttpStatus {
        action: action.to_string(),
        status: call_result.status,
        body: call_result.raw_body.clone(),
    })
}
