//! One control command, one device, one wire call.

use crate::avtransport_client::AvTransportClient;
use crate::errors::ControlError;
use crate::rendering_control_client::RenderingControlClient;
use crate::soap_client::SoapClient;
use crate::DEFAULT_CONTROL_PORT;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

/// Steps of the broadcast control sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    BecomeStandalone,
    SetVolume(u8),
    SetUri(String),
    Play,
}

impl ControlCommand {
    /// The four-step sequence sent to every speaker, in order
    pub fn broadcast_sequence(volume: u8, uri: &str) -> Vec<ControlCommand> {
        vec![
            ControlCommand::BecomeStandalone,
            ControlCommand::SetVolume(volume),
            ControlCommand::SetUri(uri.to_string()),
            ControlCommand::Play,
        ]
    }

    /// UPnP action name
    pub fn action(&self) -> &'static str {
        match self {
            ControlCommand::BecomeStandalone => "BecomeCoordinatorOfStandaloneGroup",
            ControlCommand::SetVolume(_) => "SetVolume",
            ControlCommand::SetUri(_) => "SetAVTransportURI",
            ControlCommand::Play => "Play",
        }
    }
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlCommand::SetVolume(v) => write!(f, "{}({})", self.action(), v),
            ControlCommand::SetUri(uri) => write!(f, "{}({})", self.action(), uri),
            _ => f.write_str(self.action()),
        }
    }
}

/// Sends one command to the device at `address`
#[async_trait]
pub trait ControlTransport: Send + Sync {
    async fn execute(&self, address: &str, command: &ControlCommand) -> Result<(), ControlError>;
}

/// SOAP/HTTP transport to Sonos ZonePlayers
#[derive(Debug, Clone)]
pub struct UpnpControlTransport {
    soap: SoapClient,
    port: u16,
}

impl UpnpControlTransport {
    pub fn new(port: u16, timeout: Duration) -> Self {
        Self {
            soap: SoapClient::new(timeout),
            port,
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl Default for UpnpControlTransport {
    fn default() -> Self {
        Self::new(DEFAULT_CONTROL_PORT, Duration::from_secs(10))
    }
}

#[async_trait]
impl ControlTransport for UpnpControlTransport {
    async fn execute(&self, address: &str, command: &ControlCommand) -> Result<(), ControlError> {
        match command {
            ControlCommand::BecomeStandalone => {
                AvTransportClient::for_zone_player(self.soap.clone(), address, self.port)
                    .become_coordinator_of_standalone_group(0)
                    .await
            }
            ControlCommand::SetVolume(volume) => {
                RenderingControlClient::for_zone_player(self.soap.clone(), address, self.port)
                    .set_volume(0, "Master", u16::from(*volume))
                    .await
            }
            ControlCommand::SetUri(uri) => {
                AvTransportClient::for_zone_player(self.soap.clone(), address, self.port)
                    .set_av_transport_uri(0, uri, "")
                    .await
            }
            ControlCommand::Play => {
                AvTransportClient::for_zone_player(self.soap.clone(), address, self.port)
                    .play(0, "1")
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_sequence_order() {
        let seq = ControlCommand::broadcast_sequence(5, "http://10.0.0.2:8080/fajr/a.mp3");
        let actions: Vec<_> = seq.iter().map(|c| c.action()).collect();
        assert_eq!(
            actions,
            vec![
                "BecomeCoordinatorOfStandaloneGroup",
                "SetVolume",
                "SetAVTransportURI",
                "Play"
            ]
        );
        assert_eq!(seq[1], ControlCommand::SetVolume(5));
    }

    #[test]
    fn test_display() {
        assert_eq!(ControlCommand::SetVolume(15).to_string(), "SetVolume(15)");
        assert_eq!(ControlCommand::Play.to_string(), "Play");
    }

    #[test]
    fn test_default_port_is_the_configured_default() {
        let settings = athanconfig::DeviceSettings::default();
        assert_eq!(UpnpControlTransport::default().port(), settings.control_port);
        assert_eq!(DEFAULT_CONTROL_PORT, 1400);
    }
}
