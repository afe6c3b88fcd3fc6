use crate::AVTRANSPORT_URN;
use crate::errors::ControlError;
use crate::soap_client::SoapClient;

#[derive(Debug, Clone)]
pub struct AvTransportClient {
    pub control_url: String,
    pub service_type: String,
    soap: SoapClient,
}

impl AvTransportClient {
    pub fn new(soap: SoapClient, control_url: String, service_type: String) -> Self {
        Self {
            control_url,
            service_type,
            soap,
        }
    }

    /// Client for the AVTransport service of a ZonePlayer at `host:port`
    pub fn for_zone_player(soap: SoapClient, host: &str, port: u16) -> Self {
        Self::new(
            soap,
            format!("http://{}:{}/MediaRenderer/AVTransport/Control", host, port),
            AVTRANSPORT_URN.to_string(),
        )
    }

    /// AVTransport:1 — BecomeCoordinatorOfStandaloneGroup (Sonos extension)
    ///
    /// Detaches the player from any group so it plays on its own.
    pub async fn become_coordinator_of_standalone_group(
        &self,
        instance_id: u32,
    ) -> Result<(), ControlError> {
        let instance_id_str = instance_id.to_string();
        let args = [("InstanceID", instance_id_str.as_str())];

        self.soap
            .call_action(
                &self.control_url,
                &self.service_type,
                "BecomeCoordinatorOfStandaloneGroup",
                &args,
            )
            .await
    }

    /// AVTransport:1 — SetAVTransportURI (metadata left empty)
    pub async fn set_av_transport_uri(
        &self,
        instance_id: u32,
        uri: &str,
        metadata: &str,
    ) -> Result<(), ControlError> {
        let instance_id_str = instance_id.to_string();
        let args = [
            ("InstanceID", instance_id_str.as_str()),
            ("CurrentURI", uri),
            ("CurrentURIMetaData", metadata),
        ];

        self.soap
            .call_action(
                &self.control_url,
                &self.service_type,
                "SetAVTransportURI",
                &args,
            )
            .await
    }

    /// AVTransport:1 — Play
    pub async fn play(&self, instance_id: u32, speed: &str) -> Result<(), ControlError> {
        let instance_id_str = instance_id.to_string();
        let args = [("InstanceID", instance_id_str.as_str()), ("Speed", speed)];

        self.soap
            .call_action(&self.control_url, &self.service_type, "Play", &args)
            .await
    }
}
