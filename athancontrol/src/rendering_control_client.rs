use crate::RENDERING_CONTROL_URN;
use crate::errors::ControlError;
use crate::soap_client::SoapClient;

#[derive(Debug, Clone)]
pub struct RenderingControlClient {
    pub control_url: String,
    pub service_type: String,
    soap: SoapClient,
}

impl RenderingControlClient {
    pub fn new(soap: SoapClient, control_url: String, service_type: String) -> Self {
        Self {
            control_url,
            service_type,
            soap,
        }
    }

    pub fn for_zone_player(soap: SoapClient, host: &str, port: u16) -> Self {
        Self::new(
            soap,
            format!(
                "http://{}:{}/MediaRenderer/RenderingControl/Control",
                host, port
            ),
            RENDERING_CONTROL_URN.to_string(),
        )
    }

    /// RenderingControl:1 — SetVolume
    pub async fn set_volume(
        &self,
        instance_id: u32,
        channel: &str,
        volume: u16,
    ) -> Result<(), ControlError> {
        let instance_id_str = instance_id.to_string();
        let volume_str = volume.to_string();
        let args = [
            ("InstanceID", instance_id_str.as_str()),
            ("Channel", channel),
            ("DesiredVolume", volume_str.as_str()),
        ];

        self.soap
            .call_action(&self.control_url, &self.service_type, "SetVolume", &args)
            .await
    }
}
