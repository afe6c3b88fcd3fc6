//! # athancontrol - UPnP control point for the athan speakers
//!
//! Drives ZonePlayer renderers through the broadcast control sequence:
//!
//! 1. `BecomeCoordinatorOfStandaloneGroup` (AVTransport)
//! 2. `SetVolume` (RenderingControl)
//! 3. `SetAVTransportURI` (AVTransport)
//! 4. `Play` (AVTransport)
//!
//! ## Architecture
//!
//! - [`soap_client`] : async SOAP POST with a per-request timeout
//! - [`AvTransportClient`] / [`RenderingControlClient`] : typed service clients
//! - [`ControlTransport`] : seam between the fan-out and the wire
//! - [`FanOut`] : runs the sequence on every address in parallel
//! - [`DeviceDiscovery`] / [`DeviceAddressCache`] : rolling address list

pub mod avtransport_client;
pub mod cache;
pub mod discovery;
pub mod errors;
pub mod fanout;
pub mod rendering_control_client;
pub mod soap_client;
pub mod transport;

pub use avtransport_client::AvTransportClient;
pub use cache::{DeviceAddressCache, RefreshOutcome};
pub use discovery::{DeviceDiscovery, SsdpDiscovery, dedupe_preserving_order};
pub use errors::ControlError;
pub use fanout::{DeviceReport, FanOut, StepOutcome};
pub use rendering_control_client::RenderingControlClient;
pub use soap_client::SoapClient;
pub use transport::{ControlCommand, ControlTransport, UpnpControlTransport};

pub use athanconfig::app::DEFAULT_CONTROL_PORT;

pub const AVTRANSPORT_URN: &str = "urn:schemas-upnp-org:service:AVTransport:1";
pub const RENDERING_CONTROL_URN: &str = "urn:schemas-upnp-org:service:RenderingControl:1";
