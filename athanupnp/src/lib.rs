//! # athanupnp - UPnP protocol pieces used by the Athan control point
//!
//! - [`soap`] : SOAP request envelopes and UPnP fault decoding
//! - [`ssdp`] : SSDP M-SEARCH client and message parsing
//!
//! Nothing here knows about speakers or schedules; see `athancontrol` for the
//! device control sequence built on top of these pieces.

pub mod soap;
pub mod ssdp;
