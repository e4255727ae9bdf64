//! INDI protocol client and device model
//!
//! Connects to an INDI server over TCP and keeps a typed, consistent view of
//! the devices it publishes.
//!
//! ## Layers
//!
//! - [`XmlTokenizer`]: incremental reader for the endless XML stream
//! - [`protocol`]: typed vectors, notifications and outbound commands
//! - [`IndiClient`]: the connection, dispatching to an [`IndiClientHandler`]
//! - [`manager`]: typed device managers and the untyped property store
//! - [`DeviceHub`]: one handler that drives every manager

pub mod client;
pub mod config;
pub mod device;
pub mod error;
pub mod hub;
pub mod manager;
pub mod protocol;
pub mod xml;

pub use client::{deliver, dispatch, HandlerSlots, IndiClient, IndiClientHandler, IndiSender};
pub use config::ClientConfig;
pub use device::{
    Camera, Capabilities, Cover, Device, DeviceHeader, DeviceInterface, DriverInfo, Exposure, FlatPanel, Focuser,
    GuideOutput, IndiDevice, MinMax, Mount, Thermometer, Wheel,
};
pub use error::{IndiError, IndiResult};
pub use hub::DeviceHub;
pub use manager::{Changes, DeviceEvent, DeviceHandler, DeviceManager};
pub use protocol::{AnyVector, CcdFrameType, PropertyState, INDI_PROTOCOL_VERSION};
pub use xml::{XmlNode, XmlTokenizer};

/// Default INDI server port
pub const INDI_DEFAULT_PORT: u16 = 7624;
