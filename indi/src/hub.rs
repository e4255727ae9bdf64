//! One handler for every manager
//!
//! [`DeviceHub`] lets a single [`crate::IndiClient`] drive all the typed
//! managers and the property store. Vectors are parsed once by the client and
//! handed to each manager through the slots it declares.

use crate::client::{deliver, HandlerSlots, IndiClientHandler, IndiSender};
use crate::device::Device;
use crate::manager::{
    CameraManager, CoverManager, DevicePropertyManager, FlatPanelManager, FocuserManager, GuideOutputManager,
    MountManager, ThermometerManager, WheelManager,
};
use crate::protocol::{AnyVector, DelProperty, Message};

#[derive(Default)]
pub struct DeviceHub {
    pub properties: DevicePropertyManager,
    pub cameras: CameraManager,
    pub mounts: MountManager,
    pub wheels: WheelManager,
    pub focusers: FocuserManager,
    pub covers: CoverManager,
    pub flat_panels: FlatPanelManager,
    pub guide_outputs: GuideOutputManager,
    pub thermometers: ThermometerManager,
}

macro_rules! each_handler {
    ($hub:expr, $handler:ident => $body:expr) => {{
        {
            let $handler = &mut $hub.properties;
            $body;
        }
        {
            let $handler = &mut $hub.cameras;
            $body;
        }
        {
            let $handler = &mut $hub.mounts;
            $body;
        }
        {
            let $handler = &mut $hub.wheels;
            $body;
        }
        {
            let $handler = &mut $hub.focusers;
            $body;
        }
        {
            let $handler = &mut $hub.covers;
            $body;
        }
        {
            let $handler = &mut $hub.flat_panels;
            $body;
        }
        {
            let $handler = &mut $hub.guide_outputs;
            $body;
        }
        {
            let $handler = &mut $hub.thermometers;
            $body;
        }
    }};
}

impl DeviceHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every typed device, grouped by kind
    pub fn devices(&self) -> Vec<Device> {
        let mut devices: Vec<Device> = Vec::new();
        devices.extend(self.cameras.list().cloned().map(Device::from));
        devices.extend(self.mounts.list().cloned().map(Device::from));
        devices.extend(self.wheels.list().cloned().map(Device::from));
        devices.extend(self.focusers.list().cloned().map(Device::from));
        devices.extend(self.covers.list().cloned().map(Device::from));
        devices.extend(self.flat_panels.list().cloned().map(Device::from));
        devices
    }
}

impl IndiClientHandler for DeviceHub {
    fn slots(&self) -> HandlerSlots {
        HandlerSlots::VECTOR | HandlerSlots::MESSAGE | HandlerSlots::DEL_PROPERTY | HandlerSlots::CLOSE
    }

    fn message(&mut self, _client: &IndiSender, message: &Message) {
        if let Some(text) = &message.message {
            tracing::info!("[{}] {}", message.device.as_deref().unwrap_or("server"), text);
        }
    }

    fn vector(&mut self, client: &IndiSender, vector: &AnyVector) {
        each_handler!(self, handler => deliver(handler, client, vector));
    }

    fn del_property(&mut self, client: &IndiSender, message: &DelProperty) {
        each_handler!(self, handler => handler.del_property(client, message));
    }

    fn close(&mut self, client: &IndiSender, server: bool) {
        each_handler!(self, handler => handler.close(client, server));
    }
}
