//! Typed device managers
//!
//! A [`DeviceManager`] keeps the devices of one kind, keyed by name in
//! admission order, and mirrors the INDI properties it understands into
//! their typed fields. It is an [`crate::IndiClientHandler`]: the per-kind
//! modules implement the property reactions and the command verbs on the
//! concrete `DeviceManager<Kind>`.
//!
//! Changes are reported through [`DeviceHandler`]s. A field is only written
//! when the incoming value differs from the stored one, and one INDI message
//! fires at most one `updated`, naming the first field it changed.

use std::collections::HashSet;

use indexmap::IndexMap;
use tokio::sync::mpsc;

use crate::client::IndiSender;
use crate::device::{DriverInfo, IndiDevice};
use crate::protocol::{names, BlobElement, BlobEnable, DelProperty, EnableBlob, GetProperties, NewSwitchVector, PropertyState, SwitchVector, TextVector};

pub mod auxiliary;
pub mod camera;
pub mod cover;
pub mod focuser;
pub mod mount;
pub mod property;
pub mod wheel;

pub use auxiliary::{GuideDirection, GuideOutputManager, ThermometerManager};
pub use camera::{CameraManager, TransferFormat};
pub use cover::{CoverManager, FlatPanelManager};
pub use focuser::FocuserManager;
pub use mount::MountManager;
pub use property::{DevicePropertyHandler, DevicePropertyManager, PropertyEvent};
pub use wheel::WheelManager;

/// Observer of the devices of one [`DeviceManager`]
#[allow(unused_variables)]
pub trait DeviceHandler<D> {
    fn added(&mut self, client: &IndiSender, device: &D) {}

    /// `field` names the typed field that changed, `state` is the state of
    /// the property that carried it.
    fn updated(&mut self, client: &IndiSender, device: &D, field: &'static str, state: Option<PropertyState>) {}

    fn removed(&mut self, client: &IndiSender, device: &D) {}

    fn blob_received(&mut self, client: &IndiSender, device: &D, blob: &BlobElement) {}
}

/// Device notification forwarded over a channel
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent<D> {
    Added(D),
    Updated {
        device: D,
        field: &'static str,
        state: Option<PropertyState>,
    },
    Removed(D),
    BlobReceived {
        device: D,
        blob: BlobElement,
    },
}

impl<D: Clone> DeviceHandler<D> for mpsc::UnboundedSender<DeviceEvent<D>> {
    fn added(&mut self, _: &IndiSender, device: &D) {
        let _ = self.send(DeviceEvent::Added(device.clone()));
    }

    fn updated(&mut self, _: &IndiSender, device: &D, field: &'static str, state: Option<PropertyState>) {
        let _ = self.send(DeviceEvent::Updated {
            device: device.clone(),
            field,
            state,
        });
    }

    fn removed(&mut self, _: &IndiSender, device: &D) {
        let _ = self.send(DeviceEvent::Removed(device.clone()));
    }

    fn blob_received(&mut self, _: &IndiSender, device: &D, blob: &BlobElement) {
        let _ = self.send(DeviceEvent::BlobReceived {
            device: device.clone(),
            blob: blob.clone(),
        });
    }
}

/// Outcome of applying one INDI message to a device.
///
/// Every write goes through [`Changes::set`]. Only the first changed field is
/// kept: a property maps to one logical field, and one message fires at most
/// one `updated`.
#[derive(Debug, Default)]
pub struct Changes {
    field: Option<&'static str>,
}

impl Changes {
    /// Write `value` into `slot` if it differs. Returns whether it did.
    pub fn set<T: PartialEq>(&mut self, field: &'static str, slot: &mut T, value: T) -> bool {
        if *slot == value {
            return false;
        }

        *slot = value;
        self.mark(field);
        true
    }

    pub fn mark(&mut self, field: &'static str) {
        self.field.get_or_insert(field);
    }

    pub fn is_empty(&self) -> bool {
        self.field.is_none()
    }

    /// Field reported for this message
    pub fn field(&self) -> Option<&'static str> {
        self.field
    }
}

/// Devices of one kind
pub struct DeviceManager<D> {
    devices: IndexMap<String, D>,
    handlers: Vec<Box<dyn DeviceHandler<D> + Send>>,
    latched: HashSet<(String, String)>,
}

impl<D: IndiDevice> Default for DeviceManager<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: IndiDevice> DeviceManager<D> {
    pub fn new() -> Self {
        Self {
            devices: IndexMap::new(),
            handlers: Vec::new(),
            latched: HashSet::new(),
        }
    }

    pub fn add_handler(&mut self, handler: impl DeviceHandler<D> + Send + 'static) {
        self.handlers.push(Box::new(handler));
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.devices.keys().map(String::as_str)
    }

    /// Devices in admission order
    pub fn list(&self) -> impl Iterator<Item = &D> {
        self.devices.values()
    }

    pub fn get(&self, name: &str) -> Option<&D> {
        self.devices.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.devices.contains_key(name)
    }

    /// Request every property of a device
    pub fn ask(&self, client: &IndiSender, name: &str) {
        client.get_properties(&GetProperties::device(name));
    }

    pub fn enable_blob(&self, client: &IndiSender, device: &D) {
        client.enable_blob(&EnableBlob {
            device: device.name().to_string(),
            name: None,
            value: BlobEnable::Also,
        });
    }

    pub fn disable_blob(&self, client: &IndiSender, device: &D) {
        client.enable_blob(&EnableBlob {
            device: device.name().to_string(),
            name: None,
            value: BlobEnable::Never,
        });
    }

    pub fn connect(&self, client: &IndiSender, device: &D) {
        if !device.header().connected {
            client.send_switch(&NewSwitchVector::new(device.name(), names::CONNECTION).element(names::CONNECT, true));
        }
    }

    pub fn disconnect(&self, client: &IndiSender, device: &D) {
        if device.header().connected {
            client.send_switch(&NewSwitchVector::new(device.name(), names::CONNECTION).element(names::DISCONNECT, true));
        }
    }

    /// Admit a device. Returns `false` if one with the same name is known.
    pub fn add(&mut self, client: &IndiSender, device: D) -> bool {
        if self.has(device.name()) {
            return false;
        }

        let name = device.name().to_string();
        tracing::info!("device {} added", name);

        self.latched.retain(|(device, _)| *device != name);
        self.devices.insert(name.clone(), device);

        if let Some(device) = self.devices.get(&name) {
            for handler in &mut self.handlers {
                handler.added(client, device);
            }
        }

        true
    }

    pub fn remove(&mut self, client: &IndiSender, name: &str) -> Option<D> {
        let device = self.devices.shift_remove(name)?;
        tracing::info!("device {} removed", name);

        self.latched.retain(|(device, _)| device != name);

        for handler in &mut self.handlers {
            handler.removed(client, &device);
        }

        Some(device)
    }

    /// Remove every device, in admission order
    pub fn clear(&mut self, client: &IndiSender) {
        let names: Vec<String> = self.devices.keys().cloned().collect();

        for name in names {
            self.remove(client, &name);
        }
    }

    /// First definition of `property` on a known device since its admission
    pub(crate) fn latch(&mut self, device: &str, property: &str) -> bool {
        self.has(device) && self.latched.insert((device.to_string(), property.to_string()))
    }

    /// Apply `f` to a known device and report the change, if any, once.
    pub(crate) fn apply<F>(&mut self, client: &IndiSender, name: &str, state: Option<PropertyState>, f: F) -> bool
    where
        F: FnOnce(&mut D, &mut Changes),
    {
        let Some(device) = self.devices.get_mut(name) else {
            return false;
        };

        let mut changes = Changes::default();
        f(device, &mut changes);

        let Some(device) = self.devices.get(name) else {
            return false;
        };

        let Some(field) = changes.field() else {
            return false;
        };

        tracing::trace!("{}.{} updated", name, field);

        for handler in &mut self.handlers {
            handler.updated(client, device, field, state);
        }

        true
    }

    pub(crate) fn blob(&mut self, client: &IndiSender, name: &str, blob: &BlobElement) {
        let Some(device) = self.devices.get(name) else {
            return;
        };

        for handler in &mut self.handlers {
            handler.blob_received(client, device, blob);
        }
    }

    /// Admit or drop a device on `DRIVER_INFO`, depending on its interface
    pub(crate) fn driver_info(&mut self, client: &IndiSender, vector: &TextVector) {
        let Some(driver) = DriverInfo::from_vector(vector) else {
            tracing::debug!("{}: DRIVER_INFO without interface", vector.device);
            return;
        };

        if driver.interface.intersects(D::INTERFACE) {
            if !self.has(&vector.device) && self.add(client, D::create(&vector.device, driver)) {
                self.ask(client, &vector.device);
            }
        } else if self.has(&vector.device) {
            self.remove(client, &vector.device);
        }
    }

    pub(crate) fn connection(&mut self, client: &IndiSender, vector: &SwitchVector) {
        let connected = vector.is_on(names::CONNECT);
        let mut connecting = false;

        self.apply(client, &vector.device, vector.state, |device, changes| {
            connecting = changes.set("connected", &mut device.header_mut().connected, connected) && connected;
        });

        if connecting {
            self.ask(client, &vector.device);
        }
    }

    /// Drop a device whose every property was deleted
    pub(crate) fn device_deleted(&mut self, client: &IndiSender, message: &DelProperty) {
        if message.is_whole_device() {
            self.remove(client, &message.device);
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Helpers for feeding protocol text to managers

    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::client::{dispatch, IndiClientHandler};
    use crate::xml::XmlTokenizer;

    pub fn feed<H: IndiClientHandler>(handler: &mut H, client: &IndiSender, xml: &str) {
        for node in XmlTokenizer::new().parse(xml.as_bytes()) {
            dispatch(handler, client, &node);
        }
    }

    pub fn driver_info(device: &str, interface: u32) -> String {
        format!(
            r#"<defTextVector device="{device}" name="DRIVER_INFO" state="Idle" perm="ro">
<defText name="DRIVER_NAME">{device}</defText>
<defText name="DRIVER_EXEC">indi_test</defText>
<defText name="DRIVER_VERSION">1.0</defText>
<defText name="DRIVER_INTERFACE">{interface}</defText>
</defTextVector>"#
        )
    }

    pub fn connection(device: &str, connected: bool) -> String {
        let (on, off) = if connected { ("On", "Off") } else { ("Off", "On") };
        format!(
            r#"<setSwitchVector device="{device}" name="CONNECTION" state="Ok"><oneSwitch name="CONNECT">{on}</oneSwitch><oneSwitch name="DISCONNECT">{off}</oneSwitch></setSwitchVector>"#
        )
    }

    /// Records handler calls as `added:Name`, `updated:Name:field`, ...
    #[derive(Clone, Default)]
    pub struct Events(pub Arc<Mutex<Vec<String>>>);

    impl Events {
        pub fn take(&self) -> Vec<String> {
            std::mem::take(&mut *self.0.lock().unwrap())
        }

        fn push(&self, event: String) {
            self.0.lock().unwrap().push(event);
        }
    }

    impl<D: IndiDevice> DeviceHandler<D> for Events {
        fn added(&mut self, _: &IndiSender, device: &D) {
            self.push(format!("added:{}", device.name()));
        }

        fn updated(&mut self, _: &IndiSender, device: &D, field: &'static str, _: Option<PropertyState>) {
            self.push(format!("updated:{}:{}", device.name(), field));
        }

        fn removed(&mut self, _: &IndiSender, device: &D) {
            self.push(format!("removed:{}", device.name()));
        }

        fn blob_received(&mut self, _: &IndiSender, device: &D, blob: &BlobElement) {
            self.push(format!("blob:{}:{}", device.name(), blob.name));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::device::{Camera, DeviceInterface, Wheel};

    #[test]
    fn test_changes_only_on_difference() {
        let mut changes = Changes::default();
        let mut value = 1.0;

        assert!(!changes.set("value", &mut value, 1.0));
        assert!(changes.is_empty());

        assert!(changes.set("value", &mut value, 2.0));
        assert!(changes.set("value", &mut value, 3.0));
        assert_eq!(changes.field(), Some("value"));
        assert_eq!(value, 3.0);
    }

    #[test]
    fn test_changes_keep_the_first_field() {
        let mut changes = Changes::default();
        let (mut position, mut moving) = (0.0, false);

        assert!(!changes.set("position", &mut position, 0.0));
        assert!(changes.set("moving", &mut moving, true));
        assert!(changes.set("position", &mut position, 100.0));
        assert_eq!(changes.field(), Some("moving"));
        assert_eq!((position, moving), (100.0, true));
    }

    #[test]
    fn test_driver_info_admission() {
        let (client, mut rx) = IndiSender::channel();
        let events = Events::default();
        let mut cameras = CameraManager::new();
        cameras.add_handler(events.clone());

        feed(&mut cameras, &client, &driver_info("CCD Simulator", 0x16));
        feed(&mut cameras, &client, &driver_info("CCD Simulator", 0x16));

        assert_eq!(cameras.len(), 1);
        assert_eq!(events.take(), vec!["added:CCD Simulator"]);
        assert_eq!(rx.try_recv().unwrap(), r#"<getProperties version="1.7" device="CCD Simulator"/>"#);
        assert!(rx.try_recv().is_err());

        let camera = cameras.get("CCD Simulator").unwrap();
        assert_eq!(camera.header.driver.executable, "indi_test");
        assert_eq!(camera.header.driver.interface, DeviceInterface::CCD | DeviceInterface::GUIDER | DeviceInterface::FILTER);

        // The interface no longer includes CCD
        feed(&mut cameras, &client, &driver_info("CCD Simulator", 0x1));
        assert!(cameras.is_empty());
        assert_eq!(events.take(), vec!["removed:CCD Simulator"]);
    }

    #[test]
    fn test_non_matching_interface_is_not_admitted() {
        let client = IndiSender::default();
        let mut wheels = WheelManager::new();

        feed(&mut wheels, &client, &driver_info("Telescope Simulator", 0x5));
        assert!(wheels.is_empty());

        feed(&mut wheels, &client, &driver_info("CCD Simulator", 0x16));
        assert_eq!(wheels.names().collect::<Vec<_>>(), vec!["CCD Simulator"]);
    }

    #[test]
    fn test_connection_asks_for_properties_once() {
        let (client, mut rx) = IndiSender::channel();
        let events = Events::default();
        let mut cameras = CameraManager::new();

        feed(&mut cameras, &client, &driver_info("CCD Simulator", 0x2));
        cameras.add_handler(events.clone());
        while rx.try_recv().is_ok() {}

        feed(&mut cameras, &client, &connection("CCD Simulator", true));
        feed(&mut cameras, &client, &connection("CCD Simulator", true));

        assert!(cameras.get("CCD Simulator").unwrap().header.connected);
        assert_eq!(events.take(), vec!["updated:CCD Simulator:connected"]);
        assert_eq!(rx.try_recv().unwrap(), r#"<getProperties version="1.7" device="CCD Simulator"/>"#);
        assert!(rx.try_recv().is_err());

        feed(&mut cameras, &client, &connection("CCD Simulator", false));
        assert!(!cameras.get("CCD Simulator").unwrap().header.connected);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_connect_and_disconnect_commands() {
        let (client, mut rx) = IndiSender::channel();
        let cameras = CameraManager::new();
        let mut camera = Camera::create("CCD Simulator", DriverInfo::default());

        cameras.disconnect(&client, &camera);
        assert!(rx.try_recv().is_err());

        cameras.connect(&client, &camera);
        assert_eq!(
            rx.try_recv().unwrap(),
            r#"<newSwitchVector device="CCD Simulator" name="CONNECTION"><oneSwitch name="CONNECT">On</oneSwitch></newSwitchVector>"#
        );

        camera.header.connected = true;
        cameras.connect(&client, &camera);
        assert!(rx.try_recv().is_err());

        cameras.disconnect(&client, &camera);
        assert!(rx.try_recv().unwrap().contains(r#"<oneSwitch name="DISCONNECT">On</oneSwitch>"#));

        cameras.enable_blob(&client, &camera);
        assert_eq!(rx.try_recv().unwrap(), r#"<enableBLOB device="CCD Simulator">Also</enableBLOB>"#);
        cameras.disable_blob(&client, &camera);
        assert_eq!(rx.try_recv().unwrap(), r#"<enableBLOB device="CCD Simulator">Never</enableBLOB>"#);
    }

    #[test]
    fn test_del_property_and_close() {
        let client = IndiSender::default();
        let events = Events::default();
        let mut wheels = WheelManager::new();
        wheels.add_handler(events.clone());

        feed(&mut wheels, &client, &driver_info("Filter A", 0x10));
        feed(&mut wheels, &client, &driver_info("Filter B", 0x10));
        feed(&mut wheels, &client, &driver_info("Filter C", 0x10));

        feed(&mut wheels, &client, r#"<delProperty device="Filter A" name="FILTER_SLOT"/>"#);
        assert_eq!(wheels.len(), 3);

        feed(&mut wheels, &client, r#"<delProperty device="Filter A"/>"#);
        assert_eq!(wheels.names().collect::<Vec<_>>(), vec!["Filter B", "Filter C"]);

        crate::client::IndiClientHandler::close(&mut wheels, &client, true);
        assert!(wheels.is_empty());
        assert_eq!(
            events.take(),
            vec![
                "added:Filter A",
                "added:Filter B",
                "added:Filter C",
                "removed:Filter A",
                "removed:Filter B",
                "removed:Filter C",
            ]
        );
    }

    #[test]
    fn test_channel_handler() {
        let client = IndiSender::default();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut wheels = WheelManager::new();
        wheels.add_handler(tx);

        let wheel = Wheel::create("Filter Simulator", DriverInfo::default());
        assert!(wheels.add(&client, wheel.clone()));
        assert!(!wheels.add(&client, wheel.clone()));

        assert_eq!(rx.try_recv().unwrap(), DeviceEvent::Added(wheel));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_readmission_starts_from_defaults() {
        let client = IndiSender::default();
        let mut cameras = CameraManager::new();

        feed(&mut cameras, &client, &driver_info("CCD Simulator", 0x2));
        feed(
            &mut cameras,
            &client,
            r#"<defSwitchVector device="CCD Simulator" name="CCD_ABORT_EXPOSURE" perm="rw"><defSwitch name="ABORT">Off</defSwitch></defSwitchVector>"#,
        );
        assert!(cameras.get("CCD Simulator").unwrap().can_abort);

        feed(&mut cameras, &client, r#"<delProperty device="CCD Simulator"/>"#);
        feed(&mut cameras, &client, &driver_info("CCD Simulator", 0x2));
        assert!(!cameras.get("CCD Simulator").unwrap().can_abort);

        feed(
            &mut cameras,
            &client,
            r#"<defSwitchVector device="CCD Simulator" name="CCD_ABORT_EXPOSURE" perm="ro"><defSwitch name="ABORT">Off</defSwitch></defSwitchVector>"#,
        );
        assert!(!cameras.get("CCD Simulator").unwrap().can_abort);
    }
}
