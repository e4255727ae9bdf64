//! Guide output and thermometer managers
//!
//! These devices are not admitted on `DRIVER_INFO`: a camera, guider or mount
//! that defines a timed guide property is a guide output, and a camera or
//! focuser that defines a temperature property is a thermometer. They leave
//! again when that property is deleted.

use std::collections::{HashMap, HashSet};
use std::ops::Deref;

use crate::client::{HandlerSlots, IndiClientHandler, IndiSender};
use crate::device::{DeviceInterface, DriverInfo, GuideOutput, IndiDevice, Thermometer};
use crate::manager::{DeviceHandler, DeviceManager};
use crate::protocol::{names, DelProperty, NewNumberVector, NumberVector, PropertyState, SwitchVector, TextVector};

/// Direction of a guide pulse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuideDirection {
    North,
    South,
    West,
    East,
}

impl GuideDirection {
    /// Property and element that carry a pulse in this direction
    pub fn element(&self) -> (&'static str, &'static str) {
        match self {
            GuideDirection::North => (names::TELESCOPE_TIMED_GUIDE_NS, names::TIMED_GUIDE_N),
            GuideDirection::South => (names::TELESCOPE_TIMED_GUIDE_NS, names::TIMED_GUIDE_S),
            GuideDirection::West => (names::TELESCOPE_TIMED_GUIDE_WE, names::TIMED_GUIDE_W),
            GuideDirection::East => (names::TELESCOPE_TIMED_GUIDE_WE, names::TIMED_GUIDE_E),
        }
    }
}

/// Devices admitted by the first definition of one of their properties
pub struct AuxiliaryManager<D> {
    devices: DeviceManager<D>,
    drivers: HashMap<String, DriverInfo>,
    connected: HashSet<String>,
}

pub type GuideOutputManager = AuxiliaryManager<GuideOutput>;

pub type ThermometerManager = AuxiliaryManager<Thermometer>;

impl<D: IndiDevice> Default for AuxiliaryManager<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: IndiDevice> Deref for AuxiliaryManager<D> {
    type Target = DeviceManager<D>;

    fn deref(&self) -> &Self::Target {
        &self.devices
    }
}

impl<D: IndiDevice> AuxiliaryManager<D> {
    pub fn new() -> Self {
        Self {
            devices: DeviceManager::new(),
            drivers: HashMap::new(),
            connected: HashSet::new(),
        }
    }

    pub fn add_handler(&mut self, handler: impl DeviceHandler<D> + Send + 'static) {
        self.devices.add_handler(handler);
    }

    /// Admit `name` if its driver reports one of `interfaces`
    fn admit(&mut self, client: &IndiSender, name: &str, interfaces: DeviceInterface, init: impl FnOnce(&mut D)) {
        if self.devices.has(name) {
            return;
        }

        let Some(driver) = self.drivers.get(name).filter(|d| d.interface.intersects(interfaces)).cloned() else {
            tracing::debug!("{}: not admitted, driver interface is not one of {:?}", name, interfaces);
            return;
        };

        let mut device = D::create(name, driver);
        device.header_mut().connected = self.connected.contains(name);
        init(&mut device);

        self.devices.add(client, device);
    }

    fn driver_info(&mut self, client: &IndiSender, vector: &TextVector) {
        let Some(driver) = DriverInfo::from_vector(vector) else {
            return;
        };

        self.devices.apply(client, &vector.device, vector.state, |device, changes| {
            changes.set("driver", &mut device.header_mut().driver, driver.clone());
        });
        self.drivers.insert(vector.device.clone(), driver);
    }

    fn connection(&mut self, client: &IndiSender, vector: &SwitchVector) {
        let connected = vector.is_on(names::CONNECT);

        if connected {
            self.connected.insert(vector.device.clone());
        } else {
            self.connected.remove(&vector.device);
        }

        self.devices.apply(client, &vector.device, vector.state, |device, changes| {
            changes.set("connected", &mut device.header_mut().connected, connected);
        });
    }

    fn deleted(&mut self, client: &IndiSender, message: &DelProperty, watched: &[&str]) {
        if message.is_whole_device() {
            self.drivers.remove(&message.device);
            self.connected.remove(&message.device);
        }

        if watched.iter().any(|property| message.removes(property)) {
            self.devices.remove(client, &message.device);
        }
    }

    fn reset(&mut self, client: &IndiSender) {
        self.devices.clear(client);
        self.drivers.clear();
        self.connected.clear();
    }
}

const AUXILIARY_SLOTS: HandlerSlots = HandlerSlots::TEXT_VECTOR
    .union(HandlerSlots::NUMBER_VECTOR)
    .union(HandlerSlots::SWITCH_VECTOR)
    .union(HandlerSlots::DEL_PROPERTY)
    .union(HandlerSlots::CLOSE);

const GUIDE_PROPERTIES: [&str; 2] = [names::TELESCOPE_TIMED_GUIDE_NS, names::TELESCOPE_TIMED_GUIDE_WE];

const TEMPERATURE_PROPERTIES: [&str; 2] = [names::CCD_TEMPERATURE, names::FOCUS_TEMPERATURE];

const GUIDE_INTERFACES: DeviceInterface =
    DeviceInterface::CCD.union(DeviceInterface::GUIDER).union(DeviceInterface::TELESCOPE);

const TEMPERATURE_INTERFACES: DeviceInterface = DeviceInterface::CCD.union(DeviceInterface::FOCUSER);

impl GuideOutputManager {
    /// Send a guide pulse of `duration` milliseconds
    pub fn pulse(&self, client: &IndiSender, output: &GuideOutput, direction: GuideDirection, duration: f64) {
        if !output.can_pulse_guide {
            return;
        }

        let (property, element) = direction.element();
        client.send_number(&NewNumberVector::new(output.name(), property).element(element, duration));
    }
}

impl IndiClientHandler for GuideOutputManager {
    fn slots(&self) -> HandlerSlots {
        AUXILIARY_SLOTS
    }

    fn text_vector(&mut self, client: &IndiSender, vector: &TextVector) {
        if vector.name == names::DRIVER_INFO {
            self.driver_info(client, vector);
        }
    }

    fn switch_vector(&mut self, client: &IndiSender, vector: &SwitchVector) {
        if vector.name == names::CONNECTION {
            self.connection(client, vector);
        }
    }

    fn number_vector(&mut self, client: &IndiSender, vector: &NumberVector) {
        if !GUIDE_PROPERTIES.contains(&vector.name.as_str()) {
            return;
        }

        if vector.is_def() {
            self.admit(client, &vector.device, GUIDE_INTERFACES, |output| output.can_pulse_guide = true);
        }

        self.devices.apply(client, &vector.device, vector.state, |output, changes| {
            if let Some(state) = vector.state {
                changes.set("pulse_guiding", &mut output.pulse_guiding, state == PropertyState::Busy);
            }
        });
    }

    fn del_property(&mut self, client: &IndiSender, message: &DelProperty) {
        self.deleted(client, message, &GUIDE_PROPERTIES);
    }

    fn close(&mut self, client: &IndiSender, _server: bool) {
        self.reset(client);
    }
}

impl IndiClientHandler for ThermometerManager {
    fn slots(&self) -> HandlerSlots {
        AUXILIARY_SLOTS
    }

    fn text_vector(&mut self, client: &IndiSender, vector: &TextVector) {
        if vector.name == names::DRIVER_INFO {
            self.driver_info(client, vector);
        }
    }

    fn switch_vector(&mut self, client: &IndiSender, vector: &SwitchVector) {
        if vector.name == names::CONNECTION {
            self.connection(client, vector);
        }
    }

    fn number_vector(&mut self, client: &IndiSender, vector: &NumberVector) {
        let element = match vector.name.as_str() {
            names::CCD_TEMPERATURE => names::CCD_TEMPERATURE_VALUE,
            names::FOCUS_TEMPERATURE => names::TEMPERATURE,
            _ => return,
        };

        if vector.is_def() {
            self.admit(client, &vector.device, TEMPERATURE_INTERFACES, |thermometer| thermometer.has_thermometer = true);
        }

        self.devices.apply(client, &vector.device, vector.state, |thermometer, changes| {
            if let Some(temperature) = vector.value(element) {
                changes.set("temperature", &mut thermometer.temperature, temperature);
            }
        });
    }

    fn del_property(&mut self, client: &IndiSender, message: &DelProperty) {
        self.deleted(client, message, &TEMPERATURE_PROPERTIES);
    }

    fn close(&mut self, client: &IndiSender, _server: bool) {
        self.reset(client);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::testing::*;

    const DEF_GUIDE_NS: &str = r#"<defNumberVector device="CCD Simulator" name="TELESCOPE_TIMED_GUIDE_NS" state="Idle" perm="rw"><defNumber name="TIMED_GUIDE_N" min="0" max="60000" step="100">0</defNumber><defNumber name="TIMED_GUIDE_S" min="0" max="60000" step="100">0</defNumber></defNumberVector>"#;
    const DEF_GUIDE_WE: &str = r#"<defNumberVector device="CCD Simulator" name="TELESCOPE_TIMED_GUIDE_WE" state="Idle" perm="rw"><defNumber name="TIMED_GUIDE_W" min="0" max="60000" step="100">0</defNumber><defNumber name="TIMED_GUIDE_E" min="0" max="60000" step="100">0</defNumber></defNumberVector>"#;

    #[test]
    fn test_guide_output_admission_and_removal() {
        let (client, mut rx) = IndiSender::channel();
        let events = Events::default();
        let mut outputs = GuideOutputManager::new();
        outputs.add_handler(events.clone());

        feed(&mut outputs, &client, &driver_info("CCD Simulator", 0x16));
        feed(&mut outputs, &client, &connection("CCD Simulator", true));
        assert!(outputs.is_empty());

        feed(&mut outputs, &client, DEF_GUIDE_NS);
        feed(&mut outputs, &client, DEF_GUIDE_WE);
        assert_eq!(events.take(), vec!["added:CCD Simulator"]);

        let output = outputs.get("CCD Simulator").unwrap().clone();
        assert!(output.can_pulse_guide);
        assert!(output.header.connected);
        assert_eq!(output.header.driver.executable, "indi_test");

        outputs.pulse(&client, &output, GuideDirection::West, 250.0);
        assert_eq!(
            rx.try_recv().unwrap(),
            r#"<newNumberVector device="CCD Simulator" name="TELESCOPE_TIMED_GUIDE_WE"><oneNumber name="TIMED_GUIDE_W">250</oneNumber></newNumberVector>"#
        );

        feed(
            &mut outputs,
            &client,
            r#"<setNumberVector device="CCD Simulator" name="TELESCOPE_TIMED_GUIDE_WE" state="Busy"><oneNumber name="TIMED_GUIDE_W">250</oneNumber></setNumberVector>"#,
        );
        assert!(outputs.get("CCD Simulator").unwrap().pulse_guiding);
        assert_eq!(events.take(), vec!["updated:CCD Simulator:pulse_guiding"]);

        feed(&mut outputs, &client, r#"<delProperty device="CCD Simulator" name="CCD_FRAME"/>"#);
        assert_eq!(outputs.len(), 1);

        feed(&mut outputs, &client, r#"<delProperty device="CCD Simulator" name="TELESCOPE_TIMED_GUIDE_NS"/>"#);
        assert!(outputs.is_empty());
        assert_eq!(events.take(), vec!["removed:CCD Simulator"]);
    }

    #[test]
    fn test_thermometer_admission() {
        let client = IndiSender::default();
        let events = Events::default();
        let mut thermometers = ThermometerManager::new();
        thermometers.add_handler(events.clone());
        feed(&mut thermometers, &client, &driver_info("Focuser Simulator", 0x8));

        feed(
            &mut thermometers,
            &client,
            r#"<setNumberVector device="Focuser Simulator" name="FOCUS_TEMPERATURE" state="Ok"><oneNumber name="TEMPERATURE">10</oneNumber></setNumberVector>"#,
        );
        assert!(thermometers.is_empty());

        feed(
            &mut thermometers,
            &client,
            r#"<defNumberVector device="Focuser Simulator" name="FOCUS_TEMPERATURE" state="Ok" perm="ro"><defNumber name="TEMPERATURE" min="-50" max="70" step="0">12.5</defNumber></defNumberVector>"#,
        );

        let thermometer = thermometers.get("Focuser Simulator").unwrap();
        assert!(thermometer.has_thermometer);
        assert_eq!(thermometer.temperature, 12.5);
        assert!(!thermometer.header.connected);
        assert_eq!(events.take(), vec!["added:Focuser Simulator", "updated:Focuser Simulator:temperature"]);

        feed(&mut thermometers, &client, r#"<delProperty device="Focuser Simulator"/>"#);
        assert!(thermometers.is_empty());
    }

    #[test]
    fn test_admission_needs_a_matching_driver() {
        let client = IndiSender::default();
        let mut thermometers = ThermometerManager::new();
        let mut outputs = GuideOutputManager::new();
        let weather = r#"<defNumberVector device="Weather Simulator" name="CCD_TEMPERATURE" state="Ok" perm="ro"><defNumber name="CCD_TEMPERATURE_VALUE" min="-50" max="50" step="0">4</defNumber></defNumberVector>"#;

        // Unknown driver
        feed(&mut thermometers, &client, weather);
        feed(&mut outputs, &client, DEF_GUIDE_NS);
        assert!(thermometers.is_empty());
        assert!(outputs.is_empty());

        // Weather station
        feed(&mut thermometers, &client, &driver_info("Weather Simulator", 0x80));
        feed(&mut thermometers, &client, weather);
        assert!(thermometers.is_empty());

        // Focusers have no guide outputs
        feed(&mut outputs, &client, &driver_info("CCD Simulator", 0x8));
        feed(&mut outputs, &client, DEF_GUIDE_NS);
        assert!(outputs.is_empty());

        feed(&mut outputs, &client, &driver_info("CCD Simulator", 0x1));
        feed(&mut outputs, &client, DEF_GUIDE_NS);
        assert!(outputs.has("CCD Simulator"));
    }
}
