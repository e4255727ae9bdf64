//! Dust cap and light box managers

use crate::client::{HandlerSlots, IndiClientHandler, IndiSender};
use crate::device::{Cover, FlatPanel, IndiDevice};
use crate::manager::DeviceManager;
use crate::protocol::{
    names, DelProperty, NewNumberVector, NewSwitchVector, NumberVector, PropertyState, SwitchVector, TextVector,
};

pub type CoverManager = DeviceManager<Cover>;

pub type FlatPanelManager = DeviceManager<FlatPanel>;

impl CoverManager {
    pub fn park(&self, client: &IndiSender, cover: &Cover) {
        if cover.can_park {
            client.send_switch(&NewSwitchVector::new(cover.name(), names::CAP_PARK).element(names::PARK, true));
        }
    }

    pub fn unpark(&self, client: &IndiSender, cover: &Cover) {
        if cover.can_park {
            client.send_switch(&NewSwitchVector::new(cover.name(), names::CAP_PARK).element(names::UNPARK, true));
        }
    }
}

impl IndiClientHandler for CoverManager {
    fn slots(&self) -> HandlerSlots {
        HandlerSlots::TEXT_VECTOR | HandlerSlots::SWITCH_VECTOR | HandlerSlots::DEL_PROPERTY | HandlerSlots::CLOSE
    }

    fn text_vector(&mut self, client: &IndiSender, vector: &TextVector) {
        if vector.name == names::DRIVER_INFO {
            self.driver_info(client, vector);
        }
    }

    fn switch_vector(&mut self, client: &IndiSender, vector: &SwitchVector) {
        match vector.name.as_str() {
            names::CONNECTION => self.connection(client, vector),
            names::CAP_PARK => {
                let first_def = vector.is_def() && self.latch(&vector.device, &vector.name);

                self.apply(client, &vector.device, vector.state, |cover, changes| {
                    changes.set("parked", &mut cover.parked, vector.is_on(names::PARK));
                    if let Some(state) = vector.state {
                        changes.set("parking", &mut cover.parking, state == PropertyState::Busy);
                    }
                    if first_def {
                        changes.set("can_park", &mut cover.can_park, vector.is_writable());
                    }
                });
            }
            _ => {}
        }
    }

    fn del_property(&mut self, client: &IndiSender, message: &DelProperty) {
        self.device_deleted(client, message);
    }

    fn close(&mut self, client: &IndiSender, _server: bool) {
        self.clear(client);
    }
}

impl FlatPanelManager {
    pub fn enable(&self, client: &IndiSender, panel: &FlatPanel) {
        self.light(client, panel, names::FLAT_LIGHT_ON);
    }

    pub fn disable(&self, client: &IndiSender, panel: &FlatPanel) {
        self.light(client, panel, names::FLAT_LIGHT_OFF);
    }

    fn light(&self, client: &IndiSender, panel: &FlatPanel, element: &str) {
        client.send_switch(&NewSwitchVector::new(panel.name(), names::FLAT_LIGHT_CONTROL).element(element, true));
    }

    pub fn intensity(&self, client: &IndiSender, panel: &FlatPanel, value: f64) {
        client.send_number(
            &NewNumberVector::new(panel.name(), names::FLAT_LIGHT_INTENSITY).element(names::FLAT_LIGHT_INTENSITY_VALUE, value),
        );
    }
}

impl IndiClientHandler for FlatPanelManager {
    fn slots(&self) -> HandlerSlots {
        HandlerSlots::TEXT_VECTOR
            | HandlerSlots::NUMBER_VECTOR
            | HandlerSlots::SWITCH_VECTOR
            | HandlerSlots::DEL_PROPERTY
            | HandlerSlots::CLOSE
    }

    fn text_vector(&mut self, client: &IndiSender, vector: &TextVector) {
        if vector.name == names::DRIVER_INFO {
            self.driver_info(client, vector);
        }
    }

    fn switch_vector(&mut self, client: &IndiSender, vector: &SwitchVector) {
        match vector.name.as_str() {
            names::CONNECTION => self.connection(client, vector),
            names::FLAT_LIGHT_CONTROL => {
                self.apply(client, &vector.device, vector.state, |panel, changes| {
                    changes.set("enabled", &mut panel.enabled, vector.is_on(names::FLAT_LIGHT_ON));
                });
            }
            _ => {}
        }
    }

    fn number_vector(&mut self, client: &IndiSender, vector: &NumberVector) {
        if vector.name != names::FLAT_LIGHT_INTENSITY {
            return;
        }

        self.apply(client, &vector.device, vector.state, |panel, changes| {
            if let Some(element) = vector.element(names::FLAT_LIGHT_INTENSITY_VALUE) {
                let intensity = panel.intensity.merged(element, vector.is_def());
                changes.set("intensity", &mut panel.intensity, intensity);
            }
        });
    }

    fn del_property(&mut self, client: &IndiSender, message: &DelProperty) {
        self.device_deleted(client, message);
    }

    fn close(&mut self, client: &IndiSender, _server: bool) {
        self.clear(client);
    }
}
