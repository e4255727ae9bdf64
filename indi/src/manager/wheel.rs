//! Filter wheel manager
//!
//! INDI numbers filter slots from one; [`Wheel::position`] is zero-based.

use crate::client::{HandlerSlots, IndiClientHandler, IndiSender};
use crate::device::{IndiDevice, Wheel};
use crate::manager::DeviceManager;
use crate::protocol::{names, DelProperty, NewNumberVector, NewTextVector, NumberVector, PropertyState, SwitchVector, TextVector};

pub type WheelManager = DeviceManager<Wheel>;

impl WheelManager {
    /// Move to a zero-based slot
    pub fn move_to(&self, client: &IndiSender, wheel: &Wheel, position: usize) {
        if !wheel.slots.is_empty() && position >= wheel.slots.len() {
            tracing::warn!("{}: no filter slot {}", wheel.name(), position);
            return;
        }

        client.send_number(
            &NewNumberVector::new(wheel.name(), names::FILTER_SLOT).element(names::FILTER_SLOT_VALUE, (position + 1) as f64),
        );
    }

    /// Rename the filters, in slot order
    pub fn rename_filters(&self, client: &IndiSender, wheel: &Wheel, filters: &[String]) {
        let vector = filters
            .iter()
            .enumerate()
            .fold(NewTextVector::new(wheel.name(), names::FILTER_NAME), |vector, (i, name)| {
                vector.element(format!("FILTER_SLOT_NAME_{}", i + 1), name.clone())
            });

        client.send_text(&vector);
    }
}

impl IndiClientHandler for WheelManager {
    fn slots(&self) -> HandlerSlots {
        HandlerSlots::TEXT_VECTOR
            | HandlerSlots::NUMBER_VECTOR
            | HandlerSlots::SWITCH_VECTOR
            | HandlerSlots::DEL_PROPERTY
            | HandlerSlots::CLOSE
    }

    fn text_vector(&mut self, client: &IndiSender, vector: &TextVector) {
        match vector.name.as_str() {
            names::DRIVER_INFO => self.driver_info(client, vector),
            names::FILTER_NAME => {
                self.apply(client, &vector.device, vector.state, |wheel, changes| {
                    let slots = vector.elements.values().map(|e| e.value.trim().to_string()).collect();
                    changes.set("slots", &mut wheel.slots, slots);
                });
            }
            _ => {}
        }
    }

    fn switch_vector(&mut self, client: &IndiSender, vector: &SwitchVector) {
        if vector.name == names::CONNECTION {
            self.connection(client, vector);
        }
    }

    fn number_vector(&mut self, client: &IndiSender, vector: &NumberVector) {
        if vector.name != names::FILTER_SLOT {
            return;
        }

        self.apply(client, &vector.device, vector.state, |wheel, changes| {
            if let Some(slot) = vector.value(names::FILTER_SLOT_VALUE) {
                let position = (slot.round() as i64 - 1).max(0) as usize;
                changes.set("position", &mut wheel.position, position);
            }
            if let Some(state) = vector.state {
                changes.set("moving", &mut wheel.moving, state == PropertyState::Busy);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::testing::*;

    const DEVICE: &str = "Filter Simulator";

    #[test]
    fn test_position_is_zero_based() {
        let (client, mut rx) = IndiSender::channel();
        let events = Events::default();
        let mut wheels = WheelManager::new();
        feed(&mut wheels, &client, &driver_info(DEVICE, 0x10));
        wheels.add_handler(events.clone());

        feed(
            &mut wheels,
            &client,
            r#"<defNumberVector device="Filter Simulator" name="FILTER_SLOT" state="Idle" perm="rw"><defNumber name="FILTER_SLOT_VALUE" min="1" max="3" step="1">1</defNumber></defNumberVector>
<defTextVector device="Filter Simulator" name="FILTER_NAME" state="Idle" perm="rw"><defText name="FILTER_SLOT_NAME_1">Red</defText><defText name="FILTER_SLOT_NAME_2">Green</defText><defText name="FILTER_SLOT_NAME_3">Blue</defText></defTextVector>"#,
        );

        let wheel = wheels.get(DEVICE).unwrap().clone();
        assert_eq!(wheel.position, 0);
        assert_eq!(wheel.slots, vec!["Red", "Green", "Blue"]);
        assert_eq!(events.take(), vec!["updated:Filter Simulator:slots"]);

        feed(
            &mut wheels,
            &client,
            r#"<setNumberVector device="Filter Simulator" name="FILTER_SLOT" state="Busy"><oneNumber name="FILTER_SLOT_VALUE">3</oneNumber></setNumberVector>"#,
        );
        let moved = wheels.get(DEVICE).unwrap();
        assert_eq!(moved.position, 2);
        assert!(moved.moving);
        assert_eq!(events.take(), vec!["updated:Filter Simulator:position"]);

        feed(
            &mut wheels,
            &client,
            r#"<setNumberVector device="Filter Simulator" name="FILTER_SLOT" state="Ok"><oneNumber name="FILTER_SLOT_VALUE">3</oneNumber></setNumberVector>"#,
        );
        assert!(!wheels.get(DEVICE).unwrap().moving);
        assert_eq!(events.take(), vec!["updated:Filter Simulator:moving"]);

        while rx.try_recv().is_ok() {}
        wheels.move_to(&client, &wheel, 3);
        assert!(rx.try_recv().is_err());

        wheels.move_to(&client, &wheel, 1);
        assert_eq!(
            rx.try_recv().unwrap(),
            r#"<newNumberVector device="Filter Simulator" name="FILTER_SLOT"><oneNumber name="FILTER_SLOT_VALUE">2</oneNumber></newNumberVector>"#
        );
    }

    #[test]
    fn test_rename_slots() {
        let (client, mut rx) = IndiSender::channel();
        let wheels = WheelManager::new();
        let wheel = Wheel::create(DEVICE, Default::default());

        wheels.rename_filters(&client, &wheel, &["L".to_string(), "Ha".to_string()]);
        assert_eq!(
            rx.try_recv().unwrap(),
            r#"<newTextVector device="Filter Simulator" name="FILTER_NAME"><oneText name="FILTER_SLOT_NAME_1">L</oneText><oneText name="FILTER_SLOT_NAME_2">Ha</oneText></newTextVector>"#
        );
    }
}
