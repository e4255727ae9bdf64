//! Focuser manager

use crate::client::{HandlerSlots, IndiClientHandler, IndiSender};
use crate::device::{Focuser, IndiDevice};
use crate::manager::DeviceManager;
use crate::protocol::{
    names, DelProperty, NewNumberVector, NewSwitchVector, NumberVector, PropertyState, SwitchVector, TextVector,
};

pub type FocuserManager = DeviceManager<Focuser>;

impl FocuserManager {
    pub fn move_to(&self, client: &IndiSender, focuser: &Focuser, position: f64) {
        if focuser.can_absolute_move {
            client.send_number(
                &NewNumberVector::new(focuser.name(), names::ABS_FOCUS_POSITION)
                    .element(names::FOCUS_ABSOLUTE_POSITION, position),
            );
        }
    }

    pub fn move_in(&self, client: &IndiSender, focuser: &Focuser, steps: f64) {
        self.move_relative(client, focuser, names::FOCUS_INWARD, steps);
    }

    pub fn move_out(&self, client: &IndiSender, focuser: &Focuser, steps: f64) {
        self.move_relative(client, focuser, names::FOCUS_OUTWARD, steps);
    }

    // FOCUS_MOTION is its own property, so the direction goes out as a
    // separate vector ahead of the step count.
    fn move_relative(&self, client: &IndiSender, focuser: &Focuser, direction: &str, steps: f64) {
        if !focuser.can_relative_move {
            return;
        }

        client.send_switch(&NewSwitchVector::new(focuser.name(), names::FOCUS_MOTION).element(direction, true));
        client.send_number(
            &NewNumberVector::new(focuser.name(), names::REL_FOCUS_POSITION).element(names::FOCUS_RELATIVE_POSITION, steps),
        );
    }

    pub fn abort(&self, client: &IndiSender, focuser: &Focuser) {
        if focuser.can_abort {
            client.send_switch(&NewSwitchVector::new(focuser.name(), names::FOCUS_ABORT_MOTION).element(names::ABORT, true));
        }
    }

    pub fn reverse(&self, client: &IndiSender, focuser: &Focuser, enable: bool) {
        if focuser.can_reverse {
            let element = if enable { names::INDI_ENABLED } else { names::INDI_DISABLED };
            client.send_switch(&NewSwitchVector::new(focuser.name(), names::FOCUS_REVERSE_MOTION).element(element, true));
        }
    }

    pub fn sync_to(&self, client: &IndiSender, focuser: &Focuser, position: f64) {
        if focuser.can_sync {
            client.send_number(&NewNumberVector::new(focuser.name(), names::FOCUS_SYNC).element(names::FOCUS_SYNC_VALUE, position));
        }
    }
}

impl IndiClientHandler for FocuserManager {
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
        let first_def = vector.is_def() && self.latch(&vector.device, &vector.name);

        match vector.name.as_str() {
            names::CONNECTION => self.connection(client, vector),
            names::FOCUS_ABORT_MOTION => {
                self.apply(client, &vector.device, vector.state, |focuser, changes| {
                    if first_def {
                        changes.set("can_abort", &mut focuser.can_abort, vector.is_writable());
                    }
                });
            }
            names::FOCUS_REVERSE_MOTION => {
                self.apply(client, &vector.device, vector.state, |focuser, changes| {
                    changes.set("reversed", &mut focuser.reversed, vector.is_on(names::INDI_ENABLED));
                    if first_def {
                        changes.set("can_reverse", &mut focuser.can_reverse, vector.is_writable());
                    }
                });
            }
            _ => {}
        }
    }

    fn number_vector(&mut self, client: &IndiSender, vector: &NumberVector) {
        let def = vector.is_def();
        let first_def = def && self.latch(&vector.device, &vector.name);
        let moving = |current: bool| vector.state.map_or(current, |state| state == PropertyState::Busy);

        match vector.name.as_str() {
            names::ABS_FOCUS_POSITION => {
                self.apply(client, &vector.device, vector.state, |focuser, changes| {
                    if let Some(element) = vector.element(names::FOCUS_ABSOLUTE_POSITION) {
                        let position = focuser.position.merged(element, def);
                        changes.set("position", &mut focuser.position, position);
                    }

                    let moving = moving(focuser.moving);
                    changes.set("moving", &mut focuser.moving, moving);

                    if first_def {
                        changes.set("can_absolute_move", &mut focuser.can_absolute_move, vector.is_writable());
                    }
                });
            }
            names::REL_FOCUS_POSITION => {
                self.apply(client, &vector.device, vector.state, |focuser, changes| {
                    let moving = moving(focuser.moving);
                    changes.set("moving", &mut focuser.moving, moving);

                    if first_def {
                        changes.set("can_relative_move", &mut focuser.can_relative_move, vector.is_writable());
                    }
                });
            }
            names::FOCUS_SYNC => {
                self.apply(client, &vector.device, vector.state, |focuser, changes| {
                    if first_def {
                        changes.set("can_sync", &mut focuser.can_sync, vector.is_writable());
                    }
                });
            }
            names::FOCUS_BACKLASH_STEPS => {
                self.apply(client, &vector.device, vector.state, |focuser, changes| {
                    if first_def {
                        changes.set("has_backlash", &mut focuser.has_backlash, true);
                    }
                });
            }
            names::FOCUS_TEMPERATURE => {
                self.apply(client, &vector.device, vector.state, |focuser, changes| {
                    if let Some(temperature) = vector.value(names::TEMPERATURE) {
                        changes.set("temperature", &mut focuser.temperature, temperature);
                    }
                    if first_def {
                        changes.set("has_thermometer", &mut focuser.has_thermometer, true);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::testing::*;

    const DEVICE: &str = "Focuser Simulator";

    #[test]
    fn test_position_and_capabilities() {
        let client = IndiSender::default();
        let events = Events::default();
        let mut focusers = FocuserManager::new();
        feed(&mut focusers, &client, &driver_info(DEVICE, 0x8));
        focusers.add_handler(events.clone());

        feed(
            &mut focusers,
            &client,
            r#"<defNumberVector device="Focuser Simulator" name="ABS_FOCUS_POSITION" state="Ok" perm="rw"><defNumber name="FOCUS_ABSOLUTE_POSITION" min="0" max="100000" step="1000">50000</defNumber></defNumberVector>
<defNumberVector device="Focuser Simulator" name="REL_FOCUS_POSITION" state="Ok" perm="rw"><defNumber name="FOCUS_RELATIVE_POSITION" min="0" max="50000" step="1000">0</defNumber></defNumberVector>
<defNumberVector device="Focuser Simulator" name="FOCUS_TEMPERATURE" state="Ok" perm="ro"><defNumber name="TEMPERATURE" min="-50" max="70" step="0">12.5</defNumber></defNumberVector>
<defSwitchVector device="Focuser Simulator" name="FOCUS_REVERSE_MOTION" state="Ok" perm="rw" rule="OneOfMany"><defSwitch name="INDI_ENABLED">Off</defSwitch><defSwitch name="INDI_DISABLED">On</defSwitch></defSwitchVector>"#,
        );

        let focuser = focusers.get(DEVICE).unwrap();
        assert!(focuser.can_absolute_move);
        assert!(focuser.can_relative_move);
        assert!(focuser.can_reverse);
        assert!(!focuser.reversed);
        assert!(focuser.has_thermometer);
        assert_eq!(focuser.temperature, 12.5);
        assert_eq!(focuser.position.value, 50000.0);
        assert_eq!(focuser.position.max, 100000.0);
        events.take();

        let busy = r#"<setNumberVector device="Focuser Simulator" name="ABS_FOCUS_POSITION" state="Busy"><oneNumber name="FOCUS_ABSOLUTE_POSITION">49000</oneNumber></setNumberVector>"#;
        feed(&mut focusers, &client, busy);
        feed(&mut focusers, &client, busy);

        let focuser = focusers.get(DEVICE).unwrap();
        assert!(focuser.moving);
        assert_eq!(focuser.position.value, 49000.0);
        assert_eq!(focuser.position.max, 100000.0);
        assert_eq!(events.take(), vec!["updated:Focuser Simulator:position"]);

        feed(&mut focusers, &client, &busy.replace("Busy", "Ok"));
        assert!(!focusers.get(DEVICE).unwrap().moving);
        assert_eq!(events.take(), vec!["updated:Focuser Simulator:moving"]);
    }

    #[test]
    fn test_relative_move_selects_direction_first() {
        let (client, mut rx) = IndiSender::channel();
        let focusers = FocuserManager::new();
        let mut focuser = Focuser::create(DEVICE, Default::default());

        focusers.move_in(&client, &focuser, 100.0);
        focusers.move_to(&client, &focuser, 100.0);
        assert!(rx.try_recv().is_err());

        focuser.can_relative_move = true;
        focusers.move_out(&client, &focuser, 250.0);
        assert_eq!(
            rx.try_recv().unwrap(),
            r#"<newSwitchVector device="Focuser Simulator" name="FOCUS_MOTION"><oneSwitch name="FOCUS_OUTWARD">On</oneSwitch></newSwitchVector>"#
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            r#"<newNumberVector device="Focuser Simulator" name="REL_FOCUS_POSITION"><oneNumber name="FOCUS_RELATIVE_POSITION">250</oneNumber></newNumberVector>"#
        );
    }
}
