//! Mount manager

use chrono::NaiveDateTime;

use crate::client::{HandlerSlots, IndiClientHandler, IndiSender};
use crate::device::{EquatorialCoordinate, GeographicCoordinate, GuideRate, IndiDevice, Mount, PierSide, SlewRate, UtcTime};
use crate::manager::DeviceManager;
use crate::protocol::{
    names, DelProperty, NewNumberVector, NewSwitchVector, NumberVector, PropertyState, SwitchVector, TextVector,
};

pub type MountManager = DeviceManager<Mount>;

const TRACK_MODE_PREFIX: &str = "TRACK_";

/// Parse the `UTC` element of `TIME_UTC` into milliseconds since the epoch
fn parse_utc(text: &str) -> Option<i64> {
    let text = text.trim().trim_end_matches('Z');

    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|time| time.and_utc().timestamp_millis())
}

impl MountManager {
    /// Slew to a position and keep tracking it
    pub fn go_to(&self, client: &IndiSender, mount: &Mount, right_ascension: f64, declination: f64) {
        if mount.can_go_to {
            self.coordinates(client, mount, names::TRACK, right_ascension, declination);
        }
    }

    pub fn sync_to(&self, client: &IndiSender, mount: &Mount, right_ascension: f64, declination: f64) {
        if mount.can_sync {
            self.coordinates(client, mount, names::SYNC, right_ascension, declination);
        }
    }

    // ON_COORD_SET is its own property, so the action goes out as a separate
    // vector ahead of the coordinates.
    fn coordinates(&self, client: &IndiSender, mount: &Mount, action: &str, right_ascension: f64, declination: f64) {
        client.send_switch(&NewSwitchVector::new(mount.name(), names::ON_COORD_SET).element(action, true));
        client.send_number(
            &NewNumberVector::new(mount.name(), names::EQUATORIAL_EOD_COORD)
                .element(names::RA, right_ascension)
                .element(names::DEC, declination),
        );
    }

    pub fn park(&self, client: &IndiSender, mount: &Mount) {
        if mount.can_park && !mount.parked {
            client.send_switch(&NewSwitchVector::new(mount.name(), names::TELESCOPE_PARK).element(names::PARK, true));
        }
    }

    pub fn unpark(&self, client: &IndiSender, mount: &Mount) {
        if mount.can_park && mount.parked {
            client.send_switch(&NewSwitchVector::new(mount.name(), names::TELESCOPE_PARK).element(names::UNPARK, true));
        }
    }

    pub fn home(&self, client: &IndiSender, mount: &Mount) {
        if mount.can_home {
            client.send_switch(&NewSwitchVector::new(mount.name(), names::TELESCOPE_HOME).element(names::HOME_GO, true));
        }
    }

    pub fn stop(&self, client: &IndiSender, mount: &Mount) {
        if mount.can_abort {
            client.send_switch(
                &NewSwitchVector::new(mount.name(), names::TELESCOPE_ABORT_MOTION).element(names::ABORT, true),
            );
        }
    }

    pub fn tracking(&self, client: &IndiSender, mount: &Mount, enable: bool) {
        let element = if enable { names::TRACK_ON } else { names::TRACK_OFF };
        client.send_switch(&NewSwitchVector::new(mount.name(), names::TELESCOPE_TRACK_STATE).element(element, true));
    }

    pub fn slew_rate(&self, client: &IndiSender, mount: &Mount, rate: &str) {
        if mount.slew_rates.iter().any(|r| r.name == rate) {
            client.send_switch(&NewSwitchVector::new(mount.name(), names::TELESCOPE_SLEW_RATE).element(rate, true));
        }
    }

    /// Select a track mode by its short name, e.g. `SIDEREAL`
    pub fn track_mode(&self, client: &IndiSender, mount: &Mount, mode: &str) {
        if mount.track_modes.iter().any(|m| m == mode) {
            client.send_switch(
                &NewSwitchVector::new(mount.name(), names::TELESCOPE_TRACK_MODE)
                    .element(format!("{}{}", TRACK_MODE_PREFIX, mode), true),
            );
        }
    }

    pub fn move_north(&self, client: &IndiSender, mount: &Mount, enable: bool) {
        self.motion(client, mount, names::TELESCOPE_MOTION_NS, names::MOTION_NORTH, enable);
    }

    pub fn move_south(&self, client: &IndiSender, mount: &Mount, enable: bool) {
        self.motion(client, mount, names::TELESCOPE_MOTION_NS, names::MOTION_SOUTH, enable);
    }

    pub fn move_west(&self, client: &IndiSender, mount: &Mount, enable: bool) {
        self.motion(client, mount, names::TELESCOPE_MOTION_WE, names::MOTION_WEST, enable);
    }

    pub fn move_east(&self, client: &IndiSender, mount: &Mount, enable: bool) {
        self.motion(client, mount, names::TELESCOPE_MOTION_WE, names::MOTION_EAST, enable);
    }

    fn motion(&self, client: &IndiSender, mount: &Mount, property: &str, element: &str, enable: bool) {
        client.send_switch(&NewSwitchVector::new(mount.name(), property).element(element, enable));
    }

    pub fn geographic_coordinate(&self, client: &IndiSender, mount: &Mount, coordinate: GeographicCoordinate) {
        client.send_number(
            &NewNumberVector::new(mount.name(), names::GEOGRAPHIC_COORD)
                .element(names::LAT, coordinate.latitude)
                .element(names::LONG, coordinate.longitude)
                .element(names::ELEV, coordinate.elevation),
        );
    }
}

impl IndiClientHandler for MountManager {
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
            names::TIME_UTC => {
                self.apply(client, &vector.device, vector.state, |mount, changes| {
                    let utc = vector.value(names::UTC).and_then(parse_utc).unwrap_or(mount.time.utc);
                    let offset = vector
                        .value(names::UTC_OFFSET)
                        .and_then(|v| v.trim().parse::<f64>().ok())
                        .map_or(mount.time.offset, |hours| (hours * 60.0).round() as i32);

                    changes.set("time", &mut mount.time, UtcTime { utc, offset });
                });
            }
            _ => {}
        }
    }

    fn switch_vector(&mut self, client: &IndiSender, vector: &SwitchVector) {
        let first_def = vector.is_def() && self.latch(&vector.device, &vector.name);

        match vector.name.as_str() {
            names::CONNECTION => self.connection(client, vector),
            names::TELESCOPE_ABORT_MOTION => {
                self.apply(client, &vector.device, vector.state, |mount, changes| {
                    if first_def {
                        changes.set("can_abort", &mut mount.can_abort, vector.is_writable());
                    }
                });
            }
            names::ON_COORD_SET => {
                self.apply(client, &vector.device, vector.state, |mount, changes| {
                    if first_def {
                        let has = |name| vector.element(name).is_some();
                        changes.set("can_sync", &mut mount.can_sync, has(names::SYNC));
                        changes.set("can_go_to", &mut mount.can_go_to, has(names::TRACK) || has(names::SLEW));
                        changes.set("can_flip", &mut mount.can_flip, has(names::FLIP));
                    }
                });
            }
            names::TELESCOPE_HOME => {
                self.apply(client, &vector.device, vector.state, |mount, changes| {
                    if first_def {
                        changes.set("can_home", &mut mount.can_home, vector.is_writable());
                    }
                });
            }
            names::TELESCOPE_PARK => {
                self.apply(client, &vector.device, vector.state, |mount, changes| {
                    if vector.element(names::PARK).is_some() {
                        changes.set("parked", &mut mount.parked, vector.is_on(names::PARK));
                    }
                    if let Some(state) = vector.state {
                        changes.set("parking", &mut mount.parking, state == PropertyState::Busy);
                    }
                    if first_def {
                        changes.set("can_park", &mut mount.can_park, vector.is_writable());
                    }
                });
            }
            names::TELESCOPE_SLEW_RATE => {
                self.apply(client, &vector.device, vector.state, |mount, changes| {
                    if let Some(rate) = vector.first_on() {
                        changes.set("slew_rate", &mut mount.slew_rate, Some(rate.to_string()));
                    }
                    if vector.is_def() {
                        let rates = vector
                            .elements
                            .values()
                            .map(|e| SlewRate {
                                name: e.name.clone(),
                                label: e.label.clone().unwrap_or_else(|| e.name.clone()),
                            })
                            .collect();
                        changes.set("slew_rates", &mut mount.slew_rates, rates);
                    }
                });
            }
            names::TELESCOPE_TRACK_MODE => {
                let short = |name: &str| name.strip_prefix(TRACK_MODE_PREFIX).unwrap_or(name).to_string();

                self.apply(client, &vector.device, vector.state, |mount, changes| {
                    if let Some(mode) = vector.first_on() {
                        changes.set("track_mode", &mut mount.track_mode, short(mode));
                    }
                    if vector.is_def() {
                        let modes = vector.elements.keys().map(|name| short(name.as_str())).collect();
                        changes.set("track_modes", &mut mount.track_modes, modes);
                    }
                });
            }
            names::TELESCOPE_TRACK_STATE => {
                self.apply(client, &vector.device, vector.state, |mount, changes| {
                    changes.set("tracking", &mut mount.tracking, vector.is_on(names::TRACK_ON));
                });
            }
            names::TELESCOPE_PIER_SIDE => {
                self.apply(client, &vector.device, vector.state, |mount, changes| {
                    let side = if vector.is_on(names::PIER_EAST) {
                        PierSide::East
                    } else if vector.is_on(names::PIER_WEST) {
                        PierSide::West
                    } else {
                        PierSide::Neither
                    };
                    changes.set("pier_side", &mut mount.pier_side, side);
                });
            }
            _ => {}
        }
    }

    fn number_vector(&mut self, client: &IndiSender, vector: &NumberVector) {
        match vector.name.as_str() {
            names::EQUATORIAL_EOD_COORD => {
                self.apply(client, &vector.device, vector.state, |mount, changes| {
                    let current = mount.equatorial_coordinate;
                    let coordinate = EquatorialCoordinate {
                        right_ascension: vector.value(names::RA).unwrap_or(current.right_ascension),
                        declination: vector.value(names::DEC).unwrap_or(current.declination),
                    };
                    changes.set("equatorial_coordinate", &mut mount.equatorial_coordinate, coordinate);

                    if let Some(state) = vector.state {
                        changes.set("slewing", &mut mount.slewing, state == PropertyState::Busy);
                    }
                });
            }
            names::GUIDE_RATE => {
                self.apply(client, &vector.device, vector.state, |mount, changes| {
                    let rate = GuideRate {
                        we: vector.value(names::GUIDE_RATE_WE).unwrap_or(mount.guide_rate.we),
                        ns: vector.value(names::GUIDE_RATE_NS).unwrap_or(mount.guide_rate.ns),
                    };
                    changes.set("guide_rate", &mut mount.guide_rate, rate);
                });
            }
            names::TELESCOPE_TIMED_GUIDE_NS | names::TELESCOPE_TIMED_GUIDE_WE => {
                self.apply(client, &vector.device, vector.state, |mount, changes| {
                    if let Some(state) = vector.state {
                        changes.set("pulse_guiding", &mut mount.pulse_guiding, state == PropertyState::Busy);
                    }
                    if vector.is_def() {
                        changes.set("can_pulse_guide", &mut mount.can_pulse_guide, true);
                    }
                });
            }
            names::GEOGRAPHIC_COORD => {
                self.apply(client, &vector.device, vector.state, |mount, changes| {
                    let current = mount.geographic_coordinate;
                    let coordinate = GeographicCoordinate {
                        latitude: vector.value(names::LAT).unwrap_or(current.latitude),
                        longitude: vector.value(names::LONG).unwrap_or(current.longitude),
                        elevation: vector.value(names::ELEV).unwrap_or(current.elevation),
                    };
                    changes.set("geographic_coordinate", &mut mount.geographic_coordinate, coordinate);
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
