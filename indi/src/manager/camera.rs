//! Camera manager

use crate::client::{HandlerSlots, IndiClientHandler, IndiSender};
use crate::device::{Camera, Cfa, Focuser, IndiDevice, Mount, PixelSize, Wheel};
use crate::manager::property::DevicePropertyManager;
use crate::manager::DeviceManager;
use crate::protocol::{
    names, BlobVector, CcdFrameType, DelProperty, NewNumberVector, NewSwitchVector, NewTextVector, NumberVector,
    PropertyState, SwitchVector, TextVector,
};

pub type CameraManager = DeviceManager<Camera>;

/// Image encoding requested through `CCD_TRANSFER_FORMAT`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferFormat {
    Fits,
    Xisf,
    Native,
}

impl TransferFormat {
    pub fn element(&self) -> &'static str {
        match self {
            TransferFormat::Fits => "FORMAT_FITS",
            TransferFormat::Xisf => "FORMAT_XISF",
            TransferFormat::Native => "FORMAT_NATIVE",
        }
    }
}

impl CameraManager {
    pub fn cooler(&self, client: &IndiSender, camera: &Camera, value: bool) {
        if !camera.has_cooler_control || camera.cooler == value {
            return;
        }

        let element = if value { names::COOLER_ON } else { names::COOLER_OFF };
        client.send_switch(&NewSwitchVector::new(camera.name(), names::CCD_COOLER).element(element, true));
    }

    pub fn temperature(&self, client: &IndiSender, camera: &Camera, value: f64) {
        if camera.can_set_temperature {
            client.send_number(
                &NewNumberVector::new(camera.name(), names::CCD_TEMPERATURE).element(names::CCD_TEMPERATURE_VALUE, value),
            );
        }
    }

    pub fn frame_format(&self, client: &IndiSender, camera: &Camera, value: &str) {
        if camera.frame_formats.iter().any(|format| format == value) {
            client.send_switch(&NewSwitchVector::new(camera.name(), names::CCD_CAPTURE_FORMAT).element(value, true));
        } else {
            tracing::warn!("{}: unknown capture format {}", camera.name(), value);
        }
    }

    pub fn frame_type(&self, client: &IndiSender, camera: &Camera, value: CcdFrameType) {
        client.send_switch(&NewSwitchVector::new(camera.name(), names::CCD_FRAME_TYPE).element(value.element(), true));
    }

    pub fn frame(&self, client: &IndiSender, camera: &Camera, x: f64, y: f64, width: f64, height: f64) {
        if camera.can_sub_frame {
            client.send_number(
                &NewNumberVector::new(camera.name(), names::CCD_FRAME)
                    .element(names::X, x)
                    .element(names::Y, y)
                    .element(names::WIDTH, width)
                    .element(names::HEIGHT, height),
            );
        }
    }

    pub fn bin(&self, client: &IndiSender, camera: &Camera, x: f64, y: f64) {
        if camera.can_bin {
            client.send_number(
                &NewNumberVector::new(camera.name(), names::CCD_BINNING)
                    .element(names::HOR_BIN, x)
                    .element(names::VER_BIN, y),
            );
        }
    }

    /// Set the gain through `CCD_CONTROLS` when the driver defines it there,
    /// `CCD_GAIN` otherwise. Nothing is sent if the driver defines neither.
    pub fn gain(&self, client: &IndiSender, camera: &Camera, value: f64, properties: &DevicePropertyManager) {
        let candidates = [(names::CCD_CONTROLS, names::CONTROLS_GAIN), (names::CCD_GAIN, names::GAIN)];
        send_control(client, camera, value, properties, &candidates);
    }

    pub fn offset(&self, client: &IndiSender, camera: &Camera, value: f64, properties: &DevicePropertyManager) {
        let candidates = [(names::CCD_CONTROLS, names::CONTROLS_OFFSET), (names::CCD_OFFSET, names::OFFSET)];
        send_control(client, camera, value, properties, &candidates);
    }

    /// Start an exposure of `seconds`. Settings are sent separately.
    pub fn start_exposure(&self, client: &IndiSender, camera: &Camera, seconds: f64) {
        client.send_number(
            &NewNumberVector::new(camera.name(), names::CCD_EXPOSURE).element(names::CCD_EXPOSURE_VALUE, seconds),
        );
    }

    pub fn stop_exposure(&self, client: &IndiSender, camera: &Camera) {
        if camera.can_abort {
            client.send_switch(&NewSwitchVector::new(camera.name(), names::CCD_ABORT_EXPOSURE).element(names::ABORT, true));
        }
    }

    pub fn transfer_format(&self, client: &IndiSender, camera: &Camera, format: TransferFormat) {
        client.send_switch(&NewSwitchVector::new(camera.name(), names::CCD_TRANSFER_FORMAT).element(format.element(), true));
    }

    pub fn compression(&self, client: &IndiSender, camera: &Camera, enabled: bool) {
        let element = if enabled { names::INDI_ENABLED } else { names::INDI_DISABLED };
        client.send_switch(&NewSwitchVector::new(camera.name(), names::CCD_COMPRESSION).element(element, true));
    }

    /// Tell the driver which devices to read FITS header values from.
    /// A missing device clears its entry.
    pub fn snoop(
        &self,
        client: &IndiSender,
        camera: &Camera,
        mount: Option<&Mount>,
        focuser: Option<&Focuser>,
        wheel: Option<&Wheel>,
    ) {
        let name = |device: Option<&str>| device.unwrap_or_default().to_string();

        client.send_text(
            &NewTextVector::new(camera.name(), names::ACTIVE_DEVICES)
                .element(names::ACTIVE_TELESCOPE, name(mount.map(|d| d.header.name.as_str())))
                .element(names::ACTIVE_ROTATOR, String::new())
                .element(names::ACTIVE_FOCUSER, name(focuser.map(|d| d.header.name.as_str())))
                .element(names::ACTIVE_FILTER, name(wheel.map(|d| d.header.name.as_str()))),
        );
    }
}

fn send_control(
    client: &IndiSender,
    camera: &Camera,
    value: f64,
    properties: &DevicePropertyManager,
    candidates: &[(&str, &str)],
) {
    let known = candidates
        .iter()
        .find(|(property, element)| properties.has_element(camera.name(), property, element));

    match known {
        Some((property, element)) => {
            client.send_number(&NewNumberVector::new(camera.name(), *property).element(*element, value));
        }
        None => tracing::debug!("{}: no {} property defined", camera.name(), candidates[0].1),
    }
}

impl IndiClientHandler for CameraManager {
    fn slots(&self) -> HandlerSlots {
        HandlerSlots::TEXT_VECTOR
            | HandlerSlots::NUMBER_VECTOR
            | HandlerSlots::SWITCH_VECTOR
            | HandlerSlots::SET_BLOB_VECTOR
            | HandlerSlots::DEL_PROPERTY
            | HandlerSlots::CLOSE
    }

    fn text_vector(&mut self, client: &IndiSender, vector: &TextVector) {
        match vector.name.as_str() {
            names::DRIVER_INFO => self.driver_info(client, vector),
            names::CCD_CFA => {
                self.apply(client, &vector.device, vector.state, |camera, changes| {
                    let cfa = Cfa {
                        offset_x: vector.value(names::CFA_OFFSET_X).and_then(|v| v.trim().parse().ok()).unwrap_or_default(),
                        offset_y: vector.value(names::CFA_OFFSET_Y).and_then(|v| v.trim().parse().ok()).unwrap_or_default(),
                        pattern: vector.value(names::CFA_TYPE).filter(|v| !v.is_empty()).map(str::to_string),
                    };
                    changes.set("cfa", &mut camera.cfa, cfa);
                });
            }
            _ => {}
        }
    }

    fn switch_vector(&mut self, client: &IndiSender, vector: &SwitchVector) {
        match vector.name.as_str() {
            names::CONNECTION => self.connection(client, vector),
            names::CCD_COOLER => {
                self.apply(client, &vector.device, vector.state, |camera, changes| {
                    changes.set("cooler", &mut camera.cooler, vector.is_on(names::COOLER_ON));
                    if vector.is_def() {
                        changes.set("has_cooler_control", &mut camera.has_cooler_control, true);
                    }
                });
            }
            names::CCD_CAPTURE_FORMAT => {
                self.apply(client, &vector.device, vector.state, |camera, changes| {
                    if let Some(format) = vector.first_on() {
                        changes.set("frame_format", &mut camera.frame_format, format.to_string());
                    }
                    if vector.is_def() {
                        let formats = vector.elements.keys().cloned().collect();
                        changes.set("frame_formats", &mut camera.frame_formats, formats);
                    }
                });
            }
            names::CCD_FRAME_TYPE => {
                self.apply(client, &vector.device, vector.state, |camera, changes| {
                    if let Some(frame_type) = vector.first_on().and_then(CcdFrameType::from_element) {
                        changes.set("frame_type", &mut camera.frame_type, frame_type);
                    }
                });
            }
            names::CCD_ABORT_EXPOSURE => {
                if vector.is_def() && self.latch(&vector.device, &vector.name) {
                    self.apply(client, &vector.device, vector.state, |camera, changes| {
                        changes.set("can_abort", &mut camera.can_abort, vector.is_writable());
                    });
                }
            }
            _ => {}
        }
    }

    fn number_vector(&mut self, client: &IndiSender, vector: &NumberVector) {
        let def = vector.is_def();
        let first_def = def && self.latch(&vector.device, &vector.name);

        match vector.name.as_str() {
            names::CCD_INFO => {
                self.apply(client, &vector.device, vector.state, |camera, changes| {
                    let pixel_size = PixelSize {
                        x: vector.value(names::CCD_PIXEL_SIZE_X).unwrap_or(camera.pixel_size.x),
                        y: vector.value(names::CCD_PIXEL_SIZE_Y).unwrap_or(camera.pixel_size.y),
                    };
                    changes.set("pixel_size", &mut camera.pixel_size, pixel_size);
                });
            }
            names::CCD_EXPOSURE => {
                self.apply(client, &vector.device, vector.state, |camera, changes| {
                    let mut exposure = camera.exposure;
                    if let Some(state) = vector.state {
                        exposure.state = state;
                    }

                    if let Some(element) = vector.element(names::CCD_EXPOSURE_VALUE) {
                        if def {
                            exposure.min = element.min();
                            exposure.max = element.max();
                        }
                        // Idle and Alert report a stale duration
                        if matches!(exposure.state, PropertyState::Busy | PropertyState::Ok) {
                            exposure.value = element.value;
                        }
                    }

                    changes.set("exposure", &mut camera.exposure, exposure);
                });
            }
            names::CCD_COOLER_POWER => {
                self.apply(client, &vector.device, vector.state, |camera, changes| {
                    if let Some(power) = vector.value(names::CCD_COOLER_POWER) {
                        changes.set("cooler_power", &mut camera.cooler_power, power);
                    }
                });
            }
            names::CCD_TEMPERATURE => {
                self.apply(client, &vector.device, vector.state, |camera, changes| {
                    if let Some(temperature) = vector.value(names::CCD_TEMPERATURE_VALUE) {
                        changes.set("temperature", &mut camera.temperature, temperature);
                    }
                    if first_def {
                        changes.set("has_cooler", &mut camera.has_cooler, true);
                        changes.set("can_set_temperature", &mut camera.can_set_temperature, vector.is_writable());
                        changes.set("has_thermometer", &mut camera.has_thermometer, true);
                    }
                });
            }
            names::CCD_FRAME => {
                self.apply(client, &vector.device, vector.state, |camera, changes| {
                    let mut frame = camera.frame;
                    for (name, slot) in [
                        (names::X, &mut frame.x),
                        (names::Y, &mut frame.y),
                        (names::WIDTH, &mut frame.width),
                        (names::HEIGHT, &mut frame.height),
                    ] {
                        if let Some(element) = vector.element(name) {
                            *slot = slot.merged(element, def);
                        }
                    }
                    changes.set("frame", &mut camera.frame, frame);

                    if first_def {
                        changes.set("can_sub_frame", &mut camera.can_sub_frame, vector.is_writable());
                    }
                });
            }
            names::CCD_BINNING => {
                self.apply(client, &vector.device, vector.state, |camera, changes| {
                    let mut bin = camera.bin;
                    if let Some(element) = vector.element(names::HOR_BIN) {
                        bin.x = bin.x.merged(element, def);
                    }
                    if let Some(element) = vector.element(names::VER_BIN) {
                        bin.y = bin.y.merged(element, def);
                    }
                    changes.set("bin", &mut camera.bin, bin);

                    if first_def {
                        changes.set("can_bin", &mut camera.can_bin, vector.is_writable());
                    }
                });
            }
            names::CCD_CONTROLS | names::CCD_GAIN | names::CCD_OFFSET => {
                let (gain, offset) = match vector.name.as_str() {
                    names::CCD_CONTROLS => (names::CONTROLS_GAIN, names::CONTROLS_OFFSET),
                    _ => (names::GAIN, names::OFFSET),
                };

                self.apply(client, &vector.device, vector.state, |camera, changes| {
                    if let Some(element) = vector.element(gain) {
                        let gain = camera.gain.merged(element, def);
                        changes.set("gain", &mut camera.gain, gain);
                    }
                    if let Some(element) = vector.element(offset) {
                        let offset = camera.offset.merged(element, def);
                        changes.set("offset", &mut camera.offset, offset);
                    }
                });
            }
            names::TELESCOPE_TIMED_GUIDE_NS | names::TELESCOPE_TIMED_GUIDE_WE => {
                self.apply(client, &vector.device, vector.state, |camera, changes| {
                    if let Some(state) = vector.state {
                        changes.set("pulse_guiding", &mut camera.pulse_guiding, state == PropertyState::Busy);
                    }
                    if def {
                        changes.set("can_pulse_guide", &mut camera.can_pulse_guide, true);
                    }
                });
            }
            _ => {}
        }
    }

    fn set_blob_vector(&mut self, client: &IndiSender, vector: &BlobVector) {
        if vector.name != names::CCD1 {
            return;
        }

        for blob in vector.elements.values() {
            if blob.value.as_deref().map_or(true, str::is_empty) {
                tracing::warn!("{}: empty image BLOB {}", vector.device, blob.name);
                continue;
            }

            self.blob(client, &vector.device, blob);
        }
    }

    fn del_property(&mut self, client: &IndiSender, message: &DelProperty) {
        self.device_deleted(client, message);
    }

    fn close(&mut self, client: &IndiSender, _server: bool) {
        self.clear(client);
    }
}
