//! Typed device model
//!
//! Every device kind is a plain struct with a shared [`DeviceHeader`]. The
//! optional facets a kind may carry (pulse guiding, a temperature sensor,
//! parking) are listed in the header as [`Capabilities`], fixed by the
//! factory function of the kind. A field holds its default until the INDI
//! property it mirrors has been defined by the driver.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::protocol::{names, CcdFrameType, NumberElement, PropertyState, TextVector};

bitflags! {
    /// `DRIVER_INTERFACE` bits reported in `DRIVER_INFO`
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct DeviceInterface: u32 {
        const TELESCOPE = 0x0001;
        const CCD = 0x0002;
        const GUIDER = 0x0004;
        const FOCUSER = 0x0008;
        const FILTER = 0x0010;
        const DOME = 0x0020;
        const GPS = 0x0040;
        const WEATHER = 0x0080;
        const AO = 0x0100;
        const DUSTCAP = 0x0200;
        const LIGHTBOX = 0x0400;
        const DETECTOR = 0x0800;
        const ROTATOR = 0x1000;
        const SPECTROGRAPH = 0x2000;
        const CORRELATOR = 0x4000;
        const AUX = 0x8000;
        const OUTPUT = 0x10000;
        const INPUT = 0x20000;
        const POWER = 0x40000;

        const SENSOR = Self::SPECTROGRAPH.bits() | Self::DETECTOR.bits() | Self::CORRELATOR.bits();
    }
}

bitflags! {
    /// Optional facets of a device
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Capabilities: u8 {
        const GUIDE_OUTPUT = 1 << 0;
        const THERMOMETER = 1 << 1;
        const PARKABLE = 1 << 2;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DriverInfo {
    pub executable: String,
    pub version: String,
    pub interface: DeviceInterface,
}

impl DriverInfo {
    /// Read a `DRIVER_INFO` vector. `None` when it carries no interface.
    pub fn from_vector(vector: &TextVector) -> Option<Self> {
        let interface = vector.value(names::DRIVER_INTERFACE)?.trim().parse::<u32>().ok()?;

        Some(Self {
            executable: vector.value(names::DRIVER_EXEC).unwrap_or_default().to_string(),
            version: vector.value(names::DRIVER_VERSION).unwrap_or_default().to_string(),
            interface: DeviceInterface::from_bits_retain(interface),
        })
    }
}

/// Fields shared by every device
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeviceHeader {
    pub name: String,
    pub connected: bool,
    pub driver: DriverInfo,
    pub capabilities: Capabilities,
}

impl DeviceHeader {
    pub fn new(name: &str, driver: DriverInfo, capabilities: Capabilities) -> Self {
        Self {
            name: name.to_string(),
            connected: false,
            driver,
            capabilities,
        }
    }
}

/// A device kind kept by a [`crate::DeviceManager`]
pub trait IndiDevice: Clone + Send + 'static {
    /// Interface bit a `DRIVER_INFO` must carry for the device to be admitted
    const INTERFACE: DeviceInterface;

    /// Build a fresh device in its default state
    fn create(name: &str, driver: DriverInfo) -> Self;

    fn header(&self) -> &DeviceHeader;

    fn header_mut(&mut self) -> &mut DeviceHeader;

    fn name(&self) -> &str {
        &self.header().name
    }
}

/// A number with the limits of its definition
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MinMax {
    pub value: f64,
    pub min: f64,
    pub max: f64,
}

impl MinMax {
    /// Merge an element: limits are taken from definitions only.
    pub fn merged(self, element: &NumberElement, def: bool) -> Self {
        if def {
            Self {
                value: element.value,
                min: element.min(),
                max: element.max(),
            }
        } else {
            Self {
                value: element.value,
                ..self
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Cfa {
    pub offset_x: i32,
    pub offset_y: i32,
    pub pattern: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Frame {
    pub x: MinMax,
    pub y: MinMax,
    pub width: MinMax,
    pub height: MinMax,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Binning {
    pub x: MinMax,
    pub y: MinMax,
}

/// Exposure duration in seconds and the state of `CCD_EXPOSURE`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Exposure {
    pub value: f64,
    pub min: f64,
    pub max: f64,
    pub state: PropertyState,
}

impl Exposure {
    pub fn is_busy(&self) -> bool {
        self.state == PropertyState::Busy
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PixelSize {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Camera {
    #[serde(flatten)]
    pub header: DeviceHeader,
    pub has_cooler_control: bool,
    pub cooler_power: f64,
    pub cooler: bool,
    pub frame_formats: Vec<String>,
    pub frame_format: String,
    pub frame_type: CcdFrameType,
    pub can_abort: bool,
    pub cfa: Cfa,
    pub exposure: Exposure,
    pub has_cooler: bool,
    pub can_set_temperature: bool,
    pub can_sub_frame: bool,
    pub frame: Frame,
    pub can_bin: bool,
    pub bin: Binning,
    pub gain: MinMax,
    pub offset: MinMax,
    pub pixel_size: PixelSize,
    pub can_pulse_guide: bool,
    pub pulse_guiding: bool,
    pub has_thermometer: bool,
    pub temperature: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PierSide {
    East,
    West,
    #[default]
    Neither,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SlewRate {
    pub name: String,
    pub label: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct EquatorialCoordinate {
    /// Hours
    pub right_ascension: f64,
    /// Degrees
    pub declination: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GeographicCoordinate {
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GuideRate {
    pub we: f64,
    pub ns: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UtcTime {
    /// Milliseconds since the Unix epoch
    pub utc: i64,
    /// Minutes east of UTC
    pub offset: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Mount {
    #[serde(flatten)]
    pub header: DeviceHeader,
    pub slewing: bool,
    pub tracking: bool,
    pub can_abort: bool,
    pub can_sync: bool,
    pub can_go_to: bool,
    pub can_flip: bool,
    pub can_home: bool,
    pub can_park: bool,
    pub parking: bool,
    pub parked: bool,
    pub slew_rates: Vec<SlewRate>,
    pub slew_rate: Option<String>,
    pub track_modes: Vec<String>,
    pub track_mode: String,
    pub pier_side: PierSide,
    pub guide_rate: GuideRate,
    pub equatorial_coordinate: EquatorialCoordinate,
    pub can_pulse_guide: bool,
    pub pulse_guiding: bool,
    pub geographic_coordinate: GeographicCoordinate,
    pub time: UtcTime,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Wheel {
    #[serde(flatten)]
    pub header: DeviceHeader,
    pub moving: bool,
    pub slots: Vec<String>,
    /// Zero-based slot index
    pub position: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Focuser {
    #[serde(flatten)]
    pub header: DeviceHeader,
    pub moving: bool,
    pub position: MinMax,
    pub can_absolute_move: bool,
    pub can_relative_move: bool,
    pub can_abort: bool,
    pub can_reverse: bool,
    pub reversed: bool,
    pub can_sync: bool,
    pub has_backlash: bool,
    pub has_thermometer: bool,
    pub temperature: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Cover {
    #[serde(flatten)]
    pub header: DeviceHeader,
    pub can_park: bool,
    pub parking: bool,
    pub parked: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FlatPanel {
    #[serde(flatten)]
    pub header: DeviceHeader,
    pub enabled: bool,
    pub intensity: MinMax,
}

/// A device that accepts timed guide pulses
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GuideOutput {
    #[serde(flatten)]
    pub header: DeviceHeader,
    pub can_pulse_guide: bool,
    pub pulse_guiding: bool,
}

/// A device that reports a temperature
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Thermometer {
    #[serde(flatten)]
    pub header: DeviceHeader,
    pub has_thermometer: bool,
    pub temperature: f64,
}

macro_rules! indi_device {
    ($device:ty, $interface:expr, $capabilities:expr) => {
        impl IndiDevice for $device {
            const INTERFACE: DeviceInterface = $interface;

            fn create(name: &str, driver: DriverInfo) -> Self {
                Self {
                    header: DeviceHeader::new(name, driver, $capabilities),
                    ..Default::default()
                }
            }

            fn header(&self) -> &DeviceHeader {
                &self.header
            }

            fn header_mut(&mut self) -> &mut DeviceHeader {
                &mut self.header
            }
        }
    };
}

indi_device!(
    Camera,
    DeviceInterface::CCD,
    Capabilities::GUIDE_OUTPUT.union(Capabilities::THERMOMETER)
);
indi_device!(
    Mount,
    DeviceInterface::TELESCOPE,
    Capabilities::GUIDE_OUTPUT.union(Capabilities::PARKABLE)
);
indi_device!(Wheel, DeviceInterface::FILTER, Capabilities::empty());
indi_device!(Focuser, DeviceInterface::FOCUSER, Capabilities::THERMOMETER);
indi_device!(Cover, DeviceInterface::DUSTCAP, Capabilities::PARKABLE);
indi_device!(FlatPanel, DeviceInterface::LIGHTBOX, Capabilities::empty());
// Admitted by their properties rather than by DRIVER_INFO.
indi_device!(GuideOutput, DeviceInterface::GUIDER, Capabilities::GUIDE_OUTPUT);
indi_device!(Thermometer, DeviceInterface::empty(), Capabilities::THERMOMETER);

/// Any typed device
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Device {
    Camera(Camera),
    Mount(Mount),
    Wheel(Wheel),
    Focuser(Focuser),
    Cover(Cover),
    FlatPanel(FlatPanel),
}

impl Device {
    pub fn header(&self) -> &DeviceHeader {
        match self {
            Device::Camera(d) => &d.header,
            Device::Mount(d) => &d.header,
            Device::Wheel(d) => &d.header,
            Device::Focuser(d) => &d.header,
            Device::Cover(d) => &d.header,
            Device::FlatPanel(d) => &d.header,
        }
    }

    pub fn name(&self) -> &str {
        &self.header().name
    }

    pub fn capabilities(&self) -> Capabilities {
        self.header().capabilities
    }

    pub fn is_guide_output(&self) -> bool {
        self.capabilities().contains(Capabilities::GUIDE_OUTPUT)
    }

    pub fn is_thermometer(&self) -> bool {
        self.capabilities().contains(Capabilities::THERMOMETER)
    }

    pub fn is_parkable(&self) -> bool {
        self.capabilities().contains(Capabilities::PARKABLE)
    }
}

macro_rules! device_from {
    ($($variant:ident),*) => {
        $(
            impl From<$variant> for Device {
                fn from(device: $variant) -> Self {
                    Device::$variant(device)
                }
            }
        )*
    };
}

device_from!(Camera, Mount, Wheel, Focuser, Cover, FlatPanel);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Direction, Vector};
    use crate::xml::XmlTokenizer;

    fn driver_info(interface: &str) -> TextVector {
        let xml = format!(
            r#"<defTextVector device="CCD Simulator" name="DRIVER_INFO" perm="ro">
<defText name="DRIVER_NAME">CCD Simulator</defText>
<defText name="DRIVER_EXEC">indi_simulator_ccd</defText>
<defText name="DRIVER_VERSION">1.0</defText>
<defText name="DRIVER_INTERFACE">{}</defText>
</defTextVector>"#,
            interface
        );
        let node = XmlTokenizer::new().parse(xml.as_bytes()).remove(0);
        Vector::from_node(&node, Direction::Def).unwrap()
    }

    #[test]
    fn test_driver_info() {
        let info = DriverInfo::from_vector(&driver_info("22")).unwrap();
        assert_eq!(info.executable, "indi_simulator_ccd");
        assert_eq!(info.version, "1.0");
        assert_eq!(info.interface, DeviceInterface::CCD | DeviceInterface::GUIDER | DeviceInterface::FILTER);
        assert!(info.interface.intersects(Camera::INTERFACE));
        assert!(!info.interface.intersects(Mount::INTERFACE));

        assert_eq!(DriverInfo::from_vector(&driver_info("garbage")), None);
    }

    #[test]
    fn test_factories_return_independent_defaults() {
        let driver = DriverInfo {
            executable: "indi_simulator_ccd".to_string(),
            ..Default::default()
        };

        let mut a = Camera::create("A", driver.clone());
        let b = Camera::create("B", driver);
        a.frame_formats.push("INDI_MONO".to_string());
        a.frame.width.value = 1280.0;

        assert!(b.frame_formats.is_empty());
        assert_eq!(b.frame.width.value, 0.0);
        assert_eq!(b.name(), "B");
        assert!(!b.header.connected);
    }

    #[test]
    fn test_capabilities_by_kind() {
        let mount: Device = Mount::create("Telescope Simulator", DriverInfo::default()).into();
        assert!(mount.is_guide_output());
        assert!(mount.is_parkable());
        assert!(!mount.is_thermometer());

        let camera: Device = Camera::create("CCD Simulator", DriverInfo::default()).into();
        assert!(camera.is_guide_output());
        assert!(camera.is_thermometer());

        let wheel: Device = Wheel::create("Filter Simulator", DriverInfo::default()).into();
        assert_eq!(wheel.capabilities(), Capabilities::empty());
    }

    #[test]
    fn test_min_max_merge() {
        let element = NumberElement {
            name: "WIDTH".to_string(),
            value: 1280.0,
            limits: crate::protocol::NumberLimits {
                min: Some(1.0),
                max: Some(1280.0),
                ..Default::default()
            },
            ..Default::default()
        };

        let defined = MinMax::default().merged(&element, true);
        assert_eq!(defined, MinMax { value: 1280.0, min: 1.0, max: 1280.0 });

        let update = NumberElement {
            value: 640.0,
            ..Default::default()
        };
        assert_eq!(defined.merged(&update, false), MinMax { value: 640.0, min: 1.0, max: 1280.0 });
    }

    #[test]
    fn test_device_serialization() {
        let device: Device = Wheel::create("Filter Simulator", DriverInfo::default()).into();
        let json = serde_json::to_value(&device).unwrap();

        assert_eq!(json["type"], "WHEEL");
        assert_eq!(json["name"], "Filter Simulator");
        assert_eq!(json["position"], 0);
        assert_eq!(json["connected"], false);
    }
}
