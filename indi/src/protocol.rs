//! INDI XML Protocol definitions
//!
//! Typed vectors and elements for the `def*Vector` / `set*Vector` messages a
//! server broadcasts, the `message` and `delProperty` notifications, and the
//! four command shapes a client sends back (`getProperties`, `enableBLOB` and
//! `new{Text,Number,Switch}Vector`).

use std::borrow::Cow;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use indexmap::IndexMap;
use quick_xml::escape::escape;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{IndiError, IndiResult};
use crate::xml::XmlNode;

/// INDI protocol version
pub const INDI_PROTOCOL_VERSION: &str = "1.7";

/// State of a property as reported by the driver
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyState {
    #[default]
    Idle,
    Ok,
    Busy,
    Alert,
}

impl PropertyState {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Idle" => Some(PropertyState::Idle),
            "Ok" => Some(PropertyState::Ok),
            "Busy" => Some(PropertyState::Busy),
            "Alert" => Some(PropertyState::Alert),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyState::Idle => "Idle",
            PropertyState::Ok => "Ok",
            PropertyState::Busy => "Busy",
            PropertyState::Alert => "Alert",
        }
    }
}

/// INDI property permission
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyPermission {
    ReadOnly,
    WriteOnly,
    #[default]
    ReadWrite,
}

impl PropertyPermission {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ro" => Some(PropertyPermission::ReadOnly),
            "wo" => Some(PropertyPermission::WriteOnly),
            "rw" => Some(PropertyPermission::ReadWrite),
            _ => None,
        }
    }

    pub fn is_writable(&self) -> bool {
        *self != PropertyPermission::ReadOnly
    }
}

/// Presentation hint of a switch vector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwitchRule {
    #[default]
    OneOfMany,
    AtMostOne,
    AnyOfMany,
}

impl SwitchRule {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "OneOfMany" => Some(SwitchRule::OneOfMany),
            "AtMostOne" => Some(SwitchRule::AtMostOne),
            "AnyOfMany" => Some(SwitchRule::AnyOfMany),
            _ => None,
        }
    }
}

/// BLOB delivery policy requested through `enableBLOB`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlobEnable {
    Never,
    Also,
    Only,
}

impl BlobEnable {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlobEnable::Never => "Never",
            BlobEnable::Also => "Also",
            BlobEnable::Only => "Only",
        }
    }
}

/// CCD frame type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CcdFrameType {
    #[default]
    Light,
    Bias,
    Dark,
    Flat,
}

impl CcdFrameType {
    /// Switch element name in `CCD_FRAME_TYPE`
    pub fn element(&self) -> &'static str {
        match self {
            CcdFrameType::Light => "FRAME_LIGHT",
            CcdFrameType::Bias => "FRAME_BIAS",
            CcdFrameType::Dark => "FRAME_DARK",
            CcdFrameType::Flat => "FRAME_FLAT",
        }
    }

    pub fn from_element(name: &str) -> Option<Self> {
        match name {
            "FRAME_LIGHT" => Some(CcdFrameType::Light),
            "FRAME_BIAS" => Some(CcdFrameType::Bias),
            "FRAME_DARK" => Some(CcdFrameType::Dark),
            "FRAME_FLAT" => Some(CcdFrameType::Flat),
            _ => None,
        }
    }
}

/// The five INDI property kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VectorKind {
    Text,
    Number,
    Switch,
    Light,
    Blob,
}

impl VectorKind {
    /// Kind fragment as it appears in tag names (`defBLOBVector`, `oneSwitch`, ...)
    pub fn tag(&self) -> &'static str {
        match self {
            VectorKind::Text => "Text",
            VectorKind::Number => "Number",
            VectorKind::Switch => "Switch",
            VectorKind::Light => "Light",
            VectorKind::Blob => "BLOB",
        }
    }

    fn from_tag(fragment: &str) -> Option<Self> {
        match fragment {
            "Text" => Some(VectorKind::Text),
            "Number" => Some(VectorKind::Number),
            "Switch" => Some(VectorKind::Switch),
            "Light" => Some(VectorKind::Light),
            "BLOB" => Some(VectorKind::Blob),
            _ => None,
        }
    }

    /// Tag of the child elements of a vector in the given direction
    pub fn element_tag(&self, direction: Direction) -> String {
        match direction {
            Direction::Def => format!("def{}", self.tag()),
            Direction::Set => format!("one{}", self.tag()),
        }
    }
}

/// Whether a vector declares a property or updates it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Def,
    Set,
}

/// Classify a top-level tag such as `defSwitchVector` or `setBLOBVector`.
pub fn classify(tag: &str) -> Option<(VectorKind, Direction)> {
    let fragment = tag.strip_suffix("Vector")?;

    let (direction, kind) = if let Some(kind) = fragment.strip_prefix("def") {
        (Direction::Def, kind)
    } else if let Some(kind) = fragment.strip_prefix("set") {
        (Direction::Set, kind)
    } else {
        return None;
    };

    VectorKind::from_tag(kind).map(|kind| (kind, direction))
}

/// Number element limits (min, max, step)
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NumberLimits {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub step: Option<f64>,
    pub format: Option<String>,
}

/// An element of a typed vector.
pub trait Element: Sized {
    const KIND: VectorKind;

    fn name(&self) -> &str;

    fn from_node(node: &XmlNode, direction: Direction) -> Self;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TextElement {
    pub name: String,
    pub label: Option<String>,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NumberElement {
    pub name: String,
    pub label: Option<String>,
    pub value: f64,
    /// Only filled by `defNumber`
    pub limits: NumberLimits,
}

impl NumberElement {
    pub fn min(&self) -> f64 {
        self.limits.min.unwrap_or_default()
    }

    pub fn max(&self) -> f64 {
        self.limits.max.unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SwitchElement {
    pub name: String,
    pub label: Option<String>,
    pub value: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LightElement {
    pub name: String,
    pub label: Option<String>,
    pub value: PropertyState,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BlobElement {
    pub name: String,
    pub label: Option<String>,
    pub size: Option<usize>,
    pub format: Option<String>,
    /// Base64 payload, `None` on `defBLOB`
    pub value: Option<String>,
}

fn label_of(node: &XmlNode, direction: Direction) -> Option<String> {
    match direction {
        Direction::Def => node.attribute("label").map(str::to_string),
        Direction::Set => None,
    }
}

fn element_name(node: &XmlNode) -> String {
    node.attribute("name").unwrap_or_default().to_string()
}

impl Element for TextElement {
    const KIND: VectorKind = VectorKind::Text;

    fn name(&self) -> &str {
        &self.name
    }

    fn from_node(node: &XmlNode, direction: Direction) -> Self {
        Self {
            name: element_name(node),
            label: label_of(node, direction),
            value: node.text.clone(),
        }
    }
}

impl Element for NumberElement {
    const KIND: VectorKind = VectorKind::Number;

    fn name(&self) -> &str {
        &self.name
    }

    fn from_node(node: &XmlNode, direction: Direction) -> Self {
        let limits = match direction {
            Direction::Def => NumberLimits {
                min: node.attribute("min").map(parse_number),
                max: node.attribute("max").map(parse_number),
                step: node.attribute("step").map(parse_number),
                format: node.attribute("format").map(str::to_string),
            },
            Direction::Set => NumberLimits::default(),
        };

        Self {
            name: element_name(node),
            label: label_of(node, direction),
            value: parse_number(&node.text),
            limits,
        }
    }
}

impl Element for SwitchElement {
    const KIND: VectorKind = VectorKind::Switch;

    fn name(&self) -> &str {
        &self.name
    }

    fn from_node(node: &XmlNode, direction: Direction) -> Self {
        Self {
            name: element_name(node),
            label: label_of(node, direction),
            value: node.text == "On",
        }
    }
}

impl Element for LightElement {
    const KIND: VectorKind = VectorKind::Light;

    fn name(&self) -> &str {
        &self.name
    }

    fn from_node(node: &XmlNode, direction: Direction) -> Self {
        Self {
            name: element_name(node),
            label: label_of(node, direction),
            value: PropertyState::parse(&node.text).unwrap_or_default(),
        }
    }
}

impl Element for BlobElement {
    const KIND: VectorKind = VectorKind::Blob;

    fn name(&self) -> &str {
        &self.name
    }

    fn from_node(node: &XmlNode, direction: Direction) -> Self {
        match direction {
            Direction::Def => Self {
                name: element_name(node),
                label: label_of(node, direction),
                ..Default::default()
            },
            Direction::Set => Self {
                name: element_name(node),
                label: None,
                size: node.attribute("size").and_then(|s| s.trim().parse().ok()),
                format: node.attribute("format").map(str::to_string),
                value: Some(node.text.clone()),
            },
        }
    }
}

impl BlobElement {
    /// Decode the base64 payload. Embedded line breaks are tolerated.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        let payload = self.value.as_deref().unwrap_or_default();

        if payload.bytes().any(|b| b.is_ascii_whitespace()) {
            let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
            BASE64.decode(compact)
        } else {
            BASE64.decode(payload)
        }
    }

    /// Detect the actual format of decoded data from its magic bytes,
    /// falling back to the declared format.
    pub fn detected_format(&self, data: &[u8]) -> String {
        let declared = self.format.as_deref().unwrap_or_default();

        let detected: &str = if data.len() >= 6 && &data[0..6] == b"SIMPLE" {
            ".fits"
        } else if data.len() >= 8 && data[0..8] == [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A] {
            ".png"
        } else if data.len() >= 3 && data[0..3] == [0xFF, 0xD8, 0xFF] {
            ".jpeg"
        } else if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            ".webp"
        } else if data.len() >= 4 && data[0..4] == [0x1F, 0x8B, 0x08, 0x00] {
            ".gz"
        } else if data.len() >= 2 && data[0..2] == [0x50, 0x4B] {
            ".zip"
        } else {
            declared
        };

        if !declared.is_empty() && detected != declared {
            tracing::debug!("BLOB format mismatch: declared '{}', detected '{}'", declared, detected);
        }

        detected.to_string()
    }
}

/// A typed `def*Vector` or `set*Vector`.
///
/// `label`, `group`, `permission` and `rule` only come with a definition.
/// A definition always has a `state`; an update without one leaves the state
/// unchanged.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Vector<E> {
    pub direction: Direction,
    pub device: String,
    pub name: String,
    pub label: Option<String>,
    pub group: Option<String>,
    pub state: Option<PropertyState>,
    pub permission: Option<PropertyPermission>,
    pub rule: Option<SwitchRule>,
    pub timeout: Option<f64>,
    pub timestamp: Option<String>,
    pub message: Option<String>,
    pub elements: IndexMap<String, E>,
}

pub type TextVector = Vector<TextElement>;
pub type NumberVector = Vector<NumberElement>;
pub type SwitchVector = Vector<SwitchElement>;
pub type LightVector = Vector<LightElement>;
pub type BlobVector = Vector<BlobElement>;

fn required<'a>(node: &'a XmlNode, attribute: &str) -> IndiResult<&'a str> {
    node.attribute(attribute)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| IndiError::Protocol(format!("<{}> without {} attribute", node.name, attribute)))
}

impl<E: Element> Vector<E> {
    /// Build a typed vector from a `def*Vector` / `set*Vector` node.
    pub fn from_node(node: &XmlNode, direction: Direction) -> IndiResult<Self> {
        let device = required(node, "device")?.to_string();
        let name = required(node, "name")?.to_string();
        let def = direction == Direction::Def;

        let state = node.attribute("state").and_then(PropertyState::parse);
        let state = if def { Some(state.unwrap_or_default()) } else { state };

        let permission = (def && E::KIND != VectorKind::Light)
            .then(|| node.attribute("perm").and_then(PropertyPermission::parse).unwrap_or_default());
        let rule = (def && E::KIND == VectorKind::Switch)
            .then(|| node.attribute("rule").and_then(SwitchRule::parse).unwrap_or_default());

        let element_tag = E::KIND.element_tag(direction);
        let mut elements = IndexMap::with_capacity(node.children.len());

        for child in node.children_named(&element_tag) {
            let element = E::from_node(child, direction);

            if element.name().is_empty() {
                tracing::debug!("dropping unnamed <{}> in {}.{}", element_tag, device, name);
                continue;
            }

            elements.insert(element.name().to_string(), element);
        }

        Ok(Self {
            direction,
            label: node.attribute("label").filter(|_| def).map(str::to_string),
            group: node.attribute("group").filter(|_| def).map(str::to_string),
            state,
            permission,
            rule,
            timeout: node.attribute("timeout").and_then(|s| s.trim().parse().ok()),
            timestamp: node.attribute("timestamp").map(str::to_string),
            message: node.attribute("message").map(str::to_string),
            elements,
            device,
            name,
        })
    }
}

impl<E> Vector<E> {
    pub fn is_def(&self) -> bool {
        self.direction == Direction::Def
    }

    pub fn element(&self, name: &str) -> Option<&E> {
        self.elements.get(name)
    }

    /// Whether a definition allows clients to write the property
    pub fn is_writable(&self) -> bool {
        self.permission.map_or(true, |perm| perm.is_writable())
    }
}

impl SwitchVector {
    /// Value of a switch element, `false` when absent
    pub fn is_on(&self, element: &str) -> bool {
        self.elements.get(element).is_some_and(|e| e.value)
    }

    /// Name of the first switch element that is on
    pub fn first_on(&self) -> Option<&str> {
        self.elements.values().find(|e| e.value).map(|e| e.name.as_str())
    }
}

impl NumberVector {
    pub fn value(&self, element: &str) -> Option<f64> {
        self.elements.get(element).map(|e| e.value)
    }
}

impl TextVector {
    pub fn value(&self, element: &str) -> Option<&str> {
        self.elements.get(element).map(|e| e.value.as_str())
    }
}

impl BlobVector {
    /// Decode the payload of one element of this vector
    pub fn decode(&self, element: &str) -> IndiResult<Vec<u8>> {
        let blob = self.elements.get(element).ok_or_else(|| IndiError::BlobDecode {
            device: self.device.clone(),
            property: self.name.clone(),
            message: format!("no element {}", element),
        })?;

        blob.decode().map_err(|e| IndiError::BlobDecode {
            device: self.device.clone(),
            property: self.name.clone(),
            message: e.to_string(),
        })
    }
}

/// A vector of any kind
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "vector")]
pub enum AnyVector {
    Text(TextVector),
    Number(NumberVector),
    Switch(SwitchVector),
    Light(LightVector),
    Blob(BlobVector),
}

macro_rules! each_vector {
    ($value:expr, $vector:ident => $body:expr) => {
        match $value {
            AnyVector::Text($vector) => $body,
            AnyVector::Number($vector) => $body,
            AnyVector::Switch($vector) => $body,
            AnyVector::Light($vector) => $body,
            AnyVector::Blob($vector) => $body,
        }
    };
}

impl AnyVector {
    /// Parse any `def*Vector` / `set*Vector` node.
    pub fn from_node(node: &XmlNode) -> IndiResult<Self> {
        let (kind, direction) =
            classify(&node.name).ok_or_else(|| IndiError::Protocol(format!("unknown tag: {}", node.name)))?;
        Self::parse(node, kind, direction)
    }

    pub(crate) fn parse(node: &XmlNode, kind: VectorKind, direction: Direction) -> IndiResult<Self> {
        Ok(match kind {
            VectorKind::Text => AnyVector::Text(Vector::from_node(node, direction)?),
            VectorKind::Number => AnyVector::Number(Vector::from_node(node, direction)?),
            VectorKind::Switch => AnyVector::Switch(Vector::from_node(node, direction)?),
            VectorKind::Light => AnyVector::Light(Vector::from_node(node, direction)?),
            VectorKind::Blob => AnyVector::Blob(Vector::from_node(node, direction)?),
        })
    }

    pub fn kind(&self) -> VectorKind {
        match self {
            AnyVector::Text(_) => VectorKind::Text,
            AnyVector::Number(_) => VectorKind::Number,
            AnyVector::Switch(_) => VectorKind::Switch,
            AnyVector::Light(_) => VectorKind::Light,
            AnyVector::Blob(_) => VectorKind::Blob,
        }
    }

    pub fn direction(&self) -> Direction {
        each_vector!(self, v => v.direction)
    }

    pub fn is_def(&self) -> bool {
        self.direction() == Direction::Def
    }

    pub fn device(&self) -> &str {
        each_vector!(self, v => v.device.as_str())
    }

    pub fn name(&self) -> &str {
        each_vector!(self, v => v.name.as_str())
    }

    pub fn state(&self) -> Option<PropertyState> {
        each_vector!(self, v => v.state)
    }

    pub fn set_state(&mut self, state: PropertyState) {
        each_vector!(self, v => v.state = Some(state))
    }

    pub fn permission(&self) -> Option<PropertyPermission> {
        each_vector!(self, v => v.permission)
    }

    pub fn has_element(&self, name: &str) -> bool {
        each_vector!(self, v => v.elements.contains_key(name))
    }

    pub fn element_names(&self) -> Vec<&str> {
        each_vector!(self, v => v.elements.keys().map(String::as_str).collect())
    }

    /// Tag this vector arrived as, e.g. `defNumberVector`
    pub fn tag(&self) -> String {
        let prefix = match self.direction() {
            Direction::Def => "def",
            Direction::Set => "set",
        };

        format!("{}{}Vector", prefix, self.kind().tag())
    }
}

/// A `message` notification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub id: Uuid,
    pub device: Option<String>,
    pub timestamp: Option<String>,
    pub message: Option<String>,
}

impl Message {
    pub fn from_node(node: &XmlNode) -> Self {
        Self {
            id: Uuid::new_v4(),
            device: node.attribute("device").map(str::to_string),
            timestamp: node.attribute("timestamp").map(str::to_string),
            message: node.attribute("message").map(str::to_string),
        }
    }
}

/// A `delProperty` notification. Without `name` the whole device is gone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DelProperty {
    pub device: String,
    pub name: Option<String>,
    pub timestamp: Option<String>,
    pub message: Option<String>,
}

impl DelProperty {
    pub fn from_node(node: &XmlNode) -> IndiResult<Self> {
        Ok(Self {
            device: required(node, "device")?.to_string(),
            name: node.attribute("name").filter(|name| !name.is_empty()).map(str::to_string),
            timestamp: node.attribute("timestamp").map(str::to_string),
            message: node.attribute("message").map(str::to_string),
        })
    }

    pub fn is_whole_device(&self) -> bool {
        self.name.is_none()
    }

    /// Whether this removes the given property, directly or with its device
    pub fn removes(&self, property: &str) -> bool {
        self.name.as_deref().map_or(true, |name| name == property)
    }
}

fn push_attribute(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    out.push_str(&escape(value));
    out.push('"');
}

/// `getProperties`, optionally scoped to a device and property
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetProperties {
    pub device: Option<String>,
    pub name: Option<String>,
}

impl GetProperties {
    pub fn device(device: impl Into<String>) -> Self {
        Self {
            device: Some(device.into()),
            name: None,
        }
    }

    pub fn to_xml(&self) -> String {
        let mut out = String::from("<getProperties");
        push_attribute(&mut out, "version", INDI_PROTOCOL_VERSION);

        if let Some(device) = &self.device {
            push_attribute(&mut out, "device", device);
        }
        if let Some(name) = &self.name {
            push_attribute(&mut out, "name", name);
        }

        out.push_str("/>");
        out
    }
}

/// `enableBLOB`, optionally scoped to one property
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnableBlob {
    pub device: String,
    pub name: Option<String>,
    pub value: BlobEnable,
}

impl EnableBlob {
    pub fn to_xml(&self) -> String {
        let mut out = String::from("<enableBLOB");
        push_attribute(&mut out, "device", &self.device);

        if let Some(name) = &self.name {
            push_attribute(&mut out, "name", name);
        }

        out.push('>');
        out.push_str(self.value.as_str());
        out.push_str("</enableBLOB>");
        out
    }
}

/// Value type that can be sent in a `new*Vector`
pub trait OneValue {
    const KIND: VectorKind;

    fn render(&self) -> Cow<'_, str>;
}

impl OneValue for String {
    const KIND: VectorKind = VectorKind::Text;

    fn render(&self) -> Cow<'_, str> {
        escape(self.as_str())
    }
}

impl OneValue for f64 {
    const KIND: VectorKind = VectorKind::Number;

    fn render(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }
}

impl OneValue for bool {
    const KIND: VectorKind = VectorKind::Switch;

    fn render(&self) -> Cow<'_, str> {
        Cow::Borrowed(if *self { "On" } else { "Off" })
    }
}

/// A client request to change element values of a property
#[derive(Debug, Clone, PartialEq)]
pub struct NewVector<V> {
    pub device: String,
    pub name: String,
    pub timestamp: Option<String>,
    pub elements: IndexMap<String, V>,
}

pub type NewTextVector = NewVector<String>;
pub type NewNumberVector = NewVector<f64>;
pub type NewSwitchVector = NewVector<bool>;

impl<V: OneValue> NewVector<V> {
    pub fn new(device: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            name: name.into(),
            timestamp: None,
            elements: IndexMap::new(),
        }
    }

    pub fn element(mut self, name: impl Into<String>, value: V) -> Self {
        self.elements.insert(name.into(), value);
        self
    }

    pub fn to_xml(&self) -> String {
        let kind = V::KIND.tag();
        let mut out = format!("<new{}Vector", kind);
        push_attribute(&mut out, "device", &self.device);
        push_attribute(&mut out, "name", &self.name);

        if let Some(timestamp) = &self.timestamp {
            push_attribute(&mut out, "timestamp", timestamp);
        }

        out.push('>');

        for (name, value) in &self.elements {
            out.push_str("<one");
            out.push_str(kind);
            push_attribute(&mut out, "name", name);
            out.push('>');
            out.push_str(&value.render());
            out.push_str("</one");
            out.push_str(kind);
            out.push('>');
        }

        out.push_str("</new");
        out.push_str(kind);
        out.push_str("Vector>");
        out
    }
}

/// Parse INDI numeric text: plain decimal or sexagesimal (`12:30:15.5`, `-5 30`).
pub fn parse_number(text: &str) -> f64 {
    let text = text.trim();

    if text.is_empty() {
        return 0.0;
    }

    if let Ok(value) = text.parse::<f64>() {
        return value;
    }

    parse_sexagesimal(text).unwrap_or_else(|| {
        tracing::debug!("unparsable number '{}'", text);
        0.0
    })
}

fn parse_sexagesimal(text: &str) -> Option<f64> {
    let negative = text.starts_with('-');
    let mut value = 0.0;
    let mut scale = 1.0;
    let mut parts = 0;

    for part in text.split([':', ' ']).filter(|p| !p.is_empty()) {
        let part: f64 = part.trim_start_matches(['-', '+']).parse().ok()?;
        value += part / scale;
        scale *= 60.0;
        parts += 1;
    }

    if parts < 2 || parts > 3 {
        return None;
    }

    Some(if negative { -value } else { value })
}

/// Standard INDI property and element names
pub mod names {
    pub const CONNECTION: &str = "CONNECTION";
    pub const CONNECT: &str = "CONNECT";
    pub const DISCONNECT: &str = "DISCONNECT";

    pub const DRIVER_INFO: &str = "DRIVER_INFO";
    pub const DRIVER_NAME: &str = "DRIVER_NAME";
    pub const DRIVER_EXEC: &str = "DRIVER_EXEC";
    pub const DRIVER_VERSION: &str = "DRIVER_VERSION";
    pub const DRIVER_INTERFACE: &str = "DRIVER_INTERFACE";

    pub const ABORT: &str = "ABORT";
    pub const PARK: &str = "PARK";
    pub const UNPARK: &str = "UNPARK";
    pub const INDI_ENABLED: &str = "INDI_ENABLED";
    pub const INDI_DISABLED: &str = "INDI_DISABLED";

    // Camera properties
    pub const CCD_COOLER: &str = "CCD_COOLER";
    pub const COOLER_ON: &str = "COOLER_ON";
    pub const COOLER_OFF: &str = "COOLER_OFF";
    pub const CCD_CAPTURE_FORMAT: &str = "CCD_CAPTURE_FORMAT";
    pub const CCD_FRAME_TYPE: &str = "CCD_FRAME_TYPE";
    pub const CCD_ABORT_EXPOSURE: &str = "CCD_ABORT_EXPOSURE";
    pub const CCD_INFO: &str = "CCD_INFO";
    pub const CCD_PIXEL_SIZE_X: &str = "CCD_PIXEL_SIZE_X";
    pub const CCD_PIXEL_SIZE_Y: &str = "CCD_PIXEL_SIZE_Y";
    pub const CCD_EXPOSURE: &str = "CCD_EXPOSURE";
    pub const CCD_EXPOSURE_VALUE: &str = "CCD_EXPOSURE_VALUE";
    pub const CCD_COOLER_POWER: &str = "CCD_COOLER_POWER";
    pub const CCD_TEMPERATURE: &str = "CCD_TEMPERATURE";
    pub const CCD_TEMPERATURE_VALUE: &str = "CCD_TEMPERATURE_VALUE";
    pub const CCD_FRAME: &str = "CCD_FRAME";
    pub const X: &str = "X";
    pub const Y: &str = "Y";
    pub const WIDTH: &str = "WIDTH";
    pub const HEIGHT: &str = "HEIGHT";
    pub const CCD_BINNING: &str = "CCD_BINNING";
    pub const HOR_BIN: &str = "HOR_BIN";
    pub const VER_BIN: &str = "VER_BIN";
    pub const CCD_CONTROLS: &str = "CCD_CONTROLS";
    pub const CONTROLS_GAIN: &str = "Gain";
    pub const CONTROLS_OFFSET: &str = "Offset";
    pub const CCD_GAIN: &str = "CCD_GAIN";
    pub const GAIN: &str = "GAIN";
    pub const CCD_OFFSET: &str = "CCD_OFFSET";
    pub const OFFSET: &str = "OFFSET";
    pub const CCD_CFA: &str = "CCD_CFA";
    pub const CFA_OFFSET_X: &str = "CFA_OFFSET_X";
    pub const CFA_OFFSET_Y: &str = "CFA_OFFSET_Y";
    pub const CFA_TYPE: &str = "CFA_TYPE";
    pub const CCD1: &str = "CCD1"; // BLOB property for image data
    pub const CCD_TRANSFER_FORMAT: &str = "CCD_TRANSFER_FORMAT";
    pub const CCD_COMPRESSION: &str = "CCD_COMPRESSION";
    pub const ACTIVE_DEVICES: &str = "ACTIVE_DEVICES";
    pub const ACTIVE_TELESCOPE: &str = "ACTIVE_TELESCOPE";
    pub const ACTIVE_ROTATOR: &str = "ACTIVE_ROTATOR";
    pub const ACTIVE_FOCUSER: &str = "ACTIVE_FOCUSER";
    pub const ACTIVE_FILTER: &str = "ACTIVE_FILTER";

    // Guiding
    pub const TELESCOPE_TIMED_GUIDE_NS: &str = "TELESCOPE_TIMED_GUIDE_NS";
    pub const TELESCOPE_TIMED_GUIDE_WE: &str = "TELESCOPE_TIMED_GUIDE_WE";
    pub const TIMED_GUIDE_N: &str = "TIMED_GUIDE_N";
    pub const TIMED_GUIDE_S: &str = "TIMED_GUIDE_S";
    pub const TIMED_GUIDE_W: &str = "TIMED_GUIDE_W";
    pub const TIMED_GUIDE_E: &str = "TIMED_GUIDE_E";

    // Mount properties
    pub const TELESCOPE_ABORT_MOTION: &str = "TELESCOPE_ABORT_MOTION";
    pub const ON_COORD_SET: &str = "ON_COORD_SET";
    pub const SLEW: &str = "SLEW";
    pub const TRACK: &str = "TRACK";
    pub const SYNC: &str = "SYNC";
    pub const FLIP: &str = "FLIP";
    pub const TELESCOPE_HOME: &str = "TELESCOPE_HOME";
    pub const HOME_GO: &str = "GO";
    pub const TELESCOPE_PARK: &str = "TELESCOPE_PARK";
    pub const TELESCOPE_SLEW_RATE: &str = "TELESCOPE_SLEW_RATE";
    pub const TELESCOPE_TRACK_MODE: &str = "TELESCOPE_TRACK_MODE";
    pub const TELESCOPE_TRACK_STATE: &str = "TELESCOPE_TRACK_STATE";
    pub const TRACK_ON: &str = "TRACK_ON";
    pub const TRACK_OFF: &str = "TRACK_OFF";
    pub const TELESCOPE_PIER_SIDE: &str = "TELESCOPE_PIER_SIDE";
    pub const PIER_EAST: &str = "PIER_EAST";
    pub const PIER_WEST: &str = "PIER_WEST";
    pub const EQUATORIAL_EOD_COORD: &str = "EQUATORIAL_EOD_COORD";
    pub const RA: &str = "RA";
    pub const DEC: &str = "DEC";
    pub const GUIDE_RATE: &str = "GUIDE_RATE";
    pub const GUIDE_RATE_WE: &str = "GUIDE_RATE_WE";
    pub const GUIDE_RATE_NS: &str = "GUIDE_RATE_NS";
    pub const GEOGRAPHIC_COORD: &str = "GEOGRAPHIC_COORD";
    pub const LAT: &str = "LAT";
    pub const LONG: &str = "LONG";
    pub const ELEV: &str = "ELEV";
    pub const TIME_UTC: &str = "TIME_UTC";
    pub const UTC: &str = "UTC";
    pub const UTC_OFFSET: &str = "OFFSET";
    pub const TELESCOPE_MOTION_NS: &str = "TELESCOPE_MOTION_NS";
    pub const TELESCOPE_MOTION_WE: &str = "TELESCOPE_MOTION_WE";
    pub const MOTION_NORTH: &str = "MOTION_NORTH";
    pub const MOTION_SOUTH: &str = "MOTION_SOUTH";
    pub const MOTION_WEST: &str = "MOTION_WEST";
    pub const MOTION_EAST: &str = "MOTION_EAST";

    // Focuser properties
    pub const ABS_FOCUS_POSITION: &str = "ABS_FOCUS_POSITION";
    pub const FOCUS_ABSOLUTE_POSITION: &str = "FOCUS_ABSOLUTE_POSITION";
    pub const REL_FOCUS_POSITION: &str = "REL_FOCUS_POSITION";
    pub const FOCUS_RELATIVE_POSITION: &str = "FOCUS_RELATIVE_POSITION";
    pub const FOCUS_MOTION: &str = "FOCUS_MOTION";
    pub const FOCUS_INWARD: &str = "FOCUS_INWARD";
    pub const FOCUS_OUTWARD: &str = "FOCUS_OUTWARD";
    pub const FOCUS_ABORT_MOTION: &str = "FOCUS_ABORT_MOTION";
    pub const FOCUS_REVERSE_MOTION: &str = "FOCUS_REVERSE_MOTION";
    pub const FOCUS_SYNC: &str = "FOCUS_SYNC";
    pub const FOCUS_SYNC_VALUE: &str = "FOCUS_SYNC_VALUE";
    pub const FOCUS_BACKLASH_STEPS: &str = "FOCUS_BACKLASH_STEPS";
    pub const FOCUS_TEMPERATURE: &str = "FOCUS_TEMPERATURE";
    pub const TEMPERATURE: &str = "TEMPERATURE";

    // Filter wheel properties
    pub const FILTER_SLOT: &str = "FILTER_SLOT";
    pub const FILTER_SLOT_VALUE: &str = "FILTER_SLOT_VALUE";
    pub const FILTER_NAME: &str = "FILTER_NAME";

    // Dust cap and light box properties
    pub const CAP_PARK: &str = "CAP_PARK";
    pub const FLAT_LIGHT_CONTROL: &str = "FLAT_LIGHT_CONTROL";
    pub const FLAT_LIGHT_ON: &str = "FLAT_LIGHT_ON";
    pub const FLAT_LIGHT_OFF: &str = "FLAT_LIGHT_OFF";
    pub const FLAT_LIGHT_INTENSITY: &str = "FLAT_LIGHT_INTENSITY";
    pub const FLAT_LIGHT_INTENSITY_VALUE: &str = "FLAT_LIGHT_INTENSITY_VALUE";
}
