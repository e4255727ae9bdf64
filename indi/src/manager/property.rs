//! Untyped property store
//!
//! [`DevicePropertyManager`] keeps every vector of every device as it was
//! defined, merging later updates into the stored copy. It backs generic
//! property views and lets typed managers check which properties a driver
//! actually defines.

use indexmap::IndexMap;
use tokio::sync::mpsc;

use crate::client::{HandlerSlots, IndiClientHandler, IndiSender};
use crate::protocol::{
    AnyVector, BlobElement, DelProperty, LightElement, NumberElement, SwitchElement, TextElement, Vector,
};

/// Observer of a [`DevicePropertyManager`]
#[allow(unused_variables)]
pub trait DevicePropertyHandler {
    fn added(&mut self, device: &str, property: &AnyVector) {}

    fn updated(&mut self, device: &str, property: &AnyVector) {}

    fn removed(&mut self, device: &str, property: &AnyVector) {}
}

/// Property notification forwarded over a channel
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyEvent {
    Added(AnyVector),
    Updated(AnyVector),
    Removed(AnyVector),
}

impl DevicePropertyHandler for mpsc::UnboundedSender<PropertyEvent> {
    fn added(&mut self, _: &str, property: &AnyVector) {
        let _ = self.send(PropertyEvent::Added(property.clone()));
    }

    fn updated(&mut self, _: &str, property: &AnyVector) {
        let _ = self.send(PropertyEvent::Updated(property.clone()));
    }

    fn removed(&mut self, _: &str, property: &AnyVector) {
        let _ = self.send(PropertyEvent::Removed(property.clone()));
    }
}

/// Element whose value can be refreshed from an update
trait MergeValue {
    fn merge(&mut self, update: &Self) -> bool;
}

impl MergeValue for TextElement {
    fn merge(&mut self, update: &Self) -> bool {
        replace(&mut self.value, &update.value)
    }
}

impl MergeValue for NumberElement {
    fn merge(&mut self, update: &Self) -> bool {
        replace(&mut self.value, &update.value)
    }
}

impl MergeValue for SwitchElement {
    fn merge(&mut self, update: &Self) -> bool {
        replace(&mut self.value, &update.value)
    }
}

impl MergeValue for LightElement {
    fn merge(&mut self, update: &Self) -> bool {
        replace(&mut self.value, &update.value)
    }
}

impl MergeValue for BlobElement {
    fn merge(&mut self, update: &Self) -> bool {
        let size = replace(&mut self.size, &update.size);
        let format = replace(&mut self.format, &update.format);
        let value = replace(&mut self.value, &update.value);
        size || format || value
    }
}

fn replace<T: PartialEq + Clone>(slot: &mut T, value: &T) -> bool {
    if slot == value {
        return false;
    }

    *slot = value.clone();
    true
}

/// Merge state, message and element values of an update into a stored vector
fn merge<E: MergeValue>(stored: &mut Vector<E>, update: &Vector<E>) -> bool {
    let mut changed = false;

    if let Some(state) = update.state {
        changed |= replace(&mut stored.state, &Some(state));
    }

    if update.message.is_some() {
        changed |= replace(&mut stored.message, &update.message);
    }

    if update.timestamp.is_some() {
        stored.timestamp = update.timestamp.clone();
    }

    for (name, element) in &update.elements {
        match stored.elements.get_mut(name) {
            Some(current) => changed |= current.merge(element),
            None => tracing::debug!("{}.{}: update for undefined element {}", stored.device, stored.name, name),
        }
    }

    changed
}

fn merge_any(stored: &mut AnyVector, update: &AnyVector) -> bool {
    match (stored, update) {
        (AnyVector::Text(stored), AnyVector::Text(update)) => merge(stored, update),
        (AnyVector::Number(stored), AnyVector::Number(update)) => merge(stored, update),
        (AnyVector::Switch(stored), AnyVector::Switch(update)) => merge(stored, update),
        (AnyVector::Light(stored), AnyVector::Light(update)) => merge(stored, update),
        (AnyVector::Blob(stored), AnyVector::Blob(update)) => merge(stored, update),
        (stored, update) => {
            tracing::debug!(
                "{}.{}: {} does not match the defined {:?} vector",
                stored.device(),
                stored.name(),
                update.tag(),
                stored.kind()
            );
            false
        }
    }
}

/// Every property of every device, in definition order
#[derive(Default)]
pub struct DevicePropertyManager {
    devices: IndexMap<String, IndexMap<String, AnyVector>>,
    handlers: Vec<Box<dyn DevicePropertyHandler + Send>>,
}

impl DevicePropertyManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_handler(&mut self, handler: impl DevicePropertyHandler + Send + 'static) {
        self.handlers.push(Box::new(handler));
    }

    /// Number of devices with at least one property
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.devices.keys().map(String::as_str)
    }

    pub fn has(&self, device: &str) -> bool {
        self.devices.contains_key(device)
    }

    /// Properties of a device, keyed by name
    pub fn get(&self, device: &str) -> Option<&IndexMap<String, AnyVector>> {
        self.devices.get(device)
    }

    pub fn property(&self, device: &str, name: &str) -> Option<&AnyVector> {
        self.devices.get(device)?.get(name)
    }

    pub fn has_element(&self, device: &str, property: &str, element: &str) -> bool {
        self.property(device, property).is_some_and(|p| p.has_element(element))
    }

    fn define(&mut self, vector: &AnyVector) {
        let properties = self.devices.entry(vector.device().to_string()).or_default();
        let added = !properties.contains_key(vector.name());
        properties.insert(vector.name().to_string(), vector.clone());

        let Some(stored) = properties.get(vector.name()) else {
            return;
        };

        for handler in &mut self.handlers {
            if added {
                handler.added(vector.device(), stored);
            } else {
                handler.updated(vector.device(), stored);
            }
        }
    }

    fn update(&mut self, vector: &AnyVector) {
        let Some(stored) = self.devices.get_mut(vector.device()).and_then(|p| p.get_mut(vector.name())) else {
            tracing::debug!("{}.{} updated before being defined", vector.device(), vector.name());
            return;
        };

        if merge_any(stored, vector) {
            for handler in &mut self.handlers {
                handler.updated(vector.device(), stored);
            }
        }
    }

    fn delete(&mut self, device: &str, name: Option<&str>) {
        let Some(properties) = self.devices.get_mut(device) else {
            return;
        };

        let removed: Vec<AnyVector> = match name {
            Some(name) => properties.shift_remove(name).into_iter().collect(),
            None => properties.drain(..).map(|(_, vector)| vector).collect(),
        };

        if properties.is_empty() {
            self.devices.shift_remove(device);
        }

        for vector in &removed {
            for handler in &mut self.handlers {
                handler.removed(device, vector);
            }
        }
    }
}

impl IndiClientHandler for DevicePropertyManager {
    fn slots(&self) -> HandlerSlots {
        HandlerSlots::VECTOR | HandlerSlots::DEL_PROPERTY | HandlerSlots::CLOSE
    }

    fn vector(&mut self, _client: &IndiSender, vector: &AnyVector) {
        if vector.is_def() {
            self.define(vector);
        } else {
            self.update(vector);
        }
    }

    fn del_property(&mut self, _client: &IndiSender, message: &DelProperty) {
        self.delete(&message.device, message.name.as_deref());
    }

    fn close(&mut self, _client: &IndiSender, _server: bool) {
        let devices: Vec<String> = self.devices.keys().cloned().collect();

        for device in devices {
            self.delete(&device, None);
        }
    }
}
