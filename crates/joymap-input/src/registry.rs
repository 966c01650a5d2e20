use std::collections::BTreeMap;

use smallvec::SmallVec;

use crate::control::CompoundControl;
use crate::types::{ButtonId, DeviceId, DeviceInfo, RawControl};

/// A connected device as tracked by the canonicalizer.
#[derive(Debug, Clone)]
pub struct Device {
    pub info: DeviceInfo,
    compounds: BTreeMap<ButtonId, CompoundControl>,
    held: SmallVec<[ButtonId; 8]>,
}

impl Device {
    /// Build a device record, classifying every raw control.
    pub fn new(info: DeviceInfo, controls: &[RawControl]) -> Self {
        let mut compounds = BTreeMap::new();
        for raw in controls {
            if let Some(control) = CompoundControl::classify(raw) {
                log::trace!(
                    "device {} control {:#x} usage={:#x} classified as {:?}",
                    info.id,
                    raw.button_id,
                    raw.usage,
                    control.mode
                );
                compounds.insert(raw.button_id, control);
            }
        }
        Self {
            info,
            compounds,
            held: SmallVec::new(),
        }
    }

    pub fn id(&self) -> DeviceId {
        self.info.id
    }

    /// Hats and axes ordered by button id.
    pub fn compound_controls(&self) -> impl Iterator<Item = &CompoundControl> {
        self.compounds.values()
    }

    pub(crate) fn compound_mut(&mut self, id: ButtonId) -> Option<&mut CompoundControl> {
        self.compounds.get_mut(&id)
    }

    /// Plain buttons currently held.
    pub fn held_buttons(&self) -> &[ButtonId] {
        &self.held
    }

    pub fn is_held(&self, id: ButtonId) -> bool {
        self.held.contains(&id)
    }

    /// Mark a plain button held. Returns false if it already was.
    pub(crate) fn press(&mut self, id: ButtonId) -> bool {
        if self.is_held(id) {
            return false;
        }
        self.held.push(id);
        true
    }

    /// Mark a plain button released. Returns false if it was not held.
    pub(crate) fn release(&mut self, id: ButtonId) -> bool {
        match self.held.iter().position(|held| *held == id) {
            Some(pos) => {
                self.held.swap_remove(pos);
                true
            }
            None => false,
        }
    }

    /// Drain every held plain button.
    pub(crate) fn take_held(&mut self) -> SmallVec<[ButtonId; 8]> {
        std::mem::take(&mut self.held)
    }

    pub(crate) fn compounds_mut(&mut self) -> impl Iterator<Item = &mut CompoundControl> {
        self.compounds.values_mut()
    }
}

/// Id-sorted collection of connected devices.
#[derive(Debug, Default)]
pub struct Registry {
    devices: BTreeMap<DeviceId, Device>,
}

impl Registry {
    pub fn get(&self, id: DeviceId) -> Option<&Device> {
        self.devices.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: DeviceId) -> Option<&mut Device> {
        self.devices.get_mut(&id)
    }

    pub fn contains(&self, id: DeviceId) -> bool {
        self.devices.contains_key(&id)
    }

    pub(crate) fn insert(&mut self, device: Device) {
        self.devices.insert(device.id(), device);
    }

    pub(crate) fn remove(&mut self, id: DeviceId) -> Option<Device> {
        self.devices.remove(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Device> {
        self.devices.values()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(controls: &[RawControl]) -> Device {
        let info = DeviceInfo {
            id: 3,
            ..Default::default()
        };
        Device::new(info, controls)
    }

    #[test]
    fn only_compound_controls_are_registered() {
        let controls = [
            RawControl::button(1),
            RawControl {
                button_id: 9,
                usage: 0x39,
                low: 0,
                high: 7,
                resting: 8,
            },
            RawControl {
                button_id: 4,
                usage: 0x30,
                low: -32768,
                high: 32767,
                resting: 0,
            },
        ];
        let device = device(&controls);
        let ids: Vec<_> = device.compound_controls().map(|c| c.button_id).collect();
        assert_eq!(ids, vec![4, 9]);
    }

    #[test]
    fn held_set_ignores_repeats() {
        let mut device = device(&[]);
        assert!(device.press(5));
        assert!(!device.press(5));
        assert!(device.press(6));
        assert!(device.release(5));
        assert!(!device.release(5));
        assert_eq!(device.held_buttons(), &[6]);
    }

    #[test]
    fn registry_iterates_by_id() {
        let mut registry = Registry::default();
        for id in [7, -1, 2] {
            registry.insert(Device::new(
                DeviceInfo {
                    id,
                    ..Default::default()
                },
                &[],
            ));
        }
        let ids: Vec<_> = registry.iter().map(Device::id).collect();
        assert_eq!(ids, vec![-1, 2, 7]);
        assert!(registry.remove(2).is_some());
        assert!(registry.remove(2).is_none());
        assert_eq!(registry.len(), 2);
    }
}
