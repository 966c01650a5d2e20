use std::ops::ControlFlow;

use crate::control::{CompoundControl, PartMask};
use crate::events::PlatformEvent;
use crate::listeners::{ListenerId, ListenerTable};
use crate::registry::{Device, Registry};
use crate::touch::{RegionMask, TouchPhase, TouchRegion, TouchTracker};
use crate::types::{
    is_synthetic, ButtonId, CanonicalEvent, DeviceDescriptor, DeviceId, DeviceInfo, Part,
    RawControl, KEYBOARD_DEVICE_ID, TOUCH_DEVICE_ID,
};
use crate::Result;

/// Converts heterogeneous raw device input into canonical two-state events.
///
/// Every entry point has a `_with` variant taking a sink that observes the
/// produced events right after the subscribed listeners.
#[derive(Debug, Default)]
pub struct Canonicalizer {
    registry: Registry,
    touches: TouchTracker,
    keyboard_enabled: bool,
    touch_enabled: bool,
    listeners: ListenerTable<CanonicalEvent>,
}

struct Emitter<'a, F> {
    listeners: &'a mut ListenerTable<CanonicalEvent>,
    sink: F,
}

impl<F: FnMut(&CanonicalEvent)> Emitter<'_, F> {
    fn emit(&mut self, event: CanonicalEvent) {
        log::trace!(
            "canonical {} {:#x} {} {}",
            event.device,
            event.button,
            event.part.as_char(),
            u8::from(event.value)
        );
        self.listeners.dispatch(&event);
        (self.sink)(&event);
    }
}

impl Canonicalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to the canonical event stream.
    pub fn subscribe<F>(&mut self, callback: F) -> Result<ListenerId>
    where
        F: FnMut(&CanonicalEvent) -> ControlFlow<()> + 'static,
    {
        self.listeners.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    pub fn device(&self, id: DeviceId) -> Option<&Device> {
        self.registry.get(id)
    }

    /// Connected devices ordered by id.
    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        self.registry.iter()
    }

    /// Hats and axes of a connected device, ordered by button id.
    pub fn compound_controls(&self, id: DeviceId) -> Vec<CompoundControl> {
        self.registry
            .get(id)
            .map(|d| d.compound_controls().copied().collect())
            .unwrap_or_default()
    }

    pub fn keyboard_enabled(&self) -> bool {
        self.keyboard_enabled
    }

    pub fn touch_enabled(&self) -> bool {
        self.touch_enabled
    }

    pub fn set_multi_touch(&mut self, enabled: bool) {
        self.touches.set_multi_touch(enabled);
    }

    pub fn multi_touch(&self) -> bool {
        self.touches.multi_touch()
    }

    pub fn process(&mut self, event: &PlatformEvent) {
        self.process_with(event, |_| {});
    }

    pub fn process_with<F: FnMut(&CanonicalEvent)>(&mut self, event: &PlatformEvent, sink: F) {
        let Self {
            registry,
            touches,
            keyboard_enabled,
            touch_enabled,
            listeners,
        } = self;
        let mut out = Emitter { listeners, sink };
        match event {
            // Pseudo-devices are only driven through the key and touch paths.
            PlatformEvent::Connected(descriptor) if is_synthetic(descriptor.info.id) => {}
            PlatformEvent::Disconnected(id) if is_synthetic(*id) => {}
            PlatformEvent::ValueChanged { device, .. } if is_synthetic(*device) => {}
            PlatformEvent::Connected(descriptor) => {
                connect(registry, descriptor, &mut out);
            }
            PlatformEvent::Disconnected(id) => {
                disconnect(registry, *id, &mut out);
            }
            PlatformEvent::ValueChanged {
                device,
                button,
                value,
            } => {
                value_changed(registry, *device, *button, *value, &mut out);
            }
            PlatformEvent::Key { keycode, pressed } => {
                if *keyboard_enabled {
                    let value = i32::from(*pressed);
                    value_changed(registry, KEYBOARD_DEVICE_ID, *keycode, value, &mut out);
                }
            }
            PlatformEvent::Touch {
                touch_id,
                phase,
                x,
                y,
            } => {
                if *touch_enabled {
                    touch(registry, touches, *touch_id, *phase, *x, *y, &mut out);
                }
            }
        }
    }

    pub fn set_keyboard_enabled(&mut self, enabled: bool) {
        self.set_keyboard_enabled_with(enabled, |_| {});
    }

    /// Connect or disconnect the keyboard pseudo-device.
    pub fn set_keyboard_enabled_with<F: FnMut(&CanonicalEvent)>(&mut self, enabled: bool, sink: F) {
        if self.keyboard_enabled == enabled {
            return;
        }
        self.keyboard_enabled = enabled;
        let mut out = Emitter {
            listeners: &mut self.listeners,
            sink,
        };
        if enabled {
            connect(&mut self.registry, &keyboard_descriptor(), &mut out);
        } else {
            disconnect(&mut self.registry, KEYBOARD_DEVICE_ID, &mut out);
        }
    }

    pub fn set_touch_enabled(&mut self, enabled: bool) {
        self.set_touch_enabled_with(enabled, |_| {});
    }

    /// Connect or disconnect the touch pseudo-device.
    pub fn set_touch_enabled_with<F: FnMut(&CanonicalEvent)>(&mut self, enabled: bool, sink: F) {
        if self.touch_enabled == enabled {
            return;
        }
        self.touch_enabled = enabled;
        self.touches.clear();
        let mut out = Emitter {
            listeners: &mut self.listeners,
            sink,
        };
        if enabled {
            connect(&mut self.registry, &touch_descriptor(), &mut out);
        } else {
            disconnect(&mut self.registry, TOUCH_DEVICE_ID, &mut out);
        }
    }
}

/// Descriptor of the keyboard pseudo-device. Keys are plain buttons keyed
/// by USB HID usage and are not enumerated up front.
pub fn keyboard_descriptor() -> DeviceDescriptor {
    DeviceDescriptor {
        info: DeviceInfo {
            id: KEYBOARD_DEVICE_ID,
            name: "keyboard".to_string(),
            ..Default::default()
        },
        controls: Vec::new(),
    }
}

/// Descriptor of the touch pseudo-device, a standard-mapping device whose
/// buttons are the roles of the touch regions.
pub fn touch_descriptor() -> DeviceDescriptor {
    let regions = RegionMask::from_value(u64::MAX);
    DeviceDescriptor {
        info: DeviceInfo {
            id: TOUCH_DEVICE_ID,
            name: "touch".to_string(),
            standard_mapping: true,
            ..Default::default()
        },
        controls: regions
            .iter()
            .map(|region: TouchRegion| RawControl::button(region.button_id()))
            .collect(),
    }
}

fn connect<F: FnMut(&CanonicalEvent)>(
    registry: &mut Registry,
    descriptor: &DeviceDescriptor,
    out: &mut Emitter<'_, F>,
) {
    let id = descriptor.info.id;
    if registry.contains(id) {
        log::debug!("device {id} reconnected without disconnect");
        disconnect(registry, id, out);
    }
    let device = Device::new(descriptor.info.clone(), &descriptor.controls);
    log::debug!(
        "connect device {id} \"{}\" vid={:#x} pid={:#x} compound={}",
        descriptor.info.name,
        descriptor.info.vendor_id,
        descriptor.info.product_id,
        device.compound_controls().count()
    );
    registry.insert(device);
    out.emit(CanonicalEvent::connect(id, true));
}

fn disconnect<F: FnMut(&CanonicalEvent)>(
    registry: &mut Registry,
    id: DeviceId,
    out: &mut Emitter<'_, F>,
) {
    let Some(device) = registry.get_mut(id) else {
        log::trace!("disconnect of unknown device {id} dropped");
        return;
    };
    for control in device.compounds_mut() {
        let held = control.state;
        control.state = PartMask::empty();
        for part in held {
            out.emit(CanonicalEvent::new(id, control.button_id, part, false));
        }
    }
    for button in device.take_held() {
        out.emit(CanonicalEvent::new(id, button, Part::Button, false));
    }
    out.emit(CanonicalEvent::connect(id, false));
    registry.remove(id);
    log::debug!("disconnect device {id}");
}

fn value_changed<F: FnMut(&CanonicalEvent)>(
    registry: &mut Registry,
    id: DeviceId,
    button: ButtonId,
    value: i32,
    out: &mut Emitter<'_, F>,
) {
    let Some(device) = registry.get_mut(id) else {
        log::trace!("value for unknown device {id} dropped");
        return;
    };
    if let Some(control) = device.compound_mut(button) {
        let changed = control.update(value);
        let state = control.state;
        emit_changes(id, button, changed, state, out);
        return;
    }
    if value != 0 {
        if device.press(button) {
            out.emit(CanonicalEvent::new(id, button, Part::Button, true));
        }
    } else if device.release(button) {
        out.emit(CanonicalEvent::new(id, button, Part::Button, false));
    }
}

/// Emit releases before presses so a jump across an axis never reports
/// both zones at once.
fn emit_changes<F: FnMut(&CanonicalEvent)>(
    id: DeviceId,
    button: ButtonId,
    changed: PartMask,
    state: PartMask,
    out: &mut Emitter<'_, F>,
) {
    for part in changed.iter().filter(|p| !state.contains(*p)) {
        out.emit(CanonicalEvent::new(id, button, part, false));
    }
    for part in changed.iter().filter(|p| state.contains(*p)) {
        out.emit(CanonicalEvent::new(id, button, part, true));
    }
}

fn touch<F: FnMut(&CanonicalEvent)>(
    registry: &mut Registry,
    touches: &mut TouchTracker,
    touch_id: i64,
    phase: TouchPhase,
    x: f32,
    y: f32,
    out: &mut Emitter<'_, F>,
) {
    let Some(device) = registry.get_mut(TOUCH_DEVICE_ID) else {
        return;
    };
    let Some((previous, current)) = touches.update(touch_id, phase, x, y) else {
        return;
    };
    let changed = previous.symmetric_difference(&current);
    for region in changed.iter().filter(|r| previous.contains(*r)) {
        let button = region.button_id();
        if device.release(button) {
            out.emit(CanonicalEvent::new(TOUCH_DEVICE_ID, button, Part::Button, false));
        }
    }
    for region in changed.iter().filter(|r| current.contains(*r)) {
        let button = region.button_id();
        if device.press(button) {
            out.emit(CanonicalEvent::new(TOUCH_DEVICE_ID, button, Part::Button, true));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::types::StandardRole;

    fn gamepad(id: DeviceId) -> DeviceDescriptor {
        DeviceDescriptor {
            info: DeviceInfo {
                id,
                vendor_id: 0x45e,
                product_id: 0x28e,
                name: "pad".to_string(),
                ..Default::default()
            },
            controls: vec![
                RawControl::button(1),
                RawControl::button(2),
                RawControl {
                    button_id: 0x10,
                    usage: 0x30,
                    low: -128,
                    high: 127,
                    resting: 0,
                },
                RawControl {
                    button_id: 0x20,
                    usage: 0x39,
                    low: 0,
                    high: 7,
                    resting: 0,
                },
            ],
        }
    }

    fn collect(c: &mut Canonicalizer, event: PlatformEvent) -> Vec<(DeviceId, ButtonId, char, bool)> {
        let mut seen = Vec::new();
        c.process_with(&event, |e| {
            seen.push((e.device, e.button, e.part.as_char(), e.value));
        });
        seen
    }

    fn value(device: DeviceId, button: ButtonId, value: i32) -> PlatformEvent {
        PlatformEvent::ValueChanged {
            device,
            button,
            value,
        }
    }

    #[test]
    fn connect_emits_device_ready() {
        let mut c = Canonicalizer::new();
        let seen = collect(&mut c, PlatformEvent::Connected(gamepad(5)));
        assert_eq!(seen, vec![(5, 0, 'c', true)]);
        assert_eq!(c.compound_controls(5).len(), 2);
    }

    #[test]
    fn plain_buttons_pass_through_once() {
        let mut c = Canonicalizer::new();
        c.process(&PlatformEvent::Connected(gamepad(5)));
        assert_eq!(collect(&mut c, value(5, 1, 1)), vec![(5, 1, 'b', true)]);
        assert!(collect(&mut c, value(5, 1, 1)).is_empty());
        assert_eq!(collect(&mut c, value(5, 1, 0)), vec![(5, 1, 'b', false)]);
        assert!(collect(&mut c, value(5, 1, 0)).is_empty());
    }

    #[test]
    fn axis_jump_releases_before_pressing() {
        let mut c = Canonicalizer::new();
        c.process(&PlatformEvent::Connected(gamepad(5)));
        assert_eq!(collect(&mut c, value(5, 0x10, -128)), vec![(5, 0x10, 'l', true)]);
        assert!(collect(&mut c, value(5, 0x10, -100)).is_empty());
        assert_eq!(
            collect(&mut c, value(5, 0x10, 127)),
            vec![(5, 0x10, 'l', false), (5, 0x10, 'h', true)]
        );
        assert_eq!(collect(&mut c, value(5, 0x10, 0)), vec![(5, 0x10, 'h', false)]);
    }

    #[test]
    fn hat_diagonal_reports_both_parts() {
        let mut c = Canonicalizer::new();
        c.process(&PlatformEvent::Connected(gamepad(5)));
        assert_eq!(
            collect(&mut c, value(5, 0x20, 1)),
            vec![(5, 0x20, 'e', true), (5, 0x20, 'n', true)]
        );
        assert_eq!(collect(&mut c, value(5, 0x20, 2)), vec![(5, 0x20, 'n', false)]);
    }

    #[test]
    fn events_for_unknown_devices_are_dropped() {
        let mut c = Canonicalizer::new();
        assert!(collect(&mut c, value(9, 1, 1)).is_empty());
        assert!(collect(&mut c, PlatformEvent::Disconnected(9)).is_empty());
        assert!(collect(&mut c, value(KEYBOARD_DEVICE_ID, 4, 1)).is_empty());
    }

    #[test]
    fn disconnect_releases_everything_before_removal() {
        let mut c = Canonicalizer::new();
        c.process(&PlatformEvent::Connected(gamepad(5)));
        c.process(&value(5, 2, 1));
        c.process(&value(5, 0x10, 127));
        c.process(&value(5, 0x20, 5));
        let seen = collect(&mut c, PlatformEvent::Disconnected(5));
        assert_eq!(
            seen,
            vec![
                (5, 0x10, 'h', false),
                (5, 0x20, 'w', false),
                (5, 0x20, 's', false),
                (5, 2, 'b', false),
                (5, 0, 'c', false),
            ]
        );
        assert!(c.device(5).is_none());
    }

    #[test]
    fn reconnect_replaces_previous_record() {
        let mut c = Canonicalizer::new();
        c.process(&PlatformEvent::Connected(gamepad(5)));
        c.process(&value(5, 1, 1));
        let seen = collect(&mut c, PlatformEvent::Connected(gamepad(5)));
        assert_eq!(
            seen,
            vec![(5, 1, 'b', false), (5, 0, 'c', false), (5, 0, 'c', true)]
        );
    }

    #[test]
    fn keyboard_requires_enabling() {
        let mut c = Canonicalizer::new();
        let key = |pressed| PlatformEvent::Key {
            keycode: 0x04,
            pressed,
        };
        assert!(collect(&mut c, key(true)).is_empty());

        let mut seen = Vec::new();
        c.set_keyboard_enabled_with(true, |e| seen.push(*e));
        assert_eq!(seen, vec![CanonicalEvent::connect(KEYBOARD_DEVICE_ID, true)]);

        assert_eq!(collect(&mut c, key(true)), vec![(-1, 0x04, 'b', true)]);
        assert!(collect(&mut c, key(true)).is_empty());

        let mut seen = Vec::new();
        c.set_keyboard_enabled_with(false, |e| seen.push(*e));
        assert_eq!(
            seen,
            vec![
                CanonicalEvent::new(KEYBOARD_DEVICE_ID, 0x04, Part::Button, false),
                CanonicalEvent::connect(KEYBOARD_DEVICE_ID, false),
            ]
        );
    }

    #[test]
    fn touch_emits_region_edges() {
        let mut c = Canonicalizer::new();
        c.set_touch_enabled(true);
        let touch = |phase, x, y| PlatformEvent::Touch {
            touch_id: 1,
            phase,
            x,
            y,
        };
        let left = StandardRole::Left.button_id();
        let up = StandardRole::Up.button_id();
        let south = StandardRole::South.button_id();

        assert_eq!(
            collect(&mut c, touch(TouchPhase::Begin, 0.05, 0.5)),
            vec![(TOUCH_DEVICE_ID, left, 'b', true)]
        );
        assert_eq!(
            collect(&mut c, touch(TouchPhase::Move, 0.05, 0.05)),
            vec![(TOUCH_DEVICE_ID, up, 'b', true)]
        );
        assert_eq!(
            collect(&mut c, touch(TouchPhase::Move, 0.5, 0.5)),
            vec![
                (TOUCH_DEVICE_ID, left, 'b', false),
                (TOUCH_DEVICE_ID, up, 'b', false),
                (TOUCH_DEVICE_ID, south, 'b', true),
            ]
        );
        assert_eq!(
            collect(&mut c, touch(TouchPhase::End, 0.5, 0.5)),
            vec![(TOUCH_DEVICE_ID, south, 'b', false)]
        );
    }

    #[test]
    fn overlapping_touches_do_not_double_fire() {
        let mut c = Canonicalizer::new();
        c.set_touch_enabled(true);
        c.set_multi_touch(true);
        let touch = |touch_id, phase| PlatformEvent::Touch {
            touch_id,
            phase,
            x: 0.9,
            y: 0.5,
        };
        assert_eq!(collect(&mut c, touch(1, TouchPhase::Begin)).len(), 1);
        assert!(collect(&mut c, touch(2, TouchPhase::Begin)).is_empty());
        assert_eq!(collect(&mut c, touch(2, TouchPhase::End)).len(), 1);
        assert!(collect(&mut c, touch(1, TouchPhase::End)).is_empty());
    }

    #[test]
    fn listeners_see_events_before_sink() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut c = Canonicalizer::new();
        let from_listener = order.clone();
        c.subscribe(move |e| {
            from_listener.borrow_mut().push(("listener", e.value));
            ControlFlow::Continue(())
        })
        .expect("capacity");
        let from_sink = order.clone();
        c.process_with(&PlatformEvent::Connected(gamepad(1)), move |e| {
            from_sink.borrow_mut().push(("sink", e.value));
        });
        assert_eq!(*order.borrow(), vec![("listener", true), ("sink", true)]);
    }
}
