use std::collections::VecDeque;

use crossbeam_channel::Receiver;

use crate::touch::TouchPhase;
use crate::types::{ButtonId, DeviceDescriptor, DeviceId};

/// Raw events delivered by the host platform.
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformEvent {
    /// A device has been connected and enumerated.
    Connected(DeviceDescriptor),
    /// A previously connected device has been disconnected.
    Disconnected(DeviceId),
    /// A hat, axis or plain button reported a new raw value.
    ValueChanged {
        device: DeviceId,
        button: ButtonId,
        value: i32,
    },
    /// A keyboard key, identified by its USB HID usage.
    Key { keycode: u32, pressed: bool },
    /// A touch with normalized screen coordinates.
    Touch {
        touch_id: i64,
        phase: TouchPhase,
        x: f32,
        y: f32,
    },
}

/// Pull-style source of platform events.
pub trait EventQueue {
    /// Returns the next pending event without blocking.
    fn poll(&mut self) -> Option<PlatformEvent>;
}

impl EventQueue for VecDeque<PlatformEvent> {
    fn poll(&mut self) -> Option<PlatformEvent> {
        self.pop_front()
    }
}

impl EventQueue for Receiver<PlatformEvent> {
    fn poll(&mut self) -> Option<PlatformEvent> {
        self.try_recv().ok()
    }
}
