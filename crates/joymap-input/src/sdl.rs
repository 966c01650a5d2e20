use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use ahash::AHashMap;
use crossbeam_channel::Sender;
use sdl2::controller::{Axis as SdlAxis, Button as SdlButton, GameController};
use sdl2::event::Event;
use sdl2::joystick::{HatState, Joystick};

use crate::events::PlatformEvent;
use crate::touch::TouchPhase;
use crate::types::{
    ButtonId, DeviceDescriptor, DeviceId, DeviceInfo, RawControl, StandardRole,
    STANDARD_LEFT_X, STANDARD_LEFT_Y, STANDARD_RIGHT_X, STANDARD_RIGHT_Y,
};
use crate::{Error, Result};

/// Raw trigger value above which a standard trigger counts as pressed.
const TRIGGER_THRESHOLD: i16 = 20000;

/// Button id blocks for generic joysticks.
const JOY_BUTTON_BASE: ButtonId = 0x001;
const JOY_AXIS_BASE: ButtonId = 0x100;
const JOY_HAT_BASE: ButtonId = 0x200;

/// Hat value reported for the centered position, outside the octant range.
const HAT_CENTERED: i32 = 8;

/// Starts a thread that owns SDL and forwards translated events to `tx`
/// until `stop` is raised or the receiver is dropped.
pub fn spawn_sdl_feed(tx: Sender<PlatformEvent>, stop: Arc<AtomicBool>) -> Result<JoinHandle<()>> {
    let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<()>>(1);
    let handle = thread::spawn(move || {
        // SDL must live entirely within this thread
        let mut feed = match SdlFeed::init() {
            Ok(feed) => {
                let _ = ready_tx.send(Ok(()));
                feed
            }
            Err(e) => {
                let _ = ready_tx.send(Err(e));
                return;
            }
        };
        while !stop.load(Ordering::Relaxed) {
            let Some(event) = feed.pump.wait_event_timeout(10) else {
                continue;
            };
            for platform in feed.translate(event) {
                if tx.send(platform).is_err() {
                    return;
                }
            }
        }
    });
    match ready_rx.recv() {
        Ok(Ok(())) => Ok(handle),
        Ok(Err(e)) => Err(e),
        Err(e) => Err(Error::Backend(e.to_string())),
    }
}

struct SdlFeed {
    controller_subsystem: sdl2::GameControllerSubsystem,
    joystick_subsystem: sdl2::JoystickSubsystem,
    pump: sdl2::EventPump,
    controllers: AHashMap<u32, GameController>,
    joysticks: AHashMap<u32, Joystick>,
    triggers: AHashMap<u32, (bool, bool)>,
}

impl SdlFeed {
    fn init() -> Result<Self> {
        let ctx = sdl2::init().map_err(Error::BackendInit)?;
        let controller_subsystem = ctx.game_controller().map_err(Error::BackendInit)?;
        let joystick_subsystem = ctx.joystick().map_err(Error::BackendInit)?;
        let pump = ctx.event_pump().map_err(Error::BackendInit)?;
        Ok(Self {
            controller_subsystem,
            joystick_subsystem,
            pump,
            controllers: AHashMap::new(),
            joysticks: AHashMap::new(),
            triggers: AHashMap::new(),
        })
    }

    fn translate(&mut self, event: Event) -> Vec<PlatformEvent> {
        match event {
            Event::JoyDeviceAdded { which, .. } => self.open(which).into_iter().collect(),
            Event::JoyDeviceRemoved { which, .. } => {
                let known = self.controllers.remove(&which).is_some()
                    | self.joysticks.remove(&which).is_some();
                self.triggers.remove(&which);
                if known {
                    vec![PlatformEvent::Disconnected(which as DeviceId)]
                } else {
                    Vec::new()
                }
            }
            Event::ControllerButtonDown { which, button, .. } => {
                controller_button(which, button, 1).into_iter().collect()
            }
            Event::ControllerButtonUp { which, button, .. } => {
                controller_button(which, button, 0).into_iter().collect()
            }
            Event::ControllerAxisMotion {
                which, axis, value, ..
            } => self.controller_axis(which, axis, value),
            Event::JoyAxisMotion {
                which,
                axis_idx,
                value,
                ..
            } if self.joysticks.contains_key(&which) => vec![PlatformEvent::ValueChanged {
                device: which as DeviceId,
                button: JOY_AXIS_BASE + ButtonId::from(axis_idx),
                value: i32::from(value),
            }],
            Event::JoyHatMotion {
                which,
                hat_idx,
                state,
                ..
            } if self.joysticks.contains_key(&which) => vec![PlatformEvent::ValueChanged {
                device: which as DeviceId,
                button: JOY_HAT_BASE + ButtonId::from(hat_idx),
                value: hat_value(state),
            }],
            Event::JoyButtonDown {
                which, button_idx, ..
            } if self.joysticks.contains_key(&which) => vec![PlatformEvent::ValueChanged {
                device: which as DeviceId,
                button: JOY_BUTTON_BASE + ButtonId::from(button_idx),
                value: 1,
            }],
            Event::JoyButtonUp {
                which, button_idx, ..
            } if self.joysticks.contains_key(&which) => vec![PlatformEvent::ValueChanged {
                device: which as DeviceId,
                button: JOY_BUTTON_BASE + ButtonId::from(button_idx),
                value: 0,
            }],
            Event::KeyDown {
                scancode: Some(scancode),
                repeat: false,
                ..
            } => vec![PlatformEvent::Key {
                keycode: scancode as i32 as u32,
                pressed: true,
            }],
            Event::KeyUp {
                scancode: Some(scancode),
                ..
            } => vec![PlatformEvent::Key {
                keycode: scancode as i32 as u32,
                pressed: false,
            }],
            Event::FingerDown {
                finger_id, x, y, ..
            } => vec![touch(finger_id, TouchPhase::Begin, x, y)],
            Event::FingerMotion {
                finger_id, x, y, ..
            } => vec![touch(finger_id, TouchPhase::Move, x, y)],
            Event::FingerUp {
                finger_id, x, y, ..
            } => vec![touch(finger_id, TouchPhase::End, x, y)],
            _ => Vec::new(),
        }
    }

    /// Open the device at `index`, preferring the game controller interface
    /// which reports standard-mapped buttons.
    fn open(&mut self, index: u32) -> Option<PlatformEvent> {
        if self.controller_subsystem.is_game_controller(index) {
            let controller = self.controller_subsystem.open(index).ok()?;
            let id = controller.instance_id();
            let descriptor = DeviceDescriptor {
                info: DeviceInfo {
                    id: id as DeviceId,
                    vendor_id: controller.vendor_id().unwrap_or(0),
                    product_id: controller.product_id().unwrap_or(0),
                    version: 0,
                    name: controller.name(),
                    standard_mapping: true,
                },
                controls: standard_controls(),
            };
            self.controllers.insert(id, controller);
            return Some(PlatformEvent::Connected(descriptor));
        }
        let joystick = self.joystick_subsystem.open(index).ok()?;
        let id = joystick.instance_id();
        let mut controls = Vec::new();
        for i in 0..joystick.num_buttons() {
            controls.push(RawControl::button(JOY_BUTTON_BASE + i));
        }
        for i in 0..joystick.num_axes() {
            controls.push(RawControl {
                button_id: JOY_AXIS_BASE + i,
                usage: 0x30 + i,
                low: i32::from(i16::MIN),
                high: i32::from(i16::MAX),
                resting: 0,
            });
        }
        for i in 0..joystick.num_hats() {
            controls.push(RawControl {
                button_id: JOY_HAT_BASE + i,
                usage: 0x39,
                low: 0,
                high: 7,
                resting: HAT_CENTERED,
            });
        }
        let descriptor = DeviceDescriptor {
            info: DeviceInfo {
                id: id as DeviceId,
                name: joystick.name(),
                ..Default::default()
            },
            controls,
        };
        self.joysticks.insert(id, joystick);
        Some(PlatformEvent::Connected(descriptor))
    }

    fn controller_axis(&mut self, which: u32, axis: SdlAxis, value: i16) -> Vec<PlatformEvent> {
        let device = which as DeviceId;
        let stick = |button| {
            vec![PlatformEvent::ValueChanged {
                device,
                button,
                value: i32::from(value),
            }]
        };
        match axis {
            SdlAxis::LeftX => stick(STANDARD_LEFT_X),
            SdlAxis::LeftY => stick(STANDARD_LEFT_Y),
            SdlAxis::RightX => stick(STANDARD_RIGHT_X),
            SdlAxis::RightY => stick(STANDARD_RIGHT_Y),
            SdlAxis::TriggerLeft | SdlAxis::TriggerRight => {
                // Triggers are one-way axes, reported as plain buttons.
                let entry = self.triggers.entry(which).or_insert((false, false));
                let (held, role) = if axis == SdlAxis::TriggerLeft {
                    (&mut entry.0, StandardRole::L2)
                } else {
                    (&mut entry.1, StandardRole::R2)
                };
                let pressed = value > TRIGGER_THRESHOLD;
                if pressed == *held {
                    return Vec::new();
                }
                *held = pressed;
                vec![PlatformEvent::ValueChanged {
                    device,
                    button: role.button_id(),
                    value: i32::from(pressed),
                }]
            }
        }
    }
}

fn controller_button(which: u32, button: SdlButton, value: i32) -> Option<PlatformEvent> {
    let role = map_sdl_button(button)?;
    Some(PlatformEvent::ValueChanged {
        device: which as DeviceId,
        button: role.button_id(),
        value,
    })
}

fn map_sdl_button(button: SdlButton) -> Option<StandardRole> {
    Some(match button {
        SdlButton::A => StandardRole::South,
        SdlButton::B => StandardRole::East,
        SdlButton::X => StandardRole::West,
        SdlButton::Y => StandardRole::North,
        SdlButton::LeftShoulder => StandardRole::L1,
        SdlButton::RightShoulder => StandardRole::R1,
        SdlButton::Back => StandardRole::Aux1,
        SdlButton::Start => StandardRole::Aux2,
        SdlButton::Guide => StandardRole::Aux3,
        SdlButton::LeftStick => StandardRole::LeftStick,
        SdlButton::RightStick => StandardRole::RightStick,
        SdlButton::DPadUp => StandardRole::Up,
        SdlButton::DPadDown => StandardRole::Down,
        SdlButton::DPadLeft => StandardRole::Left,
        SdlButton::DPadRight => StandardRole::Right,
        _ => return None,
    })
}

/// Controls every standard-mapped controller exposes.
fn standard_controls() -> Vec<RawControl> {
    let mut controls: Vec<RawControl> = StandardRole::ALL
        .iter()
        .map(|role| RawControl::button(role.button_id()))
        .collect();
    for (button_id, usage) in [
        (STANDARD_LEFT_X, 0x30),
        (STANDARD_LEFT_Y, 0x31),
        (STANDARD_RIGHT_X, 0x33),
        (STANDARD_RIGHT_Y, 0x34),
    ] {
        controls.push(RawControl {
            button_id,
            usage,
            low: i32::from(i16::MIN),
            high: i32::from(i16::MAX),
            resting: 0,
        });
    }
    controls
}

/// Octant of a hat state, 0 being north and going clockwise.
fn hat_value(state: HatState) -> i32 {
    match state {
        HatState::Up => 0,
        HatState::RightUp => 1,
        HatState::Right => 2,
        HatState::RightDown => 3,
        HatState::Down => 4,
        HatState::LeftDown => 5,
        HatState::Left => 6,
        HatState::LeftUp => 7,
        HatState::Centered => HAT_CENTERED,
    }
}

fn touch(finger_id: i64, phase: TouchPhase, x: f32, y: f32) -> PlatformEvent {
    PlatformEvent::Touch {
        touch_id: finger_id,
        phase,
        x,
        y,
    }
}
