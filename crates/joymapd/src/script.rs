//! YAML scripts of platform events, replayed through the engine.
//!
//! ```yaml
//! version: 1
//! steps:
//!   - type: connect
//!     id: 1
//!     name: USB Joystick
//!     controls:
//!       - button: 1
//!       - { button: 0x100, usage: 0x30, low: -128, high: 127 }
//!   - { type: value, device: 1, button: 0x100, value: -128 }
//!   - { type: keyboard, enabled: true }
//!   - { type: key, code: 0x2c, pressed: true }
//!   - { type: disconnect, id: 1 }
//! ```

use joymap_input::{DeviceDescriptor, DeviceInfo, PlatformEvent, RawControl, TouchPhase};
use serde::Deserialize;

use crate::config::ConfigError;

/// One replayed action.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Event(PlatformEvent),
    Keyboard(bool),
    TouchScreen(bool),
    MultiTouch(bool),
    Players(usize),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawScript {
    version: u8,
    #[serde(default)]
    steps: Vec<RawStep>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RawStep {
    Connect {
        id: i32,
        #[serde(default)]
        vendor: u16,
        #[serde(default)]
        product: u16,
        #[serde(default)]
        version: u16,
        #[serde(default)]
        name: String,
        #[serde(default)]
        standard: bool,
        #[serde(default)]
        controls: Vec<ScriptControl>,
    },
    Disconnect {
        id: i32,
    },
    Value {
        device: i32,
        button: u32,
        value: i32,
    },
    Key {
        code: u32,
        pressed: bool,
    },
    Touch {
        id: i64,
        phase: RawPhase,
        x: f32,
        y: f32,
    },
    Keyboard {
        enabled: bool,
    },
    TouchScreen {
        enabled: bool,
    },
    MultiTouch {
        enabled: bool,
    },
    Players {
        count: usize,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScriptControl {
    button: u32,
    #[serde(default)]
    usage: u32,
    #[serde(default)]
    low: i32,
    #[serde(default = "default_high")]
    high: i32,
    #[serde(default)]
    resting: i32,
}

fn default_high() -> i32 {
    1
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
enum RawPhase {
    Begin,
    Move,
    End,
}

/// Parse a yaml event script.
pub fn parse_script(input: &str) -> Result<Vec<Step>, ConfigError> {
    let raw: RawScript = serde_yaml::from_str(input)?;
    if raw.version != 1 {
        return Err(ConfigError::UnsupportedVersion(raw.version));
    }
    Ok(raw.steps.into_iter().map(RawStep::into_step).collect())
}

impl RawStep {
    fn into_step(self) -> Step {
        match self {
            RawStep::Connect {
                id,
                vendor,
                product,
                version,
                name,
                standard,
                controls,
            } => Step::Event(PlatformEvent::Connected(DeviceDescriptor {
                info: DeviceInfo {
                    id,
                    vendor_id: vendor,
                    product_id: product,
                    version,
                    name,
                    standard_mapping: standard,
                },
                controls: controls
                    .into_iter()
                    .map(|c| RawControl {
                        button_id: c.button,
                        usage: c.usage,
                        low: c.low,
                        high: c.high,
                        resting: c.resting,
                    })
                    .collect(),
            })),
            RawStep::Disconnect { id } => Step::Event(PlatformEvent::Disconnected(id)),
            RawStep::Value {
                device,
                button,
                value,
            } => Step::Event(PlatformEvent::ValueChanged {
                device,
                button,
                value,
            }),
            RawStep::Key { code, pressed } => Step::Event(PlatformEvent::Key {
                keycode: code,
                pressed,
            }),
            RawStep::Touch { id, phase, x, y } => Step::Event(PlatformEvent::Touch {
                touch_id: id,
                phase: match phase {
                    RawPhase::Begin => TouchPhase::Begin,
                    RawPhase::Move => TouchPhase::Move,
                    RawPhase::End => TouchPhase::End,
                },
                x,
                y,
            }),
            RawStep::Keyboard { enabled } => Step::Keyboard(enabled),
            RawStep::TouchScreen { enabled } => Step::TouchScreen(enabled),
            RawStep::MultiTouch { enabled } => Step::MultiTouch(enabled),
            RawStep::Players { count } => Step::Players(count),
        }
    }
}
