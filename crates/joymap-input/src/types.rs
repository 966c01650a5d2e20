use joymap_bit_derive::Bit;

/// Identifier of an input device. Platform devices use positive ids,
/// pseudo-devices use the reserved negative ids below.
pub type DeviceId = i32;

/// Identifier of a physical control on a device.
pub type ButtonId = u32;

/// Pseudo-device fed by keyboard events.
pub const KEYBOARD_DEVICE_ID: DeviceId = -1;
/// Pseudo-device fed by touch events.
pub const TOUCH_DEVICE_ID: DeviceId = -2;

/// Returns true for the reserved pseudo-device ids.
#[inline]
pub fn is_synthetic(id: DeviceId) -> bool {
    id == KEYBOARD_DEVICE_ID || id == TOUCH_DEVICE_ID
}

/// Sub-signal of a control that a canonical event refers to.
#[derive(Bit, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Part {
    /// Plain two-state button.
    Button,
    West,
    East,
    North,
    South,
    /// Axis below its dead zone.
    Low,
    /// Axis above its dead zone.
    High,
    /// Device connect (`true`) or disconnect (`false`).
    Connect,
}

impl Part {
    /// Parts a hat control decodes to.
    pub const HAT: [Part; 4] = [Part::West, Part::East, Part::North, Part::South];
    /// Parts an axis control decodes to.
    pub const AXIS: [Part; 2] = [Part::Low, Part::High];

    /// Single-letter tag used in listener callbacks and persisted templates.
    pub const fn as_char(self) -> char {
        match self {
            Part::Button => 'b',
            Part::West => 'w',
            Part::East => 'e',
            Part::North => 'n',
            Part::South => 's',
            Part::Low => 'l',
            Part::High => 'h',
            Part::Connect => 'c',
        }
    }

    pub const fn from_char(c: char) -> Option<Part> {
        Some(match c {
            'b' => Part::Button,
            'w' => Part::West,
            'e' => Part::East,
            'n' => Part::North,
            's' => Part::South,
            'l' => Part::Low,
            'h' => Part::High,
            'c' => Part::Connect,
            _ => return None,
        })
    }
}

/// Semantic button roles reported by standard-mapping devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StandardRole {
    South,
    East,
    West,
    North,
    L1,
    R1,
    L2,
    R2,
    Aux1,
    Aux2,
    Aux3,
    LeftStick,
    RightStick,
    Up,
    Down,
    Left,
    Right,
}

/// First button id of the standard role block.
pub const STANDARD_BUTTON_BASE: ButtonId = 0x80;

/// Standard analog stick axes.
pub const STANDARD_LEFT_X: ButtonId = 0x40;
pub const STANDARD_LEFT_Y: ButtonId = 0x41;
pub const STANDARD_RIGHT_X: ButtonId = 0x42;
pub const STANDARD_RIGHT_Y: ButtonId = 0x43;

impl StandardRole {
    pub const ALL: [StandardRole; 17] = [
        StandardRole::South,
        StandardRole::East,
        StandardRole::West,
        StandardRole::North,
        StandardRole::L1,
        StandardRole::R1,
        StandardRole::L2,
        StandardRole::R2,
        StandardRole::Aux1,
        StandardRole::Aux2,
        StandardRole::Aux3,
        StandardRole::LeftStick,
        StandardRole::RightStick,
        StandardRole::Up,
        StandardRole::Down,
        StandardRole::Left,
        StandardRole::Right,
    ];

    /// The fixed button id a standard-mapping device reports for this role.
    pub const fn button_id(self) -> ButtonId {
        STANDARD_BUTTON_BASE + self as ButtonId
    }

    pub fn from_button_id(id: ButtonId) -> Option<StandardRole> {
        let index = id.checked_sub(STANDARD_BUTTON_BASE)?;
        Self::ALL.get(index as usize).copied()
    }

    pub const fn is_dpad(self) -> bool {
        matches!(
            self,
            StandardRole::Up | StandardRole::Down | StandardRole::Left | StandardRole::Right
        )
    }

    pub const fn name(self) -> &'static str {
        match self {
            StandardRole::South => "south",
            StandardRole::East => "east",
            StandardRole::West => "west",
            StandardRole::North => "north",
            StandardRole::L1 => "l1",
            StandardRole::R1 => "r1",
            StandardRole::L2 => "l2",
            StandardRole::R2 => "r2",
            StandardRole::Aux1 => "aux1",
            StandardRole::Aux2 => "aux2",
            StandardRole::Aux3 => "aux3",
            StandardRole::LeftStick => "lp",
            StandardRole::RightStick => "rp",
            StandardRole::Up => "up",
            StandardRole::Down => "down",
            StandardRole::Left => "left",
            StandardRole::Right => "right",
        }
    }

    /// Parse a role name, accepting a few common aliases.
    pub fn from_name(name: &str) -> Option<StandardRole> {
        Some(match name {
            "south" | "a" => StandardRole::South,
            "east" | "b" => StandardRole::East,
            "west" | "x" => StandardRole::West,
            "north" | "y" => StandardRole::North,
            "l1" | "lb" => StandardRole::L1,
            "r1" | "rb" => StandardRole::R1,
            "l2" | "lt" => StandardRole::L2,
            "r2" | "rt" => StandardRole::R2,
            "aux1" | "select" | "back" => StandardRole::Aux1,
            "aux2" | "start" => StandardRole::Aux2,
            "aux3" | "home" | "guide" => StandardRole::Aux3,
            "lp" | "ls" => StandardRole::LeftStick,
            "rp" | "rs" => StandardRole::RightStick,
            "up" | "dpad_up" => StandardRole::Up,
            "down" | "dpad_down" => StandardRole::Down,
            "left" | "dpad_left" => StandardRole::Left,
            "right" | "dpad_right" => StandardRole::Right,
            _ => return None,
        })
    }
}

/// A physical control as classified by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawControl {
    pub button_id: ButtonId,
    /// HID usage (generic desktop page for axes), 0 if unknown.
    pub usage: u32,
    pub low: i32,
    pub high: i32,
    pub resting: i32,
}

impl RawControl {
    /// A two-state button.
    pub const fn button(button_id: ButtonId) -> Self {
        Self {
            button_id,
            usage: 0,
            low: 0,
            high: 1,
            resting: 0,
        }
    }
}

/// Device meta information that remains stable while it is connected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    pub id: DeviceId,
    pub vendor_id: u16,
    pub product_id: u16,
    pub version: u16,
    pub name: String,
    /// The device reports semantically named buttons (see [`StandardRole`]).
    pub standard_mapping: bool,
}

/// Everything the platform reports when a device connects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub info: DeviceInfo,
    pub controls: Vec<RawControl>,
}

/// `(device, source button, part, value)` produced by the canonicalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanonicalEvent {
    pub device: DeviceId,
    pub button: ButtonId,
    pub part: Part,
    pub value: bool,
}

impl CanonicalEvent {
    pub const fn new(device: DeviceId, button: ButtonId, part: Part, value: bool) -> Self {
        Self {
            device,
            button,
            part,
            value,
        }
    }

    pub const fn connect(device: DeviceId, connected: bool) -> Self {
        Self::new(device, 0, Part::Connect, connected)
    }

    /// True for the reserved `(0, 'c', _)` device lifecycle pair.
    pub fn is_connect(&self) -> bool {
        self.button == 0 && self.part == Part::Connect
    }
}
