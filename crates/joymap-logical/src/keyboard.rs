use joymap_input::StandardRole;

/// Built-in USB HID keyboard usage to standard role table.
pub const KEYBOARD_ROLES: [(u32, StandardRole); 38] = [
    // WASD
    (0x1a, StandardRole::Up),
    (0x16, StandardRole::Down),
    (0x04, StandardRole::Left),
    (0x07, StandardRole::Right),
    // Arrows
    (0x52, StandardRole::Up),
    (0x51, StandardRole::Down),
    (0x50, StandardRole::Left),
    (0x4f, StandardRole::Right),
    // Keypad 8/2/4/6
    (0x60, StandardRole::Up),
    (0x5a, StandardRole::Down),
    (0x5c, StandardRole::Left),
    (0x5e, StandardRole::Right),
    // Face buttons
    (0x2c, StandardRole::South),
    (0x1d, StandardRole::South),
    (0x1b, StandardRole::East),
    (0x06, StandardRole::West),
    (0x19, StandardRole::North),
    (0x0d, StandardRole::South),
    (0x0e, StandardRole::East),
    (0x18, StandardRole::West),
    (0x0c, StandardRole::North),
    (0x62, StandardRole::South),
    (0x63, StandardRole::East),
    // Shoulders
    (0x14, StandardRole::L1),
    (0x08, StandardRole::R1),
    (0x1e, StandardRole::L2),
    (0x20, StandardRole::R2),
    (0xe1, StandardRole::L1),
    (0xe5, StandardRole::R1),
    (0xe0, StandardRole::L2),
    (0xe4, StandardRole::R2),
    // Menu
    (0x29, StandardRole::Aux1),
    (0x2b, StandardRole::Aux1),
    (0x28, StandardRole::Aux2),
    (0x58, StandardRole::Aux2),
    (0x0b, StandardRole::Aux3),
    (0x17, StandardRole::LeftStick),
    (0x1c, StandardRole::RightStick),
];

/// Role of a keyboard usage, if the table knows it.
pub fn keyboard_role(usage: u32) -> Option<StandardRole> {
    KEYBOARD_ROLES
        .iter()
        .find(|(known, _)| *known == usage)
        .map(|(_, role)| *role)
}
