use std::cmp::Ordering;

use joymap_input::{
    ButtonId, CompoundControl, DeviceInfo, Part, StandardRole, KEYBOARD_DEVICE_ID,
    STANDARD_LEFT_X, STANDARD_LEFT_Y,
};

use crate::config::MapperConfig;
use crate::keyboard::KEYBOARD_ROLES;
use crate::template::{LogicalMask, Matcher, Template, LOGICAL_BITS};

/// HID generic desktop usages of vertical axes (Y, Ry, Rz).
const Y_LIKE_USAGES: [u32; 3] = [0x31, 0x34, 0x35];

/// Logical bits bound to the four dpad roles.
#[derive(Debug, Clone, Copy)]
struct Dpad {
    up: LogicalMask,
    down: LogicalMask,
    left: LogicalMask,
    right: LogicalMask,
}

impl Dpad {
    fn new(config: &MapperConfig) -> Self {
        Self {
            up: config.role_mask(StandardRole::Up),
            down: config.role_mask(StandardRole::Down),
            left: config.role_mask(StandardRole::Left),
            right: config.role_mask(StandardRole::Right),
        }
    }

    fn x(&self) -> (LogicalMask, LogicalMask) {
        (self.left, self.right)
    }

    fn y(&self) -> (LogicalMask, LogicalMask) {
        (self.up, self.down)
    }
}

/// Build a template for a device no stored template matched.
///
/// `compounds` are the hats and axes the canonicalizer classified,
/// `plain_buttons` the two-state controls the platform reported.
pub fn generate_template(
    config: &MapperConfig,
    info: &DeviceInfo,
    compounds: &[CompoundControl],
    plain_buttons: &[ButtonId],
) -> Template {
    let mut template = Template::new(Matcher::from_info(info));
    if info.id == KEYBOARD_DEVICE_ID {
        keyboard_rules(config, &mut template);
    } else if info.standard_mapping {
        standard_rules(config, &mut template);
    } else {
        generic_rules(config, compounds, plain_buttons, &mut template);
    }
    log::debug!(
        "generated template for \"{}\" ({:04x}:{:04x}) with {} rules",
        info.name,
        info.vendor_id,
        info.product_id,
        template.rules().len()
    );
    template
}

fn standard_rules(config: &MapperConfig, template: &mut Template) {
    for role in StandardRole::ALL {
        template.merge(role.button_id(), Part::Button, config.role_mask(role));
    }
    // The left stick doubles as the dpad.
    let dpad = Dpad::new(config);
    template.merge(STANDARD_LEFT_X, Part::Low, dpad.left);
    template.merge(STANDARD_LEFT_X, Part::High, dpad.right);
    template.merge(STANDARD_LEFT_Y, Part::Low, dpad.up);
    template.merge(STANDARD_LEFT_Y, Part::High, dpad.down);
}

fn keyboard_rules(config: &MapperConfig, template: &mut Template) {
    for (usage, role) in KEYBOARD_ROLES {
        template.merge(usage, Part::Button, config.role_mask(role));
    }
}

fn generic_rules(
    config: &MapperConfig,
    compounds: &[CompoundControl],
    plain_buttons: &[ButtonId],
    template: &mut Template,
) {
    let dpad = Dpad::new(config);
    let mut saturated: LogicalMask = 0;

    if let Some(hat) = compounds.iter().find(|c| c.is_hat()) {
        template.merge(hat.button_id, Part::West, dpad.left);
        template.merge(hat.button_id, Part::East, dpad.right);
        template.merge(hat.button_id, Part::North, dpad.up);
        template.merge(hat.button_id, Part::South, dpad.down);
        saturated |= dpad.left | dpad.right | dpad.up | dpad.down;
    }

    let x_bound = dpad.left | dpad.right != 0;
    let y_bound = dpad.up | dpad.down != 0;
    let (mut x_count, mut y_count) = (0u32, 0u32);
    for axis in compounds.iter().filter(|c| c.is_axis()) {
        let vertical = match (x_bound, y_bound) {
            (true, false) => false,
            (false, true) => true,
            _ => match x_count.cmp(&y_count) {
                Ordering::Less => false,
                Ordering::Greater => true,
                Ordering::Equal => Y_LIKE_USAGES.contains(&axis.usage),
            },
        };
        let (low, high) = if vertical {
            y_count += 1;
            dpad.y()
        } else {
            x_count += 1;
            dpad.x()
        };
        template.merge(axis.button_id, Part::Low, low);
        template.merge(axis.button_id, Part::High, high);
        saturated |= low | high;
    }

    let candidates = config.bound_mask() & !saturated;
    let mut counts = [0u32; LOGICAL_BITS];
    for &button in plain_buttons {
        if compounds.iter().any(|c| c.button_id == button) {
            continue;
        }
        let Some(bit) = least_used_bit(candidates, &counts) else {
            log::debug!("no logical bit left for button {button:#x}");
            continue;
        };
        counts[bit] += 1;
        template.merge(button, Part::Button, 1 << bit);
    }
}

/// Candidate bit with the fewest assignments, lowest index on ties.
fn least_used_bit(candidates: LogicalMask, counts: &[u32; LOGICAL_BITS]) -> Option<usize> {
    (0..LOGICAL_BITS)
        .filter(|bit| candidates & (1 << bit) != 0)
        .min_by_key(|&bit| (counts[bit], bit))
}
