use joymap_bit_derive::Bit;
use joymap_bit_mask::Bitmask;
use smallvec::SmallVec;

use crate::types::{ButtonId, StandardRole};

/// Screen regions a touch can press.
#[derive(Bit, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TouchRegion {
    Left,
    Right,
    Up,
    Down,
    Primary,
    Secondary,
}

pub type RegionMask = Bitmask<TouchRegion>;

impl TouchRegion {
    pub const fn role(self) -> StandardRole {
        match self {
            TouchRegion::Left => StandardRole::Left,
            TouchRegion::Right => StandardRole::Right,
            TouchRegion::Up => StandardRole::Up,
            TouchRegion::Down => StandardRole::Down,
            TouchRegion::Primary => StandardRole::South,
            TouchRegion::Secondary => StandardRole::East,
        }
    }

    /// Plain button id reported by the touch pseudo-device.
    pub const fn button_id(self) -> ButtonId {
        self.role().button_id()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchPhase {
    Begin,
    Move,
    End,
}

/// Classify a normalized `(x, y)` screen position.
///
/// The left third is a 3x3 dpad grid whose corner cells press two
/// directions and whose center presses nothing. The rest of the screen is
/// a 2x2 grid: the left column is the primary action, the right column the
/// secondary one.
pub fn classify(x: f32, y: f32) -> RegionMask {
    let x = x.clamp(0.0, 1.0);
    let y = y.clamp(0.0, 1.0);
    let mut mask = RegionMask::empty();
    if x < 1.0 / 3.0 {
        let col = cell(x * 3.0, 3);
        let row = cell(y, 3);
        mask.set(TouchRegion::Left, col == 0);
        mask.set(TouchRegion::Right, col == 2);
        mask.set(TouchRegion::Up, row == 0);
        mask.set(TouchRegion::Down, row == 2);
    } else {
        let col = cell((x - 1.0 / 3.0) * 1.5, 2);
        if col == 0 {
            mask.insert(TouchRegion::Primary);
        } else {
            mask.insert(TouchRegion::Secondary);
        }
    }
    mask
}

/// Index of the cell `unit` (in `0.0..=1.0`) falls into among `cells`.
fn cell(unit: f32, cells: u32) -> u32 {
    ((unit * cells as f32) as u32).min(cells - 1)
}

#[derive(Debug, Clone, Copy)]
struct ActiveTouch {
    id: i64,
    mask: RegionMask,
}

/// Active touches keyed sparsely by touch id.
#[derive(Debug, Default)]
pub(crate) struct TouchTracker {
    active: SmallVec<[ActiveTouch; 4]>,
    multi_touch: bool,
}

impl TouchTracker {
    pub fn set_multi_touch(&mut self, enabled: bool) {
        self.multi_touch = enabled;
    }

    pub fn multi_touch(&self) -> bool {
        self.multi_touch
    }

    pub fn clear(&mut self) {
        self.active.clear();
    }

    /// Record the new mask for a touch and return `(previous, current)`.
    /// Returns `None` when the touch is not tracked.
    pub fn update(
        &mut self,
        id: i64,
        phase: TouchPhase,
        x: f32,
        y: f32,
    ) -> Option<(RegionMask, RegionMask)> {
        let pos = self.active.iter().position(|t| t.id == id);
        match (phase, pos) {
            (TouchPhase::Begin, None) => {
                if !self.multi_touch && !self.active.is_empty() {
                    return None;
                }
                let mask = classify(x, y);
                self.active.push(ActiveTouch { id, mask });
                Some((RegionMask::empty(), mask))
            }
            (TouchPhase::Begin | TouchPhase::Move, Some(pos)) => {
                let touch = &mut self.active[pos];
                let previous = touch.mask;
                touch.mask = classify(x, y);
                Some((previous, touch.mask))
            }
            (TouchPhase::End, Some(pos)) => {
                let touch = self.active.remove(pos);
                Some((touch.mask, RegionMask::empty()))
            }
            (TouchPhase::Move | TouchPhase::End, None) => None,
        }
    }
}
