use joymap_bit_mask::Bitmask;

use crate::types::{ButtonId, Part, RawControl};

/// Number of distinct positions a hat switch reports.
pub const HAT_POSITIONS: i64 = 8;

/// Decoded state of a compound control.
pub type PartMask = Bitmask<Part>;

/// Dead-zone split of a two-way axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisThresholds {
    /// Values at or below this are `Low`.
    pub low: i32,
    pub mid: i32,
    /// Values at or above this are `High`.
    pub high: i32,
}

impl AxisThresholds {
    pub fn new(low: i32, high: i32) -> Self {
        let (low, high) = (i64::from(low), i64::from(high));
        let mid = (low + high) / 2;
        let mut mid_low = (low + mid) / 2;
        if mid_low >= mid {
            mid_low = mid - 1;
        }
        let mut mid_high = (high + mid) / 2;
        if mid_high <= mid {
            mid_high = mid + 1;
        }
        Self {
            low: saturate(mid_low),
            mid: saturate(mid),
            high: saturate(mid_high),
        }
    }

    pub fn decode(&self, value: i32) -> PartMask {
        let mut mask = PartMask::empty();
        if value <= self.low {
            mask.insert(Part::Low);
        } else if value >= self.high {
            mask.insert(Part::High);
        }
        mask
    }
}

fn saturate(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMode {
    Hat { low: i32 },
    Axis(AxisThresholds),
}

/// A hat or two-way axis: one physical input decoding to several booleans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompoundControl {
    pub button_id: ButtonId,
    pub usage: u32,
    pub mode: ControlMode,
    pub state: PartMask,
}

impl CompoundControl {
    /// Classify a raw control. Returns `None` for plain buttons, one-way
    /// axes and anything that cannot be classified.
    pub fn classify(raw: &RawControl) -> Option<Self> {
        let range = i64::from(raw.high) - i64::from(raw.low) + 1;
        let mode = if range < 3 {
            return None;
        } else if range == HAT_POSITIONS {
            ControlMode::Hat { low: raw.low }
        } else if raw.low == 0 && raw.resting == 0 {
            return None;
        } else if raw.low < raw.resting && raw.resting < raw.high {
            ControlMode::Axis(AxisThresholds::new(raw.low, raw.high))
        } else {
            return None;
        };
        Some(Self {
            button_id: raw.button_id,
            usage: raw.usage,
            mode,
            state: PartMask::empty(),
        })
    }

    pub fn is_hat(&self) -> bool {
        matches!(self.mode, ControlMode::Hat { .. })
    }

    pub fn is_axis(&self) -> bool {
        matches!(self.mode, ControlMode::Axis(_))
    }

    /// Parts this control can report.
    pub fn parts(&self) -> &'static [Part] {
        match self.mode {
            ControlMode::Hat { .. } => &Part::HAT,
            ControlMode::Axis(_) => &Part::AXIS,
        }
    }

    pub fn decode(&self, value: i32) -> PartMask {
        match self.mode {
            ControlMode::Hat { low } => decode_hat(i64::from(value) - i64::from(low)),
            ControlMode::Axis(thresholds) => thresholds.decode(value),
        }
    }

    /// Store the decoded state for `value` and return the parts that changed.
    pub fn update(&mut self, value: i32) -> PartMask {
        let next = self.decode(value);
        let changed = self.state.symmetric_difference(&next);
        self.state = next;
        changed
    }
}

/// Octant 0 is north, going clockwise in 45 degree steps. Anything outside
/// `0..8` is the centered (null) position.
fn decode_hat(octant: i64) -> PartMask {
    let mut mask = PartMask::empty();
    if !(0..HAT_POSITIONS).contains(&octant) {
        return mask;
    }
    mask.set(Part::West, matches!(octant, 5..=7));
    mask.set(Part::East, matches!(octant, 1..=3));
    mask.set(Part::North, matches!(octant, 7 | 0 | 1));
    mask.set(Part::South, matches!(octant, 3..=5));
    mask
}
