use joymap_input::StandardRole;

use crate::template::{LogicalMask, LOGICAL_BITS};

/// Hard cap on the number of logical players.
pub const MAX_PLAYERS: usize = 32;

pub const DEFAULT_PLAYERS: usize = 4;

/// Logical bit layout used when nothing else is configured.
pub const DEFAULT_BINDINGS: [Option<StandardRole>; LOGICAL_BITS] = [
    Some(StandardRole::Up),
    Some(StandardRole::Down),
    Some(StandardRole::Left),
    Some(StandardRole::Right),
    Some(StandardRole::South),
    Some(StandardRole::East),
    Some(StandardRole::West),
    Some(StandardRole::North),
    Some(StandardRole::L1),
    Some(StandardRole::R1),
    Some(StandardRole::L2),
    Some(StandardRole::R2),
    Some(StandardRole::Aux1),
    Some(StandardRole::Aux2),
    Some(StandardRole::LeftStick),
    Some(StandardRole::RightStick),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapperConfig {
    pub players: usize,
    /// Standard role bound to each logical bit.
    pub bindings: [Option<StandardRole>; LOGICAL_BITS],
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            players: DEFAULT_PLAYERS,
            bindings: DEFAULT_BINDINGS,
        }
    }
}

impl MapperConfig {
    /// Config with no bound bits.
    pub fn unbound(players: usize) -> Self {
        Self {
            players,
            bindings: [None; LOGICAL_BITS],
        }
    }

    /// Bind `bit` to `role`, replacing the previous binding.
    pub fn bind(&mut self, bit: usize, role: StandardRole) -> &mut Self {
        if let Some(slot) = self.bindings.get_mut(bit) {
            *slot = Some(role);
        }
        self
    }

    /// Every logical bit bound to `role`.
    pub fn role_mask(&self, role: StandardRole) -> LogicalMask {
        self.bindings
            .iter()
            .enumerate()
            .filter(|(_, bound)| **bound == Some(role))
            .fold(0, |mask, (bit, _)| mask | (1 << bit))
    }

    /// Every bound logical bit.
    pub fn bound_mask(&self) -> LogicalMask {
        self.bindings
            .iter()
            .enumerate()
            .filter(|(_, bound)| bound.is_some())
            .fold(0, |mask, (bit, _)| mask | (1 << bit))
    }

    /// Player count limited to `1..=MAX_PLAYERS`.
    pub fn clamped_players(&self) -> usize {
        self.players.clamp(1, MAX_PLAYERS)
    }
}
