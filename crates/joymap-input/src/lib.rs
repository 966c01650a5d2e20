mod canonicalizer;
mod control;
mod events;
mod listeners;
mod registry;
#[cfg(feature = "sdl2-backend")]
mod sdl;
mod touch;
mod types;

use thiserror::Error;

pub use crate::canonicalizer::{keyboard_descriptor, touch_descriptor, Canonicalizer};
pub use crate::control::{AxisThresholds, CompoundControl, ControlMode, PartMask, HAT_POSITIONS};
pub use crate::events::{EventQueue, PlatformEvent};
pub use crate::listeners::{Listener, ListenerId, ListenerTable, MAX_LISTENERS};
pub use crate::registry::{Device, Registry};
#[cfg(feature = "sdl2-backend")]
pub use crate::sdl::spawn_sdl_feed;
pub use crate::touch::{classify as classify_touch, RegionMask, TouchPhase, TouchRegion};
pub use crate::types::{
    is_synthetic, ButtonId, CanonicalEvent, DeviceDescriptor, DeviceId, DeviceInfo, Part,
    RawControl, StandardRole, KEYBOARD_DEVICE_ID, STANDARD_BUTTON_BASE, STANDARD_LEFT_X,
    STANDARD_LEFT_Y, STANDARD_RIGHT_X, STANDARD_RIGHT_Y, TOUCH_DEVICE_ID,
};

/// Error type for input canonicalization.
#[derive(Debug, Error)]
pub enum Error {
    /// Every listener slot is taken.
    #[error("Listener limit reached: {0}")]
    ListenerLimit(usize),
    /// Failed to initialize the platform backend.
    #[error("Backend init failed: {0}")]
    BackendInit(String),
    /// A generic backend error.
    #[error("Backend error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, Error>;
