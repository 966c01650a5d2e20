mod codec;
mod config;
mod generate;
mod keyboard;
mod mapper;
mod store;
mod template;

use thiserror::Error;

pub use codec::{decode, encode, DecodeError};
pub use config::{MapperConfig, DEFAULT_BINDINGS, DEFAULT_PLAYERS, MAX_PLAYERS};
pub use generate::generate_template;
pub use keyboard::{keyboard_role, KEYBOARD_ROLES};
pub use mapper::{Mapper, PlayerEvent, AGGREGATE_PLAYER};
pub use store::{BlobStore, MemoryStore, TemplateStore, STORE_KEY};
pub use template::{ButtonRule, LogicalMask, Matcher, Template, LOGICAL_BITS};

#[derive(Debug, Error)]
pub enum Error {
    #[error("blob not found: {0}")]
    NotFound(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("template decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("input error: {0}")]
    Input(#[from] joymap_input::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
