pub mod app;
pub mod config;
pub mod logging;
pub mod script;
pub mod workspace;

pub use app::Engine;
pub use config::{parse_config, ConfigError, Settings};
pub use script::{parse_script, Step};
pub use workspace::{FileStore, Workspace};
