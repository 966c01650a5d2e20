use std::collections::BTreeMap;

use joymap_input::StandardRole;
use joymap_logical::{MapperConfig, DEFAULT_BINDINGS, DEFAULT_PLAYERS, LOGICAL_BITS, MAX_PLAYERS};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("yaml deserialize error: {0}")]
    YamlDeserializeError(#[from] serde_yaml::Error),
    #[error("unsupported version: {0}")]
    UnsupportedVersion(u8),
    #[error("unknown role \"{role}\" for bit {bit}")]
    InvalidRole { bit: u8, role: String },
    #[error("logical bit out of range: {0}")]
    InvalidBit(u8),
    #[error("player count must be within 1..={max}, got {0}", max = MAX_PLAYERS)]
    InvalidPlayers(usize),
    #[error("environment variable not set: {0}")]
    EnvVarNotSet(String),
    #[error("path is not a directory: {0}")]
    PathIsNotDirectory(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Runtime settings read from `joymap.yaml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub mapper: MapperConfig,
    pub keyboard: bool,
    pub touch: bool,
    pub multi_touch: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mapper: MapperConfig::default(),
            keyboard: true,
            touch: false,
            multi_touch: false,
        }
    }
}

/// A config with a version.
#[derive(Debug, Clone, Deserialize)]
struct VersionedConfig {
    version: u8,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigV1 {
    #[allow(dead_code)]
    version: u8,
    #[serde(default = "default_players")]
    players: usize,
    /// Logical bit to role name. Replaces the default layout when present.
    #[serde(default)]
    bindings: Option<BTreeMap<u8, String>>,
    #[serde(default = "default_true")]
    keyboard: bool,
    #[serde(default)]
    touch: bool,
    #[serde(default)]
    multi_touch: bool,
}

fn default_players() -> usize {
    DEFAULT_PLAYERS
}

fn default_true() -> bool {
    true
}

/// Parse yaml config.
pub fn parse_config(input: &str) -> Result<Settings, ConfigError> {
    let raw: VersionedConfig = serde_yaml::from_str(input)?;
    match raw.version {
        1 => {
            let config: ConfigV1 = serde_yaml::from_str(input)?;
            config.into_settings()
        }
        version => Err(ConfigError::UnsupportedVersion(version)),
    }
}

impl ConfigV1 {
    fn into_settings(self) -> Result<Settings, ConfigError> {
        if !(1..=MAX_PLAYERS).contains(&self.players) {
            return Err(ConfigError::InvalidPlayers(self.players));
        }
        let bindings = match self.bindings {
            None => DEFAULT_BINDINGS,
            Some(raw) => {
                let mut bindings = [None; LOGICAL_BITS];
                for (bit, name) in raw {
                    let slot = bindings
                        .get_mut(usize::from(bit))
                        .ok_or(ConfigError::InvalidBit(bit))?;
                    let role = StandardRole::from_name(&name.to_lowercase())
                        .ok_or_else(|| ConfigError::InvalidRole { bit, role: name })?;
                    *slot = Some(role);
                }
                bindings
            }
        };
        Ok(Settings {
            mapper: MapperConfig {
                players: self.players,
                bindings,
            },
            keyboard: self.keyboard,
            touch: self.touch,
            multi_touch: self.multi_touch,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let settings = parse_config("version: 1\n").expect("valid");
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn bindings_replace_the_default_layout() {
        let yaml = r#"
version: 1
players: 2
touch: true
bindings:
  0: south
  1: B
  15: up
"#;
        let settings = parse_config(yaml).expect("valid");
        assert_eq!(settings.mapper.players, 2);
        assert!(settings.touch);
        assert!(settings.keyboard);
        assert_eq!(settings.mapper.bindings[0], Some(StandardRole::South));
        assert_eq!(settings.mapper.bindings[1], Some(StandardRole::East));
        assert_eq!(settings.mapper.bindings[15], Some(StandardRole::Up));
        assert_eq!(settings.mapper.bound_mask(), 0x8003);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            parse_config("version: 2\n"),
            Err(ConfigError::UnsupportedVersion(2))
        ));
        assert!(matches!(
            parse_config("version: 1\nbindings:\n  16: south\n"),
            Err(ConfigError::InvalidBit(16))
        ));
        assert!(matches!(
            parse_config("version: 1\nbindings:\n  0: turbo\n"),
            Err(ConfigError::InvalidRole { bit: 0, .. })
        ));
        assert!(matches!(
            parse_config("version: 1\nplayers: 0\n"),
            Err(ConfigError::InvalidPlayers(0))
        ));
        assert!(matches!(
            parse_config("version: 1\nmouse: true\n"),
            Err(ConfigError::YamlDeserializeError(_))
        ));
    }

    #[test]
    fn missing_version_is_a_yaml_error() {
        assert!(matches!(
            parse_config("players: 2\n"),
            Err(ConfigError::YamlDeserializeError(_))
        ));
    }
}
