//! # World Configuration
//!
//! Startup configuration for a world instance. Loaded once at world
//! creation, typically from a TOML file shipped with the application.
//!
//! The update phase list is configuration, not a fixed enumeration:
//! engine builds differ in how many phases they run and what they are
//! called. The only hard requirement is that at least one phase exists
//! and names are unique.

use serde::{Deserialize, Serialize};

use crate::error::WorldError;

/// Default update phases, in execution order.
pub const DEFAULT_PHASES: [&str; 4] = [
    "pre_simulation",
    "simulation",
    "post_simulation",
    "presentation",
];

/// Configuration for one world instance.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Display name of the world (used in log output).
    pub name: String,
    /// Ordered list of update phase names. Must be non-empty and unique.
    pub phases: Vec<String>,
    /// Worker threads for parallel update dispatch and transform
    /// propagation. Zero disables parallelism entirely.
    pub worker_threads: usize,
    /// Time budget in microseconds that a non-exempt initialization batch
    /// may consume per tick.
    pub init_slice_micros: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            name: String::from("world"),
            phases: DEFAULT_PHASES.iter().map(ToString::to_string).collect(),
            worker_threads: 0,
            init_slice_micros: 1_000,
        }
    }
}

impl WorldConfig {
    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidConfig`] if the TOML is malformed or
    /// the parsed configuration fails validation.
    pub fn from_toml(text: &str) -> Result<Self, WorldError> {
        let config: Self =
            toml::from_str(text).map_err(|e| WorldError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidConfig`] if the phase list is empty or
    /// contains duplicate names.
    pub fn validate(&self) -> Result<(), WorldError> {
        if self.phases.is_empty() {
            return Err(WorldError::InvalidConfig(String::from(
                "phase list must not be empty",
            )));
        }
        for (i, phase) in self.phases.iter().enumerate() {
            if self.phases[..i].contains(phase) {
                return Err(WorldError::InvalidConfig(format!(
                    "duplicate phase name: {phase}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = WorldConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.phases.len(), 4);
    }

    #[test]
    fn test_from_toml() {
        let config = WorldConfig::from_toml(
            r#"
            name = "test"
            phases = ["logic", "render"]
            worker_threads = 4
            "#,
        )
        .unwrap();
        assert_eq!(config.name, "test");
        assert_eq!(config.phases, vec!["logic", "render"]);
        assert_eq!(config.worker_threads, 4);
    }

    #[test]
    fn test_empty_phases_rejected() {
        let result = WorldConfig::from_toml("phases = []");
        assert!(matches!(result, Err(WorldError::InvalidConfig(_))));
    }

    #[test]
    fn test_duplicate_phases_rejected() {
        let result = WorldConfig::from_toml(r#"phases = ["a", "a"]"#);
        assert!(matches!(result, Err(WorldError::InvalidConfig(_))));
    }
}
