//! Runtime configuration, loaded from a single TOML file per binary.
//!
//! Follows `obsidian_config::ObsidianConfig`/`onyx_config::OnyxConfig`:
//! one `Config::load(path)` associated function, `#[serde(default)]` for
//! every field a reasonable reference deployment doesn't need to override.

use serde::Deserialize;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read '{path}'")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration shared by `inos-supervisord` and `inos-physicsd`.
/// Each binary reads the sections it needs and ignores the rest.
#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default = "defaults::log_level")]
    pub log_level: String,

    #[serde(default)]
    pub fabric: FabricConfig,

    #[serde(default)]
    pub supervisor: SupervisorConfig,

    #[serde(default)]
    pub mesh: MeshConfig,

    #[serde(default)]
    pub physics: PhysicsConfig,
}

#[derive(Debug, Deserialize)]
pub struct FabricConfig {
    /// If set, the fabric is backed by this file (cross-process
    /// deployment); if absent, an anonymous mapping is used.
    #[serde(default)]
    pub shm_file_path: Option<String>,
}

impl Default for FabricConfig {
    fn default() -> Self {
        Self {
            shm_file_path: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SupervisorConfig {
    #[serde(default = "defaults::starting_balance")]
    pub ledger_starting_balance: i64,
    #[serde(default = "defaults::outbox_high_water_pct")]
    pub outbox_high_water_pct: u8,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            ledger_starting_balance: defaults::starting_balance(),
            outbox_high_water_pct: defaults::outbox_high_water_pct(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MeshConfig {
    #[serde(default = "defaults::ewma_alpha")]
    pub ewma_alpha: f64,
    #[serde(default = "defaults::demand_half_life_secs")]
    pub demand_half_life_secs: f64,
    #[serde(default = "defaults::demand_scaling")]
    pub demand_scaling: f64,
    #[serde(default = "defaults::min_replicas")]
    pub min_replicas: u32,
    #[serde(default = "defaults::max_replicas")]
    pub max_replicas: u32,
    #[serde(default = "defaults::self_heal_interval_secs")]
    pub self_heal_interval_secs: u64,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            ewma_alpha: defaults::ewma_alpha(),
            demand_half_life_secs: defaults::demand_half_life_secs(),
            demand_scaling: defaults::demand_scaling(),
            min_replicas: defaults::min_replicas(),
            max_replicas: defaults::max_replicas(),
            self_heal_interval_secs: defaults::self_heal_interval_secs(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PhysicsConfig {
    #[serde(default = "defaults::tick_hz")]
    pub tick_hz: f64,
    #[serde(default = "defaults::entity_capacity")]
    pub entity_capacity: usize,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            tick_hz: defaults::tick_hz(),
            entity_capacity: defaults::entity_capacity(),
        }
    }
}

mod defaults {
    pub fn log_level() -> String {
        "info".into()
    }

    pub fn starting_balance() -> i64 {
        1_000
    }

    pub fn outbox_high_water_pct() -> u8 {
        75
    }

    pub fn ewma_alpha() -> f64 {
        0.3
    }

    pub fn demand_half_life_secs() -> f64 {
        50.0
    }

    pub fn demand_scaling() -> f64 {
        1.0
    }

    pub fn min_replicas() -> u32 {
        1
    }

    pub fn max_replicas() -> u32 {
        5
    }

    pub fn self_heal_interval_secs() -> u64 {
        30
    }

    pub fn tick_hz() -> f64 {
        250.0
    }

    pub fn entity_capacity() -> usize {
        1024
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path> + ToString) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        let config: Config = toml::from_str(&raw)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_fills_in_every_default() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.supervisor.ledger_starting_balance, 1_000);
        assert_eq!(config.mesh.max_replicas, 5);
        assert_eq!(config.physics.tick_hz, 250.0);
    }

    #[test]
    fn partial_overrides_leave_the_rest_at_default() {
        let toml = r#"
            [mesh]
            max_replicas = 9
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.mesh.max_replicas, 9);
        assert_eq!(config.mesh.min_replicas, 1);
    }

    #[test]
    fn missing_file_surfaces_a_read_error() {
        let err = Config::load("/nonexistent/inos.toml".to_string()).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
