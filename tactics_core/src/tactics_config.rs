//! Configuration for safety scoring, threat rings, episode timing and rewards.
//!
//! Loaded from `tactics_config.json` with support for an environment variable override.

use std::{
    env, fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use bevy::prelude::Resource;
use serde::Deserialize;
use thiserror::Error;

pub const BUILTIN_TACTICS_CONFIG: &str = include_str!("data/tactics_config.json");

/// Root configuration for the tactics layer.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct TacticsConfig {
    pub vision: VisionConfig,
    pub threat: ThreatConfig,
    pub episode: EpisodeConfig,
    pub scoring: ScoringConfig,
}

impl TacticsConfig {
    pub fn builtin() -> Arc<Self> {
        Arc::new(
            serde_json::from_str(BUILTIN_TACTICS_CONFIG)
                .expect("builtin tactics config should parse"),
        )
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_file(path: &Path) -> Result<Self, TacticsConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| TacticsConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = TacticsConfig::from_json_str(&contents)?;
        Ok(config)
    }
}

/// Safety-grid scoring parameters.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct VisionConfig {
    /// Neighbour values strictly above this count as safe.
    pub valid_point_threshold: f32,
    /// Window radius; the scored neighbourhood is `(2r + 1)^2` cells.
    pub neighborhood_radius: u32,
    /// Provisional value written into currently visible passable cells.
    pub visible_marker: f32,
    /// Constant used for the border padding.
    pub pad_value: f32,
    pub score_precision: u32,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            valid_point_threshold: 0.8,
            neighborhood_radius: 2,
            visible_marker: 2.0,
            pad_value: 0.0,
            score_precision: 2,
        }
    }
}

/// One concentric danger ring: radius is `detection_radius - offset`.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct RingConfig {
    pub offset: f32,
    pub multiplier: f32,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ThreatConfig {
    pub outer: RingConfig,
    pub middle: RingConfig,
    pub inner: RingConfig,
    pub score_precision: u32,
}

impl Default for ThreatConfig {
    fn default() -> Self {
        Self {
            outer: RingConfig {
                offset: 0.0,
                multiplier: 0.9,
            },
            middle: RingConfig {
                offset: 2.5,
                multiplier: 0.5,
            },
            inner: RingConfig {
                offset: 6.0,
                multiplier: 0.1,
            },
            score_precision: 2,
        }
    }
}

impl ThreatConfig {
    /// Rings ordered outer to inner.
    pub fn rings(&self) -> [RingConfig; 3] {
        [self.outer, self.middle, self.inner]
    }
}

/// Fixed simulated time budget of one episode.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct EpisodeConfig {
    pub time_budget: f32,
    pub tick_duration: f32,
}

impl Default for EpisodeConfig {
    fn default() -> Self {
        Self {
            time_budget: 12.0,
            tick_duration: 0.25,
        }
    }
}

impl EpisodeConfig {
    /// Number of host ticks that fit into the time budget.
    pub fn max_ticks(&self) -> u64 {
        if self.tick_duration <= 0.0 {
            return 0;
        }
        (self.time_budget / self.tick_duration).ceil().max(0.0) as u64
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScoringConfig {
    pub tick_reward: f64,
    pub survival_reward: f64,
    pub death_penalty: f64,
    pub joint_attack_bonus: f64,
    /// When set, the joint attack bonus also requires both dyad members alive.
    pub bonus_requires_survival: bool,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            tick_reward: 0.5,
            survival_reward: 2.0,
            death_penalty: 2.0,
            joint_attack_bonus: 4.0,
            bonus_requires_survival: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum TacticsConfigError {
    #[error("failed to parse tactics config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read tactics config from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Handle for accessing the tactics configuration from systems.
#[derive(Resource, Debug, Clone)]
pub struct TacticsConfigHandle(pub Arc<TacticsConfig>);

impl TacticsConfigHandle {
    pub fn new(config: Arc<TacticsConfig>) -> Self {
        Self(config)
    }

    pub fn get(&self) -> Arc<TacticsConfig> {
        Arc::clone(&self.0)
    }
}

/// Load tactics configuration from `TACTICS_CONFIG_PATH` or the default path.
///
/// Returns the path the config was read from, or `None` for the builtin.
pub fn load_tactics_config_from_env() -> (Arc<TacticsConfig>, Option<PathBuf>) {
    let override_path = env::var("TACTICS_CONFIG_PATH").ok().map(PathBuf::from);
    let path = override_path.unwrap_or_else(|| {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("src/data/tactics_config.json")
    });

    match TacticsConfig::from_file(&path) {
        Ok(config) => {
            tracing::info!(
                target: "squad_tactics::config",
                path = %path.display(),
                "tactics_config.loaded=file"
            );
            (Arc::new(config), Some(path))
        }
        Err(err) => {
            tracing::warn!(
                target: "squad_tactics::config",
                path = %path.display(),
                error = %err,
                "tactics_config.load_failed"
            );
            tracing::info!(
                target: "squad_tactics::config",
                "tactics_config.loaded=builtin"
            );
            (TacticsConfig::builtin(), None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_config_matches_defaults() {
        let builtin = TacticsConfig::builtin();
        assert_eq!(*builtin, TacticsConfig::default());
    }

    #[test]
    fn partial_json_falls_back_to_section_defaults() {
        let config =
            TacticsConfig::from_json_str(r#"{ "vision": { "valid_point_threshold": 0.5 } }"#)
                .unwrap();
        assert_eq!(config.vision.valid_point_threshold, 0.5);
        assert_eq!(config.vision.neighborhood_radius, 2);
        assert_eq!(config.scoring, ScoringConfig::default());
    }

    #[test]
    fn default_budget_is_forty_eight_ticks() {
        assert_eq!(EpisodeConfig::default().max_ticks(), 48);
        let broken = EpisodeConfig {
            time_budget: 12.0,
            tick_duration: 0.0,
        };
        assert_eq!(broken.max_ticks(), 0);
    }

    #[test]
    fn ring_order_is_outer_to_inner() {
        let rings = ThreatConfig::default().rings();
        assert_eq!(rings[0].multiplier, 0.9);
        assert_eq!(rings[1].multiplier, 0.5);
        assert_eq!(rings[2].multiplier, 0.1);
    }
}
