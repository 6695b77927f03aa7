//! Match tuning and level configuration
//!
//! Every value has a default matching the classic three-level match, so a
//! config file only needs the fields it wants to change. Files are TOML:
//!
//! ```toml
//! mode = "investment"
//! tick_rate = 30
//!
//! [[levels]]
//! duration_secs = 45
//! entity_count = 200
//! harmful_count = 50
//! ```

use crate::spawner::INVESTMENT_CATALOG;
use clap::ValueEnum;
use serde::Deserialize;
use shared::{Entity, EntityKind, WorldSize, MAX_PACKET_SIZE};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Bytes of every snapshot datagram kept free for avatars and framing.
pub const SNAPSHOT_HEADROOM: usize = 8 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Which consumable catalogue the match uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    /// Beneficial food grows, poisonous food shrinks.
    Food,
    /// Options with interest and risk that move wealth and radius.
    Investment,
}

/// Who decides that an avatar touched a consumable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ConsumptionPolicy {
    /// The server scans for overlaps every tick. Client claims are ignored.
    Server,
    /// Clients claim entities and the server re-validates each claim.
    ClientClaim,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LevelConfig {
    pub duration_secs: u32,
    /// Target live population of consumables.
    pub entity_count: usize,
    /// How many of those should be harmful (food mode only).
    #[serde(default)]
    pub harmful_count: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub world_width: f32,
    pub world_height: f32,
    pub tick_rate: u32,
    pub spawn_interval_ms: u64,
    /// Distance moved per tick on each axis with a direction flag set.
    pub avatar_speed: f32,
    pub start_radius: f32,
    /// Avatars at or below this radius are eliminated.
    pub min_radius: f32,
    pub entity_min_radius: f32,
    pub entity_max_radius: f32,
    /// Attacker radius must exceed `defender * absorption_ratio`.
    pub absorption_ratio: f32,
    pub harmful_shrink_factor: f32,
    /// Client claims also need `avatar.radius * claim_bite_ratio > entity.radius`.
    pub claim_bite_ratio: f32,
    pub start_wealth: f32,
    /// Avatars at or below this wealth are eliminated.
    pub min_wealth: f32,
    pub min_players_to_start: usize,
    pub mode: GameMode,
    pub policy: ConsumptionPolicy,
    pub levels: Vec<LevelConfig>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            world_width: 3000.0,
            world_height: 3000.0,
            tick_rate: 60,
            spawn_interval_ms: 1000,
            avatar_speed: 5.0,
            start_radius: 20.0,
            min_radius: 5.0,
            entity_min_radius: 5.0,
            entity_max_radius: 15.0,
            absorption_ratio: 1.1,
            harmful_shrink_factor: 0.5,
            claim_bite_ratio: 0.7,
            start_wealth: 100.0,
            min_wealth: 0.0,
            min_players_to_start: 2,
            mode: GameMode::Food,
            policy: ConsumptionPolicy::Server,
            levels: vec![
                LevelConfig {
                    duration_secs: 60,
                    entity_count: 300,
                    harmful_count: 125,
                },
                LevelConfig {
                    duration_secs: 90,
                    entity_count: 300,
                    harmful_count: 135,
                },
                LevelConfig {
                    duration_secs: 120,
                    entity_count: 300,
                    harmful_count: 150,
                },
            ],
        }
    }
}

impl GameConfig {
    /// Loads and validates a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        let positive = |value: f32| value.is_finite() && value > 0.0;

        if !(positive(self.world_width) && positive(self.world_height)) {
            return invalid("world dimensions must be positive");
        }
        if self.tick_rate == 0 {
            return invalid("tick_rate must be at least 1");
        }
        if self.spawn_interval_ms == 0 {
            return invalid("spawn_interval_ms must be at least 1");
        }
        if !positive(self.avatar_speed) {
            return invalid("avatar_speed must be positive");
        }
        if !positive(self.min_radius) {
            return invalid("min_radius must be positive");
        }
        if !(positive(self.start_radius) && self.start_radius > self.min_radius) {
            return invalid("start_radius must exceed min_radius");
        }
        if !(positive(self.entity_min_radius)
            && positive(self.entity_max_radius)
            && self.entity_min_radius < self.entity_max_radius)
        {
            return invalid("entity radius range must be positive and non-empty");
        }
        if !(self.absorption_ratio.is_finite() && self.absorption_ratio >= 1.0) {
            return invalid("absorption_ratio must be at least 1.0");
        }
        if !(self.harmful_shrink_factor > 0.0 && self.harmful_shrink_factor < 1.0) {
            return invalid("harmful_shrink_factor must be between 0 and 1");
        }
        if !(self.claim_bite_ratio > 0.0 && self.claim_bite_ratio <= 1.0) {
            return invalid("claim_bite_ratio must be in (0, 1]");
        }
        if !(self.start_wealth.is_finite() && self.min_wealth.is_finite()) {
            return invalid("wealth bounds must be finite");
        }
        if self.mode == GameMode::Investment && self.start_wealth <= self.min_wealth {
            return invalid("start_wealth must exceed min_wealth");
        }
        if self.levels.is_empty() {
            return invalid("at least one level is required");
        }
        let max_entities = self.max_snapshot_entities()?;
        for (index, level) in self.levels.iter().enumerate() {
            if level.duration_secs == 0 {
                return Err(ConfigError::Invalid(format!(
                    "level {} has a zero duration",
                    index
                )));
            }
            if level.harmful_count > level.entity_count {
                return Err(ConfigError::Invalid(format!(
                    "level {} has more harmful entities than its target population",
                    index
                )));
            }
            if level.entity_count > max_entities {
                return Err(ConfigError::Invalid(format!(
                    "level {} wants {} entities but a snapshot datagram holds at most {}",
                    index, level.entity_count, max_entities
                )));
            }
        }
        Ok(())
    }

    /// Largest entity population whose full snapshot still fits in one
    /// datagram next to [`SNAPSHOT_HEADROOM`] bytes of avatars.
    pub fn max_snapshot_entities(&self) -> Result<usize, ConfigError> {
        let kinds: Vec<EntityKind> = match self.mode {
            GameMode::Food => vec![EntityKind::Food { poisonous: true }],
            GameMode::Investment => INVESTMENT_CATALOG.iter().map(|o| o.kind()).collect(),
        };

        let mut worst = 1;
        for kind in kinds {
            let entity = Entity {
                id: u64::MAX,
                x: self.world_width,
                y: self.world_height,
                radius: self.entity_max_radius,
                kind,
            };
            let size = bincode::serialized_size(&entity)
                .map_err(|e| ConfigError::Invalid(format!("cannot size entity: {}", e)))?;
            worst = worst.max(size as usize);
        }

        Ok((MAX_PACKET_SIZE - SNAPSHOT_HEADROOM) / worst)
    }

    pub fn world_size(&self) -> WorldSize {
        WorldSize::new(self.world_width, self.world_height)
    }

    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate as f64)
    }

    pub fn spawn_interval(&self) -> Duration {
        Duration::from_millis(self.spawn_interval_ms)
    }

    /// Level at `index`, falling back to the last configured level.
    pub fn level(&self, index: usize) -> &LevelConfig {
        let last = self.levels.len().saturating_sub(1);
        &self.levels[index.min(last)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = GameConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.levels.len(), 3);
        assert_eq!(config.world_size(), WorldSize::new(3000.0, 3000.0));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = GameConfig::from_toml(
            r#"
            mode = "investment"
            policy = "client_claim"
            tick_rate = 30
            "#,
        )
        .unwrap();

        assert_eq!(config.mode, GameMode::Investment);
        assert_eq!(config.policy, ConsumptionPolicy::ClientClaim);
        assert_eq!(config.tick_rate, 30);
        assert_eq!(config.avatar_speed, 5.0);
        assert_eq!(config.levels.len(), 3);
    }

    #[test]
    fn test_toml_levels() {
        let config = GameConfig::from_toml(
            r#"
            [[levels]]
            duration_secs = 10
            entity_count = 20

            [[levels]]
            duration_secs = 5
            entity_count = 40
            harmful_count = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.levels.len(), 2);
        assert_eq!(config.levels[0].harmful_count, 0);
        assert_eq!(config.level(1).entity_count, 40);
        assert_eq!(config.level(99).entity_count, 40);
    }

    #[test]
    fn test_rejects_empty_levels() {
        let result = GameConfig::from_toml("levels = []");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_harmful_over_target() {
        let mut config = GameConfig::default();
        config.levels[0].harmful_count = 301;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_start_radius_below_minimum() {
        let config = GameConfig {
            start_radius: 4.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_nan_values() {
        for field in ["absorption_ratio", "min_radius", "claim_bite_ratio", "avatar_speed"] {
            let result = GameConfig::from_toml(&format!("{} = nan", field));
            assert!(
                matches!(result, Err(ConfigError::Invalid(_))),
                "{} = nan was accepted",
                field
            );
        }
    }

    #[test]
    fn test_claim_bite_ratio_range() {
        for ratio in [0.0, -0.5, 1.5] {
            let config = GameConfig {
                claim_bite_ratio: ratio,
                ..Default::default()
            };
            assert!(config.validate().is_err(), "ratio {} was accepted", ratio);
        }
        let config = GameConfig {
            claim_bite_ratio: 1.0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_population_too_large_for_snapshot() {
        let mut config = GameConfig::default();
        config.levels[0].entity_count = 3000;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let limit = config.max_snapshot_entities().unwrap();
        config.levels[0].entity_count = limit;
        assert!(config.validate().is_ok());
        config.levels[0].entity_count = limit + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_investment_entities_are_larger_on_the_wire() {
        let food = GameConfig::default();
        let investment = GameConfig {
            mode: GameMode::Investment,
            ..Default::default()
        };
        let food_limit = food.max_snapshot_entities().unwrap();
        let investment_limit = investment.max_snapshot_entities().unwrap();

        assert!(investment_limit < food_limit);
        assert!(investment_limit >= 300);
    }

    #[test]
    fn test_rejects_malformed_toml() {
        let result = GameConfig::from_toml("tick_rate = \"fast\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_tick_duration() {
        let config = GameConfig {
            tick_rate: 50,
            ..Default::default()
        };
        assert_eq!(config.tick_duration(), Duration::from_millis(20));
        assert_eq!(config.spawn_interval(), Duration::from_millis(1000));
    }
}
