//! Tunable battle constants.
//!
//! Damage, health growth and probability gates are configuration data. The
//! defaults reproduce the reference game; a RON file can override any subset.

use crate::errors::ConfigError;
use schema::EvolutionStage;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Growth applied on a level-up for a given evolution stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageGrowth {
    /// Experience needed before `level_up_check` grants a level
    pub xp_threshold: u32,
    /// Flat increase to maximum health per level
    pub health_increase: u32,
    /// Flat increase to every known move's damage per level
    pub attack_increase: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionConfig {
    pub xp_per_knockout: u32,
    /// Reaching this level evolves any species with a next stage
    pub evolution_level: u32,
    pub base: StageGrowth,
    pub second: StageGrowth,
    #[serde(rename = "final")]
    pub final_stage: StageGrowth,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            xp_per_knockout: 10,
            evolution_level: 4,
            base: StageGrowth {
                xp_threshold: 30,
                health_increase: 10,
                attack_increase: 5,
            },
            second: StageGrowth {
                xp_threshold: 40,
                health_increase: 15,
                attack_increase: 4,
            },
            final_stage: StageGrowth {
                xp_threshold: 50,
                health_increase: 15,
                attack_increase: 4,
            },
        }
    }
}

impl ProgressionConfig {
    pub fn growth(&self, stage: EvolutionStage) -> &StageGrowth {
        match stage {
            EvolutionStage::Base => &self.base,
            EvolutionStage::Second => &self.second,
            EvolutionStage::Final => &self.final_stage,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    /// Chance that the player's declared dodge avoids the next enemy attack
    pub player_dodge_chance: f64,
    /// Chance that the wild Pokémon's declared dodge avoids the next player attack
    pub opponent_dodge_chance: f64,
    pub run_chance: f64,
    /// Delay between the player's action and the enemy's response
    pub enemy_response_secs: f64,
    pub progression: ProgressionConfig,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            player_dodge_chance: 0.5,
            opponent_dodge_chance: 0.5,
            run_chance: 0.7,
            enemy_response_secs: 3.0,
            progression: ProgressionConfig::default(),
        }
    }
}

impl BattleConfig {
    /// Parse and validate a RON config.
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a RON file. Fields missing from the file keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_ron_str(&text)
    }

    /// Probabilities must lie in `[0, 1]` and the response delay must be a
    /// finite, non-negative number of seconds that fits in a `Duration`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("player_dodge_chance", self.player_dodge_chance),
            ("opponent_dodge_chance", self.opponent_dodge_chance),
            ("run_chance", self.run_chance),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("{} is not a probability in [0, 1]", value),
                });
            }
        }

        let secs = self.enemy_response_secs;
        if secs < 0.0 || Duration::try_from_secs_f64(secs).is_err() {
            return Err(ConfigError::Invalid {
                field: "enemy_response_secs",
                reason: format!("{} is not a representable delay in seconds", secs),
            });
        }
        Ok(())
    }

    /// Out-of-range delays on a config that skipped `validate` saturate
    /// instead of panicking.
    pub fn enemy_response_time(&self) -> Duration {
        Duration::try_from_secs_f64(self.enemy_response_secs.max(0.0)).unwrap_or(Duration::MAX)
    }
}
