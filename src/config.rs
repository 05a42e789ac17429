//! Engine configuration: board shape, colours, gears, scoring and phase pacing.

use crate::error::ConfigError;
use crate::piece::PieceColor;
use serde::Deserialize;
use std::path::Path;

/// How long a matched gear group spins (ms).
pub const DEFAULT_SPIN_DURATION_MS: u64 = 2000;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub grid_size: usize,
    pub colors: Vec<PieceColor>,
    /// Chance (0..=100) that a new piece is a gear.
    pub gear_percentage: u8,
    pub match_length: usize,
    pub base_score: f64,
    pub base_multiplier: f64,
    /// Added to the multiplier per matched gear.
    pub gear_multiplier_bonus: f64,
    pub spin_duration_ms: u64,
    /// Delay after a shift before the first detect pass (front end pacing only).
    pub snap_ms: u64,
    /// Delay between cascade phases (front end pacing only).
    pub phase_delay_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            grid_size: 8,
            colors: PieceColor::ALL.to_vec(),
            gear_percentage: 20,
            match_length: 3,
            base_score: 100.0,
            base_multiplier: 1.0,
            gear_multiplier_bonus: 0.5,
            spin_duration_ms: DEFAULT_SPIN_DURATION_MS,
            snap_ms: 300,
            phase_delay_ms: 500,
        }
    }
}

impl EngineConfig {
    /// Reads a TOML file of config fields; missing fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let s = std::fs::read_to_string(path)?;
        Self::from_toml(&s)
    }

    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Rejects configurations under which a match-free board may be impossible.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid_size < 3 {
            return Err(ConfigError::GridTooSmall(self.grid_size));
        }
        if self.match_length < 3 {
            return Err(ConfigError::MatchLengthTooShort(self.match_length));
        }
        if self.match_length >= self.grid_size {
            return Err(ConfigError::MatchLengthNotBelowGridSize {
                match_length: self.match_length,
                grid_size: self.grid_size,
            });
        }
        for (i, c) in self.colors.iter().enumerate() {
            if self.colors[..i].contains(c) {
                return Err(ConfigError::DuplicateColor(c.name()));
            }
        }
        if self.colors.len() < self.match_length {
            return Err(ConfigError::TooFewColors {
                colors: self.colors.len(),
                match_length: self.match_length,
            });
        }
        if self.gear_percentage > 100 {
            return Err(ConfigError::GearPercentageOutOfRange(self.gear_percentage));
        }
        if !(self.base_score.is_finite() && self.base_score > 0.0) {
            return Err(ConfigError::NonPositiveBaseScore(self.base_score));
        }
        for (name, value) in [
            ("base_multiplier", self.base_multiplier),
            ("gear_multiplier_bonus", self.gear_multiplier_bonus),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidMultiplier { name, value });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn test_rejects_match_length_not_below_grid() {
        let cfg = EngineConfig {
            grid_size: 4,
            match_length: 4,
            ..EngineConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::MatchLengthNotBelowGridSize { .. })
        ));
    }

    #[test]
    fn test_rejects_too_few_colors() {
        let cfg = EngineConfig {
            colors: vec![PieceColor::Red, PieceColor::Blue],
            ..EngineConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::TooFewColors { .. })));
    }

    #[test]
    fn test_rejects_duplicate_colors() {
        let cfg = EngineConfig {
            colors: vec![PieceColor::Red, PieceColor::Blue, PieceColor::Red],
            ..EngineConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::DuplicateColor("red"))));
    }

    #[test]
    fn test_rejects_small_grid_and_short_match() {
        let small = EngineConfig {
            grid_size: 2,
            ..EngineConfig::default()
        };
        assert!(matches!(small.validate(), Err(ConfigError::GridTooSmall(2))));
        let short = EngineConfig {
            match_length: 2,
            ..EngineConfig::default()
        };
        assert!(matches!(short.validate(), Err(ConfigError::MatchLengthTooShort(2))));
    }

    #[test]
    fn test_rejects_bad_scoring() {
        let zero = EngineConfig {
            base_score: 0.0,
            ..EngineConfig::default()
        };
        assert!(matches!(zero.validate(), Err(ConfigError::NonPositiveBaseScore(_))));
        let nan = EngineConfig {
            gear_multiplier_bonus: f64::NAN,
            ..EngineConfig::default()
        };
        assert!(matches!(
            nan.validate(),
            Err(ConfigError::InvalidMultiplier { name: "gear_multiplier_bonus", .. })
        ));
        let gears = EngineConfig {
            gear_percentage: 101,
            ..EngineConfig::default()
        };
        assert!(matches!(gears.validate(), Err(ConfigError::GearPercentageOutOfRange(101))));
    }

    #[test]
    fn test_toml_overrides_some_fields() {
        let cfg = EngineConfig::from_toml(
            r#"
grid_size = 6
colors = ["red", "blue", "green", "yellow"]
gear_percentage = 35
"#,
        )
        .unwrap();
        assert_eq!(cfg.grid_size, 6);
        assert_eq!(cfg.colors.len(), 4);
        assert_eq!(cfg.gear_percentage, 35);
        assert_eq!(cfg.match_length, 3);
        assert_eq!(cfg.base_score, 100.0);
        cfg.validate().unwrap();
    }

    #[test]
    fn test_toml_unknown_field_is_an_error() {
        assert!(matches!(
            EngineConfig::from_toml("grid = 6"),
            Err(ConfigError::Parse(_))
        ));
    }
}
