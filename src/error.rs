//! Error taxonomy: rejected moves, internal invariant violations, bad configuration.

use crate::grid::Axis;
use thiserror::Error;

/// A committed move that the engine refused. The session is left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("board is busy (cascade, shift or gear spin in progress)")]
    Busy,
    #[error("{axis} index {index} out of range for grid size {size}")]
    IndexOutOfRange { axis: Axis, index: usize, size: usize },
    #[error("shift does not displace any piece")]
    NoDisplacement,
}

/// Internal invariant violations. Logged and healed locally, never fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("gear expected at ({x}, {y}) but the cell holds no gear")]
    MissingGear { x: usize, y: usize },
    #[error("cell ({x}, {y}) is empty outside of a cascade")]
    EmptyCell { x: usize, y: usize },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("grid size {0} is below the minimum of 3")]
    GridTooSmall(usize),
    #[error("match length {0} is below the minimum of 3")]
    MatchLengthTooShort(usize),
    #[error("match length {match_length} must be smaller than grid size {grid_size}")]
    MatchLengthNotBelowGridSize { match_length: usize, grid_size: usize },
    #[error("{colors} colors cannot avoid runs of {match_length}")]
    TooFewColors { colors: usize, match_length: usize },
    #[error("color {0} listed more than once")]
    DuplicateColor(&'static str),
    #[error("gear percentage {0} outside 0..=100")]
    GearPercentageOutOfRange(u8),
    #[error("base score must be positive, got {0}")]
    NonPositiveBaseScore(f64),
    #[error("{name} must be finite and non-negative, got {value}")]
    InvalidMultiplier { name: &'static str, value: f64 },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
}
