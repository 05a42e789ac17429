//! Cogtui engine: a match-3 board whose rows and columns shift with wrap-around,
//! where linked gears spin together and raise the score multiplier.

pub mod config;
pub mod error;
pub mod events;
pub mod gears;
pub mod grid;
pub mod matcher;
pub mod piece;
pub mod session;

pub use config::EngineConfig;
pub use error::{ConfigError, EngineError, MoveError};
pub use events::GameEvent;
pub use gears::{GearEdge, GearGroup, GearNetwork, find_connected_group, update_gear_connections};
pub use grid::{Axis, Grid, GridSnapshot};
pub use matcher::{Match, find_matches};
pub use piece::{Piece, PieceColor, PieceFactory, SpinDirection, create_piece};
pub use session::{Move, Phase, RoundSummary, Session};
