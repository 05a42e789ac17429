//! Events the session emits for the front end.

use crate::grid::GridSnapshot;
use crate::piece::SpinDirection;

#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// Cascade finished; the board is stable again.
    MoveSettled { score: u64, move_count: u32 },
    /// One clear-and-score round.
    MatchResolved {
        matched_cells: usize,
        gear_count: usize,
        round_score: u64,
        multiplier: f64,
    },
    /// Gears that started spinning together, all sharing one direction.
    GearSpinStarted {
        cells: Vec<(usize, usize)>,
        direction: SpinDirection,
        duration_ms: u64,
    },
    GridChanged(GridSnapshot),
}
