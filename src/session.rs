//! Session: grid, score and the cascade state machine.
//!
//! A committed move runs `Detect → ClearAndScore → Refill → Detect → …` until a
//! detect pass finds nothing, then the session is back to `Idle`. Each call to
//! [`Session::advance`] runs exactly one phase so a front end can pace them;
//! [`Session::resolve`] runs them all at once.

use crate::config::EngineConfig;
use crate::error::{ConfigError, EngineError, MoveError};
use crate::events::GameEvent;
use crate::gears::{GearNetwork, update_gear_connections};
use crate::grid::{Axis, Grid};
use crate::matcher::{Match, MatchCell, find_matches, matched_cells};
use crate::piece::{PieceColor, PieceFactory, SpinDirection};
use log::{debug, info, warn};
use rand::Rng;
use std::collections::HashSet;
use std::time::Instant;

/// Full-board regenerations tried before repairing runs in place.
pub const INITIAL_FILL_ATTEMPTS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Detect,
    ClearAndScore,
    Refill,
}

/// A committed drag: shift one row or column by `delta` cells (sign is direction).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub axis: Axis,
    pub index: usize,
    pub delta: i32,
}

impl Move {
    pub fn row(index: usize, delta: i32) -> Self {
        Self {
            axis: Axis::Row,
            index,
            delta,
        }
    }

    pub fn column(index: usize, delta: i32) -> Self {
        Self {
            axis: Axis::Column,
            index,
            delta,
        }
    }
}

/// Outcome of one clear-and-score round.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundSummary {
    pub matched_cells: usize,
    pub gear_count: usize,
    pub round_score: u64,
    pub multiplier: f64,
}

/// One game: board, score and cascade state.
///
/// Events queue up until [`Session::drain_events`] is called. Only the latest
/// `GridChanged` snapshot is kept in the queue; older ones are superseded.
#[derive(Debug)]
pub struct Session {
    config: EngineConfig,
    grid: Grid,
    factory: PieceFactory,
    gears: GearNetwork,
    score: u64,
    move_count: u32,
    multiplier: f64,
    phase: Phase,
    pending: Vec<Match>,
    /// Cells cleared by the most recent round, with the pieces they held.
    last_cleared: Vec<MatchCell>,
    last_round: Option<RoundSummary>,
    events: Vec<GameEvent>,
}

impl Session {
    /// Validates `config` and deals a fresh, match-free board.
    pub fn new(config: EngineConfig, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        let factory = PieceFactory::new(config.colors.clone(), config.gear_percentage, seed);
        let mut session = Self {
            grid: Grid::new(config.grid_size),
            multiplier: config.base_multiplier,
            config,
            factory,
            gears: GearNetwork::default(),
            score: 0,
            move_count: 0,
            phase: Phase::Idle,
            pending: Vec::new(),
            last_cleared: Vec::new(),
            last_round: None,
            events: Vec::new(),
        };
        session.reset();
        Ok(session)
    }

    /// Session over a scripted board. `config.grid_size` is taken from the grid.
    /// The board is used as given: it may contain runs or empty cells, which the
    /// next cascade resolves.
    pub fn from_grid(mut config: EngineConfig, mut grid: Grid, seed: u64) -> Result<Self, ConfigError> {
        config.grid_size = grid.size();
        config.validate()?;
        let factory = PieceFactory::new(config.colors.clone(), config.gear_percentage, seed);
        let gears = update_gear_connections(&mut grid);
        Ok(Self {
            grid,
            multiplier: config.base_multiplier,
            config,
            factory,
            gears,
            score: 0,
            move_count: 0,
            phase: Phase::Idle,
            pending: Vec::new(),
            last_cleared: Vec::new(),
            last_round: None,
            events: Vec::new(),
        })
    }

    /// Zeroes score and moves and deals a new match-free board.
    pub fn reset(&mut self) {
        self.score = 0;
        self.move_count = 0;
        self.multiplier = self.config.base_multiplier;
        self.phase = Phase::Idle;
        self.pending.clear();
        self.last_cleared.clear();
        self.last_round = None;
        self.grid = deal_grid(&mut self.factory, self.config.grid_size, self.config.match_length);
        self.gears = update_gear_connections(&mut self.grid);
        info!(
            "new game: {0}x{0} board, {1} colours, {2}% gears",
            self.config.grid_size,
            self.config.colors.len(),
            self.config.gear_percentage
        );
        self.push_grid_changed();
    }

    /// Settings change: validate, then restart the session under the new config.
    pub fn apply_config(&mut self, config: EngineConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let seed = self.factory.rng().random::<u64>();
        self.factory = PieceFactory::new(config.colors.clone(), config.gear_percentage, seed);
        self.config = config;
        self.reset();
        Ok(())
    }

    /// No cascade phase pending and no gear still spinning at `now`.
    pub fn is_idle(&self, now: Instant) -> bool {
        self.phase == Phase::Idle && !self.grid.pieces().any(|p| p.spin_active(now))
    }

    /// Stops gears whose spin has run out. Returns how many stopped.
    pub fn tick(&mut self, now: Instant) -> usize {
        let stopped = self
            .grid
            .pieces_mut()
            .map(|p| p.expire_spin(now))
            .filter(|&stopped| stopped)
            .count();
        if stopped > 0 {
            self.push_grid_changed();
        }
        stopped
    }

    /// Applies a move and starts the cascade. Rejected moves leave the session untouched.
    pub fn submit_move(&mut self, mv: Move, now: Instant) -> Result<(), MoveError> {
        if !self.is_idle(now) {
            return Err(MoveError::Busy);
        }
        let size = self.grid.size();
        if mv.index >= size {
            return Err(MoveError::IndexOutOfRange {
                axis: mv.axis,
                index: mv.index,
                size,
            });
        }
        if i64::from(mv.delta).rem_euclid(size as i64) == 0 {
            return Err(MoveError::NoDisplacement);
        }

        self.tick(now);
        self.grid.shift(mv.axis, mv.index, mv.delta);
        self.gears = update_gear_connections(&mut self.grid);
        self.move_count += 1;
        self.phase = Phase::Detect;
        debug!("move {}: {} {} by {}", self.move_count, mv.axis, mv.index, mv.delta);
        self.push_grid_changed();
        Ok(())
    }

    /// Runs the current phase and returns the phase that follows.
    pub fn advance(&mut self, now: Instant) -> Phase {
        self.phase = match self.phase {
            Phase::Idle => Phase::Idle,
            Phase::Detect => self.detect(),
            Phase::ClearAndScore => {
                self.clear_and_score(now);
                Phase::Refill
            }
            Phase::Refill => {
                self.refill();
                Phase::Detect
            }
        };
        self.phase
    }

    /// Runs phases until idle. Returns the number of detect passes.
    pub fn resolve(&mut self, now: Instant) -> usize {
        let mut passes = 0;
        while self.phase != Phase::Idle {
            if self.phase == Phase::Detect {
                passes += 1;
            }
            self.advance(now);
        }
        passes
    }

    /// Submits a move and resolves its cascade in one go.
    pub fn play_move(&mut self, mv: Move, now: Instant) -> Result<usize, MoveError> {
        self.submit_move(mv, now)?;
        Ok(self.resolve(now))
    }

    /// Promotes or demotes random pieces until `pct`% of the board are gears.
    /// Only allowed while idle; future pieces use the new percentage too.
    pub fn set_gear_percentage(&mut self, pct: u8, now: Instant) -> Result<(), MoveError> {
        if !self.is_idle(now) {
            return Err(MoveError::Busy);
        }
        let pct = pct.min(100);
        self.factory.set_gear_percentage(pct);
        self.config.gear_percentage = pct;

        let n = self.grid.size();
        let slots = self.grid.pieces().count();
        let target = (n * n * usize::from(pct) / 100).min(slots);
        let mut count = self.grid.pieces().filter(|p| p.is_gear).count();
        while count != target {
            let x = self.factory.rng().random_range(0..n);
            let y = self.factory.rng().random_range(0..n);
            let Some(piece) = self.grid.get_mut(x, y) else {
                continue;
            };
            if count < target && !piece.is_gear {
                piece.is_gear = true;
                count += 1;
            } else if count > target && piece.is_gear {
                piece.demote();
                count -= 1;
            }
        }

        self.gears = update_gear_connections(&mut self.grid);
        info!("gear percentage set to {pct}% ({target} gears)");
        self.push_grid_changed();
        Ok(())
    }

    /// Pending events, oldest first.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Queues a snapshot of the board, replacing any undrained one.
    fn push_grid_changed(&mut self) {
        self.events.retain(|e| !matches!(e, GameEvent::GridChanged(_)));
        self.events.push(GameEvent::GridChanged(self.grid.snapshot()));
    }

    fn detect(&mut self) -> Phase {
        if !self.grid.is_full() {
            for (x, y) in self.grid.coords() {
                if self.grid.get(x, y).is_none() {
                    warn!("{}; refilling", EngineError::EmptyCell { x, y });
                }
            }
            self.refill();
        }

        let matches = find_matches(&self.grid, self.config.match_length);
        if matches.is_empty() {
            debug!("settled: score {}, moves {}", self.score, self.move_count);
            self.events.push(GameEvent::MoveSettled {
                score: self.score,
                move_count: self.move_count,
            });
            return Phase::Idle;
        }
        debug!("detected {} matches", matches.len());
        self.pending = matches;
        Phase::ClearAndScore
    }

    fn clear_and_score(&mut self, now: Instant) -> RoundSummary {
        let cells = matched_cells(&self.pending);
        self.pending.clear();

        let duration_ms = self.config.spin_duration_ms;
        let mut spun = HashSet::new();
        let mut started: Vec<((usize, usize), SpinDirection)> = Vec::new();
        for cell in cells.iter().filter(|c| c.piece.is_gear) {
            for (gx, gy) in self.gears.connected_group(&self.grid, cell.x, cell.y) {
                if !spun.insert((gx, gy)) {
                    continue;
                }
                if let Some(piece) = self.grid.get_mut(gx, gy) {
                    piece.start_spin(now, duration_ms);
                    let dir = piece.direction.unwrap_or(SpinDirection::for_cell(gx, gy));
                    started.push(((gx, gy), dir));
                }
            }
        }
        for direction in [SpinDirection::Clockwise, SpinDirection::CounterClockwise] {
            let group: Vec<(usize, usize)> = started
                .iter()
                .filter(|(_, d)| *d == direction)
                .map(|(c, _)| *c)
                .collect();
            if !group.is_empty() {
                self.events.push(GameEvent::GearSpinStarted {
                    cells: group,
                    direction,
                    duration_ms,
                });
            }
        }

        let gear_count = cells.iter().filter(|c| c.piece.is_gear).count();
        let summary = score_round(&self.config, cells.len(), gear_count);
        self.multiplier = summary.multiplier;
        self.score += summary.round_score;
        debug!(
            "cleared {} cells ({} gears): +{} at x{:.1}",
            summary.matched_cells, summary.gear_count, summary.round_score, summary.multiplier
        );
        self.events.push(GameEvent::MatchResolved {
            matched_cells: summary.matched_cells,
            gear_count: summary.gear_count,
            round_score: summary.round_score,
            multiplier: summary.multiplier,
        });

        for cell in &cells {
            self.grid.set(cell.x, cell.y, None);
        }
        self.last_cleared = cells;
        self.last_round = Some(summary);
        summary
    }

    /// Gravity then top-up, column by column. Returns true if any cell changed.
    fn refill(&mut self) -> bool {
        let mut changed = false;
        for x in 0..self.grid.size() {
            let empty = self.grid.collapse_column(x);
            for y in 0..empty {
                self.grid.set(x, y, Some(self.factory.create_piece()));
            }
            changed |= empty > 0;
        }
        if changed {
            self.gears = update_gear_connections(&mut self.grid);
            self.push_grid_changed();
        }
        changed
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn gears(&self) -> &GearNetwork {
        &self.gears
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn move_count(&self) -> u32 {
        self.move_count
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn last_cleared(&self) -> &[MatchCell] {
        &self.last_cleared
    }

    pub fn last_round(&self) -> Option<RoundSummary> {
        self.last_round
    }
}

/// `multiplier = base + gears * bonus`, `score = round(base_score * cells * multiplier)`.
pub fn score_round(config: &EngineConfig, matched_cells: usize, gear_count: usize) -> RoundSummary {
    let multiplier = config.base_multiplier + gear_count as f64 * config.gear_multiplier_bonus;
    let round_score = (config.base_score * matched_cells as f64 * multiplier).round() as u64;
    RoundSummary {
        matched_cells,
        gear_count,
        round_score,
        multiplier,
    }
}

/// Random board with no runs: regenerate up to [`INITIAL_FILL_ATTEMPTS`] times, then repair.
fn deal_grid(factory: &mut PieceFactory, size: usize, match_length: usize) -> Grid {
    let mut grid = Grid::filled_with(size, || factory.create_piece());
    let mut attempts = 0;
    while !find_matches(&grid, match_length).is_empty() && attempts < INITIAL_FILL_ATTEMPTS {
        grid = Grid::filled_with(size, || factory.create_piece());
        attempts += 1;
    }
    if !find_matches(&grid, match_length).is_empty() {
        warn!("no match-free board after {INITIAL_FILL_ATTEMPTS} deals; recolouring runs");
        break_runs(&mut grid, match_length, factory);
    } else {
        debug!("dealt board after {attempts} regenerations");
    }
    grid
}

/// Recolours, in row-major order, every piece that would complete a run with the
/// pieces to its left or above. Needs at least three colours.
fn break_runs(grid: &mut Grid, match_length: usize, factory: &mut PieceFactory) {
    let colors = factory.colors().to_vec();
    for (x, y) in grid.coords() {
        let Some(color) = grid.get(x, y).map(|p| p.color) else {
            continue;
        };
        let left = run_color(grid, (1..match_length).map(|d| x.checked_sub(d).map(|lx| (lx, y))));
        let up = run_color(grid, (1..match_length).map(|d| y.checked_sub(d).map(|uy| (x, uy))));
        if left != Some(color) && up != Some(color) {
            continue;
        }
        let allowed: Vec<PieceColor> = colors
            .iter()
            .copied()
            .filter(|c| Some(*c) != left && Some(*c) != up)
            .collect();
        if allowed.is_empty() {
            continue;
        }
        let pick = allowed[factory.rng().random_range(0..allowed.len())];
        if let Some(piece) = grid.get_mut(x, y) {
            piece.color = pick;
        }
    }
}

/// The shared colour of a line of cells, if every cell exists and they all agree.
fn run_color(grid: &Grid, cells: impl Iterator<Item = Option<(usize, usize)>>) -> Option<PieceColor> {
    let mut shared = None;
    for cell in cells {
        let (x, y) = cell?;
        let color = grid.get(x, y)?.color;
        match shared {
            None => shared = Some(color),
            Some(c) if c == color => {}
            Some(_) => return None,
        }
    }
    shared
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridSnapshot;
    use std::time::Duration;

    /// 8x8 board with no runs: colour index (x + 2y) mod 6.
    fn diagonal_rows(size: usize) -> Vec<String> {
        (0..size)
            .map(|y| {
                (0..size)
                    .map(|x| PieceColor::ALL[(x + 2 * y) % 6].letter())
                    .collect()
            })
            .collect()
    }

    fn grid_from(rows: &[String]) -> Grid {
        let refs: Vec<&str> = rows.iter().map(String::as_str).collect();
        Grid::from_rows(&refs).unwrap()
    }

    /// Diagonal board with row 0 starting R r R (one gear in a run of three reds).
    fn one_gear_match() -> Grid {
        let mut rows = diagonal_rows(8);
        rows[0].replace_range(0..3, "RrR");
        grid_from(&rows)
    }

    fn scoring_config() -> EngineConfig {
        EngineConfig {
            grid_size: 8,
            match_length: 3,
            base_score: 100.0,
            base_multiplier: 1.0,
            gear_multiplier_bonus: 0.5,
            gear_percentage: 0,
            ..EngineConfig::default()
        }
    }

    #[test]
    fn test_diagonal_board_has_no_runs() {
        assert!(find_matches(&grid_from(&diagonal_rows(8)), 3).is_empty());
    }

    #[test]
    fn test_reset_leaves_no_matches() {
        for seed in 0..20 {
            let s = Session::new(EngineConfig::default(), seed).unwrap();
            assert!(s.grid().is_full());
            assert!(find_matches(s.grid(), 3).is_empty(), "seed {seed}");
            assert_eq!(s.score(), 0);
            assert_eq!(s.move_count(), 0);
            assert_eq!(s.phase(), Phase::Idle);
        }
    }

    #[test]
    fn test_reset_with_three_colours_still_match_free() {
        let cfg = EngineConfig {
            grid_size: 10,
            colors: vec![PieceColor::Red, PieceColor::Green, PieceColor::Blue],
            ..EngineConfig::default()
        };
        for seed in 0..5 {
            let s = Session::new(cfg.clone(), seed).unwrap();
            assert!(find_matches(s.grid(), 3).is_empty());
        }
    }

    #[test]
    fn test_break_runs_clears_a_monochrome_board() {
        let mut grid = Grid::from_rows(&["RRRRRR"; 6]).unwrap();
        let mut factory = PieceFactory::new(
            vec![PieceColor::Red, PieceColor::Green, PieceColor::Blue],
            0,
            3,
        );
        break_runs(&mut grid, 3, &mut factory);
        assert!(find_matches(&grid, 3).is_empty());
        assert!(grid.is_full());
    }

    #[test]
    fn test_invalid_config_rejected_before_dealing() {
        let cfg = EngineConfig {
            grid_size: 3,
            match_length: 3,
            ..EngineConfig::default()
        };
        assert!(Session::new(cfg, 0).is_err());
    }

    #[test]
    fn test_scoring_one_gear_in_three() {
        let now = Instant::now();
        let mut s = Session::from_grid(scoring_config(), one_gear_match(), 1).unwrap();
        s.phase = Phase::Detect;
        assert_eq!(s.advance(now), Phase::ClearAndScore);
        assert_eq!(s.advance(now), Phase::Refill);

        let round = s.last_round().unwrap();
        assert_eq!(round.matched_cells, 3);
        assert_eq!(round.gear_count, 1);
        assert!((round.multiplier - 1.5).abs() < 1e-9);
        assert_eq!(round.round_score, 450);
        assert_eq!(s.score(), 450);
        assert!((s.multiplier() - 1.5).abs() < 1e-9);
        for x in 0..3 {
            assert!(s.grid().get(x, 0).is_none());
        }
        let resolved = s
            .drain_events()
            .into_iter()
            .find(|e| matches!(e, GameEvent::MatchResolved { .. }));
        assert_eq!(
            resolved,
            Some(GameEvent::MatchResolved {
                matched_cells: 3,
                gear_count: 1,
                round_score: 450,
                multiplier: 1.5,
            })
        );
    }

    #[test]
    fn test_score_round_formula() {
        let cfg = scoring_config();
        let r = score_round(&cfg, 5, 0);
        assert_eq!(r.round_score, 500);
        let r = score_round(&cfg, 4, 3);
        assert!((r.multiplier - 2.5).abs() < 1e-9);
        assert_eq!(r.round_score, 1000);
    }

    #[test]
    fn test_matched_gear_spins_linked_group() {
        let now = Instant::now();
        let mut rows = diagonal_rows(8);
        rows[0].replace_range(0..3, "RrR");
        // (1, 1) is a gear below the matched gear; (1, 2) extends the chain.
        rows[1].replace_range(1..2, "y");
        rows[2].replace_range(1..2, "o");
        let mut s = Session::from_grid(scoring_config(), grid_from(&rows), 2).unwrap();
        assert_eq!(s.gears().edges.len(), 2);

        s.phase = Phase::Detect;
        s.advance(now);
        s.advance(now);

        assert!(s.grid().get(1, 1).unwrap().spinning);
        assert!(s.grid().get(1, 2).unwrap().spinning);
        assert_eq!(s.last_round().unwrap().gear_count, 1);

        let spins: Vec<_> = s
            .drain_events()
            .into_iter()
            .filter_map(|e| match e {
                GameEvent::GearSpinStarted { cells, direction, duration_ms } => {
                    Some((cells, direction, duration_ms))
                }
                _ => None,
            })
            .collect();
        assert_eq!(spins.len(), 2);
        let all: usize = spins.iter().map(|(c, _, _)| c.len()).sum();
        assert_eq!(all, 3);
        assert!(spins.iter().all(|(_, _, d)| *d == 2000));
        let (cw, _, _) = spins
            .iter()
            .find(|(_, d, _)| *d == SpinDirection::Clockwise)
            .unwrap();
        assert!(cw.contains(&(1, 1)));
    }

    #[test]
    fn test_spinning_gears_block_moves_until_expired() {
        let now = Instant::now();
        let mut rows = diagonal_rows(8);
        rows[0].replace_range(0..3, "RrR");
        rows[1].replace_range(1..2, "y");
        let mut s = Session::from_grid(scoring_config(), grid_from(&rows), 3).unwrap();
        s.phase = Phase::Detect;
        s.resolve(now);
        assert_eq!(s.phase(), Phase::Idle);

        assert!(!s.is_idle(now + Duration::from_millis(500)));
        assert_eq!(
            s.submit_move(Move::row(4, 1), now + Duration::from_millis(500)),
            Err(MoveError::Busy)
        );

        let later = now + Duration::from_millis(2500);
        assert!(s.is_idle(later));
        assert!(s.tick(later) >= 1);
        assert!(s.grid().pieces().all(|p| !p.spinning));
        assert!(s.submit_move(Move::row(4, 1), later).is_ok());
    }

    #[test]
    fn test_invalid_moves_are_noops() {
        let now = Instant::now();
        let mut s = Session::new(EngineConfig::default(), 11).unwrap();
        let before = s.grid().clone();
        assert_eq!(
            s.submit_move(Move::row(8, 1), now),
            Err(MoveError::IndexOutOfRange {
                axis: Axis::Row,
                index: 8,
                size: 8
            })
        );
        assert_eq!(s.submit_move(Move::column(2, 0), now), Err(MoveError::NoDisplacement));
        assert_eq!(s.submit_move(Move::column(2, -16), now), Err(MoveError::NoDisplacement));
        assert_eq!(s.grid(), &before);
        assert_eq!(s.move_count(), 0);
        assert_eq!(s.phase(), Phase::Idle);
    }

    #[test]
    fn test_moves_rejected_mid_cascade() {
        let now = Instant::now();
        let mut s = Session::new(EngineConfig::default(), 5).unwrap();
        s.submit_move(Move::row(0, 1), now).unwrap();
        assert_eq!(s.phase(), Phase::Detect);
        assert!(!s.is_idle(now));
        assert_eq!(s.submit_move(Move::row(1, 1), now), Err(MoveError::Busy));
        assert_eq!(s.move_count(), 1);
    }

    #[test]
    fn test_play_move_settles_and_reports() {
        let now = Instant::now();
        let mut s = Session::new(EngineConfig::default(), 21).unwrap();
        s.drain_events();
        let passes = s.play_move(Move::column(3, -2), now).unwrap();
        assert!(passes >= 1);
        assert_eq!(s.phase(), Phase::Idle);
        assert!(s.grid().is_full());
        assert!(find_matches(s.grid(), 3).is_empty());

        let events = s.drain_events();
        let snapshots: Vec<&GridSnapshot> = events
            .iter()
            .filter_map(|e| match e {
                GameEvent::GridChanged(snap) => Some(snap),
                _ => None,
            })
            .collect();
        assert_eq!(snapshots.len(), 1);
        let snap = snapshots[0];
        for (x, y) in s.grid().coords() {
            assert_eq!(snap.get(x, y).map(|c| c.color), s.grid().get(x, y).map(|p| p.color));
        }
        assert_eq!(
            s.gears(),
            &update_gear_connections(&mut s.grid().clone()),
            "gear network is stale after the cascade"
        );
        assert_eq!(
            events.last(),
            Some(&GameEvent::MoveSettled {
                score: s.score(),
                move_count: 1
            })
        );
    }

    #[test]
    fn test_undrained_snapshots_do_not_pile_up() {
        let now = Instant::now();
        let mut s = Session::new(EngineConfig::default(), 5).unwrap();
        for i in 0..6 {
            s.play_move(Move::row(i, 1), now + Duration::from_secs(10 * i as u64)).unwrap();
        }
        let events = s.drain_events();
        let snapshots = events
            .iter()
            .filter(|e| matches!(e, GameEvent::GridChanged(_)))
            .count();
        assert_eq!(snapshots, 1);
        let settled = events
            .iter()
            .filter(|e| matches!(e, GameEvent::MoveSettled { .. }))
            .count();
        assert_eq!(settled, 6);
        assert_eq!(events.last(), Some(&GameEvent::MoveSettled { score: s.score(), move_count: 6 }));
    }

    #[test]
    fn test_cascade_terminates_from_monochrome_board() {
        let now = Instant::now();
        let cfg = EngineConfig {
            gear_percentage: 20,
            spin_duration_ms: 0,
            ..EngineConfig::default()
        };
        let grid = Grid::from_rows(&["RRRRR"; 5]).unwrap();
        let mut s = Session::from_grid(cfg, grid, 8).unwrap();
        s.phase = Phase::Detect;
        let passes = s.resolve(now);
        assert!(passes >= 2);
        assert!(passes < 500, "cascade took {passes} passes");
        assert!(s.grid().is_full());
        assert!(find_matches(s.grid(), 3).is_empty());
        assert_eq!(s.gears(), &update_gear_connections(&mut s.grid().clone()));
        // First round clears all 25 cells at base multiplier.
        assert!(s.score() >= 2500);
    }

    #[test]
    fn test_empty_cell_is_refilled_on_detect() {
        let now = Instant::now();
        let mut grid = grid_from(&diagonal_rows(8));
        grid.set(4, 4, None);
        let mut s = Session::from_grid(scoring_config(), grid, 4).unwrap();
        s.phase = Phase::Detect;
        s.resolve(now);
        assert!(s.grid().is_full());
    }

    #[test]
    fn test_refill_applies_gravity_before_top_up() {
        let now = Instant::now();
        let mut grid = grid_from(&diagonal_rows(8));
        let below = *grid.get(2, 5).unwrap();
        let above = *grid.get(2, 4).unwrap();
        grid.set(2, 6, None);
        grid.set(2, 7, None);
        let mut s = Session::from_grid(scoring_config(), grid, 6).unwrap();
        s.phase = Phase::Refill;
        s.advance(now);
        assert_eq!(s.grid().get(2, 7).unwrap().color, below.color);
        assert_eq!(s.grid().get(2, 6).unwrap().color, above.color);
        assert!(s.grid().is_full());
    }

    #[test]
    fn test_set_gear_percentage_hits_target() {
        let now = Instant::now();
        let mut s = Session::new(EngineConfig::default(), 9).unwrap();
        s.set_gear_percentage(50, now).unwrap();
        assert_eq!(s.grid().pieces().filter(|p| p.is_gear).count(), 32);
        s.set_gear_percentage(0, now).unwrap();
        assert_eq!(s.grid().pieces().filter(|p| p.is_gear).count(), 0);
        assert!(s.gears().edges.is_empty());
        assert!(s.grid().pieces().all(|p| !p.rotating && p.direction.is_none()));
        assert_eq!(s.config().gear_percentage, 0);
    }

    #[test]
    fn test_apply_config_resets_with_new_size() {
        let now = Instant::now();
        let mut s = Session::new(EngineConfig::default(), 12).unwrap();
        s.play_move(Move::row(2, 3), now).unwrap();
        let cfg = EngineConfig {
            grid_size: 6,
            ..EngineConfig::default()
        };
        s.apply_config(cfg).unwrap();
        assert_eq!(s.grid().size(), 6);
        assert_eq!(s.score(), 0);
        assert_eq!(s.move_count(), 0);
        assert!(find_matches(s.grid(), 3).is_empty());

        let bad = EngineConfig {
            colors: vec![PieceColor::Red],
            ..EngineConfig::default()
        };
        assert!(s.apply_config(bad).is_err());
        assert_eq!(s.grid().size(), 6);
    }

    #[test]
    fn test_same_seed_same_game() {
        let now = Instant::now();
        let mut a = Session::new(EngineConfig::default(), 77).unwrap();
        let mut b = Session::new(EngineConfig::default(), 77).unwrap();
        assert_eq!(a.grid(), b.grid());
        a.play_move(Move::row(1, 2), now).unwrap();
        b.play_move(Move::row(1, 2), now).unwrap();
        assert_eq!(a.score(), b.score());
        assert_eq!(a.grid(), b.grid());
    }
}
