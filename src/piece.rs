//! Pieces and the random piece factory.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rand_chacha::rand_core::SeedableRng;
use serde::Deserialize;
use std::time::{Duration, Instant};

/// Piece colour labels. A session plays with a subset of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PieceColor {
    Red,
    Blue,
    Green,
    Yellow,
    Purple,
    Orange,
}

impl PieceColor {
    pub const ALL: [Self; 6] = [
        Self::Red,
        Self::Blue,
        Self::Green,
        Self::Yellow,
        Self::Purple,
        Self::Orange,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Blue => "blue",
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Purple => "purple",
            Self::Orange => "orange",
        }
    }

    /// Stable index 0..6, used by the theme palette.
    pub fn index(&self) -> u8 {
        match self {
            Self::Red => 0,
            Self::Blue => 1,
            Self::Green => 2,
            Self::Yellow => 3,
            Self::Purple => 4,
            Self::Orange => 5,
        }
    }

    /// Single-letter label used by text grid layouts.
    pub fn letter(&self) -> char {
        match self {
            Self::Red => 'R',
            Self::Blue => 'B',
            Self::Green => 'G',
            Self::Yellow => 'Y',
            Self::Purple => 'P',
            Self::Orange => 'O',
        }
    }

    pub fn from_letter(c: char) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|color| color.letter() == c.to_ascii_uppercase())
    }
}

/// Gear spin direction. Assigned by board position, not by piece identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpinDirection {
    Clockwise,
    CounterClockwise,
}

impl SpinDirection {
    /// Checkerboard rule: (x + y) even spins clockwise.
    #[inline]
    pub fn for_cell(x: usize, y: usize) -> Self {
        if (x + y) % 2 == 0 {
            Self::Clockwise
        } else {
            Self::CounterClockwise
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece {
    pub color: PieceColor,
    pub is_gear: bool,
    /// Member of a gear group of size >= 2.
    pub rotating: bool,
    /// Spinning because a gear in its group was matched.
    pub spinning: bool,
    pub direction: Option<SpinDirection>,
    pub spin_started_at: Option<Instant>,
    pub spin_duration_ms: u64,
}

impl Piece {
    pub fn new(color: PieceColor, is_gear: bool) -> Self {
        Self {
            color,
            is_gear,
            rotating: false,
            spinning: false,
            direction: None,
            spin_started_at: None,
            spin_duration_ms: 0,
        }
    }

    pub fn start_spin(&mut self, now: Instant, duration_ms: u64) {
        self.spinning = true;
        self.spin_started_at = Some(now);
        self.spin_duration_ms = duration_ms;
    }

    /// Spinning and the spin has not yet run its full duration at `now`.
    pub fn spin_active(&self, now: Instant) -> bool {
        self.spinning
            && self.spin_started_at.is_some_and(|t| {
                now.saturating_duration_since(t) < Duration::from_millis(self.spin_duration_ms)
            })
    }

    /// Clears the spin once its duration has elapsed. Returns true if the piece stopped.
    pub fn expire_spin(&mut self, now: Instant) -> bool {
        if !self.spinning {
            return false;
        }
        let done = !self.spin_active(now);
        if done {
            self.spinning = false;
            self.spin_started_at = None;
        }
        done
    }

    /// Fraction of the spin elapsed (0.0..=1.0); 0.0 when not spinning.
    pub fn spin_progress(&self, now: Instant) -> f64 {
        match (self.spinning, self.spin_started_at) {
            (true, Some(t)) if self.spin_duration_ms > 0 => {
                let elapsed = now.saturating_duration_since(t).as_millis() as f64;
                (elapsed / self.spin_duration_ms as f64).min(1.0)
            }
            _ => 0.0,
        }
    }

    /// Turns the piece into a plain coloured piece, dropping all gear state.
    pub fn demote(&mut self) {
        self.is_gear = false;
        self.rotating = false;
        self.spinning = false;
        self.direction = None;
        self.spin_started_at = None;
        self.spin_duration_ms = 0;
    }
}

/// Draws one random piece: uniform colour, gear when a draw in [0, 100) is below the percentage.
pub fn create_piece<R: Rng>(rng: &mut R, colors: &[PieceColor], gear_percentage: u8) -> Piece {
    let color = colors[rng.random_range(0..colors.len())];
    let is_gear = rng.random_range(0.0..100.0) < f64::from(gear_percentage);
    Piece::new(color, is_gear)
}

/// Seeded piece source for one session.
#[derive(Debug, Clone)]
pub struct PieceFactory {
    rng: ChaCha8Rng,
    colors: Vec<PieceColor>,
    gear_percentage: u8,
}

impl PieceFactory {
    /// `colors` must be non-empty; the session validates this before building a factory.
    pub fn new(colors: Vec<PieceColor>, gear_percentage: u8, seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            colors,
            gear_percentage,
        }
    }

    pub fn create_piece(&mut self) -> Piece {
        create_piece(&mut self.rng, &self.colors, self.gear_percentage)
    }

    pub fn colors(&self) -> &[PieceColor] {
        &self.colors
    }

    pub fn gear_percentage(&self) -> u8 {
        self.gear_percentage
    }

    pub fn set_gear_percentage(&mut self, pct: u8) {
        self.gear_percentage = pct.min(100);
    }

    /// Shared RNG for other session-level random choices (gear rebalancing, repairs).
    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_percent_never_makes_gears() {
        let mut f = PieceFactory::new(PieceColor::ALL.to_vec(), 0, 7);
        assert!((0..500).all(|_| !f.create_piece().is_gear));
    }

    #[test]
    fn test_hundred_percent_always_makes_gears() {
        let mut f = PieceFactory::new(PieceColor::ALL.to_vec(), 100, 7);
        assert!((0..500).all(|_| f.create_piece().is_gear));
    }

    #[test]
    fn test_colors_come_from_the_set() {
        let colors = vec![PieceColor::Red, PieceColor::Orange];
        let mut f = PieceFactory::new(colors.clone(), 20, 1);
        for _ in 0..200 {
            let p = f.create_piece();
            assert!(colors.contains(&p.color));
            assert!(!p.rotating && !p.spinning);
            assert_eq!(p.direction, None);
        }
    }

    #[test]
    fn test_same_seed_same_pieces() {
        let mut a = PieceFactory::new(PieceColor::ALL.to_vec(), 30, 99);
        let mut b = PieceFactory::new(PieceColor::ALL.to_vec(), 30, 99);
        for _ in 0..50 {
            assert_eq!(a.create_piece(), b.create_piece());
        }
    }

    #[test]
    fn test_checkerboard_direction() {
        assert_eq!(SpinDirection::for_cell(0, 0), SpinDirection::Clockwise);
        assert_eq!(SpinDirection::for_cell(1, 0), SpinDirection::CounterClockwise);
        assert_eq!(SpinDirection::for_cell(3, 5), SpinDirection::Clockwise);
    }

    #[test]
    fn test_spin_expires_after_duration() {
        let start = Instant::now();
        let mut p = Piece::new(PieceColor::Red, true);
        p.start_spin(start, 2000);
        assert!(!p.expire_spin(start + Duration::from_millis(1999)));
        assert!(p.spinning);
        assert!(p.expire_spin(start + Duration::from_millis(2000)));
        assert!(!p.spinning);
    }

    #[test]
    fn test_letters_round_trip() {
        for c in PieceColor::ALL {
            assert_eq!(PieceColor::from_letter(c.letter()), Some(c));
        }
        assert_eq!(PieceColor::from_letter('x'), None);
    }
}
