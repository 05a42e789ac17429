//! Grid store: square board of optional pieces, wrap-around shifts and gravity.

use crate::piece::{Piece, PieceColor, SpinDirection};
use std::fmt;

/// Which line a move shifts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Row,
    Column,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Row => f.write_str("row"),
            Self::Column => f.write_str("column"),
        }
    }
}

/// Board: `cells[y * size + x]`. y=0 is the top row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    size: usize,
    cells: Vec<Option<Piece>>,
}

impl Grid {
    /// Empty grid (every cell `None`).
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![None; size * size],
        }
    }

    /// Grid filled by calling `make` once per cell in row-major order.
    pub fn filled_with(size: usize, mut make: impl FnMut() -> Piece) -> Self {
        let cells = (0..size * size).map(|_| Some(make())).collect();
        Self { size, cells }
    }

    /// Builds a grid from text rows: colour letters (R, B, G, Y, P, O), lowercase for gears, `.` for empty.
    /// Returns None when rows are not square or contain an unknown letter.
    pub fn from_rows(rows: &[&str]) -> Option<Self> {
        let size = rows.len();
        let mut cells = Vec::with_capacity(size * size);
        for row in rows {
            let chars: Vec<char> = row.chars().filter(|c| !c.is_whitespace()).collect();
            if chars.len() != size {
                return None;
            }
            for c in chars {
                if c == '.' {
                    cells.push(None);
                    continue;
                }
                let color = PieceColor::from_letter(c)?;
                cells.push(Some(Piece::new(color, c.is_ascii_lowercase())));
            }
        }
        Some(Self { size, cells })
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    fn index(&self, x: usize, y: usize) -> Option<usize> {
        (x < self.size && y < self.size).then(|| y * self.size + x)
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<&Piece> {
        self.index(x, y).and_then(|i| self.cells[i].as_ref())
    }

    #[inline]
    pub fn get_mut(&mut self, x: usize, y: usize) -> Option<&mut Piece> {
        self.index(x, y).and_then(|i| self.cells[i].as_mut())
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, piece: Option<Piece>) {
        if let Some(i) = self.index(x, y) {
            self.cells[i] = piece;
        }
    }

    /// True if (x, y) holds a gear.
    #[inline]
    pub fn is_gear(&self, x: usize, y: usize) -> bool {
        self.get(x, y).is_some_and(|p| p.is_gear)
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    /// All (x, y) coordinates in row-major order.
    pub fn coords(&self) -> impl Iterator<Item = (usize, usize)> + use<> {
        let size = self.size;
        (0..size).flat_map(move |y| (0..size).map(move |x| (x, y)))
    }

    pub fn pieces(&self) -> impl Iterator<Item = &Piece> {
        self.cells.iter().flatten()
    }

    pub fn pieces_mut(&mut self) -> impl Iterator<Item = &mut Piece> {
        self.cells.iter_mut().flatten()
    }

    /// Pieces of one row, left to right.
    pub fn row(&self, y: usize) -> Vec<Option<Piece>> {
        (0..self.size).map(|x| self.get(x, y).copied()).collect()
    }

    /// Pieces of one column, top to bottom.
    pub fn column(&self, x: usize) -> Vec<Option<Piece>> {
        (0..self.size).map(|y| self.get(x, y).copied()).collect()
    }

    /// Circular shift of row `y` by `amount` cells; positive moves pieces right.
    /// Returns false (and does nothing) when `y` is out of range.
    pub fn shift_row(&mut self, y: usize, amount: i32) -> bool {
        if y >= self.size {
            return false;
        }
        let start = y * self.size;
        let line = &mut self.cells[start..start + self.size];
        let k = wrap(amount, self.size);
        line.rotate_right(k);
        true
    }

    /// Circular shift of column `x` by `amount` cells; positive moves pieces down.
    /// Returns false (and does nothing) when `x` is out of range.
    pub fn shift_column(&mut self, x: usize, amount: i32) -> bool {
        if x >= self.size {
            return false;
        }
        let n = self.size;
        let k = wrap(amount, n);
        if k == 0 {
            return true;
        }
        let old: Vec<Option<Piece>> = (0..n).map(|y| self.cells[y * n + x]).collect();
        for (y, piece) in old.into_iter().enumerate() {
            self.cells[((y + k) % n) * n + x] = piece;
        }
        true
    }

    pub fn shift(&mut self, axis: Axis, index: usize, amount: i32) -> bool {
        match axis {
            Axis::Row => self.shift_row(index, amount),
            Axis::Column => self.shift_column(index, amount),
        }
    }

    /// Gravity for one column: non-empty pieces sink to the bottom keeping their order.
    /// Returns the number of empty cells left at the top.
    pub fn collapse_column(&mut self, x: usize) -> usize {
        if x >= self.size {
            return 0;
        }
        let n = self.size;
        let mut write = n;
        for y in (0..n).rev() {
            if let Some(piece) = self.cells[y * n + x].take() {
                write -= 1;
                self.cells[write * n + x] = Some(piece);
            }
        }
        write
    }

    pub fn snapshot(&self) -> GridSnapshot {
        GridSnapshot {
            size: self.size,
            cells: self
                .cells
                .iter()
                .map(|c| {
                    c.map(|p| CellView {
                        color: p.color,
                        is_gear: p.is_gear,
                        rotating: p.rotating,
                        spinning: p.spinning,
                        direction: p.direction,
                    })
                })
                .collect(),
        }
    }
}

/// True modulo of a signed shift into 0..n.
#[inline]
fn wrap(amount: i32, n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    i64::from(amount).rem_euclid(n as i64) as usize
}

/// Immutable per-cell view handed to the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellView {
    pub color: PieceColor,
    pub is_gear: bool,
    pub rotating: bool,
    pub spinning: bool,
    pub direction: Option<SpinDirection>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridSnapshot {
    pub size: usize,
    pub cells: Vec<Option<CellView>>,
}

impl GridSnapshot {
    pub fn get(&self, x: usize, y: usize) -> Option<&CellView> {
        if x >= self.size || y >= self.size {
            return None;
        }
        self.cells[y * self.size + x].as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Grid {
        Grid::from_rows(&["RBGYP", "OrbgY", "PYRBo", "GGBRY", "bOPYR"]).unwrap()
    }

    fn sorted_colors(line: &[Option<Piece>]) -> Vec<(u8, bool)> {
        let mut v: Vec<(u8, bool)> = line
            .iter()
            .flatten()
            .map(|p| (p.color.index(), p.is_gear))
            .collect();
        v.sort_unstable();
        v
    }

    #[test]
    fn test_shift_row_wraps_right() {
        let mut g = Grid::from_rows(&["RBG", "YYY", "PPP"]).unwrap();
        g.shift_row(0, 1);
        let colors: Vec<_> = g.row(0).iter().map(|p| p.unwrap().color).collect();
        assert_eq!(colors, vec![PieceColor::Green, PieceColor::Red, PieceColor::Blue]);
    }

    #[test]
    fn test_shift_column_negative_wraps_up() {
        let mut g = Grid::from_rows(&["RYY", "BYY", "GYY"]).unwrap();
        g.shift_column(0, -1);
        let colors: Vec<_> = g.column(0).iter().map(|p| p.unwrap().color).collect();
        assert_eq!(colors, vec![PieceColor::Blue, PieceColor::Green, PieceColor::Red]);
    }

    #[test]
    fn test_shift_is_invertible() {
        let original = sample();
        for k in -12..=12 {
            for i in 0..5 {
                let mut g = original.clone();
                g.shift_row(i, k);
                g.shift_row(i, -k);
                assert_eq!(g, original, "row {i} by {k}");
                g.shift_column(i, k);
                g.shift_column(i, -k);
                assert_eq!(g, original, "column {i} by {k}");
            }
        }
    }

    #[test]
    fn test_shift_is_permutation() {
        let original = sample();
        for k in [-7, -3, -1, 1, 2, 4, 9] {
            let mut g = original.clone();
            g.shift_row(2, k);
            assert_eq!(sorted_colors(&g.row(2)), sorted_colors(&original.row(2)));
            let mut g = original.clone();
            g.shift_column(3, k);
            assert_eq!(sorted_colors(&g.column(3)), sorted_colors(&original.column(3)));
        }
    }

    #[test]
    fn test_shift_by_grid_size_is_noop() {
        let original = sample();
        let mut g = original.clone();
        g.shift_row(1, 5);
        g.shift_column(4, -10);
        assert_eq!(g, original);
    }

    #[test]
    fn test_shift_moves_flags_with_piece() {
        let mut g = sample();
        g.get_mut(1, 1).unwrap().spinning = true;
        g.shift_row(1, 2);
        let p = g.get(3, 1).unwrap();
        assert!(p.is_gear && p.spinning);
        assert_eq!(p.color, PieceColor::Red);
    }

    #[test]
    fn test_shift_out_of_range_is_rejected() {
        let mut g = sample();
        assert!(!g.shift_row(5, 1));
        assert!(!g.shift_column(9, 1));
        assert_eq!(g, sample());
    }

    #[test]
    fn test_collapse_column_keeps_order() {
        let mut g = Grid::from_rows(&["R..", ".YY", "BYY"]).unwrap();
        g.set(0, 2, None);
        g.set(0, 1, Some(Piece::new(PieceColor::Green, false)));
        let empty = g.collapse_column(0);
        assert_eq!(empty, 1);
        assert!(g.get(0, 0).is_none());
        assert_eq!(g.get(0, 1).unwrap().color, PieceColor::Red);
        assert_eq!(g.get(0, 2).unwrap().color, PieceColor::Green);
    }

    #[test]
    fn test_snapshot_reads_back_cells() {
        let mut g = sample();
        g.get_mut(1, 1).unwrap().direction = Some(SpinDirection::Clockwise);
        g.set(4, 4, None);
        let snap = g.snapshot();
        let cell = snap.get(1, 1).unwrap();
        assert_eq!(cell.color, PieceColor::Red);
        assert!(cell.is_gear);
        assert_eq!(cell.direction, Some(SpinDirection::Clockwise));
        assert_eq!(snap.get(0, 3).unwrap().color, PieceColor::Green);
        assert!(snap.get(4, 4).is_none());
        assert!(snap.get(5, 0).is_none());
    }

    #[test]
    fn test_from_rows_rejects_ragged() {
        assert!(Grid::from_rows(&["RB", "R"]).is_none());
        assert!(Grid::from_rows(&["RX", "RB"]).is_none());
    }
}
