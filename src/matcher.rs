//! Match detection: maximal same-colour runs along rows and columns.

use crate::grid::Grid;
use crate::piece::Piece;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchCell {
    pub x: usize,
    pub y: usize,
    pub piece: Piece,
}

/// One run of at least `match_length` equal colours, in scan order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub orientation: Orientation,
    pub cells: Vec<MatchCell>,
}

impl Match {
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Scans every row left-to-right, then every column top-to-bottom.
/// Empty cells break runs. Horizontal and vertical passes are independent,
/// so a cell at an intersection shows up in one match of each orientation.
pub fn find_matches(grid: &Grid, match_length: usize) -> Vec<Match> {
    let n = grid.size();
    let mut matches = Vec::new();
    for y in 0..n {
        scan_line(grid, match_length, Orientation::Horizontal, |i| (i, y), &mut matches);
    }
    for x in 0..n {
        scan_line(grid, match_length, Orientation::Vertical, |i| (x, i), &mut matches);
    }
    matches
}

/// Walks one line; `at(i)` maps the position along the line to grid coordinates.
fn scan_line(
    grid: &Grid,
    match_length: usize,
    orientation: Orientation,
    at: impl Fn(usize) -> (usize, usize),
    out: &mut Vec<Match>,
) {
    let n = grid.size();
    let mut start = 0;
    while start < n {
        let (sx, sy) = at(start);
        let Some(first) = grid.get(sx, sy) else {
            start += 1;
            continue;
        };
        let mut end = start + 1;
        while end < n {
            let (ex, ey) = at(end);
            match grid.get(ex, ey) {
                Some(p) if p.color == first.color => end += 1,
                _ => break,
            }
        }
        if end - start >= match_length {
            let cells = (start..end)
                .filter_map(|i| {
                    let (x, y) = at(i);
                    grid.get(x, y).map(|&piece| MatchCell { x, y, piece })
                })
                .collect();
            out.push(Match { orientation, cells });
        }
        // Runs are maximal, so the next run starts where this one ended.
        start = end;
    }
}

/// Distinct matched coordinates across all matches, in first-seen order.
pub fn matched_cells(matches: &[Match]) -> Vec<MatchCell> {
    let mut seen = std::collections::HashSet::new();
    matches
        .iter()
        .flat_map(|m| m.cells.iter().copied())
        .filter(|c| seen.insert((c.x, c.y)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piece::PieceColor;

    #[test]
    fn test_single_row_run_of_three() {
        let g = Grid::from_rows(&["RRRBB", "BYGPO", "GPOYB", "YOBGP", "PBYOG"]).unwrap();
        let m = find_matches(&g, 3);
        assert_eq!(m.len(), 1);
        assert_eq!(m[0].orientation, Orientation::Horizontal);
        let coords: Vec<_> = m[0].cells.iter().map(|c| (c.x, c.y)).collect();
        assert_eq!(coords, vec![(0, 0), (1, 0), (2, 0)]);
        assert!(m[0].cells.iter().all(|c| c.piece.color == PieceColor::Red));
    }

    #[test]
    fn test_run_is_maximal_not_split() {
        let g = Grid::from_rows(&["YYYYB", "BRGPO", "GPOYB", "YOBGP", "PBYOG"]).unwrap();
        let m = find_matches(&g, 3);
        assert_eq!(m.len(), 1);
        assert_eq!(m[0].len(), 4);
    }

    #[test]
    fn test_vertical_run() {
        let g = Grid::from_rows(&["RBG", "RGB", "RBG"]).unwrap();
        let m = find_matches(&g, 3);
        assert_eq!(m.len(), 1);
        assert_eq!(m[0].orientation, Orientation::Vertical);
        let coords: Vec<_> = m[0].cells.iter().map(|c| (c.x, c.y)).collect();
        assert_eq!(coords, vec![(0, 0), (0, 1), (0, 2)]);
    }

    #[test]
    fn test_intersection_in_both_orientations() {
        let g = Grid::from_rows(&["BRB", "RRR", "BRB"]).unwrap();
        let m = find_matches(&g, 3);
        assert_eq!(m.len(), 2);
        let centre_hits = m
            .iter()
            .filter(|mm| mm.cells.iter().any(|c| (c.x, c.y) == (1, 1)))
            .count();
        assert_eq!(centre_hits, 2);
        assert_eq!(matched_cells(&m).len(), 5);
    }

    #[test]
    fn test_empty_cells_break_runs() {
        let g = Grid::from_rows(&["RR.RR", "BYGPO", "GPOYB", "YOBGP", "PBYOG"]).unwrap();
        assert!(find_matches(&g, 3).is_empty());
    }

    #[test]
    fn test_match_length_four_ignores_three() {
        let g = Grid::from_rows(&["RRRBB", "BYGPO", "GPOYB", "YOBGP", "PBYOG"]).unwrap();
        assert!(find_matches(&g, 4).is_empty());
    }

    #[test]
    fn test_gear_flag_does_not_affect_colour() {
        let g = Grid::from_rows(&["RrRBB", "BYGPO", "GPOYB", "YOBGP", "PBYOG"]).unwrap();
        let m = find_matches(&g, 3);
        assert_eq!(m.len(), 1);
        assert!(m[0].cells[1].piece.is_gear);
    }
}
