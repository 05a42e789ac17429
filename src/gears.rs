//! Gear connectivity: flood-fill adjacent gears into groups, assign checkerboard
//! directions, record the links that decide which gears spin together.
//!
//! The network is always rebuilt from scratch after the grid changes. Incremental
//! updates are not attempted; a stale network would spin the wrong gears.

use crate::error::EngineError;
use crate::grid::Grid;
use crate::piece::SpinDirection;
use log::warn;
use std::collections::{HashSet, VecDeque};

const NEIGHBOURS_4: [(isize, isize); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkDirection {
    Horizontal,
    Vertical,
}

/// Undirected link between two adjacent gears of one group.
/// `from` always has the smaller coordinate along the link direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GearEdge {
    pub from: (usize, usize),
    pub to: (usize, usize),
    pub direction: LinkDirection,
}

impl GearEdge {
    /// The other endpoint if `cell` is one end of this edge.
    #[inline]
    pub fn other(&self, cell: (usize, usize)) -> Option<(usize, usize)> {
        if self.from == cell {
            Some(self.to)
        } else if self.to == cell {
            Some(self.from)
        } else {
            None
        }
    }
}

/// Connected component of orthogonally adjacent gears, in BFS order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GearGroup {
    pub members: Vec<(usize, usize)>,
}

impl GearGroup {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Singletons have nothing to mesh with.
    pub fn rotates(&self) -> bool {
        self.members.len() >= 2
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GearNetwork {
    pub groups: Vec<GearGroup>,
    pub edges: Vec<GearEdge>,
    /// Members of every group of size >= 2.
    pub rotating: Vec<(usize, usize)>,
}

impl GearNetwork {
    /// Gears linked to (x, y) through recorded edges, including (x, y) itself.
    pub fn connected_group(&self, grid: &Grid, x: usize, y: usize) -> Vec<(usize, usize)> {
        find_connected_group(grid, &self.edges, x, y)
    }
}

/// Rebuilds groups, directions, rotating flags and edges for the whole grid.
pub fn update_gear_connections(grid: &mut Grid) -> GearNetwork {
    let n = grid.size();
    let mut network = GearNetwork::default();
    let mut visited = vec![false; n * n];

    // Non-gears carry no gear state.
    for piece in grid.pieces_mut().filter(|p| !p.is_gear) {
        piece.rotating = false;
        piece.direction = None;
    }

    for (x, y) in grid.coords() {
        if visited[y * n + x] || !grid.is_gear(x, y) {
            continue;
        }

        let mut members = Vec::new();
        let mut queue = VecDeque::from([(x, y)]);
        visited[y * n + x] = true;
        while let Some((cx, cy)) = queue.pop_front() {
            if let Some(piece) = grid.get_mut(cx, cy) {
                piece.direction = Some(SpinDirection::for_cell(cx, cy));
            }
            members.push((cx, cy));
            for (dx, dy) in NEIGHBOURS_4 {
                let (Some(nx), Some(ny)) = (cx.checked_add_signed(dx), cy.checked_add_signed(dy)) else {
                    continue;
                };
                if nx < n && ny < n && !visited[ny * n + nx] && grid.is_gear(nx, ny) {
                    visited[ny * n + nx] = true;
                    queue.push_back((nx, ny));
                }
            }
        }

        let group = GearGroup { members };
        let rotates = group.rotates();
        for &(gx, gy) in &group.members {
            if let Some(piece) = grid.get_mut(gx, gy) {
                piece.rotating = rotates;
            }
        }
        if rotates {
            record_edges(&group, &mut network.edges);
            network.rotating.extend(group.members.iter().copied());
        }
        network.groups.push(group);
    }

    network
}

/// One edge per adjacent pair: only look right and down so each pair is seen once.
fn record_edges(group: &GearGroup, edges: &mut Vec<GearEdge>) {
    let members: HashSet<(usize, usize)> = group.members.iter().copied().collect();
    for &(x, y) in &group.members {
        if members.contains(&(x + 1, y)) {
            edges.push(GearEdge {
                from: (x, y),
                to: (x + 1, y),
                direction: LinkDirection::Horizontal,
            });
        }
        if members.contains(&(x, y + 1)) {
            edges.push(GearEdge {
                from: (x, y),
                to: (x, y + 1),
                direction: LinkDirection::Vertical,
            });
        }
    }
}

/// BFS strictly along `edges` from (start_x, start_y). Only cells that still hold a
/// gear are returned; a non-gear reached through an edge is logged and skipped.
pub fn find_connected_group(
    grid: &Grid,
    edges: &[GearEdge],
    start_x: usize,
    start_y: usize,
) -> Vec<(usize, usize)> {
    let mut visited = HashSet::new();
    let mut queue = VecDeque::from([(start_x, start_y)]);
    let mut result = Vec::new();

    while let Some(cell) = queue.pop_front() {
        if !visited.insert(cell) {
            continue;
        }
        if !grid.is_gear(cell.0, cell.1) {
            let err = EngineError::MissingGear { x: cell.0, y: cell.1 };
            warn!("{err}; treating cell as non-gear");
            continue;
        }
        result.push(cell);
        for edge in edges {
            if let Some(next) = edge.other(cell) {
                if !visited.contains(&next) {
                    queue.push_back(next);
                }
            }
        }
    }
    result
}
