//! Flow field builder steering enemies toward the base.
//!
//! The field stores the reverse breadth-first search distances seeded from the
//! base together with a unit direction per cell pointing at the strictly closer
//! neighbour. Cells the search never reaches keep [`UNREACHABLE`], which
//! connectivity validation and enemy movement both rely on.

use std::collections::{BTreeSet, VecDeque};

use glam::Vec2;
use lane_defence_core::{CellCoord, Grid};

/// Distance recorded for cells without a route to the base.
pub const UNREACHABLE: u32 = u32::MAX;

/// Default bound on the number of steps [`FlowField::trace_path`] follows.
pub const MAX_TRACE_STEPS: usize = 500;

/// Dense per-cell walkability derived from the grid and wall-blocked cells.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WalkabilityMask {
    columns: u32,
    rows: u32,
    cells: Vec<bool>,
}

impl WalkabilityMask {
    /// Width of the mask in cells.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Height of the mask in cells.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Reports whether enemies may enter the cell. Out-of-bounds cells are not walkable.
    #[must_use]
    pub fn is_walkable(&self, cell: CellCoord) -> bool {
        index(self.columns, self.rows, cell)
            .and_then(|offset| self.cells.get(offset).copied())
            .unwrap_or(false)
    }

    /// Number of walkable cells.
    #[must_use]
    pub fn walkable_count(&self) -> usize {
        self.cells.iter().filter(|walkable| **walkable).count()
    }
}

/// Marks lane, spawn and base tiles walkable unless a wall blocks them.
#[must_use]
pub fn compute_walkability(grid: &Grid, blocked: &BTreeSet<CellCoord>) -> WalkabilityMask {
    let cells = grid
        .iter()
        .map(|(cell, kind)| kind.is_walkable() && !blocked.contains(&cell))
        .collect();

    WalkabilityMask {
        columns: grid.columns(),
        rows: grid.rows(),
        cells,
    }
}

/// Distance and heading sampled from a [`FlowField`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlowSample {
    /// Hops to the base, or [`UNREACHABLE`].
    pub distance: u32,
    /// Unit step toward the base, or zero when no closer neighbour exists.
    pub direction: Vec2,
}

impl FlowSample {
    const OUTSIDE: Self = Self {
        distance: UNREACHABLE,
        direction: Vec2::ZERO,
    };

    /// Reports whether the sampled cell has a route to the base.
    #[must_use]
    pub const fn is_reachable(&self) -> bool {
        self.distance != UNREACHABLE
    }
}

/// Per-cell hop distances and unit directions toward the base.
#[derive(Clone, Debug, Default)]
pub struct FlowField {
    columns: u32,
    rows: u32,
    distances: Vec<u32>,
    directions: Vec<Vec2>,
}

/// Computes the flow field toward `base` over the walkable cells of `mask`.
///
/// Neighbours are visited up, down, left, right; the same order breaks ties when
/// picking directions. A base that is not walkable yields a field where every
/// cell is unreachable.
#[must_use]
pub fn compute_flow_field(
    columns: u32,
    rows: u32,
    mask: &WalkabilityMask,
    base: CellCoord,
) -> FlowField {
    let cell_count = usize::try_from(u64::from(columns) * u64::from(rows)).unwrap_or(0);
    let mut field = FlowField {
        columns,
        rows,
        distances: vec![UNREACHABLE; cell_count],
        directions: vec![Vec2::ZERO; cell_count],
    };

    let Some(base_index) = index(columns, rows, base) else {
        return field;
    };
    if !mask.is_walkable(base) {
        return field;
    }

    field.distances[base_index] = 0;
    let mut queue = VecDeque::from([base]);

    while let Some(cell) = queue.pop_front() {
        let Some(current_index) = index(columns, rows, cell) else {
            continue;
        };
        let next_distance = field.distances[current_index].saturating_add(1);

        for neighbor in neighbors(cell, columns, rows) {
            if !mask.is_walkable(neighbor) {
                continue;
            }

            let Some(neighbor_index) = index(columns, rows, neighbor) else {
                continue;
            };

            if field.distances[neighbor_index] != UNREACHABLE {
                continue;
            }

            field.distances[neighbor_index] = next_distance;
            queue.push_back(neighbor);
        }
    }

    for row in 0..rows {
        for column in 0..columns {
            let cell = CellCoord::new(column, row);
            let Some(cell_index) = index(columns, rows, cell) else {
                continue;
            };
            let own = field.distances[cell_index];
            if own == UNREACHABLE || own == 0 {
                continue;
            }

            let mut best = own;
            let mut heading = Vec2::ZERO;
            for neighbor in neighbors(cell, columns, rows) {
                let Some(neighbor_index) = index(columns, rows, neighbor) else {
                    continue;
                };
                let candidate = field.distances[neighbor_index];
                if candidate < best {
                    best = candidate;
                    heading = neighbor.to_point() - cell.to_point();
                }
            }

            field.directions[cell_index] = heading.normalize_or_zero();
        }
    }

    field
}

impl FlowField {
    /// Width of the field in cells.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Height of the field in cells.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Dense distances stored in row-major order.
    #[must_use]
    pub fn distances(&self) -> &[u32] {
        &self.distances
    }

    /// Samples the cell containing the continuous position.
    ///
    /// Coordinates are floored; positions outside the grid report
    /// [`UNREACHABLE`] with a zero direction.
    #[must_use]
    pub fn query(&self, position: Vec2) -> FlowSample {
        CellCoord::containing(position).map_or(FlowSample::OUTSIDE, |cell| self.sample(cell))
    }

    /// Samples a discrete cell.
    #[must_use]
    pub fn sample(&self, cell: CellCoord) -> FlowSample {
        let Some(offset) = index(self.columns, self.rows, cell) else {
            return FlowSample::OUTSIDE;
        };

        match (self.distances.get(offset), self.directions.get(offset)) {
            (Some(&distance), Some(&direction)) => FlowSample {
                distance,
                direction,
            },
            _ => FlowSample::OUTSIDE,
        }
    }

    /// Distance recorded for the cell, [`UNREACHABLE`] when outside the grid.
    #[must_use]
    pub fn distance(&self, cell: CellCoord) -> u32 {
        self.sample(cell).distance
    }

    /// Follows the field from `start`, returning the visited cells.
    ///
    /// The start cell is excluded and the base is included when reached. The walk
    /// stops at the base, on a zero direction, on an unreachable or
    /// out-of-bounds cell, or after `max_steps` steps.
    #[must_use]
    pub fn trace_path(&self, start: CellCoord, base: CellCoord, max_steps: usize) -> Vec<CellCoord> {
        let mut path = Vec::new();
        let mut cell = start;

        for _ in 0..max_steps {
            if cell == base {
                break;
            }

            let sample = self.sample(cell);
            if !sample.is_reachable() || sample.direction == Vec2::ZERO {
                break;
            }

            let step = sample.direction.round();
            let Some(next) = cell.offset(step.x as i64, step.y as i64) else {
                break;
            };
            if index(self.columns, self.rows, next).is_none() {
                break;
            }

            path.push(next);
            cell = next;
            if self.distance(cell) == 0 {
                break;
            }
        }

        path
    }
}

fn neighbors(cell: CellCoord, columns: u32, rows: u32) -> impl Iterator<Item = CellCoord> {
    let mut candidates = [None; 4];
    let mut count = 0;

    if let Some(row) = cell.row().checked_sub(1) {
        candidates[count] = Some(CellCoord::new(cell.column(), row));
        count += 1;
    }

    if let Some(row) = cell.row().checked_add(1) {
        if row < rows {
            candidates[count] = Some(CellCoord::new(cell.column(), row));
            count += 1;
        }
    }

    if let Some(column) = cell.column().checked_sub(1) {
        candidates[count] = Some(CellCoord::new(column, cell.row()));
        count += 1;
    }

    if let Some(column) = cell.column().checked_add(1) {
        if column < columns {
            candidates[count] = Some(CellCoord::new(column, cell.row()));
            count += 1;
        }
    }

    candidates.into_iter().take(count).flatten()
}

fn index(columns: u32, rows: u32, cell: CellCoord) -> Option<usize> {
    if cell.column() >= columns || cell.row() >= rows {
        return None;
    }

    let column = usize::try_from(cell.column()).ok()?;
    let row = usize::try_from(cell.row()).ok()?;
    let width = usize::try_from(columns).ok()?;
    row.checked_mul(width)?.checked_add(column)
}
