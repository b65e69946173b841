//! Grid primitives: cell coordinates, tile classification and segment rasterisation.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column().abs_diff(other.column()) + self.row().abs_diff(other.row())
    }

    /// Continuous position of the cell's anchor, with `x` as column and `y` as row.
    #[must_use]
    pub fn to_point(self) -> Vec2 {
        Vec2::new(self.column as f32, self.row as f32)
    }

    /// Cell containing the provided continuous position, if it is non-negative.
    ///
    /// Coordinates are floored, so `(2.9, 0.1)` resolves to cell `(2, 0)`.
    #[must_use]
    pub fn containing(position: Vec2) -> Option<Self> {
        if !position.x.is_finite() || !position.y.is_finite() {
            return None;
        }

        let column = position.x.floor();
        let row = position.y.floor();
        if column < 0.0 || row < 0.0 || column > u32::MAX as f32 || row > u32::MAX as f32 {
            return None;
        }

        Some(Self::new(column as u32, row as u32))
    }

    /// Offsets the cell by signed deltas, returning `None` when it would leave the
    /// non-negative quadrant.
    #[must_use]
    pub fn offset(self, column_delta: i64, row_delta: i64) -> Option<Self> {
        let column = i64::from(self.column).checked_add(column_delta)?;
        let row = i64::from(self.row).checked_add(row_delta)?;
        Some(Self::new(
            u32::try_from(column).ok()?,
            u32::try_from(row).ok()?,
        ))
    }
}

/// Classification of a single map tile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileKind {
    /// Buildable ground that enemies never traverse.
    #[default]
    Empty,
    /// Lane tile enemies may walk along.
    Path,
    /// Lane entry where enemies emerge.
    Spawn,
    /// The defended base enemies try to reach.
    Base,
}

impl TileKind {
    /// Reports whether enemies may traverse the tile when nothing blocks it.
    #[must_use]
    pub const fn is_walkable(self) -> bool {
        matches!(self, Self::Path | Self::Spawn | Self::Base)
    }
}

/// Dense row-major tile layout of a map.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    columns: u32,
    rows: u32,
    tiles: Vec<TileKind>,
}

impl Grid {
    /// Creates a grid of the provided dimensions filled with [`TileKind::Empty`].
    #[must_use]
    pub fn new(columns: u32, rows: u32) -> Self {
        let capacity = usize::try_from(u64::from(columns) * u64::from(rows)).unwrap_or(0);
        Self {
            columns,
            rows,
            tiles: vec![TileKind::Empty; capacity],
        }
    }

    /// Number of columns contained in the grid.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows contained in the grid.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Reports whether the cell lies inside the grid bounds.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.column() < self.columns && cell.row() < self.rows
    }

    /// Tile stored at the provided cell, or `None` when out of bounds.
    #[must_use]
    pub fn tile(&self, cell: CellCoord) -> Option<TileKind> {
        self.index(cell).and_then(|index| self.tiles.get(index).copied())
    }

    /// Overwrites the tile at the provided cell. Returns `false` when out of bounds.
    pub fn set(&mut self, cell: CellCoord, kind: TileKind) -> bool {
        match self.index(cell).and_then(|index| self.tiles.get_mut(index)) {
            Some(slot) => {
                *slot = kind;
                true
            }
            None => false,
        }
    }

    /// Iterates every cell in row-major order together with its tile.
    pub fn iter(&self) -> impl Iterator<Item = (CellCoord, TileKind)> + '_ {
        let columns = self.columns.max(1);
        self.tiles.iter().enumerate().map(move |(index, kind)| {
            let index = index as u64;
            let cell = CellCoord::new(
                (index % u64::from(columns)) as u32,
                (index / u64::from(columns)) as u32,
            );
            (cell, *kind)
        })
    }

    /// Row-major index of the cell, if it lies inside the grid.
    #[must_use]
    pub fn index(&self, cell: CellCoord) -> Option<usize> {
        if !self.contains(cell) {
            return None;
        }

        let row = usize::try_from(cell.row()).ok()?;
        let column = usize::try_from(cell.column()).ok()?;
        let width = usize::try_from(self.columns).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }
}

/// Cells crossed by the straight segment from `from` to `to`, both endpoints included.
///
/// Uses Bresenham's line algorithm, so the output is ordered from `from` toward
/// `to` and each consecutive pair differs by at most one step per axis.
#[must_use]
pub fn cells_on_segment(from: CellCoord, to: CellCoord) -> Vec<CellCoord> {
    let (mut x, mut y) = (i64::from(from.column()), i64::from(from.row()));
    let (x1, y1) = (i64::from(to.column()), i64::from(to.row()));
    let dx = (x1 - x).abs();
    let dy = (y1 - y).abs();
    let sx = if x < x1 { 1 } else { -1 };
    let sy = if y < y1 { 1 } else { -1 };
    let mut err = dx - dy;

    let capacity = usize::try_from(dx.max(dy) + 1).unwrap_or(1);
    let mut cells = Vec::with_capacity(capacity);

    loop {
        // Both coordinates stay inside the bounding box of two valid cells.
        cells.push(CellCoord::new(x as u32, y as u32));
        if x == x1 && y == y1 {
            break;
        }

        let doubled = 2 * err;
        if doubled > -dy {
            err -= dy;
            x += sx;
        }
        if doubled < dx {
            err += dx;
            y += sy;
        }
    }

    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manhattan_distance_matches_expectation() {
        let origin = CellCoord::new(1, 1);
        let destination = CellCoord::new(4, 3);
        assert_eq!(origin.manhattan_distance(destination), 5);
        assert_eq!(destination.manhattan_distance(origin), 5);
    }

    #[test]
    fn containing_floors_positions() {
        assert_eq!(
            CellCoord::containing(Vec2::new(2.9, 0.1)),
            Some(CellCoord::new(2, 0))
        );
        assert_eq!(CellCoord::containing(Vec2::new(-0.2, 3.0)), None);
        assert_eq!(CellCoord::containing(Vec2::new(f32::NAN, 3.0)), None);
    }

    #[test]
    fn offset_rejects_negative_results() {
        let cell = CellCoord::new(0, 3);
        assert_eq!(cell.offset(-1, 0), None);
        assert_eq!(cell.offset(2, -3), Some(CellCoord::new(2, 0)));
    }

    #[test]
    fn only_lane_tiles_are_walkable() {
        assert!(!TileKind::Empty.is_walkable());
        assert!(TileKind::Path.is_walkable());
        assert!(TileKind::Spawn.is_walkable());
        assert!(TileKind::Base.is_walkable());
    }

    #[test]
    fn grid_set_and_tile_respect_bounds() {
        let mut grid = Grid::new(3, 2);
        assert!(grid.set(CellCoord::new(2, 1), TileKind::Path));
        assert!(!grid.set(CellCoord::new(3, 0), TileKind::Path));
        assert_eq!(grid.tile(CellCoord::new(2, 1)), Some(TileKind::Path));
        assert_eq!(grid.tile(CellCoord::new(0, 2)), None);
        assert_eq!(grid.iter().count(), 6);
    }

    #[test]
    fn horizontal_segment_covers_every_cell() {
        let cells = cells_on_segment(CellCoord::new(1, 4), CellCoord::new(4, 4));
        assert_eq!(
            cells,
            vec![
                CellCoord::new(1, 4),
                CellCoord::new(2, 4),
                CellCoord::new(3, 4),
                CellCoord::new(4, 4),
            ]
        );
    }

    #[test]
    fn reversed_segment_is_ordered_from_start() {
        let cells = cells_on_segment(CellCoord::new(3, 3), CellCoord::new(3, 0));
        assert_eq!(cells.first(), Some(&CellCoord::new(3, 3)));
        assert_eq!(cells.last(), Some(&CellCoord::new(3, 0)));
        assert_eq!(cells.len(), 4);
    }

    #[test]
    fn diagonal_segment_steps_both_axes() {
        let cells = cells_on_segment(CellCoord::new(0, 0), CellCoord::new(2, 2));
        assert_eq!(
            cells,
            vec![
                CellCoord::new(0, 0),
                CellCoord::new(1, 1),
                CellCoord::new(2, 2),
            ]
        );
    }

    #[test]
    fn degenerate_segment_is_single_cell() {
        let cell = CellCoord::new(5, 5);
        assert_eq!(cells_on_segment(cell, cell), vec![cell]);
    }
}
