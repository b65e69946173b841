//! Tower-to-tower walls and the connectivity check guarding them.

use std::collections::BTreeSet;

use lane_defence_core::{
    cells_on_segment, CellCoord, GameMap, TileKind, WallError, WallLink, MAX_WALL_LINK_DISTANCE,
};

use crate::navigation::{compute_flow_field, compute_walkability, FlowField, UNREACHABLE};

/// Walls currently standing, in insertion order.
#[derive(Clone, Debug, Default)]
pub(crate) struct WallSet {
    links: Vec<WallLink>,
}

impl WallSet {
    pub(crate) fn iter(&self) -> impl Iterator<Item = &WallLink> {
        self.links.iter()
    }

    pub(crate) fn contains(&self, a: CellCoord, b: CellCoord) -> bool {
        self.links.iter().any(|link| link.connects(a, b))
    }

    pub(crate) fn insert(&mut self, link: WallLink) {
        self.links.push(link);
    }

    /// Removes the wall linking `a` and `b` in either order.
    pub(crate) fn remove(&mut self, a: CellCoord, b: CellCoord) -> Option<WallLink> {
        let position = self.links.iter().position(|link| link.connects(a, b))?;
        Some(self.links.remove(position))
    }

    /// Removes and returns every wall touching the cell.
    pub(crate) fn remove_touching(&mut self, cell: CellCoord) -> Vec<WallLink> {
        let (removed, kept) = self
            .links
            .drain(..)
            .partition::<Vec<_>, _>(|link| link.touches(cell));
        self.links = kept;
        removed
    }

    /// Walls with the cell as an endpoint, in insertion order.
    pub(crate) fn touching(&self, cell: CellCoord) -> impl Iterator<Item = &WallLink> + '_ {
        self.links.iter().filter(move |link| link.touches(cell))
    }
}

/// Lane cells blocked by the provided walls. Spawn and base tiles never block.
pub(crate) fn blocked_cells<'a>(
    map: &GameMap,
    links: impl IntoIterator<Item = &'a WallLink>,
) -> BTreeSet<CellCoord> {
    links
        .into_iter()
        .flat_map(|link| cells_on_segment(link.a(), link.b()))
        .filter(|cell| map.grid.tile(*cell) == Some(TileKind::Path))
        .collect()
}

/// Builds the flow field that results from blocking the cells under `links`.
pub(crate) fn flow_field_with<'a>(
    map: &GameMap,
    links: impl IntoIterator<Item = &'a WallLink>,
) -> (FlowField, usize) {
    let blocked = blocked_cells(map, links);
    let mask = compute_walkability(&map.grid, &blocked);
    let field = compute_flow_field(map.grid.columns(), map.grid.rows(), &mask, map.base.cell);
    (field, blocked.len())
}

/// Validates a wall request against towers, spacing, duplicates and connectivity.
///
/// Connectivity is tested on a throwaway flow field that blocks the candidate's
/// lane cells on top of the existing walls.
pub(crate) fn validate_link(
    map: &GameMap,
    walls: &WallSet,
    has_tower: impl Fn(CellCoord) -> bool,
    a: CellCoord,
    b: CellCoord,
) -> Result<(), WallError> {
    if a == b {
        return Err(WallError::SameCell);
    }
    if !has_tower(a) || !has_tower(b) {
        return Err(WallError::MissingTower);
    }

    let distance = a.manhattan_distance(b);
    if distance > MAX_WALL_LINK_DISTANCE {
        return Err(WallError::TooFar { distance });
    }
    if walls.contains(a, b) {
        return Err(WallError::Duplicate);
    }

    let candidate = WallLink::new(a, b);
    let (field, _) = flow_field_with(map, walls.iter().chain(std::iter::once(&candidate)));
    if disconnects(map, &field) {
        return Err(WallError::WouldDisconnect);
    }

    Ok(())
}

fn disconnects(map: &GameMap, field: &FlowField) -> bool {
    map.spawns
        .iter()
        .any(|spawn| field.distance(spawn.cell) == UNREACHABLE)
}
