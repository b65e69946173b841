//! Authoritative tower state management utilities.

use std::{collections::BTreeMap, time::Duration};

use lane_defence_core::{CellCoord, EnemyId, TowerId, TowerKind, TowerSnapshot, TowerTemplate};

/// State of a tower stored inside the world.
#[derive(Clone, Debug)]
pub(crate) struct TowerState {
    /// Identifier allocated by the world for the tower.
    pub(crate) id: TowerId,
    /// Kind of tower that was constructed.
    pub(crate) kind: TowerKind,
    /// Cell occupied by the tower.
    pub(crate) cell: CellCoord,
    /// Statistics copied from the kind's template at construction.
    pub(crate) stats: TowerTemplate,
    /// Time left before the tower may fire again.
    pub(crate) cooldown: Duration,
    /// Enemy the tower is tracking; may refer to an enemy that no longer exists.
    pub(crate) target: Option<EnemyId>,
}

impl TowerState {
    pub(crate) fn snapshot(&self) -> TowerSnapshot {
        TowerSnapshot {
            id: self.id,
            kind: self.kind,
            cell: self.cell,
            range: self.stats.range,
            damage: self.stats.damage,
            cooldown: self.cooldown,
            target: self.target,
        }
    }
}

/// Registry that stores towers and manages identifier allocation.
#[derive(Debug)]
pub(crate) struct TowerRegistry {
    entries: BTreeMap<TowerId, TowerState>,
    next_tower_id: TowerId,
}

impl TowerRegistry {
    /// Creates an empty tower registry with a reset identifier counter.
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_tower_id: TowerId::new(0),
        }
    }

    /// Stores a new tower and returns its identifier.
    pub(crate) fn insert(&mut self, kind: TowerKind, cell: CellCoord) -> TowerId {
        let id = self.next_tower_id;
        self.next_tower_id = TowerId::new(id.get().wrapping_add(1));
        let _ = self.entries.insert(
            id,
            TowerState {
                id,
                kind,
                cell,
                stats: kind.template(),
                cooldown: Duration::ZERO,
                target: None,
            },
        );
        id
    }

    /// Removes the tower occupying the cell.
    pub(crate) fn remove_at(&mut self, cell: CellCoord) -> Option<TowerState> {
        let id = self.at(cell)?.id;
        self.entries.remove(&id)
    }

    /// Tower occupying the cell, if any.
    pub(crate) fn at(&self, cell: CellCoord) -> Option<&TowerState> {
        self.entries.values().find(|tower| tower.cell == cell)
    }

    pub(crate) fn get_mut(&mut self, id: TowerId) -> Option<&mut TowerState> {
        self.entries.get_mut(&id)
    }

    /// Towers in identifier order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &TowerState> {
        self.entries.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut TowerState> {
        self.entries.values_mut()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
