#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that computes deterministic tower targets from world snapshots.

use glam::Vec2;
use lane_defence_core::{Command, EnemyId, EnemyView, TowerSnapshot, TowerView};

/// Tower targeting system that reuses a scratch buffer to avoid repeated allocations.
#[derive(Debug, Default)]
pub struct TowerTargeting {
    enemy_workspace: Vec<EnemyCandidate>,
}

impl TowerTargeting {
    /// Creates a new tower targeting system with an empty scratch buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits [`Command::AssignTarget`] for every tower whose target changes.
    ///
    /// A tower keeps its current target while that enemy is alive and within
    /// range. Otherwise it picks the closest live enemy in range, preferring
    /// the earliest spawned one on ties, or clears its target.
    pub fn handle(&mut self, towers: &TowerView, enemies: &EnemyView, out: &mut Vec<Command>) {
        self.prepare_enemy_workspace(enemies);

        for tower in towers.iter() {
            let target = self.select_target(tower);
            if target != tower.target {
                out.push(Command::AssignTarget {
                    tower: tower.id,
                    enemy: target,
                });
            }
        }
    }

    fn prepare_enemy_workspace(&mut self, enemies: &EnemyView) {
        self.enemy_workspace.clear();
        self.enemy_workspace.extend(
            enemies
                .iter()
                .filter(|snapshot| snapshot.is_alive())
                .map(|snapshot| EnemyCandidate {
                    id: snapshot.id,
                    position: snapshot.position,
                }),
        );
    }

    fn select_target(&self, tower: &TowerSnapshot) -> Option<EnemyId> {
        let origin = tower.cell.to_point();
        let in_range = |candidate: &&EnemyCandidate| {
            candidate.position.distance(origin) <= tower.range
        };

        if let Some(current) = tower.target {
            if self
                .enemy_workspace
                .iter()
                .filter(in_range)
                .any(|candidate| candidate.id == current)
            {
                return Some(current);
            }
        }

        let mut best: Option<(f32, EnemyId)> = None;
        for candidate in self.enemy_workspace.iter().filter(in_range) {
            let distance = candidate.position.distance(origin);
            match best {
                Some((closest, _)) if distance >= closest => {}
                _ => best = Some((distance, candidate.id)),
            }
        }
        best.map(|(_, id)| id)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct EnemyCandidate {
    id: EnemyId,
    position: Vec2,
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use lane_defence_core::{CellCoord, EnemySnapshot, EnemyTypeId, TowerId, TowerKind};

    fn tower(target: Option<EnemyId>) -> TowerSnapshot {
        TowerSnapshot {
            id: TowerId::new(0),
            kind: TowerKind::Basic,
            cell: CellCoord::new(5, 5),
            range: 3.0,
            damage: 10.0,
            cooldown: Duration::ZERO,
            target,
        }
    }

    fn enemy(id: u32, x: f32, y: f32, hp: f32) -> EnemySnapshot {
        EnemySnapshot {
            id: EnemyId::new(id),
            enemy_type: EnemyTypeId::basic(),
            position: Vec2::new(x, y),
            hp,
            max_hp: 20.0,
            speed: 5.0,
        }
    }

    fn assignments(tower: TowerSnapshot, enemies: Vec<EnemySnapshot>) -> Vec<Command> {
        let mut system = TowerTargeting::new();
        let mut out = Vec::new();
        system.handle(
            &TowerView::from_snapshots(vec![tower]),
            &EnemyView::from_snapshots(enemies),
            &mut out,
        );
        out
    }

    fn assign(enemy: Option<u32>) -> Vec<Command> {
        vec![Command::AssignTarget {
            tower: TowerId::new(0),
            enemy: enemy.map(EnemyId::new),
        }]
    }

    #[test]
    fn picks_the_closest_enemy_in_range() {
        let out = assignments(
            tower(None),
            vec![enemy(0, 8.0, 5.0, 20.0), enemy(1, 6.0, 5.0, 20.0)],
        );
        assert_eq!(out, assign(Some(1)));
    }

    #[test]
    fn ties_go_to_the_earliest_spawned_enemy() {
        let out = assignments(
            tower(None),
            vec![enemy(4, 5.0, 7.0, 20.0), enemy(2, 5.0, 3.0, 20.0)],
        );
        assert_eq!(out, assign(Some(2)));
    }

    #[test]
    fn range_boundary_is_inclusive() {
        assert_eq!(
            assignments(tower(None), vec![enemy(0, 8.0, 5.0, 20.0)]),
            assign(Some(0))
        );
        assert!(assignments(tower(None), vec![enemy(0, 8.5, 5.0, 20.0)]).is_empty());
    }

    #[test]
    fn keeps_a_valid_target_even_when_a_closer_one_appears() {
        let out = assignments(
            tower(Some(EnemyId::new(0))),
            vec![enemy(0, 7.5, 5.0, 20.0), enemy(1, 5.0, 5.0, 20.0)],
        );
        assert!(out.is_empty(), "unchanged targets emit nothing: {out:?}");
    }

    #[test]
    fn retargets_when_the_current_enemy_leaves_range_or_dies() {
        let out = assignments(
            tower(Some(EnemyId::new(0))),
            vec![enemy(0, 9.0, 5.0, 20.0), enemy(1, 6.0, 5.0, 20.0)],
        );
        assert_eq!(out, assign(Some(1)));

        let out = assignments(
            tower(Some(EnemyId::new(1))),
            vec![enemy(1, 6.0, 5.0, 0.0)],
        );
        assert_eq!(out, assign(None));
    }
}
