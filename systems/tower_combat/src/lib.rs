#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that emits projectile firing commands from targeting data.

use lane_defence_core::{Command, TowerView};

/// Tower combat system that queues firing commands for ready towers.
#[derive(Debug, Default)]
pub struct TowerCombat {
    scratch: Vec<Command>,
}

impl TowerCombat {
    /// Creates a new tower combat system with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits `Command::FireProjectile` for every tower with a target and no cooldown left.
    pub fn handle(&mut self, towers: &TowerView, out: &mut Vec<Command>) {
        self.scratch.clear();

        for tower in towers.iter() {
            let Some(target) = tower.target else {
                continue;
            };
            if tower.cooldown.is_zero() {
                self.scratch.push(Command::FireProjectile {
                    tower: tower.id,
                    target,
                });
            }
        }

        if self.scratch.is_empty() {
            return;
        }

        out.reserve(self.scratch.len());
        out.append(&mut self.scratch);
    }
}
