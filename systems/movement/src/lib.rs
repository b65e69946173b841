#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic movement system that walks enemies down the flow field.

use std::time::Duration;

use glam::Vec2;
use lane_defence_core::{Command, EnemySnapshot, EnemyView};
use lane_defence_world::navigation::FlowField;
use tracing::debug;

/// Longest distance, in cells, travelled before the field is sampled again.
const MAX_SUB_STEP: f32 = 0.5;

/// Pure system that proposes enemy moves and base arrivals.
#[derive(Debug, Default)]
pub struct Movement;

impl Movement {
    /// Emits one command per live enemy for the elapsed time `dt`.
    ///
    /// Enemies standing on the base cell, or on a cell without a route to it,
    /// reach the base. Everyone else advances along the field at their speed.
    pub fn handle(
        &mut self,
        enemies: &EnemyView,
        flow_field: &FlowField,
        dt: Duration,
        out: &mut Vec<Command>,
    ) {
        let dt = dt.as_secs_f32();

        for enemy in enemies.iter().filter(|enemy| enemy.is_alive()) {
            let sample = flow_field.query(enemy.position);
            if !sample.is_reachable() {
                debug!(
                    enemy = enemy.id.get(),
                    x = enemy.position.x,
                    y = enemy.position.y,
                    "enemy has no route to the base"
                );
                out.push(Command::EnemyReachedBase { enemy: enemy.id });
                continue;
            }
            if sample.distance == 0 {
                out.push(Command::EnemyReachedBase { enemy: enemy.id });
                continue;
            }

            let position = walk(enemy, flow_field, enemy.speed * dt);
            if position != enemy.position {
                out.push(Command::MoveEnemy {
                    enemy: enemy.id,
                    position,
                });
            }
        }
    }
}

/// Follows the field for `distance` cells, re-sampling at least every half cell
/// so that fast enemies never skip a turn. Stops early on the base cell.
fn walk(enemy: &EnemySnapshot, flow_field: &FlowField, distance: f32) -> Vec2 {
    let mut position = enemy.position;
    let mut remaining = distance.max(0.0);

    while remaining > 0.0 {
        let sample = flow_field.query(position);
        if !sample.is_reachable() || sample.distance == 0 || sample.direction == Vec2::ZERO {
            break;
        }

        let step = remaining.min(MAX_SUB_STEP);
        position += sample.direction * step;
        remaining -= step;
    }

    position
}
