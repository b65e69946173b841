//! Projectile flight and hit resolution.

use std::time::Duration;

use glam::Vec2;
use lane_defence_core::{EnemyId, Event, ProjectileSnapshot, FALLBACK_REWARD, PROJECTILE_HIT_RADIUS};
use tracing::debug;

use crate::Enemy;

/// Projectile homing on a single enemy.
#[derive(Clone, Debug)]
pub(crate) struct Projectile {
    pub(crate) position: Vec2,
    pub(crate) target: EnemyId,
    pub(crate) damage: f32,
    pub(crate) speed: f32,
}

impl Projectile {
    pub(crate) fn snapshot(&self) -> ProjectileSnapshot {
        ProjectileSnapshot {
            position: self.position,
            target: self.target,
            damage: self.damage,
        }
    }
}

/// Moves every projectile toward its target's current position and applies hits.
///
/// Projectiles whose target is missing or already dead are discarded. Returns the
/// reward earned by kills made during this step; each enemy is credited at most
/// once because a dead target can no longer be hit.
pub(crate) fn advance_projectiles(
    projectiles: &mut Vec<Projectile>,
    enemies: &mut [Enemy],
    dt: Duration,
    out_events: &mut Vec<Event>,
) -> u32 {
    let step = dt.as_secs_f32();
    let mut earned = 0_u32;

    projectiles.retain_mut(|projectile| {
        let Some(enemy) = enemies
            .iter_mut()
            .find(|enemy| enemy.id == projectile.target && enemy.is_alive())
        else {
            debug!(enemy = projectile.target.get(), "projectile lost its target");
            return false;
        };

        let offset = enemy.position - projectile.position;
        let distance = offset.length();
        let travel = projectile.speed * step;

        if distance >= PROJECTILE_HIT_RADIUS && travel < distance {
            projectile.position += offset / distance * travel;
            return true;
        }

        enemy.hp = (enemy.hp - projectile.damage).max(0.0);
        out_events.push(Event::ProjectileHit {
            target: enemy.id,
            damage: projectile.damage,
        });

        if !enemy.is_alive() {
            let reward = if enemy.reward == 0 {
                FALLBACK_REWARD
            } else {
                enemy.reward
            };
            earned = earned.saturating_add(reward);
            debug!(enemy = enemy.id.get(), reward, "enemy killed");
            out_events.push(Event::EnemyKilled {
                enemy: enemy.id,
                reward,
            });
        }

        false
    });

    earned
}

#[cfg(test)]
mod tests {
    use super::*;
    use lane_defence_core::{EnemyTypeId, PROJECTILE_SPEED};

    fn enemy(id: u32, position: Vec2, hp: f32, reward: u32) -> Enemy {
        Enemy {
            id: EnemyId::new(id),
            enemy_type: EnemyTypeId::basic(),
            position,
            hp,
            max_hp: hp,
            speed: 1.0,
            reward,
        }
    }

    fn projectile(target: u32, position: Vec2, damage: f32) -> Projectile {
        Projectile {
            position,
            target: EnemyId::new(target),
            damage,
            speed: PROJECTILE_SPEED,
        }
    }

    #[test]
    fn distant_projectile_moves_toward_target() {
        let mut enemies = vec![enemy(0, Vec2::new(10.0, 0.0), 20.0, 10)];
        let mut projectiles = vec![projectile(0, Vec2::ZERO, 5.0)];
        let mut events = Vec::new();

        let earned = advance_projectiles(
            &mut projectiles,
            &mut enemies,
            Duration::from_millis(100),
            &mut events,
        );

        assert_eq!(earned, 0);
        assert_eq!(projectiles.len(), 1);
        assert!((projectiles[0].position.x - 2.0).abs() < 1e-4);
        assert!(events.is_empty());
    }

    #[test]
    fn arrival_applies_damage_in_same_step() {
        let mut enemies = vec![enemy(0, Vec2::new(1.5, 0.0), 20.0, 10)];
        let mut projectiles = vec![projectile(0, Vec2::ZERO, 5.0)];
        let mut events = Vec::new();

        let _ = advance_projectiles(
            &mut projectiles,
            &mut enemies,
            Duration::from_millis(100),
            &mut events,
        );

        assert!(projectiles.is_empty());
        assert_eq!(enemies[0].hp, 15.0);
    }

    #[test]
    fn kill_reward_is_credited_once() {
        let position = Vec2::new(0.5, 0.0);
        let mut enemies = vec![enemy(3, position, 10.0, 0)];
        let mut projectiles = vec![
            projectile(3, Vec2::ZERO, 10.0),
            projectile(3, Vec2::ZERO, 10.0),
        ];
        let mut events = Vec::new();

        let earned = advance_projectiles(
            &mut projectiles,
            &mut enemies,
            Duration::from_millis(100),
            &mut events,
        );

        assert_eq!(earned, FALLBACK_REWARD);
        assert!(projectiles.is_empty());
        assert_eq!(enemies[0].hp, 0.0);
        let kills = events
            .iter()
            .filter(|event| matches!(event, Event::EnemyKilled { .. }))
            .count();
        assert_eq!(kills, 1);
    }

    #[test]
    fn projectile_without_target_is_discarded() {
        let mut enemies = vec![enemy(1, Vec2::ZERO, 0.0, 10)];
        let mut projectiles = vec![projectile(1, Vec2::ONE, 5.0), projectile(9, Vec2::ONE, 5.0)];
        let mut events = Vec::new();

        let earned = advance_projectiles(
            &mut projectiles,
            &mut enemies,
            Duration::from_millis(100),
            &mut events,
        );

        assert_eq!(earned, 0);
        assert!(projectiles.is_empty());
        assert!(events.is_empty());
    }
}
