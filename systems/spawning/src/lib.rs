#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Wave scheduler responsible for emitting enemy spawn commands.
//!
//! The scheduler reacts to [`Event::WaveStarted`] by instantiating one
//! [`ActiveSpawnGroup`] per group of the wave, then advances every group on
//! each [`Event::TimeAdvanced`]. Groups run independently, so several lanes may
//! emit enemies within the same tick.

use std::{collections::BTreeSet, time::Duration};

use lane_defence_core::{
    Command, Difficulty, EnemyTypeId, Event, SpawnGroupDefinition, SpawnId, WaveDefinition,
};
use tracing::{debug, warn};

/// Runtime progress of one spawn group inside the active wave.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActiveSpawnGroup {
    spawn: SpawnId,
    enemy_type: EnemyTypeId,
    count: u32,
    interval: Duration,
    spawned: u32,
    timer: Duration,
    delay_remaining: Duration,
    completed: bool,
}

impl ActiveSpawnGroup {
    fn start(definition: &SpawnGroupDefinition, difficulty: Difficulty) -> Self {
        let spawn_multiplier = f64::from(difficulty.spawn_multiplier);
        let interval = if spawn_multiplier > 0.0 && spawn_multiplier != 1.0 {
            definition.interval.div_f64(spawn_multiplier)
        } else {
            definition.interval
        };
        let count = definition.count.saturating_add(difficulty.count_bonus);

        Self {
            spawn: definition.spawn.clone(),
            enemy_type: definition.enemy_type.clone(),
            count,
            interval,
            spawned: 0,
            timer: Duration::ZERO,
            delay_remaining: definition.start_delay,
            completed: count == 0,
        }
    }

    fn advance(&mut self, dt: Duration, out: &mut Vec<Command>) {
        if self.completed {
            return;
        }

        if !self.delay_remaining.is_zero() {
            self.delay_remaining = self.delay_remaining.saturating_sub(dt);
            return;
        }

        if self.spawned > 0 {
            self.timer = self.timer.saturating_add(dt);
            if self.timer < self.interval {
                return;
            }
        }

        self.timer = Duration::ZERO;
        self.spawned += 1;
        self.completed = self.spawned >= self.count;
        out.push(Command::SpawnEnemy {
            spawn: self.spawn.clone(),
            enemy_type: self.enemy_type.clone(),
        });
    }

    /// Spawn point the group emits from.
    #[must_use]
    pub fn spawn(&self) -> &SpawnId {
        &self.spawn
    }

    /// Total number of enemies the group emits, difficulty bonus included.
    #[must_use]
    pub const fn count(&self) -> u32 {
        self.count
    }

    /// Time between consecutive emissions after difficulty scaling.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of enemies emitted so far.
    #[must_use]
    pub const fn spawned(&self) -> u32 {
        self.spawned
    }

    /// Delay left before the group starts emitting.
    #[must_use]
    pub const fn delay_remaining(&self) -> Duration {
        self.delay_remaining
    }

    /// Reports whether the group emitted its full count.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        self.completed
    }
}

#[derive(Debug)]
struct ActiveWave {
    index: u32,
    groups: Vec<ActiveSpawnGroup>,
}

/// Pure system that turns wave definitions into timed spawn commands.
#[derive(Debug, Default)]
pub struct WaveScheduler {
    waves: Vec<WaveDefinition>,
    active: Option<ActiveWave>,
}

impl WaveScheduler {
    /// Creates a scheduler for the ordered wave list. An empty list is inert.
    #[must_use]
    pub fn new(waves: Vec<WaveDefinition>) -> Self {
        Self {
            waves,
            active: None,
        }
    }

    /// Consumes world events and emits spawn commands for the active wave.
    pub fn handle(&mut self, events: &[Event], out: &mut Vec<Command>) {
        for event in events {
            match event {
                Event::WaveStarted { wave, difficulty } => self.start_wave(*wave, *difficulty),
                Event::TimeAdvanced { dt } => {
                    if let Some(active) = self.active.as_mut() {
                        for group in &mut active.groups {
                            group.advance(*dt, out);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn start_wave(&mut self, wave: u32, difficulty: Difficulty) {
        let groups = match usize::try_from(wave).ok().and_then(|index| self.waves.get(index)) {
            Some(definition) => definition
                .groups
                .iter()
                .map(|group| ActiveSpawnGroup::start(group, difficulty))
                .collect(),
            None => {
                warn!(wave, "wave has no definition, nothing will spawn");
                Vec::new()
            }
        };

        debug!(wave, groups = groups.len(), "spawn groups activated");
        self.active = Some(ActiveWave {
            index: wave,
            groups,
        });
    }

    /// Reports whether a wave is currently being scheduled.
    #[must_use]
    pub fn is_wave_active(&self) -> bool {
        self.active.is_some()
    }

    /// Zero-based index of the active wave.
    #[must_use]
    pub fn active_wave(&self) -> Option<u32> {
        self.active.as_ref().map(|active| active.index)
    }

    /// Progress of every group in the active wave.
    #[must_use]
    pub fn active_groups(&self) -> &[ActiveSpawnGroup] {
        self.active
            .as_ref()
            .map(|active| active.groups.as_slice())
            .unwrap_or_default()
    }

    /// Reports whether every group of the active wave emitted its full count.
    ///
    /// Returns `false` while no wave is active.
    #[must_use]
    pub fn all_groups_completed(&self) -> bool {
        self.active.as_ref().map_or(false, |active| {
            active.groups.iter().all(ActiveSpawnGroup::is_completed)
        })
    }

    /// Reports whether the active wave is over: everything spawned and nothing alive.
    #[must_use]
    pub fn is_wave_complete(&self, enemies_alive: usize) -> bool {
        self.all_groups_completed() && enemies_alive == 0
    }

    /// Discards the active wave's groups.
    pub fn finish_wave(&mut self) {
        self.active = None;
    }

    /// Number of waves known to the scheduler.
    #[must_use]
    pub fn wave_count(&self) -> usize {
        self.waves.len()
    }

    /// Spawn identifiers referenced by the wave at `index`.
    #[must_use]
    pub fn next_wave_spawn_ids(&self, index: u32) -> BTreeSet<SpawnId> {
        usize::try_from(index)
            .ok()
            .and_then(|index| self.waves.get(index))
            .map(|wave| wave.groups.iter().map(|group| group.spawn.clone()).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(count: u32, interval_ms: u64, delay_ms: u64) -> SpawnGroupDefinition {
        SpawnGroupDefinition {
            spawn: SpawnId::new("west"),
            enemy_type: EnemyTypeId::basic(),
            count,
            interval: Duration::from_millis(interval_ms),
            start_delay: Duration::from_millis(delay_ms),
        }
    }

    #[test]
    fn difficulty_scales_interval_and_count() {
        let difficulty = Difficulty {
            speed_multiplier: 1.0,
            spawn_multiplier: 2.0,
            count_bonus: 2,
        };
        let active = ActiveSpawnGroup::start(&group(3, 1_000, 0), difficulty);
        assert_eq!(active.count(), 5);
        assert_eq!(active.interval(), Duration::from_millis(500));
    }

    #[test]
    fn empty_group_is_completed_immediately() {
        let active = ActiveSpawnGroup::start(&group(0, 1_000, 0), Difficulty::default());
        assert!(active.is_completed());
    }

    #[test]
    fn delay_consumes_ticks_before_emission() {
        let mut active = ActiveSpawnGroup::start(&group(2, 1_000, 200), Difficulty::default());
        let mut out = Vec::new();
        let dt = Duration::from_millis(100);

        active.advance(dt, &mut out);
        active.advance(dt, &mut out);
        assert!(out.is_empty());
        assert_eq!(active.delay_remaining(), Duration::ZERO);

        active.advance(dt, &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(active.spawned(), 1);
    }
}
