#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Lane Defence.
//!
//! The world owns the map, enemies, towers, walls, projectiles and match
//! record. [`apply`] is the only way to mutate it; [`query`] exposes read-only
//! views for systems and adapters.

mod combat;
mod lifecycle;
pub mod navigation;
mod towers;
mod walls;

use glam::Vec2;
use lane_defence_core::{
    CellCoord, Command, EnemyDefinition, EnemyId, EnemySnapshot, EnemyTable, EnemyTypeId, Event,
    GameMap, InteractionMode, MatchRules, PlacementError, SaleError, SpawnId, TowerId, TowerKind,
    WallError, WallLink, PROJECTILE_SPEED, SELL_REFUND_PERCENT, WELCOME_BANNER,
};
use tracing::{debug, warn};

use crate::{
    combat::Projectile,
    lifecycle::MatchRecord,
    navigation::FlowField,
    towers::TowerRegistry,
    walls::WallSet,
};

/// Enemy walking the lanes toward the base.
#[derive(Clone, Debug)]
pub(crate) struct Enemy {
    pub(crate) id: EnemyId,
    pub(crate) enemy_type: EnemyTypeId,
    pub(crate) position: Vec2,
    pub(crate) hp: f32,
    pub(crate) max_hp: f32,
    pub(crate) speed: f32,
    pub(crate) reward: u32,
}

impl Enemy {
    pub(crate) fn is_alive(&self) -> bool {
        self.hp > 0.0
    }

    fn snapshot(&self) -> EnemySnapshot {
        EnemySnapshot {
            id: self.id,
            enemy_type: self.enemy_type.clone(),
            position: self.position,
            hp: self.hp,
            max_hp: self.max_hp,
            speed: self.speed,
        }
    }
}

/// Represents the authoritative Lane Defence world state.
#[derive(Debug)]
pub struct World {
    banner: &'static str,
    map: GameMap,
    enemy_table: EnemyTable,
    flow_field: FlowField,
    blocked_cells: usize,
    towers: TowerRegistry,
    walls: WallSet,
    enemies: Vec<Enemy>,
    next_enemy_id: u32,
    projectiles: Vec<Projectile>,
    record: MatchRecord,
}

impl World {
    /// Creates a world for the provided map, enemy table and wave count.
    ///
    /// The match starts in the menu state until [`Command::StartMatch`] is applied.
    #[must_use]
    pub fn new(map: GameMap, enemy_table: EnemyTable, total_waves: u32, rules: MatchRules) -> Self {
        let cursor = CellCoord::new(map.grid.columns() / 2, map.grid.rows() / 2);
        let record = MatchRecord::new(rules, total_waves, map.base.hp, cursor);
        let walls = WallSet::default();
        let (flow_field, blocked_cells) = walls::flow_field_with(&map, walls.iter());

        Self {
            banner: WELCOME_BANNER,
            map,
            enemy_table,
            flow_field,
            blocked_cells,
            towers: TowerRegistry::new(),
            walls,
            enemies: Vec::new(),
            next_enemy_id: 0,
            projectiles: Vec::new(),
            record,
        }
    }

    fn rebuild_flow_field(&mut self, out_events: &mut Vec<Event>) {
        let (flow_field, blocked_cells) = walls::flow_field_with(&self.map, self.walls.iter());
        self.flow_field = flow_field;
        self.blocked_cells = blocked_cells;
        debug!(blocked_cells, "flow field rebuilt");
        out_events.push(Event::FlowFieldRebuilt { blocked_cells });
    }

    fn enemy_definition(&self, enemy_type: &EnemyTypeId) -> EnemyDefinition {
        match self.enemy_table.get(enemy_type) {
            Some(definition) => definition.clone(),
            None => {
                warn!(%enemy_type, "unknown enemy type, spawning the basic enemy instead");
                self.enemy_table
                    .get(&EnemyTypeId::basic())
                    .cloned()
                    .unwrap_or_else(EnemyDefinition::fallback)
            }
        }
    }

    fn spawn_enemy(&mut self, spawn: SpawnId, enemy_type: EnemyTypeId, out_events: &mut Vec<Event>) {
        let Some(cell) = self.map.spawn(&spawn).map(|point| point.cell) else {
            warn!(%spawn, "wave references an unknown spawn point");
            return;
        };

        let definition = self.enemy_definition(&enemy_type);
        let id = EnemyId::new(self.next_enemy_id);
        self.next_enemy_id = self.next_enemy_id.wrapping_add(1);

        self.enemies.push(Enemy {
            id,
            enemy_type,
            position: cell.to_point(),
            hp: definition.hp,
            max_hp: definition.hp,
            speed: definition.speed * self.record.difficulty.speed_multiplier,
            reward: definition.reward,
        });
        debug!(enemy = id.get(), %spawn, "enemy spawned");
        out_events.push(Event::EnemySpawned {
            enemy: id,
            spawn,
            cell,
        });
    }

    fn enemy_reached_base(&mut self, enemy: EnemyId, out_events: &mut Vec<Event>) {
        let Some(index) = self.enemies.iter().position(|candidate| candidate.id == enemy) else {
            return;
        };

        let _ = self.enemies.remove(index);
        let base_hp = self.record.base_hp.saturating_sub(1);
        debug!(enemy = enemy.get(), base_hp, "enemy reached base");
        out_events.push(Event::EnemyReachedBase { enemy, base_hp });
        self.record.damage_base(out_events);
    }

    fn purge_dead_enemies(&mut self, out_events: &mut Vec<Event>) {
        self.enemies.retain(|enemy| {
            if enemy.is_alive() {
                return true;
            }
            out_events.push(Event::EnemyRemoved { enemy: enemy.id });
            false
        });
    }

    fn fire_projectile(&mut self, tower: TowerId, target: EnemyId, out_events: &mut Vec<Event>) {
        let target_alive = self
            .enemies
            .iter()
            .any(|enemy| enemy.id == target && enemy.is_alive());
        let Some(state) = self.towers.get_mut(tower) else {
            return;
        };
        if !target_alive || !state.cooldown.is_zero() {
            return;
        }

        state.cooldown = state.stats.reload();
        self.projectiles.push(Projectile {
            position: state.cell.to_point(),
            target,
            damage: state.stats.damage,
            speed: PROJECTILE_SPEED,
        });
        out_events.push(Event::ProjectileFired { tower, target });
    }

    fn place_tower(&mut self, kind: TowerKind, cell: CellCoord) -> Result<TowerId, PlacementError> {
        query::placement_check(self, kind, cell)?;

        self.record.money -= kind.template().cost;
        Ok(self.towers.insert(kind, cell))
    }

    fn sell_tower(&mut self, cell: CellCoord, out_events: &mut Vec<Event>) -> Result<(), SaleError> {
        if !self.record.state.accepts_construction() {
            return Err(SaleError::InvalidState);
        }
        let tower = self.towers.remove_at(cell).ok_or(SaleError::MissingTower)?;

        let refund = tower.stats.cost * SELL_REFUND_PERCENT / 100;
        self.record.money = self.record.money.saturating_add(refund);
        out_events.push(Event::TowerSold {
            tower: tower.id,
            cell,
            refund,
        });

        for wall in self.walls.remove_touching(cell) {
            out_events.push(Event::WallRemoved { wall });
        }
        if self.record.selected == Some(cell) {
            self.record.set_mode(InteractionMode::Normal, out_events);
        }
        self.rebuild_flow_field(out_events);
        Ok(())
    }

    fn add_wall(&mut self, a: CellCoord, b: CellCoord) -> Result<WallLink, WallError> {
        if !self.record.state.accepts_construction() {
            return Err(WallError::InvalidState);
        }

        let towers = &self.towers;
        walls::validate_link(&self.map, &self.walls, |cell| towers.at(cell).is_some(), a, b)?;

        let wall = WallLink::new(a, b);
        self.walls.insert(wall);
        Ok(wall)
    }

    fn remove_wall(&mut self, a: CellCoord, b: CellCoord) -> Result<WallLink, WallError> {
        if !self.record.state.accepts_construction() {
            return Err(WallError::InvalidState);
        }

        self.walls.remove(a, b).ok_or(WallError::MissingWall)
    }

    fn move_cursor(&mut self, column_delta: i32, row_delta: i32, out_events: &mut Vec<Event>) {
        let clamp = |value: u32, delta: i32, limit: u32| -> u32 {
            let moved = i64::from(value) + i64::from(delta);
            let max = i64::from(limit.saturating_sub(1));
            u32::try_from(moved.clamp(0, max)).unwrap_or(0)
        };
        let cursor = self.record.cursor;
        let moved = CellCoord::new(
            clamp(cursor.column(), column_delta, self.map.grid.columns()),
            clamp(cursor.row(), row_delta, self.map.grid.rows()),
        );

        if moved != cursor {
            self.record.cursor = moved;
            out_events.push(Event::CursorMoved { cell: moved });
        }
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::StartMatch => world.record.start(out_events),
        Command::AdvanceClock { dt } => {
            world.record.advance(dt, out_events);
            out_events.push(Event::TimeAdvanced { dt });
        }
        Command::SpawnEnemy { spawn, enemy_type } => {
            world.spawn_enemy(spawn, enemy_type, out_events);
        }
        Command::PurgeDeadEnemies => world.purge_dead_enemies(out_events),
        Command::MoveEnemy { enemy, position } => {
            if let Some(state) = world
                .enemies
                .iter_mut()
                .find(|candidate| candidate.id == enemy && candidate.is_alive())
            {
                state.position = position;
            }
        }
        Command::EnemyReachedBase { enemy } => world.enemy_reached_base(enemy, out_events),
        Command::CoolTowers { dt } => {
            for tower in world.towers.iter_mut() {
                tower.cooldown = tower.cooldown.saturating_sub(dt);
            }
        }
        Command::AssignTarget { tower, enemy } => {
            if let Some(state) = world.towers.get_mut(tower) {
                if state.target != enemy {
                    state.target = enemy;
                    out_events.push(Event::TargetChanged { tower, enemy });
                }
            }
        }
        Command::FireProjectile { tower, target } => {
            world.fire_projectile(tower, target, out_events);
        }
        Command::AdvanceProjectiles { dt } => {
            let earned = combat::advance_projectiles(
                &mut world.projectiles,
                &mut world.enemies,
                dt,
                out_events,
            );
            world.record.credit_kill(earned);
        }
        Command::CompleteWave => world.record.complete_wave(out_events),
        Command::TogglePause => world.record.toggle_pause(out_events),
        Command::PlaceTower { kind, cell } => match world.place_tower(kind, cell) {
            Ok(tower) => {
                debug!(tower = tower.get(), ?cell, "tower placed");
                out_events.push(Event::TowerPlaced { tower, kind, cell });
            }
            Err(reason) => {
                debug!(?cell, %reason, "tower placement rejected");
                out_events.push(Event::TowerPlacementRejected { kind, cell, reason });
            }
        },
        Command::SellTower { cell } => {
            if let Err(reason) = world.sell_tower(cell, out_events) {
                debug!(?cell, %reason, "tower sale rejected");
                out_events.push(Event::TowerSaleRejected { cell, reason });
            }
        }
        Command::AddWall { a, b } => match world.add_wall(a, b) {
            Ok(wall) => {
                out_events.push(Event::WallAdded { wall });
                world.rebuild_flow_field(out_events);
            }
            Err(reason) => {
                debug!(?a, ?b, %reason, "wall rejected");
                out_events.push(Event::WallRejected {
                    wall: WallLink::new(a, b),
                    reason,
                });
            }
        },
        Command::RemoveWall { a, b } => match world.remove_wall(a, b) {
            Ok(wall) => {
                out_events.push(Event::WallRemoved { wall });
                world.rebuild_flow_field(out_events);
            }
            Err(reason) => {
                out_events.push(Event::WallRejected {
                    wall: WallLink::new(a, b),
                    reason,
                });
            }
        },
        Command::SetInteractionMode { mode } => world.record.set_mode(mode, out_events),
        Command::SelectTower { cell } => {
            if world.towers.at(cell).is_some() {
                world.record.set_mode(InteractionMode::Select, out_events);
                world.record.selected = Some(cell);
                out_events.push(Event::TowerSelected { cell });
            }
        }
        Command::MoveCursor {
            column_delta,
            row_delta,
        } => world.move_cursor(column_delta, row_delta, out_events),
        Command::SetGameSpeed { speed } => world.record.set_game_speed(speed, out_events),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use lane_defence_core::{
        CellCoord, Difficulty, EnemyView, GameMap, InteractionMode, MatchState, PlacementError,
        ProjectileSnapshot, TileKind, TowerKind, TowerSnapshot, TowerView, WallLink,
        MAX_WALL_LINK_DISTANCE,
    };

    use super::World;
    use crate::{
        navigation::{FlowField, MAX_TRACE_STEPS},
        walls,
    };

    /// Retrieves the welcome banner that adapters may display to players.
    #[must_use]
    pub fn welcome_banner(world: &World) -> &'static str {
        world.banner
    }

    /// Map the match is played on.
    #[must_use]
    pub fn map(world: &World) -> &GameMap {
        &world.map
    }

    /// Current flow field toward the base.
    #[must_use]
    pub fn flow_field(world: &World) -> &FlowField {
        &world.flow_field
    }

    /// Number of lane cells currently blocked by walls.
    #[must_use]
    pub fn blocked_cell_count(world: &World) -> usize {
        world.blocked_cells
    }

    /// Current phase of the match.
    #[must_use]
    pub fn match_state(world: &World) -> MatchState {
        world.record.state
    }

    /// Reports whether spawning, towers, projectiles and enemies should advance.
    #[must_use]
    pub fn is_simulation_running(world: &World) -> bool {
        world.record.state == MatchState::InWave
    }

    /// Current player interaction mode.
    #[must_use]
    pub fn interaction_mode(world: &World) -> InteractionMode {
        world.record.mode
    }

    /// Cell under the player's cursor.
    #[must_use]
    pub fn cursor(world: &World) -> CellCoord {
        world.record.cursor
    }

    /// Cell of the selected tower while in [`InteractionMode::Select`].
    #[must_use]
    pub fn selected_tower(world: &World) -> Option<CellCoord> {
        world.record.selected
    }

    /// Money available for construction.
    #[must_use]
    pub fn money(world: &World) -> u32 {
        world.record.money
    }

    /// Accumulated score.
    #[must_use]
    pub fn score(world: &World) -> u32 {
        world.record.score
    }

    /// Remaining base hit points.
    #[must_use]
    pub fn base_hp(world: &World) -> u32 {
        world.record.base_hp
    }

    /// Zero-based index of the running or upcoming wave.
    #[must_use]
    pub fn current_wave(world: &World) -> u32 {
        world.record.waves_completed
    }

    /// Number of waves in the match.
    #[must_use]
    pub fn total_waves(world: &World) -> u32 {
        world.record.total_waves
    }

    /// Number of waves cleared so far.
    #[must_use]
    pub fn waves_cleared(world: &World) -> u32 {
        world.record.waves_cleared
    }

    /// Time left before the next wave starts.
    #[must_use]
    pub fn countdown(world: &World) -> Duration {
        world.record.countdown
    }

    /// Simulated time spent inside waves.
    #[must_use]
    pub fn run_time(world: &World) -> Duration {
        world.record.run_time
    }

    /// Difficulty that applies to the next spawned enemy.
    #[must_use]
    pub fn difficulty(world: &World) -> Difficulty {
        world.record.difficulty
    }

    /// Active game speed multiplier.
    #[must_use]
    pub fn game_speed(world: &World) -> f32 {
        world.record.game_speed
    }

    /// Captures a read-only view of the enemies in spawn order.
    #[must_use]
    pub fn enemy_view(world: &World) -> EnemyView {
        EnemyView::from_snapshots(world.enemies.iter().map(super::Enemy::snapshot).collect())
    }

    /// Number of enemies still on the map with hit points left.
    #[must_use]
    pub fn enemies_alive(world: &World) -> usize {
        world.enemies.iter().filter(|enemy| enemy.is_alive()).count()
    }

    /// Captures a read-only view of the towers in identifier order.
    #[must_use]
    pub fn tower_view(world: &World) -> TowerView {
        TowerView::from_snapshots(world.towers.iter().map(|tower| tower.snapshot()).collect())
    }

    /// Snapshot of the tower occupying the cell.
    #[must_use]
    pub fn tower_at(world: &World, cell: CellCoord) -> Option<TowerSnapshot> {
        world.towers.at(cell).map(|tower| tower.snapshot())
    }

    /// Number of towers on the map.
    #[must_use]
    pub fn tower_count(world: &World) -> usize {
        world.towers.len()
    }

    /// Snapshots of the projectiles in flight.
    #[must_use]
    pub fn projectiles(world: &World) -> Vec<ProjectileSnapshot> {
        world.projectiles.iter().map(|projectile| projectile.snapshot()).collect()
    }

    /// Walls in the order they were built.
    #[must_use]
    pub fn walls(world: &World) -> Vec<WallLink> {
        world.walls.iter().copied().collect()
    }

    /// Cells of the towers linked to the tower at `cell`, in wall order.
    #[must_use]
    pub fn walls_for_tower(world: &World, cell: CellCoord) -> Vec<CellCoord> {
        world
            .walls
            .touching(cell)
            .filter_map(|wall| wall.other(cell))
            .collect()
    }

    /// Towers the tower at `cell` could be linked to right now, in identifier order.
    ///
    /// Excludes towers out of reach, towers already linked and links that would
    /// cut a spawn off from the base.
    #[must_use]
    pub fn linkable_towers(world: &World, cell: CellCoord) -> Vec<CellCoord> {
        if world.towers.at(cell).is_none() {
            return Vec::new();
        }

        world
            .towers
            .iter()
            .map(|tower| tower.cell)
            .filter(|other| *other != cell)
            .filter(|other| other.manhattan_distance(cell) <= MAX_WALL_LINK_DISTANCE)
            .filter(|other| {
                walls::validate_link(
                    &world.map,
                    &world.walls,
                    |candidate| world.towers.at(candidate).is_some(),
                    cell,
                    *other,
                )
                .is_ok()
            })
            .collect()
    }

    /// Path an enemy leaving `start` would follow, excluding `start` itself.
    #[must_use]
    pub fn trace_path(world: &World, start: CellCoord) -> Vec<CellCoord> {
        world
            .flow_field
            .trace_path(start, world.map.base.cell, MAX_TRACE_STEPS)
    }

    /// Checks whether a tower of `kind` could be placed at `cell`.
    pub fn placement_check(
        world: &World,
        kind: TowerKind,
        cell: CellCoord,
    ) -> Result<(), PlacementError> {
        if !world.record.state.accepts_construction() {
            return Err(PlacementError::InvalidState);
        }

        match world.map.grid.tile(cell) {
            None => return Err(PlacementError::OutOfBounds),
            Some(TileKind::Empty) => {}
            Some(TileKind::Path | TileKind::Spawn | TileKind::Base) => {
                return Err(PlacementError::Blocked)
            }
        }

        if world.towers.at(cell).is_some() {
            return Err(PlacementError::Occupied);
        }

        let required = kind.template().cost;
        let available = world.record.money;
        if available < required {
            return Err(PlacementError::InsufficientFunds {
                required,
                available,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lane_defence_core::{BaseInfo, LanePath, MatchState, WaveDefinition};
    use std::time::Duration;

    fn straight_map() -> GameMap {
        GameMap::from_lanes(
            "straight",
            "Straight",
            8,
            3,
            vec![(
                SpawnId::new("west"),
                LanePath {
                    waypoints: vec![CellCoord::new(0, 1), CellCoord::new(7, 1)],
                },
            )],
            BaseInfo {
                cell: CellCoord::new(7, 1),
                hp: 2,
            },
        )
    }

    fn started_world() -> World {
        let mut world = World::new(
            straight_map(),
            EnemyTable::fallback(),
            1,
            MatchRules::default(),
        );
        let mut events = Vec::new();
        apply(&mut world, Command::StartMatch, &mut events);
        world
    }

    fn run_wave(world: &mut World) {
        let mut events = Vec::new();
        apply(
            world,
            Command::AdvanceClock {
                dt: MatchRules::default().first_countdown,
            },
            &mut events,
        );
        assert_eq!(query::match_state(world), MatchState::InWave);
    }

    #[test]
    fn new_world_waits_in_menu() {
        let world = World::new(
            GameMap::fallback(),
            EnemyTable::fallback(),
            WaveDefinition::fallback_set().len() as u32,
            MatchRules::default(),
        );
        assert_eq!(query::match_state(&world), MatchState::Menu);
        assert_eq!(query::money(&world), 500);
        assert_eq!(query::base_hp(&world), 10);
        assert_eq!(query::welcome_banner(&world), WELCOME_BANNER);
    }

    #[test]
    fn clock_always_reports_elapsed_time() {
        let mut world = started_world();
        let mut events = Vec::new();
        let dt = Duration::from_millis(100);
        apply(&mut world, Command::AdvanceClock { dt }, &mut events);
        assert_eq!(events.last(), Some(&Event::TimeAdvanced { dt }));
    }

    #[test]
    fn unknown_enemy_type_spawns_basic_enemy() {
        let mut world = started_world();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SpawnEnemy {
                spawn: SpawnId::new("west"),
                enemy_type: EnemyTypeId::new("dragon"),
            },
            &mut events,
        );

        let enemies = query::enemy_view(&world).into_vec();
        assert_eq!(enemies.len(), 1);
        assert_eq!(enemies[0].hp, EnemyDefinition::fallback().hp);
        assert_eq!(enemies[0].position, Vec2::new(0.0, 1.0));
    }

    #[test]
    fn unknown_spawn_point_spawns_nothing() {
        let mut world = started_world();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SpawnEnemy {
                spawn: SpawnId::new("nowhere"),
                enemy_type: EnemyTypeId::basic(),
            },
            &mut events,
        );
        assert!(events.is_empty());
        assert_eq!(query::enemies_alive(&world), 0);
    }

    #[test]
    fn arrivals_damage_base_until_lost() {
        let mut world = started_world();
        run_wave(&mut world);
        let mut events = Vec::new();
        for _ in 0..2 {
            apply(
                &mut world,
                Command::SpawnEnemy {
                    spawn: SpawnId::new("west"),
                    enemy_type: EnemyTypeId::basic(),
                },
                &mut events,
            );
        }

        events.clear();
        apply(
            &mut world,
            Command::EnemyReachedBase {
                enemy: EnemyId::new(0),
            },
            &mut events,
        );
        assert_eq!(query::base_hp(&world), 1);
        assert_eq!(query::match_state(&world), MatchState::InWave);

        apply(
            &mut world,
            Command::EnemyReachedBase {
                enemy: EnemyId::new(1),
            },
            &mut events,
        );
        assert_eq!(query::base_hp(&world), 0);
        assert_eq!(query::match_state(&world), MatchState::Lost);
        assert!(events.contains(&Event::BaseDestroyed));
        assert_eq!(query::enemies_alive(&world), 0);
    }

    #[test]
    fn placement_rejections_leave_money_untouched() {
        let mut world = started_world();
        let mut events = Vec::new();

        apply(
            &mut world,
            Command::PlaceTower {
                kind: TowerKind::Basic,
                cell: CellCoord::new(3, 1),
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::PlaceTower {
                kind: TowerKind::Basic,
                cell: CellCoord::new(30, 1),
            },
            &mut events,
        );

        assert_eq!(
            events,
            vec![
                Event::TowerPlacementRejected {
                    kind: TowerKind::Basic,
                    cell: CellCoord::new(3, 1),
                    reason: PlacementError::Blocked,
                },
                Event::TowerPlacementRejected {
                    kind: TowerKind::Basic,
                    cell: CellCoord::new(30, 1),
                    reason: PlacementError::OutOfBounds,
                },
            ]
        );
        assert_eq!(query::money(&world), 500);
    }

    #[test]
    fn placement_spends_money_and_rejects_occupied_cells() {
        let mut world = started_world();
        let mut events = Vec::new();
        let cell = CellCoord::new(3, 0);

        apply(
            &mut world,
            Command::PlaceTower {
                kind: TowerKind::Basic,
                cell,
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::PlaceTower {
                kind: TowerKind::Basic,
                cell,
            },
            &mut events,
        );

        assert_eq!(query::money(&world), 450);
        assert_eq!(query::tower_count(&world), 1);
        assert!(matches!(
            events.last(),
            Some(Event::TowerPlacementRejected {
                reason: PlacementError::Occupied,
                ..
            })
        ));
    }

    #[test]
    fn placement_requires_funds() {
        let mut world = World::new(
            straight_map(),
            EnemyTable::fallback(),
            1,
            MatchRules {
                starting_money: 30,
                ..MatchRules::default()
            },
        );
        let mut events = Vec::new();
        apply(&mut world, Command::StartMatch, &mut events);

        assert_eq!(
            query::placement_check(&world, TowerKind::Basic, CellCoord::new(2, 0)),
            Err(PlacementError::InsufficientFunds {
                required: 50,
                available: 30,
            })
        );
    }

    #[test]
    fn construction_is_rejected_in_menu() {
        let mut world = World::new(straight_map(), EnemyTable::fallback(), 1, MatchRules::default());
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SellTower {
                cell: CellCoord::new(2, 0),
            },
            &mut events,
        );
        assert_eq!(
            events,
            vec![Event::TowerSaleRejected {
                cell: CellCoord::new(2, 0),
                reason: SaleError::InvalidState,
            }]
        );
    }

    #[test]
    fn cursor_is_clamped_to_grid() {
        let mut world = started_world();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::MoveCursor {
                column_delta: -100,
                row_delta: 100,
            },
            &mut events,
        );
        assert_eq!(query::cursor(&world), CellCoord::new(0, 2));
    }

    #[test]
    fn selecting_requires_a_tower() {
        let mut world = started_world();
        let mut events = Vec::new();
        let cell = CellCoord::new(2, 0);
        apply(&mut world, Command::SelectTower { cell }, &mut events);
        assert_eq!(query::interaction_mode(&world), InteractionMode::Normal);

        apply(
            &mut world,
            Command::PlaceTower {
                kind: TowerKind::Basic,
                cell,
            },
            &mut events,
        );
        apply(&mut world, Command::SelectTower { cell }, &mut events);
        assert_eq!(query::interaction_mode(&world), InteractionMode::Select);
        assert_eq!(query::selected_tower(&world), Some(cell));
    }

    #[test]
    fn firing_requires_cooldown_and_live_target() {
        let mut world = started_world();
        run_wave(&mut world);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::PlaceTower {
                kind: TowerKind::Basic,
                cell: CellCoord::new(1, 0),
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::SpawnEnemy {
                spawn: SpawnId::new("west"),
                enemy_type: EnemyTypeId::basic(),
            },
            &mut events,
        );

        events.clear();
        let fire = Command::FireProjectile {
            tower: TowerId::new(0),
            target: EnemyId::new(0),
        };
        apply(&mut world, fire.clone(), &mut events);
        apply(&mut world, fire, &mut events);

        assert_eq!(
            events,
            vec![Event::ProjectileFired {
                tower: TowerId::new(0),
                target: EnemyId::new(0),
            }]
        );
        assert_eq!(query::projectiles(&world).len(), 1);
        let tower = query::tower_at(&world, CellCoord::new(1, 0)).expect("tower");
        assert_eq!(tower.cooldown, Duration::from_secs(1));
    }
}
