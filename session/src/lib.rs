#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Match session that owns the world and drives every system once per tick.
//!
//! [`Session::update`] runs the pipeline in a fixed order: the match clock,
//! spawning, tower cooling, targeting and firing, projectiles, enemy cleanup
//! and movement, and finally the wave completion check. Everything outside
//! the running wave is reached through the imperative entry points, which
//! return typed rejections instead of silently dropping requests.

use std::{collections::BTreeSet, time::Duration};

use lane_defence_core::{
    CellCoord, Command, EnemyTable, Event, GameMap, MatchRules, MatchState, PlacementError,
    SaleError, SpawnId, TowerId, TowerKind, WallError, WaveDefinition,
};
use lane_defence_system_interaction::{Intent, Interaction, InteractionView};
use lane_defence_system_movement::Movement;
use lane_defence_system_spawning::WaveScheduler;
use lane_defence_system_tower_combat::TowerCombat;
use lane_defence_system_tower_targeting::TowerTargeting;
use lane_defence_world::{self as world, navigation::FlowField, query, World};
use tracing::{debug, info};

/// Static data a session is built from and rebuilt from on reset.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Map the match is played on.
    pub map: GameMap,
    /// Enemy definitions keyed by type.
    pub enemies: EnemyTable,
    /// Ordered wave list.
    pub waves: Vec<WaveDefinition>,
    /// Match-wide tunables.
    pub rules: MatchRules,
}

impl SessionConfig {
    /// Configuration with the built-in map, enemy table and waves.
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            map: GameMap::fallback(),
            enemies: EnemyTable::fallback(),
            waves: WaveDefinition::fallback_set(),
            rules: MatchRules::default(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::fallback()
    }
}

/// Single explicit match context.
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    world: World,
    scheduler: WaveScheduler,
    movement: Movement,
    targeting: TowerTargeting,
    combat: TowerCombat,
    interaction: Interaction,
    events: Vec<Event>,
}

impl Session {
    /// Builds a session in the menu state.
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        let world = build_world(&config);
        let scheduler = WaveScheduler::new(config.waves.clone());

        Self {
            config,
            world,
            scheduler,
            movement: Movement::default(),
            targeting: TowerTargeting::new(),
            combat: TowerCombat::new(),
            interaction: Interaction::new(),
            events: Vec::new(),
        }
    }

    /// Leaves the menu and starts the first countdown.
    pub fn start(&mut self) {
        self.apply(Command::StartMatch);
    }

    /// Rebuilds world and systems from the stored configuration and enters the
    /// first countdown.
    pub fn reset(&mut self) {
        info!(map = %self.config.map.id, "session reset");
        self.world = build_world(&self.config);
        self.scheduler = WaveScheduler::new(self.config.waves.clone());
        self.movement = Movement::default();
        self.targeting = TowerTargeting::new();
        self.combat = TowerCombat::new();
        self.interaction = Interaction::new();
        self.events.clear();
        self.start();
    }

    /// Advances the match by `dt` of wall time, scaled by the game speed.
    pub fn update(&mut self, dt: Duration) {
        self.events.clear();

        let dt = scale(dt, query::game_speed(&self.world));
        self.apply(Command::AdvanceClock { dt });
        if !query::is_simulation_running(&self.world) {
            return;
        }

        let mut commands = Vec::new();
        self.scheduler.handle(&self.events, &mut commands);
        self.apply_all(&mut commands);

        self.apply(Command::CoolTowers { dt });
        self.targeting.handle(
            &query::tower_view(&self.world),
            &query::enemy_view(&self.world),
            &mut commands,
        );
        self.apply_all(&mut commands);
        self.combat
            .handle(&query::tower_view(&self.world), &mut commands);
        self.apply_all(&mut commands);
        self.apply(Command::AdvanceProjectiles { dt });

        self.apply(Command::PurgeDeadEnemies);
        self.movement.handle(
            &query::enemy_view(&self.world),
            query::flow_field(&self.world),
            dt,
            &mut commands,
        );
        self.apply_all(&mut commands);

        if query::match_state(&self.world) == MatchState::InWave
            && self
                .scheduler
                .is_wave_complete(query::enemies_alive(&self.world))
        {
            self.apply(Command::CompleteWave);
            self.scheduler.finish_wave();
        }
    }

    /// Places a tower of `kind` on the cursor cell.
    pub fn place_tower(&mut self, kind: TowerKind) -> Result<TowerId, PlacementError> {
        self.place_tower_at(kind, query::cursor(&self.world))
    }

    /// Places a tower of `kind` on `cell`.
    pub fn place_tower_at(
        &mut self,
        kind: TowerKind,
        cell: CellCoord,
    ) -> Result<TowerId, PlacementError> {
        self.apply_checked(
            Command::PlaceTower { kind, cell },
            PlacementError::InvalidState,
            |event| match event {
                Event::TowerPlaced { tower, .. } => Some(Ok(*tower)),
                Event::TowerPlacementRejected { reason, .. } => Some(Err(*reason)),
                _ => None,
            },
        )
    }

    /// Sells the tower on `cell`, returning the refund.
    pub fn sell_tower(&mut self, cell: CellCoord) -> Result<u32, SaleError> {
        self.apply_checked(
            Command::SellTower { cell },
            SaleError::InvalidState,
            |event| match event {
                Event::TowerSold { refund, .. } => Some(Ok(*refund)),
                Event::TowerSaleRejected { reason, .. } => Some(Err(*reason)),
                _ => None,
            },
        )
    }

    /// Links the towers on `a` and `b` with a wall.
    pub fn add_wall(&mut self, a: CellCoord, b: CellCoord) -> Result<(), WallError> {
        self.apply_checked(Command::AddWall { a, b }, WallError::InvalidState, wall_outcome)
    }

    /// Removes the wall between `a` and `b`.
    pub fn remove_wall(&mut self, a: CellCoord, b: CellCoord) -> Result<(), WallError> {
        self.apply_checked(
            Command::RemoveWall { a, b },
            WallError::InvalidState,
            wall_outcome,
        )
    }

    /// Pauses or resumes the running wave.
    pub fn toggle_pause(&mut self) {
        self.apply(Command::TogglePause);
    }

    /// Sets the game speed, clamped to the supported range.
    pub fn set_speed(&mut self, speed: f32) {
        self.apply(Command::SetGameSpeed { speed });
    }

    /// Interprets a player intent under the current interaction mode.
    pub fn handle_intent(&mut self, intent: Intent) {
        if intent == Intent::Restart {
            self.reset();
            return;
        }

        let selected = query::selected_tower(&self.world);
        let linkable = selected
            .map(|cell| query::linkable_towers(&self.world, cell))
            .unwrap_or_default();
        let walls = selected
            .map(|cell| query::walls_for_tower(&self.world, cell))
            .unwrap_or_default();
        let cursor = query::cursor(&self.world);
        let view = InteractionView {
            state: query::match_state(&self.world),
            mode: query::interaction_mode(&self.world),
            cursor,
            selected,
            tower_at_cursor: query::tower_at(&self.world, cursor).is_some(),
            placement: query::placement_check(&self.world, TowerKind::Basic, cursor),
            linkable: &linkable,
            walls: &walls,
            game_speed: query::game_speed(&self.world),
        };

        let mut commands = Vec::new();
        self.interaction.handle(intent, &view, &mut commands);
        self.apply_all(&mut commands);
    }

    /// Read-only access to the world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Configuration the session was built from.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Current flow field.
    #[must_use]
    pub fn flow_field(&self) -> &FlowField {
        query::flow_field(&self.world)
    }

    /// Number of live enemies.
    #[must_use]
    pub fn enemies_alive(&self) -> usize {
        query::enemies_alive(&self.world)
    }

    /// Spawn identifiers used by the running or upcoming wave.
    #[must_use]
    pub fn next_wave_spawn_ids(&self) -> BTreeSet<SpawnId> {
        self.scheduler
            .next_wave_spawn_ids(query::current_wave(&self.world))
    }

    /// Routes from every spawn of the running or upcoming wave to the base.
    ///
    /// Spawns without a route are left out.
    #[must_use]
    pub fn trace_paths_for_next_wave(&self) -> Vec<Vec<CellCoord>> {
        let spawn_ids = self.next_wave_spawn_ids();
        query::map(&self.world)
            .spawns
            .iter()
            .filter(|spawn| spawn_ids.contains(&spawn.id))
            .map(|spawn| query::trace_path(&self.world, spawn.cell))
            .filter(|path| !path.is_empty())
            .collect()
    }

    /// Towers the tower on `cell` could currently be linked to.
    #[must_use]
    pub fn linkable_towers(&self, cell: CellCoord) -> Vec<CellCoord> {
        query::linkable_towers(&self.world, cell)
    }

    /// Events produced by the latest update and any entry point used since.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    fn apply(&mut self, command: Command) {
        world::apply(&mut self.world, command, &mut self.events);
    }

    fn apply_all(&mut self, commands: &mut Vec<Command>) {
        for command in commands.drain(..) {
            world::apply(&mut self.world, command, &mut self.events);
        }
    }

    fn apply_checked<T, E>(
        &mut self,
        command: Command,
        missing: E,
        outcome: impl Fn(&Event) -> Option<Result<T, E>>,
    ) -> Result<T, E> {
        let first = self.events.len();
        self.apply(command);

        let result = self.events[first..].iter().find_map(outcome);
        if result.is_none() {
            debug!("command produced no outcome event");
        }
        result.unwrap_or(Err(missing))
    }
}

fn wall_outcome(event: &Event) -> Option<Result<(), WallError>> {
    match event {
        Event::WallAdded { .. } | Event::WallRemoved { .. } => Some(Ok(())),
        Event::WallRejected { reason, .. } => Some(Err(*reason)),
        _ => None,
    }
}

fn build_world(config: &SessionConfig) -> World {
    let total_waves = u32::try_from(config.waves.len()).unwrap_or(u32::MAX);
    World::new(
        config.map.clone(),
        config.enemies.clone(),
        total_waves,
        config.rules,
    )
}

fn scale(dt: Duration, speed: f32) -> Duration {
    if (speed - 1.0).abs() <= f32::EPSILON {
        dt
    } else {
        dt.mul_f64(f64::from(speed))
    }
}
