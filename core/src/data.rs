//! Static match definitions consumed by the simulation: maps, enemy table, waves,
//! tower templates and match rules.

use std::{collections::BTreeMap, fmt, time::Duration};

use serde::{Deserialize, Serialize};

use crate::grid::{CellCoord, Grid, TileKind};

/// Identifier of a spawn point as referenced by lanes and wave groups.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpawnId(String);

impl SpawnId {
    /// Creates a new spawn identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrowed textual form of the identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpawnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of an enemy type inside the [`EnemyTable`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnemyTypeId(String);

impl EnemyTypeId {
    /// Creates a new enemy type identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier of the built-in enemy used when a lookup fails.
    #[must_use]
    pub fn basic() -> Self {
        Self::new("basic")
    }

    /// Borrowed textual form of the identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EnemyTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Named lane entry on the map.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnPoint {
    /// Identifier referenced by wave groups.
    pub id: SpawnId,
    /// Cell where enemies emerge.
    pub cell: CellCoord,
}

/// Legacy lane description used only to paint path tiles.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanePath {
    /// Ordered waypoints; consecutive pairs must share a row or a column.
    pub waypoints: Vec<CellCoord>,
}

/// Location and durability of the defended base.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseInfo {
    /// Cell occupied by the base.
    pub cell: CellCoord,
    /// Hit points the base starts the match with.
    pub hp: u32,
}

/// Fully validated map consumed by the simulation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameMap {
    /// Stable identifier of the map.
    pub id: String,
    /// Human readable map name.
    pub name: String,
    /// Tile layout, immutable for the duration of a match.
    pub grid: Grid,
    /// Spawn points in declaration order.
    pub spawns: Vec<SpawnPoint>,
    /// Lane waypoints keyed by the spawn they start from.
    pub paths: BTreeMap<SpawnId, LanePath>,
    /// The defended base.
    pub base: BaseInfo,
}

impl GameMap {
    /// Builds a map by painting lanes onto an empty grid.
    ///
    /// Every axis-aligned waypoint segment becomes [`TileKind::Path`], the first
    /// waypoint of each lane becomes [`TileKind::Spawn`] and the base cell becomes
    /// [`TileKind::Base`]. Diagonal segments are not painted.
    #[must_use]
    pub fn from_lanes(
        id: impl Into<String>,
        name: impl Into<String>,
        columns: u32,
        rows: u32,
        lanes: Vec<(SpawnId, LanePath)>,
        base: BaseInfo,
    ) -> Self {
        let mut grid = Grid::new(columns, rows);
        let mut spawns = Vec::with_capacity(lanes.len());
        let mut paths = BTreeMap::new();

        for (spawn, lane) in lanes {
            for segment in lane.waypoints.windows(2) {
                paint_segment(&mut grid, segment[0], segment[1]);
            }
            if let Some(first) = lane.waypoints.first().copied() {
                spawns.push(SpawnPoint {
                    id: spawn.clone(),
                    cell: first,
                });
            }
            let _ = paths.insert(spawn, lane);
        }

        for spawn in &spawns {
            let _ = grid.set(spawn.cell, TileKind::Spawn);
        }
        let _ = grid.set(base.cell, TileKind::Base);

        Self {
            id: id.into(),
            name: name.into(),
            grid,
            spawns,
            paths,
            base,
        }
    }

    /// Built-in single lane map used when no map data is supplied.
    #[must_use]
    pub fn fallback() -> Self {
        let waypoints = [(0, 10), (10, 10), (10, 5), (25, 5), (25, 15), (39, 15)]
            .into_iter()
            .map(|(column, row)| CellCoord::new(column, row))
            .collect();

        Self::from_lanes(
            "fallback",
            "Fallback",
            40,
            20,
            vec![(SpawnId::new("default"), LanePath { waypoints })],
            BaseInfo {
                cell: CellCoord::new(39, 15),
                hp: 10,
            },
        )
    }

    /// Looks up a spawn point by identifier.
    #[must_use]
    pub fn spawn(&self, id: &SpawnId) -> Option<&SpawnPoint> {
        self.spawns.iter().find(|spawn| &spawn.id == id)
    }
}

fn paint_segment(grid: &mut Grid, from: CellCoord, to: CellCoord) {
    if from.column() == to.column() {
        for row in from.row().min(to.row())..=from.row().max(to.row()) {
            let _ = grid.set(CellCoord::new(from.column(), row), TileKind::Path);
        }
    } else if from.row() == to.row() {
        for column in from.column().min(to.column())..=from.column().max(to.column()) {
            let _ = grid.set(CellCoord::new(column, from.row()), TileKind::Path);
        }
    }
}

/// Static statistics of an enemy type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnemyDefinition {
    /// Display name of the enemy.
    pub name: String,
    /// Hit points an enemy of this type spawns with.
    pub hp: f32,
    /// Movement speed in cells per second before difficulty scaling.
    pub speed: f32,
    /// Visual footprint, kept for renderers.
    pub size: u32,
    /// Money and score credited when the enemy is killed.
    pub reward: u32,
}

impl EnemyDefinition {
    /// Built-in basic enemy used for unknown enemy types.
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            name: "Basic".to_owned(),
            hp: 20.0,
            speed: 5.0,
            size: 1,
            reward: 10,
        }
    }
}

/// Enemy definitions keyed by type identifier.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EnemyTable {
    definitions: BTreeMap<EnemyTypeId, EnemyDefinition>,
}

impl EnemyTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Table containing only the built-in basic enemy.
    #[must_use]
    pub fn fallback() -> Self {
        let mut table = Self::new();
        table.insert(EnemyTypeId::basic(), EnemyDefinition::fallback());
        table
    }

    /// Registers or replaces a definition.
    pub fn insert(&mut self, id: EnemyTypeId, definition: EnemyDefinition) {
        let _ = self.definitions.insert(id, definition);
    }

    /// Looks up a definition by type identifier.
    #[must_use]
    pub fn get(&self, id: &EnemyTypeId) -> Option<&EnemyDefinition> {
        self.definitions.get(id)
    }

    /// Number of registered definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Reports whether the table holds no definitions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// One timed group of enemies inside a wave.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnGroupDefinition {
    /// Spawn point the group emerges from.
    pub spawn: SpawnId,
    /// Enemy type instantiated for each member.
    pub enemy_type: EnemyTypeId,
    /// Number of enemies before difficulty bonuses.
    pub count: u32,
    /// Time between consecutive spawns before difficulty scaling.
    pub interval: Duration,
    /// Time the group waits after the wave starts.
    pub start_delay: Duration,
}

/// Ordered set of spawn groups released together.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveDefinition {
    /// One-based wave number shown to players.
    pub number: u32,
    /// Groups running concurrently once the wave starts.
    pub groups: Vec<SpawnGroupDefinition>,
}

impl WaveDefinition {
    /// Built-in wave list matching [`GameMap::fallback`].
    #[must_use]
    pub fn fallback_set() -> Vec<Self> {
        vec![Self {
            number: 1,
            groups: vec![SpawnGroupDefinition {
                spawn: SpawnId::new("default"),
                enemy_type: EnemyTypeId::basic(),
                count: 5,
                interval: Duration::from_secs(1),
                start_delay: Duration::ZERO,
            }],
        }]
    }
}

/// Enumerates the tower archetypes that can be built.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TowerKind {
    /// Single target projectile tower.
    Basic,
}

impl TowerKind {
    /// Static statistics of the archetype.
    #[must_use]
    pub const fn template(self) -> TowerTemplate {
        match self {
            Self::Basic => TowerTemplate {
                cost: 50,
                range: 5.0,
                damage: 10.0,
                fire_rate: 1.0,
            },
        }
    }
}

/// Statistics shared by every tower of a kind.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TowerTemplate {
    /// Money required to build the tower.
    pub cost: u32,
    /// Euclidean reach measured in cells.
    pub range: f32,
    /// Damage applied by each projectile.
    pub damage: f32,
    /// Shots per second.
    pub fire_rate: f32,
}

impl TowerTemplate {
    /// Cooldown applied after each shot.
    #[must_use]
    pub fn reload(&self) -> Duration {
        if self.fire_rate > 0.0 && self.fire_rate.is_finite() {
            Duration::from_secs_f32(1.0 / self.fire_rate)
        } else {
            Duration::MAX
        }
    }
}

/// Match-wide tunables supplied when a world is created.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchRules {
    /// Money available when the match starts.
    pub starting_money: u32,
    /// Countdown before the first wave.
    pub first_countdown: Duration,
    /// Countdown between consecutive waves.
    pub inter_wave_delay: Duration,
    /// Game speed multiplier applied at match start.
    pub game_speed: f32,
}

impl Default for MatchRules {
    fn default() -> Self {
        Self {
            starting_money: 500,
            first_countdown: Duration::from_secs(5),
            inter_wave_delay: Duration::from_secs(5),
            game_speed: 1.0,
        }
    }
}

/// Difficulty escalation accumulated across cleared waves.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Difficulty {
    /// Multiplier applied to enemy speed at spawn.
    pub speed_multiplier: f32,
    /// Divisor applied to spawn group intervals.
    pub spawn_multiplier: f32,
    /// Extra enemies added to every spawn group.
    pub count_bonus: u32,
}

impl Difficulty {
    /// Difficulty applied after another wave has been cleared.
    #[must_use]
    pub fn escalated(self) -> Self {
        Self {
            speed_multiplier: self.speed_multiplier + 0.1,
            spawn_multiplier: self.spawn_multiplier + 0.05,
            count_bonus: self.count_bonus + 1,
        }
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Self {
            speed_multiplier: 1.0,
            spawn_multiplier: 1.0,
            count_bonus: 0,
        }
    }
}
