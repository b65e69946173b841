#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Lane Defence engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems consume event streams, query immutable
//! snapshots, and respond exclusively with new command batches.

mod data;
mod grid;

use std::time::Duration;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use data::{
    BaseInfo, Difficulty, EnemyDefinition, EnemyTable, EnemyTypeId, GameMap, LanePath,
    MatchRules, SpawnGroupDefinition, SpawnId, SpawnPoint, TowerKind, TowerTemplate,
    WaveDefinition,
};
pub use grid::{cells_on_segment, CellCoord, Grid, TileKind};

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to Lane Defence.";

/// Fixed simulation step used by real-time drivers.
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Speed of projectiles measured in cells per second.
pub const PROJECTILE_SPEED: f32 = 20.0;

/// Distance below which a projectile counts as having reached its target.
pub const PROJECTILE_HIT_RADIUS: f32 = 0.8;

/// Reward credited for a kill when the enemy definition grants nothing.
pub const FALLBACK_REWARD: u32 = 10;

/// Score awarded whenever a wave is cleared.
pub const WAVE_CLEAR_BONUS: u32 = 100;

/// Largest Manhattan distance a wall may span between two towers.
pub const MAX_WALL_LINK_DISTANCE: u32 = 4;

/// Share of a tower's cost refunded when it is sold.
pub const SELL_REFUND_PERCENT: u32 = 50;

/// Slowest game speed multiplier available to players.
pub const MIN_GAME_SPEED: f32 = 0.25;

/// Fastest game speed multiplier available to players.
pub const MAX_GAME_SPEED: f32 = 4.0;

/// Top-level phase of a match.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchState {
    /// The match has been created but not started.
    #[default]
    Menu,
    /// Counting down toward the next wave.
    PreWave,
    /// A wave is in progress and the simulation is running.
    InWave,
    /// A wave is in progress but the simulation is suspended.
    Paused,
    /// Every wave was cleared.
    Won,
    /// The base was destroyed.
    Lost,
}

impl MatchState {
    /// Reports whether players may build, sell or link towers in this state.
    #[must_use]
    pub const fn accepts_construction(self) -> bool {
        matches!(self, Self::PreWave | Self::InWave)
    }

    /// Reports whether the match has ended.
    #[must_use]
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }
}

/// Player interaction mode, orthogonal to [`MatchState`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InteractionMode {
    /// Cursor roams freely.
    #[default]
    Normal,
    /// Confirming places a tower under the cursor.
    Build,
    /// A tower is selected for linking, unlinking or selling.
    Select,
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Leaves the menu and starts the first inter-wave countdown.
    StartMatch,
    /// Advances the match clock by the provided delta time.
    AdvanceClock {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Requests that a spawn point emit a new enemy.
    SpawnEnemy {
        /// Spawn point the enemy emerges from.
        spawn: SpawnId,
        /// Enemy type to instantiate.
        enemy_type: EnemyTypeId,
    },
    /// Removes every enemy whose hit points were depleted.
    PurgeDeadEnemies,
    /// Moves an enemy to a new continuous position.
    MoveEnemy {
        /// Identifier of the enemy being moved.
        enemy: EnemyId,
        /// Position the enemy occupies after moving.
        position: Vec2,
    },
    /// Reports that an enemy reached the base.
    EnemyReachedBase {
        /// Identifier of the arriving enemy.
        enemy: EnemyId,
    },
    /// Decreases every tower cooldown by the provided duration.
    CoolTowers {
        /// Duration of simulated time that elapsed.
        dt: Duration,
    },
    /// Updates the enemy a tower is tracking.
    AssignTarget {
        /// Tower whose target changes.
        tower: TowerId,
        /// New target, or `None` to clear it.
        enemy: Option<EnemyId>,
    },
    /// Requests that a tower launch a projectile at its target.
    FireProjectile {
        /// Tower firing the projectile.
        tower: TowerId,
        /// Enemy the projectile will pursue.
        target: EnemyId,
    },
    /// Moves every projectile and resolves hits.
    AdvanceProjectiles {
        /// Duration of simulated time that elapsed.
        dt: Duration,
    },
    /// Finalises the active wave once it has been cleared.
    CompleteWave,
    /// Switches between running and paused during a wave.
    TogglePause,
    /// Requests placement of a tower at the provided cell.
    PlaceTower {
        /// Type of tower to construct.
        kind: TowerKind,
        /// Cell the tower occupies.
        cell: CellCoord,
    },
    /// Requests that the tower occupying a cell be sold.
    SellTower {
        /// Cell occupied by the tower.
        cell: CellCoord,
    },
    /// Requests a wall linking two towers.
    AddWall {
        /// Cell of the first tower.
        a: CellCoord,
        /// Cell of the second tower.
        b: CellCoord,
    },
    /// Requests removal of the wall linking two towers.
    RemoveWall {
        /// Cell of the first tower.
        a: CellCoord,
        /// Cell of the second tower.
        b: CellCoord,
    },
    /// Switches the player interaction mode.
    SetInteractionMode {
        /// Mode that should become active.
        mode: InteractionMode,
    },
    /// Selects the tower occupying a cell.
    SelectTower {
        /// Cell occupied by the tower.
        cell: CellCoord,
    },
    /// Moves the cursor by the provided offsets, clamped to the grid.
    MoveCursor {
        /// Horizontal offset in cells.
        column_delta: i32,
        /// Vertical offset in cells.
        row_delta: i32,
    },
    /// Changes the game speed multiplier.
    SetGameSpeed {
        /// Requested multiplier, clamped to the supported range.
        speed: f32,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the match clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Announces a transition between match states.
    MatchStateChanged {
        /// State before the transition.
        from: MatchState,
        /// State after the transition.
        to: MatchState,
    },
    /// Announces that a wave began.
    WaveStarted {
        /// Zero-based index of the wave.
        wave: u32,
        /// Difficulty applied to the wave.
        difficulty: Difficulty,
    },
    /// Announces that a wave was cleared.
    WaveCompleted {
        /// Zero-based index of the wave.
        wave: u32,
    },
    /// Confirms that an enemy entered the map.
    EnemySpawned {
        /// Identifier assigned to the enemy.
        enemy: EnemyId,
        /// Spawn point the enemy emerged from.
        spawn: SpawnId,
        /// Cell the enemy occupies after spawning.
        cell: CellCoord,
    },
    /// Reports that an enemy arrived at the base and was removed.
    EnemyReachedBase {
        /// Identifier of the arriving enemy.
        enemy: EnemyId,
        /// Base hit points left after the arrival.
        base_hp: u32,
    },
    /// Reports that the base hit points reached zero.
    BaseDestroyed,
    /// Reports that a dead enemy was purged from the live set.
    EnemyRemoved {
        /// Identifier of the purged enemy.
        enemy: EnemyId,
    },
    /// Reports that an enemy's hit points were depleted by a projectile.
    EnemyKilled {
        /// Identifier of the killed enemy.
        enemy: EnemyId,
        /// Money and score credited for the kill.
        reward: u32,
    },
    /// Reports that a tower's target changed.
    TargetChanged {
        /// Tower whose target changed.
        tower: TowerId,
        /// New target, if any.
        enemy: Option<EnemyId>,
    },
    /// Confirms that a tower launched a projectile.
    ProjectileFired {
        /// Tower that fired.
        tower: TowerId,
        /// Enemy pursued by the projectile.
        target: EnemyId,
    },
    /// Confirms that a projectile struck its target.
    ProjectileHit {
        /// Enemy that was struck.
        target: EnemyId,
        /// Damage applied by the projectile.
        damage: f32,
    },
    /// Confirms that a tower was placed.
    TowerPlaced {
        /// Identifier allocated to the tower.
        tower: TowerId,
        /// Type of tower that was constructed.
        kind: TowerKind,
        /// Cell occupied by the tower.
        cell: CellCoord,
    },
    /// Reports that a tower placement request was rejected.
    TowerPlacementRejected {
        /// Type of tower requested.
        kind: TowerKind,
        /// Cell requested for the tower.
        cell: CellCoord,
        /// Reason the request was rejected.
        reason: PlacementError,
    },
    /// Confirms that a tower was sold.
    TowerSold {
        /// Identifier of the sold tower.
        tower: TowerId,
        /// Cell the tower occupied.
        cell: CellCoord,
        /// Money returned to the player.
        refund: u32,
    },
    /// Reports that a sale request was rejected.
    TowerSaleRejected {
        /// Cell named by the request.
        cell: CellCoord,
        /// Reason the request was rejected.
        reason: SaleError,
    },
    /// Confirms that a wall was added.
    WallAdded {
        /// Wall that now exists.
        wall: WallLink,
    },
    /// Confirms that a wall was removed.
    WallRemoved {
        /// Wall that no longer exists.
        wall: WallLink,
    },
    /// Reports that a wall request was rejected.
    WallRejected {
        /// Wall named by the request.
        wall: WallLink,
        /// Reason the request was rejected.
        reason: WallError,
    },
    /// Reports that walkability and the flow field were recomputed.
    FlowFieldRebuilt {
        /// Number of lane cells currently blocked by walls.
        blocked_cells: usize,
    },
    /// Announces a new interaction mode.
    InteractionModeChanged {
        /// Mode that became active.
        mode: InteractionMode,
    },
    /// Announces that a tower was selected.
    TowerSelected {
        /// Cell occupied by the selected tower.
        cell: CellCoord,
    },
    /// Announces the cursor's new location.
    CursorMoved {
        /// Cell under the cursor.
        cell: CellCoord,
    },
    /// Announces a new game speed multiplier.
    GameSpeedChanged {
        /// Multiplier that became active.
        speed: f32,
    },
}

/// Unique identifier assigned to an enemy. Identifiers are never reused within a match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnemyId(u32);

impl EnemyId {
    /// Creates a new enemy identifier with the provided value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a tower.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TowerId(u32);

impl TowerId {
    /// Creates a new tower identifier with the provided value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unordered link between two tower cells that blocks lane cells beneath it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WallLink {
    a: CellCoord,
    b: CellCoord,
}

impl WallLink {
    /// Creates a wall between two tower cells.
    #[must_use]
    pub const fn new(a: CellCoord, b: CellCoord) -> Self {
        Self { a, b }
    }

    /// First endpoint as requested.
    #[must_use]
    pub const fn a(&self) -> CellCoord {
        self.a
    }

    /// Second endpoint as requested.
    #[must_use]
    pub const fn b(&self) -> CellCoord {
        self.b
    }

    /// Reports whether the wall links the two cells, in either order.
    #[must_use]
    pub fn connects(&self, a: CellCoord, b: CellCoord) -> bool {
        (self.a == a && self.b == b) || (self.a == b && self.b == a)
    }

    /// Reports whether either endpoint is the provided cell.
    #[must_use]
    pub fn touches(&self, cell: CellCoord) -> bool {
        self.a == cell || self.b == cell
    }

    /// Endpoint opposite to `cell`, if the wall touches it.
    #[must_use]
    pub fn other(&self, cell: CellCoord) -> Option<CellCoord> {
        if self.a == cell {
            Some(self.b)
        } else if self.b == cell {
            Some(self.a)
        } else {
            None
        }
    }
}

/// Immutable representation of a single enemy's state used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct EnemySnapshot {
    /// Unique identifier assigned to the enemy.
    pub id: EnemyId,
    /// Type the enemy was instantiated from.
    pub enemy_type: EnemyTypeId,
    /// Continuous position, `x` as column and `y` as row.
    pub position: Vec2,
    /// Remaining hit points.
    pub hp: f32,
    /// Hit points at spawn.
    pub max_hp: f32,
    /// Movement speed in cells per second.
    pub speed: f32,
}

impl EnemySnapshot {
    /// Reports whether the enemy still has hit points.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.hp > 0.0
    }
}

/// Read-only snapshot describing every enemy on the map in spawn order.
#[derive(Clone, Debug, Default)]
pub struct EnemyView {
    snapshots: Vec<EnemySnapshot>,
}

impl EnemyView {
    /// Creates a new enemy view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<EnemySnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured enemy snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &EnemySnapshot> {
        self.snapshots.iter()
    }

    /// Looks up a snapshot by identifier.
    #[must_use]
    pub fn get(&self, id: EnemyId) -> Option<&EnemySnapshot> {
        self.snapshots
            .binary_search_by_key(&id, |snapshot| snapshot.id)
            .ok()
            .and_then(|index| self.snapshots.get(index))
    }

    /// Number of captured snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<EnemySnapshot> {
        self.snapshots
    }
}

/// Immutable representation of a single tower's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TowerSnapshot {
    /// Identifier allocated to the tower by the world.
    pub id: TowerId,
    /// Kind of tower that was constructed.
    pub kind: TowerKind,
    /// Cell occupied by the tower.
    pub cell: CellCoord,
    /// Euclidean reach in cells.
    pub range: f32,
    /// Damage applied by each projectile.
    pub damage: f32,
    /// Time left before the tower may fire again.
    pub cooldown: Duration,
    /// Enemy currently tracked, if any.
    pub target: Option<EnemyId>,
}

/// Read-only snapshot describing all towers placed on the map.
#[derive(Clone, Debug, Default)]
pub struct TowerView {
    snapshots: Vec<TowerSnapshot>,
}

impl TowerView {
    /// Creates a new tower view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<TowerSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured tower snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &TowerSnapshot> {
        self.snapshots.iter()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<TowerSnapshot> {
        self.snapshots
    }
}

/// Immutable representation of an in-flight projectile.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectileSnapshot {
    /// Continuous position of the projectile.
    pub position: Vec2,
    /// Enemy pursued by the projectile.
    pub target: EnemyId,
    /// Damage applied on impact.
    pub damage: f32,
}

/// Reasons a tower placement request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum PlacementError {
    /// The match is not in a state that accepts construction.
    #[error("towers can only be built before or during a wave")]
    InvalidState,
    /// The requested cell lies outside the grid.
    #[error("cell lies outside the map")]
    OutOfBounds,
    /// The requested cell belongs to a lane, spawn or the base.
    #[error("cell is reserved for enemy lanes")]
    Blocked,
    /// Another tower already occupies the cell.
    #[error("cell already holds a tower")]
    Occupied,
    /// The player cannot afford the tower.
    #[error("tower costs {required} but only {available} is available")]
    InsufficientFunds {
        /// Cost of the requested tower.
        required: u32,
        /// Money available to the player.
        available: u32,
    },
}

/// Reasons a tower sale request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum SaleError {
    /// The match is not in a state that accepts construction.
    #[error("towers can only be sold before or during a wave")]
    InvalidState,
    /// No tower occupies the requested cell.
    #[error("no tower occupies the cell")]
    MissingTower,
}

/// Reasons a wall request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum WallError {
    /// The match is not in a state that accepts construction.
    #[error("walls can only be changed before or during a wave")]
    InvalidState,
    /// Both endpoints name the same cell.
    #[error("a wall needs two distinct towers")]
    SameCell,
    /// At least one endpoint holds no tower.
    #[error("both wall endpoints must hold towers")]
    MissingTower,
    /// The endpoints are further apart than walls may span.
    #[error(
        "towers are {distance} cells apart, walls span at most {max}",
        max = MAX_WALL_LINK_DISTANCE
    )]
    TooFar {
        /// Manhattan distance between the endpoints.
        distance: u32,
    },
    /// An equivalent wall already exists.
    #[error("the towers are already linked")]
    Duplicate,
    /// The wall would leave a spawn without a route to the base.
    #[error("the wall would cut a spawn off from the base")]
    WouldDisconnect,
    /// No wall links the requested towers.
    #[error("no wall links the towers")]
    MissingWall,
}
