//! TOML scenario files describing the map, enemy table, waves, session rules
//! and a scripted opening build.

use std::{
    collections::{BTreeMap, BTreeSet},
    time::Duration,
};

use lane_defence_core::{
    BaseInfo, CellCoord, EnemyDefinition, EnemyTable, EnemyTypeId, GameMap, LanePath, MatchRules,
    SpawnGroupDefinition, SpawnId, WaveDefinition,
};
use lane_defence_session::SessionConfig;
use lane_defence_world::navigation::{compute_flow_field, compute_walkability};
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

/// Structural problems detected while loading a scenario.
#[derive(Debug, Error)]
pub(crate) enum ScenarioError {
    /// The file is not valid TOML or does not match the expected layout.
    #[error("scenario decode: {0}")]
    Decode(#[from] toml::de::Error),
    /// The grid has no cells.
    #[error("invalid grid size {columns}x{rows}")]
    InvalidGrid {
        /// Requested column count.
        columns: u32,
        /// Requested row count.
        rows: u32,
    },
    /// A lane has no spawn identifier.
    #[error("lane with empty spawn id")]
    EmptySpawnId,
    /// Two lanes share a spawn identifier.
    #[error("duplicate spawn id {0:?}")]
    DuplicateSpawn(String),
    /// A lane cannot form a segment.
    #[error("lane {0:?} has fewer than 2 waypoints")]
    ShortLane(String),
    /// A lane segment is neither horizontal nor vertical.
    #[error("lane {spawn:?} has a diagonal segment ending at ({column},{row})")]
    DiagonalSegment {
        /// Lane containing the segment.
        spawn: String,
        /// Column of the segment end.
        column: u32,
        /// Row of the segment end.
        row: u32,
    },
    /// A referenced cell lies outside the grid.
    #[error("{what} ({column},{row}) out of bounds")]
    OutOfBounds {
        /// Kind of cell that was out of bounds.
        what: &'static str,
        /// Offending column.
        column: u32,
        /// Offending row.
        row: u32,
    },
    /// The base starts without hit points.
    #[error("base hp must be positive")]
    BaseHp,
    /// A spawn has no walkable route to the base.
    #[error("spawn {0:?} has no route to the base")]
    UnreachableSpawn(String),
    /// An enemy definition is unusable.
    #[error("enemy {id:?} has invalid {field}")]
    InvalidEnemy {
        /// Offending enemy type.
        id: String,
        /// Name of the invalid field.
        field: &'static str,
    },
    /// A wave has no groups.
    #[error("wave {0} has no spawn groups")]
    EmptyWave(usize),
    /// A wave group is unusable.
    #[error("wave {wave} group {group} has invalid {field}")]
    InvalidGroup {
        /// One-based wave number.
        wave: usize,
        /// Zero-based group index.
        group: usize,
        /// Name of the invalid field.
        field: &'static str,
    },
    /// A session duration is negative or not finite.
    #[error("session {0} must be a finite, non-negative number of seconds")]
    InvalidDuration(&'static str),
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScenarioFile {
    map: Option<MapSection>,
    #[serde(default)]
    enemies: BTreeMap<String, EnemySection>,
    waves: Option<Vec<WaveSection>>,
    #[serde(default)]
    session: SessionSection,
    #[serde(default)]
    towers: Vec<[u32; 2]>,
    #[serde(default)]
    walls: Vec<WallSection>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MapSection {
    id: String,
    name: Option<String>,
    columns: u32,
    rows: u32,
    base: BaseSection,
    #[serde(default)]
    lanes: Vec<LaneSection>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BaseSection {
    column: u32,
    row: u32,
    hp: u32,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LaneSection {
    spawn: String,
    waypoints: Vec<[u32; 2]>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EnemySection {
    name: Option<String>,
    hp: f32,
    speed: f32,
    #[serde(default = "default_size")]
    size: u32,
    #[serde(default)]
    reward: u32,
}

fn default_size() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WaveSection {
    groups: Vec<GroupSection>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GroupSection {
    spawn: String,
    enemy_type: String,
    count: u32,
    interval_secs: f32,
    #[serde(default)]
    start_delay_secs: f32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SessionSection {
    starting_money: Option<u32>,
    first_countdown_secs: Option<f32>,
    inter_wave_delay_secs: Option<f32>,
    game_speed: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WallSection {
    a: [u32; 2],
    b: [u32; 2],
}

/// Build action performed before the first tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum BuildAction {
    /// Place a basic tower on the cell.
    Tower(CellCoord),
    /// Link two towers with a wall.
    Wall(CellCoord, CellCoord),
}

/// Fully validated scenario.
#[derive(Debug)]
pub(crate) struct Scenario {
    /// Data the session is built from.
    pub(crate) config: SessionConfig,
    /// Opening build, in file order: towers first, then walls.
    pub(crate) build: Vec<BuildAction>,
}

impl Scenario {
    /// Scenario made of the built-in map, enemies and waves.
    pub(crate) fn fallback() -> Self {
        Self {
            config: SessionConfig::fallback(),
            build: Vec::new(),
        }
    }

    /// Parses and validates a scenario from TOML text.
    pub(crate) fn from_toml(text: &str) -> Result<Self, ScenarioError> {
        let file: ScenarioFile = toml::from_str(text)?;

        let map = match file.map {
            Some(section) => build_map(section)?,
            None => GameMap::fallback(),
        };
        let enemies = if file.enemies.is_empty() {
            EnemyTable::fallback()
        } else {
            build_enemies(file.enemies)?
        };
        let waves = match file.waves {
            Some(sections) => build_waves(sections)?,
            None => WaveDefinition::fallback_set(),
        };
        warn_on_dangling_references(&map, &enemies, &waves);
        let rules = build_rules(&file.session)?;

        let cell = |[column, row]: [u32; 2]| CellCoord::new(column, row);
        let build = file
            .towers
            .into_iter()
            .map(|tower| BuildAction::Tower(cell(tower)))
            .chain(
                file.walls
                    .into_iter()
                    .map(|wall| BuildAction::Wall(cell(wall.a), cell(wall.b))),
            )
            .collect();

        Ok(Self {
            config: SessionConfig {
                map,
                enemies,
                waves,
                rules,
            },
            build,
        })
    }
}

fn build_map(section: MapSection) -> Result<GameMap, ScenarioError> {
    let MapSection {
        id,
        name,
        columns,
        rows,
        base,
        lanes,
    } = section;

    if columns == 0 || rows == 0 {
        return Err(ScenarioError::InvalidGrid { columns, rows });
    }
    let in_bounds = |what, [column, row]: [u32; 2]| {
        if column < columns && row < rows {
            Ok(CellCoord::new(column, row))
        } else {
            Err(ScenarioError::OutOfBounds { what, column, row })
        }
    };
    let base_cell = in_bounds("base", [base.column, base.row])?;
    if base.hp == 0 {
        return Err(ScenarioError::BaseHp);
    }

    let mut seen = BTreeSet::new();
    let mut painted = Vec::with_capacity(lanes.len());
    for lane in lanes {
        if lane.spawn.is_empty() {
            return Err(ScenarioError::EmptySpawnId);
        }
        if !seen.insert(lane.spawn.clone()) {
            return Err(ScenarioError::DuplicateSpawn(lane.spawn));
        }
        if lane.waypoints.len() < 2 {
            return Err(ScenarioError::ShortLane(lane.spawn));
        }

        let waypoints = lane
            .waypoints
            .iter()
            .map(|point| in_bounds("waypoint", *point))
            .collect::<Result<Vec<_>, _>>()?;
        if let Some(pair) = waypoints
            .windows(2)
            .find(|pair| pair[0].column() != pair[1].column() && pair[0].row() != pair[1].row())
        {
            return Err(ScenarioError::DiagonalSegment {
                spawn: lane.spawn,
                column: pair[1].column(),
                row: pair[1].row(),
            });
        }
        painted.push((SpawnId::new(lane.spawn), LanePath { waypoints }));
    }

    let map = GameMap::from_lanes(
        id.clone(),
        name.unwrap_or(id),
        columns,
        rows,
        painted,
        BaseInfo {
            cell: base_cell,
            hp: base.hp,
        },
    );

    let mask = compute_walkability(&map.grid, &BTreeSet::new());
    let field = compute_flow_field(columns, rows, &mask, base_cell);
    if let Some(spawn) = map
        .spawns
        .iter()
        .find(|spawn| !field.sample(spawn.cell).is_reachable())
    {
        return Err(ScenarioError::UnreachableSpawn(spawn.id.to_string()));
    }

    Ok(map)
}

fn build_enemies(sections: BTreeMap<String, EnemySection>) -> Result<EnemyTable, ScenarioError> {
    let mut table = EnemyTable::new();
    for (id, section) in sections {
        let invalid = |field| ScenarioError::InvalidEnemy {
            id: id.clone(),
            field,
        };
        if !(section.hp.is_finite() && section.hp > 0.0) {
            return Err(invalid("hp"));
        }
        if !(section.speed.is_finite() && section.speed > 0.0) {
            return Err(invalid("speed"));
        }
        if section.size == 0 {
            return Err(invalid("size"));
        }

        table.insert(
            EnemyTypeId::new(id.clone()),
            EnemyDefinition {
                name: section.name.unwrap_or_else(|| id.clone()),
                hp: section.hp,
                speed: section.speed,
                size: section.size,
                reward: section.reward,
            },
        );
    }
    Ok(table)
}

fn build_waves(sections: Vec<WaveSection>) -> Result<Vec<WaveDefinition>, ScenarioError> {
    sections
        .into_iter()
        .enumerate()
        .map(|(index, section)| {
            let wave = index + 1;
            if section.groups.is_empty() {
                return Err(ScenarioError::EmptyWave(wave));
            }

            let groups = section
                .groups
                .into_iter()
                .enumerate()
                .map(|(group, definition)| {
                    let invalid = |field| ScenarioError::InvalidGroup { wave, group, field };
                    if definition.spawn.is_empty() {
                        return Err(invalid("spawn"));
                    }
                    if definition.enemy_type.is_empty() {
                        return Err(invalid("enemy_type"));
                    }
                    if definition.count == 0 {
                        return Err(invalid("count"));
                    }
                    let interval = seconds(definition.interval_secs)
                        .filter(|interval| !interval.is_zero())
                        .ok_or_else(|| invalid("interval_secs"))?;
                    let start_delay = seconds(definition.start_delay_secs)
                        .ok_or_else(|| invalid("start_delay_secs"))?;

                    Ok(SpawnGroupDefinition {
                        spawn: SpawnId::new(definition.spawn),
                        enemy_type: EnemyTypeId::new(definition.enemy_type),
                        count: definition.count,
                        interval,
                        start_delay,
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            Ok(WaveDefinition {
                number: u32::try_from(wave).unwrap_or(u32::MAX),
                groups,
            })
        })
        .collect()
}

fn build_rules(section: &SessionSection) -> Result<MatchRules, ScenarioError> {
    let defaults = MatchRules::default();
    let duration = |value: Option<f32>, field, default| match value {
        Some(secs) => seconds(secs).ok_or(ScenarioError::InvalidDuration(field)),
        None => Ok(default),
    };

    Ok(MatchRules {
        starting_money: section.starting_money.unwrap_or(defaults.starting_money),
        first_countdown: duration(
            section.first_countdown_secs,
            "first_countdown_secs",
            defaults.first_countdown,
        )?,
        inter_wave_delay: duration(
            section.inter_wave_delay_secs,
            "inter_wave_delay_secs",
            defaults.inter_wave_delay,
        )?,
        game_speed: section.game_speed.unwrap_or(defaults.game_speed),
    })
}

fn seconds(value: f32) -> Option<Duration> {
    Duration::try_from_secs_f32(value).ok()
}

fn warn_on_dangling_references(map: &GameMap, enemies: &EnemyTable, waves: &[WaveDefinition]) {
    for (index, wave) in waves.iter().enumerate() {
        for group in &wave.groups {
            if map.spawn(&group.spawn).is_none() {
                warn!(wave = index + 1, spawn = %group.spawn, "wave references an unknown spawn");
            }
            if enemies.get(&group.enemy_type).is_none() {
                warn!(
                    wave = index + 1,
                    enemy_type = %group.enemy_type,
                    "wave references an unknown enemy type"
                );
            }
        }
    }
}
