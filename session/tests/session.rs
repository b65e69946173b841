use std::time::Duration;

use lane_defence_core::{
    BaseInfo, CellCoord, EnemyTable, EnemyTypeId, Event, GameMap, InteractionMode, LanePath,
    MatchRules, MatchState, PlacementError, SaleError, SpawnGroupDefinition, SpawnId, TowerKind,
    WallError, WaveDefinition, TICK_INTERVAL,
};
use lane_defence_session::{Session, SessionConfig};
use lane_defence_system_interaction::Intent;
use lane_defence_world::query;

fn lane(points: &[(u32, u32)]) -> LanePath {
    LanePath {
        waypoints: points
            .iter()
            .map(|(column, row)| CellCoord::new(*column, *row))
            .collect(),
    }
}

fn basic_wave(spawn: &str, count: u32) -> WaveDefinition {
    WaveDefinition {
        number: 1,
        groups: vec![SpawnGroupDefinition {
            spawn: SpawnId::new(spawn),
            enemy_type: EnemyTypeId::basic(),
            count,
            interval: Duration::from_secs(1),
            start_delay: Duration::ZERO,
        }],
    }
}

/// 10x10 board with a spawn on (0, 0) and the base on (9, 9).
fn corner_config(waves: Vec<WaveDefinition>) -> SessionConfig {
    SessionConfig {
        map: GameMap::from_lanes(
            "corner",
            "Corner",
            10,
            10,
            vec![(SpawnId::new("origin"), lane(&[(0, 0), (9, 0), (9, 9)]))],
            BaseInfo {
                cell: CellCoord::new(9, 9),
                hp: 10,
            },
        ),
        enemies: EnemyTable::fallback(),
        waves,
        rules: MatchRules {
            first_countdown: Duration::ZERO,
            ..MatchRules::default()
        },
    }
}

fn started(config: SessionConfig) -> Session {
    let mut session = Session::new(config);
    session.start();
    session
}

#[test]
fn three_enemies_walk_into_the_base() {
    let mut session = started(corner_config(vec![basic_wave("origin", 3)]));

    let mut spawn_ticks = Vec::new();
    for tick in 0..200 {
        session.update(TICK_INTERVAL);
        for event in session.events() {
            if let Event::EnemySpawned { cell, .. } = event {
                assert_eq!(*cell, CellCoord::new(0, 0));
                spawn_ticks.push(tick);
            }
        }
        if query::match_state(session.world()).is_finished() {
            break;
        }
    }

    assert_eq!(spawn_ticks, vec![0, 10, 20], "first at once, then one per second");
    assert_eq!(query::base_hp(session.world()), 7);
    assert_eq!(session.enemies_alive(), 0);
    assert_eq!(query::match_state(session.world()), MatchState::Won);
    assert_eq!(query::waves_cleared(session.world()), 1);
}

#[test]
fn tower_acquires_and_fires_in_the_same_tick() {
    let config = SessionConfig {
        map: GameMap::from_lanes(
            "range",
            "Range",
            11,
            11,
            vec![(SpawnId::new("west"), lane(&[(0, 3), (10, 3)]))],
            BaseInfo {
                cell: CellCoord::new(10, 3),
                hp: 10,
            },
        ),
        ..corner_config(vec![basic_wave("west", 1)])
    };
    let mut session = started(config);
    assert!(session
        .place_tower_at(TowerKind::Basic, CellCoord::new(5, 5))
        .is_ok());

    let mut fired = None;
    for tick in 0..40 {
        session.update(TICK_INTERVAL);
        let events = session.events();
        let acquired = events
            .iter()
            .position(|event| matches!(event, Event::TargetChanged { enemy: Some(_), .. }));
        let shot = events
            .iter()
            .position(|event| matches!(event, Event::ProjectileFired { .. }));
        if let Some(shot) = shot {
            let acquired = acquired.expect("first shot follows acquisition in the same tick");
            assert!(acquired < shot);
            fired = Some(tick);
            break;
        }
    }

    let fired = fired.expect("the tower fires while the enemy passes");
    let tower = query::tower_at(session.world(), CellCoord::new(5, 5)).expect("tower placed");
    assert!(!tower.cooldown.is_zero(), "firing starts the reload");
    assert!(fired < 20, "enemy enters range well before the base: {fired}");
}

#[test]
fn enemies_die_to_towers_and_pay_out() {
    let config = SessionConfig {
        map: GameMap::from_lanes(
            "long",
            "Long",
            30,
            3,
            vec![(SpawnId::new("west"), lane(&[(0, 1), (29, 1)]))],
            BaseInfo {
                cell: CellCoord::new(29, 1),
                hp: 10,
            },
        ),
        ..corner_config(vec![basic_wave("west", 1)])
    };
    let mut session = started(config);
    for column in [4, 8, 12] {
        assert!(session
            .place_tower_at(TowerKind::Basic, CellCoord::new(column, 0))
            .is_ok());
    }
    let money_before = query::money(session.world());

    let mut kills = 0;
    for _ in 0..100 {
        session.update(TICK_INTERVAL);
        kills += session
            .events()
            .iter()
            .filter(|event| matches!(event, Event::EnemyKilled { .. }))
            .count();
        if query::match_state(session.world()).is_finished() {
            break;
        }
    }

    assert_eq!(kills, 1, "the reward is credited exactly once");
    assert_eq!(query::base_hp(session.world()), 10);
    assert_eq!(query::money(session.world()), money_before + 10);
    assert_eq!(query::score(session.world()), 10 + 100, "kill reward plus clear bonus");
    assert_eq!(query::match_state(session.world()), MatchState::Won);
}

#[test]
fn reset_restores_the_starting_position() {
    let mut session = started(corner_config(vec![basic_wave("origin", 3), basic_wave("origin", 3)]));
    assert!(session
        .place_tower_at(TowerKind::Basic, CellCoord::new(5, 5))
        .is_ok());
    assert!(session
        .place_tower_at(TowerKind::Basic, CellCoord::new(5, 7))
        .is_ok());
    assert_eq!(session.add_wall(CellCoord::new(5, 5), CellCoord::new(5, 7)), Ok(()));
    for _ in 0..60 {
        session.update(TICK_INTERVAL);
    }
    assert_ne!(query::base_hp(session.world()), 10, "enemies got through");

    session.reset();

    let world = session.world();
    assert_eq!(query::match_state(world), MatchState::PreWave);
    assert_eq!(query::money(world), 500);
    assert_eq!(query::base_hp(world), 10);
    assert_eq!(query::current_wave(world), 0);
    assert_eq!(query::score(world), 0);
    assert_eq!(query::tower_count(world), 0);
    assert!(query::walls(world).is_empty());
    assert_eq!(session.enemies_alive(), 0);
    assert_eq!(query::cursor(world), CellCoord::new(5, 5));
}

#[test]
fn pause_freezes_the_simulation() {
    let mut session = started(corner_config(vec![basic_wave("origin", 3)]));
    session.update(TICK_INTERVAL);
    assert_eq!(query::match_state(session.world()), MatchState::InWave);

    session.toggle_pause();
    let frozen = query::enemy_view(session.world()).into_vec();
    for _ in 0..20 {
        session.update(TICK_INTERVAL);
    }

    assert_eq!(query::match_state(session.world()), MatchState::Paused);
    assert_eq!(query::enemy_view(session.world()).into_vec(), frozen);

    session.toggle_pause();
    session.update(TICK_INTERVAL);
    assert_ne!(query::enemy_view(session.world()).into_vec(), frozen);
}

#[test]
fn game_speed_scales_every_subsystem() {
    let mut session = started(corner_config(vec![basic_wave("origin", 3)]));
    session.set_speed(2.0);

    session.update(TICK_INTERVAL);

    let enemies = query::enemy_view(session.world()).into_vec();
    assert_eq!(enemies.len(), 1);
    assert!(
        (enemies[0].position.x - 1.0).abs() < 1e-5,
        "double speed walks a full cell per tick, got {:?}",
        enemies[0].position
    );

    session.set_speed(100.0);
    assert_eq!(query::game_speed(session.world()), 4.0);
}

#[test]
fn entry_points_report_typed_rejections() {
    let mut session = Session::new(corner_config(vec![basic_wave("origin", 1)]));
    assert_eq!(
        session.place_tower_at(TowerKind::Basic, CellCoord::new(5, 5)),
        Err(PlacementError::InvalidState),
        "nothing can be built from the menu"
    );
    session.start();

    assert_eq!(
        session.place_tower_at(TowerKind::Basic, CellCoord::new(3, 0)),
        Err(PlacementError::Blocked)
    );
    assert_eq!(
        session.place_tower_at(TowerKind::Basic, CellCoord::new(10, 0)),
        Err(PlacementError::OutOfBounds)
    );
    assert_eq!(
        session.sell_tower(CellCoord::new(1, 1)),
        Err(SaleError::MissingTower)
    );
    assert_eq!(
        session.add_wall(CellCoord::new(1, 1), CellCoord::new(1, 1)),
        Err(WallError::SameCell)
    );

    for row in [2, 3] {
        for column in 0..5 {
            assert!(session
                .place_tower_at(TowerKind::Basic, CellCoord::new(column, row))
                .is_ok());
        }
    }
    assert_eq!(query::money(session.world()), 0);
    assert_eq!(
        session.place_tower_at(TowerKind::Basic, CellCoord::new(0, 4)),
        Err(PlacementError::InsufficientFunds {
            required: 50,
            available: 0,
        })
    );
    assert_eq!(
        session.place_tower_at(TowerKind::Basic, CellCoord::new(0, 3)),
        Err(PlacementError::Occupied)
    );
}

#[test]
fn restart_intent_resets_the_match() {
    let mut session = started(corner_config(vec![basic_wave("origin", 1)]));
    session.handle_intent(Intent::ToggleBuild);
    session.handle_intent(Intent::Confirm);
    assert_eq!(query::tower_count(session.world()), 1);
    assert_eq!(
        query::interaction_mode(session.world()),
        InteractionMode::Normal
    );

    session.handle_intent(Intent::Restart);

    assert_eq!(query::tower_count(session.world()), 0);
    assert_eq!(query::match_state(session.world()), MatchState::PreWave);
}

#[test]
fn zero_waves_win_once_the_countdown_expires() {
    let mut session = started(SessionConfig {
        rules: MatchRules::default(),
        ..corner_config(Vec::new())
    });

    for _ in 0..49 {
        session.update(TICK_INTERVAL);
    }
    assert_eq!(query::match_state(session.world()), MatchState::PreWave);

    session.update(TICK_INTERVAL);
    assert_eq!(query::match_state(session.world()), MatchState::Won);
}

#[test]
fn fallback_session_previews_the_first_route() {
    let session = started(SessionConfig::fallback());

    assert_eq!(
        session.next_wave_spawn_ids().into_iter().collect::<Vec<_>>(),
        vec![SpawnId::new("default")]
    );
    let paths = session.trace_paths_for_next_wave();
    assert_eq!(paths.len(), 1);
    assert_eq!(paths[0].last(), Some(&CellCoord::new(39, 15)));
}

#[test]
fn identical_inputs_replay_identically() {
    fn run() -> (Vec<Event>, u32, u32) {
        let mut session = started(corner_config(vec![basic_wave("origin", 4)]));
        let mut log = Vec::new();
        assert!(session
            .place_tower_at(TowerKind::Basic, CellCoord::new(4, 1))
            .is_ok());
        for tick in 0..80 {
            if tick == 30 {
                session.set_speed(2.0);
            }
            session.update(TICK_INTERVAL);
            log.extend_from_slice(session.events());
        }
        (
            log,
            query::base_hp(session.world()),
            query::money(session.world()),
        )
    }

    let first = run();
    let second = run();
    assert!(!first.0.is_empty());
    assert_eq!(first, second, "replay diverged between runs");
}
