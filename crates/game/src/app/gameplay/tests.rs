use std::time::Duration;

use engine::tilemap::parse_tiled_map;
use engine::{
    run_scene, CollisionGrid, DefDatabase, EnemyDef, EnemyDefId, EnemySprites, EntityId,
    FrameInput, InputSnapshot, InputSource, LoopConfig, LoopExit, MapError, MapRegistry,
    MetricsHandle, MovementType, PlayerDef, Scene, SceneDebugCommand, SceneDebugCommandResult,
    SkillDef, SkillDefId, Vec2, WorldMap,
};

use super::enemy::EnemyState;
use super::player::PlayerState;
use super::session::{GameSession, LoadReport, SessionError};

pub(super) fn canonical_defs(player: PlayerDef) -> DefDatabase {
    let enemy = |name: &str, label: &str, health: f32, size: f32, movement, sprite: &str| {
        EnemyDef {
            id: EnemyDefId(0),
            def_name: name.to_string(),
            label: label.to_string(),
            max_health: health,
            width: size,
            height: size,
            movement,
            color: None,
            sprites: EnemySprites {
                idle: format!("{sprite}-idle-sprite"),
                walk: format!("{sprite}-walk-sprite"),
                combat: format!("{sprite}-idle-sprite"),
            },
        }
    };
    let skill = |name: &str, label: &str, damage, cooldown_ms, mana_cost, frames, speed| {
        SkillDef {
            id: SkillDefId(0),
            def_name: name.to_string(),
            label: label.to_string(),
            damage,
            cooldown_ms,
            mana_cost,
            frame_count: frames,
            animation_speed: speed,
            sprite: None,
        }
    };
    DefDatabase::from_defs(
        vec![
            enemy(
                "blue_slime",
                "Blue Slime",
                100.0,
                32.0,
                MovementType::Stationary,
                "blue-slime",
            ),
            enemy(
                "red_demon",
                "Red Demon",
                200.0,
                48.0,
                MovementType::WanderCardinal,
                "red-demon",
            ),
        ],
        vec![
            skill("basic", "Basic Attack", 25.0, 5000.0, 0.0, 6, 15.0),
            skill("heavy", "Heavy Attack", 60.0, 12000.0, 20.0, 8, 10.0),
        ],
        Some(player),
    )
}

pub(super) fn open_grid(width: u32, height: u32) -> CollisionGrid {
    CollisionGrid::from_solid_cells(width, height, 32, &[]).expect("open grid")
}

const ARENA_MAP: &str = r#"{
    "width": 20, "height": 20, "tilewidth": 32, "tileheight": 32,
    "layers": [
        {"type": "tilelayer", "name": "ground", "data": [REPLACE_DATA]},
        {"type": "objectgroup", "name": "spawns", "objects": [
            {"id": 1, "name": "playerSpawn", "x": 200, "y": 200},
            {"id": 2, "name": "blue_slime", "type": "enemy", "x": 200, "y": 228},
            {"id": 3, "name": "green_dragon", "type": "enemy", "x": 500, "y": 500}
        ]}
    ]
}"#;

fn arena_map(name: &str, with_spawns: bool) -> WorldMap {
    let data = vec!["0"; 400].join(",");
    let mut raw = ARENA_MAP.replace("REPLACE_DATA", &data);
    if !with_spawns {
        raw = raw
            .replace(r#""name": "playerSpawn""#, r#""name": "marker""#)
            .replace(r#""type": "enemy""#, r#""type": "decoration""#);
    }
    let tiled = parse_tiled_map(&raw).expect("arena json");
    WorldMap::from_tiled(name, tiled).expect("arena grid")
}

fn session_with(player: PlayerDef) -> GameSession {
    GameSession::new(
        canonical_defs(player),
        MapRegistry::from_sources(Vec::new()),
        "arena",
        42,
    )
}

fn slot_down(slot: usize) -> InputSnapshot {
    InputSnapshot::empty().with_skill_slot_down(slot, true)
}

#[test]
fn load_places_player_and_skips_unknown_enemy_types() {
    let mut session = session_with(PlayerDef::default());
    let report = session.load_map(arena_map("arena", true));
    assert_eq!(
        report,
        LoadReport {
            map: "arena".to_string(),
            player_spawn: Vec2::new(200.0, 200.0),
            used_center_fallback: false,
            spawned: 1,
            skipped: 1,
        }
    );
    assert_eq!(session.entity_count(), 2);
    assert_eq!(
        session.entities().enemies()[0].position(),
        Vec2::new(200.0, 228.0)
    );
}

#[test]
fn missing_spawn_marker_falls_back_to_map_center() {
    let mut session = session_with(PlayerDef::default());
    let report = session.load_map(arena_map("arena", false));
    assert!(report.used_center_fallback);
    assert_eq!(report.player_spawn, Vec2::new(320.0, 320.0));
    assert_eq!(report.spawned, 0);
    assert_eq!(
        session.player().expect("player").position(),
        Vec2::new(320.0, 320.0)
    );
}

#[test]
fn ticking_without_a_map_fails_fast() {
    let mut session = session_with(PlayerDef::default());
    match session.tick(16.0, &InputSnapshot::empty()) {
        Err(SessionError::MapNotLoaded(MapError::NotLoaded)) => {}
        other => panic!("expected MapNotLoaded, got {other:?}"),
    }
    assert!(session.map().is_err());
}

#[test]
fn basic_attacks_kill_a_stationary_enemy() {
    let mut session = session_with(PlayerDef::default());
    session.load_map(arena_map("arena", true));
    let slime_id = session.entities().enemies()[0].id();

    let first = session.tick(16.0, &slot_down(0)).expect("tick");
    let attack = first.attack.expect("attack");
    assert_eq!(attack.skill_key, "basic");
    assert_eq!(attack.hits, vec![slime_id]);
    let slime = session.entities().find(slime_id).expect("slime");
    assert_eq!(slime.health(), 75.0);
    assert_eq!(slime.state(), EnemyState::InCombat);
    assert_eq!(
        session.player().expect("player").state(),
        PlayerState::Attacking
    );

    let mut pruned = Vec::new();
    for _ in 0..3 {
        let report = session.tick(5001.0, &slot_down(0)).expect("tick");
        assert!(report.attack.is_some());
        pruned = report.pruned;
    }
    assert_eq!(pruned, vec![slime_id]);
    assert!(session.entities().find(slime_id).is_none());
    assert_eq!(session.entity_count(), 1);
}

#[test]
fn heavy_attack_stops_when_mana_would_drop_below_cost() {
    let stats = PlayerDef {
        mana_regen: 0.0,
        ..PlayerDef::default()
    };
    let mut session = session_with(stats);
    session.load_map(arena_map("arena", false));

    let mut uses = 0;
    let mut delta = 16.0;
    for _ in 0..5 {
        let report = session.tick(delta, &slot_down(1)).expect("tick");
        if report.attack.is_some() {
            uses += 1;
        }
        delta = 12001.0;
    }
    assert_eq!(uses, 4);
    let player = session.player().expect("player");
    assert_eq!(player.mana(), 20.0);
    assert_eq!(player.state(), PlayerState::Idle);
}

#[test]
fn hud_and_camera_follow_each_tick() {
    let mut session = session_with(PlayerDef::default());
    session.load_map(arena_map("arena", true));
    let report = session
        .tick(16.0, &InputSnapshot::empty().with_direction(Some(engine::Direction::Up)))
        .expect("tick");

    assert_eq!(session.last_hud(), Some(&report.hud));
    assert_eq!(report.now, session.now());
    let player = session.player().expect("player");
    assert!(player.position().y < 200.0);
    let camera = session.camera();
    assert_eq!(camera.position.x, 0.0);
    assert!((camera.position.y - (player.position().y - 150.0)).abs() < 1e-3);
    assert!(session
        .debug_title()
        .expect("title")
        .starts_with("arena | HP 150/150"));
}

#[test]
fn debug_commands_spawn_order_and_dump() {
    let mut session = session_with(PlayerDef::default());
    session.load_map(arena_map("arena", true));

    let spawned = session.execute_debug_command(SceneDebugCommand::Spawn {
        type_key: "red_demon".to_string(),
        position: Vec2::new(400.0, 400.0),
    });
    assert_eq!(
        spawned,
        SceneDebugCommandResult::Success("spawned red_demon as entity 2".to_string())
    );
    let unknown = session.execute_debug_command(SceneDebugCommand::Spawn {
        type_key: "nope".to_string(),
        position: Vec2::ZERO,
    });
    assert!(matches!(unknown, SceneDebugCommandResult::Error(_)));

    let ordered = session.execute_debug_command(SceneDebugCommand::OrderMove {
        entity_id: 2,
        x: 500.0,
        y: 400.0,
    });
    assert!(matches!(ordered, SceneDebugCommandResult::Success(_)));
    let demon = session.entities().find(EntityId(2)).expect("demon");
    assert_eq!(demon.state(), EnemyState::Wandering);
    assert_eq!(demon.target(), Vec2::new(500.0, 400.0));

    match session.execute_debug_command(SceneDebugCommand::DumpState) {
        SceneDebugCommandResult::Success(dump) => {
            assert!(dump.starts_with("map=arena loaded=true"), "{dump}");
            assert!(dump.contains("view=(0,50 450x300)"), "{dump}");
            assert!(dump.contains("type=red_demon"), "{dump}");
            assert_eq!(dump.lines().count(), 4, "{dump}");
        }
        other => panic!("expected dump, got {other:?}"),
    }
}

#[test]
fn spawns_on_the_map_edge_are_pulled_inside() {
    let mut session = session_with(PlayerDef::default());
    let raw = ARENA_MAP
        .replace("REPLACE_DATA", &vec!["0"; 400].join(","))
        .replace(
            r#""name": "playerSpawn", "x": 200, "y": 200"#,
            r#""name": "playerSpawn", "x": 0, "y": 0"#,
        )
        .replace(
            r#""name": "blue_slime", "type": "enemy", "x": 200, "y": 228"#,
            r#""name": "blue_slime", "type": "enemy", "x": 640, "y": 5"#,
        );
    let map = WorldMap::from_tiled("edge", parse_tiled_map(&raw).expect("edge json"))
        .expect("edge grid");

    let report = session.load_map(map);
    assert_eq!(report.player_spawn, Vec2::new(16.0, 16.0));
    assert_eq!(
        session.player().expect("player").position(),
        Vec2::new(16.0, 16.0)
    );
    assert_eq!(
        session.entities().enemies()[0].position(),
        Vec2::new(624.0, 16.0)
    );

    let spawned = session.execute_debug_command(SceneDebugCommand::Spawn {
        type_key: "red_demon".to_string(),
        position: Vec2::new(-100.0, 700.0),
    });
    assert!(matches!(spawned, SceneDebugCommandResult::Success(_)));
    let demon = session.entities().enemies().last().expect("demon");
    assert_eq!(demon.position(), Vec2::new(24.0, 616.0));
}

#[test]
fn debug_spawn_without_a_map_is_an_error() {
    let mut session = session_with(PlayerDef::default());
    let result = session.execute_debug_command(SceneDebugCommand::Spawn {
        type_key: "blue_slime".to_string(),
        position: Vec2::new(100.0, 100.0),
    });
    assert!(matches!(result, SceneDebugCommandResult::Error(_)));
    assert_eq!(session.entities().len(), 0);
}

#[test]
fn failed_map_load_keeps_current_map() {
    let mut session = session_with(PlayerDef::default());
    session.load_map(arena_map("arena", true));
    let result = session.execute_debug_command(SceneDebugCommand::LoadMap {
        name: "missing".to_string(),
    });
    assert!(matches!(result, SceneDebugCommandResult::Error(_)));
    assert_eq!(session.map().expect("map").name(), "arena");
    assert_eq!(session.entity_count(), 2);
}

#[test]
fn reloading_a_map_rebuilds_enemies_and_keeps_the_player() {
    let mut session = session_with(PlayerDef::default());
    session.load_map(arena_map("arena", true));
    let player_id = session.player().expect("player").id();
    session.tick(16.0, &slot_down(1)).expect("tick");

    session.load_map(arena_map("arena2", true));
    let player = session.player().expect("player");
    assert_eq!(player.id(), player_id);
    assert!(player.mana() < player.max_mana());
    assert_eq!(player.state(), PlayerState::Idle);
    assert_eq!(session.entities().len(), 1);
    assert!(session.entities().enemies()[0].id().0 > 1);
}

struct FixedFrames {
    remaining: usize,
    snapshot: InputSnapshot,
}

impl InputSource for FixedFrames {
    fn next_frame(&mut self) -> Option<FrameInput> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(FrameInput::from_snapshot(self.snapshot))
    }
}

#[test]
fn session_runs_under_the_engine_loop() {
    let mut session = session_with(PlayerDef::default());
    session.load_map(arena_map("arena", true));
    let config = LoopConfig {
        fixed_frame_delta: Some(Duration::from_millis(20)),
        ..LoopConfig::default()
    };
    let mut input = FixedFrames {
        remaining: 10,
        snapshot: InputSnapshot::empty().with_direction(Some(engine::Direction::Left)),
    };

    let summary = run_scene(&config, &mut session, &mut input, &MetricsHandle::default());
    assert_eq!(summary.frames, 10);
    assert_eq!(summary.exit, LoopExit::InputExhausted);
    assert_eq!(session.entity_count(), 0);
}
