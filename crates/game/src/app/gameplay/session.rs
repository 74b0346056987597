use std::fmt::Write as _;

use engine::{
    Camera2D, DefDatabase, EntityId, InputSnapshot, MapError, MapLoadError, MapRegistry, MapSlot,
    Scene, SceneCommand, SceneDebugCommand, SceneDebugCommandResult, SimClock, SimTime, Vec2,
    WorldMap,
};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::entity_manager::EntityManager;
use super::hud::HudSnapshot;
use super::player::{AttackReport, Player, PlayerIntent};
use super::{ENEMY_OBJECT_CLASS, PLAYER_SPAWN_OBJECT};

#[derive(Debug, Error)]
pub(crate) enum SessionError {
    #[error("session cannot tick: {0}")]
    MapNotLoaded(#[from] MapError),
    #[error(transparent)]
    MapLoad(#[from] MapLoadError),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LoadReport {
    pub(crate) map: String,
    pub(crate) player_spawn: Vec2,
    pub(crate) used_center_fallback: bool,
    pub(crate) spawned: usize,
    pub(crate) skipped: usize,
}

#[derive(Debug, Clone)]
pub(crate) struct TickReport {
    pub(crate) now: SimTime,
    pub(crate) attack: Option<AttackReport>,
    pub(crate) pruned: Vec<EntityId>,
    pub(crate) hud: HudSnapshot,
}

/// One play session: the current map, the player, every enemy and the clock
/// that drives them.
pub(crate) struct GameSession {
    defs: DefDatabase,
    registry: MapRegistry,
    active_map: String,
    map: MapSlot,
    player: Option<Player>,
    entities: EntityManager,
    clock: SimClock,
    camera: Camera2D,
    last_hud: Option<HudSnapshot>,
}

impl GameSession {
    pub(crate) fn new(
        defs: DefDatabase,
        registry: MapRegistry,
        start_map: impl Into<String>,
        seed: u64,
    ) -> Self {
        Self {
            defs,
            registry,
            active_map: start_map.into(),
            map: MapSlot::empty(),
            player: None,
            entities: EntityManager::new(seed),
            clock: SimClock::new(),
            camera: Camera2D::default(),
            last_hud: None,
        }
    }

    pub(crate) fn player(&self) -> Option<&Player> {
        self.player.as_ref()
    }

    pub(crate) fn entities(&self) -> &EntityManager {
        &self.entities
    }

    pub(crate) fn camera(&self) -> &Camera2D {
        &self.camera
    }

    pub(crate) fn now(&self) -> SimTime {
        self.clock.now()
    }

    pub(crate) fn map(&self) -> Result<&WorldMap, MapError> {
        self.map.get()
    }

    pub(crate) fn last_hud(&self) -> Option<&HudSnapshot> {
        self.last_hud.as_ref()
    }

    /// Swaps in `map` wholesale: enemies are rebuilt from its object layers
    /// and the player moves to its spawn marker.
    pub(crate) fn load_map(&mut self, map: WorldMap) -> LoadReport {
        let map_name = map.name().to_string();
        let map_size = map.pixel_size();
        let (player_spawn, used_center_fallback) =
            match map.find_object_by_name(PLAYER_SPAWN_OBJECT) {
                Some(spawn) => (spawn, false),
                None => {
                    let center = Vec2::new(map_size.x / 2.0, map_size.y / 2.0);
                    warn!(
                        map = %map_name,
                        x = center.x,
                        y = center.y,
                        "player_spawn_missing_using_center"
                    );
                    (center, true)
                }
            };
        let enemy_spawns: Vec<(String, Vec2)> = map
            .objects_of_class(ENEMY_OBJECT_CLASS)
            .map(|object| (object.name.clone(), Vec2::new(object.x, object.y)))
            .collect();

        self.entities.clear();
        self.map.replace(map);
        self.active_map = map_name.clone();
        let player = match self.player.take() {
            Some(player) => player,
            None => Player::new(
                self.entities.reserve_id(),
                player_spawn,
                *self.defs.player_def(),
            ),
        };
        let player = self.player.insert(player);
        player.place_at(player_spawn, map_size);
        let player_spawn = player.position();

        let mut spawned = 0;
        let mut skipped = 0;
        for (type_key, position) in &enemy_spawns {
            match self
                .entities
                .spawn(type_key, *position, map_size, &self.defs)
            {
                Ok(_) => spawned += 1,
                Err(err) => {
                    warn!(map = %map_name, error = %err, "enemy_spawn_skipped");
                    skipped += 1;
                }
            }
        }
        self.camera.follow(player_spawn, map_size);
        info!(map = %map_name, spawned, skipped, "session_map_ready");

        LoadReport {
            map: map_name,
            player_spawn,
            used_center_fallback,
            spawned,
            skipped,
        }
    }

    /// Loads through the map registry. On failure the current map stays.
    pub(crate) fn load_map_named(&mut self, name: &str) -> Result<LoadReport, SessionError> {
        let map = self.registry.load(name)?;
        Ok(self.load_map(map))
    }

    /// One simulation step: player, then enemies, then camera.
    pub(crate) fn tick(
        &mut self,
        delta_ms: f32,
        input: &InputSnapshot,
    ) -> Result<TickReport, SessionError> {
        let delta_ms = if delta_ms.is_finite() {
            delta_ms.max(0.0)
        } else {
            0.0
        };
        let map = self.map.get()?;
        let Some(player) = self.player.as_mut() else {
            return Err(MapError::NotLoaded.into());
        };
        let now = self.clock.advance(delta_ms);

        let intent = PlayerIntent::from_snapshot(input);
        let attack = player.update(
            &intent,
            delta_ms,
            now,
            map.grid(),
            &self.defs,
            &mut self.entities,
        );
        let pruned = self
            .entities
            .update(delta_ms, now, map.grid(), player.base());
        self.camera.follow(player.position(), map.pixel_size());

        let hud = HudSnapshot::capture(player, &self.defs, input, now);
        self.last_hud = Some(hud.clone());
        Ok(TickReport {
            now,
            attack,
            pruned,
            hud,
        })
    }

    pub(crate) fn dump_state(&self) -> String {
        let view = self.camera.visible_rect();
        let mut out = format!(
            "map={} loaded={} t={:.0}ms view=({:.0},{:.0} {:.0}x{:.0})",
            self.active_map,
            self.map.is_loaded(),
            self.clock.now().as_millis(),
            view.x,
            view.y,
            view.width,
            view.height
        );
        if let Some(player) = &self.player {
            let position = player.position();
            let _ = write!(
                out,
                "\nplayer id={} pos=({:.1},{:.1}) state={} facing={:?} frame={} hp={:.1}/{:.0} mp={:.1}/{:.0}",
                player.id().0,
                position.x,
                position.y,
                player.state().as_str(),
                player.facing(),
                player.animation_frame(),
                player.health(),
                player.max_health(),
                player.mana(),
                player.max_mana()
            );
        }
        for enemy in self.entities.enemies() {
            let position = enemy.position();
            let _ = write!(
                out,
                "\nenemy id={} type={} pos=({:.1},{:.1}) state={} facing={:?} sprite={}#{} hp={:.1}/{:.0}",
                enemy.id().0,
                enemy.type_key(),
                position.x,
                position.y,
                enemy.state().as_str(),
                enemy.facing(),
                enemy.current_sprite(),
                enemy.animation_frame(),
                enemy.health(),
                enemy.max_health()
            );
        }
        out
    }
}

impl Scene for GameSession {
    fn load(&mut self) {
        if self.map.is_loaded() {
            info!(map = %self.active_map, "session_resumed");
            return;
        }
        let name = self.active_map.clone();
        if let Err(err) = self.load_map_named(&name) {
            error!(map = %name, error = %err, "session_load_failed");
        }
    }

    fn update(&mut self, delta_ms: f32, input: &InputSnapshot) -> SceneCommand {
        match self.tick(delta_ms, input) {
            Ok(report) => {
                if let Some(attack) = &report.attack {
                    debug!(skill = %attack.skill_key, hits = attack.hits.len(), "tick_attack");
                }
                if !report.pruned.is_empty() {
                    debug!(count = report.pruned.len(), "tick_pruned");
                }
                SceneCommand::None
            }
            Err(err) => {
                error!(error = %err, "session_tick_failed");
                SceneCommand::Quit
            }
        }
    }

    fn unload(&mut self) {
        self.entities.clear();
        self.map.clear();
        self.player = None;
        self.last_hud = None;
        info!(map = %self.active_map, "session_unloaded");
    }

    fn entity_count(&self) -> usize {
        self.entities.len() + usize::from(self.player.is_some())
    }

    fn debug_title(&self) -> Option<String> {
        let hud = self.last_hud.as_ref()?;
        Some(format!("{} | {}", self.active_map, hud.render_line()))
    }

    fn execute_debug_command(&mut self, command: SceneDebugCommand) -> SceneDebugCommandResult {
        match command {
            SceneDebugCommand::LoadMap { name } => match self.load_map_named(&name) {
                Ok(report) => SceneDebugCommandResult::Success(format!(
                    "loaded map '{}' ({} enemies, {} skipped)",
                    report.map, report.spawned, report.skipped
                )),
                Err(err) => {
                    warn!(map = %name, error = %err, "load_map_command_failed");
                    SceneDebugCommandResult::Error(err.to_string())
                }
            },
            SceneDebugCommand::Spawn { type_key, position } => {
                let map_size = match self.map.get() {
                    Ok(map) => map.pixel_size(),
                    Err(err) => return SceneDebugCommandResult::Error(err.to_string()),
                };
                match self.entities.spawn(&type_key, position, map_size, &self.defs) {
                    Ok(id) => SceneDebugCommandResult::Success(format!(
                        "spawned {type_key} as entity {}",
                        id.0
                    )),
                    Err(err) => SceneDebugCommandResult::Error(err.to_string()),
                }
            }
            SceneDebugCommand::OrderMove { entity_id, x, y } => {
                let map_size = match self.map.get() {
                    Ok(map) => map.pixel_size(),
                    Err(err) => return SceneDebugCommandResult::Error(err.to_string()),
                };
                if self
                    .entities
                    .move_enemy_to(EntityId(entity_id), Vec2::new(x, y), map_size)
                {
                    SceneDebugCommandResult::Success(format!(
                        "entity {entity_id} moving to ({x:.1},{y:.1})"
                    ))
                } else {
                    SceneDebugCommandResult::Error(format!("no enemy with id {entity_id}"))
                }
            }
            SceneDebugCommand::DumpState => SceneDebugCommandResult::Success(self.dump_state()),
        }
    }
}
