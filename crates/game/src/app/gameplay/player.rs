use std::collections::HashMap;

use engine::{
    clamp_center_to_bounds, CollisionGrid, DefDatabase, Direction, EntityBase, EntityId,
    EntityKind, InputSnapshot, PlayerDef, Rect, SimTime, SkillDef, Vec2,
};
use tracing::{debug, info};

use super::animation::FrameAnimator;
use super::entity_manager::EntityManager;
use super::SKILL_BAR;

const MOVEMENT_ANIMATION_FPS: f32 = 8.0;
const IDLE_FRAME_COUNT: u32 = 12;
const WALK_FRAME_COUNT: u32 = 6;
const RUN_FRAME_COUNT: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PlayerState {
    Idle,
    Walking,
    Running,
    Attacking,
}

impl PlayerState {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Walking => "walking",
            Self::Running => "running",
            Self::Attacking => "attacking",
        }
    }
}

/// What the player asked for this tick, resolved from the raw snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct PlayerIntent {
    pub(crate) direction: Option<Direction>,
    pub(crate) running: bool,
    pub(crate) skill_key: Option<String>,
}

impl PlayerIntent {
    /// The lowest held slot with a bound skill is the requested skill.
    pub(crate) fn from_snapshot(input: &InputSnapshot) -> Self {
        let skill_key = input
            .held_skill_slots()
            .find_map(|slot| SKILL_BAR.get(slot).copied().flatten())
            .map(str::to_string);
        Self {
            direction: input.direction(),
            running: input.is_running(),
            skill_key,
        }
    }
}

#[derive(Debug, Clone)]
struct ActiveAttack {
    skill_key: String,
    started_at: SimTime,
    duration_ms: f64,
    hitbox: Rect,
    frame_count: u32,
    animation_speed: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AttackReport {
    pub(crate) skill_key: String,
    pub(crate) hitbox: Rect,
    pub(crate) hits: Vec<EntityId>,
}

#[derive(Debug, Clone)]
pub(crate) struct Player {
    base: EntityBase,
    stats: PlayerDef,
    state: PlayerState,
    facing: Direction,
    health: f32,
    mana: f32,
    last_skill_use: HashMap<String, SimTime>,
    active_attack: Option<ActiveAttack>,
    animator: FrameAnimator,
}

impl Player {
    pub(crate) fn new(id: EntityId, position: Vec2, stats: PlayerDef) -> Self {
        Self {
            base: EntityBase::new(
                id,
                EntityKind::Player,
                position,
                Vec2::new(stats.width, stats.height),
            ),
            stats,
            state: PlayerState::Idle,
            facing: Direction::Down,
            health: stats.max_health,
            mana: stats.max_mana,
            last_skill_use: HashMap::new(),
            active_attack: None,
            animator: FrameAnimator::default(),
        }
    }

    pub(crate) fn base(&self) -> &EntityBase {
        &self.base
    }

    pub(crate) fn id(&self) -> EntityId {
        self.base.id
    }

    pub(crate) fn position(&self) -> Vec2 {
        self.base.position
    }

    pub(crate) fn facing(&self) -> Direction {
        self.facing
    }

    pub(crate) fn state(&self) -> PlayerState {
        self.state
    }

    pub(crate) fn health(&self) -> f32 {
        self.health
    }

    pub(crate) fn max_health(&self) -> f32 {
        self.stats.max_health
    }

    pub(crate) fn mana(&self) -> f32 {
        self.mana
    }

    pub(crate) fn max_mana(&self) -> f32 {
        self.stats.max_mana
    }

    pub(crate) fn animation_frame(&self) -> u32 {
        self.animator.frame()
    }

    pub(crate) fn last_skill_use(&self, skill_key: &str) -> Option<SimTime> {
        self.last_skill_use.get(skill_key).copied()
    }

    /// Remaining cooldown, or `None` once the skill is usable again. Exactly
    /// `cooldown_ms` after use still reports `Some(0.0)`.
    pub(crate) fn cooldown_remaining_ms(&self, skill: &SkillDef, now: SimTime) -> Option<f64> {
        let elapsed = now.millis_since(self.last_skill_use(&skill.def_name)?);
        (elapsed <= skill.cooldown_ms).then(|| skill.cooldown_ms - elapsed)
    }

    pub(crate) fn is_off_cooldown(&self, skill: &SkillDef, now: SimTime) -> bool {
        self.last_skill_use(&skill.def_name)
            .map_or(true, |last| now.millis_since(last) > skill.cooldown_ms)
    }

    pub(crate) fn active_hitbox(&self) -> Option<Rect> {
        self.active_attack.as_ref().map(|attack| attack.hitbox)
    }

    /// Moves the player to a fresh spawn point inside `map_size`; pools and
    /// cooldowns carry over.
    pub(crate) fn place_at(&mut self, position: Vec2, map_size: Vec2) {
        self.base.position = clamp_center_to_bounds(position, self.base.size, map_size);
        self.active_attack = None;
        self.set_state(PlayerState::Idle);
    }

    pub(crate) fn update(
        &mut self,
        intent: &PlayerIntent,
        delta_ms: f32,
        now: SimTime,
        grid: &CollisionGrid,
        defs: &DefDatabase,
        entities: &mut EntityManager,
    ) -> Option<AttackReport> {
        if let Some(attack) = &self.active_attack {
            if now.millis_since(attack.started_at) >= attack.duration_ms {
                debug!(skill = %attack.skill_key, "attack_finished");
                self.active_attack = None;
            }
        }

        let mut report = None;
        if self.active_attack.is_none() {
            if let Some(skill) = intent
                .skill_key
                .as_deref()
                .and_then(|key| self.usable_skill(key, defs, now))
            {
                report = Some(self.begin_attack(skill, now, entities));
            }
        }

        let next_state = if self.active_attack.is_some() {
            PlayerState::Attacking
        } else {
            match intent.direction {
                None => PlayerState::Idle,
                Some(_) if intent.running => PlayerState::Running,
                Some(_) => PlayerState::Walking,
            }
        };
        self.set_state(next_state);

        if let Some(direction) = intent.direction {
            let speed = match self.state {
                PlayerState::Walking => Some(self.stats.walk_speed),
                PlayerState::Running => Some(self.stats.run_speed),
                PlayerState::Idle | PlayerState::Attacking => None,
            };
            if let Some(speed) = speed {
                self.facing = direction;
                let (ux, uy) = direction.unit_vector();
                let distance = speed * delta_ms;
                self.base.position = grid.try_move_axis_independent(
                    self.base.position,
                    self.base.size,
                    Vec2::new(ux * distance, uy * distance),
                );
            }
        }

        self.regenerate(delta_ms);
        self.base.position =
            clamp_center_to_bounds(self.base.position, self.base.size, grid.pixel_size());
        self.advance_animation(delta_ms);
        report
    }

    fn usable_skill<'d>(
        &self,
        skill_key: &str,
        defs: &'d DefDatabase,
        now: SimTime,
    ) -> Option<&'d SkillDef> {
        let Some(skill) = defs.skill_by_key(skill_key) else {
            debug!(skill = skill_key, "skill_unknown");
            return None;
        };
        if !self.is_off_cooldown(skill, now) {
            debug!(skill = skill_key, reason = "cooldown", "skill_rejected");
            return None;
        }
        if skill.mana_cost > 0.0 && self.mana <= skill.mana_cost {
            debug!(
                skill = skill_key,
                reason = "mana",
                mana = self.mana,
                cost = skill.mana_cost,
                "skill_rejected"
            );
            return None;
        }
        Some(skill)
    }

    fn begin_attack(
        &mut self,
        skill: &SkillDef,
        now: SimTime,
        entities: &mut EntityManager,
    ) -> AttackReport {
        self.mana = (self.mana - skill.mana_cost).max(0.0);
        self.last_skill_use.insert(skill.def_name.clone(), now);
        let hitbox = self.attack_hitbox();
        let hits = entities.damage_overlapping(hitbox, skill.damage, now);
        info!(
            skill = %skill.def_name,
            damage = skill.damage,
            hits = hits.len(),
            mana = self.mana,
            "player_attack"
        );
        self.active_attack = Some(ActiveAttack {
            skill_key: skill.def_name.clone(),
            started_at: now,
            duration_ms: skill.active_duration_ms(),
            hitbox,
            frame_count: skill.frame_count,
            animation_speed: skill.animation_speed,
        });
        self.animator.reset();
        AttackReport {
            skill_key: skill.def_name.clone(),
            hitbox,
            hits,
        }
    }

    /// Half of the player's own box on the facing side.
    fn attack_hitbox(&self) -> Rect {
        let bounds = self.base.bounds();
        let center = self.base.position;
        match self.facing {
            Direction::Down => Rect::new(bounds.x, center.y, bounds.width, bounds.height / 2.0),
            Direction::Up => Rect::new(bounds.x, bounds.y, bounds.width, bounds.height / 2.0),
            Direction::Left => Rect::new(bounds.x, bounds.y, bounds.width / 2.0, bounds.height),
            Direction::Right => Rect::new(center.x, bounds.y, bounds.width / 2.0, bounds.height),
        }
    }

    fn set_state(&mut self, next: PlayerState) {
        if self.state != next {
            debug!(from = self.state.as_str(), to = next.as_str(), "player_state_changed");
            self.state = next;
            self.animator.reset();
        }
    }

    fn regenerate(&mut self, delta_ms: f32) {
        let seconds = delta_ms / 1000.0;
        self.health =
            (self.health + self.stats.health_regen * seconds).clamp(0.0, self.stats.max_health);
        self.mana = (self.mana + self.stats.mana_regen * seconds).clamp(0.0, self.stats.max_mana);
    }

    fn advance_animation(&mut self, delta_ms: f32) {
        let (fps, frame_count) = match (&self.active_attack, self.state) {
            (Some(attack), PlayerState::Attacking) => (attack.animation_speed, attack.frame_count),
            (_, PlayerState::Running) => (MOVEMENT_ANIMATION_FPS, RUN_FRAME_COUNT),
            (_, PlayerState::Walking) => (MOVEMENT_ANIMATION_FPS, WALK_FRAME_COUNT),
            _ => (MOVEMENT_ANIMATION_FPS, IDLE_FRAME_COUNT),
        };
        self.animator.advance(delta_ms, fps, frame_count);
    }
}
