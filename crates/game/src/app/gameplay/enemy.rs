use engine::{
    clamp_center_to_bounds, CollisionGrid, Direction, EnemyDef, EnemySprites, EntityBase,
    EntityId, EntityKind, MovementType, SimTime, Vec2,
};
use rand::Rng;
use tracing::{debug, info};

use super::animation::FrameAnimator;

const MOVE_SPEED_PX_PER_SECOND: f32 = 50.0;
const WANDER_OFFSET_PX: f32 = 100.0;
const WANDER_ZONE_RADIUS_PX: f32 = 150.0;
const WANDER_DELAY_MIN_MS: f32 = 2000.0;
const WANDER_DELAY_SPREAD_MS: f32 = 3000.0;
const BURST_MIN_MS: f32 = 200.0;
const BURST_MAX_MS: f32 = 500.0;
const ARRIVAL_TOLERANCE_PX: f32 = 2.0;
const MIN_AXIS_DELTA_PX: f32 = 1.0;
const COMBAT_TIMEOUT_MS: f64 = 5000.0;
const REGEN_FRACTION_PER_SECOND: f32 = 0.01;
const ANIMATION_FPS: f32 = 8.0;
const IDLE_FRAME_COUNT: u32 = 4;
const WALK_FRAME_COUNT: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EnemyState {
    Idle,
    Wandering,
    InCombat,
}

impl EnemyState {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Wandering => "wandering",
            Self::InCombat => "in_combat",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MoveAxis {
    Horizontal,
    Vertical,
}

impl MoveAxis {
    fn other(self) -> Self {
        match self {
            Self::Horizontal => Self::Vertical,
            Self::Vertical => Self::Horizontal,
        }
    }

    fn dominant(delta: Vec2) -> Self {
        if delta.x.abs() >= delta.y.abs() {
            Self::Horizontal
        } else {
            Self::Vertical
        }
    }
}

/// Read-only world view for one enemy step. `obstacles` holds every body in
/// the scene, the stepping enemy included.
pub(crate) struct EnemyStepContext<'a> {
    pub(crate) grid: &'a CollisionGrid,
    pub(crate) obstacles: &'a [EntityBase],
    pub(crate) now: SimTime,
}

#[derive(Debug, Clone)]
pub(crate) struct Enemy {
    base: EntityBase,
    type_key: String,
    movement: MovementType,
    sprites: EnemySprites,
    max_health: f32,
    health: f32,
    state: EnemyState,
    spawn: Vec2,
    target: Vec2,
    axis: MoveAxis,
    burst_timer_ms: f32,
    wander_timer_ms: f32,
    last_damage_at: Option<SimTime>,
    facing: Direction,
    animator: FrameAnimator,
}

impl Enemy {
    pub(crate) fn spawn<R: Rng>(
        id: EntityId,
        def: &EnemyDef,
        position: Vec2,
        rng: &mut R,
    ) -> Self {
        Self {
            base: EntityBase::new(
                id,
                EntityKind::Enemy,
                position,
                Vec2::new(def.width, def.height),
            ),
            type_key: def.def_name.clone(),
            movement: def.movement,
            sprites: def.sprites.clone(),
            max_health: def.max_health,
            health: def.max_health,
            state: EnemyState::Idle,
            spawn: position,
            target: position,
            axis: MoveAxis::Horizontal,
            burst_timer_ms: random_burst_ms(rng),
            wander_timer_ms: random_wander_delay_ms(rng),
            last_damage_at: None,
            facing: Direction::Down,
            animator: FrameAnimator::default(),
        }
    }

    pub(crate) fn id(&self) -> EntityId {
        self.base.id
    }

    pub(crate) fn base(&self) -> &EntityBase {
        &self.base
    }

    pub(crate) fn type_key(&self) -> &str {
        &self.type_key
    }

    pub(crate) fn position(&self) -> Vec2 {
        self.base.position
    }

    pub(crate) fn state(&self) -> EnemyState {
        self.state
    }

    pub(crate) fn health(&self) -> f32 {
        self.health
    }

    pub(crate) fn max_health(&self) -> f32 {
        self.max_health
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.base.alive
    }

    pub(crate) fn target(&self) -> Vec2 {
        self.target
    }

    pub(crate) fn facing(&self) -> Direction {
        self.facing
    }

    pub(crate) fn animation_frame(&self) -> u32 {
        self.animator.frame()
    }

    pub(crate) fn current_sprite(&self) -> &str {
        match self.state {
            EnemyState::Idle => &self.sprites.idle,
            EnemyState::Wandering => &self.sprites.walk,
            EnemyState::InCombat => &self.sprites.combat,
        }
    }

    pub(crate) fn update<R: Rng>(
        &mut self,
        delta_ms: f32,
        ctx: &EnemyStepContext<'_>,
        rng: &mut R,
    ) {
        if !self.base.alive {
            return;
        }
        self.regenerate(delta_ms);
        self.expire_combat(ctx.now);
        self.animator.advance(delta_ms, ANIMATION_FPS, self.frame_count());

        if self.movement == MovementType::WanderCardinal {
            self.wander_timer_ms -= delta_ms;
            if self.wander_timer_ms <= 0.0 && self.state == EnemyState::Idle {
                self.pick_wander_target(ctx.grid.pixel_size(), rng);
            }
        }

        if self.state == EnemyState::Wandering {
            self.step_toward_target(delta_ms, ctx, rng);
        }
    }

    /// Sends the enemy toward `(x, y)`, clamped to the map.
    pub(crate) fn move_to<R: Rng>(
        &mut self,
        destination: Vec2,
        map_size: Vec2,
        rng: &mut R,
    ) {
        self.begin_move(destination, map_size, rng);
        debug!(
            entity_id = self.base.id.0,
            x = self.target.x,
            y = self.target.y,
            "enemy_move_ordered"
        );
    }

    pub(crate) fn take_damage(&mut self, amount: f32, now: SimTime) {
        if !self.base.alive {
            return;
        }
        self.health = (self.health - amount).max(0.0);
        self.last_damage_at = Some(now);
        self.set_state(EnemyState::InCombat);
        if self.health <= 0.0 {
            self.base.alive = false;
            info!(entity_id = self.base.id.0, type_key = %self.type_key, "enemy_killed");
        }
    }

    fn regenerate(&mut self, delta_ms: f32) {
        if self.state == EnemyState::InCombat || self.health >= self.max_health {
            return;
        }
        let gain = self.max_health * REGEN_FRACTION_PER_SECOND * delta_ms / 1000.0;
        self.health = (self.health + gain).min(self.max_health);
    }

    fn expire_combat(&mut self, now: SimTime) {
        if self.state != EnemyState::InCombat {
            return;
        }
        let Some(last_damage_at) = self.last_damage_at else {
            return;
        };
        if now.millis_since(last_damage_at) > COMBAT_TIMEOUT_MS {
            let next = match self.movement {
                MovementType::Stationary => EnemyState::Idle,
                MovementType::WanderCardinal => EnemyState::Wandering,
            };
            self.set_state(next);
        }
    }

    fn pick_wander_target<R: Rng>(&mut self, map_size: Vec2, rng: &mut R) {
        let offset = rng.gen_range(-WANDER_OFFSET_PX..=WANDER_OFFSET_PX);
        let mut target = self.spawn;
        if rng.gen_bool(0.5) {
            target.x += offset;
        } else {
            target.y += offset;
        }
        target.x = target.x.clamp(
            self.spawn.x - WANDER_ZONE_RADIUS_PX,
            self.spawn.x + WANDER_ZONE_RADIUS_PX,
        );
        target.y = target.y.clamp(
            self.spawn.y - WANDER_ZONE_RADIUS_PX,
            self.spawn.y + WANDER_ZONE_RADIUS_PX,
        );
        self.wander_timer_ms = random_wander_delay_ms(rng);
        self.begin_move(target, map_size, rng);
    }

    fn begin_move<R: Rng>(&mut self, destination: Vec2, map_size: Vec2, rng: &mut R) {
        self.target = clamp_center_to_bounds(destination, self.base.size, map_size);
        self.set_state(EnemyState::Wandering);
        self.burst_timer_ms = random_burst_ms(rng);
        self.axis = MoveAxis::dominant(self.delta_to_target());
    }

    fn delta_to_target(&self) -> Vec2 {
        Vec2::new(
            self.target.x - self.base.position.x,
            self.target.y - self.base.position.y,
        )
    }

    fn step_toward_target<R: Rng>(
        &mut self,
        delta_ms: f32,
        ctx: &EnemyStepContext<'_>,
        rng: &mut R,
    ) {
        let delta = self.delta_to_target();
        if delta.x.abs() < ARRIVAL_TOLERANCE_PX && delta.y.abs() < ARRIVAL_TOLERANCE_PX {
            self.set_state(EnemyState::Idle);
            return;
        }

        self.burst_timer_ms -= delta_ms;
        let axis_done = match self.axis {
            MoveAxis::Horizontal => delta.x.abs() < ARRIVAL_TOLERANCE_PX,
            MoveAxis::Vertical => delta.y.abs() < ARRIVAL_TOLERANCE_PX,
        };
        if self.burst_timer_ms <= 0.0 || axis_done {
            self.axis = self.axis.other();
            self.burst_timer_ms = random_burst_ms(rng);
        }

        let step = MOVE_SPEED_PX_PER_SECOND * delta_ms / 1000.0;
        let moved =
            self.try_step(self.axis, step, ctx) || self.try_step(self.axis.other(), step, ctx);
        if moved {
            return;
        }
        match self.movement {
            MovementType::WanderCardinal => self.pick_wander_target(ctx.grid.pixel_size(), rng),
            MovementType::Stationary => {
                debug!(entity_id = self.base.id.0, "enemy_move_blocked");
                self.set_state(EnemyState::Idle);
            }
        }
    }

    fn try_step(&mut self, axis: MoveAxis, step: f32, ctx: &EnemyStepContext<'_>) -> bool {
        let position = self.base.position;
        let size = self.base.size;
        let delta = self.delta_to_target();
        let (next, clear, facing) = match axis {
            MoveAxis::Horizontal => {
                if delta.x.abs() <= MIN_AXIS_DELTA_PX {
                    return false;
                }
                let next_x = position.x + delta.x.signum() * step.min(delta.x.abs());
                let facing = if delta.x > 0.0 {
                    Direction::Right
                } else {
                    Direction::Left
                };
                (
                    Vec2::new(next_x, position.y),
                    ctx.grid.is_horizontal_step_clear(position, size, next_x),
                    facing,
                )
            }
            MoveAxis::Vertical => {
                if delta.y.abs() <= MIN_AXIS_DELTA_PX {
                    return false;
                }
                let next_y = position.y + delta.y.signum() * step.min(delta.y.abs());
                let facing = if delta.y > 0.0 {
                    Direction::Down
                } else {
                    Direction::Up
                };
                (
                    Vec2::new(position.x, next_y),
                    ctx.grid.is_vertical_step_clear(position, size, next_y),
                    facing,
                )
            }
        };
        if !clear || self.base.would_collide_at(next, ctx.obstacles) {
            return false;
        }
        self.base.position = clamp_center_to_bounds(next, size, ctx.grid.pixel_size());
        self.facing = facing;
        true
    }

    fn set_state(&mut self, next: EnemyState) {
        if self.state != next {
            debug!(
                entity_id = self.base.id.0,
                from = self.state.as_str(),
                to = next.as_str(),
                "enemy_state_changed"
            );
            self.state = next;
            self.animator.reset();
        }
    }

    fn frame_count(&self) -> u32 {
        match self.state {
            EnemyState::Wandering => WALK_FRAME_COUNT,
            EnemyState::Idle | EnemyState::InCombat => IDLE_FRAME_COUNT,
        }
    }
}

fn random_wander_delay_ms<R: Rng>(rng: &mut R) -> f32 {
    WANDER_DELAY_MIN_MS + rng.gen::<f32>() * WANDER_DELAY_SPREAD_MS
}

fn random_burst_ms<R: Rng>(rng: &mut R) -> f32 {
    rng.gen_range(BURST_MIN_MS..=BURST_MAX_MS)
}
