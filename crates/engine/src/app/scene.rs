use super::geometry::{Rect, Vec2};
use super::input::InputSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SceneDebugCommand {
    LoadMap {
        name: String,
    },
    Spawn {
        type_key: String,
        position: Vec2,
    },
    OrderMove {
        entity_id: u64,
        x: f32,
        y: f32,
    },
    DumpState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneDebugCommandResult {
    Unsupported,
    Success(String),
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

#[derive(Debug, Default)]
pub struct EntityIdAllocator {
    next: u64,
}

impl EntityIdAllocator {
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

/// Discriminant carried by every entity record; checked explicitly instead of
/// downcasting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Player,
    Enemy,
}

/// The record every simulated entity shares. `position` is the center point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityBase {
    pub id: EntityId,
    pub kind: EntityKind,
    pub position: Vec2,
    pub size: Vec2,
    pub alive: bool,
    pub collidable: bool,
}

impl EntityBase {
    pub fn new(id: EntityId, kind: EntityKind, position: Vec2, size: Vec2) -> Self {
        Self {
            id,
            kind,
            position,
            size,
            alive: true,
            collidable: true,
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_center(self.position, self.size)
    }

    pub fn bounds_at(&self, position: Vec2) -> Rect {
        Rect::from_center(position, self.size)
    }

    /// True if this entity, moved to `position`, would overlap any other live
    /// collidable body.
    pub fn would_collide_at(&self, position: Vec2, others: &[EntityBase]) -> bool {
        let proposed = self.bounds_at(position);
        others.iter().any(|other| {
            other.id != self.id
                && other.alive
                && other.collidable
                && proposed.intersects(&other.bounds())
        })
    }
}

pub const DEFAULT_VIEWPORT_WIDTH: f32 = 450.0;
pub const DEFAULT_VIEWPORT_HEIGHT: f32 = 300.0;

/// `position` is the world-space top-left corner of the visible area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera2D {
    pub position: Vec2,
    pub viewport: Vec2,
}

impl Default for Camera2D {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            viewport: Vec2::new(DEFAULT_VIEWPORT_WIDTH, DEFAULT_VIEWPORT_HEIGHT),
        }
    }
}

impl Camera2D {
    /// Centers on `target`, then clamps so the view never leaves the map.
    pub fn follow(&mut self, target: Vec2, map_size: Vec2) {
        let x = target.x - self.viewport.x / 2.0;
        let y = target.y - self.viewport.y / 2.0;
        self.position = Vec2 {
            x: x.min(map_size.x - self.viewport.x).max(0.0),
            y: y.min(map_size.y - self.viewport.y).max(0.0),
        };
    }

    pub fn visible_rect(&self) -> Rect {
        Rect::new(
            self.position.x,
            self.position.y,
            self.viewport.x,
            self.viewport.y,
        )
    }
}

pub trait Scene {
    fn load(&mut self);
    fn update(&mut self, delta_ms: f32, input: &InputSnapshot) -> SceneCommand;
    fn unload(&mut self);
    fn entity_count(&self) -> usize {
        0
    }
    fn debug_title(&self) -> Option<String> {
        None
    }
    fn execute_debug_command(&mut self, _command: SceneDebugCommand) -> SceneDebugCommandResult {
        SceneDebugCommandResult::Unsupported
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(id: u64, x: f32, y: f32) -> EntityBase {
        EntityBase::new(
            EntityId(id),
            EntityKind::Enemy,
            Vec2::new(x, y),
            Vec2::new(32.0, 32.0),
        )
    }

    #[test]
    fn allocator_never_reuses_ids() {
        let mut allocator = EntityIdAllocator::default();
        let a = allocator.allocate();
        let b = allocator.allocate();
        let c = allocator.allocate();
        assert!(a < b && b < c);
    }

    #[test]
    fn collision_ignores_self_dead_and_non_collidable() {
        let me = body(0, 100.0, 100.0);
        let mut dead = body(1, 110.0, 100.0);
        dead.alive = false;
        let mut ghost = body(2, 100.0, 110.0);
        ghost.collidable = false;
        let others = [me, dead, ghost];
        assert!(!me.would_collide_at(Vec2::new(100.0, 100.0), &others));
    }

    #[test]
    fn collision_detects_live_neighbour() {
        let me = body(0, 100.0, 100.0);
        let other = body(1, 140.0, 100.0);
        let others = [me, other];
        assert!(!me.would_collide_at(Vec2::new(108.0, 100.0), &others));
        assert!(me.would_collide_at(Vec2::new(109.0, 100.0), &others));
    }

    #[test]
    fn camera_follow_clamps_to_map() {
        let mut camera = Camera2D::default();
        let map = Vec2::new(2944.0, 2048.0);
        camera.follow(Vec2::new(10.0, 10.0), map);
        assert_eq!(camera.position, Vec2::ZERO);
        camera.follow(Vec2::new(1000.0, 1000.0), map);
        assert_eq!(camera.position, Vec2::new(775.0, 850.0));
        camera.follow(Vec2::new(2940.0, 2040.0), map);
        assert_eq!(camera.position, Vec2::new(2494.0, 1748.0));
    }

    #[test]
    fn camera_on_map_smaller_than_viewport_stays_at_origin() {
        let mut camera = Camera2D::default();
        camera.follow(Vec2::new(100.0, 100.0), Vec2::new(200.0, 200.0));
        assert_eq!(camera.position, Vec2::ZERO);
    }
}
