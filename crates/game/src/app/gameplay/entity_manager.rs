use engine::{
    clamp_center_to_bounds, CollisionGrid, DefDatabase, EntityBase, EntityId, EntityIdAllocator,
    Rect, SimTime, Vec2,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::enemy::{Enemy, EnemyStepContext};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum SpawnError {
    #[error("unknown enemy type '{type_key}'")]
    UnknownType { type_key: String },
}

/// Owns every non-player entity. Other systems only read enemies, except for
/// damage, which goes through [`EntityManager::damage_overlapping`].
#[derive(Debug)]
pub(crate) struct EntityManager {
    enemies: Vec<Enemy>,
    ids: EntityIdAllocator,
    rng: StdRng,
}

impl EntityManager {
    pub(crate) fn new(seed: u64) -> Self {
        Self {
            enemies: Vec::new(),
            ids: EntityIdAllocator::default(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Hands out an id from the same sequence as enemies, for the player.
    pub(crate) fn reserve_id(&mut self) -> EntityId {
        self.ids.allocate()
    }

    /// Spawns at `position`, clamped so the enemy's box lies inside `map_size`.
    pub(crate) fn spawn(
        &mut self,
        type_key: &str,
        position: Vec2,
        map_size: Vec2,
        defs: &DefDatabase,
    ) -> Result<EntityId, SpawnError> {
        let Some(def) = defs.enemy_def_by_name(type_key) else {
            warn!(type_key, x = position.x, y = position.y, "enemy_type_unknown");
            return Err(SpawnError::UnknownType {
                type_key: type_key.to_string(),
            });
        };
        let position =
            clamp_center_to_bounds(position, Vec2::new(def.width, def.height), map_size);
        let id = self.ids.allocate();
        self.enemies
            .push(Enemy::spawn(id, def, position, &mut self.rng));
        info!(
            entity_id = id.0,
            type_key,
            x = position.x,
            y = position.y,
            "enemy_spawned"
        );
        Ok(id)
    }

    /// Steps every live enemy against the grid and each other (plus `player`),
    /// then prunes the dead. Returns the pruned ids.
    pub(crate) fn update(
        &mut self,
        delta_ms: f32,
        now: SimTime,
        grid: &CollisionGrid,
        player: &EntityBase,
    ) -> Vec<EntityId> {
        let mut bodies: Vec<EntityBase> = self.enemies.iter().map(|enemy| *enemy.base()).collect();
        bodies.push(*player);

        for (idx, enemy) in self.enemies.iter_mut().enumerate() {
            if !enemy.is_alive() {
                continue;
            }
            let ctx = EnemyStepContext {
                grid,
                obstacles: &bodies,
                now,
            };
            enemy.update(delta_ms, &ctx, &mut self.rng);
            bodies[idx] = *enemy.base();
        }

        let mut pruned = Vec::new();
        self.enemies.retain(|enemy| {
            if enemy.is_alive() {
                true
            } else {
                pruned.push(enemy.id());
                false
            }
        });
        for id in &pruned {
            info!(entity_id = id.0, "enemy_removed");
        }
        pruned
    }

    /// Applies `amount` to every live enemy whose bounds overlap `hitbox`.
    pub(crate) fn damage_overlapping(
        &mut self,
        hitbox: Rect,
        amount: f32,
        now: SimTime,
    ) -> Vec<EntityId> {
        let mut hits = Vec::new();
        for enemy in self
            .enemies
            .iter_mut()
            .filter(|enemy| enemy.is_alive() && enemy.base().bounds().intersects(&hitbox))
        {
            enemy.take_damage(amount, now);
            debug!(
                entity_id = enemy.id().0,
                amount,
                health = enemy.health(),
                "enemy_damaged"
            );
            hits.push(enemy.id());
        }
        hits
    }

    pub(crate) fn move_enemy_to(&mut self, id: EntityId, destination: Vec2, map_size: Vec2) -> bool {
        let Some(enemy) = self.enemies.iter_mut().find(|enemy| enemy.id() == id) else {
            warn!(entity_id = id.0, "move_target_unknown");
            return false;
        };
        enemy.move_to(destination, map_size, &mut self.rng);
        true
    }

    pub(crate) fn find(&self, id: EntityId) -> Option<&Enemy> {
        self.enemies.iter().find(|enemy| enemy.id() == id)
    }

    pub(crate) fn enemies(&self) -> &[Enemy] {
        &self.enemies
    }

    pub(crate) fn len(&self) -> usize {
        self.enemies.len()
    }

    /// Drops every enemy; ids keep counting up.
    pub(crate) fn clear(&mut self) {
        if !self.enemies.is_empty() {
            debug!(count = self.enemies.len(), "entities_cleared");
        }
        self.enemies.clear();
    }
}

#[cfg(test)]
mod tests {
    use engine::{EntityKind, PlayerDef};

    use super::super::enemy::EnemyState;
    use super::super::tests::{canonical_defs, open_grid};
    use super::*;

    const MAP_SIZE: Vec2 = Vec2::new(960.0, 960.0);

    fn far_player() -> EntityBase {
        EntityBase::new(
            EntityId(1000),
            EntityKind::Player,
            Vec2::new(600.0, 600.0),
            Vec2::new(32.0, 32.0),
        )
    }

    #[test]
    fn spawn_assigns_increasing_ids_and_rejects_unknown_types() {
        let defs = canonical_defs(PlayerDef::default());
        let mut manager = EntityManager::new(9);
        let player_id = manager.reserve_id();
        let a = manager
            .spawn("blue_slime", Vec2::new(64.0, 64.0), MAP_SIZE, &defs)
            .expect("slime");
        let err = manager
            .spawn("green_dragon", Vec2::new(64.0, 64.0), MAP_SIZE, &defs)
            .expect_err("unknown");
        let b = manager
            .spawn("red_demon", Vec2::new(200.0, 64.0), MAP_SIZE, &defs)
            .expect("demon");

        assert!(player_id < a && a < b);
        assert_eq!(b.0, a.0 + 1);
        assert_eq!(
            err,
            SpawnError::UnknownType {
                type_key: "green_dragon".to_string()
            }
        );
        assert_eq!(manager.len(), 2);
        assert_eq!(manager.find(b).expect("demon").type_key(), "red_demon");
    }

    #[test]
    fn damage_only_hits_overlapping_enemies() {
        let defs = canonical_defs(PlayerDef::default());
        let mut manager = EntityManager::new(9);
        let near = manager
            .spawn("blue_slime", Vec2::new(100.0, 100.0), MAP_SIZE, &defs)
            .expect("near");
        let far = manager
            .spawn("blue_slime", Vec2::new(300.0, 300.0), MAP_SIZE, &defs)
            .expect("far");

        let hits = manager.damage_overlapping(
            Rect::new(90.0, 90.0, 10.0, 10.0),
            25.0,
            SimTime::from_millis(10.0),
        );
        assert_eq!(hits, vec![near]);
        let near_enemy = manager.find(near).expect("near");
        assert_eq!(near_enemy.health(), 75.0);
        assert_eq!(near_enemy.state(), EnemyState::InCombat);
        assert_eq!(manager.find(far).expect("far").health(), 100.0);
    }

    #[test]
    fn dead_enemies_are_pruned_on_next_update() {
        let defs = canonical_defs(PlayerDef::default());
        let grid = open_grid(30, 30);
        let mut manager = EntityManager::new(9);
        let id = manager
            .spawn("blue_slime", Vec2::new(100.0, 100.0), MAP_SIZE, &defs)
            .expect("slime");

        manager.damage_overlapping(Rect::new(90.0, 90.0, 4.0, 4.0), 150.0, SimTime::ZERO);
        assert_eq!(manager.len(), 1);
        let pruned = manager.update(16.0, SimTime::from_millis(16.0), &grid, &far_player());
        assert_eq!(pruned, vec![id]);
        assert!(manager.find(id).is_none());
    }

    #[test]
    fn enemies_do_not_walk_into_the_player() {
        let defs = canonical_defs(PlayerDef::default());
        let grid = open_grid(30, 30);
        let mut manager = EntityManager::new(9);
        let id = manager
            .spawn("blue_slime", Vec2::new(100.0, 100.0), MAP_SIZE, &defs)
            .expect("slime");
        let player = EntityBase::new(
            EntityId(1000),
            EntityKind::Player,
            Vec2::new(140.0, 100.0),
            Vec2::new(32.0, 32.0),
        );
        assert!(manager.move_enemy_to(id, Vec2::new(200.0, 100.0), grid.pixel_size()));
        assert!(!manager.move_enemy_to(EntityId(77), Vec2::ZERO, grid.pixel_size()));

        let mut now = SimTime::ZERO;
        for _ in 0..20 {
            now = now.advanced_by(50.0);
            manager.update(50.0, now, &grid, &player);
        }
        let slime = manager.find(id).expect("slime");
        assert!(slime.position().x + 16.0 <= 124.0);
        assert_eq!(slime.state(), EnemyState::Idle);
    }

    #[test]
    fn spawn_position_is_clamped_inside_the_map() {
        let defs = canonical_defs(PlayerDef::default());
        let mut manager = EntityManager::new(9);
        let slime = manager
            .spawn("blue_slime", Vec2::new(0.0, 970.0), MAP_SIZE, &defs)
            .expect("slime");
        let demon = manager
            .spawn("red_demon", Vec2::new(955.0, 10.0), MAP_SIZE, &defs)
            .expect("demon");
        assert_eq!(
            manager.find(slime).expect("slime").position(),
            Vec2::new(16.0, 944.0)
        );
        assert_eq!(
            manager.find(demon).expect("demon").position(),
            Vec2::new(936.0, 24.0)
        );
    }

    #[test]
    fn clear_keeps_id_sequence() {
        let defs = canonical_defs(PlayerDef::default());
        let mut manager = EntityManager::new(9);
        let first = manager
            .spawn("blue_slime", Vec2::new(100.0, 100.0), MAP_SIZE, &defs)
            .expect("slime");
        manager.clear();
        assert!(manager.enemies().is_empty());
        let second = manager
            .spawn("blue_slime", Vec2::new(100.0, 100.0), MAP_SIZE, &defs)
            .expect("slime");
        assert!(second > first);
    }
}
