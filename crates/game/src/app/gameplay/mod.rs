mod animation;
mod enemy;
mod entity_manager;
mod hud;
mod player;
mod session;
#[cfg(test)]
mod tests;

use engine::SKILL_SLOT_COUNT;

pub(crate) use session::GameSession;

pub(crate) const PLAYER_SPAWN_OBJECT: &str = "playerSpawn";
pub(crate) const ENEMY_OBJECT_CLASS: &str = "enemy";

/// Skill keys bound to the six hotbar slots, slot 1 first.
pub(crate) const SKILL_BAR: [Option<&str>; SKILL_SLOT_COUNT] =
    [Some("basic"), Some("heavy"), None, None, None, None];
