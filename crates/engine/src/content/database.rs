use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnemyDefId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SkillDefId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementType {
    Stationary,
    WanderCardinal,
}

impl MovementType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "stationary" => Some(Self::Stationary),
            "wander_cardinal" => Some(Self::WanderCardinal),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnemySprites {
    pub idle: String,
    pub walk: String,
    pub combat: String,
}

/// Static description of an enemy type; `def_name` is the spawn type key.
#[derive(Debug, Clone, PartialEq)]
pub struct EnemyDef {
    pub id: EnemyDefId,
    pub def_name: String,
    pub label: String,
    pub max_health: f32,
    pub width: f32,
    pub height: f32,
    pub movement: MovementType,
    pub color: Option<String>,
    pub sprites: EnemySprites,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkillDef {
    pub id: SkillDefId,
    /// Skill key, e.g. `basic`.
    pub def_name: String,
    pub label: String,
    pub damage: f32,
    pub cooldown_ms: f64,
    pub mana_cost: f32,
    pub frame_count: u32,
    /// Frames per second.
    pub animation_speed: f32,
    pub sprite: Option<String>,
}

impl SkillDef {
    pub fn active_duration_ms(&self) -> f64 {
        f64::from(self.frame_count) / f64::from(self.animation_speed) * 1000.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerDef {
    pub max_health: f32,
    pub max_mana: f32,
    /// Per second.
    pub health_regen: f32,
    /// Per second.
    pub mana_regen: f32,
    pub width: f32,
    pub height: f32,
    /// Pixels per millisecond.
    pub walk_speed: f32,
    /// Pixels per millisecond.
    pub run_speed: f32,
}

impl Default for PlayerDef {
    fn default() -> Self {
        Self {
            max_health: 150.0,
            max_mana: 100.0,
            health_regen: 1.5,
            mana_regen: 1.0,
            width: 32.0,
            height: 32.0,
            walk_speed: 0.05,
            run_speed: 0.10,
        }
    }
}

/// Immutable registry of compiled content, built once and passed by reference.
#[derive(Debug, Default, Clone)]
pub struct DefDatabase {
    enemy_defs: Vec<EnemyDef>,
    enemy_ids_by_name: HashMap<String, EnemyDefId>,
    skill_defs: Vec<SkillDef>,
    skill_ids_by_name: HashMap<String, SkillDefId>,
    player_def: PlayerDef,
}

impl DefDatabase {
    /// Ids are assigned from the order given, so callers should pass defs
    /// sorted by name for stable ids.
    pub fn from_defs(
        mut enemy_defs: Vec<EnemyDef>,
        mut skill_defs: Vec<SkillDef>,
        player_def: Option<PlayerDef>,
    ) -> Self {
        let mut enemy_ids_by_name = HashMap::with_capacity(enemy_defs.len());
        for (idx, def) in enemy_defs.iter_mut().enumerate() {
            let id = EnemyDefId(idx as u32);
            def.id = id;
            enemy_ids_by_name.insert(def.def_name.clone(), id);
        }
        let mut skill_ids_by_name = HashMap::with_capacity(skill_defs.len());
        for (idx, def) in skill_defs.iter_mut().enumerate() {
            let id = SkillDefId(idx as u32);
            def.id = id;
            skill_ids_by_name.insert(def.def_name.clone(), id);
        }
        Self {
            enemy_defs,
            enemy_ids_by_name,
            skill_defs,
            skill_ids_by_name,
            player_def: player_def.unwrap_or_default(),
        }
    }

    pub fn enemy_def_id_by_name(&self, name: &str) -> Option<EnemyDefId> {
        self.enemy_ids_by_name.get(name).copied()
    }

    pub fn enemy_def(&self, id: EnemyDefId) -> Option<&EnemyDef> {
        self.enemy_defs.get(id.0 as usize)
    }

    pub fn enemy_def_by_name(&self, name: &str) -> Option<&EnemyDef> {
        self.enemy_def_id_by_name(name)
            .and_then(|id| self.enemy_def(id))
    }

    pub fn enemy_defs(&self) -> &[EnemyDef] {
        &self.enemy_defs
    }

    pub fn skill_def(&self, id: SkillDefId) -> Option<&SkillDef> {
        self.skill_defs.get(id.0 as usize)
    }

    pub fn skill_by_key(&self, key: &str) -> Option<&SkillDef> {
        self.skill_ids_by_name
            .get(key)
            .and_then(|id| self.skill_def(*id))
    }

    pub fn skill_defs(&self) -> &[SkillDef] {
        &self.skill_defs
    }

    pub fn player_def(&self) -> &PlayerDef {
        &self.player_def
    }
}
