mod compiler;
mod database;
mod discovery;
mod types;

pub use compiler::{compile_def_database, ContentCompileError, ContentErrorCode, SourceLocation};
pub use database::{
    DefDatabase, EnemyDef, EnemyDefId, EnemySprites, MovementType, PlayerDef, SkillDef, SkillDefId,
};
pub use discovery::{discover_mod_sources, ModSource, BASE_MOD_ID};
pub use types::{ContentPlanError, ContentRequest};
