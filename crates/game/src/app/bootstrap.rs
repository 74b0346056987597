use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use engine::{
    compile_def_database, resolve_app_paths, AppError, ContentRequest, InputSource, LoopConfig,
    MapRegistry,
};
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::gameplay::GameSession;
use super::script::{IdleInput, ScriptError, ScriptedInput};

const ENABLED_MODS_ENV_VAR: &str = "TILEGAME_ENABLED_MODS";
const START_MAP_ENV_VAR: &str = "TILEGAME_MAP";
const INPUT_SCRIPT_ENV_VAR: &str = "TILEGAME_INPUT_SCRIPT";
const MAX_FRAMES_ENV_VAR: &str = "TILEGAME_MAX_FRAMES";
const FIXED_STEP_ENV_VAR: &str = "TILEGAME_FIXED_STEP_MS";
const SEED_ENV_VAR: &str = "TILEGAME_SEED";
const DEFAULT_START_MAP: &str = "mmoMap";
const DEFAULT_SEED: u64 = 0x5EED;

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error(transparent)]
    App(#[from] AppError),
    #[error(transparent)]
    Script(#[from] ScriptError),
}

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) session: GameSession,
    pub(crate) input: Box<dyn InputSource>,
}

pub(crate) fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

pub(crate) fn build_app() -> Result<AppWiring, BootstrapError> {
    let app_paths = resolve_app_paths().map_err(AppError::from)?;
    let request =
        ContentRequest::from_mod_list(&env::var(ENABLED_MODS_ENV_VAR).unwrap_or_default());
    info!(
        root = %app_paths.root.display(),
        enabled_mods = ?request.enabled_mods,
        "content_request"
    );

    let defs = compile_def_database(&app_paths, &request).map_err(AppError::from)?;
    info!(
        enemy_defs = defs.enemy_defs().len(),
        skill_defs = defs.skill_defs().len(),
        "defs_compiled"
    );

    let registry = MapRegistry::new(&app_paths, &request).map_err(AppError::from)?;
    let start_map = env::var(START_MAP_ENV_VAR)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_START_MAP.to_string());
    let map = registry.load(&start_map).map_err(AppError::from)?;

    let seed = parse_env_value::<u64>(SEED_ENV_VAR).unwrap_or(DEFAULT_SEED);
    let mut session = GameSession::new(defs, registry, start_map, seed);
    session.load_map(map);

    let input: Box<dyn InputSource> = match env::var_os(INPUT_SCRIPT_ENV_VAR) {
        Some(path) => Box::new(ScriptedInput::from_path(&PathBuf::from(path))?),
        None => Box::new(IdleInput),
    };

    let config = LoopConfig {
        max_frames: parse_env_value::<u64>(MAX_FRAMES_ENV_VAR),
        fixed_frame_delta: parse_env_value::<u64>(FIXED_STEP_ENV_VAR)
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis),
        ..LoopConfig::default()
    };

    Ok(AppWiring {
        config,
        session,
        input,
    })
}

/// Unset means `None`; unparsable values are logged and ignored.
fn parse_env_value<T: FromStr>(env_var: &'static str) -> Option<T> {
    match env::var(env_var) {
        Ok(value) => match value.trim().parse::<T>() {
            Ok(parsed) => Some(parsed),
            Err(_) => {
                warn!(
                    env_var,
                    value = value.as_str(),
                    "invalid env var value; ignoring"
                );
                None
            }
        },
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            warn!(env_var, error = %err, "unable to read env var; ignoring");
            None
        }
    }
}
