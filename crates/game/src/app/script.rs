use std::collections::VecDeque;
use std::fs;
use std::mem;
use std::path::{Path, PathBuf};

use engine::{
    FrameInput, InputAction, InputCollector, InputSnapshot, InputSource, SceneDebugCommand, Vec2,
};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub(crate) enum ScriptError {
    #[error("failed to read input script {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid input script {path} at {json_path}: {source}")]
    Parse {
        path: PathBuf,
        json_path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ScriptAction {
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    Run,
    #[serde(rename = "skill_1")]
    Skill1,
    #[serde(rename = "skill_2")]
    Skill2,
    #[serde(rename = "skill_3")]
    Skill3,
    #[serde(rename = "skill_4")]
    Skill4,
    #[serde(rename = "skill_5")]
    Skill5,
    #[serde(rename = "skill_6")]
    Skill6,
    Quit,
}

impl From<ScriptAction> for InputAction {
    fn from(action: ScriptAction) -> Self {
        match action {
            ScriptAction::MoveUp => InputAction::MoveUp,
            ScriptAction::MoveDown => InputAction::MoveDown,
            ScriptAction::MoveLeft => InputAction::MoveLeft,
            ScriptAction::MoveRight => InputAction::MoveRight,
            ScriptAction::Run => InputAction::Run,
            ScriptAction::Skill1 => InputAction::SkillSlot1,
            ScriptAction::Skill2 => InputAction::SkillSlot2,
            ScriptAction::Skill3 => InputAction::SkillSlot3,
            ScriptAction::Skill4 => InputAction::SkillSlot4,
            ScriptAction::Skill5 => InputAction::SkillSlot5,
            ScriptAction::Skill6 => InputAction::SkillSlot6,
            ScriptAction::Quit => InputAction::Quit,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
enum ScriptCommand {
    LoadMap { name: String },
    Spawn { type_key: String, x: f32, y: f32 },
    OrderMove { entity_id: u64, x: f32, y: f32 },
    DumpState,
}

impl From<ScriptCommand> for SceneDebugCommand {
    fn from(command: ScriptCommand) -> Self {
        match command {
            ScriptCommand::LoadMap { name } => SceneDebugCommand::LoadMap { name },
            ScriptCommand::Spawn { type_key, x, y } => SceneDebugCommand::Spawn {
                type_key,
                position: Vec2::new(x, y),
            },
            ScriptCommand::OrderMove { entity_id, x, y } => {
                SceneDebugCommand::OrderMove { entity_id, x, y }
            }
            ScriptCommand::DumpState => SceneDebugCommand::DumpState,
        }
    }
}

/// One scripted segment: `hold` is the full set of held actions for `frames`
/// frames. Actions not listed are released when the step begins.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScriptStep {
    frames: u32,
    #[serde(default)]
    hold: Vec<ScriptAction>,
    /// Simulates focus loss before the step's holds apply.
    #[serde(default)]
    blur: bool,
    #[serde(default)]
    commands: Vec<ScriptCommand>,
}

/// Replays a JSON list of steps through an [`InputCollector`].
#[derive(Debug)]
pub(crate) struct ScriptedInput {
    steps: VecDeque<ScriptStep>,
    collector: InputCollector,
    frames_left: u32,
    pending_commands: Vec<SceneDebugCommand>,
}

impl ScriptedInput {
    pub(crate) fn from_path(path: &Path) -> Result<Self, ScriptError> {
        let raw = fs::read_to_string(path).map_err(|source| ScriptError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let script = Self::from_json_str(&raw, path)?;
        info!(path = %path.display(), steps = script.steps.len(), "input_script_loaded");
        Ok(script)
    }

    pub(crate) fn from_json_str(raw: &str, origin: &Path) -> Result<Self, ScriptError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        let steps: Vec<ScriptStep> =
            serde_path_to_error::deserialize(&mut deserializer).map_err(|err| {
                ScriptError::Parse {
                    path: origin.to_path_buf(),
                    json_path: err.path().to_string(),
                    source: err.into_inner(),
                }
            })?;
        Ok(Self {
            steps: steps.into(),
            collector: InputCollector::new(),
            frames_left: 0,
            pending_commands: Vec::new(),
        })
    }

    fn begin_step(&mut self, step: ScriptStep) {
        if step.blur {
            self.collector.clear();
        }
        let held: Vec<InputAction> = step.hold.iter().copied().map(InputAction::from).collect();
        for action in InputAction::ALL {
            if self.collector.is_down(action) && !held.contains(&action) {
                self.collector.release(action);
            }
        }
        for action in held {
            if !self.collector.is_down(action) {
                self.collector.press(action);
            }
        }
        self.pending_commands
            .extend(step.commands.into_iter().map(SceneDebugCommand::from));
        self.frames_left = step.frames;
        debug!(
            frames = step.frames,
            remaining_steps = self.steps.len(),
            "input_script_step"
        );
    }
}

impl InputSource for ScriptedInput {
    fn next_frame(&mut self) -> Option<FrameInput> {
        while self.frames_left == 0 {
            let step = self.steps.pop_front()?;
            self.begin_step(step);
        }
        self.frames_left -= 1;
        Some(FrameInput {
            snapshot: self.collector.snapshot(),
            debug_commands: mem::take(&mut self.pending_commands),
        })
    }
}

/// Endless empty input, for unscripted headless runs bounded by a frame limit.
#[derive(Debug, Default)]
pub(crate) struct IdleInput;

impl InputSource for IdleInput {
    fn next_frame(&mut self) -> Option<FrameInput> {
        Some(FrameInput::from_snapshot(InputSnapshot::empty()))
    }
}
