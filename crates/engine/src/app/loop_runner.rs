use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{info, warn};

use crate::content::ContentCompileError;
use crate::tilemap::MapLoadError;
use crate::StartupError;

use super::metrics::MetricsAccumulator;
use super::{
    InputSnapshot, MetricsHandle, Scene, SceneCommand, SceneDebugCommand, SceneDebugCommandResult,
};

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub target_fps: u32,
    pub max_frame_delta: Duration,
    pub metrics_log_interval: Duration,
    pub max_frames: Option<u64>,
    /// When set, every frame advances the simulation by exactly this much and
    /// the loop never sleeps. Used for scripted and test runs.
    pub fixed_frame_delta: Option<Duration>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_fps: 60,
            max_frame_delta: Duration::from_millis(250),
            metrics_log_interval: Duration::from_secs(1),
            max_frames: None,
            fixed_frame_delta: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("failed to compile content definitions: {0}")]
    Content(#[from] ContentCompileError),
    #[error("failed to load start map: {0}")]
    Map(#[from] MapLoadError),
}

/// Everything the loop consumes for one frame.
#[derive(Debug, Clone, Default)]
pub struct FrameInput {
    pub snapshot: InputSnapshot,
    pub debug_commands: Vec<SceneDebugCommand>,
}

impl FrameInput {
    pub fn from_snapshot(snapshot: InputSnapshot) -> Self {
        Self {
            snapshot,
            debug_commands: Vec::new(),
        }
    }
}

pub trait InputSource {
    /// `None` ends the run.
    fn next_frame(&mut self) -> Option<FrameInput>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    QuitRequested,
    SceneQuit,
    InputExhausted,
    FrameLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSummary {
    pub frames: u64,
    pub simulated: Duration,
    pub exit: LoopExit,
}

/// Variable-timestep driver: one scene update per frame with the measured
/// (clamped) frame delta.
pub fn run_scene(
    config: &LoopConfig,
    scene: &mut dyn Scene,
    input: &mut dyn InputSource,
    metrics_handle: &MetricsHandle,
) -> LoopSummary {
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let frame_target = target_frame_duration(config.target_fps);

    info!(
        target_fps = config.target_fps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_frames = ?config.max_frames,
        fixed_frame_delta_ms = ?config.fixed_frame_delta.map(|delta| delta.as_millis() as u64),
        "loop_config"
    );

    scene.load();
    info!(entity_count = scene.entity_count(), "scene_loaded");

    let mut frames = 0u64;
    let mut simulated = Duration::ZERO;
    let mut last_frame_instant = Instant::now();
    let mut metrics_accumulator = MetricsAccumulator::new(metrics_log_interval, last_frame_instant);

    let exit = loop {
        if config.max_frames.is_some_and(|limit| frames >= limit) {
            break LoopExit::FrameLimit;
        }
        let Some(frame) = input.next_frame() else {
            break LoopExit::InputExhausted;
        };
        if frame.snapshot.quit_requested() {
            info!(reason = "quit_action", "shutdown_requested");
            break LoopExit::QuitRequested;
        }

        for command in frame.debug_commands {
            dispatch_debug_command(scene, command);
        }

        let frame_start = Instant::now();
        let raw_frame_dt = config
            .fixed_frame_delta
            .unwrap_or_else(|| frame_start.saturating_duration_since(last_frame_instant));
        last_frame_instant = frame_start;

        let frame_dt = clamp_frame_delta(raw_frame_dt, max_frame_delta);
        if frame_dt < raw_frame_dt {
            warn!(
                raw_frame_dt_ms = raw_frame_dt.as_millis() as u64,
                clamped_ms = frame_dt.as_millis() as u64,
                "frame_delta_clamped"
            );
        }

        let command = scene.update(frame_dt.as_secs_f32() * 1000.0, &frame.snapshot);
        frames = frames.saturating_add(1);
        simulated = simulated.saturating_add(frame_dt);
        metrics_accumulator.record_frame(raw_frame_dt, frame_dt);

        match command {
            SceneCommand::None => {}
            SceneCommand::Quit => {
                info!(reason = "scene", "shutdown_requested");
                break LoopExit::SceneQuit;
            }
        }

        if let Some(snapshot) = metrics_accumulator.maybe_snapshot(Instant::now()) {
            metrics_handle.publish(snapshot);
            info!(
                fps = snapshot.fps,
                frame_time_ms = snapshot.frame_time_ms,
                sim_ms_per_second = snapshot.sim_ms_per_second,
                clamped_frames = snapshot.clamped_frames,
                entity_count = scene.entity_count(),
                title = scene.debug_title().as_deref().unwrap_or(""),
                "loop_metrics"
            );
        }

        if config.fixed_frame_delta.is_none() {
            let cap_sleep = compute_cap_sleep(frame_start.elapsed(), frame_target);
            if cap_sleep > Duration::ZERO {
                thread::sleep(cap_sleep);
            }
        }
    };

    scene.unload();
    info!(
        frames,
        simulated_ms = simulated.as_millis() as u64,
        exit = ?exit,
        "shutdown"
    );
    LoopSummary {
        frames,
        simulated,
        exit,
    }
}

fn dispatch_debug_command(scene: &mut dyn Scene, command: SceneDebugCommand) {
    let label = format!("{command:?}");
    match scene.execute_debug_command(command) {
        SceneDebugCommandResult::Success(message) => {
            info!(command = %label, message = %message, "debug_command_ok");
        }
        SceneDebugCommandResult::Error(message) => {
            warn!(command = %label, message = %message, "debug_command_failed");
        }
        SceneDebugCommandResult::Unsupported => {
            warn!(command = %label, "debug_command_unsupported");
        }
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn target_frame_duration(target_fps: u32) -> Option<Duration> {
    (target_fps > 0).then(|| Duration::from_secs_f64(1.0 / target_fps as f64))
}

fn compute_cap_sleep(elapsed: Duration, target: Option<Duration>) -> Duration {
    match target {
        Some(frame_target) if elapsed < frame_target => frame_target - elapsed,
        _ => Duration::ZERO,
    }
}
