mod clock;
mod geometry;
mod input;
mod loop_runner;
mod metrics;
mod scene;

pub use clock::{SimClock, SimTime};
pub use geometry::{clamp_center_to_bounds, Rect, Vec2};
pub use input::{Direction, InputAction, InputCollector, InputSnapshot, SKILL_SLOT_COUNT};
pub use loop_runner::{
    run_scene, AppError, FrameInput, InputSource, LoopConfig, LoopExit, LoopSummary,
};
pub use metrics::{LoopMetricsSnapshot, MetricsHandle};
pub use scene::{
    Camera2D, EntityBase, EntityId, EntityIdAllocator, EntityKind, Scene, SceneCommand,
    SceneDebugCommand, SceneDebugCommandResult, DEFAULT_VIEWPORT_HEIGHT, DEFAULT_VIEWPORT_WIDTH,
};
