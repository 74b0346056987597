use std::process::ExitCode;

use engine::{run_scene, LoopExit, MetricsHandle};
use tracing::info;

use super::bootstrap::AppWiring;

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let AppWiring {
        config,
        mut session,
        mut input,
    } = app;
    let metrics = MetricsHandle::default();

    let summary = run_scene(&config, &mut session, input.as_mut(), &metrics);
    let last = metrics.snapshot();
    info!(
        frames = summary.frames,
        simulated_ms = summary.simulated.as_millis() as u64,
        exit = ?summary.exit,
        fps = last.fps,
        "run_finished"
    );

    match summary.exit {
        LoopExit::SceneQuit => ExitCode::FAILURE,
        LoopExit::QuitRequested | LoopExit::InputExhausted | LoopExit::FrameLimit => {
            ExitCode::SUCCESS
        }
    }
}
