/// Sprite-sheet column counter. Rendering only; never feeds back into the
/// simulation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct FrameAnimator {
    frame: u32,
    timer_ms: f32,
}

impl FrameAnimator {
    pub(crate) fn frame(&self) -> u32 {
        self.frame
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }

    /// Steps at most one frame per call once the accumulated time passes one
    /// frame interval.
    pub(crate) fn advance(&mut self, delta_ms: f32, frames_per_second: f32, frame_count: u32) {
        if frame_count == 0 || frames_per_second <= 0.0 {
            return;
        }
        self.timer_ms += delta_ms;
        if self.timer_ms > 1000.0 / frames_per_second {
            self.timer_ms = 0.0;
            self.frame = (self.frame + 1) % frame_count;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advances_after_interval_and_wraps() {
        let mut animator = FrameAnimator::default();
        animator.advance(100.0, 8.0, 2);
        assert_eq!(animator.frame(), 0);
        animator.advance(30.0, 8.0, 2);
        assert_eq!(animator.frame(), 1);
        animator.advance(126.0, 8.0, 2);
        assert_eq!(animator.frame(), 0);
    }

    #[test]
    fn reset_returns_to_first_frame() {
        let mut animator = FrameAnimator::default();
        animator.advance(200.0, 8.0, 6);
        animator.reset();
        assert_eq!(animator, FrameAnimator::default());
    }
}
