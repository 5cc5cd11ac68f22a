//! Frame timing.

use std::time::{Duration, Instant};

/// High-resolution timer driving the frame loop.
///
/// Tracks per-frame delta time and a one-second FPS window.
#[derive(Debug)]
pub struct Timer {
    start: Instant,
    last_tick: Instant,
    fps_window_start: Instant,
    fps_frames: u32,
}

impl Timer {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last_tick: now,
            fps_window_start: now,
            fps_frames: 0,
        }
    }

    /// Total elapsed time since the timer was created.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn elapsed_secs(&self) -> f32 {
        self.elapsed().as_secs_f32()
    }

    /// Time elapsed since the last call to `tick()`.
    pub fn tick(&mut self) -> Duration {
        let now = Instant::now();
        let delta = now - self.last_tick;
        self.last_tick = now;
        delta
    }

    /// Delta time in seconds since the last tick.
    pub fn delta_secs(&mut self) -> f32 {
        self.tick().as_secs_f32()
    }

    /// Record a completed frame. Returns the measured FPS once per second,
    /// `None` otherwise.
    pub fn frame_completed(&mut self) -> Option<f32> {
        self.fps_frames += 1;
        let window = self.fps_window_start.elapsed();
        if window >= Duration::from_secs(1) {
            let fps = self.fps_frames as f32 / window.as_secs_f32();
            self.fps_frames = 0;
            self.fps_window_start = Instant::now();
            Some(fps)
        } else {
            None
        }
    }

    /// Reset all tracked times to now.
    pub fn reset(&mut self) {
        let now = Instant::now();
        self.start = now;
        self.last_tick = now;
        self.fps_window_start = now;
        self.fps_frames = 0;
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_advances_monotonically() {
        let mut timer = Timer::new();
        let first = timer.tick();
        let second = timer.tick();
        assert!(first >= Duration::ZERO);
        assert!(second >= Duration::ZERO);
    }

    #[test]
    fn fps_window_not_reported_immediately() {
        let mut timer = Timer::new();
        assert!(timer.frame_completed().is_none());
    }
}
