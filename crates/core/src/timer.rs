//! Frame timing.

use std::time::{Duration, Instant};

/// Per-frame timer with a smoothed frames-per-second estimate.
#[derive(Debug)]
pub struct Timer {
    start: Instant,
    last_tick: Instant,
    smoothed_fps: f32,
}

const FPS_SMOOTHING: f32 = 0.9;

impl Timer {
    /// Create a new timer, starting from now.
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last_tick: now,
            smoothed_fps: 0.0,
        }
    }

    /// Total elapsed time since the timer was created.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Advance the timer and return the delta since the previous tick.
    pub fn tick(&mut self) -> Duration {
        let now = Instant::now();
        let delta = now - self.last_tick;
        self.last_tick = now;

        let secs = delta.as_secs_f32();
        if secs > 0.0 {
            let instant_fps = 1.0 / secs;
            self.smoothed_fps = if self.smoothed_fps == 0.0 {
                instant_fps
            } else {
                self.smoothed_fps * FPS_SMOOTHING + instant_fps * (1.0 - FPS_SMOOTHING)
            };
        }
        delta
    }

    /// Exponentially smoothed frame rate, 0.0 until the first tick.
    pub fn fps(&self) -> f32 {
        self.smoothed_fps
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
    fn test_fps_starts_at_zero() {
        let timer = Timer::new();
        assert_eq!(timer.fps(), 0.0);
    }

    #[test]
    fn test_tick_advances() {
        let mut timer = Timer::new();
        std::thread::sleep(Duration::from_millis(1));
        let delta = timer.tick();
        assert!(delta >= Duration::from_millis(1));
        assert!(timer.fps() > 0.0);
    }
}
