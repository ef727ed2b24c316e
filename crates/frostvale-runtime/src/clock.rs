//! Frame clock

use std::time::Instant;

/// Longest frame delta fed to movement, so a stall does not teleport the camera.
const MAX_DELTA: f64 = 0.25;

/// Tracks elapsed time and the delta of the last frame
pub struct FrameClock {
    /// Wall-clock seconds since the first tick, drives light animation.
    /// Not capped, so animation keeps pace after a stall.
    pub total_time: f64,
    /// Time since last frame in seconds, capped at `MAX_DELTA`
    pub delta_time: f64,
    /// Frames ticked so far
    pub frame_count: u64,
    last_instant: Instant,
    first_tick: bool,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self {
            total_time: 0.0,
            delta_time: 0.0,
            frame_count: 0,
            last_instant: Instant::now(),
            first_tick: true,
        }
    }
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the clock. Call once per frame.
    pub fn tick(&mut self) {
        let now = Instant::now();

        if self.first_tick {
            self.first_tick = false;
            self.last_instant = now;
            self.delta_time = 0.0;
            self.frame_count += 1;
            return;
        }

        let elapsed = now.duration_since(self.last_instant).as_secs_f64();
        self.last_instant = now;
        self.advance(elapsed);
    }

    /// Advance by an explicit amount of time.
    pub fn advance(&mut self, elapsed: f64) {
        let elapsed = elapsed.max(0.0);
        self.delta_time = elapsed.min(MAX_DELTA);
        self.total_time += elapsed;
        self.frame_count += 1;
    }

    /// Frames per second implied by the last delta.
    pub fn fps(&self) -> f64 {
        if self.delta_time > 0.0 {
            1.0 / self.delta_time
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_tick_zero_delta() {
        let mut clock = FrameClock::new();
        clock.tick();
        assert_eq!(clock.delta_time, 0.0);
        assert_eq!(clock.total_time, 0.0);
        assert_eq!(clock.frame_count, 1);
    }

    #[test]
    fn test_advance_accumulates() {
        let mut clock = FrameClock::new();
        clock.advance(0.016);
        clock.advance(0.016);
        assert!((clock.total_time - 0.032).abs() < 1e-12);
        assert!((clock.fps() - 62.5).abs() < 1e-9);
    }

    #[test]
    fn test_long_frames_clamp_delta_only() {
        let mut clock = FrameClock::new();
        clock.advance(3.0);
        assert_eq!(clock.delta_time, 0.25);
        assert_eq!(clock.total_time, 3.0);
    }

    #[test]
    fn test_total_time_tracks_wall_clock_across_stall() {
        let mut clock = FrameClock::new();
        clock.advance(0.5);
        clock.advance(2.0);
        clock.advance(0.1);
        assert!((clock.total_time - 2.6).abs() < 1e-12);
        assert!((clock.delta_time - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_negative_elapsed_ignored() {
        let mut clock = FrameClock::new();
        clock.advance(1.0);
        clock.advance(-0.5);
        assert_eq!(clock.delta_time, 0.0);
        assert_eq!(clock.total_time, 1.0);
    }
}
