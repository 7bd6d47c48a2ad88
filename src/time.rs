use std::time::{Duration, Instant};

/// Number of frame deltas averaged for the FPS readout.
pub const FPS_SAMPLES: usize = 10;

pub struct FrameTimer {
    start: Instant,
    last: Instant,
    pub delta: Duration,
    samples: [f32; FPS_SAMPLES],
    cursor: usize,
}

impl FrameTimer {
    pub fn new() -> Self {
        let now = Instant::now();
        Self { start: now, last: now, delta: Duration::ZERO, samples: [1.0; FPS_SAMPLES], cursor: 0 }
    }

    /// Measures the wall-clock time since the previous tick.
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        self.delta = now - self.last;
        self.last = now;
        self.delta.as_secs_f32()
    }

    /// Feeds one frame delta into the ring buffer.
    pub fn record(&mut self, dt: f32) {
        self.samples[self.cursor] = dt;
        self.cursor = (self.cursor + 1) % FPS_SAMPLES;
    }

    pub fn average_delta(&self) -> f32 {
        self.samples.iter().sum::<f32>() / FPS_SAMPLES as f32
    }

    pub fn fps(&self) -> f32 {
        let avg = self.average_delta();
        if avg > 0.0 {
            1.0 / avg
        } else {
            0.0
        }
    }

    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    pub fn elapsed_seconds(&self) -> f32 {
        self.last.duration_since(self.start).as_secs_f32()
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fps_averages_last_ten_samples() {
        let mut timer = FrameTimer::new();
        assert!((timer.fps() - 1.0).abs() < 1e-6);
        for _ in 0..FPS_SAMPLES {
            timer.record(0.5);
        }
        assert!((timer.fps() - 2.0).abs() < 1e-4);
        for _ in 0..FPS_SAMPLES {
            timer.record(1.0 / 60.0);
        }
        assert!((timer.fps() - 60.0).abs() < 0.01);
    }
}
