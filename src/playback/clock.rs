use std::time::Duration;

/// Monotonic source of playback time, in seconds.
pub trait PlaybackClock: Send {
    fn now(&self) -> f64;

    /// Jump to a new position, e.g. past a skipped scene.
    fn seek(&mut self, to: f64);

    /// Called once per tick with the media time a tick covers. Clocks driven
    /// by a real player ignore it.
    fn advance(&mut self, _elapsed: Duration) {}
}

/// Clock that only moves when the session advances it.
#[derive(Debug, Clone, Default)]
pub struct SimulatedClock {
    position: f64,
}

impl SimulatedClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PlaybackClock for SimulatedClock {
    fn now(&self) -> f64 {
        self.position
    }

    fn seek(&mut self, to: f64) {
        self.position = to;
    }

    fn advance(&mut self, elapsed: Duration) {
        self.position += elapsed.as_secs_f64();
    }
}
