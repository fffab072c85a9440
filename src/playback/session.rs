use super::{PlaybackClock, PlaybackController, PlaybackError, PlayerCommand, TimedCommand};
use cleanmedia_timeline::Timeline;
use std::time::Duration;
use tokio::sync::mpsc;

/// Seconds of playback to simulate for a timeline.
///
/// Uses the media duration when known, otherwise runs a little past the last
/// segment, and never less than a minute.
pub fn session_duration(timeline: &Timeline) -> f64 {
    match timeline.duration_secs() {
        Some(duration) => duration,
        None => (timeline.last_end() + 5.0).max(60.0),
    }
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub ticks: u64,
    pub commands: usize,
    pub position: f64,
    pub interrupted: bool,
    /// Start of the next segment after `position`, if playback stopped early
    pub next_action: Option<f64>,
}

/// Drives a [`PlaybackController`] from a clock on a fixed tick.
pub struct PlaybackSession<C> {
    controller: PlaybackController,
    clock: C,
    tick: Duration,
    speed: f64,
    end_at: f64,
}

impl<C: PlaybackClock> PlaybackSession<C> {
    /// `tick` is the media time between evaluations; `speed` scales how
    /// fast that passes in wall time.
    pub fn new(
        controller: PlaybackController,
        clock: C,
        tick: Duration,
        speed: f64,
        end_at: f64,
    ) -> Self {
        Self {
            controller,
            clock,
            tick,
            speed,
            end_at,
        }
    }

    fn wall_period(&self) -> Duration {
        let speed = if self.speed > 0.0 { self.speed } else { 1.0 };
        self.tick.div_f64(speed).max(Duration::from_micros(1))
    }

    async fn send(
        commands: &mpsc::Sender<TimedCommand>,
        at: f64,
        command: PlayerCommand,
    ) -> Result<(), PlaybackError> {
        commands
            .send(TimedCommand { at, command })
            .await
            .map_err(|_| PlaybackError::ChannelClosed)
    }

    /// Run until the end position, a shutdown signal, or an error.
    ///
    /// Any error halts playback: a `Halt` command is sent (when the channel
    /// is still open) and the error is returned.
    pub async fn run(
        mut self,
        commands: mpsc::Sender<TimedCommand>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) -> Result<SessionSummary, PlaybackError> {
        let mut ticker = tokio::time::interval(self.wall_period());
        let mut summary = SessionSummary {
            ticks: 0,
            commands: 0,
            position: self.clock.now(),
            interrupted: false,
            next_action: None,
        };

        tracing::info!(end_at = self.end_at, speed = self.speed, "Playback started");

        let result = loop {
            tokio::select! {
                biased;

                Some(()) = shutdown_rx.recv() => {
                    tracing::info!("Playback interrupted");
                    summary.interrupted = true;
                    break Ok(());
                }
                _ = ticker.tick() => {
                    let now = self.clock.now();
                    if now >= self.end_at {
                        break Ok(());
                    }
                    summary.ticks += 1;

                    let issued = match self.controller.tick(now) {
                        Ok(issued) => issued,
                        Err(e) => break Err(e),
                    };

                    let mut sent = Ok(());
                    let mut seeked = false;
                    for command in issued {
                        if let PlayerCommand::Seek { to } = command {
                            self.clock.seek(to);
                            seeked = true;
                        }
                        tracing::debug!(at = now, command = %command, "Player command");
                        sent = Self::send(&commands, now, command).await;
                        if sent.is_err() {
                            break;
                        }
                        summary.commands += 1;
                    }
                    if let Err(e) = sent {
                        break Err(e);
                    }

                    // The landing position is evaluated as is on the next tick
                    if !seeked {
                        self.clock.advance(self.tick);
                    }
                }
            }
        };

        let position = self.clock.now();
        summary.position = position;
        summary.next_action = self
            .controller
            .index()
            .load()
            .next_start_after(position)
            .filter(|start| *start < self.end_at);

        if let Err(e) = result {
            tracing::error!("Playback halted: {}", e);
            let halt = PlayerCommand::Halt {
                reason: e.to_string(),
            };
            let _ = Self::send(&commands, position, halt).await;
            return Err(e);
        }

        for command in self.controller.finish() {
            Self::send(&commands, position, command).await?;
            summary.commands += 1;
        }

        tracing::info!(
            ticks = summary.ticks,
            commands = summary.commands,
            "Playback finished"
        );
        Ok(summary)
    }
}

/// Player stand-in that logs and records every command it receives.
#[derive(Debug, Default)]
pub struct SimulatedPlayer {
    received: Vec<TimedCommand>,
}

impl SimulatedPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume commands until every sender is dropped.
    pub async fn run(mut self, mut rx: mpsc::Receiver<TimedCommand>) -> Vec<TimedCommand> {
        while let Some(timed) = rx.recv().await {
            tracing::info!(at = timed.at, "{}", timed.command);
            self.received.push(timed);
        }
        self.received
    }
}
