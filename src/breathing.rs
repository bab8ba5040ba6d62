// src/breathing.rs - Box breathing timer
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, error, info};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration};

use crate::{MoodError, Result};

/// Default number of seconds spent in each phase.
pub const DEFAULT_PHASE_SECS: u32 = 4;

/// The four phases of a box-breathing cycle, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BreathingPhase {
    Inhale,
    HoldIn,
    Exhale,
    HoldOut,
}

impl BreathingPhase {
    pub const CYCLE: [BreathingPhase; 4] = [
        BreathingPhase::Inhale,
        BreathingPhase::HoldIn,
        BreathingPhase::Exhale,
        BreathingPhase::HoldOut,
    ];

    pub fn next(self) -> Self {
        match self {
            BreathingPhase::Inhale => BreathingPhase::HoldIn,
            BreathingPhase::HoldIn => BreathingPhase::Exhale,
            BreathingPhase::Exhale => BreathingPhase::HoldOut,
            BreathingPhase::HoldOut => BreathingPhase::Inhale,
        }
    }

    /// Position in [`BreathingPhase::CYCLE`].
    pub fn index(self) -> usize {
        match self {
            BreathingPhase::Inhale => 0,
            BreathingPhase::HoldIn => 1,
            BreathingPhase::Exhale => 2,
            BreathingPhase::HoldOut => 3,
        }
    }

    /// Instruction shown to the user.
    pub fn instruction(self) -> &'static str {
        match self {
            BreathingPhase::Inhale => "Inhale",
            BreathingPhase::Exhale => "Exhale",
            BreathingPhase::HoldIn | BreathingPhase::HoldOut => "Hold",
        }
    }
}

/// What the user should be doing at a given second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BreathingTick {
    pub phase: BreathingPhase,
    /// Seconds left in the phase, from the phase length down to 1
    pub seconds_remaining: u32,
    /// Full cycles finished so far
    pub completed_cycles: u32,
}

/// Pure state machine behind the timer. Each call to [`BreathingCycle::tick`]
/// is one elapsed second.
#[derive(Debug, Clone)]
pub struct BreathingCycle {
    phase: BreathingPhase,
    phase_secs: u32,
    remaining: u32,
    completed_cycles: u32,
}

impl BreathingCycle {
    /// A phase length of zero is treated as one second.
    pub fn new(phase_secs: u32) -> Self {
        let phase_secs = phase_secs.max(1);
        Self {
            phase: BreathingPhase::Inhale,
            phase_secs,
            remaining: phase_secs,
            completed_cycles: 0,
        }
    }

    pub fn phase(&self) -> BreathingPhase {
        self.phase
    }

    pub fn completed_cycles(&self) -> u32 {
        self.completed_cycles
    }

    pub fn current(&self) -> BreathingTick {
        BreathingTick {
            phase: self.phase,
            seconds_remaining: self.remaining,
            completed_cycles: self.completed_cycles,
        }
    }

    /// Advances one second, moving to the next phase when the countdown
    /// runs out.
    pub fn tick(&mut self) -> BreathingTick {
        if self.remaining > 1 {
            self.remaining -= 1;
        } else {
            self.phase = self.phase.next();
            self.remaining = self.phase_secs;
            if self.phase == BreathingPhase::Inhale {
                self.completed_cycles += 1;
            }
        }
        self.current()
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.phase_secs);
    }
}

/// Timer settings for a session.
#[derive(Debug, Clone, Copy)]
pub struct BreathingConfig {
    pub phase_secs: u32,
    /// End the session by itself after this many cycles. Zero ends it
    /// before the first tick.
    pub max_cycles: Option<u32>,
}

impl Default for BreathingConfig {
    fn default() -> Self {
        Self {
            phase_secs: DEFAULT_PHASE_SECS,
            max_cycles: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BreathingStatus {
    /// Whether the timer task is running
    pub is_running: bool,
    /// Last tick delivered to the callback
    pub last_tick: Option<BreathingTick>,
}

#[derive(Debug, Clone)]
enum BreathingCommand {
    Stop,
}

/// A running breathing exercise. The callback receives one
/// [`BreathingTick`] per second, starting immediately with the first
/// second of `Inhale`.
pub struct BreathingSession {
    /// Channel to send commands to the timer task
    command_tx: mpsc::Sender<BreathingCommand>,

    /// Handle to the timer task
    task: Option<JoinHandle<()>>,

    /// Shared with the timer task
    status: Arc<Mutex<BreathingStatus>>,
}

impl BreathingSession {
    /// Starts the timer on the current tokio runtime.
    pub fn start<F>(config: BreathingConfig, mut on_tick: F) -> Self
    where
        F: FnMut(BreathingTick) + Send + 'static,
    {
        info!(
            "Starting breathing session: {}s per phase, cycles={:?}",
            config.phase_secs, config.max_cycles
        );
        let (command_tx, mut command_rx) = mpsc::channel(4);
        let status = Arc::new(Mutex::new(BreathingStatus {
            is_running: true,
            last_tick: None,
        }));
        let task_status = Arc::clone(&status);

        let task = tokio::spawn(async move {
            if config.max_cycles == Some(0) {
                debug!("Cycle limit is zero, nothing to run");
                lock_status(&task_status).is_running = false;
                return;
            }

            let mut cycle = BreathingCycle::new(config.phase_secs);
            let mut interval = time::interval(Duration::from_secs(1));
            // The first tick completes immediately and shows the initial state.
            interval.tick().await;
            deliver(&task_status, &mut on_tick, cycle.current());

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let tick = cycle.tick();
                        if config.max_cycles.is_some_and(|max| tick.completed_cycles >= max) {
                            info!("Breathing session finished after {} cycles", tick.completed_cycles);
                            break;
                        }
                        deliver(&task_status, &mut on_tick, tick);
                    }
                    cmd = command_rx.recv() => match cmd {
                        Some(BreathingCommand::Stop) | None => {
                            info!("Breathing session stopping...");
                            break;
                        }
                    }
                }
            }

            lock_status(&task_status).is_running = false;
        });

        Self {
            command_tx,
            task: Some(task),
            status,
        }
    }

    /// Stops the timer and waits for the task to finish.
    pub async fn stop(&mut self) -> Result<()> {
        if let Some(task) = self.task.take() {
            if let Err(e) = self.command_tx.send(BreathingCommand::Stop).await {
                // The task already ended on its own.
                debug!("Breathing task no longer listening: {}", e);
            }
            task.await.map_err(|e| {
                let error_msg = format!("Failed to stop breathing session: {}", e);
                error!("{}", error_msg);
                MoodError::ApplicationError { message: error_msg }
            })?;
            info!("Breathing session stopped");
        } else {
            debug!("Breathing session is not running");
        }
        Ok(())
    }

    /// Waits for the session to end by itself. Without a cycle limit it
    /// never does, so callers race this against a shutdown signal and then
    /// call [`BreathingSession::stop`]. Cancelling the wait leaves the
    /// session running.
    pub async fn wait(&mut self) -> Result<()> {
        if let Some(task) = self.task.as_mut() {
            let outcome = task.await;
            self.task = None;
            outcome.map_err(|e| MoodError::ApplicationError {
                message: format!("Breathing session failed: {}", e),
            })?;
        }
        Ok(())
    }

    pub fn status(&self) -> BreathingStatus {
        lock_status(&self.status).clone()
    }
}

fn deliver<F: FnMut(BreathingTick)>(status: &Mutex<BreathingStatus>, on_tick: &mut F, tick: BreathingTick) {
    lock_status(status).last_tick = Some(tick);
    on_tick(tick);
}

fn lock_status(status: &Mutex<BreathingStatus>) -> MutexGuard<'_, BreathingStatus> {
    status.lock().unwrap_or_else(PoisonError::into_inner)
}
