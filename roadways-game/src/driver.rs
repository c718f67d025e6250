//! Tokio host for a [`TripMachine`].
//!
//! One task owns the machine. Player commands, the repeating clock tick and
//! delayed event triggers all arrive through the same queue, so transitions
//! never interleave. Delayed triggers hold only a weak sender; dropping every
//! [`DriverHandle`] therefore ends the task even while triggers are sleeping.
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{Instant, MissedTickBehavior};

use crate::machine::{ActionOutcome, Command, PendingTrigger, TripMachine};
use crate::state::{TripPhase, TripState};
use crate::steer::SteerDirection;

const COMMAND_QUEUE_DEPTH: usize = 64;

/// Errors surfaced to hosts talking to a running driver.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("trip driver has stopped")]
    Closed,
    #[error("trip driver task failed: {0}")]
    Join(#[from] JoinError),
}

/// State published after every applied transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub epoch: u64,
    pub phase: TripPhase,
    pub state: TripState,
}

impl Snapshot {
    fn capture(machine: &TripMachine) -> Self {
        Self {
            epoch: machine.epoch(),
            phase: machine.phase(),
            state: machine.state().clone(),
        }
    }
}

enum DriverMessage {
    Command {
        command: Command,
        reply: Option<oneshot::Sender<ActionOutcome>>,
    },
    Shutdown,
}

/// Cloneable handle for sending commands and observing snapshots.
#[derive(Debug, Clone)]
pub struct DriverHandle {
    commands: mpsc::Sender<DriverMessage>,
    snapshots: watch::Receiver<Snapshot>,
}

impl std::fmt::Debug for DriverMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Command { command, .. } => write!(f, "Command({command:?})"),
            Self::Shutdown => write!(f, "Shutdown"),
        }
    }
}

/// Owning side of a running driver; join it to get the machine back.
#[derive(Debug)]
pub struct TripDriver {
    handle: DriverHandle,
    task: JoinHandle<TripMachine>,
}

impl TripDriver {
    /// Spawn the driver task on the current tokio runtime.
    #[must_use]
    pub fn spawn(machine: TripMachine) -> Self {
        let (tx, rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let (snapshot_tx, snapshot_rx) = watch::channel(Snapshot::capture(&machine));
        let weak = tx.downgrade();
        let task = tokio::spawn(run(machine, rx, weak, snapshot_tx));
        Self {
            handle: DriverHandle {
                commands: tx,
                snapshots: snapshot_rx,
            },
            task,
        }
    }

    #[must_use]
    pub fn handle(&self) -> DriverHandle {
        self.handle.clone()
    }

    /// Stop the task and return the machine in its final state.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver task panicked.
    pub async fn shutdown(self) -> Result<TripMachine, DriverError> {
        // The task may already have stopped; joining still yields the machine.
        let _ = self.handle.commands.send(DriverMessage::Shutdown).await;
        Ok(self.task.await?)
    }
}

impl DriverHandle {
    /// Queue a command and wait for the machine's verdict.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Closed`] if the driver has stopped.
    pub async fn send(&self, command: Command) -> Result<ActionOutcome, DriverError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(DriverMessage::Command {
                command,
                reply: Some(reply_tx),
            })
            .await
            .map_err(|_| DriverError::Closed)?;
        reply_rx.await.map_err(|_| DriverError::Closed)
    }

    /// # Errors
    ///
    /// Returns [`DriverError::Closed`] if the driver has stopped.
    pub async fn accelerate(&self) -> Result<ActionOutcome, DriverError> {
        self.send(Command::Accelerate).await
    }

    /// # Errors
    ///
    /// Returns [`DriverError::Closed`] if the driver has stopped.
    pub async fn brake(&self) -> Result<ActionOutcome, DriverError> {
        self.send(Command::Brake).await
    }

    /// # Errors
    ///
    /// Returns [`DriverError::Closed`] if the driver has stopped.
    pub async fn steer(&self, direction: SteerDirection) -> Result<ActionOutcome, DriverError> {
        self.send(Command::Steer { direction }).await
    }

    /// # Errors
    ///
    /// Returns [`DriverError::Closed`] if the driver has stopped.
    pub async fn choose(&self, index: usize) -> Result<ActionOutcome, DriverError> {
        self.send(Command::Choose { index }).await
    }

    /// # Errors
    ///
    /// Returns [`DriverError::Closed`] if the driver has stopped.
    pub async fn restart(&self) -> Result<ActionOutcome, DriverError> {
        self.send(Command::Restart).await
    }

    /// Latest published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    /// Fresh receiver for awaiting snapshot changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }
}

async fn run(
    mut machine: TripMachine,
    mut rx: mpsc::Receiver<DriverMessage>,
    weak: mpsc::WeakSender<DriverMessage>,
    snapshots: watch::Sender<Snapshot>,
) -> TripMachine {
    let period = machine.config().tick_interval();
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    schedule_pending(&mut machine, &weak);

    loop {
        tokio::select! {
            message = rx.recv() => {
                let Some(DriverMessage::Command { command, reply }) = message else {
                    break;
                };
                let outcome = machine.apply(command);
                schedule_pending(&mut machine, &weak);
                if outcome.is_applied() {
                    snapshots.send_replace(Snapshot::capture(&machine));
                }
                if let Some(reply) = reply {
                    let _ = reply.send(outcome);
                }
            }
            _ = ticker.tick() => {
                if machine.phase() == TripPhase::Driving && machine.tick().is_applied() {
                    snapshots.send_replace(Snapshot::capture(&machine));
                }
            }
        }
    }
    log::debug!("driver | stopped at epoch {}", machine.epoch());
    machine
}

fn schedule_pending(machine: &mut TripMachine, weak: &mpsc::WeakSender<DriverMessage>) {
    let Some(PendingTrigger { epoch, delay }) = machine.take_pending_trigger() else {
        return;
    };
    let weak = weak.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if let Some(tx) = weak.upgrade() {
            let _ = tx
                .send(DriverMessage::Command {
                    command: Command::TriggerEvent { epoch },
                    reply: None,
                })
                .await;
        }
    });
}
