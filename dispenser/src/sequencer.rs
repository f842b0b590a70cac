//! Strictly sequential recipe execution with guaranteed release.
//!
//! One run: all pumps forced off, then each step energizes exactly one
//! pump for its duration, then everything is forced off again. The final
//! all-off is joined onto the step-runner's result inside [`Sequencer::run`],
//! so it executes on success, on an [`ActuatorFault`], and on cancellation
//! alike. Cancellation is cooperative: the per-step wait races the cancel
//! flag, and the canceller is expected to fire its own idempotent
//! [`PumpBank::all_off`] without waiting for this task to notice.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

use crate::bank::{ActuatorFault, PumpBank};
use crate::channel::ChannelError;
use crate::recipe::{PumpId, Recipe};

/// Per-step progress for the presentation layer.
#[derive(Debug, Clone)]
pub enum DispenseEvent {
    Started { recipe: String },
    Step { pump: PumpId, secs: f32 },
    Done { recipe: String },
    Aborted,
}

/// Terminal state of a sequencer run that did not fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceOutcome {
    Done,
    Aborted,
}

#[derive(Debug, Error)]
pub enum DispenseError {
    /// A run is already in flight; concurrent dispensing is rejected,
    /// never queued.
    #[error("a dispense is already running")]
    Busy,
    #[error(transparent)]
    Fault(#[from] ActuatorFault),
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

/// Executes recipes against the exclusive pump bank.
#[derive(Clone)]
pub struct Sequencer {
    bank: PumpBank,
    events: broadcast::Sender<DispenseEvent>,
    in_flight: Arc<AtomicBool>,
}

impl Sequencer {
    pub fn new(bank: PumpBank) -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            bank,
            events,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Subscribe to per-step progress events.
    pub fn subscribe(&self) -> broadcast::Receiver<DispenseEvent> {
        self.events.subscribe()
    }

    /// A shared handle to the bank, e.g. for a canceller's kill switch.
    pub fn bank(&self) -> PumpBank {
        self.bank.clone()
    }

    /// Run one recipe to completion or abort.
    ///
    /// Whatever happens inside, every pump is off before this returns:
    /// the unconditional all-off below runs on success, fault, and cancel.
    pub async fn run(
        &self,
        recipe: &Recipe,
        cancel: watch::Receiver<bool>,
    ) -> Result<SequenceOutcome, DispenseError> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            warn!(recipe = %recipe.name, "dispense rejected: already running");
            return Err(DispenseError::Busy);
        }
        info!(recipe = %recipe.name, steps = recipe.steps.len(), "dispense started");
        let _ = self.events.send(DispenseEvent::Started {
            recipe: recipe.name.clone(),
        });

        let result = self.run_steps(recipe, cancel).await;
        let release = self.bank.all_off().await;
        self.in_flight.store(false, Ordering::SeqCst);

        match (result, release) {
            (Ok(SequenceOutcome::Done), Ok(())) => {
                info!(recipe = %recipe.name, "dispense complete");
                let _ = self.events.send(DispenseEvent::Done {
                    recipe: recipe.name.clone(),
                });
                Ok(SequenceOutcome::Done)
            }
            (Ok(SequenceOutcome::Aborted), Ok(())) => {
                warn!(recipe = %recipe.name, "dispense aborted");
                let _ = self.events.send(DispenseEvent::Aborted);
                Ok(SequenceOutcome::Aborted)
            }
            // A step fault outranks a release fault; either way the bank
            // was driven toward off for every pump before returning.
            (Err(fault), _) => {
                let _ = self.events.send(DispenseEvent::Aborted);
                Err(fault)
            }
            (Ok(_), Err(fault)) => {
                let _ = self.events.send(DispenseEvent::Aborted);
                Err(fault.into())
            }
        }
    }

    async fn run_steps(
        &self,
        recipe: &Recipe,
        mut cancel: watch::Receiver<bool>,
    ) -> Result<SequenceOutcome, DispenseError> {
        // Known state before the first step.
        self.bank.all_off().await?;

        for step in &recipe.steps {
            if *cancel.borrow() {
                return Ok(SequenceOutcome::Aborted);
            }
            let secs = step.duration.as_secs_f32();
            info!(pump = %step.pump, secs, "dispense step");
            let _ = self.events.send(DispenseEvent::Step {
                pump: step.pump,
                secs,
            });

            self.bank.activate(step.pump).await?;
            let cancelled = tokio::select! {
                _ = tokio::time::sleep(step.duration) => false,
                _ = cancelled(&mut cancel) => true,
            };
            self.bank.deactivate(step.pump).await?;
            if cancelled {
                return Ok(SequenceOutcome::Aborted);
            }
        }
        Ok(SequenceOutcome::Done)
    }
}

/// Resolves once the cancel flag is raised; never resolves if the sender
/// side is gone (an unreachable canceller means nobody can cancel).
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    loop {
        if *cancel.borrow_and_update() {
            return;
        }
        if cancel.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
