//! The exclusive actuator registry.
//!
//! [`PumpBank`] is the only path to the pumps. It enforces the system-wide
//! invariant that at most one pump is energized at any instant: `activate`
//! forces every other pump off before switching the requested one on, and
//! `all_off` is an idempotent kill switch any task may issue.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::recipe::PumpId;

/// A write to a specific pump failed.
///
/// The sequencer still forces all-off before surfacing one of these.
#[derive(Debug, Error)]
#[error("pump {pump} write failed: {reason}")]
pub struct ActuatorFault {
    pub pump: PumpId,
    pub reason: String,
}

/// Dumb actuator port: switch one pump on or off.
///
/// Drivers hold no policy. Exclusivity and fail-safety live in the bank
/// and sequencer above them.
#[async_trait]
pub trait PumpDriver: Send {
    async fn set(&mut self, pump: PumpId, on: bool) -> Result<(), ActuatorFault>;
}

/// Driver that only logs transitions. Used on rigs without hardware.
#[derive(Clone, Default)]
pub struct LoggingDriver;

#[async_trait]
impl PumpDriver for LoggingDriver {
    async fn set(&mut self, pump: PumpId, on: bool) -> Result<(), ActuatorFault> {
        info!(%pump, on, "pump switched");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct PumpState {
    on: bool,
    changed_at: Instant,
}

struct BankInner {
    driver: Box<dyn PumpDriver>,
    states: Vec<(PumpId, PumpState)>,
}

/// Shared handle to the one actuator registry in the process.
///
/// Clones share state; the dispensing task owns the only run loop, while
/// a cancelling task may call [`PumpBank::all_off`] at any time.
#[derive(Clone)]
pub struct PumpBank {
    inner: Arc<Mutex<BankInner>>,
}

impl PumpBank {
    pub fn new(driver: Box<dyn PumpDriver>) -> Self {
        let now = Instant::now();
        let states = PumpId::all()
            .map(|id| {
                (
                    id,
                    PumpState {
                        on: false,
                        changed_at: now,
                    },
                )
            })
            .collect();
        Self {
            inner: Arc::new(Mutex::new(BankInner { driver, states })),
        }
    }

    /// Energize `pump`, forcing every other pump off first.
    pub async fn activate(&self, pump: PumpId) -> Result<(), ActuatorFault> {
        let mut inner = self.inner.lock().await;
        inner.switch_off_all_except(pump).await?;
        inner.switch(pump, true).await
    }

    /// De-energize `pump`. No-op if it is already off.
    pub async fn deactivate(&self, pump: PumpId) -> Result<(), ActuatorFault> {
        let mut inner = self.inner.lock().await;
        inner.switch(pump, false).await
    }

    /// Force every pump off. Idempotent; tries every pump even after a
    /// write fails and reports the first fault afterwards.
    pub async fn all_off(&self) -> Result<(), ActuatorFault> {
        let mut inner = self.inner.lock().await;
        let mut first_fault = None;
        for pump in PumpId::all() {
            if let Err(fault) = inner.switch(pump, false).await {
                error!(%fault, "all-off write failed, continuing");
                first_fault.get_or_insert(fault);
            }
        }
        match first_fault {
            None => Ok(()),
            Some(fault) => Err(fault),
        }
    }

    /// The pump currently energized, if any.
    pub async fn active(&self) -> Option<PumpId> {
        let inner = self.inner.lock().await;
        inner
            .states
            .iter()
            .find(|(_, state)| state.on)
            .map(|(id, _)| *id)
    }

    pub async fn is_all_off(&self) -> bool {
        self.active().await.is_none()
    }

    /// When `pump` last changed state.
    pub async fn last_change(&self, pump: PumpId) -> Instant {
        let inner = self.inner.lock().await;
        inner
            .states
            .iter()
            .find(|(id, _)| *id == pump)
            .map(|(_, state)| state.changed_at)
            .expect("pump ids come from the registry")
    }
}

impl BankInner {
    async fn switch(&mut self, pump: PumpId, on: bool) -> Result<(), ActuatorFault> {
        let idx = self
            .states
            .iter()
            .position(|(id, _)| *id == pump)
            .expect("pump ids come from the registry");
        if self.states[idx].1.on == on {
            return Ok(());
        }
        self.driver.set(pump, on).await?;
        // Book-keeping only changes after the hardware write succeeded.
        self.states[idx].1 = PumpState {
            on,
            changed_at: Instant::now(),
        };
        Ok(())
    }

    async fn switch_off_all_except(&mut self, keep: PumpId) -> Result<(), ActuatorFault> {
        let on_pumps: Vec<PumpId> = self
            .states
            .iter()
            .filter(|(id, state)| state.on && *id != keep)
            .map(|(id, _)| *id)
            .collect();
        for pump in on_pumps {
            self.switch(pump, false).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pump(id: u8) -> PumpId {
        PumpId::new(id).unwrap()
    }

    #[tokio::test]
    async fn activate_is_exclusive() {
        let bank = PumpBank::new(Box::new(LoggingDriver));
        bank.activate(pump(1)).await.unwrap();
        assert_eq!(bank.active().await, Some(pump(1)));
        bank.activate(pump(3)).await.unwrap();
        assert_eq!(bank.active().await, Some(pump(3)));
    }

    #[tokio::test]
    async fn all_off_is_idempotent() {
        let bank = PumpBank::new(Box::new(LoggingDriver));
        bank.activate(pump(2)).await.unwrap();
        bank.all_off().await.unwrap();
        assert!(bank.is_all_off().await);
        bank.all_off().await.unwrap();
        assert!(bank.is_all_off().await);
    }

    #[tokio::test]
    async fn deactivate_missing_pump_is_noop() {
        let bank = PumpBank::new(Box::new(LoggingDriver));
        bank.deactivate(pump(5)).await.unwrap();
        assert!(bank.is_all_off().await);
    }
}
