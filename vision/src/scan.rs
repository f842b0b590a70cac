//! The detection loop task.
//!
//! Pulls frames at a steady cadence, runs the detector, and feeds the
//! [`CaptureMonitor`]. Progress updates go out over a lossy broadcast so
//! slow presentation consumers can never stall frame ingestion.

use std::time::{Duration, Instant};
use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

use crate::detector::PresenceDetector;
use crate::error::DeviceError;
use crate::monitor::{CaptureEvent, CaptureMonitor};
use crate::source::FrameSource;

/// Updates published to the presentation layer while scanning.
#[derive(Debug, Clone, Copy)]
pub enum ScanUpdate {
    /// Fraction of the hold threshold reached. 0.0 means searching.
    Progress(f32),
    /// The capture fired; the session's frame is on its way downstream.
    Captured,
}

/// Run one scan session to completion.
///
/// Returns `Ok(Some(event))` when presence was held long enough,
/// `Ok(None)` when cancelled, or the device error that ended the session.
/// Send errors on `updates` are ignored: nobody watching is fine.
pub async fn scan_loop(
    source: &mut dyn FrameSource,
    detector: &mut dyn PresenceDetector,
    mut monitor: CaptureMonitor,
    cadence: Duration,
    updates: broadcast::Sender<ScanUpdate>,
    mut cancel: watch::Receiver<bool>,
) -> Result<Option<CaptureEvent>, DeviceError> {
    let mut ticker = tokio::time::interval(cadence);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    info!(?cadence, "scan session started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = cancel.changed() => {}
        }
        if *cancel.borrow() {
            warn!("scan session cancelled");
            return Ok(None);
        }

        let frame = source.next_frame().await?;
        let detection = detector.detect(&frame).await?;
        if let Some(event) = monitor.observe(frame, &detection, Instant::now()) {
            info!(held_for = ?event.held_for, "capture triggered");
            let _ = updates.send(ScanUpdate::Captured);
            return Ok(Some(event));
        }
        let _ = updates.send(ScanUpdate::Progress(monitor.progress()));
    }
}
