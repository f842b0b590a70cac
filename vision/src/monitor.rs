//! Presence-accumulation state machine.
//!
//! One [`CaptureMonitor`] tracks a single scan session:
//!
//! ```text
//! Idle --presence--> Accumulating --elapsed >= hold--> Triggered
//!   ^                     |
//!   '--- presence lost ---'
//! ```
//!
//! A single presence=false frame cancels all accumulated progress (the
//! original rig behaves this way; `grace_frames` relaxes it on request).
//! Once triggered, the monitor ignores frames until [`CaptureMonitor::reset`]
//! starts a new session. Time is injected by the caller so the machine is
//! deterministic under test.

use std::time::{Duration, Instant};
use tracing::debug;

use crate::frame::{DetectionResult, Frame};

/// Tuning for one scan session.
#[derive(Debug, Clone, Copy)]
pub struct CaptureConfig {
    /// How long presence must be held continuously before capture.
    pub hold: Duration,
    /// How many consecutive missed-presence frames a run survives.
    /// 0 reproduces the original behavior: any miss resets the run.
    pub grace_frames: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            hold: Duration::from_secs(2),
            grace_frames: 0,
        }
    }
}

/// Accumulation state of the current presence streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    Idle,
    Accumulating { since: Instant },
    Triggered,
}

/// Emitted when presence has been continuous for the configured hold.
#[derive(Debug)]
pub struct CaptureEvent {
    /// The frame that crossed the threshold.
    pub frame: Frame,
    /// How long presence had been held when the capture fired.
    pub held_for: Duration,
}

/// The capture state machine. Never blocks; consumes one detection per frame.
#[derive(Debug)]
pub struct CaptureMonitor {
    config: CaptureConfig,
    phase: ScanPhase,
    misses: u32,
    progress: f32,
}

impl CaptureMonitor {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            phase: ScanPhase::Idle,
            misses: 0,
            progress: 0.0,
        }
    }

    /// Feed one frame's detection result.
    ///
    /// Returns the [`CaptureEvent`] exactly once per session, on the frame
    /// whose elapsed presence first reaches the hold threshold. The frame
    /// is consumed; it is only retained inside the returned event.
    pub fn observe(
        &mut self,
        frame: Frame,
        detection: &DetectionResult,
        now: Instant,
    ) -> Option<CaptureEvent> {
        if self.phase == ScanPhase::Triggered {
            return None;
        }

        if detection.present {
            self.misses = 0;
            let since = match self.phase {
                ScanPhase::Accumulating { since } => since,
                _ => {
                    debug!("presence acquired, accumulating");
                    self.phase = ScanPhase::Accumulating { since: now };
                    now
                }
            };
            let elapsed = now.saturating_duration_since(since);
            self.progress = progress_fraction(elapsed, self.config.hold);
            if elapsed >= self.config.hold {
                debug!(?elapsed, "presence held, capture triggered");
                self.phase = ScanPhase::Triggered;
                return Some(CaptureEvent {
                    frame,
                    held_for: elapsed,
                });
            }
        } else if let ScanPhase::Accumulating { .. } = self.phase {
            self.misses += 1;
            if self.misses > self.config.grace_frames {
                debug!(misses = self.misses, "presence lost, run reset");
                self.reset();
            }
            // A graced miss keeps the run and its start instant; progress
            // holds its last value rather than advancing.
        }
        None
    }

    /// Fraction of the hold threshold reached, in `[0.0, 1.0]`.
    ///
    /// Monotonic non-decreasing within one accumulation run; exactly 0.0
    /// after any reset; 1.0 once triggered.
    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn phase(&self) -> ScanPhase {
        self.phase
    }

    /// Arm the monitor for a new session.
    pub fn reset(&mut self) {
        self.phase = ScanPhase::Idle;
        self.misses = 0;
        self.progress = 0.0;
    }
}

fn progress_fraction(elapsed: Duration, hold: Duration) -> f32 {
    if hold.is_zero() {
        return 1.0;
    }
    (elapsed.as_secs_f32() / hold.as_secs_f32()).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEP: Duration = Duration::from_millis(50); // 20 Hz cadence

    fn frame() -> Frame {
        Frame::new(vec![0u8; 4])
    }

    fn monitor(hold_ms: u64, grace: u32) -> CaptureMonitor {
        CaptureMonitor::new(CaptureConfig {
            hold: Duration::from_millis(hold_ms),
            grace_frames: grace,
        })
    }

    /// Drive the monitor with a scripted presence sequence at 20 Hz.
    fn run_sequence(m: &mut CaptureMonitor, script: &[bool]) -> Vec<Option<Duration>> {
        let start = Instant::now();
        script
            .iter()
            .enumerate()
            .map(|(i, &present)| {
                let det = if present {
                    DetectionResult::present(None)
                } else {
                    DetectionResult::absent()
                };
                m.observe(frame(), &det, start + STEP * i as u32)
                    .map(|ev| ev.held_for)
            })
            .collect()
    }

    #[test]
    fn starts_idle_with_zero_progress() {
        let m = monitor(2000, 0);
        assert_eq!(m.phase(), ScanPhase::Idle);
        assert_eq!(m.progress(), 0.0);
    }

    #[test]
    fn absent_frames_keep_idle() {
        let mut m = monitor(2000, 0);
        let fired = run_sequence(&mut m, &[false, false, false]);
        assert!(fired.iter().all(Option::is_none));
        assert_eq!(m.phase(), ScanPhase::Idle);
    }

    #[test]
    fn triggers_exactly_once_at_threshold() {
        // T = 2.0 s at 20 Hz: frame 0 starts the run, frame 40 crosses it.
        let mut m = monitor(2000, 0);
        let script = vec![true; 45];
        let fired = run_sequence(&mut m, &script);
        let hits: Vec<usize> = fired
            .iter()
            .enumerate()
            .filter_map(|(i, f)| f.map(|_| i))
            .collect();
        assert_eq!(hits, vec![40]);
        assert_eq!(m.phase(), ScanPhase::Triggered);
        assert_eq!(m.progress(), 1.0);
    }

    #[test]
    fn single_miss_resets_all_progress() {
        let mut m = monitor(2000, 0);
        // 39 hits, one miss just before the threshold, then 40 more hits:
        // the miss must cancel the first run entirely.
        let mut script = vec![true; 39];
        script.push(false);
        script.extend(vec![true; 41]);
        let fired = run_sequence(&mut m, &script);
        let hits: Vec<usize> = fired
            .iter()
            .enumerate()
            .filter_map(|(i, f)| f.map(|_| i))
            .collect();
        // New run starts at frame 40, crosses at frame 80.
        assert_eq!(hits, vec![80]);
    }

    #[test]
    fn progress_resets_to_zero_on_miss() {
        let mut m = monitor(2000, 0);
        let start = Instant::now();
        m.observe(frame(), &DetectionResult::present(None), start);
        m.observe(frame(), &DetectionResult::present(None), start + STEP * 20);
        assert!(m.progress() > 0.4);
        m.observe(frame(), &DetectionResult::absent(), start + STEP * 21);
        assert_eq!(m.progress(), 0.0);
        assert_eq!(m.phase(), ScanPhase::Idle);
    }

    #[test]
    fn progress_is_monotonic_within_a_run() {
        let mut m = monitor(2000, 0);
        let start = Instant::now();
        let mut last = 0.0f32;
        for i in 0..40 {
            m.observe(frame(), &DetectionResult::present(None), start + STEP * i);
            assert!(m.progress() >= last, "progress regressed at frame {i}");
            last = m.progress();
        }
    }

    #[test]
    fn ignores_frames_after_trigger_until_reset() {
        let mut m = monitor(100, 0);
        let start = Instant::now();
        m.observe(frame(), &DetectionResult::present(None), start);
        let ev = m.observe(
            frame(),
            &DetectionResult::present(None),
            start + Duration::from_millis(100),
        );
        assert!(ev.is_some());
        // Further presence, absence, anything: no effect.
        let later = start + Duration::from_millis(300);
        assert!(
            m.observe(frame(), &DetectionResult::present(None), later)
                .is_none()
        );
        assert!(
            m.observe(frame(), &DetectionResult::absent(), later)
                .is_none()
        );
        assert_eq!(m.phase(), ScanPhase::Triggered);

        m.reset();
        assert_eq!(m.phase(), ScanPhase::Idle);
        assert_eq!(m.progress(), 0.0);
    }

    #[test]
    fn capture_reports_held_duration() {
        let mut m = monitor(2000, 0);
        let fired = run_sequence(&mut m, &vec![true; 41]);
        let held = fired[40].expect("capture at frame 40");
        assert_eq!(held, STEP * 40);
    }

    #[test]
    fn grace_frames_survive_short_dropouts() {
        let mut m = monitor(2000, 2);
        // Two-frame dropout mid-run: with grace_frames = 2 the run holds
        // and the original start instant still counts.
        let mut script = vec![true; 20];
        script.extend([false, false]);
        script.extend(vec![true; 20]);
        let fired = run_sequence(&mut m, &script);
        let hits: Vec<usize> = fired
            .iter()
            .enumerate()
            .filter_map(|(i, f)| f.map(|_| i))
            .collect();
        assert_eq!(hits, vec![40]);
    }

    #[test]
    fn grace_frames_exhausted_still_resets() {
        let mut m = monitor(2000, 2);
        let mut script = vec![true; 20];
        script.extend([false, false, false]); // one miss more than grace allows
        script.extend(vec![true; 20]);
        let fired = run_sequence(&mut m, &script);
        assert!(fired.iter().all(Option::is_none));
        // Run restarted at frame 23; 20 more frames is well short of 2 s.
        assert!(matches!(m.phase(), ScanPhase::Accumulating { .. }));
    }

    #[test]
    fn graced_miss_does_not_advance_progress() {
        let mut m = monitor(2000, 5);
        let start = Instant::now();
        m.observe(frame(), &DetectionResult::present(None), start);
        m.observe(frame(), &DetectionResult::present(None), start + STEP * 10);
        let before = m.progress();
        m.observe(frame(), &DetectionResult::absent(), start + STEP * 11);
        assert_eq!(m.progress(), before);
    }
}
