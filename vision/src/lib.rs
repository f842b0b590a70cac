//! Camera-facing half of the mood mixer.
//!
//! This crate owns the presence-accumulation state machine and the
//! detection loop that feeds it. Frames come from a [`FrameSource`],
//! presence judgments from a [`PresenceDetector`]; both are trait seams
//! so real hardware and test rigs plug in interchangeably.

pub mod detector;
pub mod error;
pub mod frame;
pub mod monitor;
pub mod scan;
pub mod source;

pub use detector::{AlwaysPresent, PresenceDetector};
pub use error::DeviceError;
pub use frame::{DetectionResult, Frame, Region};
pub use monitor::{CaptureConfig, CaptureEvent, CaptureMonitor, ScanPhase};
pub use scan::{ScanUpdate, scan_loop};
pub use source::{FolderSource, FrameSource};
