//! Wiring for the mood mixer kiosk.
//!
//! [`Session`] owns one scan→classify→dispense cycle and enforces the
//! single-owner rules: the detection loop owns the frame source and
//! detector, the dispense path owns the pump bank and the serial channel,
//! and every status consumer hangs off the [`SessionEvent`] broadcast.

pub mod events;
pub mod logging;
pub mod session;

pub use events::SessionEvent;
pub use session::{CancelHandle, Session, SessionConfig, SessionError};
