//! Actuation half of the mood mixer.
//!
//! Maps a dominant mood to a [`Recipe`], announces the dispense on the
//! serial [`CommandChannel`], and executes the recipe's steps through the
//! [`Sequencer`] against the exclusive [`PumpBank`]. The sequencer's
//! contract is the load-bearing one: at most one pump on at any instant,
//! and every pump off before control returns, on every exit path.

pub mod bank;
pub mod channel;
pub mod recipe;
pub mod sequencer;

pub use bank::{ActuatorFault, LoggingDriver, PumpBank, PumpDriver};
pub use channel::{ChannelError, CommandChannel, SerialCommand, open_serial};
pub use recipe::{PUMP_COUNT, PumpId, Recipe, RecipeBook, RecipeError, Step};
pub use sequencer::{DispenseError, DispenseEvent, SequenceOutcome, Sequencer};
