//! Alert escalation engine.
//!
//! Every unacknowledged alert climbs a five-level ladder on a timer,
//! getting louder and reaching more channels at each step. Acknowledging
//! the alert at any point cancels its timer and freezes the ladder.

pub mod levels;
pub mod manager;

#[cfg(test)]
mod tests;

pub use levels::{default_levels, initial_level, EscalationLevel, MAX_LEVEL};
pub use manager::{EscalationInfo, EscalationManager};
