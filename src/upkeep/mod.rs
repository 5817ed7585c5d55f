//! Upkeep module - due-check, cycle commit, and randomness correlation

mod scheduler;

pub use scheduler::*;
