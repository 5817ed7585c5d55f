//! Payout module - treasury access, disbursement, and winner history

mod treasury;
mod disburse;
mod history;

pub use treasury::*;
pub use disburse::*;
pub use history::*;
