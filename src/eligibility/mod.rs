//! Eligibility module - tracks which authors qualify for the current reward window

mod tracker;

pub use tracker::*;
