//! Randomness module - the external random-word source the engine requests from

mod source;

pub use source::*;
