//! JSON-RPC API Module
//!
//! Provides HTTP interface for external applications to drive the content
//! store and query the reward engine.

mod methods;
mod server;

pub use methods::*;
pub use server::*;
