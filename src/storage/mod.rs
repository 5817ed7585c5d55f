//! Storage module - winner history and cycle metadata persistence

pub mod db;

pub use db::*;
