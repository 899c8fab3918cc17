//! Target store module for vigil.
//!
//! Keeps every target's configuration in memory and mirrors it to a JSON file.

mod models;
mod settings;
mod target_store;

pub use models::*;
pub use settings::*;
pub use target_store::*;
