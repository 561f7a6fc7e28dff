//! Schema module - Value types and configuration shared by recording and replay.

mod config;
mod part;
mod pose;

pub use config::*;
pub use part::*;
pub use pose::*;
