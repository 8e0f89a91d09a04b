//! Persistent state and settings

pub mod marker;
pub mod settings;
