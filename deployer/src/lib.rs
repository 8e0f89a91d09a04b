//! fwfleet library
//!
//! Upstream change detection and fleet-wide firmware deployment to
//! HTTP-managed embedded devices.

pub mod app;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod http;
pub mod logs;
pub mod models;
pub mod storage;
pub mod upstream;
pub mod utils;
