//! HTTP clients for devices and the upstream repository

pub mod client;
pub mod device;
pub mod upstream;
