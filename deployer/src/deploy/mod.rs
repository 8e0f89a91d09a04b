//! Device update and fleet deployment

pub mod fsm;
pub mod images;
pub mod orchestrator;
pub mod transport;
pub mod updater;
