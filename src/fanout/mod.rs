//! Socket fan-out to external subscribers.
//!
//! ## Module Structure
//!
//! - `connection`: per-endpoint state machine and reconnect loop
//! - `manager`: broadcast over all connections (`FanOutManager`)
//! - `wire`: JSON frame types

pub mod connection;
pub mod manager;
pub mod wire;

pub use manager::FanOutManager;
