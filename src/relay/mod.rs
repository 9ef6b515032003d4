//! Relay of source channels to their destinations.
//!
//! ## Module Structure
//!
//! - `routes`: immutable source channel -> destinations table (`RouteTable`)
//! - `dispatcher`: per-message control flow (`RelayDispatcher`)

pub mod dispatcher;
pub mod routes;

pub use dispatcher::{MessageSink, RelayDispatcher};
pub use routes::{ChannelDirectory, RouteTable};
