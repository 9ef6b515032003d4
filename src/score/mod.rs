//! Score announcement handling.
//!
//! - `parser`: turns chat lines into score records
//! - `registry`: map name to id cache
//! - `tracker`: ties both to the score store

pub mod parser;
pub mod registry;
pub mod tracker;

pub use tracker::ScoreTracker;
