//! FAIRLINE — Sharp-Consensus EV Scanner
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod registry;
pub mod feed;
pub mod pipeline;
pub mod strategy;
pub mod sink;
