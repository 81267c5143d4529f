//! Node execution.
//!
//! The host schedules nodes itself; this module runs one node per call.

pub mod runner;

pub use runner::run_node;
