//! Reporting on the local cache
//!
//! This module handles:
//! - Counting what the cache holds, per record kind
//! - Printing a human readable cache summary

pub mod stats;

pub use stats::{load_statistics, print_statistics, CacheStatistics};
