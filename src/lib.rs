//! Find and trash photo uploads that duplicate a higher-resolution copy.

pub mod config;
pub mod core;
pub mod dedup;
pub mod error;
pub mod history;
pub mod logging;
pub mod report;
pub mod store;
