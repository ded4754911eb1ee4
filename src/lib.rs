//! TRIPWIRE — Online Shiryaev-Roberts Change-Point Monitor
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod detector;
pub mod feed;
pub mod monitor;
pub mod evaluation;
pub mod storage;
