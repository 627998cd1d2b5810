//! TRENDSCAN — Minervini trend-template screener for NSE equities
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod data;
pub mod universe;
pub mod screener;
pub mod progress;
pub mod engine;
pub mod report;
pub mod notify;
pub mod server;
