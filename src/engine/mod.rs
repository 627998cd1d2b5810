//! Scan engine.
//!
//! Home of the batch scanner that drives one chunk of a universe pass.

pub mod scanner;
