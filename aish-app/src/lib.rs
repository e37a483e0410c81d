//! Application wiring for the `aish` binary.

pub mod config;
