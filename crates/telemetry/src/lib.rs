// Path: crates/telemetry/src/lib.rs
//! Telemetry bootstrap for the provenet binaries.

pub mod init;
