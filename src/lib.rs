// smpmgr - Simple Management Protocol manager
//
// Talks to MCU firmware over serial, BLE or UDP using the SMP protocol:
// typed requests, chunked transfers and pluggable command groups.

pub mod cli;
pub mod commands;
pub mod config;
pub mod plugin;
pub mod session;
pub mod smp;
pub mod transport;

/// Version of this crate; plugins must be built against the same one
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
