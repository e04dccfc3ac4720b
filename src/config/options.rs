// Options - Global command-line flags and the session values built from them

use crate::transport::{
    select_transport, ConfigurationError, TransportDescriptor, TransportOptions, DEFAULT_BAUDRATE,
};
use clap::{Args, Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::filter::LevelFilter;

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: f64 = 2.0;

// ============================================================================
// LOG LEVEL
// ============================================================================

/// Verbosity names accepted by `--loglevel`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
pub enum LogLevel {
    Critical,
    Error,
    Warning,
    Info,
    Debug,
    /// Everything, including wire traces
    Notset,
}

impl LogLevel {
    pub fn level_filter(&self) -> LevelFilter {
        match self {
            Self::Critical | Self::Error => LevelFilter::ERROR,
            Self::Warning => LevelFilter::WARN,
            Self::Info => LevelFilter::INFO,
            Self::Debug => LevelFilter::DEBUG,
            Self::Notset => LevelFilter::TRACE,
        }
    }
}

// ============================================================================
// GLOBAL ARGS
// ============================================================================

/// Parse a timeout given in (possibly fractional) seconds
pub fn parse_seconds(value: &str) -> Result<Duration, String> {
    let secs: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("`{}` is not a number of seconds", value))?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(format!("timeout must be a positive number of seconds, got {}", value));
    }
    Duration::try_from_secs_f64(secs).map_err(|e| e.to_string())
}

/// Connection and logging flags shared by every command
#[derive(Args, Debug, Clone, PartialEq)]
pub struct GlobalArgs {
    /// The serial port to connect to
    #[arg(long, env = "SMPMGR_PORT")]
    pub port: Option<String>,

    /// The Bluetooth address or name of the device
    #[arg(long, env = "SMPMGR_BLE")]
    pub ble: Option<String>,

    /// The IP address or host name of a UDP SMP server
    #[arg(long, env = "SMPMGR_IP")]
    pub ip: Option<String>,

    /// Transport timeout in seconds
    #[arg(long, env = "SMPMGR_TIMEOUT", default_value = "2.0", value_parser = parse_seconds)]
    pub timeout: Duration,

    /// Maximum transmission unit of the transport, in bytes
    #[arg(long)]
    pub mtu: Option<usize>,

    /// Serial baud rate
    #[arg(long, default_value_t = DEFAULT_BAUDRATE)]
    pub baudrate: u32,

    /// Console log verbosity
    #[arg(long, value_enum)]
    pub loglevel: Option<LogLevel>,

    /// Also write debug logs to this file
    #[arg(long)]
    pub logfile: Option<PathBuf>,
}

impl Default for GlobalArgs {
    fn default() -> Self {
        Self {
            port: None,
            ble: None,
            ip: None,
            timeout: Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS),
            mtu: None,
            baudrate: DEFAULT_BAUDRATE,
            loglevel: None,
            logfile: None,
        }
    }
}

impl GlobalArgs {
    /// The raw connection fields, as the transport selector wants them
    pub fn transport_options(&self) -> TransportOptions {
        TransportOptions {
            port: self.port.clone(),
            ble: self.ble.clone(),
            ip: self.ip.clone(),
            mtu: self.mtu,
            baudrate: Some(self.baudrate),
        }
    }
}

/// Root command; subcommands are attached at runtime from the registry
#[derive(Parser, Debug, Clone)]
#[command(
    name = "smpmgr",
    version,
    about = "Simple Management Protocol (SMP) manager for remotely managing MCU firmware",
    long_about = None,
    disable_help_subcommand = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,
}

// ============================================================================
// SESSION OPTIONS
// ============================================================================

/// Connection settings for one session, fixed once built
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOptions {
    pub request_timeout: Duration,
    pub transport: TransportDescriptor,
    pub frame_size: Option<usize>,
    pub baud_rate: Option<u32>,
}

impl SessionOptions {
    /// Select the transport named by the flags; performs no I/O
    pub fn from_args(args: &GlobalArgs) -> Result<Self, ConfigurationError> {
        let transport = select_transport(&args.transport_options())?;
        let (frame_size, baud_rate) = match &transport {
            TransportDescriptor::Serial {
                baudrate, frame_size, ..
            } => (*frame_size, *baudrate),
            _ => (None, None),
        };

        Ok(Self {
            request_timeout: args.timeout,
            transport,
            frame_size,
            baud_rate,
        })
    }
}
