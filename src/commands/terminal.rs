// Terminal - Raw serial console to the device
//
// Bytes from stdin go to the device and bytes from the device go to stdout
// until stdin closes, the device closes, or Ctrl-C.

use crate::commands::{CommandError, CommandGroup, Session};
use async_trait::async_trait;
use clap::{ArgMatches, Command};
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info};

/// How often to look for the port while waiting for it
pub const PORT_POLL_INTERVAL: Duration = Duration::from_millis(250);

pub struct TerminalGroup;

/// Whether the serial port is currently present on the system
fn port_present(port: &str) -> bool {
    Path::new(port).exists()
        || tokio_serial::available_ports()
            .map(|ports| ports.iter().any(|p| p.port_name == port))
            .unwrap_or(false)
}

async fn wait_for_port(port: &str) {
    const MAX_DOTS: usize = 3;
    let mut dots = 0;
    while !port_present(port) {
        eprint!(
            "\rWaiting for {}{}{}",
            port,
            ".".repeat(dots),
            " ".repeat(MAX_DOTS - dots)
        );
        let _ = std::io::stderr().flush();
        dots = (dots + 1) % (MAX_DOTS + 1);
        tokio::time::sleep(PORT_POLL_INTERVAL).await;
    }
}

#[async_trait]
impl CommandGroup for TerminalGroup {
    fn name(&self) -> &'static str {
        "terminal"
    }

    fn command(&self) -> Command {
        Command::new("terminal").about("Open a terminal to the device (requires --port)")
    }

    async fn run(&self, session: &mut Session, _matches: &ArgMatches) -> Result<(), CommandError> {
        let port = session
            .args()
            .port
            .clone()
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| {
                CommandError::Usage(
                    "--port <port> is required for the terminal, e.g. smpmgr --port COM1 terminal"
                        .to_string(),
                )
            })?;
        let baudrate = session.args().baudrate;

        // The SMP connection and the terminal cannot share the port
        session.close().await;

        wait_for_port(&port).await;
        eprintln!("\nOpening terminal to {}...", port);
        let stream = tokio_serial::new(&port, baudrate)
            .open_native_async()
            .map_err(|e| CommandError::Io(format!("{}: {}", port, e)))?;
        eprintln!("OK. Press Ctrl-C to exit the terminal.\n");

        let (mut from_device, mut to_device) = tokio::io::split(stream);
        let mut stdin = tokio::io::stdin();
        let mut stdout = tokio::io::stdout();

        tokio::select! {
            result = tokio::io::copy(&mut from_device, &mut stdout) => {
                let n = result?;
                info!("{} closed after {} bytes", port, n);
            }
            result = tokio::io::copy(&mut stdin, &mut to_device) => {
                let n = result?;
                debug!("stdin closed after {} bytes", n);
            }
            _ = tokio::signal::ctrl_c() => {
                eprintln!();
            }
        }
        Ok(())
    }
}
