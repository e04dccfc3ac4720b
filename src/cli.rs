// CLI - Entry point wiring plugins, argument parsing, logging and commands

use crate::commands::{split_words, CommandError, CommandRegistry, Session};
use crate::config::{Cli, GlobalArgs, LogConfig, Logging};
use crate::plugin::{discover_plugins, DylibLoader};
use crate::session::{LogSink, ProgressSink, SpinnerSink};
use clap::parser::ValueSource;
use clap::{ArgMatches, Command, CommandFactory, FromArgMatches};
use console::style;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, warn};

fn stderr_is_term() -> bool {
    console::Term::stderr().is_term()
}

/// Spinners on a terminal, log lines when stderr is redirected
pub fn progress_sink(interactive: bool) -> Arc<dyn ProgressSink> {
    if interactive {
        Arc::new(SpinnerSink::new())
    } else {
        Arc::new(LogSink::new())
    }
}

/// Name of the built-in interactive shell command
pub const SHELL_COMMAND: &str = "shell";

/// Ids of the flags that make up `GlobalArgs`
pub const GLOBAL_ARG_IDS: &[&str] = &[
    "port", "ble", "ip", "timeout", "mtu", "baudrate", "loglevel", "logfile",
];

const SHELL_PROMPT: &str = "smpmgr >";

/// The full command tree: global flags, registered groups and the shell
pub fn build_command(registry: &CommandRegistry) -> Command {
    registry
        .augment(Cli::command())
        .subcommand(
            Command::new(SHELL_COMMAND)
                .about("Open the smpmgr interactive shell. Type 'exit' or 'quit' to exit"),
        )
}

/// Whether `matches` carries any global flag typed on the command line
pub fn has_global_overrides(matches: &ArgMatches) -> bool {
    GLOBAL_ARG_IDS
        .iter()
        .any(|id| matches.value_source(id) == Some(ValueSource::CommandLine))
}

fn report(e: &CommandError) {
    error!("{}", e);
}

/// Run the CLI with the full process arguments; returns the exit code
pub async fn run(args: Vec<String>) -> ExitCode {
    // Plugins contribute subcommands, so they load before parsing
    let (plugins, args) = match discover_plugins(args, &DylibLoader) {
        Ok(found) => found,
        Err(e) => {
            eprintln!("{} {}", style("error:").red().bold(), e);
            return ExitCode::FAILURE;
        }
    };

    let mut registry = CommandRegistry::with_builtin_groups();
    let shadowed = registry.register_plugins(plugins);
    let root = build_command(&registry);

    let matches = match root.clone().try_get_matches_from(args) {
        Ok(matches) => matches,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };
    let cli = match Cli::from_arg_matches(&matches) {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return ExitCode::FAILURE;
        }
    };

    let mut logging = match Logging::init(LogConfig::from_args(&cli.global)) {
        Ok(logging) => logging,
        Err(e) => {
            eprintln!("{} {}", style("error:").red().bold(), e);
            return ExitCode::FAILURE;
        }
    };
    for name in shadowed {
        warn!("Command group `{}` was replaced by a plugin", name);
    }

    match matches.subcommand_name() {
        None => {
            if cli.global.loglevel.is_none() && cli.global.logfile.is_none() {
                println!("A command is required, see --help for available commands.");
            }
            ExitCode::SUCCESS
        }
        Some(SHELL_COMMAND) => {
            let session = Session::new(cli.global, progress_sink(stderr_is_term()));
            run_shell(&registry, &root, session, &mut logging).await
        }
        Some(_) => {
            let mut session = Session::new(cli.global, progress_sink(stderr_is_term()));
            let result = registry.dispatch(&mut session, &matches).await;
            session.close().await;
            match result {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    report(&e);
                    ExitCode::FAILURE
                }
            }
        }
    }
}

// ============================================================================
// INTERACTIVE SHELL
// ============================================================================

fn prompt() {
    print!("{} ", SHELL_PROMPT);
    let _ = std::io::stdout().flush();
}

/// Read commands from stdin and run them against one session
///
/// Global flags on a line replace the session's options (and, for the log
/// flags, the log configuration) before the command runs.
pub async fn run_shell(
    registry: &CommandRegistry,
    root: &Command,
    mut session: Session,
    logging: &mut Logging,
) -> ExitCode {
    println!(
        "Simple Management Protocol (SMP) Manager Version {}",
        crate::VERSION
    );
    println!("Type 'exit' or 'quit' to exit the shell.\n");

    let line_command = root.clone().no_binary_name(true);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        prompt();
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!("Cannot read from stdin: {}", e);
                break;
            }
        };

        let words = match split_words(&line) {
            Ok(words) => words,
            Err(e) => {
                report(&e);
                continue;
            }
        };
        match words.first().map(String::as_str) {
            None => continue,
            Some("exit" | "quit") => break,
            _ => {}
        }

        let matches = match line_command.clone().try_get_matches_from(&words) {
            Ok(matches) => matches,
            Err(e) => {
                let _ = e.print();
                continue;
            }
        };
        if matches.subcommand_name() == Some(SHELL_COMMAND) {
            println!("The 'shell' command cannot be used from within the shell.");
            continue;
        }

        if has_global_overrides(&matches) {
            let global = match GlobalArgs::from_arg_matches(&matches) {
                Ok(global) => global,
                Err(e) => {
                    let _ = e.print();
                    continue;
                }
            };
            let log_changed = matches.value_source("loglevel") == Some(ValueSource::CommandLine)
                || matches.value_source("logfile") == Some(ValueSource::CommandLine);
            if log_changed {
                if let Err(e) = logging.apply(LogConfig::from_args(&global)) {
                    report(&e.into());
                }
            }
            session.reconfigure(global).await;
        }

        if matches.subcommand_name().is_none() {
            continue;
        }
        if let Err(e) = registry.dispatch(&mut session, &matches).await {
            report(&e);
        }
    }

    session.close().await;
    ExitCode::SUCCESS
}
