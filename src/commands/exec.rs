// Shell management: run a command in the device's shell

use crate::commands::{print_json, split_words, CommandError, CommandGroup, Session};
use crate::config::parse_seconds;
use crate::smp::requests::shell::Execute;
use async_trait::async_trait;
use clap::{Arg, ArgAction, ArgMatches, Command};
use console::style;
use std::time::Duration;

pub struct ExecGroup;

#[async_trait]
impl CommandGroup for ExecGroup {
    fn name(&self) -> &'static str {
        "exec"
    }

    fn command(&self) -> Command {
        Command::new("exec")
            .about("Send a shell command to the device")
            .arg(
                Arg::new("command")
                    .required(true)
                    .help("Command to run, quoted, e.g. \"gpio conf gpio@49000000 0 i\""),
            )
            .arg(
                Arg::new("timeout")
                    .long("timeout")
                    .value_parser(parse_seconds)
                    .default_value("2.0")
                    .help("Seconds to wait for the command to complete"),
            )
            .arg(
                Arg::new("verbose")
                    .long("verbose")
                    .action(ArgAction::SetTrue)
                    .help("Print the raw success response"),
            )
    }

    async fn run(&self, session: &mut Session, matches: &ArgMatches) -> Result<(), CommandError> {
        let command = matches.get_one::<String>("command").map(String::as_str).unwrap_or_default();
        let argv = split_words(command)?;
        if argv.is_empty() {
            return Err(CommandError::Usage("A command is required".to_string()));
        }

        let timeout = matches.get_one::<Duration>("timeout").copied();
        let response = session
            .request_with_timeout(&Execute { argv }, timeout)
            .await?
            .into_result()?;

        match response.ret {
            0 => println!("{}", response.o),
            ret if ret > 0 => {
                println!("{}", style(format!("Return code: {}", ret)).yellow());
                println!("{}", response.o);
            }
            _ => println!("{}", style(&response.o).red()),
        }

        if matches.get_flag("verbose") {
            print_json(&response)?;
        }
        Ok(())
    }
}
