// OS management commands

use crate::commands::{print_json, selected, CommandError, CommandGroup, Session};
use crate::smp::requests::os::{EchoWrite, McuMgrParametersRead, ResetWrite};
use async_trait::async_trait;
use clap::{Arg, ArgAction, ArgMatches, Command};

pub struct OsGroup;

#[async_trait]
impl CommandGroup for OsGroup {
    fn name(&self) -> &'static str {
        "os"
    }

    fn command(&self) -> Command {
        Command::new("os")
            .about("The SMP OS Management Group")
            .subcommand_required(true)
            .subcommand(
                Command::new("echo")
                    .about("Request that the SMP server echo the given message")
                    .arg(Arg::new("message").required(true)),
            )
            .subcommand(
                Command::new("reset")
                    .about("Request that the SMP server reset the device")
                    .arg(
                        Arg::new("force")
                            .long("force")
                            .action(ArgAction::SetTrue)
                            .help("Reset even if the device is busy"),
                    ),
            )
            .subcommand(Command::new("params").about("Read the SMP server's buffer parameters"))
    }

    async fn run(&self, session: &mut Session, matches: &ArgMatches) -> Result<(), CommandError> {
        match selected(matches)? {
            ("echo", sub) => {
                let message = sub.get_one::<String>("message").map(String::as_str).unwrap_or_default();
                let response = session.call(&EchoWrite::new(message)).await?;
                print_json(&response)
            }
            ("reset", sub) => {
                let request = ResetWrite {
                    force: sub.get_flag("force"),
                };
                let response = session.call(&request).await?;
                print_json(&response)
            }
            ("params", _) => {
                let response = session.call(&McuMgrParametersRead {}).await?;
                print_json(&response)
            }
            (other, _) => Err(CommandError::UnknownCommand(format!("os {}", other))),
        }
    }
}
