// Enumeration management commands

use crate::commands::{print_json, selected, CommandError, CommandGroup, Session};
use crate::smp::requests::enumeration::{GroupDetails, ListSupportedGroups};
use crate::smp::GroupId;
use async_trait::async_trait;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use serde_json::json;

pub struct EnumerationGroup;

#[async_trait]
impl CommandGroup for EnumerationGroup {
    fn name(&self) -> &'static str {
        "enum"
    }

    fn command(&self) -> Command {
        Command::new("enum")
            .about("The SMP Enumeration Management Group")
            .subcommand_required(true)
            .subcommand(Command::new("supported-groups").about("List the groups the device supports"))
            .subcommand(
                Command::new("group-details")
                    .about("Request details of some or all groups")
                    .arg(
                        Arg::new("groups")
                            .action(ArgAction::Append)
                            .value_parser(value_parser!(u16))
                            .help("Group IDs to retrieve details for; all when omitted"),
                    ),
            )
    }

    async fn run(&self, session: &mut Session, matches: &ArgMatches) -> Result<(), CommandError> {
        match selected(matches)? {
            ("supported-groups", _) => {
                let response = session.call(&ListSupportedGroups {}).await?;
                let groups: Vec<_> = response
                    .groups
                    .iter()
                    .map(|&id| json!({ "id": id, "name": GroupId(id).name() }))
                    .collect();
                print_json(&groups)
            }
            ("group-details", sub) => {
                let groups = sub
                    .get_many::<u16>("groups")
                    .map(|ids| ids.copied().collect::<Vec<_>>());
                let response = session.call(&GroupDetails { groups }).await?;
                print_json(&response.groups)
            }
            (other, _) => Err(CommandError::UnknownCommand(format!("enum {}", other))),
        }
    }
}
