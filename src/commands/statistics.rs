// Statistics management commands

use crate::commands::{print_json, selected, CommandError, CommandGroup, Session};
use crate::smp::requests::statistics::{GroupData, ListOfGroups};
use async_trait::async_trait;
use clap::{Arg, ArgMatches, Command};
use std::collections::BTreeMap;
use tracing::info;

/// Statistics group maintained by the SMP server itself
pub const SMP_SERVER_STATS: &str = "smp_svr_stats";

pub struct StatisticsGroup;

#[async_trait]
impl CommandGroup for StatisticsGroup {
    fn name(&self) -> &'static str {
        "statistics"
    }

    fn command(&self) -> Command {
        Command::new("statistics")
            .about("The SMP Statistics Management Group")
            .subcommand_required(true)
            .subcommand(Command::new("list").about("List the statistics groups on the device"))
            .subcommand(
                Command::new("get")
                    .about("Read the counters of one statistics group")
                    .arg(Arg::new("name").required(true).help("The statistics group to fetch")),
            )
            .subcommand(Command::new("smp-svr-stats").about("Read the SMP server's own statistics"))
            .subcommand(Command::new("fetch-all").about("Read the counters of every statistics group"))
    }

    async fn run(&self, session: &mut Session, matches: &ArgMatches) -> Result<(), CommandError> {
        match selected(matches)? {
            ("list", _) => {
                let response = session.call(&ListOfGroups {}).await?;
                print_json(&response.stat_list)
            }
            ("get", sub) => {
                let name = sub
                    .get_one::<String>("name")
                    .cloned()
                    .ok_or_else(|| CommandError::Usage("<name> is required".to_string()))?;
                let response = session.call(&GroupData { name }).await?;
                print_json(&response)
            }
            ("smp-svr-stats", _) => {
                let request = GroupData {
                    name: SMP_SERVER_STATS.to_string(),
                };
                let response = session.call(&request).await?;
                print_json(&response)
            }
            ("fetch-all", _) => {
                let groups = session.call(&ListOfGroups {}).await?.stat_list;
                if groups.is_empty() {
                    info!("No statistics groups available");
                }

                let mut all = BTreeMap::new();
                for name in groups {
                    let response = session.call(&GroupData { name: name.clone() }).await?;
                    all.insert(name, response.fields);
                }
                print_json(&all)
            }
            (other, _) => Err(CommandError::UnknownCommand(format!("statistics {}", other))),
        }
    }
}
