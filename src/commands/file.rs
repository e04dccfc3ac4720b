// File management commands

use crate::commands::{print_json, selected, CommandError, CommandGroup, Session};
use crate::session::{ChunkedDownload, ChunkedUpload};
use crate::smp::requests::file::{FileHashChecksum, FileStatus, SupportedFileHashChecksumTypes};
use async_trait::async_trait;
use clap::{value_parser, Arg, ArgMatches, Command};
use serde_json::json;
use std::path::PathBuf;

pub struct FileGroup;

fn required<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a str, CommandError> {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .ok_or_else(|| CommandError::Usage(format!("<{}> is required", name)))
}

#[async_trait]
impl CommandGroup for FileGroup {
    fn name(&self) -> &'static str {
        "file"
    }

    fn command(&self) -> Command {
        let device_path = Arg::new("path").required(true).help("Path to the file on the SMP server");

        Command::new("file")
            .about("The SMP File Management Group")
            .subcommand_required(true)
            .subcommand(Command::new("supported-hash-types").about("Request the supported hash types"))
            .subcommand(
                Command::new("hash")
                    .about("Request the hash of a file on the SMP server")
                    .arg(device_path.clone())
                    .arg(Arg::new("type").long("type").help("Hash or checksum type, e.g. sha256")),
            )
            .subcommand(
                Command::new("read-size")
                    .about("Request the size of a file on the SMP server")
                    .arg(device_path),
            )
            .subcommand(
                Command::new("upload")
                    .about("Upload a file")
                    .arg(
                        Arg::new("file")
                            .required(true)
                            .value_parser(value_parser!(PathBuf))
                            .help("Path to the local file"),
                    )
                    .arg(Arg::new("destination").required(true).help("Destination on the SMP server")),
            )
            .subcommand(
                Command::new("download")
                    .about("Download a file")
                    .arg(Arg::new("file").required(true).help("The file on the SMP server"))
                    .arg(
                        Arg::new("destination")
                            .required(true)
                            .value_parser(value_parser!(PathBuf))
                            .help("Destination on the local file system"),
                    ),
            )
    }

    async fn run(&self, session: &mut Session, matches: &ArgMatches) -> Result<(), CommandError> {
        match selected(matches)? {
            ("supported-hash-types", _) => {
                let response = session.call(&SupportedFileHashChecksumTypes {}).await?;
                print_json(&response.types)
            }
            ("hash", sub) => {
                let request = FileHashChecksum {
                    name: required(sub, "path")?.to_string(),
                    hash_type: sub.get_one::<String>("type").cloned(),
                };
                let response = session.call(&request).await?;
                print_json(&response)
            }
            ("read-size", sub) => {
                let request = FileStatus {
                    name: required(sub, "path")?.to_string(),
                };
                let response = session.call(&request).await?;
                print_json(&response)
            }
            ("upload", sub) => {
                let path = sub
                    .get_one::<PathBuf>("file")
                    .ok_or_else(|| CommandError::Usage("<file> is required".to_string()))?;
                let destination = required(sub, "destination")?;
                let data = tokio::fs::read(path).await?;

                let sink = session.sink();
                let connection = session.connection().await?;
                let offset = ChunkedUpload::file(connection, &data, destination, sink.as_ref())?
                    .run()
                    .await?;
                print_json(&json!({ "destination": destination, "uploaded": offset }))
            }
            ("download", sub) => {
                let name = required(sub, "file")?;
                let destination = sub
                    .get_one::<PathBuf>("destination")
                    .ok_or_else(|| CommandError::Usage("<destination> is required".to_string()))?;

                let sink = session.sink();
                let connection = session.connection().await?;
                let data = ChunkedDownload::file(connection, name, sink.as_ref()).run().await?;
                tokio::fs::write(destination, &data).await?;
                print_json(&json!({
                    "destination": destination.display().to_string(),
                    "downloaded": data.len(),
                }))
            }
            (other, _) => Err(CommandError::UnknownCommand(format!("file {}", other))),
        }
    }
}
