// Image management commands

use crate::commands::{print_json, selected, CommandError, CommandGroup, Session};
use crate::session::ChunkedUpload;
use crate::smp::requests::image::{ImageErase, ImageStatesRead, ImageStatesWrite};
use crate::smp::Bytes;
use async_trait::async_trait;
use clap::{value_parser, Arg, ArgMatches, Command};
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

pub struct ImageGroup;

fn parse_hash(value: &str) -> Result<Bytes, CommandError> {
    hex::decode(value.trim())
        .map(Bytes)
        .map_err(|e| CommandError::Usage(format!("Invalid image hash `{}`: {}", value, e)))
}

#[async_trait]
impl CommandGroup for ImageGroup {
    fn name(&self) -> &'static str {
        "image"
    }

    fn command(&self) -> Command {
        let slot = Arg::new("slot")
            .long("slot")
            .value_parser(value_parser!(u32))
            .help("The image slot");

        Command::new("image")
            .about("The SMP Image Management Group")
            .subcommand_required(true)
            .subcommand(Command::new("state-read").about("Read the state of the FW images on the device"))
            .subcommand(
                Command::new("upload")
                    .about("Upload a FW image")
                    .arg(
                        Arg::new("file")
                            .required(true)
                            .value_parser(value_parser!(PathBuf))
                            .help("Path to FW image"),
                    )
                    .arg(slot.clone()),
            )
            .subcommand(
                Command::new("test")
                    .about("Mark an image to be tested on the next boot")
                    .arg(Arg::new("hash").required(true).help("SHA256 of the image, in hex")),
            )
            .subcommand(
                Command::new("confirm")
                    .about("Confirm an image, or the running image when no hash is given")
                    .arg(Arg::new("hash").help("SHA256 of the image, in hex")),
            )
            .subcommand(Command::new("erase").about("Erase an image slot").arg(slot))
    }

    async fn run(&self, session: &mut Session, matches: &ArgMatches) -> Result<(), CommandError> {
        match selected(matches)? {
            ("state-read", _) => {
                let response = session.call(&ImageStatesRead {}).await?;
                if response.images.is_empty() {
                    info!("No images on device");
                }
                print_json(&response)
            }
            ("upload", sub) => {
                let path = sub
                    .get_one::<PathBuf>("file")
                    .ok_or_else(|| CommandError::Usage("A FW image is required".to_string()))?;
                let data = tokio::fs::read(path).await?;
                let slot = sub.get_one::<u32>("slot").copied();

                let sink = session.sink();
                let connection = session.connection().await?;
                let offset = ChunkedUpload::image(connection, &data, slot, sink.as_ref())?
                    .run()
                    .await?;
                print_json(&json!({ "file": path.display().to_string(), "uploaded": offset }))
            }
            ("test", sub) => {
                let hash = sub.get_one::<String>("hash").map(|h| parse_hash(h)).transpose()?;
                let response = session
                    .call(&ImageStatesWrite {
                        hash,
                        confirm: false,
                    })
                    .await?;
                print_json(&response)
            }
            ("confirm", sub) => {
                let hash = sub.get_one::<String>("hash").map(|h| parse_hash(h)).transpose()?;
                let response = session.call(&ImageStatesWrite { hash, confirm: true }).await?;
                print_json(&response)
            }
            ("erase", sub) => {
                let request = ImageErase {
                    slot: sub.get_one::<u32>("slot").copied(),
                };
                let response = session.call(&request).await?;
                print_json(&response)
            }
            (other, _) => Err(CommandError::UnknownCommand(format!("image {}", other))),
        }
    }
}
