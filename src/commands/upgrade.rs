// Firmware upgrade: upload, mark for test, reset

use crate::commands::{CommandError, CommandGroup, Session};
use crate::session::ChunkedUpload;
use crate::smp::requests::image::ImageStatesWrite;
use crate::smp::requests::os::ResetWrite;
use crate::smp::{Bytes, ImageInfo};
use async_trait::async_trait;
use clap::{value_parser, Arg, ArgMatches, Command};
use std::path::PathBuf;
use tracing::info;

pub struct UpgradeGroup;

#[async_trait]
impl CommandGroup for UpgradeGroup {
    fn name(&self) -> &'static str {
        "upgrade"
    }

    fn command(&self) -> Command {
        Command::new("upgrade")
            .about("Upload a FW image, mark it for next boot, and reset the device")
            .arg(
                Arg::new("file")
                    .required(true)
                    .value_parser(value_parser!(PathBuf))
                    .help("Path to FW image"),
            )
            .arg(
                Arg::new("slot")
                    .long("slot")
                    .value_parser(value_parser!(u32))
                    .default_value("0")
                    .help("The image slot to upload to"),
            )
    }

    async fn run(&self, session: &mut Session, matches: &ArgMatches) -> Result<(), CommandError> {
        let path = matches
            .get_one::<PathBuf>("file")
            .ok_or_else(|| CommandError::Usage("A FW image is required".to_string()))?;
        let slot = matches.get_one::<u32>("slot").copied().unwrap_or_default();

        let data = tokio::fs::read(path).await?;
        let image = ImageInfo::parse(&data)?;
        info!("{}", image);
        let sha = Bytes(image.sha256()?.to_vec());
        info!("Image SHA-256: {}", hex::encode(sha.as_slice()));

        let sink = session.sink();
        let connection = session.connection().await?;
        ChunkedUpload::image(connection, &data, Some(slot), sink.as_ref())?
            .run()
            .await?;

        if slot != 0 {
            // Swap to the new image on the next boot
            session
                .call(&ImageStatesWrite {
                    hash: Some(sha),
                    confirm: false,
                })
                .await?;
        }

        session.call(&ResetWrite::default()).await?;

        println!("Upgrade complete.");
        if slot != 0 {
            println!("The device may take a few minutes to complete FW swap.");
        }
        Ok(())
    }
}
