use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use takeout_exif_sync::{config::SyncConfig, pipeline};

#[derive(Parser, Debug)]
#[command(
    name = "takeout-exif-sync",
    version,
    about = "Write Google Photos takeout sidecar metadata back into the exported JPEGs"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Update every image under DIR whose EXIF differs from its JSON sidecar
    Fix {
        /// Takeout directory to scan recursively
        #[arg(value_name = "DIR")]
        dir: PathBuf,

        /// Delete each JSON sidecar once its image has been handled
        #[arg(short = 'd', long = "delete-json-files", alias = "deleteJSONFiles")]
        delete_json_files: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    match cli.command {
        Command::Fix {
            dir,
            delete_json_files,
        } => {
            let config = SyncConfig::new(dir, delete_json_files);
            log::debug!("Config: {config:?}");
            pipeline::sync_directory(&config)
                .with_context(|| format!("Failed to sync {}", config.root.display()))?;
        }
    }

    Ok(())
}
