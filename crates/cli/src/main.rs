//! tagkit: map keys, dump and analyze MIFARE Classic tags

use clap::Parser;
use std::path::PathBuf;
use tagkit_pcsc::PcscDeviceManager;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod utils;

use commands::*;
use utils::session::open_tag;

#[derive(Parser)]
#[command(version, about = "Map keys, dump and analyze MIFARE Classic tags")]
struct Cli {
    /// Optional reader name to use (will auto-detect if not specified)
    #[arg(short, long, global = true)]
    reader: Option<String>,

    /// Debug level output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (default: ~/.tagkit/tagkit.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> eyre::Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose);

    let config = config::load_config(cli.config.as_deref())?;

    // Commands that only need files
    match &cli.command {
        Commands::CheckDump { file, strict } => return check_dump_command(file, *strict),
        Commands::CheckKeys { file } => return check_keys_command(file),
        Commands::Diff { first, second } => return diff_command(first, second),
        Commands::DecodeAc { bytes } => return decode_ac_command(*bytes),
        Commands::EncodeAc { c1, c2, c3 } => return encode_ac_command(*c1, *c2, *c3),
        _ => {}
    }

    let manager = PcscDeviceManager::new()?;
    if let Commands::List = cli.command {
        return utils::reader::list_readers(&manager);
    }

    let mut tag = open_tag(&manager, cli.reader.as_deref(), &config.probe)?;

    match &cli.command {
        Commands::MapKeys { probe } => map_keys_command(&mut tag, &config, probe)?,
        Commands::Dump {
            probe,
            output,
            save_keys,
        } => dump_command(
            &mut tag,
            &config,
            probe,
            output.as_deref(),
            save_keys.as_deref(),
        )?,
        Commands::Writable { probe } => writable_command(&mut tag, &config, probe)?,
        Commands::Write {
            sector,
            block,
            data,
            key,
            allow_manufacturer_block,
        } => write_command(&tag, *sector, *block, data, key, *allow_manufacturer_block)?,
        Commands::Value {
            action,
            sector,
            block,
            delta,
            key,
        } => value_command(&tag, *action, *sector, *block, *delta, key)?,
        Commands::List
        | Commands::CheckDump { .. }
        | Commands::CheckKeys { .. }
        | Commands::Diff { .. }
        | Commands::DecodeAc { .. }
        | Commands::EncodeAc { .. } => unreachable!(), // Already handled above
    }

    tag.close();
    Ok(())
}

fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .init();
}
