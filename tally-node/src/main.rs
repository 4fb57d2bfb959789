use tally_node::{actor::ClientActor, config::Config, store::MemStore};

use anyhow::Result;
use clap::{Arg, Command};
use log::{info, LevelFilter};
use simple_logger::SimpleLogger;
use tokio::runtime::Runtime;

fn main() -> Result<()> {
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .env()
        .init()?;
    let args = Command::new("tally-node")
        .about("Ledger replica node for tally.")
        .version("0.1.0")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config_dir")
                .action(clap::ArgAction::Set)
                .help(
                    "set config directory, defaults to `config/' \
                     in the same directory as the tally-node binary",
                ),
        )
        .get_matches();
    let config = if let Some(path) = args.get_one::<String>("config") {
        Config::from_path(path)?
    } else {
        Config::new()?
    };

    info!("listening for clients on {}", config.client_listen_addr);
    let rt = Runtime::new()?;
    rt.block_on(ClientActor::run(config.client_listen_addr, MemStore::new()));
    Ok(())
}
