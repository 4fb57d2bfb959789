use tally_client::config::{env_or_default, Config};
use tally_client::gateway::Gateway;
use tally_client::scenario::{run_scenario, StepReport};

use anyhow::{anyhow, Result};
use clap::{Arg, Command};
use log::{info, LevelFilter};
use simple_logger::SimpleLogger;
use tokio::runtime::Runtime;

fn main() -> Result<()> {
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .env()
        .init()?;
    let args = Command::new("tally-client")
        .about("Gateway client for the tally ledger.")
        .version("0.1.0")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config_dir")
                .action(clap::ArgAction::Set)
                .help(
                    "set config directory, defaults to $TALLY_CONFIG_DIR or `config/' \
                     in the same directory as the tally-client binary",
                ),
        )
        .get_matches();
    let mut config = match args.get_one::<String>("config") {
        Some(path) => Config::from_path(path)?,
        None => {
            let dir = env_or_default("TALLY_CONFIG_DIR", "");
            if dir.is_empty() {
                Config::new()?
            } else {
                Config::from_path(dir)?
            }
        }
    };
    let keypair = config
        .keypair
        .take()
        .ok_or_else(|| anyhow!("identity keypair not loaded"))?;

    // One identifier per run, injected into every transaction id.
    let run_id = format!("{:08x}", rand::random::<u32>());
    info!("run id {}", run_id);

    let rt = Runtime::new()?;
    let reports = rt.block_on(async {
        let gateway = Gateway::connect(
            config.node_addr,
            keypair,
            config.call_options(),
            run_id.clone(),
        );
        let outcome = run_scenario(&gateway, &run_id).await;
        // Release the connection exactly once, success or not.
        gateway.close();
        outcome
    })?;
    for StepReport { label, detail } in reports {
        info!("{}: {}", label, detail);
    }
    Ok(())
}
