use tally_client::config::Config as ClientConfig;
use tally_common::crypto;
use tally_node::config::Config as NodeConfig;

use std::fs::{create_dir_all, write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    name = "config-gen",
    version = "0.1.0",
    about = "Generate config/keypair files for a tally node and client"
)]
struct Cli {
    /// Output path
    #[arg(short, long, default_value = "./")]
    pub output_path: PathBuf,
    /// Node client-listen port
    #[arg(short, long, default_value = "4000")]
    pub port: u16,
    /// Generate a standalone keypair only, default is false
    #[arg(long, default_value = "false")]
    pub keypair: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if !cli.output_path.is_dir() {
        return Err(anyhow!("output path is not a directory"));
    }
    if cli.keypair {
        return gen_keypair_files(&cli.output_path);
    }
    gen_node_config(&cli.output_path, cli.port)?;
    gen_client_config(&cli.output_path, cli.port)?;
    Ok(())
}

fn gen_node_config(output: &PathBuf, port: u16) -> Result<()> {
    let dir = output.join("node");
    create_dir_all(&dir)?;
    let config = NodeConfig {
        client_listen_addr: format!("127.0.0.1:{port}").parse()?,
    };
    write(dir.join("config.yaml"), serde_yaml::to_string(&config)?)?;
    Ok(())
}

fn gen_client_config(output: &PathBuf, port: u16) -> Result<()> {
    let dir = output.join("client");
    create_dir_all(&dir)?;
    let config = ClientConfig {
        node_addr: format!("127.0.0.1:{port}").parse()?,
        evaluate_timeout: Duration::from_secs(5),
        endorse_timeout: Duration::from_secs(15),
        submit_timeout: Duration::from_secs(5),
        commit_status_timeout: Duration::from_secs(60),
        keypair: None,
    };
    write(dir.join("config.yaml"), serde_yaml::to_string(&config)?)?;

    let keypair = crypto::generate_keypair();
    write(dir.join("sec_key"), crypto::keypair_to_pem(&keypair)?)?;
    Ok(())
}

fn gen_keypair_files(output: &PathBuf) -> Result<()> {
    let keypair = crypto::generate_keypair();
    let pk_b64 = crypto::publickey_to_base64(keypair.public.to_bytes());
    write(output.join("sec_key"), crypto::keypair_to_pem(&keypair)?)?;
    write(output.join("sec_key.pub"), pk_b64)?;
    Ok(())
}
