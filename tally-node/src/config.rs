use std::env::current_exe;
use std::fs::read_to_string;
use std::net::SocketAddr;
use std::path::Path;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub client_listen_addr: SocketAddr,
}

impl Config {
    pub fn new() -> Result<Self> {
        let current_exe = current_exe()?;
        let config_dir = current_exe
            .parent()
            .ok_or_else(|| anyhow!("executable has no parent directory"))?
            .join("config");
        Self::from_path(config_dir)
    }

    pub fn from_path<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        if !config_dir.as_ref().is_dir() {
            return Err(anyhow!("config dir not found, or not a directory"));
        }
        let config_path = config_dir.as_ref().join("config.yaml");
        let config_str = read_to_string(config_path)?;
        let config = serde_yaml::from_str::<Config>(&config_str)?;
        Ok(config)
    }
}
