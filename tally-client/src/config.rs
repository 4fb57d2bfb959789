use crate::gateway::CallOptions;
use tally_common::crypto::{self, Keypair};

use std::env::current_exe;
use std::fs::read_to_string;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Deserialize, Serialize)]
pub struct Config {
    pub node_addr: SocketAddr,
    #[serde(
        deserialize_with = "parse_milliseconds",
        serialize_with = "serialize_milliseconds",
        rename = "evaluate_timeout_ms"
    )]
    pub evaluate_timeout: Duration,
    #[serde(
        deserialize_with = "parse_milliseconds",
        serialize_with = "serialize_milliseconds",
        rename = "endorse_timeout_ms"
    )]
    pub endorse_timeout: Duration,
    #[serde(
        deserialize_with = "parse_milliseconds",
        serialize_with = "serialize_milliseconds",
        rename = "submit_timeout_ms"
    )]
    pub submit_timeout: Duration,
    #[serde(
        deserialize_with = "parse_milliseconds",
        serialize_with = "serialize_milliseconds",
        rename = "commit_status_timeout_ms"
    )]
    pub commit_status_timeout: Duration,
    #[serde(skip)]
    pub keypair: Option<Keypair>,
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
        let config_str = read_to_string(config_dir.as_ref().join("config.yaml"))?;
        let mut config = serde_yaml::from_str::<Config>(&config_str)?;
        let pem = read_to_string(config_dir.as_ref().join("sec_key"))?;
        config.keypair = Some(crypto::keypair_from_pem(&pem)?);
        Ok(config)
    }

    pub fn call_options(&self) -> CallOptions {
        CallOptions {
            evaluate_timeout: self.evaluate_timeout,
            endorse_timeout: self.endorse_timeout,
            submit_timeout: self.submit_timeout,
            commit_status_timeout: self.commit_status_timeout,
        }
    }
}

/// The value of an environment variable, or a default when unset or empty.
pub fn env_or_default(key: &str, default: &str) -> String {
    match std::env::var(key) {
        Ok(value) if !value.is_empty() => value,
        _ => default.to_string(),
    }
}

fn parse_milliseconds<'de, D>(d: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let millisecs: u64 = Deserialize::deserialize(d)?;
    Ok(Duration::from_millis(millisecs))
}

fn serialize_milliseconds<S>(duration: &Duration, s: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    s.serialize_u128(duration.as_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_parse_from_milliseconds() {
        let yaml = "\
node_addr: 127.0.0.1:4000
evaluate_timeout_ms: 5000
endorse_timeout_ms: 15000
submit_timeout_ms: 5000
commit_status_timeout_ms: 60000
";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.node_addr, "127.0.0.1:4000".parse().unwrap());
        let options = config.call_options();
        assert_eq!(options.evaluate_timeout, Duration::from_secs(5));
        assert_eq!(options.endorse_timeout, Duration::from_secs(15));
        assert_eq!(options.submit_timeout, Duration::from_secs(5));
        assert_eq!(options.commit_status_timeout, Duration::from_secs(60));
        assert!(config.keypair.is_none());
    }

    #[test]
    fn env_or_default_falls_back() {
        assert_eq!(
            env_or_default("TALLY_TEST_UNSET_VARIABLE", "fallback"),
            "fallback"
        );
    }
}
