use clap::{Parser, Subcommand};
use gvl_cache::GvlConfig;
use gvl_cache::config::DEFAULT_ENDPOINT;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Parser)]
#[command(version, about = "Inspect and maintain the local Global Vendor List cache")]
pub struct CliArgs {
    #[arg(short, long, default_value = "gvl-cache.db", env = "GVL_CACHE_DB")]
    pub database: PathBuf,

    /// Keep the cache in memory only, nothing is written to disk.
    #[arg(long, default_value_t = false)]
    pub in_memory: bool,

    #[arg(long, default_value = DEFAULT_ENDPOINT, env = "GVL_CACHE_ENDPOINT")]
    pub endpoint: Url,

    #[arg(long, default_value = "30")]
    pub connect_timeout_secs: u64,

    #[arg(long, default_value = "30")]
    pub read_timeout_secs: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Download the vendor list unless a fresh copy is cached.
    Load {
        /// Request a specific vendor list version.
        #[arg(long)]
        gvl_version: Option<String>,
    },

    /// Print the names of the given vendors.
    Name {
        #[arg(required = true)]
        ids: Vec<u32>,
    },

    /// Print everything known about a vendor.
    Info { id: u32 },

    /// Print whether a vendor list is cached and its version.
    Status,

    /// Remove the cached vendor list.
    Clear,
}

impl CliArgs {
    pub fn gvl_config(&self) -> GvlConfig {
        GvlConfig {
            endpoint: self.endpoint.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            read_timeout: Duration::from_secs(self.read_timeout_secs),
            ..GvlConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = CliArgs::try_parse_from(["gvl-cache", "status"]).unwrap();
        let config = args.gvl_config();

        assert!(!args.in_memory);
        assert_eq!(config.endpoint.as_str(), DEFAULT_ENDPOINT);
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
        assert_eq!(config.read_timeout, Duration::from_secs(30));
        assert!(matches!(args.command, Command::Status));
    }

    #[test]
    fn name_requires_ids() {
        assert!(CliArgs::try_parse_from(["gvl-cache", "name"]).is_err());

        let args = CliArgs::try_parse_from(["gvl-cache", "name", "1", "755"]).unwrap();
        match args.command {
            Command::Name { ids } => assert_eq!(ids, vec![1, 755]),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn load_with_version_and_endpoint() {
        let args = CliArgs::try_parse_from([
            "gvl-cache",
            "--endpoint",
            "https://example.com/gvl.json",
            "--connect-timeout-secs",
            "5",
            "load",
            "--gvl-version",
            "80",
        ])
        .unwrap();

        assert_eq!(args.gvl_config().connect_timeout, Duration::from_secs(5));
        assert_eq!(args.endpoint.as_str(), "https://example.com/gvl.json");
        match args.command {
            Command::Load { gvl_version } => assert_eq!(gvl_version.as_deref(), Some("80")),
            other => panic!("unexpected command {:?}", other),
        }
    }
}
