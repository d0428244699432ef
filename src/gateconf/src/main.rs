use anyhow::Result;
use clap::Parser;
use gateconf_api::ConfigApi;
use gateconf_config::{load_config, FileConfig};
use gateconf_store::MemStore;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(version, about = "GateConf - configuration surface for a reverse-proxy gateway")]
struct Args {
    /// Path to config file (yaml/json/toml)
    #[arg(short, long, default_value = "./config.yaml")]
    config: String,
    /// Override the configured listen address (host:port)
    #[arg(short, long, default_value = "")]
    listen: String,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = match load_config(&args.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("failed to load config `{}`: {}; using defaults", args.config, e);
            FileConfig::default()
        }
    };

    gateconf_tracing::init(&config.api.logging_mode)?;

    let addr: SocketAddr = if args.listen.is_empty() {
        config.listen_addr()?
    } else {
        args.listen.parse()?
    };

    let store = Arc::new(MemStore::new());
    let api = Arc::new(ConfigApi::new(config.api.prefix.clone(), store)?);

    info!("mounting config api under {}", config.api.prefix);
    api.serve(addr).await
}
