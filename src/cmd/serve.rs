//! Long-running services: `wpfleet provisioner` and `wpfleet gateway`.

use anyhow::Result;
use std::path::Path;

use wpfleet::config::Config;

pub async fn cmd_provisioner(
    config_path: Option<&Path>,
    port: Option<u16>,
    bind: Option<String>,
) -> Result<()> {
    let mut config = Config::load(config_path)?.provisioner;
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(bind) = bind {
        config.bind = bind;
    }
    wpfleet::provision::server::start_server(config).await
}

pub async fn cmd_gateway(
    config_path: Option<&Path>,
    port: Option<u16>,
    bind: Option<String>,
    dev: bool,
) -> Result<()> {
    let mut config = Config::load(config_path)?.gateway;
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(bind) = bind {
        config.bind = bind;
    }
    config.dev |= dev;
    wpfleet::gateway::server::start_server(config).await
}
