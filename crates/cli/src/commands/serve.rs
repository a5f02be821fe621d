//! `lightlocal serve`: Start the web chat page.

use lightlocal_config::AppConfig;
use lightlocal_core::{Error, Result};

pub async fn run(
    port_override: Option<u16>,
    host_override: Option<String>,
) -> Result<()> {
    let mut config = AppConfig::load().map_err(Error::config)?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }
    if let Some(host) = host_override {
        config.gateway.host = host;
    }

    println!("{} — {}", config.ui.title, config.ui.subtitle);
    println!("   Open:      http://localhost:{}", config.gateway.port);
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Backend:   {}", config.inference.backend);
    println!("   Model:     {}", config.default_model);

    lightlocal_gateway::start(config).await?;

    Ok(())
}
