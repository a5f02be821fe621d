//! `lightlocal models`: Show the dropdown list and what the server has installed.

use lightlocal_config::AppConfig;
use lightlocal_core::{Error, Result};

pub async fn run() -> Result<()> {
    let config = AppConfig::load().map_err(Error::config)?;
    let provider = lightlocal_providers::build_from_config(&config)?;

    println!("Configured models");
    println!("=================");
    for model in &config.models {
        let marker = if *model == config.default_model { "*" } else { " " };
        println!("  {marker} {model}");
    }
    println!();

    println!("Installed on {} server", provider.name());
    println!("=========================");
    match provider.list_models().await {
        Ok(installed) if installed.is_empty() => println!("  (none reported)"),
        Ok(installed) => {
            for name in &installed {
                println!("    {name}");
            }
            for missing in config.models.iter().filter(|m| !installed.contains(m)) {
                println!("  ! {missing} is configured but not installed");
            }
        }
        Err(e) => println!("  Could not list models: {e}"),
    }

    Ok(())
}
