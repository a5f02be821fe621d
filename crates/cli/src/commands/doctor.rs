//! `lightlocal doctor`: Diagnose configuration and inference server health.

use lightlocal_config::AppConfig;
use lightlocal_core::Result;

pub async fn run() -> Result<()> {
    println!("LightLocal Doctor — System Diagnostics");
    println!("======================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_path();
    if config_path.exists() {
        println!("  ✅ Config file found: {}", config_path.display());
    } else {
        println!("  ⚠️  No config file, using defaults (run `lightlocal onboard`)");
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  1 issue(s) found. See above for details.");
            return Ok(());
        }
    };

    match lightlocal_providers::build_from_config(&config) {
        Ok(provider) => {
            if provider.health_check().await.unwrap_or(false) {
                println!("  ✅ {} server reachable", provider.name());
                match provider.list_models().await {
                    Ok(installed) if installed.contains(&config.default_model) => {
                        println!("  ✅ Default model '{}' installed", config.default_model);
                    }
                    Ok(_) => {
                        println!(
                            "  ⚠️  Default model '{}' not installed (try `ollama pull {}`)",
                            config.default_model, config.default_model
                        );
                        issues += 1;
                    }
                    Err(e) => {
                        println!("  ⚠️  Could not list models: {e}");
                        issues += 1;
                    }
                }
            } else {
                println!("  ❌ {} server not reachable", provider.name());
                issues += 1;
            }
        }
        Err(e) => {
            println!("  ❌ {e}");
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
