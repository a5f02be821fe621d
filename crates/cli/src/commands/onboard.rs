//! `lightlocal onboard`: First-time setup.

use lightlocal_config::AppConfig;
use lightlocal_core::Result;

pub async fn run() -> Result<()> {
    let config_dir = AppConfig::config_dir();
    let config_path = AppConfig::config_path();

    println!("LightLocal — First-Time Setup");
    println!("=============================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("✅ Created config.toml at: {}", config_path.display());
        println!("\nNext steps:");
        println!("   1. Start Ollama and pull a model: ollama pull phi3:mini");
        println!("   2. Run: lightlocal doctor");
        println!("   3. Run: lightlocal serve (or lightlocal chat)\n");
    }

    Ok(())
}
