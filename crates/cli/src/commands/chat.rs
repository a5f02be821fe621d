//! `lightlocal chat`: Terminal chat, interactive or single-message.

use std::io::Write;

use lightlocal_agent::{ChatSession, ChatSettings};
use lightlocal_config::AppConfig;
use lightlocal_core::{Error, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run(
    model: Option<String>,
    system: Option<String>,
    message: Option<String>,
) -> Result<()> {
    let config = AppConfig::load().map_err(Error::config)?;
    let provider = lightlocal_providers::build_from_config(&config)?;
    let session = ChatSession::new(provider, ChatSettings::from_config(&config));

    let model = model.unwrap_or_else(|| config.default_model.clone());
    let system = system.as_deref();
    tracing::debug!(model = %model, system_prompt = system.is_some(), "Terminal chat started");

    if let Some(msg) = message {
        send(&session, &msg, &model, system).await?;
        return Ok(());
    }

    println!();
    println!("  {} — {}", config.ui.title, config.ui.subtitle);
    println!("  Model: {model}");
    println!("  Type '/clear' to forget the conversation, 'exit' to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        match line.trim() {
            "exit" | "quit" => break,
            "/clear" => {
                session.clear();
                println!("  History cleared.\n");
            }
            _ => {
                print!("  Assistant > ");
                if let Err(e) = send(&session, &line, &model, system).await {
                    eprintln!("\n  [Error] {e}");
                }
                println!();
            }
        }
    }

    println!("  Goodbye!");
    Ok(())
}

/// Stream one turn to stdout, printing only the newly arrived text.
async fn send(
    session: &ChatSession,
    message: &str,
    model: &str,
    system: Option<&str>,
) -> Result<()> {
    let mut reply = session.submit(message, Some(model), system).await?;
    let mut printed = 0;
    let mut stdout = std::io::stdout();

    while let Some(item) = reply.next().await {
        let text = item?;
        stdout.write_all(delta(printed, &text).as_bytes())?;
        stdout.flush()?;
        printed = text.len();
    }
    println!();
    Ok(())
}

/// The part of a cumulative value not yet printed.
fn delta(printed: usize, text: &str) -> &str {
    text.get(printed..).unwrap_or_default()
}
