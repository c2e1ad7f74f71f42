//! Error analysis command handlers.

use std::io::Read;

use anyhow::{Context, Result};

use super::session::AppSession;

pub async fn run(text: Option<&str>) -> Result<()> {
    let error_text = match text {
        Some(text) => text.to_string(),
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("read error text from stdin")?;
            buffer
        }
    };
    let error_text = error_text.trim();
    anyhow::ensure!(!error_text.is_empty(), "No error text to explain");

    let app = AppSession::new()?;
    app.require_session()?;
    app.controller.record_activity();

    let result = app.api.analyze(error_text).await?;

    println!("{}", result.explanation);
    if let Some(suggestion) = &result.suggestion {
        println!();
        println!("Suggestion: {suggestion}");
    }
    if let Some(category) = &result.category {
        println!("Category: {category}");
    }
    Ok(())
}

pub async fn history() -> Result<()> {
    let app = AppSession::new()?;
    app.require_session()?;
    app.controller.record_activity();

    let entries = app.api.history().await?;
    if entries.is_empty() {
        println!("No analyzed errors yet.");
        return Ok(());
    }

    for entry in entries {
        let when = entry.created_at.as_deref().unwrap_or("unknown");
        println!("{}  {}", entry.id, when);
        println!("  error: {}", first_line(&entry.error_text));
        println!("  explanation: {}", first_line(&entry.explanation));
    }
    Ok(())
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("")
}
