//! Auth command handlers.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use errwise_core::session::{AuthError, LogoutReason, store};

use super::session::AppSession;

pub async fn login(username: &str) -> Result<()> {
    let app = AppSession::new()?;
    if app.controller.store().is_authenticated() {
        anyhow::bail!("Already logged in. Run `errwise logout` first.");
    }

    print!("Password: ");
    io::stdout().flush().context("flush stdout")?;
    let mut password = String::new();
    io::stdin()
        .lock()
        .read_line(&mut password)
        .context("read password from stdin")?;
    let password = password.trim_end_matches(['\r', '\n']);
    anyhow::ensure!(!password.is_empty(), "Password must not be empty");

    let user = app.api.login(username, password).await?;
    tracing::info!(username = %user.username, "logged in");
    println!("Logged in as {} ({})", user.username, user.email);
    Ok(())
}

pub async fn logout() -> Result<()> {
    let app = AppSession::new()?;
    if !app.controller.resume() {
        println!("Not logged in.");
        return Ok(());
    }

    app.controller.logout(LogoutReason::UserRequested).await;
    println!("Logged out.");
    Ok(())
}

pub async fn status() -> Result<()> {
    let app = AppSession::new()?;
    if !app.controller.resume() {
        println!("Not logged in.");
        return Ok(());
    }

    // Verify the token against the backend; an unreachable backend falls
    // back to the persisted session, a rejected token ends it.
    let user = match app.api.me().await {
        Ok(user) => user,
        Err(e) => {
            if e.downcast_ref::<AuthError>().is_some() {
                println!("Not logged in.");
                return Ok(());
            }
            tracing::warn!("could not verify session with the backend: {e:#}");
            match app.controller.current_user() {
                Some(user) => user,
                None => {
                    println!("Not logged in.");
                    return Ok(());
                }
            }
        }
    };

    println!("Logged in as {} ({})", user.username, user.email);
    if let Some(tier) = &user.subscription_tier {
        println!("Subscription: {tier}");
    }
    if let Some(session) = app.controller.store().current() {
        println!("Access token: {}", store::mask_token(&session.access_token));
        println!("Authenticated at: {}", session.authenticated_at.to_rfc3339());
    }
    Ok(())
}
