//! Saved-article commands

use crate::console::CliConsole;
use anyhow::{Result, anyhow, bail};
use colored::*;
use stash::{ArticleId, SavedStatus, Stash, StashError, ToggleOutcome, UserId};

fn require_user(stash: &Stash) -> Result<UserId> {
    stash
        .session()
        .current_user_id()
        .ok_or_else(|| anyhow!(StashError::not_signed_in().user_message()))
}

fn describe(status: SavedStatus) -> ColoredString {
    match status {
        SavedStatus::Saved => "saved".green().bold(),
        SavedStatus::NotSaved => "not saved".normal(),
        SavedStatus::Checking => "checking".dimmed(),
        SavedStatus::Unknown => "unknown".yellow(),
    }
}

/// Print whether the signed-in user saved `article`
pub async fn status(console: &CliConsole, stash: &Stash, article: String) -> Result<()> {
    let user_id = require_user(stash)?;
    let relation = stash.observe(ArticleId::from(article.clone()));

    let status = relation
        .refresh()
        .await
        .map_err(|e| anyhow!(e.user_message()))?;
    println!("{} is {}", article.bright_white(), describe(status));
    console.info(&format!("Checked for {user_id}"));
    Ok(())
}

/// Flip the saved state of `article`
pub async fn toggle(console: &CliConsole, stash: &Stash, article: String) -> Result<()> {
    require_user(stash)?;
    let relation = stash.observe(ArticleId::from(article));

    // The toggle direction depends on the current remote state
    if let Err(e) = relation.refresh().await {
        bail!(e.user_message());
    }

    match stash.toggles().toggle(&relation).await {
        ToggleOutcome::Completed {
            message, status, ..
        } => {
            console.success(&message);
            console.info(&format!("Now {}", describe(status)));
            if let Some(profile) = stash.session().current_profile() {
                console.field("Saved", &profile.saved_articles_count.to_string());
            }
            Ok(())
        }
        ToggleOutcome::Skipped { status } => {
            console.warn(&format!("Another change is in progress, still {}", describe(status)));
            Ok(())
        }
        ToggleOutcome::Failed { error, .. } => {
            console.error(&error.user_message());
            bail!("{} ({})", error, error.error_code())
        }
    }
}

/// Print the saved list, newest first
pub async fn list(console: &CliConsole, stash: &Stash) -> Result<()> {
    let user_id = require_user(stash)?;
    let snapshot = stash
        .saved_list()
        .refresh(&user_id)
        .await
        .map_err(|e| anyhow!(e.user_message()))?;

    console.print_header(&format!("Saved articles ({})", snapshot.count));
    if snapshot.is_empty() {
        println!("{}", "Nothing saved yet.".dimmed());
        return Ok(());
    }

    for entry in &snapshot.articles {
        let saved_at = entry
            .saved_at
            .map(|t| t.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        println!(
            "  {} {} {}",
            entry.article_id.as_str().bright_cyan(),
            entry.article.title.bright_white(),
            saved_at.dimmed()
        );
        if let Some(author) = &entry.article.author {
            println!("    {}", format!("by {author}").dimmed());
        }
    }
    Ok(())
}

/// Remove `article` from the saved list
pub async fn remove(console: &CliConsole, stash: &Stash, article: String) -> Result<()> {
    let user_id = require_user(stash)?;
    let list = stash.saved_list();

    if let Err(e) = list.refresh(&user_id).await {
        console.info(&format!("Could not load the list first: {}", e.user_message()));
    }

    let removal = list
        .remove_one(&user_id, &ArticleId::from(article))
        .await
        .map_err(|e| anyhow!(e.user_message()))?;
    console.success(&removal.message);
    console.field("Saved", &removal.count.to_string());
    Ok(())
}
