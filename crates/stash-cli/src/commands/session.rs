//! Session commands

use crate::console::CliConsole;
use anyhow::{Result, anyhow};
use stash::{Stash, UserProfile};

/// Sign in and pull the saved count
pub async fn login(
    console: &CliConsole,
    stash: &Stash,
    id: String,
    name: String,
    email: String,
    avatar: Option<String>,
) -> Result<()> {
    let mut profile = UserProfile::new(id, name, email);
    if let Some(avatar) = avatar {
        profile = profile.with_avatar(avatar);
    }

    let profile = stash
        .sign_in(profile)
        .await
        .map_err(|e| anyhow!(e.user_message()))?;
    console.success(&format!("Signed in as {} ({})", profile.name, profile.id));
    console.field("Saved", &profile.saved_articles_count.to_string());
    Ok(())
}

pub async fn logout(console: &CliConsole, stash: &Stash) -> Result<()> {
    if !stash.session().is_authenticated() {
        console.warn("Not signed in");
        return Ok(());
    }

    match stash.sign_out().await {
        Ok(()) => console.success("Signed out"),
        Err(e) => {
            console.warn(&format!("Signed out, but {}", e.user_message()));
        }
    }
    Ok(())
}

pub fn whoami(console: &CliConsole, stash: &Stash) -> Result<()> {
    let Some(profile) = stash.session().current_profile() else {
        console.warn("Not signed in");
        return Ok(());
    };

    console.print_header("Profile");
    console.field("Id", profile.id.as_str());
    console.field("Name", &profile.name);
    console.field("Email", &profile.email);
    if let Some(avatar) = &profile.avatar {
        console.field("Avatar", avatar);
    }
    if let Some(bio) = &profile.bio {
        console.field("Bio", bio);
    }
    console.field("Saved", &profile.saved_articles_count.to_string());
    if let Some(updated_at) = profile.updated_at {
        console.field("Updated", &updated_at.format("%Y-%m-%d %H:%M UTC").to_string());
    }
    Ok(())
}
