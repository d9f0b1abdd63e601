//! File validation commands.

use std::{fs, path::Path};

use promus::{acl::Policy, profile::Profile};

use super::{CommandResult, Context};

/// Run the `check acl` command
pub fn acl(ctx: &Context, file: &Path) -> CommandResult {
    let text = fs::read_to_string(file)?;
    let policy = Policy::parse(&text, &ctx.directory(), ctx.config.master_email())?;

    println!("{}: ok", file.display());
    println!("  admins: {}", join(policy.admins()));
    println!("  users:  {}", join(policy.users()));
    for (name, members) in policy.teams() {
        println!("  team {name}: {}", members.join(", "));
    }
    println!("  rules:  {}", policy.rules().len());
    Ok(())
}

/// Run the `check profile` command
pub fn profile(file: &Path) -> CommandResult {
    let text = fs::read_to_string(file)?;
    let profile = Profile::parse(&text)?;

    println!("{}: ok", file.display());
    println!("  email:  {}", profile.email);
    println!("  notify: {:?}", profile.notify);
    if !profile.track_files.is_empty() {
        println!("  track:  {}", profile.track_files.join(", "));
    }
    Ok(())
}

fn join<'a>(items: impl IntoIterator<Item = &'a String>) -> String {
    items
        .into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
