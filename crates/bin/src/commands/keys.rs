//! authorized_keys inspection and reconciliation.

use promus::keys::KeyStore;

use super::{CommandResult, Context};
use crate::output::{OutputFormat, print_section};

/// Run the `keys list` command
pub fn list(ctx: &Context, format: OutputFormat) -> CommandResult {
    let state = KeyStore::new(&ctx.config).read()?;

    match format {
        OutputFormat::Human => {
            let registered: Vec<Vec<String>> = state
                .registered
                .entries()
                .map(|(email, fingerprint, key)| {
                    vec![
                        email.to_string(),
                        fingerprint.to_string(),
                        key.user.clone(),
                        key.name.clone(),
                        key.alias.clone(),
                    ]
                })
                .collect();
            print_section(
                "Registered keys",
                "none",
                &["EMAIL", "FINGERPRINT", "USER", "NAME", "ALIAS"],
                &registered,
            );

            let pending: Vec<Vec<String>> = state
                .pending_by_email()
                .into_iter()
                .map(|(fingerprint, invitation)| {
                    vec![
                        invitation.email.clone(),
                        fingerprint.to_string(),
                        invitation.key_type.clone(),
                    ]
                })
                .collect();
            print_section(
                "Pending requests",
                "none",
                &["EMAIL", "FINGERPRINT", "TYPE"],
                &pending,
            );

            println!("Non-promus entries ({}):", state.foreign.len());
            for line in &state.foreign {
                println!("  {line}");
            }
            if state.is_dirty() {
                println!("\nRun `promus keys sync` to migrate legacy entries.");
            }
        }
        OutputFormat::Json => {
            let pending: Vec<_> = state
                .pending_by_email()
                .into_iter()
                .map(|(fingerprint, invitation)| {
                    serde_json::json!({
                        "fingerprint": fingerprint,
                        "email": invitation.email,
                        "key_type": invitation.key_type,
                        "key_desc": invitation.key_desc,
                    })
                })
                .collect();
            let value = serde_json::json!({
                "registered": &state.registered,
                "pending": pending,
                "foreign": &state.foreign,
                "needs_sync": state.is_dirty(),
            });
            println!("{}", serde_json::to_string(&value)?);
        }
    }

    Ok(())
}

/// Run the `keys sync` command
pub fn sync(ctx: &Context) -> CommandResult {
    let migrated = KeyStore::new(&ctx.config).sync()?;
    println!("Rewrote {}", ctx.config.authorized_keys.display());
    if migrated {
        println!("Migrated entries into {}", ctx.config.users_file.display());
    }
    Ok(())
}
