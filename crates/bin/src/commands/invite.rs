//! Invite a collaborator.

use std::{fs, path::PathBuf};

use promus::{
    exec::CommandRunner,
    keys::KeyStore,
    notify::{Mailer, Message},
};

use super::{CommandResult, Context};
use crate::cli::InviteArgs;

/// Run the invite command
///
/// Generates a one-time key pair under the invitations directory, records
/// its public half as pending and mails the private half to the invitee.
pub fn run(ctx: &Context, mailer: &dyn Mailer, args: &InviteArgs) -> CommandResult {
    let master = &ctx.config.master;
    let dir = ctx.config.invitations_dir().join(&args.email);
    fs::create_dir_all(&dir)?;

    let private_key = dir.join(format!("{}@{}", master.user, master.host));
    let mut public_key = private_key.clone().into_os_string();
    public_key.push(".pub");
    let public_key = PathBuf::from(public_key);
    for stale in [&private_key, &public_key] {
        if stale.exists() {
            fs::remove_file(stale)?;
        }
    }

    let key_path = private_key.to_string_lossy().into_owned();
    ctx.runner.run_checked(
        "ssh-keygen",
        &[
            "-f",
            key_path.as_str(),
            "-C",
            args.email.as_str(),
            "-N",
            "",
            "-t",
            "rsa",
            "-q",
        ],
    )?;

    let line = fs::read_to_string(&public_key)?;
    let mut parts = line.split_whitespace();
    let (Some(key_type), Some(key)) = (parts.next(), parts.next()) else {
        return Err(format!("unexpected public key in {}", public_key.display()).into());
    };

    let store = KeyStore::new(&ctx.config);
    store.update(|state| Ok(state.invite(&args.email, key_type, key, &args.email)))?;

    mailer.send(&Message::invitation(&args.email, master, private_key.clone()))?;
    println!("Invited {}; private key at {}", args.email, private_key.display());
    Ok(())
}
