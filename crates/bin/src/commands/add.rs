//! Confirm a pending invitation.

use promus::{
    constants::SSH_ORIGINAL_COMMAND_VAR,
    keys::{Enrollment, KeyStore},
    notify::{Mailer, Message},
};
use tracing::warn;

use super::{CommandResult, Context};

/// Run the `add user` command
///
/// The guest connects with the invitation key, whose wrapper names the
/// invited `email`, and sends an enrollment payload as their command.
pub fn user(ctx: &Context, mailer: &dyn Mailer, email: &str) -> CommandResult {
    let payload = std::env::var(SSH_ORIGINAL_COMMAND_VAR)
        .map_err(|_| format!("{SSH_ORIGINAL_COMMAND_VAR} was not set"))?;
    let enrollment = Enrollment::parse(&payload)?;
    println!("Welcome {}, please wait...", enrollment.name);

    let store = KeyStore::new(&ctx.config);
    if let Err(e) = store.update(|state| state.confirm(email, &enrollment)) {
        warn!("Enrollment through the invitation for {email} rejected: {e}");
        return Err(e.into());
    }
    println!("Connection successful");

    mailer.send(&Message::registration(
        &enrollment.email,
        &enrollment.name,
        &ctx.config.master,
    ))?;
    Ok(())
}
