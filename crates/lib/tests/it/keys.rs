use std::{cell::Cell, fs};

use promus::{
    identity::Key,
    keys::{Enrollment, KeyStore, MAX_ATTEMPTS, invitation_suffix},
};

use crate::helpers::{TestHost, body, key_for};

const LEGACY_STORE: &str = "\
ssh-rsa AAAAforeignone0000 first@nas
command=\"python -m promus greet 'alice@example.org,alice,Alice Smith,lap'\" ssh-rsa AAAAalicekey0123456789 alice@lap
# a comment
ssh-ed25519 AAAAforeigntwo0000 second@nas
command=\"promus add user new@example.org\" ssh-rsa AAAAinvitationkey9876543210 new@example.org
";

const CANONICAL_BODY: &str = "\
command=\"export PROMUS_USER='alice@example.org,0123456789'; promus greet\" ssh-rsa AAAAalicekey0123456789 alice@lap
# pending requests:
command=\"promus add user new@example.org\" ssh-rsa AAAAinvitationkey9876543210 new@example.org
# non-promus entries:
ssh-rsa AAAAforeignone0000 first@nas
ssh-ed25519 AAAAforeigntwo0000 second@nas
";

const INVITE_KEY: &str = "AAAAB3NzaC1yc2EAAAADAQABAAABAQCinvitation00000000001";

#[test]
fn test_sync_migrates_legacy_and_keeps_foreign_order() {
    let host = TestHost::new();
    host.write_keys(LEGACY_STORE);
    let store = KeyStore::new(&host.config);

    assert!(store.sync().unwrap());
    assert_eq!(body(&host.read_keys()), CANONICAL_BODY);

    let directory = host.directory();
    let alice = directory.key("alice@example.org", "0123456789").unwrap();
    assert_eq!(alice.user, "alice");
    assert_eq!(alice.name, "Alice Smith");
    assert_eq!(alice.alias, "lap");
}

#[test]
fn test_sync_is_idempotent() {
    let host = TestHost::new();
    host.write_keys(LEGACY_STORE);
    let store = KeyStore::new(&host.config);

    store.sync().unwrap();
    let first = host.read_keys();
    let users = fs::read_to_string(&host.config.users_file).unwrap();

    assert!(!store.sync().unwrap());
    assert_eq!(body(&host.read_keys()), body(&first));
    assert_eq!(fs::read_to_string(&host.config.users_file).unwrap(), users);
}

#[test]
fn test_lookalike_wrappers_survive_sync_verbatim() {
    let host = TestHost::new();
    let store_text = "\
command=\"/usr/sbin/useradd user bob\" ssh-rsa AAAAprovisioner0000 ops@nas
command=\"/usr/bin/greet 'x@y.org,x,X,lap'\" ssh-rsa AAAAlookalike0000 x@lap
";
    host.write_keys(store_text);

    assert!(!KeyStore::new(&host.config).sync().unwrap());
    let text = host.read_keys();
    assert!(!text.contains("# pending requests:"));
    assert_eq!(
        body(&text),
        format!("# non-promus entries:\n{store_text}")
    );
    assert!(host.directory().is_empty());
}

#[test]
fn test_crlf_foreign_lines_are_byte_identical() {
    let host = TestHost::new();
    host.write_keys("ssh-rsa AAAAforeign0000 a@b\r\nssh-ed25519 AAAAother0000 c@d\n");

    KeyStore::new(&host.config).sync().unwrap();
    let text = host.read_keys();
    assert!(text.ends_with(
        "# non-promus entries:\nssh-rsa AAAAforeign0000 a@b\r\nssh-ed25519 AAAAother0000 c@d\n"
    ));
}

#[test]
fn test_missing_store_reads_empty() {
    let host = TestHost::new();
    let state = KeyStore::new(&host.config).read().unwrap();
    assert!(state.registered.is_empty());
    assert!(state.pending.is_empty());
    assert!(state.foreign.is_empty());
    assert!(!state.is_dirty());
}

#[test]
fn test_store_recovers_entries_missing_from_directory() {
    let host = TestHost::new();
    host.write_keys(CANONICAL_BODY);

    let state = KeyStore::new(&host.config).read().unwrap();
    assert!(state.is_dirty());
    let alice = state.registered.key("alice@example.org", "0123456789").unwrap();
    assert_eq!(alice.key, "AAAAalicekey0123456789");
}

#[test]
fn test_directory_entries_are_written_to_store() {
    let host = TestHost::new();
    let mut directory = host.directory();
    directory.insert("bob@example.org", key_for("bob", "Bob Marley"));
    host.save_directory(&directory);
    host.write_keys("ssh-rsa AAAAforeignone0000 first@nas\n");

    KeyStore::new(&host.config).update(|_| Ok(())).unwrap();

    let text = host.read_keys();
    assert!(text.starts_with("# PROMUS: file generated on "));
    assert!(text.contains(
        "command=\"export PROMUS_USER='bob@example.org,0123456789'; promus greet\" \
         ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIbob0123456789 bob@laptop - git\n"
    ));
    assert!(text.ends_with("# non-promus entries:\nssh-rsa AAAAforeignone0000 first@nas\n"));
}

#[test]
fn test_backup_taken_once() {
    let host = TestHost::new();
    host.write_keys(LEGACY_STORE);
    let store = KeyStore::new(&host.config);

    store.sync().unwrap();
    let backup = host.config.backup_path();
    assert_eq!(fs::read_to_string(&backup).unwrap(), LEGACY_STORE);

    store
        .update(|state| {
            state.foreign.clear();
            Ok(())
        })
        .unwrap();
    assert_eq!(fs::read_to_string(&backup).unwrap(), LEGACY_STORE);
}

#[cfg(unix)]
#[test]
fn test_written_files_are_owner_only() {
    use crate::helpers::mode_of;

    let host = TestHost::new();
    host.write_keys(LEGACY_STORE);
    KeyStore::new(&host.config).sync().unwrap();

    assert_eq!(mode_of(&host.config.authorized_keys), 0o600);
    assert_eq!(mode_of(&host.config.users_file), 0o600);
}

#[test]
fn test_write_refuses_to_clobber_concurrent_change() {
    let host = TestHost::new();
    host.write_keys(LEGACY_STORE);
    let store = KeyStore::new(&host.config);

    let mut state = store.read().unwrap();
    let concurrent = format!("{LEGACY_STORE}ssh-rsa AAAAlatecomer0000 late@nas\n");
    host.write_keys(&concurrent);

    let err = store.write(&mut state).unwrap_err();
    assert!(err.is_concurrency_error());
    assert_eq!(host.read_keys(), concurrent);
}

#[test]
fn test_update_retries_after_concurrent_change() {
    let host = TestHost::new();
    host.write_keys(LEGACY_STORE);
    let store = KeyStore::new(&host.config);
    let calls = Cell::new(0);

    let fingerprint = store
        .update(|state| {
            calls.set(calls.get() + 1);
            if calls.get() == 1 {
                host.write_keys(&format!("{LEGACY_STORE}ssh-rsa AAAAlatecomer0000 late@nas\n"));
            }
            Ok(state.invite("guest@example.org", "ssh-rsa", INVITE_KEY, "guest@example.org"))
        })
        .unwrap();

    assert_eq!(calls.get(), 2);
    assert_eq!(fingerprint, "0000000001");
    let text = host.read_keys();
    assert!(text.contains("ssh-rsa AAAAlatecomer0000 late@nas"));
    assert!(text.contains("command=\"promus add user guest@example.org\""));
}

#[test]
fn test_update_gives_up_after_repeated_conflicts() {
    let host = TestHost::new();
    host.write_keys(LEGACY_STORE);
    let store = KeyStore::new(&host.config);
    let calls = Cell::new(0);

    let err = store
        .update(|_| {
            calls.set(calls.get() + 1);
            host.write_keys(&format!("{LEGACY_STORE}# writer {}\n", calls.get()));
            Ok(())
        })
        .unwrap_err();

    assert!(err.is_concurrency_error());
    assert_eq!(calls.get(), MAX_ATTEMPTS);
}

fn enrollment(email: &str) -> Enrollment {
    Enrollment {
        invitation_suffix: invitation_suffix(INVITE_KEY).to_string(),
        key_type: "ssh-ed25519".to_string(),
        key: "AAAAC3NzaC1lZDI1NTE5AAAAIguestkey0001".to_string(),
        email: email.to_string(),
        user: "guest".to_string(),
        name: "Guest User".to_string(),
        host: "guest.example.org".to_string(),
        alias: "laptop".to_string(),
    }
}

#[test]
fn test_invitation_lifecycle() {
    let host = TestHost::new();
    let store = KeyStore::new(&host.config);

    store
        .update(|state| Ok(state.invite("guest@example.org", "ssh-rsa", INVITE_KEY, "guest@example.org")))
        .unwrap();
    let state = store.read().unwrap();
    assert_eq!(state.pending.len(), 1);
    assert!(state.registered.is_empty());

    // The wrong email leaves the invitation pending
    let wrong = enrollment("mallory@example.org");
    let err = store.update(|state| state.confirm("guest@example.org", &wrong)).unwrap_err();
    assert!(err.is_email_mismatch());
    assert_eq!(store.read().unwrap().pending.len(), 1);

    // Agreeing with your own wrapper is not enough to take over this invitation
    let err = store
        .update(|state| state.confirm("mallory@example.org", &wrong))
        .unwrap_err();
    assert!(err.is_email_mismatch());
    assert_eq!(store.read().unwrap().pending.len(), 1);

    let payload = enrollment("guest@example.org").payload();
    let parsed = Enrollment::parse(&payload).unwrap();
    let key: Key = store.update(|state| state.confirm("guest@example.org", &parsed)).unwrap();
    assert_eq!(key.fingerprint(), "estkey0001");

    let state = store.read().unwrap();
    assert!(state.pending.is_empty());
    let registered = state.registered.key("guest@example.org", key.fingerprint()).unwrap();
    assert_eq!(registered.name, "Guest User");
    assert_eq!(registered.key_desc, "guest@laptop - git");
    assert!(host.directory().contains("guest@example.org"));
    assert!(!host.read_keys().contains("# pending requests:"));

    let again = store.update(|state| state.confirm("guest@example.org", &parsed)).unwrap_err();
    assert!(again.is_not_found());
}
