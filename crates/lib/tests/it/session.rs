use promus::{
    acl::Policy,
    git,
    keys::{Classifier, Enrollment, KeyStore, Line, invitation_suffix},
    session::{self, Guest, SessionError},
};

use crate::helpers::{FakeGit, MASTER, TestHost};

const INVITE_KEY: &str = "AAAAB3NzaC1yc2EAAAADAQABAAABAQCinvitation00000000002";

/// Invite and register a guest, returning the `PROMUS_USER` value sshd
/// would export for their key.
fn register_guest(host: &TestHost) -> String {
    let store = KeyStore::new(&host.config);
    store
        .update(|state| Ok(state.invite("guest@example.org", "ssh-rsa", INVITE_KEY, "guest@example.org")))
        .unwrap();
    let enrollment = Enrollment::parse(&format!(
        "{},ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIguestkey0002 guest@laptop,\
         guest@example.org,guest,Guest User,guest.example.org,laptop",
        invitation_suffix(INVITE_KEY)
    ))
    .unwrap();
    store
        .update(|state| state.confirm("guest@example.org", &enrollment))
        .unwrap();

    let classifier = Classifier::for_config(&host.config).unwrap();
    host.read_keys()
        .lines()
        .find_map(|line| match classifier.classify(line) {
            Line::Registered {
                email, fingerprint, ..
            } => Some(format!("{email},{fingerprint}")),
            _ => None,
        })
        .unwrap()
}

fn env<'a>(
    promus_user: &'a str,
    command: Option<&'a str>,
) -> impl Fn(&str) -> Option<String> + 'a {
    move |name: &str| match name {
        "PROMUS_USER" => Some(promus_user.to_string()),
        "SSH_ORIGINAL_COMMAND" => command.map(str::to_string),
        _ => None,
    }
}

#[test]
fn test_registered_guest_connects() {
    let host = TestHost::new();
    let promus_user = register_guest(&host);
    assert_eq!(promus_user, "guest@example.org,estkey0002");

    let directory = host.directory();
    let guest = Guest::from_env(
        &directory,
        env(&promus_user, Some("git-receive-pack '/srv/project.git'")),
    )
    .unwrap();
    assert_eq!(guest.key.name, "Guest User");
    let (program, args) = guest.git_command().unwrap();
    assert_eq!(program, "git-receive-pack");
    assert_eq!(args, vec!["/srv/project.git"]);

    let policy = Policy::parse("user: guest\n", &directory, Some(MASTER)).unwrap();
    assert!(policy.has_access(&directory, &guest, None));
    assert!(!policy.has_access(&directory, &guest, Some(".acl")));
}

#[test]
fn test_session_rejections() {
    let host = TestHost::new();
    let promus_user = register_guest(&host);
    let directory = host.directory();

    let err = Guest::from_env(&directory, env(&promus_user, None)).unwrap_err();
    assert_eq!(err, SessionError::InteractiveShellDenied);

    let err = Guest::from_env(&directory, env(&promus_user, Some("git-upload-pack x; sh")))
        .unwrap_err();
    assert!(err.is_injection());

    let err = Guest::from_env(&directory, env("guest@example.org,0000000000", Some("ls")))
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(
        err.to_string(),
        "PROMUS_USER[guest@example.org,0000000000] not found"
    );
}

#[test]
fn test_pending_guest_cannot_connect() {
    let host = TestHost::new();
    KeyStore::new(&host.config)
        .update(|state| Ok(state.invite("guest@example.org", "ssh-rsa", INVITE_KEY, "")))
        .unwrap();

    let err = Guest::resolve(&host.directory(), "guest@example.org,0000000002", "ls").unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_guest_needs_a_seat_in_the_repository_acl() {
    let host = TestHost::new();
    let promus_user = register_guest(&host);
    let directory = host.directory();
    let guest = Guest::from_env(&directory, env(&promus_user, Some("git-upload-pack 'paper.git'")))
        .unwrap();

    let listed = FakeGit::default().answer("show HEAD:.acl", "user: guest\n");
    let policy = git::load_policy(&listed, &directory, Some(MASTER)).unwrap();
    assert!(guest.authorize(&directory, &policy, "paper.git").is_ok());

    let unlisted = FakeGit::default().answer("show HEAD:.acl", "user: jm@lopez.net\n");
    let policy = git::load_policy(&unlisted, &directory, Some(MASTER)).unwrap();
    let err = guest.authorize(&directory, &policy, "paper.git").unwrap_err();
    assert!(err.is_access_denied());

    // No ACL committed yet: only the host owner gets in
    let fresh = FakeGit::default();
    let policy = git::load_policy(&fresh, &directory, Some(MASTER)).unwrap();
    assert!(guest.authorize(&directory, &policy, "paper.git").unwrap_err().is_access_denied());
}

#[test]
fn test_commits_in_a_session_belong_to_the_guest() {
    let host = TestHost::new();
    let promus_user = register_guest(&host);

    let actor = session::committer(env(&promus_user, None), host.config.master_email()).unwrap();
    assert_eq!(actor, "guest@example.org");

    let outside = session::committer(|_: &str| None, host.config.master_email()).unwrap();
    assert_eq!(outside, MASTER);
}
