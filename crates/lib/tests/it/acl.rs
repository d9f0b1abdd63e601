use std::fs;

use promus::{
    acl::{Policy, PrincipalRef},
    identity::IdentityDirectory,
};

use crate::helpers::{MASTER, TestHost, key_for, team_directory};

const ACL: &str = "\
admin: daisy
user: carl, anna, bob
team: writers | anna, bob
team: writers | carl

path: docs | !deny, !all
name: docs/*.md | !allow, !team:writers
path: docs/drafts | !deny, Karenina
name: src/*, build.rs | !deny, !all, !allow, carl
";

fn policy_from_disk(host: &TestHost) -> (Policy, IdentityDirectory) {
    host.save_directory(&team_directory());
    let acl_path = host.home.path().join("repo.acl");
    fs::write(&acl_path, ACL).unwrap();

    let directory = host.directory();
    let text = fs::read_to_string(&acl_path).unwrap();
    let policy = Policy::parse(&text, &directory, host.config.master_email()).unwrap();
    (policy, directory)
}

#[test]
fn test_policy_over_persisted_directory() {
    let host = TestHost::new();
    let (policy, directory) = policy_from_disk(&host);

    assert!(policy.is_admin(MASTER));
    assert!(policy.is_admin("daisy@flowers.org"));
    assert!(policy.is_user("daisy@flowers.org"));
    assert_eq!(
        policy.team("writers").unwrap(),
        ["anna@example.org", "bob@example.org", "carl@example.org"]
    );

    let cases: &[(&str, Option<&str>, bool)] = &[
        ("carl", None, true),
        ("Anna@Example.org", None, true),
        ("stranger", None, false),
        ("bob", Some("README.md"), true),
        ("bob", Some("docs/guide.md"), true),
        ("bob", Some("docs/logo.png"), false),
        ("anna", Some("docs/drafts/intro.md"), false),
        ("bob", Some("docs/drafts/intro.md"), true),
        ("carl", Some("src/main.rs"), true),
        ("anna", Some("src/main.rs"), false),
        ("anna", Some("build.rs"), false),
        ("daisy", Some("src/main.rs"), true),
        ("daisy", Some(".acl"), true),
        ("carl", Some(".acl"), false),
    ];
    for (actor, path, expected) in cases {
        assert_eq!(
            policy.has_access(&directory, *actor, *path),
            *expected,
            "{actor:?} access to {path:?}"
        );
    }
}

#[test]
fn test_registration_changes_resolution() {
    let host = TestHost::new();
    let (policy, mut directory) = policy_from_disk(&host);
    assert!(!policy.has_access(&directory, "eve", None));

    // A newly registered guest is not a user until the ACL names them
    directory.insert("eve@example.org", key_for("eve", "Eve Online"));
    host.save_directory(&directory);
    let directory = host.directory();
    assert!(!policy.has_access(&directory, "eve", None));

    let policy = Policy::parse(&format!("{ACL}user: eve\n"), &directory, Some(MASTER)).unwrap();
    assert!(policy.has_access(&directory, "eve", Some("README.md")));
    assert!(policy.has_access(&directory, PrincipalRef::Email("eve@example.org"), None));
}

#[test]
fn test_master_is_admin_without_registration() {
    let host = TestHost::new();
    let (policy, directory) = policy_from_disk(&host);

    assert!(!directory.contains(MASTER));
    assert!(policy.has_access(&directory, MASTER, Some(".acl")));
    assert!(policy.has_access(&directory, "JM@lopez.net", Some("docs/x.png")));

    let fallback = Policy::admin_only(MASTER);
    assert!(fallback.has_access(&directory, MASTER, Some("anything")));
    assert!(!fallback.has_access(&directory, "carl", None));
}

#[test]
fn test_parse_errors_carry_line_numbers() {
    let directory = team_directory();
    let err = Policy::parse("admin: daisy\n\nnonsense\n", &directory, Some(MASTER)).unwrap_err();
    assert!(err.is_parse_error());
    assert_eq!(err.line(), Some(3));
}
