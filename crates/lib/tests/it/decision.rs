use promus::{
    decision::{self, Report},
    git,
    identity::IdentityDirectory,
};

use crate::helpers::{FakeGit, MASTER, TestHost, team_directory};

const COMMITTED_ACL: &str = "\
admin: daisy
user: carl, anna
name: src/* | !deny, !all, !allow, carl
";

fn staged_report(
    host: &TestHost,
    git: &FakeGit,
    directory: &IdentityDirectory,
    actor: &str,
) -> Report {
    decision::review_staged(git, directory, &host.config, actor).unwrap()
}

#[test]
fn test_commit_with_mixed_violations() {
    let host = TestHost::new();
    let directory = team_directory();
    let git = FakeGit::default()
        .answer("show HEAD:.acl", COMMITTED_ACL)
        .stage("README.md", Some("# hello\n"))
        .stage("src/lib.rs", Some("pub fn f() {}\n"))
        .stage(".anna@example.org.profile", Some("notify: sometimes\n"))
        .stage(".carl@example.org.profile", Some("notify: all\n"));

    let report = staged_report(&host, &git, &directory, "anna@example.org");
    assert_eq!(report.denied, vec!["src/lib.rs", ".carl@example.org.profile"]);
    assert_eq!(report.validation_errors.len(), 1);
    let (path, error) = &report.validation_errors[0];
    assert_eq!(path, ".anna@example.org.profile");
    assert!(error.to_string().contains("notify options allowed: all/false/track"));

    let rendered = report.render();
    assert_eq!(
        rendered.lines().next(),
        Some("You do not have access to modify \"src/lib.rs\"")
    );
}

#[test]
fn test_admin_may_replace_acl_but_not_break_it() {
    let host = TestHost::new();
    let directory = team_directory();
    let base = FakeGit::default().answer("show HEAD:.acl", COMMITTED_ACL);

    let good = base.stage(".acl", Some("user: bob\n"));
    assert!(staged_report(&host, &good, &directory, "daisy@flowers.org").is_clean());
    assert!(!staged_report(&host, &good, &directory, "carl@example.org").is_clean());

    let broken = FakeGit::default()
        .answer("show HEAD:.acl", COMMITTED_ACL)
        .stage(".acl", Some("team: nobody\n"));
    let report = staged_report(&host, &broken, &directory, MASTER);
    assert!(report.denied.is_empty());
    assert_eq!(report.validation_errors[0].0, ".acl");
}

#[test]
fn test_deleting_a_file_is_checked_like_editing_it() {
    let host = TestHost::new();
    let directory = team_directory();
    let git = FakeGit::default()
        .answer("show HEAD:.acl", COMMITTED_ACL)
        .stage("src/old.rs", None);

    assert!(!staged_report(&host, &git, &directory, "anna@example.org").is_clean());
    assert!(staged_report(&host, &git, &directory, "carl@example.org").is_clean());
}

#[test]
fn test_quoted_and_unicode_paths_match_rules() {
    let host = TestHost::new();
    let directory = team_directory();
    let acl = "admin: daisy\nuser: carl, anna\npath: docs/* | !deny, !all, !allow, carl\n";
    let git = FakeGit::default()
        .answer("show HEAD:.acl", acl)
        .stage("docs/r\u{e9}sum\u{e9}.md", Some("# cv\n"));

    let report = staged_report(&host, &git, &directory, "anna@example.org");
    assert_eq!(report.denied, vec!["docs/r\u{e9}sum\u{e9}.md"]);
    assert!(staged_report(&host, &git, &directory, "carl@example.org").is_clean());
}

#[test]
fn test_unreadable_staged_file_fails_the_review() {
    let host = TestHost::new();
    let directory = team_directory();
    // Listed as modified, but the index entry cannot be shown
    let git = FakeGit::default()
        .answer("show HEAD:.acl", COMMITTED_ACL)
        .answer("diff --cached --name-status --no-renames -z", "M\0src/lib.rs\0");

    let err = decision::review_staged(&git, &directory, &host.config, "carl@example.org")
        .unwrap_err();
    assert_eq!(err.module(), "exec");
}

#[test]
fn test_broken_committed_acl_fails_the_review() {
    let host = TestHost::new();
    let directory = team_directory();
    let git = FakeGit::default()
        .answer("show HEAD:.acl", "team: nobody\n")
        .stage("notes.txt", Some("x"));

    let err = decision::review_staged(&git, &directory, &host.config, MASTER).unwrap_err();
    assert!(err.is_parse_error());
}

#[test]
fn test_repository_without_acl_belongs_to_the_owner() {
    let host = TestHost::new();
    let directory = team_directory();
    let git = FakeGit::default().stage("notes.txt", Some("x"));

    assert!(staged_report(&host, &git, &directory, MASTER).is_clean());
    let report = staged_report(&host, &git, &directory, "carl@example.org");
    assert_eq!(report.denied, vec!["notes.txt"]);
}

#[test]
fn test_notification_preferences_from_committed_profiles() {
    let git = FakeGit::default()
        .answer("show HEAD:.anna@example.org.profile", "notify: track\ntrack-files: docs/*, *.tex\n")
        .answer("show HEAD:.carl@example.org.profile", "notify: all\n");

    let anna = git::read_committed_profile(&git, "anna@example.org").unwrap();
    assert!(anna.wants_notification(&["paper/main.tex"]));
    assert!(!anna.wants_notification(&["src/lib.rs"]));

    let carl = git::read_committed_profile(&git, "carl@example.org").unwrap();
    assert!(carl.wants_notification(&["src/lib.rs"]));

    let bob = git::read_committed_profile(&git, "bob@example.org").unwrap_err();
    assert!(bob.is_missing());
}
