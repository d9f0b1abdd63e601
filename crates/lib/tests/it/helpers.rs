use std::{collections::HashMap, fs, path::Path};

use promus::{
    Config, MasterIdentity,
    exec::{CommandOutput, CommandRunner, ExecError},
    identity::{IdentityDirectory, Key},
};
use tempfile::TempDir;

pub const MASTER: &str = "jm@lopez.net";

/// A host layout inside a temporary home directory.
pub struct TestHost {
    // Held so the directory outlives the test
    pub home: TempDir,
    pub config: Config,
}

impl TestHost {
    pub fn new() -> Self {
        let home = tempfile::tempdir().unwrap();
        let master = MasterIdentity {
            user: "git".to_string(),
            name: "Juan Lopez".to_string(),
            email: MASTER.to_string(),
            host: "server.lopez.net".to_string(),
            alias: "server".to_string(),
        };
        let config = Config::new(master, home.path());
        Self { home, config }
    }

    /// Write the authorized_keys file, creating `~/.ssh`.
    pub fn write_keys(&self, text: &str) {
        let path = &self.config.authorized_keys;
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    pub fn read_keys(&self) -> String {
        fs::read_to_string(&self.config.authorized_keys).unwrap()
    }

    pub fn directory(&self) -> IdentityDirectory {
        IdentityDirectory::from_file(&self.config.users_file)
    }

    pub fn save_directory(&self, directory: &IdentityDirectory) {
        directory.save(&self.config.users_file).unwrap();
    }
}

/// Everything after the generated header line.
pub fn body(text: &str) -> String {
    text.lines().skip(1).map(|line| format!("{line}\n")).collect()
}

/// A key record for `user` with a deterministic key blob.
pub fn key_for(user: &str, name: &str) -> Key {
    Key {
        user: user.to_string(),
        name: name.to_string(),
        alias: "laptop".to_string(),
        host: format!("{user}.example.org"),
        key_type: "ssh-ed25519".to_string(),
        key_desc: format!("{user}@laptop - git"),
        key: format!("AAAAC3NzaC1lZDI1NTE5AAAAI{user}0123456789"),
    }
}

/// The directory used by the ACL scenarios.
pub fn team_directory() -> IdentityDirectory {
    let mut dir = IdentityDirectory::new();
    for (email, user, name) in [
        ("daisy@flowers.org", "daisy", "Daisy Duck"),
        ("carl@example.org", "carl", "Carl Sagan"),
        ("anna@example.org", "anna", "Anna Karenina"),
        ("bob@example.org", "bob", "Bob Marley"),
    ] {
        dir.insert(email, key_for(user, name));
    }
    dir
}

/// Answers `git <args>` from a table; unknown objects fail like git does.
#[derive(Default)]
pub struct FakeGit {
    answers: HashMap<String, String>,
}

impl FakeGit {
    pub fn answer(mut self, args: &str, stdout: &str) -> Self {
        self.answers.insert(args.to_string(), stdout.to_string());
        self
    }

    /// Stage `path` with `content`, or as a deletion when `None`.
    pub fn stage(mut self, path: &str, content: Option<&str>) -> Self {
        let listing = self
            .answers
            .entry("diff --cached --name-status --no-renames -z".to_string())
            .or_default();
        match content {
            Some(content) => {
                listing.push_str(&format!("M\0{path}\0"));
                self.answers.insert(format!("show :{path}"), content.to_string());
            }
            None => listing.push_str(&format!("D\0{path}\0")),
        }
        self
    }

    /// Make `paths` the ones touched by the commit at `HEAD`.
    pub fn commit(self, paths: &[&str]) -> Self {
        let listing: String = paths.iter().map(|path| format!("{path}\0")).collect();
        self.answer("diff-tree --no-commit-id --name-only -r -z --root HEAD", &listing)
    }
}

impl CommandRunner for FakeGit {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, ExecError> {
        assert_eq!(program, "git");
        let joined = args.join(" ");
        Ok(match self.answers.get(&joined) {
            Some(stdout) => CommandOutput {
                stdout: stdout.clone(),
                stderr: String::new(),
                status: 0,
            },
            None => CommandOutput {
                stdout: String::new(),
                stderr: format!("fatal: invalid object name '{joined}'"),
                status: 128,
            },
        })
    }
}

#[cfg(unix)]
pub fn mode_of(path: &Path) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path).unwrap().permissions().mode() & 0o777
}
