//! Integration tests for Sushibox

#[cfg(unix)]
mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};
    use sushibox::assets::EmbeddedAssets;
    use tempfile::TempDir;

    /// A bundle directory plus an isolated state directory
    struct Sandbox {
        dir: TempDir,
    }

    impl Sandbox {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let bundle = dir.path().join("bundle");
            write(&bundle.join("bin/foo"), "#!/bin/sh\necho foo \"$@\"\n", 0o755);
            write(&bundle.join("bin/bar"), "#!/bin/sh\necho bar\n", 0o644);
            write(&bundle.join("bin/fail"), "#!/bin/sh\nexit 7\n", 0o755);
            write(&bundle.join("share/doc/readme.txt"), "readme\n", 0o644);
            Self { dir }
        }

        fn bundle(&self) -> PathBuf {
            self.dir.path().join("bundle")
        }

        fn state(&self) -> PathBuf {
            self.dir.path().join("state")
        }

        fn cache_root(&self) -> PathBuf {
            self.state()
                .join("sushibox")
                .join("versions")
                .join(sushibox::VERSION)
        }

        fn isolate(&self, mut cmd: Command) -> Command {
            cmd.env("SUSHIBOX_MOCK", self.bundle())
                .env("SUSHIBOX_STATE_DIR", self.state())
                .env("SUSHIBOX_CONFIG", self.dir.path().join("config.toml"))
                .env_remove("SUSHIBOX_LOG");
            cmd
        }

        fn sushibox(&self) -> Command {
            self.isolate(cargo_bin_cmd!("sushibox"))
        }

        /// The launcher, invoked through a symlink called `name`
        fn alias(&self, name: &str) -> Command {
            let link = self.dir.path().join(name);
            if !link.exists() {
                std::os::unix::fs::symlink(env!("CARGO_BIN_EXE_sushibox"), &link).unwrap();
            }
            self.isolate(Command::new(link))
        }
    }

    fn write(path: &Path, content: &str, mode: u32) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
        fs::set_permissions(path, fs::Permissions::from_mode(mode)).unwrap();
    }

    #[test]
    fn version_displays() {
        let sandbox = Sandbox::new();
        sandbox
            .sushibox()
            .arg("-version")
            .assert()
            .success()
            .stdout(format!("{}\n", sushibox::VERSION));

        assert!(!sandbox.state().exists());
    }

    #[test]
    fn help_displays() {
        Sandbox::new()
            .sushibox()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("self-extracting command launcher"));
    }

    #[test]
    fn missing_command() {
        Sandbox::new()
            .sushibox()
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Error:"))
            .stderr(predicate::str::contains("Missing command"))
            .stderr(predicate::str::contains("foo"));
    }

    #[test]
    fn unknown_option_exits_one() {
        Sandbox::new()
            .sushibox()
            .args(["--bogus", "foo"])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("--bogus"));
    }

    #[test]
    fn runs_command_as_product() {
        let sandbox = Sandbox::new();
        sandbox
            .sushibox()
            .arg("foo")
            .assert()
            .success()
            .stdout("foo\n")
            .stderr("");

        assert!(sandbox.cache_root().join("bin/foo").is_file());
        assert!(sandbox.cache_root().join("share/doc/readme.txt").is_file());
    }

    #[test]
    fn forwards_arguments() {
        Sandbox::new()
            .sushibox()
            .args(["foo", "bar", "--version", "-v"])
            .assert()
            .success()
            .stdout("foo bar --version -v\n");
    }

    #[test]
    fn runs_command_as_alias() {
        let sandbox = Sandbox::new();
        sandbox
            .alias("foo")
            .args(["-version", "x"])
            .assert()
            .success()
            .stdout("foo -version x\n");
    }

    #[test]
    fn propagates_exit_code() {
        Sandbox::new().sushibox().arg("fail").assert().code(7);
    }

    #[test]
    fn not_executable() {
        Sandbox::new()
            .sushibox()
            .arg("bar")
            .assert()
            .code(1)
            .stdout("")
            .stderr(predicate::str::contains("Permission denied"));
    }

    #[test]
    fn not_found() {
        Sandbox::new()
            .sushibox()
            .arg("baz")
            .assert()
            .code(1)
            .stderr(predicate::str::contains("No such file or directory"));
    }

    #[test]
    fn repairs_corrupted_cache() {
        let sandbox = Sandbox::new();
        sandbox.sushibox().arg("foo").assert().success();

        let readme = sandbox.cache_root().join("share/doc/readme.txt");
        fs::write(&readme, "x").unwrap();

        sandbox.sushibox().arg("foo").assert().success().stdout("foo\n");
        assert_eq!(fs::read_to_string(&readme).unwrap(), "readme\n");
    }

    #[test]
    fn invalid_config_is_reported() {
        let sandbox = Sandbox::new();
        fs::write(sandbox.dir.path().join("config.toml"), "[cache\n").unwrap();

        let assert = sandbox
            .sushibox()
            .arg("foo")
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Invalid configuration"))
            .stderr(predicate::str::contains("line 1"));

        let stderr = String::from_utf8_lossy(&assert.get_output().stderr).into_owned();
        assert_eq!(stderr.lines().count(), 1, "{}", stderr);
    }

    #[test]
    fn version_ignores_invalid_config() {
        let sandbox = Sandbox::new();
        fs::write(sandbox.dir.path().join("config.toml"), "[cache\n").unwrap();

        sandbox
            .sushibox()
            .arg("-version")
            .assert()
            .success()
            .stdout(format!("{}\n", sushibox::VERSION));

        sandbox
            .sushibox()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Usage"));
    }

    #[test]
    fn without_bundle_source() {
        let sandbox = Sandbox::new();
        let assert = sandbox
            .sushibox()
            .env_remove("SUSHIBOX_MOCK")
            .arg("foo")
            .assert();

        if !EmbeddedAssets::bundled().is_configured() {
            assert
                .code(1)
                .stderr(predicate::str::contains("not configured"))
                .stderr(predicate::str::contains("SUSHIBOX_MOCK"));
        }
    }
}
