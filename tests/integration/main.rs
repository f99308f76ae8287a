//! Integration tests for pyp

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::io::{Cursor, Write};
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn pyp() -> Command {
        let mut cmd = cargo_bin_cmd!("pyp");
        cmd.env_remove("PYP_CONFIG").env_remove("PYP_PYTHON");
        cmd
    }

    /// Scratch layout with a config pointing every directory inside it
    struct Sandbox {
        dir: TempDir,
    }

    impl Sandbox {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            fs::create_dir_all(dir.path().join("tmp")).unwrap();
            let config = format!(
                "[launcher]\ntemp_root = {:?}\n\n[cache]\nroot = {:?}\n",
                dir.path().join("tmp"),
                dir.path().join("cache"),
            );
            fs::write(dir.path().join("config.toml"), config).unwrap();
            Self { dir }
        }

        fn path(&self, name: &str) -> PathBuf {
            self.dir.path().join(name)
        }

        fn package<C: AsRef<[u8]>>(&self, name: &str, entries: &[(&str, C)]) -> PathBuf {
            let path = self.path(name);
            fs::write(&path, zip_bytes(entries)).unwrap();
            path
        }

        /// `pyp` using this sandbox's config, running scripts with `sh`
        fn cmd(&self) -> Command {
            let mut cmd = pyp();
            cmd.env("PYP_CONFIG", self.path("config.toml"))
                .env("PYP_PYTHON", "sh");
            cmd
        }

        fn temp_is_empty(&self) -> bool {
            fs::read_dir(self.path("tmp")).unwrap().next().is_none()
        }
    }

    fn zip_bytes<C: AsRef<[u8]>>(entries: &[(&str, C)]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (entry, contents) in entries {
            zip.start_file(*entry, SimpleFileOptions::default()).unwrap();
            zip.write_all(contents.as_ref()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    fn shell_path(path: &Path) -> String {
        path.display().to_string()
    }

    #[test]
    fn help_displays() {
        pyp()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("portable package launcher"));
    }

    #[test]
    fn version_displays() {
        pyp()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("pyp"));
    }

    #[test]
    fn config_path_honours_flag() {
        let sandbox = Sandbox::new();
        pyp()
            .args(["--config"])
            .arg(sandbox.path("config.toml"))
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[launcher]"))
            .stdout(predicate::str::contains("digest = \"md5\""));
    }

    #[test]
    fn invalid_config_fails() {
        let sandbox = Sandbox::new();
        fs::write(sandbox.path("config.toml"), "[launcher\n").unwrap();
        sandbox
            .cmd()
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn cache_list_empty() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["cache", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No cache directories found"));
    }

    #[test]
    fn run_missing_package_fails() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .arg("run")
            .arg(sandbox.path("absent.pyp"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("Path not found"));
    }

    #[test]
    fn run_corrupt_package_fails_without_temp_state() {
        let sandbox = Sandbox::new();
        let package = sandbox.path("corrupt.pyp");
        fs::write(&package, "this is not a zip archive").unwrap();

        sandbox
            .cmd()
            .arg("run")
            .arg(&package)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid package archive"));
        assert!(sandbox.temp_is_empty());
    }

    #[test]
    fn run_without_entry_script_fails_and_cleans_up() {
        let sandbox = Sandbox::new();
        let package = sandbox.package("noscript.pyp", &[("readme.txt", "hello")]);

        sandbox
            .cmd()
            .arg(&package)
            .assert()
            .failure()
            .stderr(predicate::str::contains("script.py not found"));
        assert!(sandbox.temp_is_empty());
    }

    #[test]
    fn run_without_package_or_terminal_is_cancelled() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .arg("run")
            .assert()
            .success()
            .stdout(predicate::str::contains("No file selected."));
    }

    #[cfg(unix)]
    #[test]
    fn run_executes_script_caches_side_files_and_cleans_up() {
        let sandbox = Sandbox::new();
        let marker = sandbox.path("marker.txt");
        let script = format!("cat data.txt > '{}'\n", shell_path(&marker));
        let package = sandbox.package(
            "demo.pyp",
            &[("script.py", script.as_str()), ("data.txt", "side file\n")],
        );

        sandbox.cmd().arg("run").arg(&package).assert().success();

        assert_eq!(fs::read_to_string(&marker).unwrap(), "side file\n");
        assert!(sandbox.temp_is_empty());

        sandbox
            .cmd()
            .args(["cache", "list", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains(shell_path(&sandbox.path("cache"))));

        let caches: Vec<_> = fs::read_dir(sandbox.path("cache"))
            .unwrap()
            .filter_map(Result::ok)
            .collect();
        assert_eq!(caches.len(), 1);
        assert_eq!(caches[0].file_name().len(), 32);
        assert!(caches[0].path().join("data.txt").exists());
        assert!(!caches[0].path().join("script.py").exists());
    }

    #[cfg(unix)]
    #[test]
    fn cache_path_matches_run() {
        let sandbox = Sandbox::new();
        let package = sandbox.package(
            "demo.pyp",
            &[("script.py", "true\n"), ("data.txt", "side\n")],
        );

        let assert = sandbox
            .cmd()
            .args(["cache", "path"])
            .arg(&package)
            .assert()
            .success();
        let printed = String::from_utf8_lossy(&assert.get_output().stdout)
            .trim()
            .to_string();

        sandbox.cmd().arg("run").arg(&package).assert().success();
        assert!(Path::new(&printed).join("data.txt").exists());
        assert!(sandbox.temp_is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn dependencies_are_on_module_path() {
        let sandbox = Sandbox::new();
        let marker = sandbox.path("paths.txt");
        let script = format!(
            "echo \"$PYTHONPATH\" > '{m}'\nls \"${{PYTHONPATH%%:*}}\" >> '{m}'\n",
            m = shell_path(&marker)
        );
        let wheel = zip_bytes(&[("helper/__init__.py", "VALUE = 1\n")]);
        let package = sandbox.package(
            "deps.pyp",
            &[
                ("script.py", script.into_bytes()),
                ("modules/helper-1.0-py3-none-any.whl", wheel),
            ],
        );

        sandbox
            .cmd()
            .arg("run")
            .arg(&package)
            .assert()
            .success()
            .stdout(predicate::str::contains("Installing: helper-1.0-py3-none-any.whl"));

        let output = fs::read_to_string(&marker).unwrap();
        let mut lines = output.lines();
        assert!(lines.next().unwrap().contains("site-packages"));
        assert!(lines.any(|line| line == "helper"));
        assert!(sandbox.temp_is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn failing_script_still_exits_zero() {
        let sandbox = Sandbox::new();
        let package = sandbox.package("fail.pyp", &[("script.py", "exit 3\n")]);

        sandbox.cmd().arg("run").arg(&package).assert().success();
        assert!(sandbox.temp_is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn sigint_during_extraction_cleans_up() {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;
        use std::os::unix::process::ExitStatusExt;
        use std::time::Duration;

        let sandbox = Sandbox::new();
        let chunk = vec![0u8; 4 * 1024 * 1024];
        let mut entries: Vec<(String, &[u8])> = (0..32)
            .map(|i| (format!("data/blob{:02}.bin", i), chunk.as_slice()))
            .collect();
        entries.push(("script.py".to_string(), b"exit 0\n".as_slice()));
        let entries: Vec<(&str, &[u8])> =
            entries.iter().map(|(name, data)| (name.as_str(), *data)).collect();
        let package = sandbox.package("big.pyp", &entries);

        let mut child = std::process::Command::new(env!("CARGO_BIN_EXE_pyp"))
            .env("PYP_CONFIG", sandbox.path("config.toml"))
            .env("PYP_PYTHON", "sh")
            .arg("run")
            .arg(&package)
            .spawn()
            .unwrap();

        std::thread::sleep(Duration::from_millis(300));
        // The launch may already be over; a missing process is fine
        let _ = kill(Pid::from_raw(child.id() as i32), Signal::SIGINT);
        let status = child.wait().unwrap();

        match status.code() {
            Some(code) => assert!(code == 0 || code == 130, "unexpected exit {}", code),
            // Signalled before the launch started watching for Ctrl-C
            None => assert_eq!(status.signal(), Some(Signal::SIGINT as i32)),
        }
        assert!(sandbox.temp_is_empty());
    }

    #[test]
    fn unknown_command_fails() {
        pyp().args(["cache", "nonexistent"]).assert().failure();
    }
}
