//! Integration tests for ihpp

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::Path;
    use tempfile::TempDir;

    /// sha256("GET\nhttps://x/y\nA:1\n\n1000")
    const FIXTURE_FINGERPRINT: &str =
        "6cfb130c15261a60f49bcb7dcc5a36155f4a0f9fa48de6cb2166215ae3ba3b04";

    fn ihpp() -> Command {
        cargo_bin_cmd!("ihpp")
    }

    /// Command isolated from the user's config and cache
    fn ihpp_in(dir: &Path) -> Command {
        let config = dir.join("config.toml");
        std::fs::write(
            &config,
            format!(
                "[cache]\nstore_path = {:?}\n\n[server]\napi_url = \"http://127.0.0.1:9\"\nrequest_timeout_secs = 2\n",
                dir.join("responses.db").display().to_string()
            ),
        )
        .unwrap();

        let mut cmd = ihpp();
        cmd.env("IHPP_CONFIG", &config);
        cmd
    }

    #[test]
    fn help_displays() {
        ihpp()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("HTTP inspector client"));
    }

    #[test]
    fn version_displays() {
        ihpp()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("ihpp"));
    }

    #[test]
    fn config_path_honours_env() {
        let temp = TempDir::new().unwrap();
        ihpp_in(temp.path())
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let temp = TempDir::new().unwrap();
        ihpp_in(temp.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[server]"))
            .stdout(predicate::str::contains("http://127.0.0.1:9"));
    }

    #[test]
    fn config_init_refuses_to_overwrite() {
        let temp = TempDir::new().unwrap();
        ihpp_in(temp.path())
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("already exists"));
    }

    #[test]
    fn invalid_config_is_reported() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("config.toml");
        std::fs::write(&config, "[general]\nlog_format = \"xml\"\n").unwrap();

        ihpp()
            .env("IHPP_CONFIG", &config)
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn hash_prints_fingerprint() {
        let temp = TempDir::new().unwrap();
        ihpp_in(temp.path())
            .args(["hash", "GET", "https://x/y", "-H", "A: 1", "--timestamp", "1000"])
            .assert()
            .success()
            .stdout(format!("{}\n", FIXTURE_FINGERPRINT));
    }

    #[test]
    fn hash_ignores_header_order() {
        let temp = TempDir::new().unwrap();
        let first = ihpp_in(temp.path())
            .args(["hash", "GET", "https://x/y", "-H", "A: 1", "-H", "B: 2", "-t", "7"])
            .output()
            .unwrap();
        let second = ihpp_in(temp.path())
            .args(["hash", "GET", "https://x/y", "-H", "B: 2", "-H", "A: 1", "-t", "7"])
            .output()
            .unwrap();

        assert!(first.status.success());
        assert_eq!(first.stdout, second.stdout);
    }

    #[test]
    fn hash_rejects_malformed_header() {
        ihpp()
            .args(["hash", "GET", "https://x/y", "-H", "no-colon", "-t", "0"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Key: Value"));
    }

    #[test]
    fn hash_without_timestamp_is_rejected() {
        ihpp()
            .args(["hash", "GET", "https://x/y"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("--timestamp"));
    }

    #[test]
    fn send_runs_when_store_is_unusable() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("plain-file");
        std::fs::write(&blocker, "").unwrap();
        let config = temp.path().join("config.toml");
        std::fs::write(
            &config,
            format!(
                "[cache]\nstore_path = {:?}\n\n[server]\napi_url = \"http://127.0.0.1:9\"\nrequest_timeout_secs = 2\n",
                blocker.join("responses.db").display().to_string()
            ),
        )
        .unwrap();

        // The relay call is still made and its outcome reported
        ihpp()
            .env("IHPP_CONFIG", &config)
            .args(["send", "GET", "https://x/y", "--format", "json"])
            .assert()
            .failure()
            .stdout(predicate::str::contains("\"fingerprint\""))
            .stdout(predicate::str::contains("\"loading\": false"));
    }

    #[test]
    fn cache_count_starts_empty() {
        let temp = TempDir::new().unwrap();
        ihpp_in(temp.path())
            .args(["cache", "count"])
            .assert()
            .success()
            .stdout(predicate::str::starts_with("0 / 1000"));
    }

    #[test]
    fn show_unknown_fingerprint_fails() {
        let temp = TempDir::new().unwrap();
        ihpp_in(temp.path())
            .args(["show", FIXTURE_FINGERPRINT])
            .assert()
            .failure()
            .stderr(predicate::str::contains("No cached response"));
    }

    #[test]
    fn show_rejects_non_fingerprint() {
        let temp = TempDir::new().unwrap();
        ihpp_in(temp.path())
            .args(["show", "not-a-hash"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("not a fingerprint"));
    }

    #[test]
    fn send_failure_is_cached() {
        let temp = TempDir::new().unwrap();
        // Nothing listens on the discard port, so the relay call fails
        ihpp_in(temp.path())
            .args(["send", "GET", "https://x/y", "--format", "json"])
            .assert()
            .failure()
            .stdout(predicate::str::contains("\"fingerprint\""))
            .stdout(predicate::str::contains("\"loading\": false"));

        ihpp_in(temp.path())
            .args(["cache", "count"])
            .assert()
            .success()
            .stdout(predicate::str::starts_with("1 / 1000"));
    }

    #[test]
    fn cache_clear_with_yes() {
        let temp = TempDir::new().unwrap();
        ihpp_in(temp.path())
            .args(["send", "GET", "https://x/y", "--format", "json"])
            .assert()
            .failure();

        ihpp_in(temp.path())
            .args(["cache", "clear", "--yes"])
            .assert()
            .success();

        ihpp_in(temp.path())
            .args(["cache", "count"])
            .assert()
            .success()
            .stdout(predicate::str::starts_with("0 / 1000"));
    }
}
