//! `tailgram check` exit behavior for valid and broken configuration.

use assert_cmd::Command;

fn check_cmd() -> Command {
    let mut cmd = Command::cargo_bin("tailgram").expect("binary");
    cmd.arg("check");
    // Start from a clean slate so developer environments don't leak in.
    for var in [
        "TELEGRAM_BOT_TOKEN",
        "TELEGRAM_CHAT_ID",
        "LOG_FILES",
        "KEYWORDS",
        "RAW_ONLY_PATTERNS",
        "BLACKOUT_SECONDS",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn check_fails_without_credentials() {
    check_cmd().assert().failure();
}

#[test]
fn check_passes_with_minimal_configuration() {
    let dir = tempfile::tempdir().expect("tempdir");
    let log = dir.path().join("app.log");
    std::fs::write(&log, "seed line\n").expect("write");

    let assert = check_cmd()
        .env("TELEGRAM_BOT_TOKEN", "123:abc")
        .env("TELEGRAM_CHAT_ID", "-100500")
        .env("LOG_FILES", log.display().to_string())
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    assert!(stdout.contains("configuration OK"), "stdout: {stdout}");
    assert!(stdout.contains("blackout: 300s"), "stdout: {stdout}");
}

#[test]
fn check_fails_on_malformed_regex_pattern() {
    check_cmd()
        .env("TELEGRAM_BOT_TOKEN", "123:abc")
        .env("TELEGRAM_CHAT_ID", "-100500")
        .env("LOG_FILES", "app.log")
        .env("KEYWORDS", "re:([unclosed")
        .assert()
        .failure();
}

#[test]
fn check_fails_on_malformed_blackout_seconds() {
    check_cmd()
        .env("TELEGRAM_BOT_TOKEN", "123:abc")
        .env("TELEGRAM_CHAT_ID", "-100500")
        .env("LOG_FILES", "app.log")
        .env("BLACKOUT_SECONDS", "soon")
        .assert()
        .failure();
}
