use std::process::Command;

#[test]
fn init_creates_valid_toml() {
    let dir = tempfile::tempdir().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_sniffbot"))
        .arg("init")
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(output.status.success(), "sniffbot init failed: {}", String::from_utf8_lossy(&output.stderr));

    let config_path = dir.path().join(".sniffbot.toml");
    assert!(config_path.exists(), ".sniffbot.toml should exist");

    let content = std::fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("[phpcs]"));
    assert!(content.contains("[review]"));

    // Everything is commented out, so it parses to the defaults.
    let config: sniffbot_core::SniffConfig = toml::from_str(&content).unwrap();
    assert_eq!(config.llm.max_tokens, 500);
    assert_eq!(config.phpcs.mode, sniffbot_core::LintMode::Inline);
}

#[test]
fn init_refuses_if_exists() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".sniffbot.toml"), "# existing").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_sniffbot"))
        .arg("init")
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
    let content = std::fs::read_to_string(dir.path().join(".sniffbot.toml")).unwrap();
    assert_eq!(content, "# existing");
}
