use assert_cmd::Command;

#[test]
fn help_lists_subcommands() {
    let output = Command::cargo_bin("bookshelf-cli")
        .unwrap()
        .arg("--help")
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for subcommand in ["serve", "migrate", "config"] {
        assert!(stdout.contains(subcommand), "missing {subcommand} in help");
    }
}

#[test]
fn config_prints_resolved_settings() {
    let config_dir = std::env::temp_dir().join("bookshelf-cli-no-config");

    let output = Command::cargo_bin("bookshelf-cli")
        .unwrap()
        .arg("config")
        .env("BOOKSHELF_CONFIG_DIR", &config_dir)
        .env("BOOKSHELF_ENV", "local")
        .env("BOOKSHELF_CATALOG__PAGE_SIZE", "12")
        .env("DATABASE_URL", "sqlite::memory:")
        .env_remove("RUST_LOG")
        .output()
        .unwrap();

    assert!(output.status.success());
    let settings: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(settings["catalog"]["page_size"], 12);
    assert_eq!(settings["database"]["url"], "sqlite::memory:");
    assert_eq!(settings["environment"], "local");
}

#[test]
fn migrate_against_memory_database() {
    let output = Command::cargo_bin("bookshelf-cli")
        .unwrap()
        .arg("migrate")
        .env("BOOKSHELF_CONFIG_DIR", std::env::temp_dir().join("bookshelf-cli-no-config"))
        .env("DATABASE_URL", "sqlite::memory:")
        .env("BOOKSHELF_DATABASE__MAX_CONNECTIONS", "1")
        .output()
        .unwrap();

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("applied 1 migration(s)"));
}
