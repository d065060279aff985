//! Pre-flight failure paths through the real binary.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn kettle() -> Command {
    Command::cargo_bin("kettle").expect("kettle binary")
}

fn make_layout(root: &Path) {
    let scripting = root
        .join("nt")
        .join("addons")
        .join("sourcemod")
        .join("scripting");
    fs::create_dir_all(scripting.join("include")).unwrap();
    fs::create_dir_all(root.join("nt").join("addons").join("sourcemod").join("plugins")).unwrap();
}

fn write_config(dir: &Path, yaml: &str) -> std::path::PathBuf {
    let path = dir.join("config.yml");
    fs::write(&path, yaml).unwrap();
    path
}

#[test]
fn plaintext_recipe_url_fails_before_any_work() {
    let root = TempDir::new().unwrap();
    make_layout(root.path());
    let config = write_config(
        root.path(),
        "game_dir: nt\nrecipes:\n  - http://recipes.test/main.json\n",
    );

    kettle()
        .arg("run")
        .arg("--config")
        .arg(&config)
        .arg("--root")
        .arg(root.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("https"));

    assert!(
        !root.path().join("kettle_state.json").exists(),
        "no state store written on a pre-flight abort"
    );
}

#[test]
fn missing_config_file_is_reported() {
    let root = TempDir::new().unwrap();
    kettle()
        .arg("run")
        .arg("--config")
        .arg(root.path().join("nope.yml"))
        .arg("--root")
        .arg(root.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load"));
}

#[test]
fn missing_install_layout_is_reported() {
    let root = TempDir::new().unwrap();
    let config = write_config(
        root.path(),
        "game_dir: nt\nrecipes:\n  - https://recipes.test/main.json\n",
    );

    kettle()
        .arg("run")
        .arg("--config")
        .arg(&config)
        .arg("--root")
        .arg(root.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("installation directory missing"));
}

#[test]
fn config_env_var_is_honored() {
    let root = TempDir::new().unwrap();
    let config = write_config(
        root.path(),
        "game_dir: nt\nrecipes:\n  - http://recipes.test/main.json\n",
    );
    make_layout(root.path());

    kettle()
        .env("KETTLE_CONFIG", &config)
        .arg("run")
        .arg("--root")
        .arg(root.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("https"));
}
