// End-to-end runs of the `sjm` binary against synthetic game binaries.
use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use predicates::prelude::*;
use serde_json::Value;
use std::process::Command;

mod util;

use sjismine::core::codec::Dialect;
use util::{KEEPERS, make_game_fixture};

fn sjm(tmp: &assert_fs::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("sjm").expect("bin");
    cmd.current_dir(tmp.path()).env_remove("RUST_LOG");
    cmd
}

fn store_texts(tmp: &assert_fs::TempDir, surviving: bool) -> Vec<String> {
    let raw = std::fs::read(tmp.child(".sjismine/store.json").path()).expect("store");
    let v: Value = serde_json::from_slice(&raw).expect("json");
    v.as_array()
        .expect("array")
        .iter()
        .filter(|r| !surviving || !r["excluded"].as_bool().unwrap_or(false))
        .map(|r| r["text"].as_str().expect("text").to_string())
        .collect()
}

#[test]
fn run_stores_and_culls() {
    let tmp = make_game_fixture();

    sjm(&tmp)
        .args(["run", "game.bin", "--candidates-out", "candidates.txt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Too Short"))
        .stdout(predicate::str::contains("3 translation candidates"));

    let mut all = store_texts(&tmp, false);
    all.sort();
    assert_eq!(all.len(), 5);

    let mut kept = store_texts(&tmp, true);
    kept.sort();
    let mut expected: Vec<String> = KEEPERS.iter().map(|s| s.to_string()).collect();
    expected.sort();
    assert_eq!(kept, expected);

    tmp.child("candidates.txt")
        .assert(predicate::str::contains("こんにちは\nありがとう\nカタカナです\n"));
}

#[test]
fn dry_run_writes_nothing() {
    let tmp = make_game_fixture();

    sjm(&tmp)
        .args(["run", "game.bin", "--dry-run", "--candidates-out", "c.txt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("DRY RUN"));

    tmp.child(".sjismine/store.json").assert(predicate::path::missing());
    tmp.child("c.txt").assert(predicate::path::missing());
}

#[test]
fn extract_then_cull_matches_run() {
    let tmp = make_game_fixture();

    sjm(&tmp).args(["--quiet", "extract", "game.bin"]).assert().success();
    assert_eq!(store_texts(&tmp, true).len(), 5);

    sjm(&tmp)
        .args(["cull", "game.bin", "--explain", "--no-color"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No Character Variety"))
        .stdout(predicate::str::contains("Kept 3 of 5 candidates"));
    assert_eq!(store_texts(&tmp, true).len(), 3);
}

#[test]
fn cull_without_store_fails() {
    let tmp = make_game_fixture();

    sjm(&tmp)
        .args(["cull", "game.bin"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Run `sjm extract` first"));
}

#[test]
fn missing_binary_is_reported() {
    let tmp = assert_fs::TempDir::new().expect("tempdir");

    sjm(&tmp)
        .args(["run", "nope.bin"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read metadata"));
}

#[test]
fn translate_and_export_dictionary() {
    let tmp = make_game_fixture();
    sjm(&tmp).args(["--quiet", "run", "game.bin"]).assert().success();

    tmp.child("reviewed.json")
        .write_str(r#"{"こんにちは": "Hello", "ありがとう": "NNN", "ああああああ": "Aaaah"}"#)
        .expect("write table");

    sjm(&tmp)
        .args(["translate", "--table", "reviewed.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Translated 1 of 3 pending"));

    sjm(&tmp).args(["export", "-o", "dict.txt"]).assert().success();

    let mut expected = b";".to_vec();
    expected.extend(Dialect::ShiftJis.encode("こんにちは").expect("encode"));
    expected.extend_from_slice(b";Hello\n;");
    let written = std::fs::read(tmp.child("dict.txt").path()).expect("dict");
    assert_eq!(written, expected);
}

#[test]
fn second_table_fills_its_own_column() {
    let tmp = make_game_fixture();
    sjm(&tmp).args(["--quiet", "run", "game.bin"]).assert().success();

    tmp.child("first.json")
        .write_str(r#"{"こんにちは": "Hello"}"#)
        .expect("write table");
    tmp.child("second.json")
        .write_str(r#"{"こんにちは": "Hi there", "ありがとう": "Thanks"}"#)
        .expect("write table");

    sjm(&tmp)
        .args(["translate", "--table", "first.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Translated 1 of 3 pending"));
    sjm(&tmp)
        .args(["translate", "--table", "second.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Translated 2 of 3 pending"));

    let raw = std::fs::read(tmp.child(".sjismine/store.json").path()).expect("store");
    let rows: Value = serde_json::from_slice(&raw).expect("json");
    let hello = rows
        .as_array()
        .expect("array")
        .iter()
        .find(|r| r["text"] == "こんにちは")
        .expect("row");
    assert_eq!(hello["translations"]["first"], "Hello");
    assert_eq!(hello["translations"]["second"], "Hi there");
    assert_eq!(hello["best_translation"], "Hello");

    sjm(&tmp).args(["export", "-o", "dict.txt"]).assert().success();

    let mut expected = b";".to_vec();
    expected.extend(Dialect::ShiftJis.encode("ありがとう").expect("encode"));
    expected.extend_from_slice(b";Thanks\n;");
    expected.extend(Dialect::ShiftJis.encode("こんにちは").expect("encode"));
    expected.extend_from_slice(b";Hello\n;");
    let written = std::fs::read(tmp.child("dict.txt").path()).expect("dict");
    assert_eq!(written, expected);
}

#[test]
fn export_without_store_fails() {
    let tmp = assert_fs::TempDir::new().expect("tempdir");

    sjm(&tmp)
        .args(["export"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No candidate store"));
}

#[test]
fn init_refuses_to_overwrite() {
    let tmp = assert_fs::TempDir::new().expect("tempdir");

    sjm(&tmp).arg("init").assert().success();
    tmp.child("sjismine.toml")
        .assert(predicate::str::contains("[heuristics]"))
        .assert(predicate::str::contains("min_length = 3"));

    sjm(&tmp)
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    sjm(&tmp).args(["init", "--force"]).assert().success();
}

#[test]
fn config_file_thresholds_apply() {
    let tmp = make_game_fixture();
    tmp.child("sjismine.toml")
        .write_str("[heuristics]\nmin_length = 6\n")
        .expect("write config");

    sjm(&tmp)
        .args(["--quiet", "run", "game.bin"])
        .assert()
        .success();

    // Only the six-character keeper is long enough
    assert_eq!(store_texts(&tmp, true), vec!["カタカナです".to_string()]);
}

#[test]
fn completions_to_stdout() {
    let tmp = assert_fs::TempDir::new().expect("tempdir");

    sjm(&tmp)
        .args(["completions", "bash", "--stdout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("sjm"));
}
