use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

fn rentwatch(dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("rentwatch").unwrap();
    cmd.current_dir(dir)
        .env_remove("RW_DATABASE_URL")
        .env_remove("RW_SUPABASE_URL")
        .env_remove("RW_SUPABASE_KEY");
    cmd
}

#[test]
fn missing_database_url_exits_1() {
    let dir = tempfile::tempdir().unwrap();
    rentwatch(dir.path())
        .arg("reconcile")
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("SECRETS_MISSING backend=postgres"))
        .stderr(predicate::str::contains("RW_DATABASE_URL"));
}

#[test]
fn rest_backend_names_its_own_env_vars() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("rest.yaml"), "store:\n  backend: rest\n").unwrap();
    rentwatch(dir.path())
        .args(["--config", "rest.yaml", "reconcile"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("SECRETS_MISSING backend=rest"))
        .stderr(predicate::str::contains("RW_SUPABASE_URL"));
}

#[test]
fn invalid_settings_exit_1() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("bad.yaml"), "reconcile:\n  workers: 0\n").unwrap();
    rentwatch(dir.path())
        .args(["--config", "bad.yaml", "reconcile"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("reconcile.workers"));
}

#[test]
fn unknown_scope_is_a_usage_error_not_exit_2() {
    let dir = tempfile::tempdir().unwrap();
    rentwatch(dir.path())
        .args(["reconcile", "--scope", "everything"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("all | reserved-only"));
}
