use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn jobshelf(home: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("jobshelf");
    cmd.current_dir(home)
        .env("JOBSHELF_HOME", home)
        .env("JOBSHELF_STORE", "fs")
        .env("JOBSHELF_STORE_DIR", home.join("bucket"))
        .env_remove("JOBSHELF_BUCKET")
        .env_remove("BUCKET_NAME")
        .env_remove("JOBSHELF_SOURCE_TAG");
    cmd
}

fn seed(home: &Path, key: &str, body: &str) {
    let path = home.join("bucket").join(key);
    fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    fs::write(path, body).expect("seed object");
}

#[test]
fn browse_lists_day_and_month_scopes() {
    let tmp = tempdir().expect("tempdir");
    seed(
        tmp.path(),
        "jobs/year=2024/month=03/day=05/justjoinit_2024-03-05.jsonl",
        "{\"slug\":\"a\"}\n",
    );
    seed(
        tmp.path(),
        "jobs/year=2024/month=03/day=07/justjoinit_2024-03-07.jsonl",
        "{\"slug\":\"b\"}\n",
    );
    seed(tmp.path(), "jobs/year=2024/month=03/day=05/notes.bin", "x");

    jobshelf(tmp.path())
        .args(["browse", "--date", "2024-03-05"])
        .assert()
        .success()
        .stdout(predicate::str::contains("justjoinit_2024-03-05.jsonl"))
        .stdout(predicate::str::contains("2024-03-07").not())
        .stdout(predicate::str::contains("notes.bin").not());

    let out = jobshelf(tmp.path())
        .args(["--json", "browse", "--date", "2024-03-05", "--scope", "month"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let report: Value = serde_json::from_slice(&out).expect("json report");
    assert_eq!(report["data"]["prefix"], "jobs/year=2024/month=03/");
    assert_eq!(report["data"]["keys"].as_array().expect("keys").len(), 2);
}

#[test]
fn show_renders_jsonl_rows_and_reports_missing_keys() {
    let tmp = tempdir().expect("tempdir");
    let key = "jobs/year=2024/month=03/day=05/justjoinit_2024-03-05.jsonl";
    seed(tmp.path(), key, "{\"slug\":\"a\"}\n{broken\n");

    let out = jobshelf(tmp.path())
        .args(["--json", "show", key])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let report: Value = serde_json::from_slice(&out).expect("json report");
    assert_eq!(report["data"]["kind"], "json_lines");
    assert_eq!(report["data"]["content"][0]["slug"], "a");
    assert_eq!(report["data"]["content"][1]["raw"], "{broken");

    jobshelf(tmp.path())
        .args(["show", "jobs/year=2024/month=03/day=06/missing.jsonl"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("issue:"));
}

#[test]
fn status_reports_fs_backend_and_free_lock() {
    let tmp = tempdir().expect("tempdir");
    jobshelf(tmp.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("store.backend=fs"))
        .stdout(predicate::str::contains("env.JOBSHELF_STORE=set"))
        .stdout(predicate::str::contains("ingest.lock=free"));
}
