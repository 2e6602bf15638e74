#![allow(deprecated)] // TODO: cargo_bin → cargo_bin_cmd! へ移行

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// 設定ファイルとセルファイルを置いた作業ディレクトリ
fn workspace(cells: &str) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("dfkernel.yaml"), "dockerfile_name: Dockerfile\n").unwrap();
    fs::write(dir.path().join("cells.dockerfile"), cells).unwrap();
    dir
}

fn dfkernel(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("dfkernel").unwrap();
    cmd.current_dir(dir)
        .env_remove("DFKERNEL_CONFIG_PATH")
        .arg("--config")
        .arg(dir.join("dfkernel.yaml"));
    cmd
}

/// CLIヘルプが正しく表示されることを確認
#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("dfkernel").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("repl"))
        .stdout(predicate::str::contains("directives"))
        .stdout(predicate::str::contains("--context"));
}

#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("dfkernel").unwrap();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("dfkernel"));
}

#[test]
fn test_run_help() {
    let mut cmd = Command::cargo_bin("dfkernel").unwrap();
    cmd.arg("run")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("<FILE>"))
        .stdout(predicate::str::contains("--keep-going"));
}

/// ディレクティブ一覧はデーモン無しで出せる
#[test]
fn test_directives_list() {
    let mut cmd = Command::cargo_bin("dfkernel").unwrap();
    cmd.arg("directives")
        .assert()
        .success()
        .stdout(predicate::str::contains("%arg"))
        .stdout(predicate::str::contains("%context"))
        .stdout(predicate::str::contains("%install"))
        .stdout(predicate::str::contains("%stages"))
        .stdout(predicate::str::contains("%tag"));
}

/// ディレクティブだけのセルはビルドせずに処理される
#[test]
fn test_run_directive_cells() {
    let dir = workspace("%arg VERSION=1.2\n\n%arg ls\n\n%magics\n");
    dfkernel(dir.path())
        .arg("run")
        .arg("cells.dockerfile")
        .assert()
        .success()
        .stdout(predicate::str::contains("Build argument 'VERSION' set to '1.2'"))
        .stdout(predicate::str::contains("\tVERSION=1.2"))
        .stdout(predicate::str::contains("install"));
}

#[test]
fn test_run_json_replies() {
    let dir = workspace("# %%\n%arg A=1\n# %%\n%arg rm A\n");
    let output = dfkernel(dir.path())
        .arg("run")
        .arg("--json")
        .arg("cells.dockerfile")
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let replies: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0]["status"], "ok");
    assert_eq!(replies[1]["messages"][0], "Build argument 'A' removed\n");
}

/// 失敗したセルで止まり、終了コードが失敗になる
#[test]
fn test_run_stops_at_first_error() {
    let dir = workspace("%tag app:v1\n\n%arg A=1\n");
    dfkernel(dir.path())
        .arg("run")
        .arg("cells.dockerfile")
        .assert()
        .failure()
        .stderr(predicate::str::contains("NoImageYet"))
        .stdout(predicate::str::contains("Build argument").not());
}

#[test]
fn test_run_keep_going() {
    let dir = workspace("%tag app:v1\n\n%arg A=1\n");
    dfkernel(dir.path())
        .arg("run")
        .arg("--keep-going")
        .arg("cells.dockerfile")
        .assert()
        .failure()
        .stdout(predicate::str::contains("Build argument 'A' set to '1'"));
}

#[test]
fn test_run_missing_file() {
    let dir = workspace("");
    dfkernel(dir.path())
        .arg("run")
        .arg("missing.dockerfile")
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing.dockerfile"));
}

#[test]
fn test_invalid_config() {
    let dir = workspace("%magics\n");
    fs::write(dir.path().join("dfkernel.yaml"), "dockerfile_name: ../Dockerfile\n").unwrap();
    dfkernel(dir.path())
        .arg("run")
        .arg("cells.dockerfile")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_repl_reads_cells_from_stdin() {
    let dir = workspace("");
    dfkernel(dir.path())
        .arg("repl")
        .write_stdin("%arg A=1\n\n%arg ls A\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Build argument 'A' set to '1'"))
        .stdout(predicate::str::contains("\tA=1"));
}
