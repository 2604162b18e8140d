use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

fn tessera() -> Command {
    Command::cargo_bin("tessera").expect("binary built")
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().expect("has parent")).expect("create dirs");
    std::fs::write(path, content).expect("write file");
}

fn two_file_workspace() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    write(
        dir.path(),
        "a.ts",
        "import { bar } from './b';\nexport function foo() {\n  return bar();\n}\n",
    );
    write(dir.path(), "b.ts", "export function bar() {}\n");
    dir
}

#[test]
fn help_lists_subcommands() {
    tessera()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("watch"))
        .stdout(predicate::str::contains("status"));
}

#[test]
fn status_without_init_exits_3() {
    let dir = tempfile::tempdir().expect("tempdir");
    tessera()
        .arg("status")
        .arg(dir.path())
        .assert()
        .code(3)
        .stderr(predicate::str::contains("not initialized"));
}

#[test]
fn init_builds_index_and_status_reports_it() {
    let dir = two_file_workspace();
    tessera()
        .args(["init", "--quiet"])
        .arg(dir.path())
        .assert()
        .success();
    assert!(dir.path().join(".tessera/config.toml").is_file());
    assert!(dir.path().join(".tessera/graph.db").is_file());

    tessera()
        .arg("status")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Files: 2"))
        .stdout(predicate::str::contains("Symbols: 2 total"))
        .stdout(predicate::str::contains("Edges: 2 total"));

    let output = tessera()
        .args(["status", "--json"])
        .arg(dir.path())
        .output()
        .expect("run status");
    assert!(output.status.success());
    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("status prints JSON");
    assert_eq!(value["store"]["total_files"], 2);
    assert_eq!(value["last_index"]["import_edges"], 1);
    assert_eq!(value["last_index"]["call_edges"], 1);
}

#[test]
fn init_twice_requires_force() {
    let dir = two_file_workspace();
    tessera()
        .args(["init", "--no-index"])
        .arg(dir.path())
        .assert()
        .success();
    tessera()
        .args(["init", "--no-index"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
    tessera()
        .args(["init", "--no-index", "--force"])
        .arg(dir.path())
        .assert()
        .success();
}

#[test]
fn malformed_config_exits_2() {
    let dir = two_file_workspace();
    write(dir.path(), ".tessera/config.toml", "[index\nbatch_size = ");
    tessera()
        .arg("index")
        .arg(dir.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("config"));
}

#[test]
fn graph_lists_referenced_symbols() {
    let dir = two_file_workspace();
    tessera()
        .args(["init", "--quiet"])
        .arg(dir.path())
        .assert()
        .success();

    tessera()
        .args(["graph", "--top", "5"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("2 symbols, 2 edges"))
        .stdout(predicate::str::contains("bar"));
}

#[test]
fn index_specific_files() {
    let dir = two_file_workspace();
    tessera()
        .args(["init", "--quiet"])
        .arg(dir.path())
        .assert()
        .success();

    write(dir.path(), "b.ts", "export function bar() {}\nexport function baz() {}\n");
    tessera()
        .current_dir(dir.path())
        .args(["index", "--files", "b.ts"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Indexed 1 of 1 files"));

    tessera()
        .arg("status")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Symbols: 3 total"));
}

#[test]
fn language_restriction_is_saved() {
    let dir = two_file_workspace();
    write(dir.path(), "c.py", "def helper():\n    pass\n");
    tessera()
        .args(["init", "--quiet", "--languages", "python"])
        .arg(dir.path())
        .assert()
        .success();

    let config =
        std::fs::read_to_string(dir.path().join(".tessera/config.toml")).expect("config");
    assert!(config.contains("python"));

    tessera()
        .arg("status")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Files: 1"));
}
