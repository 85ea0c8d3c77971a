use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

fn demo(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos").join(name)
}

fn furc(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("furc").unwrap();
    cmd.current_dir(dir);
    cmd
}

#[test]
fn compiles_add_demo() {
    let tmp_dir = tempfile::tempdir().unwrap();
    furc(tmp_dir.path()).arg(demo("add.fur")).assert().success();

    let ir = fs::read_to_string(tmp_dir.path().join("build/ben.ll")).unwrap();
    assert!(predicate::str::contains("define i64 @add(i32 %p.a, i64 %p.b)").eval(&ir));
    assert!(predicate::str::contains("call i64 @add(i32 %t1, i64 243)").eval(&ir));
    assert!(!tmp_dir.path().join("build/tokens.txt").exists());
    assert!(!tmp_dir.path().join("build/ast.txt").exists());
}

#[test]
fn writes_dumps_on_request() {
    let tmp_dir = tempfile::tempdir().unwrap();
    furc(tmp_dir.path())
        .arg(demo("big.fur"))
        .args(["-tokens", "-ast"])
        .assert()
        .success();

    let tokens = fs::read_to_string(tmp_dir.path().join("build/tokens.txt")).unwrap();
    assert!(tokens.starts_with("1:1+3      Ident(\"fib\")"));
    let ast = fs::read_to_string(tmp_dir.path().join("build/ast.txt")).unwrap();
    assert!(ast.starts_with("function fib(n: int) -> int"));
}

#[test]
fn honours_output_directory() {
    let tmp_dir = tempfile::tempdir().unwrap();
    furc(tmp_dir.path())
        .arg(demo("add.fur"))
        .args(["-o", "out"])
        .assert()
        .success();
    assert!(tmp_dir.path().join("out/ben.ll").exists());
    assert!(!tmp_dir.path().join("build").exists());
}

#[test]
fn rejects_other_extensions() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = tmp_dir.path().join("add.txt");
    fs::write(&path, "main :: -> int { return 0 }\n").unwrap();

    furc(tmp_dir.path())
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected a .fur file"));
}

#[test]
fn semantic_error_is_nonzero_and_writes_nothing() {
    let bad = "main :: -> int {\n    return y\n}\n";
    let tmp_dir = tempfile::tempdir().unwrap();
    let bad_path = tmp_dir.path().join("bad.fur");
    fs::write(&bad_path, bad).unwrap();

    furc(tmp_dir.path())
        .arg("bad.fur")
        .arg("-ast")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("error: undefined: y"))
        .stderr(predicate::str::contains("--> bad.fur:2:12"));
    assert!(!tmp_dir.path().join("build").exists());
}

#[test]
fn parse_error_names_the_rule() {
    let bad = "main :: -> int {\n    return )\n}\n";
    let tmp_dir = tempfile::tempdir().unwrap();
    fs::write(tmp_dir.path().join("bad.fur"), bad).unwrap();

    furc(tmp_dir.path())
        .arg("bad.fur")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unexpected ')' in expression"))
        .stderr(predicate::str::contains("= while parsing return statement"));
}

#[test]
fn invalid_utf8_is_reported() {
    let tmp_dir = tempfile::tempdir().unwrap();
    fs::write(tmp_dir.path().join("bad.fur"), b"main :: \xff").unwrap();

    furc(tmp_dir.path())
        .arg("bad.fur")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid UTF-8 encoding"));
}
