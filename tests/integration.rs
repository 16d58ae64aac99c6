use predicates::prelude::*;
use std::process::Command;
use tempfile::TempDir;

fn cmd() -> assert_cmd::Command {
    assert_cmd::Command::from(Command::new(env!("CARGO_BIN_EXE_markdoc")))
}

fn fixture_path(name: &str) -> String {
    format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
}

fn manifest() -> String {
    fixture_path("billing/markdoc.toml")
}

// -- output directory --

#[test]
fn writes_one_page_per_documented_subject() {
    let dir = TempDir::new().unwrap();

    cmd()
        .args(["-c", &manifest(), "-o", dir.path().to_str().unwrap()])
        .assert()
        .success();

    let invoice = std::fs::read_to_string(dir.path().join("billing/invoice.md")).unwrap();
    assert!(invoice.starts_with("# Invoice < [Document](Billing::Document)\n"));
    assert!(invoice.contains("## A\nThis is 2\n"));
    assert!(dir.path().join("billing/document.md").exists());
    assert!(dir.path().join("billing/credit_note.md").exists());
}

#[test]
fn empty_pages_are_not_written() {
    let dir = TempDir::new().unwrap();

    cmd()
        .args(["-c", &manifest(), "-o", dir.path().to_str().unwrap()])
        .assert()
        .success();

    assert!(!dir.path().join("billing.md").exists());
}

#[test]
fn rerun_leaves_output_identical() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().to_str().unwrap();

    cmd().args(["-c", &manifest(), "-o", out]).assert().success();
    let first = std::fs::read_to_string(dir.path().join("billing/invoice.md")).unwrap();
    cmd().args(["-c", &manifest(), "-o", out, "-j", "1"]).assert().success();
    let second = std::fs::read_to_string(dir.path().join("billing/invoice.md")).unwrap();
    assert_eq!(first, second);
}

// -- stdout mode --

#[test]
fn stdout_prints_pages() {
    cmd()
        .args(["-c", &manifest(), "--stdout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("# Invoice"))
        .stdout(predicate::str::contains("Total is 120 using [A](#a)."));
}

#[test]
fn method_filter_limits_output() {
    cmd()
        .args(["-c", &manifest(), "--stdout", "--method", "Billing::Invoice#a"])
        .assert()
        .success()
        .stdout(predicate::str::contains("This is 2"))
        .stdout(predicate::str::contains("Builds one.").not());
}

// -- errors --

#[test]
fn missing_manifest_fails() {
    let dir = TempDir::new().unwrap();

    cmd()
        .args(["-c", dir.path().join("nope.toml").to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load manifest"));
}

#[test]
fn malformed_method_filter_fails() {
    cmd()
        .args(["-c", &manifest(), "--stdout", "--method", "Owner::Name"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "method_reference is formatted incorrectly: 'Owner::Name'",
        ));
}

#[test]
fn unqualified_method_filter_fails() {
    cmd()
        .args(["-c", &manifest(), "--stdout", "--method", "#total"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must name its owner"));
}

#[test]
fn template_failure_reports_location() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("lib")).unwrap();
    std::fs::write(
        dir.path().join("lib/broken.rb"),
        "class Broken\n  #=mark_doc\n  # <%= 1 + %>\n  #=mark_end\n  def oops\n  end\nend\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("markdoc.toml"),
        "[discover]\ninclude = [\"lib/*.rb\"]\n",
    )
    .unwrap();

    cmd()
        .args(["-c", dir.path().join("markdoc.toml").to_str().unwrap(), "--stdout"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("documentation run failed"))
        .stderr(predicate::str::contains("lib/broken.rb:3:in `oops'"));
}
