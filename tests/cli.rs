use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

fn echomon() -> Command {
    Command::cargo_bin("echomon").expect("binary exists")
}

#[test]
fn echomon_runs_to_completion() {
    let mut cmd = echomon();
    cmd.arg("-c").arg("help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("24 102.5"))
        .stdout(predicate::str::contains("stopped").not());
}

#[test]
fn echomon_evaluates_at_a_breakpoint() {
    let mut cmd = echomon();
    cmd.args(["--break", "12", "-c", "x x", "-c", "x x + 1", "-c", "continue"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("stopped at line 12 (breakpoint), frame 1"))
        .stdout(predicate::str::contains("(INT) 24"))
        .stdout(predicate::str::contains("(INT) 25"))
        .stdout(predicate::str::contains("24 102.5"));
}

#[test]
fn echomon_skips_breakpoints_whose_guard_is_false() {
    let mut cmd = echomon();
    cmd.args(["--break", "12 if x > 30", "-c", "continue"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("24 102.5"))
        .stdout(predicate::str::contains("stopped").not());
}

#[test]
fn echomon_reports_unrecognised_commands() {
    let mut cmd = echomon();
    cmd.args(["--interrupt", "-c", "frobnicate", "-c", "continue"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("unrecognised command `frobnicate`"));
}

#[test]
fn echomon_reads_a_command_script() {
    let dir = tempdir().expect("create temp dir");
    let script = dir.path().join("session.txt");
    fs::write(&script, "where\nstep\ncontinue\n").expect("write script");

    let mut cmd = echomon();
    cmd.arg("--interrupt").arg("--script").arg(&script);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("line 2 of demo, frame 1"))
        .stdout(predicate::str::contains("stopped at line 3 (temporary breakpoint)"));
}

#[test]
fn echomon_uses_the_given_prompt() {
    let mut cmd = echomon();
    cmd.args(["--prompt", "dbg> ", "--interrupt", "-c", "continue"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("dbg> continue"));
}

#[test]
fn echomon_quit_exits_with_failure() {
    let mut cmd = echomon();
    cmd.args(["--interrupt", "-c", "quit", "-c", "y"]);
    cmd.assert()
        .code(1)
        .stdout(predicate::str::contains("24 102.5").not());
}

#[test]
fn echomon_stops_on_runtime_errors() {
    let mut cmd = echomon();
    cmd.args(["--iterations", "21", "-c", "calls 1", "-c", "quit", "-c", "y"]);
    cmd.assert()
        .code(1)
        .stdout(predicate::str::contains("RuntimeAccess: integer overflow"))
        .stdout(predicate::str::contains("frame 3: routine `fact` at line 4"));
}

#[test]
fn echomon_rejects_lines_without_units() {
    let mut cmd = echomon();
    cmd.args(["--break", "11", "-c", "continue"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("no interruptible unit at line 11"));
}
