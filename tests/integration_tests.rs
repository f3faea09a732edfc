//! Process-level integration tests for the `den` binary: script mode,
//! `-c`, pipelines, redirections, logical operators, and built-in exit
//! codes, driven with `assert_cmd`/`predicates` the way the teacher's own
//! `Cargo.toml` dev-dependencies are set up for (even though the teacher's
//! own suite never spawns its binary, preferring in-process `eval`).

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

fn den() -> Command {
    Command::cargo_bin("den").unwrap()
}

#[test]
fn variable_glob_and_quote_expansion() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "").unwrap();
    fs::write(dir.path().join("b.txt"), "").unwrap();

    den()
        .current_dir(dir.path())
        .env("HOME", dir.path())
        .env("NAME", "world")
        .arg("-c")
        .arg(r#"echo "hello $NAME" *.txt"#)
        .assert()
        .success()
        .stdout("hello world a.txt b.txt\n");
}

#[test]
fn pipeline_with_redirect_writes_truncated_output() {
    let dir = tempdir().unwrap();
    den()
        .current_dir(dir.path())
        .env("HOME", dir.path())
        .arg("-c")
        .arg(r#"printf "a\nb\nc\n" | head -n 2 > out.txt"#)
        .assert()
        .success();

    let contents = fs::read_to_string(dir.path().join("out.txt")).unwrap();
    assert_eq!(contents, "a\nb\n");
}

#[test]
fn logical_and_short_circuits_on_failure() {
    let dir = tempdir().unwrap();
    den()
        .current_dir(dir.path())
        .env("HOME", dir.path())
        .arg("-c")
        .arg("false && echo yes ; echo done")
        .assert()
        .success()
        .stdout("done\n");
}

#[test]
fn logical_or_runs_fallback_on_failure() {
    let dir = tempdir().unwrap();
    den()
        .current_dir(dir.path())
        .env("HOME", dir.path())
        .arg("-c")
        .arg("false || echo fallback")
        .assert()
        .success()
        .stdout("fallback\n");
}

#[test]
fn pipeline_exit_code_is_last_stage() {
    let dir = tempdir().unwrap();
    den()
        .current_dir(dir.path())
        .env("HOME", dir.path())
        .arg("-c")
        .arg("true | false | true")
        .assert()
        .success();
}

#[test]
fn command_not_found_exits_127() {
    let dir = tempdir().unwrap();
    den()
        .current_dir(dir.path())
        .env("HOME", dir.path())
        .arg("-c")
        .arg("this-command-does-not-exist-zzz")
        .assert()
        .code(127);
}

#[test]
fn script_mode_runs_each_non_comment_line() {
    let dir = tempdir().unwrap();
    let script = dir.path().join("script.den");
    fs::write(&script, "# a comment\necho one\n\necho two\n").unwrap();

    den()
        .env("HOME", dir.path())
        .arg(script.to_str().unwrap())
        .assert()
        .success()
        .stdout("one\ntwo\n");
}

#[test]
fn script_positional_params_are_set_from_argv() {
    let dir = tempdir().unwrap();
    let script = dir.path().join("script.den");
    fs::write(&script, "echo $0 $1 $2\n").unwrap();

    den()
        .env("HOME", dir.path())
        .arg(script.to_str().unwrap())
        .arg("first")
        .arg("second")
        .assert()
        .success()
        .stdout(predicate::str::ends_with("first second\n"));
}

#[test]
fn test_builtin_unary_and_binary_predicates() {
    let dir = tempdir().unwrap();
    den()
        .current_dir(dir.path())
        .env("HOME", dir.path())
        .arg("-c")
        .arg("test 5 -lt 9")
        .assert()
        .success();

    den()
        .current_dir(dir.path())
        .env("HOME", dir.path())
        .arg("-c")
        .arg("test -z nonempty")
        .assert()
        .code(1);
}

#[test]
fn cd_updates_pwd_for_subsequent_commands() {
    let dir = tempdir().unwrap();
    let sub = dir.path().join("sub");
    fs::create_dir(&sub).unwrap();

    den()
        .current_dir(dir.path())
        .env("HOME", dir.path())
        .arg("-c")
        .arg("cd sub ; pwd")
        .assert()
        .success()
        .stdout(predicate::str::ends_with("sub\n"));
}

#[test]
fn export_makes_variable_visible_to_children() {
    let dir = tempdir().unwrap();
    den()
        .current_dir(dir.path())
        .env("HOME", dir.path())
        .arg("-c")
        .arg("export GREETING=hi ; printenv GREETING")
        .assert()
        .success()
        .stdout("hi\n");
}

#[test]
fn alias_expands_only_command_name() {
    let dir = tempdir().unwrap();
    den()
        .current_dir(dir.path())
        .env("HOME", dir.path())
        .arg("-c")
        .arg("alias greet='echo hi' ; greet there")
        .assert()
        .success()
        .stdout("hi there\n");
}

#[test]
fn background_job_reports_job_id_and_pid() {
    let dir = tempdir().unwrap();
    den()
        .current_dir(dir.path())
        .env("HOME", dir.path())
        .arg("-c")
        .arg("sleep 0.1 &")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("[1] "));
}

#[test]
fn brace_expansion_runs_before_glob_expansion() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a1.txt"), "").unwrap();
    fs::write(dir.path().join("a2.txt"), "").unwrap();

    den()
        .current_dir(dir.path())
        .env("HOME", dir.path())
        .arg("-c")
        .arg("echo a{1,2}.txt")
        .assert()
        .success()
        .stdout("a1.txt a2.txt\n");
}

#[test]
fn single_quoted_braces_are_not_expanded() {
    let dir = tempdir().unwrap();
    den()
        .current_dir(dir.path())
        .env("HOME", dir.path())
        .arg("-c")
        .arg("echo '{a,b}'")
        .assert()
        .success()
        .stdout("{a,b}\n");
}

#[test]
fn quoted_glob_patterns_stay_literal() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "").unwrap();

    den()
        .current_dir(dir.path())
        .env("HOME", dir.path())
        .arg("-c")
        .arg(r#"echo '*.txt' "*.txt""#)
        .assert()
        .success()
        .stdout("*.txt *.txt\n");
}

#[test]
fn underscore_variable_holds_last_argument_of_previous_command() {
    let dir = tempdir().unwrap();
    den()
        .current_dir(dir.path())
        .env("HOME", dir.path())
        .arg("-c")
        .arg("echo one two ; echo $_")
        .assert()
        .success()
        .stdout("one two\ntwo\n");
}

#[test]
fn history_builtin_lists_recorded_commands() {
    let dir = tempdir().unwrap();
    let script = dir.path().join("script.den");
    fs::write(&script, "echo one\nhistory\n").unwrap();

    den()
        .env("HOME", dir.path())
        .arg(script.to_str().unwrap())
        .assert()
        .success();
}

#[test]
fn help_flag_prints_usage() {
    den()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("USAGE"));
}

#[test]
fn version_flag_prints_version() {
    den()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("den "));
}
