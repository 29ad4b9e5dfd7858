//! Integration tests for the kcq binary

use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

const CLIPPINGS: &str = "\u{feff}Meditations (Marcus Aurelius)
- Your Highlight on Location 482-483 | Added on Tuesday, April 3, 2018 9:14:12 PM

Memento mori.
==========
The Tragedy of Hamlet (William Shakespeare)
- Your Highlight on page 12 | Location 1200 | Added on Monday, January 1, 2018 8:00:00 AM

To be, or not to be
==========
";

/// Runs kcq with HOME and the config dir pointed at `home`.
fn run_kcq(home: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_kcq"))
        .args(args)
        .current_dir(home)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env("NO_COLOR", "1")
        .env_remove("KCQ_CLIPPINGS_PATH")
        .env_remove("KCQ_DEVICE_PATH")
        .output()
        .expect("Failed to execute kcq");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let exit_code = output.status.code().unwrap_or(-1);

    (stdout, stderr, exit_code)
}

fn setup(content: &str) -> (TempDir, String) {
    let home = TempDir::new().unwrap();
    let path = home.path().join("My Clippings.txt");
    std::fs::write(&path, content).unwrap();
    let path = path.display().to_string();
    (home, path)
}

#[test]
fn prints_all_clippings_in_file_order() {
    let (home, path) = setup(CLIPPINGS);

    let (stdout, _stderr, exit_code) = run_kcq(home.path(), &["-p", &path]);

    assert_eq!(exit_code, 0);
    assert_eq!(
        stdout,
        "\"0\",\"Meditations\",\"Marcus Aurelius\",\"482\",\"483\",\"2018-04-03 21:14\",\"Memento mori.\"\n\
         \"1\",\"The Tragedy of Hamlet\",\"William Shakespeare\",\"1200\",\"1200\",\"2018-01-01 08:00\",\"To be, or not to be\"\n"
    );
}

#[test]
fn sorts_ascending_and_renumbers() {
    let (home, path) = setup(CLIPPINGS);

    let (stdout, _stderr, exit_code) = run_kcq(home.path(), &["-p", &path, "-s", "-f", "#,title"]);

    assert_eq!(exit_code, 0);
    assert_eq!(stdout, "\"0\",\"The Tragedy of Hamlet\"\n\"1\",\"Meditations\"\n");
}

#[test]
fn author_query_filters() {
    let (home, path) = setup(CLIPPINGS);

    let (stdout, _stderr, _) = run_kcq(home.path(), &["-p", &path, "-a", "SHAKESPEARE", "-f", "title"]);
    assert_eq!(stdout, "\"The Tragedy of Hamlet\"\n");

    let (stdout, _stderr, exit_code) = run_kcq(home.path(), &["-p", &path, "-a", "tolstoy"]);
    assert_eq!(exit_code, 0);
    assert_eq!(stdout, "");
}

#[test]
fn color_always_highlights_match() {
    let (home, path) = setup(CLIPPINGS);

    let (stdout, _stderr, _) = run_kcq(
        home.path(),
        &["-p", &path, "-q", "mori", "-f", "highlightText", "--color", "always"],
    );

    assert!(stdout.contains("\x1b[30;103mmori\x1b[0m"));
}

#[test]
fn malformed_title_exits_1_without_output() {
    let (home, path) = setup(&format!("{}Untitled\n", CLIPPINGS));

    let (stdout, stderr, exit_code) = run_kcq(home.path(), &["-p", &path]);

    assert_eq!(exit_code, 1);
    assert!(stdout.is_empty());
    assert!(stderr.contains("Line 11"));
    assert!(stderr.contains("Untitled"));
}

#[test]
fn invalid_regex_exits_1() {
    let (home, path) = setup(CLIPPINGS);

    let (stdout, stderr, exit_code) = run_kcq(home.path(), &["-p", &path, "-q", "("]);

    assert_eq!(exit_code, 1);
    assert!(stdout.is_empty());
    assert!(stderr.contains("Invalid"));
}

#[test]
fn missing_file_exits_1() {
    let home = TempDir::new().unwrap();

    let (_stdout, stderr, exit_code) = run_kcq(home.path(), &["-p", "/nonexistent/clips.txt"]);

    assert_eq!(exit_code, 1);
    assert!(stderr.contains("/nonexistent/clips.txt"));
}

#[test]
fn conflicting_sort_flags_exit_2() {
    let (home, path) = setup(CLIPPINGS);

    let (_stdout, _stderr, exit_code) = run_kcq(home.path(), &["-p", &path, "-s", "-S"]);

    assert_eq!(exit_code, 2);
}

#[test]
fn completions_flag_prints_script() {
    let home = TempDir::new().unwrap();

    let (stdout, _stderr, exit_code) = run_kcq(home.path(), &["--completions", "bash"]);

    assert_eq!(exit_code, 0);
    assert!(stdout.contains("kcq"));
}

#[cfg(target_os = "linux")]
#[test]
fn first_run_bootstraps_config_and_zsh_completion() {
    let (home, path) = setup(CLIPPINGS);

    let (_stdout, _stderr, exit_code) = run_kcq(home.path(), &["-p", &path]);

    assert_eq!(exit_code, 0);
    assert!(home.path().join(".config/kcq/config.toml").exists());
    assert!(home.path().join(".config/zsh/completions/_kcq").exists());
}

#[test]
fn unusable_config_dir_still_queries() {
    let (home, path) = setup(CLIPPINGS);
    let blocker = home.path().join("blocker");
    std::fs::write(&blocker, "not a directory").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_kcq"))
        .args(["-p", path.as_str(), "-f", "title"])
        .current_dir(home.path())
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", &blocker)
        .env("NO_COLOR", "1")
        .output()
        .expect("Failed to execute kcq");

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "\"Meditations\"\n\"The Tragedy of Hamlet\"\n"
    );
}

#[test]
fn blank_line_after_last_delimiter_is_accepted() {
    let (home, path) = setup(&format!("{}\n", CLIPPINGS));

    let (stdout, _stderr, exit_code) = run_kcq(home.path(), &["-p", &path, "-f", "#"]);

    assert_eq!(exit_code, 0);
    assert_eq!(stdout, "\"0\"\n\"1\"\n");
}

#[test]
fn bad_combined_query_is_reported_as_combined() {
    let (home, path) = setup(CLIPPINGS);

    let (_stdout, stderr, exit_code) = run_kcq(home.path(), &["-p", &path, "-q", "("]);

    assert_eq!(exit_code, 1);
    assert!(stderr.contains("Invalid combined (-q) query '('"));
}
