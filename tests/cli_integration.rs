//! Integration tests for the codeblocks CLI
//!
//! Drives the built binary for tree, print, check and edit.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const JAVA: &str = r#"package demo;

public class Greeter {
    private String name = "world";

    public String hello() {
        return "Hello " + name;
    }

    public String bye() {
        return "Bye " + name;
    }
}
"#;

const PYTHON: &str = r#"import os


def main():
    print(os.getcwd())
"#;

/// Helper to create a test workspace with a few source files
fn setup_test_workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("Greeter.java"), JAVA).unwrap();
    fs::write(dir.path().join("main.py"), PYTHON).unwrap();

    let skipped = dir.path().join("target");
    fs::create_dir(&skipped).unwrap();
    fs::write(skipped.join("Broken.java"), "class {{{").unwrap();

    dir
}

fn codeblocks(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_codeblocks"))
        .args(args)
        .current_dir(dir)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_help_lists_commands() {
    let workspace = setup_test_workspace();
    let output = codeblocks(workspace.path(), &["--help"]);

    assert!(output.status.success());
    let text = stdout(&output);
    for command in ["tree", "print", "check", "edit"] {
        assert!(text.contains(command), "missing {command} in help");
    }
}

#[test]
fn test_tree_outline() {
    let workspace = setup_test_workspace();
    let output = codeblocks(workspace.path(), &["tree", "Greeter.java"]);

    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("class Greeter"));
    assert!(text.contains("function hello"));
    assert!(text.contains("function bye"));
}

#[test]
fn test_tree_json() {
    let workspace = setup_test_workspace();
    let output = codeblocks(workspace.path(), &["tree", "Greeter.java", "--json"]);

    assert!(output.status.success());
    let entries: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let entries = entries.as_array().unwrap();
    assert_eq!(entries[0]["category"], "module");

    let hello = entries
        .iter()
        .find(|entry| entry["label"] == "hello")
        .unwrap();
    assert_eq!(hello["category"], "function");
    assert_eq!(hello["path"], "Greeter.hello");
    assert_eq!(hello["start_line"], 5);
    assert_eq!(hello["end_line"], 7);
}

#[test]
fn test_print_whole_file_round_trips() {
    let workspace = setup_test_workspace();
    let output = codeblocks(workspace.path(), &["print", "Greeter.java"]);

    assert!(output.status.success());
    assert_eq!(stdout(&output), JAVA);
}

#[test]
fn test_print_span_excerpt() {
    let workspace = setup_test_workspace();
    let output = codeblocks(workspace.path(), &["print", "Greeter.java", "--span", "5:7"]);

    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("public class Greeter {"));
    assert!(text.contains("return \"Hello \" + name;"));
    assert!(!text.contains("Bye"));
    assert!(text.contains("// ..."));
}

#[test]
fn test_print_path_without_marker() {
    let workspace = setup_test_workspace();
    let output = codeblocks(
        workspace.path(),
        &["print", "Greeter.java", "--path", "Greeter.bye", "--path", "Greeter.hello", "--no-marker"],
    );

    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("Hello"));
    assert!(text.contains("Bye"));
    assert!(!text.contains("..."));
    assert!(!text.contains("private String name"));
}

#[test]
fn test_print_add_placeholder_from_config() {
    let workspace = setup_test_workspace();
    fs::write(
        workspace.path().join("codeblocks.toml"),
        "[excerpt]\nplaceholder = \"New method goes here\"\n",
    )
    .unwrap();

    let output = codeblocks(
        workspace.path(),
        &["print", "Greeter.java", "--path", "Greeter", "--add"],
    );

    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("    // New method goes here\n}"));
    assert!(!text.contains("hello"));
}

#[test]
fn test_print_unknown_path_fails() {
    let workspace = setup_test_workspace();
    let output = codeblocks(
        workspace.path(),
        &["print", "Greeter.java", "--path", "Greeter.helo"],
    );

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("did you mean 'hello'?"));
}

#[test]
fn test_check_skips_excluded_dirs() {
    let workspace = setup_test_workspace();
    let output = codeblocks(workspace.path(), &["check", "."]);

    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("Greeter.java"));
    assert!(text.contains("main.py"));
    assert!(!text.contains("Broken.java"));
    assert!(text.contains("Summary:"));
}

#[test]
fn test_check_reports_error_blocks() {
    let workspace = setup_test_workspace();
    fs::write(
        workspace.path().join("Broken.java"),
        "class A {\n    void f() { %%% }\n}\n",
    )
    .unwrap();

    let output = codeblocks(workspace.path(), &["check", "."]);

    // Syntax errors are contained, so the round trip still holds
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("Broken.java"));
    assert!(text.contains("error blocks"));
}

#[test]
fn test_edit_update_writes_file() {
    let workspace = setup_test_workspace();
    let snippet = workspace.path().join("snippet.txt");
    fs::write(&snippet, "public String bye() {\n        return \"Ciao \" + name;\n    }\n").unwrap();

    let output = codeblocks(
        workspace.path(),
        &["edit", "Greeter.java", "--path", "Greeter.bye", "--with", "snippet.txt"],
    );

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let content = fs::read_to_string(workspace.path().join("Greeter.java")).unwrap();
    assert!(content.contains("return \"Ciao \" + name;"));
    assert!(!content.contains("Bye"));
    assert!(content.contains("return \"Hello \" + name;"));
    assert!(stdout(&output).contains("updated Greeter.bye"));
}

#[test]
fn test_edit_dry_run_leaves_file() {
    let workspace = setup_test_workspace();
    fs::write(
        workspace.path().join("snippet.txt"),
        "public int count() {\n    return 1;\n}\n",
    )
    .unwrap();

    let output = codeblocks(
        workspace.path(),
        &[
            "edit",
            "Greeter.java",
            "--path",
            "Greeter.count",
            "--with",
            "snippet.txt",
            "--add",
            "--dry-run",
        ],
    );

    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("DRY RUN"));
    assert!(text.contains("+    public int count() {"));
    assert_eq!(
        fs::read_to_string(workspace.path().join("Greeter.java")).unwrap(),
        JAVA
    );
}

#[test]
fn test_edit_rejects_broken_snippet() {
    let workspace = setup_test_workspace();
    fs::write(workspace.path().join("snippet.txt"), "public String bye( {").unwrap();

    let output = codeblocks(
        workspace.path(),
        &["edit", "Greeter.java", "--path", "Greeter.bye", "--with", "snippet.txt"],
    );

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("syntax error"));
    assert_eq!(
        fs::read_to_string(workspace.path().join("Greeter.java")).unwrap(),
        JAVA
    );
}

#[test]
fn test_check_flags_missing_token() {
    let workspace = setup_test_workspace();
    fs::write(workspace.path().join("Missing.java"), "class A { void f( { } }\n").unwrap();

    let output = codeblocks(workspace.path(), &["check", "."]);

    assert!(output.status.success());
    let text = stdout(&output);
    let line = text
        .lines()
        .find(|line| line.contains("Missing.java"))
        .unwrap();
    assert!(line.contains("1 error blocks"), "{line}");
    assert!(!line.contains('✓'));
}
