use std::fs;

use clap::Parser;
use tempfile::TempDir;
use xrefdb::store::OpenMode;
use xrefdb::tool::{render, run, OutputFormat, ToolOpts};
use xrefdb::Database;

/// Builds a small index the way the indexer would and closes it, so that the
/// tool sees it the way a reader would.
fn small_index() -> TempDir {
    xrefdb::logging::init_logging();
    let dir = TempDir::new().unwrap();
    let mut db = Database::open(dir.path(), OpenMode::ReadWrite).unwrap();
    db.assign_blob(b"\xab\xcd", "sched.c").unwrap();
    db.append_path(0, 3, "/kernel/sched.c").unwrap();
    db.add_definition("schedule", 0, "function", 4120, "C").unwrap();
    db.add_definition("schedule", 0, "prototype", 12, "K").unwrap();
    db.add_reference("schedule", 0, "88,90", "C").unwrap();
    db.add_doc_comment("schedule", 0, "4100", "C").unwrap();
    db.close().unwrap();
    dir
}

fn tool(dir: &TempDir, args: &[&str]) -> String {
    let mut argv = vec!["xref-tool", "--data-dir", dir.path().to_str().unwrap()];
    argv.extend_from_slice(args);
    let opts = ToolOpts::try_parse_from(&argv).unwrap();
    render(&run(&opts).unwrap(), opts.output_format).unwrap()
}

#[test]
fn test_identifier_commands() {
    let dir = small_index();
    insta::assert_snapshot!(
        tool(&dir, &["defs", "schedule"]),
        @r#"{"definitions":[{"serial":0,"kind":"function","line":4120,"family":"C"},{"serial":0,"kind":"prototype","line":12,"family":"K"}],"families":["C","K"]}"#
    );
    insta::assert_snapshot!(
        tool(&dir, &["refs", "schedule"]),
        @r#"[{"serial":0,"lines":"88,90","family":"C"}]"#
    );
    insta::assert_snapshot!(
        tool(&dir, &["docs", "schedule"]),
        @r#"[{"serial":0,"lines":"4100","family":"C"}]"#
    );
}

#[test]
fn test_blob_commands() {
    let dir = small_index();
    insta::assert_snapshot!(
        tool(&dir, &["versions", "0"]),
        @r#"[{"version":3,"path":"/kernel/sched.c"}]"#
    );
    insta::assert_snapshot!(tool(&dir, &["blob", "ABCD"]), @"0");
    insta::assert_snapshot!(tool(&dir, &["hash", "0"]), @r#""abcd""#);
    insta::assert_snapshot!(tool(&dir, &["file", "0"]), @r#""sched.c""#);
    insta::assert_snapshot!(tool(&dir, &["var", "numBlobs"]), @"1");
}

#[test]
fn test_missing_keys_are_null() {
    let dir = small_index();
    for args in &[
        &["defs", "nothing_here"][..],
        &["refs", "nothing_here"][..],
        &["docs", "nothing_here"][..],
        &["blob", "0000"][..],
        &["hash", "9"][..],
        &["file", "9"][..],
        &["var", "numTags"][..],
    ] {
        assert_eq!(tool(&dir, args), "null", "{:?}", args);
    }
    // A blob with no recorded history has an empty one.
    assert_eq!(tool(&dir, &["versions", "9"]), "[]");
}

#[test]
fn test_pretty_output() {
    let dir = small_index();
    insta::assert_snapshot!(tool(&dir, &["-o", "pretty", "refs", "schedule"]), @r###"
    [
      {
        "serial": 0,
        "lines": "88,90",
        "family": "C"
      }
    ]
    "###);
}

#[test]
fn test_config_takes_precedence() {
    let dir = small_index();
    let config_path = dir.path().join("xref.json");
    // Asking for a writable index still gets a read-only one.
    let config = serde_json::json!({
        "data_dir": dir.path(),
        "read_only": false,
    });
    fs::write(&config_path, config.to_string()).unwrap();

    let opts = ToolOpts::try_parse_from(&[
        "xref-tool",
        "--config",
        config_path.to_str().unwrap(),
        "--data-dir",
        "/nonexistent/index",
        "file",
        "0",
    ])
    .unwrap();
    assert_eq!(render(&run(&opts).unwrap(), OutputFormat::Concise).unwrap(), r#""sched.c""#);
}

#[test]
fn test_errors_are_reported() {
    let dir = small_index();
    let run_args = |args: &[&str]| {
        let mut argv = vec!["xref-tool", "--data-dir", dir.path().to_str().unwrap()];
        argv.extend_from_slice(args);
        run(&ToolOpts::try_parse_from(&argv).unwrap())
    };
    assert!(run_args(&["blob", "xyz"]).is_err());

    let empty = TempDir::new().unwrap();
    let opts = ToolOpts::try_parse_from(&[
        "xref-tool",
        "--data-dir",
        empty.path().to_str().unwrap(),
        "var",
        "numBlobs",
    ])
    .unwrap();
    // Read-only opening never creates stores.
    assert!(run(&opts).is_err());
    assert_eq!(fs::read_dir(empty.path()).unwrap().count(), 0);
}
