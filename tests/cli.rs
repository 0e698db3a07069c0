use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

use fnanno::models::{Annotation, AnnotationKind, StickyNoteAnnotation};
use tempfile::TempDir;

const NOTE_JSON: &str = r#"{
    "meta": {
        "id": "{C}",
        "created_at": "2010-07-01T21:20:36-05:00",
        "modified_at": "2010-07-01T21:20:36-05:00",
        "page_number": 2,
        "upper_left": {"x": 48.0, "y": 96.0},
        "lower_right": {"x": 144.0, "y": 192.0}
    },
    "kind": {"type": "sticky_note", "note_order": 5, "text": "Call back"}
}"#;

/// "Call back" as written to `F_TEXT`
const NOTE_HEX: &str = "00430061006C006C0020006200610063006B";

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let config = r#"{
            "scale_x": 96.0,
            "scale_y": 96.0,
            "code_page": "windows-1252",
            "content_element_index": 3
        }"#;
        fs::write(dir.path().join("config.json"), config)
            .expect("write config");
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, content).expect("write input");
        path
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_fnanno"))
            .arg("--config")
            .arg(self.path("config.json"))
            .args(args)
            .env("RUST_LOG", "warn")
            .output()
            .expect("run fnanno")
    }
}

fn assert_success(output: &Output) {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "stdout={stdout}\nstderr={stderr}");
}

#[test]
fn test_encode_to_stdout_uses_configured_index() {
    let workspace = Workspace::new();
    let input = workspace.write("note.json", NOTE_JSON);

    let output = workspace.run(&["encode", "--input", input.to_str().unwrap()]);
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("<FnAnno><PropDesc "), "stdout={stdout}");
    assert!(stdout.contains(r#"F_NAME="-3-{C}""#), "stdout={stdout}");
    let text = format!(r#"<F_TEXT Encoding="unicode">{}</F_TEXT>"#, NOTE_HEX);
    assert!(stdout.contains(&text), "stdout={stdout}");
}

#[test]
fn test_encode_index_flag_overrides_config() {
    let workspace = Workspace::new();
    let input = workspace.write("note.json", NOTE_JSON);

    let output = workspace.run(&[
        "encode",
        "--input",
        input.to_str().unwrap(),
        "--index",
        "7",
    ]);
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(r#"F_NAME="-7-{C}""#), "stdout={stdout}");
}

#[test]
fn test_encode_then_decode_round_trips_through_files() {
    let workspace = Workspace::new();
    let input = workspace.write("note.json", NOTE_JSON);
    let xml_path = workspace.path("note.xml");

    let output = workspace.run(&[
        "encode",
        "--input",
        input.to_str().unwrap(),
        "--output",
        xml_path.to_str().unwrap(),
    ]);
    assert_success(&output);
    assert!(output.stdout.is_empty());
    let xml = fs::read_to_string(&xml_path).expect("encoded file");
    assert!(xml.ends_with("</PropDesc></FnAnno>"), "xml={xml}");

    let output = workspace.run(&[
        "decode",
        "--input",
        xml_path.to_str().unwrap(),
        "--mime",
        "application/pdf",
    ]);
    assert_success(&output);
    let decoded: Annotation = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(decoded.id(), "{C}");
    assert_eq!(decoded.meta.page_number, 2);
    assert_eq!(
        decoded.kind,
        AnnotationKind::StickyNote(StickyNoteAnnotation {
            note_order: 5,
            text: "Call back".to_string(),
        })
    );
}

#[test]
fn test_decode_unmapped_class_prints_nothing() {
    let workspace = Workspace::new();
    let input = workspace.write(
        "unknown.xml",
        concat!(
            r#"<FnAnno><PropDesc F_CLASSID="{00000000-0000-0000-0000-000000000000}" "#,
            r#"F_CLASSNAME="Hologram" F_PAGENUMBER="1"><F_TEXT /></PropDesc></FnAnno>"#
        ),
    );

    let output = workspace.run(&[
        "decode",
        "--input",
        input.to_str().unwrap(),
        "--mime",
        "image/png",
    ]);
    assert_success(&output);
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Could not map annotation type"),
        "stderr={stderr}"
    );
}

#[test]
fn test_decode_with_empty_mime_fails() {
    let workspace = Workspace::new();
    let input = workspace.write(
        "note.xml",
        r#"<FnAnno><PropDesc F_CLASSNAME="Text" /></FnAnno>"#,
    );

    let output = workspace.run(&[
        "decode",
        "--input",
        input.to_str().unwrap(),
        "--mime",
        "",
    ]);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn test_missing_config_is_created_with_defaults() {
    let dir = TempDir::new().expect("tempdir");
    let config_path = dir.path().join("fresh").join("config.json");
    let input = dir.path().join("note.json");
    fs::write(&input, NOTE_JSON).expect("write input");

    let output = Command::new(env!("CARGO_BIN_EXE_fnanno"))
        .arg("--config")
        .arg(&config_path)
        .args(["encode", "--input", input.to_str().unwrap()])
        .output()
        .expect("run fnanno");
    assert_success(&output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(r#"F_NAME="-1-{C}""#), "stdout={stdout}");
    let content = fs::read_to_string(&config_path).expect("config");
    let saved: serde_json::Value = serde_json::from_str(&content).expect("json");
    assert_eq!(saved["content_element_index"], 1);
    assert_eq!(saved["code_page"], "windows-1252");
}
