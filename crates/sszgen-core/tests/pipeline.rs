use std::path::Path;

use sszgen_core::{
    generate, write_outputs, BatchMode, DiagnosticCode, Options, OutputMode, WriteMode,
};

const BEACON: &str = r#"
pub struct Checkpoint {
    pub epoch: u64,
    #[ssz(size = "32")]
    pub root: Vec<u8>,
}

pub struct AttestationData {
    pub slot: u64,
    pub source: Checkpoint,
    pub target: Box<Checkpoint>,
}
"#;

const BLOCKS: &str = r#"
pub struct Block {
    pub slot: u64,
    #[ssz(max = "128")]
    pub attestations: Vec<AttestationData>,
    #[ssz(max = "1024")]
    pub graffiti: Vec<u8>,
}

pub struct Broken {
    pub payload: Vec<u8>,
}
"#;

fn schema_dir() -> tempfile::TempDir {
    let tmp = tempfile::tempdir().expect("tempdir");
    std::fs::write(tmp.path().join("beacon.rs"), BEACON).expect("write beacon");
    std::fs::write(tmp.path().join("blocks.rs"), BLOCKS).expect("write blocks");
    tmp
}

fn targets(list: &str) -> Vec<String> {
    sszgen_core::parse_targets(list)
}

#[test]
fn per_unit_outputs_share_one_error_block() {
    let dir = schema_dir();
    let mut opts = Options::new(dir.path());
    opts.targets = targets("Block");
    let gen = generate(&opts).expect("generate");

    let names: Vec<&Path> = gen.files.iter().map(|f| f.path.as_path()).collect();
    assert_eq!(
        names,
        vec![
            dir.path().join("beacon_encoding.rs").as_path(),
            dir.path().join("blocks_encoding.rs").as_path()
        ]
    );
    let beacon = &gen.files[0].contents;
    let blocks = &gen.files[1].contents;
    assert!(beacon.contains("pub enum SszError"));
    assert!(!blocks.contains("pub enum SszError"));
    assert!(beacon.contains("pub struct Checkpoint"));
    assert!(beacon.contains("pub struct AttestationData"));
    assert!(blocks.contains("pub struct Block"));
    assert!(!blocks.contains("pub struct Broken"));
    assert!(gen.diagnostics.is_empty());
}

#[test]
fn fail_fast_reports_the_first_configuration_error() {
    let dir = schema_dir();
    let err = generate(&Options::new(dir.path())).expect_err("Broken has no annotation");
    let text = err.to_string();
    assert!(text.contains(DiagnosticCode::SSZG0101MissingAnnotation.code_str()), "{text}");
    assert!(text.contains("blocks.rs: Broken.payload"), "{text}");
}

#[test]
fn best_effort_skips_broken_records() {
    let dir = schema_dir();
    let mut opts = Options::new(dir.path());
    opts.batch = BatchMode::BestEffort;
    let gen = generate(&opts).expect("generate");
    assert!(gen.has_errors());
    assert_eq!(gen.diagnostics.len(), 1);
    assert_eq!(
        gen.diagnostics[0].code,
        DiagnosticCode::SSZG0101MissingAnnotation
    );
    let blocks = &gen.files[1].contents;
    assert!(blocks.contains("pub struct Block"));
    assert!(!blocks.contains("pub struct Broken"));
}

#[test]
fn unknown_target_is_a_configuration_error() {
    let dir = schema_dir();
    let mut opts = Options::new(dir.path());
    opts.targets = targets("Checkpoint, Nope");
    let err = generate(&opts).expect_err("unknown target");
    assert!(err.to_string().contains("SSZG0400"), "{err}");

    opts.batch = BatchMode::BestEffort;
    let gen = generate(&opts).expect("best effort keeps Checkpoint");
    assert_eq!(gen.files.len(), 1);
    assert_eq!(gen.diagnostics[0].code, DiagnosticCode::SSZG0400UnknownTarget);
}

#[test]
fn nothing_to_generate_fails_the_run() {
    let tmp = tempfile::tempdir().expect("tempdir");
    std::fs::write(tmp.path().join("a.rs"), "struct Private { pub a: u8 }").expect("write");
    let err = generate(&Options::new(tmp.path())).expect_err("no output");
    assert!(err.to_string().contains("SSZG0401"), "{err}");
}

#[test]
fn single_output_then_check_mode() {
    let dir = schema_dir();
    let out = dir.path().join("gen").join("all_encoding.rs");
    let mut opts = Options::new(dir.path().join("beacon.rs"));
    opts.output = OutputMode::Single(out.clone());
    let gen = generate(&opts).expect("generate");
    assert_eq!(gen.files.len(), 1);

    write_outputs(&gen.files, WriteMode::Check, None).expect_err("not written yet");
    let report = write_outputs(&gen.files, WriteMode::Write, None).expect("write");
    assert_eq!(report.written, vec![out.clone()]);
    write_outputs(&gen.files, WriteMode::Check, None).expect("clean after write");

    let again = generate(&opts).expect("regenerate");
    assert_eq!(again.files, gen.files);

    std::fs::write(
        dir.path().join("beacon.rs"),
        BEACON.replace("pub epoch: u64", "pub epoch: u32"),
    )
    .expect("edit schema");
    let changed = generate(&opts).expect("generate changed");
    let err = write_outputs(&changed.files, WriteMode::Check, None).expect_err("drift");
    assert!(err.to_string().contains("SSZG0402"), "{err}");
}

#[test]
fn generated_files_are_skipped_on_rescan() {
    let dir = schema_dir();
    let mut opts = Options::new(dir.path());
    opts.targets = targets("Checkpoint");
    let gen = generate(&opts).expect("generate");
    write_outputs(&gen.files, WriteMode::Write, None).expect("write");
    let again = generate(&opts).expect("rescan");
    assert_eq!(again.files, gen.files);
}

#[test]
fn ir_json_lists_resolved_records() {
    let dir = schema_dir();
    let mut opts = Options::new(dir.path());
    opts.targets = targets("AttestationData");
    let gen = generate(&opts).expect("generate");
    let json: serde_json::Value = serde_json::from_str(&gen.ir_json().expect("json")).expect("parse");
    let records = json["records"].as_array().expect("records array");
    let names: Vec<&str> = records
        .iter()
        .map(|r| r["name"].as_str().expect("name"))
        .collect();
    assert_eq!(names, vec!["Checkpoint", "AttestationData"]);
    assert_eq!(records[0]["layout"]["fixed"], 40);
}
