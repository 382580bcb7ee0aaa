use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Phase {
    Parse,
    Scan,
    Resolve,
    Classify,
    Assemble,
    Write,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DiagnosticCode {
    SSZG0001ParseError,
    SSZG0100MalformedAttribute,
    SSZG0101MissingAnnotation,
    SSZG0102InvalidAnnotationValue,
    SSZG0103TupleArity,
    SSZG0200UnsupportedShape,
    SSZG0201UnsupportedPrimitive,
    SSZG0202UnknownRecord,
    SSZG0203RecursiveRecord,
    SSZG0204DuplicateRecord,
    SSZG0300SizeOverflow,
    SSZG0400UnknownTarget,
    SSZG0401NoOutput,
    SSZG0402OutputDrift,
    SSZG0403FormatFailed,
}

impl DiagnosticCode {
    pub fn code_str(self) -> &'static str {
        match self {
            DiagnosticCode::SSZG0001ParseError => "SSZG0001",
            DiagnosticCode::SSZG0100MalformedAttribute => "SSZG0100",
            DiagnosticCode::SSZG0101MissingAnnotation => "SSZG0101",
            DiagnosticCode::SSZG0102InvalidAnnotationValue => "SSZG0102",
            DiagnosticCode::SSZG0103TupleArity => "SSZG0103",
            DiagnosticCode::SSZG0200UnsupportedShape => "SSZG0200",
            DiagnosticCode::SSZG0201UnsupportedPrimitive => "SSZG0201",
            DiagnosticCode::SSZG0202UnknownRecord => "SSZG0202",
            DiagnosticCode::SSZG0203RecursiveRecord => "SSZG0203",
            DiagnosticCode::SSZG0204DuplicateRecord => "SSZG0204",
            DiagnosticCode::SSZG0300SizeOverflow => "SSZG0300",
            DiagnosticCode::SSZG0400UnknownTarget => "SSZG0400",
            DiagnosticCode::SSZG0401NoOutput => "SSZG0401",
            DiagnosticCode::SSZG0402OutputDrift => "SSZG0402",
            DiagnosticCode::SSZG0403FormatFailed => "SSZG0403",
        }
    }

    pub fn default_message(self) -> &'static str {
        match self {
            DiagnosticCode::SSZG0001ParseError => "failed to parse schema file",
            DiagnosticCode::SSZG0100MalformedAttribute => "malformed ssz attribute",
            DiagnosticCode::SSZG0101MissingAnnotation => "missing required ssz annotation",
            DiagnosticCode::SSZG0102InvalidAnnotationValue => "invalid ssz annotation value",
            DiagnosticCode::SSZG0103TupleArity => "ssz size annotation has the wrong arity",
            DiagnosticCode::SSZG0200UnsupportedShape => "unsupported field shape",
            DiagnosticCode::SSZG0201UnsupportedPrimitive => "unsupported primitive type",
            DiagnosticCode::SSZG0202UnknownRecord => "reference to an undeclared record",
            DiagnosticCode::SSZG0203RecursiveRecord => "record type contains itself",
            DiagnosticCode::SSZG0204DuplicateRecord => "record declared more than once",
            DiagnosticCode::SSZG0300SizeOverflow => "encoded size does not fit in 64 bits",
            DiagnosticCode::SSZG0400UnknownTarget => "target record is not declared",
            DiagnosticCode::SSZG0401NoOutput => "no files to generate",
            DiagnosticCode::SSZG0402OutputDrift => "generated output differs from disk",
            DiagnosticCode::SSZG0403FormatFailed => "formatting generated output failed",
        }
    }

    pub fn default_help(self) -> Option<&'static str> {
        match self {
            DiagnosticCode::SSZG0001ParseError => {
                Some("Ensure the schema file parses as Rust source.")
            }
            DiagnosticCode::SSZG0100MalformedAttribute => Some(
                "Supported forms: #[ssz(bitlist)], #[ssz(bitvector)], #[ssz(size = \"N\")], #[ssz(size = \"F,S\")], #[ssz(max = \"N\")].",
            ),
            DiagnosticCode::SSZG0101MissingAnnotation => {
                Some("Add #[ssz(size = ..)] for fixed collections or #[ssz(max = ..)] for lists.")
            }
            DiagnosticCode::SSZG0103TupleArity => Some(
                "Vec<Vec<u8>> takes size = \"F,S\" (F may be '?'); other shapes take a single number.",
            ),
            DiagnosticCode::SSZG0203RecursiveRecord => {
                Some("SSZ containers have a finite layout; break the cycle.")
            }
            DiagnosticCode::SSZG0402OutputDrift => Some("Re-run sszgen without --check."),
            _ => None,
        }
    }

    fn default_phase(self) -> Phase {
        match self {
            DiagnosticCode::SSZG0001ParseError => Phase::Parse,
            DiagnosticCode::SSZG0100MalformedAttribute => Phase::Scan,
            DiagnosticCode::SSZG0300SizeOverflow => Phase::Classify,
            DiagnosticCode::SSZG0400UnknownTarget | DiagnosticCode::SSZG0401NoOutput => {
                Phase::Assemble
            }
            DiagnosticCode::SSZG0402OutputDrift | DiagnosticCode::SSZG0403FormatFailed => {
                Phase::Write
            }
            _ => Phase::Resolve,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub phase: Phase,
    pub severity: Severity,
    pub message: String,
    pub help: Option<String>,
    /// `unit: Record.field` of the offending declaration, when known.
    pub location: Option<String>,
}

impl Diagnostic {
    pub fn error(code: DiagnosticCode, phase: Phase, message: impl Into<String>) -> Self {
        Diagnostic {
            code,
            phase,
            severity: Severity::Error,
            message: message.into(),
            help: code.default_help().map(|s| s.to_string()),
            location: None,
        }
    }

    pub fn warning(code: DiagnosticCode, phase: Phase, message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            ..Diagnostic::error(code, phase, message)
        }
    }

    pub fn at(mut self, location: impl Into<String>) -> Self {
        if self.location.is_none() {
            self.location = Some(location.into());
        }
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:?} {:?}: {}",
            self.code.code_str(),
            self.phase,
            self.severity,
            self.message
        )?;
        if let Some(location) = &self.location {
            write!(f, "\n  at: {location}")?;
        }
        if let Some(help) = &self.help {
            write!(f, "\n  help: {help}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostic {}

pub fn render_diagnostics_md() -> String {
    let mut rows: Vec<(String, Phase, String, String)> = Vec::new();
    for code in all_codes() {
        rows.push((
            code.code_str().to_string(),
            code.default_phase(),
            code.default_message().to_string(),
            code.default_help().unwrap_or("").to_string(),
        ));
    }
    rows.sort_by(|a, b| a.0.cmp(&b.0));

    let mut out = String::new();
    out.push_str("# sszgen diagnostics catalog\n\n");
    out.push_str("This document is generated from `crates/sszgen-core/src/diagnostics.rs`.\n\n");
    out.push_str("| Code | Phase | Message | Help |\n");
    out.push_str("| ---- | ----- | ------- | ---- |\n");
    for (code, phase, msg, help) in rows {
        out.push_str(&format!("| {code} | {phase:?} | {msg} | {help} |\n"));
    }
    out
}

fn all_codes() -> &'static [DiagnosticCode] {
    &[
        DiagnosticCode::SSZG0001ParseError,
        DiagnosticCode::SSZG0100MalformedAttribute,
        DiagnosticCode::SSZG0101MissingAnnotation,
        DiagnosticCode::SSZG0102InvalidAnnotationValue,
        DiagnosticCode::SSZG0103TupleArity,
        DiagnosticCode::SSZG0200UnsupportedShape,
        DiagnosticCode::SSZG0201UnsupportedPrimitive,
        DiagnosticCode::SSZG0202UnknownRecord,
        DiagnosticCode::SSZG0203RecursiveRecord,
        DiagnosticCode::SSZG0204DuplicateRecord,
        DiagnosticCode::SSZG0300SizeOverflow,
        DiagnosticCode::SSZG0400UnknownTarget,
        DiagnosticCode::SSZG0401NoOutput,
        DiagnosticCode::SSZG0402OutputDrift,
        DiagnosticCode::SSZG0403FormatFailed,
    ]
}
