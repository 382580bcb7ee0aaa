//! Output assembler: generated records grouped into output units.
//!
//! The shared block is written exactly once per run, into the first unit
//! that has any content. Units without content produce no file.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use log::debug;

use crate::codegen::{generate_record, shared_block, GeneratedRecord};
use crate::diagnostics::{Diagnostic, DiagnosticCode, Phase};
use crate::ir::{RecordId, Registry};
use crate::scan::{Unit, ENCODING_SUFFIX, GENERATED_HEADER};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputMode {
    /// `<stem>_encoding.rs` next to each input unit.
    PerUnit,
    /// Everything in one file.
    Single(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub path: PathBuf,
    pub contents: String,
}

pub fn output_path(unit_path: &Path) -> PathBuf {
    let stem = unit_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    unit_path.with_file_name(format!("{stem}{ENCODING_SUFFIX}"))
}

/// Records of `selected` in unit and declaration order, rendered into output
/// files. A record is emitted only by the unit that declares it.
pub fn assemble(
    registry: &Registry,
    units: &[Unit],
    selected: &BTreeSet<RecordId>,
    mode: &OutputMode,
) -> Result<Vec<OutputFile>, Diagnostic> {
    let mut parts: Vec<(&Unit, Vec<GeneratedRecord>)> = Vec::new();
    for unit in units {
        let records: Vec<GeneratedRecord> = unit
            .record_names()
            .filter_map(|name| registry.lookup(name))
            .filter(|id| selected.contains(id) && registry.get(*id).unit == unit.name)
            .map(|id| generate_record(registry, id))
            .collect();
        if records.is_empty() {
            debug!("{}: nothing to generate", unit.name);
            continue;
        }
        parts.push((unit, records));
    }

    if parts.is_empty() {
        return Err(Diagnostic::error(
            DiagnosticCode::SSZG0401NoOutput,
            Phase::Assemble,
            "no record was generated in any unit",
        ));
    }

    let files = match mode {
        OutputMode::PerUnit => parts
            .iter()
            .enumerate()
            .map(|(idx, (unit, records))| OutputFile {
                path: output_path(&unit.path),
                contents: render(&[*unit], records.iter(), idx == 0),
            })
            .collect(),
        OutputMode::Single(path) => {
            let sources: Vec<&Unit> = parts.iter().map(|(u, _)| *u).collect();
            let records = parts.iter().flat_map(|(_, records)| records.iter());
            vec![OutputFile {
                path: path.clone(),
                contents: render(&sources, records, true),
            }]
        }
    };
    Ok(files)
}

fn render<'r>(
    sources: &[&Unit],
    records: impl Iterator<Item = &'r GeneratedRecord>,
    shared: bool,
) -> String {
    let mut out = String::new();
    out.push_str(GENERATED_HEADER);
    out.push('\n');
    for unit in sources {
        let name = unit
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| unit.name.clone());
        out.push_str(&format!(
            "// source: {name} (sha256: {})\n",
            unit.source_sha256
        ));
    }
    if shared {
        out.push('\n');
        out.push_str(&shared_block());
    }
    for record in records {
        out.push('\n');
        out.push_str(&record.render());
    }
    out
}
