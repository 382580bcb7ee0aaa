pub mod annotations;
pub mod assemble;
pub mod bitlist;
pub mod classify;
pub mod codegen;
pub mod diagnostics;
pub mod ir;
pub mod resolve;
pub mod scan;
mod util;
pub mod write;

use std::path::PathBuf;

use anyhow::Result;
use log::{info, warn};

pub use assemble::{OutputFile, OutputMode};
pub use diagnostics::{Diagnostic, DiagnosticCode, Phase, Severity};
pub use ir::Registry;
pub use scan::Unit;
pub use write::{write_outputs, Formatter, Rustfmt, WriteMode, WriteReport};

use resolve::Resolver;

/// What happens when a target fails to resolve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BatchMode {
    /// Abort the run on the first error.
    #[default]
    FailFast,
    /// Skip failed targets (and records that depend on them) and report
    /// their diagnostics. The run still fails when nothing is generated.
    BestEffort,
}

#[derive(Debug, Clone)]
pub struct Options {
    /// Schema file or directory of schema files.
    pub source: PathBuf,
    /// Record names to generate; empty means every declared record.
    pub targets: Vec<String>,
    pub output: OutputMode,
    pub batch: BatchMode,
}

impl Options {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Options {
            source: source.into(),
            targets: Vec::new(),
            output: OutputMode::PerUnit,
            batch: BatchMode::FailFast,
        }
    }
}

/// Splits a comma-separated target list, dropping blanks.
pub fn parse_targets(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug)]
pub struct Generation {
    pub registry: Registry,
    pub files: Vec<OutputFile>,
    /// Warnings, plus the errors of skipped targets in best-effort mode.
    pub diagnostics: Vec<Diagnostic>,
}

impl Generation {
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// The resolved registry as pretty JSON, for `--emit-ir`.
    pub fn ir_json(&self) -> Result<String> {
        let mut out = serde_json::to_string_pretty(&self.registry)?;
        out.push('\n');
        Ok(out)
    }
}

/// Scans `opts.source` and generates every output in memory. Nothing is
/// written; pass `files` to [`write_outputs`].
pub fn generate(opts: &Options) -> Result<Generation> {
    let units = scan::load_units(&opts.source)?;
    info!(
        "scanned {} unit(s) from {}",
        units.len(),
        opts.source.display()
    );
    generate_units(&units, &opts.targets, &opts.output, opts.batch)
}

pub fn generate_units(
    units: &[Unit],
    targets: &[String],
    output: &OutputMode,
    batch: BatchMode,
) -> Result<Generation> {
    let names: Vec<String> = if targets.is_empty() {
        units
            .iter()
            .flat_map(|u| u.record_names())
            .map(str::to_string)
            .collect()
    } else {
        targets.to_vec()
    };

    let mut resolver = Resolver::new(units);
    let mut roots = Vec::new();
    let mut errors = Vec::new();
    for name in &names {
        let resolved = if resolver.is_declared(name) {
            resolver.resolve(name)
        } else {
            Err(Diagnostic::error(
                DiagnosticCode::SSZG0400UnknownTarget,
                Phase::Assemble,
                format!("target {name} is not declared in any scanned unit"),
            ))
        };
        match resolved {
            Ok(id) => roots.push(id),
            Err(d) if batch == BatchMode::FailFast => anyhow::bail!("{}", d),
            Err(d) => {
                warn!("skipping {name}: {d}");
                errors.push(d);
            }
        }
    }

    let (registry, warnings) = resolver.finish();
    for d in &warnings {
        warn!("{d}");
    }
    let mut diagnostics: Vec<Diagnostic> = Vec::new();
    for d in warnings.into_iter().chain(errors) {
        if !diagnostics.contains(&d) {
            diagnostics.push(d);
        }
    }

    let selected = registry.closure(roots);
    info!("generating {} record(s)", selected.len());
    let files = assemble::assemble(&registry, units, &selected, output)
        .map_err(|d| anyhow::anyhow!("{}", d))?;

    Ok(Generation {
        registry,
        files,
        diagnostics,
    })
}
