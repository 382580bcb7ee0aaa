use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use log::{info, LevelFilter};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use sszgen_core::{
    generate, parse_targets, write_outputs, BatchMode, Formatter, Generation, Options, OutputFile,
    OutputMode, Rustfmt, WriteMode,
};

const MANIFEST_SCHEMA_VERSION: &str = "sszgen.manifest@0.1.0";

#[derive(Parser, Debug)]
#[command(name = "sszgen")]
#[command(about = "SSZ code generator: annotated Rust records -> marshal/unmarshal/size routines.", long_about = None)]
struct Cli {
    /// Log more (repeatable).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// Log errors only.
    #[arg(short, long, global = true, default_value_t = false, conflicts_with = "verbose")]
    quiet: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate encoders for a schema file or a directory of schema files.
    Gen {
        #[arg(long)]
        path: PathBuf,
        /// Comma-separated record names; every declared record when absent.
        #[arg(long)]
        objs: Option<String>,
        /// Write all generated code to this file instead of <stem>_encoding.rs per input.
        #[arg(long)]
        output: Option<PathBuf>,
        /// If set, fail if output differs; do not write.
        #[arg(long, default_value_t = false)]
        check: bool,
        /// Skip records that fail to resolve instead of aborting.
        #[arg(long, default_value_t = false)]
        best_effort: bool,
        /// Format generated code with rustfmt before writing.
        #[arg(long, default_value_t = false)]
        rustfmt: bool,
        /// Also write the resolved IR as JSON.
        #[arg(long)]
        emit_ir: Option<PathBuf>,
    },
    /// Generate several schema sets from a manifest, all-or-nothing.
    Batch {
        #[arg(long)]
        manifest: PathBuf,
        /// If set, fail if any output differs; do not write.
        #[arg(long, default_value_t = false)]
        check: bool,
        #[arg(long, default_value_t = false)]
        rustfmt: bool,
    },
    /// Print the diagnostics catalog as markdown.
    Diagnostics,
}

fn main() -> Result<()> {
    try_main().map_err(|err| {
        eprintln!("{err:#}");
        err
    })
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();
    configure_logging(log_level(cli.verbose, cli.quiet))?;
    match cli.command {
        Command::Gen {
            path,
            objs,
            output,
            check,
            best_effort,
            rustfmt,
            emit_ir,
        } => {
            let mut opts = Options::new(path);
            opts.targets = objs.as_deref().map(parse_targets).unwrap_or_default();
            if let Some(output) = output {
                opts.output = OutputMode::Single(output);
            }
            if best_effort {
                opts.batch = BatchMode::BestEffort;
            }
            run_gen(&opts, check, rustfmt, emit_ir.as_deref())
        }
        Command::Batch {
            manifest,
            check,
            rustfmt,
        } => run_batch(&manifest, check, rustfmt),
        Command::Diagnostics => {
            print!("{}", sszgen_core::diagnostics::render_diagnostics_md());
            Ok(())
        }
    }
}

fn log_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn configure_logging(level: LevelFilter) -> Result<()> {
    TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )
    .context("configure logger")
}

/// The IR dump is written last, only once the outputs are on disk.
fn run_gen(opts: &Options, check: bool, rustfmt: bool, emit_ir: Option<&Path>) -> Result<()> {
    let gen = generate(opts)?;
    let ir = match emit_ir {
        Some(_) if !check => Some(gen.ir_json()?),
        _ => None,
    };
    finish(&[gen], check, rustfmt)?;
    if let (Some(ir_path), Some(ir)) = (emit_ir, ir) {
        std::fs::write(ir_path, ir)
            .with_context(|| format!("write IR: {}", ir_path.display()))?;
    }
    Ok(())
}

/// Writes (or checks) every generated file of every run at once, then fails
/// if any run skipped records.
fn finish(runs: &[Generation], check: bool, rustfmt: bool) -> Result<()> {
    let mut files: Vec<OutputFile> = Vec::new();
    let mut seen: BTreeSet<&Path> = BTreeSet::new();
    for run in runs {
        for f in &run.files {
            if !seen.insert(f.path.as_path()) {
                anyhow::bail!("output {} is produced twice", f.path.display());
            }
            files.push(f.clone());
        }
    }

    let external = Rustfmt::default();
    let formatter = if rustfmt {
        Some(&external as &dyn Formatter)
    } else {
        None
    };
    let mode = if check {
        WriteMode::Check
    } else {
        WriteMode::Write
    };
    let report = write_outputs(&files, mode, formatter)?;
    info!(
        "{} written, {} unchanged",
        report.written.len(),
        report.unchanged.len()
    );

    let mut skipped = 0;
    for run in runs {
        for d in run.diagnostics.iter().filter(|d| d.severity == sszgen_core::Severity::Error) {
            eprintln!("{d}");
            skipped += 1;
        }
    }
    if skipped > 0 {
        anyhow::bail!("{skipped} target(s) skipped; see diagnostics above");
    }
    Ok(())
}

#[derive(Debug, serde::Deserialize)]
struct Manifest {
    schema_version: String,
    entries: Vec<ManifestEntry>,
}

#[derive(Debug, serde::Deserialize)]
struct ManifestEntry {
    path: String,
    #[serde(default)]
    objs: Option<String>,
    #[serde(default)]
    output: Option<String>,
    #[serde(default)]
    best_effort: bool,
}

fn run_batch(manifest_path: &Path, check: bool, rustfmt: bool) -> Result<()> {
    let bytes = std::fs::read(manifest_path)
        .with_context(|| format!("read manifest: {}", manifest_path.display()))?;
    let m: Manifest = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse manifest JSON: {}", manifest_path.display()))?;
    if m.schema_version.trim() != MANIFEST_SCHEMA_VERSION {
        anyhow::bail!(
            "manifest schema_version mismatch: expected {MANIFEST_SCHEMA_VERSION} got {:?}",
            m.schema_version
        );
    }

    let base = manifest_path.parent().unwrap_or_else(|| Path::new("."));
    let mut runs = Vec::with_capacity(m.entries.len());
    for (idx, e) in m.entries.iter().enumerate() {
        let mut opts = Options::new(base.join(&e.path));
        opts.targets = e.objs.as_deref().map(parse_targets).unwrap_or_default();
        if let Some(output) = &e.output {
            opts.output = OutputMode::Single(base.join(output));
        }
        if e.best_effort {
            opts.batch = BatchMode::BestEffort;
        }
        let gen = generate(&opts).with_context(|| format!("manifest entry[{idx}] {}", e.path))?;
        runs.push(gen);
    }
    finish(&runs, check, rustfmt)
}
