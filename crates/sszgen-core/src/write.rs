//! All-or-nothing writer for assembled output.
//!
//! Every file is rendered (and formatted, when a formatter is given) before
//! the first byte reaches the disk. Changed files are staged as temporary
//! files next to their targets and only persisted once all of them staged.
//! If persisting one of them fails, the files already replaced get their
//! previous contents back (or are removed when they did not exist).

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use log::{debug, info, warn};
use tempfile::NamedTempFile;

use crate::assemble::OutputFile;
use crate::diagnostics::{Diagnostic, DiagnosticCode, Phase};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Write,
    /// Fail if any output differs from disk; write nothing.
    Check,
}

pub trait Formatter {
    fn format(&self, file: &OutputFile) -> Result<String>;
}

/// Pipes source through `rustfmt` on stdin.
#[derive(Debug, Clone)]
pub struct Rustfmt {
    pub program: PathBuf,
    pub edition: String,
}

impl Default for Rustfmt {
    fn default() -> Self {
        Rustfmt {
            program: PathBuf::from("rustfmt"),
            edition: "2021".to_string(),
        }
    }
}

impl Formatter for Rustfmt {
    fn format(&self, file: &OutputFile) -> Result<String> {
        let failed = |message: String| {
            anyhow::anyhow!(
                "{}",
                Diagnostic::error(DiagnosticCode::SSZG0403FormatFailed, Phase::Write, message)
                    .at(file.path.display().to_string())
            )
        };

        let mut child = Command::new(&self.program)
            .args(["--edition", &self.edition])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| failed(format!("spawn {}: {e}", self.program.display())))?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(file.contents.as_bytes())
                .map_err(|e| failed(format!("write to formatter: {e}")))?;
        }
        let out = child
            .wait_with_output()
            .map_err(|e| failed(format!("wait for formatter: {e}")))?;
        if !out.status.success() {
            return Err(failed(format!(
                "{} exited with {}: {}",
                self.program.display(),
                out.status,
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }
        String::from_utf8(out.stdout).map_err(|e| failed(format!("formatter output: {e}")))
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WriteReport {
    pub written: Vec<PathBuf>,
    pub unchanged: Vec<PathBuf>,
}

pub fn write_outputs(
    files: &[OutputFile],
    mode: WriteMode,
    formatter: Option<&dyn Formatter>,
) -> Result<WriteReport> {
    let mut rendered: Vec<(&Path, String)> = Vec::with_capacity(files.len());
    for f in files {
        let contents = match formatter {
            Some(fmt) => fmt.format(f)?,
            None => f.contents.clone(),
        };
        rendered.push((f.path.as_path(), contents));
    }

    let mut report = WriteReport::default();
    let mut pending: Vec<(&Path, String, Option<String>)> = Vec::new();
    for (path, contents) in rendered {
        let existing = read_existing(path)?;
        if existing.as_deref() == Some(contents.as_str()) {
            debug!("unchanged: {}", path.display());
            report.unchanged.push(path.to_path_buf());
            continue;
        }
        pending.push((path, contents, existing));
    }

    if mode == WriteMode::Check {
        if !pending.is_empty() {
            let paths: Vec<String> = pending
                .iter()
                .map(|(p, _, _)| p.display().to_string())
                .collect();
            anyhow::bail!(
                "{}",
                Diagnostic::error(
                    DiagnosticCode::SSZG0402OutputDrift,
                    Phase::Write,
                    format!("generated output differs: {}", paths.join(", "))
                )
            );
        }
        return Ok(report);
    }

    let mut staged = Vec::with_capacity(pending.len());
    for (path, contents, previous) in pending {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create output dir: {}", dir.display()))?;
        let mut tmp = NamedTempFile::new_in(dir)
            .with_context(|| format!("stage output in: {}", dir.display()))?;
        tmp.write_all(contents.as_bytes())
            .with_context(|| format!("stage output: {}", path.display()))?;
        staged.push(Staged {
            path,
            tmp,
            previous,
        });
    }

    report.written = commit(staged, |tmp, path| {
        tmp.persist(path).map(|_| ()).map_err(|e| e.error)
    })?;
    Ok(report)
}

struct Staged<'p> {
    path: &'p Path,
    tmp: NamedTempFile,
    /// Contents before this run; `None` when the file is new.
    previous: Option<String>,
}

/// Persists every staged file in order. On the first failure the files
/// already persisted are restored, newest first.
fn commit<F>(staged: Vec<Staged<'_>>, mut persist: F) -> Result<Vec<PathBuf>>
where
    F: FnMut(NamedTempFile, &Path) -> std::io::Result<()>,
{
    let mut done: Vec<(&Path, Option<String>)> = Vec::with_capacity(staged.len());
    for Staged {
        path,
        tmp,
        previous,
    } in staged
    {
        if let Err(e) = persist(tmp, path) {
            rollback(&done);
            return Err(e).with_context(|| format!("write output: {}", path.display()));
        }
        info!("wrote {}", path.display());
        done.push((path, previous));
    }
    Ok(done.into_iter().map(|(p, _)| p.to_path_buf()).collect())
}

fn rollback(done: &[(&Path, Option<String>)]) {
    for (path, previous) in done.iter().rev() {
        let restored = match previous {
            Some(old) => std::fs::write(path, old),
            None => std::fs::remove_file(path),
        };
        match restored {
            Ok(()) => warn!("restored {}", path.display()),
            Err(e) => warn!("could not restore {}: {e}", path.display()),
        }
    }
}

fn read_existing(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(s) => Ok(Some(s)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => {
            Err(e).with_context(|| format!("read existing output: {}", path.display()))
        }
    }
}
