//! Declaration scanner: schema source -> ordered record declarations.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::debug;

use crate::annotations::Annotations;
use crate::diagnostics::{Diagnostic, DiagnosticCode, Phase};

/// Suffix of generated units; such files are never scanned as input.
pub const ENCODING_SUFFIX: &str = "_encoding.rs";

/// First line of every generated unit.
pub const GENERATED_HEADER: &str = "// Code generated by sszgen. DO NOT EDIT.";

/// Prefix of fields injected by other generators.
const RESERVED_FIELD_PREFIX: &str = "xxx_";

/// One input source. Owns no resolved IR; only the declaration order.
#[derive(Debug, Clone)]
pub struct Unit {
    pub name: String,
    pub path: PathBuf,
    pub source_sha256: String,
    pub records: Vec<RecordDecl>,
}

#[derive(Debug, Clone)]
pub struct RecordDecl {
    pub name: String,
    pub fields: Vec<FieldDecl>,
}

#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: String,
    pub ty: syn::Type,
    pub annotations: Annotations,
}

impl Unit {
    pub fn record_names(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.name.as_str())
    }
}

pub fn parse_unit(path: &Path, src: &str) -> Result<Unit, Diagnostic> {
    let name = path.to_string_lossy().to_string();
    let file: syn::File = syn::parse_file(src).map_err(|e| {
        Diagnostic::error(DiagnosticCode::SSZG0001ParseError, Phase::Parse, e.to_string())
            .at(name.clone())
    })?;
    let records = scan_file(&name, &file)?;
    Ok(Unit {
        name,
        path: path.to_path_buf(),
        source_sha256: crate::util::sha256_hex(src.as_bytes()),
        records,
    })
}

/// Exported records of one syntax tree, in declaration order.
pub fn scan_file(unit: &str, file: &syn::File) -> Result<Vec<RecordDecl>, Diagnostic> {
    let mut records = Vec::new();
    for item in &file.items {
        let syn::Item::Struct(s) = item else {
            continue;
        };
        let record = s.ident.to_string();
        if !matches!(s.vis, syn::Visibility::Public(_)) {
            debug!("{unit}: skipping private struct {record}");
            continue;
        }
        if !s.generics.params.is_empty() {
            debug!("{unit}: skipping generic struct {record}");
            continue;
        }
        let syn::Fields::Named(named) = &s.fields else {
            debug!("{unit}: skipping struct {record} without named fields");
            continue;
        };

        let mut fields = Vec::new();
        for f in &named.named {
            let Some(ident) = &f.ident else {
                continue;
            };
            let name = ident.to_string();
            if !matches!(f.vis, syn::Visibility::Public(_)) {
                continue;
            }
            if name.to_ascii_lowercase().starts_with(RESERVED_FIELD_PREFIX) {
                debug!("{unit}: skipping reserved field {record}.{name}");
                continue;
            }
            let annotations = Annotations::from_attrs(&f.attrs).map_err(|e| {
                Diagnostic::error(
                    DiagnosticCode::SSZG0100MalformedAttribute,
                    Phase::Scan,
                    e.to_string(),
                )
                .at(format!("{unit}: {record}.{name}"))
            })?;
            fields.push(FieldDecl {
                name,
                ty: f.ty.clone(),
                annotations,
            });
        }
        records.push(RecordDecl {
            name: record,
            fields,
        });
    }
    Ok(records)
}

/// Reads a single schema file, or every schema file directly inside a
/// directory in file-name order.
pub fn load_units(source: &Path) -> Result<Vec<Unit>> {
    let meta = std::fs::metadata(source)
        .with_context(|| format!("stat schema source: {}", source.display()))?;
    let paths: Vec<PathBuf> = if meta.is_dir() {
        let mut out = Vec::new();
        for entry in walkdir::WalkDir::new(source)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry =
                entry.with_context(|| format!("list schema directory: {}", source.display()))?;
            if !entry.file_type().is_file() || !is_schema_file(entry.path()) {
                continue;
            }
            out.push(entry.into_path());
        }
        out
    } else {
        vec![source.to_path_buf()]
    };

    let mut units = Vec::with_capacity(paths.len());
    for path in paths {
        let src = std::fs::read_to_string(&path)
            .with_context(|| format!("read schema source: {}", path.display()))?;
        if src.starts_with(GENERATED_HEADER) {
            debug!("skipping generated file {}", path.display());
            continue;
        }
        units.push(parse_unit(&path, &src)?);
    }
    Ok(units)
}

fn is_schema_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.ends_with(".rs") && !name.ends_with(ENCODING_SUFFIX)
}
