//! Field annotations: `#[ssz(bitlist)]`, `#[ssz(size = "N")]`,
//! `#[ssz(size = "F,S")]`, `#[ssz(max = "N")]`.
//!
//! The scanner only captures the raw strings; they are interpreted here, on
//! demand, by the resolver, because whether `size` is a count or a tuple
//! depends on the field's shape.

use serde::{Deserialize, Serialize};

use crate::diagnostics::{Diagnostic, DiagnosticCode, Phase};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Marker {
    Bitlist,
    Bitvector,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotations {
    pub marker: Option<Marker>,
    pub size: Option<String>,
    pub max: Option<String>,
}

/// Outer dimension of a two-level byte array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outer {
    Fixed(u64),
    /// `?`: the outer dimension is a list bounded by `max`.
    Dynamic,
}

impl Annotations {
    pub fn from_attrs(attrs: &[syn::Attribute]) -> syn::Result<Self> {
        let mut out = Annotations::default();
        for attr in attrs {
            if !attr.path().is_ident("ssz") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("bitlist") || meta.path.is_ident("bitvector") {
                    let marker = if meta.path.is_ident("bitlist") {
                        Marker::Bitlist
                    } else {
                        Marker::Bitvector
                    };
                    if out.marker.is_some() {
                        return Err(meta.error("only one of `bitlist`/`bitvector` may be given"));
                    }
                    out.marker = Some(marker);
                    Ok(())
                } else if meta.path.is_ident("size") {
                    if out.size.is_some() {
                        return Err(meta.error("duplicate ssz annotation `size`"));
                    }
                    out.size = Some(literal_text(meta.value()?)?);
                    Ok(())
                } else if meta.path.is_ident("max") {
                    if out.max.is_some() {
                        return Err(meta.error("duplicate ssz annotation `max`"));
                    }
                    out.max = Some(literal_text(meta.value()?)?);
                    Ok(())
                } else {
                    Err(meta.error("unknown ssz annotation"))
                }
            })?;
        }
        Ok(out)
    }

    pub fn is_empty(&self) -> bool {
        self.marker.is_none() && self.size.is_none() && self.max.is_none()
    }

    /// `size = "N"`; a tuple here is an arity error.
    pub fn size_count(&self) -> Result<Option<u64>, Diagnostic> {
        let Some(raw) = &self.size else {
            return Ok(None);
        };
        if raw.contains(',') {
            return Err(Diagnostic::error(
                DiagnosticCode::SSZG0103TupleArity,
                Phase::Resolve,
                format!("ssz size {raw:?} is a tuple but this field takes a single count"),
            ));
        }
        parse_positive("size", raw).map(Some)
    }

    /// `size = "F,S"` where F may be `?`.
    pub fn size_tuple(&self) -> Result<Option<(Outer, u64)>, Diagnostic> {
        let Some(raw) = &self.size else {
            return Ok(None);
        };
        let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
        if parts.len() != 2 {
            return Err(Diagnostic::error(
                DiagnosticCode::SSZG0103TupleArity,
                Phase::Resolve,
                format!("ssz size {raw:?} must have the form \"F,S\" or \"?,S\""),
            ));
        }
        let outer = if parts[0] == "?" {
            Outer::Dynamic
        } else {
            Outer::Fixed(parse_positive("size", parts[0])?)
        };
        let inner = parse_positive("size", parts[1])?;
        Ok(Some((outer, inner)))
    }

    pub fn max(&self) -> Result<Option<u64>, Diagnostic> {
        match &self.max {
            None => Ok(None),
            Some(raw) => parse_count("max", raw).map(Some),
        }
    }
}

fn literal_text(input: syn::parse::ParseStream<'_>) -> syn::Result<String> {
    let lit: syn::Lit = input.parse()?;
    match lit {
        syn::Lit::Str(s) => Ok(s.value()),
        syn::Lit::Int(i) => Ok(i.base10_digits().to_string()),
        other => Err(syn::Error::new(
            other.span(),
            "expected a string or integer literal",
        )),
    }
}

fn parse_count(key: &str, raw: &str) -> Result<u64, Diagnostic> {
    raw.trim().parse::<u64>().map_err(|_| {
        Diagnostic::error(
            DiagnosticCode::SSZG0102InvalidAnnotationValue,
            Phase::Resolve,
            format!("ssz {key} {raw:?} is not a number"),
        )
    })
}

fn parse_positive(key: &str, raw: &str) -> Result<u64, Diagnostic> {
    let n = parse_count(key, raw)?;
    if n == 0 {
        return Err(Diagnostic::error(
            DiagnosticCode::SSZG0102InvalidAnnotationValue,
            Phase::Resolve,
            format!("ssz {key} must be at least 1 (use '?' for a dynamic outer dimension)"),
        ));
    }
    Ok(n)
}
