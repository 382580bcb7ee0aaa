//! Type resolver: declared field shapes plus annotations -> IR nodes.
//!
//! A [`Resolver`] is the resolution context of one generation run. It owns
//! the [`Registry`] being built and memoizes every record by name, so each
//! record is resolved exactly once no matter how many fields refer to it.

use std::collections::BTreeMap;

use log::debug;

use crate::annotations::{Annotations, Marker, Outer};
use crate::classify;
use crate::diagnostics::{Diagnostic, DiagnosticCode, Phase};
use crate::ir::{BitListRepr, ByteRepr, BytesLen, Field, Node, Record, RecordId, Registry, Shape};
use crate::scan::{RecordDecl, Unit};
use crate::util::describe_type;

const UNSUPPORTED_PRIMITIVES: &[&str] = &[
    "i8", "i16", "i32", "i64", "i128", "isize", "u128", "usize", "f32", "f64", "char", "str",
    "String",
];

#[derive(Debug)]
pub struct Resolver<'a> {
    decls: BTreeMap<&'a str, (&'a Unit, &'a RecordDecl)>,
    registry: Registry,
    in_progress: Vec<String>,
    warnings: Vec<Diagnostic>,
}

impl<'a> Resolver<'a> {
    pub fn new(units: &'a [Unit]) -> Self {
        let mut decls: BTreeMap<&str, (&Unit, &RecordDecl)> = BTreeMap::new();
        let mut warnings = Vec::new();
        for unit in units {
            for decl in &unit.records {
                if let Some((first, _)) = decls.get(decl.name.as_str()) {
                    warnings.push(
                        Diagnostic::warning(
                            DiagnosticCode::SSZG0204DuplicateRecord,
                            Phase::Resolve,
                            format!(
                                "record {} is already declared in {}; this declaration is ignored",
                                decl.name, first.name
                            ),
                        )
                        .at(format!("{}: {}", unit.name, decl.name)),
                    );
                    continue;
                }
                decls.insert(decl.name.as_str(), (unit, decl));
            }
        }
        Resolver {
            decls,
            registry: Registry::default(),
            in_progress: Vec::new(),
            warnings,
        }
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.decls.contains_key(name)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn finish(self) -> (Registry, Vec<Diagnostic>) {
        (self.registry, self.warnings)
    }

    pub fn resolve(&mut self, name: &str) -> Result<RecordId, Diagnostic> {
        if let Some(id) = self.registry.lookup(name) {
            return Ok(id);
        }
        let Some(&(unit, decl)) = self.decls.get(name) else {
            return Err(Diagnostic::error(
                DiagnosticCode::SSZG0202UnknownRecord,
                Phase::Resolve,
                format!("record {name} is not declared in any scanned unit"),
            ));
        };
        if self.in_progress.iter().any(|n| n == name) {
            let mut chain = self.in_progress.clone();
            chain.push(name.to_string());
            return Err(Diagnostic::error(
                DiagnosticCode::SSZG0203RecursiveRecord,
                Phase::Resolve,
                format!("recursive record chain: {}", chain.join(" -> ")),
            ));
        }

        self.in_progress.push(name.to_string());
        let built = self.build_record(unit, decl);
        self.in_progress.pop();
        let record = built?;

        debug!(
            "resolved record {} ({} fields, {:?})",
            record.name,
            record.fields.len(),
            record.layout
        );
        Ok(self.registry.insert(record))
    }

    fn build_record(&mut self, unit: &Unit, decl: &RecordDecl) -> Result<Record, Diagnostic> {
        let mut fields = Vec::with_capacity(decl.fields.len());
        for f in &decl.fields {
            let node = self
                .resolve_type(&f.annotations, &f.ty)
                .map_err(|d| d.at(format!("{}: {}.{}", unit.name, decl.name, f.name)))?;
            fields.push(Field {
                name: f.name.clone(),
                node,
            });
        }
        let layout = classify::record_layout(&fields)
            .map_err(|d| d.at(format!("{}: {}", unit.name, decl.name)))?;
        Ok(Record {
            name: decl.name.clone(),
            unit: unit.name.clone(),
            fields,
            layout,
        })
    }

    fn node(&self, shape: Shape) -> Result<Node, Diagnostic> {
        let layout = classify::classify(&self.registry, &shape)?;
        Ok(Node { shape, layout })
    }

    fn resolve_type(&mut self, ann: &Annotations, ty: &syn::Type) -> Result<Node, Diagnostic> {
        match ty {
            syn::Type::Paren(p) => self.resolve_type(ann, &p.elem),
            syn::Type::Group(g) => self.resolve_type(ann, &g.elem),
            syn::Type::Array(a) => self.resolve_array(ann, a),
            syn::Type::Path(p) if p.qself.is_none() => self.resolve_path(ann, ty, &p.path),
            other => Err(unsupported(other, "unsupported field type")),
        }
    }

    fn resolve_path(
        &mut self,
        ann: &Annotations,
        ty: &syn::Type,
        path: &syn::Path,
    ) -> Result<Node, Diagnostic> {
        let Some(last) = path.segments.last() else {
            return Err(unsupported(ty, "empty type path"));
        };
        let ident = last.ident.to_string();

        if ident == "Bitlist" && last.arguments.is_none() {
            return self.node(Shape::BitList {
                max: ann.max()?,
                repr: BitListRepr::External(describe_type(ty)),
            });
        }

        match &last.arguments {
            syn::PathArguments::AngleBracketed(args) if ident == "Vec" => {
                let elem = single_type_arg(ty, args)?;
                self.resolve_vec(ann, ty, elem)
            }
            syn::PathArguments::AngleBracketed(args) if ident == "Box" => {
                let elem = single_type_arg(ty, args)?;
                let Some(name) = plain_ident(elem) else {
                    return Err(unsupported(ty, "Box may only point to a record type"));
                };
                self.container(&name, true)
            }
            syn::PathArguments::None if path.segments.len() == 1 => match ident.as_str() {
                "u8" => self.node(Shape::Uint { bytes: 1 }),
                "u16" => self.node(Shape::Uint { bytes: 2 }),
                "u32" => self.node(Shape::Uint { bytes: 4 }),
                "u64" => self.node(Shape::Uint { bytes: 8 }),
                "bool" => self.node(Shape::Bool),
                other if UNSUPPORTED_PRIMITIVES.contains(&other) => Err(Diagnostic::error(
                    DiagnosticCode::SSZG0201UnsupportedPrimitive,
                    Phase::Resolve,
                    format!("basic type {other} has no SSZ mapping"),
                )),
                other => self.container(other, false),
            },
            _ => Err(unsupported(ty, "unsupported type path")),
        }
    }

    fn resolve_vec(
        &mut self,
        ann: &Annotations,
        ty: &syn::Type,
        elem: &syn::Type,
    ) -> Result<Node, Diagnostic> {
        if is_u8(elem) {
            return self.byte_sequence(ann);
        }

        if vec_elem(elem).is_some_and(is_u8) {
            let Some((outer, inner)) = ann.size_tuple()? else {
                return Err(missing("Vec<Vec<u8>> expects a ssz size tag"));
            };
            let item = self.node(Shape::Bytes {
                len: BytesLen::Fixed(inner),
                repr: ByteRepr::Vec,
            })?;
            return match outer {
                Outer::Fixed(len) => self.node(Shape::Vector {
                    elem: Box::new(item),
                    len,
                }),
                Outer::Dynamic => {
                    let Some(max) = ann.max()? else {
                        return Err(missing("ssz max not set after '?' field on ssz size"));
                    };
                    self.node(Shape::List {
                        elem: Box::new(item),
                        max,
                    })
                }
            };
        }

        let item = self.resolve_type(ann, elem)?;
        if item.fixed_size() == Some(0) {
            return Err(unsupported(ty, "collection items must not be zero-sized"));
        }
        if let Some(len) = ann.size_count()? {
            return self.node(Shape::Vector {
                elem: Box::new(item),
                len,
            });
        }
        let Some(max) = ann.max()? else {
            return Err(missing("slice expects either ssz max or ssz size"));
        };
        self.node(Shape::List {
            elem: Box::new(item),
            max,
        })
    }

    fn byte_sequence(&mut self, ann: &Annotations) -> Result<Node, Diagnostic> {
        match ann.marker {
            Some(Marker::Bitlist) => self.node(Shape::BitList {
                max: ann.max()?,
                repr: BitListRepr::Bytes,
            }),
            Some(Marker::Bitvector) => {
                let Some(bits) = ann.size_count()? else {
                    return Err(missing("bitvector expects a ssz size tag with its bit length"));
                };
                self.node(Shape::BitVector {
                    bits,
                    repr: ByteRepr::Vec,
                })
            }
            None => {
                if let Some(n) = ann.size_count()? {
                    return self.node(Shape::Bytes {
                        len: BytesLen::Fixed(n),
                        repr: ByteRepr::Vec,
                    });
                }
                let Some(max) = ann.max()? else {
                    return Err(missing("Vec<u8> expects either ssz max or ssz size"));
                };
                self.node(Shape::Bytes {
                    len: BytesLen::Max(max),
                    repr: ByteRepr::Vec,
                })
            }
        }
    }

    fn resolve_array(
        &mut self,
        ann: &Annotations,
        array: &syn::TypeArray,
    ) -> Result<Node, Diagnostic> {
        let ty = syn::Type::Array(array.clone());
        if !is_u8(&array.elem) {
            return Err(unsupported(&ty, "fixed arrays are only supported for u8 items"));
        }
        let len = match &array.len {
            syn::Expr::Lit(syn::ExprLit {
                lit: syn::Lit::Int(i),
                ..
            }) => i
                .base10_parse::<u64>()
                .map_err(|_| unsupported(&ty, "array length is out of range"))?,
            _ => return Err(unsupported(&ty, "array length must be an integer literal")),
        };
        if len == 0 {
            return Err(unsupported(&ty, "zero-length byte arrays have no SSZ encoding"));
        }
        match ann.marker {
            Some(Marker::Bitlist) => Err(unsupported(
                &ty,
                "a bitlist must be declared as Vec<u8> or a Bitlist type",
            )),
            Some(Marker::Bitvector) => {
                let Some(bits) = ann.size_count()? else {
                    return Err(missing("bitvector expects a ssz size tag with its bit length"));
                };
                if bits.div_ceil(8) != len {
                    return Err(Diagnostic::error(
                        DiagnosticCode::SSZG0102InvalidAnnotationValue,
                        Phase::Resolve,
                        format!("bitvector of {bits} bits does not fit [u8; {len}]"),
                    ));
                }
                self.node(Shape::BitVector {
                    bits,
                    repr: ByteRepr::Array,
                })
            }
            None => self.node(Shape::Bytes {
                len: BytesLen::Fixed(len),
                repr: ByteRepr::Array,
            }),
        }
    }

    fn container(&mut self, name: &str, boxed: bool) -> Result<Node, Diagnostic> {
        let record = self.resolve(name)?;
        self.node(Shape::Container { record, boxed })
    }
}

fn single_type_arg<'t>(
    ty: &syn::Type,
    args: &'t syn::AngleBracketedGenericArguments,
) -> Result<&'t syn::Type, Diagnostic> {
    let mut types = args.args.iter().filter_map(|a| match a {
        syn::GenericArgument::Type(t) => Some(t),
        _ => None,
    });
    match (types.next(), types.next(), args.args.len()) {
        (Some(t), None, 1) => Ok(t),
        _ => Err(unsupported(ty, "expected exactly one type argument")),
    }
}

fn plain_ident(ty: &syn::Type) -> Option<String> {
    match ty {
        syn::Type::Path(p) if p.qself.is_none() => p.path.get_ident().map(|i| i.to_string()),
        _ => None,
    }
}

fn is_u8(ty: &syn::Type) -> bool {
    plain_ident(ty).is_some_and(|n| n == "u8")
}

fn vec_elem(ty: &syn::Type) -> Option<&syn::Type> {
    let syn::Type::Path(p) = ty else {
        return None;
    };
    let last = p.path.segments.last()?;
    if last.ident != "Vec" {
        return None;
    }
    let syn::PathArguments::AngleBracketed(args) = &last.arguments else {
        return None;
    };
    match args.args.first() {
        Some(syn::GenericArgument::Type(t)) if args.args.len() == 1 => Some(t),
        _ => None,
    }
}

fn missing(message: &str) -> Diagnostic {
    Diagnostic::error(
        DiagnosticCode::SSZG0101MissingAnnotation,
        Phase::Resolve,
        message,
    )
}

fn unsupported(ty: &syn::Type, why: &str) -> Diagnostic {
    Diagnostic::error(
        DiagnosticCode::SSZG0200UnsupportedShape,
        Phase::Resolve,
        format!("{why}: {}", describe_type(ty)),
    )
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::ir::{Kind, Layout};
    use crate::scan::parse_unit;

    fn units(src: &str) -> Vec<Unit> {
        vec![parse_unit(Path::new("schema.rs"), src).expect("scan")]
    }

    fn resolve_one(src: &str, name: &str) -> Result<Registry, Diagnostic> {
        let units = units(src);
        let mut r = Resolver::new(&units);
        r.resolve(name)?;
        Ok(r.finish().0)
    }

    fn field<'r>(reg: &'r Registry, record: &str, field: &str) -> &'r Node {
        let id = reg.lookup(record).expect("record");
        &reg
            .get(id)
            .fields
            .iter()
            .find(|f| f.name == field)
            .expect("field")
            .node
    }

    #[test]
    fn scenario_a_is_fixed_40() {
        let reg = resolve_one(
            r#"pub struct A { pub slot: u64, #[ssz(size = "32")] pub root: Vec<u8> }"#,
            "A",
        )
        .expect("resolve");
        let a = reg.get(reg.lookup("A").expect("A"));
        assert_eq!(a.layout, Layout::Fixed(40));
    }

    #[test]
    fn scenario_b_is_dynamic_with_8_byte_fixed_region() {
        let reg = resolve_one(
            r#"pub struct B { pub a: u32, #[ssz(max = "16")] pub items: Vec<u64> }"#,
            "B",
        )
        .expect("resolve");
        let b = reg.get(reg.lookup("B").expect("B"));
        assert_eq!(b.layout, Layout::Dynamic { fixed_part: 8 });
        let items = field(&reg, "B", "items");
        assert_eq!(items.kind(), Kind::List);
        assert_eq!(items.bound_size(), Some(16));
    }

    #[test]
    fn scenario_c_tuple_with_dynamic_outer() {
        let reg = resolve_one(
            r#"pub struct C { #[ssz(size = "?,32", max = "10")] pub roots: Vec<Vec<u8>> }"#,
            "C",
        )
        .expect("resolve");
        let roots = field(&reg, "C", "roots");
        assert_eq!(roots.kind(), Kind::List);
        assert_eq!(roots.bound_size(), Some(10));
        let item = roots.element().expect("element");
        assert_eq!(item.kind(), Kind::Bytes);
        assert_eq!(item.fixed_size(), Some(32));

        let err = resolve_one(
            r#"pub struct C { #[ssz(size = "?,32")] pub roots: Vec<Vec<u8>> }"#,
            "C",
        )
        .expect_err("missing max");
        assert_eq!(err.code, DiagnosticCode::SSZG0101MissingAnnotation);
        assert_eq!(err.location.as_deref(), Some("schema.rs: C.roots"));
    }

    #[test]
    fn tuple_with_fixed_outer_is_a_vector() {
        let reg = resolve_one(
            r#"pub struct V { #[ssz(size = "4,32")] pub roots: Vec<Vec<u8>> }"#,
            "V",
        )
        .expect("resolve");
        let roots = field(&reg, "V", "roots");
        assert_eq!(roots.kind(), Kind::Vector);
        assert_eq!(roots.fixed_size(), Some(128));
    }

    #[test]
    fn byte_sequences() {
        let reg = resolve_one(
            r#"pub struct S {
                #[ssz(bitlist, max = "2048")] pub bits: Vec<u8>,
                #[ssz(max = "256")] pub extra: Vec<u8>,
                pub hash: [u8; 32],
                #[ssz(bitvector, size = "4")] pub flags: [u8; 1],
                pub agg: sszgen_core::bitlist::Bitlist,
            }"#,
            "S",
        )
        .expect("resolve");
        assert_eq!(field(&reg, "S", "bits").kind(), Kind::BitList);
        assert!(field(&reg, "S", "extra").is_dynamic());
        assert_eq!(field(&reg, "S", "hash").fixed_size(), Some(32));
        assert_eq!(field(&reg, "S", "flags").kind(), Kind::BitVector);
        assert_eq!(
            field(&reg, "S", "agg").shape,
            Shape::BitList {
                max: None,
                repr: BitListRepr::External("sszgen_core::bitlist::Bitlist".to_string()),
            }
        );
    }

    #[test]
    fn missing_annotations_are_configuration_errors() {
        let err = resolve_one("pub struct S { pub a: Vec<u8> }", "S").expect_err("bytes");
        assert_eq!(err.code, DiagnosticCode::SSZG0101MissingAnnotation);
        let err = resolve_one("pub struct S { pub a: Vec<u64> }", "S").expect_err("slice");
        assert_eq!(err.code, DiagnosticCode::SSZG0101MissingAnnotation);
        let err =
            resolve_one("pub struct S { pub a: Vec<Vec<u8>> }", "S").expect_err("two-level");
        assert_eq!(err.code, DiagnosticCode::SSZG0101MissingAnnotation);
    }

    #[test]
    fn unsupported_shapes_are_reported_not_fatal() {
        let err = resolve_one("pub struct S { pub a: i32 }", "S").expect_err("i32");
        assert_eq!(err.code, DiagnosticCode::SSZG0201UnsupportedPrimitive);
        let err = resolve_one("pub struct S { pub a: Option<u8> }", "S").expect_err("option");
        assert_eq!(err.code, DiagnosticCode::SSZG0200UnsupportedShape);
        assert!(err.message.contains("Option<u8>"));
        let err = resolve_one("pub struct S { pub a: &'static [u8] }", "S").expect_err("ref");
        assert_eq!(err.code, DiagnosticCode::SSZG0200UnsupportedShape);
        let err = resolve_one("pub struct S { pub a: [u64; 4] }", "S").expect_err("array");
        assert_eq!(err.code, DiagnosticCode::SSZG0200UnsupportedShape);
    }

    #[test]
    fn unknown_and_recursive_records() {
        let err = resolve_one("pub struct S { pub a: Missing }", "S").expect_err("unknown");
        assert_eq!(err.code, DiagnosticCode::SSZG0202UnknownRecord);

        let err = resolve_one(
            "pub struct A { pub b: Box<B> } pub struct B { pub a: Box<A> }",
            "A",
        )
        .expect_err("cycle");
        assert_eq!(err.code, DiagnosticCode::SSZG0203RecursiveRecord);
        assert!(err.message.contains("A -> B -> A"));
    }

    #[test]
    fn shared_records_resolve_once_and_keep_use_site_names() {
        let reg = resolve_one(
            r#"
            pub struct Checkpoint { pub epoch: u64, pub root: [u8; 32] }
            pub struct Data { pub source: Checkpoint, pub target: Box<Checkpoint> }
            "#,
            "Data",
        )
        .expect("resolve");
        assert_eq!(reg.iter().count(), 2);
        let data = reg.get(reg.lookup("Data").expect("Data"));
        let names: Vec<&str> = data.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["source", "target"]);
        assert_eq!(data.layout, Layout::Fixed(80));
        assert_eq!(reg.get(reg.lookup("Checkpoint").expect("cp")).name, "Checkpoint");
    }

    #[test]
    fn duplicate_declarations_warn_and_first_wins() {
        let units = vec![
            parse_unit(Path::new("a.rs"), "pub struct X { pub a: u8 }").expect("a"),
            parse_unit(Path::new("b.rs"), "pub struct X { pub a: u64 }").expect("b"),
        ];
        let mut r = Resolver::new(&units);
        let id = r.resolve("X").expect("resolve");
        assert_eq!(r.registry().get(id).unit, "a.rs");
        let (_, warnings) = r.finish();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].code, DiagnosticCode::SSZG0204DuplicateRecord);
    }

    #[test]
    fn nested_lists_reuse_the_field_annotations() {
        let reg = resolve_one(
            r#"pub struct N { #[ssz(max = "4")] pub rows: Vec<Vec<u64>> }"#,
            "N",
        )
        .expect("resolve");
        let rows = field(&reg, "N", "rows");
        assert_eq!(rows.kind(), Kind::List);
        let inner = rows.element().expect("inner");
        assert_eq!(inner.kind(), Kind::List);
        assert_eq!(inner.bound_size(), Some(4));
    }
}
