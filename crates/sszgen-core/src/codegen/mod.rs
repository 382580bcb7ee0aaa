//! Code generator: one resolved record -> Rust source text.
//!
//! Output is plain Rust with fully qualified std paths and no `use` items, so
//! any number of generated units can be `include!`d into one module. The
//! comment layout (`// Field (i) 'name'`, `// Offset (i) 'name'`) follows the
//! field order of the record so the encoding can be audited by eye.

mod marshal;
mod shared;
mod size;
mod unmarshal;
mod writer;

pub use shared::{shared_block, ERRORS};
pub use writer::Writer;

use crate::ir::{BitListRepr, ByteRepr, BytesLen, Field, Node, Record, RecordId, Registry, Shape};

/// Generated text of one record, split by concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedRecord {
    pub name: String,
    pub definition: String,
    pub marshal: String,
    pub unmarshal: String,
    pub size: String,
}

impl GeneratedRecord {
    /// Struct definition followed by its `impl` block.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.definition);
        out.push('\n');
        out.push_str(&format!("impl {} {{\n", self.name));
        out.push_str(&self.marshal);
        out.push('\n');
        out.push_str(&self.unmarshal);
        out.push('\n');
        out.push_str(&self.size);
        out.push_str("}\n");
        out
    }
}

pub fn generate_record(registry: &Registry, id: RecordId) -> GeneratedRecord {
    let record = registry.get(id);

    let mut w = Writer::new();
    definition(&mut w, registry, record);
    let definition = w.finish();

    let mut w = Writer::indented(1);
    w.line(&format!(
        "pub const SSZ_FIXED_SIZE: usize = {};",
        record.fixed_region()
    ));
    w.blank();
    marshal::emit(&mut w, record);
    let marshal = w.finish();

    let mut w = Writer::indented(1);
    unmarshal::emit(&mut w, registry, record);
    let unmarshal = w.finish();

    let mut w = Writer::indented(1);
    size::emit(&mut w, record);
    let size = w.finish();

    GeneratedRecord {
        name: record.name.clone(),
        definition,
        marshal,
        unmarshal,
        size,
    }
}

fn definition(w: &mut Writer, registry: &Registry, record: &Record) {
    let mut derives = vec!["Debug", "Clone", "PartialEq", "Eq"];
    if derives_default(registry, record) {
        derives.push("Default");
    }
    w.line(&format!("#[derive({})]", derives.join(", ")));
    w.open(&format!("pub struct {}", record.name));
    for f in &record.fields {
        w.line(&format!("pub {}: {},", f.name, rust_type(registry, &f.node)));
    }
    w.close();
}

/// Rust type of a node as declared in the generated struct.
pub fn rust_type(registry: &Registry, node: &Node) -> String {
    match &node.shape {
        Shape::Uint { bytes } => format!("u{}", u32::from(*bytes) * 8),
        Shape::Bool => "bool".to_string(),
        Shape::Bytes {
            repr: ByteRepr::Vec,
            ..
        }
        | Shape::BitVector {
            repr: ByteRepr::Vec,
            ..
        }
        | Shape::BitList {
            repr: BitListRepr::Bytes,
            ..
        } => "Vec<u8>".to_string(),
        Shape::Bytes {
            len: BytesLen::Fixed(n) | BytesLen::Max(n),
            repr: ByteRepr::Array,
        } => format!("[u8; {n}]"),
        Shape::BitVector {
            bits,
            repr: ByteRepr::Array,
        } => format!("[u8; {}]", bits.div_ceil(8)),
        Shape::BitList {
            repr: BitListRepr::External(path),
            ..
        } => path.clone(),
        Shape::Vector { elem, .. } | Shape::List { elem, .. } => {
            format!("Vec<{}>", rust_type(registry, elem))
        }
        Shape::Container { record, boxed } => {
            let name = &registry.get(*record).name;
            if *boxed {
                format!("Box<{name}>")
            } else {
                name.clone()
            }
        }
    }
}

/// `Default` is only implemented for byte arrays up to 32 elements.
pub fn derives_default(registry: &Registry, record: &Record) -> bool {
    record
        .fields
        .iter()
        .all(|f| node_has_default(registry, &f.node))
}

fn node_has_default(registry: &Registry, node: &Node) -> bool {
    match &node.shape {
        Shape::Bytes {
            len: BytesLen::Fixed(n) | BytesLen::Max(n),
            repr: ByteRepr::Array,
        } => *n <= 32,
        Shape::BitVector {
            bits,
            repr: ByteRepr::Array,
        } => bits.div_ceil(8) <= 32,
        Shape::Container { record, .. } => derives_default(registry, registry.get(*record)),
        _ => true,
    }
}

/// Local binding for a decoded field.
fn local(field: &Field) -> String {
    format!("f_{}", bare(&field.name))
}

/// Field name without a raw-identifier prefix, for comments and locals.
fn bare(name: &str) -> &str {
    name.strip_prefix("r#").unwrap_or(name)
}

/// Wraps anything but a plain path in parentheses so it can take a method
/// call or a prefix operator.
fn paren(expr: &str) -> String {
    if expr
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '#')
    {
        expr.to_string()
    } else {
        format!("({expr})")
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::resolve::Resolver;
    use crate::scan::parse_unit;

    fn generated(src: &str, name: &str) -> GeneratedRecord {
        let units = vec![parse_unit(Path::new("schema.rs"), src).expect("scan")];
        let mut r = Resolver::new(&units);
        let id = r.resolve(name).expect("resolve");
        let (registry, _) = r.finish();
        generate_record(&registry, id)
    }

    fn assert_parses(record: &GeneratedRecord) {
        let text = format!("{}\n{}", record.render(), shared_block());
        if let Err(e) = syn::parse_file(&text) {
            panic!("generated code does not parse: {e}\n{text}");
        }
    }

    #[test]
    fn fixed_record_layout_and_comments() {
        let g = generated(
            r#"pub struct Checkpoint { pub slot: u64, #[ssz(size = "32")] pub root: Vec<u8> }"#,
            "Checkpoint",
        );
        assert!(g
            .definition
            .starts_with("#[derive(Debug, Clone, PartialEq, Eq, Default)]\npub struct Checkpoint {"));
        assert!(g.definition.contains("    pub root: Vec<u8>,\n"));
        assert!(g.marshal.contains("pub const SSZ_FIXED_SIZE: usize = 40;"));
        assert!(g.marshal.contains("// Field (0) 'slot'"));
        assert!(g.marshal.contains("// Field (1) 'root'"));
        assert!(!g.marshal.contains("ssz_write_offset"));
        assert!(!g.marshal.contains("let offset"));
        assert!(g.unmarshal.contains("if size != Self::SSZ_FIXED_SIZE {"));
        assert!(g.size.contains("Self::SSZ_FIXED_SIZE"));
        assert_parses(&g);
    }

    #[test]
    fn dynamic_record_writes_offsets_first() {
        let g = generated(
            r#"pub struct B { pub a: u32, #[ssz(max = "16")] pub items: Vec<u64> }"#,
            "B",
        );
        let offset = g.marshal.find("// Offset (1) 'items'").expect("offset comment");
        let field = g.marshal.find("// Field (1) 'items'").expect("field comment");
        assert!(offset < field);
        assert!(g.marshal.contains("let offset = Self::SSZ_FIXED_SIZE;"));
        assert!(g.unmarshal.contains("if o1 != Self::SSZ_FIXED_SIZE {"));
        assert!(g.unmarshal.contains("if size < Self::SSZ_FIXED_SIZE {"));
        assert!(g.size.contains("size += self.items.len() * 8;"));
        assert!(g.marshal.contains("let start = buf.len();"));
        assert!(g.marshal.contains("    buf.truncate(start);"));
        assert_parses(&g);
    }

    #[test]
    fn large_byte_arrays_drop_default() {
        let g = generated(
            r#"pub struct Sig { pub sig: [u8; 96] } pub struct Wrap { pub s: Sig }"#,
            "Wrap",
        );
        assert!(g.definition.starts_with("#[derive(Debug, Clone, PartialEq, Eq)]"));
        assert_parses(&g);
    }

    #[test]
    fn nested_collections_parse() {
        let g = generated(
            r#"
            pub struct Leaf { #[ssz(max = "8")] pub data: Vec<u8> }
            pub struct Tree {
                #[ssz(max = "4")] pub leaves: Vec<Leaf>,
                #[ssz(size = "?,32", max = "10")] pub roots: Vec<Vec<u8>>,
                #[ssz(size = "2")] pub pair: Vec<Box<Leaf>>,
                #[ssz(max = "3")] pub rows: Vec<Vec<u16>>,
                #[ssz(bitlist, max = "64")] pub bits: Vec<u8>,
                #[ssz(bitvector, size = "12")] pub flags: Vec<u8>,
                pub agg: sszgen_core::bitlist::Bitlist,
                pub ok: bool,
                pub r#type: u8,
            }
            "#,
            "Tree",
        );
        assert!(g.definition.contains("pub pair: Vec<Box<Leaf>>,"));
        assert!(g.definition.contains("pub agg: sszgen_core::bitlist::Bitlist,"));
        assert!(g.unmarshal.contains("// Field (8) 'type'"));
        assert!(g.unmarshal.contains("r#type: f_type,"));
        assert_parses(&g);
    }

    #[test]
    fn empty_record_is_valid() {
        let g = generated("pub struct Empty {}", "Empty");
        assert!(g.marshal.contains("let _ = buf;"));
        assert!(g.unmarshal.contains("Ok(Self {})"));
        assert_parses(&g);
    }

    #[test]
    fn paren_wraps_only_compound_expressions() {
        assert_eq!(paren("self.items"), "self.items");
        assert_eq!(paren("*e0"), "(*e0)");
    }
}
