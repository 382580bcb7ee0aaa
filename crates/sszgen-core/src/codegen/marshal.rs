use super::{bare, paren, size, Writer};
use crate::ir::{BitListRepr, ByteRepr, BytesLen, Node, Record, Shape};

pub(super) fn emit(w: &mut Writer, record: &Record) {
    w.line("/// SSZ encoding of the record.");
    w.open("pub fn marshal_ssz(&self) -> Result<Vec<u8>, SszError>");
    w.line("let mut buf = Vec::with_capacity(self.size_ssz());");
    w.line("self.marshal_ssz_to(&mut buf)?;");
    w.line("Ok(buf)");
    w.close();
    w.blank();

    w.line("/// Appends the encoding to `buf`; offsets are relative to the record start.");
    w.line("/// On error `buf` is restored to its previous length.");
    w.open("pub fn marshal_ssz_to(&self, buf: &mut Vec<u8>) -> Result<(), SszError>");
    w.line("let start = buf.len();");
    w.line("let result = self.encode_ssz_to(buf);");
    w.open("if result.is_err()");
    w.line("buf.truncate(start);");
    w.close();
    w.line("result");
    w.close();
    w.blank();

    w.open("fn encode_ssz_to(&self, buf: &mut Vec<u8>) -> Result<(), SszError>");
    if record.fields.is_empty() {
        w.line("let _ = buf;");
    }

    let dynamic: Vec<usize> = record
        .fields
        .iter()
        .enumerate()
        .filter(|(_, f)| f.node.is_dynamic())
        .map(|(i, _)| i)
        .collect();
    match dynamic.len() {
        0 => {}
        1 => w.line("let offset = Self::SSZ_FIXED_SIZE;"),
        _ => w.line("let mut offset = Self::SSZ_FIXED_SIZE;"),
    }

    for (i, f) in record.fields.iter().enumerate() {
        let v = format!("self.{}", f.name);
        if f.node.is_dynamic() {
            w.line(&format!("// Offset ({i}) '{}'", bare(&f.name)));
            w.line("ssz_write_offset(buf, offset)?;");
            if dynamic.last() != Some(&i) {
                w.line(&format!("offset += {};", size::expr(&f.node, &v, 0)));
            }
        } else {
            w.line(&format!("// Field ({i}) '{}'", bare(&f.name)));
            encode(w, &f.node, &v, 0);
        }
        w.blank();
    }

    for &i in &dynamic {
        let f = &record.fields[i];
        w.line(&format!("// Field ({i}) '{}'", bare(&f.name)));
        encode(w, &f.node, &format!("self.{}", f.name), 0);
        w.blank();
    }

    w.line("Ok(())");
    w.close();
}

/// Appends the encoding of `v` to `buf`.
fn encode(w: &mut Writer, node: &Node, v: &str, depth: usize) {
    let p = paren(v);
    match &node.shape {
        Shape::Uint { bytes: 1 } => w.line(&format!("buf.push({v});")),
        Shape::Uint { .. } => w.line(&format!("buf.extend_from_slice(&{p}.to_le_bytes());")),
        Shape::Bool => w.line(&format!("buf.push(u8::from({v}));")),
        Shape::Bytes {
            len: BytesLen::Fixed(n),
            repr: ByteRepr::Vec,
        } => {
            w.guard(&format!("{p}.len() != {n}"), "MarshalFixedBytes");
            w.line(&format!("buf.extend_from_slice(&{p});"));
        }
        Shape::Bytes {
            len: BytesLen::Max(max),
            ..
        } => {
            w.guard(&format!("{p}.len() > {max}"), "MarshalDynamicBytes");
            w.line(&format!("buf.extend_from_slice(&{p});"));
        }
        Shape::Bytes {
            repr: ByteRepr::Array,
            ..
        } => w.line(&format!("buf.extend_from_slice(&{p});")),
        Shape::BitVector { bits, repr } => {
            let len = bits.div_ceil(8);
            if *repr == ByteRepr::Vec {
                w.guard(&format!("{p}.len() != {len}"), "InvalidBitvector");
            }
            if bits % 8 != 0 {
                w.guard(
                    &format!("{p}[{}] >> {} != 0", len - 1, bits % 8),
                    "InvalidBitvector",
                );
            }
            w.line(&format!("buf.extend_from_slice(&{p});"));
        }
        Shape::BitList {
            max,
            repr: BitListRepr::Bytes,
        } => {
            match max {
                Some(max) => w.guard(&format!("ssz_bitlist_len(&{p})? > {max}"), "ListTooBig"),
                None => w.line(&format!("ssz_bitlist_len(&{p})?;")),
            }
            w.line(&format!("buf.extend_from_slice(&{p});"));
        }
        Shape::BitList {
            max,
            repr: BitListRepr::External(_),
        } => {
            if let Some(max) = max {
                w.guard(&format!("{p}.len() > {max}"), "ListTooBig");
            }
            w.line(&format!("buf.extend_from_slice({p}.as_bytes());"));
        }
        Shape::Vector { elem, len } => {
            w.guard(&format!("{p}.len() != {len}"), "MarshalVector");
            items(w, elem, &p, depth);
        }
        Shape::List { elem, max } => {
            w.guard(&format!("{p}.len() > {max}"), "ListTooBig");
            items(w, elem, &p, depth);
        }
        Shape::Container { .. } => w.line(&format!("{p}.encode_ssz_to(buf)?;")),
    }
}

/// Items of a vector or list. Dynamic items are preceded by their offset
/// table, relative to the start of the collection.
fn items(w: &mut Writer, elem: &Node, p: &str, depth: usize) {
    let e = format!("e{depth}");
    let item = format!("*{e}");
    if elem.is_dynamic() {
        let c = format!("c{depth}");
        w.line(&format!("let mut {c} = {p}.len() * 4;"));
        w.open(&format!("for {e} in {p}.iter()"));
        w.line(&format!("ssz_write_offset(buf, {c})?;"));
        w.line(&format!(
            "{c} += {};",
            size::expr(elem, &item, depth + 1)
        ));
        w.close();
    }
    w.open(&format!("for {e} in {p}.iter()"));
    encode(w, elem, &item, depth + 1);
    w.close();
}
