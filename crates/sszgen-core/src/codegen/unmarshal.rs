use super::{bare, local, Writer};
use crate::ir::{BitListRepr, ByteRepr, BytesLen, Node, Record, Registry, Shape};

pub(super) fn emit(w: &mut Writer, registry: &Registry, record: &Record) {
    w.line("/// Decodes a record from exactly `buf`.");
    w.open("pub fn unmarshal_ssz(buf: &[u8]) -> Result<Self, SszError>");
    w.line("let size = buf.len();");
    if record.is_dynamic() {
        w.guard("size < Self::SSZ_FIXED_SIZE", "Size");
    } else {
        w.guard("size != Self::SSZ_FIXED_SIZE", "Size");
    }
    w.blank();

    // Fixed region: fixed fields in place, offsets for dynamic ones.
    let mut pos: u64 = 0;
    let mut offsets: Vec<(usize, String)> = Vec::new();
    for (i, f) in record.fields.iter().enumerate() {
        match f.node.fixed_size() {
            Some(n) => {
                w.line(&format!("// Field ({i}) '{}'", bare(&f.name)));
                let src = format!("buf[{pos}..{}]", pos + n);
                decode(w, registry, &f.node, &src, &local(f), 0);
                pos += n;
            }
            None => {
                let o = format!("o{i}");
                w.line(&format!("// Offset ({i}) '{}'", bare(&f.name)));
                w.line(&format!("let {o} = ssz_read_offset(buf, {pos})?;"));
                match offsets.last() {
                    None => w.guard(&format!("{o} != Self::SSZ_FIXED_SIZE"), "Offset"),
                    Some((_, prev)) => {
                        w.guard(&format!("{o} < {prev} || {o} > size"), "Offset")
                    }
                }
                offsets.push((i, o));
                pos += 4;
            }
        }
        w.blank();
    }

    // Variable region: each dynamic field spans up to the next offset.
    for (k, (i, o)) in offsets.iter().enumerate() {
        let f = &record.fields[*i];
        let end = offsets
            .get(k + 1)
            .map(|(_, next)| next.as_str())
            .unwrap_or("size");
        w.line(&format!("// Field ({i}) '{}'", bare(&f.name)));
        decode(w, registry, &f.node, &format!("buf[{o}..{end}]"), &local(f), 0);
        w.blank();
    }

    if record.fields.is_empty() {
        w.line("Ok(Self {})");
    } else {
        w.open("Ok(Self");
        for f in &record.fields {
            w.line(&format!("{}: {},", f.name, local(f)));
        }
        w.close_with("})");
    }
    w.close();
}

/// Binds `target` to the value decoded from `src`, a `[u8]` place
/// expression spanning exactly the node's encoding.
fn decode(w: &mut Writer, registry: &Registry, node: &Node, src: &str, target: &str, depth: usize) {
    match &node.shape {
        Shape::Uint { bytes: 1 } => w.line(&format!("let {target} = {src}[0];")),
        Shape::Uint { bytes } => w.line(&format!(
            "let {target} = u{}::from_le_bytes(<[u8; {bytes}]>::try_from(&{src}).map_err(|_| SszError::Size)?);",
            u32::from(*bytes) * 8
        )),
        Shape::Bool => {
            w.open(&format!("let {target} = match {src}[0]"));
            w.line("0 => false,");
            w.line("1 => true,");
            w.line("_ => return Err(SszError::InvalidBool),");
            w.close_with("};");
        }
        Shape::Bytes {
            len: BytesLen::Max(max),
            ..
        } => {
            w.guard(&format!("{src}.len() > {max}"), "ListTooBig");
            w.line(&format!("let {target} = {src}.to_vec();"));
        }
        Shape::Bytes {
            len: BytesLen::Fixed(len),
            repr,
        } => bytes(w, *repr, *len, src, target),
        Shape::BitVector { bits, repr } => {
            bytes(w, *repr, bits.div_ceil(8), src, target);
            if bits % 8 != 0 {
                w.guard(
                    &format!("{target}[{}] >> {} != 0", bits.div_ceil(8) - 1, bits % 8),
                    "InvalidBitvector",
                );
            }
        }
        Shape::BitList {
            max,
            repr: BitListRepr::Bytes,
        } => {
            match max {
                Some(max) => w.guard(&format!("ssz_bitlist_len(&{src})? > {max}"), "ListTooBig"),
                None => w.line(&format!("ssz_bitlist_len(&{src})?;")),
            }
            w.line(&format!("let {target} = {src}.to_vec();"));
        }
        Shape::BitList {
            max,
            repr: BitListRepr::External(path),
        } => {
            w.line(&format!(
                "let {target} = {path}::from_bytes({src}.to_vec()).ok_or(SszError::InvalidBitlist)?;"
            ));
            if let Some(max) = max {
                w.guard(&format!("{target}.len() > {max}"), "ListTooBig");
            }
        }
        Shape::Vector { elem, len } => match elem.fixed_size() {
            Some(es) => {
                w.line(&format!("let mut {target} = Vec::with_capacity({len});"));
                chunks(w, registry, elem, src, target, es, depth);
            }
            None => offset_table(w, registry, elem, src, target, Bound::Exact(*len), depth),
        },
        Shape::List { elem, max } => match elem.fixed_size() {
            Some(es) => {
                let n = format!("n{depth}");
                w.guard(&format!("{src}.len() % {es} != 0"), "DivideInt");
                w.line(&format!("let {n} = {src}.len() / {es};"));
                w.guard(&format!("{n} > {max}"), "ListTooBig");
                w.line(&format!("let mut {target} = Vec::with_capacity({n});"));
                chunks(w, registry, elem, src, target, es, depth);
            }
            None => offset_table(w, registry, elem, src, target, Bound::Max(*max), depth),
        },
        Shape::Container { record, boxed } => {
            let name = &registry.get(*record).name;
            if *boxed {
                w.line(&format!(
                    "let {target} = Box::new({name}::unmarshal_ssz(&{src})?);"
                ));
            } else {
                w.line(&format!("let {target} = {name}::unmarshal_ssz(&{src})?;"));
            }
        }
    }
}

fn bytes(w: &mut Writer, repr: ByteRepr, len: u64, src: &str, target: &str) {
    match repr {
        ByteRepr::Vec => w.line(&format!("let {target} = {src}.to_vec();")),
        ByteRepr::Array => w.line(&format!(
            "let {target} = <[u8; {len}]>::try_from(&{src}).map_err(|_| SszError::Size)?;"
        )),
    }
}

/// Fixed-size items, one chunk each.
fn chunks(
    w: &mut Writer,
    registry: &Registry,
    elem: &Node,
    src: &str,
    target: &str,
    es: u64,
    depth: usize,
) {
    let c = format!("c{depth}");
    let e = format!("e{depth}");
    w.open(&format!("for {c} in {src}.chunks_exact({es})"));
    decode(w, registry, elem, &format!("{c}[..]"), &e, depth + 1);
    w.line(&format!("{target}.push({e});"));
    w.close();
}

#[derive(Clone, Copy)]
enum Bound {
    Exact(u64),
    Max(u64),
}

/// Dynamic items behind an offset table at the start of `src`.
fn offset_table(
    w: &mut Writer,
    registry: &Registry,
    elem: &Node,
    src: &str,
    target: &str,
    bound: Bound,
    depth: usize,
) {
    let b = format!("b{depth}");
    let h = format!("h{depth}");
    let n = format!("n{depth}");
    let i = format!("i{depth}");
    let lo = format!("lo{depth}");
    let hi = format!("hi{depth}");
    let e = format!("e{depth}");

    w.line(&format!("let {b}: &[u8] = &{src};"));
    let nested = match bound {
        Bound::Exact(len) => {
            w.line(&format!("let mut {target} = Vec::with_capacity({len});"));
            false
        }
        Bound::Max(_) => {
            w.line(&format!("let mut {target} = Vec::new();"));
            w.open(&format!("if !{b}.is_empty()"));
            true
        }
    };

    w.line(&format!("let {h} = ssz_read_offset({b}, 0)?;"));
    w.guard(
        &format!("{h} % 4 != 0 || {h} == 0 || {h} > {b}.len()"),
        "Offset",
    );
    w.line(&format!("let {n} = {h} / 4;"));
    match bound {
        Bound::Exact(len) => w.guard(&format!("{n} != {len}"), "Size"),
        Bound::Max(max) => {
            w.guard(&format!("{n} > {max}"), "ListTooBig");
            w.line(&format!("{target}.reserve({n});"));
        }
    }

    w.open(&format!("for {i} in 0..{n}"));
    w.line(&format!("let {lo} = ssz_read_offset({b}, {i} * 4)?;"));
    w.line(&format!(
        "let {hi} = if {i} + 1 == {n} {{ {b}.len() }} else {{ ssz_read_offset({b}, ({i} + 1) * 4)? }};"
    ));
    w.guard(&format!("{lo} > {hi} || {hi} > {b}.len()"), "Offset");
    decode(w, registry, elem, &format!("{b}[{lo}..{hi}]"), &e, depth + 1);
    w.line(&format!("{target}.push({e});"));
    w.close();

    if nested {
        w.close();
    }
}
