use super::{bare, paren, Writer};
use crate::ir::{BitListRepr, BytesLen, Layout, Node, Record, Shape};

pub(super) fn emit(w: &mut Writer, record: &Record) {
    w.line("/// Length in bytes of the SSZ encoding.");
    w.open("pub fn size_ssz(&self) -> usize");
    if !record.is_dynamic() {
        w.line("Self::SSZ_FIXED_SIZE");
        w.close();
        return;
    }
    w.line("let mut size = Self::SSZ_FIXED_SIZE;");
    for (i, f) in record.fields.iter().enumerate() {
        if !f.node.is_dynamic() {
            continue;
        }
        w.line(&format!("// Field ({i}) '{}'", bare(&f.name)));
        w.line(&format!(
            "size += {};",
            expr(&f.node, &format!("self.{}", f.name), 0)
        ));
    }
    w.line("size");
    w.close();
}

/// Encoded size of `v` as a `usize` expression. Fixed nodes fold to a
/// literal.
pub(super) fn expr(node: &Node, v: &str, depth: usize) -> String {
    let p = paren(v);
    match &node.shape {
        Shape::Uint { bytes } => bytes.to_string(),
        Shape::Bool => "1".to_string(),
        Shape::BitVector { bits, .. } => bits.div_ceil(8).to_string(),
        Shape::Bytes {
            len: BytesLen::Fixed(n),
            ..
        } => n.to_string(),
        Shape::Bytes {
            len: BytesLen::Max(_),
            ..
        }
        | Shape::BitList {
            repr: BitListRepr::Bytes,
            ..
        } => format!("{p}.len()"),
        Shape::BitList {
            repr: BitListRepr::External(_),
            ..
        } => format!("{p}.as_bytes().len()"),
        Shape::Container { .. } => match node.layout {
            Layout::Fixed(n) => n.to_string(),
            Layout::Dynamic { .. } => format!("{p}.size_ssz()"),
        },
        Shape::Vector { elem, .. } | Shape::List { elem, .. } => {
            match (node.layout, elem.fixed_size()) {
                (Layout::Fixed(n), _) => n.to_string(),
                (Layout::Dynamic { .. }, Some(es)) => format!("{p}.len() * {es}"),
                (Layout::Dynamic { .. }, None) => {
                    let e = format!("e{depth}");
                    let inner = expr(elem, &format!("*{e}"), depth + 1);
                    format!("{p}.iter().map(|{e}| 4 + {inner}).sum::<usize>()")
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::ByteRepr;

    fn dynamic(shape: Shape) -> Node {
        Node {
            shape,
            layout: Layout::Dynamic { fixed_part: 0 },
        }
    }

    fn fixed(shape: Shape, n: u64) -> Node {
        Node {
            shape,
            layout: Layout::Fixed(n),
        }
    }

    #[test]
    fn fixed_nodes_fold_to_literals() {
        let vector = fixed(
            Shape::Vector {
                elem: Box::new(fixed(Shape::Uint { bytes: 8 }, 8)),
                len: 4,
            },
            32,
        );
        assert_eq!(expr(&vector, "self.v", 0), "32");
    }

    #[test]
    fn dynamic_lists_sum_their_items() {
        let bytes = dynamic(Shape::Bytes {
            len: BytesLen::Max(8),
            repr: ByteRepr::Vec,
        });
        let list = dynamic(Shape::List {
            elem: Box::new(bytes),
            max: 4,
        });
        assert_eq!(
            expr(&list, "self.items", 0),
            "self.items.iter().map(|e0| 4 + (*e0).len()).sum::<usize>()"
        );

        let list = dynamic(Shape::List {
            elem: Box::new(fixed(Shape::Uint { bytes: 2 }, 2)),
            max: 4,
        });
        assert_eq!(expr(&list, "*e1", 2), "(*e1).len() * 2");
    }
}
