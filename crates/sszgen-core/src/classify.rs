//! Fixed/dynamic classification and sizes.
//!
//! | Kind            | Fixed iff          | Size when fixed                 |
//! |-----------------|--------------------|---------------------------------|
//! | UInt, Bool      | always             | declared width                  |
//! | BitVector       | always             | bit length rounded up to bytes  |
//! | Bytes           | declared length    | length                          |
//! | Vector          | element is fixed   | count × element size            |
//! | Container       | no dynamic child   | sum (dynamic children count 4)  |
//! | BitList, List   | never              |                                 |

use crate::diagnostics::{Diagnostic, DiagnosticCode, Phase};
use crate::ir::{BytesLen, Field, Layout, Registry, Shape};

pub const BYTES_PER_LENGTH_OFFSET: u64 = 4;

pub fn classify(registry: &Registry, shape: &Shape) -> Result<Layout, Diagnostic> {
    let layout = match shape {
        Shape::Uint { bytes } => Layout::Fixed(u64::from(*bytes)),
        Shape::Bool => Layout::Fixed(1),
        Shape::Bytes {
            len: BytesLen::Fixed(n),
            ..
        } => Layout::Fixed(*n),
        Shape::Bytes {
            len: BytesLen::Max(_),
            ..
        } => Layout::Dynamic { fixed_part: 0 },
        Shape::BitVector { bits, .. } => Layout::Fixed(bits.div_ceil(8)),
        Shape::BitList { .. } | Shape::List { .. } => Layout::Dynamic { fixed_part: 0 },
        Shape::Vector { elem, len } => match elem.layout {
            Layout::Fixed(n) => Layout::Fixed(mul(n, *len)?),
            Layout::Dynamic { .. } => Layout::Dynamic {
                fixed_part: mul(BYTES_PER_LENGTH_OFFSET, *len)?,
            },
        },
        Shape::Container { record, .. } => registry.get(*record).layout,
    };
    Ok(layout)
}

pub fn record_layout(fields: &[Field]) -> Result<Layout, Diagnostic> {
    let mut fixed: u64 = 0;
    let mut dynamic = false;
    for f in fields {
        if f.node.is_dynamic() {
            dynamic = true;
        }
        fixed = fixed
            .checked_add(f.node.offset_contribution())
            .ok_or_else(|| overflow("record fixed region"))?;
    }
    if dynamic {
        Ok(Layout::Dynamic { fixed_part: fixed })
    } else {
        Ok(Layout::Fixed(fixed))
    }
}

fn mul(a: u64, b: u64) -> Result<u64, Diagnostic> {
    a.checked_mul(b).ok_or_else(|| overflow("vector size"))
}

fn overflow(what: &str) -> Diagnostic {
    Diagnostic::error(
        DiagnosticCode::SSZG0300SizeOverflow,
        Phase::Classify,
        format!("{what} overflows 64 bits"),
    )
}
