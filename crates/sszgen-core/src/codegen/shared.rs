//! The block every generated module carries once: the `SszError` sentinels
//! and the offset/bit-list helpers the per-record routines call.

use super::writer::Writer;

/// Error variants and their messages, in declaration order.
pub const ERRORS: &[(&str, &str)] = &[
    ("Offset", "incorrect offset"),
    ("Size", "incorrect size"),
    ("MarshalVector", "incorrect vector marshalling"),
    ("MarshalFixedBytes", "incorrect fixed bytes marshalling"),
    ("MarshalDynamicBytes", "incorrect dynamic bytes marshalling"),
    ("DivideInt", "incorrect int divide"),
    ("ListTooBig", "incorrect list size, too big"),
    ("InvalidBool", "incorrect bool value"),
    ("InvalidBitlist", "incorrect bitlist"),
    ("InvalidBitvector", "incorrect bitvector"),
];

pub fn shared_block() -> String {
    let mut w = Writer::new();

    w.line("#[derive(Debug, Clone, Copy, PartialEq, Eq)]");
    w.open("pub enum SszError");
    for (variant, _) in ERRORS {
        w.line(&format!("{variant},"));
    }
    w.close();
    w.blank();

    w.open("impl ::std::fmt::Display for SszError");
    w.open("fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result");
    w.open("let msg = match self");
    for (variant, msg) in ERRORS {
        w.line(&format!("SszError::{variant} => {msg:?},"));
    }
    w.close_with("};");
    w.line("f.write_str(msg)");
    w.close();
    w.close();
    w.blank();

    w.line("impl ::std::error::Error for SszError {}");
    w.blank();

    w.line("#[allow(dead_code)]");
    w.open("fn ssz_read_offset(buf: &[u8], at: usize) -> Result<usize, SszError>");
    w.line("let bytes = buf.get(at..at + 4).ok_or(SszError::Size)?;");
    w.line("let raw = u32::from_le_bytes(<[u8; 4]>::try_from(bytes).map_err(|_| SszError::Size)?);");
    w.line("Ok(raw as usize)");
    w.close();
    w.blank();

    w.line("#[allow(dead_code)]");
    w.open("fn ssz_write_offset(buf: &mut Vec<u8>, offset: usize) -> Result<(), SszError>");
    w.line("let raw = u32::try_from(offset).map_err(|_| SszError::Offset)?;");
    w.line("buf.extend_from_slice(&raw.to_le_bytes());");
    w.line("Ok(())");
    w.close();
    w.blank();

    w.line("/// Number of bits in a delimited bit list.");
    w.line("#[allow(dead_code)]");
    w.open("fn ssz_bitlist_len(buf: &[u8]) -> Result<usize, SszError>");
    w.open("match buf.last()");
    w.line("Some(&last) if last != 0 => Ok((buf.len() - 1) * 8 + 7 - last.leading_zeros() as usize),");
    w.line("_ => Err(SszError::InvalidBitlist),");
    w.close();
    w.close();

    w.finish()
}
