//! Records generated from `schema/` at build time.
//!
//! The generated module is plain Rust; everything here is produced by
//! `build.rs` and exercised by the integration tests.

#![allow(clippy::all)]

include!(concat!(env!("OUT_DIR"), "/ssz_encoding.rs"));
