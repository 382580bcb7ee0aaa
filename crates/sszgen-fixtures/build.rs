use std::path::PathBuf;

use anyhow::{Context, Result};
use sszgen_core::{generate, write_outputs, Options, OutputMode, WriteMode};

fn main() -> Result<()> {
    println!("cargo:rerun-if-changed=schema");

    let manifest_dir =
        PathBuf::from(std::env::var("CARGO_MANIFEST_DIR").context("CARGO_MANIFEST_DIR")?);
    let out_dir = PathBuf::from(std::env::var("OUT_DIR").context("OUT_DIR")?);

    let mut opts = Options::new(manifest_dir.join("schema"));
    opts.output = OutputMode::Single(out_dir.join("ssz_encoding.rs"));
    let gen = generate(&opts).context("generate schema encoders")?;
    write_outputs(&gen.files, WriteMode::Write, None)?;
    Ok(())
}
