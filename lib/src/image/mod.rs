//! Module images: the on-disk form of a [`Module`]
//!
//! An image is the magic bytes `STIL`, a format version, then the module serialized with
//! [`Serialize`]. Branch operands are stored as instruction indices and turned back into labels
//! when read.

mod errors;
mod module;
mod serialize;

pub use errors::*;
pub use module::{FORMAT_VERSION, MAGIC};
pub use serialize::*;

use crate::model::Module;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Read a module image from a file
pub fn read_module<P: AsRef<Path>>(path: P) -> Result<Module, Error> {
    let mut reader = BufReader::new(File::open(path)?);
    Module::deserialize(&mut reader)
}

/// Write a module image to a file (overwriting it if it exists)
pub fn write_module<P: AsRef<Path>>(module: &Module, path: P) -> Result<(), Error> {
    let mut writer = BufWriter::new(File::create(path)?);
    module.serialize(&mut writer)?;
    writer.flush()?;
    Ok(())
}
