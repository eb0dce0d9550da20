//! Patch modules: discovering patch routines and their descriptors
//!
//! A patch module is an ordinary module image. Routines are the public static methods of types
//! whose name ends with the patch suffix, and carry raw [`PatchInfo`](crate::model::PatchInfo)
//! metadata. The [`PluginLoader`] validates that metadata into a [`PatchDescriptor`] once, so the
//! stitcher only ever sees plain, checked data.

mod descriptor;
mod errors;
mod loader;
mod routine;

pub use descriptor::*;
pub use errors::*;
pub use loader::*;
pub use routine::*;
