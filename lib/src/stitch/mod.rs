//! Stitching patch routines into target methods
//!
//! For each patch routine:
//!
//!   1. the [`NameNormalizer`] maps its type and method names to the names of its target
//!   2. [`resolve`] finds the target method in the module (nested types included)
//!   3. [`synthesize`] plans the instructions calling the routine
//!   4. [`splice`] inserts them into the target body
//!
//! The [`Stitcher`] runs these steps over a batch of routines and decides which failures only
//! skip a routine. [`run`] wraps the whole thing from module files to module file.

mod errors;
mod names;
mod resolver;
mod settings;
mod splice;
mod stitcher;
mod synthesis;

pub use errors::*;
pub use names::*;
pub use resolver::*;
pub use settings::*;
pub use splice::*;
pub use stitcher::*;
pub use synthesis::*;
