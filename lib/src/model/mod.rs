//! In-memory model of a compiled module
//!
//! ### Structure
//!
//! A [`Module`] holds [`Type`]s, which hold [`Method`]s and nested types. Types and methods are
//! addressed by [`TypeId`]/[`MethodId`] paths rather than references, so a method can be looked
//! up immutably (to plan a patch) and then mutably (to splice it) without fighting the borrow
//! checker.
//!
//! Method bodies are [`InstructionStream`]s: ordered instructions, each tagged with a [`Label`].
//! Branch operands are labels, so inserting instructions never invalidates a branch.
//!
//! Reading and writing modules lives in [`crate::image`].

mod access_flags;
mod instructions;
mod method;
mod module;
mod signature;
mod stream;

pub use access_flags::*;
pub use instructions::*;
pub use method::*;
pub use module::*;
pub use signature::*;
pub use stream::*;
