//! Scry Lower - typed lowering and bytecode emission.
//!
//! The IR builder walks the expression tree once, one case per node kind,
//! applying C-like semantics: integer promotion, pointer arithmetic with
//! pointee scaling, implicit conversions via type groups,
//! inheritance-aware member lookup, and explicit array-to-pointer decay.
//! Diagnostics accumulate child-first; an invalid subtree lowers to an
//! error node and poisons ancestors only where they require a valid
//! child.
//!
//! The bytecode compiler then linearizes the typed IR post-order into an
//! [`OpList`](scry_ir::OpList) and serializes it.

mod compile;
mod groups;
mod lower;

pub use compile::{compile, flatten};
pub use groups::group_of;
pub use lower::{lower, Lowered};
