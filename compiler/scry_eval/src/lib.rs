//! Scry Eval - bytecode interpreter and the evaluation pipeline.
//!
//! The interpreter is a plain stack machine over the serialized
//! instruction format: decode an opcode, decode its fixed-width
//! immediate, pop the fixed operand count, compute, push. All target
//! access goes through the caller-supplied [`EvalIO`]; the machine holds
//! no state across calls.
//!
//! [`evaluate`] is the one-call front door: tokenize, parse, lower,
//! compile, interpret, returning a typed value plus every diagnostic the
//! stages produced.

mod evaluate;
mod io;
mod machine;

pub use evaluate::{evaluate, Evaluation, InterpStatus};
pub use io::{EvalIO, MemoryReader, SliceMemory};
pub use machine::{interpret, InterpError, STACK_CAP};
