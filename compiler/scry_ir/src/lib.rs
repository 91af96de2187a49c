//! Scry IR - shared data types for the scry expression engine.
//!
//! This crate contains the core data structures shared by every stage of
//! the pipeline:
//! - Spans for source locations
//! - Tokens and `TokenList` for lexer output
//! - `TypeKey` compact type identifiers
//! - Expression arena (`ExprArena`, `ExprId`, `ExprKind`)
//! - Typed IR arena (`IrArena`, `IrId`, `IrOp`)
//! - Bytecode opcodes, `OpList`, and the encoded instruction format
//! - `Value` (256-bit result payload) and `Mode` (location class)
//!
//! # Design Philosophy
//!
//! - **Intern everything**: constructed types become `ConsKey(u32)` handles
//! - **Flatten everything**: no `Box<Expr>`, expression trees use `ExprId(u32)`
//!   indices into an arena owned by one evaluation
//! - Keys are `Copy + Eq + Hash` so equality is a cheap comparison

/// Compile-time assertion that a type has a specific size.
///
/// Used to prevent accidental size regressions in frequently-allocated types.
#[macro_export]
macro_rules! static_assert_size {
    ($ty:ty, $size:expr) => {
        const _: [(); $size] = [(); ::std::mem::size_of::<$ty>()];
    };
}

mod bytecode;
mod expr;
mod ir;
mod mode;
mod span;
mod token;
mod type_key;
mod value;

pub use bytecode::{imm_width, opcode, Inst, Op, OpList, TypeGroup};
pub use expr::{BinaryOp, Expr, ExprArena, ExprId, ExprKind, UnaryOp};
pub use ir::{IrArena, IrId, IrNode, IrOp};
pub use mode::Mode;
pub use span::Span;
pub use token::{Token, TokenKind, TokenList};
pub use type_key::{Arch, BasicKind, ConsKey, ExtKey, RegKey, TypeKey, TypeKind};
pub use value::Value;
