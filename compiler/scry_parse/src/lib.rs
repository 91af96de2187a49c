//! Scry Parse - recursive descent expression parser.
//!
//! Precedence-climbing over the token array, producing an arena-allocated
//! expression tree. Identifier resolution is embedded in parsing: names
//! are looked up against the context (implicit members, locals, registers,
//! register aliases, globals, thread locals, procedures, type names) and
//! resolved hits become location-bytecode leaves; full misses stay as
//! identifier leaves for macro-map resolution during lowering.
//!
//! Malformed input never aborts the parse. Every recoverable problem
//! appends a diagnostic and substitutes a fresh error node, so one call
//! always yields a tree plus whatever messages accumulated.

mod cursor;
mod literals;
mod parser;
mod resolve;
mod types;

pub use parser::{parse_expr, Parse};
