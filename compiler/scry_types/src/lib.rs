//! Scry Types - type system and evaluation context.
//!
//! Types are named by compact [`TypeKey`](scry_ir::TypeKey)s and
//! materialized on demand by consulting external debug-info tables through
//! the [`DebugInfo`] trait. Locally constructed types (pointers, arrays,
//! ...) are hash-consed per [`Context`], so structurally identical
//! constructed types compare equal by key within one context's lifetime.
//!
//! The `Context` is caller-owned and passed explicitly into every
//! operation. Selecting a new evaluation context means constructing a new
//! `Context`; constructed-type keys never outlive the context that
//! interned them.

mod cons;
mod context;
mod info;
mod members;
mod name_map;
mod ops;
mod print;
mod provider;
mod regs;

pub use cons::{ConsData, ConsInterner};
pub use context::{Context, Local, LocalLoc};
pub use info::TypeInfo;
pub use members::Member;
pub use name_map::NameMap;
pub use provider::{
    DebugInfo, EnumValue, ExtMember, ExtTypeInfo, MemberKind, NameKind, ProcedureInfo, SymbolInfo,
};
pub use regs::{layout, AliasDef, RegDef, RegLayout};
