//! The evaluation context.
//!
//! Caller-owned and passed by reference into every operation; there is no
//! process-wide singleton. A context bundles everything "select an
//! evaluation point" established in the original design: the target
//! architecture, the active debug-info modules, the constructed-type
//! interner, and the per-point name maps (locals, implicit `this`, user
//! macros). Constructing a new context is the reset operation and
//! invalidates all `Cons` keys interned by the old one.
//!
//! Interior mutability is limited to the cons interner (shared-lock fast
//! path); everything else is set up before evaluation starts.

use scry_ir::{Arch, BasicKind, Mode, OpList, TypeKey, TypeKind};

use crate::cons::{ConsData, ConsInterner};
use crate::name_map::NameMap;
use crate::provider::{DebugInfo, NameKind, ProcedureInfo};
use crate::regs::{layout, RegLayout};

/// How a local variable's storage is described at the current evaluation
/// point.
#[derive(Clone, Debug)]
pub enum LocalLoc {
    /// Raw bytecode computing the location; `mode` says whether it yields
    /// an address or the value itself.
    Ops { ops: OpList, mode: Mode },
    /// Address = register value + offset.
    RegPlusOff { reg: u16, offset: u16 },
    /// Address = memory\[register value + offset\] (one extra indirection).
    RegPlusOffDeref { reg: u16, offset: u16 },
    /// The value lives directly in a register.
    Reg { reg: u16 },
}

/// A local variable visible at the current evaluation point.
#[derive(Clone, Debug)]
pub struct Local {
    pub loc: LocalLoc,
    pub type_key: TypeKey,
}

/// Caller-owned evaluation context.
pub struct Context<'a> {
    arch: Arch,
    modules: Vec<&'a dyn DebugInfo>,
    cons: ConsInterner,
    locals: NameMap<Local>,
    macros: NameMap<Box<str>>,
    implicit_type: Option<TypeKey>,
    proc_name: Option<Box<str>>,
}

impl<'a> Context<'a> {
    pub fn new(arch: Arch) -> Self {
        Context {
            arch,
            modules: Vec::new(),
            cons: ConsInterner::new(),
            locals: NameMap::new(),
            macros: NameMap::new(),
            implicit_type: None,
            proc_name: None,
        }
    }

    #[inline]
    pub fn arch(&self) -> Arch {
        self.arch
    }

    #[inline]
    pub fn reg_layout(&self) -> &'static RegLayout {
        layout(self.arch)
    }

    /// Size of a pointer on the target, in bytes.
    #[inline]
    pub fn address_size(&self) -> u64 {
        8
    }

    /// Register a debug-info module, returning its table index — the
    /// `table` component of every `TypeKey::Ext` it produces.
    pub fn add_module(&mut self, module: &'a dyn DebugInfo) -> u32 {
        let table = u32::try_from(self.modules.len()).unwrap_or(u32::MAX);
        self.modules.push(module);
        table
    }

    pub fn module(&self, table: u32) -> Option<&'a dyn DebugInfo> {
        self.modules.get(table as usize).copied()
    }

    pub fn add_local(&mut self, name: impl Into<Box<str>>, local: Local) {
        self.locals.insert(name, local);
    }

    pub fn local(&self, name: &str) -> Option<&Local> {
        self.locals.get(name)
    }

    /// Install a user macro: `name` expands to the expression source
    /// `body` wherever `name` fails ordinary resolution.
    pub fn define_macro(&mut self, name: impl Into<Box<str>>, body: impl Into<Box<str>>) {
        self.macros.insert(name, body.into());
    }

    pub fn macro_body(&self, name: &str) -> Option<&str> {
        self.macros.get(name).map(|body| &**body)
    }

    /// Type of the implicit `this` aggregate, when the evaluation point
    /// sits inside a method.
    pub fn set_implicit_type(&mut self, type_key: Option<TypeKey>) {
        self.implicit_type = type_key;
    }

    pub fn implicit_type(&self) -> Option<TypeKey> {
        self.implicit_type
    }

    /// Qualified name of the procedure containing the evaluation point;
    /// drives namespace-relative lookup of unqualified names.
    pub fn set_procedure_name(&mut self, name: impl Into<Box<str>>) {
        self.proc_name = Some(name.into());
    }

    pub fn procedure_name(&self) -> Option<&str> {
        self.proc_name.as_deref()
    }

    // Type key construction

    /// Key for a built-in type. Trivial and stateless.
    #[inline]
    pub fn basic(kind: BasicKind) -> TypeKey {
        TypeKey::Basic(kind)
    }

    /// Key for an external type-table entry. Basic kinds are normalized
    /// to `basic()` keys so raw equality keeps meaning identity.
    pub fn ext(&self, table: u32, index: u32) -> TypeKey {
        if let Some(info) = self.module(table).and_then(|m| m.type_info(index)) {
            if let TypeKind::Basic(kind) = info.kind {
                return TypeKey::Basic(kind);
            }
        }
        TypeKey::Ext(scry_ir::ExtKey { table, index })
    }

    /// Intern a constructed type. At most one key exists per distinct
    /// `(kind, direct, aux)` tuple for this context's lifetime.
    pub fn cons(&self, kind: TypeKind, direct: TypeKey, aux: u64) -> TypeKey {
        self.cons.intern(ConsData { kind, direct, aux })
    }

    /// `T*`.
    pub fn ptr_to(&self, direct: TypeKey) -> TypeKey {
        self.cons(TypeKind::Ptr, direct, 0)
    }

    /// `T[count]`.
    pub fn array_of(&self, direct: TypeKey, count: u64) -> TypeKey {
        self.cons(TypeKind::Array, direct, count)
    }

    pub(crate) fn cons_data(&self, key: scry_ir::ConsKey) -> Option<ConsData> {
        self.cons.lookup(key)
    }

    // Name lookup against the active modules

    /// Resolve a type name: built-in C names first, then each module's
    /// type name map in registration order.
    pub fn lookup_type_name(&self, name: &str) -> Option<TypeKey> {
        if let Some(kind) = builtin_basic(name) {
            return Some(TypeKey::Basic(kind));
        }
        for (table, module) in self.modules.iter().enumerate() {
            if let Some(&index) = module.lookup(NameKind::Types, name).first() {
                let table = u32::try_from(table).unwrap_or(u32::MAX);
                return Some(self.ext(table, index));
            }
        }
        None
    }

    /// Find a global variable: `(type key, module-relative offset)`.
    pub fn find_global(&self, name: &str) -> Option<(TypeKey, u64)> {
        self.find_symbol(NameKind::Globals, name, |module, index| {
            module.global(index).map(|s| (s.type_index, s.offset))
        })
    }

    /// Find a thread-local variable: `(type key, TLS-relative offset)`.
    pub fn find_thread_local(&self, name: &str) -> Option<(TypeKey, u64)> {
        self.find_symbol(NameKind::ThreadLocals, name, |module, index| {
            module.thread_local(index).map(|s| (s.type_index, s.offset))
        })
    }

    /// Find a procedure: `(type key, module-relative offset)`.
    pub fn find_procedure(&self, name: &str) -> Option<(TypeKey, u64)> {
        self.find_symbol(NameKind::Procedures, name, |module, index| {
            module
                .procedure(index)
                .map(|ProcedureInfo { type_index, offset, .. }| (type_index, offset))
        })
    }

    fn find_symbol(
        &self,
        kind: NameKind,
        name: &str,
        fetch: impl Fn(&dyn DebugInfo, u32) -> Option<(u32, u64)>,
    ) -> Option<(TypeKey, u64)> {
        for (table, module) in self.modules.iter().enumerate() {
            for index in module.lookup(kind, name) {
                if let Some((type_index, offset)) = fetch(*module, index) {
                    let table = u32::try_from(table).unwrap_or(u32::MAX);
                    return Some((self.ext(table, type_index), offset));
                }
            }
        }
        None
    }
}

/// Single-token built-in C type names.
///
/// Multi-word forms (`unsigned int`, `long long`) are assembled by the
/// parser's type grammar on top of this map.
pub(crate) fn builtin_basic(name: &str) -> Option<BasicKind> {
    let kind = match name {
        "void" => BasicKind::Void,
        "bool" => BasicKind::Bool,
        "char" | "int8_t" => BasicKind::S8,
        "short" | "int16_t" => BasicKind::S16,
        "int" | "int32_t" => BasicKind::S32,
        "long" | "int64_t" | "ssize_t" | "intptr_t" => BasicKind::S64,
        "int128_t" => BasicKind::S128,
        "uint8_t" => BasicKind::U8,
        "uint16_t" => BasicKind::U16,
        "uint32_t" => BasicKind::U32,
        "uint64_t" | "size_t" | "uintptr_t" => BasicKind::U64,
        "uint128_t" => BasicKind::U128,
        "float" => BasicKind::F32,
        "double" => BasicKind::F64,
        _ => return None,
    };
    Some(kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cons_idempotent_within_context() {
        let ctx = Context::new(Arch::X64);
        let s32 = Context::basic(BasicKind::S32);
        let a = ctx.cons(TypeKind::Ptr, s32, 0);
        let b = ctx.cons(TypeKind::Ptr, s32, 0);
        assert_eq!(a, b);
        assert_ne!(a, ctx.cons(TypeKind::Ptr, Context::basic(BasicKind::U32), 0));
        assert_ne!(a, ctx.cons(TypeKind::LRef, s32, 0));
        assert_ne!(a, ctx.cons(TypeKind::Ptr, s32, 1));
    }

    #[test]
    fn test_new_context_restarts_interning() {
        let first = Context::new(Arch::X64);
        let second = Context::new(Arch::X64);
        let s32 = Context::basic(BasicKind::S32);
        // Same tuple, different contexts: keys carry no cross-context
        // meaning, but both contexts start numbering from scratch.
        assert_eq!(
            first.cons(TypeKind::Ptr, s32, 0),
            second.cons(TypeKind::Ptr, s32, 0)
        );
    }

    #[test]
    fn test_builtin_names() {
        assert_eq!(builtin_basic("int"), Some(BasicKind::S32));
        assert_eq!(builtin_basic("uint64_t"), Some(BasicKind::U64));
        assert_eq!(builtin_basic("double"), Some(BasicKind::F64));
        assert_eq!(builtin_basic("nonsense"), None);
    }

    #[test]
    fn test_macro_map() {
        let mut ctx = Context::new(Arch::X64);
        ctx.define_macro("limit", "100");
        assert_eq!(ctx.macro_body("limit"), Some("100"));
        assert_eq!(ctx.macro_body("missing"), None);
    }
}
