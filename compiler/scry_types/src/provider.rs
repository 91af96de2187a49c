//! The external debug-info boundary.
//!
//! Everything the engine knows about a target program's types and symbols
//! arrives through [`DebugInfo`]. One implementation per loaded module;
//! the [`Context`](crate::Context) holds the active set and qualifies
//! every external type key with the module's table index.
//!
//! Binary-format decoding (PDB/DWARF/whatever produced these tables) is a
//! collaborator's problem, not this crate's.

use scry_ir::TypeKind;

/// Which name map a [`DebugInfo::lookup`] searches.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum NameKind {
    Types,
    Globals,
    ThreadLocals,
    Procedures,
    SourcePaths,
}

/// Member classification within a record type.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum MemberKind {
    DataField,
    StaticData,
    Method,
    VirtualMethod,
    VTablePtr,
    Base,
    VirtualBase,
    NestedType,
    /// Synthesized filler for layout gaps; never present in external
    /// tables, only produced by member flattening.
    Padding,
}

/// Type header as stored in an external table.
#[derive(Clone, Debug)]
pub struct ExtTypeInfo {
    pub kind: TypeKind,
    pub name: Option<Box<str>>,
    pub byte_size: u64,
    /// Referenced type within the same table: pointee, element, return
    /// type, alias target, or enum base.
    pub direct: Option<u32>,
    /// Owning record for methods and member pointers.
    pub owner: Option<u32>,
    /// Element count for arrays; zero elsewhere.
    pub count: u64,
}

/// One member of an external record type.
#[derive(Clone, Debug)]
pub struct ExtMember {
    pub kind: MemberKind,
    pub name: Box<str>,
    pub type_index: u32,
    pub offset: u64,
}

/// One enumerator of an external enum type.
#[derive(Clone, Debug)]
pub struct EnumValue {
    pub name: Box<str>,
    pub value: u64,
}

/// Location of a global or thread-local variable.
#[derive(Copy, Clone, Debug)]
pub struct SymbolInfo {
    pub type_index: u32,
    /// Module-relative byte offset (added to the module or TLS base at
    /// interpretation time).
    pub offset: u64,
}

/// Location and identity of a procedure.
#[derive(Clone, Debug)]
pub struct ProcedureInfo {
    pub type_index: u32,
    pub offset: u64,
    /// Fully qualified name, e.g. `ns::sub::proc`. Drives unqualified
    /// lookup of names inside namespaced code.
    pub qualified_name: Box<str>,
}

/// Interface to one module's debug-info tables.
///
/// Index spaces are per-kind: a type index only means something to
/// [`type_info`](Self::type_info), a global index only to
/// [`global`](Self::global), and so on. `lookup` returns indices in the
/// queried kind's space.
pub trait DebugInfo {
    /// Type header for a type-table index.
    fn type_info(&self, index: u32) -> Option<ExtTypeInfo>;

    /// Direct members of a record type (no inherited members).
    fn members(&self, _index: u32) -> Vec<ExtMember> {
        Vec::new()
    }

    /// Enumerators of an enum type.
    fn enum_values(&self, _index: u32) -> Vec<EnumValue> {
        Vec::new()
    }

    /// Parameter type indices of a function or method type.
    fn param_types(&self, _index: u32) -> Vec<u32> {
        Vec::new()
    }

    /// All indices whose name matches exactly, in the given name space.
    fn lookup(&self, _kind: NameKind, _name: &str) -> Vec<u32> {
        Vec::new()
    }

    fn global(&self, _index: u32) -> Option<SymbolInfo> {
        None
    }

    fn thread_local(&self, _index: u32) -> Option<SymbolInfo> {
        None
    }

    fn procedure(&self, _index: u32) -> Option<ProcedureInfo> {
        None
    }
}
