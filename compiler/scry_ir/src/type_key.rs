//! Compact type identifiers.
//!
//! A [`TypeKey`] names a type without materializing it. Two keys that compare
//! equal always denote the same type; the converse does not hold — an
//! external array type and a locally constructed array type of matching
//! shape are *structurally* equal but carry different keys. Structural
//! equivalence is `scry_types`' `types_match`, not `==`.

use std::fmt;

/// Target architecture, selecting the register layout table.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Arch {
    X64,
    Arm64,
}

/// Built-in scalar type.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BasicKind {
    Void,
    Bool,
    S8,
    S16,
    S32,
    S64,
    S128,
    U8,
    U16,
    U32,
    U64,
    U128,
    F32,
    F64,
}

impl BasicKind {
    /// Size of a value of this type, in bytes. `Void` is zero-sized.
    pub const fn byte_size(self) -> u64 {
        match self {
            BasicKind::Void => 0,
            BasicKind::Bool | BasicKind::S8 | BasicKind::U8 => 1,
            BasicKind::S16 | BasicKind::U16 => 2,
            BasicKind::S32 | BasicKind::U32 | BasicKind::F32 => 4,
            BasicKind::S64 | BasicKind::U64 | BasicKind::F64 => 8,
            BasicKind::S128 | BasicKind::U128 => 16,
        }
    }

    /// C-style name used by the declarator printer.
    pub const fn name(self) -> &'static str {
        match self {
            BasicKind::Void => "void",
            BasicKind::Bool => "bool",
            BasicKind::S8 => "int8_t",
            BasicKind::S16 => "int16_t",
            BasicKind::S32 => "int32_t",
            BasicKind::S64 => "int64_t",
            BasicKind::S128 => "int128_t",
            BasicKind::U8 => "uint8_t",
            BasicKind::U16 => "uint16_t",
            BasicKind::U32 => "uint32_t",
            BasicKind::U64 => "uint64_t",
            BasicKind::U128 => "uint128_t",
            BasicKind::F32 => "float",
            BasicKind::F64 => "double",
        }
    }

    pub const fn is_signed(self) -> bool {
        matches!(
            self,
            BasicKind::S8 | BasicKind::S16 | BasicKind::S32 | BasicKind::S64 | BasicKind::S128
        )
    }

    pub const fn is_unsigned(self) -> bool {
        matches!(
            self,
            BasicKind::Bool
                | BasicKind::U8
                | BasicKind::U16
                | BasicKind::U32
                | BasicKind::U64
                | BasicKind::U128
        )
    }

    pub const fn is_integer(self) -> bool {
        self.is_signed() || self.is_unsigned()
    }

    pub const fn is_float(self) -> bool {
        matches!(self, BasicKind::F32 | BasicKind::F64)
    }
}

/// Kind of a materialized type, and the constructor tag for consed types.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum TypeKind {
    Null,
    Basic(BasicKind),
    Struct,
    Class,
    Union,
    Enum,
    /// Typedef / alias to the direct type.
    Alias,
    IncompleteStruct,
    IncompleteClass,
    IncompleteUnion,
    IncompleteEnum,
    /// const/volatile wrapper around the direct type.
    Modifier,
    Ptr,
    /// L-value reference.
    LRef,
    /// R-value reference.
    RRef,
    Array,
    Function,
    Method,
    MemberPtr,
    Bitfield,
    /// Synthetic union describing a machine register's sub-views.
    RegUnion,
}

impl TypeKind {
    /// Kinds that `unwrap` strips to reach the underlying type.
    pub const fn is_wrapper(self) -> bool {
        matches!(
            self,
            TypeKind::Alias
                | TypeKind::Modifier
                | TypeKind::IncompleteStruct
                | TypeKind::IncompleteClass
                | TypeKind::IncompleteUnion
                | TypeKind::IncompleteEnum
        )
    }

    pub const fn is_record(self) -> bool {
        matches!(self, TypeKind::Struct | TypeKind::Class | TypeKind::Union)
    }

    pub const fn is_pointer_like(self) -> bool {
        matches!(self, TypeKind::Ptr | TypeKind::LRef | TypeKind::RRef)
    }
}

/// Reference into an external debug-info type table.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct ExtKey {
    /// Which debug-info table (module index in the context).
    pub table: u32,
    /// Type index within that table.
    pub index: u32,
}

/// Handle for a locally constructed type, valid for one context's lifetime.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct ConsKey(u32);

impl ConsKey {
    #[inline]
    pub const fn new(index: u32) -> Self {
        ConsKey(index)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A machine register (or register alias) named as a type.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct RegKey {
    pub arch: Arch,
    pub code: u16,
}

/// Compact, hash-consed type identifier.
///
/// # Invariant
/// `a == b` implies `a` and `b` denote the same type. Constructed keys are
/// scoped to the [`Context`](../scry_types) that interned them; a new
/// context invalidates all previously interned `Cons` keys.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub enum TypeKey {
    Null,
    Basic(BasicKind),
    Ext(ExtKey),
    Cons(ConsKey),
    Reg(RegKey),
    RegAlias(RegKey),
}

impl TypeKey {
    #[inline]
    pub const fn basic(kind: BasicKind) -> Self {
        TypeKey::Basic(kind)
    }

    #[inline]
    pub const fn is_null(self) -> bool {
        matches!(self, TypeKey::Null)
    }

    /// The basic kind, if this is a basic key.
    #[inline]
    pub const fn as_basic(self) -> Option<BasicKind> {
        match self {
            TypeKey::Basic(kind) => Some(kind),
            _ => None,
        }
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeKey::Null => write!(f, "TypeKey::Null"),
            TypeKey::Basic(kind) => write!(f, "TypeKey::Basic({kind:?})"),
            TypeKey::Ext(ext) => write!(f, "TypeKey::Ext({}:{})", ext.table, ext.index),
            TypeKey::Cons(cons) => write!(f, "TypeKey::Cons({})", cons.index()),
            TypeKey::Reg(reg) => write!(f, "TypeKey::Reg({:?}:{})", reg.arch, reg.code),
            TypeKey::RegAlias(reg) => write!(f, "TypeKey::RegAlias({:?}:{})", reg.arch, reg.code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_basic_sizes() {
        assert_eq!(BasicKind::Void.byte_size(), 0);
        assert_eq!(BasicKind::Bool.byte_size(), 1);
        assert_eq!(BasicKind::S32.byte_size(), 4);
        assert_eq!(BasicKind::U128.byte_size(), 16);
        assert_eq!(BasicKind::F64.byte_size(), 8);
    }

    #[test]
    fn test_key_equality_is_identity() {
        let a = TypeKey::Ext(ExtKey { table: 0, index: 7 });
        let b = TypeKey::Ext(ExtKey { table: 1, index: 7 });
        assert_ne!(a, b);
        assert_eq!(a, TypeKey::Ext(ExtKey { table: 0, index: 7 }));
    }

    #[test]
    fn test_wrapper_kinds() {
        assert!(TypeKind::Alias.is_wrapper());
        assert!(TypeKind::Modifier.is_wrapper());
        assert!(!TypeKind::Ptr.is_wrapper());
        assert!(TypeKind::Class.is_record());
    }
}
