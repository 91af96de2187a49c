//! Type materialization.
//!
//! A [`TypeInfo`] is the ephemeral, full view behind a `TypeKey`:
//! reconstructed per request from the key and the external tables, never
//! mutated in place.

use scry_ir::{BasicKind, TypeKey, TypeKind};

use crate::context::Context;
use crate::provider::EnumValue;

/// Materialized type header.
#[derive(Clone, Debug)]
pub struct TypeInfo {
    pub kind: TypeKind,
    pub name: Option<Box<str>>,
    pub byte_size: u64,
    /// Pointee, element, return type, alias target, or enum base.
    pub direct: Option<TypeKey>,
    /// Owning record for methods and member pointers.
    pub owner: Option<TypeKey>,
    /// Element count for arrays; zero elsewhere.
    pub count: u64,
}

impl TypeInfo {
    pub(crate) fn null() -> Self {
        TypeInfo {
            kind: TypeKind::Null,
            name: None,
            byte_size: 0,
            direct: None,
            owner: None,
            count: 0,
        }
    }
}

impl Context<'_> {
    /// Materialize full type information for a key.
    pub fn type_info(&self, key: TypeKey) -> TypeInfo {
        match key {
            TypeKey::Null => TypeInfo::null(),
            TypeKey::Basic(kind) => TypeInfo {
                kind: TypeKind::Basic(kind),
                name: Some(kind.name().into()),
                byte_size: kind.byte_size(),
                direct: None,
                owner: None,
                count: 0,
            },
            TypeKey::Ext(ext) => {
                let Some(info) = self.module(ext.table).and_then(|m| m.type_info(ext.index))
                else {
                    return TypeInfo::null();
                };
                TypeInfo {
                    kind: info.kind,
                    name: info.name,
                    byte_size: info.byte_size,
                    direct: info.direct.map(|index| self.ext(ext.table, index)),
                    owner: info.owner.map(|index| self.ext(ext.table, index)),
                    count: info.count,
                }
            }
            TypeKey::Cons(cons) => {
                let Some(data) = self.cons_data(cons) else {
                    return TypeInfo::null();
                };
                let byte_size = match data.kind {
                    TypeKind::Array => {
                        // Minimum element size of 1 keeps later divisions
                        // by element size well-defined.
                        self.byte_size_of(data.direct).max(1).saturating_mul(data.aux)
                    }
                    TypeKind::Modifier | TypeKind::Alias => self.byte_size_of(data.direct),
                    _ => self.address_size(),
                };
                TypeInfo {
                    kind: data.kind,
                    name: None,
                    byte_size,
                    direct: Some(data.direct),
                    owner: None,
                    count: if matches!(data.kind, TypeKind::Array) {
                        data.aux
                    } else {
                        0
                    },
                }
            }
            TypeKey::Reg(reg) => {
                let Some(def) = crate::regs::layout(reg.arch).reg(reg.code) else {
                    return TypeInfo::null();
                };
                TypeInfo {
                    kind: TypeKind::RegUnion,
                    name: Some(def.name.into()),
                    byte_size: u64::from(def.size),
                    direct: None,
                    owner: None,
                    count: 0,
                }
            }
            TypeKey::RegAlias(reg) => {
                let Some(def) = crate::regs::layout(reg.arch).alias(reg.code) else {
                    return TypeInfo::null();
                };
                TypeInfo {
                    kind: TypeKind::RegUnion,
                    name: Some(def.name.into()),
                    byte_size: u64::from(def.size),
                    direct: None,
                    owner: None,
                    count: 0,
                }
            }
        }
    }

    pub fn byte_size_of(&self, key: TypeKey) -> u64 {
        // Basic keys skip materialization; this is the hot accessor.
        if let TypeKey::Basic(kind) = key {
            return kind.byte_size();
        }
        self.type_info(key).byte_size
    }

    pub fn direct_of(&self, key: TypeKey) -> Option<TypeKey> {
        self.type_info(key).direct
    }

    pub fn owner_of(&self, key: TypeKey) -> Option<TypeKey> {
        self.type_info(key).owner
    }

    /// Element count of an array type; derived from byte size when the
    /// external table does not store it directly.
    pub(crate) fn array_count(&self, info: &TypeInfo) -> u64 {
        if info.count != 0 {
            return info.count;
        }
        let elem = info
            .direct
            .map_or(1, |direct| self.byte_size_of(direct))
            .max(1);
        info.byte_size / elem
    }

    /// Parameter type keys of a function or method type.
    pub fn param_types_of(&self, key: TypeKey) -> Vec<TypeKey> {
        match key {
            TypeKey::Ext(ext) => self
                .module(ext.table)
                .map(|module| {
                    module
                        .param_types(ext.index)
                        .into_iter()
                        .map(|index| self.ext(ext.table, index))
                        .collect()
                })
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// Enumerators of an enum type.
    pub fn enum_values_of(&self, key: TypeKey) -> Vec<EnumValue> {
        match self.unwrap(key) {
            TypeKey::Ext(ext) => self
                .module(ext.table)
                .map(|module| module.enum_values(ext.index))
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use scry_ir::Arch;

    #[test]
    fn test_basic_info() {
        let ctx = Context::new(Arch::X64);
        let info = ctx.type_info(TypeKey::Basic(BasicKind::U32));
        assert_eq!(info.byte_size, 4);
        assert_eq!(info.name.as_deref(), Some("uint32_t"));
        assert!(matches!(info.kind, TypeKind::Basic(BasicKind::U32)));
    }

    #[test]
    fn test_cons_array_size() {
        let ctx = Context::new(Arch::X64);
        let arr = ctx.array_of(TypeKey::Basic(BasicKind::U16), 12);
        assert_eq!(ctx.byte_size_of(arr), 24);
        let info = ctx.type_info(arr);
        assert_eq!(info.count, 12);
        assert_eq!(info.direct, Some(TypeKey::Basic(BasicKind::U16)));
    }

    #[test]
    fn test_zero_sized_element_clamped() {
        let ctx = Context::new(Arch::X64);
        // void elements get a minimum size of 1.
        let arr = ctx.array_of(TypeKey::Basic(BasicKind::Void), 8);
        assert_eq!(ctx.byte_size_of(arr), 8);
    }

    #[test]
    fn test_pointer_size_is_address_size() {
        let ctx = Context::new(Arch::X64);
        let ptr = ctx.ptr_to(TypeKey::Basic(BasicKind::S8));
        assert_eq!(ctx.byte_size_of(ptr), 8);
    }

    #[test]
    fn test_register_union_info() {
        let ctx = Context::new(Arch::X64);
        let layout = ctx.reg_layout();
        let Some(code) = layout.reg_by_name("xmm0") else {
            panic!("xmm0 must exist");
        };
        let key = TypeKey::Reg(scry_ir::RegKey { arch: Arch::X64, code });
        let info = ctx.type_info(key);
        assert_eq!(info.kind, TypeKind::RegUnion);
        assert_eq!(info.byte_size, 16);
        assert_eq!(info.name.as_deref(), Some("xmm0"));
    }
}
