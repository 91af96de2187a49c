//! Type key operations: unwrapping, promotion, structural matching.

use scry_ir::{BasicKind, TypeKey, TypeKind};

use crate::context::Context;

/// Wrapper chains and match recursion are bounded; external tables are
/// untrusted and may contain cycles.
const MAX_DEPTH: u32 = 64;

impl Context<'_> {
    /// Strip `Modifier`, `Alias`, and incomplete-type wrappers to reach
    /// the underlying type.
    pub fn unwrap(&self, key: TypeKey) -> TypeKey {
        let mut key = key;
        for _ in 0..MAX_DEPTH {
            let info = self.type_info(key);
            let Some(direct) = info.direct else { break };
            if !info.kind.is_wrapper() {
                break;
            }
            key = direct;
        }
        key
    }

    /// Like [`unwrap`](Self::unwrap), but additionally strips one layer
    /// of `Enum` to its base integer type.
    pub fn unwrap_enum(&self, key: TypeKey) -> TypeKey {
        let key = self.unwrap(key);
        let info = self.type_info(key);
        if matches!(info.kind, TypeKind::Enum) {
            if let Some(direct) = info.direct {
                return self.unwrap(direct);
            }
        }
        key
    }

    /// Walk through exactly one pointer/reference indirection (plus any
    /// wrapper layers on both sides) to the pointee. Arrays count: their
    /// element type is the pointee after decay.
    pub fn pointee_of(&self, key: TypeKey) -> Option<TypeKey> {
        let key = self.unwrap(key);
        let info = self.type_info(key);
        if info.kind.is_pointer_like() || matches!(info.kind, TypeKind::Array) {
            info.direct.map(|direct| self.unwrap(direct))
        } else {
            None
        }
    }

    /// Integer promotion: `bool`/`s8`/`s16`/`u8`/`u16` promote to `s32`;
    /// everything else is unchanged.
    pub fn promote(&self, key: TypeKey) -> TypeKey {
        if let TypeKey::Basic(kind) = self.unwrap_enum(key) {
            if matches!(
                kind,
                BasicKind::Bool
                    | BasicKind::S8
                    | BasicKind::S16
                    | BasicKind::U8
                    | BasicKind::U16
            ) {
                return TypeKey::Basic(BasicKind::S32);
            }
        }
        key
    }

    /// Structural equality.
    ///
    /// Exact key match short-circuits true (hash consing makes this the
    /// common case for locally constructed types); otherwise both sides
    /// are unwrapped and compared kind-by-kind.
    pub fn types_match(&self, l: TypeKey, r: TypeKey) -> bool {
        self.match_at(l, r, 0)
    }

    fn match_at(&self, l: TypeKey, r: TypeKey, depth: u32) -> bool {
        if depth > MAX_DEPTH {
            return false;
        }
        if l == r {
            return !l.is_null();
        }
        let l = self.unwrap(l);
        let r = self.unwrap(r);
        if l == r {
            return !l.is_null();
        }
        let li = self.type_info(l);
        let ri = self.type_info(r);
        match (li.kind, ri.kind) {
            (TypeKind::Basic(a), TypeKind::Basic(b)) => a == b,
            (TypeKind::Ptr, TypeKind::Ptr)
            | (TypeKind::LRef, TypeKind::LRef)
            | (TypeKind::RRef, TypeKind::RRef) => self.match_opt(li.direct, ri.direct, depth),
            (TypeKind::MemberPtr, TypeKind::MemberPtr) => {
                self.match_opt(li.direct, ri.direct, depth)
                    && self.match_opt(li.owner, ri.owner, depth)
            }
            (TypeKind::Array, TypeKind::Array) => {
                self.array_count(&li) == self.array_count(&ri)
                    && self.match_opt(li.direct, ri.direct, depth)
            }
            (TypeKind::Function, TypeKind::Function) => {
                self.match_opt(li.direct, ri.direct, depth) && self.match_params(l, r, depth)
            }
            (TypeKind::Method, TypeKind::Method) => {
                self.match_opt(li.direct, ri.direct, depth)
                    && self.match_opt(li.owner, ri.owner, depth)
                    && self.match_params(l, r, depth)
            }
            _ => false,
        }
    }

    fn match_opt(&self, l: Option<TypeKey>, r: Option<TypeKey>, depth: u32) -> bool {
        match (l, r) {
            (Some(l), Some(r)) => self.match_at(l, r, depth + 1),
            (None, None) => true,
            _ => false,
        }
    }

    fn match_params(&self, l: TypeKey, r: TypeKey, depth: u32) -> bool {
        let lp = self.param_types_of(l);
        let rp = self.param_types_of(r);
        lp.len() == rp.len()
            && lp
                .iter()
                .zip(rp.iter())
                .all(|(&a, &b)| self.match_at(a, b, depth + 1))
    }
}
