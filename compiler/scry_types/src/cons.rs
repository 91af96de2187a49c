//! Hash-consing interner for locally constructed types.
//!
//! Provides at-most-one key per distinct `(constructor kind, direct key,
//! auxiliary)` tuple within one context's lifetime, which lets the IR
//! builder use raw key comparison as the fast path for type matching.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use scry_ir::{ConsKey, TypeKey, TypeKind};

/// The identity of a constructed type.
///
/// `aux` is constructor-dependent: element count for arrays, zero for
/// pointers and references.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub struct ConsData {
    pub kind: TypeKind,
    pub direct: TypeKey,
    pub aux: u64,
}

struct ConsTable {
    map: FxHashMap<ConsData, u32>,
    data: Vec<ConsData>,
}

/// Interner storage. Read-mostly: the fast path is a shared-lock map hit.
pub struct ConsInterner {
    inner: RwLock<ConsTable>,
}

impl ConsInterner {
    pub fn new() -> Self {
        ConsInterner {
            inner: RwLock::new(ConsTable {
                map: FxHashMap::default(),
                data: Vec::with_capacity(16),
            }),
        }
    }

    /// Intern a constructed-type tuple, returning its key.
    ///
    /// Idempotent: the same tuple always returns the same key; any change
    /// to any tuple component returns a different key.
    pub fn intern(&self, data: ConsData) -> TypeKey {
        // Fast path: already interned.
        {
            let guard = self.inner.read();
            if let Some(&index) = guard.map.get(&data) {
                return TypeKey::Cons(ConsKey::new(index));
            }
        }

        let mut guard = self.inner.write();

        // Double-check after acquiring the write lock.
        if let Some(&index) = guard.map.get(&data) {
            return TypeKey::Cons(ConsKey::new(index));
        }

        let index = u32::try_from(guard.data.len()).unwrap_or(u32::MAX);
        guard.data.push(data);
        guard.map.insert(data, index);
        TypeKey::Cons(ConsKey::new(index))
    }

    /// Look up the tuple behind a key interned by this table.
    pub fn lookup(&self, key: ConsKey) -> Option<ConsData> {
        self.inner.read().data.get(key.index()).copied()
    }

    pub fn len(&self) -> usize {
        self.inner.read().data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ConsInterner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use scry_ir::BasicKind;

    #[test]
    fn test_intern_idempotent() {
        let interner = ConsInterner::new();
        let data = ConsData {
            kind: TypeKind::Ptr,
            direct: TypeKey::Basic(BasicKind::S32),
            aux: 0,
        };
        let a = interner.intern(data);
        let b = interner.intern(data);
        assert_eq!(a, b);
        assert_eq!(interner.len(), 1);
    }

    #[test]
    fn test_distinct_tuples_distinct_keys() {
        let interner = ConsInterner::new();
        let ptr_s32 = interner.intern(ConsData {
            kind: TypeKind::Ptr,
            direct: TypeKey::Basic(BasicKind::S32),
            aux: 0,
        });
        let ptr_u32 = interner.intern(ConsData {
            kind: TypeKind::Ptr,
            direct: TypeKey::Basic(BasicKind::U32),
            aux: 0,
        });
        let arr_s32 = interner.intern(ConsData {
            kind: TypeKind::Array,
            direct: TypeKey::Basic(BasicKind::S32),
            aux: 0,
        });
        let arr_s32_4 = interner.intern(ConsData {
            kind: TypeKind::Array,
            direct: TypeKey::Basic(BasicKind::S32),
            aux: 4,
        });
        assert_ne!(ptr_s32, ptr_u32);
        assert_ne!(ptr_s32, arr_s32);
        assert_ne!(arr_s32, arr_s32_4);
        assert_eq!(interner.len(), 4);
    }

    #[test]
    fn test_lookup_roundtrip() {
        let interner = ConsInterner::new();
        let data = ConsData {
            kind: TypeKind::Array,
            direct: TypeKey::Basic(BasicKind::U8),
            aux: 10,
        };
        let TypeKey::Cons(key) = interner.intern(data) else {
            panic!("intern must produce a Cons key");
        };
        assert_eq!(interner.lookup(key), Some(data));
    }
}
