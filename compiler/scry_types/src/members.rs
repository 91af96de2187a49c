//! Member flattening.
//!
//! Produces the flat, offset-ordered, layout-accurate member view that
//! drives member access and "decompose a value into fields" consumers:
//! base classes are spliced in recursively with cumulative offsets, and
//! for struct/class roots, byte gaps between adjacent members are filled
//! with synthesized `Padding` pseudo-members.

use smallvec::SmallVec;

use scry_ir::{BasicKind, ExtKey, TypeKey, TypeKind};

use crate::context::Context;
use crate::provider::MemberKind;

/// Inheritance recursion bound; external tables are untrusted.
const MAX_INHERIT_DEPTH: u32 = 32;

/// One entry of a flattened member view.
#[derive(Clone, Debug)]
pub struct Member {
    pub kind: MemberKind,
    pub name: Box<str>,
    pub type_key: TypeKey,
    /// Byte offset from the start of the flattened root.
    pub offset: u64,
    /// Base-class keys walked to reach this member, outermost first.
    pub inheritance: SmallVec<[TypeKey; 2]>,
}

impl Context<'_> {
    /// Flatten a record's own fields with all base classes' fields.
    ///
    /// Non-record keys produce an empty view; register keys produce the
    /// synthetic sub-view members of the register union.
    pub fn data_members_of(&self, key: TypeKey) -> Vec<Member> {
        let key = self.unwrap(key);
        if matches!(key, TypeKey::Reg(_) | TypeKey::RegAlias(_)) {
            return self.register_members(key);
        }
        let info = self.type_info(key);
        if !info.kind.is_record() {
            return Vec::new();
        }
        let TypeKey::Ext(ext) = key else {
            return Vec::new();
        };

        let mut out = Vec::new();
        let mut out_of_order = false;
        let chain: SmallVec<[TypeKey; 2]> = SmallVec::new();
        self.flatten_into(ext, 0, &chain, &mut out, &mut out_of_order, 0);

        // Inheritance can interleave offsets; sort only when it did.
        if out_of_order {
            out.sort_by_key(|member| member.offset);
        }

        if matches!(info.kind, TypeKind::Struct | TypeKind::Class) {
            self.fill_padding(&mut out);
        }
        out
    }

    fn flatten_into(
        &self,
        ext: ExtKey,
        base_offset: u64,
        chain: &SmallVec<[TypeKey; 2]>,
        out: &mut Vec<Member>,
        out_of_order: &mut bool,
        depth: u32,
    ) {
        if depth > MAX_INHERIT_DEPTH {
            return;
        }
        let Some(module) = self.module(ext.table) else {
            return;
        };
        for member in module.members(ext.index) {
            match member.kind {
                MemberKind::DataField | MemberKind::VTablePtr => {
                    let offset = base_offset + member.offset;
                    if out.last().is_some_and(|prev| offset < prev.offset) {
                        *out_of_order = true;
                    }
                    out.push(Member {
                        kind: member.kind,
                        name: member.name,
                        type_key: self.ext(ext.table, member.type_index),
                        offset,
                        inheritance: chain.clone(),
                    });
                }
                MemberKind::Base | MemberKind::VirtualBase => {
                    let base_key = self.ext(ext.table, member.type_index);
                    let mut sub_chain = chain.clone();
                    sub_chain.push(base_key);
                    if let TypeKey::Ext(base_ext) = self.unwrap(base_key) {
                        self.flatten_into(
                            base_ext,
                            base_offset + member.offset,
                            &sub_chain,
                            out,
                            out_of_order,
                            depth + 1,
                        );
                    }
                }
                MemberKind::StaticData
                | MemberKind::Method
                | MemberKind::VirtualMethod
                | MemberKind::NestedType
                | MemberKind::Padding => {}
            }
        }
    }

    /// Insert `Padding` pseudo-members for byte gaps between adjacent
    /// members, so the flattened view fully accounts for the layout.
    fn fill_padding(&self, members: &mut Vec<Member>) {
        let mut i = 0;
        while i + 1 < members.len() {
            let end = members[i].offset + self.byte_size_of(members[i].type_key);
            let next = members[i + 1].offset;
            if next > end {
                let gap = next - end;
                members.insert(
                    i + 1,
                    Member {
                        kind: MemberKind::Padding,
                        name: "padding".into(),
                        type_key: self.array_of(TypeKey::Basic(BasicKind::U8), gap),
                        offset: end,
                        inheritance: SmallVec::new(),
                    },
                );
                i += 2;
            } else {
                i += 1;
            }
        }
    }

    /// Same-size scalar/array reinterpretations of a register's byte
    /// range: a 16-byte register shows `u128`, `u64[2]`, `u32[4]`, ...
    fn register_members(&self, key: TypeKey) -> Vec<Member> {
        const VIEWS: [BasicKind; 7] = [
            BasicKind::U128,
            BasicKind::U64,
            BasicKind::U32,
            BasicKind::U16,
            BasicKind::U8,
            BasicKind::F64,
            BasicKind::F32,
        ];
        let size = self.byte_size_of(key);
        let mut out = Vec::new();
        for view in VIEWS {
            let view_size = view.byte_size();
            if view_size == 0 || view_size > size || size % view_size != 0 {
                continue;
            }
            let count = size / view_size;
            let type_key = if count == 1 {
                TypeKey::Basic(view)
            } else {
                self.array_of(TypeKey::Basic(view), count)
            };
            out.push(Member {
                kind: MemberKind::DataField,
                name: view_name(view).into(),
                type_key,
                offset: 0,
                inheritance: SmallVec::new(),
            });
        }
        out
    }
}

fn view_name(kind: BasicKind) -> &'static str {
    match kind {
        BasicKind::U128 => "u128",
        BasicKind::U64 => "u64",
        BasicKind::U32 => "u32",
        BasicKind::U16 => "u16",
        BasicKind::U8 => "u8",
        BasicKind::F64 => "f64",
        BasicKind::F32 => "f32",
        _ => "view",
    }
}
