//! Type-group classification and operator admissibility.

use scry_ir::{BinaryOp, Op, TypeGroup, TypeKey, UnaryOp};
use scry_types::Context;

/// Coarse numeric category of a type, driving arithmetic and conversion
/// selection. Pointers, references, arrays, and functions count as
/// unsigned (they are addresses); records and void are `Other`.
pub fn group_of(ctx: &Context<'_>, key: TypeKey) -> TypeGroup {
    let key = ctx.unwrap_enum(key);
    if let TypeKey::Basic(kind) = key {
        if kind.is_unsigned() {
            return TypeGroup::Unsigned;
        }
        if kind.is_signed() {
            return TypeGroup::Signed;
        }
        return match kind {
            scry_ir::BasicKind::F32 => TypeGroup::F32,
            scry_ir::BasicKind::F64 => TypeGroup::F64,
            _ => TypeGroup::Other,
        };
    }
    let info = ctx.type_info(key);
    if info.kind.is_pointer_like()
        || matches!(
            info.kind,
            scry_ir::TypeKind::Array | scry_ir::TypeKind::Function | scry_ir::TypeKind::Method
        )
    {
        TypeGroup::Unsigned
    } else {
        TypeGroup::Other
    }
}

/// The fixed conversion-legality table: numeric groups interconvert,
/// `Other` converts only to itself.
pub(crate) fn conversion_legal(from: TypeGroup, to: TypeGroup) -> bool {
    from == to || (from != TypeGroup::Other && to != TypeGroup::Other)
}

pub(crate) fn unary_supports(op: UnaryOp, group: TypeGroup) -> bool {
    match op {
        UnaryOp::Neg => group != TypeGroup::Other,
        UnaryOp::BitNot | UnaryOp::LogNot => group.is_integer(),
        // Deref and AddressOf are handled structurally, not by group.
        UnaryOp::Deref | UnaryOp::AddressOf => true,
    }
}

pub(crate) fn binary_supports(op: BinaryOp, group: TypeGroup) -> bool {
    match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => group != TypeGroup::Other,
        BinaryOp::Mod
        | BinaryOp::LShift
        | BinaryOp::RShift
        | BinaryOp::BitAnd
        | BinaryOp::BitOr
        | BinaryOp::BitXor
        | BinaryOp::LogAnd
        | BinaryOp::LogOr => group.is_integer(),
        BinaryOp::Less
        | BinaryOp::LessEq
        | BinaryOp::Grtr
        | BinaryOp::GrtrEq
        | BinaryOp::EqEq
        | BinaryOp::NotEq => group != TypeGroup::Other,
    }
}

pub(crate) fn unary_bytecode(op: UnaryOp, group: TypeGroup) -> Op {
    match op {
        UnaryOp::Neg => Op::Neg { group },
        UnaryOp::LogNot => Op::LogNot,
        UnaryOp::BitNot => Op::BitNot { group },
        // Deref/AddressOf never reach instruction selection.
        UnaryOp::Deref | UnaryOp::AddressOf => Op::Stop,
    }
}

pub(crate) fn binary_bytecode(op: BinaryOp, group: TypeGroup) -> Op {
    match op {
        BinaryOp::Mul => Op::Mul { group },
        BinaryOp::Div => Op::Div { group },
        BinaryOp::Mod => Op::Mod { group },
        BinaryOp::Add => Op::Add { group },
        BinaryOp::Sub => Op::Sub { group },
        BinaryOp::LShift => Op::LShift { group },
        BinaryOp::RShift => Op::RShift { group },
        BinaryOp::Less => Op::Less { group },
        BinaryOp::LessEq => Op::LessEq { group },
        BinaryOp::Grtr => Op::Grtr { group },
        BinaryOp::GrtrEq => Op::GrtrEq { group },
        BinaryOp::EqEq => Op::EqEq { group },
        BinaryOp::NotEq => Op::NotEq { group },
        BinaryOp::BitAnd => Op::BitAnd { group },
        BinaryOp::BitXor => Op::BitXor { group },
        BinaryOp::BitOr => Op::BitOr { group },
        BinaryOp::LogAnd => Op::LogAnd,
        BinaryOp::LogOr => Op::LogOr,
    }
}

pub(crate) fn is_comparison(op: BinaryOp) -> bool {
    matches!(
        op,
        BinaryOp::Less
            | BinaryOp::LessEq
            | BinaryOp::Grtr
            | BinaryOp::GrtrEq
            | BinaryOp::EqEq
            | BinaryOp::NotEq
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use scry_ir::{Arch, BasicKind};

    #[test]
    fn test_groups() {
        let ctx = Context::new(Arch::X64);
        assert_eq!(
            group_of(&ctx, TypeKey::Basic(BasicKind::U8)),
            TypeGroup::Unsigned
        );
        assert_eq!(
            group_of(&ctx, TypeKey::Basic(BasicKind::S64)),
            TypeGroup::Signed
        );
        assert_eq!(
            group_of(&ctx, TypeKey::Basic(BasicKind::F32)),
            TypeGroup::F32
        );
        assert_eq!(
            group_of(&ctx, TypeKey::Basic(BasicKind::Void)),
            TypeGroup::Other
        );
        let ptr = ctx.ptr_to(TypeKey::Basic(BasicKind::Void));
        assert_eq!(group_of(&ctx, ptr), TypeGroup::Unsigned);
    }

    #[test]
    fn test_conversion_table() {
        assert!(conversion_legal(TypeGroup::Signed, TypeGroup::F64));
        assert!(conversion_legal(TypeGroup::Unsigned, TypeGroup::Unsigned));
        assert!(conversion_legal(TypeGroup::Other, TypeGroup::Other));
        assert!(!conversion_legal(TypeGroup::Other, TypeGroup::Signed));
        assert!(!conversion_legal(TypeGroup::F32, TypeGroup::Other));
    }

    #[test]
    fn test_op_admissibility() {
        assert!(binary_supports(BinaryOp::Add, TypeGroup::F64));
        assert!(!binary_supports(BinaryOp::Mod, TypeGroup::F64));
        assert!(!binary_supports(BinaryOp::LShift, TypeGroup::F32));
        assert!(binary_supports(BinaryOp::EqEq, TypeGroup::F32));
        assert!(!binary_supports(BinaryOp::Add, TypeGroup::Other));
        assert!(unary_supports(UnaryOp::Neg, TypeGroup::F64));
        assert!(!unary_supports(UnaryOp::BitNot, TypeGroup::F64));
    }
}
