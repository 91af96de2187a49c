//! Expression tree.
//!
//! Parse output is a flat arena of [`Expr`] nodes addressed by [`ExprId`].
//! A parent exclusively owns its children; "no node" never appears — error
//! recovery allocates a fresh `ExprKind::Error` node per use instead of
//! sharing a sentinel.

use super::{Mode, OpList, Span, TypeKey};

/// Index of an expression node within its [`ExprArena`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct ExprId(u32);

impl ExprId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Unary prefix operators.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum UnaryOp {
    Neg,
    LogNot,
    BitNot,
    Deref,
    AddressOf,
}

/// Binary operators, in source form (precedence lives in the parser).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BinaryOp {
    Mul,
    Div,
    Mod,
    Add,
    Sub,
    LShift,
    RShift,
    Less,
    LessEq,
    Grtr,
    GrtrEq,
    EqEq,
    NotEq,
    BitAnd,
    BitXor,
    BitOr,
    LogAnd,
    LogOr,
}

/// An expression node.
#[derive(Clone, Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    #[inline]
    pub const fn new(kind: ExprKind, span: Span) -> Self {
        Expr { kind, span }
    }
}

/// Expression node kinds.
#[derive(Clone, Debug)]
pub enum ExprKind {
    /// Recovery node for malformed input. Lowers to nothing.
    Error,
    /// Integer literal; the parser already classified width and signedness
    /// into a concrete type key.
    IntLit { value: u64, ty: TypeKey },
    /// Float literal; `bits` holds the bit pattern of the chosen width.
    FloatLit { bits: u64, ty: TypeKey },
    StrLit(Box<str>),
    CharLit(char),
    /// Identifier that resolved to nothing at parse time; the macro map
    /// gets the last word during lowering.
    Ident(Box<str>),
    /// A type name used as an expression (cast targets, `sizeof`).
    TypeIdent(TypeKey),
    /// Resolved location: raw bytecode computing an address, value, or
    /// register-file offset, with the resolved type.
    Loc {
        ops: OpList,
        mode: Mode,
        type_key: TypeKey,
    },
    /// `base.name` or `base->name`.
    Member {
        base: ExprId,
        name: Box<str>,
        name_span: Span,
        through_ptr: bool,
    },
    /// `base[index]`.
    Index { base: ExprId, index: ExprId },
    Unary { op: UnaryOp, operand: ExprId },
    Binary {
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
    },
    Ternary {
        cond: ExprId,
        then_expr: ExprId,
        else_expr: ExprId,
    },
    /// `(type)operand`.
    Cast { ty: TypeKey, operand: ExprId },
    SizeofExpr(ExprId),
    SizeofType(TypeKey),
    /// `name = value`: installs a user macro for the rest of the
    /// evaluation and yields the value.
    Define { name: Box<str>, value: ExprId },
}

/// Arena owning every expression node of one evaluation.
///
/// Dropped wholesale when the evaluation finishes; nodes are never freed
/// individually.
#[derive(Clone, Debug, Default)]
pub struct ExprArena {
    nodes: Vec<Expr>,
}

impl ExprArena {
    pub fn new() -> Self {
        ExprArena::default()
    }

    /// Allocate a node, returning its id.
    pub fn alloc(&mut self, expr: Expr) -> ExprId {
        let id = ExprId(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        self.nodes.push(expr);
        id
    }

    /// Allocate a fresh error node covering `span`.
    pub fn alloc_error(&mut self, span: Span) -> ExprId {
        self.alloc(Expr::new(ExprKind::Error, span))
    }

    #[inline]
    pub fn get(&self, id: ExprId) -> &Expr {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_arena_alloc_get() {
        let mut arena = ExprArena::new();
        let a = arena.alloc(Expr::new(
            ExprKind::IntLit { value: 1, ty: TypeKey::Null },
            Span::new(0, 1),
        ));
        let b = arena.alloc_error(Span::new(1, 1));
        assert_ne!(a, b);
        assert_eq!(arena.len(), 2);
        assert!(matches!(arena.get(b).kind, ExprKind::Error));
    }
}
