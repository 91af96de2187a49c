//! Typed intermediate representation.
//!
//! The IR builder lowers the expression tree into this form: the same
//! arena-of-nodes shape as [`ExprArena`](crate::ExprArena), but each node
//! is an opcode (or a raw bytecode splice) plus children. Flattening is a
//! post-order walk.

use super::{Op, OpList};
use smallvec::SmallVec;

/// Index of an IR node within its [`IrArena`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct IrId(u32);

impl IrId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// The operation a node performs.
#[derive(Clone, Debug)]
pub enum IrOp {
    /// Invalid subtree; flattens to nothing. Only reachable when lowering
    /// already reported an error diagnostic.
    Error,
    /// An ordinary instruction; children are evaluated first, in order.
    Op(Op),
    /// Pre-encoded bytecode spliced in verbatim (resolved locations).
    Splice(OpList),
}

/// One IR node: operation plus exclusively-owned children.
#[derive(Clone, Debug)]
pub struct IrNode {
    pub op: IrOp,
    pub children: SmallVec<[IrId; 3]>,
}

impl IrNode {
    pub fn leaf(op: IrOp) -> Self {
        IrNode {
            op,
            children: SmallVec::new(),
        }
    }
}

/// Arena owning every IR node of one evaluation.
#[derive(Clone, Debug, Default)]
pub struct IrArena {
    nodes: Vec<IrNode>,
}

impl IrArena {
    pub fn new() -> Self {
        IrArena::default()
    }

    pub fn alloc(&mut self, node: IrNode) -> IrId {
        let id = IrId(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        self.nodes.push(node);
        id
    }

    /// Allocate an instruction node with children.
    pub fn op(&mut self, op: Op, children: impl IntoIterator<Item = IrId>) -> IrId {
        self.alloc(IrNode {
            op: IrOp::Op(op),
            children: children.into_iter().collect(),
        })
    }

    /// Allocate a childless instruction node.
    pub fn leaf(&mut self, op: Op) -> IrId {
        self.alloc(IrNode::leaf(IrOp::Op(op)))
    }

    /// Allocate a raw bytecode splice node.
    pub fn splice(&mut self, ops: OpList) -> IrId {
        self.alloc(IrNode::leaf(IrOp::Splice(ops)))
    }

    /// Allocate an error node.
    pub fn error(&mut self) -> IrId {
        self.alloc(IrNode::leaf(IrOp::Error))
    }

    #[inline]
    pub fn get(&self, id: IrId) -> &IrNode {
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
