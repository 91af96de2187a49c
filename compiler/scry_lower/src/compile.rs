//! Bytecode compilation.
//!
//! Post-order flattening of the typed IR: operands first, then one
//! instruction per node. The exception is `Cond`, which implements
//! select-by-condition with forward skips only:
//!
//! ```text
//! <condition-ops>
//! Cond(len of false branch, including its trailing Skip)
//! <false-branch-ops> Skip(len of true branch)
//! <true-branch-ops>
//! ```
//!
//! `Cond` pops the condition and skips forward when it is nonzero, so a
//! true condition lands at the true branch and a false one falls through
//! the false branch, whose trailing `Skip` hops over the true branch.

use scry_ir::{IrArena, IrId, IrOp, Op, OpList};

/// Flatten a typed IR tree into an instruction list.
pub fn flatten(ir: &IrArena, root: IrId) -> OpList {
    let mut out = OpList::new();
    flatten_into(ir, root, &mut out);
    out
}

/// Flatten and serialize, appending the terminating `Stop`.
pub fn compile(ir: &IrArena, root: IrId) -> Vec<u8> {
    let mut ops = flatten(ir, root);
    ops.push(Op::Stop);
    tracing::debug!(bytes = ops.encoded_size(), "compiled bytecode");
    ops.encode()
}

fn flatten_into(ir: &IrArena, id: IrId, out: &mut OpList) {
    let node = ir.get(id);
    match &node.op {
        IrOp::Error => {}
        IrOp::Splice(ops) => out.extend_cloned(ops),
        IrOp::Op(Op::Cond { .. }) => {
            let mut children = node.children.iter().copied();
            let (Some(cond), Some(then_id), Some(else_id)) =
                (children.next(), children.next(), children.next())
            else {
                return;
            };
            flatten_into(ir, cond, out);

            let mut false_ops = flatten(ir, else_id);
            let true_ops = flatten(ir, then_id);
            let true_len = clamp_u16(true_ops.encoded_size());
            false_ops.push(Op::Skip { skip: true_len });

            let false_len = clamp_u16(false_ops.encoded_size());
            out.push(Op::Cond { skip: false_len });
            out.append(&mut false_ops);
            out.extend_cloned(&true_ops);
        }
        IrOp::Op(op) => {
            for &child in &node.children {
                flatten_into(ir, child, out);
            }
            out.push(*op);
        }
    }
}

fn clamp_u16(len: u64) -> u16 {
    u16::try_from(len).unwrap_or(u16::MAX)
}
