//! The IR builder.
//!
//! One lowering case per expression kind. Every case lowers its children
//! first (so their diagnostics always land), then checks its own
//! preconditions. A child that failed produces no fresh diagnostic in the
//! parent — the parent just yields an error node and the failure
//! propagates structurally.

use rustc_hash::FxHashMap;

use scry_diagnostic::{Diagnostic, DiagnosticList, ErrorCode};
use scry_ir::{
    BasicKind, BinaryOp, ExprArena, ExprId, ExprKind, IrArena, IrId, Mode, Op, Span, TypeGroup,
    TypeKey, TypeKind, UnaryOp,
};
use scry_types::Context;

use crate::groups::{
    binary_bytecode, binary_supports, conversion_legal, group_of, is_comparison, unary_bytecode,
    unary_supports,
};

/// Explicit recursion bound, shared by tree walking and macro expansion.
const MAX_LOWER_DEPTH: u32 = 192;

/// Result of lowering one expression tree.
pub struct Lowered {
    pub ir: IrArena,
    /// The lowered tree as-is; its interpretation yields an address for
    /// `Addr` mode, a register-file offset for `Reg` mode.
    pub root: IrId,
    /// The tree wrapped so interpretation yields the value itself.
    pub value_root: IrId,
    pub type_key: TypeKey,
    pub mode: Mode,
    pub diags: DiagnosticList,
}

/// Lower a parsed expression into typed IR.
pub fn lower(ctx: &Context<'_>, arena: &ExprArena, root: ExprId) -> Lowered {
    let mut lower = Lower {
        ctx,
        ir: IrArena::new(),
        diags: DiagnosticList::new(),
        poison: FxHashMap::default(),
        defines: FxHashMap::default(),
        depth: 0,
        depth_reported: false,
    };
    let out = lower.lower_expr(arena, root);
    let value = lower.to_value(out);
    tracing::debug!(
        mode = %out.mode,
        diagnostics = lower.diags.len(),
        "lowered expression"
    );
    Lowered {
        ir: lower.ir,
        root: out.ir,
        value_root: value.ir,
        type_key: out.ty,
        mode: out.mode,
        diags: lower.diags,
    }
}

/// A lowered subtree: IR node, resolved type, location class.
#[derive(Copy, Clone)]
struct Out {
    ir: IrId,
    ty: TypeKey,
    mode: Mode,
}

impl Out {
    fn ok(self) -> bool {
        self.mode != Mode::Null
    }
}

struct Lower<'a> {
    ctx: &'a Context<'a>,
    ir: IrArena,
    diags: DiagnosticList,
    /// Per-name re-entrancy counters for macro expansion.
    poison: FxHashMap<Box<str>, u32>,
    /// `name = value` definitions made inside this evaluation.
    defines: FxHashMap<Box<str>, Out>,
    depth: u32,
    depth_reported: bool,
}

impl Lower<'_> {
    fn error(&mut self, code: ErrorCode, span: Span, message: impl Into<String>) -> Out {
        self.diags.push(Diagnostic::error(code, span, message));
        self.err()
    }

    fn err(&mut self) -> Out {
        Out {
            ir: self.ir.error(),
            ty: TypeKey::Null,
            mode: Mode::Null,
        }
    }

    fn lower_expr(&mut self, arena: &ExprArena, id: ExprId) -> Out {
        self.depth += 1;
        if self.depth > MAX_LOWER_DEPTH {
            if !self.depth_reported {
                self.depth_reported = true;
                let span = arena.get(id).span;
                self.diags.push(Diagnostic::error(
                    ErrorCode::E9001,
                    span,
                    "expression is too deeply nested",
                ));
            }
            self.depth -= 1;
            return self.err();
        }
        let out = self.lower_expr_inner(arena, id);
        self.depth -= 1;
        out
    }

    fn lower_expr_inner(&mut self, arena: &ExprArena, id: ExprId) -> Out {
        let node = arena.get(id);
        let span = node.span;
        match &node.kind {
            ExprKind::Error => self.err(),
            ExprKind::IntLit { value, ty } => {
                let ir = self.const_ir(*value);
                Out {
                    ir,
                    ty: *ty,
                    mode: Mode::Value,
                }
            }
            ExprKind::FloatLit { bits, ty } => {
                let ir = self.const_ir(*bits);
                Out {
                    ir,
                    ty: *ty,
                    mode: Mode::Value,
                }
            }
            ExprKind::CharLit(c) => {
                let ir = self.const_ir(u64::from(u32::from(*c)));
                Out {
                    ir,
                    ty: TypeKey::Basic(BasicKind::S32),
                    mode: Mode::Value,
                }
            }
            ExprKind::StrLit(_) => self.error(
                ErrorCode::E2013,
                span,
                "string literals cannot be evaluated here",
            ),
            ExprKind::TypeIdent(ty) => {
                let name = self.ctx.type_string(*ty);
                self.error(
                    ErrorCode::E2014,
                    span,
                    format!("type `{name}` cannot be used as a value"),
                )
            }
            ExprKind::Loc {
                ops,
                mode,
                type_key,
            } => {
                let ir = self.ir.splice(ops.clone());
                Out {
                    ir,
                    ty: *type_key,
                    mode: *mode,
                }
            }
            ExprKind::Ident(name) => self.lower_ident(name.clone(), span),
            ExprKind::Define { name, value } => {
                let out = self.lower_expr(arena, *value);
                if out.ok() {
                    self.defines.insert(name.clone(), out);
                }
                out
            }
            ExprKind::Member {
                base,
                name,
                name_span,
                ..
            } => {
                let base_out = self.lower_expr(arena, *base);
                self.lower_member(base_out, name, *name_span)
            }
            ExprKind::Index { base, index } => {
                let base_out = self.lower_expr(arena, *base);
                let index_out = self.lower_expr(arena, *index);
                self.lower_index(base_out, index_out, span)
            }
            ExprKind::Unary { op, operand } => {
                let operand_out = self.lower_expr(arena, *operand);
                match op {
                    UnaryOp::Deref => self.lower_deref(operand_out, span),
                    UnaryOp::AddressOf => self.lower_address_of(operand_out, span),
                    _ => self.lower_unary(*op, operand_out, span),
                }
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let lhs_out = self.lower_expr(arena, *lhs);
                let rhs_out = self.lower_expr(arena, *rhs);
                self.lower_binary(*op, lhs_out, rhs_out, span)
            }
            ExprKind::Ternary {
                cond,
                then_expr,
                else_expr,
            } => {
                let cond_out = self.lower_expr(arena, *cond);
                let then_out = self.lower_expr(arena, *then_expr);
                let else_out = self.lower_expr(arena, *else_expr);
                self.lower_ternary(cond_out, then_out, else_out, span)
            }
            ExprKind::Cast { ty, operand } => {
                let operand_out = self.lower_expr(arena, *operand);
                self.lower_cast(*ty, operand_out, span)
            }
            ExprKind::SizeofExpr(operand) => {
                let operand_out = self.lower_expr(arena, *operand);
                if !operand_out.ok() {
                    return self.err();
                }
                let size = self.ctx.byte_size_of(operand_out.ty);
                let ir = self.const_ir(size);
                Out {
                    ir,
                    ty: TypeKey::Basic(BasicKind::U64),
                    mode: Mode::Value,
                }
            }
            ExprKind::SizeofType(ty) => {
                if ty.is_null() {
                    return self.err();
                }
                let size = self.ctx.byte_size_of(*ty);
                let ir = self.const_ir(size);
                Out {
                    ir,
                    ty: TypeKey::Basic(BasicKind::U64),
                    mode: Mode::Value,
                }
            }
        }
    }

    /// Deferred identifier: definitions made earlier in this evaluation
    /// win, then the context's macro map. The macro's name is poisoned
    /// while its body lowers, so self-reference fails resolution instead
    /// of recursing forever.
    fn lower_ident(&mut self, name: Box<str>, span: Span) -> Out {
        if let Some(out) = self.defines.get(&name) {
            return *out;
        }
        if self.poison.get(&name).copied().unwrap_or(0) > 0 {
            return self.error(
                ErrorCode::E2001,
                span,
                format!("`{name}` could not be resolved"),
            );
        }
        let Some(body) = self.ctx.macro_body(&name) else {
            return self.error(
                ErrorCode::E2001,
                span,
                format!("`{name}` could not be resolved"),
            );
        };
        let body = body.to_owned();

        *self.poison.entry(name.clone()).or_insert(0) += 1;
        let tokens = scry_lexer::tokenize(&body);
        let mut parse = scry_parse::parse_expr(self.ctx, &body, &tokens);
        self.diags.append(&mut parse.diags);
        let out = self.lower_expr(&parse.arena, parse.root);
        if let Some(count) = self.poison.get_mut(&name) {
            *count = count.saturating_sub(1);
        }
        out
    }

    fn lower_member(&mut self, base: Out, name: &str, span: Span) -> Out {
        if !base.ok() {
            return self.err();
        }
        let mut base = base;
        let mut record_key = self.ctx.unwrap(base.ty);

        // At most one implicit pointer/reference hop.
        if self.ctx.type_info(record_key).kind.is_pointer_like() {
            let Some(pointee) = self.ctx.pointee_of(base.ty) else {
                return self.error(ErrorCode::E2004, span, "cannot access members here");
            };
            let loaded = self.to_value(base);
            base = Out {
                ir: loaded.ir,
                ty: pointee,
                mode: Mode::Addr,
            };
            record_key = self.ctx.unwrap(pointee);
        }

        if !matches!(base.mode, Mode::Addr | Mode::Reg) {
            return self.error(
                ErrorCode::E2004,
                span,
                "cannot access members of a computed value",
            );
        }
        let info = self.ctx.type_info(record_key);
        let is_reg = matches!(record_key, TypeKey::Reg(_) | TypeKey::RegAlias(_));
        if !info.kind.is_record() && !is_reg {
            let ty = self.ctx.type_string(base.ty);
            return self.error(
                ErrorCode::E2004,
                span,
                format!("type `{ty}` has no members"),
            );
        }

        let members = self.ctx.data_members_of(record_key);
        let found = members
            .iter()
            .find(|member| &*member.name == name)
            .or_else(|| {
                members
                    .iter()
                    .find(|member| member.name.eq_ignore_ascii_case(name))
            });
        let Some(member) = found else {
            let ty = self.ctx.type_string(record_key);
            return self.error(
                ErrorCode::E2005,
                span,
                format!("type `{ty}` has no member named `{name}`"),
            );
        };

        // Offset zero folds away.
        let ir = if member.offset == 0 {
            base.ir
        } else {
            let off = self.const_ir(member.offset);
            self.ir.op(
                Op::Add {
                    group: TypeGroup::Unsigned,
                },
                [base.ir, off],
            )
        };
        Out {
            ir,
            ty: member.type_key,
            mode: base.mode,
        }
    }

    fn lower_index(&mut self, base: Out, index: Out, span: Span) -> Out {
        if !base.ok() || !index.ok() {
            return self.err();
        }
        let base_key = self.ctx.unwrap(base.ty);
        let info = self.ctx.type_info(base_key);

        let (base_ir, elem, result_mode) = if info.kind.is_pointer_like() {
            let loaded = self.to_value(base);
            let Some(elem) = info.direct else {
                return self.error(ErrorCode::E2002, span, "cannot index this expression");
            };
            (loaded.ir, elem, Mode::Addr)
        } else if matches!(info.kind, TypeKind::Array) {
            if !matches!(base.mode, Mode::Addr | Mode::Reg) {
                return self.error(ErrorCode::E2002, span, "cannot index an array value");
            }
            let Some(elem) = info.direct else {
                return self.error(ErrorCode::E2002, span, "cannot index this expression");
            };
            (base.ir, elem, base.mode)
        } else {
            let ty = self.ctx.type_string(base.ty);
            return self.error(ErrorCode::E2002, span, format!("type `{ty}` cannot be indexed"));
        };

        let elem_size = self.ctx.byte_size_of(self.ctx.unwrap(elem));
        if elem_size == 0 {
            return self.error(ErrorCode::E2012, span, "element type has zero size");
        }

        if !group_of(self.ctx, index.ty).is_integer() {
            let ty = self.ctx.type_string(index.ty);
            return self.error(
                ErrorCode::E2003,
                span,
                format!("index must be an integer, not `{ty}`"),
            );
        }
        let index_value = self.to_value(index);

        let scaled = if elem_size == 1 {
            index_value.ir
        } else {
            let size_ir = self.const_ir(elem_size);
            self.ir.op(
                Op::Mul {
                    group: TypeGroup::Unsigned,
                },
                [index_value.ir, size_ir],
            )
        };
        let ir = self.ir.op(
            Op::Add {
                group: TypeGroup::Unsigned,
            },
            [base_ir, scaled],
        );
        Out {
            ir,
            ty: elem,
            mode: result_mode,
        }
    }

    fn lower_deref(&mut self, operand: Out, span: Span) -> Out {
        if !operand.ok() {
            return self.err();
        }
        let key = self.ctx.unwrap(operand.ty);
        let info = self.ctx.type_info(key);

        if info.kind.is_pointer_like() {
            let Some(pointee) = info.direct else {
                return self.error(ErrorCode::E2006, span, "cannot dereference this expression");
            };
            if self.ctx.byte_size_of(self.ctx.unwrap(pointee)) == 0 {
                return self.error(
                    ErrorCode::E2012,
                    span,
                    "cannot dereference a pointer to a zero-sized type",
                );
            }
            let loaded = self.to_value(operand);
            return Out {
                ir: loaded.ir,
                ty: pointee,
                mode: Mode::Addr,
            };
        }
        if matches!(info.kind, TypeKind::Array) {
            if operand.mode != Mode::Addr {
                return self.error(ErrorCode::E2006, span, "cannot dereference an array value");
            }
            let Some(elem) = info.direct else {
                return self.error(ErrorCode::E2006, span, "cannot dereference this expression");
            };
            if self.ctx.byte_size_of(self.ctx.unwrap(elem)) == 0 {
                return self.error(ErrorCode::E2012, span, "element type has zero size");
            }
            return Out {
                ir: operand.ir,
                ty: elem,
                mode: Mode::Addr,
            };
        }
        let ty = self.ctx.type_string(operand.ty);
        self.error(
            ErrorCode::E2006,
            span,
            format!("cannot dereference type `{ty}`"),
        )
    }

    fn lower_address_of(&mut self, operand: Out, span: Span) -> Out {
        if !operand.ok() {
            return self.err();
        }
        if operand.mode != Mode::Addr {
            return self.error(
                ErrorCode::E2007,
                span,
                "cannot take the address of this expression",
            );
        }
        Out {
            ir: operand.ir,
            ty: self.ctx.ptr_to(operand.ty),
            mode: Mode::Value,
        }
    }

    fn lower_unary(&mut self, op: UnaryOp, operand: Out, span: Span) -> Out {
        if !operand.ok() {
            return self.err();
        }
        let promoted = self.ctx.promote(operand.ty);
        let group = group_of(self.ctx, promoted);
        if !unary_supports(op, group) {
            let ty = self.ctx.type_string(operand.ty);
            return self.error(
                ErrorCode::E2009,
                span,
                format!("operator `{}` is not supported for type `{ty}`", unary_text(op)),
            );
        }
        let value = self.to_value(operand);
        let ir = self.ir.op(unary_bytecode(op, group), [value.ir]);
        let ty = if matches!(op, UnaryOp::LogNot) {
            TypeKey::Basic(BasicKind::Bool)
        } else {
            promoted
        };
        Out {
            ir,
            ty,
            mode: Mode::Value,
        }
    }

    fn lower_binary(&mut self, op: BinaryOp, lhs: Out, rhs: Out, span: Span) -> Out {
        if !lhs.ok() || !rhs.ok() {
            return self.err();
        }
        // Array-to-pointer decay, the explicit step, runs on both sides
        // before any pointer-awareness checks.
        let lhs = self.decay(lhs);
        let rhs = self.decay(rhs);

        let lhs_ptr = self.is_pointer(lhs.ty);
        let rhs_ptr = self.is_pointer(rhs.ty);

        if matches!(op, BinaryOp::Add) && (lhs_ptr ^ rhs_ptr) {
            let (ptr, int) = if lhs_ptr { (lhs, rhs) } else { (rhs, lhs) };
            return self.lower_ptr_offset(op, ptr, int, span);
        }
        if matches!(op, BinaryOp::Sub) && lhs_ptr {
            if rhs_ptr {
                return self.lower_ptr_diff(lhs, rhs, span);
            }
            return self.lower_ptr_offset(op, lhs, rhs, span);
        }

        // Generic numeric path.
        let lhs_ty = self.ctx.promote(lhs.ty);
        let rhs_ty = self.ctx.promote(rhs.ty);
        let lhs_group = group_of(self.ctx, lhs_ty);
        let rhs_group = group_of(self.ctx, rhs_ty);
        if !binary_supports(op, lhs_group) || !binary_supports(op, rhs_group) {
            return self.binary_unsupported(op, lhs, rhs, span);
        }
        if !conversion_legal(rhs_group, lhs_group) {
            let from = self.ctx.type_string(rhs.ty);
            let to = self.ctx.type_string(lhs.ty);
            return self.error(
                ErrorCode::E2008,
                span,
                format!("cannot convert `{from}` to `{to}`"),
            );
        }

        let lhs_value = self.to_value(lhs);
        let rhs_value = self.to_value(rhs);
        let rhs_ir = if rhs_group == lhs_group {
            rhs_value.ir
        } else {
            self.ir.op(
                Op::Convert {
                    from: rhs_group,
                    to: lhs_group,
                },
                [rhs_value.ir],
            )
        };
        let ir = self
            .ir
            .op(binary_bytecode(op, lhs_group), [lhs_value.ir, rhs_ir]);
        let ty = if is_comparison(op) || matches!(op, BinaryOp::LogAnd | BinaryOp::LogOr) {
            TypeKey::Basic(BasicKind::Bool)
        } else {
            lhs_ty
        };
        Out {
            ir,
            ty,
            mode: Mode::Value,
        }
    }

    /// `ptr + int`, `int + ptr`, `ptr - int`: the integer operand is
    /// scaled by the pointee size.
    fn lower_ptr_offset(&mut self, op: BinaryOp, ptr: Out, int: Out, span: Span) -> Out {
        let Some(pointee) = self.ctx.pointee_of(ptr.ty) else {
            return self.error(ErrorCode::E2006, span, "malformed pointer type");
        };
        let pointee_size = self.ctx.byte_size_of(pointee);
        if pointee_size == 0 {
            return self.error(ErrorCode::E2012, span, "pointee type has zero size");
        }
        if !group_of(self.ctx, int.ty).is_integer() {
            return self.binary_unsupported(op, ptr, int, span);
        }
        let ptr_value = self.to_value(ptr);
        let int_value = self.to_value(int);
        let scaled = if pointee_size == 1 {
            int_value.ir
        } else {
            let size_ir = self.const_ir(pointee_size);
            self.ir.op(
                Op::Mul {
                    group: TypeGroup::Unsigned,
                },
                [int_value.ir, size_ir],
            )
        };
        let machine_op = if matches!(op, BinaryOp::Sub) {
            Op::Sub {
                group: TypeGroup::Unsigned,
            }
        } else {
            Op::Add {
                group: TypeGroup::Unsigned,
            }
        };
        let ir = self.ir.op(machine_op, [ptr_value.ir, scaled]);
        Out {
            ir,
            ty: ptr.ty,
            mode: Mode::Value,
        }
    }

    /// `ptr - ptr` with matching pointee size: raw difference divided by
    /// the pointee size, yielding `uint64_t`.
    fn lower_ptr_diff(&mut self, lhs: Out, rhs: Out, span: Span) -> Out {
        let Some(lhs_pointee) = self.ctx.pointee_of(lhs.ty) else {
            return self.error(ErrorCode::E2006, span, "malformed pointer type");
        };
        let Some(rhs_pointee) = self.ctx.pointee_of(rhs.ty) else {
            return self.error(ErrorCode::E2006, span, "malformed pointer type");
        };
        let size = self.ctx.byte_size_of(lhs_pointee);
        if size == 0 {
            return self.error(ErrorCode::E2012, span, "pointee type has zero size");
        }
        if size != self.ctx.byte_size_of(rhs_pointee) {
            let l = self.ctx.type_string(lhs.ty);
            let r = self.ctx.type_string(rhs.ty);
            return self.error(
                ErrorCode::E2008,
                span,
                format!("cannot subtract `{r}` from `{l}`"),
            );
        }
        let lhs_value = self.to_value(lhs);
        let rhs_value = self.to_value(rhs);
        let mut ir = self.ir.op(
            Op::Sub {
                group: TypeGroup::Unsigned,
            },
            [lhs_value.ir, rhs_value.ir],
        );
        if size != 1 {
            let size_ir = self.const_ir(size);
            ir = self.ir.op(
                Op::Div {
                    group: TypeGroup::Unsigned,
                },
                [ir, size_ir],
            );
        }
        Out {
            ir,
            ty: TypeKey::Basic(BasicKind::U64),
            mode: Mode::Value,
        }
    }

    fn lower_ternary(&mut self, cond: Out, then_out: Out, else_out: Out, span: Span) -> Out {
        if !cond.ok() || !then_out.ok() || !else_out.ok() {
            return self.err();
        }
        if !group_of(self.ctx, cond.ty).is_integer() {
            let ty = self.ctx.type_string(cond.ty);
            return self.error(
                ErrorCode::E2011,
                span,
                format!("condition must be an integer, not `{ty}`"),
            );
        }
        if !self.ctx.types_match(then_out.ty, else_out.ty) {
            let t = self.ctx.type_string(then_out.ty);
            let e = self.ctx.type_string(else_out.ty);
            return self.error(
                ErrorCode::E2010,
                span,
                format!("mismatched branch types `{t}` and `{e}`"),
            );
        }
        let cond_value = self.to_value(cond);
        let then_value = self.to_value(then_out);
        let else_value = self.to_value(else_out);
        let ir = self.ir.op(
            Op::Cond { skip: 0 },
            [cond_value.ir, then_value.ir, else_value.ir],
        );
        Out {
            ir,
            ty: then_out.ty,
            mode: Mode::Value,
        }
    }

    fn lower_cast(&mut self, target: TypeKey, operand: Out, span: Span) -> Out {
        if target.is_null() || !operand.ok() {
            return self.err();
        }
        let operand = self.decay(operand);

        // Structurally identical casts only relabel.
        if self.ctx.types_match(operand.ty, target) {
            let value = self.to_value(operand);
            return Out {
                ir: value.ir,
                ty: target,
                mode: Mode::Value,
            };
        }

        let from = group_of(self.ctx, operand.ty);
        let to = group_of(self.ctx, target);
        if !conversion_legal(from, to) {
            let from_ty = self.ctx.type_string(operand.ty);
            let to_ty = self.ctx.type_string(target);
            return self.error(
                ErrorCode::E2008,
                span,
                format!("cannot convert `{from_ty}` to `{to_ty}`"),
            );
        }

        let value = self.to_value(operand);
        let mut ir = value.ir;
        if from != to {
            ir = self.ir.op(Op::Convert { from, to }, [ir]);
        }
        if to.is_integer() {
            let bits = self.ctx.byte_size_of(self.ctx.unwrap(target)) * 8;
            if bits > 0 && bits < 64 {
                let bits = u8::try_from(bits).unwrap_or(64);
                let trunc = if to == TypeGroup::Signed {
                    Op::TruncSigned { bits }
                } else {
                    Op::Trunc { bits }
                };
                ir = self.ir.op(trunc, [ir]);
            }
        }
        Out {
            ir,
            ty: target,
            mode: Mode::Value,
        }
    }

    // Shared machinery

    /// Resolve a location to the value it holds: memory reads for `Addr`
    /// mode, register-file reads for `Reg` mode. Aggregates and arrays
    /// keep their address as the value surrogate.
    fn to_value(&mut self, out: Out) -> Out {
        match out.mode {
            Mode::Null | Mode::Value => out,
            Mode::Addr => {
                let key = self.ctx.unwrap(out.ty);
                let info = self.ctx.type_info(key);
                if info.kind.is_record() || matches!(info.kind, TypeKind::Array) {
                    return Out { mode: Mode::Value, ..out };
                }
                let size = self.ctx.byte_size_of(key).min(8);
                if size == 0 {
                    return Out { mode: Mode::Value, ..out };
                }
                let size_u8 = u8::try_from(size).unwrap_or(8);
                let mut ir = self.ir.op(Op::MemRead { size: size_u8 }, [out.ir]);
                // Narrow signed loads sign-extend into the full lane.
                if size < 8 && group_of(self.ctx, key) == TypeGroup::Signed {
                    let bits = u8::try_from(size * 8).unwrap_or(64);
                    ir = self.ir.op(Op::TruncSigned { bits }, [ir]);
                }
                Out {
                    ir,
                    ty: out.ty,
                    mode: Mode::Value,
                }
            }
            Mode::Reg => {
                let size = self.ctx.byte_size_of(self.ctx.unwrap(out.ty)).min(32);
                let size_u8 = u8::try_from(size.max(1)).unwrap_or(8);
                let ir = self.ir.op(Op::RegReadDyn { size: size_u8 }, [out.ir]);
                Out {
                    ir,
                    ty: out.ty,
                    mode: Mode::Value,
                }
            }
        }
    }

    /// Array-to-pointer decay: an array at an address becomes a pointer
    /// value to its first element.
    fn decay(&mut self, out: Out) -> Out {
        if out.mode == Mode::Addr {
            let key = self.ctx.unwrap(out.ty);
            let info = self.ctx.type_info(key);
            if matches!(info.kind, TypeKind::Array) {
                if let Some(elem) = info.direct {
                    return Out {
                        ir: out.ir,
                        ty: self.ctx.ptr_to(elem),
                        mode: Mode::Value,
                    };
                }
            }
        }
        out
    }

    fn is_pointer(&self, key: TypeKey) -> bool {
        self.ctx
            .type_info(self.ctx.unwrap(key))
            .kind
            .is_pointer_like()
    }

    /// Push the smallest constant instruction that holds `value`.
    fn const_ir(&mut self, value: u64) -> IrId {
        let op = if let Ok(v) = u8::try_from(value) {
            Op::ConstU8 { value: v }
        } else if let Ok(v) = u16::try_from(value) {
            Op::ConstU16 { value: v }
        } else if let Ok(v) = u32::try_from(value) {
            Op::ConstU32 { value: v }
        } else {
            Op::ConstU64 { value }
        };
        self.ir.leaf(op)
    }

    fn binary_unsupported(&mut self, op: BinaryOp, lhs: Out, rhs: Out, span: Span) -> Out {
        let l = self.ctx.type_string(lhs.ty);
        let r = self.ctx.type_string(rhs.ty);
        self.error(
            ErrorCode::E2009,
            span,
            format!(
                "operator `{}` is not supported between `{l}` and `{r}`",
                binary_text(op)
            ),
        )
    }
}

fn unary_text(op: UnaryOp) -> &'static str {
    match op {
        UnaryOp::Neg => "-",
        UnaryOp::LogNot => "!",
        UnaryOp::BitNot => "~",
        UnaryOp::Deref => "*",
        UnaryOp::AddressOf => "&",
    }
}

fn binary_text(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Mod => "%",
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::LShift => "<<",
        BinaryOp::RShift => ">>",
        BinaryOp::Less => "<",
        BinaryOp::LessEq => "<=",
        BinaryOp::Grtr => ">",
        BinaryOp::GrtrEq => ">=",
        BinaryOp::EqEq => "==",
        BinaryOp::NotEq => "!=",
        BinaryOp::BitAnd => "&",
        BinaryOp::BitXor => "^",
        BinaryOp::BitOr => "|",
        BinaryOp::LogAnd => "&&",
        BinaryOp::LogOr => "||",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use scry_ir::Arch;

    fn lower_text(ctx: &Context<'_>, text: &str) -> Lowered {
        let tokens = scry_lexer::tokenize(text);
        let parse = scry_parse::parse_expr(ctx, text, &tokens);
        assert!(parse.diags.is_empty(), "unexpected parse diagnostics");
        lower(ctx, &parse.arena, parse.root)
    }

    #[test]
    fn test_arithmetic_type_is_s32() {
        let ctx = Context::new(Arch::X64);
        let lowered = lower_text(&ctx, "1+2*3");
        assert!(lowered.diags.is_empty());
        assert_eq!(lowered.type_key, TypeKey::Basic(BasicKind::S32));
        assert_eq!(lowered.mode, Mode::Value);
    }

    #[test]
    fn test_comparison_type_is_bool() {
        let ctx = Context::new(Arch::X64);
        let lowered = lower_text(&ctx, "1 < 2");
        assert!(lowered.diags.is_empty());
        assert_eq!(lowered.type_key, TypeKey::Basic(BasicKind::Bool));
    }

    #[test]
    fn test_unsigned_cast_type() {
        let ctx = Context::new(Arch::X64);
        let lowered = lower_text(&ctx, "(unsigned int)-1");
        assert!(lowered.diags.is_empty());
        assert_eq!(lowered.type_key, TypeKey::Basic(BasicKind::U32));
    }

    #[test]
    fn test_sizeof_is_u64() {
        let ctx = Context::new(Arch::X64);
        let lowered = lower_text(&ctx, "sizeof(int)");
        assert!(lowered.diags.is_empty());
        assert_eq!(lowered.type_key, TypeKey::Basic(BasicKind::U64));
    }

    #[test]
    fn test_mod_on_float_rejected() {
        let ctx = Context::new(Arch::X64);
        let lowered = lower_text(&ctx, "1.0 % 2.0");
        assert!(lowered
            .diags
            .iter()
            .any(|d| d.code == ErrorCode::E2009));
    }

    #[test]
    fn test_unresolved_identifier() {
        let ctx = Context::new(Arch::X64);
        let lowered = lower_text(&ctx, "mystery");
        assert!(lowered.diags.iter().any(|d| d.code == ErrorCode::E2001));
        assert_eq!(lowered.mode, Mode::Null);
    }

    #[test]
    fn test_macro_expansion() {
        let mut ctx = Context::new(Arch::X64);
        ctx.define_macro("answer", "41+1");
        let lowered = lower_text(&ctx, "answer");
        assert!(lowered.diags.is_empty());
        assert_eq!(lowered.type_key, TypeKey::Basic(BasicKind::S32));
    }

    #[test]
    fn test_self_referential_macro_poisoned() {
        let mut ctx = Context::new(Arch::X64);
        ctx.define_macro("x", "x + 1");
        let lowered = lower_text(&ctx, "x");
        // The inner `x` is poisoned and fails resolution; no infinite
        // recursion, no stack overflow.
        assert!(lowered.diags.iter().any(|d| d.code == ErrorCode::E2001));
    }

    #[test]
    fn test_define_then_use() {
        let ctx = Context::new(Arch::X64);
        let lowered = lower_text(&ctx, "two = 2");
        assert!(lowered.diags.is_empty());
        assert_eq!(lowered.type_key, TypeKey::Basic(BasicKind::S32));
    }

    #[test]
    fn test_string_literal_rejected() {
        let ctx = Context::new(Arch::X64);
        let lowered = lower_text(&ctx, "\"text\"");
        assert!(lowered.diags.iter().any(|d| d.code == ErrorCode::E2013));
    }

    #[test]
    fn test_ternary_branch_mismatch() {
        let mut ctx = Context::new(Arch::X64);
        ctx.define_macro("p", "(char*)0");
        let lowered = lower_text(&ctx, "1 ? p : 2.0");
        assert!(lowered.diags.iter().any(|d| d.code == ErrorCode::E2010));
    }
}
