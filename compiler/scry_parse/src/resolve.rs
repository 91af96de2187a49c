//! Identifier resolution.
//!
//! Runs during parsing, on every identifier leaf. Resolution order, first
//! match wins:
//!
//! 1. the implicit `this` aggregate's members (rewritten to
//!    `this-><name>`),
//! 2. in-scope locals,
//! 3. machine registers,
//! 4. register aliases,
//! 5. global variables,
//! 6. thread-local variables,
//! 7. procedures,
//! 8. type names.
//!
//! Steps 5-7 retry the name against successively shorter
//! namespace-qualified variants derived from the current procedure's own
//! qualified name, so unqualified names work inside namespaced code.
//!
//! A full miss stays an identifier leaf: the macro map gets the last word
//! during lowering, and only a miss there is an error.

use scry_ir::{Expr, ExprKind, Mode, Op, OpList, RegKey, Span, TypeGroup, TypeKey};
use scry_types::{Local, LocalLoc};

use crate::parser::Parser;

impl Parser<'_> {
    pub(crate) fn resolve_ident(&mut self, name: &str, span: Span) -> ExprKind {
        // (1) implicit-this members
        if let Some(kind) = self.resolve_implicit_member(name, span) {
            return kind;
        }

        // (2) locals
        if let Some(local) = self.ctx.local(name) {
            return self.loc_from_local(local);
        }

        let layout = self.ctx.reg_layout();
        let arch = self.ctx.arch();

        // (3) machine registers
        if let Some(code) = layout.reg_by_name(name) {
            if let Some(def) = layout.reg(code) {
                let mut ops = OpList::new();
                ops.push(Op::ConstU16 { value: def.offset });
                return ExprKind::Loc {
                    ops,
                    mode: Mode::Reg,
                    type_key: TypeKey::Reg(RegKey { arch, code }),
                };
            }
        }

        // (4) register aliases
        if let Some(code) = layout.alias_by_name(name) {
            if let Some(offset) = layout.alias_file_offset(code) {
                let mut ops = OpList::new();
                ops.push(Op::ConstU16 { value: offset });
                return ExprKind::Loc {
                    ops,
                    mode: Mode::Reg,
                    type_key: TypeKey::RegAlias(RegKey { arch, code }),
                };
            }
        }

        // (5)-(7) globals, thread locals, procedures, with namespace retry
        for candidate in self.namespace_candidates(name) {
            if let Some((type_key, offset)) = self.ctx.find_global(&candidate) {
                let mut ops = OpList::new();
                ops.push(Op::ModuleOff { offset });
                return ExprKind::Loc {
                    ops,
                    mode: Mode::Addr,
                    type_key,
                };
            }
            if let Some((type_key, offset)) = self.ctx.find_thread_local(&candidate) {
                let mut ops = OpList::new();
                ops.push(Op::TlsOff { offset });
                return ExprKind::Loc {
                    ops,
                    mode: Mode::Addr,
                    type_key,
                };
            }
            if let Some((type_key, offset)) = self.ctx.find_procedure(&candidate) {
                // A procedure's "value" is its address.
                let mut ops = OpList::new();
                ops.push(Op::ModuleOff { offset });
                return ExprKind::Loc {
                    ops,
                    mode: Mode::Value,
                    type_key,
                };
            }
        }

        // (8) type names
        if let Some(type_key) = self.ctx.lookup_type_name(name) {
            return ExprKind::TypeIdent(type_key);
        }

        // Deferred: macro map resolution happens during lowering.
        ExprKind::Ident(name.into())
    }

    /// Step (1): a bare name that matches a member of the implicit `this`
    /// aggregate rewrites to `this-><name>`, provided a `this` local
    /// exists to hang it off.
    fn resolve_implicit_member(&mut self, name: &str, span: Span) -> Option<ExprKind> {
        let implicit = self.ctx.implicit_type()?;
        let has_member = self
            .ctx
            .data_members_of(implicit)
            .iter()
            .any(|member| &*member.name == name);
        if !has_member {
            return None;
        }
        let this = self.ctx.local("this")?;
        let base_kind = self.loc_from_local(this);
        let base = self.arena.alloc(Expr::new(base_kind, span));
        Some(ExprKind::Member {
            base,
            name: name.into(),
            name_span: span,
            through_ptr: true,
        })
    }

    /// Convert a local's location descriptor into location bytecode.
    fn loc_from_local(&self, local: &Local) -> ExprKind {
        let layout = self.ctx.reg_layout();
        let (ops, mode) = match &local.loc {
            LocalLoc::Ops { ops, mode } => (ops.clone(), *mode),
            LocalLoc::RegPlusOff { reg, offset } => {
                let mut ops = OpList::new();
                if let Some(def) = layout.reg(*reg) {
                    ops.push(Op::RegRead {
                        offset: def.offset,
                        size: u8::try_from(def.size).unwrap_or(8),
                    });
                    ops.push(Op::ConstU16 { value: *offset });
                    ops.push(Op::Add {
                        group: TypeGroup::Unsigned,
                    });
                }
                (ops, Mode::Addr)
            }
            LocalLoc::RegPlusOffDeref { reg, offset } => {
                let mut ops = OpList::new();
                if let Some(def) = layout.reg(*reg) {
                    ops.push(Op::RegRead {
                        offset: def.offset,
                        size: u8::try_from(def.size).unwrap_or(8),
                    });
                    ops.push(Op::ConstU16 { value: *offset });
                    ops.push(Op::Add {
                        group: TypeGroup::Unsigned,
                    });
                    ops.push(Op::MemRead { size: 8 });
                }
                (ops, Mode::Addr)
            }
            LocalLoc::Reg { reg } => {
                let mut ops = OpList::new();
                if let Some(def) = layout.reg(*reg) {
                    ops.push(Op::ConstU16 { value: def.offset });
                }
                (ops, Mode::Reg)
            }
        };
        ExprKind::Loc {
            ops,
            mode,
            type_key: local.type_key,
        }
    }

    /// Qualified variants to try for an unqualified name: innermost
    /// namespace of the current procedure first, bare name last.
    fn namespace_candidates(&self, name: &str) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(proc_name) = self.ctx.procedure_name() {
            // Drop the procedure's own trailing segment, then walk the
            // namespace prefix from longest to shortest.
            let mut prefix = proc_name;
            while let Some(idx) = prefix.rfind("::") {
                prefix = &prefix[..idx];
                out.push(format!("{prefix}::{name}"));
            }
        }
        out.push(name.to_string());
        out
    }
}
