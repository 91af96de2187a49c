//! The expression grammar.
//!
//! Precedence climbing without an explicit operator stack: a binary
//! operator is only consumed by the current call when its precedence is
//! at or under the caller-supplied ceiling. Parenthesized expressions,
//! index brackets, and the ternary's middle operand recurse with the
//! ceiling reset to maximum.

use scry_diagnostic::{Diagnostic, DiagnosticList, ErrorCode};
use scry_ir::{
    BasicKind, BinaryOp, Expr, ExprArena, ExprId, ExprKind, Span, TokenKind, TokenList, TypeKey,
    UnaryOp,
};
use scry_types::Context;

use crate::cursor::Cursor;
use crate::literals::{classify_number, strip_quotes, unescape, Classified};

/// Precedence ceiling passed to the root call: everything binds.
const MAX_PREC: u8 = 14;
const PREC_TERNARY: u8 = 13;
const PREC_DEFINE: u8 = 14;

/// Explicit recursion bound. Exceeding it reports one dedicated
/// diagnostic instead of overflowing the stack.
const MAX_PARSE_DEPTH: u32 = 192;

/// Result of parsing one expression.
pub struct Parse {
    pub arena: ExprArena,
    pub root: ExprId,
    pub diags: DiagnosticList,
    /// Tokens consumed; the caller owns whatever follows (e.g. a `--`
    /// suffix the tokenizer already stopped at).
    pub consumed: usize,
}

/// Parse one expression against a context.
pub fn parse_expr(ctx: &Context<'_>, text: &str, tokens: &TokenList) -> Parse {
    let mut parser = Parser {
        ctx,
        cursor: Cursor::new(tokens, text),
        arena: ExprArena::new(),
        diags: DiagnosticList::new(),
        depth: 0,
        depth_reported: false,
    };
    let root = parser.parse_prec(MAX_PREC);
    tracing::debug!(
        tokens = tokens.len(),
        consumed = parser.cursor.consumed(),
        diagnostics = parser.diags.len(),
        "parsed expression"
    );
    Parse {
        arena: parser.arena,
        root,
        diags: parser.diags,
        consumed: parser.cursor.consumed(),
    }
}

pub(crate) struct Parser<'a> {
    pub(crate) ctx: &'a Context<'a>,
    pub(crate) cursor: Cursor<'a>,
    pub(crate) arena: ExprArena,
    pub(crate) diags: DiagnosticList,
    depth: u32,
    depth_reported: bool,
}

fn binary_prec(text: &str) -> Option<(BinaryOp, u8)> {
    let entry = match text {
        "*" => (BinaryOp::Mul, 3),
        "/" => (BinaryOp::Div, 3),
        "%" => (BinaryOp::Mod, 3),
        "+" => (BinaryOp::Add, 4),
        "-" => (BinaryOp::Sub, 4),
        "<<" => (BinaryOp::LShift, 5),
        ">>" => (BinaryOp::RShift, 5),
        "<" => (BinaryOp::Less, 6),
        "<=" => (BinaryOp::LessEq, 6),
        ">" => (BinaryOp::Grtr, 6),
        ">=" => (BinaryOp::GrtrEq, 6),
        "==" => (BinaryOp::EqEq, 7),
        "!=" => (BinaryOp::NotEq, 7),
        "&" => (BinaryOp::BitAnd, 8),
        "^" => (BinaryOp::BitXor, 9),
        "|" => (BinaryOp::BitOr, 10),
        "&&" => (BinaryOp::LogAnd, 11),
        "||" => (BinaryOp::LogOr, 12),
        _ => return None,
    };
    Some(entry)
}

impl Parser<'_> {
    fn error(&mut self, code: ErrorCode, span: Span, message: impl Into<String>) {
        self.diags.push(Diagnostic::error(code, span, message));
    }

    /// Guard one level of recursion; on failure a diagnostic has been
    /// reported (once) and the caller should substitute an error node.
    fn enter(&mut self) -> bool {
        self.depth += 1;
        if self.depth > MAX_PARSE_DEPTH {
            if !self.depth_reported {
                self.depth_reported = true;
                let span = self.cursor.current_span();
                self.error(ErrorCode::E9001, span, "expression is too deeply nested");
            }
            return false;
        }
        true
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn span_of(&self, id: ExprId) -> Span {
        self.arena.get(id).span
    }

    pub(crate) fn parse_prec(&mut self, max_prec: u8) -> ExprId {
        if !self.enter() {
            let span = self.cursor.current_span();
            return self.arena.alloc_error(span);
        }
        let result = self.parse_prec_inner(max_prec);
        self.leave();
        result
    }

    fn parse_prec_inner(&mut self, max_prec: u8) -> ExprId {
        let mut lhs = self.parse_unary();
        loop {
            if self.cursor.check_symbol("?") && PREC_TERNARY <= max_prec {
                lhs = self.parse_ternary_tail(lhs);
                continue;
            }
            if self.cursor.check_symbol("=") && PREC_DEFINE <= max_prec {
                lhs = self.parse_define_tail(lhs);
                continue;
            }
            let Some((op, prec)) = binary_prec(self.cursor.current_text()) else {
                break;
            };
            if !self.cursor.check_kind(TokenKind::Symbol) || prec > max_prec {
                break;
            }
            self.cursor.advance();
            // Left-associative: the right side only takes tighter
            // operators.
            let rhs = self.parse_prec(prec - 1);
            let span = self.span_of(lhs).merge(self.span_of(rhs));
            lhs = self
                .arena
                .alloc(Expr::new(ExprKind::Binary { op, lhs, rhs }, span));
        }
        lhs
    }

    /// `cond ? then : else`, right-associative, middle operand parsed
    /// with the ceiling reset.
    fn parse_ternary_tail(&mut self, cond: ExprId) -> ExprId {
        self.cursor.advance();
        let then_expr = self.parse_prec(MAX_PREC);
        let else_expr = if self.cursor.eat_symbol(":") {
            self.parse_prec(PREC_TERNARY)
        } else {
            let span = self.cursor.current_span();
            self.error(ErrorCode::E1006, span, "expected `:` in conditional");
            self.arena.alloc_error(span)
        };
        let span = self.span_of(cond).merge(self.span_of(else_expr));
        self.arena.alloc(Expr::new(
            ExprKind::Ternary {
                cond,
                then_expr,
                else_expr,
            },
            span,
        ))
    }

    /// `name = value` installs a user macro for the rest of the
    /// evaluation; any other left side is malformed.
    fn parse_define_tail(&mut self, lhs: ExprId) -> ExprId {
        let eq_span = self.cursor.current_span();
        self.cursor.advance();
        let value = self.parse_prec(PREC_DEFINE);
        let name = match &self.arena.get(lhs).kind {
            ExprKind::Ident(name) => Some(name.clone()),
            _ => None,
        };
        let span = self.span_of(lhs).merge(self.span_of(value));
        match name {
            Some(name) => self
                .arena
                .alloc(Expr::new(ExprKind::Define { name, value }, span)),
            None => {
                self.error(
                    ErrorCode::E1009,
                    eq_span,
                    "left side of `=` must be a plain name",
                );
                self.arena.alloc_error(span)
            }
        }
    }

    fn parse_unary(&mut self) -> ExprId {
        if !self.enter() {
            let span = self.cursor.current_span();
            return self.arena.alloc_error(span);
        }
        let result = self.parse_unary_inner();
        self.leave();
        result
    }

    fn parse_unary_inner(&mut self) -> ExprId {
        let start = self.cursor.current_span();

        if self.cursor.check_kind(TokenKind::Ident) && self.cursor.current_text() == "sizeof" {
            self.cursor.advance();
            return self.parse_sizeof_tail(start);
        }

        let prefix = match self.cursor.current_text() {
            "!" => Some(UnaryOp::LogNot),
            "~" => Some(UnaryOp::BitNot),
            "-" => Some(UnaryOp::Neg),
            "*" => Some(UnaryOp::Deref),
            "&" => Some(UnaryOp::AddressOf),
            _ => None,
        };
        if let Some(op) = prefix {
            if self.cursor.check_kind(TokenKind::Symbol) {
                self.cursor.advance();
                let operand = self.parse_unary();
                let span = start.merge(self.span_of(operand));
                return self
                    .arena
                    .alloc(Expr::new(ExprKind::Unary { op, operand }, span));
            }
        }

        if self.cursor.check_symbol("(") && self.paren_opens_cast() {
            return self.parse_cast(start);
        }

        let mut expr = self.parse_atom();
        loop {
            if self.cursor.check_symbol(".") || self.cursor.check_symbol("->") {
                let through_ptr = self.cursor.check_symbol("->");
                self.cursor.advance();
                expr = self.parse_member_tail(expr, through_ptr);
            } else if self.cursor.check_symbol("[") {
                self.cursor.advance();
                let index = self.parse_prec(MAX_PREC);
                if !self.cursor.eat_symbol("]") {
                    let span = self.cursor.current_span();
                    self.error(ErrorCode::E1004, span, "missing closing `]`");
                }
                let span = self.span_of(expr).merge(self.span_of(index));
                expr = self
                    .arena
                    .alloc(Expr::new(ExprKind::Index { base: expr, index }, span));
            } else {
                break;
            }
        }
        expr
    }

    fn parse_member_tail(&mut self, base: ExprId, through_ptr: bool) -> ExprId {
        if self.cursor.check_kind(TokenKind::Ident) {
            let name = self.cursor.current_text();
            let name_span = self.cursor.current_span();
            self.cursor.advance();
            let span = self.span_of(base).merge(name_span);
            self.arena.alloc(Expr::new(
                ExprKind::Member {
                    base,
                    name: name.into(),
                    name_span,
                    through_ptr,
                },
                span,
            ))
        } else {
            let span = self.cursor.current_span();
            let accessor = if through_ptr { "->" } else { "." };
            self.error(
                ErrorCode::E1005,
                span,
                format!("expected member name after `{accessor}`"),
            );
            self.arena.alloc_error(span)
        }
    }

    fn parse_sizeof_tail(&mut self, start: Span) -> ExprId {
        if self.cursor.check_symbol("(") && self.paren_opens_cast() {
            self.cursor.advance();
            let ty = match self.parse_type() {
                Some(ty) => ty,
                None => {
                    let span = self.cursor.current_span();
                    self.error(ErrorCode::E1007, span, "malformed type in sizeof");
                    TypeKey::Null
                }
            };
            let end = self.cursor.current_span();
            if !self.cursor.eat_symbol(")") {
                self.error(ErrorCode::E1003, end, "missing closing `)`");
            }
            return self
                .arena
                .alloc(Expr::new(ExprKind::SizeofType(ty), start.merge(end)));
        }
        let operand = self.parse_unary();
        let span = start.merge(self.span_of(operand));
        self.arena
            .alloc(Expr::new(ExprKind::SizeofExpr(operand), span))
    }

    fn parse_cast(&mut self, start: Span) -> ExprId {
        self.cursor.advance(); // (
        let ty = match self.parse_type() {
            Some(ty) => ty,
            None => {
                let span = self.cursor.current_span();
                self.error(ErrorCode::E1007, span, "malformed type in cast");
                TypeKey::Null
            }
        };
        if !self.cursor.eat_symbol(")") {
            let span = self.cursor.current_span();
            self.error(ErrorCode::E1003, span, "missing closing `)` after cast type");
        }
        let operand = self.parse_unary();
        let span = start.merge(self.span_of(operand));
        self.arena
            .alloc(Expr::new(ExprKind::Cast { ty, operand }, span))
    }

    fn parse_atom(&mut self) -> ExprId {
        let span = self.cursor.current_span();
        let Some(token) = self.cursor.current() else {
            self.error(ErrorCode::E1002, span, "expected expression");
            return self.arena.alloc_error(span);
        };
        match token.kind {
            TokenKind::Num => {
                let text = self.cursor.current_text();
                let classified = classify_number(text);
                self.cursor.advance();
                let kind = match classified {
                    Classified::Int { value, ty } => ExprKind::IntLit {
                        value,
                        ty: TypeKey::Basic(ty),
                    },
                    Classified::Float { bits, ty } => ExprKind::FloatLit {
                        bits,
                        ty: TypeKey::Basic(ty),
                    },
                    Classified::Malformed => {
                        self.error(
                            ErrorCode::E1008,
                            span,
                            format!("malformed numeric literal `{text}`"),
                        );
                        ExprKind::Error
                    }
                };
                self.arena.alloc(Expr::new(kind, span))
            }
            TokenKind::Str => {
                let body = unescape(strip_quotes(self.cursor.current_text(), '"'));
                self.cursor.advance();
                self.arena
                    .alloc(Expr::new(ExprKind::StrLit(body.into()), span))
            }
            TokenKind::CharLit => {
                let body = unescape(strip_quotes(self.cursor.current_text(), '\''));
                self.cursor.advance();
                match body.chars().next() {
                    Some(c) => self.arena.alloc(Expr::new(ExprKind::CharLit(c), span)),
                    None => {
                        self.error(ErrorCode::E1008, span, "empty character literal");
                        self.arena.alloc_error(span)
                    }
                }
            }
            TokenKind::Ident => {
                let name = self.cursor.current_text();
                self.cursor.advance();
                let kind = self.resolve_ident(name, span);
                self.arena.alloc(Expr::new(kind, span))
            }
            TokenKind::Symbol if self.cursor.check_symbol("(") => {
                self.cursor.advance();
                let inner = self.parse_prec(MAX_PREC);
                if !self.cursor.eat_symbol(")") {
                    let close_span = self.cursor.current_span();
                    self.error(ErrorCode::E1003, close_span, "missing closing `)`");
                }
                inner
            }
            TokenKind::Symbol if self.cursor.check_symbol("[") => {
                // Assembly-style absolute dereference: `[e]` is sugar
                // for `*(uint64_t*)(e)`.
                self.cursor.advance();
                let inner = self.parse_prec(MAX_PREC);
                if !self.cursor.eat_symbol("]") {
                    let close_span = self.cursor.current_span();
                    self.error(ErrorCode::E1004, close_span, "missing closing `]`");
                }
                let ptr_u64 = self.ctx.ptr_to(TypeKey::Basic(BasicKind::U64));
                let full = span.merge(self.span_of(inner));
                let cast = self.arena.alloc(Expr::new(
                    ExprKind::Cast {
                        ty: ptr_u64,
                        operand: inner,
                    },
                    full,
                ));
                self.arena.alloc(Expr::new(
                    ExprKind::Unary {
                        op: UnaryOp::Deref,
                        operand: cast,
                    },
                    full,
                ))
            }
            TokenKind::Symbol => {
                self.error(
                    ErrorCode::E1002,
                    span,
                    format!("expected expression, found `{}`", self.cursor.current_text()),
                );
                self.arena.alloc_error(span)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use scry_ir::Arch;
    use scry_lexer::tokenize;

    fn parse(text: &str) -> Parse {
        let ctx = Context::new(Arch::X64);
        let tokens = tokenize(text);
        parse_expr(&ctx, text, &tokens)
    }

    #[test]
    fn test_precedence_mul_over_add() {
        let p = parse("1+2*3");
        assert!(p.diags.is_empty());
        let ExprKind::Binary { op: BinaryOp::Add, rhs, .. } = &p.arena.get(p.root).kind else {
            panic!("root must be +");
        };
        assert!(matches!(
            p.arena.get(*rhs).kind,
            ExprKind::Binary { op: BinaryOp::Mul, .. }
        ));
    }

    #[test]
    fn test_shift_binds_looser_than_add() {
        let p = parse("1<<2+3");
        let ExprKind::Binary { op: BinaryOp::LShift, rhs, .. } = &p.arena.get(p.root).kind
        else {
            panic!("root must be <<");
        };
        assert!(matches!(
            p.arena.get(*rhs).kind,
            ExprKind::Binary { op: BinaryOp::Add, .. }
        ));
    }

    #[test]
    fn test_unsigned_cast() {
        let p = parse("(unsigned int)-1");
        assert!(p.diags.is_empty());
        let ExprKind::Cast { ty, operand } = &p.arena.get(p.root).kind else {
            panic!("root must be a cast");
        };
        assert_eq!(*ty, TypeKey::Basic(BasicKind::U32));
        assert!(matches!(
            p.arena.get(*operand).kind,
            ExprKind::Unary { op: UnaryOp::Neg, .. }
        ));
    }

    #[test]
    fn test_pointer_cast_with_stars() {
        let p = parse("(uint8_t*)0");
        let ExprKind::Cast { ty, .. } = &p.arena.get(p.root).kind else {
            panic!("root must be a cast");
        };
        assert!(matches!(ty, TypeKey::Cons(_)));
    }

    #[test]
    fn test_member_chain() {
        let p = parse("a.b->c");
        let ExprKind::Member { base, name, through_ptr, .. } = &p.arena.get(p.root).kind
        else {
            panic!("root must be a member access");
        };
        assert_eq!(&**name, "c");
        assert!(*through_ptr);
        assert!(matches!(
            p.arena.get(*base).kind,
            ExprKind::Member { through_ptr: false, .. }
        ));
    }

    #[test]
    fn test_absolute_deref_sugar() {
        let p = parse("[0x1000]");
        assert!(p.diags.is_empty());
        let ExprKind::Unary { op: UnaryOp::Deref, operand } = &p.arena.get(p.root).kind else {
            panic!("sugar must produce a dereference");
        };
        assert!(matches!(p.arena.get(*operand).kind, ExprKind::Cast { .. }));
    }

    #[test]
    fn test_ternary() {
        let p = parse("1 ? 2 : 3");
        assert!(p.diags.is_empty());
        assert!(matches!(p.arena.get(p.root).kind, ExprKind::Ternary { .. }));
    }

    #[test]
    fn test_define() {
        let p = parse("x = 1+2");
        assert!(p.diags.is_empty());
        let ExprKind::Define { name, .. } = &p.arena.get(p.root).kind else {
            panic!("root must be a define");
        };
        assert_eq!(&**name, "x");
    }

    #[test]
    fn test_sizeof_type_and_expr() {
        let p = parse("sizeof(int)");
        assert!(matches!(
            p.arena.get(p.root).kind,
            ExprKind::SizeofType(TypeKey::Basic(BasicKind::S32))
        ));
        let p = parse("sizeof x");
        assert!(matches!(p.arena.get(p.root).kind, ExprKind::SizeofExpr(_)));
    }

    #[test]
    fn test_missing_rhs_recovers() {
        let p = parse("1+");
        assert!(p.diags.has_errors());
        assert!(matches!(
            p.arena.get(p.root).kind,
            ExprKind::Binary { op: BinaryOp::Add, .. }
        ));
    }

    #[test]
    fn test_missing_close_paren_recovers() {
        let p = parse("(1+2");
        assert!(p.diags.has_errors());
        assert_eq!(
            p.diags.iter().next().map(|d| d.code),
            Some(ErrorCode::E1003)
        );
    }

    #[test]
    fn test_missing_ternary_colon() {
        let p = parse("1 ? 2");
        assert!(p.diags.iter().any(|d| d.code == ErrorCode::E1006));
    }

    #[test]
    fn test_depth_bound_reports_once() {
        let deep = format!("{}1{}", "(".repeat(400), ")".repeat(400));
        let p = parse(&deep);
        let count = p
            .diags
            .iter()
            .filter(|d| d.code == ErrorCode::E9001)
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_unresolved_identifier_stays_leaf() {
        let p = parse("mystery");
        assert!(p.diags.is_empty());
        assert!(matches!(p.arena.get(p.root).kind, ExprKind::Ident(_)));
    }

    #[test]
    fn test_register_resolves() {
        let p = parse("rax");
        assert!(matches!(
            p.arena.get(p.root).kind,
            ExprKind::Loc { mode: scry_ir::Mode::Reg, type_key: TypeKey::Reg(_), .. }
        ));
    }
}
