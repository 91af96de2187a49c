//! Cast-type grammar.
//!
//! A type expression inside a cast (or `sizeof`) is: an optional
//! `unsigned`/`signed` combination, a built-in C name or a debug-info
//! type name, then any number of `*` declarator suffixes.

use scry_ir::{BasicKind, TokenKind, TypeKey};

use crate::parser::Parser;

impl Parser<'_> {
    /// True if a `(` at the current position opens a cast: the next
    /// token is an identifier that names a known type (or `unsigned`/
    /// `signed`).
    pub(crate) fn paren_opens_cast(&self) -> bool {
        let Some(next) = self.cursor.peek(1) else {
            return false;
        };
        if next.kind != TokenKind::Ident {
            return false;
        }
        let text = self.cursor.peek_text(1);
        matches!(text, "unsigned" | "signed") || self.ctx.lookup_type_name(text).is_some()
    }

    /// Parse a type expression. `None` means the tokens at the cursor do
    /// not form a type; the cursor may have advanced past a base-name
    /// prefix, so callers should only invoke this after
    /// [`paren_opens_cast`] (or equivalent lookahead) said yes.
    pub(crate) fn parse_type(&mut self) -> Option<TypeKey> {
        let mut key = self.parse_base_type()?;
        loop {
            if self.cursor.eat_symbol("*") {
                key = self.ctx.ptr_to(key);
            } else if self.cursor.eat_symbol("&") {
                key = self.ctx.cons(scry_ir::TypeKind::LRef, key, 0);
            } else {
                break;
            }
        }
        Some(key)
    }

    fn parse_base_type(&mut self) -> Option<TypeKey> {
        if !self.cursor.check_kind(TokenKind::Ident) {
            return None;
        }
        let first = self.cursor.current_text();
        match first {
            "unsigned" => {
                self.cursor.advance();
                Some(TypeKey::Basic(self.int_width_suffix(true)))
            }
            "signed" => {
                self.cursor.advance();
                Some(TypeKey::Basic(self.int_width_suffix(false)))
            }
            "long" => {
                self.cursor.advance();
                // long, long long, long int, long long int
                if self.cursor.check_kind(TokenKind::Ident)
                    && self.cursor.current_text() == "long"
                {
                    self.cursor.advance();
                }
                self.eat_int_keyword();
                Some(TypeKey::Basic(BasicKind::S64))
            }
            "short" => {
                self.cursor.advance();
                self.eat_int_keyword();
                Some(TypeKey::Basic(BasicKind::S16))
            }
            _ => {
                let key = self.ctx.lookup_type_name(first)?;
                self.cursor.advance();
                Some(key)
            }
        }
    }

    /// After `unsigned`/`signed`, consume an optional width keyword and
    /// map to the concrete basic kind.
    fn int_width_suffix(&mut self, unsigned: bool) -> BasicKind {
        if self.cursor.check_kind(TokenKind::Ident) {
            let kind = match self.cursor.current_text() {
                "char" => Some(if unsigned { BasicKind::U8 } else { BasicKind::S8 }),
                "short" => Some(if unsigned { BasicKind::U16 } else { BasicKind::S16 }),
                "int" => Some(if unsigned { BasicKind::U32 } else { BasicKind::S32 }),
                "long" => Some(if unsigned { BasicKind::U64 } else { BasicKind::S64 }),
                _ => None,
            };
            if let Some(kind) = kind {
                let was_long = self.cursor.current_text() == "long";
                self.cursor.advance();
                if was_long {
                    // unsigned long long
                    if self.cursor.check_kind(TokenKind::Ident)
                        && self.cursor.current_text() == "long"
                    {
                        self.cursor.advance();
                    }
                }
                self.eat_int_keyword();
                return kind;
            }
        }
        if unsigned {
            BasicKind::U32
        } else {
            BasicKind::S32
        }
    }

    /// `long int`, `unsigned long int`: the trailing `int` is noise.
    fn eat_int_keyword(&mut self) {
        if self.cursor.check_kind(TokenKind::Ident) && self.cursor.current_text() == "int" {
            self.cursor.advance();
        }
    }
}
