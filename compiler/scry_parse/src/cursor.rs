//! Token cursor.

use scry_ir::{Span, Token, TokenKind, TokenList};

/// Read position over the token array, with text access for
/// payload-free tokens.
pub(crate) struct Cursor<'a> {
    tokens: &'a TokenList,
    text: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(tokens: &'a TokenList, text: &'a str) -> Self {
        Cursor {
            tokens,
            text,
            pos: 0,
        }
    }

    #[inline]
    pub(crate) fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    #[inline]
    pub(crate) fn current(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    #[inline]
    pub(crate) fn peek(&self, off: usize) -> Option<&'a Token> {
        self.tokens.get(self.pos + off)
    }

    /// Source text of the current token, empty at end of input.
    #[inline]
    pub(crate) fn current_text(&self) -> &'a str {
        self.current().map_or("", |t| t.text(self.text))
    }

    pub(crate) fn peek_text(&self, off: usize) -> &'a str {
        self.peek(off).map_or("", |t| t.text(self.text))
    }

    /// Span of the current token, or a point span at end of input.
    pub(crate) fn current_span(&self) -> Span {
        self.current().map_or_else(
            || Span::point(u32::try_from(self.text.len()).unwrap_or(u32::MAX)),
            |t| t.span,
        )
    }

    #[inline]
    pub(crate) fn advance(&mut self) {
        self.pos += 1;
    }

    /// Number of tokens consumed so far.
    #[inline]
    pub(crate) fn consumed(&self) -> usize {
        self.pos
    }

    /// True if the current token is a symbol with exactly this text.
    pub(crate) fn check_symbol(&self, sym: &str) -> bool {
        self.current()
            .is_some_and(|t| t.kind == TokenKind::Symbol && t.text(self.text) == sym)
    }

    pub(crate) fn check_kind(&self, kind: TokenKind) -> bool {
        self.current().is_some_and(|t| t.kind == kind)
    }

    /// Consume the current token if it is the given symbol.
    pub(crate) fn eat_symbol(&mut self, sym: &str) -> bool {
        if self.check_symbol(sym) {
            self.advance();
            true
        } else {
            false
        }
    }
}
