//! The scanning state machine.

use scry_ir::{Span, Token, TokenKind, TokenList};

/// Multi-character operators, tried longest-first at each split position.
const MULTI_CHAR_OPS: [&[u8]; 9] = [
    b"<<", b">>", b"->", b"<=", b">=", b"==", b"!=", b"&&", b"||",
];

#[inline]
fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'@' || b == b'$' || b == b'`' || b >= 0x80
}

#[inline]
fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'@' || b == b'$' || b >= 0x80
}

#[inline]
fn is_symbol(b: u8) -> bool {
    matches!(
        b,
        b'!' | b'%'
            | b'^'
            | b'&'
            | b'*'
            | b'+'
            | b'-'
            | b'='
            | b'<'
            | b'>'
            | b'/'
            | b'|'
            | b'?'
            | b':'
            | b'.'
            | b'~'
            | b'#'
    )
}

/// Brackets and separators that tokenize immediately, one byte each.
#[inline]
fn is_single_symbol(b: u8) -> bool {
    matches!(b, b'(' | b')' | b'[' | b']' | b'{' | b'}' | b',' | b';')
}

/// Byte scanner over the expression text.
struct Scanner<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Scanner {
            src: src.as_bytes(),
            pos: 0,
        }
    }

    #[inline]
    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    #[inline]
    fn peek_at(&self, off: usize) -> Option<u8> {
        self.src.get(self.pos + off).copied()
    }

    #[inline]
    fn bump(&mut self) {
        self.pos += 1;
    }

    #[inline]
    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    /// Scan an identifier starting at the current position.
    ///
    /// Handles backtick-quoted identifiers, `::` qualification, and
    /// template-argument swallowing.
    fn scan_ident(&mut self) {
        if self.peek() == Some(b'`') {
            // Backtick identifier: runs to the closing backtick or
            // apostrophe, end of input if unterminated.
            self.bump();
            while let Some(b) = self.peek() {
                self.bump();
                if b == b'`' || b == b'\'' {
                    break;
                }
            }
            // A qualified or templated tail may follow the closing quote.
        }
        loop {
            while self.peek().is_some_and(is_ident_continue) {
                self.bump();
            }
            match self.peek() {
                // `::` followed by an identifier start or `<` is an
                // internal separator, not the end of the token.
                Some(b':')
                    if self.peek_at(1) == Some(b':')
                        && self
                            .peek_at(2)
                            .is_some_and(|b| is_ident_start(b) || b == b'<') =>
                {
                    self.bump();
                    self.bump();
                }
                // Template argument list: swallow through the matching `>`
                // if one exists, otherwise the identifier ends here and
                // `<` is left as an operator.
                Some(b'<') => {
                    let Some(close) = self.find_template_close() else {
                        break;
                    };
                    self.pos = close + 1;
                }
                _ => break,
            }
        }
    }

    /// From a `<` at the current position, find the byte index of the
    /// matching `>`, tracking nesting. `None` if input ends first.
    fn find_template_close(&self) -> Option<usize> {
        let mut depth = 0usize;
        let mut i = self.pos;
        while let Some(&b) = self.src.get(i) {
            match b {
                b'<' => depth += 1,
                b'>' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            }
            i += 1;
        }
        None
    }

    /// Scan a numeric run. Int/float/suffix classification is the
    /// parser's job, so this accepts any alphanumeric-and-dot tail.
    fn scan_number(&mut self) {
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'.')
        {
            self.bump();
        }
    }

    /// Scan a string or char literal delimited by `quote`, tracking
    /// backslash escapes. Unterminated literals run to end of input.
    fn scan_quoted(&mut self, quote: u8) {
        self.bump(); // opening quote
        let mut escaped = false;
        while let Some(b) = self.peek() {
            self.bump();
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == quote {
                break;
            }
        }
    }
}

/// Tokenize expression text into a flat, index-addressable token array.
///
/// Total over all inputs; spans are byte ranges into `text` and appear in
/// non-decreasing order.
pub fn tokenize(text: &str) -> TokenList {
    let mut scanner = Scanner::new(text);
    let mut tokens = TokenList::new();

    while let Some(b) = scanner.peek() {
        let start = scanner.pos;
        if b.is_ascii_whitespace() {
            scanner.bump();
        } else if is_ident_start(b) {
            scanner.scan_ident();
            tokens.push(Token::new(
                TokenKind::Ident,
                Span::from_range(start..scanner.pos),
            ));
        } else if b.is_ascii_digit() {
            scanner.scan_number();
            tokens.push(Token::new(
                TokenKind::Num,
                Span::from_range(start..scanner.pos),
            ));
        } else if b == b'"' {
            scanner.scan_quoted(b'"');
            tokens.push(Token::new(
                TokenKind::Str,
                Span::from_range(start..scanner.pos),
            ));
        } else if b == b'\'' {
            scanner.scan_quoted(b'\'');
            tokens.push(Token::new(
                TokenKind::CharLit,
                Span::from_range(start..scanner.pos),
            ));
        } else if is_single_symbol(b) {
            scanner.bump();
            tokens.push(Token::new(
                TokenKind::Symbol,
                Span::from_range(start..scanner.pos),
            ));
        } else if is_symbol(b) {
            // Gather the maximal run of operator characters, then split
            // it by maximal munch.
            while scanner.peek().is_some_and(is_symbol) {
                scanner.bump();
            }
            if !split_symbol_run(text, start, scanner.pos, &mut tokens) {
                // `--` hard stop: nothing after it is tokenized.
                return tokens;
            }
        } else {
            // Unknown byte: absorbed without a token or an error.
            scanner.bump();
        }
    }

    tokens
}

/// Split `text[start..end]` (a run of operator characters) into symbol
/// tokens by maximal munch. Returns `false` on a `--` hard stop.
fn split_symbol_run(text: &str, start: usize, end: usize, tokens: &mut TokenList) -> bool {
    let bytes = text.as_bytes();
    let mut i = start;
    while i < end {
        let pair = &bytes[i..(i + 2).min(end)];
        if pair.len() == 2 && MULTI_CHAR_OPS.contains(&pair) {
            tokens.push(Token::new(TokenKind::Symbol, Span::from_range(i..i + 2)));
            i += 2;
        } else if pair == b"--" {
            return false;
        } else {
            tokens.push(Token::new(TokenKind::Symbol, Span::from_range(i..i + 1)));
            i += 1;
        }
    }
    true
}
