//! Scry Lexer - tokenizer for the scry expression engine.
//!
//! A single left-to-right scan with no backtracking across token
//! boundaries. The tokenizer is total: any input produces a token list,
//! never an error — unterminated literals run to end of input, unknown
//! bytes are absorbed, and malformed constructs surface later as parser
//! diagnostics.
//!
//! Identifiers are debugger-flavored: a leading backtick opens an
//! identifier that may contain otherwise-illegal characters, `::` joins
//! qualified names, and a `<`...`>` template argument list directly after
//! an identifier is swallowed into it when a matching `>` exists.
//!
//! A `--` symbol run hard-stops the scan; everything after it is left for
//! the caller's own suffix syntax.

mod scanner;

pub use scanner::tokenize;
