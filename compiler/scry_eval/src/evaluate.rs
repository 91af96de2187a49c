//! The evaluation pipeline.
//!
//! tokenize → parse → lower → compile → interpret, with every stage's
//! diagnostics funneled into one ordered list. A fatal condition at any
//! stage short-circuits the stages after it but still returns whatever
//! was collected.

use scry_diagnostic::{Diagnostic, DiagnosticList, ErrorCode};
use scry_ir::{Mode, Span, TypeKey, Value};
use scry_types::Context;

use crate::io::EvalIO;
use crate::machine::{interpret, InterpError};

/// Terminal status of the interpretation stage.
///
/// Separate from the diagnostic list by design: parse and lowering
/// problems are recoverable messages, interpretation failure is a single
/// code set exactly once. `Good` also covers evaluations whose earlier
/// stages failed — the interpreter never ran, so it has nothing to
/// report; `mode == Mode::Null` is the no-value signal.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum InterpStatus {
    Good,
    Failed(InterpError),
}

impl InterpStatus {
    pub fn is_good(self) -> bool {
        matches!(self, InterpStatus::Good)
    }
}

/// Everything one evaluation produces.
#[derive(Debug)]
pub struct Evaluation {
    /// The computed value; zero when no value was produced.
    pub value: Value,
    /// Location class of the expression (its value is still computed:
    /// an `Addr`-mode evaluation reports the loaded value here and the
    /// address semantics in `mode`). `Null` means no value.
    pub mode: Mode,
    pub type_key: TypeKey,
    pub status: InterpStatus,
    pub diags: DiagnosticList,
}

impl Evaluation {
    /// True if a value was actually produced.
    pub fn has_value(&self) -> bool {
        self.mode != Mode::Null && self.status.is_good()
    }

    fn empty(diags: DiagnosticList, status: InterpStatus) -> Self {
        Evaluation {
            value: Value::ZERO,
            mode: Mode::Null,
            type_key: TypeKey::Null,
            status,
            diags,
        }
    }
}

/// Evaluate expression text against a context and target accessors.
pub fn evaluate(ctx: &Context<'_>, io: &EvalIO<'_>, text: &str) -> Evaluation {
    tracing::debug!(text, "evaluating expression");

    let tokens = scry_lexer::tokenize(text);
    let parse = scry_parse::parse_expr(ctx, text, &tokens);
    let mut diags = parse.diags;

    let mut lowered = scry_lower::lower(ctx, &parse.arena, parse.root);
    diags.append(&mut lowered.diags);
    if diags.has_errors() {
        return Evaluation::empty(diags, InterpStatus::Good);
    }

    let bytecode = scry_lower::compile(&lowered.ir, lowered.value_root);
    match interpret(&bytecode, io) {
        Ok(value) => Evaluation {
            value,
            mode: lowered.mode,
            type_key: lowered.type_key,
            status: InterpStatus::Good,
            diags,
        },
        Err(error) => {
            let span = Span::from_range(0..text.len());
            diags.push(Diagnostic::error(ErrorCode::E3001, span, error.to_string()));
            Evaluation::empty(diags, InterpStatus::Failed(error))
        }
    }
}
