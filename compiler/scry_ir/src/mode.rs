//! Location class of an evaluated expression.

use std::fmt;

/// Whether a lowered expression yields a memory address, a directly-held
/// value, or a register-file-relative value.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum Mode {
    /// No usable location (errors, void).
    #[default]
    Null,
    /// The expression computes the value itself.
    Value,
    /// The expression computes an address in target memory.
    Addr,
    /// The expression computes a byte offset into the register file.
    Reg,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Null => "null",
            Mode::Value => "value",
            Mode::Addr => "addr",
            Mode::Reg => "reg",
        };
        f.write_str(name)
    }
}
