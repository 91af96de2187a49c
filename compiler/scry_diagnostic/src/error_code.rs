use std::fmt;

/// Error codes for all engine diagnostics.
///
/// Format: E#### where the first digit indicates the phase:
/// - E1xxx: Parser errors
/// - E2xxx: Lowering (IR builder) errors
/// - E3xxx: Interpreter errors
/// - E9xxx: Internal limits
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ErrorCode {
    // Parser Errors (E1xxx)
    /// Malformed input (missing delimiter, operand, or member name)
    E1001,
    /// Expected expression
    E1002,
    /// Unclosed parenthesis
    E1003,
    /// Unclosed bracket
    E1004,
    /// Missing member name after `.` or `->`
    E1005,
    /// Missing `:` in conditional
    E1006,
    /// Malformed cast type
    E1007,
    /// Malformed numeric literal
    E1008,
    /// Malformed definition (`name = value` requires a bare name)
    E1009,

    // Lowering Errors (E2xxx)
    /// Identifier could not be resolved
    E2001,
    /// Type is not indexable
    E2002,
    /// Index is not an integer
    E2003,
    /// Member lookup on a non-record type
    E2004,
    /// No member with the given name
    E2005,
    /// Cannot dereference this type
    E2006,
    /// Cannot take the address of a non-memory location
    E2007,
    /// Illegal conversion between type groups
    E2008,
    /// Operator not supported for this type group
    E2009,
    /// Mismatched types in conditional branches
    E2010,
    /// Condition is not an integer
    E2011,
    /// Zero-sized element type
    E2012,
    /// String literals have no runtime representation here
    E2013,
    /// Type name used where a value is required
    E2014,

    // Interpreter Errors (E3xxx)
    /// Interpretation failed (message carries the status detail)
    E3001,

    // Internal limits (E9xxx)
    /// Expression too deeply nested
    E9001,
}

impl ErrorCode {
    /// The numeric code as displayed, e.g. `"E2001"`.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::E1001 => "E1001",
            ErrorCode::E1002 => "E1002",
            ErrorCode::E1003 => "E1003",
            ErrorCode::E1004 => "E1004",
            ErrorCode::E1005 => "E1005",
            ErrorCode::E1006 => "E1006",
            ErrorCode::E1007 => "E1007",
            ErrorCode::E1008 => "E1008",
            ErrorCode::E1009 => "E1009",
            ErrorCode::E2001 => "E2001",
            ErrorCode::E2002 => "E2002",
            ErrorCode::E2003 => "E2003",
            ErrorCode::E2004 => "E2004",
            ErrorCode::E2005 => "E2005",
            ErrorCode::E2006 => "E2006",
            ErrorCode::E2007 => "E2007",
            ErrorCode::E2008 => "E2008",
            ErrorCode::E2009 => "E2009",
            ErrorCode::E2010 => "E2010",
            ErrorCode::E2011 => "E2011",
            ErrorCode::E2012 => "E2012",
            ErrorCode::E2013 => "E2013",
            ErrorCode::E2014 => "E2014",
            ErrorCode::E3001 => "E3001",
            ErrorCode::E9001 => "E9001",
        }
    }

    /// True for the parser's recoverable malformed-input family.
    pub const fn is_parse(self) -> bool {
        matches!(
            self,
            ErrorCode::E1001
                | ErrorCode::E1002
                | ErrorCode::E1003
                | ErrorCode::E1004
                | ErrorCode::E1005
                | ErrorCode::E1006
                | ErrorCode::E1007
                | ErrorCode::E1008
                | ErrorCode::E1009
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_display_matches_name() {
        assert_eq!(ErrorCode::E2001.to_string(), "E2001");
        assert_eq!(ErrorCode::E9001.as_str(), "E9001");
    }

    #[test]
    fn test_parse_family() {
        assert!(ErrorCode::E1004.is_parse());
        assert!(!ErrorCode::E2001.is_parse());
    }
}
