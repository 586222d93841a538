//! Instruction operands.
//!
//! An operand is either a variable reference or an immediate literal. The
//! builder produces operands from source spellings, so the classification is
//! lexical: a spelling is a number if it reads as a decimal floating-point
//! literal, a string if it is quote-delimited, one of the four keyword
//! literals verbatim, and a variable reference otherwise.
//!
//! Operands implement `Eq` and `Hash` (numbers compare by bit pattern) so
//! canonical expressions can key hash sets during available-expressions
//! analysis and CSE.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::ast::Literal;

/// A value appearing inside an instruction.
#[derive(Debug, Clone)]
pub enum Operand {
    /// A variable reference. After SSA renaming the name carries the
    /// qualified `name#k` spelling.
    Var(String),
    /// An IEEE-754 double.
    Number(f64),
    /// A string literal, stored without quotes.
    Str(String),
    /// A boolean literal.
    Bool(bool),
    /// The `null` singleton.
    Null,
    /// The `undefined` singleton.
    Undefined,
}

impl Operand {
    /// Classifies a source spelling into an operand.
    ///
    /// Numeric literals (optional sign, fraction and exponent), quoted
    /// strings, and the keywords `true`, `false`, `null` and `undefined`
    /// are recognized; any other non-empty spelling is a variable
    /// reference.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        debug_assert!(!text.is_empty(), "operand spellings are non-empty");
        if is_numeric_literal(text) {
            if let Ok(value) = text.parse::<f64>() {
                return Self::Number(value);
            }
        }
        if is_string_literal(text) {
            return Self::Str(text[1..text.len() - 1].to_string());
        }
        match text {
            "true" => Self::Bool(true),
            "false" => Self::Bool(false),
            "null" => Self::Null,
            "undefined" => Self::Undefined,
            _ => Self::Var(text.to_string()),
        }
    }

    /// Converts an AST literal into an operand.
    #[must_use]
    pub fn from_literal(literal: &Literal) -> Self {
        match literal {
            Literal::Number(n) => Self::Number(*n),
            Literal::Str(s) => Self::Str(s.clone()),
            Literal::Bool(b) => Self::Bool(*b),
            Literal::Null => Self::Null,
            Literal::Undefined => Self::Undefined,
        }
    }

    /// Returns the variable name if this operand is a variable reference.
    #[must_use]
    pub fn as_var(&self) -> Option<&str> {
        match self {
            Self::Var(name) => Some(name),
            _ => None,
        }
    }

    /// Returns `true` for immediate literals (everything but variables).
    #[must_use]
    pub fn is_literal(&self) -> bool {
        !matches!(self, Self::Var(_))
    }
}

impl PartialEq for Operand {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Var(a), Self::Var(b)) | (Self::Str(a), Self::Str(b)) => a == b,
            // Bit comparison keeps NaN == NaN so operands can key hash sets.
            (Self::Number(a), Self::Number(b)) => a.to_bits() == b.to_bits(),
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Null, Self::Null) | (Self::Undefined, Self::Undefined) => true,
            _ => false,
        }
    }
}

impl Eq for Operand {}

impl Hash for Operand {
    fn hash<H: Hasher>(&self, state: &mut H) {
        core::mem::discriminant(self).hash(state);
        match self {
            Self::Var(s) | Self::Str(s) => s.hash(state),
            Self::Number(n) => n.to_bits().hash(state),
            Self::Bool(b) => b.hash(state),
            Self::Null | Self::Undefined => {}
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Var(name) => f.write_str(name),
            Self::Number(n) => format_number(*n, f),
            Self::Str(s) => write!(f, "\"{s}\""),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Null => f.write_str("null"),
            Self::Undefined => f.write_str("undefined"),
        }
    }
}

/// Writes a double the way JavaScript source would spell it: integral
/// values without a fractional part, everything else in Rust's shortest
/// round-trip form.
pub(crate) fn format_number(value: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if value.is_nan() {
        f.write_str("NaN")
    } else if value.is_infinite() {
        f.write_str(if value > 0.0 { "Infinity" } else { "-Infinity" })
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        write!(f, "{}", value as i64)
    } else {
        write!(f, "{value}")
    }
}

/// Recognizes the regular language of decimal floating-point literals with
/// optional sign and exponent.
fn is_numeric_literal(text: &str) -> bool {
    let mut rest = text.as_bytes();
    if let [b'+' | b'-', tail @ ..] = rest {
        rest = tail;
    }

    let mut digits = 0;
    while let [b'0'..=b'9', tail @ ..] = rest {
        digits += 1;
        rest = tail;
    }
    if let [b'.', tail @ ..] = rest {
        rest = tail;
        while let [b'0'..=b'9', tail @ ..] = rest {
            digits += 1;
            rest = tail;
        }
    }
    if digits == 0 {
        return false;
    }

    if let [b'e' | b'E', tail @ ..] = rest {
        rest = tail;
        if let [b'+' | b'-', tail @ ..] = rest {
            rest = tail;
        }
        let mut exp_digits = 0;
        while let [b'0'..=b'9', tail @ ..] = rest {
            exp_digits += 1;
            rest = tail;
        }
        if exp_digits == 0 {
            return false;
        }
    }

    rest.is_empty()
}

/// Recognizes spellings delimited by a matching pair of ASCII quotes.
fn is_string_literal(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.len() >= 2
        && (bytes[0] == b'"' || bytes[0] == b'\'')
        && bytes[bytes.len() - 1] == bytes[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_numbers() {
        assert_eq!(Operand::parse("42"), Operand::Number(42.0));
        assert_eq!(Operand::parse("-3.5"), Operand::Number(-3.5));
        assert_eq!(Operand::parse("+0.25"), Operand::Number(0.25));
        assert_eq!(Operand::parse("1e3"), Operand::Number(1000.0));
        assert_eq!(Operand::parse("2.5E-2"), Operand::Number(0.025));
        assert_eq!(Operand::parse(".5"), Operand::Number(0.5));
    }

    #[test]
    fn test_parse_non_numbers() {
        assert_eq!(Operand::parse("x"), Operand::Var("x".to_string()));
        assert_eq!(Operand::parse("1x"), Operand::Var("1x".to_string()));
        assert_eq!(Operand::parse("e3"), Operand::Var("e3".to_string()));
        assert_eq!(Operand::parse("1e"), Operand::Var("1e".to_string()));
        assert_eq!(Operand::parse("-"), Operand::Var("-".to_string()));
        assert_eq!(Operand::parse("."), Operand::Var(".".to_string()));
    }

    #[test]
    fn test_parse_strings_and_keywords() {
        assert_eq!(Operand::parse("\"hi\""), Operand::Str("hi".to_string()));
        assert_eq!(Operand::parse("'hi'"), Operand::Str("hi".to_string()));
        assert_eq!(Operand::parse("true"), Operand::Bool(true));
        assert_eq!(Operand::parse("false"), Operand::Bool(false));
        assert_eq!(Operand::parse("null"), Operand::Null);
        assert_eq!(Operand::parse("undefined"), Operand::Undefined);
        // Versioned SSA spellings stay variables.
        assert_eq!(Operand::parse("x#3"), Operand::Var("x#3".to_string()));
    }

    #[test]
    fn test_display() {
        assert_eq!(Operand::Number(5.0).to_string(), "5");
        assert_eq!(Operand::Number(2.5).to_string(), "2.5");
        assert_eq!(Operand::Number(-0.0).to_string(), "0");
        assert_eq!(Operand::Str("s".into()).to_string(), "\"s\"");
        assert_eq!(Operand::Bool(true).to_string(), "true");
        assert_eq!(Operand::Null.to_string(), "null");
        assert_eq!(Operand::Var("a#0".into()).to_string(), "a#0");
    }

    #[test]
    fn test_eq_hash_nan() {
        use std::collections::hash_map::DefaultHasher;
        let a = Operand::Number(f64::NAN);
        let b = Operand::Number(f64::NAN);
        assert_eq!(a, b);

        let hash = |op: &Operand| {
            let mut h = DefaultHasher::new();
            op.hash(&mut h);
            h.finish()
        };
        assert_eq!(hash(&a), hash(&b));
    }

    #[test]
    fn test_roundtrip_display_parse() {
        for text in ["7", "2.5", "\"s\"", "true", "null", "undefined", "v#1"] {
            let op = Operand::parse(text);
            assert_eq!(Operand::parse(&op.to_string()), op);
        }
    }
}
