//! Splits one TIC line (`<CODE> <VALUE> [<CHECKSUM>]`) into its parts.

use log::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    Valid { code: String, value: String },
    Invalid,
}

impl ParsedLine {
    /// Case-insensitive comparison of the code against `sentinel`.
    pub fn code_is(&self, sentinel: &str) -> bool {
        match self {
            ParsedLine::Valid { code, .. } => code.eq_ignore_ascii_case(sentinel),
            ParsedLine::Invalid => false,
        }
    }
}

/// Whitespace-split; first token is the code, second the value. Anything after
/// (the checksum) is ignored. Fewer than two tokens is invalid.
pub fn parse_line(line: &str) -> ParsedLine {
    let mut words = line.split_whitespace();
    match (words.next(), words.next()) {
        (Some(code), Some(value)) => {
            debug!("Parsed: {}={}", code, value);
            ParsedLine::Valid {
                code: code.to_string(),
                value: value.to_string(),
            }
        }
        _ => {
            debug!("Line '{}' is not valid", line);
            ParsedLine::Invalid
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid(code: &str, value: &str) -> ParsedLine {
        ParsedLine::Valid {
            code: code.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn splits_code_value_and_ignores_checksum() {
        assert_eq!(parse_line("ADCO 031234567890 X"), valid("ADCO", "031234567890"));
        assert_eq!(parse_line("PAPP 02000"), valid("PAPP", "02000"));
    }

    #[test]
    fn tolerates_irregular_whitespace() {
        assert_eq!(parse_line("  IINST\t005   ?  extra"), valid("IINST", "005"));
    }

    #[test]
    fn fewer_than_two_tokens_is_invalid() {
        assert_eq!(parse_line(""), ParsedLine::Invalid);
        assert_eq!(parse_line("   "), ParsedLine::Invalid);
        assert_eq!(parse_line("MOTDETAT"), ParsedLine::Invalid);
    }

    #[test]
    fn sentinel_check_ignores_case() {
        assert!(parse_line("adco 1 X").code_is("ADCO"));
        assert!(parse_line("MotDetat 000000 B").code_is("MOTDETAT"));
        assert!(!parse_line("ADCO").code_is("ADCO"));
    }
}
