/// Errors which can be encountered while tokenizing a compilation unit.
#[derive(Clone, Debug, PartialEq)]
pub enum LexerError {
    UnexpectedCharacter(char),
    InvalidNumber(String),
    UnterminatedString,
    EmptyCharLiteral,
    NonAsciiCharLiteral(char),
}

impl std::fmt::Display for LexerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use LexerError::*;
        match self {
            UnexpectedCharacter(c) => f.write_fmt(format_args!("Unexpected character '{}'", c)),
            InvalidNumber(text) => f.write_fmt(format_args!("Invalid number {}", text)),
            UnterminatedString => f.write_str("Unterminated string literal"),
            EmptyCharLiteral => f.write_str("Empty character literal"),
            NonAsciiCharLiteral(c) => {
                f.write_fmt(format_args!("Character literal '{}' is not ASCII", c))
            }
        }
    }
}
