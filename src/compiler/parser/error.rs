use std::fmt;

use crate::compiler::lexer::tokens::Lex;
use crate::compiler::semantics::SemanticError;
use crate::compiler::CompilerError;

/// Errors the parser can produce.  Syntax problems carry the token that was
/// found (or `None` at end of input); name and type problems are wrapped
/// [`SemanticError`]s.
#[derive(Clone, Debug, PartialEq)]
pub enum ParserError {
    ExpectedButFound(Vec<Lex>, Option<Lex>),
    ExpectedIdentifier(Option<Lex>),
    ExpectedExpression(Option<Lex>),
    ExpectedStatement(Option<Lex>),
    ExpectedType(Option<Lex>),
    Semantic(SemanticError),
}

fn found(f: &mut fmt::Formatter<'_>, lex: &Option<Lex>) -> fmt::Result {
    match lex {
        Some(lex) => f.write_fmt(format_args!(", but found {}", lex)),
        None => f.write_str(", but found EOF"),
    }
}

impl fmt::Display for ParserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ParserError::*;
        match self {
            ExpectedButFound(expected, lex) => {
                if expected.is_empty() {
                    f.write_str("Expected end of program")?;
                } else {
                    let expected: Vec<String> = expected.iter().map(|e| e.to_string()).collect();
                    f.write_fmt(format_args!("Expected {}", expected.join(" or ")))?;
                }
                found(f, lex)
            }
            ExpectedIdentifier(lex) => {
                f.write_str("Expected an identifier")?;
                found(f, lex)
            }
            ExpectedExpression(lex) => {
                f.write_str("Expected an expression")?;
                found(f, lex)
            }
            ExpectedStatement(lex) => {
                f.write_str("Expected a statement")?;
                found(f, lex)
            }
            ExpectedType(lex) => {
                f.write_str("Expected a type")?;
                found(f, lex)
            }
            Semantic(err) => f.write_fmt(format_args!("{}", err)),
        }
    }
}

impl From<CompilerError<SemanticError>> for CompilerError<ParserError> {
    fn from(err: CompilerError<SemanticError>) -> Self {
        let (pos, inner) = err.take();
        CompilerError::new(pos, ParserError::Semantic(inner))
    }
}
