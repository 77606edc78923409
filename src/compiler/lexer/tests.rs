use super::tokens::{Lex, Token};
use super::{Lexer, LexerError};
use crate::compiler::Pos;

fn tokenize(text: &str) -> Vec<Token> {
    Lexer::new(text)
        .tokenize()
        .into_iter()
        .collect::<Result<_, _>>()
        .unwrap()
}

fn symbols(text: &str) -> Vec<Lex> {
    tokenize(text).into_iter().map(|t| t.sym).collect()
}

fn first_error(text: &str) -> LexerError {
    Lexer::new(text)
        .tokenize()
        .into_iter()
        .find_map(|r| r.err())
        .unwrap()
        .take()
        .1
}

#[test]
fn test_integer_literal() {
    assert_eq!(symbols("42"), vec![Lex::Integer(42)]);
}

#[test]
fn test_double_literals() {
    assert_eq!(symbols("3.25"), vec![Lex::Double(3.25)]);
    assert_eq!(symbols("1e3"), vec![Lex::Double(1000.0)]);
    assert_eq!(symbols("2.5e-1"), vec![Lex::Double(0.25)]);
    assert_eq!(symbols("5E+2"), vec![Lex::Double(500.0)]);
}

#[test]
fn test_range_is_not_a_double() {
    assert_eq!(
        symbols("1..5"),
        vec![Lex::Integer(1), Lex::DotDot, Lex::Integer(5)]
    );
}

#[test]
fn test_keywords_are_case_insensitive() {
    assert_eq!(
        symbols("BEGIN Begin begin"),
        vec![Lex::Begin, Lex::Begin, Lex::Begin]
    );
    assert_eq!(symbols("DownTo"), vec![Lex::DownTo]);
}

#[test]
fn test_identifiers_are_lowercased() {
    assert_eq!(
        symbols("Counter _tmp x9"),
        vec![
            Lex::Identifier("counter".into()),
            Lex::Identifier("_tmp".into()),
            Lex::Identifier("x9".into()),
        ]
    );
}

#[test]
fn test_word_operators() {
    assert_eq!(
        symbols("a div b mod c shl d"),
        vec![
            Lex::Identifier("a".into()),
            Lex::IntDiv,
            Lex::Identifier("b".into()),
            Lex::Mod,
            Lex::Identifier("c".into()),
            Lex::Shl,
            Lex::Identifier("d".into()),
        ]
    );
}

#[test]
fn test_two_char_operators() {
    assert_eq!(
        symbols(":= <> <= >= .."),
        vec![Lex::Assign, Lex::NEq, Lex::LsEq, Lex::GrEq, Lex::DotDot]
    );
    assert_eq!(symbols(": ="), vec![Lex::Colon, Lex::Eq]);
}

#[test]
fn test_char_and_string_literals() {
    assert_eq!(symbols("'a'"), vec![Lex::Char(b'a')]);
    assert_eq!(
        symbols("'hello'"),
        vec![Lex::StringLiteral("hello".into())]
    );
    // doubled quote escapes a quote; a lone escaped quote is a char
    assert_eq!(symbols("''''"), vec![Lex::Char(b'\'')]);
    assert_eq!(
        symbols("'it''s'"),
        vec![Lex::StringLiteral("it's".into())]
    );
}

#[test]
fn test_comments_run_to_end_of_line() {
    assert_eq!(
        symbols("a // b c d\n e"),
        vec![Lex::Identifier("a".into()), Lex::Identifier("e".into())]
    );
}

#[test]
fn test_positions() {
    let tokens = tokenize("x :=\n  5;");
    assert_eq!(tokens[0].pos, Pos::new(1, 1));
    assert_eq!(tokens[1].pos, Pos::new(1, 3));
    assert_eq!(tokens[2].pos, Pos::new(2, 3));
    assert_eq!(tokens[3].pos, Pos::new(2, 4));
}

#[test]
fn test_unexpected_character() {
    assert_eq!(first_error("a # b"), LexerError::UnexpectedCharacter('#'));
}

#[test]
fn test_unterminated_string() {
    assert_eq!(first_error("'oops"), LexerError::UnterminatedString);
    assert_eq!(first_error("'oops\n'"), LexerError::UnterminatedString);
}

#[test]
fn test_empty_char_literal() {
    assert_eq!(first_error("''"), LexerError::EmptyCharLiteral);
}

#[test]
fn test_tokenizing_stops_at_first_error() {
    let results = Lexer::new("a # b").tokenize();
    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(results[1].is_err());
}
