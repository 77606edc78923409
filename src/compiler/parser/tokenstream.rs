use crate::compiler::lexer::tokens::{Lex, Token};
use crate::compiler::{CompilerError, Pos};
use crate::err;

use super::error::ParserError;

/// A cursor over the token vector with the small set of conditional
/// consumption operations the recursive descent functions are written in
/// terms of.  Matching compares token kinds, not payloads.
pub struct TokenStream<'a> {
    tokens: &'a [Token],
    index: usize,
    /// Position reported when the stream runs out.
    end: Pos,
}

impl<'a> TokenStream<'a> {
    pub fn new(tokens: &'a [Token]) -> TokenStream<'a> {
        let end = tokens.last().map(|t| t.pos).unwrap_or_else(|| Pos::new(1, 1));
        TokenStream {
            tokens,
            index: 0,
            end,
        }
    }

    pub fn next(&mut self) -> Option<Token> {
        if self.index < self.tokens.len() {
            self.index += 1;
            Some(self.tokens[self.index - 1].clone())
        } else {
            None
        }
    }

    /// Consumes and returns the current token if it matches `test`.
    pub fn next_if(&mut self, test: &Lex) -> Option<Token> {
        if self.test_if(test) {
            self.next()
        } else {
            None
        }
    }

    /// Consumes the current token if it is an identifier and returns its
    /// name and position.
    pub fn next_if_id(&mut self) -> Option<(String, Pos)> {
        match self.next_if(&Lex::Identifier(String::new())) {
            Some(Token {
                sym: Lex::Identifier(id),
                pos,
            }) => Some((id, pos)),
            _ => None,
        }
    }

    /// Consumes the current token if it matches, or fails with an
    /// `ExpectedButFound` at the current position.
    pub fn next_must_be(&mut self, test: &Lex) -> Result<Token, CompilerError<ParserError>> {
        match self.next_if(test) {
            Some(token) => Ok(token),
            None => {
                let (pos, found) = self.found();
                err!(pos, ParserError::ExpectedButFound(vec![test.clone()], found))
            }
        }
    }

    pub fn next_if_one_of(&mut self, set: Vec<Lex>) -> Option<Token> {
        if self.test_if_one_of(set) {
            self.next()
        } else {
            None
        }
    }

    pub fn peek(&self) -> Option<&Token> {
        self.peek_at(0)
    }

    pub fn peek_at(&self, i: usize) -> Option<&Token> {
        self.tokens.get(self.index + i)
    }

    pub fn test_if(&self, test: &Lex) -> bool {
        match self.peek() {
            Some(token) => token.token_eq(test),
            None => false,
        }
    }

    pub fn test_if_one_of(&self, set: Vec<Lex>) -> bool {
        match self.peek() {
            Some(token) => set.iter().any(|lex| token.token_eq(lex)),
            None => false,
        }
    }

    /// Position and symbol of the current token, for error reporting.
    /// Reports the last token's position once the stream is exhausted.
    pub fn found(&self) -> (Pos, Option<Lex>) {
        match self.peek() {
            Some(token) => (token.pos, Some(token.sym.clone())),
            None => (self.end, None),
        }
    }
}

#[cfg(test)]
mod test_tokenstream {
    use super::*;
    use crate::compiler::lexer::Lexer;

    fn tokens(text: &str) -> Vec<Token> {
        Lexer::new(text)
            .tokenize()
            .into_iter()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn test_peek_does_not_advance() {
        let tokens = tokens("(2 + 4) * 3");
        let mut stream = TokenStream::new(&tokens);
        assert_eq!(stream.peek().unwrap().sym, Lex::LParen);
        assert_eq!(stream.peek().unwrap().sym, Lex::LParen);
        assert_eq!(stream.peek_at(1).unwrap().sym, Lex::Integer(2));
        assert_eq!(stream.next().unwrap().sym, Lex::LParen);
        assert_eq!(stream.peek().unwrap().sym, Lex::Integer(2));
    }

    #[test]
    fn test_next_if_matches_on_kind() {
        let tokens = tokens("(2 + 4) * 3");
        let mut stream = TokenStream::new(&tokens);
        stream.next();
        // any integer literal matches, the payload is ignored
        let token = stream.next_if(&Lex::Integer(0)).unwrap();
        assert_eq!(token.sym, Lex::Integer(2));
        assert_eq!(token.pos, Pos::new(1, 2));
        assert!(stream.next_if(&Lex::Mul).is_none());
        assert_eq!(stream.peek().unwrap().sym, Lex::Add);
    }

    #[test]
    fn test_next_must_be() {
        let tokens = tokens("(2 + 4) * 3");
        let mut stream = TokenStream::new(&tokens);
        assert!(stream.next_must_be(&Lex::LParen).is_ok());
        let err = stream.next_must_be(&Lex::Add).unwrap_err();
        assert_eq!(err.pos(), Pos::new(1, 2));
        assert_eq!(
            *err.inner_ref(),
            ParserError::ExpectedButFound(vec![Lex::Add], Some(Lex::Integer(2)))
        );
    }

    #[test]
    fn test_next_if_id() {
        let tokens = tokens("x := 1");
        let mut stream = TokenStream::new(&tokens);
        let (id, pos) = stream.next_if_id().unwrap();
        assert_eq!(id, "x");
        assert_eq!(pos, Pos::new(1, 1));
        assert!(stream.next_if_id().is_none());
    }

    #[test]
    fn test_next_if_one_of() {
        let tokens = tokens("(2 + 4) * 3");
        let mut stream = TokenStream::new(&tokens);
        stream.next();
        stream.next();
        let ops = vec![Lex::Add, Lex::Minus];
        let token = stream.next_if_one_of(ops.clone()).unwrap();
        assert_eq!(token.sym, Lex::Add);
        assert!(stream.next_if_one_of(ops).is_none());
    }

    #[test]
    fn test_found_at_eof() {
        let tokens = tokens("3");
        let mut stream = TokenStream::new(&tokens);
        stream.next();
        assert_eq!(stream.found(), (Pos::new(1, 1), None));
        assert!(stream.next().is_none());
    }
}
