use log::debug;

use crate::compiler::{CompilerError, Pos};
use crate::err;

use super::error::LexerError;
use super::tokens::{Lex, Token};

pub type LexerResult = Result<Token, CompilerError<LexerError>>;

/// Converts source text into a vector of tokens.  Identifiers and keywords
/// are case insensitive and are lowercased here.  `//` starts a comment
/// which runs to the end of the line.
pub struct Lexer {
    chars: Vec<char>,
    index: usize,
    line: u32,
    col: u32,
}

impl Lexer {
    pub fn new(text: &str) -> Lexer {
        Lexer {
            chars: text.chars().collect(),
            index: 0,
            line: 1,
            col: 1,
        }
    }

    pub fn tokenize(&mut self) -> Vec<LexerResult> {
        debug!("Lexer: tokenizing {} characters", self.chars.len());
        let mut tokens = vec![];
        loop {
            self.skip_whitespace_and_comments();
            if self.eof() {
                break;
            }
            let token = self.next_token();
            let failed = token.is_err();
            tokens.push(token);
            if failed {
                // the first malformed token aborts the compilation, there
                // is no point scanning past it
                break;
            }
        }
        tokens
    }

    fn next_token(&mut self) -> LexerResult {
        let pos = self.pos();
        let c = self.chars[self.index];
        if c.is_ascii_alphabetic() || c == '_' {
            Ok(self.identifier(pos))
        } else if c.is_ascii_digit() {
            self.number(pos)
        } else if c == '\'' {
            self.quoted(pos)
        } else {
            self.operator(pos)
        }
    }

    fn identifier(&mut self, pos: Pos) -> Token {
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                word.push(c.to_ascii_lowercase());
                self.advance();
            } else {
                break;
            }
        }
        let sym = Lex::keyword(&word).unwrap_or(Lex::Identifier(word));
        Token::new(sym, pos)
    }

    fn number(&mut self, pos: Pos) -> LexerResult {
        let mut text = String::new();
        self.digits(&mut text);

        let mut is_double = false;
        // a `.` only belongs to the number when a digit follows; `1..5`
        // must stay three tokens
        if self.peek() == Some('.') && self.peek_at(1).map_or(false, |c| c.is_ascii_digit()) {
            is_double = true;
            text.push('.');
            self.advance();
            self.digits(&mut text);
        }
        if self.peek() == Some('e') || self.peek() == Some('E') {
            is_double = true;
            text.push('e');
            self.advance();
            if self.peek() == Some('+') || self.peek() == Some('-') {
                text.push(self.chars[self.index]);
                self.advance();
            }
            let mut exp = String::new();
            self.digits(&mut exp);
            if exp.is_empty() {
                return err!(pos, LexerError::InvalidNumber(text));
            }
            text.push_str(&exp);
        }

        if is_double {
            match text.parse::<f64>() {
                Ok(d) => Ok(Token::new(Lex::Double(d), pos)),
                Err(_) => err!(pos, LexerError::InvalidNumber(text)),
            }
        } else {
            match text.parse::<i64>() {
                Ok(i) => Ok(Token::new(Lex::Integer(i), pos)),
                Err(_) => err!(pos, LexerError::InvalidNumber(text)),
            }
        }
    }

    fn digits(&mut self, into: &mut String) {
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                into.push(c);
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Single quoted literal.  A doubled quote stands for a literal quote.
    /// One character makes a char token, anything longer a string token.
    fn quoted(&mut self, pos: Pos) -> LexerResult {
        self.advance();
        let mut text = String::new();
        loop {
            match self.peek() {
                None | Some('\n') => return err!(pos, LexerError::UnterminatedString),
                Some('\'') => {
                    self.advance();
                    if self.peek() == Some('\'') {
                        text.push('\'');
                        self.advance();
                    } else {
                        break;
                    }
                }
                Some(c) => {
                    text.push(c);
                    self.advance();
                }
            }
        }

        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (None, _) => err!(pos, LexerError::EmptyCharLiteral),
            (Some(c), None) => {
                if c.is_ascii() {
                    Ok(Token::new(Lex::Char(c as u8), pos))
                } else {
                    err!(pos, LexerError::NonAsciiCharLiteral(c))
                }
            }
            _ => Ok(Token::new(Lex::StringLiteral(text), pos)),
        }
    }

    fn operator(&mut self, pos: Pos) -> LexerResult {
        let c = self.chars[self.index];
        self.advance();
        let sym = match c {
            '+' => Lex::Add,
            '-' => Lex::Minus,
            '*' => Lex::Mul,
            '/' => Lex::Div,
            '=' => Lex::Eq,
            '(' => Lex::LParen,
            ')' => Lex::RParen,
            '[' => Lex::LBracket,
            ']' => Lex::RBracket,
            ',' => Lex::Comma,
            ';' => Lex::Semicolon,
            '<' => {
                if self.next_if('=') {
                    Lex::LsEq
                } else if self.next_if('>') {
                    Lex::NEq
                } else {
                    Lex::Ls
                }
            }
            '>' => {
                if self.next_if('=') {
                    Lex::GrEq
                } else {
                    Lex::Gr
                }
            }
            ':' => {
                if self.next_if('=') {
                    Lex::Assign
                } else {
                    Lex::Colon
                }
            }
            '.' => {
                if self.next_if('.') {
                    Lex::DotDot
                } else {
                    Lex::Dot
                }
            }
            _ => return err!(pos, LexerError::UnexpectedCharacter(c)),
        };
        Ok(Token::new(sym, pos))
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn pos(&self) -> Pos {
        Pos::new(self.line, self.col)
    }

    fn eof(&self) -> bool {
        self.index >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.index).copied()
    }

    fn peek_at(&self, i: usize) -> Option<char> {
        self.chars.get(self.index + i).copied()
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.index += 1;
            if c == '\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
        }
    }

    fn next_if(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.advance();
            true
        } else {
            false
        }
    }
}
