mod error;
mod lexer;

pub mod tokens;

#[cfg(test)]
mod tests;

pub use error::LexerError;
pub use lexer::Lexer;
