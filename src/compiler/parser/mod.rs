mod const_fold;
mod error;
mod expression;
mod parser;
mod statement;
mod tokenstream;

#[cfg(test)]
mod tests;

pub use error::ParserError;
pub use parser::{parse, set_tracing};
