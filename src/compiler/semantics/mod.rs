mod error;

pub mod stack;
pub mod symbol_table;

pub use error::SemanticError;
