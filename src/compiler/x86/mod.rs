pub mod assembly;
mod codegen;

#[cfg(test)]
mod tests;

pub use codegen::generate;
