/**
 * The compiler converts Pascal style source code into x86 assembly in a
 * single pass: the lexer turns the source text into a token vector, the
 * parser runs a recursive descent over those tokens and builds a typed
 * AST while it checks declarations, scopes, and type compatibility, and
 * the code generator walks the finished AST and emits NASM text through
 * an instruction buffer.
 *
 * The parser is the only stage which can reject user input: it folds
 * constant expressions as it goes (array bounds and `const` values must
 * be known before sizes and stack offsets can be computed) and inserts
 * implicit cast nodes wherever the type rules require a coercion.  Once
 * a `Program` has been produced, the input is considered correct and
 * compilable, and any fault discovered during code generation can only
 * come from a bug in the compiler itself.  Errors in that stage are
 * therefore treated as critical and unrecoverable: the policy is to
 * panic immediately at the point the inconsistency is discovered.
 */
mod error;

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod semantics;
pub mod types;
pub mod x86;

pub use error::CompilerError;

use lexer::tokens::Token;
use lexer::Lexer;

/// Line and column of a character within the source text, 1 based.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pos {
    pub line: u32,
    pub col: u32,
}

impl Pos {
    pub fn new(line: u32, col: u32) -> Pos {
        Pos { line, col }
    }
}

impl std::fmt::Display for Pos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{}:{}", self.line, self.col))
    }
}

/// Runs every stage over the given source text and returns the generated
/// assembly listing, or the first error formatted for the console.
pub fn compile(text: &str) -> Result<String, String> {
    let tokens: Vec<Token> = Lexer::new(text)
        .tokenize()
        .into_iter()
        .collect::<Result<_, _>>()
        .map_err(|e| format!("{}", e))?;

    let program = parser::parse(&tokens).map_err(|e| format!("{}", e))?;

    let code = x86::generate(&program);
    let mut out = Vec::new();
    x86::assembly::print(&code, &mut out).map_err(|e| e.to_string())?;
    String::from_utf8(out).map_err(|e| e.to_string())
}
