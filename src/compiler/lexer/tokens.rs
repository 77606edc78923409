use crate::compiler::Pos;

/// All tokens the lexer can produce.  Identifiers and keywords are case
/// insensitive; the lexer lowercases them before building the token, so the
/// rest of the compiler only ever sees lowercase names.
#[derive(Clone, Debug, PartialEq)]
pub enum Lex {
    Integer(i64),
    Double(f64),
    Char(u8),
    StringLiteral(String),
    Identifier(String),

    Mul,
    Div,
    IntDiv,
    Mod,
    Add,
    Minus,
    Shl,
    Shr,
    And,
    Or,
    Xor,
    Not,
    Eq,
    NEq,
    Ls,
    LsEq,
    Gr,
    GrEq,
    Assign,

    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Colon,
    Semicolon,
    Dot,
    DotDot,

    Program,
    Const,
    Type,
    Var,
    Function,
    Procedure,
    Begin,
    End,
    If,
    Then,
    Else,
    While,
    Do,
    For,
    To,
    DownTo,
    Of,
    Array,
    Record,
    Write,
    Read,
    Exit,
    Continue,
    Break,
}

impl Lex {
    /// Maps a lowercased word to its keyword token.  Word operators (`div`,
    /// `mod`, `and`, ...) live in the same table because the lexer cannot
    /// tell them apart from keywords.
    pub fn keyword(word: &str) -> Option<Lex> {
        let lex = match word {
            "div" => Lex::IntDiv,
            "mod" => Lex::Mod,
            "shl" => Lex::Shl,
            "shr" => Lex::Shr,
            "and" => Lex::And,
            "or" => Lex::Or,
            "xor" => Lex::Xor,
            "not" => Lex::Not,
            "program" => Lex::Program,
            "const" => Lex::Const,
            "type" => Lex::Type,
            "var" => Lex::Var,
            "function" => Lex::Function,
            "procedure" => Lex::Procedure,
            "begin" => Lex::Begin,
            "end" => Lex::End,
            "if" => Lex::If,
            "then" => Lex::Then,
            "else" => Lex::Else,
            "while" => Lex::While,
            "do" => Lex::Do,
            "for" => Lex::For,
            "to" => Lex::To,
            "downto" => Lex::DownTo,
            "of" => Lex::Of,
            "array" => Lex::Array,
            "record" => Lex::Record,
            "write" => Lex::Write,
            "read" => Lex::Read,
            "exit" => Lex::Exit,
            "continue" => Lex::Continue,
            "break" => Lex::Break,
            _ => return None,
        };
        Some(lex)
    }
}

impl std::fmt::Display for Lex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use Lex::*;
        match self {
            Integer(i) => f.write_fmt(format_args!("integer literal {}", i)),
            Double(d) => f.write_fmt(format_args!("double literal {}", d)),
            Char(c) => f.write_fmt(format_args!("char literal '{}'", *c as char)),
            StringLiteral(s) => f.write_fmt(format_args!("string literal '{}'", s)),
            Identifier(id) => f.write_fmt(format_args!("identifier {}", id)),
            Mul => f.write_str("*"),
            Div => f.write_str("/"),
            IntDiv => f.write_str("div"),
            Mod => f.write_str("mod"),
            Add => f.write_str("+"),
            Minus => f.write_str("-"),
            Shl => f.write_str("shl"),
            Shr => f.write_str("shr"),
            And => f.write_str("and"),
            Or => f.write_str("or"),
            Xor => f.write_str("xor"),
            Not => f.write_str("not"),
            Eq => f.write_str("="),
            NEq => f.write_str("<>"),
            Ls => f.write_str("<"),
            LsEq => f.write_str("<="),
            Gr => f.write_str(">"),
            GrEq => f.write_str(">="),
            Assign => f.write_str(":="),
            LParen => f.write_str("("),
            RParen => f.write_str(")"),
            LBracket => f.write_str("["),
            RBracket => f.write_str("]"),
            Comma => f.write_str(","),
            Colon => f.write_str(":"),
            Semicolon => f.write_str(";"),
            Dot => f.write_str("."),
            DotDot => f.write_str(".."),
            Program => f.write_str("program"),
            Const => f.write_str("const"),
            Type => f.write_str("type"),
            Var => f.write_str("var"),
            Function => f.write_str("function"),
            Procedure => f.write_str("procedure"),
            Begin => f.write_str("begin"),
            End => f.write_str("end"),
            If => f.write_str("if"),
            Then => f.write_str("then"),
            Else => f.write_str("else"),
            While => f.write_str("while"),
            Do => f.write_str("do"),
            For => f.write_str("for"),
            To => f.write_str("to"),
            DownTo => f.write_str("downto"),
            Of => f.write_str("of"),
            Array => f.write_str("array"),
            Record => f.write_str("record"),
            Write => f.write_str("write"),
            Read => f.write_str("read"),
            Exit => f.write_str("exit"),
            Continue => f.write_str("continue"),
            Break => f.write_str("break"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    /// The value of the token
    pub sym: Lex,

    pub pos: Pos,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{}: {}", self.pos, self.sym))
    }
}

impl Token {
    pub fn new(sym: Lex, pos: Pos) -> Token {
        Token { sym, pos }
    }

    /// True when this token is the same kind as `a`, ignoring any payload
    /// (an integer literal matches any integer literal, and so on).
    pub fn token_eq(&self, a: &Lex) -> bool {
        std::mem::discriminant(&self.sym) == std::mem::discriminant(a)
    }
}
