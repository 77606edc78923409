use std::fmt;

use super::lexer::tokens::{Lex, Token};
use super::semantics::symbol_table::SymbolTable;
use super::types::{Type, TypeRef};
use super::Pos;

/// A node in the typed abstract syntax tree.  Expressions carry the type
/// the parser resolved for them; statements report [`Type::Nil`].
///
/// The parser is the only producer of these nodes and it guarantees that
/// every tree handed to the code generator is fully typed, with explicit
/// [`Node::Cast`] nodes wherever a coercion happens.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    /// Reference to a declared variable or parameter.
    Var(Token, TypeRef),
    /// A literal or folded constant value.
    Const(Token, TypeRef, Value),
    UnaryMinus(Token, TypeRef, Box<Node>),
    Not(Token, TypeRef, Box<Node>),
    /// Arithmetic and bitwise operators.  Operands share the node's type.
    BinOp(Token, BinaryOperator, TypeRef, Box<Node>, Box<Node>),
    /// Relational operators.  The node is Integer (0 or 1) while the
    /// operands share their own common type.
    LogicOp(Token, BinaryOperator, TypeRef, Box<Node>, Box<Node>),
    /// Numeric conversion, inserted implicitly or written as `integer(x)`.
    Cast(Token, TypeRef, Box<Node>),
    /// `base[index]`; the node type is the array's element type.
    Index(Token, TypeRef, Box<Node>, Box<Node>),
    /// `base.field`; the node type is the field's type.
    FieldAccess(Token, TypeRef, Box<Node>, String),
    /// Evaluated arguments of a call, already cast to the parameter types.
    ParamList(Token, TypeRef, Vec<Node>),
    /// Call of a function or procedure; the child is always a `ParamList`.
    FunctionCall(Token, TypeRef, Box<Node>),

    Assignment(Token, Box<Node>, Box<Node>),
    If(Token, Box<Node>, Box<Node>, Option<Box<Node>>),
    While(Token, Box<Node>, Box<Node>),
    For {
        token: Token,
        counter: Token,
        from: Box<Node>,
        to: Box<Node>,
        down_to: bool,
        body: Box<Node>,
    },
    Write(Token, Vec<Node>),
    Read(Token, Vec<Node>),
    Continue(Token),
    Break(Token),
    /// Return from the current routine, after optionally assigning the
    /// given value to `result`.
    Exit(Token, Option<Box<Node>>),
    /// A `begin ... end` sequence of statements.
    Body(Token, Vec<Node>),
    /// Initializer of a typed constant: one element per array slot or
    /// record field, in declaration order.
    TypedConstant(Token, TypeRef, Vec<Node>),
}

/// A compile time constant.  `String` only ever appears as a `write`
/// argument; it has no place in the type system otherwise.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Integer(i64),
    Double(f64),
    Char(u8),
    String(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => f.write_fmt(format_args!("{}", i)),
            Value::Double(d) => f.write_fmt(format_args!("{}", d)),
            Value::Char(c) => f.write_fmt(format_args!("'{}'", *c as char)),
            Value::String(s) => f.write_fmt(format_args!("'{}'", s)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    IntDiv,
    Mod,
    Shl,
    Shr,
    And,
    Or,
    Xor,
    Eq,
    NEq,
    Ls,
    LsEq,
    Gr,
    GrEq,
}

impl BinaryOperator {
    pub fn is_relational(self) -> bool {
        use BinaryOperator::*;
        matches!(self, Eq | NEq | Ls | LsEq | Gr | GrEq)
    }

    /// Operators which only accept Integer operands.
    pub fn integer_only(self) -> bool {
        use BinaryOperator::*;
        matches!(self, IntDiv | Mod | Shl | Shr | And | Or | Xor)
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use BinaryOperator::*;
        let text = match self {
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            IntDiv => "div",
            Mod => "mod",
            Shl => "shl",
            Shr => "shr",
            And => "and",
            Or => "or",
            Xor => "xor",
            Eq => "=",
            NEq => "<>",
            Ls => "<",
            LsEq => "<=",
            Gr => ">",
            GrEq => ">=",
        };
        f.write_str(text)
    }
}

impl Node {
    /// The type this node evaluates to.  Statements have no value and
    /// report Nil.
    pub fn ty(&self) -> TypeRef {
        use Node::*;
        match self {
            Var(_, ty)
            | Const(_, ty, _)
            | UnaryMinus(_, ty, _)
            | Not(_, ty, _)
            | BinOp(_, _, ty, _, _)
            | LogicOp(_, _, ty, _, _)
            | Cast(_, ty, _)
            | Index(_, ty, _, _)
            | FieldAccess(_, ty, _, _)
            | ParamList(_, ty, _)
            | FunctionCall(_, ty, _)
            | TypedConstant(_, ty, _) => ty.clone(),
            _ => Type::nil(),
        }
    }

    pub fn token(&self) -> &Token {
        use Node::*;
        match self {
            Var(token, ..)
            | Const(token, ..)
            | UnaryMinus(token, ..)
            | Not(token, ..)
            | BinOp(token, ..)
            | LogicOp(token, ..)
            | Cast(token, ..)
            | Index(token, ..)
            | FieldAccess(token, ..)
            | ParamList(token, ..)
            | FunctionCall(token, ..)
            | Assignment(token, ..)
            | If(token, ..)
            | While(token, ..)
            | For { token, .. }
            | Write(token, ..)
            | Read(token, ..)
            | Continue(token)
            | Break(token)
            | Exit(token, ..)
            | Body(token, ..)
            | TypedConstant(token, ..) => token,
        }
    }

    pub fn pos(&self) -> Pos {
        self.token().pos
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Node::Const(_, _, v) => Some(v),
            _ => None,
        }
    }

    pub fn is_const(&self) -> bool {
        matches!(self, Node::Const(..))
    }

    /// The integer behind a folded constant, if this is one.
    pub fn int_value(&self) -> Option<i64> {
        match self {
            Node::Const(_, _, Value::Integer(i)) => Some(*i),
            _ => None,
        }
    }

    /// The declared name behind a `Var` node.
    pub fn var_name(&self) -> Option<&str> {
        match self {
            Node::Var(token, _) => match &token.sym {
                Lex::Identifier(name) => Some(name),
                _ => None,
            },
            _ => None,
        }
    }

    fn label(&self) -> String {
        use Node::*;
        match self {
            Var(token, ty) => match &token.sym {
                Lex::Identifier(name) => format!("var {}: {}", name, ty),
                sym => format!("var {}: {}", sym, ty),
            },
            Const(_, ty, value) => format!("const {}: {}", value, ty),
            UnaryMinus(_, ty, _) => format!("neg: {}", ty),
            Not(_, ty, _) => format!("not: {}", ty),
            BinOp(_, op, ty, _, _) => format!("{}: {}", op, ty),
            LogicOp(_, op, ty, _, _) => format!("{}: {}", op, ty),
            Cast(_, ty, _) => format!("cast: {}", ty),
            Index(_, ty, _, _) => format!("index: {}", ty),
            FieldAccess(_, ty, _, field) => format!(".{}: {}", field, ty),
            ParamList(..) => "params".into(),
            FunctionCall(token, ty, _) => match &token.sym {
                Lex::Identifier(name) => format!("call {}: {}", name, ty),
                sym => format!("call {}: {}", sym, ty),
            },
            Assignment(..) => ":=".into(),
            If(..) => "if".into(),
            While(..) => "while".into(),
            For { down_to, .. } => {
                if *down_to {
                    "for downto".into()
                } else {
                    "for to".into()
                }
            }
            Write(..) => "write".into(),
            Read(..) => "read".into(),
            Continue(_) => "continue".into(),
            Break(_) => "break".into(),
            Exit(..) => "exit".into(),
            Body(..) => "body".into(),
            TypedConstant(_, ty, _) => format!("typed const: {}", ty),
        }
    }

    fn children(&self) -> Vec<&Node> {
        use Node::*;
        match self {
            Var(..) | Const(..) | Continue(_) | Break(_) => vec![],
            UnaryMinus(_, _, operand) | Not(_, _, operand) | Cast(_, _, operand) => {
                vec![operand]
            }
            BinOp(_, _, _, l, r) | LogicOp(_, _, _, l, r) | Index(_, _, l, r) => vec![l, r],
            FieldAccess(_, _, base, _) => vec![base],
            ParamList(_, _, items) | Write(_, items) | Read(_, items) | Body(_, items)
            | TypedConstant(_, _, items) => items.iter().collect(),
            FunctionCall(_, _, params) => vec![params],
            Assignment(_, target, value) => vec![target, value],
            If(_, cond, then, None) => vec![cond, then],
            If(_, cond, then, Some(els)) => vec![cond, then, els],
            While(_, cond, body) => vec![cond, body],
            For { from, to, body, .. } => vec![from, to, body],
            Exit(_, None) => vec![],
            Exit(_, Some(value)) => vec![value],
        }
    }

    fn write_tree(&self, f: &mut fmt::Formatter<'_>, prefix: &str) -> fmt::Result {
        let children = self.children();
        let count = children.len();
        for (i, child) in children.into_iter().enumerate() {
            let last = i + 1 == count;
            let glyph = if last { "└── " } else { "├── " };
            f.write_fmt(format_args!("{}{}{}\n", prefix, glyph, child.label()))?;
            let extended = format!("{}{}", prefix, if last { "    " } else { "│   " });
            child.write_tree(f, &extended)?;
        }
        Ok(())
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("{}\n", self.label()))?;
        self.write_tree(f, "")
    }
}

/// The result of a successful parse: the program's top level scope (with
/// every routine symbol and its body) and the main statement body.
#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    pub scope: SymbolTable,
    pub body: Node,
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("{}", self.scope))?;
        f.write_fmt(format_args!("{}", self.body))
    }
}
