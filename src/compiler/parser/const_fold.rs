use crate::compiler::ast::{BinaryOperator, Node, Value};
use crate::compiler::lexer::tokens::{Lex, Token};
use crate::compiler::semantics::SemanticError;
use crate::compiler::types::{self, Category, Type, TypeRef};
use crate::compiler::CompilerError;
use crate::err;

/// Maps an operator token to its AST operator.
pub(super) fn binary_operator(lex: &Lex) -> BinaryOperator {
    match lex {
        Lex::Add => BinaryOperator::Add,
        Lex::Minus => BinaryOperator::Sub,
        Lex::Mul => BinaryOperator::Mul,
        Lex::Div => BinaryOperator::Div,
        Lex::IntDiv => BinaryOperator::IntDiv,
        Lex::Mod => BinaryOperator::Mod,
        Lex::Shl => BinaryOperator::Shl,
        Lex::Shr => BinaryOperator::Shr,
        Lex::And => BinaryOperator::And,
        Lex::Or => BinaryOperator::Or,
        Lex::Xor => BinaryOperator::Xor,
        Lex::Eq => BinaryOperator::Eq,
        Lex::NEq => BinaryOperator::NEq,
        Lex::Ls => BinaryOperator::Ls,
        Lex::LsEq => BinaryOperator::LsEq,
        Lex::Gr => BinaryOperator::Gr,
        Lex::GrEq => BinaryOperator::GrEq,
        lex => panic!("CRITICAL: {} is not a binary operator", lex),
    }
}

/// Determines the result type and the common operand type of a binary
/// operation, or rejects the combination.
///
/// Bitwise operators, shifts, `div` and `mod` demand Integer on both
/// sides.  `/` always works on and yields Double.  The arithmetic
/// operators widen to Double when either side is Double.  Relational
/// operators accept two numbers or two chars and always yield Integer.
pub(super) fn operation_type(
    op: BinaryOperator,
    left: &TypeRef,
    right: &TypeRef,
) -> Result<(TypeRef, TypeRef), SemanticError> {
    let lty = types::decay(left);
    let rty = types::decay(right);
    let incompatible = || SemanticError::OperandsNotCompatible {
        op: op.to_string(),
        left: lty.to_string(),
        right: rty.to_string(),
    };

    if !lty.is_scalar() || !rty.is_scalar() {
        return Err(incompatible());
    }

    if op.integer_only() {
        if *lty == Type::Integer && *rty == Type::Integer {
            return Ok((Type::integer(), Type::integer()));
        }
        return Err(incompatible());
    }

    if op == BinaryOperator::Div {
        if lty.is_numeric() && rty.is_numeric() {
            return Ok((Type::double(), Type::double()));
        }
        return Err(incompatible());
    }

    if op.is_relational() {
        if *lty == Type::Char && *rty == Type::Char {
            return Ok((Type::integer(), Type::chr()));
        }
        if lty.is_numeric() && rty.is_numeric() {
            return Ok((Type::integer(), wider(&lty, &rty)));
        }
        return Err(incompatible());
    }

    // Add, Sub, Mul
    if lty.is_numeric() && rty.is_numeric() {
        let ty = wider(&lty, &rty);
        return Ok((ty.clone(), ty));
    }
    Err(incompatible())
}

fn wider(left: &TypeRef, right: &TypeRef) -> TypeRef {
    if **left == Type::Double || **right == Type::Double {
        Type::double()
    } else {
        Type::integer()
    }
}

/// Brings `operand` to the category of `target`, folding constants in
/// place and wrapping everything else in a cast node.  Callers must have
/// checked compatibility already.
pub(super) fn coerce(operand: Node, target: &TypeRef) -> Node {
    if types::decay(&operand.ty()).category() == target.category() {
        return operand;
    }
    match &operand {
        Node::Const(token, _, Value::Integer(i)) if target.category() == Category::Double => {
            Node::Const(token.clone(), target.clone(), Value::Double(*i as f64))
        }
        Node::Const(token, _, Value::Double(d)) if target.category() == Category::Integer => {
            Node::Const(token.clone(), target.clone(), Value::Integer(*d as i64))
        }
        _ => Node::Cast(operand.token().clone(), target.clone(), Box::new(operand)),
    }
}

/// Builds the node for `left op right`.  When both operands are constants
/// the operation is evaluated here and a single constant node comes back;
/// otherwise operands are coerced to their common type and an operator
/// node is built.
pub(super) fn fold_binary(
    op_token: &Token,
    left: Node,
    right: Node,
) -> Result<Node, CompilerError<SemanticError>> {
    let op = binary_operator(&op_token.sym);
    let (result_ty, operand_ty) = match operation_type(op, &left.ty(), &right.ty()) {
        Ok(tys) => tys,
        Err(inner) => return err!(op_token.pos, inner),
    };

    if left.is_const() && right.is_const() {
        let value = eval(op_token, op, &operand_ty, left.value(), right.value())?;
        return Ok(Node::Const(op_token.clone(), result_ty, value));
    }

    let left = Box::new(coerce(left, &operand_ty));
    let right = Box::new(coerce(right, &operand_ty));
    if op.is_relational() {
        Ok(Node::LogicOp(op_token.clone(), op, result_ty, left, right))
    } else {
        Ok(Node::BinOp(op_token.clone(), op, result_ty, left, right))
    }
}

fn eval(
    op_token: &Token,
    op: BinaryOperator,
    operand_ty: &TypeRef,
    left: Option<&Value>,
    right: Option<&Value>,
) -> Result<Value, CompilerError<SemanticError>> {
    use BinaryOperator::*;
    let (left, right) = match (left, right) {
        (Some(l), Some(r)) => (l, r),
        _ => panic!("CRITICAL: folding a non-constant node"),
    };

    match operand_ty.category() {
        Category::Integer => {
            let l = int_of(left);
            let r = int_of(right);
            let value = match op {
                Add => Value::Integer(l.wrapping_add(r)),
                Sub => Value::Integer(l.wrapping_sub(r)),
                Mul => Value::Integer(l.wrapping_mul(r)),
                IntDiv | Mod if r == 0 => {
                    return err!(op_token.pos, SemanticError::DivisionByZero)
                }
                IntDiv => Value::Integer(l.wrapping_div(r)),
                Mod => Value::Integer(l.wrapping_rem(r)),
                // the emitted shl/shr work on 32-bit registers with the
                // count taken from cl, so fold in the same domain
                Shl => Value::Integer((l as i32).wrapping_shl(r as u32) as i64),
                Shr => Value::Integer(((l as u32).wrapping_shr(r as u32) as i32) as i64),
                And => Value::Integer(l & r),
                Or => Value::Integer(l | r),
                Xor => Value::Integer(l ^ r),
                Eq => bool_value(l == r),
                NEq => bool_value(l != r),
                Ls => bool_value(l < r),
                LsEq => bool_value(l <= r),
                Gr => bool_value(l > r),
                GrEq => bool_value(l >= r),
                Div => panic!("CRITICAL: / folded with integer operands"),
            };
            Ok(value)
        }
        Category::Double => {
            let l = double_of(left);
            let r = double_of(right);
            let value = match op {
                Add => Value::Double(l + r),
                Sub => Value::Double(l - r),
                Mul => Value::Double(l * r),
                Div => {
                    if r == 0.0 {
                        return err!(op_token.pos, SemanticError::DivisionByZero);
                    }
                    Value::Double(l / r)
                }
                Eq => bool_value(l == r),
                NEq => bool_value(l != r),
                Ls => bool_value(l < r),
                LsEq => bool_value(l <= r),
                Gr => bool_value(l > r),
                GrEq => bool_value(l >= r),
                _ => panic!("CRITICAL: {} folded with double operands", op),
            };
            Ok(value)
        }
        Category::Char => {
            let l = char_of(left);
            let r = char_of(right);
            let value = match op {
                Eq => bool_value(l == r),
                NEq => bool_value(l != r),
                Ls => bool_value(l < r),
                LsEq => bool_value(l <= r),
                Gr => bool_value(l > r),
                GrEq => bool_value(l >= r),
                _ => panic!("CRITICAL: {} folded with char operands", op),
            };
            Ok(value)
        }
        _ => panic!("CRITICAL: folding operands of type {}", operand_ty),
    }
}

fn bool_value(b: bool) -> Value {
    Value::Integer(if b { 1 } else { 0 })
}

fn int_of(value: &Value) -> i64 {
    match value {
        Value::Integer(i) => *i,
        value => panic!("CRITICAL: {} used as an integer constant", value),
    }
}

fn double_of(value: &Value) -> f64 {
    match value {
        Value::Double(d) => *d,
        Value::Integer(i) => *i as f64,
        value => panic!("CRITICAL: {} used as a double constant", value),
    }
}

fn char_of(value: &Value) -> u8 {
    match value {
        Value::Char(c) => *c,
        value => panic!("CRITICAL: {} used as a char constant", value),
    }
}

/// Builds the node for unary minus, folding constants.
pub(super) fn fold_minus(
    op_token: &Token,
    operand: Node,
) -> Result<Node, CompilerError<SemanticError>> {
    let ty = types::decay(&operand.ty());
    if !ty.is_numeric() {
        return err!(
            op_token.pos,
            SemanticError::IncompatibleTypes {
                expected: "integer or double".into(),
                found: ty.to_string(),
            }
        );
    }
    match operand.value() {
        Some(Value::Integer(i)) => Ok(Node::Const(
            op_token.clone(),
            ty,
            Value::Integer(i.wrapping_neg()),
        )),
        Some(Value::Double(d)) => Ok(Node::Const(op_token.clone(), ty, Value::Double(-d))),
        _ => Ok(Node::UnaryMinus(op_token.clone(), ty, Box::new(operand))),
    }
}

/// Builds the node for bitwise `not`, folding constants.
pub(super) fn fold_not(
    op_token: &Token,
    operand: Node,
) -> Result<Node, CompilerError<SemanticError>> {
    let ty = types::decay(&operand.ty());
    if *ty != Type::Integer {
        return err!(op_token.pos, SemanticError::IntegerExpected(ty.to_string()));
    }
    match operand.value() {
        Some(Value::Integer(i)) => Ok(Node::Const(op_token.clone(), ty, Value::Integer(!i))),
        _ => Ok(Node::Not(op_token.clone(), ty, Box::new(operand))),
    }
}
