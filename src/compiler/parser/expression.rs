use std::sync::atomic::Ordering;

use stdext::function_name;

use crate::compiler::ast::{Node, Value};
use crate::compiler::lexer::tokens::{Lex, Token};
use crate::compiler::semantics::SemanticError;
use crate::compiler::types::{self, Category, Type, TypeRef};
use crate::compiler::CompilerError;
use crate::{err, trace};

use super::const_fold;
use super::error::ParserError;
use super::parser::{Parser, ParserResult, ENABLE_TRACING, TRACE_END, TRACE_START};

impl<'a> Parser<'a> {
    /// Like [`expression`](Self::expression) but an absent expression is
    /// an error.
    pub(super) fn expression_required(&mut self) -> Result<Node, CompilerError<ParserError>> {
        match self.expression()? {
            Some(node) => Ok(node),
            None => {
                let (pos, found) = self.stream.found();
                err!(pos, ParserError::ExpectedExpression(found))
            }
        }
    }

    pub(super) fn expression(&mut self) -> ParserResult<Node> {
        trace!(self.stream);
        let relational = vec![Lex::Eq, Lex::NEq, Lex::Gr, Lex::GrEq, Lex::Ls, Lex::LsEq];
        self.binary_op(relational, Self::additive)
    }

    fn additive(&mut self) -> ParserResult<Node> {
        trace!(self.stream);
        let ops = vec![Lex::Add, Lex::Minus, Lex::Or, Lex::Xor];
        self.binary_op(ops, Self::multiplicative)
    }

    fn multiplicative(&mut self) -> ParserResult<Node> {
        trace!(self.stream);
        let ops = vec![
            Lex::Mul,
            Lex::Div,
            Lex::IntDiv,
            Lex::Mod,
            Lex::And,
            Lex::Shl,
            Lex::Shr,
        ];
        self.binary_op(ops, Self::unary)
    }

    /// One left associative precedence level: `next (op next)*`, with
    /// every step type checked and folded as it is built.
    fn binary_op(
        &mut self,
        ops: Vec<Lex>,
        next: fn(&mut Self) -> ParserResult<Node>,
    ) -> ParserResult<Node> {
        let mut left = match next(self)? {
            Some(node) => node,
            None => return Ok(None),
        };
        while let Some(op) = self.stream.next_if_one_of(ops.clone()) {
            let right = match next(self)? {
                Some(node) => node,
                None => {
                    let (pos, found) = self.stream.found();
                    return err!(pos, ParserError::ExpectedExpression(found));
                }
            };
            left = const_fold::fold_binary(&op, left, right)?;
        }
        Ok(Some(left))
    }

    fn unary(&mut self) -> ParserResult<Node> {
        trace!(self.stream);
        if let Some(op) = self.stream.next_if(&Lex::Minus) {
            let operand = self.unary_required()?;
            return Ok(Some(const_fold::fold_minus(&op, operand)?));
        }
        if let Some(op) = self.stream.next_if(&Lex::Not) {
            let operand = self.unary_required()?;
            return Ok(Some(const_fold::fold_not(&op, operand)?));
        }
        self.primary()
    }

    fn unary_required(&mut self) -> Result<Node, CompilerError<ParserError>> {
        match self.unary()? {
            Some(node) => Ok(node),
            None => {
                let (pos, found) = self.stream.found();
                err!(pos, ParserError::ExpectedExpression(found))
            }
        }
    }

    fn primary(&mut self) -> ParserResult<Node> {
        trace!(self.stream);
        if self.stream.next_if(&Lex::LParen).is_some() {
            let expr = self.expression_required()?;
            self.stream.next_must_be(&Lex::RParen)?;
            return Ok(Some(expr));
        }

        let token = match self.stream.peek() {
            Some(token) => token.clone(),
            None => return Ok(None),
        };
        match &token.sym {
            Lex::Integer(i) => {
                self.stream.next();
                let value = Value::Integer(*i);
                Ok(Some(Node::Const(token.clone(), Type::integer(), value)))
            }
            Lex::Double(d) => {
                self.stream.next();
                let value = Value::Double(*d);
                Ok(Some(Node::Const(token.clone(), Type::double(), value)))
            }
            Lex::Char(c) => {
                self.stream.next();
                let value = Value::Char(*c);
                Ok(Some(Node::Const(token.clone(), Type::chr(), value)))
            }
            // string literals only exist as write arguments, they have no
            // place in the type system
            Lex::StringLiteral(s) => {
                self.stream.next();
                let value = Value::String(s.clone());
                Ok(Some(Node::Const(token.clone(), Type::nil(), value)))
            }
            Lex::Identifier(_) => {
                self.stream.next();
                Ok(Some(self.identifier_expr(token)?))
            }
            _ => Ok(None),
        }
    }

    /// An identifier in expression position: a cast when it names a type,
    /// the inlined value when it names a scalar constant, a call when it
    /// names a routine, and a designator otherwise.
    fn identifier_expr(&mut self, token: Token) -> Result<Node, CompilerError<ParserError>> {
        let name = match &token.sym {
            Lex::Identifier(name) => name.clone(),
            sym => panic!("CRITICAL: {} is not an identifier", sym),
        };
        let sym = match self.scopes.lookup(&name) {
            Some(sym) => sym.clone(),
            None => return err!(token.pos, ParserError::Semantic(SemanticError::Undeclared(name))),
        };

        if sym.is_type {
            return self.cast_expr(token, sym.ty);
        }
        if let Some(value @ Node::Const(..)) = &sym.value {
            return Ok(value.clone());
        }
        if sym.ty.category() == Category::Function {
            return self.call(token, &sym.ty);
        }
        self.postfix(Node::Var(token, sym.ty))
    }

    /// `typename(expr)`.  Conversions are only defined between scalar
    /// types, and fold when the operand is a constant.
    fn cast_expr(&mut self, token: Token, ty: TypeRef) -> Result<Node, CompilerError<ParserError>> {
        trace!(self.stream);
        self.stream.next_must_be(&Lex::LParen)?;
        let expr = self.expression_required()?;
        self.stream.next_must_be(&Lex::RParen)?;

        let source = types::decay(&expr.ty());
        if !ty.is_scalar() || !source.is_scalar() {
            return err!(
                token.pos,
                ParserError::Semantic(SemanticError::IncompatibleTypes {
                    expected: ty.to_string(),
                    found: expr.ty().to_string(),
                })
            );
        }

        let value = match (expr.value(), ty.category()) {
            (Some(Value::Integer(i)), Category::Integer) => Some(Value::Integer(*i)),
            (Some(Value::Integer(i)), Category::Double) => Some(Value::Double(*i as f64)),
            (Some(Value::Integer(i)), Category::Char) => Some(Value::Char(*i as u8)),
            (Some(Value::Double(d)), Category::Integer) => Some(Value::Integer(*d as i64)),
            (Some(Value::Double(d)), Category::Double) => Some(Value::Double(*d)),
            (Some(Value::Double(d)), Category::Char) => Some(Value::Char(*d as u8)),
            (Some(Value::Char(c)), Category::Integer) => Some(Value::Integer(*c as i64)),
            (Some(Value::Char(c)), Category::Double) => Some(Value::Double(*c as f64)),
            (Some(Value::Char(c)), Category::Char) => Some(Value::Char(*c)),
            _ => None,
        };
        match value {
            Some(value) => Ok(Node::Const(token, ty, value)),
            None => Ok(Node::Cast(token, ty, Box::new(expr))),
        }
    }

    /// Indexing and field selection suffixes on a designator.
    pub(super) fn postfix(&mut self, mut node: Node) -> Result<Node, CompilerError<ParserError>> {
        loop {
            if let Some(token) = self.stream.next_if(&Lex::LBracket) {
                let element = match node.ty().as_ref() {
                    Type::Array(a) => a.element.clone(),
                    ty => {
                        return err!(
                            token.pos,
                            ParserError::Semantic(SemanticError::NotAnArray(ty.to_string()))
                        )
                    }
                };
                let index = self.integer_expr()?;
                self.stream.next_must_be(&Lex::RBracket)?;
                node = Node::Index(token, element, Box::new(node), Box::new(index));
            } else if let Some(token) = self.stream.next_if(&Lex::Dot) {
                let (fname, fpos) = self.expect_identifier()?;
                let field_ty = match node.ty().as_ref() {
                    Type::Record(r) => match r.fields.get(&fname) {
                        Some(field) => field.ty.clone(),
                        None => {
                            return err!(
                                fpos,
                                ParserError::Semantic(SemanticError::NoSuchField(fname))
                            )
                        }
                    },
                    ty => {
                        return err!(
                            token.pos,
                            ParserError::Semantic(SemanticError::NotARecord(ty.to_string()))
                        )
                    }
                };
                node = Node::FieldAccess(token, field_ty, Box::new(node), fname);
            } else {
                return Ok(node);
            }
        }
    }

    /// A routine call.  Arguments are matched against the parameter list:
    /// value parameters take any assignable expression (widening in both
    /// directions), address parameters demand a designator of the exact
    /// type.
    pub(super) fn call(
        &mut self,
        token: Token,
        fty: &TypeRef,
    ) -> Result<Node, CompilerError<ParserError>> {
        trace!(self.stream);
        let func = match fty.as_ref() {
            Type::Function(func) => func,
            ty => panic!("CRITICAL: calling a value of type {}", ty),
        };

        let mut args = vec![];
        if self.stream.next_if(&Lex::LParen).is_some() {
            if !self.stream.test_if(&Lex::RParen) {
                loop {
                    args.push(self.expression_required()?);
                    if self.stream.next_if(&Lex::Comma).is_none() {
                        break;
                    }
                }
            }
            self.stream.next_must_be(&Lex::RParen)?;
        }

        if args.len() != func.params.size() {
            return err!(
                token.pos,
                ParserError::Semantic(SemanticError::ArgumentCount {
                    expected: func.params.size(),
                    found: args.len(),
                })
            );
        }

        let mut checked = vec![];
        for (i, (param, arg)) in func.params.table().iter().zip(args).enumerate() {
            if param.by_ref {
                if !matches!(arg, Node::Var(..) | Node::Index(..) | Node::FieldAccess(..)) {
                    return err!(
                        arg.pos(),
                        ParserError::Semantic(SemanticError::NotAVariable(format!(
                            "argument {}",
                            i + 1
                        )))
                    );
                }
                if !param.is_const {
                    if let Some(name) = self.root_const(&arg) {
                        return err!(
                            arg.pos(),
                            ParserError::Semantic(SemanticError::AssignToConstant(name))
                        );
                    }
                }
                // an address is passed, so the types must match without
                // any conversion
                if types::assignable(&param.ty, &arg.ty(), false) != Some(false) {
                    return err!(
                        arg.pos(),
                        ParserError::Semantic(SemanticError::IncompatibleTypes {
                            expected: param.ty.to_string(),
                            found: arg.ty().to_string(),
                        })
                    );
                }
                checked.push(arg);
            } else {
                match types::assignable(&param.ty, &arg.ty(), true) {
                    Some(_) => checked.push(const_fold::coerce(arg, &param.ty)),
                    None => {
                        return err!(
                            arg.pos(),
                            ParserError::Semantic(SemanticError::IncompatibleTypes {
                                expected: param.ty.to_string(),
                                found: arg.ty().to_string(),
                            })
                        )
                    }
                }
            }
        }

        let params = Node::ParamList(token.clone(), Type::nil(), checked);
        Ok(Node::FunctionCall(token, func.ret.clone(), Box::new(params)))
    }

    /// The name of the constant at the root of a designator, if there is
    /// one.
    fn root_const(&self, node: &Node) -> Option<String> {
        match node {
            Node::Var(token, _) => match &token.sym {
                Lex::Identifier(name) => self
                    .scopes
                    .lookup(name)
                    .filter(|sym| sym.is_const)
                    .map(|_| name.clone()),
                _ => None,
            },
            Node::Index(_, _, base, _) | Node::FieldAccess(_, _, base, _) => self.root_const(base),
            _ => None,
        }
    }
}
