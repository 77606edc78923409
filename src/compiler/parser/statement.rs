use std::sync::atomic::Ordering;

use stdext::function_name;

use crate::compiler::ast::{Node, Value};
use crate::compiler::lexer::tokens::{Lex, Token};
use crate::compiler::semantics::SemanticError;
use crate::compiler::types::{self, Category};
use crate::compiler::CompilerError;
use crate::{err, trace};

use super::const_fold;
use super::error::ParserError;
use super::parser::{Parser, ENABLE_TRACING, TRACE_END, TRACE_START};

impl<'a> Parser<'a> {
    /// `begin ... end` with semicolon separated statements.  A trailing
    /// semicolon before `end` is tolerated.
    pub(super) fn compound_statement(&mut self) -> Result<Node, CompilerError<ParserError>> {
        trace!(self.stream);
        let begin = self.stream.next_must_be(&Lex::Begin)?;
        let mut stmts = vec![];
        if !self.stream.test_if(&Lex::End) {
            loop {
                stmts.push(self.statement()?);
                if self.stream.next_if(&Lex::Semicolon).is_none() {
                    break;
                }
                if self.stream.test_if(&Lex::End) {
                    break;
                }
            }
        }
        self.stream.next_must_be(&Lex::End)?;
        Ok(Node::Body(begin, stmts))
    }

    fn statement(&mut self) -> Result<Node, CompilerError<ParserError>> {
        trace!(self.stream);
        if self.stream.test_if(&Lex::Begin) {
            return self.compound_statement();
        }
        if let Some(token) = self.stream.next_if(&Lex::If) {
            return self.if_statement(token);
        }
        if let Some(token) = self.stream.next_if(&Lex::While) {
            return self.while_statement(token);
        }
        if let Some(token) = self.stream.next_if(&Lex::For) {
            return self.for_statement(token);
        }
        if let Some(token) = self.stream.next_if(&Lex::Write) {
            return self.write_statement(token);
        }
        if let Some(token) = self.stream.next_if(&Lex::Read) {
            return self.read_statement(token);
        }
        if let Some(token) = self.stream.next_if(&Lex::Exit) {
            return self.exit_statement(token);
        }
        if let Some(token) = self.stream.next_if(&Lex::Continue) {
            if self.loop_depth == 0 {
                return err!(
                    token.pos,
                    ParserError::Semantic(SemanticError::ContinueOutsideLoop)
                );
            }
            return Ok(Node::Continue(token));
        }
        if let Some(token) = self.stream.next_if(&Lex::Break) {
            if self.loop_depth == 0 {
                return err!(
                    token.pos,
                    ParserError::Semantic(SemanticError::BreakOutsideLoop)
                );
            }
            return Ok(Node::Break(token));
        }
        if self.stream.test_if(&Lex::Identifier(String::new())) {
            return self.assignment_or_call();
        }
        let (pos, found) = self.stream.found();
        err!(pos, ParserError::ExpectedStatement(found))
    }

    fn if_statement(&mut self, token: Token) -> Result<Node, CompilerError<ParserError>> {
        trace!(self.stream);
        let cond = self.integer_expr()?;
        self.stream.next_must_be(&Lex::Then)?;
        let then = self.statement()?;
        let els = if self.stream.next_if(&Lex::Else).is_some() {
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Ok(Node::If(token, Box::new(cond), Box::new(then), els))
    }

    fn while_statement(&mut self, token: Token) -> Result<Node, CompilerError<ParserError>> {
        trace!(self.stream);
        let cond = self.integer_expr()?;
        self.stream.next_must_be(&Lex::Do)?;
        self.loop_depth += 1;
        let body = self.statement();
        self.loop_depth -= 1;
        Ok(Node::While(token, Box::new(cond), Box::new(body?)))
    }

    /// `for i := a to b do ...`.  The counter must be a declared integer
    /// variable; the bounds are evaluated once, before the loop runs.
    fn for_statement(&mut self, token: Token) -> Result<Node, CompilerError<ParserError>> {
        trace!(self.stream);
        let (name, pos) = self.expect_identifier()?;
        match self.scopes.lookup(&name) {
            None => return err!(pos, ParserError::Semantic(SemanticError::Undeclared(name))),
            Some(sym) => {
                if sym.is_type || sym.ty.category() == Category::Function {
                    return err!(pos, ParserError::Semantic(SemanticError::NotAVariable(name)));
                }
                if sym.is_const {
                    return err!(
                        pos,
                        ParserError::Semantic(SemanticError::AssignToConstant(name))
                    );
                }
                if types::decay(&sym.ty).category() != Category::Integer {
                    return err!(
                        pos,
                        ParserError::Semantic(SemanticError::IntegerExpected(sym.ty.to_string()))
                    );
                }
            }
        }
        let counter = Token::new(Lex::Identifier(name), pos);

        self.stream.next_must_be(&Lex::Assign)?;
        let from = self.integer_expr()?;
        let direction = vec![Lex::To, Lex::DownTo];
        let down_to = match self.stream.next_if_one_of(direction.clone()) {
            Some(token) => token.sym == Lex::DownTo,
            None => {
                let (pos, found) = self.stream.found();
                return err!(pos, ParserError::ExpectedButFound(direction, found));
            }
        };
        let to = self.integer_expr()?;
        self.stream.next_must_be(&Lex::Do)?;

        self.loop_depth += 1;
        let body = self.statement();
        self.loop_depth -= 1;

        Ok(Node::For {
            token,
            counter,
            from: Box::new(from),
            to: Box::new(to),
            down_to,
            body: Box::new(body?),
        })
    }

    fn write_statement(&mut self, token: Token) -> Result<Node, CompilerError<ParserError>> {
        trace!(self.stream);
        self.stream.next_must_be(&Lex::LParen)?;
        let mut args = vec![];
        loop {
            let arg = self.expression_required()?;
            let printable = types::decay(&arg.ty()).is_scalar()
                || matches!(arg.value(), Some(Value::String(_)));
            if !printable {
                return err!(
                    arg.pos(),
                    ParserError::Semantic(SemanticError::NotPrintable(arg.ty().to_string()))
                );
            }
            args.push(arg);
            if self.stream.next_if(&Lex::Comma).is_none() {
                break;
            }
        }
        self.stream.next_must_be(&Lex::RParen)?;
        Ok(Node::Write(token, args))
    }

    fn read_statement(&mut self, token: Token) -> Result<Node, CompilerError<ParserError>> {
        trace!(self.stream);
        self.stream.next_must_be(&Lex::LParen)?;
        let mut targets = vec![];
        loop {
            targets.push(self.read_target()?);
            if self.stream.next_if(&Lex::Comma).is_none() {
                break;
            }
        }
        self.stream.next_must_be(&Lex::RParen)?;
        Ok(Node::Read(token, targets))
    }

    fn read_target(&mut self) -> Result<Node, CompilerError<ParserError>> {
        let (name, pos) = self.expect_identifier()?;
        let sym = match self.scopes.lookup(&name) {
            Some(sym) => sym.clone(),
            None => return err!(pos, ParserError::Semantic(SemanticError::Undeclared(name))),
        };
        if sym.is_type || sym.ty.category() == Category::Function {
            return err!(pos, ParserError::Semantic(SemanticError::NotAVariable(name)));
        }
        if sym.is_const {
            return err!(
                pos,
                ParserError::Semantic(SemanticError::ReadIntoConstant(name))
            );
        }
        let token = Token::new(Lex::Identifier(name), pos);
        let target = self.postfix(Node::Var(token, sym.ty))?;
        match target.ty().category() {
            Category::Integer | Category::Char => Ok(target),
            _ => err!(
                target.pos(),
                ParserError::Semantic(SemanticError::ReadTargetInvalid)
            ),
        }
    }

    /// `exit` or `exit(value)`.  With a value, the value is stored into
    /// `result` before returning, so only functions may use that form.
    fn exit_statement(&mut self, token: Token) -> Result<Node, CompilerError<ParserError>> {
        trace!(self.stream);
        self.exit_found = true;
        if self.stream.next_if(&Lex::LParen).is_none() {
            return Ok(Node::Exit(token, None));
        }
        let expr = self.expression_required()?;
        self.stream.next_must_be(&Lex::RParen)?;
        // only the current routine's own result counts; an enclosing
        // function's result is not assignable from here
        let ty = match self.scopes.lookup_current("result") {
            Some(result) => result.ty.clone(),
            None => {
                return err!(
                    token.pos,
                    ParserError::Semantic(SemanticError::ExitValueInProcedure)
                )
            }
        };
        match types::assignable(&ty, &expr.ty(), false) {
            Some(_) => Ok(Node::Exit(
                token,
                Some(Box::new(const_fold::coerce(expr, &ty))),
            )),
            None => err!(
                expr.pos(),
                ParserError::Semantic(SemanticError::IncompatibleTypes {
                    expected: ty.to_string(),
                    found: expr.ty().to_string(),
                })
            ),
        }
    }

    /// A statement starting with an identifier: either an assignment
    /// through a designator or a routine call.
    fn assignment_or_call(&mut self) -> Result<Node, CompilerError<ParserError>> {
        trace!(self.stream);
        let (name, pos) = self.expect_identifier()?;
        let sym = match self.scopes.lookup(&name) {
            Some(sym) => sym.clone(),
            None => return err!(pos, ParserError::Semantic(SemanticError::Undeclared(name))),
        };
        let token = Token::new(Lex::Identifier(name.clone()), pos);

        if sym.ty.category() == Category::Function {
            return self.call(token, &sym.ty);
        }
        if sym.is_type {
            return err!(pos, ParserError::Semantic(SemanticError::NotAVariable(name)));
        }

        let target = self.postfix(Node::Var(token, sym.ty))?;
        let assign = self.stream.next_must_be(&Lex::Assign)?;
        if sym.is_const {
            return err!(
                pos,
                ParserError::Semantic(SemanticError::AssignToConstant(name))
            );
        }
        if name == "result" {
            self.result_count += 1;
        }

        let value = self.expression_required()?;
        let target_ty = target.ty();
        match types::assignable(&target_ty, &value.ty(), false) {
            Some(_) => {
                let value = const_fold::coerce(value, &target_ty);
                Ok(Node::Assignment(
                    assign,
                    Box::new(target),
                    Box::new(value),
                ))
            }
            None => err!(
                value.pos(),
                ParserError::Semantic(SemanticError::IncompatibleTypes {
                    expected: target_ty.to_string(),
                    found: value.ty().to_string(),
                })
            ),
        }
    }

    /// An expression which must be integer valued, for conditions, loop
    /// bounds, and the like.
    pub(super) fn integer_expr(&mut self) -> Result<Node, CompilerError<ParserError>> {
        let expr = self.expression_required()?;
        if types::decay(&expr.ty()).category() != Category::Integer {
            return err!(
                expr.pos(),
                ParserError::Semantic(SemanticError::IntegerExpected(expr.ty().to_string()))
            );
        }
        Ok(expr)
    }
}
