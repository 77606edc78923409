use std::rc::Rc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::{AtomicUsize, Ordering};

use stdext::function_name;

use crate::compiler::ast::{Node, Program};
use crate::compiler::lexer::tokens::{Lex, Token};
use crate::compiler::semantics::stack::ScopeStack;
use crate::compiler::semantics::symbol_table::{ScopeType, Symbol, SymbolTable};
use crate::compiler::semantics::SemanticError;
use crate::compiler::types::{self, ArrayType, FunctionType, RecordType, Type, TypeRef};
use crate::compiler::{CompilerError, Pos};
use crate::diagnostics::TracingConfig;
use crate::err;

use super::const_fold;
use super::error::ParserError;
use super::tokenstream::TokenStream;

/*
    Grammar
    PROGRAM := [program IDENTIFIER ;] DECLARATIONS COMPOUND .
    DECLARATIONS := (const CONST_DECL+ | type TYPE_DECL+ | var VAR_DECL+ | ROUTINE)*
    CONST_DECL := IDENTIFIER = EXPRESSION ; | IDENTIFIER : TYPE = INITIALIZER ;
    TYPE_DECL := IDENTIFIER = TYPE ;
    VAR_DECL := IDENTIFIER [, IDENTIFIER]* : TYPE ;
    TYPE := IDENTIFIER | array [ EXPRESSION .. EXPRESSION ] of TYPE
          | record VAR_DECL* end
    ROUTINE := (function | procedure) IDENTIFIER [( PARAMS )] [: TYPE] ;
               DECLARATIONS COMPOUND ;
    PARAMS := [var | const] IDENTIFIER [, IDENTIFIER]* : TYPE [; PARAMS]
    COMPOUND := begin [STATEMENT [; STATEMENT]*] end
    STATEMENT := COMPOUND | IF | WHILE | FOR | WRITE | READ | exit [( EXPRESSION )]
               | continue | break | DESIGNATOR := EXPRESSION | CALL
    IF := if EXPRESSION then STATEMENT [else STATEMENT]
    WHILE := while EXPRESSION do STATEMENT
    FOR := for IDENTIFIER := EXPRESSION (to | downto) EXPRESSION do STATEMENT
    DESIGNATOR := IDENTIFIER ([ EXPRESSION ] | . IDENTIFIER)*
    EXPRESSION := ADDITIVE [RELOP ADDITIVE]
    ADDITIVE := MULTIPLICATIVE [(+ | - | or | xor) MULTIPLICATIVE]*
    MULTIPLICATIVE := UNARY [(* | / | div | mod | and | shl | shr) UNARY]*
    UNARY := (- | not) UNARY | PRIMARY
    PRIMARY := LITERAL | ( EXPRESSION ) | IDENTIFIER [( ARGS )] POSTFIX*
*/

pub(crate) type ParserResult<T> = Result<Option<T>, CompilerError<ParserError>>;

pub(super) static ENABLE_TRACING: AtomicBool = AtomicBool::new(false);
pub(super) static TRACE_START: AtomicUsize = AtomicUsize::new(0);
pub(super) static TRACE_END: AtomicUsize = AtomicUsize::new(0);

pub fn set_tracing(config: TracingConfig) {
    match config {
        TracingConfig::All => {
            ENABLE_TRACING.store(true, Ordering::SeqCst);
            TRACE_START.store(0, Ordering::SeqCst);
            TRACE_END.store(0, Ordering::SeqCst);
        }
        TracingConfig::After(start) => {
            ENABLE_TRACING.store(true, Ordering::SeqCst);
            TRACE_START.store(start, Ordering::SeqCst);
            TRACE_END.store(0, Ordering::SeqCst);
        }
        TracingConfig::Before(end) => {
            ENABLE_TRACING.store(true, Ordering::SeqCst);
            TRACE_START.store(0, Ordering::SeqCst);
            TRACE_END.store(end, Ordering::SeqCst);
        }
        TracingConfig::Between(start, end) => {
            ENABLE_TRACING.store(true, Ordering::SeqCst);
            TRACE_START.store(start, Ordering::SeqCst);
            TRACE_END.store(end, Ordering::SeqCst);
        }
        TracingConfig::Only(line) => {
            ENABLE_TRACING.store(true, Ordering::SeqCst);
            TRACE_START.store(line, Ordering::SeqCst);
            TRACE_END.store(line, Ordering::SeqCst);
        }
        _ => (),
    }
}

/// Prints the parser function being entered and the token it sees, when
/// tracing has been turned on for the token's line.
#[macro_export]
macro_rules! trace {
    ($ts:expr) => {
        if ENABLE_TRACING.load(Ordering::SeqCst) {
            match $ts.peek() {
                None => (),
                Some(token) => {
                    let line = token.pos.line as usize;
                    let start = TRACE_START.load(Ordering::SeqCst);
                    let end = TRACE_END.load(Ordering::SeqCst);
                    if (start == 0 && end == 0)
                        || (end == 0 && start <= line)
                        || (start == 0 && line <= end)
                        || (start <= line && line <= end)
                    {
                        println!("{} <- {}", function_name!(), token)
                    }
                }
            }
        }
    };
}

/// Parses a token vector into a checked [`Program`].
pub fn parse(tokens: &[Token]) -> Result<Program, CompilerError<ParserError>> {
    Parser::new(tokens).program()
}

/// Recursive descent over a [`TokenStream`].  The scope stack and the three
/// counters below carry the semantic context the statement rules need; the
/// counters are saved and reset around every nested routine.
pub(super) struct Parser<'a> {
    pub(super) stream: TokenStream<'a>,
    pub(super) scopes: ScopeStack,
    /// Number of enclosing loops, for `continue` and `break`.
    pub(super) loop_depth: u32,
    /// Number of assignments to `result` in the current routine.
    pub(super) result_count: u32,
    /// Whether the current routine has an explicit `exit`.
    pub(super) exit_found: bool,
}

impl<'a> Parser<'a> {
    pub(super) fn new(tokens: &'a [Token]) -> Parser<'a> {
        let mut scope = SymbolTable::new(ScopeType::Program);
        for (name, ty) in [
            ("integer", Type::integer()),
            ("double", Type::double()),
            ("char", Type::chr()),
        ] {
            // a fresh scope cannot already hold these
            let _ = scope.add(Symbol::type_alias(name, ty));
        }
        let mut scopes = ScopeStack::new();
        scopes.enter_scope(scope);
        Parser {
            stream: TokenStream::new(tokens),
            scopes,
            loop_depth: 0,
            result_count: 0,
            exit_found: false,
        }
    }

    fn program(&mut self) -> Result<Program, CompilerError<ParserError>> {
        trace!(self.stream);
        if self.stream.next_if(&Lex::Program).is_some() {
            self.expect_identifier()?;
            self.stream.next_must_be(&Lex::Semicolon)?;
        }
        self.declarations()?;
        let body = self.compound_statement()?;
        self.stream.next_must_be(&Lex::Dot)?;
        if let Some(token) = self.stream.next() {
            return err!(
                token.pos,
                ParserError::ExpectedButFound(vec![], Some(token.sym))
            );
        }

        let mut scope = self.scopes.leave_scope();
        scope.compute_offsets();
        Ok(Program { scope, body })
    }

    /// The declaration sections before a `begin`, in any order and any
    /// number of repetitions.
    fn declarations(&mut self) -> Result<(), CompilerError<ParserError>> {
        trace!(self.stream);
        loop {
            if self.stream.next_if(&Lex::Const).is_some() {
                self.const_declarations()?;
            } else if self.stream.next_if(&Lex::Type).is_some() {
                self.type_declarations()?;
            } else if self.stream.next_if(&Lex::Var).is_some() {
                self.var_declarations()?;
            } else if let Some(token) = self
                .stream
                .next_if_one_of(vec![Lex::Function, Lex::Procedure])
            {
                self.routine_declaration(token.sym == Lex::Procedure)?;
            } else {
                return Ok(());
            }
        }
    }

    fn const_declarations(&mut self) -> Result<(), CompilerError<ParserError>> {
        trace!(self.stream);
        while let Some((name, pos)) = self.stream.next_if_id() {
            let sym = if self.stream.next_if(&Lex::Colon).is_some() {
                let ty = self.parse_type()?;
                self.stream.next_must_be(&Lex::Eq)?;
                let value = self.initializer(&ty)?;
                Symbol::constant(&name, ty, value)
            } else {
                self.stream.next_must_be(&Lex::Eq)?;
                let value = self.expression_required()?;
                if !value.is_const() {
                    return err!(
                        value.pos(),
                        ParserError::Semantic(SemanticError::ConstantExpected)
                    );
                }
                Symbol::constant(&name, value.ty(), value)
            };
            self.stream.next_must_be(&Lex::Semicolon)?;
            self.declare(pos, sym)?;
        }
        Ok(())
    }

    fn type_declarations(&mut self) -> Result<(), CompilerError<ParserError>> {
        trace!(self.stream);
        while let Some((name, pos)) = self.stream.next_if_id() {
            self.stream.next_must_be(&Lex::Eq)?;
            let ty = self.parse_type()?;
            self.stream.next_must_be(&Lex::Semicolon)?;
            self.declare(pos, Symbol::type_alias(&name, ty))?;
        }
        Ok(())
    }

    fn var_declarations(&mut self) -> Result<(), CompilerError<ParserError>> {
        trace!(self.stream);
        while self.stream.test_if(&Lex::Identifier(String::new())) {
            let names = self.identifier_list()?;
            self.stream.next_must_be(&Lex::Colon)?;
            let ty = self.parse_type()?;
            self.stream.next_must_be(&Lex::Semicolon)?;
            for (name, pos) in names {
                self.declare(pos, Symbol::var(&name, ty.clone()))?;
            }
        }
        Ok(())
    }

    fn identifier_list(&mut self) -> Result<Vec<(String, Pos)>, CompilerError<ParserError>> {
        let mut names = vec![self.expect_identifier()?];
        while self.stream.next_if(&Lex::Comma).is_some() {
            names.push(self.expect_identifier()?);
        }
        Ok(names)
    }

    /// A type in a declaration: a named type, an array type, or an inline
    /// record.  Array bounds must fold to integer constants here, the
    /// type's size has to be known for the frame layout.
    pub(super) fn parse_type(&mut self) -> Result<TypeRef, CompilerError<ParserError>> {
        trace!(self.stream);
        if let Some((name, pos)) = self.stream.next_if_id() {
            return match self.scopes.lookup(&name) {
                Some(sym) if sym.is_type => Ok(sym.ty.clone()),
                Some(_) => err!(pos, ParserError::Semantic(SemanticError::NotAType(name))),
                None => err!(pos, ParserError::Semantic(SemanticError::Undeclared(name))),
            };
        }
        if let Some(token) = self.stream.next_if(&Lex::Array) {
            self.stream.next_must_be(&Lex::LBracket)?;
            let lower = self.const_integer()?;
            self.stream.next_must_be(&Lex::DotDot)?;
            let upper = self.const_integer()?;
            self.stream.next_must_be(&Lex::RBracket)?;
            self.stream.next_must_be(&Lex::Of)?;
            let element = self.parse_type()?;
            if lower > upper {
                return err!(
                    token.pos,
                    ParserError::Semantic(SemanticError::ArrayBoundsInvalid(lower, upper))
                );
            }
            return Ok(Rc::new(Type::Array(ArrayType {
                element,
                lower,
                upper,
            })));
        }
        if self.stream.next_if(&Lex::Record).is_some() {
            let mut fields = SymbolTable::new(ScopeType::Record);
            while self.stream.test_if(&Lex::Identifier(String::new())) {
                let names = self.identifier_list()?;
                self.stream.next_must_be(&Lex::Colon)?;
                let ty = self.parse_type()?;
                self.stream.next_must_be(&Lex::Semicolon)?;
                for (name, pos) in names {
                    if let Err(inner) = fields.add(Symbol::var(&name, ty.clone())) {
                        return err!(pos, ParserError::Semantic(inner));
                    }
                }
            }
            self.stream.next_must_be(&Lex::End)?;
            fields.compute_offsets();
            return Ok(Rc::new(Type::Record(RecordType { fields })));
        }
        let (pos, found) = self.stream.found();
        err!(pos, ParserError::ExpectedType(found))
    }

    /// An expression which must fold down to an integer constant.
    fn const_integer(&mut self) -> Result<i64, CompilerError<ParserError>> {
        let expr = self.expression_required()?;
        match expr.int_value() {
            Some(i) => Ok(i),
            None if expr.is_const() => err!(
                expr.pos(),
                ParserError::Semantic(SemanticError::IntegerExpected(expr.ty().to_string()))
            ),
            None => err!(
                expr.pos(),
                ParserError::Semantic(SemanticError::ConstantExpected)
            ),
        }
    }

    /// The right hand side of a typed constant declaration.  Scalars take
    /// a plain constant expression; arrays and records take a
    /// parenthesized element list matching the declared shape.
    fn initializer(&mut self, ty: &TypeRef) -> Result<Node, CompilerError<ParserError>> {
        trace!(self.stream);
        match ty.as_ref() {
            Type::Array(a) => {
                let lparen = self.stream.next_must_be(&Lex::LParen)?;
                let mut items = vec![];
                loop {
                    items.push(self.const_element(&a.element)?);
                    if self.stream.next_if(&Lex::Comma).is_none() {
                        break;
                    }
                }
                self.stream.next_must_be(&Lex::RParen)?;
                if items.len() != a.len() as usize {
                    return err!(
                        lparen.pos,
                        ParserError::Semantic(SemanticError::ArraySizeMismatch {
                            expected: a.len() as usize,
                            found: items.len(),
                        })
                    );
                }
                Ok(Node::TypedConstant(lparen, ty.clone(), items))
            }
            Type::Record(r) => {
                let lparen = self.stream.next_must_be(&Lex::LParen)?;
                let mut items = vec![];
                for field in r.fields.table() {
                    if !items.is_empty() {
                        self.stream.next_must_be(&Lex::Semicolon)?;
                    }
                    let (name, pos) = self.expect_identifier()?;
                    if name != field.name {
                        return err!(
                            pos,
                            ParserError::Semantic(SemanticError::MissingField(
                                field.name.clone()
                            ))
                        );
                    }
                    self.stream.next_must_be(&Lex::Colon)?;
                    items.push(self.const_element(&field.ty)?);
                }
                self.stream.next_must_be(&Lex::RParen)?;
                Ok(Node::TypedConstant(lparen, ty.clone(), items))
            }
            _ => {
                let expr = self.expression_required()?;
                if !expr.is_const() {
                    return err!(
                        expr.pos(),
                        ParserError::Semantic(SemanticError::ConstantExpected)
                    );
                }
                match types::assignable(ty, &expr.ty(), false) {
                    Some(_) => Ok(const_fold::coerce(expr, ty)),
                    None => err!(
                        expr.pos(),
                        ParserError::Semantic(SemanticError::IncompatibleTypes {
                            expected: ty.to_string(),
                            found: expr.ty().to_string(),
                        })
                    ),
                }
            }
        }
    }

    /// One constant element of an array or record initializer.
    fn const_element(&mut self, ty: &TypeRef) -> Result<Node, CompilerError<ParserError>> {
        let expr = self.expression_required()?;
        if !expr.is_const() {
            return err!(
                expr.pos(),
                ParserError::Semantic(SemanticError::ConstantExpected)
            );
        }
        match types::assignable(ty, &expr.ty(), false) {
            Some(_) => Ok(const_fold::coerce(expr, ty)),
            None => err!(
                expr.pos(),
                ParserError::Semantic(SemanticError::IncompatibleTypes {
                    expected: ty.to_string(),
                    found: expr.ty().to_string(),
                })
            ),
        }
    }

    /// A `function` or `procedure` declaration, including its own nested
    /// declarations and body.  The routine's symbol is added to the
    /// enclosing scope only after the body has been parsed.
    fn routine_declaration(&mut self, procedure: bool) -> Result<(), CompilerError<ParserError>> {
        trace!(self.stream);
        let (name, pos) = self.expect_identifier()?;

        self.scopes
            .enter_scope(SymbolTable::new(ScopeType::Parameters(name.clone())));
        if self.stream.next_if(&Lex::LParen).is_some()
            && self.stream.next_if(&Lex::RParen).is_none()
        {
            loop {
                let by_ref = self.stream.next_if(&Lex::Var).is_some();
                let is_const = !by_ref && self.stream.next_if(&Lex::Const).is_some();
                let names = self.identifier_list()?;
                self.stream.next_must_be(&Lex::Colon)?;
                let ty = self.parse_type()?;
                for (pname, ppos) in names {
                    // const parameters are passed by address too, they are
                    // just not writable
                    let sym = Symbol::parameter(&pname, ty.clone(), by_ref || is_const, is_const);
                    self.declare(ppos, sym)?;
                }
                if self.stream.next_if(&Lex::Semicolon).is_none() {
                    break;
                }
            }
            self.stream.next_must_be(&Lex::RParen)?;
        }

        let ret = if procedure {
            Type::nil()
        } else {
            self.stream.next_must_be(&Lex::Colon)?;
            self.parse_type()?
        };
        self.stream.next_must_be(&Lex::Semicolon)?;

        self.scopes
            .enter_scope(SymbolTable::new(ScopeType::Routine(name.clone())));
        if !procedure {
            self.declare(pos, Symbol::var("result", ret.clone()))?;
        }

        let saved_loop_depth = self.loop_depth;
        let saved_result_count = self.result_count;
        let saved_exit_found = self.exit_found;
        self.loop_depth = 0;
        self.result_count = 0;
        self.exit_found = false;

        self.declarations()?;
        let mut body = self.compound_statement()?;
        self.stream.next_must_be(&Lex::Semicolon)?;

        // every routine ends by exiting
        if let Node::Body(token, stmts) = &mut body {
            if !matches!(stmts.last(), Some(Node::Exit(..))) {
                stmts.push(Node::Exit(token.clone(), None));
            }
        }

        if !procedure && self.result_count == 0 && !self.exit_found {
            return err!(pos, ParserError::Semantic(SemanticError::MissingResult(name)));
        }
        self.loop_depth = saved_loop_depth;
        self.result_count = saved_result_count;
        self.exit_found = saved_exit_found;

        let mut locals = self.scopes.leave_scope();
        locals.compute_offsets();
        let mut params = self.scopes.leave_scope();
        params.compute_offsets();

        let fty = Rc::new(Type::Function(FunctionType {
            name: name.clone(),
            params,
            locals,
            ret,
        }));
        self.declare(pos, Symbol::function(&name, fty, body))
    }

    pub(super) fn expect_identifier(&mut self) -> Result<(String, Pos), CompilerError<ParserError>> {
        match self.stream.next_if_id() {
            Some(id) => Ok(id),
            None => {
                let (pos, found) = self.stream.found();
                err!(pos, ParserError::ExpectedIdentifier(found))
            }
        }
    }

    /// Declares a symbol in the innermost scope.
    pub(super) fn declare(
        &mut self,
        pos: Pos,
        sym: Symbol,
    ) -> Result<(), CompilerError<ParserError>> {
        self.scopes
            .add(sym)
            .map_err(|inner| CompilerError::new(pos, ParserError::Semantic(inner)))
    }
}
