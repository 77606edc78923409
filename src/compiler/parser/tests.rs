use super::parser::{parse, Parser};
use super::ParserError;
use crate::compiler::ast::{BinaryOperator, Node, Program, Value};
use crate::compiler::lexer::tokens::Token;
use crate::compiler::lexer::Lexer;
use crate::compiler::semantics::symbol_table::Symbol;
use crate::compiler::semantics::SemanticError;
use crate::compiler::types::{Type, TypeRef};

fn tokens(text: &str) -> Vec<Token> {
    Lexer::new(text)
        .tokenize()
        .into_iter()
        .collect::<Result<_, _>>()
        .unwrap()
}

fn parse_ok(text: &str) -> Program {
    parse(&tokens(text)).unwrap()
}

fn parse_err(text: &str) -> ParserError {
    parse(&tokens(text)).unwrap_err().take().1
}

fn semantic_err(text: &str) -> SemanticError {
    match parse_err(text) {
        ParserError::Semantic(inner) => inner,
        other => panic!("expected a semantic error, got {:?}", other),
    }
}

fn expr_with(vars: &[(&str, TypeRef)], text: &str) -> Result<Node, ParserError> {
    let tokens = tokens(text);
    let mut parser = Parser::new(&tokens);
    for (name, ty) in vars {
        parser.scopes.add(Symbol::var(name, ty.clone())).unwrap();
    }
    parser
        .expression_required()
        .map_err(|e| e.take().1)
}

fn expr(text: &str) -> Node {
    expr_with(&[], text).unwrap()
}

fn body_stmts(program: &Program) -> &[Node] {
    match &program.body {
        Node::Body(_, stmts) => stmts,
        body => panic!("program body is not a compound statement: {:?}", body),
    }
}

#[test]
fn test_fold_arithmetic() {
    assert_eq!(expr("2 + 3 * 4").int_value(), Some(14));
    assert_eq!(expr("(2 + 3) * 4").int_value(), Some(20));
    assert_eq!(expr("7 div 2").int_value(), Some(3));
    assert_eq!(expr("7 mod 2").int_value(), Some(1));
    assert_eq!(expr("1 shl 4").int_value(), Some(16));
    assert_eq!(expr("12 xor 10").int_value(), Some(6));
    assert_eq!(expr("-5 + 2").int_value(), Some(-3));
    assert_eq!(expr("not 0").int_value(), Some(-1));
}

#[test]
fn test_fold_shifts_match_register_width() {
    // the machine shifts are 32 bits wide and mask the count to 31
    assert_eq!(expr("1 shl 33").int_value(), Some(2));
    assert_eq!(expr("8 shr 33").int_value(), Some(4));
    assert_eq!(expr("-1 shr 1").int_value(), Some(0x7fff_ffff));
}

#[test]
fn test_fold_relational() {
    assert_eq!(expr("3 < 4").int_value(), Some(1));
    assert_eq!(expr("3 = 4").int_value(), Some(0));
    assert_eq!(expr("'a' < 'b'").int_value(), Some(1));
    assert_eq!(expr("2.5 >= 2.5").int_value(), Some(1));
}

#[test]
fn test_fold_division_is_double() {
    let node = expr("4 / 2");
    assert_eq!(node.ty(), Type::double());
    assert_eq!(node.value(), Some(&Value::Double(2.0)));
}

#[test]
fn test_fold_division_by_zero() {
    assert_eq!(
        expr_with(&[], "1 div 0").unwrap_err(),
        ParserError::Semantic(SemanticError::DivisionByZero)
    );
}

#[test]
fn test_mixed_operands_get_a_cast() {
    let node = expr_with(&[("x", Type::integer())], "x + 2.5").unwrap();
    match node {
        Node::BinOp(_, BinaryOperator::Add, ty, left, _) => {
            assert_eq!(ty, Type::double());
            assert!(matches!(*left, Node::Cast(..)));
        }
        node => panic!("expected a binary op, got {:?}", node),
    }
}

#[test]
fn test_relational_yields_integer() {
    let node = expr_with(&[("d", Type::double())], "d > 1").unwrap();
    match node {
        Node::LogicOp(_, BinaryOperator::Gr, ty, _, right) => {
            assert_eq!(ty, Type::integer());
            // the integer bound is widened to match the double operand
            assert_eq!(right.ty(), Type::double());
        }
        node => panic!("expected a comparison, got {:?}", node),
    }
}

#[test]
fn test_integer_only_operator_rejects_double() {
    assert_eq!(
        expr_with(&[("d", Type::double())], "d and 1").unwrap_err(),
        ParserError::Semantic(SemanticError::OperandsNotCompatible {
            op: "and".into(),
            left: "double".into(),
            right: "integer".into(),
        })
    );
}

#[test]
fn test_explicit_cast_folds() {
    assert_eq!(expr("integer(2.9)").int_value(), Some(2));
    assert_eq!(
        expr("char(65)").value(),
        Some(&Value::Char(b'A'))
    );
    assert_eq!(
        expr("double(3)").value(),
        Some(&Value::Double(3.0))
    );
}

#[test]
fn test_minimal_program() {
    parse_ok("begin end.");
    parse_ok("program demo; begin end.");
}

#[test]
fn test_missing_dot() {
    assert!(matches!(
        parse_err("begin end"),
        ParserError::ExpectedButFound(_, None)
    ));
}

#[test]
fn test_trailing_tokens() {
    assert!(matches!(
        parse_err("begin end. extra"),
        ParserError::ExpectedButFound(v, Some(_)) if v.is_empty()
    ));
}

#[test]
fn test_named_constant_is_inlined() {
    let program = parse_ok("const a = 2 + 3; var x: integer; begin x := a end.");
    match &body_stmts(&program)[0] {
        Node::Assignment(_, _, value) => assert_eq!(value.int_value(), Some(5)),
        stmt => panic!("expected an assignment, got {:?}", stmt),
    }
}

#[test]
fn test_assignment_widens_integer() {
    let program = parse_ok("var d: double; begin d := 1 end.");
    match &body_stmts(&program)[0] {
        Node::Assignment(_, _, value) => {
            assert_eq!(value.value(), Some(&Value::Double(1.0)))
        }
        stmt => panic!("expected an assignment, got {:?}", stmt),
    }
}

#[test]
fn test_duplicate_declaration() {
    assert_eq!(
        semantic_err("var x: integer; var x: double; begin end."),
        SemanticError::AlreadyDeclared("x".into())
    );
}

#[test]
fn test_undeclared_variable() {
    assert_eq!(
        semantic_err("begin x := 1 end."),
        SemanticError::Undeclared("x".into())
    );
}

#[test]
fn test_narrowing_assignment_rejected() {
    assert_eq!(
        semantic_err("var x: integer; y: double; begin x := y end."),
        SemanticError::IncompatibleTypes {
            expected: "integer".into(),
            found: "double".into(),
        }
    );
}

#[test]
fn test_assign_to_constant() {
    assert_eq!(
        semantic_err("const c = 5; begin c := 6 end."),
        SemanticError::AssignToConstant("c".into())
    );
}

#[test]
fn test_break_and_continue_need_a_loop() {
    assert_eq!(
        semantic_err("begin break end."),
        SemanticError::BreakOutsideLoop
    );
    assert_eq!(
        semantic_err("begin continue end."),
        SemanticError::ContinueOutsideLoop
    );
    parse_ok("var i: integer; begin while 1 do begin continue; break end end.");
}

#[test]
fn test_for_loop() {
    parse_ok("var i, s: integer; begin s := 0; for i := 1 to 10 do s := s + i end.");
    parse_ok("var i: integer; begin for i := 10 downto 1 do begin end end.");
}

#[test]
fn test_for_counter_must_be_integer_variable() {
    assert_eq!(
        semantic_err("var d: double; begin for d := 1 to 3 do begin end end."),
        SemanticError::IntegerExpected("double".into())
    );
    assert_eq!(
        semantic_err("const c = 1; begin for c := 1 to 3 do begin end end."),
        SemanticError::AssignToConstant("c".into())
    );
}

#[test]
fn test_condition_must_be_integer() {
    assert_eq!(
        semantic_err("var d: double; begin while d do begin end end."),
        SemanticError::IntegerExpected("double".into())
    );
    assert_eq!(
        semantic_err("var d: double; begin if d then begin end end."),
        SemanticError::IntegerExpected("double".into())
    );
}

#[test]
fn test_arrays() {
    parse_ok("var a: array[1..5] of integer; i: integer; begin a[2] := 7; i := a[2] end.");
    assert_eq!(
        semantic_err("var a: array[5..1] of integer; begin end."),
        SemanticError::ArrayBoundsInvalid(5, 1)
    );
    assert_eq!(
        semantic_err("var a: array[1..3] of integer; d: double; begin a[d] := 1 end."),
        SemanticError::IntegerExpected("double".into())
    );
    assert_eq!(
        semantic_err("var x: integer; begin x[1] := 1 end."),
        SemanticError::NotAnArray("integer".into())
    );
}

#[test]
fn test_records() {
    parse_ok(
        "type point = record x: integer; y: integer; end;
         var p: point;
         begin p.x := 1; p.y := p.x + 2 end.",
    );
    assert_eq!(
        semantic_err(
            "type point = record x: integer; end;
             var p: point;
             begin p.z := 1 end."
        ),
        SemanticError::NoSuchField("z".into())
    );
}

#[test]
fn test_typed_constants() {
    let program = parse_ok(
        "const squares: array[1..3] of integer = (1, 4, 9);
         var x: integer;
         begin x := squares[2] end.",
    );
    let sym = program.scope.get("squares").unwrap();
    assert!(sym.is_const);
    match &sym.value {
        Some(Node::TypedConstant(_, _, items)) => assert_eq!(items.len(), 3),
        value => panic!("expected a typed constant, got {:?}", value),
    }

    assert_eq!(
        semantic_err("const squares: array[1..3] of integer = (1, 4); begin end."),
        SemanticError::ArraySizeMismatch {
            expected: 3,
            found: 2,
        }
    );
}

#[test]
fn test_record_constant_fields_in_order() {
    parse_ok(
        "type point = record x: integer; y: double; end;
         const origin: point = (x: 0; y: 0.0);
         var p: point;
         begin p := origin end.",
    );
    assert_eq!(
        semantic_err(
            "type point = record x: integer; y: double; end;
             const origin: point = (y: 0.0; x: 0);
             begin end."
        ),
        SemanticError::MissingField("x".into())
    );
}

#[test]
fn test_read_targets() {
    parse_ok("var n: integer; c: char; begin read(n, c) end.");
    assert_eq!(
        semantic_err("const squares: array[1..3] of integer = (1, 4, 9); begin read(squares) end."),
        SemanticError::ReadIntoConstant("squares".into())
    );
    assert_eq!(
        semantic_err("var d: double; begin read(d) end."),
        SemanticError::ReadTargetInvalid
    );
}

#[test]
fn test_write_arguments() {
    parse_ok("var d: double; begin write('x = ', 10, ' ', d) end.");
    assert_eq!(
        semantic_err("type p = record x: integer; end; var v: p; begin write(v) end."),
        SemanticError::NotPrintable("record x: integer; end".into())
    );
}

#[test]
fn test_function_declaration_and_call() {
    let program = parse_ok(
        "function f: integer; begin result := 1 end;
         var x: integer;
         begin x := f() end.",
    );
    let f = program.scope.get("f").unwrap();
    assert_eq!(f.ty.category(), crate::compiler::types::Category::Function);
    // the body always ends with an exit
    match &f.value {
        Some(Node::Body(_, stmts)) => {
            assert!(matches!(stmts.last(), Some(Node::Exit(_, None))))
        }
        value => panic!("expected a body, got {:?}", value),
    }
}

#[test]
fn test_function_must_produce_a_result() {
    assert_eq!(
        semantic_err("function f: integer; begin end; begin end."),
        SemanticError::MissingResult("f".into())
    );
    // exit with a value counts
    parse_ok("function f: integer; begin exit(3) end; begin end.");
}

#[test]
fn test_exit_value_needs_a_function() {
    assert_eq!(
        semantic_err("procedure p; begin exit(1) end; begin end."),
        SemanticError::ExitValueInProcedure
    );
    parse_ok("procedure p; begin exit end; begin end.");
}

#[test]
fn test_exit_value_in_nested_procedure_rejected() {
    // the enclosing function's result is not the procedure's to assign
    assert_eq!(
        semantic_err(
            "function f: integer;
               procedure p;
               begin exit(1) end;
             begin result := 0 end;
             begin end."
        ),
        SemanticError::ExitValueInProcedure
    );
}

#[test]
fn test_argument_checking() {
    let source = "function add(a: integer; b: integer): integer;
                  begin result := a + b end;
                  var x: integer;
                  begin x := add(1) end.";
    assert_eq!(
        semantic_err(source),
        SemanticError::ArgumentCount {
            expected: 2,
            found: 1,
        }
    );
}

#[test]
fn test_value_argument_is_widened() {
    parse_ok(
        "function half(d: double): double; begin result := d / 2 end;
         var d: double;
         begin d := half(3) end.",
    );
}

#[test]
fn test_var_parameter_needs_a_designator() {
    let declaration = "procedure bump(var x: integer); begin x := x + 1 end;";
    parse_ok(&format!("{} var n: integer; begin bump(n) end.", declaration));
    assert_eq!(
        semantic_err(&format!("{} begin bump(5) end.", declaration)),
        SemanticError::NotAVariable("argument 1".into())
    );
    assert_eq!(
        semantic_err(&format!(
            "{} var d: double; begin bump(d) end.",
            declaration
        )),
        SemanticError::IncompatibleTypes {
            expected: "integer".into(),
            found: "double".into(),
        }
    );
}

#[test]
fn test_const_parameter_is_read_only() {
    assert_eq!(
        semantic_err("procedure p(const x: integer); begin x := 1 end; begin end."),
        SemanticError::AssignToConstant("x".into())
    );
}

#[test]
fn test_nested_routines_and_scoping() {
    parse_ok(
        "function outer: integer;
         var a: integer;
           function inner: integer;
           begin result := 2 end;
         begin a := inner(); result := a end;
         var x: integer;
         begin x := outer() end.",
    );
}

#[test]
fn test_inner_scope_shadows_outer() {
    parse_ok(
        "var x: double;
         procedure p;
         var x: integer;
         begin x := 1 end;
         begin x := 0.5 end.",
    );
}

#[test]
fn test_case_insensitive_names() {
    parse_ok("VAR Counter: INTEGER; BEGIN counter := 1 END.");
}
