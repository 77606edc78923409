use std::fmt;

/// Errors raised while resolving names and checking types.  These are
/// produced during parsing (the parser checks as it builds the AST) and
/// wrapped into the parser's error type before reaching the user.
#[derive(Clone, Debug, PartialEq)]
pub enum SemanticError {
    AlreadyDeclared(String),
    Undeclared(String),
    NotAType(String),
    NotAVariable(String),
    AssignToConstant(String),
    IncompatibleTypes { expected: String, found: String },
    OperandsNotCompatible { op: String, left: String, right: String },
    IntegerExpected(String),
    ConstantExpected,
    DivisionByZero,
    NotAnArray(String),
    NotARecord(String),
    NoSuchField(String),
    NotCallable(String),
    ArgumentCount { expected: usize, found: usize },
    ReadIntoConstant(String),
    ReadTargetInvalid,
    NotPrintable(String),
    BreakOutsideLoop,
    ContinueOutsideLoop,
    ExitValueInProcedure,
    MissingResult(String),
    ArrayBoundsInvalid(i64, i64),
    ArraySizeMismatch { expected: usize, found: usize },
    MissingField(String),
}

impl fmt::Display for SemanticError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use SemanticError::*;
        match self {
            AlreadyDeclared(name) => {
                f.write_fmt(format_args!("{} is already declared in this scope", name))
            }
            Undeclared(name) => f.write_fmt(format_args!("{} is not declared", name)),
            NotAType(name) => f.write_fmt(format_args!("{} does not name a type", name)),
            NotAVariable(name) => f.write_fmt(format_args!("{} is not a variable", name)),
            AssignToConstant(name) => {
                f.write_fmt(format_args!("Cannot assign to constant {}", name))
            }
            IncompatibleTypes { expected, found } => f.write_fmt(format_args!(
                "Expected a value of type {}, but found {}",
                expected, found
            )),
            OperandsNotCompatible { op, left, right } => f.write_fmt(format_args!(
                "Operator {} cannot be applied to {} and {}",
                op, left, right
            )),
            IntegerExpected(found) => {
                f.write_fmt(format_args!("Expected an integer, but found {}", found))
            }
            ConstantExpected => f.write_str("Expected a constant expression"),
            DivisionByZero => f.write_str("Division by zero in constant expression"),
            NotAnArray(found) => f.write_fmt(format_args!("Cannot index into {}", found)),
            NotARecord(found) => {
                f.write_fmt(format_args!("{} is not a record, it has no fields", found))
            }
            NoSuchField(name) => f.write_fmt(format_args!("Record has no field {}", name)),
            NotCallable(name) => f.write_fmt(format_args!("{} cannot be called", name)),
            ArgumentCount { expected, found } => f.write_fmt(format_args!(
                "Expected {} arguments, but found {}",
                expected, found
            )),
            ReadIntoConstant(name) => {
                f.write_fmt(format_args!("Cannot read into constant {}", name))
            }
            ReadTargetInvalid => f.write_str("read expects an integer or char variable"),
            NotPrintable(found) => {
                f.write_fmt(format_args!("Cannot write a value of type {}", found))
            }
            BreakOutsideLoop => f.write_str("break outside of a loop"),
            ContinueOutsideLoop => f.write_str("continue outside of a loop"),
            ExitValueInProcedure => f.write_str("Procedures cannot exit with a value"),
            MissingResult(name) => f.write_fmt(format_args!(
                "Function {} never assigns result and never exits with a value",
                name
            )),
            ArrayBoundsInvalid(lower, upper) => f.write_fmt(format_args!(
                "Array bounds {}..{} are invalid",
                lower, upper
            )),
            ArraySizeMismatch { expected, found } => f.write_fmt(format_args!(
                "Initializer has {} elements, but the array has {}",
                found, expected
            )),
            MissingField(name) => f.write_fmt(format_args!(
                "Initializer is missing a value for field {}",
                name
            )),
        }
    }
}
