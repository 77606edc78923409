use std::fmt;
use std::rc::Rc;

use super::semantics::symbol_table::SymbolTable;

/// Shared handle to a resolved type.  Scalar types are cheap to build, and
/// composite types (arrays, records, routines) are cloned by reference when
/// a declaration reuses them.
pub type TypeRef = Rc<Type>;

/// The closed set of types the language knows about.  `Nil` is the return
/// type of procedures and the type of statement nodes.
#[derive(Clone, Debug, PartialEq)]
pub enum Type {
    Integer,
    Double,
    Char,
    Nil,
    Array(ArrayType),
    Record(RecordType),
    Function(FunctionType),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ArrayType {
    pub element: TypeRef,
    pub lower: i64,
    pub upper: i64,
}

impl ArrayType {
    pub fn len(&self) -> i64 {
        self.upper - self.lower + 1
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RecordType {
    pub fields: SymbolTable,
}

/// Signature of a function or procedure.  The body statement lives on the
/// declaring [`Symbol`](super::semantics::symbol_table::Symbol), not here.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionType {
    pub name: String,
    pub params: SymbolTable,
    pub locals: SymbolTable,
    pub ret: TypeRef,
}

/// Shape of a type, used where the language deliberately compares kinds of
/// types rather than full structure.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Category {
    Integer,
    Double,
    Char,
    Nil,
    Array,
    Record,
    Function,
}

impl Type {
    pub fn integer() -> TypeRef {
        Rc::new(Type::Integer)
    }

    pub fn double() -> TypeRef {
        Rc::new(Type::Double)
    }

    pub fn chr() -> TypeRef {
        Rc::new(Type::Char)
    }

    pub fn nil() -> TypeRef {
        Rc::new(Type::Nil)
    }

    pub fn category(&self) -> Category {
        match self {
            Type::Integer => Category::Integer,
            Type::Double => Category::Double,
            Type::Char => Category::Char,
            Type::Nil => Category::Nil,
            Type::Array(_) => Category::Array,
            Type::Record(_) => Category::Record,
            Type::Function(_) => Category::Function,
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Type::Integer | Type::Double | Type::Char)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Integer | Type::Double)
    }

    /// Number of bytes a value of this type occupies in a stack frame.
    /// Arrays and records are rounded up to 4 byte alignment.
    pub fn size(&self) -> i32 {
        match self {
            Type::Integer => 4,
            Type::Double => 8,
            Type::Char => 1,
            Type::Nil => 0,
            Type::Array(a) => round_word(a.element.size() * a.len() as i32),
            Type::Record(r) => {
                let sum = r.fields.table().iter().map(|f| f.ty.size()).sum();
                round_word(sum)
            }
            Type::Function(f) => f.ret.size(),
        }
    }
}

fn round_word(n: i32) -> i32 {
    (n + 3) & !3
}

/// A function used in value position stands for its return value.
pub fn decay(ty: &TypeRef) -> TypeRef {
    match ty.as_ref() {
        Type::Function(f) => f.ret.clone(),
        _ => ty.clone(),
    }
}

/// Checks whether a value of type `source` may be stored into a location of
/// type `target`.  Returns `Some(needs_cast)` on success, `None` when the
/// types are incompatible.
///
/// Double always accepts Integer (with a cast); Integer accepts Double only
/// when `allow_widening` is set (value parameters), never for assignment or
/// `var` parameters.  Char accepts only Char.  Array and Record compare by
/// category only, which deliberately accepts differently shaped arrays; the
/// original language works this way.
pub fn assignable(target: &TypeRef, source: &TypeRef, allow_widening: bool) -> Option<bool> {
    let source = decay(source);
    match (target.category(), source.category()) {
        (Category::Integer, Category::Integer) => Some(false),
        (Category::Integer, Category::Double) if allow_widening => Some(true),
        (Category::Double, Category::Double) => Some(false),
        (Category::Double, Category::Integer) => Some(true),
        (Category::Char, Category::Char) => Some(false),
        (Category::Array, Category::Array) => Some(false),
        (Category::Record, Category::Record) => Some(false),
        _ => None,
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Integer => f.write_str("integer"),
            Type::Double => f.write_str("double"),
            Type::Char => f.write_str("char"),
            Type::Nil => f.write_str("nil"),
            Type::Array(a) => f.write_fmt(format_args!(
                "array[{}..{}] of {}",
                a.lower, a.upper, a.element
            )),
            Type::Record(r) => {
                f.write_str("record")?;
                for field in r.fields.table() {
                    f.write_fmt(format_args!(" {}: {};", field.name, field.ty))?;
                }
                f.write_str(" end")
            }
            Type::Function(func) => {
                f.write_fmt(format_args!("function {}: {}", func.name, func.ret))
            }
        }
    }
}

#[cfg(test)]
mod test_types {
    use super::*;

    fn array_of(element: TypeRef, lower: i64, upper: i64) -> TypeRef {
        Rc::new(Type::Array(ArrayType {
            element,
            lower,
            upper,
        }))
    }

    #[test]
    fn test_scalar_sizes() {
        assert_eq!(Type::integer().size(), 4);
        assert_eq!(Type::double().size(), 8);
        assert_eq!(Type::chr().size(), 1);
        assert_eq!(Type::nil().size(), 0);
    }

    #[test]
    fn test_array_size_rounds_to_word() {
        let a = array_of(Type::chr(), 1, 5);
        assert_eq!(a.size(), 8);

        let b = array_of(Type::integer(), 0, 9);
        assert_eq!(b.size(), 40);
    }

    #[test]
    fn test_widening_rules() {
        assert_eq!(assignable(&Type::double(), &Type::integer(), false), Some(true));
        assert_eq!(assignable(&Type::integer(), &Type::double(), false), None);
        assert_eq!(assignable(&Type::integer(), &Type::double(), true), Some(true));
        assert_eq!(assignable(&Type::integer(), &Type::integer(), false), Some(false));
    }

    #[test]
    fn test_char_only_accepts_char() {
        assert_eq!(assignable(&Type::chr(), &Type::chr(), false), Some(false));
        assert_eq!(assignable(&Type::chr(), &Type::integer(), true), None);
        assert_eq!(assignable(&Type::integer(), &Type::chr(), true), None);
    }

    #[test]
    fn test_arrays_compare_by_category() {
        let a = array_of(Type::integer(), 1, 5);
        let b = array_of(Type::integer(), 0, 99);
        assert_eq!(assignable(&a, &b, false), Some(false));
        assert_eq!(assignable(&a, &Type::integer(), false), None);
    }
}
