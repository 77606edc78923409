use std::fmt;

use log::debug;

use crate::compiler::ast::Node;
use crate::compiler::types::{Category, TypeRef};

use super::error::SemanticError;

/// A single named entry in a scope: a variable, parameter, constant, type
/// alias, or routine.
#[derive(Clone, Debug, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub ty: TypeRef,
    /// A constant's value expression or a routine's body.
    pub value: Option<Node>,
    pub is_type: bool,
    pub is_const: bool,
    /// Parameter passed by address.  `var` parameters and `const`
    /// parameters both set this.
    pub by_ref: bool,
    /// Byte offset of this entry within its frame or record, filled in by
    /// [`SymbolTable::compute_offsets`].
    pub offset: i32,
}

impl Symbol {
    pub fn var(name: &str, ty: TypeRef) -> Symbol {
        Symbol {
            name: name.into(),
            ty,
            value: None,
            is_type: false,
            is_const: false,
            by_ref: false,
            offset: 0,
        }
    }

    pub fn constant(name: &str, ty: TypeRef, value: Node) -> Symbol {
        Symbol {
            name: name.into(),
            ty,
            value: Some(value),
            is_type: false,
            is_const: true,
            by_ref: false,
            offset: 0,
        }
    }

    pub fn type_alias(name: &str, ty: TypeRef) -> Symbol {
        Symbol {
            name: name.into(),
            ty,
            value: None,
            is_type: true,
            is_const: false,
            by_ref: false,
            offset: 0,
        }
    }

    pub fn parameter(name: &str, ty: TypeRef, by_ref: bool, is_const: bool) -> Symbol {
        Symbol {
            name: name.into(),
            ty,
            value: None,
            is_type: false,
            is_const,
            by_ref,
            offset: 0,
        }
    }

    pub fn function(name: &str, ty: TypeRef, body: Node) -> Symbol {
        Symbol {
            name: name.into(),
            ty,
            value: Some(body),
            is_type: false,
            is_const: false,
            by_ref: false,
            offset: 0,
        }
    }

    /// Bytes this entry occupies in its frame.  By reference parameters
    /// hold an address, not the value.
    pub fn stack_size(&self) -> i32 {
        if self.by_ref {
            4
        } else {
            self.ty.size()
        }
    }

    /// Whether this entry occupies frame space at all.  Type aliases,
    /// routines, and scalar constants (which are inlined at their use
    /// sites) do not.
    fn needs_storage(&self) -> bool {
        if self.is_type || self.ty.category() == Category::Function {
            return false;
        }
        !matches!(self.value, Some(Node::Const(..)))
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_type {
            "type"
        } else if self.is_const {
            "const"
        } else if self.by_ref {
            "ref"
        } else {
            "var"
        };
        f.write_fmt(format_args!(
            "{} {}: {} @{}",
            kind, self.name, self.ty, self.offset
        ))
    }
}

/// What kind of region a [`SymbolTable`] describes.  Offsets mean frame
/// slots for the first three and field positions for records.
#[derive(Clone, Debug, PartialEq)]
pub enum ScopeType {
    Program,
    Routine(String),
    Parameters(String),
    Record,
}

/// An ordered collection of symbols for one scope.  Order matters: offsets
/// follow declaration order, and record field initializers are matched
/// positionally.
#[derive(Clone, Debug, PartialEq)]
pub struct SymbolTable {
    ty: ScopeType,
    sym: Vec<Symbol>,
    frame_size: i32,
}

impl SymbolTable {
    pub fn new(ty: ScopeType) -> SymbolTable {
        SymbolTable {
            ty,
            sym: vec![],
            frame_size: 0,
        }
    }

    pub fn scope_type(&self) -> &ScopeType {
        &self.ty
    }

    pub fn table(&self) -> &[Symbol] {
        &self.sym
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.sym.iter().find(|s| s.name == name)
    }

    pub fn add(&mut self, sym: Symbol) -> Result<(), SemanticError> {
        if self.get(&sym.name).is_some() {
            return Err(SemanticError::AlreadyDeclared(sym.name));
        }
        debug!("{:?}: adding {}", self.ty, sym.name);
        self.sym.push(sym);
        Ok(())
    }

    pub fn size(&self) -> usize {
        self.sym.len()
    }

    /// Total bytes of all storage carrying entries, after
    /// [`compute_offsets`](Self::compute_offsets) has run.
    pub fn frame_size(&self) -> i32 {
        self.frame_size
    }

    /// Assigns every storage carrying entry its byte offset in declaration
    /// order and records the total.  Called once, when the scope closes.
    pub fn compute_offsets(&mut self) {
        let mut offset = 0;
        for sym in self.sym.iter_mut() {
            if !sym.needs_storage() {
                continue;
            }
            sym.offset = offset;
            offset += sym.stack_size();
        }
        self.frame_size = offset;
        debug!("{:?}: frame size {}", self.ty, self.frame_size);
    }
}

impl fmt::Display for SymbolTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("{:?} ({} bytes)\n", self.ty, self.frame_size))?;
        for sym in &self.sym {
            f.write_fmt(format_args!("    {}\n", sym))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test_symbol_table {
    use super::*;
    use crate::compiler::types::Type;

    #[test]
    fn test_offsets_follow_declaration_order() {
        let mut table = SymbolTable::new(ScopeType::Routine("f".into()));
        table.add(Symbol::var("a", Type::integer())).unwrap();
        table.add(Symbol::var("c", Type::chr())).unwrap();
        table.add(Symbol::var("d", Type::double())).unwrap();
        table.compute_offsets();

        assert_eq!(table.get("a").unwrap().offset, 0);
        assert_eq!(table.get("c").unwrap().offset, 4);
        assert_eq!(table.get("d").unwrap().offset, 5);
        assert_eq!(table.frame_size(), 13);
    }

    #[test]
    fn test_type_aliases_take_no_space() {
        let mut table = SymbolTable::new(ScopeType::Program);
        table
            .add(Symbol::type_alias("integer", Type::integer()))
            .unwrap();
        table.add(Symbol::var("x", Type::integer())).unwrap();
        table.compute_offsets();

        assert_eq!(table.get("x").unwrap().offset, 0);
        assert_eq!(table.frame_size(), 4);
    }

    #[test]
    fn test_by_ref_parameter_is_an_address() {
        let mut table = SymbolTable::new(ScopeType::Parameters("f".into()));
        table
            .add(Symbol::parameter("d", Type::double(), true, false))
            .unwrap();
        table.compute_offsets();

        assert_eq!(table.get("d").unwrap().stack_size(), 4);
        assert_eq!(table.frame_size(), 4);
    }

    #[test]
    fn test_duplicate_declaration() {
        let mut table = SymbolTable::new(ScopeType::Program);
        table.add(Symbol::var("x", Type::integer())).unwrap();
        assert_eq!(
            table.add(Symbol::var("x", Type::double())),
            Err(SemanticError::AlreadyDeclared("x".into()))
        );
    }
}
