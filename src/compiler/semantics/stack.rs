use log::debug;

use super::error::SemanticError;
use super::symbol_table::{Symbol, SymbolTable};

/// The stack of open scopes while the parser walks through the program.
/// Name lookups search from the innermost scope outwards.
#[derive(Debug)]
pub struct ScopeStack {
    stack: Vec<SymbolTable>,
}

impl ScopeStack {
    pub fn new() -> ScopeStack {
        ScopeStack { stack: vec![] }
    }

    pub fn enter_scope(&mut self, table: SymbolTable) {
        debug!("entering scope {:?}", table.scope_type());
        self.stack.push(table);
    }

    pub fn leave_scope(&mut self) -> SymbolTable {
        match self.stack.pop() {
            Some(table) => {
                debug!("leaving scope {:?}", table.scope_type());
                table
            }
            None => panic!("CRITICAL: left more scopes than were entered"),
        }
    }

    pub fn current_mut(&mut self) -> &mut SymbolTable {
        match self.stack.last_mut() {
            Some(table) => table,
            None => panic!("CRITICAL: no open scope"),
        }
    }

    /// Declares a symbol in the innermost scope.
    pub fn add(&mut self, sym: Symbol) -> Result<(), SemanticError> {
        self.current_mut().add(sym)
    }

    /// Finds the nearest declaration of `name`, walking outwards.
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.stack.iter().rev().find_map(|table| table.get(name))
    }

    /// Finds a declaration of `name` in the innermost scope only.
    pub fn lookup_current(&self, name: &str) -> Option<&Symbol> {
        self.stack.last().and_then(|table| table.get(name))
    }
}

#[cfg(test)]
mod test_stack {
    use super::*;
    use crate::compiler::semantics::symbol_table::ScopeType;
    use crate::compiler::types::Type;

    #[test]
    fn test_inner_scope_shadows_outer() {
        let mut scopes = ScopeStack::new();
        scopes.enter_scope(SymbolTable::new(ScopeType::Program));
        scopes.add(Symbol::var("x", Type::integer())).unwrap();

        scopes.enter_scope(SymbolTable::new(ScopeType::Routine("f".into())));
        scopes.add(Symbol::var("x", Type::double())).unwrap();

        assert_eq!(scopes.lookup("x").unwrap().ty, Type::double());
        scopes.leave_scope();
        assert_eq!(scopes.lookup("x").unwrap().ty, Type::integer());
    }

    #[test]
    fn test_current_lookup_ignores_outer_scopes() {
        let mut scopes = ScopeStack::new();
        scopes.enter_scope(SymbolTable::new(ScopeType::Program));
        scopes.add(Symbol::var("x", Type::integer())).unwrap();

        scopes.enter_scope(SymbolTable::new(ScopeType::Routine("f".into())));
        assert!(scopes.lookup("x").is_some());
        assert!(scopes.lookup_current("x").is_none());
    }

    #[test]
    fn test_lookup_misses() {
        let mut scopes = ScopeStack::new();
        scopes.enter_scope(SymbolTable::new(ScopeType::Program));
        assert!(scopes.lookup("nope").is_none());
    }
}
