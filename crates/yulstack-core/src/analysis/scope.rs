use super::info::FunctionSignature;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Symbol {
    Variable { ty: String },
    Function(FunctionSignature),
}

#[derive(Debug, Default)]
pub struct Scope {
    symbols: HashMap<String, Symbol>,
    function_boundary: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Visible(Symbol),
    /// A variable exists but was declared outside the enclosing function.
    OutsideFunction,
    Missing,
}

#[derive(Debug, Default)]
pub struct ScopeStack {
    scopes: Vec<Scope>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, function_boundary: bool) {
        self.scopes.push(Scope {
            symbols: HashMap::new(),
            function_boundary,
        });
    }

    pub fn pop(&mut self) {
        self.scopes.pop();
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Yul forbids shadowing, even of variables that a function body cannot access.
    pub fn is_declared(&self, name: &str) -> bool {
        self.scopes
            .iter()
            .any(|scope| scope.symbols.contains_key(name))
    }

    pub fn insert(&mut self, name: impl Into<String>, symbol: Symbol) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.symbols.insert(name.into(), symbol);
        }
    }

    pub fn lookup(&self, name: &str) -> Lookup {
        let mut crossed_function = false;
        for scope in self.scopes.iter().rev() {
            if let Some(symbol) = scope.symbols.get(name) {
                return match symbol {
                    Symbol::Variable { .. } if crossed_function => Lookup::OutsideFunction,
                    _ => Lookup::Visible(symbol.clone()),
                };
            }
            if scope.function_boundary {
                crossed_function = true;
            }
        }
        Lookup::Missing
    }
}
