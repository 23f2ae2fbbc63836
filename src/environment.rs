use crate::types::Type;
use crate::value::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct Binding {
    pub ty: Type,
    pub value: Value,
}

/// Local variables of one method activation, innermost scope last.
#[derive(Debug)]
pub struct Environment {
    values: Vec<BTreeMap<String, Binding>>,
}

impl Environment {
    pub fn new() -> Environment {
        Environment {
            values: vec![BTreeMap::new()],
        }
    }
    pub fn start_block(&mut self) {
        self.values.push(BTreeMap::new());
    }
    pub fn end_block(&mut self) {
        // The base scope holds the parameters and lives as long as the call.
        if self.values.len() > 1 {
            self.values.pop();
        }
    }
    pub fn define(&mut self, name: &str, ty: Type, value: Value) {
        if let Some(scope) = self.values.last_mut() {
            scope.insert(name.to_string(), Binding { ty, value });
        }
    }
    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.values.iter().rev().find_map(|scope| scope.get(name))
    }
    /// Overwrites the innermost binding of `name`. Returns false if the name
    /// is not bound in any scope.
    pub fn assign(&mut self, name: &str, value: Value) -> bool {
        for cur in self.values.iter_mut().rev() {
            if let Some(x) = cur.get_mut(name) {
                x.value = value;
                return true;
            }
        }
        false
    }
}

impl Default for Environment {
    fn default() -> Self {
        Environment::new()
    }
}
