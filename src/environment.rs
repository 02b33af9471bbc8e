use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Shared handle to a scope. Closures keep the scope they were created in
/// alive for as long as they are reachable.
pub type Env = Rc<RefCell<Environment>>;

#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Env>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: Env) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Fresh child scope of `enclosing`, already wrapped in a handle.
    pub fn child(enclosing: &Env) -> Env {
        Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(enclosing))))
    }

    pub fn enclosing(&self) -> Option<Env> {
        self.enclosing.clone()
    }

    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Look `name` up in exactly this scope.
    pub fn get_here(&self, name: &str) -> Option<Value> {
        self.values.get(name).cloned()
    }

    pub fn assign_here(&mut self, name: &str, value: Value) -> bool {
        match self.values.get_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}

/// The scope `depth` links outward from `env`.
pub fn ancestor(env: &Env, depth: usize) -> Option<Env> {
    let mut current: Env = Rc::clone(env);

    for _ in 0..depth {
        let next: Option<Env> = current.borrow().enclosing();
        current = next?;
    }

    Some(current)
}

/// Read `name` from the scope exactly `depth` links outward.
pub fn get_at(env: &Env, depth: usize, name: &str) -> Option<Value> {
    ancestor(env, depth)?.borrow().get_here(name)
}

/// Assign `name` in the scope exactly `depth` links outward.
pub fn assign_at(env: &Env, depth: usize, name: &str, value: Value) -> bool {
    match ancestor(env, depth) {
        Some(scope) => scope.borrow_mut().assign_here(name, value),
        None => false,
    }
}
