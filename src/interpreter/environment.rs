use std::{
    cell::RefCell,
    collections::{HashMap, hash_map::Entry},
    rc::Rc,
};

use tracing::trace;

use crate::{error::LoxError, error::Result, object::Object, token::Token};

/// A scope is shared by every closure and call frame that can observe
/// assignments made through it, so it's always handled through this handle
/// rather than owned outright.
pub type EnvRef = Rc<RefCell<Environment>>;

#[derive(Default)]
pub struct Environment {
    values: HashMap<String, Object>,
    enclosing: Option<EnvRef>,
}

/// Manual impl: a derived one would recurse into each bound `Object`, and a
/// closure bound to the scope that declares it (every top-level fn/class)
/// makes that a cycle back through this same environment.
impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("names", &self.values.keys().collect::<Vec<_>>())
            .field("enclosing", &self.enclosing.is_some())
            .finish()
    }
}

impl Environment {
    pub fn new() -> EnvRef {
        Rc::new(RefCell::new(Self::default()))
    }

    pub fn with_enclosing(enclosing: EnvRef) -> EnvRef {
        trace!("with_enclosing");
        Rc::new(RefCell::new(Self {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }))
    }

    pub fn define(&mut self, name: String, value: Object) {
        trace!(?name, ?value, "defining");
        self.values.insert(name, value);
    }

    pub fn assign(&mut self, name: &Token, value: Object) -> Result<()> {
        trace!(?name, ?value, "assign()");
        match self.values.entry(name.lexeme.clone()) {
            Entry::Occupied(mut entry) => {
                entry.insert(value);
                Ok(())
            }
            Entry::Vacant(_) => {
                if let Some(ref outer) = self.enclosing {
                    outer.borrow_mut().assign(name, value)
                } else {
                    Err(LoxError::runtime(name, format!("Undefined variable '{}'.", name.lexeme)))
                }
            }
        }
    }

    pub fn get(&self, name: &Token) -> Result<Object> {
        trace!(?name, "get()");
        match self.values.get(&name.lexeme) {
            Some(val) => Ok(val.clone()),
            None => {
                if let Some(ref outer) = self.enclosing {
                    outer.borrow().get(name)
                } else {
                    Err(LoxError::runtime(name, format!("Undefined variable '{}'.", name.lexeme)))
                }
            }
        }
    }

    /// Walk `distance` `enclosing` links up from `env` and assign `name` there.
    /// `distance` comes straight from the resolver, so the ancestor is
    /// guaranteed to exist and to already hold `name`.
    pub fn assign_at(env: &EnvRef, distance: u8, name: &Token, value: Object) -> Result<()> {
        ancestor(env, distance).borrow_mut().values.insert(name.lexeme.clone(), value);
        Ok(())
    }

    pub fn get_at(env: &EnvRef, distance: u8, name: &str) -> Object {
        ancestor(env, distance)
            .borrow()
            .values
            .get(name)
            .cloned()
            .unwrap_or_else(|| panic!("resolved variable '{name}' missing at distance {distance}"))
    }
}

fn ancestor(env: &EnvRef, distance: u8) -> EnvRef {
    let mut current = env.clone();
    for _ in 0..distance {
        let next = current
            .borrow()
            .enclosing
            .clone()
            .expect("resolver distance exceeds the live scope chain");
        current = next;
    }
    current
}
