use std::{cell::RefCell, collections::HashMap, rc::Rc};

use crate::{error::LoxError, error::Result, lox_class::LoxClass, object::Object, token::Token};

pub struct LoxInstance {
    class: Rc<LoxClass>,
    fields: HashMap<String, Object>,
}

/// Manual impl: a field can hold the instance itself (`this.self = this;`),
/// so a derived impl recursing into field values could never terminate.
impl std::fmt::Debug for LoxInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoxInstance")
            .field("class", &self.class.name)
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl LoxInstance {
    pub fn new(class: Rc<LoxClass>) -> Self {
        Self {
            class,
            fields: HashMap::new(),
        }
    }

    /// Fields shadow methods; an unbound method is bound to `instance` (a
    /// handle to the very cell this body lives inside) on lookup.
    pub fn get(instance: &Rc<RefCell<LoxInstance>>, name: &Token) -> Result<Object> {
        let this = instance.borrow();
        if let Some(value) = this.fields.get(&name.lexeme) {
            return Ok(value.clone());
        }
        if let Some(method) = this.class.find_method(&name.lexeme) {
            drop(this);
            return Ok(Object::Callable(Rc::new(method.bind(instance.clone()))));
        }
        Err(LoxError::runtime(name, format!("Undefined property '{}'.", name.lexeme)))
    }

    pub fn set(instance: &Rc<RefCell<LoxInstance>>, name: &Token, value: Object) {
        instance.borrow_mut().fields.insert(name.lexeme.clone(), value);
    }
}

impl std::fmt::Display for LoxInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} instance", self.class)
    }
}
