use std::{collections::HashMap, rc::Rc};

use crate::{
    error::Result,
    interpreter::Interpreter,
    lox_callable::LoxCallable,
    lox_function::LoxFunction,
    lox_instance::LoxInstance,
    object::Object,
};

#[derive(Clone)]
pub struct LoxClass {
    pub name: String,
    pub methods: HashMap<String, Rc<LoxFunction>>,
    pub superclass: Option<Rc<LoxClass>>,
}

impl std::fmt::Debug for LoxClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoxClass")
            .field("name", &self.name)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field("superclass", &self.superclass.as_ref().map(|s| &s.name))
            .finish()
    }
}

impl LoxClass {
    pub fn new(name: String, methods: HashMap<String, Rc<LoxFunction>>, superclass: Option<Rc<LoxClass>>) -> Self {
        Self { name, methods, superclass }
    }

    /// First match walking from `self` up through `superclass`.
    pub fn find_method(&self, name: &str) -> Option<Rc<LoxFunction>> {
        self.methods
            .get(name)
            .cloned()
            .or_else(|| self.superclass.as_ref().and_then(|s| s.find_method(name)))
    }
}

impl LoxCallable for LoxClass {
    fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Object>) -> Result<Object> {
        let class = Rc::new(self.clone());
        let instance = std::rc::Rc::new(std::cell::RefCell::new(LoxInstance::new(class.clone())));
        if let Some(initializer) = class.find_method("init") {
            initializer.bind(instance.clone()).call(interpreter, arguments)?;
        }
        Ok(Object::Instance(instance))
    }

    fn arity(&self) -> u8 {
        self.find_method("init").map(|init| init.arity()).unwrap_or(0)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn as_class(self: Rc<Self>) -> Option<Rc<LoxClass>> {
        Some(self)
    }
}

impl std::fmt::Display for LoxClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}
