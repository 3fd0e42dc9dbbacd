use std::{cell::RefCell, rc::Rc};

use crate::{
    error::{LoxError, Result},
    interpreter::{
        Interpreter,
        environment::{EnvRef, Environment},
    },
    lox_callable::LoxCallable,
    lox_instance::LoxInstance,
    object::Object,
    stmt,
};

#[derive(Debug)]
pub struct LoxFunction {
    declaration: Rc<stmt::Function>,
    closure: EnvRef,
    is_initializer: bool,
}

impl LoxFunction {
    pub fn new(declaration: Rc<stmt::Function>, closure: EnvRef, is_initializer: bool) -> Self {
        Self {
            declaration,
            closure,
            is_initializer,
        }
    }

    /// Produce a copy of this function whose closure layers a `this` binding
    /// to `instance` over the original closure, so a bound method carries its
    /// receiver wherever it's passed.
    pub fn bind(&self, instance: Rc<RefCell<LoxInstance>>) -> LoxFunction {
        let env = Environment::with_enclosing(self.closure.clone());
        env.borrow_mut().define("this".to_string(), Object::Instance(instance));
        LoxFunction {
            declaration: self.declaration.clone(),
            closure: env,
            is_initializer: self.is_initializer,
        }
    }
}

impl std::fmt::Display for LoxFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<fn {}>", self.declaration.name.lexeme)
    }
}

impl LoxCallable for LoxFunction {
    fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Object>) -> Result<Object> {
        let environment = Environment::with_enclosing(self.closure.clone());
        for (param, arg) in self.declaration.params.iter().zip(arguments) {
            environment.borrow_mut().define(param.lexeme.clone(), arg);
        }

        let this = || Environment::get_at(&self.closure, 0, "this");
        match interpreter.execute_block(&self.declaration.body, environment) {
            Ok(()) => Ok(if self.is_initializer { this() } else { Object::Nil }),
            Err(LoxError::Return { value }) => Ok(if self.is_initializer { this() } else { value }),
            Err(other) => Err(other),
        }
    }

    fn arity(&self) -> u8 {
        self.declaration.params.len() as u8
    }

    fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }
}
