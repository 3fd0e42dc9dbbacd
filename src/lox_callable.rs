use std::rc::Rc;

use crate::{error::Result, interpreter::Interpreter, lox_class::LoxClass, object::Object};

/// Capability shared by native functions, user-defined functions, and
/// classes (whose "call" constructs an instance).
pub trait LoxCallable: std::fmt::Display + std::fmt::Debug {
    fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Object>) -> Result<Object>;
    fn arity(&self) -> u8;
    fn name(&self) -> &str;

    /// Narrows a `Callable` back to the `LoxClass` it wraps, if any. Used by
    /// `superclass` resolution, which needs the concrete class rather than
    /// just something callable.
    fn as_class(self: Rc<Self>) -> Option<Rc<LoxClass>> {
        None
    }
}
