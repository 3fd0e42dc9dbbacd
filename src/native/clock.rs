use std::time::SystemTime;

use crate::{error::Result, interpreter::Interpreter, lox_callable::LoxCallable, object::Object};

#[derive(Debug)]
pub struct LoxClock;

impl std::fmt::Display for LoxClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<native fn>")
    }
}

impl LoxCallable for LoxClock {
    fn call(&self, _interpreter: &mut Interpreter, _arguments: Vec<Object>) -> Result<Object> {
        let secs = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .expect("system clock is before the Unix epoch")
            .as_secs_f64();
        Ok(Object::from(secs))
    }

    fn arity(&self) -> u8 {
        0
    }

    fn name(&self) -> &str {
        "clock"
    }
}
