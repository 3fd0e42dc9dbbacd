use crate::{error::LoxError, error::Result, interpreter::Interpreter, lox_callable::LoxCallable, object::Object, token::Token, token_type::TokenType};

/// Lets `.lox` scripts assert on their own output without going through
/// stdout — the driver for the teacher's test harness and ours alike.
#[derive(Debug)]
pub struct LoxAssertEq;

impl std::fmt::Display for LoxAssertEq {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<native fn>")
    }
}

impl LoxCallable for LoxAssertEq {
    fn call(&self, _interpreter: &mut Interpreter, arguments: Vec<Object>) -> Result<Object> {
        let token = Token::new(TokenType::Identifier, "assert_eq", ().into(), 0);
        let first = &arguments[0];
        let second = &arguments[1];
        if first == second {
            Ok(Object::Nil)
        } else {
            Err(LoxError::runtime(&token, format!("Assertion failed: {first} != {second}")))
        }
    }

    fn arity(&self) -> u8 {
        2
    }

    fn name(&self) -> &str {
        "assert_eq"
    }
}
