use snafu::Snafu;

use crate::{object::Object, token::Token, token_type::TokenType};

/// The crate-wide error taxonomy. Scan/parse errors and runtime errors are
/// kept apart so the CLI driver can tell compile-time failures (exit 65)
/// from runtime failures (exit 70) apart; `Return` is a control-flow signal
/// piggybacking on the same `Result` channel rather than a real error.
#[derive(Debug, Snafu)]
pub enum LoxError {
    #[snafu(display("[line {line}] Error{whence}: {message}"))]
    Parsing { line: usize, whence: String, message: String },

    #[snafu(display("{message}\n[line {}]", token.line))]
    Runtime { token: Token, message: String },

    #[snafu(display("Could not read source file at '{path}'"), visibility(pub))]
    File { source: std::io::Error, path: String },

    #[snafu(display("One or more errors while scanning"))]
    Fatal,

    #[snafu(display(""))]
    Return { value: Object },
}

impl LoxError {
    pub fn runtime(token: &Token, message: impl Into<String>) -> LoxError {
        LoxError::Runtime {
            token: token.clone(),
            message: message.into(),
        }
    }

    /// Render a compile-time diagnostic's "where" clause the way `error()`
    /// in the reference scanner/parser does: empty for a pure scanner error,
    /// `" at end"` at EOF, `" at '<lexeme>'"` otherwise.
    pub fn at_token(token: &Token, message: impl Into<String>) -> LoxError {
        let whence = match token.typ {
            TokenType::Eof => " at end".to_string(),
            _ => format!(" at '{}'", token.lexeme),
        };
        LoxError::Parsing {
            line: token.line,
            whence,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LoxError>;
