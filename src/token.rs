use ordered_float::OrderedFloat;

use crate::token_type::TokenType;

/// The value a `NUMBER` or `STRING` token carries. Distinct from the
/// interpreter's runtime `Object`: a token's literal is fixed at scan time,
/// an `Object` is whatever a running program computes.
#[derive(Clone, Eq, Hash, PartialEq)]
pub enum Literal {
    Null,
    Number(OrderedFloat<f64>),
    String(String),
}

impl From<()> for Literal {
    fn from(_: ()) -> Self {
        Literal::Null
    }
}

impl std::fmt::Debug for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Null => write!(f, "nil"),
            Literal::Number(n) => write!(f, "{n}"),
            Literal::String(s) => write!(f, "{s:?}"),
        }
    }
}

#[derive(Clone, Eq)]
pub struct Token {
    pub typ: TokenType,
    pub lexeme: String,
    pub literal: Literal,
    pub line: usize,
}

/// Two tokens are equivalent if kind, lexeme, and literal match; `line` is
/// excluded so a token compares equal to itself regardless of where a later
/// pass re-scans or relocates it.
impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.typ == other.typ && self.lexeme == other.lexeme && self.literal == other.literal
    }
}

impl std::hash::Hash for Token {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.typ.hash(state);
        self.lexeme.hash(state);
        self.literal.hash(state);
    }
}

impl Token {
    pub fn new(typ: TokenType, lexeme: &str, literal: Literal, line: usize) -> Token {
        Token {
            typ,
            lexeme: lexeme.to_string(),
            literal,
            line,
        }
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.typ {
            TokenType::Greater => write!(f, ">"),
            TokenType::Less => write!(f, "<"),
            TokenType::Minus => write!(f, "-"),
            TokenType::Plus => write!(f, "+"),
            TokenType::EqualEqual => write!(f, "=="),
            TokenType::Identifier => write!(f, "{}{{ {:?} }}[L{}]", self.lexeme, self.literal, self.line),
            _ => f
                .debug_struct("Token")
                .field("typ", &self.typ)
                .field("lexeme", &self.lexeme)
                .field("literal", &self.literal)
                .field("line", &&self.line)
                .finish(),
        }
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} {} {:?}", self.typ, self.lexeme, self.literal)
    }
}
