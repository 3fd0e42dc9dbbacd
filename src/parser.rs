use crate::{
    error::{LoxError, Result},
    expr::{Assign, Binary, Call, Expr, Get, Grouping, Literal, Logical, NodeId, Set, Super, This, Unary, Variable},
    stmt::{Block, Class, Expression, Function, If, Print, Return, Stmt, Var, While},
    token::Token,
    token_type::TokenType,
};

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    next_node_id: u32,
    had_error: bool,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            current: 0,
            next_node_id: 0,
            had_error: false,
        }
    }

    pub fn parse(&mut self) -> Result<Vec<Stmt>> {
        let mut statements: Vec<Stmt> = Vec::new();
        while !self.is_at_end() {
            match self.declaration() {
                Ok(stmt) => statements.push(stmt),
                Err(e) => {
                    self.had_error = true;
                    self.synchronize();
                    eprintln!("Parsing error {e}");
                }
            }
        }
        if self.had_error { Err(LoxError::Fatal) } else { Ok(statements) }
    }

    fn next_id(&mut self) -> NodeId {
        let id = NodeId(self.next_node_id);
        self.next_node_id += 1;
        id
    }

    /// Report a diagnostic without raising — the caller keeps parsing
    /// (invalid assignment target, too many args/params) instead of
    /// dropping the whole statement the way a raised error would.
    fn report(&mut self, token: &Token, message: &str) {
        self.had_error = true;
        eprintln!("{}", error(token, message));
    }
}

// Declarations
impl Parser {
    fn declaration(&mut self) -> Result<Stmt> {
        if self.match_advance(&[TokenType::Class]) {
            self.class_declaration()
        } else if self.match_advance(&[TokenType::Fun]) {
            self.function("function")
        } else if self.match_advance(&[TokenType::Var]) {
            self.var_declaration()
        } else {
            self.statement()
        }
    }

    fn class_declaration(&mut self) -> Result<Stmt> {
        let name = self.consume(TokenType::Identifier, "Expect class name.")?;

        let superclass = if self.match_advance(&[TokenType::Less]) {
            let super_name = self.consume(TokenType::Identifier, "Expect superclass name.")?;
            Some(Variable {
                id: self.next_id(),
                name: super_name,
            })
        } else {
            None
        };

        self.consume(TokenType::LeftBrace, "Expect '{' before class body.")?;

        let mut methods = Vec::new();
        while !self.check(&TokenType::RightBrace) && !self.is_at_end() {
            let Stmt::Function(method) = self.function("method")? else {
                unreachable!("function() always returns Stmt::Function");
            };
            methods.push(method);
        }

        self.consume(TokenType::RightBrace, "Expect '}' after class body.")?;

        Ok(Class::stmt(name, superclass, methods))
    }

    /// Shared by top-level `fun` declarations and class methods; `kind` only
    /// changes the wording of the error message.
    fn function(&mut self, kind: &str) -> Result<Stmt> {
        let name = self.consume(TokenType::Identifier, &format!("Expect {kind} name."))?;
        self.consume(TokenType::LeftParen, &format!("Expect '(' after {kind} name."))?;
        let mut params = Vec::new();
        if !self.check(&TokenType::RightParen) {
            loop {
                if params.len() >= 255 {
                    let tok = self.peek().clone();
                    self.report(&tok, "Can't have more than 255 parameters.");
                }
                params.push(self.consume(TokenType::Identifier, "Expect parameter name.")?);
                if !self.match_advance(&[TokenType::Comma]) {
                    break;
                }
            }
        }
        self.consume(TokenType::RightParen, "Expect ')' after parameters.")?;

        self.consume(TokenType::LeftBrace, &format!("Expect '{{' before {kind} body."))?;
        let body = self.block()?;

        Ok(Function::stmt(name, params, body))
    }

    fn var_declaration(&mut self) -> Result<Stmt> {
        let name = self.consume(TokenType::Identifier, "Expect variable name.")?;
        let initializer = if self.match_advance(&[TokenType::Equal]) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenType::Semicolon, "Expect ';' after variable declaration")?;

        Ok(Var::stmt(name, initializer))
    }
}

// Statements
impl Parser {
    fn statement(&mut self) -> Result<Stmt> {
        if self.match_advance(&[TokenType::Print]) {
            return self.print_statement();
        }
        if self.match_advance(&[TokenType::Return]) {
            return self.return_statement();
        }
        if self.match_advance(&[TokenType::While]) {
            return self.while_statement();
        }
        if self.match_advance(&[TokenType::LeftBrace]) {
            return Ok(Block::stmt(self.block()?));
        }
        if self.match_advance(&[TokenType::If]) {
            return self.if_statement();
        }
        if self.match_advance(&[TokenType::For]) {
            return self.for_statement();
        }
        self.expression_statement()
    }

    fn print_statement(&mut self) -> Result<Stmt> {
        let value = self.expression()?;
        self.consume(TokenType::Semicolon, "Expect ';' after value")?;
        Ok(Print::stmt(value))
    }

    fn return_statement(&mut self) -> Result<Stmt> {
        let keyword = self.previous();
        let value = if self.check(&TokenType::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenType::Semicolon, "Expect ';' after return value.")?;
        Ok(Return::stmt(keyword, value))
    }

    fn while_statement(&mut self) -> Result<Stmt> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'while'.")?;
        let condition = self.expression()?;
        self.consume(TokenType::RightParen, "Expect ')' after condition.")?;
        let body = self.statement()?;

        Ok(While::stmt(condition, body))
    }

    fn if_statement(&mut self) -> Result<Stmt> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'if'.")?;
        let condition = self.expression()?;
        self.consume(TokenType::RightParen, "Expect ')' after if condition")?;

        let then_branch = self.statement()?;
        let else_branch = if self.match_advance(&[TokenType::Else]) {
            Some(self.statement()?)
        } else {
            None
        };

        Ok(If::stmt(condition, then_branch, else_branch))
    }

    /// De-sugar a for statement into a while statement
    fn for_statement(&mut self) -> Result<Stmt> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'for'.")?;
        let initializer = match self.peek().typ {
            TokenType::Semicolon => {
                self.advance();
                None
            }
            TokenType::Var => {
                self.advance();
                Some(self.var_declaration()?)
            }
            _ => Some(self.expression_statement()?),
        };

        let condition = match self.check(&TokenType::Semicolon) {
            true => Literal::expr(true.into()),
            false => self.expression()?,
        };
        self.consume(TokenType::Semicolon, "Expect ';' after loop condition")?;

        let increment = match self.check(&TokenType::RightParen) {
            true => None,
            false => Some(self.expression()?),
        };
        self.consume(TokenType::RightParen, "Expect ')' after for clauses.")?;

        let mut body = self.statement()?;

        if let Some(incr) = increment {
            body = Block::stmt(vec![body, Expression::stmt(incr)]);
        }
        body = While::stmt(condition, body);

        if let Some(init) = initializer {
            body = Block::stmt(vec![init, body]);
        }

        Ok(body)
    }

    fn expression_statement(&mut self) -> Result<Stmt> {
        let expr = self.expression()?;
        self.consume(TokenType::Semicolon, "Expect ';' after expression")?;
        Ok(Expression::stmt(expr))
    }

    fn block(&mut self) -> Result<Vec<Stmt>> {
        let mut statements: Vec<Stmt> = Vec::new();
        while !self.check(&TokenType::RightBrace) && !self.is_at_end() {
            statements.push(self.declaration()?);
        }

        self.consume(TokenType::RightBrace, "Expect '}' after block.")?;

        Ok(statements)
    }
}

// Expressions
impl Parser {
    fn expression(&mut self) -> Result<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr> {
        let expr = self.or()?;

        if self.match_advance(&[TokenType::Equal]) {
            let equals = self.previous();
            let value = self.assignment()?;

            return Ok(match expr {
                Expr::Variable(var) => Assign::expr(var.id, var.name, value),
                Expr::Get(get) => Set::expr(*get.object, get.name, value),
                other => {
                    self.report(&equals, "Invalid assignment target.");
                    other
                }
            });
        }

        Ok(expr)
    }

    fn or(&mut self) -> Result<Expr> {
        let mut expr = self.and()?;

        while self.match_advance(&[TokenType::Or]) {
            let operator = self.previous();
            let right = self.and()?;
            expr = Logical::expr(expr, operator, right);
        }

        Ok(expr)
    }

    fn and(&mut self) -> Result<Expr> {
        let mut expr = self.equality()?;

        while self.match_advance(&[TokenType::And]) {
            let operator = self.previous();
            let right = self.equality()?;
            expr = Logical::expr(expr, operator, right);
        }

        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expr> {
        let mut expr = self.comparison()?;

        while self.match_advance(&[TokenType::BangEqual, TokenType::EqualEqual]) {
            let operator = self.previous();
            let right = self.comparison()?;
            expr = Binary::expr(expr, operator, right);
        }

        Ok(expr)
    }

    fn comparison(&mut self) -> Result<Expr> {
        let mut expr = self.term()?;
        while self.match_advance(&[TokenType::Greater, TokenType::GreaterEqual, TokenType::Less, TokenType::LessEqual]) {
            let operator = self.previous();
            let right = self.term()?;
            expr = Binary::expr(expr, operator, right);
        }

        Ok(expr)
    }

    fn term(&mut self) -> Result<Expr> {
        let mut expr = self.factor()?;
        while self.match_advance(&[TokenType::Minus, TokenType::Plus]) {
            let operator = self.previous();
            let right = self.factor()?;
            expr = Binary::expr(expr, operator, right);
        }

        Ok(expr)
    }

    fn factor(&mut self) -> Result<Expr> {
        let mut expr = self.unary()?;
        while self.match_advance(&[TokenType::Slash, TokenType::Star]) {
            let operator = self.previous();
            let right = self.unary()?;
            expr = Binary::expr(expr, operator, right);
        }

        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.match_advance(&[TokenType::Bang, TokenType::Minus]) {
            let operator = self.previous();
            let right = self.unary()?;
            return Ok(Unary::expr(operator, right));
        }
        self.call()
    }

    fn call(&mut self) -> Result<Expr> {
        let mut expr = self.primary()?;

        loop {
            if self.match_advance(&[TokenType::LeftParen]) {
                expr = self.finish_call(expr)?;
            } else if self.match_advance(&[TokenType::Dot]) {
                let name = self.consume(TokenType::Identifier, "Expect property name after '.'.")?;
                expr = Get::expr(expr, name);
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> Result<Expr> {
        let mut arguments = Vec::new();
        if !self.check(&TokenType::RightParen) {
            loop {
                if arguments.len() >= 255 {
                    let tok = self.peek().clone();
                    self.report(&tok, "Can't have more than 255 arguments.");
                }
                arguments.push(self.expression()?);
                if !self.match_advance(&[TokenType::Comma]) {
                    break;
                }
            }
        }

        let paren = self.consume(TokenType::RightParen, "Expect ')' after arguments.")?;

        Ok(Call::expr(callee, paren, arguments))
    }

    fn primary(&mut self) -> Result<Expr> {
        match self.advance().typ {
            TokenType::False => Ok(Literal::expr(false.into())),
            TokenType::True => Ok(Literal::expr(true.into())),
            TokenType::Nil => Ok(Literal::expr(().into())),
            TokenType::Number | TokenType::String => Ok(Literal::expr(self.previous().literal.clone().into())),
            TokenType::Super => {
                let keyword = self.previous();
                self.consume(TokenType::Dot, "Expect '.' after 'super'.")?;
                let method = self.consume(TokenType::Identifier, "Expect superclass method name.")?;
                Ok(Super::expr(self.next_id(), keyword, method))
            }
            TokenType::This => Ok(This::expr(self.next_id(), self.previous())),
            TokenType::Identifier => Ok(Variable::expr(self.next_id(), self.previous())),
            TokenType::LeftParen => {
                let expr = self.expression()?;
                self.consume(TokenType::RightParen, "Expected ')' after expression.")?;
                Ok(Grouping::expr(expr))
            }
            _ => Err(error(&self.previous(), "Expected an expression")),
        }
    }
}

// Helpers
impl Parser {
    fn previous(&self) -> Token {
        self.tokens[self.current - 1].clone()
    }

    fn consume(&mut self, typ: TokenType, msg: &str) -> Result<Token> {
        if self.check(&typ) {
            return Ok(self.advance());
        }

        Err(error(self.peek(), msg))
    }

    /// If any of the token types are the next token, advance and return true
    /// Otherwise, return false and do not advance
    fn match_advance(&mut self, typs: &[TokenType]) -> bool {
        if typs.iter().any(|t| self.check(t)) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn check(&self, typ: &TokenType) -> bool {
        if self.is_at_end() {
            return false;
        }

        &self.peek().typ == typ
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    /// Returns the next token and advances over it (if not at the end)
    fn advance(&mut self) -> Token {
        if !self.is_at_end() {
            self.current += 1
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        self.peek().typ == TokenType::Eof
    }

    fn synchronize(&mut self) {
        self.advance();

        while !self.is_at_end() {
            if self.previous().typ == TokenType::Semicolon {
                return;
            }
            match self.peek().typ {
                TokenType::Class
                | TokenType::Fun
                | TokenType::Var
                | TokenType::For
                | TokenType::If
                | TokenType::While
                | TokenType::Print
                | TokenType::Return => {
                    return;
                }
                _ => {
                    self.advance();
                }
            }
        }
    }
}

fn error(token: &Token, message: &str) -> LoxError {
    LoxError::at_token(token, message)
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::scanner::Scanner;

    fn parser_for(source: &str) -> Parser {
        let tokens = Scanner::new(source.to_string()).scan_tokens().expect("scan should succeed");
        Parser::new(tokens)
    }

    #[test]
    fn invalid_assignment_target_is_reported_but_does_not_raise() {
        let mut parser = parser_for("1 = 2;");
        let expr = parser.expression_statement().expect("assignment() must not raise");
        assert!(matches!(expr, Stmt::Expression(_)));
        assert!(parser.had_error);
    }

    #[test]
    fn over_255_params_reports_but_keeps_parsing_the_rest() {
        let params: Vec<String> = (0..300).map(|i| format!("p{i}")).collect();
        let source = format!("f({}) {{}}", params.join(", "));
        let mut parser = parser_for(&source);
        let stmt = parser.function("function").expect("function() must not raise");
        let Stmt::Function(func) = stmt else { panic!("expected a function statement") };
        assert_eq!(func.params.len(), 300);
        assert!(parser.had_error);
    }
}
