use std::collections::HashMap;

use tracing::trace;

use super::Interpreter;
use crate::{
    error::{LoxError, Result},
    expr::{Expr, NodeId},
    stmt::{self, Stmt},
    token::Token,
};

pub struct Resolver<'a> {
    interpreter: &'a mut Interpreter,
    scopes: Vec<HashMap<String, bool>>,
    curr_fn: FunctionType,
    curr_class: ClassType,
}

#[derive(Clone, Copy, PartialEq)]
enum FunctionType {
    None,
    Function,
    Method,
    Initializer,
}

#[derive(Clone, Copy, PartialEq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

impl<'a> Resolver<'a> {
    pub fn new(interpreter: &'a mut Interpreter) -> Self {
        Self {
            interpreter,
            scopes: vec![],
            curr_fn: FunctionType::None,
            curr_class: ClassType::None,
        }
    }

    pub fn resolve_all(&mut self, statements: &[Stmt]) -> Result<()> {
        let mut had_error = false;
        for statement in statements {
            if let Err(err) = self.resolve_stmt(statement).inspect_err(|_| had_error = true) {
                // Keep going with the analysis, error at the end.
                eprintln!("{}", err);
            }
        }

        if had_error {
            return Err(LoxError::Fatal);
        }
        Ok(())
    }
}

// Expressions
impl Resolver<'_> {
    fn resolve_expr(&mut self, expr: &Expr) -> Result<()> {
        trace!(?expr, "Resolving expression");
        match expr {
            Expr::Variable(var) => {
                if self.scopes.last().and_then(|s| s.get(&var.name.lexeme)) == Some(&false) {
                    return Err(error(
                        &var.name,
                        format!("Can't read local variable '{}' in its own initializer.", var.name.lexeme),
                    ));
                }

                self.resolve_local(var.id, &var.name.lexeme);
            }
            Expr::Assign(assign) => {
                self.resolve_expr(&assign.value)?;
                self.resolve_local(assign.id, &assign.name.lexeme);
            }
            Expr::Binary(binary) => {
                self.resolve_expr(&binary.left)?;
                self.resolve_expr(&binary.right)?;
            }
            Expr::Call(call) => {
                self.resolve_expr(&call.callee)?;
                for arg in call.arguments.iter() {
                    self.resolve_expr(arg)?;
                }
            }
            Expr::Get(get) => {
                self.resolve_expr(&get.object)?;
            }
            Expr::Set(set) => {
                self.resolve_expr(&set.value)?;
                self.resolve_expr(&set.object)?;
            }
            Expr::Grouping(group) => {
                self.resolve_expr(&group.expression)?;
            }
            Expr::Literal(_) => (),
            Expr::Logical(logic) => {
                self.resolve_expr(&logic.left)?;
                self.resolve_expr(&logic.right)?;
            }
            Expr::Unary(unary) => self.resolve_expr(&unary.right)?,
            Expr::This(this) => {
                if self.curr_class == ClassType::None {
                    return Err(error(&this.keyword, "Can't use 'this' outside of a class."));
                }
                self.resolve_local(this.id, "this");
            }
            Expr::Super(sup) => {
                match self.curr_class {
                    ClassType::None => return Err(error(&sup.keyword, "Can't use 'super' outside of a class.")),
                    ClassType::Class => {
                        return Err(error(&sup.keyword, "Can't use 'super' in a class with no superclass."));
                    }
                    ClassType::Subclass => (),
                }
                self.resolve_local(sup.id, "super");
            }
        }
        Ok(())
    }
}

// Statements
impl Resolver<'_> {
    fn resolve_stmt(&mut self, statement: &Stmt) -> Result<()> {
        trace!(?statement, "Resolving statement");
        match statement {
            Stmt::Var(var) => {
                self.declare(&var.name)?;
                if let Some(initializer) = &var.initializer {
                    self.resolve_expr(initializer)?;
                }
                self.define(&var.name.lexeme);
            }
            Stmt::Function(func) => {
                self.declare(&func.name)?;
                self.define(&func.name.lexeme);

                self.resolve_func(func, FunctionType::Function)?;
            }
            Stmt::Expression(expr) => self.resolve_expr(&expr.expression)?,
            Stmt::If(stmt) => {
                self.resolve_expr(&stmt.condition)?;
                self.resolve_stmt(&stmt.then_branch)?;
                if let Some(else_branch) = &stmt.else_branch {
                    self.resolve_stmt(else_branch)?;
                }
            }
            Stmt::Print(stmt) => {
                self.resolve_expr(&stmt.expression)?;
            }
            Stmt::Return(stmt) => {
                if let FunctionType::None = self.curr_fn {
                    return Err(error(&stmt.keyword, "Can't return from top-level code."));
                }
                if let Some(val) = &stmt.value {
                    if self.curr_fn == FunctionType::Initializer {
                        return Err(error(&stmt.keyword, "Can't return a value from an initializer."));
                    }
                    self.resolve_expr(val)?;
                }
            }
            Stmt::While(stmt) => {
                self.resolve_expr(&stmt.condition)?;
                self.resolve_stmt(&stmt.body)?;
            }
            Stmt::Block(block) => {
                self.begin_scope();
                self.resolve_all(&block.statements)?;
                self.end_scope();
            }
            Stmt::Class(stmt) => self.resolve_class(stmt)?,
        }
        Ok(())
    }

    fn resolve_class(&mut self, stmt: &stmt::Class) -> Result<()> {
        let enclosing_class = self.curr_class;
        self.curr_class = ClassType::Class;

        self.declare(&stmt.name)?;
        self.define(&stmt.name.lexeme);

        if let Some(superclass) = &stmt.superclass {
            if superclass.name.lexeme == stmt.name.lexeme {
                return Err(error(&superclass.name, "A class can't inherit from itself."));
            }
            self.curr_class = ClassType::Subclass;
            self.resolve_local(superclass.id, &superclass.name.lexeme);
        }

        if stmt.superclass.is_some() {
            self.begin_scope();
            self.scopes.last_mut().expect("just began a scope").insert("super".to_string(), true);
        }

        self.begin_scope();
        self.scopes.last_mut().expect("just began a scope").insert("this".to_string(), true);

        for method in stmt.methods.iter() {
            let declaration = if method.name.lexeme == "init" {
                FunctionType::Initializer
            } else {
                FunctionType::Method
            };
            self.resolve_func(method, declaration)?;
        }

        self.end_scope();

        if stmt.superclass.is_some() {
            self.end_scope();
        }

        self.curr_class = enclosing_class;
        Ok(())
    }

    fn resolve_func(&mut self, func: &stmt::Function, typ: FunctionType) -> Result<()> {
        let enclosing_fn = self.curr_fn;
        self.curr_fn = typ;
        self.begin_scope();
        for param in func.params.iter() {
            self.declare(param)?;
            self.define(&param.lexeme);
        }
        self.resolve_all(&func.body)?;
        self.end_scope();
        self.curr_fn = enclosing_fn;
        Ok(())
    }
}

// Helpers
impl Resolver<'_> {
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &Token) -> Result<()> {
        if self.scopes.is_empty() {
            return Ok(());
        }

        let scope = self.scopes.last_mut().expect("just checked non-empty");
        if scope.contains_key(&name.lexeme) {
            return Err(error(name, format!("Already a variable named '{}' in this scope.", name.lexeme)));
        }
        scope.insert(name.lexeme.clone(), false);
        Ok(())
    }

    fn define(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), true);
        }
    }

    fn resolve_local(&mut self, id: NodeId, name: &str) {
        let top = self.scopes.len();
        for i in (0..top).rev() {
            if self.scopes[i].contains_key(name) {
                let depth = (top - 1 - i) as u8;
                self.interpreter.resolve(id, depth);
                return;
            }
        }
        // Not found in any local scope: treat as global.
    }
}

fn error(token: &Token, message: impl Into<String>) -> LoxError {
    LoxError::at_token(token, message)
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{interpreter::Interpreter, parser::Parser, scanner::Scanner, token::Literal, token_type::TokenType};

    fn resolve_stmts(source: &str) -> Result<()> {
        let tokens = Scanner::new(source.to_string()).scan_tokens().expect("scan should succeed");
        let statements = Parser::new(tokens).parse().expect("parse should succeed");
        let mut interpreter = Interpreter::new();
        let mut resolver = Resolver::new(&mut interpreter);
        for statement in &statements {
            resolver.resolve_stmt(statement)?;
        }
        Ok(())
    }

    #[test]
    fn returning_from_top_level_reports_the_return_keyword() {
        let err = resolve_stmts("return 1;").expect_err("must fail");
        assert_eq!(err.to_string(), "[line 1] Error at 'return': Can't return from top-level code.");
    }

    #[test]
    fn using_this_outside_a_class_reports_the_this_keyword() {
        let err = resolve_stmts("print this;").expect_err("must fail");
        assert_eq!(err.to_string(), "[line 1] Error at 'this': Can't use 'this' outside of a class.");
    }

    #[test]
    fn redeclaring_a_local_variable_reports_its_own_line_and_token() {
        let mut interpreter = Interpreter::new();
        let mut resolver = Resolver::new(&mut interpreter);
        resolver.begin_scope();
        let first = Token::new(TokenType::Identifier, "a", Literal::Null, 1);
        let second = Token::new(TokenType::Identifier, "a", Literal::Null, 2);
        resolver.declare(&first).expect("first declaration is fine");
        let err = resolver.declare(&second).expect_err("must fail");
        assert_eq!(err.to_string(), "[line 2] Error at 'a': Already a variable named 'a' in this scope.");
    }
}
