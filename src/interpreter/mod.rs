pub mod environment;
pub mod resolver;

use std::{collections::HashMap, rc::Rc};

use environment::{EnvRef, Environment};
use tracing::instrument;

use crate::{
    error::{LoxError, Result},
    expr::{self, Expr, NodeId},
    lox_class::LoxClass,
    lox_function::LoxFunction,
    lox_instance::LoxInstance,
    native::{assert_eq::LoxAssertEq, clock::LoxClock},
    object::Object,
    stmt::{self, Stmt},
    token_type::TokenType,
};

pub struct Interpreter {
    environment: EnvRef,
    pub globals: EnvRef,
    locals: HashMap<NodeId, u8>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Interpreter {
        let globals = Environment::new();
        globals.borrow_mut().define("clock".to_string(), Object::Callable(Rc::new(LoxClock)));
        globals
            .borrow_mut()
            .define("assert_eq".to_string(), Object::Callable(Rc::new(LoxAssertEq)));
        Self {
            environment: globals.clone(),
            globals,
            locals: HashMap::new(),
        }
    }

    /// Records how many scopes out a resolvable node's name lives, as
    /// computed by the resolver before any of this code runs.
    pub fn resolve(&mut self, id: NodeId, depth: u8) {
        self.locals.insert(id, depth);
    }

    #[instrument(skip(self, statements), err, level = "trace")]
    pub fn interpret(&mut self, statements: Vec<Stmt>) -> Result<()> {
        for statement in &statements {
            self.execute(statement)?;
        }
        Ok(())
    }

    fn execute(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::Print(stmt) => self.execute_print_stmt(stmt),
            Stmt::Block(stmt) => self.execute_block(&stmt.statements, Environment::with_enclosing(self.environment.clone())),
            Stmt::Expression(stmt) => self.evaluate(&stmt.expression).map(|_| ()),
            Stmt::Var(stmt) => self.execute_var_stmt(stmt),
            Stmt::If(stmt) => self.execute_if_stmt(stmt),
            Stmt::While(stmt) => self.execute_while_stmt(stmt),
            Stmt::Function(stmt) => self.execute_fn_stmt(stmt),
            Stmt::Return(stmt) => self.execute_return_stmt(stmt),
            Stmt::Class(stmt) => self.execute_class_stmt(stmt),
        }
    }

    fn evaluate(&mut self, expr: &Expr) -> Result<Object> {
        match expr {
            Expr::Binary(expr) => self.eval_binary(expr),
            Expr::Logical(expr) => self.eval_logical(expr),
            Expr::Grouping(expr) => self.eval_grouping(expr),
            Expr::Literal(expr) => self.eval_literal(expr),
            Expr::Unary(expr) => self.eval_unary(expr),
            Expr::Variable(expr) => self.eval_variable(expr),
            Expr::Assign(expr) => self.eval_assign(expr),
            Expr::Call(expr) => self.eval_call(expr),
            Expr::Get(expr) => self.eval_get(expr),
            Expr::Set(expr) => self.eval_set(expr),
            Expr::This(expr) => self.eval_this(expr),
            Expr::Super(expr) => self.eval_super(expr),
        }
    }

    pub fn execute_block(&mut self, statements: &[Stmt], environment: EnvRef) -> Result<()> {
        let previous = std::mem::replace(&mut self.environment, environment);
        let result = statements.iter().try_for_each(|statement| self.execute(statement));
        self.environment = previous;
        result
    }

    fn execute_print_stmt(&mut self, stmt: &stmt::Print) -> Result<()> {
        println!("{}", self.evaluate(&stmt.expression)?);
        Ok(())
    }

    fn execute_var_stmt(&mut self, stmt: &stmt::Var) -> Result<()> {
        let value = match &stmt.initializer {
            Some(init) => self.evaluate(init)?,
            None => Object::Nil,
        };

        self.environment.borrow_mut().define(stmt.name.lexeme.clone(), value);
        Ok(())
    }

    fn execute_if_stmt(&mut self, stmt: &stmt::If) -> Result<()> {
        if self.evaluate(&stmt.condition)?.is_truthy() {
            self.execute(&stmt.then_branch)?;
        } else if let Some(ref eb) = stmt.else_branch {
            self.execute(eb)?;
        }

        Ok(())
    }

    fn execute_while_stmt(&mut self, stmt: &stmt::While) -> Result<()> {
        while self.evaluate(&stmt.condition)?.is_truthy() {
            self.execute(&stmt.body)?;
        }

        Ok(())
    }

    fn execute_fn_stmt(&mut self, stmt: &Rc<stmt::Function>) -> Result<()> {
        let function = LoxFunction::new(stmt.clone(), self.environment.clone(), false);
        self.environment
            .borrow_mut()
            .define(stmt.name.lexeme.clone(), Object::Callable(Rc::new(function)));
        Ok(())
    }

    fn execute_return_stmt(&mut self, stmt: &stmt::Return) -> Result<()> {
        let value = match &stmt.value {
            Some(val) => self.evaluate(val)?,
            None => Object::Nil,
        };
        Err(LoxError::Return { value })
    }

    fn execute_class_stmt(&mut self, stmt: &stmt::Class) -> Result<()> {
        let superclass = stmt
            .superclass
            .as_ref()
            .map(|var| {
                let value = self.environment.borrow().get(&var.name)?;
                match value {
                    Object::Callable(callable) => callable
                        .as_class()
                        .ok_or_else(|| LoxError::runtime(&var.name, "Superclass must be a class.")),
                    _ => Err(LoxError::runtime(&var.name, "Superclass must be a class.")),
                }
            })
            .transpose()?;

        self.environment.borrow_mut().define(stmt.name.lexeme.clone(), Object::Nil);

        let method_env = if let Some(ref superclass) = superclass {
            let env = Environment::with_enclosing(self.environment.clone());
            env.borrow_mut()
                .define("super".to_string(), Object::Callable(Rc::new(superclass.as_ref().clone())));
            env
        } else {
            self.environment.clone()
        };

        let methods = stmt
            .methods
            .iter()
            .map(|method| {
                let is_initializer = method.name.lexeme == "init";
                let function = LoxFunction::new(method.clone(), method_env.clone(), is_initializer);
                (method.name.lexeme.clone(), Rc::new(function))
            })
            .collect();

        let class = LoxClass::new(stmt.name.lexeme.clone(), methods, superclass);
        self.environment
            .borrow_mut()
            .assign(&stmt.name, Object::Callable(Rc::new(class)))?;
        Ok(())
    }

    fn eval_binary(&mut self, expr: &expr::Binary) -> Result<Object> {
        let left = self.evaluate(&expr.left)?;
        let right = self.evaluate(&expr.right)?;

        let obj = match expr.operator.typ {
            TokenType::Greater => {
                Object::check_number_operands(&left, &right).map_err(|e| e.into_lox(&expr.operator))?;
                Object::Boolean(left > right)
            }
            TokenType::GreaterEqual => {
                Object::check_number_operands(&left, &right).map_err(|e| e.into_lox(&expr.operator))?;
                Object::Boolean(left >= right)
            }
            TokenType::Less => {
                Object::check_number_operands(&left, &right).map_err(|e| e.into_lox(&expr.operator))?;
                Object::Boolean(left < right)
            }
            TokenType::LessEqual => {
                Object::check_number_operands(&left, &right).map_err(|e| e.into_lox(&expr.operator))?;
                Object::Boolean(left <= right)
            }
            TokenType::Minus => (left - right).map_err(|e| e.into_lox(&expr.operator))?,
            TokenType::Plus => (left + right).map_err(|e| e.into_lox(&expr.operator))?,
            TokenType::Slash => (left / right).map_err(|e| e.into_lox(&expr.operator))?,
            TokenType::Star => (left * right).map_err(|e| e.into_lox(&expr.operator))?,
            TokenType::EqualEqual => Object::Boolean(left == right),
            TokenType::BangEqual => Object::Boolean(left != right),
            _ => Object::Nil,
        };

        Ok(obj)
    }

    fn eval_logical(&mut self, expr: &expr::Logical) -> Result<Object> {
        let left = self.evaluate(&expr.left)?;

        let truthy_left = left.is_truthy();
        match (&expr.operator.typ, truthy_left) {
            (&TokenType::Or, true) | (&TokenType::And, false) => Ok(left),
            _ => self.evaluate(&expr.right),
        }
    }

    fn eval_grouping(&mut self, expr: &expr::Grouping) -> Result<Object> {
        self.evaluate(&expr.expression)
    }

    fn eval_literal(&mut self, expr: &expr::Literal) -> Result<Object> {
        Ok(expr.value.clone())
    }

    fn eval_unary(&mut self, expr: &expr::Unary) -> Result<Object> {
        let right = self.evaluate(&expr.right)?;
        let obj = match expr.operator.typ {
            TokenType::Minus => {
                let n = right.into_number().map_err(|e| e.into_lox(&expr.operator))?;
                Object::from(-n)
            }
            TokenType::Bang => Object::Boolean(!right.is_truthy()),
            _ => unreachable!("parser only ever builds Unary with '!' or '-'"),
        };

        Ok(obj)
    }

    fn eval_variable(&mut self, expr: &expr::Variable) -> Result<Object> {
        self.lookup_variable(expr.id, &expr.name)
    }

    fn eval_assign(&mut self, expr: &expr::Assign) -> Result<Object> {
        let value = self.evaluate(&expr.value)?;
        match self.locals.get(&expr.id) {
            Some(&distance) => Environment::assign_at(&self.environment, distance, &expr.name, value.clone())?,
            None => self.globals.borrow_mut().assign(&expr.name, value.clone())?,
        }
        Ok(value)
    }

    fn eval_call(&mut self, expr: &expr::Call) -> Result<Object> {
        let callee = self.evaluate(&expr.callee)?;
        let mut arguments = Vec::with_capacity(expr.arguments.len());
        for argument in expr.arguments.iter() {
            arguments.push(self.evaluate(argument)?);
        }

        let Object::Callable(function) = callee else {
            return Err(LoxError::runtime(&expr.paren, "Can only call functions and classes."));
        };

        if arguments.len() as u8 != function.arity() {
            return Err(LoxError::runtime(
                &expr.paren,
                format!("Expected {} arguments but got {}.", function.arity(), arguments.len()),
            ));
        }
        function.call(self, arguments)
    }

    fn eval_get(&mut self, expr: &expr::Get) -> Result<Object> {
        match self.evaluate(&expr.object)? {
            Object::Instance(instance) => LoxInstance::get(&instance, &expr.name),
            _ => Err(LoxError::runtime(&expr.name, "Only instances have properties.")),
        }
    }

    fn eval_set(&mut self, expr: &expr::Set) -> Result<Object> {
        match self.evaluate(&expr.object)? {
            Object::Instance(instance) => {
                let value = self.evaluate(&expr.value)?;
                LoxInstance::set(&instance, &expr.name, value.clone());
                Ok(value)
            }
            _ => Err(LoxError::runtime(&expr.name, "Only instances have fields.")),
        }
    }

    fn eval_this(&mut self, expr: &expr::This) -> Result<Object> {
        self.lookup_variable(expr.id, &expr.keyword)
    }

    fn eval_super(&mut self, expr: &expr::Super) -> Result<Object> {
        let distance = *self.locals.get(&expr.id).expect("resolver always resolves 'super'");
        let Object::Callable(superclass) = Environment::get_at(&self.environment, distance, "super") else {
            unreachable!("'super' always resolves to a class")
        };
        let superclass = superclass.as_class().expect("'super' always resolves to a class");

        // `this` is always one scope closer than `super`: the method body's
        // own environment is a child of the one where `super` was bound.
        let Object::Instance(instance) = Environment::get_at(&self.environment, distance - 1, "this") else {
            unreachable!("'this' is always bound alongside 'super'")
        };

        match superclass.find_method(&expr.method.lexeme) {
            Some(method) => Ok(Object::Callable(Rc::new(method.bind(instance)))),
            None => Err(LoxError::runtime(&expr.method, format!("Undefined property '{}'.", expr.method.lexeme))),
        }
    }

    fn lookup_variable(&self, id: NodeId, name: &crate::token::Token) -> Result<Object> {
        match self.locals.get(&id) {
            Some(&distance) => Ok(Environment::get_at(&self.environment, distance, &name.lexeme)),
            None => self.globals.borrow().get(name),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{interpreter::resolver::Resolver, parser::Parser, scanner::Scanner};

    /// Runs a full script through scan → parse → resolve → interpret, the
    /// same pipeline `main.rs`'s `Lox::run` drives.
    fn run(source: &str) -> Result<()> {
        let tokens = Scanner::new(source.to_string()).scan_tokens()?;
        let statements = Parser::new(tokens).parse()?;
        let mut interpreter = Interpreter::new();
        Resolver::new(&mut interpreter).resolve_all(&statements)?;
        interpreter.interpret(statements)
    }

    /// Scripts that should run clean; each asserts its own expectations via
    /// the `assert_eq` native rather than requiring stdout capture.
    fn assert_runs_clean(source: &str) {
        run(source).unwrap_or_else(|e| panic!("expected script to run without error, got: {e}"));
    }

    #[test]
    fn arithmetic_and_string_concat() {
        assert_runs_clean(
            r#"
            assert_eq(1 + 2, 3);
            assert_eq("foo" + "bar", "foobar");
            assert_eq(10 / 4, 2.5);
            "#,
        );
    }

    #[test]
    fn fibonacci_recursion() {
        assert_runs_clean(
            r#"
            fun fib(n) {
              if (n < 2) return n;
              return fib(n - 1) + fib(n - 2);
            }
            assert_eq(fib(10), 55);
            "#,
        );
    }

    #[test]
    fn block_scoping_shadows_without_mutating_outer() {
        assert_runs_clean(
            r#"
            var a = 1;
            {
              var a = 2;
              assert_eq(a, 2);
            }
            assert_eq(a, 1);
            "#,
        );
    }

    #[test]
    fn closures_capture_the_binding_in_scope_at_declaration() {
        // A classic resolver test: the inner fn's free variable must resolve
        // to the outer `x`, not to the later block-local shadow.
        assert_runs_clean(
            r#"
            var x = "global";
            fun showX() { return x; }
            var before = showX();
            {
              var x = "local";
              assert_eq(showX(), "global");
            }
            assert_eq(before, "global");
            "#,
        );
    }

    #[test]
    fn closures_over_mutable_state() {
        assert_runs_clean(
            r#"
            fun makeCounter() {
              var count = 0;
              fun inc() {
                count = count + 1;
                return count;
              }
              return inc;
            }
            var counter = makeCounter();
            assert_eq(counter(), 1);
            assert_eq(counter(), 2);
            "#,
        );
    }

    #[test]
    fn class_inheritance_dispatches_through_super() {
        assert_runs_clean(
            r#"
            class A {
              say() { return "A"; }
            }
            class B < A {
              say() {
                var fromSuper = super.say();
                return fromSuper + "B";
              }
            }
            assert_eq(B().say(), "AB");
            "#,
        );
    }

    #[test]
    fn initializer_always_returns_this() {
        assert_runs_clean(
            r#"
            class Box {
              init(value) {
                this.value = value;
                return;
              }
            }
            var b = Box(7);
            assert_eq(b.value, 7);
            "#,
        );
    }

    #[test]
    fn self_referential_instance_field_does_not_overflow() {
        assert_runs_clean(
            r#"
            class Node {
              init() { this.me = this; }
            }
            var n = Node();
            assert_eq(n.me, n);
            "#,
        );
    }

    #[test]
    fn undefined_variable_is_a_runtime_error() {
        let err = run("print a;").expect_err("undefined variable must fail");
        assert_eq!(err.to_string(), "Undefined variable 'a'.\n[line 1]");
    }

    #[test]
    fn calling_a_non_callable_is_a_runtime_error() {
        let err = run("var a = 1; a();").expect_err("calling a number must fail");
        assert!(err.to_string().contains("Can only call functions and classes."));
    }

    #[test]
    fn inheriting_from_a_non_class_is_a_runtime_error() {
        let err = run("var NotAClass = 1; class B < NotAClass {}").expect_err("must fail");
        assert!(err.to_string().contains("Superclass must be a class."));
    }

    #[test]
    fn returning_from_top_level_is_a_compile_error() {
        assert!(run("return 1;").is_err());
    }

    #[test]
    fn comparing_non_numbers_is_a_runtime_error() {
        let err = run(r#"print "a" < 1;"#).expect_err("comparing a string and a number must fail");
        assert!(err.to_string().contains("Operands must be numbers."));
    }

    #[test]
    fn empty_source_runs_clean() {
        assert_runs_clean("");
    }
}
