use crate::expr::Expr;

/// Debug helper that renders an expression tree back into a parenthesized
/// Lisp-ish form, independent of the interpreter.
pub struct AstPrinter;

impl AstPrinter {
    pub fn print(&self, expr: &Expr) -> String {
        match expr {
            Expr::Binary(e) => self.parenthesize(&e.operator.lexeme, &[&e.left, &e.right]),
            Expr::Logical(e) => self.parenthesize(&e.operator.lexeme, &[&e.left, &e.right]),
            Expr::Grouping(e) => self.parenthesize("group", &[&e.expression]),
            Expr::Literal(e) => e.value.to_string(),
            Expr::Unary(e) => self.parenthesize(&e.operator.lexeme, &[&e.right]),
            Expr::Variable(e) => e.name.lexeme.clone(),
            Expr::Assign(e) => self.parenthesize(&format!("assign {}", e.name.lexeme), &[&e.value]),
            Expr::Call(e) => self.parenthesize("call", &std::iter::once(e.callee.as_ref()).chain(&e.arguments).collect::<Vec<_>>()),
            Expr::Get(e) => self.parenthesize(&format!("get {}", e.name.lexeme), &[&e.object]),
            Expr::Set(e) => self.parenthesize(&format!("set {}", e.name.lexeme), &[&e.object, &e.value]),
            Expr::This(_) => "this".to_string(),
            Expr::Super(e) => format!("(super {})", e.method.lexeme),
        }
    }

    fn parenthesize(&self, name: &str, exprs: &[&Expr]) -> String {
        let parts: Vec<_> = exprs.iter().map(|expr| self.print(expr)).collect();
        format!("({} {})", name, parts.join(" "))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        expr::{Binary, Grouping, Literal, Unary},
        token::Token,
        token_type::TokenType,
    };
    use pretty_assertions::assert_eq;

    #[test]
    fn prints_a_nested_expression() {
        let expr = Binary::expr(
            Unary::expr(Token::new(TokenType::Minus, "-", ().into(), 1), Literal::expr(123_f64.into())),
            Token::new(TokenType::Star, "*", ().into(), 1),
            Grouping::expr(Literal::expr(45.67.into())),
        );
        let printer = AstPrinter;
        assert_eq!(printer.print(&expr), "(* (- 123) (group 45.67))".to_string());
    }
}
