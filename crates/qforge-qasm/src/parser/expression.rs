//! Expression parsing for QASM 2.

use qforge_ir::MathFn;

use super::Parser;
use crate::ast::{BinOp, Expression};
use crate::error::ParseResult;
use crate::lexer::Token;

impl Parser<'_> {
    /// Parse an expression.
    pub(super) fn parse_expression(&mut self) -> ParseResult<Expression> {
        self.parse_binary_expr(0)
    }

    /// Parse binary expression with precedence climbing.
    ///
    /// `^` is right associative; everything else associates left.
    fn parse_binary_expr(&mut self, min_prec: u8) -> ParseResult<Expression> {
        let mut left = self.parse_unary_expr()?;

        while let Some(op) = self.peek_binary_op() {
            let prec = op_precedence(op);
            if prec < min_prec {
                break;
            }
            self.pos += 1;

            let next_min = if op == BinOp::Pow { prec } else { prec + 1 };
            let right = self.parse_binary_expr(next_min)?;
            left = Expression::BinOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// Parse unary expression.
    fn parse_unary_expr(&mut self) -> ParseResult<Expression> {
        if self.consume(&Token::Minus) {
            let expr = self.parse_unary_expr()?;
            return Ok(Expression::Neg(Box::new(expr)));
        }
        if self.consume(&Token::Plus) {
            return self.parse_unary_expr();
        }
        self.parse_primary_expr()
    }

    /// Parse primary expression.
    fn parse_primary_expr(&mut self) -> ParseResult<Expression> {
        let token = self
            .peek()
            .cloned()
            .ok_or_else(|| self.syntax("expected expression, found end of input"))?;

        match token {
            Token::IntLiteral(v) => {
                self.pos += 1;
                Ok(Expression::Int(v))
            }
            Token::RealLiteral(v) => {
                self.pos += 1;
                Ok(Expression::Real(v))
            }
            Token::Pi => {
                self.pos += 1;
                Ok(Expression::Pi)
            }
            Token::Identifier(name) => {
                if self
                    .tokens
                    .get(self.pos + 1)
                    .is_some_and(|t| t.token == Token::LParen)
                {
                    let func = MathFn::from_name(&name)
                        .ok_or_else(|| self.syntax(format!("unknown function '{name}'")))?;
                    self.pos += 2;
                    let arg = self.parse_expression()?;
                    self.expect(Token::RParen)?;
                    Ok(Expression::Call {
                        func,
                        arg: Box::new(arg),
                    })
                } else {
                    self.pos += 1;
                    Ok(Expression::Ident(name))
                }
            }
            Token::LParen => {
                self.pos += 1;
                let expr = self.parse_expression()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            other => Err(self.syntax(format!("expected expression, found '{other}'"))),
        }
    }

    /// Peek at binary operator.
    fn peek_binary_op(&self) -> Option<BinOp> {
        match self.peek()? {
            Token::Plus => Some(BinOp::Add),
            Token::Minus => Some(BinOp::Sub),
            Token::Star => Some(BinOp::Mul),
            Token::Slash => Some(BinOp::Div),
            Token::Caret => Some(BinOp::Pow),
            _ => None,
        }
    }

    /// Parse expression list.
    pub(super) fn parse_expression_list(&mut self) -> ParseResult<Vec<Expression>> {
        if self.check(&Token::RParen) {
            return Ok(vec![]);
        }
        let mut exprs = vec![self.parse_expression()?];
        while self.consume(&Token::Comma) {
            exprs.push(self.parse_expression()?);
        }
        Ok(exprs)
    }
}

/// Get operator precedence.
fn op_precedence(op: BinOp) -> u8 {
    match op {
        BinOp::Add | BinOp::Sub => 1,
        BinOp::Mul | BinOp::Div => 2,
        BinOp::Pow => 3,
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{GateCall, StatementKind};
    use crate::parser::parse_program;

    fn first_call(source: &str) -> GateCall {
        let program = parse_program(source, "2.0").unwrap();
        program
            .statements
            .into_iter()
            .find_map(|s| match s.kind {
                StatementKind::Gate(call) => Some(call),
                _ => None,
            })
            .unwrap()
    }

    fn value(expr: &str) -> f64 {
        let call = first_call(&format!("OPENQASM 2.0;\nqreg q[1];\nrz({expr}) q[0];"));
        call.params[0].to_parameter().as_f64().unwrap()
    }

    #[test]
    fn test_precedence() {
        assert!((value("1 + 2 * 3") - 7.0).abs() < 1e-12);
        assert!((value("(1 + 2) * 3") - 9.0).abs() < 1e-12);
        assert!((value("8 / 2 / 2") - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_power_right_assoc_and_unary() {
        assert!((value("2 ^ 3 ^ 2") - 512.0).abs() < 1e-9);
        assert!((value("-2 ^ 2") - 4.0).abs() < 1e-12);
        assert!((value("-pi/2") + std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn test_functions() {
        assert!((value("cos(pi)") + 1.0).abs() < 1e-12);
        assert!((value("sqrt(2)^2") - 2.0).abs() < 1e-12);
        assert!((value("ln(exp(1.5))") - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_function_is_syntax_error() {
        let err = parse_program("OPENQASM 2.0;\nqreg q[1];\nrz(foo(1)) q[0];", "2.0").unwrap_err();
        assert!(matches!(err, crate::ParseError::Syntax { .. }));
    }
}
