//! Statement parsing for QASM 2.

use super::Parser;
use crate::ast::{BodyOp, GateCall, GateDef, Operand, Statement, StatementKind};
use crate::error::{ParseError, ParseResult};
use crate::lexer::Token;

impl Parser<'_> {
    /// Parse statements until end of input.
    pub(super) fn parse_statements(&mut self) -> ParseResult<Vec<Statement>> {
        let mut statements = Vec::new();
        while !self.is_eof() {
            statements.push(self.parse_statement()?);
        }
        Ok(statements)
    }

    /// Parse a statement.
    fn parse_statement(&mut self) -> ParseResult<Statement> {
        let pos = self.here();
        let token = self
            .peek()
            .cloned()
            .ok_or_else(|| self.syntax("unexpected end of input"))?;

        let kind = match token {
            Token::Include => self.parse_include()?,
            Token::QReg | Token::CReg => self.parse_register_decl()?,
            Token::Gate => StatementKind::GateDef(self.parse_gate_def()?),
            Token::Opaque => {
                return Err(self.syntax("opaque gates have no executable body"));
            }
            Token::Measure => self.parse_measure()?,
            Token::Reset => {
                self.pos += 1;
                let qubit = self.parse_operand()?;
                self.expect(Token::Semicolon)?;
                StatementKind::Reset { qubit }
            }
            Token::Barrier => {
                self.pos += 1;
                let operands = self.parse_operands()?;
                self.expect(Token::Semicolon)?;
                StatementKind::Barrier { operands }
            }
            Token::If => self.parse_if()?,
            Token::Identifier(_) | Token::GateU | Token::GateCX => {
                StatementKind::Gate(self.parse_gate_call()?)
            }
            Token::OpenQasm => {
                return Err(self.syntax("OPENQASM header must be the first statement"));
            }
            other => return Err(self.syntax(format!("expected statement, found '{other}'"))),
        };
        Ok(Statement { kind, pos })
    }

    /// Parse include statement.
    fn parse_include(&mut self) -> ParseResult<StatementKind> {
        self.expect(Token::Include)?;
        let path = match self.peek() {
            Some(Token::StringLiteral(s)) => s.clone(),
            _ => return Err(self.syntax("expected quoted include path")),
        };
        self.pos += 1;
        self.expect(Token::Semicolon)?;
        Ok(StatementKind::Include(path))
    }

    /// Parse `qreg name[size];` or `creg name[size];`.
    fn parse_register_decl(&mut self) -> ParseResult<StatementKind> {
        let quantum = self.check(&Token::QReg);
        self.pos += 1;
        let name = self.parse_identifier()?;
        self.expect(Token::LBracket)?;
        let size_at = self.here();
        let size = self.parse_int_literal()?;
        self.expect(Token::RBracket)?;
        self.expect(Token::Semicolon)?;

        let size = u32::try_from(size)
            .ok()
            .filter(|&s| s > 0)
            .ok_or_else(|| ParseError::Syntax {
                at: size_at,
                message: format!("register '{name}' must have a positive size, got {size}"),
            })?;

        Ok(if quantum {
            StatementKind::QReg { name, size }
        } else {
            StatementKind::CReg { name, size }
        })
    }

    /// Parse `measure q -> c;`.
    fn parse_measure(&mut self) -> ParseResult<StatementKind> {
        self.expect(Token::Measure)?;
        let qubit = self.parse_operand()?;
        self.expect(Token::Arrow)?;
        let bit = self.parse_operand()?;
        self.expect(Token::Semicolon)?;
        Ok(StatementKind::Measure { qubit, bit })
    }

    /// Parse `if (creg == int) <gate application>`.
    ///
    /// The guard covers exactly the one gate application that follows.
    fn parse_if(&mut self) -> ParseResult<StatementKind> {
        self.expect(Token::If)?;
        self.expect(Token::LParen)?;
        let register = self.parse_identifier()?;
        self.expect(Token::EqEq)?;
        let value = self.parse_int_literal()?;
        self.expect(Token::RParen)?;

        match self.peek() {
            Some(Token::Identifier(_) | Token::GateU | Token::GateCX) => {}
            Some(other) => {
                return Err(self.syntax(format!(
                    "a classical guard must be followed by a gate application, found '{other}'"
                )));
            }
            None => return Err(self.syntax("unexpected end of input after guard")),
        }
        let call = self.parse_gate_call()?;
        Ok(StatementKind::If {
            register,
            value,
            call,
        })
    }

    /// Parse gate definition.
    fn parse_gate_def(&mut self) -> ParseResult<GateDef> {
        self.expect(Token::Gate)?;
        let name = self.parse_identifier()?;

        let params = if self.consume(&Token::LParen) {
            let p = if self.check(&Token::RParen) {
                vec![]
            } else {
                self.parse_identifier_list()?
            };
            self.expect(Token::RParen)?;
            p
        } else {
            vec![]
        };

        let qubits = self.parse_identifier_list()?;

        self.expect(Token::LBrace)?;
        let mut body = Vec::new();
        while !self.check(&Token::RBrace) {
            match self.peek() {
                Some(Token::Barrier) => {
                    self.pos += 1;
                    let operands = self.parse_operands()?;
                    self.expect(Token::Semicolon)?;
                    body.push(BodyOp::Barrier(operands));
                }
                Some(Token::Identifier(_) | Token::GateU | Token::GateCX) => {
                    body.push(BodyOp::Gate(self.parse_gate_call()?));
                }
                Some(other) => {
                    return Err(self.syntax(format!(
                        "only gate applications and barriers are allowed in a gate body, found '{other}'"
                    )));
                }
                None => return Err(self.syntax(format!("unterminated body of gate '{name}'"))),
            }
        }
        self.expect(Token::RBrace)?;

        Ok(GateDef {
            name,
            params,
            qubits,
            body,
        })
    }

    /// Parse gate call: `name(params) a, b;`.
    fn parse_gate_call(&mut self) -> ParseResult<GateCall> {
        let pos = self.here();
        let name = match self.advance() {
            Some(Token::Identifier(name)) => name,
            Some(Token::GateU) => "U".to_string(),
            Some(Token::GateCX) => "CX".to_string(),
            _ => return Err(ParseError::Syntax {
                at: pos,
                message: "expected gate name".into(),
            }),
        };

        let params = if self.consume(&Token::LParen) {
            let p = self.parse_expression_list()?;
            self.expect(Token::RParen)?;
            p
        } else {
            vec![]
        };

        let args = self.parse_operands()?;
        self.expect(Token::Semicolon)?;

        Ok(GateCall {
            name,
            params,
            args,
            pos,
        })
    }

    /// Parse a comma-separated operand list.
    fn parse_operands(&mut self) -> ParseResult<Vec<Operand>> {
        let mut refs = vec![self.parse_operand()?];
        while self.consume(&Token::Comma) {
            refs.push(self.parse_operand()?);
        }
        Ok(refs)
    }

    /// Parse `name` or `name[index]`.
    fn parse_operand(&mut self) -> ParseResult<Operand> {
        let pos = self.here();
        let register = self.parse_identifier()?;
        let index = if self.consume(&Token::LBracket) {
            let index = self.parse_int_literal()?;
            self.expect(Token::RBracket)?;
            Some(index)
        } else {
            None
        };
        Ok(Operand {
            register,
            index,
            pos,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{BodyOp, StatementKind};
    use crate::error::ParseError;
    use crate::parser::parse_program;

    #[test]
    fn test_gate_def_shape() {
        let program = parse_program(
            "OPENQASM 2.0;\ngate rot(a, b) x, y { U(a, 0, b) x; barrier x, y; CX x, y; }",
            "2.0",
        )
        .unwrap();
        let StatementKind::GateDef(def) = &program.statements[0].kind else {
            panic!("expected gate definition");
        };
        assert_eq!(def.params, vec!["a", "b"]);
        assert_eq!(def.qubits, vec!["x", "y"]);
        assert_eq!(def.body.len(), 3);
        assert!(matches!(def.body[1], BodyOp::Barrier(ref ops) if ops.len() == 2));
    }

    #[test]
    fn test_if_guards_gate_only() {
        let err = parse_program(
            "OPENQASM 2.0;\nqreg q[1]; creg c[1];\nif(c==1) measure q[0] -> c[0];",
            "2.0",
        )
        .unwrap_err();
        assert!(matches!(err, ParseError::Syntax { .. }));
        assert_eq!(err.position().line, 3);
    }

    #[test]
    fn test_zero_sized_register_rejected() {
        let err = parse_program("OPENQASM 2.0;\nqreg q[0];", "2.0").unwrap_err();
        assert!(matches!(err, ParseError::Syntax { .. }));
    }

    #[test]
    fn test_opaque_rejected() {
        let err = parse_program("OPENQASM 2.0;\nopaque magic q;", "2.0").unwrap_err();
        assert!(matches!(err, ParseError::Syntax { .. }));
    }

    #[test]
    fn test_missing_semicolon() {
        let err = parse_program("OPENQASM 2.0;\nqreg q[1]\nh q[0];", "2.0").unwrap_err();
        assert!(matches!(err, ParseError::Syntax { .. }));
        assert_eq!(err.position().line, 3);
    }
}
