//! Parser for `OpenQASM` 2.

mod expression;
mod lowering;
mod statement;

use qforge_ir::Circuit;
use tracing::debug;

use crate::ast::Program;
use crate::dialect::{ParseOptions, SUPPORTED_VERSIONS};
use crate::error::{ParseError, ParseResult, Position};
use crate::lexer::{SpannedToken, Token, tokenize};

pub use lowering::MAX_MACRO_DEPTH;

/// Parse QASM 2.0 source with the default options (Qiskit dialect).
pub fn parse(source: &str) -> ParseResult<Circuit> {
    parse_with(source, &ParseOptions::default())
}

/// Parse QASM source into a circuit.
///
/// `options.version` must be a recognized grammar version, and the source
/// must open with a matching `OPENQASM <version>;` header.
pub fn parse_with(source: &str, options: &ParseOptions) -> ParseResult<Circuit> {
    if !SUPPORTED_VERSIONS.contains(&options.version.as_str()) {
        return Err(ParseError::UnsupportedVersion {
            version: options.version.clone(),
            at: Position::new(1, 1),
        });
    }
    let program = parse_program(source, &options.version)?;
    debug!(
        statements = program.statements.len(),
        dialect = %options.dialect,
        "parsed QASM program"
    );
    lowering::lower_to_circuit(&program, options)
}

/// Parse a full program into its AST, checking the header version.
pub fn parse_program(source: &str, version: &str) -> ParseResult<Program> {
    let mut parser = Parser::new(source)?;
    let version = parser.parse_header(version)?;
    let statements = parser.parse_statements()?;
    Ok(Program {
        version: Some(version),
        statements,
    })
}

/// Parse an include body: statements only, no header.
pub(crate) fn parse_fragment(source: &str) -> ParseResult<Program> {
    let mut parser = Parser::new(source)?;
    let statements = parser.parse_statements()?;
    Ok(Program {
        version: None,
        statements,
    })
}

/// Parser state.
pub(super) struct Parser<'a> {
    source: &'a str,
    pub(super) tokens: Vec<SpannedToken>,
    pub(super) pos: usize,
    /// Byte offset of the first character of every line.
    line_starts: Vec<usize>,
}

impl<'a> Parser<'a> {
    /// Create a new parser from source.
    fn new(source: &'a str) -> ParseResult<Self> {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        let mut parser = Self {
            source,
            tokens: Vec::new(),
            pos: 0,
            line_starts,
        };
        match tokenize(source) {
            Ok(tokens) => parser.tokens = tokens,
            Err((span, message)) => {
                return Err(ParseError::Syntax {
                    at: parser.position_of(span.start),
                    message,
                });
            }
        }
        Ok(parser)
    }

    /// Map a byte offset to a line/column position.
    pub(super) fn position_of(&self, offset: usize) -> Position {
        let line = self.line_starts.partition_point(|&start| start <= offset);
        let start = self.line_starts[line.saturating_sub(1)];
        let column = self.source[start..offset.min(self.source.len())]
            .chars()
            .count()
            + 1;
        Position::new(line.max(1), column)
    }

    /// Position of the current token (or end of input).
    pub(super) fn here(&self) -> Position {
        let offset = self
            .tokens
            .get(self.pos)
            .map_or(self.source.len(), |t| t.span.start);
        self.position_of(offset)
    }

    /// A syntax error at the current token.
    pub(super) fn syntax(&self, message: impl Into<String>) -> ParseError {
        ParseError::Syntax {
            at: self.here(),
            message: message.into(),
        }
    }

    /// Check if we've reached the end.
    pub(super) fn is_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Peek at the current token.
    pub(super) fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    /// Advance and return the current token.
    pub(super) fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos)?.token.clone();
        self.pos += 1;
        Some(token)
    }

    fn found(&self) -> String {
        self.peek()
            .map_or_else(|| "end of input".to_string(), |t| format!("'{t}'"))
    }

    /// Expect a specific token.
    #[allow(clippy::needless_pass_by_value)]
    pub(super) fn expect(&mut self, expected: Token) -> ParseResult<()> {
        if self.check(&expected) {
            self.pos += 1;
            return Ok(());
        }
        Err(self.syntax(format!("expected '{expected}', found {}", self.found())))
    }

    /// Check if current token matches.
    pub(super) fn check(&self, token: &Token) -> bool {
        self.peek()
            .is_some_and(|t| std::mem::discriminant(t) == std::mem::discriminant(token))
    }

    /// Consume token if it matches.
    pub(super) fn consume(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Parse `OPENQASM <version>;`, which must be the first statement.
    fn parse_header(&mut self, expected: &str) -> ParseResult<String> {
        if !self.check(&Token::OpenQasm) {
            return Err(self.syntax(format!(
                "program must start with 'OPENQASM {expected};', found {}",
                self.found()
            )));
        }
        self.pos += 1;

        let at = self.here();
        let version = match self.tokens.get(self.pos) {
            Some(SpannedToken {
                token: Token::RealLiteral(_) | Token::IntLiteral(_),
                span,
            }) => self.source[span.clone()].to_string(),
            Some(SpannedToken { span, .. }) => {
                return Err(ParseError::UnsupportedVersion {
                    version: self.source[span.clone()].to_string(),
                    at,
                });
            }
            None => return Err(self.syntax("expected version number after OPENQASM")),
        };
        self.pos += 1;

        let same = match (version.parse::<f64>(), expected.parse::<f64>()) {
            (Ok(a), Ok(b)) => a == b,
            _ => version == expected,
        };
        if !same {
            return Err(ParseError::UnsupportedVersion { version, at });
        }
        self.expect(Token::Semicolon)?;
        Ok(version)
    }

    /// Parse an identifier.
    pub(super) fn parse_identifier(&mut self) -> ParseResult<String> {
        match self.peek() {
            Some(Token::Identifier(s)) => {
                let s = s.clone();
                self.pos += 1;
                Ok(s)
            }
            _ => Err(self.syntax(format!("expected identifier, found {}", self.found()))),
        }
    }

    /// Parse identifier list.
    pub(super) fn parse_identifier_list(&mut self) -> ParseResult<Vec<String>> {
        let mut ids = vec![self.parse_identifier()?];
        while self.consume(&Token::Comma) {
            ids.push(self.parse_identifier()?);
        }
        Ok(ids)
    }

    /// Parse an integer literal.
    pub(super) fn parse_int_literal(&mut self) -> ParseResult<u64> {
        match self.peek() {
            Some(Token::IntLiteral(v)) => {
                let v = *v;
                self.pos += 1;
                Ok(v)
            }
            _ => Err(self.syntax(format!("expected integer, found {}", self.found()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bell_state() {
        let source = r#"
            OPENQASM 2.0;
            include "qelib1.inc";
            qreg q[2];
            creg c[2];
            h q[0];
            cx q[0], q[1];
            measure q -> c;
        "#;

        let circuit = parse(source).unwrap();
        assert_eq!(circuit.num_qubits(), 2);
        assert_eq!(circuit.num_clbits(), 2);
        assert_eq!(circuit.len(), 4);
    }

    #[test]
    fn test_header_must_come_first() {
        let err = parse("qreg q[1]; OPENQASM 2.0;").unwrap_err();
        assert!(matches!(err, ParseError::Syntax { .. }));
        assert_eq!(err.position(), Position::new(1, 1));
    }

    #[test]
    fn test_declared_version_mismatch() {
        let err = parse("OPENQASM 3.0;\nqreg q[1];").unwrap_err();
        assert!(
            matches!(err, ParseError::UnsupportedVersion { ref version, at } if version == "3.0" && at == Position::new(1, 10))
        );
    }

    #[test]
    fn test_malformed_version() {
        let err = parse("OPENQASM two;").unwrap_err();
        assert!(matches!(err, ParseError::UnsupportedVersion { .. }));
    }

    #[test]
    fn test_requested_version_unknown() {
        let options = ParseOptions::default().with_version("1.0");
        let err = parse_with("OPENQASM 2.0;", &options).unwrap_err();
        assert!(matches!(err, ParseError::UnsupportedVersion { ref version, .. } if version == "1.0"));
    }

    #[test]
    fn test_comment_before_header() {
        let circuit = parse("// leading comment\nOPENQASM 2.0;\nqreg q[3];").unwrap();
        assert_eq!(circuit.num_qubits(), 3);
    }

    #[test]
    fn test_lexer_error_position() {
        let err = parse("OPENQASM 2.0;\nqreg q[1];\n  h q[0] @;").unwrap_err();
        assert!(matches!(err, ParseError::Syntax { .. }));
        assert_eq!(err.position(), Position::new(3, 10));
    }
}
