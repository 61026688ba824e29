//! Lexer for `OpenQASM` 2.

use logos::Logos;
use std::ops::Range;

/// Tokens for `OpenQASM` 2.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*[^*]*\*+(?:[^/*][^*]*\*+)*/")]
pub enum Token {
    // Keywords
    #[token("OPENQASM")]
    OpenQasm,

    #[token("include")]
    Include,

    #[token("qreg")]
    QReg,

    #[token("creg")]
    CReg,

    #[token("gate")]
    Gate,

    #[token("opaque")]
    Opaque,

    #[token("if")]
    If,

    #[token("measure")]
    Measure,

    #[token("reset")]
    Reset,

    #[token("barrier")]
    Barrier,

    // Built-in gates (higher priority than identifier)
    #[token("U", priority = 3)]
    GateU,

    #[token("CX", priority = 3)]
    GateCX,

    // Constants
    #[token("pi")]
    Pi,

    // Literals
    #[regex(r"[0-9]+\.[0-9]*([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    RealLiteral(f64),

    #[regex(r"[0-9]+", |lex| lex.slice().parse::<u64>().ok())]
    IntLiteral(u64),

    #[regex(r#""[^"]*""#, |lex| {
        let s = lex.slice();
        Some(s[1..s.len()-1].to_string())
    })]
    StringLiteral(String),

    // Identifiers
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Identifier(String),

    // Operators and punctuation
    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("/")]
    Slash,

    #[token("^")]
    Caret,

    #[token("==")]
    EqEq,

    #[token("->")]
    Arrow,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token(";")]
    Semicolon,

    #[token(",")]
    Comma,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::OpenQasm => write!(f, "OPENQASM"),
            Token::Include => write!(f, "include"),
            Token::QReg => write!(f, "qreg"),
            Token::CReg => write!(f, "creg"),
            Token::Gate => write!(f, "gate"),
            Token::Opaque => write!(f, "opaque"),
            Token::If => write!(f, "if"),
            Token::Measure => write!(f, "measure"),
            Token::Reset => write!(f, "reset"),
            Token::Barrier => write!(f, "barrier"),
            Token::GateU => write!(f, "U"),
            Token::GateCX => write!(f, "CX"),
            Token::Pi => write!(f, "pi"),
            Token::RealLiteral(v) => write!(f, "{v}"),
            Token::IntLiteral(v) => write!(f, "{v}"),
            Token::StringLiteral(s) => write!(f, "\"{s}\""),
            Token::Identifier(s) => write!(f, "{s}"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Caret => write!(f, "^"),
            Token::EqEq => write!(f, "=="),
            Token::Arrow => write!(f, "->"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::Semicolon => write!(f, ";"),
            Token::Comma => write!(f, ","),
        }
    }
}

/// A token with its byte span in the source.
#[derive(Debug, Clone)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Range<usize>,
}

/// Tokenize a QASM 2 source string.
///
/// Stops at the first invalid token and reports its span.
pub fn tokenize(source: &str) -> Result<Vec<SpannedToken>, (Range<usize>, String)> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(token) => tokens.push(SpannedToken { token, span }),
            Err(()) => {
                let slice = &source[span.clone()];
                return Err((span, format!("invalid token '{slice}'")));
            }
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.token)
            .collect()
    }

    #[test]
    fn test_header_tokens() {
        let tokens = kinds("OPENQASM 2.0;");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0], Token::OpenQasm);
        assert!(matches!(tokens[1], Token::RealLiteral(v) if (v - 2.0).abs() < 1e-12));
        assert_eq!(tokens[2], Token::Semicolon);
    }

    #[test]
    fn test_register_declaration() {
        let tokens = kinds("qreg q[2];");
        assert_eq!(tokens[0], Token::QReg);
        assert!(matches!(tokens[1], Token::Identifier(ref s) if s == "q"));
        assert_eq!(tokens[2], Token::LBracket);
        assert!(matches!(tokens[3], Token::IntLiteral(2)));
        assert_eq!(tokens[4], Token::RBracket);
    }

    #[test]
    fn test_builtins_beat_identifiers() {
        let tokens = kinds("U(0,0,0) q; CX a,b; Ux q;");
        assert_eq!(tokens[0], Token::GateU);
        assert!(tokens.contains(&Token::GateCX));
        assert!(tokens.contains(&Token::Identifier("Ux".into())));
    }

    #[test]
    fn test_measure_and_if() {
        let tokens = kinds("if(c==1) x q[0]; measure q[0] -> c[0];");
        assert_eq!(tokens[0], Token::If);
        assert_eq!(tokens[3], Token::EqEq);
        assert!(tokens.contains(&Token::Arrow));
    }

    #[test]
    fn test_comments_skipped() {
        let source = r"
            // line comment
            qreg q[1];
            /* block */
            creg c[1];
        ";
        assert_eq!(kinds(source).len(), 12);
    }

    #[test]
    fn test_invalid_token_span() {
        let (span, msg) = tokenize("qreg q[1]; $").unwrap_err();
        assert_eq!(span, 11..12);
        assert!(msg.contains('$'));
    }
}
