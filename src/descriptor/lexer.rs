//! Descriptor tokenizer.
//!
//! # Responsibilities
//! - Split descriptor text into tokens with 1-based line/column positions
//! - Decode string and integer literals
//! - Drop comments
//!
//! # Design Decisions
//! - Newlines and `;` are emitted as statement terminators; the parser decides
//!   where they are insignificant (inside `{}`, `[]`, `()`)
//! - String interpolation (`#{...}`) is rejected, a static descriptor has no
//!   runtime to evaluate it

use std::fmt;

use crate::descriptor::error::ParseError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Ident(String),
    Str(String),
    Int(i64),
    True,
    False,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    LParen,
    RParen,
    Assign,
    Arrow,
    Comma,
    Terminator,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Ident(name) => write!(f, "identifier `{}`", name),
            TokenKind::Str(_) => f.write_str("string literal"),
            TokenKind::Int(_) => f.write_str("integer literal"),
            TokenKind::True => f.write_str("`true`"),
            TokenKind::False => f.write_str("`false`"),
            TokenKind::LBracket => f.write_str("`[`"),
            TokenKind::RBracket => f.write_str("`]`"),
            TokenKind::LBrace => f.write_str("`{`"),
            TokenKind::RBrace => f.write_str("`}`"),
            TokenKind::LParen => f.write_str("`(`"),
            TokenKind::RParen => f.write_str("`)`"),
            TokenKind::Assign => f.write_str("`=`"),
            TokenKind::Arrow => f.write_str("`=>`"),
            TokenKind::Comma => f.write_str("`,`"),
            TokenKind::Terminator => f.write_str("end of statement"),
            TokenKind::Eof => f.write_str("end of input"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

/// Tokenize a whole descriptor. The last token is always [`TokenKind::Eof`].
pub fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    Lexer::new(source).run()
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    column: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().peekable(),
            line: 1,
            column: 1,
            tokens: Vec::new(),
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn push(&mut self, kind: TokenKind, line: usize, column: usize) {
        self.tokens.push(Token { kind, line, column });
    }

    fn run(mut self) -> Result<Vec<Token>, ParseError> {
        while let Some(&c) = self.chars.peek() {
            let (line, column) = (self.line, self.column);
            match c {
                ' ' | '\t' | '\r' => {
                    self.bump();
                }
                '\n' | ';' => {
                    self.bump();
                    self.push(TokenKind::Terminator, line, column);
                }
                '#' => {
                    while let Some(&c) = self.chars.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                '\\' => {
                    // Line continuation.
                    self.bump();
                    match self.chars.peek() {
                        Some('\n') => {
                            self.bump();
                        }
                        Some('\r') => {
                            self.bump();
                            if self.chars.peek() == Some(&'\n') {
                                self.bump();
                            }
                        }
                        _ => {
                            return Err(ParseError::Unexpected {
                                line,
                                column,
                                expected: "statement".into(),
                                found: "`\\`".into(),
                            })
                        }
                    }
                }
                '[' | ']' | '{' | '}' | '(' | ')' | ',' => {
                    self.bump();
                    let kind = match c {
                        '[' => TokenKind::LBracket,
                        ']' => TokenKind::RBracket,
                        '{' => TokenKind::LBrace,
                        '}' => TokenKind::RBrace,
                        '(' => TokenKind::LParen,
                        ')' => TokenKind::RParen,
                        _ => TokenKind::Comma,
                    };
                    self.push(kind, line, column);
                }
                '=' => {
                    self.bump();
                    match self.chars.peek() {
                        Some('>') => {
                            self.bump();
                            self.push(TokenKind::Arrow, line, column);
                        }
                        Some('=') => {
                            return Err(ParseError::Unexpected {
                                line,
                                column,
                                expected: "assignment".into(),
                                found: "`==`".into(),
                            })
                        }
                        _ => self.push(TokenKind::Assign, line, column),
                    }
                }
                '\'' | '"' => {
                    self.bump();
                    let s = self.string(c, line, column)?;
                    self.push(TokenKind::Str(s), line, column);
                }
                '-' | '0'..='9' => {
                    let i = self.integer(line, column)?;
                    self.push(TokenKind::Int(i), line, column);
                }
                c if c.is_ascii_alphabetic() || c == '_' => {
                    let word = self.word();
                    let kind = match word.as_str() {
                        "true" => TokenKind::True,
                        "false" => TokenKind::False,
                        _ => TokenKind::Ident(word),
                    };
                    self.push(kind, line, column);
                }
                other => {
                    return Err(ParseError::Unexpected {
                        line,
                        column,
                        expected: "token".into(),
                        found: format!("`{}`", other),
                    })
                }
            }
        }
        let (line, column) = (self.line, self.column);
        self.push(TokenKind::Eof, line, column);
        Ok(self.tokens)
    }

    fn word(&mut self) -> String {
        let mut word = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                word.push(c);
                self.bump();
            } else {
                break;
            }
        }
        word
    }

    fn integer(&mut self, line: usize, column: usize) -> Result<i64, ParseError> {
        let mut digits = String::new();
        if self.chars.peek() == Some(&'-') {
            digits.push('-');
            self.bump();
        }
        let mut last_underscore = false;
        while let Some(&c) = self.chars.peek() {
            match c {
                '0'..='9' => {
                    digits.push(c);
                    last_underscore = false;
                }
                '_' if !last_underscore && digits.ends_with(|d: char| d.is_ascii_digit()) => {
                    last_underscore = true
                }
                _ => break,
            }
            self.bump();
        }
        let invalid = |message: String| ParseError::InvalidLiteral {
            line,
            column,
            message,
        };
        if last_underscore {
            return Err(invalid("trailing `_` in integer literal".into()));
        }
        if let Some(&c) = self.chars.peek() {
            if c.is_ascii_alphabetic() || c == '.' {
                return Err(invalid(format!(
                    "unsupported numeric literal `{}{}...`",
                    digits, c
                )));
            }
        }
        if digits == "-" {
            return Err(invalid("`-` must be followed by digits".into()));
        }
        digits
            .parse::<i64>()
            .map_err(|_| invalid(format!("integer `{}` out of range", digits)))
    }

    fn string(&mut self, quote: char, line: usize, column: usize) -> Result<String, ParseError> {
        let mut out = String::new();
        loop {
            let Some(c) = self.bump() else {
                return Err(ParseError::UnterminatedString { line, column });
            };
            match c {
                c if c == quote => return Ok(out),
                '\\' => {
                    let Some(escaped) = self.bump() else {
                        return Err(ParseError::UnterminatedString { line, column });
                    };
                    if quote == '\'' {
                        match escaped {
                            '\\' | '\'' => out.push(escaped),
                            other => {
                                out.push('\\');
                                out.push(other);
                            }
                        }
                    } else {
                        let decoded = match escaped {
                            '\\' => '\\',
                            '"' => '"',
                            'n' => '\n',
                            't' => '\t',
                            'r' => '\r',
                            '0' => '\0',
                            '#' => '#',
                            other => {
                                return Err(ParseError::InvalidLiteral {
                                    line: self.line,
                                    column: self.column.saturating_sub(2),
                                    message: format!("unsupported escape `\\{}`", other),
                                })
                            }
                        };
                        out.push(decoded);
                    }
                }
                '#' if quote == '"' && self.chars.peek() == Some(&'{') => {
                    return Err(ParseError::InvalidLiteral {
                        line: self.line,
                        column: self.column.saturating_sub(1),
                        message: "string interpolation is not supported".into(),
                    });
                }
                other => out.push(other),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_assignment_tokens() {
        assert_eq!(
            kinds("nginx['enable'] = true # trailing comment\n"),
            vec![
                TokenKind::Ident("nginx".into()),
                TokenKind::LBracket,
                TokenKind::Str("enable".into()),
                TokenKind::RBracket,
                TokenKind::Assign,
                TokenKind::True,
                TokenKind::Terminator,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_integers() {
        assert_eq!(kinds("-1")[0], TokenKind::Int(-1));
        assert_eq!(kinds("65_536")[0], TokenKind::Int(65536));
        assert!(matches!(
            tokenize("1.5"),
            Err(ParseError::InvalidLiteral { .. })
        ));
        assert!(matches!(
            tokenize("99999999999999999999"),
            Err(ParseError::InvalidLiteral { .. })
        ));
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(kinds(r"'it\'s \n'")[0], TokenKind::Str("it's \\n".into()));
        assert_eq!(kinds(r#""a\tb""#)[0], TokenKind::Str("a\tb".into()));
        assert_eq!(kinds("'# not a comment'")[0], TokenKind::Str("# not a comment".into()));
    }

    #[test]
    fn test_unterminated_string_reports_opening_position() {
        let err = tokenize("x = 1\nexternal_url 'http://gitlab").unwrap_err();
        assert_eq!(err, ParseError::UnterminatedString { line: 2, column: 14 });
    }

    #[test]
    fn test_interpolation_rejected() {
        assert!(matches!(
            tokenize(r##""#{host}""##),
            Err(ParseError::InvalidLiteral { .. })
        ));
    }

    #[test]
    fn test_positions() {
        let tokens = tokenize("a\n  b").unwrap();
        assert_eq!((tokens[2].line, tokens[2].column), (2, 3));
    }
}
