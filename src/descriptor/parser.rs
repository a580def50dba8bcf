//! Descriptor parser.
//!
//! # Grammar
//! ```text
//! descriptor := (statement? terminator)* statement? EOF
//! statement  := IDENT ('[' STRING ']')+ '=' value      -- assignment
//!             | IDENT value                            -- directive
//!             | IDENT '(' value ')'                    -- directive
//! value      := 'true' | 'false' | INT | STRING | hash
//! hash       := '{' (STRING '=>' value (',' STRING '=>' value)* ','?)? '}'
//! ```
//!
//! # Design Decisions
//! - Aborts on the first error; a partially parsed descriptor is never returned
//! - Terminators inside `{}`, `[]`, `()` are skipped
//! - Duplicate keys inside one hash literal are parse errors, same as
//!   duplicate statements

use std::collections::BTreeMap;

use crate::descriptor::error::ParseError;
use crate::descriptor::lexer::{tokenize, Token, TokenKind};
use crate::descriptor::settings::{Settings, SettingsBuilder};
use crate::descriptor::value::{KeyPath, Value};

/// Parse descriptor text into [`Settings`].
pub fn parse(source: &str) -> Result<Settings, ParseError> {
    let tokens = tokenize(source)?;
    Parser::new(tokens).descriptor()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        // The lexer always ends the stream with Eof and we never advance past it.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn unexpected(token: &Token, expected: &str) -> ParseError {
        ParseError::Unexpected {
            line: token.line,
            column: token.column,
            expected: expected.to_string(),
            found: token.kind.to_string(),
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<Token, ParseError> {
        let token = self.advance();
        if token.kind == kind {
            Ok(token)
        } else {
            Err(Self::unexpected(&token, expected))
        }
    }

    fn skip_terminators(&mut self) {
        while self.peek().kind == TokenKind::Terminator {
            self.advance();
        }
    }

    fn descriptor(mut self) -> Result<Settings, ParseError> {
        let mut builder = SettingsBuilder::default();
        loop {
            self.skip_terminators();
            if self.peek().kind == TokenKind::Eof {
                break;
            }
            self.statement(&mut builder)?;
            let end = self.advance();
            match end.kind {
                TokenKind::Terminator | TokenKind::Eof => {}
                _ => return Err(Self::unexpected(&end, "end of statement")),
            }
        }
        Ok(builder.build())
    }

    fn statement(&mut self, builder: &mut SettingsBuilder) -> Result<(), ParseError> {
        let head = self.advance();
        let TokenKind::Ident(root) = head.kind.clone() else {
            return Err(Self::unexpected(&head, "setting name"));
        };
        if root == "nil" {
            return Err(ParseError::InvalidLiteral {
                line: head.line,
                column: head.column,
                message: "`nil` is not a supported value".into(),
            });
        }

        let mut segments = vec![root];
        let next = self.peek().kind.clone();
        let value = match next {
            TokenKind::LBracket => {
                while self.peek().kind == TokenKind::LBracket {
                    let open = self.advance();
                    self.skip_terminators();
                    let seg = self.advance();
                    let name = match &seg.kind {
                        TokenKind::Str(name) => name.clone(),
                        _ => return Err(Self::unexpected(&seg, "quoted key segment")),
                    };
                    if let Some(reason) = KeyPath::check_segment(&name) {
                        return Err(ParseError::InvalidKey {
                            key: format!("{}.{}", segments.join("."), name),
                            line: seg.line,
                            reason: reason.to_string(),
                        });
                    }
                    segments.push(name);
                    self.skip_terminators();
                    if self.peek().kind == TokenKind::Eof {
                        return Err(ParseError::UnterminatedBlock {
                            line: open.line,
                            column: open.column,
                        });
                    }
                    self.expect(TokenKind::RBracket, "`]`")?;
                }
                self.expect(TokenKind::Assign, "`=`")?;
                self.skip_terminators();
                self.value()?
            }
            TokenKind::LParen => {
                let open = self.advance();
                self.skip_terminators();
                let value = self.value()?;
                self.skip_terminators();
                if self.peek().kind == TokenKind::Eof {
                    return Err(ParseError::UnterminatedBlock {
                        line: open.line,
                        column: open.column,
                    });
                }
                self.expect(TokenKind::RParen, "`)`")?;
                value
            }
            TokenKind::Assign => {
                let token = self.peek().clone();
                return Err(Self::unexpected(&token, "`[` after setting name"));
            }
            _ => self.value()?,
        };

        builder
            .insert(KeyPath::new(segments), value, Some(head.line))
            .map_err(|e| e.at_line(head.line))?;
        Ok(())
    }

    fn value(&mut self) -> Result<Value, ParseError> {
        let token = self.advance();
        match &token.kind {
            TokenKind::True => Ok(Value::Bool(true)),
            TokenKind::False => Ok(Value::Bool(false)),
            TokenKind::Int(i) => Ok(Value::Integer(*i)),
            TokenKind::Str(s) => Ok(Value::String(s.clone())),
            TokenKind::LBrace => self.hash(&token),
            TokenKind::LBracket => Err(ParseError::InvalidLiteral {
                line: token.line,
                column: token.column,
                message: "array values are not supported".into(),
            }),
            TokenKind::Ident(name) if name == "nil" => Err(ParseError::InvalidLiteral {
                line: token.line,
                column: token.column,
                message: "`nil` is not a supported value".into(),
            }),
            _ => Err(Self::unexpected(&token, "value")),
        }
    }

    fn hash(&mut self, open: &Token) -> Result<Value, ParseError> {
        let unterminated = || ParseError::UnterminatedBlock {
            line: open.line,
            column: open.column,
        };
        let mut map = BTreeMap::new();
        loop {
            self.skip_terminators();
            let token = self.advance();
            let name = match &token.kind {
                TokenKind::RBrace => break,
                TokenKind::Eof => return Err(unterminated()),
                TokenKind::Str(name) => name.clone(),
                _ => return Err(Self::unexpected(&token, "quoted key or `}`")),
            };
            if let Some(reason) = KeyPath::check_segment(&name) {
                return Err(ParseError::InvalidKey {
                    key: name,
                    line: token.line,
                    reason: reason.to_string(),
                });
            }
            self.skip_terminators();
            if self.peek().kind == TokenKind::Eof {
                return Err(unterminated());
            }
            self.expect(TokenKind::Arrow, "`=>`")?;
            self.skip_terminators();
            if self.peek().kind == TokenKind::Eof {
                return Err(unterminated());
            }
            let value = self.value()?;
            if map.insert(name.clone(), value).is_some() {
                return Err(ParseError::DuplicateKey {
                    key: name,
                    line: token.line,
                    first_line: open.line,
                });
            }

            self.skip_terminators();
            let sep = self.advance();
            match sep.kind {
                TokenKind::Comma => continue,
                TokenKind::RBrace => break,
                TokenKind::Eof => return Err(unterminated()),
                _ => return Err(Self::unexpected(&sep, "`,` or `}`")),
            }
        }
        Ok(Value::Map(map))
    }
}
