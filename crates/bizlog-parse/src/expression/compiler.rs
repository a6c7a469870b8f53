//! Template compilation: split on `#{ ... }` and parse each expression.

use super::ast::{CompareOp, CompiledTemplate, Expr, Segment};
use super::lexer::{Lexer, Spanned, Token};
use super::{ExpressionError, EXPRESSION_PREFIX};
use serde_json::Value;

/// Compile a template into literal and expression segments.
pub fn compile(source: &str) -> Result<CompiledTemplate, ExpressionError> {
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut pos = 0;

    while let Some(found) = source[pos..].find(EXPRESSION_PREFIX) {
        let open = pos + found;
        text.push_str(&source[pos..open]);
        if !text.is_empty() {
            segments.push(Segment::Text(std::mem::take(&mut text)));
        }

        let mut parser = ExprParser::new(source, open + EXPRESSION_PREFIX.len())?;
        if parser.current.token == Token::RBrace {
            return Err(ExpressionError::Compile {
                offset: open,
                message: "empty expression".to_string(),
            });
        }
        let expr = parser.expression()?;
        match parser.current.token {
            Token::RBrace => {}
            Token::Eof => {
                return Err(ExpressionError::Compile {
                    offset: open,
                    message: "unterminated expression, expected '}'".to_string(),
                })
            }
            _ => return Err(parser.unexpected()),
        }
        segments.push(Segment::Expr(expr));
        pos = parser.current.end;
    }

    text.push_str(&source[pos..]);
    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }

    Ok(CompiledTemplate {
        source: source.to_string(),
        segments,
    })
}

/// Recursive-descent parser over one embedded expression.
///
/// ```text
/// expression := equality ( '?' expression ':' expression | '?:' expression )?
/// equality   := additive ( ( '==' | '!=' ) additive )*
/// additive   := postfix ( '+' postfix )*
/// postfix    := primary ( '.' ident | '?.' ident | '[' expression ']' )*
/// primary    := literal | '#' name [ args ] | '@' name '.' ident args | '(' expression ')'
/// ```
struct ExprParser<'a> {
    lexer: Lexer<'a>,
    current: Spanned,
}

impl<'a> ExprParser<'a> {
    fn new(src: &'a str, pos: usize) -> Result<Self, ExpressionError> {
        let mut lexer = Lexer::new(src, pos);
        let current = lexer.next_token()?;
        Ok(Self { lexer, current })
    }

    fn advance(&mut self) -> Result<Token, ExpressionError> {
        let next = self.lexer.next_token()?;
        Ok(std::mem::replace(&mut self.current, next).token)
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<(), ExpressionError> {
        if self.current.token == expected {
            self.advance()?;
            Ok(())
        } else {
            Err(ExpressionError::Compile {
                offset: self.current.start,
                message: format!("expected {}, found {}", what, describe(&self.current.token)),
            })
        }
    }

    fn unexpected(&self) -> ExpressionError {
        ExpressionError::Compile {
            offset: self.current.start,
            message: format!("unexpected {}", describe(&self.current.token)),
        }
    }

    fn expression(&mut self) -> Result<Expr, ExpressionError> {
        let value = self.equality()?;
        match self.current.token {
            Token::Question => {
                self.advance()?;
                let then = self.expression()?;
                self.expect(Token::Colon, "':'")?;
                let otherwise = self.expression()?;
                Ok(Expr::Ternary {
                    condition: Box::new(value),
                    then: Box::new(then),
                    otherwise: Box::new(otherwise),
                })
            }
            Token::Elvis => {
                self.advance()?;
                let fallback = self.expression()?;
                Ok(Expr::Elvis {
                    value: Box::new(value),
                    fallback: Box::new(fallback),
                })
            }
            _ => Ok(value),
        }
    }

    fn equality(&mut self) -> Result<Expr, ExpressionError> {
        let mut lhs = self.additive()?;
        loop {
            let op = match self.current.token {
                Token::EqEq => CompareOp::Eq,
                Token::NotEq => CompareOp::Ne,
                _ => return Ok(lhs),
            };
            self.advance()?;
            let rhs = self.additive()?;
            lhs = Expr::Compare {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn additive(&mut self) -> Result<Expr, ExpressionError> {
        let mut lhs = self.postfix()?;
        while self.current.token == Token::Plus {
            self.advance()?;
            let rhs = self.postfix()?;
            lhs = Expr::Add(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn postfix(&mut self) -> Result<Expr, ExpressionError> {
        let mut expr = self.primary()?;
        loop {
            match self.current.token {
                Token::Dot | Token::SafeDot => {
                    let null_safe = self.current.token == Token::SafeDot;
                    self.advance()?;
                    let name = self.ident("a property name")?;
                    expr = Expr::Property {
                        target: Box::new(expr),
                        name,
                        null_safe,
                    };
                }
                Token::LBracket => {
                    self.advance()?;
                    let index = self.expression()?;
                    self.expect(Token::RBracket, "']'")?;
                    expr = Expr::Index {
                        target: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, ExpressionError> {
        match self.current.token.clone() {
            Token::Str(s) => {
                self.advance()?;
                Ok(Expr::Literal(Value::String(s)))
            }
            Token::Int(i) => {
                self.advance()?;
                Ok(Expr::Literal(Value::from(i)))
            }
            Token::Float(f) => {
                self.advance()?;
                Ok(Expr::Literal(Value::from(f)))
            }
            Token::Ident(word) => {
                let literal = match word.as_str() {
                    "true" => Value::Bool(true),
                    "false" => Value::Bool(false),
                    "null" => Value::Null,
                    _ => return Err(self.unexpected()),
                };
                self.advance()?;
                Ok(Expr::Literal(literal))
            }
            Token::Hash(name) => {
                self.advance()?;
                if self.current.token == Token::LParen {
                    let args = self.arguments()?;
                    Ok(Expr::Call {
                        function: name,
                        args,
                    })
                } else {
                    Ok(Expr::Variable(name))
                }
            }
            Token::At(component) => {
                self.advance()?;
                self.expect(Token::Dot, "'.' after component name")?;
                let method = self.ident("a method name")?;
                let args = self.arguments()?;
                Ok(Expr::Component {
                    component,
                    method,
                    args,
                })
            }
            Token::LParen => {
                self.advance()?;
                let expr = self.expression()?;
                self.expect(Token::RParen, "')'")?;
                Ok(expr)
            }
            _ => Err(self.unexpected()),
        }
    }

    fn arguments(&mut self) -> Result<Vec<Expr>, ExpressionError> {
        self.expect(Token::LParen, "'('")?;
        let mut args = Vec::new();
        if self.current.token == Token::RParen {
            self.advance()?;
            return Ok(args);
        }
        loop {
            args.push(self.expression()?);
            match self.current.token {
                Token::Comma => {
                    self.advance()?;
                }
                Token::RParen => {
                    self.advance()?;
                    return Ok(args);
                }
                _ => return Err(self.unexpected()),
            }
        }
    }

    fn ident(&mut self, what: &str) -> Result<String, ExpressionError> {
        match &self.current.token {
            Token::Ident(name) => {
                let name = name.clone();
                self.advance()?;
                Ok(name)
            }
            other => Err(ExpressionError::Compile {
                offset: self.current.start,
                message: format!("expected {}, found {}", what, describe(other)),
            }),
        }
    }
}

fn describe(token: &Token) -> String {
    match token {
        Token::Hash(name) => format!("'#{}'", name),
        Token::At(name) => format!("'@{}'", name),
        Token::Ident(name) => format!("'{}'", name),
        Token::Str(s) => format!("string '{}'", s),
        Token::Int(i) => format!("number {}", i),
        Token::Float(f) => format!("number {}", f),
        Token::Dot => "'.'".into(),
        Token::SafeDot => "'?.'".into(),
        Token::LBracket => "'['".into(),
        Token::RBracket => "']'".into(),
        Token::LParen => "'('".into(),
        Token::RParen => "')'".into(),
        Token::Comma => "','".into(),
        Token::Plus => "'+'".into(),
        Token::EqEq => "'=='".into(),
        Token::NotEq => "'!='".into(),
        Token::Question => "'?'".into(),
        Token::Colon => "':'".into(),
        Token::Elvis => "'?:'".into(),
        Token::RBrace => "'}'".into(),
        Token::Eof => "end of template".into(),
    }
}
