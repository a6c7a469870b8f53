//! Tokenizer for the text between `#{` and `}`.

use super::ExpressionError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// `#name`
    Hash(String),
    /// `@name`
    At(String),
    Ident(String),
    Str(String),
    Int(i64),
    Float(f64),
    Dot,
    SafeDot,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Comma,
    Plus,
    EqEq,
    NotEq,
    Question,
    Colon,
    Elvis,
    RBrace,
    Eof,
}

/// A token and the byte offsets it spans in the template.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub start: usize,
    pub end: usize,
}

pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Lex `src` starting at byte offset `pos`.
    pub fn new(src: &'a str, pos: usize) -> Self {
        Self { src, pos }
    }

    fn peek_char(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.src[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek_char(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn ident(&mut self) -> String {
        let start = self.pos;
        while matches!(self.peek_char(), Some(c) if c.is_alphanumeric() || c == '_' || c == '$') {
            self.bump();
        }
        self.src[start..self.pos].to_string()
    }

    fn error(&self, offset: usize, message: impl Into<String>) -> ExpressionError {
        ExpressionError::Compile {
            offset,
            message: message.into(),
        }
    }

    pub fn next_token(&mut self) -> Result<Spanned, ExpressionError> {
        self.skip_whitespace();
        let start = self.pos;

        let Some(c) = self.bump() else {
            return Ok(Spanned {
                token: Token::Eof,
                start,
                end: start,
            });
        };

        let token = match c {
            '#' | '@' => {
                let name = self.ident();
                if name.is_empty() {
                    return Err(self.error(start, format!("expected a name after '{}'", c)));
                }
                if c == '#' {
                    Token::Hash(name)
                } else {
                    Token::At(name)
                }
            }
            '\'' | '"' => self.string(c, start)?,
            '0'..='9' => self.number(start)?,
            '-' if matches!(self.peek_char(), Some('0'..='9')) => self.number(start)?,
            '.' => Token::Dot,
            '?' => match self.peek_char() {
                Some('.') => {
                    self.bump();
                    Token::SafeDot
                }
                Some(':') => {
                    self.bump();
                    Token::Elvis
                }
                _ => Token::Question,
            },
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            '(' => Token::LParen,
            ')' => Token::RParen,
            ',' => Token::Comma,
            '+' => Token::Plus,
            ':' => Token::Colon,
            '}' => Token::RBrace,
            '=' if self.peek_char() == Some('=') => {
                self.bump();
                Token::EqEq
            }
            '!' if self.peek_char() == Some('=') => {
                self.bump();
                Token::NotEq
            }
            c if c.is_alphabetic() || c == '_' => {
                self.pos = start;
                Token::Ident(self.ident())
            }
            other => return Err(self.error(start, format!("unexpected character '{}'", other))),
        };

        Ok(Spanned {
            token,
            start,
            end: self.pos,
        })
    }

    fn string(&mut self, quote: char, start: usize) -> Result<Token, ExpressionError> {
        let mut value = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error(start, "unterminated string literal")),
                // A doubled quote stands for one quote character
                Some(c) if c == quote && self.peek_char() == Some(quote) => {
                    self.bump();
                    value.push(quote);
                }
                Some(c) if c == quote => return Ok(Token::Str(value)),
                Some(c) => value.push(c),
            }
        }
    }

    fn number(&mut self, start: usize) -> Result<Token, ExpressionError> {
        while matches!(self.peek_char(), Some('0'..='9')) {
            self.bump();
        }
        let is_float =
            self.peek_char() == Some('.') && matches!(self.peek_second(), Some('0'..='9'));
        if is_float {
            self.bump();
            while matches!(self.peek_char(), Some('0'..='9')) {
                self.bump();
            }
        }

        let text = &self.src[start..self.pos];
        if is_float {
            text.parse()
                .map(Token::Float)
                .map_err(|_| self.error(start, format!("invalid number '{}'", text)))
        } else {
            text.parse()
                .map(Token::Int)
                .map_err(|_| self.error(start, format!("integer out of range '{}'", text)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(src: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(src, 0);
        let mut out = Vec::new();
        loop {
            let spanned = lexer.next_token().unwrap();
            if spanned.token == Token::Eof {
                return out;
            }
            out.push(spanned.token);
        }
    }

    #[test]
    fn test_lexes_operators_and_names() {
        assert_eq!(
            tokens("#user?.name ?: 'n/a' }"),
            vec![
                Token::Hash("user".into()),
                Token::SafeDot,
                Token::Ident("name".into()),
                Token::Elvis,
                Token::Str("n/a".into()),
                Token::RBrace,
            ]
        );
        assert_eq!(
            tokens("@svc.find(1, -2.5) == null"),
            vec![
                Token::At("svc".into()),
                Token::Dot,
                Token::Ident("find".into()),
                Token::LParen,
                Token::Int(1),
                Token::Comma,
                Token::Float(-2.5),
                Token::RParen,
                Token::EqEq,
                Token::Ident("null".into()),
            ]
        );
    }

    #[test]
    fn test_string_escapes_and_errors() {
        assert_eq!(tokens("'it''s'"), vec![Token::Str("it's".into())]);
        assert_eq!(tokens("\"课程}\""), vec![Token::Str("课程}".into())]);

        let mut lexer = Lexer::new("'open", 0);
        assert!(matches!(
            lexer.next_token(),
            Err(ExpressionError::Compile { offset: 0, .. })
        ));

        let mut lexer = Lexer::new("#", 0);
        assert!(lexer.next_token().is_err());
    }

    #[test]
    fn test_integer_followed_by_property_dot() {
        assert_eq!(
            tokens("#items[0].id"),
            vec![
                Token::Hash("items".into()),
                Token::LBracket,
                Token::Int(0),
                Token::RBracket,
                Token::Dot,
                Token::Ident("id".into()),
            ]
        );
    }
}
