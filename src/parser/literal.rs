//! Structural parser for relaxed object literals.
//!
//! Accepts the subset of script object syntax that page frameworks emit for
//! serialized state: unquoted keys, single/double/backtick strings, hex and
//! signed numbers, `undefined`/`NaN`/`Infinity`, comments and trailing commas.
//! The output is plain `serde_json::Value`. Anything that would need
//! evaluation (calls, `new`, operators, template interpolation) is rejected.

use serde_json::{Map, Number, Value};

use crate::error::ExtractionError;

const MAX_DEPTH: usize = 512;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Colon,
    Comma,
    Str(String),
    Int(i64),
    Float(f64),
    Ident(String),
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::LBrace => "`{`".into(),
            Token::RBrace => "`}`".into(),
            Token::LBracket => "`[`".into(),
            Token::RBracket => "`]`".into(),
            Token::Colon => "`:`".into(),
            Token::Comma => "`,`".into(),
            Token::Str(_) => "string".into(),
            Token::Int(_) | Token::Float(_) => "number".into(),
            Token::Ident(name) => format!("identifier `{}`", name),
        }
    }
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn peek_char(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut it = self.src[self.pos..].chars();
        it.next();
        it.next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn error(&self, at: usize, msg: impl Into<String>) -> ExtractionError {
        ExtractionError::parse_failed(at, msg)
    }

    fn skip_trivia(&mut self) -> Result<(), ExtractionError> {
        loop {
            match self.peek_char() {
                Some(c) if c.is_whitespace() || c == '\u{feff}' => {
                    self.bump();
                }
                Some('/') if self.peek_second() == Some('/') => {
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                Some('/') if self.peek_second() == Some('*') => {
                    let start = self.pos;
                    match self.src[self.pos + 2..].find("*/") {
                        Some(end) => self.pos += 2 + end + 2,
                        None => return Err(self.error(start, "unterminated block comment")),
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    /// Next token with its starting byte offset, or `None` at end of input.
    fn next_token(&mut self) -> Result<Option<(usize, Token)>, ExtractionError> {
        self.skip_trivia()?;
        let start = self.pos;
        let Some(c) = self.peek_char() else {
            return Ok(None);
        };

        let token = match c {
            '{' => self.single(Token::LBrace),
            '}' => self.single(Token::RBrace),
            '[' => self.single(Token::LBracket),
            ']' => self.single(Token::RBracket),
            ':' => self.single(Token::Colon),
            ',' => self.single(Token::Comma),
            '"' | '\'' | '`' => self.string()?,
            '0'..='9' | '.' => self.number(false)?,
            '+' | '-' => {
                self.bump();
                let negative = c == '-';
                match self.peek_char() {
                    Some('0'..='9') | Some('.') => self.number(negative)?,
                    Some(n) if is_ident_start(n) => match self.ident() {
                        Token::Ident(name) if name == "Infinity" => Token::Float(if negative {
                            f64::NEG_INFINITY
                        } else {
                            f64::INFINITY
                        }),
                        _ => return Err(self.error(start, "unary operator on non-number")),
                    },
                    _ => return Err(self.error(start, format!("unexpected `{}`", c))),
                }
            }
            c if is_ident_start(c) => self.ident(),
            other => return Err(self.error(start, format!("unexpected character `{}`", other))),
        };

        Ok(Some((start, token)))
    }

    fn single(&mut self, token: Token) -> Token {
        self.bump();
        token
    }

    fn ident(&mut self) -> Token {
        let start = self.pos;
        while let Some(c) = self.peek_char() {
            if is_ident_continue(c) {
                self.bump();
            } else {
                break;
            }
        }
        Token::Ident(self.src[start..self.pos].to_string())
    }

    fn number(&mut self, negative: bool) -> Result<Token, ExtractionError> {
        let start = self.pos;

        if self.peek_char() == Some('0') {
            let radix = match self.peek_second() {
                Some('x') | Some('X') => Some(16),
                Some('o') | Some('O') => Some(8),
                Some('b') | Some('B') => Some(2),
                _ => None,
            };
            if let Some(radix) = radix {
                self.pos += 2;
                let digits_start = self.pos;
                while matches!(self.peek_char(), Some(c) if c.is_digit(radix)) {
                    self.bump();
                }
                let digits = &self.src[digits_start..self.pos];
                if digits.is_empty() {
                    return Err(self.error(start, "missing digits after radix prefix"));
                }
                self.reject_trailing_ident(start)?;
                let value = u64::from_str_radix(digits, radix)
                    .map_err(|e| self.error(start, e.to_string()))?;
                return Ok(match i64::try_from(value) {
                    Ok(v) if negative => Token::Int(-v),
                    Ok(v) => Token::Int(v),
                    Err(_) => Token::Float(if negative { -(value as f64) } else { value as f64 }),
                });
            }
        }

        let mut is_float = false;
        self.eat_digits();
        if self.peek_char() == Some('.') {
            is_float = true;
            self.bump();
            self.eat_digits();
        }
        if matches!(self.peek_char(), Some('e') | Some('E')) {
            is_float = true;
            self.bump();
            if matches!(self.peek_char(), Some('+') | Some('-')) {
                self.bump();
            }
            let exp_start = self.pos;
            self.eat_digits();
            if exp_start == self.pos {
                return Err(self.error(start, "missing exponent digits"));
            }
        }
        self.reject_trailing_ident(start)?;

        let text = &self.src[start..self.pos];
        if text == "." {
            return Err(self.error(start, "unexpected `.`"));
        }

        if !is_float {
            if let Ok(v) = text.parse::<i64>() {
                return Ok(Token::Int(if negative { -v } else { v }));
            }
        }

        let mut normalized = String::with_capacity(text.len() + 2);
        if text.starts_with('.') {
            normalized.push('0');
        }
        normalized.push_str(text);
        if text.ends_with('.') {
            normalized.push('0');
        }
        let value: f64 = normalized
            .parse()
            .map_err(|_| self.error(start, format!("invalid number `{}`", text)))?;
        Ok(Token::Float(if negative { -value } else { value }))
    }

    fn eat_digits(&mut self) {
        while matches!(self.peek_char(), Some(c) if c.is_ascii_digit()) {
            self.bump();
        }
    }

    fn reject_trailing_ident(&self, start: usize) -> Result<(), ExtractionError> {
        match self.peek_char() {
            Some(c) if is_ident_continue(c) => {
                Err(self.error(start, "identifier directly after number"))
            }
            _ => Ok(()),
        }
    }

    fn string(&mut self) -> Result<Token, ExtractionError> {
        let start = self.pos;
        let quote = self.bump().unwrap_or('"');
        let mut out = String::new();

        loop {
            let Some(c) = self.bump() else {
                return Err(self.error(start, "unterminated string"));
            };
            match c {
                c if c == quote => return Ok(Token::Str(out)),
                '\\' => self.escape(start, &mut out)?,
                '\n' | '\r' if quote != '`' => {
                    return Err(self.error(start, "line break inside string"));
                }
                '$' if quote == '`' && self.peek_char() == Some('{') => {
                    return Err(self.error(start, "template interpolation is not supported"));
                }
                c => out.push(c),
            }
        }
    }

    fn escape(&mut self, start: usize, out: &mut String) -> Result<(), ExtractionError> {
        let Some(c) = self.bump() else {
            return Err(self.error(start, "unterminated escape"));
        };
        match c {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' if !matches!(self.peek_char(), Some('0'..='9')) => out.push('\0'),
            'x' => {
                let code = self.hex_digits(start, 2)?;
                out.push(char::from_u32(code).unwrap_or('\u{fffd}'));
            }
            'u' => {
                let code = self.unicode_escape(start)?;
                out.push(code);
            }
            // line continuation
            '\r' => {
                if self.peek_char() == Some('\n') {
                    self.bump();
                }
            }
            '\n' | '\u{2028}' | '\u{2029}' => {}
            other => out.push(other),
        }
        Ok(())
    }

    fn hex_digits(&mut self, start: usize, count: usize) -> Result<u32, ExtractionError> {
        let end = self.pos + count;
        let digits = self
            .src
            .get(self.pos..end)
            .filter(|d| d.chars().all(|c| c.is_ascii_hexdigit()))
            .ok_or_else(|| self.error(start, "invalid hex escape"))?;
        let value = u32::from_str_radix(digits, 16).map_err(|e| self.error(start, e.to_string()))?;
        self.pos = end;
        Ok(value)
    }

    fn unicode_escape(&mut self, start: usize) -> Result<char, ExtractionError> {
        if self.peek_char() == Some('{') {
            self.bump();
            let digits_start = self.pos;
            while matches!(self.peek_char(), Some(c) if c.is_ascii_hexdigit()) {
                self.bump();
            }
            let digits_end = self.pos;
            if self.bump() != Some('}') || digits_end == digits_start {
                return Err(self.error(start, "invalid code point escape"));
            }
            let code = u32::from_str_radix(&self.src[digits_start..digits_end], 16)
                .map_err(|_| self.error(start, "code point out of range"))?;
            return char::from_u32(code).ok_or_else(|| self.error(start, "invalid code point"));
        }

        let high = self.hex_digits(start, 4)?;
        if (0xD800..0xDC00).contains(&high) && self.src[self.pos..].starts_with("\\u") {
            let save = self.pos;
            self.pos += 2;
            if let Ok(low) = self.hex_digits(start, 4) {
                if (0xDC00..0xE000).contains(&low) {
                    let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
                    return Ok(char::from_u32(code).unwrap_or('\u{fffd}'));
                }
            }
            self.pos = save;
        }
        Ok(char::from_u32(high).unwrap_or('\u{fffd}'))
    }
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c == '$' || c.is_alphabetic()
}

fn is_ident_continue(c: char) -> bool {
    is_ident_start(c) || c.is_alphanumeric()
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    peeked: Option<(usize, Token)>,
}

impl<'a> Parser<'a> {
    fn peek(&mut self) -> Result<Option<&(usize, Token)>, ExtractionError> {
        if self.peeked.is_none() {
            self.peeked = self.lexer.next_token()?;
        }
        Ok(self.peeked.as_ref())
    }

    fn next(&mut self) -> Result<(usize, Token), ExtractionError> {
        match self.peeked.take() {
            Some(t) => Ok(t),
            None => self
                .lexer
                .next_token()?
                .ok_or_else(|| ExtractionError::parse_failed(self.lexer.pos, "unexpected end of input")),
        }
    }

    fn value(&mut self, depth: usize) -> Result<Value, ExtractionError> {
        let (at, token) = self.next()?;
        if depth > MAX_DEPTH {
            return Err(ExtractionError::parse_failed(at, "nesting too deep"));
        }
        match token {
            Token::LBrace => self.object(depth + 1),
            Token::LBracket => self.array(depth + 1),
            Token::Str(s) => Ok(Value::String(s)),
            Token::Int(i) => Ok(Value::Number(i.into())),
            Token::Float(f) => Ok(Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)),
            Token::Ident(name) => match name.as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                "null" | "undefined" | "NaN" | "Infinity" => Ok(Value::Null),
                _ => Err(ExtractionError::parse_failed(
                    at,
                    format!("unexpected identifier `{}`", name),
                )),
            },
            other => Err(ExtractionError::parse_failed(
                at,
                format!("expected a value, found {}", other.describe()),
            )),
        }
    }

    fn object(&mut self, depth: usize) -> Result<Value, ExtractionError> {
        let mut map = Map::new();
        loop {
            if matches!(self.peek()?, Some((_, Token::RBrace))) {
                self.next()?;
                return Ok(Value::Object(map));
            }

            let (at, key_token) = self.next()?;
            let key = match key_token {
                Token::Str(s) | Token::Ident(s) => s,
                Token::Int(i) => i.to_string(),
                Token::Float(f) => f.to_string(),
                other => {
                    return Err(ExtractionError::parse_failed(
                        at,
                        format!("expected a key, found {}", other.describe()),
                    ))
                }
            };

            let (at, colon) = self.next()?;
            if colon != Token::Colon {
                return Err(ExtractionError::parse_failed(
                    at,
                    format!("expected `:` after key `{}`, found {}", key, colon.describe()),
                ));
            }

            let value = self.value(depth)?;
            map.insert(key, value);

            match self.next()? {
                (_, Token::Comma) => continue,
                (_, Token::RBrace) => return Ok(Value::Object(map)),
                (at, other) => {
                    return Err(ExtractionError::parse_failed(
                        at,
                        format!("expected `,` or `}}`, found {}", other.describe()),
                    ))
                }
            }
        }
    }

    fn array(&mut self, depth: usize) -> Result<Value, ExtractionError> {
        let mut items = Vec::new();
        loop {
            match self.peek()? {
                Some((_, Token::RBracket)) => {
                    self.next()?;
                    return Ok(Value::Array(items));
                }
                // hole: `[a,,b]`
                Some((_, Token::Comma)) => {
                    self.next()?;
                    items.push(Value::Null);
                    continue;
                }
                _ => {}
            }

            items.push(self.value(depth)?);

            match self.next()? {
                (_, Token::Comma) => continue,
                (_, Token::RBracket) => return Ok(Value::Array(items)),
                (at, other) => {
                    return Err(ExtractionError::parse_failed(
                        at,
                        format!("expected `,` or `]`, found {}", other.describe()),
                    ))
                }
            }
        }
    }
}

/// Parse one relaxed literal. Trailing non-whitespace input is an error.
pub fn parse(src: &str) -> Result<Value, ExtractionError> {
    let mut parser = Parser {
        lexer: Lexer::new(src),
        peeked: None,
    };
    let value = parser.value(0)?;
    if let Some((at, token)) = parser.peek()? {
        return Err(ExtractionError::parse_failed(
            *at,
            format!("trailing {} after literal", token.describe()),
        ));
    }
    Ok(value)
}

// ── Tests ──
