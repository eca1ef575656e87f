#![forbid(unsafe_code)]

//! Tokenizer for template expressions.

use std::fmt;

use crate::error::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Punct {
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Dot,
    Comma,
    Colon,
    Semicolon,
    Question,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    Lt,
    Le,
    Gt,
    Ge,
    EqEq,
    NotEq,
    EqEqEq,
    NotEqEq,
    AndAnd,
    OrOr,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
}

impl Punct {
    fn as_str(self) -> &'static str {
        match self {
            Self::LParen => "(",
            Self::RParen => ")",
            Self::LBracket => "[",
            Self::RBracket => "]",
            Self::LBrace => "{",
            Self::RBrace => "}",
            Self::Dot => ".",
            Self::Comma => ",",
            Self::Colon => ":",
            Self::Semicolon => ";",
            Self::Question => "?",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Slash => "/",
            Self::Percent => "%",
            Self::Bang => "!",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::EqEq => "==",
            Self::NotEq => "!=",
            Self::EqEqEq => "===",
            Self::NotEqEq => "!==",
            Self::AndAnd => "&&",
            Self::OrOr => "||",
            Self::Assign => "=",
            Self::PlusAssign => "+=",
            Self::MinusAssign => "-=",
            Self::StarAssign => "*=",
            Self::SlashAssign => "/=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Str(String),
    Ident(String),
    Punct(Punct),
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "number {n}"),
            Self::Str(s) => write!(f, "string {s:?}"),
            Self::Ident(name) => write!(f, "`{name}`"),
            Self::Punct(p) => write!(f, "`{}`", p.as_str()),
            Self::Eof => f.write_str("end of expression"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub offset: usize,
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Split `source` into tokens, ending with [`TokenKind::Eof`].
pub fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    let mut lexer = Lexer {
        source,
        chars: source.char_indices().peekable(),
        tokens: Vec::new(),
    };
    lexer.run()?;
    Ok(lexer.tokens)
}

struct Lexer<'a> {
    source: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    tokens: Vec<Token>,
}

impl Lexer<'_> {
    fn push(&mut self, kind: TokenKind, offset: usize) {
        self.tokens.push(Token { kind, offset });
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.chars.peek().is_some_and(|&(_, c)| c == expected) {
            self.chars.next();
            true
        } else {
            false
        }
    }

    fn run(&mut self) -> Result<(), ParseError> {
        while let Some((offset, c)) = self.chars.next() {
            match c {
                c if c.is_whitespace() => {}
                '0'..='9' => self.number(offset)?,
                '.' if self.chars.peek().is_some_and(|(_, n)| n.is_ascii_digit()) => {
                    self.number(offset)?;
                }
                '\'' | '"' => self.string(offset, c)?,
                c if is_ident_start(c) => self.ident(offset),
                _ => {
                    let punct = self.punct(offset, c)?;
                    self.push(TokenKind::Punct(punct), offset);
                }
            }
        }
        self.push(TokenKind::Eof, self.source.len());
        Ok(())
    }

    fn punct(&mut self, offset: usize, c: char) -> Result<Punct, ParseError> {
        let punct = match c {
            '(' => Punct::LParen,
            ')' => Punct::RParen,
            '[' => Punct::LBracket,
            ']' => Punct::RBracket,
            '{' => Punct::LBrace,
            '}' => Punct::RBrace,
            '.' => Punct::Dot,
            ',' => Punct::Comma,
            ':' => Punct::Colon,
            ';' => Punct::Semicolon,
            '?' => Punct::Question,
            '%' => Punct::Percent,
            '+' if self.eat('=') => Punct::PlusAssign,
            '+' => Punct::Plus,
            '-' if self.eat('=') => Punct::MinusAssign,
            '-' => Punct::Minus,
            '*' if self.eat('=') => Punct::StarAssign,
            '*' => Punct::Star,
            '/' if self.eat('=') => Punct::SlashAssign,
            '/' => Punct::Slash,
            '<' if self.eat('=') => Punct::Le,
            '<' => Punct::Lt,
            '>' if self.eat('=') => Punct::Ge,
            '>' => Punct::Gt,
            '=' if self.eat('=') => {
                if self.eat('=') {
                    Punct::EqEqEq
                } else {
                    Punct::EqEq
                }
            }
            '=' => Punct::Assign,
            '!' if self.eat('=') => {
                if self.eat('=') {
                    Punct::NotEqEq
                } else {
                    Punct::NotEq
                }
            }
            '!' => Punct::Bang,
            '&' if self.eat('&') => Punct::AndAnd,
            '|' if self.eat('|') => Punct::OrOr,
            found => return Err(ParseError::UnexpectedChar { found, offset }),
        };
        Ok(punct)
    }

    fn ident(&mut self, start: usize) {
        let mut end = self.source.len();
        while let Some(&(i, c)) = self.chars.peek() {
            if !is_ident_continue(c) {
                end = i;
                break;
            }
            self.chars.next();
        }
        self.push(TokenKind::Ident(self.source[start..end].to_owned()), start);
    }

    fn number(&mut self, start: usize) -> Result<(), ParseError> {
        let rest = &self.source[start..];
        let (len, value) = if let Some(hex) = rest
            .strip_prefix("0x")
            .or_else(|| rest.strip_prefix("0X"))
        {
            let digits = hex
                .find(|c: char| !c.is_ascii_hexdigit())
                .unwrap_or(hex.len());
            let value = u64::from_str_radix(&hex[..digits], 16)
                .ok()
                .map(|n| n as f64);
            (2 + digits, value)
        } else {
            let len = scan_decimal(rest);
            (len, rest[..len].parse::<f64>().ok())
        };
        let Some(value) = value else {
            return Err(ParseError::InvalidNumber {
                text: rest[..len].to_owned(),
                offset: start,
            });
        };
        self.finish_number(start, len, value);
        Ok(())
    }

    fn finish_number(&mut self, start: usize, len: usize, value: f64) {
        while self.chars.peek().is_some_and(|&(i, _)| i < start + len) {
            self.chars.next();
        }
        self.push(TokenKind::Number(value), start);
    }

    fn string(&mut self, start: usize, quote: char) -> Result<(), ParseError> {
        let mut out = String::new();
        loop {
            let Some((_, c)) = self.chars.next() else {
                return Err(ParseError::UnterminatedString { offset: start });
            };
            match c {
                c if c == quote => break,
                '\\' => {
                    let Some((_, escaped)) = self.chars.next() else {
                        return Err(ParseError::UnterminatedString { offset: start });
                    };
                    match escaped {
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        'r' => out.push('\r'),
                        '0' => out.push('\0'),
                        'u' => out.push(self.unicode_escape().unwrap_or('\u{fffd}')),
                        other => out.push(other),
                    }
                }
                c => out.push(c),
            }
        }
        self.push(TokenKind::Str(out), start);
        Ok(())
    }

    fn unicode_escape(&mut self) -> Option<char> {
        let mut code = 0u32;
        for _ in 0..4 {
            let (_, c) = self.chars.next_if(|(_, c)| c.is_ascii_hexdigit())?;
            code = code * 16 + c.to_digit(16)?;
        }
        char::from_u32(code)
    }
}

/// Length of the decimal literal at the start of `text`.
fn scan_decimal(text: &str) -> usize {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i + 1 < bytes.len() && bytes[i] == b'.' && bytes[i + 1].is_ascii_digit() {
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
    }
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        let digits_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > digits_start {
            i = j;
        }
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .map(|tokens| tokens.into_iter().map(|t| t.kind).collect())
            .unwrap_or_default()
    }

    #[test]
    fn operators_use_longest_match() {
        assert_eq!(
            kinds("a !== b"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Punct(Punct::NotEqEq),
                TokenKind::Ident("b".into()),
                TokenKind::Eof,
            ]
        );
        assert_eq!(kinds("+=")[0], TokenKind::Punct(Punct::PlusAssign));
        assert_eq!(kinds("<=")[0], TokenKind::Punct(Punct::Le));
    }

    #[test]
    fn numbers() {
        assert_eq!(kinds("1.5e2")[0], TokenKind::Number(150.0));
        assert_eq!(kinds(".25")[0], TokenKind::Number(0.25));
        assert_eq!(kinds("0xff")[0], TokenKind::Number(255.0));
        assert_eq!(
            kinds("1.x"),
            vec![
                TokenKind::Number(1.0),
                TokenKind::Punct(Punct::Dot),
                TokenKind::Ident("x".into()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn string_escapes() {
        assert_eq!(kinds(r"'it\'s'")[0], TokenKind::Str("it's".into()));
        assert_eq!(kinds(r#""a\nb""#)[0], TokenKind::Str("a\nb".into()));
        assert_eq!(kinds(r"'\u0041'")[0], TokenKind::Str("A".into()));
    }

    #[test]
    fn dollar_identifiers() {
        assert_eq!(kinds("$event")[0], TokenKind::Ident("$event".into()));
        assert_eq!(kinds("_a1")[0], TokenKind::Ident("_a1".into()));
    }

    #[test]
    fn errors_carry_offsets() {
        assert_eq!(
            tokenize("a # b"),
            Err(ParseError::UnexpectedChar {
                found: '#',
                offset: 2
            })
        );
        assert_eq!(
            tokenize("x + 'open"),
            Err(ParseError::UnterminatedString { offset: 4 })
        );
        assert!(tokenize("a & b").is_err());
    }
}
