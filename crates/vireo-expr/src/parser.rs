#![forbid(unsafe_code)]

//! Recursive-descent parser for template expressions.
//!
//! Precedence, lowest first: assignment, conditional, `||`, `&&`,
//! equality, relational, additive, multiplicative, unary, postfix.
//!
//! Identifier handling is where scope resolution is decided: a bare name
//! becomes [`Expr::Ident`] (a member of the component), while names after
//! `.` and object-literal keys stay literal strings, and `this`, `$event`,
//! `$element`, `$global`, and the literal keywords are never resolved.

use std::rc::Rc;

use crate::ast::{AssignOp, BinaryOp, Expr, Literal, LogicalOp, Program, Reserved, UnaryOp};
use crate::error::ParseError;
use crate::lexer::{Punct, Token, TokenKind, tokenize};

/// Maximum nesting depth accepted by the parser.
pub const MAX_DEPTH: usize = 96;

/// Keywords of the host scripting language that expressions may not use.
const UNSUPPORTED_KEYWORDS: &[&str] = &[
    "break",
    "case",
    "catch",
    "continue",
    "debugger",
    "default",
    "delete",
    "do",
    "else",
    "finally",
    "for",
    "function",
    "if",
    "in",
    "instanceof",
    "new",
    "return",
    "switch",
    "throw",
    "try",
    "var",
    "void",
    "while",
    "class",
    "with",
    "let",
    "abstract",
    "import",
    "yield",
    "arguments",
];

/// Parse a full expression source into a [`Program`].
pub fn parse_program(source: &str) -> Result<Program, ParseError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    parser.program()
}

/// Parse a single expression (no `;`).
pub fn parse_expression(source: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    if parser.at_eof() {
        return Err(ParseError::Empty);
    }
    let expr = parser.expression()?;
    parser.expect_eof()?;
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> &TokenKind {
        self.tokens
            .get(self.pos)
            .map_or(&TokenKind::Eof, |t| &t.kind)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map_or(0, |t| t.offset)
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek(), TokenKind::Eof)
    }

    fn advance(&mut self) -> TokenKind {
        let kind = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        kind
    }

    fn check(&self, punct: Punct) -> bool {
        matches!(self.peek(), TokenKind::Punct(p) if *p == punct)
    }

    fn eat(&mut self, punct: Punct) -> bool {
        if self.check(punct) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn unexpected(&self, expected: &'static str) -> ParseError {
        match self.peek() {
            TokenKind::Eof => ParseError::UnexpectedEnd { expected },
            found => ParseError::UnexpectedToken {
                found: found.to_string(),
                expected,
                offset: self.offset(),
            },
        }
    }

    fn expect(&mut self, punct: Punct, expected: &'static str) -> Result<(), ParseError> {
        if self.eat(punct) {
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn expect_eof(&self) -> Result<(), ParseError> {
        if self.at_eof() {
            Ok(())
        } else {
            Err(self.unexpected("end of expression"))
        }
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ParseError::TooDeep { limit: MAX_DEPTH });
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn program(&mut self) -> Result<Program, ParseError> {
        let mut statements = Vec::new();
        let mut is_statement = false;
        while !self.at_eof() {
            if self.eat(Punct::Semicolon) {
                is_statement = true;
                continue;
            }
            statements.push(self.expression()?);
            is_statement = false;
            if !self.at_eof() && !self.check(Punct::Semicolon) {
                return Err(self.unexpected("`;` or end of expression"));
            }
        }
        if statements.is_empty() {
            return Err(ParseError::Empty);
        }
        Ok(Program {
            statements,
            is_statement,
        })
    }

    fn expression(&mut self) -> Result<Expr, ParseError> {
        self.enter()?;
        let result = self.assignment();
        self.leave();
        result
    }

    fn assignment(&mut self) -> Result<Expr, ParseError> {
        let offset = self.offset();
        let target = self.conditional()?;
        let op = match self.peek() {
            TokenKind::Punct(Punct::Assign) => AssignOp::Assign,
            TokenKind::Punct(Punct::PlusAssign) => AssignOp::Compound(BinaryOp::Add),
            TokenKind::Punct(Punct::MinusAssign) => AssignOp::Compound(BinaryOp::Sub),
            TokenKind::Punct(Punct::StarAssign) => AssignOp::Compound(BinaryOp::Mul),
            TokenKind::Punct(Punct::SlashAssign) => AssignOp::Compound(BinaryOp::Div),
            _ => return Ok(target),
        };
        if !target.is_assignable() {
            return Err(ParseError::InvalidAssignmentTarget { offset });
        }
        self.advance();
        let value = self.expression()?;
        Ok(Expr::Assign {
            op,
            target: Box::new(target),
            value: Box::new(value),
        })
    }

    fn conditional(&mut self) -> Result<Expr, ParseError> {
        let test = self.logical_or()?;
        if !self.eat(Punct::Question) {
            return Ok(test);
        }
        let consequent = self.expression()?;
        self.expect(Punct::Colon, "`:` in conditional")?;
        let alternate = self.expression()?;
        Ok(Expr::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    fn logical_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.logical_and()?;
        while self.eat(Punct::OrOr) {
            let right = self.logical_and()?;
            left = Expr::Logical {
                op: LogicalOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn logical_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.equality()?;
        while self.eat(Punct::AndAnd) {
            let right = self.equality()?;
            left = Expr::Logical {
                op: LogicalOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn binary_level(
        &mut self,
        next: fn(&mut Self) -> Result<Expr, ParseError>,
        ops: &[(Punct, BinaryOp)],
    ) -> Result<Expr, ParseError> {
        let mut left = next(self)?;
        'outer: loop {
            for &(punct, op) in ops {
                if self.eat(punct) {
                    let right = next(self)?;
                    left = Expr::Binary {
                        op,
                        left: Box::new(left),
                        right: Box::new(right),
                    };
                    continue 'outer;
                }
            }
            return Ok(left);
        }
    }

    fn equality(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(
            Self::relational,
            &[
                (Punct::EqEqEq, BinaryOp::StrictEq),
                (Punct::NotEqEq, BinaryOp::StrictNotEq),
                (Punct::EqEq, BinaryOp::Eq),
                (Punct::NotEq, BinaryOp::NotEq),
            ],
        )
    }

    fn relational(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(
            Self::additive,
            &[
                (Punct::Le, BinaryOp::Le),
                (Punct::Ge, BinaryOp::Ge),
                (Punct::Lt, BinaryOp::Lt),
                (Punct::Gt, BinaryOp::Gt),
            ],
        )
    }

    fn additive(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(
            Self::multiplicative,
            &[(Punct::Plus, BinaryOp::Add), (Punct::Minus, BinaryOp::Sub)],
        )
    }

    fn multiplicative(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(
            Self::unary,
            &[
                (Punct::Star, BinaryOp::Mul),
                (Punct::Slash, BinaryOp::Div),
                (Punct::Percent, BinaryOp::Rem),
            ],
        )
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek() {
            TokenKind::Punct(Punct::Bang) => UnaryOp::Not,
            TokenKind::Punct(Punct::Minus) => UnaryOp::Neg,
            TokenKind::Punct(Punct::Plus) => UnaryOp::Plus,
            TokenKind::Ident(name) if name == "typeof" => UnaryOp::TypeOf,
            _ => return self.postfix(),
        };
        self.advance();
        self.enter()?;
        let operand = self.unary();
        self.leave();
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand?),
        })
    }

    fn postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.primary()?;
        loop {
            if self.eat(Punct::Dot) {
                let TokenKind::Ident(property) = self.advance() else {
                    self.pos -= 1;
                    return Err(self.unexpected("property name after `.`"));
                };
                expr = Expr::Member {
                    object: Box::new(expr),
                    property,
                };
            } else if self.eat(Punct::LBracket) {
                let index = self.expression()?;
                self.expect(Punct::RBracket, "`]`")?;
                expr = Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                };
            } else if self.eat(Punct::LParen) {
                let args = self.arguments()?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn arguments(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        if self.eat(Punct::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.expression()?);
            if self.eat(Punct::RParen) {
                return Ok(args);
            }
            self.expect(Punct::Comma, "`,` or `)` in argument list")?;
        }
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let offset = self.offset();
        match self.advance() {
            TokenKind::Number(n) => Ok(Expr::Literal(Literal::Number(n))),
            TokenKind::Str(s) => Ok(Expr::Literal(Literal::Str(Rc::from(s)))),
            TokenKind::Ident(name) => Self::identifier(name, offset),
            TokenKind::Punct(Punct::LParen) => {
                let expr = self.expression()?;
                self.expect(Punct::RParen, "`)`")?;
                Ok(expr)
            }
            TokenKind::Punct(Punct::LBracket) => self.array_literal(),
            TokenKind::Punct(Punct::LBrace) => self.object_literal(),
            _ => {
                self.pos -= 1;
                Err(self.unexpected("an expression"))
            }
        }
    }

    fn identifier(name: String, offset: usize) -> Result<Expr, ParseError> {
        let expr = match name.as_str() {
            "true" => Expr::Literal(Literal::Bool(true)),
            "false" => Expr::Literal(Literal::Bool(false)),
            "null" => Expr::Literal(Literal::Null),
            "undefined" => Expr::Literal(Literal::Undefined),
            "this" => Expr::Reserved(Reserved::This),
            "$event" => Expr::Reserved(Reserved::Event),
            "$element" => Expr::Reserved(Reserved::Element),
            "$global" => Expr::Reserved(Reserved::Global),
            keyword if UNSUPPORTED_KEYWORDS.contains(&keyword) || keyword == "typeof" => {
                return Err(ParseError::UnsupportedKeyword {
                    keyword: name,
                    offset,
                });
            }
            _ => Expr::Ident(name),
        };
        Ok(expr)
    }

    fn array_literal(&mut self) -> Result<Expr, ParseError> {
        let mut items = Vec::new();
        loop {
            if self.eat(Punct::RBracket) {
                return Ok(Expr::Array(items));
            }
            items.push(self.expression()?);
            if self.eat(Punct::RBracket) {
                return Ok(Expr::Array(items));
            }
            self.expect(Punct::Comma, "`,` or `]` in array literal")?;
        }
    }

    fn object_literal(&mut self) -> Result<Expr, ParseError> {
        let mut entries = Vec::new();
        loop {
            if self.eat(Punct::RBrace) {
                return Ok(Expr::Object(entries));
            }
            let key_offset = self.offset();
            let key = match self.advance() {
                TokenKind::Ident(name) => name,
                TokenKind::Str(s) => s,
                TokenKind::Number(n) => vireo_core::format_number(n),
                _ => {
                    self.pos -= 1;
                    return Err(self.unexpected("property key in object literal"));
                }
            };
            let value = if self.eat(Punct::Colon) {
                self.expression()?
            } else {
                // Shorthand `{ name }` reads `name` from the scope.
                Self::identifier(key.clone(), key_offset)?
            };
            entries.push((key, value));
            if self.eat(Punct::RBrace) {
                return Ok(Expr::Object(entries));
            }
            self.expect(Punct::Comma, "`,` or `}` in object literal")?;
        }
    }
}
