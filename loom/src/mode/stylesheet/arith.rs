//! Unit arithmetic in stylesheet values.
//!
//! A value such as `10px + ${gap} * 2` is recognized as arithmetic when it
//! is made only of numeric literals, expressions, operators and
//! parentheses. Anything else (keywords, colors, lists such as
//! `1px -2px`, shorthand slashes such as `12px/1.5`) is a plain value.

use loom_style::{Calc, CalcOp, Quantity};

use crate::mode::chain::Piece;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(Quantity),
    Dynamic(String),
    Op(CalcOp),
    LParen,
    RParen,
}

impl Token {
    fn ends_operand(&self) -> bool {
        matches!(self, Token::Number(_) | Token::Dynamic(_) | Token::RParen)
    }
}

/// Parse the pieces of a value as arithmetic. `None` when the value is not
/// a pure arithmetic expression.
pub fn parse_value(pieces: &[Piece]) -> Option<Calc> {
    let tokens = tokenize(pieces)?;
    let mut parser = CalcParser { tokens, pos: 0 };
    let calc = parser.parse_expr(0)?;
    if parser.pos != parser.tokens.len() {
        return None;
    }
    Some(calc)
}

/// Whether a parsed value must be computed with unit-aware arithmetic:
/// it has an operator and either a runtime operand or a unit.
pub fn needs_rewrite(calc: &Calc) -> bool {
    calc.operator_count() > 0 && (calc.has_dynamic() || calc.has_unit_literal())
}

fn tokenize(pieces: &[Piece]) -> Option<Vec<Token>> {
    let mut tokens: Vec<Token> = Vec::new();
    // whitespace seen since the last token
    let mut space = false;
    for piece in pieces {
        match piece {
            Piece::Comment(_) => {}
            Piece::Expr(expr) => {
                if tokens.last().is_some_and(Token::ends_operand) {
                    return None;
                }
                tokens.push(Token::Dynamic(expr.source.clone()));
                space = false;
            }
            Piece::Text(text) => {
                let mut chars = text.char_indices().peekable();
                while let Some((i, c)) = chars.next() {
                    let after_operand = tokens.last().is_some_and(Token::ends_operand);
                    let next = chars.peek().map(|&(_, n)| n);
                    match c {
                        c if c.is_whitespace() => {
                            space = true;
                            continue;
                        }
                        '(' => {
                            if after_operand {
                                return None;
                            }
                            tokens.push(Token::LParen);
                        }
                        ')' => tokens.push(Token::RParen),
                        '+' | '-' if after_operand => {
                            let spaced_after = next.is_none_or(char::is_whitespace);
                            if space && !spaced_after {
                                // `1px -2px` is a list of two values
                                return None;
                            }
                            tokens.push(Token::Op(CalcOp::from_char(c)?));
                        }
                        '/' => {
                            let spaced_after = next.is_none_or(char::is_whitespace);
                            if !after_operand || !space || !spaced_after {
                                return None;
                            }
                            tokens.push(Token::Op(CalcOp::Div));
                        }
                        '*' | '%' => {
                            if !after_operand {
                                return None;
                            }
                            tokens.push(Token::Op(CalcOp::from_char(c)?));
                        }
                        c if c.is_ascii_digit() || c == '.' || c == '+' || c == '-' => {
                            if after_operand {
                                return None;
                            }
                            if matches!(c, '+' | '-') && !next.is_some_and(|n| n.is_ascii_digit() || n == '.') {
                                // a sign before a group or an expression
                                if c == '-' {
                                    tokens.push(Token::Op(CalcOp::Sub));
                                }
                                space = false;
                                continue;
                            }
                            let rest = &text[i..];
                            let len = rest[1..]
                                .find(|n: char| !(n.is_ascii_alphanumeric() || n == '.' || n == '%'))
                                .map_or(rest.len(), |l| l + 1);
                            let quantity = Quantity::parse(&rest[..len])?;
                            tokens.push(Token::Number(quantity));
                            for _ in 1..rest[..len].chars().count() {
                                chars.next();
                            }
                        }
                        _ => return None,
                    }
                    space = false;
                }
            }
        }
    }
    Some(tokens)
}

// ---------------------------------------------------------------------------
// Pratt parser
// ---------------------------------------------------------------------------

struct CalcParser {
    tokens: Vec<Token>,
    pos: usize,
}

// Binding powers. Left-associative operators use right = left + 1.
const BP_ADDITIVE: u8 = 2; // + -
const BP_MULTIPLICATIVE: u8 = 4; // * / %
const BP_UNARY: u8 = 6; // -

impl CalcParser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn parse_expr(&mut self, min_bp: u8) -> Option<Calc> {
        let mut left = self.parse_prefix()?;
        while let Some(Token::Op(op)) = self.peek() {
            let op = *op;
            let (l_bp, r_bp) = infix_bp(op);
            if l_bp < min_bp {
                break;
            }
            self.advance();
            let right = self.parse_expr(r_bp)?;
            left = Calc::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Some(left)
    }

    fn parse_prefix(&mut self) -> Option<Calc> {
        match self.advance()? {
            Token::Number(quantity) => Some(Calc::Literal(quantity)),
            Token::Dynamic(source) => Some(Calc::Dynamic(source)),
            Token::Op(CalcOp::Sub) => Some(Calc::Negate(Box::new(self.parse_expr(BP_UNARY)?))),
            Token::LParen => {
                let inner = self.parse_expr(0)?;
                match self.advance()? {
                    Token::RParen => Some(Calc::Group(Box::new(inner))),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

fn infix_bp(op: CalcOp) -> (u8, u8) {
    match op {
        CalcOp::Add | CalcOp::Sub => (BP_ADDITIVE, BP_ADDITIVE + 1),
        CalcOp::Mul | CalcOp::Div | CalcOp::Rem => (BP_MULTIPLICATIVE, BP_MULTIPLICATIVE + 1),
    }
}
