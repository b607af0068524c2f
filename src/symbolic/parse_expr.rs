//! Turns a String expression into a symbolic expression over one declared variable.
//!# Example
//! ```
//! use RustedIntegral::symbolic::symbolic_engine::Expr;
//! let parsed_expression = Expr::parse_expression("x**2 + sin(x)", "x").unwrap();
//! println!(" parsed_expression {}", parsed_expression);
//! assert!(Expr::parse_expression("x +* 2", "x").is_err());
//! ```
use crate::symbolic::symbolic_engine::Expr;
use std::f64::consts::{E, PI};
use thiserror::Error;
//                  grammar, lowest binding first
//                |_________________________________________________|
//                | expr   := term (('+' | '-') term)*              |
//                | term   := unary (('*' | '/') unary)*            |
//                | unary  := ('-' | '+') unary | power             |
//                | power  := atom (('^' | '**') unary)?            |
//                | atom   := number | name | name '(' expr ')'    |
//                |         | '(' expr ')'                          |
//                |_________________________________________________|
//  so -x**2 is -(x**2), 2**-1 is accepted and x**y**z is x**(y**z)

/// What went wrong while reading an expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseErrorKind {
    #[error("the expression is empty")]
    Empty,
    #[error("unrecognized character `{0}`")]
    UnexpectedCharacter(char),
    #[error("invalid token sequence `{sequence}`")]
    UnexpectedToken { sequence: String },
    #[error("the expression ends unexpectedly")]
    UnexpectedEnd,
    #[error("unknown symbol `{name}`, only `{variable}` may be used as a variable")]
    UnknownSymbol { name: String, variable: String },
    #[error("unknown function `{0}`")]
    UnknownFunction(String),
    #[error("function `{0}` must be followed by an argument in parentheses")]
    MissingArgument(String),
    #[error("unbalanced parenthesis")]
    UnbalancedParenthesis,
    #[error("malformed number `{0}`")]
    InvalidNumber(String),
    #[error("`{0}` cannot be used as the variable name")]
    InvalidVariable(String),
    #[error("parentheses, functions and operators are nested deeper than {0} levels")]
    TooDeep(usize),
    #[error("the expression has more than {0} tokens")]
    TooLarge(usize),
}

/// Parse failure; echoes the offending input back to the user.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("cannot parse `{input}`: {kind} (at position {position})")]
pub struct ParseError {
    pub input: String,
    pub kind: ParseErrorKind,
    /// byte offset of the offending token
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Name(String),
    Plus,
    Minus,
    Star,
    Slash,
    Power,
    LParen,
    RParen,
}

#[derive(Debug, Clone)]
struct Spanned {
    token: Token,
    text: String,
    start: usize,
}

/// Deepest nesting of parentheses, function calls, signs and powers.
pub const MAX_NESTING: usize = 32;
/// Longest accepted expression, counted in tokens.
pub const MAX_TOKENS: usize = 256;

/// Function names accepted by the parser, with the node they build.
const FUNCTIONS: &[&str] = &[
    "sin", "cos", "tan", "tg", "cot", "ctg", "asin", "arcsin", "acos", "arccos", "atan", "arctan",
    "arctg", "acot", "arccot", "arcctg", "exp", "log", "ln", "sqrt", "abs", "Abs",
];

fn build_function(name: &str, arg: Expr) -> Option<Expr> {
    let arg = Box::new(arg);
    let expr = match name {
        "sin" => Expr::sin(arg),
        "cos" => Expr::cos(arg),
        "tan" | "tg" => Expr::tg(arg),
        "cot" | "ctg" => Expr::ctg(arg),
        "asin" | "arcsin" => Expr::arcsin(arg),
        "acos" | "arccos" => Expr::arccos(arg),
        "atan" | "arctan" | "arctg" => Expr::arctg(arg),
        "acot" | "arccot" | "arcctg" => Expr::arcctg(arg),
        "exp" => Expr::Exp(arg),
        "log" | "ln" => Expr::Ln(arg),
        "sqrt" => Expr::Pow(arg, Box::new(Expr::Const(0.5))),
        "abs" | "Abs" => Expr::Abs(arg),
        _ => return None,
    };
    Some(expr)
}

fn named_constant(name: &str) -> Option<f64> {
    match name {
        "pi" => Some(PI),
        "E" | "e" => Some(E),
        _ => None,
    }
}

/// Checks that `variable` is an identifier that does not collide with a function name.
pub fn validate_variable_name(variable: &str) -> Result<(), ParseErrorKind> {
    let mut chars = variable.chars();
    let starts_ok = chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_');
    let rest_ok = chars.all(|c| c.is_alphanumeric() || c == '_');
    if !starts_ok || !rest_ok || FUNCTIONS.contains(&variable) {
        return Err(ParseErrorKind::InvalidVariable(variable.to_string()));
    }
    Ok(())
}

fn tokenize(input: &str) -> Result<Vec<Spanned>, (ParseErrorKind, usize)> {
    let bytes: Vec<(usize, char)> = input.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let (start, c) = bytes[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        let end_of = |j: usize| bytes.get(j).map_or(input.len(), |(pos, _)| *pos);
        let (token, next) = match c {
            '+' => (Token::Plus, i + 1),
            '-' => (Token::Minus, i + 1),
            '/' => (Token::Slash, i + 1),
            '^' => (Token::Power, i + 1),
            '(' => (Token::LParen, i + 1),
            ')' => (Token::RParen, i + 1),
            '*' => {
                if bytes.get(i + 1).is_some_and(|(_, n)| *n == '*') {
                    (Token::Power, i + 2)
                } else {
                    (Token::Star, i + 1)
                }
            }
            c if c.is_ascii_digit() || c == '.' => {
                let mut j = i;
                while j < bytes.len() && (bytes[j].1.is_ascii_digit() || bytes[j].1 == '.') {
                    j += 1;
                }
                // exponent part only when a digit follows, so `2e` stays a syntax error
                if j < bytes.len() && (bytes[j].1 == 'e' || bytes[j].1 == 'E') {
                    let mut k = j + 1;
                    if k < bytes.len() && (bytes[k].1 == '+' || bytes[k].1 == '-') {
                        k += 1;
                    }
                    if k < bytes.len() && bytes[k].1.is_ascii_digit() {
                        while k < bytes.len() && bytes[k].1.is_ascii_digit() {
                            k += 1;
                        }
                        j = k;
                    }
                }
                let text = &input[start..end_of(j)];
                let value = text
                    .parse::<f64>()
                    .map_err(|_| (ParseErrorKind::InvalidNumber(text.to_string()), start))?;
                (Token::Number(value), j)
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut j = i;
                while j < bytes.len() && (bytes[j].1.is_alphanumeric() || bytes[j].1 == '_') {
                    j += 1;
                }
                (Token::Name(input[start..end_of(j)].to_string()), j)
            }
            other => return Err((ParseErrorKind::UnexpectedCharacter(other), start)),
        };
        tokens.push(Spanned {
            token,
            text: input[start..end_of(next)].to_string(),
            start,
        });
        i = next;
    }
    Ok(tokens)
}

struct Parser<'a> {
    input: &'a str,
    variable: &'a str,
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, kind: ParseErrorKind, position: usize) -> ParseError {
        ParseError {
            input: self.input.to_string(),
            kind,
            position,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn advance(&mut self) -> Option<Spanned> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    /// Error for the token at the cursor, quoting it together with the token before it.
    fn unexpected(&self) -> ParseError {
        match self.tokens.get(self.pos) {
            None => self.error(ParseErrorKind::UnexpectedEnd, self.input.len()),
            Some(current) => {
                if current.token == Token::RParen {
                    return self.error(ParseErrorKind::UnbalancedParenthesis, current.start);
                }
                let sequence = match self.pos.checked_sub(1).and_then(|p| self.tokens.get(p)) {
                    Some(previous) => format!("{}{}", previous.text, current.text),
                    None => current.text.clone(),
                };
                self.error(ParseErrorKind::UnexpectedToken { sequence }, current.start)
            }
        }
    }

    fn parse(mut self) -> Result<Expr, ParseError> {
        if self.tokens.is_empty() {
            return Err(self.error(ParseErrorKind::Empty, 0));
        }
        let expr = self.expr()?;
        if self.pos < self.tokens.len() {
            return Err(self.unexpected());
        }
        Ok(expr)
    }

    fn expr(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.advance();
                    let rhs = self.term()?;
                    lhs = Expr::Add(Box::new(lhs), Box::new(rhs));
                }
                Some(Token::Minus) => {
                    self.advance();
                    let rhs = self.term()?;
                    lhs = Expr::Sub(Box::new(lhs), Box::new(rhs));
                }
                _ => return Ok(lhs),
            }
        }
    }

    fn term(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.advance();
                    let rhs = self.unary()?;
                    lhs = Expr::Mul(Box::new(lhs), Box::new(rhs));
                }
                Some(Token::Slash) => {
                    self.advance();
                    let rhs = self.unary()?;
                    lhs = Expr::Div(Box::new(lhs), Box::new(rhs));
                }
                _ => return Ok(lhs),
            }
        }
    }

    /// Every nested level passes through here, so the nesting limit is checked once.
    fn unary(&mut self) -> Result<Expr, ParseError> {
        if self.depth >= MAX_NESTING {
            let position = self.tokens.get(self.pos).map_or(self.input.len(), |s| s.start);
            return Err(self.error(ParseErrorKind::TooDeep(MAX_NESTING), position));
        }
        self.depth += 1;
        let result = self.signed();
        self.depth -= 1;
        result
    }

    fn signed(&mut self) -> Result<Expr, ParseError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.advance();
                let operand = self.unary()?;
                Ok(match operand {
                    Expr::Const(value) => Expr::Const(-value),
                    other => Expr::Mul(Box::new(Expr::Const(-1.0)), Box::new(other)),
                })
            }
            Some(Token::Plus) => {
                self.advance();
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<Expr, ParseError> {
        let base = self.atom()?;
        if let Some(Token::Power) = self.peek() {
            self.advance();
            let exponent = self.unary()?;
            return Ok(Expr::Pow(Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<Expr, ParseError> {
        let Some(current) = self.tokens.get(self.pos).cloned() else {
            return Err(self.unexpected());
        };
        match current.token {
            Token::Number(value) => {
                self.advance();
                Ok(Expr::Const(value))
            }
            Token::LParen => {
                self.advance();
                let inner = self.expr()?;
                match self.peek() {
                    Some(Token::RParen) => {
                        self.advance();
                        Ok(inner)
                    }
                    None => Err(self.error(ParseErrorKind::UnbalancedParenthesis, current.start)),
                    Some(_) => Err(self.unexpected()),
                }
            }
            Token::Name(name) => {
                self.advance();
                if let Some(Token::LParen) = self.peek() {
                    if !FUNCTIONS.contains(&name.as_str()) {
                        return Err(self.error(ParseErrorKind::UnknownFunction(name), current.start));
                    }
                    let open = self.advance().map_or(current.start, |s| s.start);
                    let arg = self.expr()?;
                    match self.peek() {
                        Some(Token::RParen) => {
                            self.advance();
                        }
                        None => return Err(self.error(ParseErrorKind::UnbalancedParenthesis, open)),
                        Some(_) => return Err(self.unexpected()),
                    }
                    return build_function(&name, arg).ok_or_else(|| {
                        self.error(ParseErrorKind::UnknownFunction(name.clone()), current.start)
                    });
                }
                if name == self.variable {
                    Ok(Expr::Var(name))
                } else if let Some(value) = named_constant(&name) {
                    Ok(Expr::Const(value))
                } else if FUNCTIONS.contains(&name.as_str()) {
                    Err(self.error(ParseErrorKind::MissingArgument(name), current.start))
                } else {
                    Err(self.error(
                        ParseErrorKind::UnknownSymbol {
                            name,
                            variable: self.variable.to_string(),
                        },
                        current.start,
                    ))
                }
            }
            _ => Err(self.unexpected()),
        }
    }
}

/// Parses `input` into an expression over the single declared `variable`.
///
/// Every other identifier must be a recognized function or the constants `pi`, `E`.
pub fn parse_expression_func(input: &str, variable: &str) -> Result<Expr, ParseError> {
    validate_variable_name(variable).map_err(|kind| ParseError {
        input: input.to_string(),
        kind,
        position: 0,
    })?;
    let tokens = tokenize(input).map_err(|(kind, position)| ParseError {
        input: input.to_string(),
        kind,
        position,
    })?;
    if let Some(excess) = tokens.get(MAX_TOKENS) {
        return Err(ParseError {
            input: input.to_string(),
            kind: ParseErrorKind::TooLarge(MAX_TOKENS),
            position: excess.start,
        });
    }
    Parser {
        input,
        variable,
        tokens,
        pos: 0,
        depth: 0,
    }
    .parse()
}

impl Expr {
    /// Parses a mathematical expression over one declared variable.
    ///
    /// # Supported Syntax
    /// - Variable: the declared name only
    /// - Constants: 3.14, 1e-6, pi, E
    /// - Operators: +, -, *, /, ^ and ** (power)
    /// - Functions: sin, cos, tan/tg, cot/ctg, asin, acos, atan, acot, exp, log/ln, sqrt, abs
    /// - Parentheses for grouping
    ///
    /// Inputs longer than [`MAX_TOKENS`] tokens or nested deeper than [`MAX_NESTING`] levels
    /// are rejected, so later recursive passes over the tree stay within the stack.
    pub fn parse_expression(input: &str, variable: &str) -> Result<Expr, ParseError> {
        parse_expression_func(input, variable)
    }
}
