//! Parsing expressions from text.
//!
//! The grammar is the usual infix one: `+ - * /`, `^` (or `**`) for powers
//! (right associative, binding tighter than unary minus), parentheses, numbers
//! with optional decimal point and exponent, the constant `pi`, the functions in
//! [`Func`] plus `sqrt`, and identifiers, which become [`Symbol`]s.

use std::f64::consts::PI;

use crate::{Expr, Func, ParseError, Symbol};

/// Parses an expression.
///
/// ```
/// use ctrlprop_symbolic::{parse, symbols, Expr};
///
/// let x = symbols("x");
/// let e = parse("2*x^2 - sin(x)").unwrap();
/// assert_eq!(e, 2.0 * Expr::sym(&x[0]).powi(2) - Expr::sym(&x[0]).sin());
/// ```
///
/// # Errors
///
/// Returns a [`ParseError`] describing the first problem found.
pub fn parse(input: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser { tokens, pos: 0 };

    let expr = parser.sum()?;
    match parser.peek() {
        None => Ok(expr),
        Some((token, position)) => Err(ParseError::UnexpectedToken {
            found: token.to_string(),
            position,
        }),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Num(v) => write!(f, "{v}"),
            Token::Ident(name) => f.write_str(name),
            Token::Plus => f.write_str("+"),
            Token::Minus => f.write_str("-"),
            Token::Star => f.write_str("*"),
            Token::Slash => f.write_str("/"),
            Token::Caret => f.write_str("^"),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<(Token, usize)>, ParseError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        let start = i;

        let token = match ch {
            c if c.is_whitespace() => {
                i += 1;
                continue;
            }
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' if chars.get(i + 1) == Some(&'*') => {
                i += 1;
                Token::Caret
            }
            '*' => Token::Star,
            '/' => Token::Slash,
            '^' => Token::Caret,
            '(' => Token::LParen,
            ')' => Token::RParen,
            c if c.is_ascii_digit() || c == '.' => {
                let end = number_end(&chars, i);
                let text: String = chars[i..end].iter().collect();
                let value = text.parse::<f64>().map_err(|_| ParseError::InvalidNumber {
                    text: text.clone(),
                    position: start,
                })?;
                i = end;
                tokens.push((Token::Num(value), start));
                continue;
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut end = i;
                while end < chars.len() && (chars[end].is_alphanumeric() || chars[end] == '_') {
                    end += 1;
                }
                let name: String = chars[i..end].iter().collect();
                i = end;
                tokens.push((Token::Ident(name), start));
                continue;
            }
            other => {
                return Err(ParseError::UnexpectedChar {
                    ch: other,
                    position: start,
                });
            }
        };

        tokens.push((token, start));
        i += 1;
    }

    Ok(tokens)
}

/// Returns the index one past the end of the number starting at `start`.
fn number_end(chars: &[char], start: usize) -> usize {
    let digits = |mut i: usize| {
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut i = digits(start);
    if chars.get(i) == Some(&'.') {
        i = digits(i + 1);
    }
    if matches!(chars.get(i), Some('e' | 'E')) {
        let mut j = i + 1;
        if matches!(chars.get(j), Some('+' | '-')) {
            j += 1;
        }
        if chars.get(j).is_some_and(char::is_ascii_digit) {
            i = digits(j);
        }
    }
    i
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<(&Token, usize)> {
        self.tokens.get(self.pos).map(|(t, p)| (t, *p))
    }

    fn next(&mut self) -> Option<(Token, usize)> {
        let item = self.tokens.get(self.pos).cloned();
        if item.is_some() {
            self.pos += 1;
        }
        item
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek().is_some_and(|(t, _)| t == expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_close(&mut self) -> Result<(), ParseError> {
        match self.next() {
            Some((Token::RParen, _)) => Ok(()),
            Some((token, position)) => Err(ParseError::UnexpectedToken {
                found: token.to_string(),
                position,
            }),
            None => Err(ParseError::UnexpectedEnd),
        }
    }

    fn sum(&mut self) -> Result<Expr, ParseError> {
        let mut acc = self.product()?;
        loop {
            if self.eat(&Token::Plus) {
                acc = acc + self.product()?;
            } else if self.eat(&Token::Minus) {
                acc = acc - self.product()?;
            } else {
                return Ok(acc);
            }
        }
    }

    fn product(&mut self) -> Result<Expr, ParseError> {
        let mut acc = self.unary()?;
        loop {
            if self.eat(&Token::Star) {
                acc = acc * self.unary()?;
            } else if self.eat(&Token::Slash) {
                acc = acc / self.unary()?;
            } else {
                return Ok(acc);
            }
        }
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        if self.eat(&Token::Minus) {
            return Ok(-self.unary()?);
        }
        if self.eat(&Token::Plus) {
            return self.unary();
        }
        self.power()
    }

    fn power(&mut self) -> Result<Expr, ParseError> {
        let base = self.primary()?;
        if self.eat(&Token::Caret) {
            let exponent = self.unary()?;
            return Ok(base.pow(exponent));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        match self.next() {
            Some((Token::Num(v), _)) => Ok(Expr::num(v)),
            Some((Token::Ident(name), position)) => {
                if self.eat(&Token::LParen) {
                    let arg = self.sum()?;
                    self.expect_close()?;
                    return apply_named(&name, arg, position);
                }
                if name == "pi" {
                    return Ok(Expr::num(PI));
                }
                Ok(Expr::sym(&Symbol::new(&name)))
            }
            Some((Token::LParen, _)) => {
                let inner = self.sum()?;
                self.expect_close()?;
                Ok(inner)
            }
            Some((token, position)) => Err(ParseError::UnexpectedToken {
                found: token.to_string(),
                position,
            }),
            None => Err(ParseError::UnexpectedEnd),
        }
    }
}

fn apply_named(name: &str, arg: Expr, position: usize) -> Result<Expr, ParseError> {
    if name == "sqrt" {
        return Ok(arg.sqrt());
    }
    Func::from_name(name)
        .map(|func| Expr::apply(func, arg))
        .ok_or_else(|| ParseError::UnknownFunction {
            name: name.to_owned(),
            position,
        })
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use crate::symbols;

    use super::*;

    #[test]
    fn precedence_and_associativity() {
        let s = symbols("a b c");
        let a = Expr::sym(&s[0]);
        let b = Expr::sym(&s[1]);
        let c = Expr::sym(&s[2]);

        assert_eq!(parse("a + b*c").unwrap(), &a + &b * &c);
        assert_eq!(parse("a - b - c").unwrap(), &a - &b - &c);
        assert_eq!(parse("a/b/c").unwrap(), &a / (&b * &c));
        assert_eq!(parse("a^b^c").unwrap(), a.pow(b.pow(c.clone())));
        assert_eq!(parse("-a^2").unwrap(), -a.powi(2));
        assert_eq!(parse("a**-1").unwrap(), a.recip());
    }

    #[test]
    fn numbers_and_constants() {
        assert_relative_eq!(parse("1.5e3 + .5").unwrap().as_num().unwrap(), 1500.5);
        assert_relative_eq!(parse("cos(pi)").unwrap().as_num().unwrap(), -1.0);
        assert_relative_eq!(parse("sqrt(16)").unwrap().as_num().unwrap(), 4.0);
    }

    #[test]
    fn functions_apply() {
        let s = symbols("x1");
        let x = Expr::sym(&s[0]);

        assert_eq!(parse("log(x1) + tanh(x1)").unwrap(), x.ln() + x.tanh());
    }

    #[test]
    fn reports_errors_with_positions() {
        assert_eq!(parse("x +"), Err(ParseError::UnexpectedEnd));
        assert_eq!(
            parse("x $ y"),
            Err(ParseError::UnexpectedChar {
                ch: '$',
                position: 2
            })
        );
        assert_eq!(
            parse("foo(x)"),
            Err(ParseError::UnknownFunction {
                name: "foo".into(),
                position: 0
            })
        );
        assert_eq!(
            parse("(x))"),
            Err(ParseError::UnexpectedToken {
                found: ")".into(),
                position: 3
            })
        );
    }
}
