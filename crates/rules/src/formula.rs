//! Hand-rolled recursive-descent evaluator for rule formulas and policy
//! expressions.
//!
//! The grammar is deliberately small: numeric and string literals, named
//! variables, arithmetic, comparisons, boolean operators (symbolic or the
//! textual `AND`/`OR`/`NOT` used in policy files) and the built-ins `min`,
//! `max` and `abs`. Nothing is ever delegated to a host evaluator and no
//! ambient state is reachable; evaluation only sees the context map it is
//! handed.

use anyhow::{anyhow, bail, Result};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Num(f64),
    Bool(bool),
    Str(String),
}

impl Value {
    fn as_num(&self) -> Result<f64> {
        match self {
            Value::Num(n) => Ok(*n),
            other => bail!("expected a number, got {other}"),
        }
    }

    pub fn truthy(&self) -> Result<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => bail!("expected a boolean, got {other}"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Num(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Str(s) => write!(f, "'{s}'"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Str(String),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    LParen,
    RParen,
    Comma,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
    Not,
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '%' => {
                tokens.push(Token::Percent);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '<' | '>' | '=' | '!' => {
                let two = chars.get(i + 1) == Some(&'=');
                tokens.push(match (c, two) {
                    ('<', true) => Token::Le,
                    ('<', false) => Token::Lt,
                    ('>', true) => Token::Ge,
                    ('>', false) => Token::Gt,
                    ('=', true) => Token::Eq,
                    ('!', true) => Token::Ne,
                    ('=', false) => bail!("single '=' is not an operator, use '=='"),
                    ('!', false) => Token::Not,
                    _ => unreachable!(),
                });
                i += if two { 2 } else { 1 };
            }
            '&' if chars.get(i + 1) == Some(&'&') => {
                tokens.push(Token::And);
                i += 2;
            }
            '|' if chars.get(i + 1) == Some(&'|') => {
                tokens.push(Token::Or);
                i += 2;
            }
            '\'' | '"' => {
                let quote = c;
                let start = i + 1;
                let mut j = start;
                while j < chars.len() && chars[j] != quote {
                    j += 1;
                }
                if j >= chars.len() {
                    bail!("unterminated string literal");
                }
                tokens.push(Token::Str(chars[start..j].iter().collect()));
                i = j + 1;
            }
            c if c.is_ascii_digit() => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                tokens.push(Token::Num(
                    text.parse().map_err(|_| anyhow!("bad number '{text}'"))?,
                ));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                // textual boolean operators translate here
                tokens.push(match word.to_lowercase().as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    _ => Token::Ident(word),
                });
            }
            other => bail!("unexpected character '{other}'"),
        }
    }
    Ok(tokens)
}

#[derive(Debug, Clone)]
enum Expr {
    Num(f64),
    Str(String),
    Var(String),
    Call(String, Vec<Expr>),
    Neg(Box<Expr>),
    Not(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;
        while self.eat(&Token::Or) {
            let right = self.parse_and()?;
            left = Expr::Binary(BinOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_not()?;
        while self.eat(&Token::And) {
            let right = self.parse_not()?;
            left = Expr::Binary(BinOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr> {
        if self.eat(&Token::Not) {
            Ok(Expr::Not(Box::new(self.parse_not()?)))
        } else {
            self.parse_cmp()
        }
    }

    fn parse_cmp(&mut self) -> Result<Expr> {
        let left = self.parse_add()?;
        let op = match self.peek() {
            Some(Token::Lt) => BinOp::Lt,
            Some(Token::Le) => BinOp::Le,
            Some(Token::Gt) => BinOp::Gt,
            Some(Token::Ge) => BinOp::Ge,
            Some(Token::Eq) => BinOp::Eq,
            Some(Token::Ne) => BinOp::Ne,
            _ => return Ok(left),
        };
        self.pos += 1;
        let right = self.parse_add()?;
        Ok(Expr::Binary(op, Box::new(left), Box::new(right)))
    }

    fn parse_add(&mut self) -> Result<Expr> {
        let mut left = self.parse_mul()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_mul()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_mul(&mut self) -> Result<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                Some(Token::Percent) => BinOp::Rem,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        if self.eat(&Token::Minus) {
            Ok(Expr::Neg(Box::new(self.parse_unary()?)))
        } else {
            self.parse_primary()
        }
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        match self.bump() {
            Some(Token::Num(n)) => Ok(Expr::Num(n)),
            Some(Token::Str(s)) => Ok(Expr::Str(s)),
            Some(Token::Ident(name)) => {
                if self.eat(&Token::LParen) {
                    let mut args = Vec::new();
                    if !self.eat(&Token::RParen) {
                        loop {
                            args.push(self.parse_or()?);
                            if self.eat(&Token::RParen) {
                                break;
                            }
                            if !self.eat(&Token::Comma) {
                                bail!("expected ',' or ')' in call to {name}");
                            }
                        }
                    }
                    Ok(Expr::Call(name, args))
                } else {
                    Ok(Expr::Var(name))
                }
            }
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                if !self.eat(&Token::RParen) {
                    bail!("expected ')'");
                }
                Ok(inner)
            }
            other => bail!("unexpected token {other:?}"),
        }
    }
}

#[derive(Debug, Clone)]
/// A parsed expression, ready to evaluate against a context map.
pub struct Formula {
    expr: Expr,
    text: String,
}

impl Formula {
    pub fn parse(text: &str) -> Result<Formula> {
        let tokens = tokenize(text)?;
        if tokens.is_empty() {
            bail!("empty formula");
        }
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.parse_or()?;
        if parser.pos != parser.tokens.len() {
            bail!("trailing input after expression");
        }
        Ok(Formula {
            expr,
            text: text.to_string(),
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn eval(&self, context: &HashMap<String, Value>) -> Result<Value> {
        eval(&self.expr, context)
    }

    pub fn eval_num(&self, context: &HashMap<String, Value>) -> Result<f64> {
        self.eval(context)?.as_num()
    }

    pub fn eval_bool(&self, context: &HashMap<String, Value>) -> Result<bool> {
        self.eval(context)?.truthy()
    }
}

fn eval(expr: &Expr, context: &HashMap<String, Value>) -> Result<Value> {
    match expr {
        Expr::Num(n) => Ok(Value::Num(*n)),
        Expr::Str(s) => Ok(Value::Str(s.clone())),
        Expr::Var(name) => context
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow!("unknown variable '{name}'")),
        Expr::Neg(inner) => Ok(Value::Num(-eval(inner, context)?.as_num()?)),
        Expr::Not(inner) => Ok(Value::Bool(!eval(inner, context)?.truthy()?)),
        Expr::Call(name, args) => {
            let nums: Vec<f64> = args
                .iter()
                .map(|a| eval(a, context)?.as_num())
                .collect::<Result<_>>()?;
            match (name.as_str(), nums.len()) {
                ("abs", 1) => Ok(Value::Num(nums[0].abs())),
                ("min", n) if n >= 1 => {
                    Ok(Value::Num(nums.iter().cloned().fold(f64::INFINITY, f64::min)))
                }
                ("max", n) if n >= 1 => Ok(Value::Num(
                    nums.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
                )),
                _ => bail!("unknown function '{name}' with {} argument(s)", nums.len()),
            }
        }
        Expr::Binary(op, l, r) => {
            match op {
                BinOp::And => {
                    return Ok(Value::Bool(
                        eval(l, context)?.truthy()? && eval(r, context)?.truthy()?,
                    ))
                }
                BinOp::Or => {
                    return Ok(Value::Bool(
                        eval(l, context)?.truthy()? || eval(r, context)?.truthy()?,
                    ))
                }
                _ => {}
            }
            let lv = eval(l, context)?;
            let rv = eval(r, context)?;
            match op {
                BinOp::Add => Ok(Value::Num(lv.as_num()? + rv.as_num()?)),
                BinOp::Sub => Ok(Value::Num(lv.as_num()? - rv.as_num()?)),
                BinOp::Mul => Ok(Value::Num(lv.as_num()? * rv.as_num()?)),
                BinOp::Div => {
                    let d = rv.as_num()?;
                    if d == 0.0 {
                        bail!("division by zero");
                    }
                    Ok(Value::Num(lv.as_num()? / d))
                }
                BinOp::Rem => {
                    let d = rv.as_num()?;
                    if d == 0.0 {
                        bail!("division by zero");
                    }
                    Ok(Value::Num(lv.as_num()? % d))
                }
                BinOp::Lt => Ok(Value::Bool(lv.as_num()? < rv.as_num()?)),
                BinOp::Le => Ok(Value::Bool(lv.as_num()? <= rv.as_num()?)),
                BinOp::Gt => Ok(Value::Bool(lv.as_num()? > rv.as_num()?)),
                BinOp::Ge => Ok(Value::Bool(lv.as_num()? >= rv.as_num()?)),
                BinOp::Eq => Ok(Value::Bool(values_equal(&lv, &rv))),
                BinOp::Ne => Ok(Value::Bool(!values_equal(&lv, &rv))),
                BinOp::And | BinOp::Or => unreachable!("handled above"),
            }
        }
    }
}

fn values_equal(l: &Value, r: &Value) -> bool {
    match (l, r) {
        (Value::Num(a), Value::Num(b)) => a == b,
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn arithmetic_with_precedence() {
        let f = Formula::parse("1 + 2 * 3 - 4 / 2").unwrap();
        assert_eq!(f.eval_num(&HashMap::new()).unwrap(), 5.0);
    }

    #[test]
    fn builtins_and_variables() {
        let f = Formula::parse("min(count * 1.5, 4.0)").unwrap();
        let c = ctx(&[("count", Value::Num(10.0))]);
        assert_eq!(f.eval_num(&c).unwrap(), 4.0);

        let f = Formula::parse("max(abs(-2), value)").unwrap();
        let c = ctx(&[("value", Value::Num(1.0))]);
        assert_eq!(f.eval_num(&c).unwrap(), 2.0);
    }

    #[test]
    fn textual_boolean_operators_translate() {
        let f = Formula::parse("critical_count == 0 AND overall_score >= 3.0").unwrap();
        let c = ctx(&[
            ("critical_count", Value::Num(0.0)),
            ("overall_score", Value::Num(4.2)),
        ]);
        assert!(f.eval_bool(&c).unwrap());

        let f = Formula::parse("a > 1 or b > 1").unwrap();
        let c = ctx(&[("a", Value::Num(0.0)), ("b", Value::Num(2.0))]);
        assert!(f.eval_bool(&c).unwrap());
    }

    #[test]
    fn string_equality() {
        let f = Formula::parse("risk_level == 'Low'").unwrap();
        let c = ctx(&[("risk_level", Value::Str("Low".into()))]);
        assert!(f.eval_bool(&c).unwrap());
        let c = ctx(&[("risk_level", Value::Str("High".into()))]);
        assert!(!f.eval_bool(&c).unwrap());
    }

    #[test]
    fn unknown_variable_is_an_error() {
        let f = Formula::parse("missing + 1").unwrap();
        assert!(f.eval_num(&HashMap::new()).is_err());
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let f = Formula::parse("1 / 0").unwrap();
        assert!(f.eval_num(&HashMap::new()).is_err());
    }

    #[test]
    fn malformed_input_fails_to_parse() {
        assert!(Formula::parse("1 +").is_err());
        assert!(Formula::parse("count ** 2").is_err());
        assert!(Formula::parse("").is_err());
        assert!(Formula::parse("import('os')").is_err());
    }

    #[test]
    fn no_ambient_names_are_reachable() {
        for forbidden in ["__builtins__", "open", "eval"] {
            let f = Formula::parse(forbidden).unwrap();
            assert!(f.eval(&HashMap::new()).is_err());
        }
    }
}
