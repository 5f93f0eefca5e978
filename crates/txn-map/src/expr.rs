//! A small sandboxed expression language for mapping configurations.
//!
//! Expressions see only the bindings and helper functions injected through
//! [`Environment`]; there is no ambient I/O and no general code execution.
//! The grammar covers what field mappings actually need:
//!
//! ```text
//! expr    := or
//! or      := and ("or" and)*
//! and     := not ("and" not)*
//! not     := "not" not | cmp
//! cmp     := add (("==" | "!=" | "<" | "<=" | ">" | ">=" | "in" | "not in") add)?
//! add     := mul (("+" | "-") mul)*
//! mul     := unary (("*" | "/") unary)*
//! unary   := "-" unary | postfix
//! postfix := primary ("[" expr "]")* | IDENT "(" args ")"
//! primary := NUMBER | STRING | "true" | "false" | "none"
//!          | IDENT | "(" expr ")" | "[" args "]"
//! ```

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::env::Environment;
use crate::error::EvalError;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(Decimal),
    Str(String),
    Symbol(&'static str),
}

fn tokenize(input: &str) -> Result<Vec<Token>, EvalError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push(Token::Ident(chars[start..i].iter().collect()));
        } else if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).is_some_and(char::is_ascii_digit)) {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            let number = Decimal::from_str(&text)
                .map_err(|_| EvalError::new(format!("invalid number literal '{text}'")))?;
            tokens.push(Token::Number(number));
        } else if c == '\'' || c == '"' {
            let quote = c;
            i += 1;
            let mut text = String::new();
            loop {
                match chars.get(i) {
                    None => return Err(EvalError::new("unterminated string literal")),
                    Some('\\') => {
                        let escaped = chars
                            .get(i + 1)
                            .ok_or_else(|| EvalError::new("unterminated string literal"))?;
                        text.push(match escaped {
                            'n' => '\n',
                            't' => '\t',
                            other => *other,
                        });
                        i += 2;
                    }
                    Some(&ch) if ch == quote => {
                        i += 1;
                        break;
                    }
                    Some(&ch) => {
                        text.push(ch);
                        i += 1;
                    }
                }
            }
            tokens.push(Token::Str(text));
        } else {
            let two: String = chars[i..(i + 2).min(chars.len())].iter().collect();
            let symbol = match two.as_str() {
                "==" | "!=" | "<=" | ">=" => Some(match two.as_str() {
                    "==" => "==",
                    "!=" => "!=",
                    "<=" => "<=",
                    _ => ">=",
                }),
                _ => None,
            };
            if let Some(sym) = symbol {
                tokens.push(Token::Symbol(sym));
                i += 2;
            } else {
                let sym = match c {
                    '<' => "<",
                    '>' => ">",
                    '+' => "+",
                    '-' => "-",
                    '*' => "*",
                    '/' => "/",
                    '(' => "(",
                    ')' => ")",
                    '[' => "[",
                    ']' => "]",
                    ',' => ",",
                    other => {
                        return Err(EvalError::new(format!("unexpected character '{other}'")));
                    }
                };
                tokens.push(Token::Symbol(sym));
                i += 1;
            }
        }
    }
    Ok(tokens)
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Literal(Value),
    Ident(String),
    List(Vec<Expr>),
    Unary {
        op: &'static str,
        operand: Box<Expr>,
    },
    Binary {
        op: &'static str,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Index {
        target: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        function: String,
        args: Vec<Expr>,
    },
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat_symbol(&mut self, symbol: &str) -> bool {
        if matches!(self.peek(), Some(Token::Symbol(s)) if *s == symbol) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if matches!(self.peek(), Some(Token::Ident(id)) if id == keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_symbol(&mut self, symbol: &'static str) -> Result<(), EvalError> {
        if self.eat_symbol(symbol) {
            Ok(())
        } else {
            Err(EvalError::new(format!("expected '{symbol}'")))
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.parse_and()?;
        while self.eat_keyword("or") {
            let right = self.parse_and()?;
            left = Expr::Binary {
                op: "or",
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.parse_not()?;
        while self.eat_keyword("and") {
            let right = self.parse_not()?;
            left = Expr::Binary {
                op: "and",
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, EvalError> {
        if self.eat_keyword("not") {
            let operand = self.parse_not()?;
            return Ok(Expr::Unary {
                op: "not",
                operand: Box::new(operand),
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, EvalError> {
        let left = self.parse_additive()?;
        let op = if self.eat_symbol("==") {
            "=="
        } else if self.eat_symbol("!=") {
            "!="
        } else if self.eat_symbol("<=") {
            "<="
        } else if self.eat_symbol(">=") {
            ">="
        } else if self.eat_symbol("<") {
            "<"
        } else if self.eat_symbol(">") {
            ">"
        } else if self.eat_keyword("in") {
            "in"
        } else if self.eat_keyword("not") {
            if !self.eat_keyword("in") {
                return Err(EvalError::new("expected 'in' after 'not'"));
            }
            "not in"
        } else {
            return Ok(left);
        };
        let right = self.parse_additive()?;
        Ok(Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn parse_additive(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = if self.eat_symbol("+") {
                "+"
            } else if self.eat_symbol("-") {
                "-"
            } else {
                break;
            };
            let right = self.parse_multiplicative()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = if self.eat_symbol("*") {
                "*"
            } else if self.eat_symbol("/") {
                "/"
            } else {
                break;
            };
            let right = self.parse_unary()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, EvalError> {
        if self.eat_symbol("-") {
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary {
                op: "-",
                operand: Box::new(operand),
            });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, EvalError> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.eat_symbol("[") {
                let index = self.parse_expr()?;
                self.expect_symbol("]")?;
                expr = Expr::Index {
                    target: Box::new(expr),
                    index: Box::new(index),
                };
            } else if matches!(self.peek(), Some(Token::Symbol("("))) {
                // Only named helpers are callable; functions are not values.
                let Expr::Ident(function) = expr else {
                    return Err(EvalError::new("only named functions can be called"));
                };
                self.pos += 1;
                let args = self.parse_args(")")?;
                expr = Expr::Call { function, args };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_args(&mut self, closing: &'static str) -> Result<Vec<Expr>, EvalError> {
        let mut args = Vec::new();
        if self.eat_symbol(closing) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr()?);
            if self.eat_symbol(closing) {
                return Ok(args);
            }
            self.expect_symbol(",")?;
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, EvalError> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(Expr::Literal(Value::Number(n))),
            Some(Token::Str(s)) => Ok(Expr::Literal(Value::Str(s))),
            Some(Token::Ident(id)) => match id.as_str() {
                "true" | "True" => Ok(Expr::Literal(Value::Bool(true))),
                "false" | "False" => Ok(Expr::Literal(Value::Bool(false))),
                "none" | "None" => Ok(Expr::Literal(Value::Null)),
                _ => Ok(Expr::Ident(id)),
            },
            Some(Token::Symbol("(")) => {
                let expr = self.parse_expr()?;
                self.expect_symbol(")")?;
                Ok(expr)
            }
            Some(Token::Symbol("[")) => {
                let items = self.parse_args("]")?;
                Ok(Expr::List(items))
            }
            Some(other) => Err(EvalError::new(format!("unexpected token {other:?}"))),
            None => Err(EvalError::new("unexpected end of expression")),
        }
    }
}

/// Parses and evaluates one expression against the environment.
pub fn evaluate(expression: &str, env: &Environment) -> Result<Value, EvalError> {
    let tokens = tokenize(expression)?;
    let mut parser = Parser { tokens, pos: 0 };
    let ast = parser.parse_expr()?;
    if parser.pos != parser.tokens.len() {
        return Err(EvalError::new("trailing input after expression"));
    }
    eval(&ast, env)
}

fn eval(expr: &Expr, env: &Environment) -> Result<Value, EvalError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Ident(name) => env
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::new(format!("unknown name '{name}'"))),
        Expr::List(items) => {
            let values = items
                .iter()
                .map(|item| eval(item, env))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::List(values))
        }
        Expr::Unary { op, operand } => {
            let value = eval(operand, env)?;
            match *op {
                "not" => Ok(Value::Bool(!value.is_truthy())),
                "-" => match value {
                    Value::Number(n) => Ok(Value::Number(-n)),
                    other => Err(EvalError::new(format!(
                        "cannot negate {} value",
                        other.type_name()
                    ))),
                },
                _ => unreachable!(),
            }
        }
        Expr::Binary { op, left, right } => eval_binary(op, left, right, env),
        Expr::Index { target, index } => {
            let target = eval(target, env)?;
            let index = eval(index, env)?;
            eval_index(&target, &index)
        }
        Expr::Call { function, args } => {
            let values = args
                .iter()
                .map(|arg| eval(arg, env))
                .collect::<Result<Vec<_>, _>>()?;
            env.call(function, values)
        }
    }
}

fn eval_binary(op: &str, left: &Expr, right: &Expr, env: &Environment) -> Result<Value, EvalError> {
    // Boolean operators short-circuit and yield the deciding operand.
    if op == "or" {
        let lhs = eval(left, env)?;
        return if lhs.is_truthy() { Ok(lhs) } else { eval(right, env) };
    }
    if op == "and" {
        let lhs = eval(left, env)?;
        return if lhs.is_truthy() { eval(right, env) } else { Ok(lhs) };
    }

    let lhs = eval(left, env)?;
    let rhs = eval(right, env)?;
    match op {
        "==" => Ok(Value::Bool(values_equal(&lhs, &rhs))),
        "!=" => Ok(Value::Bool(!values_equal(&lhs, &rhs))),
        "<" | "<=" | ">" | ">=" => compare_ordered(op, &lhs, &rhs),
        "in" => contains(&rhs, &lhs).map(Value::Bool),
        "not in" => contains(&rhs, &lhs).map(|found| Value::Bool(!found)),
        "+" => match (&lhs, &rhs) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{a}{b}"))),
            _ => Err(binary_type_error(op, &lhs, &rhs)),
        },
        "-" | "*" | "/" => match (&lhs, &rhs) {
            (Value::Number(a), Value::Number(b)) => match op {
                "-" => Ok(Value::Number(a - b)),
                "*" => a
                    .checked_mul(*b)
                    .map(Value::Number)
                    .ok_or_else(|| EvalError::new("multiplication overflow")),
                _ => a
                    .checked_div(*b)
                    .map(Value::Number)
                    .ok_or_else(|| EvalError::new("division by zero")),
            },
            _ => Err(binary_type_error(op, &lhs, &rhs)),
        },
        _ => unreachable!(),
    }
}

fn values_equal(lhs: &Value, rhs: &Value) -> bool {
    lhs == rhs
}

fn compare_ordered(op: &str, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    let ordering = match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => a.cmp(b),
        (Value::Str(a), Value::Str(b)) => a.cmp(b),
        _ => return Err(binary_type_error(op, lhs, rhs)),
    };
    let result = match op {
        "<" => ordering.is_lt(),
        "<=" => ordering.is_le(),
        ">" => ordering.is_gt(),
        _ => ordering.is_ge(),
    };
    Ok(Value::Bool(result))
}

fn contains(container: &Value, needle: &Value) -> Result<bool, EvalError> {
    match container {
        Value::Str(haystack) => match needle {
            Value::Str(sub) => Ok(haystack.contains(sub.as_str())),
            other => Err(EvalError::new(format!(
                "cannot search a string for a {} value",
                other.type_name()
            ))),
        },
        Value::List(items) => Ok(items.iter().any(|item| values_equal(item, needle))),
        Value::Map(entries) => match needle {
            Value::Str(key) => Ok(entries.contains_key(key)),
            other => Err(EvalError::new(format!(
                "cannot look up a {} key in a map",
                other.type_name()
            ))),
        },
        other => Err(EvalError::new(format!(
            "'in' requires a string, list or map, got {}",
            other.type_name()
        ))),
    }
}

fn eval_index(target: &Value, index: &Value) -> Result<Value, EvalError> {
    match (target, index) {
        (Value::Map(entries), Value::Str(key)) => entries
            .get(key)
            .cloned()
            .ok_or_else(|| EvalError::new(format!("unknown key '{key}'"))),
        (Value::List(items), Value::Number(n)) => {
            let idx = usize::try_from(n.trunc().normalize().mantissa())
                .map_err(|_| EvalError::new("list index out of range"))?;
            items
                .get(idx)
                .cloned()
                .ok_or_else(|| EvalError::new("list index out of range"))
        }
        _ => Err(EvalError::new(format!(
            "cannot index {} with {}",
            target.type_name(),
            index.type_name()
        ))),
    }
}

fn binary_type_error(op: &str, lhs: &Value, rhs: &Value) -> EvalError {
    EvalError::new(format!(
        "unsupported operands for '{op}': {} and {}",
        lhs.type_name(),
        rhs.type_name()
    ))
}
