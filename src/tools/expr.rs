//! Arithmetic expression evaluator backing the `calculate` tool.
//!
//! Grammar:
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := unary (('*' | '/' | '%') unary)*
//! unary  := ('-' | '+')* atom
//! atom   := number | '(' expr ')'
//! ```
//!
//! Parentheses nest at most [`MAX_DEPTH`] levels deep.

use serde_json::Value;

pub const MAX_DEPTH: usize = 256;

/// Evaluate an arithmetic expression.
pub fn evaluate(expression: &str) -> Result<f64, String> {
    let mut parser = Parser {
        chars: expression.chars().filter(|c| !c.is_whitespace()).collect(),
        pos: 0,
        depth: 0,
    };
    if parser.chars.is_empty() {
        return Err("empty expression".to_string());
    }
    let value = parser.expr()?;
    if let Some(c) = parser.peek() {
        return Err(format!("unexpected '{c}' at position {}", parser.pos));
    }
    if !value.is_finite() {
        return Err("result is not a finite number".to_string());
    }
    Ok(value)
}

/// JSON form of a result: integral values become JSON integers.
pub fn number_to_json(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < 9.0e15 {
        Value::from(value as i64)
    } else {
        Value::from(value)
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn expr(&mut self) -> Result<f64, String> {
        let mut value = self.term()?;
        while let Some(op @ ('+' | '-')) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64, String> {
        let mut value = self.unary()?;
        while let Some(op @ ('*' | '/' | '%')) = self.peek() {
            self.pos += 1;
            let rhs = self.unary()?;
            value = match op {
                '*' => value * rhs,
                _ if rhs == 0.0 => return Err("division by zero".to_string()),
                '/' => value / rhs,
                _ => value % rhs,
            };
        }
        Ok(value)
    }

    fn unary(&mut self) -> Result<f64, String> {
        let mut negate = false;
        while let Some(sign @ ('-' | '+')) = self.peek() {
            self.pos += 1;
            negate ^= sign == '-';
        }
        let value = self.atom()?;
        Ok(if negate { -value } else { value })
    }

    fn atom(&mut self) -> Result<f64, String> {
        match self.peek() {
            Some('(') => {
                if self.depth == MAX_DEPTH {
                    return Err("expression nested too deeply".to_string());
                }
                self.pos += 1;
                self.depth += 1;
                let value = self.expr()?;
                self.depth -= 1;
                match self.bump() {
                    Some(')') => Ok(value),
                    _ => Err("missing closing parenthesis".to_string()),
                }
            }
            Some(c) if c.is_ascii_digit() || c == '.' => self.number(),
            Some(c) => Err(format!("unexpected '{c}' at position {}", self.pos)),
            None => Err("unexpected end of expression".to_string()),
        }
    }

    fn number(&mut self) -> Result<f64, String> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == '.') {
            self.pos += 1;
        }
        let literal: String = self.chars[start..self.pos].iter().collect();
        literal
            .parse::<f64>()
            .map_err(|_| format!("invalid number '{literal}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluates_with_precedence() {
        assert_eq!(evaluate("2+2").unwrap(), 4.0);
        assert_eq!(evaluate("2 + 3 * 4").unwrap(), 14.0);
        assert_eq!(evaluate("(2 + 3) * 4").unwrap(), 20.0);
        assert_eq!(evaluate("-3 + 10 % 4").unwrap(), -1.0);
        assert_eq!(evaluate("--3").unwrap(), 3.0);
        assert_eq!(evaluate("-(2 - 5)").unwrap(), 3.0);
        assert_eq!(evaluate("1.5 * 2").unwrap(), 3.0);
    }

    #[test]
    fn reports_malformed_expressions() {
        assert!(evaluate("").is_err());
        assert!(evaluate("2 +").is_err());
        assert!(evaluate("(1 + 2").is_err());
        assert!(evaluate("1 / 0").is_err());
        assert!(evaluate("2 ** 2").is_err());
        assert!(evaluate("alert(1)").is_err());
        assert!(evaluate("1..2").is_err());
        assert!(evaluate("2^3").is_err());
    }

    #[test]
    fn deep_nesting_is_bounded() {
        let parens = format!("{}1", "(".repeat(10_000));
        assert_eq!(evaluate(&parens).unwrap_err(), "expression nested too deeply");

        let balanced = format!("{}1{}", "(".repeat(MAX_DEPTH), ")".repeat(MAX_DEPTH));
        assert_eq!(evaluate(&balanced).unwrap(), 1.0);

        let signs = format!("{}1", "-".repeat(10_000));
        assert_eq!(evaluate(&signs).unwrap(), 1.0);
        let signs = format!("{}1", "-".repeat(200_001));
        assert_eq!(evaluate(&signs).unwrap(), -1.0);
    }

    #[test]
    fn integral_results_serialize_as_integers() {
        assert_eq!(number_to_json(4.0), serde_json::json!(4));
        assert_eq!(number_to_json(2.5), serde_json::json!(2.5));
    }
}
