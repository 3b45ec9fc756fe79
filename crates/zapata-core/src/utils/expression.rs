//! Arithmetic typed into numeric inputs, e.g. `2*0.45 + 0,3`.
//!
//! Grammar (whitespace ignored, `,` accepted as decimal separator):
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := factor (('*' | '/') factor)*
//! factor := '-' factor | '(' expr ')' | number
//! ```

/// Whether `value` contains an arithmetic operator. A plain number, even
/// with decimals, is not an expression.
pub fn is_math_expression(value: &str) -> bool {
    !value.trim().is_empty() && value.contains(['+', '-', '*', '/'])
}

/// Evaluate an arithmetic expression. `None` for empty input, characters
/// outside the allowed set, syntax errors or non-finite results.
pub fn evaluate(expression: &str) -> Option<f64> {
    let cleaned: String = expression.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return None;
    }
    if !cleaned
        .chars()
        .all(|c| c.is_ascii_digit() || ".,+-*/()".contains(c))
    {
        return None;
    }

    let normalized = cleaned.replace(',', ".");
    let mut parser = Parser {
        input: normalized.as_bytes(),
        pos: 0,
    };
    let value = parser.expr()?;
    if parser.pos != parser.input.len() || !value.is_finite() {
        return None;
    }
    Some(value)
}

/// Interpret a form value: a plain number is parsed directly, anything with
/// an operator is evaluated.
pub fn resolve_input(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if is_math_expression(trimmed) {
        return evaluate(trimmed);
    }
    trimmed
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn expr(&mut self) -> Option<f64> {
        let mut value = self.term()?;
        while let Some(op @ (b'+' | b'-')) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            if op == b'+' {
                value += rhs;
            } else {
                value -= rhs;
            }
        }
        Some(value)
    }

    fn term(&mut self) -> Option<f64> {
        let mut value = self.factor()?;
        while let Some(op @ (b'*' | b'/')) = self.peek() {
            self.pos += 1;
            let rhs = self.factor()?;
            if op == b'*' {
                value *= rhs;
            } else {
                value /= rhs;
            }
        }
        Some(value)
    }

    fn factor(&mut self) -> Option<f64> {
        match self.peek()? {
            b'-' => {
                self.pos += 1;
                self.factor().map(|v| -v)
            }
            b'(' => {
                self.pos += 1;
                let value = self.expr()?;
                if self.peek()? != b')' {
                    return None;
                }
                self.pos += 1;
                Some(value)
            }
            _ => self.number(),
        }
    }

    fn number(&mut self) -> Option<f64> {
        let start = self.pos;
        while matches!(self.peek(), Some(b'0'..=b'9' | b'.')) {
            self.pos += 1;
        }
        if start == self.pos {
            return None;
        }
        std::str::from_utf8(&self.input[start..self.pos])
            .ok()?
            .parse()
            .ok()
    }
}
