//! Strict literal grammar for template expressions.
//!
//! A token is a literal only if the whole token parses as one of:
//!
//! - integers: `42`, `-7`, `1_000`, `0xff`, `0o17`, `0b101`
//! - floats: `1.5`, `.5`, `1.`, `2e10`, `-2.5E-1`
//! - strings: `'single'` or `"double"` with backslash escapes
//! - keywords: `True`, `False`, `None`
//! - lists `[1, 2]` and tuples `(1, 2)`, `(1,)`, both producing lists
//! - dicts with string keys: `{'a': 1}`
//!
//! Everything else, including `true` or `item.name`, is not a literal.

use indexmap::IndexMap;

use crate::value::{Number, Value};

/// Parses `token` as a literal, returning `None` if it is not one.
///
/// # Example
///
/// ```
/// use onebot_template::{literal::parse_literal, Value};
///
/// assert_eq!(parse_literal("[1, 'a']"), Some(Value::from(vec![Value::from(1), Value::from("a")])));
/// assert_eq!(parse_literal("data.result"), None);
/// ```
pub fn parse_literal(token: &str) -> Option<Value> {
    let mut parser = LiteralParser::new(token);
    parser.skip_ws();
    let value = parser.value()?;
    parser.skip_ws();
    parser.at_end().then_some(value)
}

struct LiteralParser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> LiteralParser<'a> {
    fn new(src: &'a str) -> Self {
        LiteralParser { src, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(ch) if ch.is_whitespace()) {
            self.bump();
        }
    }

    fn value(&mut self) -> Option<Value> {
        match self.peek()? {
            '\'' | '"' => self.string().map(Value::String),
            '[' => self.list(),
            '(' => self.parenthesized(),
            '{' => self.dict(),
            '-' | '+' => self.signed(),
            ch if ch.is_ascii_digit() || ch == '.' => self.number(false).map(Value::Number),
            ch if ch.is_alphabetic() || ch == '_' => self.keyword(),
            _ => None,
        }
    }

    fn keyword(&mut self) -> Option<Value> {
        let start = self.pos;
        while matches!(self.peek(), Some(ch) if ch.is_alphanumeric() || ch == '_') {
            self.bump();
        }
        match &self.src[start..self.pos] {
            "True" => Some(Value::Bool(true)),
            "False" => Some(Value::Bool(false)),
            "None" => Some(Value::None),
            _ => None,
        }
    }

    fn signed(&mut self) -> Option<Value> {
        let negative = self.bump()? == '-';
        self.skip_ws();
        if !matches!(self.peek(), Some(ch) if ch.is_ascii_digit() || ch == '.') {
            return None;
        }
        self.number(negative).map(Value::Number)
    }

    fn number(&mut self, negative: bool) -> Option<Number> {
        let rest = self.rest();
        let radix = match rest.get(..2) {
            Some("0x" | "0X") => 16,
            Some("0o" | "0O") => 8,
            Some("0b" | "0B") => 2,
            _ => 10,
        };
        if radix != 10 {
            self.pos += 2;
            let start = self.pos;
            while matches!(self.peek(), Some(ch) if ch.is_digit(radix) || ch == '_') {
                self.bump();
            }
            let digits = clean_digits(&self.src[start..self.pos], radix)?;
            let magnitude = u64::from_str_radix(&digits, radix).ok()?;
            return Some(signed_integer(magnitude, negative));
        }

        let start = self.pos;
        self.eat_digits();
        let mut is_float = false;
        if self.eat('.') {
            is_float = true;
            self.eat_digits();
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            is_float = true;
            self.bump();
            if !self.eat('-') {
                self.eat('+');
            }
            let exponent_start = self.pos;
            self.eat_digits();
            if self.pos == exponent_start {
                return None;
            }
        }

        let text = &self.src[start..self.pos];
        if !text.bytes().any(|b| b.is_ascii_digit()) {
            return None;
        }
        if !underscores_between_digits(text) {
            return None;
        }
        let text = text.replace('_', "");

        if is_float {
            let n: f64 = text.parse().ok()?;
            return Some(Number::F64(if negative { -n } else { n }));
        }
        if text.len() > 1 && text.starts_with('0') && text.bytes().any(|b| b != b'0') {
            return None;
        }
        match text.parse::<u64>() {
            Ok(magnitude) => Some(signed_integer(magnitude, negative)),
            Err(_) => {
                let n: f64 = text.parse().ok()?;
                Some(Number::F64(if negative { -n } else { n }))
            }
        }
    }

    fn eat_digits(&mut self) {
        while matches!(self.peek(), Some(ch) if ch.is_ascii_digit() || ch == '_') {
            self.bump();
        }
    }

    fn string(&mut self) -> Option<String> {
        let quote = self.bump()?;
        let mut out = String::new();
        loop {
            match self.bump()? {
                ch if ch == quote => return Some(out),
                '\n' => return None,
                '\\' => {
                    let escaped = self.bump()?;
                    match escaped {
                        '\\' => out.push('\\'),
                        '\'' => out.push('\''),
                        '"' => out.push('"'),
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        'r' => out.push('\r'),
                        '0' => out.push('\0'),
                        'a' => out.push('\x07'),
                        'b' => out.push('\x08'),
                        'f' => out.push('\x0c'),
                        'v' => out.push('\x0b'),
                        'x' => out.push(self.hex_escape(2)?),
                        'u' => out.push(self.hex_escape(4)?),
                        'U' => out.push(self.hex_escape(8)?),
                        '\n' => {}
                        other => {
                            out.push('\\');
                            out.push(other);
                        }
                    }
                }
                ch => out.push(ch),
            }
        }
    }

    fn hex_escape(&mut self, len: usize) -> Option<char> {
        let digits = self.rest().get(..len)?;
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        self.pos += len;
        char::from_u32(u32::from_str_radix(digits, 16).ok()?)
    }

    /// Parses comma-separated values up to `close`, allowing a trailing comma.
    ///
    /// Returns the items and whether any comma was seen.
    fn sequence(&mut self, close: char) -> Option<(Vec<Value>, bool)> {
        let mut items = Vec::new();
        let mut saw_comma = false;
        loop {
            self.skip_ws();
            if self.eat(close) {
                return Some((items, saw_comma));
            }
            items.push(self.value()?);
            self.skip_ws();
            if self.eat(',') {
                saw_comma = true;
            } else {
                self.skip_ws();
                return self.eat(close).then_some((items, saw_comma));
            }
        }
    }

    fn list(&mut self) -> Option<Value> {
        self.bump()?;
        let (items, _) = self.sequence(']')?;
        Some(Value::List(items))
    }

    fn parenthesized(&mut self) -> Option<Value> {
        self.bump()?;
        let (mut items, saw_comma) = self.sequence(')')?;
        if items.len() == 1 && !saw_comma {
            return items.pop();
        }
        Some(Value::List(items))
    }

    fn dict(&mut self) -> Option<Value> {
        self.bump()?;
        let mut map = IndexMap::new();
        loop {
            self.skip_ws();
            if self.eat('}') {
                return Some(Value::Map(map));
            }
            let key = match self.value()? {
                Value::String(key) => key,
                _ => return None,
            };
            self.skip_ws();
            if !self.eat(':') {
                return None;
            }
            self.skip_ws();
            let value = self.value()?;
            map.insert(key, value);
            self.skip_ws();
            if !self.eat(',') {
                self.skip_ws();
                return self.eat('}').then_some(Value::Map(map));
            }
        }
    }
}

fn signed_integer(magnitude: u64, negative: bool) -> Number {
    match (negative, i64::try_from(magnitude)) {
        (false, Ok(n)) => Number::I64(n),
        (false, Err(_)) => Number::U64(magnitude),
        (true, Ok(n)) => Number::I64(-n),
        (true, Err(_)) if magnitude == i64::MIN.unsigned_abs() => Number::I64(i64::MIN),
        (true, Err(_)) => Number::F64(-(magnitude as f64)),
    }
}

fn underscores_between_digits(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.iter().enumerate().all(|(i, b)| {
        *b != b'_'
            || (i > 0
                && i + 1 < bytes.len()
                && bytes[i - 1].is_ascii_digit()
                && bytes[i + 1].is_ascii_digit())
    })
}

fn clean_digits(text: &str, radix: u32) -> Option<String> {
    if text.is_empty() || text.ends_with('_') || text.contains("__") {
        return None;
    }
    let digits: String = text.chars().filter(|ch| *ch != '_').collect();
    digits.chars().all(|ch| ch.is_digit(radix)).then_some(digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(token: &str) -> Option<Value> {
        parse_literal(token)
    }

    #[test]
    fn integers() {
        assert_eq!(lit("42"), Some(Value::from(42)));
        assert_eq!(lit("-7"), Some(Value::from(-7)));
        assert_eq!(lit("+3"), Some(Value::from(3)));
        assert_eq!(lit("1_000"), Some(Value::from(1000)));
        assert_eq!(lit("0"), Some(Value::from(0)));
        assert_eq!(lit("00"), Some(Value::from(0)));
        assert_eq!(lit("0xff"), Some(Value::from(255)));
        assert_eq!(lit("0o17"), Some(Value::from(15)));
        assert_eq!(lit("0b101"), Some(Value::from(5)));
        assert_eq!(
            lit("18446744073709551615"),
            Some(Value::Number(Number::U64(u64::MAX)))
        );
    }

    #[test]
    fn malformed_numbers_are_not_literals() {
        assert_eq!(lit("01"), None);
        assert_eq!(lit("1__0"), None);
        assert_eq!(lit("_1"), None);
        assert_eq!(lit("1_"), None);
        assert_eq!(lit("1e"), None);
        assert_eq!(lit("0x"), None);
        assert_eq!(lit("1abc"), None);
        assert_eq!(lit("-"), None);
        assert_eq!(lit("."), None);
    }

    #[test]
    fn floats() {
        assert_eq!(lit("1.5"), Some(Value::from(1.5)));
        assert_eq!(lit(".5"), Some(Value::from(0.5)));
        assert_eq!(lit("1."), Some(Value::from(1.0)));
        assert_eq!(lit("2e3"), Some(Value::from(2000.0)));
        assert_eq!(lit("-2.5E-1"), Some(Value::from(-0.25)));
    }

    #[test]
    fn strings() {
        assert_eq!(lit("'hi'"), Some(Value::from("hi")));
        assert_eq!(lit("\"hi\""), Some(Value::from("hi")));
        assert_eq!(lit(r"'it\'s'"), Some(Value::from("it's")));
        assert_eq!(lit(r"'a\nb'"), Some(Value::from("a\nb")));
        assert_eq!(lit(r"'\x41é'"), Some(Value::from("Aé")));
        assert_eq!(lit(r"'\d'"), Some(Value::from("\\d")));
        assert_eq!(lit("'unterminated"), None);
        assert_eq!(lit("'a' 'b'"), None);
    }

    #[test]
    fn keywords() {
        assert_eq!(lit("True"), Some(Value::from(true)));
        assert_eq!(lit("False"), Some(Value::from(false)));
        assert_eq!(lit("None"), Some(Value::None));
        assert_eq!(lit("true"), None);
        assert_eq!(lit("Nonesuch"), None);
    }

    #[test]
    fn containers() {
        assert_eq!(lit("[]"), Some(Value::List(vec![])));
        assert_eq!(lit("[1,2,3]"), Some(Value::from(vec![1, 2, 3])));
        assert_eq!(lit("[ 1 , 2, ]"), Some(Value::from(vec![1, 2])));
        assert_eq!(lit("(1, 2)"), Some(Value::from(vec![1, 2])));
        assert_eq!(lit("(1,)"), Some(Value::from(vec![1])));
        assert_eq!(lit("()"), Some(Value::List(vec![])));
        assert_eq!(lit("(1)"), Some(Value::from(1)));
        assert_eq!(
            lit("{'a': [1], \"b\": None}"),
            Some(Value::Map(IndexMap::from([
                ("a".to_string(), Value::from(vec![1])),
                ("b".to_string(), Value::None),
            ])))
        );
        assert_eq!(lit("{}"), Some(Value::Map(IndexMap::new())));
        assert_eq!(lit("{1: 2}"), None);
        assert_eq!(lit("[1, 2"), None);
        assert_eq!(lit("[1 2]"), None);
        assert_eq!(lit("[,]"), None);
    }

    #[test]
    fn names_are_not_literals() {
        assert_eq!(lit("item"), None);
        assert_eq!(lit("data.result"), None);
        assert_eq!(lit("..outer"), None);
        assert_eq!(lit("items.0"), None);
        assert_eq!(lit("[x]"), None);
    }
}
