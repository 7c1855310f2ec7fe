//! PHP `serialize()` encoding for the legacy serialized-array columns.
//!
//! Only the value kinds that appear in WordPress meta are supported:
//! `N;`, `b:`, `i:`, `d:`, `s:` and `a:`. Object (`O:`) payloads are refused.
//! Arrays decode to ordered JSON objects keyed by the decimal or string key.

use serde_json::{Map, Number, Value};

/// Why a serialized payload could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhpError {
    pub offset: usize,
    pub reason: String,
}

impl std::fmt::Display for PhpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at byte {}", self.reason, self.offset)
    }
}

/// Deepest array nesting accepted when decoding.
pub const MAX_DEPTH: usize = 64;

/// Smallest encoding of one array entry (`i:0;N;`).
const MIN_ENTRY_BYTES: usize = 6;

/// Decodes one serialized value; trailing bytes are an error.
///
/// Lengths and counts in the payload are checked against the remaining input
/// before anything is read or allocated.
pub fn unserialize(input: &str) -> Result<Value, PhpError> {
    let mut parser = Parser {
        bytes: input.as_bytes(),
        pos: 0,
        depth: 0,
    };
    let value = parser.value()?;
    if parser.pos != parser.bytes.len() {
        return Err(parser.error("trailing data"));
    }
    Ok(value)
}

/// Encodes a JSON value. Lists encode as arrays with keys `0..n`.
pub fn serialize(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("N;"),
        Value::Bool(b) => {
            out.push_str(if *b { "b:1;" } else { "b:0;" });
        }
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                out.push_str(&format!("i:{i};"));
            } else {
                out.push_str(&format!("d:{n};"));
            }
        }
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            out.push_str(&format!("a:{}:{{", items.len()));
            for (i, item) in items.iter().enumerate() {
                out.push_str(&format!("i:{i};"));
                write_value(out, item);
            }
            out.push('}');
        }
        Value::Object(map) => {
            out.push_str(&format!("a:{}:{{", map.len()));
            for (key, item) in map {
                match key.parse::<i64>() {
                    Ok(i) if i.to_string() == *key => out.push_str(&format!("i:{i};")),
                    _ => write_string(out, key),
                }
                write_value(out, item);
            }
            out.push('}');
        }
    }
}

fn write_string(out: &mut String, s: &str) {
    out.push_str(&format!("s:{}:\"{}\";", s.len(), s));
}

struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, reason: &str) -> PhpError {
        PhpError {
            offset: self.pos,
            reason: reason.to_string(),
        }
    }

    fn expect(&mut self, byte: u8) -> Result<(), PhpError> {
        if self.bytes.get(self.pos) == Some(&byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", byte as char)))
        }
    }

    fn until(&mut self, stop: u8) -> Result<&'a str, PhpError> {
        let bytes: &'a [u8] = self.bytes;
        let start = self.pos;
        let len = bytes[start..]
            .iter()
            .position(|b| *b == stop)
            .ok_or_else(|| self.error(&format!("missing '{}'", stop as char)))?;
        self.pos = start + len + 1;
        std::str::from_utf8(&bytes[start..start + len]).map_err(|_| self.error("invalid utf-8"))
    }

    fn value(&mut self) -> Result<Value, PhpError> {
        let kind = *self
            .bytes
            .get(self.pos)
            .ok_or_else(|| self.error("unexpected end of input"))?;
        self.pos += 1;
        match kind {
            b'N' => {
                self.expect(b';')?;
                Ok(Value::Null)
            }
            b'b' => {
                self.expect(b':')?;
                match self.until(b';')? {
                    "0" => Ok(Value::Bool(false)),
                    "1" => Ok(Value::Bool(true)),
                    _ => Err(self.error("invalid boolean")),
                }
            }
            b'i' => {
                self.expect(b':')?;
                let text = self.until(b';')?;
                text.parse::<i64>()
                    .map(Value::from)
                    .map_err(|_| self.error("invalid integer"))
            }
            b'd' => {
                self.expect(b':')?;
                let text = self.until(b';')?;
                text.parse::<f64>()
                    .ok()
                    .and_then(Number::from_f64)
                    .map(Value::Number)
                    .ok_or_else(|| self.error("invalid float"))
            }
            b's' => self.string().map(Value::String),
            b'a' => self.array(),
            _ => Err(PhpError {
                offset: self.pos - 1,
                reason: format!("unsupported value kind '{}'", kind as char),
            }),
        }
    }

    /// Parses the remainder of `s:<len>:"<bytes>";`.
    fn string(&mut self) -> Result<String, PhpError> {
        self.expect(b':')?;
        let len: usize = self
            .until(b':')?
            .parse()
            .map_err(|_| self.error("invalid string length"))?;
        self.expect(b'"')?;
        let end = self
            .pos
            .checked_add(len)
            .ok_or_else(|| self.error("string length overflows"))?;
        let raw = self
            .bytes
            .get(self.pos..end)
            .ok_or_else(|| self.error("string overruns input"))?;
        let text = std::str::from_utf8(raw)
            .map_err(|_| self.error("invalid utf-8"))?
            .to_string();
        self.pos = end;
        self.expect(b'"')?;
        self.expect(b';')?;
        Ok(text)
    }

    fn array(&mut self) -> Result<Value, PhpError> {
        self.expect(b':')?;
        let count: usize = self
            .until(b':')?
            .parse()
            .map_err(|_| self.error("invalid array length"))?;
        let remaining = self.bytes.len().saturating_sub(self.pos);
        if count > remaining / MIN_ENTRY_BYTES {
            return Err(self.error("array length overruns input"));
        }
        if self.depth >= MAX_DEPTH {
            return Err(self.error("arrays nested too deeply"));
        }
        self.expect(b'{')?;
        self.depth += 1;
        let mut map = Map::new();
        for _ in 0..count {
            let key = match self.value()? {
                Value::String(s) => s,
                Value::Number(n) if n.is_i64() => n.to_string(),
                _ => return Err(self.error("invalid array key")),
            };
            let item = self.value()?;
            map.insert(key, item);
        }
        self.depth -= 1;
        self.expect(b'}')?;
        Ok(Value::Object(map))
    }
}
