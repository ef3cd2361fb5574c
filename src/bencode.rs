//! Canonical bencode encoding and a generic decoder.
//!
//! Dictionaries are held in a [`BTreeMap`] keyed by raw bytes, so iteration
//! order is ascending byte order and encoding is canonical without an extra
//! sort. That property is what makes info-hashes reproducible.

use bytes::Bytes;
use std::collections::BTreeMap;
use std::io::{self, Write};

const MAX_DEPTH: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum BencodeError {
    #[error("unexpected end of input at byte {0}")]
    UnexpectedEof(usize),
    #[error("invalid integer at byte {0}")]
    InvalidInteger(usize),
    #[error("invalid string length at byte {0}")]
    InvalidLength(usize),
    #[error("unexpected byte {byte:#04x} at {pos}")]
    UnexpectedByte { byte: u8, pos: usize },
    #[error("dictionary key at byte {0} is not a byte string")]
    NonStringKey(usize),
    #[error("nesting too deep")]
    TooDeep,
    #[error("trailing data at byte {0}")]
    TrailingData(usize),
}

pub type Dict = BTreeMap<Bytes, Value>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Integer(i64),
    Bytes(Bytes),
    List(Vec<Value>),
    Dict(Dict),
}

impl Value {
    pub fn string(s: &str) -> Self {
        Value::Bytes(Bytes::copy_from_slice(s.as_bytes()))
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Value::Dict(d) => Some(d),
            _ => None,
        }
    }

    /// Look up `key` when this value is a dictionary.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_dict()?.get(key.as_bytes())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(Bytes::from(b))
    }
}

impl From<Vec<Value>> for Value {
    fn from(l: Vec<Value>) -> Self {
        Value::List(l)
    }
}

impl From<Dict> for Value {
    fn from(d: Dict) -> Self {
        Value::Dict(d)
    }
}

/// Insert `value` under the UTF-8 key `key`.
pub fn put(dict: &mut Dict, key: &'static str, value: impl Into<Value>) {
    dict.insert(Bytes::from_static(key.as_bytes()), value.into());
}

pub fn encode(value: &Value) -> Vec<u8> {
    let mut buf = Vec::new();
    // writing into a Vec cannot fail
    let _ = encode_to(value, &mut buf);
    buf
}

pub fn encode_to<W: Write>(value: &Value, w: &mut W) -> io::Result<()> {
    match value {
        Value::Integer(i) => write!(w, "i{}e", i),
        Value::Bytes(b) => write_bytes(b, w),
        Value::List(items) => {
            w.write_all(b"l")?;
            for item in items {
                encode_to(item, w)?;
            }
            w.write_all(b"e")
        }
        Value::Dict(d) => {
            w.write_all(b"d")?;
            for (k, v) in d {
                write_bytes(k, w)?;
                encode_to(v, w)?;
            }
            w.write_all(b"e")
        }
    }
}

fn write_bytes<W: Write>(b: &[u8], w: &mut W) -> io::Result<()> {
    write!(w, "{}:", b.len())?;
    w.write_all(b)
}

/// Decode exactly one value from `data`.
pub fn decode(data: &[u8]) -> Result<Value, BencodeError> {
    let mut d = Decoder { data, pos: 0 };
    let v = d.value(0)?;
    if d.pos != data.len() {
        return Err(BencodeError::TrailingData(d.pos));
    }
    Ok(v)
}

struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    fn peek(&self) -> Result<u8, BencodeError> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or(BencodeError::UnexpectedEof(self.pos))
    }

    fn value(&mut self, depth: usize) -> Result<Value, BencodeError> {
        if depth > MAX_DEPTH {
            return Err(BencodeError::TooDeep);
        }
        match self.peek()? {
            b'i' => self.integer(),
            b'0'..=b'9' => self.bytes().map(Value::Bytes),
            b'l' => {
                self.pos += 1;
                let mut items = Vec::new();
                while self.peek()? != b'e' {
                    items.push(self.value(depth + 1)?);
                }
                self.pos += 1;
                Ok(Value::List(items))
            }
            b'd' => {
                self.pos += 1;
                let mut dict = Dict::new();
                while self.peek()? != b'e' {
                    if !self.peek()?.is_ascii_digit() {
                        return Err(BencodeError::NonStringKey(self.pos));
                    }
                    let key = self.bytes()?;
                    let val = self.value(depth + 1)?;
                    dict.insert(key, val);
                }
                self.pos += 1;
                Ok(Value::Dict(dict))
            }
            byte => Err(BencodeError::UnexpectedByte {
                byte,
                pos: self.pos,
            }),
        }
    }

    fn until(&mut self, delim: u8) -> Result<&'a [u8], BencodeError> {
        let data = self.data;
        let start = self.pos;
        let len = data[start..]
            .iter()
            .position(|&b| b == delim)
            .ok_or(BencodeError::UnexpectedEof(data.len()))?;
        self.pos = start + len + 1;
        Ok(&data[start..start + len])
    }

    fn integer(&mut self) -> Result<Value, BencodeError> {
        let at = self.pos;
        self.pos += 1;
        let digits = self.until(b'e')?;
        let text = std::str::from_utf8(digits).map_err(|_| BencodeError::InvalidInteger(at))?;
        let leading_zero = text.starts_with("-0") || (text.len() > 1 && text.starts_with('0'));
        if leading_zero {
            return Err(BencodeError::InvalidInteger(at));
        }
        text.parse()
            .map(Value::Integer)
            .map_err(|_| BencodeError::InvalidInteger(at))
    }

    fn bytes(&mut self) -> Result<Bytes, BencodeError> {
        let at = self.pos;
        let digits = self.until(b':')?;
        let len: usize = std::str::from_utf8(digits)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or(BencodeError::InvalidLength(at))?;
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or(BencodeError::UnexpectedEof(self.data.len()))?;
        let b = Bytes::copy_from_slice(&self.data[self.pos..end]);
        self.pos = end;
        Ok(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_scalars() {
        assert_eq!(encode(&Value::Integer(42)), b"i42e");
        assert_eq!(encode(&Value::Integer(-7)), b"i-7e");
        assert_eq!(encode(&Value::Integer(0)), b"i0e");
        assert_eq!(encode(&Value::string("spam")), b"4:spam");
        assert_eq!(encode(&Value::string("")), b"0:");
    }

    #[test]
    fn dict_keys_are_byte_ordered() {
        let mut d = Dict::new();
        put(&mut d, "pieces", Value::string("x"));
        put(&mut d, "name", "a");
        put(&mut d, "piece length", 16384i64);
        put(&mut d, "length", 3i64);
        assert_eq!(
            encode(&Value::Dict(d)),
            b"d6:lengthi3e4:name1:a12:piece lengthi16384e6:pieces1:xe".to_vec()
        );
    }

    #[test]
    fn uppercase_sorts_before_lowercase() {
        let mut d = Dict::new();
        put(&mut d, "b", 1i64);
        put(&mut d, "B", 2i64);
        put(&mut d, "a", 3i64);
        assert_eq!(encode(&Value::Dict(d)), b"d1:Bi2e1:ai3e1:bi1ee".to_vec());
    }

    #[test]
    fn nested_list_of_dicts() {
        let mut seg = Dict::new();
        put(&mut seg, "index", 0i64);
        let v = Value::List(vec![Value::Dict(seg), Value::List(vec![])]);
        assert_eq!(encode(&v), b"ld5:indexi0eelee".to_vec());
    }

    #[test]
    fn decode_reads_back_encoding() {
        let raw = b"d8:announce3:url4:infod6:lengthi10e6:pieces3:\x00\x01\x02ee";
        let v = decode(raw).unwrap();
        assert_eq!(v.get("announce").and_then(Value::as_str), Some("url"));
        let info = v.get("info").unwrap();
        assert_eq!(info.get("length").and_then(Value::as_integer), Some(10));
        assert_eq!(info.get("pieces").and_then(Value::as_bytes), Some(&[0u8, 1, 2][..]));
        assert_eq!(encode(&v), raw.to_vec());
    }

    #[test]
    fn decode_rejects_malformed() {
        assert!(matches!(decode(b"i03e"), Err(BencodeError::InvalidInteger(0))));
        assert!(matches!(decode(b"i-0e"), Err(BencodeError::InvalidInteger(0))));
        assert!(matches!(decode(b"ie"), Err(BencodeError::InvalidInteger(0))));
        assert!(matches!(decode(b"5:abc"), Err(BencodeError::UnexpectedEof(_))));
        assert!(matches!(decode(b"l4:spam"), Err(BencodeError::UnexpectedEof(_))));
        assert!(matches!(decode(b"di1ei2ee"), Err(BencodeError::NonStringKey(1))));
        assert!(matches!(decode(b"i1ei2e"), Err(BencodeError::TrailingData(3))));
        assert!(matches!(decode(b"x"), Err(BencodeError::UnexpectedByte { byte: b'x', pos: 0 })));
    }

    #[test]
    fn decode_limits_depth() {
        let mut raw = vec![b'l'; MAX_DEPTH + 2];
        raw.extend(vec![b'e'; MAX_DEPTH + 2]);
        assert!(matches!(decode(&raw), Err(BencodeError::TooDeep)));
    }
}
