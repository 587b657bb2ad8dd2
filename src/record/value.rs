use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::{RecordError, RecordResult};

/// Size of the length prefix in front of variable-width values
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Represents a column data type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColType {
    Int,              // 4 bytes
    Float,            // 4 bytes
    String(usize),    // n bytes, zero padded
    VarString(usize), // length prefix + up to n bytes
}

impl ColType {
    /// Whether the column always occupies the same number of bytes
    pub fn is_fixed(&self) -> bool {
        !matches!(self, ColType::VarString(_))
    }

    /// Width of a fixed column, or the maximum payload of a variable one
    pub fn width(&self) -> usize {
        match self {
            ColType::Int | ColType::Float => 4,
            ColType::String(n) | ColType::VarString(n) => *n,
        }
    }
}

impl fmt::Display for ColType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColType::Int => write!(f, "INT"),
            ColType::Float => write!(f, "FLOAT"),
            ColType::String(n) => write!(f, "STRING({})", n),
            ColType::VarString(n) => write!(f, "VARSTRING({})", n),
        }
    }
}

impl FromStr for ColType {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let sized = |prefix: &str| -> Option<RecordResult<usize>> {
            let inner = upper.strip_prefix(prefix)?.strip_prefix('(')?.strip_suffix(')')?;
            Some(
                inner
                    .trim()
                    .parse()
                    .map_err(|_| RecordError::InvalidValue(format!("Invalid width in '{}'", s))),
            )
        };

        match upper.as_str() {
            "INT" => Ok(ColType::Int),
            "FLOAT" => Ok(ColType::Float),
            _ => {
                if let Some(n) = sized("VARSTRING") {
                    Ok(ColType::VarString(n?))
                } else if let Some(n) = sized("STRING") {
                    Ok(ColType::String(n?))
                } else {
                    Err(RecordError::InvalidValue(format!(
                        "Unsupported column type: {}",
                        s
                    )))
                }
            }
        }
    }
}

/// Represents a single column value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Float(f32),
    String(String),
}

impl Value {
    /// Check that this value can be stored in a column of the given type
    pub fn check(&self, col_type: &ColType) -> RecordResult<()> {
        match (self, col_type) {
            (Value::Int(_), ColType::Int) | (Value::Float(_), ColType::Float) => Ok(()),
            (Value::String(s), ColType::String(max_len) | ColType::VarString(max_len)) => {
                // Fixed strings are NUL padded on disk
                if s.contains('\0') {
                    return Err(RecordError::InvalidValue(format!(
                        "string {:?} contains a NUL byte",
                        s
                    )));
                }
                if s.len() > *max_len {
                    return Err(RecordError::ValueTooLong {
                        len: s.len(),
                        max: *max_len,
                    });
                }
                Ok(())
            }
            _ => Err(RecordError::TypeMismatch {
                expected: col_type.to_string(),
                actual: format!("{:?}", self),
            }),
        }
    }

    /// Number of bytes this value occupies in a record of the given type
    pub fn encoded_size(&self, col_type: &ColType) -> usize {
        match (self, col_type) {
            (Value::String(s), ColType::VarString(_)) => LENGTH_PREFIX_SIZE + s.len(),
            _ => col_type.width(),
        }
    }

    /// Append the encoded value to `out`
    pub fn encode_into(&self, col_type: &ColType, out: &mut Vec<u8>) -> RecordResult<()> {
        self.check(col_type)?;
        match (self, col_type) {
            (Value::Int(i), _) => out.extend_from_slice(&i.to_le_bytes()),
            (Value::Float(f), _) => out.extend_from_slice(&f.to_le_bytes()),
            (Value::String(s), ColType::String(max_len)) => {
                let start = out.len();
                out.extend_from_slice(s.as_bytes());
                out.resize(start + max_len, 0);
            }
            (Value::String(s), _) => {
                out.extend_from_slice(&(s.len() as u32).to_le_bytes());
                out.extend_from_slice(s.as_bytes());
            }
        }
        Ok(())
    }

    /// Decode a fixed-width value from exactly `col_type.width()` bytes
    pub fn decode_fixed(bytes: &[u8], col_type: &ColType) -> RecordResult<Self> {
        if bytes.len() != col_type.width() {
            return Err(RecordError::CorruptRecord(format!(
                "Expected {} bytes for {}, got {}",
                col_type.width(),
                col_type,
                bytes.len()
            )));
        }

        match col_type {
            ColType::Int => {
                let mut buf = [0u8; 4];
                buf.copy_from_slice(bytes);
                Ok(Value::Int(i32::from_le_bytes(buf)))
            }
            ColType::Float => {
                let mut buf = [0u8; 4];
                buf.copy_from_slice(bytes);
                Ok(Value::Float(f32::from_le_bytes(buf)))
            }
            ColType::String(_) | ColType::VarString(_) => {
                // Strip the zero padding
                let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |pos| pos + 1);
                Self::decode_str(&bytes[..end])
            }
        }
    }

    /// Decode string payload bytes
    pub fn decode_str(bytes: &[u8]) -> RecordResult<Self> {
        let s = String::from_utf8(bytes.to_vec())
            .map_err(|e| RecordError::CorruptRecord(format!("Invalid UTF-8: {}", e)))?;
        Ok(Value::String(s))
    }

    /// Parse a textual literal as a value of the given column type
    pub fn parse(text: &str, col_type: &ColType) -> RecordResult<Self> {
        let text = text.trim();
        let value = match col_type {
            ColType::Int => Value::Int(text.parse().map_err(|_| {
                RecordError::InvalidValue(format!("'{}' is not a valid INT", text))
            })?),
            ColType::Float => Value::Float(text.parse().map_err(|_| {
                RecordError::InvalidValue(format!("'{}' is not a valid FLOAT", text))
            })?),
            ColType::String(_) | ColType::VarString(_) => {
                let unquoted = text
                    .strip_prefix('"')
                    .and_then(|t| t.strip_suffix('"'))
                    .unwrap_or(text);
                Value::String(unquoted.to_string())
            }
        };
        value.check(col_type)?;
        Ok(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => write!(f, "{}", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_col_type_sizes() {
        assert_eq!(ColType::Int.width(), 4);
        assert_eq!(ColType::Float.width(), 4);
        assert_eq!(ColType::String(10).width(), 10);
        assert!(ColType::String(3).is_fixed());
        assert!(!ColType::VarString(3).is_fixed());
    }

    #[test]
    fn test_col_type_parse() {
        assert_eq!("int".parse::<ColType>().unwrap(), ColType::Int);
        assert_eq!("FLOAT".parse::<ColType>().unwrap(), ColType::Float);
        assert_eq!("String(8)".parse::<ColType>().unwrap(), ColType::String(8));
        assert_eq!(
            "VARSTRING(20)".parse::<ColType>().unwrap(),
            ColType::VarString(20)
        );
        assert!("VARSTRING(x)".parse::<ColType>().is_err());
        assert!("DATE".parse::<ColType>().is_err());
        assert_eq!(ColType::VarString(20).to_string(), "VARSTRING(20)");
    }

    #[test]
    fn test_fixed_string_is_zero_padded() {
        let mut out = Vec::new();
        Value::String("hello".to_string())
            .encode_into(&ColType::String(8), &mut out)
            .unwrap();
        assert_eq!(out, b"hello\0\0\0");
        assert_eq!(
            Value::decode_fixed(&out, &ColType::String(8)).unwrap(),
            Value::String("hello".to_string())
        );
    }

    #[test]
    fn test_varstring_has_length_prefix() {
        let mut out = Vec::new();
        let value = Value::String("abc".to_string());
        value.encode_into(&ColType::VarString(10), &mut out).unwrap();
        assert_eq!(out, vec![3, 0, 0, 0, b'a', b'b', b'c']);
        assert_eq!(value.encoded_size(&ColType::VarString(10)), 7);
    }

    #[test]
    fn test_string_too_long() {
        let value = Value::String("hello world".to_string());
        assert!(matches!(
            value.check(&ColType::VarString(5)),
            Err(RecordError::ValueTooLong { len: 11, max: 5 })
        ));
        assert!(value.check(&ColType::String(5)).is_err());
    }

    #[test]
    fn test_string_with_nul_rejected() {
        let value = Value::String("ab\0".to_string());
        for col_type in [ColType::String(8), ColType::VarString(8)] {
            assert!(matches!(
                value.check(&col_type),
                Err(RecordError::InvalidValue(_))
            ));
            assert!(value.encode_into(&col_type, &mut Vec::new()).is_err());
        }
    }

    #[test]
    fn test_type_mismatch() {
        let result = Value::Int(42).encode_into(&ColType::Float, &mut Vec::new());
        assert!(matches!(result, Err(RecordError::TypeMismatch { .. })));
    }

    #[test]
    fn test_parse_literals() {
        assert_eq!(Value::parse(" 12 ", &ColType::Int).unwrap(), Value::Int(12));
        assert_eq!(
            Value::parse("2.5", &ColType::Float).unwrap(),
            Value::Float(2.5)
        );
        assert_eq!(
            Value::parse("\"bob\"", &ColType::VarString(5)).unwrap(),
            Value::String("bob".to_string())
        );
        assert!(Value::parse("abc", &ColType::Int).is_err());
        assert!(Value::parse("toolongvalue", &ColType::String(3)).is_err());
    }
}
