//! Scalar kinds and their lexical forms
//!
//! Every kind has a total encoder/decoder pair. Writing is strict (booleans
//! are always `true`/`false`), reading is lenient where XML Schema allows
//! several lexical forms (`1`/`0` for booleans, `INF`/`NaN` for floats).

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::fmt;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

use crate::error::{Error, ErrorKind, Result};
use crate::value::Value;

/// Scalar type of a schema leaf
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    String,
    Int,
    Float,
    Bool,
    DateTime,
    Base64,
    /// Untyped: honours `xsi:type` when present, text otherwise
    Any,
}

impl ScalarKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "boolean",
            Self::DateTime => "dateTime",
            Self::Base64 => "base64Binary",
            Self::Any => "anyType",
        }
    }

    /// Map an XML Schema built-in type (`xsd:int`, `long`, ...) to a kind
    pub fn from_xsd(type_name: &str) -> Option<Self> {
        let local = type_name
            .rsplit_once(':')
            .map_or(type_name, |(_, local)| local);
        let kind = match local {
            "string" | "normalizedString" | "token" | "anyURI" | "QName" | "language" | "Name"
            | "NCName" | "ID" | "IDREF" | "NMTOKEN" | "date" | "time" | "duration" => Self::String,
            "int" | "integer" | "long" | "short" | "byte" | "nonNegativeInteger"
            | "nonPositiveInteger" | "positiveInteger" | "negativeInteger" | "unsignedInt"
            | "unsignedLong" | "unsignedShort" | "unsignedByte" => Self::Int,
            "float" | "double" | "decimal" => Self::Float,
            "boolean" => Self::Bool,
            "dateTime" => Self::DateTime,
            "base64Binary" => Self::Base64,
            "anyType" | "anySimpleType" => Self::Any,
            _ => return None,
        };
        Some(kind)
    }

    /// Decode element text into a native value
    pub fn decode(self, text: &str) -> Result<Value> {
        let trimmed = text.trim();
        let value = match self {
            Self::String | Self::Any => Value::String(text.to_string()),
            Self::Int => Value::Int(
                trimmed
                    .strip_prefix('+')
                    .unwrap_or(trimmed)
                    .parse::<i64>()
                    .map_err(|_| self.invalid(text))?,
            ),
            Self::Float => Value::Float(parse_float(trimmed).ok_or_else(|| self.invalid(text))?),
            Self::Bool => match trimmed {
                "true" | "1" => Value::Bool(true),
                "false" | "0" => Value::Bool(false),
                _ => return Err(self.invalid(text)),
            },
            Self::DateTime => {
                Value::DateTime(parse_datetime(trimmed).ok_or_else(|| self.invalid(text))?)
            }
            Self::Base64 => Value::Binary(decode_base64(trimmed).ok_or_else(|| self.invalid(text))?),
        };
        Ok(value)
    }

    /// Encode a native value as this kind's canonical text
    pub fn encode(self, value: &Value) -> Result<String> {
        match (self, value) {
            (Self::String | Self::Any, value) => {
                canonical_text(value).ok_or_else(|| self.invalid_value(value))
            }
            (Self::Int, Value::Int(n)) => Ok(n.to_string()),
            (Self::Int, Value::Float(f)) => float_to_int(*f)
                .map(|n| n.to_string())
                .ok_or_else(|| self.invalid_value(value)),
            (Self::Float, Value::Float(f)) => Ok(format_float(*f)),
            (Self::Float, Value::Int(_)) => value
                .as_float()
                .map(format_float)
                .ok_or_else(|| self.invalid_value(value)),
            (Self::Bool, Value::Bool(b)) => Ok(format_bool(*b)),
            (Self::DateTime, Value::DateTime(dt)) => Ok(format_datetime(dt)),
            (Self::Base64, Value::Binary(bytes)) => Ok(encode_base64(bytes)),
            (Self::Base64, Value::String(s)) => Ok(encode_base64(s.as_bytes())),
            // lexical input from the caller: validate through the decoder, then write canonically
            (_, Value::String(s)) => self.encode(&self.decode(s)?),
            _ => Err(self.invalid_value(value)),
        }
    }

    fn invalid(self, text: &str) -> Error {
        Error::from_kind(ErrorKind::InvalidScalar {
            kind: self.as_str().to_string(),
            text: text.to_string(),
        })
    }

    fn invalid_value(self, value: &Value) -> Error {
        Error::from_kind(ErrorKind::InvalidScalar {
            kind: self.as_str().to_string(),
            text: format!("{value:?}"),
        })
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical text of a scalar value; `None` for null, containers and XML
pub fn canonical_text(value: &Value) -> Option<String> {
    match value {
        Value::Bool(b) => Some(format_bool(*b)),
        Value::Int(n) => Some(n.to_string()),
        Value::Float(f) => Some(format_float(*f)),
        Value::String(s) => Some(s.clone()),
        Value::DateTime(dt) => Some(format_datetime(dt)),
        Value::Binary(bytes) => Some(encode_base64(bytes)),
        Value::Null | Value::Array(_) | Value::Object(_) | Value::Xml(_) => None,
    }
}

/// XML Schema boolean: never `1`/`0`
pub fn format_bool(value: bool) -> String {
    if value { "true" } else { "false" }.to_string()
}

/// XML Schema double: `INF`, `-INF`, `NaN` for non-finite values
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "INF" } else { "-INF" }.to_string()
    } else {
        value.to_string()
    }
}

fn parse_float(text: &str) -> Option<f64> {
    match text {
        "INF" | "+INF" => Some(f64::INFINITY),
        "-INF" => Some(f64::NEG_INFINITY),
        "NaN" => Some(f64::NAN),
        // Rust accepts "inf"/"nan" spellings XML Schema does not
        _ if text.chars().any(|c| c.is_ascii_alphabetic() && !matches!(c, 'e' | 'E')) => None,
        _ => text.parse::<f64>().ok(),
    }
}

#[allow(clippy::as_conversions)]
fn float_to_int(value: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, hence the strict upper bound
    if value.fract() == 0.0 && value >= i64::MIN as f64 && value < i64::MAX as f64 {
        Some(value as i64)
    } else {
        None
    }
}

/// RFC 3339 timestamp
pub fn format_datetime(value: &OffsetDateTime) -> String {
    value.format(&Rfc3339).unwrap_or_else(|_| value.to_string())
}

/// RFC 3339, or a local timestamp without offset taken as UTC
pub fn parse_datetime(text: &str) -> Option<OffsetDateTime> {
    if let Ok(value) = OffsetDateTime::parse(text, &Rfc3339) {
        return Some(value);
    }
    let local = format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"
    );
    PrimitiveDateTime::parse(text, local)
        .ok()
        .map(PrimitiveDateTime::assume_utc)
}

pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode base64, ignoring the line breaks some servers insert
pub fn decode_base64(text: &str) -> Option<Vec<u8>> {
    let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD.decode(compact).ok()
}
