//! Reversible mapping between queue items and `(text, type)` row pairs.
//!
//! Primitives are stored in their textual form; lists, mappings and retry
//! wrappers are stored as JSON. The `type` column names which of these
//! encodings a row uses.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::value::{Item, RetryEnvelope, RetryItem, Value};

/// Encoding tag stored in the `type` column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Int,
    Float,
    Str,
    List,
    Dict,
    Retry,
}

impl TypeTag {
    pub const ALL: [TypeTag; 6] = [
        TypeTag::Int,
        TypeTag::Float,
        TypeTag::Str,
        TypeTag::List,
        TypeTag::Dict,
        TypeTag::Retry,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TypeTag::Int => "int",
            TypeTag::Float => "float",
            TypeTag::Str => "str",
            TypeTag::List => "list",
            TypeTag::Dict => "dict",
            TypeTag::Retry => "retry",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TypeTag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        TypeTag::ALL
            .into_iter()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| Error::corrupted(s, "unknown type tag"))
    }
}

/// A row ready to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedItem {
    pub text: String,
    pub tag: TypeTag,
}

/// Result of decoding one row.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Plain(Value),
    /// Item plus its retry counter (or the default when the row was plain).
    Retry(Value, i64),
}

impl Decoded {
    pub fn into_value(self) -> Value {
        match self {
            Decoded::Plain(value) | Decoded::Retry(value, _) => value,
        }
    }

    /// Split into `(item, again)`. Plain decodes carry no counter, so
    /// `default_max_try` fills in.
    pub fn into_retry(self, default_max_try: i64) -> (Value, i64) {
        match self {
            Decoded::Plain(value) => (value, default_max_try),
            Decoded::Retry(value, again) => (value, again),
        }
    }
}

/// Encode an item. Fails with [`Error::UnsupportedType`] without producing
/// any partial output.
pub fn encode(item: &Item) -> Result<EncodedItem> {
    let (text, tag) = match item {
        Item::Plain(Value::Int(i)) => (i.to_string(), TypeTag::Int),
        Item::Plain(Value::Float(f)) => (float_text(*f), TypeTag::Float),
        Item::Plain(Value::Str(s)) => (s.clone(), TypeTag::Str),
        Item::Plain(value @ Value::List(_)) => (to_json_text(&value.to_json()?)?, TypeTag::List),
        Item::Plain(value @ Value::Dict(_)) => (to_json_text(&value.to_json()?)?, TypeTag::Dict),
        Item::Retry(RetryItem { item, again }) => {
            let envelope = RetryEnvelope {
                item: item.to_json()?,
                again: *again,
            };
            (to_json_text(&envelope)?, TypeTag::Retry)
        }
    };
    Ok(EncodedItem { text, tag })
}

// Shortest of the positional and exponent forms; both parse back exactly.
fn float_text(f: f64) -> String {
    let positional = f.to_string();
    let exponent = format!("{f:e}");
    if exponent.len() < positional.len() {
        exponent
    } else {
        positional
    }
}

fn to_json_text<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| Error::UnsupportedType(e.to_string()))
}

/// Decode a stored row.
///
/// In retry mode every row yields a counter: retry rows their own, plain rows
/// `default_max_try`. Outside retry mode the counter of a retry row is
/// dropped. An unknown tag or unparsable text is [`Error::Corrupted`].
pub fn decode(text: &str, tag: &str, retry_mode: bool, default_max_try: i64) -> Result<Decoded> {
    let tag: TypeTag = tag.parse()?;
    let (value, again) = match tag {
        TypeTag::Int => (
            Value::Int(text.parse().map_err(|e| Error::corrupted(tag.as_str(), e))?),
            None,
        ),
        TypeTag::Float => (
            Value::Float(text.parse().map_err(|e| Error::corrupted(tag.as_str(), e))?),
            None,
        ),
        TypeTag::Str => (Value::Str(text.to_string()), None),
        TypeTag::List => match from_json_text(text, tag)? {
            value @ Value::List(_) => (value, None),
            other => return Err(Error::corrupted(tag.as_str(), format!("found {}", other.kind()))),
        },
        TypeTag::Dict => match from_json_text(text, tag)? {
            value @ Value::Dict(_) => (value, None),
            other => return Err(Error::corrupted(tag.as_str(), format!("found {}", other.kind()))),
        },
        TypeTag::Retry => {
            let envelope: RetryEnvelope =
                serde_json::from_str(text).map_err(|e| Error::corrupted(tag.as_str(), e))?;
            let value =
                Value::try_from(envelope.item).map_err(|e| Error::corrupted(tag.as_str(), e))?;
            (value, Some(envelope.again))
        }
    };

    Ok(if retry_mode {
        Decoded::Retry(value, again.unwrap_or(default_max_try))
    } else {
        Decoded::Plain(value)
    })
}

fn from_json_text(text: &str, tag: TypeTag) -> Result<Value> {
    let json: serde_json::Value =
        serde_json::from_str(text).map_err(|e| Error::corrupted(tag.as_str(), e))?;
    Value::try_from(json).map_err(|e| Error::corrupted(tag.as_str(), e))
}
