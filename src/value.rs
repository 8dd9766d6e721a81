use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Core value types a queue can hold
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Dict(BTreeMap<String, Value>),
}

impl Value {
    /// Convert into a JSON document. Non-finite floats have no JSON form.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(match self {
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .ok_or_else(|| Error::UnsupportedType(format!("non-finite float {f} in composite")))?,
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => serde_json::Value::Array(
                items.iter().map(Value::to_json).collect::<Result<_>>()?,
            ),
            Value::Dict(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| v.to_json().map(|json| (k.clone(), json)))
                    .collect::<Result<_>>()?,
            ),
        })
    }

    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
        }
    }
}

impl TryFrom<serde_json::Value> for Value {
    type Error = Error;

    fn try_from(json: serde_json::Value) -> Result<Self> {
        match json {
            serde_json::Value::Null => Err(Error::UnsupportedType("null".to_string())),
            serde_json::Value::Bool(b) => Err(Error::UnsupportedType(format!("bool ({b})"))),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Value::Int(i))
                } else if n.is_u64() {
                    Err(Error::UnsupportedType(format!("integer {n} out of range")))
                } else {
                    n.as_f64()
                        .map(Value::Float)
                        .ok_or_else(|| Error::UnsupportedType(format!("number {n}")))
                }
            }
            serde_json::Value::String(s) => Ok(Value::Str(s)),
            serde_json::Value::Array(items) => Ok(Value::List(
                items
                    .into_iter()
                    .map(Value::try_from)
                    .collect::<Result<_>>()?,
            )),
            serde_json::Value::Object(map) => Ok(Value::Dict(
                map.into_iter()
                    .map(|(k, v)| Value::try_from(v).map(|value| (k, value)))
                    .collect::<Result<_>>()?,
            )),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(v: BTreeMap<String, Value>) -> Self {
        Value::Dict(v)
    }
}

/// An item carrying an opaque retry counter. The queue never interprets
/// `again`; callers decide what it means.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryItem {
    pub item: Value,
    pub again: i64,
}

impl RetryItem {
    pub fn new(item: impl Into<Value>, again: i64) -> Self {
        Self {
            item: item.into(),
            again,
        }
    }
}

/// On-disk layout of a retry row.
#[derive(Serialize, Deserialize)]
pub(crate) struct RetryEnvelope {
    pub item: serde_json::Value,
    pub again: i64,
}

/// Anything that can be pushed.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Plain(Value),
    Retry(RetryItem),
}

macro_rules! plain_item_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Item {
                fn from(v: $ty) -> Self {
                    Item::Plain(v.into())
                }
            }
        )*
    };
}

plain_item_from!(Value, i64, i32, u32, f64, &str, String, BTreeMap<String, Value>);

impl<T: Into<Value>> From<Vec<T>> for Item {
    fn from(v: Vec<T>) -> Self {
        Item::Plain(v.into())
    }
}

impl From<RetryItem> for Item {
    fn from(v: RetryItem) -> Self {
        Item::Retry(v)
    }
}
