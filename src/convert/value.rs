//! Host values: what the calling application passes in and gets back.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::{ConversionError, ConversionResult};
use crate::term::Term;

use super::registry::TypeTag;

/// An application-defined value that converts through a registered converter.
///
/// The type tag selects the converter; declare its supertype and interfaces in
/// the policy's [`TypeRegistry`](super::TypeRegistry) to let it fall back to
/// converters registered for those.
pub trait HostObject: fmt::Debug + Send + Sync {
    fn type_tag(&self) -> TypeTag;
    fn as_any(&self) -> &dyn Any;
}

/// A dynamically-typed host value.
#[derive(Debug, Clone)]
pub enum Value {
    /// Absent value. Converts to the anonymous variable.
    Null,
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    /// A fixed-size array. Converted only by the array converter.
    Array(Vec<Value>),
    Compound(Compound),
    /// A value that already is a term; used as is.
    Term(Term),
    Object(Arc<dyn HostObject>),
}

impl Value {
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Self::Null => TypeTag::NULL,
            Self::Int(_) => TypeTag::INT,
            Self::Float(_) => TypeTag::FLOAT,
            Self::Str(_) => TypeTag::STRING,
            Self::List(_) => TypeTag::LIST,
            Self::Array(_) => TypeTag::ARRAY,
            Self::Compound(_) => TypeTag::COMPOUND,
            Self::Term(_) => TypeTag::TERM,
            Self::Object(obj) => obj.type_tag(),
        }
    }

    pub fn object(obj: impl HostObject + 'static) -> Self {
        Self::Object(Arc::new(obj))
    }

    pub fn array<T: Into<Value>>(items: impl IntoIterator<Item = T>) -> Self {
        Self::Array(items.into_iter().map(Into::into).collect())
    }

    /// Borrow a host object as its concrete type.
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        match self {
            Self::Object(obj) => obj.as_any().downcast_ref::<T>(),
            _ => None,
        }
    }

    /// JSON rendering for display. Objects render as their debug text.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Self::Null => Json::Null,
            Self::Int(n) => Json::from(*n),
            Self::Float(x) => serde_json::Number::from_f64(*x)
                .map(Json::Number)
                .unwrap_or_else(|| Json::String(x.to_string())),
            Self::Str(s) => Json::String(s.clone()),
            Self::List(items) | Self::Array(items) => {
                Json::Array(items.iter().map(Self::to_json).collect())
            }
            Self::Compound(c) => serde_json::json!({
                "functor": c.functor,
                "args": c.args.iter().map(Self::to_json).collect::<Vec<_>>(),
            }),
            Self::Term(t) => Json::String(t.to_string()),
            Self::Object(obj) => Json::String(format!("{obj:?}")),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::List(_) => "list",
            Self::Array(_) => "array",
            Self::Compound(_) => "compound",
            Self::Term(_) => "term",
            Self::Object(_) => "object",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::List(a), Self::List(b)) | (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Compound(a), Self::Compound(b)) => a == b,
            (Self::Term(a), Self::Term(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// A functor with host-value arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Compound {
    pub functor: String,
    pub args: Vec<Value>,
}

impl Compound {
    pub fn new(functor: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            functor: functor.into(),
            args,
        }
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }
}

// ---------------------------------------------------------------------------
// Into Value
// ---------------------------------------------------------------------------

macro_rules! value_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Int(i64::from(v))
            }
        })*
    };
}

value_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
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

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(v: [T; N]) -> Self {
        Value::array(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl From<Compound> for Value {
    fn from(v: Compound) -> Self {
        Value::Compound(v)
    }
}

impl From<Term> for Value {
    fn from(v: Term) -> Self {
        Value::Term(v)
    }
}

// ---------------------------------------------------------------------------
// Out of Value
// ---------------------------------------------------------------------------

/// Typed extraction from a converted host value.
pub trait FromValue: Sized {
    /// Name used in mismatch errors.
    const EXPECTED: &'static str;

    fn from_value(value: Value) -> ConversionResult<Self>;
}

fn mismatch<T: FromValue>(value: &Value) -> ConversionError {
    ConversionError::TypeMismatch {
        expected: T::EXPECTED.to_string(),
        found: value.kind().to_string(),
    }
}

impl FromValue for Value {
    const EXPECTED: &'static str = "value";

    fn from_value(value: Value) -> ConversionResult<Self> {
        Ok(value)
    }
}

impl FromValue for i64 {
    const EXPECTED: &'static str = "i64";

    fn from_value(value: Value) -> ConversionResult<Self> {
        match value {
            Value::Int(n) => Ok(n),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl FromValue for i32 {
    const EXPECTED: &'static str = "i32";

    fn from_value(value: Value) -> ConversionResult<Self> {
        match value {
            Value::Int(n) => i32::try_from(n).map_err(|_| ConversionError::TypeMismatch {
                expected: Self::EXPECTED.to_string(),
                found: format!("integer {n}"),
            }),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl FromValue for f64 {
    const EXPECTED: &'static str = "f64";

    fn from_value(value: Value) -> ConversionResult<Self> {
        match value {
            Value::Float(x) => Ok(x),
            Value::Int(n) => Ok(n as f64),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl FromValue for String {
    const EXPECTED: &'static str = "string";

    fn from_value(value: Value) -> ConversionResult<Self> {
        match value {
            Value::Str(s) => Ok(s),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl FromValue for Compound {
    const EXPECTED: &'static str = "compound";

    fn from_value(value: Value) -> ConversionResult<Self> {
        match value {
            Value::Compound(c) => Ok(c),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl FromValue for Term {
    const EXPECTED: &'static str = "term";

    fn from_value(value: Value) -> ConversionResult<Self> {
        match value {
            Value::Term(t) => Ok(t),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl FromValue for Arc<dyn HostObject> {
    const EXPECTED: &'static str = "object";

    fn from_value(value: Value) -> ConversionResult<Self> {
        match value {
            Value::Object(obj) => Ok(obj),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    const EXPECTED: &'static str = T::EXPECTED;

    fn from_value(value: Value) -> ConversionResult<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    const EXPECTED: &'static str = "list";

    fn from_value(value: Value) -> ConversionResult<Self> {
        match value {
            Value::List(items) | Value::Array(items) => {
                items.into_iter().map(T::from_value).collect()
            }
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl<T: FromValue> FromValue for Box<[T]> {
    const EXPECTED: &'static str = "array";

    fn from_value(value: Value) -> ConversionResult<Self> {
        Vec::<T>::from_value(value).map(Vec::into_boxed_slice)
    }
}
