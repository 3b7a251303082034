//! Coarse argument summaries for stack frames.

use std::any::type_name;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Type-only description of a stack frame argument.
///
/// Summaries never hold the argument itself, which keeps envelopes
/// serialisable whatever the failing code was holding at the time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "type", rename_all = "snake_case")]
pub enum ArgSummary {
    /// A value of a named compound type.
    Object(String),
    /// A sequence of values.
    Array,
    /// A scalar, named by its primitive type.
    Primitive(String),
}

impl ArgSummary {
    /// Summarises a value of type `T` as an object named after the type.
    #[must_use]
    pub fn object<T: ?Sized>() -> Self {
        Self::Object(type_name::<T>().to_owned())
    }

    /// Summarises a primitive by its type name.
    #[must_use]
    pub fn primitive(name: impl Into<String>) -> Self {
        Self::Primitive(name.into())
    }

    /// Summarises a dynamically typed JSON value.
    #[must_use]
    pub fn of_value(value: &Value) -> Self {
        match value {
            Value::Null => Self::primitive("null"),
            Value::Bool(_) => Self::primitive("boolean"),
            Value::Number(number) if number.is_f64() => Self::primitive("double"),
            Value::Number(_) => Self::primitive("integer"),
            Value::String(_) => Self::primitive("string"),
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Object(String::from("object")),
        }
    }
}

impl fmt::Display for ArgSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Object(name) | Self::Primitive(name) => f.write_str(name),
            Self::Array => f.write_str("array"),
        }
    }
}

/// Maps a live value to its [`ArgSummary`].
///
/// Implemented for the primitive types, strings, slices, vectors, options and
/// JSON values. Compound types can implement it directly, usually by
/// returning [`ArgSummary::object::<Self>()`](ArgSummary::object).
///
/// Summarising a summary returns it unchanged, so re-summarising a frame is
/// idempotent.
pub trait Summarize {
    /// Returns the coarse type tag of `self`.
    fn summarize(&self) -> ArgSummary;
}

impl Summarize for ArgSummary {
    fn summarize(&self) -> ArgSummary {
        self.clone()
    }
}

impl<T: Summarize + ?Sized> Summarize for &T {
    fn summarize(&self) -> ArgSummary {
        (**self).summarize()
    }
}

macro_rules! summarize_as_primitive {
    ($name:literal => $($ty:ty),+ $(,)?) => {
        $(
            impl Summarize for $ty {
                fn summarize(&self) -> ArgSummary {
                    ArgSummary::primitive($name)
                }
            }
        )+
    };
}

summarize_as_primitive!("boolean" => bool);
summarize_as_primitive!(
    "integer" => i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize,
);
summarize_as_primitive!("double" => f32, f64);
summarize_as_primitive!("string" => char, str, String);
summarize_as_primitive!("null" => ());

impl<T> Summarize for [T] {
    fn summarize(&self) -> ArgSummary {
        ArgSummary::Array
    }
}

impl<T> Summarize for Vec<T> {
    fn summarize(&self) -> ArgSummary {
        ArgSummary::Array
    }
}

impl<T: Summarize> Summarize for Option<T> {
    fn summarize(&self) -> ArgSummary {
        self.as_ref()
            .map_or_else(|| ArgSummary::primitive("null"), Summarize::summarize)
    }
}

impl Summarize for Value {
    fn summarize(&self) -> ArgSummary {
        ArgSummary::of_value(self)
    }
}
