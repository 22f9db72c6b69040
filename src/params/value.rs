//! Item types that can be bound from a request.
//!
//! A [`ParamValue`] knows two things: the JSON schema of its values, and how to
//! turn one raw query/header/path string into a JSON value of that type.
//!
//! The default decoding treats the raw text as a JSON literal (`42`, `true`,
//! `1.5`). Textual types such as `String` take the raw text verbatim instead; a
//! custom type opts into that by calling [`textual`] from its own
//! `decode_param`.

use anyhow::Context as _;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

/// A type usable as the item type of a bound field.
pub trait ParamValue: DeserializeOwned + 'static {
    /// JSON schema of a single value of this type.
    fn schema() -> Value;

    /// Decode one raw string into a JSON value that deserializes as `Self`.
    ///
    /// # Errors
    ///
    /// Returns an error describing why `raw` is not a valid `Self`.
    fn decode_param(raw: &str) -> anyhow::Result<Value> {
        literal::<Self>(raw)
    }
}

/// Decode `raw` as a JSON literal and check it against `T`.
///
/// # Errors
///
/// Fails if `raw` is not JSON or does not deserialize as `T`.
pub fn literal<T: DeserializeOwned>(raw: &str) -> anyhow::Result<Value> {
    let value: Value = serde_json::from_str(raw)
        .with_context(|| format!("can't parse `{raw}` to expected value"))?;
    T::deserialize(&value).with_context(|| format!("can't parse `{raw}` to expected value"))?;
    Ok(value)
}

/// Take `raw` as a string value and check it against `T`.
///
/// # Errors
///
/// Fails if `T` does not deserialize from a JSON string holding `raw`.
pub fn textual<T: DeserializeOwned>(raw: &str) -> anyhow::Result<Value> {
    let value = Value::String(raw.to_string());
    T::deserialize(&value).with_context(|| format!("can't parse `{raw}` to expected value"))?;
    Ok(value)
}

macro_rules! integer_param {
    ($($t:ty),*) => {$(
        impl ParamValue for $t {
            fn schema() -> Value {
                json!({"type": "integer"})
            }
        }
    )*};
}

integer_param!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl ParamValue for f32 {
    fn schema() -> Value {
        json!({"type": "number"})
    }
}

impl ParamValue for f64 {
    fn schema() -> Value {
        json!({"type": "number"})
    }
}

impl ParamValue for bool {
    fn schema() -> Value {
        json!({"type": "boolean"})
    }
}

impl ParamValue for String {
    fn schema() -> Value {
        json!({"type": "string"})
    }

    fn decode_param(raw: &str) -> anyhow::Result<Value> {
        Ok(Value::String(raw.to_string()))
    }
}

impl ParamValue for char {
    fn schema() -> Value {
        json!({"type": "string", "minLength": 1, "maxLength": 1})
    }

    fn decode_param(raw: &str) -> anyhow::Result<Value> {
        textual::<Self>(raw)
    }
}

/// Untyped values: a JSON literal when the text parses, the raw string otherwise.
impl ParamValue for Value {
    fn schema() -> Value {
        json!({})
    }

    fn decode_param(raw: &str) -> anyhow::Result<Value> {
        Ok(serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string())))
    }
}

impl<T: ParamValue> ParamValue for Vec<T> {
    fn schema() -> Value {
        json!({"type": "array", "items": T::schema()})
    }
}

impl<T: ParamValue> ParamValue for Box<T> {
    fn schema() -> Value {
        T::schema()
    }

    fn decode_param(raw: &str) -> anyhow::Result<Value> {
        T::decode_param(raw)
    }
}
