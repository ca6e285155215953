//! Argument conversion for native method handlers.
//!
//! Parameters arrive from the scripting runtime as a list of JSON values.
//! `Args` wraps that list and converts individual positions into Rust types
//! through `FromValue`, reporting the position and the JSON type on mismatch.
//!
//! # Example
//!
//! ```ignore
//! fn call(&self, ctx: &dyn BridgeContext, method: usize, args: Args<'_>) -> NativeResult<Value> {
//!     let tag: i64 = args.get(0)?;
//!     let name: String = args.get(1)?;
//!     let done: Callback = args.get(2)?;
//!     done.invoke(ctx, vec![Value::from(tag), Value::from(name)]);
//!     Ok(Value::Null)
//! }
//! ```

use serde_json::{Map, Value};

use crate::context::BridgeContext;
use crate::error::{NativeError, NativeResult};

/// Name of a JSON value's type, used in mismatch errors
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Convert a JSON argument into a Rust type.
pub trait FromValue: Sized {
    /// Type name reported in mismatch errors
    const EXPECTED: &'static str;

    /// Convert, returning `None` if the JSON type doesn't match
    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for Value {
    const EXPECTED: &'static str = "any";

    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl FromValue for bool {
    const EXPECTED: &'static str = "boolean";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl FromValue for i64 {
    const EXPECTED: &'static str = "integer";

    fn from_value(value: &Value) -> Option<Self> {
        // Scripting runtimes only have doubles; accept integral floats.
        value.as_i64().or_else(|| {
            value
                .as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        })
    }
}

impl FromValue for u64 {
    const EXPECTED: &'static str = "unsigned integer";

    fn from_value(value: &Value) -> Option<Self> {
        i64::from_value(value).and_then(|i| u64::try_from(i).ok())
    }
}

impl FromValue for f64 {
    const EXPECTED: &'static str = "number";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_f64()
    }
}

impl FromValue for String {
    const EXPECTED: &'static str = "string";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl FromValue for Vec<Value> {
    const EXPECTED: &'static str = "array";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_array().cloned()
    }
}

impl FromValue for Map<String, Value> {
    const EXPECTED: &'static str = "object";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_object().cloned()
    }
}

impl<T: FromValue> FromValue for Option<T> {
    const EXPECTED: &'static str = T::EXPECTED;

    fn from_value(value: &Value) -> Option<Self> {
        if value.is_null() {
            Some(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}

// ============================================================================
// Callback
// ============================================================================

/// A script-side callback, referenced on the wire by its numeric ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Callback {
    id: u64,
}

impl Callback {
    /// Wrap a callback ID
    pub fn new(id: u64) -> Self {
        Callback { id }
    }

    /// The wire ID of this callback
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Invoke the callback with the given arguments.
    pub fn invoke(&self, ctx: &dyn BridgeContext, args: Vec<Value>) {
        ctx.invoke_callback(self.id, args);
    }
}

impl FromValue for Callback {
    const EXPECTED: &'static str = "callback id";

    fn from_value(value: &Value) -> Option<Self> {
        u64::from_value(value).map(Callback::new)
    }
}

// ============================================================================
// Args
// ============================================================================

/// Borrowed view over a method's parameter list.
#[derive(Debug, Clone, Copy)]
pub struct Args<'a> {
    values: &'a [Value],
}

impl<'a> Args<'a> {
    /// Wrap a parameter list
    pub fn new(values: &'a [Value]) -> Self {
        Args { values }
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if there are no parameters
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw parameter at `index`
    pub fn raw(&self, index: usize) -> Option<&'a Value> {
        self.values.get(index)
    }

    /// All raw parameters
    pub fn as_slice(&self) -> &'a [Value] {
        self.values
    }

    /// Convert the parameter at `index`, failing if it is missing or mistyped.
    pub fn get<T: FromValue>(&self, index: usize) -> NativeResult<T> {
        let value = self.values.get(index).ok_or_else(|| {
            NativeError::ArgumentError(format!(
                "missing argument {} (expected {}, got {} arguments)",
                index,
                T::EXPECTED,
                self.values.len()
            ))
        })?;
        T::from_value(value).ok_or(NativeError::TypeMismatch {
            index,
            expected: T::EXPECTED,
            got: type_name(value),
        })
    }

    /// Convert the parameter at `index`, treating a missing or null value as `None`.
    pub fn opt<T: FromValue>(&self, index: usize) -> NativeResult<Option<T>> {
        match self.values.get(index) {
            None | Some(Value::Null) => Ok(None),
            Some(_) => self.get(index).map(Some),
        }
    }
}
