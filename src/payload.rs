//! # Data carried between streams.
//!
//! [`Payload`] is the single value type that crosses every operator boundary:
//! the input an executable is woken with, the data a stream closes with, the
//! error a failure branch receives and the data an event listener observes.
//!
//! - [`Payload::Empty`] no data (the initial wake of a root stream).
//! - [`Payload::Error`] a classified domain failure.
//! - [`Payload::Value`] application data as a JSON value.
//! - [`Payload::Opaque`] any other application value, shared by reference.
//!
//! ## Example
//! ```rust
//! use flowvisor::Payload;
//!
//! let p = Payload::from("testdata");
//! assert_eq!(p.as_str(), Some("testdata"));
//!
//! let opaque = Payload::opaque(vec![1u8, 2, 3]);
//! assert_eq!(opaque.downcast_ref::<Vec<u8>>().map(|v| v.len()), Some(3));
//! ```

use std::any::Any;
use std::rc::Rc;

use serde_json::Value;

use crate::error::StreamError;

/// Tagged union of everything a stream can pass on.
#[derive(Clone, Debug, Default)]
pub enum Payload {
    /// No data.
    #[default]
    Empty,
    /// Classified domain failure.
    Error(StreamError),
    /// Application data.
    Value(Value),
    /// Arbitrary application value, compared by identity.
    Opaque(Rc<dyn Any>),
}

impl Payload {
    /// Wraps an arbitrary value.
    pub fn opaque<T: Any>(value: T) -> Self {
        Payload::Opaque(Rc::new(value))
    }

    /// Returns `true` for [`Payload::Empty`].
    pub fn is_empty(&self) -> bool {
        matches!(self, Payload::Empty)
    }

    /// Returns the error, if this payload carries one.
    pub fn as_error(&self) -> Option<&StreamError> {
        match self {
            Payload::Error(e) => Some(e),
            _ => None,
        }
    }

    /// Returns the JSON value, if this payload carries one.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Payload::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the string, if this payload carries a JSON string.
    pub fn as_str(&self) -> Option<&str> {
        self.as_value().and_then(Value::as_str)
    }

    /// Returns the integer, if this payload carries a JSON integer.
    pub fn as_i64(&self) -> Option<i64> {
        self.as_value().and_then(Value::as_i64)
    }

    /// Downcasts an opaque payload.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Payload::Opaque(v) => v.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Consumes the payload and returns its JSON value.
    pub fn into_value(self) -> Option<Value> {
        match self {
            Payload::Value(v) => Some(v),
            _ => None,
        }
    }
}

impl PartialEq for Payload {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Payload::Empty, Payload::Empty) => true,
            (Payload::Error(a), Payload::Error(b)) => a == b,
            (Payload::Value(a), Payload::Value(b)) => a == b,
            (Payload::Opaque(a), Payload::Opaque(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<Value> for Payload {
    fn from(v: Value) -> Self {
        Payload::Value(v)
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Payload::Value(Value::from(s))
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Payload::Value(Value::from(s))
    }
}

impl From<i64> for Payload {
    fn from(n: i64) -> Self {
        Payload::Value(Value::from(n))
    }
}

impl From<bool> for Payload {
    fn from(b: bool) -> Self {
        Payload::Value(Value::from(b))
    }
}

impl From<StreamError> for Payload {
    fn from(e: StreamError) -> Self {
        Payload::Error(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_equality() {
        assert_eq!(Payload::Empty, Payload::default());
        assert_eq!(Payload::from("a"), Payload::Value(json!("a")));
        assert_ne!(Payload::from(1i64), Payload::from("1"));

        let shared = Payload::opaque(5u32);
        assert_eq!(shared.clone(), shared);
        assert_ne!(Payload::opaque(5u32), Payload::opaque(5u32));
    }

    #[test]
    fn test_accessors() {
        let p = Payload::from(42i64);
        assert_eq!(p.as_i64(), Some(42));
        assert!(p.as_str().is_none());
        assert!(p.as_error().is_none());

        let p = Payload::from(StreamError::runtime("x"));
        assert_eq!(p.as_error().map(StreamError::message), Some("x"));
        assert!(p.into_value().is_none());
    }
}
