//! Values passed between rule activations
//!
//! Semantic actions produce [`Value`]s, rules push them onto the
//! [`ObjectStack`](super::context::ObjectStack) when they leave, and the
//! calling rule pops them into its context. A value is moved, never shared,
//! so each synthesized result has exactly one consumer.
//!
//! Domain entities (syntax tree nodes, symbols) travel as
//! [`Value::Object`], a shared pointer recovered with
//! [`Value::downcast_ref`] or through [`FromValue`] for `Arc<T>`.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::error::ActionError;

/// A dynamically typed value produced or consumed by semantic actions
#[derive(Clone, Default)]
pub enum Value {
    /// No value
    #[default]
    Nil,
    /// Boolean value
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Float value
    Float(f64),
    /// Single code point
    Char(char),
    /// String value
    Str(String),
    /// List of values
    List(Vec<Value>),
    /// Opaque domain entity
    Object(Arc<dyn Any + Send + Sync>),
}

impl Value {
    /// Wrap a domain entity
    pub fn object<T: Any + Send + Sync>(entity: T) -> Self {
        Value::Object(Arc::new(entity))
    }

    /// Create a string value
    pub fn string(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    /// Name of the variant, used in conversion errors
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Char(_) => "char",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Object(_) => "object",
        }
    }

    /// Check if this is nil
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Get as boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as integer
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Get as float; integers widen
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// Get as char
    pub fn as_char(&self) -> Option<char> {
        match self {
            Value::Char(c) => Some(*c),
            _ => None,
        }
    }

    /// Get as string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Get as list
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Get as mutable list
    pub fn as_list_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Borrow the wrapped domain entity if it has type `T`
    pub fn downcast_ref<T: Any + Send + Sync>(&self) -> Option<&T> {
        match self {
            Value::Object(entity) => entity.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Convert into a concrete type, consuming the value
    pub fn into_typed<T: FromValue>(self) -> Result<T, ActionError> {
        T::from_value(self)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "Nil"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(n) => write!(f, "Int({n})"),
            Value::Float(x) => write!(f, "Float({x})"),
            Value::Char(c) => write!(f, "Char({c:?})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::List(items) => f.debug_tuple("List").field(items).finish(),
            Value::Object(_) => write!(f, "Object(..)"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Char(c) => write!(f, "{c}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Object(_) => write!(f, "<object>"),
        }
    }
}

// Objects compare by identity
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::Char(c)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

/// Conversion out of a [`Value`]
///
/// Implemented for the scalar types, `String`, `Vec<Value>`, `Value` itself
/// and `Arc<T>` for domain entities.
pub trait FromValue: Sized {
    /// Convert, failing with [`ActionError::TypeMismatch`] on the wrong variant
    fn from_value(value: Value) -> Result<Self, ActionError>;
}

fn mismatch(expected: &'static str, found: &Value) -> ActionError {
    ActionError::TypeMismatch {
        expected,
        found: found.type_name(),
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, ActionError> {
        Ok(value)
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, ActionError> {
        value.as_bool().ok_or_else(|| mismatch("bool", &value))
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> Result<Self, ActionError> {
        value.as_int().ok_or_else(|| mismatch("int", &value))
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self, ActionError> {
        value.as_float().ok_or_else(|| mismatch("float", &value))
    }
}

impl FromValue for char {
    fn from_value(value: Value) -> Result<Self, ActionError> {
        value.as_char().ok_or_else(|| mismatch("char", &value))
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, ActionError> {
        match value {
            Value::Str(s) => Ok(s),
            other => Err(mismatch("string", &other)),
        }
    }
}

impl FromValue for Vec<Value> {
    fn from_value(value: Value) -> Result<Self, ActionError> {
        match value {
            Value::List(items) => Ok(items),
            other => Err(mismatch("list", &other)),
        }
    }
}

impl<T: Any + Send + Sync> FromValue for Arc<T> {
    fn from_value(value: Value) -> Result<Self, ActionError> {
        match value {
            Value::Object(entity) => entity.downcast::<T>().map_err(|_| {
                ActionError::TypeMismatch {
                    expected: std::any::type_name::<T>(),
                    found: "object",
                }
            }),
            other => Err(mismatch(std::any::type_name::<T>(), &other)),
        }
    }
}
