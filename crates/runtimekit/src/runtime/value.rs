//! Dynamically typed values passed to and returned from methods.
//!
//! Every argument and every return value crossing the dispatcher is a
//! [`Value`]. Typed call sites convert back out through [`FromValue`], which
//! is also how [`MethodCallRequest<T>`](crate::runtime::dispatch::MethodCallRequest)
//! knows whether `T` is the unit type.

use crate::error::{Error, Result};
use crate::runtime::encoding::TypeTag;
use crate::runtime::{Class, Object, Selector};
use std::sync::Arc;

/// A runtime value.
///
/// `Object` and `Class` variants are reference-counted handles: cloning the
/// value retains the referent, dropping it releases it.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    /// Result of a void method.
    #[default]
    Void,
    /// Absent object reference.
    Nil,
    /// Boolean.
    Bool(bool),
    /// Any integer tag.
    Int(i64),
    /// Any floating point tag.
    Double(f64),
    /// String.
    Str(Arc<str>),
    /// Method name.
    Selector(Selector),
    /// Class reference.
    Class(Class),
    /// Object reference.
    Object(Object),
}

impl Value {
    /// The tag this value naturally encodes as.
    #[must_use]
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Value::Void => TypeTag::Void,
            Value::Nil | Value::Object(_) => TypeTag::Object,
            Value::Bool(_) => TypeTag::Bool,
            Value::Int(_) => TypeTag::LongLong,
            Value::Double(_) => TypeTag::Double,
            Value::Str(_) => TypeTag::CString,
            Value::Selector(_) => TypeTag::Selector,
            Value::Class(_) => TypeTag::Class,
        }
    }

    /// Returns `true` if this value may be passed where `tag` is declared.
    ///
    /// Strings and classes are objects, `nil` fits any nullable tag, and
    /// integers and floats fit every tag of their family.
    ///
    /// ```
    /// use runtimekit::Value;
    /// use runtimekit::runtime::encoding::TypeTag;
    ///
    /// assert!(Value::from("Ada").matches(TypeTag::Object));
    /// assert!(Value::Int(3).matches(TypeTag::Int));
    /// assert!(Value::Nil.matches(TypeTag::Class));
    /// assert!(!Value::Nil.matches(TypeTag::Bool));
    /// ```
    #[must_use]
    pub fn matches(&self, tag: TypeTag) -> bool {
        match (self, tag) {
            (Value::Void, TypeTag::Void) => true,
            (Value::Void, _) | (_, TypeTag::Void) => false,
            (_, TypeTag::Unknown) => true,
            (Value::Nil, tag) => tag.is_nullable(),
            (Value::Bool(_), TypeTag::Bool) => true,
            (Value::Int(_), tag) => tag.is_integer(),
            (Value::Double(_), tag) => tag.is_floating(),
            (Value::Str(_), TypeTag::CString | TypeTag::Object) => true,
            (Value::Selector(_), TypeTag::Selector) => true,
            (Value::Class(_), TypeTag::Class | TypeTag::Object) => true,
            (Value::Object(_), TypeTag::Object) => true,
            _ => false,
        }
    }

    /// Returns `true` for [`Value::Nil`].
    #[must_use]
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Returns `true` for [`Value::Void`].
    #[must_use]
    pub fn is_void(&self) -> bool {
        matches!(self, Value::Void)
    }

    /// Human readable name of the variant, used in error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Void => "void",
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "integer",
            Value::Double(_) => "double",
            Value::Str(_) => "string",
            Value::Selector(_) => "selector",
            Value::Class(_) => "class",
            Value::Object(_) => "object",
        }
    }

    /// Borrows the object reference, if any.
    #[must_use]
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Borrows the string, if any.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer, if any.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// The value `nil`-or-zero an instance variable of `tag` starts with.
    #[must_use]
    pub fn zero(tag: TypeTag) -> Value {
        match tag {
            TypeTag::Void => Value::Void,
            TypeTag::Bool => Value::Bool(false),
            TypeTag::Int | TypeTag::Long | TypeTag::LongLong => Value::Int(0),
            TypeTag::Float | TypeTag::Double => Value::Double(0.0),
            _ => Value::Nil,
        }
    }

    fn mismatch(self, expected: &str) -> Error {
        Error::TypeMismatch {
            expected: expected.to_string(),
            found: self.type_name().to_string(),
        }
    }
}

impl From<()> for Value {
    fn from((): ()) -> Self {
        Value::Void
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(Arc::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(Arc::from(value))
    }
}

impl From<Selector> for Value {
    fn from(value: Selector) -> Self {
        Value::Selector(value)
    }
}

impl From<Class> for Value {
    fn from(value: Class) -> Self {
        Value::Class(value)
    }
}

impl From<Object> for Value {
    fn from(value: Object) -> Self {
        Value::Object(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Nil, Into::into)
    }
}

/// Conversion from a [`Value`] into a typed result.
pub trait FromValue: Sized {
    /// `true` only for `()`; calls requesting a void type always produce a
    /// void result.
    const IS_VOID: bool = false;

    /// Converts `value`, failing with [`Error::TypeMismatch`] if it has the
    /// wrong shape.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] when the variant does not convert.
    fn from_value(value: Value) -> Result<Self>;
}

impl FromValue for () {
    const IS_VOID: bool = true;

    fn from_value(_value: Value) -> Result<Self> {
        Ok(())
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self> {
        Ok(value)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Void | Value::Nil => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(other.mismatch("bool")),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Int(i) => Ok(i),
            other => Err(other.mismatch("integer")),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Int(i) => i32::try_from(i).map_err(|_| Error::TypeMismatch {
                expected: "i32".to_string(),
                found: format!("integer {i}"),
            }),
            other => Err(other.mismatch("i32")),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Double(d) => Ok(d),
            other => Err(other.mismatch("double")),
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Str(s) => Ok(s.to_string()),
            other => Err(other.mismatch("string")),
        }
    }
}

impl FromValue for Arc<str> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Str(s) => Ok(s),
            other => Err(other.mismatch("string")),
        }
    }
}

impl FromValue for Selector {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Selector(sel) => Ok(sel),
            other => Err(other.mismatch("selector")),
        }
    }
}

impl FromValue for Class {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Class(class) => Ok(class),
            other => Err(other.mismatch("class")),
        }
    }
}

impl FromValue for Object {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(object) => Ok(object),
            other => Err(other.mismatch("object")),
        }
    }
}
