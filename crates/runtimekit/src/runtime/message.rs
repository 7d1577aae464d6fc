//! Message receivers and argument packs.
//!
//! A message is sent to a [`Receiver`] (a class for class methods, an
//! instance for instance methods) with a [`MessageArgs`] pack holding zero,
//! one or two values. The dispatcher packs every argument slice before
//! resolving the method; a slice of three or more values fails with
//! [`Error::TooManyArguments`].
//!
//! # Example
//!
//! ```rust
//! use runtimekit::runtime::MessageArgs;
//! use runtimekit::Value;
//!
//! let args = MessageArgs::two(Value::Int(10), Value::Int(20));
//! assert_eq!(args.count(), 2);
//!
//! let too_many = [Value::Int(1), Value::Int(2), Value::Int(3)];
//! assert!(MessageArgs::try_from(&too_many[..]).is_err());
//! ```

use crate::error::{Error, Result};
use crate::runtime::signature::MethodKind;
use crate::runtime::{Class, Object, Value};

/// Maximum number of explicit arguments a message can carry.
pub const MAX_ARGUMENTS: usize = 2;

/// The target of a message.
#[derive(Debug, Clone, PartialEq)]
pub enum Receiver {
    /// Class-level message; resolves class methods.
    Class(Class),
    /// Instance-level message; resolves instance methods.
    Instance(Object),
}

impl Receiver {
    /// The class whose method tables the message is resolved against.
    #[must_use]
    pub fn class(&self) -> Class {
        match self {
            Receiver::Class(class) => class.clone(),
            Receiver::Instance(object) => object.class(),
        }
    }

    /// Class methods for class receivers, instance methods otherwise.
    #[must_use]
    pub fn kind(&self) -> MethodKind {
        match self {
            Receiver::Class(_) => MethodKind::Class,
            Receiver::Instance(_) => MethodKind::Instance,
        }
    }

    /// Borrows the instance, if this is an instance receiver.
    #[must_use]
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Receiver::Instance(object) => Some(object),
            Receiver::Class(_) => None,
        }
    }

    /// Borrows the class, if this is a class receiver.
    #[must_use]
    pub fn as_class(&self) -> Option<&Class> {
        match self {
            Receiver::Class(class) => Some(class),
            Receiver::Instance(_) => None,
        }
    }

    /// The receiver as a value (`Value::Class` or `Value::Object`).
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Receiver::Class(class) => Value::Class(class.clone()),
            Receiver::Instance(object) => Value::Object(object.clone()),
        }
    }
}

impl From<Class> for Receiver {
    fn from(class: Class) -> Self {
        Receiver::Class(class)
    }
}

impl From<&Class> for Receiver {
    fn from(class: &Class) -> Self {
        Receiver::Class(class.clone())
    }
}

impl From<Object> for Receiver {
    fn from(object: Object) -> Self {
        Receiver::Instance(object)
    }
}

impl From<&Object> for Receiver {
    fn from(object: &Object) -> Self {
        Receiver::Instance(object.clone())
    }
}

/// Zero, one or two message arguments.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum MessageArgs {
    /// No arguments.
    #[default]
    None,

    /// One argument.
    One(Value),

    /// Two arguments.
    Two([Value; 2]),
}

impl MessageArgs {
    /// Creates an empty argument pack.
    #[must_use]
    pub const fn none() -> Self {
        MessageArgs::None
    }

    /// Creates a single-argument pack.
    #[must_use]
    pub fn one(arg: impl Into<Value>) -> Self {
        MessageArgs::One(arg.into())
    }

    /// Creates a two-argument pack.
    #[must_use]
    pub fn two(arg1: impl Into<Value>, arg2: impl Into<Value>) -> Self {
        MessageArgs::Two([arg1.into(), arg2.into()])
    }

    /// Number of arguments in the pack.
    #[must_use]
    pub const fn count(&self) -> usize {
        match self {
            MessageArgs::None => 0,
            MessageArgs::One(_) => 1,
            MessageArgs::Two(_) => 2,
        }
    }

    /// The arguments as a slice, in call order.
    #[must_use]
    pub fn as_slice(&self) -> &[Value] {
        match self {
            MessageArgs::None => &[],
            MessageArgs::One(arg) => std::slice::from_ref(arg),
            MessageArgs::Two(args) => args,
        }
    }
}

impl TryFrom<&[Value]> for MessageArgs {
    type Error = Error;

    fn try_from(args: &[Value]) -> Result<Self> {
        match args {
            [] => Ok(MessageArgs::None),
            [a] => Ok(MessageArgs::One(a.clone())),
            [a, b] => Ok(MessageArgs::Two([a.clone(), b.clone()])),
            _ => Err(Error::TooManyArguments { got: args.len() }),
        }
    }
}
