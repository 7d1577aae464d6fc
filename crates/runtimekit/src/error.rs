//! Error types for `RuntimeKit`.
//!
//! Every fallible operation in the crate reports one of these variants to its
//! immediate caller. None of them is fatal to the process and none of them is
//! rolled back: a method replaced before a later failure stays replaced.

use std::fmt;

/// Errors that can occur in the `RuntimeKit` runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// More than two positional arguments were passed to the dispatcher.
    TooManyArguments {
        /// Number of arguments supplied.
        got: usize,
    },

    /// No method with that name and kind exists on the class or its ancestors.
    MethodNotFound {
        /// The selector that failed to resolve.
        selector: String,
    },

    /// A class with this name is already present in the namespace.
    ClassAlreadyExists {
        /// The requested class name.
        name: String,
    },

    /// The class has been registered and its layout is fixed.
    ClassAlreadyFinalized {
        /// The class name.
        name: String,
    },

    /// The selector is already implemented directly on the class.
    MethodAlreadyExists {
        /// The conflicting selector.
        selector: String,
    },

    /// A stored or returned value does not have the requested type.
    TypeMismatch {
        /// The type the caller asked for.
        expected: String,
        /// The type actually found.
        found: String,
    },

    /// No class with this name is registered.
    ClassNotFound {
        /// The requested class name.
        name: String,
    },

    /// The class is still pending registration or has been destroyed.
    ClassNotRegistered {
        /// The class name.
        name: String,
    },

    /// Destroy was refused because instances of the class are still alive.
    ClassHasLiveInstances {
        /// The class name.
        name: String,
        /// Number of live instances.
        count: usize,
    },

    /// Destroy was refused because other classes inherit from this one.
    ClassHasSubclasses {
        /// The class name.
        name: String,
    },

    /// A selector name is empty or contains whitespace.
    InvalidSelector,

    /// A method signature or encoding string is malformed.
    InvalidEncoding,

    /// Argument count mismatch for method signature.
    ArgumentCountMismatch {
        /// Expected number of explicit arguments.
        expected: usize,
        /// Actual number of explicit arguments.
        got: usize,
    },

    /// Argument type mismatch for method signature.
    ArgumentTypeMismatch {
        /// Expected type encoding
        expected: char,
        /// Actual type encoding
        got: char,
        /// Explicit argument index
        index: usize,
    },

    /// An instance variable with this name is already declared.
    IvarAlreadyExists {
        /// The ivar name.
        name: String,
    },

    /// No instance variable with this name exists on the object's class.
    IvarNotFound {
        /// The ivar name.
        name: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::TooManyArguments { got } => {
                write!(f, "Too many arguments: at most 2 supported, got {got}")
            }
            Error::MethodNotFound { selector } => {
                write!(f, "Method '{selector}' not found in class or inheritance chain")
            }
            Error::ClassAlreadyExists { name } => {
                write!(f, "Class '{name}' already exists in registry")
            }
            Error::ClassAlreadyFinalized { name } => {
                write!(f, "Class '{name}' is already registered")
            }
            Error::MethodAlreadyExists { selector } => {
                write!(f, "Method '{selector}' already exists on class")
            }
            Error::TypeMismatch { expected, found } => {
                write!(f, "Type mismatch: expected {expected}, found {found}")
            }
            Error::ClassNotFound { name } => write!(f, "Class '{name}' not found"),
            Error::ClassNotRegistered { name } => {
                write!(f, "Class '{name}' is not registered")
            }
            Error::ClassHasLiveInstances { name, count } => {
                write!(f, "Class '{name}' still has {count} live instance(s)")
            }
            Error::ClassHasSubclasses { name } => {
                write!(f, "Class '{name}' still has subclasses")
            }
            Error::InvalidSelector => write!(f, "Invalid selector name"),
            Error::InvalidEncoding => write!(f, "Invalid type encoding"),
            Error::ArgumentCountMismatch { expected, got } => {
                write!(
                    f,
                    "Argument count mismatch: expected {expected}, got {got}"
                )
            }
            Error::ArgumentTypeMismatch {
                expected,
                got,
                index,
            } => {
                write!(
                    f,
                    "Argument type mismatch at index {index}: expected '{expected}', got '{got}'"
                )
            }
            Error::IvarAlreadyExists { name } => {
                write!(f, "Instance variable '{name}' already exists")
            }
            Error::IvarNotFound { name } => {
                write!(f, "Instance variable '{name}' not found")
            }
        }
    }
}

impl std::error::Error for Error {}

/// Result type for `RuntimeKit` operations.
pub type Result<T> = std::result::Result<T, Error>;
