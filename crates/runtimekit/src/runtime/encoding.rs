//! Type tags and method type encodings.
//!
//! Method signatures are described with a small set of [`TypeTag`]s modelled
//! on Objective-C's `@encode()` characters. A signature encodes as a string
//! whose first character is the return type followed by one character per
//! argument:
//!
//! - `v` - void
//! - `@` - object (id)
//! - `#` - class
//! - `:` - selector (SEL)
//! - `B` - bool
//! - `i` - int (i32)
//! - `l` - long (64-bit)
//! - `q` - long long (i64)
//! - `f` - float (f32)
//! - `d` - double (f64)
//! - `*` - C string
//! - `^` - pointer
//! - `?` - unknown
//!
//! The argument list always starts with the receiver (`@` for instance
//! methods, `@` or `#` for class methods) and the selector (`:`), so
//! `"@@:@"` is an object-returning method taking one object argument.

// Different tags share a size; the arms are kept apart for readability.
#![allow(clippy::match_same_arms)]

use crate::error::{Error, Result};
use std::fmt;

/// Type of a method argument or return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    /// No value.
    Void,
    /// Object reference.
    Object,
    /// Class reference.
    Class,
    /// Method name.
    Selector,
    /// Boolean.
    Bool,
    /// 32-bit integer.
    Int,
    /// 64-bit long.
    Long,
    /// 64-bit integer.
    LongLong,
    /// 32-bit float.
    Float,
    /// 64-bit float.
    Double,
    /// String.
    CString,
    /// Untyped pointer.
    Pointer,
    /// Anything; matches every non-void value.
    Unknown,
}

impl TypeTag {
    /// Returns the encoding character for this tag.
    ///
    /// ```
    /// use runtimekit::runtime::encoding::TypeTag;
    ///
    /// assert_eq!(TypeTag::Object.encoding(), '@');
    /// assert_eq!(TypeTag::LongLong.encoding(), 'q');
    /// ```
    #[must_use]
    pub const fn encoding(self) -> char {
        match self {
            TypeTag::Void => 'v',
            TypeTag::Object => '@',
            TypeTag::Class => '#',
            TypeTag::Selector => ':',
            TypeTag::Bool => 'B',
            TypeTag::Int => 'i',
            TypeTag::Long => 'l',
            TypeTag::LongLong => 'q',
            TypeTag::Float => 'f',
            TypeTag::Double => 'd',
            TypeTag::CString => '*',
            TypeTag::Pointer => '^',
            TypeTag::Unknown => '?',
        }
    }

    /// Parses a single encoding character.
    #[must_use]
    pub const fn from_encoding(ch: char) -> Option<Self> {
        match ch {
            'v' => Some(TypeTag::Void),
            '@' => Some(TypeTag::Object),
            '#' => Some(TypeTag::Class),
            ':' => Some(TypeTag::Selector),
            'B' => Some(TypeTag::Bool),
            'i' => Some(TypeTag::Int),
            'l' => Some(TypeTag::Long),
            'q' => Some(TypeTag::LongLong),
            'f' => Some(TypeTag::Float),
            'd' => Some(TypeTag::Double),
            '*' => Some(TypeTag::CString),
            '^' => Some(TypeTag::Pointer),
            '?' => Some(TypeTag::Unknown),
            _ => None,
        }
    }

    /// Size in bytes of a value of this type inside an instance layout.
    ///
    /// ```
    /// use runtimekit::runtime::encoding::TypeTag;
    ///
    /// assert_eq!(TypeTag::Int.size(), 4);
    /// assert_eq!(TypeTag::LongLong.size(), 8);
    /// assert_eq!(TypeTag::Void.size(), 0);
    /// ```
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            TypeTag::Void => 0,
            TypeTag::Bool => 1,
            TypeTag::Int => 4,
            TypeTag::Float => 4,
            TypeTag::Long => 8,
            TypeTag::LongLong => 8,
            TypeTag::Double => 8,
            TypeTag::Object => 8,
            TypeTag::Class => 8,
            TypeTag::Selector => 8,
            TypeTag::CString => 8,
            TypeTag::Pointer => 8,
            TypeTag::Unknown => 8,
        }
    }

    /// Returns `true` for [`TypeTag::Void`].
    #[must_use]
    pub const fn is_void(self) -> bool {
        matches!(self, TypeTag::Void)
    }

    /// Returns `true` for integer tags.
    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(self, TypeTag::Int | TypeTag::Long | TypeTag::LongLong)
    }

    /// Returns `true` for floating point tags.
    #[must_use]
    pub const fn is_floating(self) -> bool {
        matches!(self, TypeTag::Float | TypeTag::Double)
    }

    /// Returns `true` for tags whose values may be `nil`.
    #[must_use]
    pub const fn is_nullable(self) -> bool {
        matches!(
            self,
            TypeTag::Object
                | TypeTag::Class
                | TypeTag::CString
                | TypeTag::Pointer
                | TypeTag::Unknown
        )
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encoding())
    }
}

/// Checks that an argument list follows the receiver/selector convention.
///
/// The first slot must be `@` or `#`, the second `:`, and no argument may be
/// void.
///
/// # Errors
///
/// Returns [`Error::InvalidEncoding`] if the list is too short, the implicit
/// slots are wrong, or an argument is void.
pub fn validate_argument_types(argument_types: &[TypeTag]) -> Result<()> {
    let [receiver, selector, explicit @ ..] = argument_types else {
        return Err(Error::InvalidEncoding);
    };

    if !matches!(receiver, TypeTag::Object | TypeTag::Class) {
        return Err(Error::InvalidEncoding);
    }
    if *selector != TypeTag::Selector {
        return Err(Error::InvalidEncoding);
    }
    if explicit.iter().any(|tag| tag.is_void()) {
        return Err(Error::InvalidEncoding);
    }

    Ok(())
}

/// Builds the encoding string for a signature.
///
/// ```
/// use runtimekit::runtime::encoding::{encode_signature, TypeTag};
///
/// let encoding = encode_signature(
///     TypeTag::Object,
///     &[TypeTag::Object, TypeTag::Selector, TypeTag::Object],
/// );
/// assert_eq!(encoding, "@@:@");
/// ```
#[must_use]
pub fn encode_signature(return_type: TypeTag, argument_types: &[TypeTag]) -> String {
    std::iter::once(return_type)
        .chain(argument_types.iter().copied())
        .map(TypeTag::encoding)
        .collect()
}

/// Parses a method signature encoding into return type and argument types.
///
/// ```
/// use runtimekit::runtime::encoding::{parse_signature, TypeTag};
///
/// let (ret, args) = parse_signature("q@:qd").unwrap();
/// assert_eq!(ret, TypeTag::LongLong);
/// assert_eq!(
///     args,
///     vec![TypeTag::Object, TypeTag::Selector, TypeTag::LongLong, TypeTag::Double]
/// );
/// ```
///
/// # Errors
///
/// Returns [`Error::InvalidEncoding`] if the string is empty, contains an
/// unknown character, or the argument list fails
/// [`validate_argument_types`].
pub fn parse_signature(encoding: &str) -> Result<(TypeTag, Vec<TypeTag>)> {
    let mut tags = encoding.chars().map(TypeTag::from_encoding);

    let return_type = tags.next().flatten().ok_or(Error::InvalidEncoding)?;
    let argument_types = tags
        .collect::<Option<Vec<_>>>()
        .ok_or(Error::InvalidEncoding)?;

    validate_argument_types(&argument_types)?;

    Ok((return_type, argument_types))
}
