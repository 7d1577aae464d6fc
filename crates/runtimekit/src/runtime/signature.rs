//! Method signatures and signature resolution.
//!
//! [`resolve`] answers "what does calling this name on this class look like":
//! the return type, the argument types and whether it is a class or instance
//! method. It always consults the live method tables, so a method added after
//! a failed resolution is found by the next call.
//!
//! The introspection helpers at the bottom enumerate the methods a class
//! defines directly.

use crate::error::{Error, Result};
use crate::runtime::encoding::{self, TypeTag};
use crate::runtime::{Class, Selector};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Whether a method is looked up on the class itself or on its instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodKind {
    /// Class-level method, invoked with a class receiver.
    Class,
    /// Instance-level method, invoked with an instance receiver.
    Instance,
}

impl fmt::Display for MethodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodKind::Class => f.write_str("class"),
            MethodKind::Instance => f.write_str("instance"),
        }
    }
}

/// Calling signature of a method.
///
/// `argument_types` includes the two implicit slots, receiver and selector,
/// so `number_of_arguments` is always `argument_types().len()` and
/// `explicit_arity` is two less.
///
/// # Example
///
/// ```rust
/// use runtimekit::runtime::encoding::TypeTag;
/// use runtimekit::runtime::signature::{MethodKind, MethodSignature};
/// use runtimekit::Selector;
/// use std::str::FromStr;
///
/// let sig = MethodSignature::new(
///     Selector::from_str("greet:").unwrap(),
///     MethodKind::Instance,
///     TypeTag::Object,
///     &[TypeTag::Object, TypeTag::Selector, TypeTag::Object],
/// )
/// .unwrap();
///
/// assert_eq!(sig.number_of_arguments(), 3);
/// assert_eq!(sig.explicit_arity(), 1);
/// assert_eq!(sig.type_encoding(), "@@:@");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    selector: Selector,
    kind: MethodKind,
    return_type: TypeTag,
    argument_types: Arc<[TypeTag]>,
}

impl MethodSignature {
    /// Creates a signature after validating the argument list.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidEncoding`] if `argument_types` does not start with
    ///   a receiver and a selector slot, or contains a void argument
    /// - [`Error::ArgumentCountMismatch`] if the number of explicit argument
    ///   types differs from the number of colons in the selector
    pub fn new(
        selector: Selector,
        kind: MethodKind,
        return_type: TypeTag,
        argument_types: &[TypeTag],
    ) -> Result<Self> {
        encoding::validate_argument_types(argument_types)?;

        // `greet:` takes one argument, `description` none
        let explicit = argument_types.len() - 2;
        if explicit != selector.colon_count() {
            return Err(Error::ArgumentCountMismatch {
                expected: selector.colon_count(),
                got: explicit,
            });
        }

        Ok(MethodSignature {
            selector,
            kind,
            return_type,
            argument_types: Arc::from(argument_types),
        })
    }

    /// Creates a signature from an encoding string such as `"@@:@"`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEncoding`] if the encoding does not parse.
    pub fn from_encoding(
        selector: Selector,
        kind: MethodKind,
        encoding: &str,
    ) -> Result<Self> {
        let (return_type, argument_types) = encoding::parse_signature(encoding)?;
        Self::new(selector, kind, return_type, &argument_types)
    }

    /// The method name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.selector.name()
    }

    /// The interned selector.
    #[must_use]
    pub fn selector(&self) -> Selector {
        self.selector
    }

    /// Class or instance method.
    #[must_use]
    pub fn kind(&self) -> MethodKind {
        self.kind
    }

    /// The declared return type.
    #[must_use]
    pub fn return_type(&self) -> TypeTag {
        self.return_type
    }

    /// All argument types, including receiver and selector.
    #[must_use]
    pub fn argument_types(&self) -> &[TypeTag] {
        &self.argument_types
    }

    /// Equal to `argument_types().len()`.
    #[must_use]
    pub fn number_of_arguments(&self) -> usize {
        self.argument_types.len()
    }

    /// Number of arguments a caller supplies.
    #[must_use]
    pub fn explicit_arity(&self) -> usize {
        self.argument_types.len() - 2
    }

    /// Types of the arguments a caller supplies.
    #[must_use]
    pub fn explicit_argument_types(&self) -> &[TypeTag] {
        &self.argument_types[2..]
    }

    /// Returns `true` if the method returns nothing.
    #[must_use]
    pub fn is_void(&self) -> bool {
        self.return_type.is_void()
    }

    /// The signature as an encoding string.
    #[must_use]
    pub fn type_encoding(&self) -> String {
        encoding::encode_signature(self.return_type, &self.argument_types)
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sigil = match self.kind {
            MethodKind::Class => '+',
            MethodKind::Instance => '-',
        };
        write!(f, "{sigil}[{}] {}", self.selector, self.type_encoding())
    }
}

/// Resolves `name` on `class` (or an ancestor) as a method of `kind`.
///
/// # Example
///
/// ```rust
/// use runtimekit::runtime::signature::{self, MethodKind};
/// use runtimekit::runtime::registry;
///
/// let root = registry::root_class();
/// let sig = signature::resolve(&root, "description", MethodKind::Instance).unwrap();
/// assert_eq!(sig.explicit_arity(), 0);
///
/// assert!(signature::resolve(&root, "noSuchMethod", MethodKind::Instance).is_err());
/// ```
///
/// # Errors
///
/// Returns [`Error::InvalidSelector`] if `name` is not a valid selector, or
/// [`Error::MethodNotFound`] if no method of that kind exists on the class
/// or any ancestor.
pub fn resolve(class: &Class, name: &str, kind: MethodKind) -> Result<MethodSignature> {
    let selector = Selector::from_str(name)?;
    resolve_selector(class, selector, kind)
}

/// Resolves an already-interned selector.
///
/// # Errors
///
/// Returns [`Error::MethodNotFound`] if no method of that kind exists on the
/// class or any ancestor.
pub fn resolve_selector(
    class: &Class,
    selector: Selector,
    kind: MethodKind,
) -> Result<MethodSignature> {
    class
        .lookup_method(selector, kind)
        .map(|method| method.signature().clone())
        .ok_or_else(|| Error::MethodNotFound {
            selector: selector.name().to_string(),
        })
}

/// Signatures of the instance methods defined directly on `class`, sorted
/// by name.
#[must_use]
pub fn instance_methods(class: &Class) -> Vec<MethodSignature> {
    own_signatures(class, MethodKind::Instance)
}

/// Signatures of the class methods defined directly on `class`, sorted by
/// name.
#[must_use]
pub fn class_methods(class: &Class) -> Vec<MethodSignature> {
    own_signatures(class, MethodKind::Class)
}

fn own_signatures(class: &Class, kind: MethodKind) -> Vec<MethodSignature> {
    let mut signatures: Vec<_> = class
        .methods(kind)
        .iter()
        .map(|method| method.signature().clone())
        .collect();
    signatures.sort_by(|a, b| a.name().cmp(b.name()));
    signatures
}

/// Returns `true` if `class` or an ancestor implements `selector` as `kind`.
#[must_use]
pub fn responds_to(class: &Class, selector: Selector, kind: MethodKind) -> bool {
    class.lookup_method(selector, kind).is_some()
}

/// Finds the class in the hierarchy that actually defines `selector`.
#[must_use]
pub fn method_provider(class: &Class, selector: Selector, kind: MethodKind) -> Option<Class> {
    let mut current = Some(class.clone());
    while let Some(candidate) = current {
        if candidate.defines_method(selector, kind) {
            return Some(candidate);
        }
        current = candidate.super_class();
    }
    None
}
