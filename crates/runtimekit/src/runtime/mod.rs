//! `RuntimeKit` runtime module.
//!
//! This module provides the dynamic object runtime:
//!
//! - [`selector`]: Selector interning
//! - [`encoding`]: Type tags and signature encodings
//! - [`value`]: Dynamically typed argument and return values
//! - [`class`]: Class descriptors, method tables and swizzling
//! - [`registry`]: The global class namespace and class lifecycle
//! - [`object`]: Instances, instance variables and live-instance tracking
//! - [`associated`]: Per-instance associated values
//! - [`signature`]: Method signature resolution and introspection
//! - [`message`]: Receivers and argument packs
//! - [`dispatch`]: Typed dynamic method calls
//!
//! # Example
//!
//! ```rust
//! use runtimekit::runtime::encoding::TypeTag;
//! use runtimekit::runtime::signature::MethodKind;
//! use runtimekit::runtime::{registry, Implementation, MethodCallRequest, Object};
//! use runtimekit::Selector;
//! use std::str::FromStr;
//!
//! let greeter = registry::create_class("ModGreeter").unwrap();
//! greeter
//!     .add_method(
//!         Selector::from_str("greet:").unwrap(),
//!         MethodKind::Instance,
//!         TypeTag::Object,
//!         &[TypeTag::Object, TypeTag::Selector, TypeTag::Object],
//!         Implementation::new1(|_, _, name| {
//!             format!("Hello, {}!", name.as_str().unwrap_or_default())
//!         }),
//!     )
//!     .unwrap();
//!
//! let object = Object::new(&greeter).unwrap();
//! let greet = MethodCallRequest::<String>::new("greet:").unwrap();
//! let result = object.perform(&greet, &["Ada".into()]).unwrap().unwrap();
//! assert_eq!(result.take_retained().unwrap(), "Hello, Ada!");
//! ```

pub mod associated;
pub mod class;
pub mod dispatch;
pub mod encoding;
pub mod message;
pub mod object;
pub mod registry;
pub mod selector;
pub mod signature;
pub mod value;

pub use associated::AssociatedObjectKey;
pub use class::{Class, ClassOrigin, ClassState, Implementation, Ivar, Method};
pub use dispatch::{MethodCallRequest, MethodCallResult, perform, perform_optional, perform_selector};
pub use encoding::TypeTag;
pub use message::{MessageArgs, Receiver};
pub use object::Object;
pub use registry::{
    ClassBuilder, all_classes, allocate_class, class_from_name, class_named, create_class,
    destroy_class, root_class,
};
pub use selector::Selector;
pub use signature::{MethodKind, MethodSignature};
pub use value::{FromValue, Value};

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Acquires a read lock, recovering the guard if a panicking method body
/// poisoned it.
pub(crate) fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

/// Acquires a write lock, recovering the guard if a panicking method body
/// poisoned it.
pub(crate) fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
