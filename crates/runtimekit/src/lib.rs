//! `RuntimeKit`: a dynamic object runtime for Rust
//!
//! `RuntimeKit` lets a program create classes at run time, attach methods
//! with explicit signatures, swap implementations, attach keyed values to
//! individual instances and call methods by name with typed results:
//!
//! - **Dynamic Classes** registered in a global namespace, with instance
//!   variables and a fixed layout once registered
//! - **Dynamic Dispatch** by interned selector with a per-class lookup cache
//! - **Method Replacement** visible to existing instances immediately
//! - **Associated Values** stored per instance and freed with it
//! - **Runtime Reflection** over classes, methods and signatures
//!
//! Logging goes through `runtimekit-log`. The level is read from the
//! `RUNTIMEKIT_LOG` environment variable when the class registry first
//! initialises and can be changed later with [`runtimekit_log::set_level`].
//!
//! # Example
//!
//! ```rust
//! use runtimekit::runtime::signature::{self, MethodKind};
//! use runtimekit::{Class, MethodCallRequest, Selector};
//! use std::str::FromStr;
//!
//! let root: Class = runtimekit::runtime::root_class();
//! let class_name = MethodCallRequest::<String>::new("className").unwrap();
//!
//! let result = root.perform(&class_name, &[]).unwrap().unwrap();
//! assert_eq!(result.take_retained().unwrap(), "Object");
//!
//! let description = Selector::from_str("description").unwrap();
//! assert!(signature::responds_to(&root, description, MethodKind::Instance));
//! ```

pub mod error;
pub mod runtime;

// Re-export commonly used types
pub use error::{Error, Result};
pub use runtime::{
    AssociatedObjectKey, Class, FromValue, Implementation, MethodCallRequest, MethodCallResult,
    Object, Selector, Value,
};
