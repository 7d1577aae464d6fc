//! Instances and their lifecycle.
//!
//! An [`Object`] is a reference-counted handle to an instance of a registered
//! class. Each instance carries:
//! - Its class
//! - One slot per instance variable in the class layout, zero-initialised
//! - Associated-value storage, created on first use (see [`associated`])
//!
//! Classes count their live instances so that a class cannot be destroyed
//! out from under them; the count drops when the last handle to an instance
//! is released.
//!
//! [`associated`]: crate::runtime::associated

use crate::error::{Error, Result};
use crate::runtime::associated::AssociatedStorage;
use crate::runtime::signature::MethodKind;
use crate::runtime::{Class, Selector, TypeTag, Value, read_lock, write_lock};
use runtimekit_log::trace;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock, RwLock};

pub(crate) struct ObjectInner {
    class: Class,
    /// Slots in class layout order
    ivars: RwLock<Box<[Value]>>,
    associated: OnceLock<AssociatedStorage>,
}

impl Drop for ObjectInner {
    fn drop(&mut self) {
        trace!("deallocating instance of {}", self.class.name());
        self.class.instance_destroyed();
    }
}

/// An instance of a registered class.
///
/// Cloning retains the instance and dropping releases it; clones compare
/// equal.
///
/// # Example
///
/// ```rust
/// use runtimekit::runtime::registry;
/// use runtimekit::Object;
///
/// let class = registry::create_class("DocInstance").unwrap();
/// let object = Object::new(&class).unwrap();
/// let other = object.clone();
///
/// assert_eq!(object, other);
/// assert_eq!(object.retain_count(), 2);
/// assert_eq!(class.live_instances(), 1);
/// ```
#[derive(Clone)]
pub struct Object {
    inner: Arc<ObjectInner>,
}

impl Object {
    /// Creates an instance with every instance variable zeroed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClassNotRegistered`] if `class` is pending or
    /// destroyed.
    pub fn new(class: &Class) -> Result<Self> {
        if !class.is_registered() {
            return Err(class.not_registered());
        }

        let ivars: Box<[Value]> = class
            .ivars()
            .iter()
            .map(|ivar| Value::zero(ivar.type_tag()))
            .collect();

        class.instance_created();
        trace!("allocated instance of {}", class.name());

        Ok(Object {
            inner: Arc::new(ObjectInner {
                class: class.clone(),
                ivars: RwLock::new(ivars),
                associated: OnceLock::new(),
            }),
        })
    }

    /// The instance's class.
    #[must_use]
    pub fn class(&self) -> Class {
        self.inner.class.clone()
    }

    /// Number of live handles to this instance.
    #[must_use]
    pub fn retain_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Stable address of the instance, used for identity hashing and
    /// descriptions.
    #[must_use]
    pub fn address(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }

    /// Returns `true` if both handles refer to the same instance.
    #[must_use]
    pub fn ptr_eq(&self, other: &Object) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Returns `true` if the instance's class is `class` or a subclass of it.
    #[must_use]
    pub fn is_kind_of(&self, class: &Class) -> bool {
        self.inner.class.is_subclass_of(class)
    }

    /// Returns `true` if the instance's class is exactly `class`.
    #[must_use]
    pub fn is_member_of(&self, class: &Class) -> bool {
        self.inner.class == *class
    }

    /// Returns `true` if the instance responds to `selector`.
    #[must_use]
    pub fn responds_to(&self, selector: Selector) -> bool {
        self.inner
            .class
            .lookup_method(selector, MethodKind::Instance)
            .is_some()
    }

    fn ivar_slot(&self, name: &str) -> Result<(usize, TypeTag)> {
        self.inner
            .class
            .ivars()
            .iter()
            .enumerate()
            .find(|(_, ivar)| ivar.name() == name)
            .map(|(index, ivar)| (index, ivar.type_tag()))
            .ok_or_else(|| Error::IvarNotFound {
                name: name.to_string(),
            })
    }

    /// Reads an instance variable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IvarNotFound`] if the class layout has no such
    /// variable.
    pub fn ivar(&self, name: &str) -> Result<Value> {
        let (index, _) = self.ivar_slot(name)?;
        Ok(read_lock(&self.inner.ivars)[index].clone())
    }

    /// Writes an instance variable, returning the previous value.
    ///
    /// # Errors
    ///
    /// - [`Error::IvarNotFound`] if the class layout has no such variable
    /// - [`Error::TypeMismatch`] if `value` does not fit the declared type
    pub fn set_ivar(&self, name: &str, value: impl Into<Value>) -> Result<Value> {
        let value = value.into();
        let (index, type_tag) = self.ivar_slot(name)?;
        if !value.matches(type_tag) {
            return Err(Error::TypeMismatch {
                expected: type_tag.to_string(),
                found: value.type_name().to_string(),
            });
        }

        let previous = std::mem::replace(&mut write_lock(&self.inner.ivars)[index], value);
        Ok(previous)
    }

    pub(crate) fn associated_storage(&self) -> Option<&AssociatedStorage> {
        self.inner.associated.get()
    }

    pub(crate) fn associated_storage_or_init(&self) -> &AssociatedStorage {
        self.inner.associated.get_or_init(AssociatedStorage::default)
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Object {}

impl Hash for Object {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.address());
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("class", &self.inner.class.name())
            .field("address", &format!("{:#x}", self.address()))
            .field("retain_count", &self.retain_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::registry;
    use std::str::FromStr;

    #[test]
    fn test_object_creation() {
        let class = registry::create_class("ObjCreation").unwrap();
        let object = Object::new(&class).unwrap();

        assert_eq!(object.class(), class);
        assert_eq!(object.retain_count(), 1);
        assert!(object.is_kind_of(&registry::root_class()));
        assert!(object.is_member_of(&class));
        assert!(!object.is_member_of(&registry::root_class()));
    }

    #[test]
    fn test_pending_class_cannot_instantiate() {
        let builder = registry::allocate_class("ObjPending", None).unwrap();
        assert_eq!(
            Object::new(builder.class()),
            Err(Error::ClassNotRegistered {
                name: "ObjPending".to_string()
            })
        );
    }

    #[test]
    fn test_clone_and_drop_track_instances() {
        let class = registry::create_class("ObjTracking").unwrap();
        let first = Object::new(&class).unwrap();
        let second = Object::new(&class).unwrap();
        let alias = first.clone();

        assert_eq!(class.live_instances(), 2);
        assert_eq!(first.retain_count(), 2);
        assert_eq!(first, alias);
        assert_ne!(first, second);

        drop(alias);
        assert_eq!(first.retain_count(), 1);
        drop(first);
        assert_eq!(class.live_instances(), 1);
        drop(second);
        assert_eq!(class.live_instances(), 0);
    }

    #[test]
    fn test_ivars() {
        let mut builder = registry::allocate_class("ObjIvars", Some(&registry::root_class())).unwrap();
        builder
            .add_ivar("count", TypeTag::LongLong)
            .unwrap()
            .add_ivar("label", TypeTag::Object)
            .unwrap();
        let class = builder.register().unwrap();
        let object = Object::new(&class).unwrap();

        assert_eq!(object.ivar("count").unwrap(), Value::Int(0));
        assert_eq!(object.ivar("label").unwrap(), Value::Nil);

        assert_eq!(object.set_ivar("count", 5_i64).unwrap(), Value::Int(0));
        object.set_ivar("label", "five").unwrap();
        assert_eq!(object.ivar("count").unwrap(), Value::Int(5));
        assert_eq!(object.ivar("label").unwrap(), Value::from("five"));

        assert!(matches!(
            object.set_ivar("count", "five"),
            Err(Error::TypeMismatch { .. })
        ));
        assert_eq!(
            object.ivar("missing"),
            Err(Error::IvarNotFound {
                name: "missing".to_string()
            })
        );
    }

    #[test]
    fn test_responds_to_inherited() {
        let class = registry::create_class("ObjResponds").unwrap();
        let object = Object::new(&class).unwrap();

        assert!(object.responds_to(Selector::from_str("description").unwrap()));
        assert!(!object.responds_to(Selector::from_str("fly").unwrap()));
    }

    #[test]
    fn test_object_debug() {
        let class = registry::create_class("ObjDebug").unwrap();
        let object = Object::new(&class).unwrap();
        assert!(format!("{object:?}").contains("ObjDebug"));
    }
}
