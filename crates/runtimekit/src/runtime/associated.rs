//! Associated values: typed, named values attached to individual instances.
//!
//! Any instance can carry extra values outside its class layout. Values are
//! addressed by an [`AssociatedObjectKey<T>`], whose identity is its name;
//! two keys with the same name address the same slot. Storage is created on
//! the first association and is dropped together with the instance.
//!
//! Reference-typed values ([`Object`], [`Class`](crate::runtime::Class))
//! share ownership with the instance and are released on overwrite, removal
//! or instance destruction. Value types are cloned in and out.
//!
//! Reading a slot with a key of a different `T` than the one it was stored
//! with fails with [`Error::TypeMismatch`] and leaves the slot intact.
//!
//! # Example
//!
//! ```rust
//! use runtimekit::runtime::registry;
//! use runtimekit::{AssociatedObjectKey, Object};
//!
//! static NICKNAME: AssociatedObjectKey<String> = AssociatedObjectKey::new("nickname");
//!
//! let class = registry::create_class("DocAssociated").unwrap();
//! let object = Object::new(&class).unwrap();
//!
//! object.set_associated(&NICKNAME, "Bob".to_string()).unwrap();
//! assert_eq!(object.associated(&NICKNAME).unwrap().as_deref(), Some("Bob"));
//! ```

use crate::error::{Error, Result};
use crate::runtime::{Object, read_lock, write_lock};
use fxhash::FxHashMap;
use std::any::{Any, TypeId, type_name};
use std::borrow::Cow;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, RwLock};

/// A typed, named handle for one associated-value slot.
pub struct AssociatedObjectKey<T> {
    name: Cow<'static, str>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> AssociatedObjectKey<T> {
    /// Creates a key with a static name; usable in `static` items.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        AssociatedObjectKey {
            name: Cow::Borrowed(name),
            _marker: PhantomData,
        }
    }

    /// Creates a key with a name built at run time.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        AssociatedObjectKey {
            name: Cow::Owned(name.into()),
            _marker: PhantomData,
        }
    }

    /// The slot name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T> Clone for AssociatedObjectKey<T> {
    fn clone(&self) -> Self {
        AssociatedObjectKey {
            name: self.name.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for AssociatedObjectKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssociatedObjectKey")
            .field("name", &self.name)
            .field("type", &type_name::<T>())
            .finish()
    }
}

struct Entry {
    type_id: TypeId,
    type_name: &'static str,
    value: Arc<dyn Any + Send + Sync>,
}

impl Entry {
    fn new<T: Any + Send + Sync>(value: T) -> Self {
        Entry {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            value: Arc::new(value),
        }
    }

    fn check<T: Any>(&self) -> Result<()> {
        if self.type_id == TypeId::of::<T>() {
            Ok(())
        } else {
            Err(Error::TypeMismatch {
                expected: type_name::<T>().to_string(),
                found: self.type_name.to_string(),
            })
        }
    }
}

/// Per-instance slot table.
#[derive(Default)]
pub(crate) struct AssociatedStorage {
    entries: RwLock<FxHashMap<Box<str>, Entry>>,
}

impl Object {
    /// Stores `value` under `key`, releasing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if the slot currently holds a value of
    /// a different type; the slot is left unchanged.
    pub fn set_associated<T: Any + Send + Sync>(&self, key: &AssociatedObjectKey<T>, value: T) -> Result<()> {
        let storage = self.associated_storage_or_init();
        let previous = {
            let mut entries = write_lock(&storage.entries);
            if let Some(existing) = entries.get(key.name()) {
                existing.check::<T>()?;
            }
            entries.insert(Box::from(key.name()), Entry::new(value))
        };
        // Dropped after the lock is released: an old instance value may re-enter
        drop(previous);
        Ok(())
    }

    /// Returns a clone of the value stored under `key`.
    ///
    /// For reference types the clone is a new strong handle; the instance
    /// keeps its own.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if the slot holds a value of a
    /// different type.
    pub fn associated<T: Any + Send + Sync + Clone>(&self, key: &AssociatedObjectKey<T>) -> Result<Option<T>> {
        self.with_associated(key, T::clone)
    }

    /// Runs `f` on the value stored under `key` without cloning it.
    ///
    /// The storage lock is released before `f` runs, so `f` may associate
    /// or remove values on the same instance.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if the slot holds a value of a
    /// different type.
    pub fn with_associated<T, R, F>(&self, key: &AssociatedObjectKey<T>, f: F) -> Result<Option<R>>
    where
        T: Any + Send + Sync,
        F: FnOnce(&T) -> R,
    {
        let Some(storage) = self.associated_storage() else {
            return Ok(None);
        };
        let value = {
            let entries = read_lock(&storage.entries);
            let Some(entry) = entries.get(key.name()) else {
                return Ok(None);
            };
            entry.check::<T>()?;
            Arc::clone(&entry.value)
        };
        Ok(value.downcast_ref::<T>().map(f))
    }

    /// Removes and returns the value stored under `key`.
    ///
    /// The value is moved out, or cloned if a concurrent
    /// [`with_associated`](Object::with_associated) still borrows it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if the slot holds a value of a
    /// different type; the slot is left unchanged.
    pub fn remove_associated<T: Any + Send + Sync + Clone>(
        &self,
        key: &AssociatedObjectKey<T>,
    ) -> Result<Option<T>> {
        let Some(storage) = self.associated_storage() else {
            return Ok(None);
        };
        let entry = {
            let mut entries = write_lock(&storage.entries);
            match entries.get(key.name()) {
                Some(existing) => existing.check::<T>()?,
                None => return Ok(None),
            }
            entries.remove(key.name())
        };
        Ok(entry
            .and_then(|entry| entry.value.downcast::<T>().ok())
            .map(Arc::unwrap_or_clone))
    }

    /// Returns `true` if a value of any type is stored under `key`'s name.
    #[must_use]
    pub fn has_associated<T>(&self, key: &AssociatedObjectKey<T>) -> bool {
        self.associated_storage()
            .is_some_and(|storage| read_lock(&storage.entries).contains_key(key.name()))
    }

    /// Number of occupied slots.
    #[must_use]
    pub fn associated_count(&self) -> usize {
        self.associated_storage()
            .map_or(0, |storage| read_lock(&storage.entries).len())
    }

    /// Releases every associated value.
    pub fn clear_associated(&self) {
        if let Some(storage) = self.associated_storage() {
            let drained: Vec<Entry> = write_lock(&storage.entries)
                .drain()
                .map(|(_, entry)| entry)
                .collect();
            drop(drained);
        }
    }
}
