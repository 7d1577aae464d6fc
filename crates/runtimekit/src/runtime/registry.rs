//! The global class namespace.
//!
//! Every class lives in one process-wide, name-keyed table. The table is
//! bootstrapped with the core root class `Object`; classes created through
//! this module are dynamic and may later be destroyed, core classes may not.
//!
//! Allocation reserves a name and hands out a [`ClassBuilder`] for a pending
//! class. Registration makes the class visible to [`class_from_name`] and
//! fixes its instance layout.
//!
//! # Thread Safety
//!
//! The namespace is behind an `RwLock`, so concurrent use is memory-safe.
//! Ordering of concurrent creation, destruction and replacement on the same
//! classes is the caller's responsibility.

use crate::error::{Error, Result};
use crate::runtime::class::{ClassOrigin, ClassState};
use crate::runtime::encoding::TypeTag;
use crate::runtime::signature::MethodKind;
use crate::runtime::{Class, Implementation, Object, Receiver, Selector, Value, read_lock, write_lock};
use fxhash::FxHashMap;
use runtimekit_log::{debug, error, warn};
use std::str::FromStr;
use std::sync::{Arc, OnceLock, RwLock};

/// Name of the core root class.
pub const ROOT_CLASS_NAME: &str = "Object";

struct ClassRegistry {
    /// Pending and registered classes by name
    classes: RwLock<FxHashMap<Arc<str>, Class>>,
    root: Class,
}

static REGISTRY: OnceLock<ClassRegistry> = OnceLock::new();

fn registry() -> &'static ClassRegistry {
    REGISTRY.get_or_init(|| {
        runtimekit_log::init_from_env();
        let root = bootstrap_root();
        let mut classes = FxHashMap::default();
        classes.insert(Arc::from(ROOT_CLASS_NAME), root.clone());
        ClassRegistry {
            classes: RwLock::new(classes),
            root,
        }
    })
}

// ============================================================================
// Core root class
// ============================================================================

fn bootstrap_root() -> Class {
    let root = Class::new_pending(ROOT_CLASS_NAME, None, ClassOrigin::Core);

    install_core_method(
        &root,
        "description",
        MethodKind::Instance,
        "*@:",
        Implementation::new0(|receiver, _| describe(receiver)),
    );
    install_core_method(
        &root,
        "isEqual:",
        MethodKind::Instance,
        "B@:@",
        Implementation::new1(|receiver, _, other| receiver.to_value() == *other),
    );
    install_core_method(
        &root,
        "hash",
        MethodKind::Instance,
        "q@:",
        Implementation::new0(|receiver, _| match receiver {
            Receiver::Instance(object) => Value::Int(object.address() as i64),
            Receiver::Class(class) => Value::Int(Arc::as_ptr(&class.inner) as usize as i64),
        }),
    );
    install_core_method(
        &root,
        "className",
        MethodKind::Class,
        "*#:",
        Implementation::new0(|receiver, _| receiver.class().name().to_string()),
    );
    install_core_method(
        &root,
        "new",
        MethodKind::Class,
        "@#:",
        Implementation::new0(|receiver, _| match Object::new(&receiver.class()) {
            Ok(object) => Value::Object(object),
            Err(err) => {
                debug!("+new on {} returned nil: {err}", receiver.class().name());
                Value::Nil
            }
        }),
    );

    if let Err(err) = root.finalize() {
        error!("failed to register core class {ROOT_CLASS_NAME}: {err}");
    }
    root
}

fn install_core_method(root: &Class, name: &str, kind: MethodKind, encoding: &str, imp: Implementation) {
    let installed = Selector::from_str(name)
        .and_then(|selector| root.add_method_with_encoding(selector, kind, encoding, imp));
    if let Err(err) = installed {
        error!("failed to install {kind} method {name} on {ROOT_CLASS_NAME}: {err}");
    }
}

fn describe(receiver: &Receiver) -> String {
    match receiver {
        Receiver::Instance(object) => {
            format!("<{}: {:#x}>", object.class().name(), object.address())
        }
        Receiver::Class(class) => class.name().to_string(),
    }
}

// ============================================================================
// Class creation
// ============================================================================

/// Builder for a pending class.
///
/// Dropping a builder without calling [`ClassBuilder::register`] releases
/// the reserved name and disposes of the class.
///
/// # Example
///
/// ```rust
/// use runtimekit::runtime::encoding::TypeTag;
/// use runtimekit::runtime::registry;
///
/// let mut builder = registry::allocate_class("DocPoint", None).unwrap();
/// builder.add_ivar("x", TypeTag::Double).unwrap();
/// builder.add_ivar("y", TypeTag::Double).unwrap();
/// let point = builder.register().unwrap();
///
/// assert_eq!(point.instance_size(), 24);
/// assert_eq!(registry::class_from_name("DocPoint"), Some(point));
/// ```
#[derive(Debug)]
pub struct ClassBuilder {
    class: Class,
}

impl ClassBuilder {
    /// The pending class.
    #[must_use]
    pub fn class(&self) -> &Class {
        &self.class
    }

    /// Declares an instance variable.
    ///
    /// # Errors
    ///
    /// See [`Class::add_ivar`].
    pub fn add_ivar(&mut self, name: &str, type_tag: TypeTag) -> Result<&mut Self> {
        self.class.add_ivar(name, type_tag)?;
        Ok(self)
    }

    /// Adds a method.
    ///
    /// # Errors
    ///
    /// See [`Class::add_method`].
    pub fn add_method(
        &mut self,
        selector: Selector,
        kind: MethodKind,
        return_type: TypeTag,
        argument_types: &[TypeTag],
        imp: Implementation,
    ) -> Result<&mut Self> {
        self.class
            .add_method(selector, kind, return_type, argument_types, imp)?;
        Ok(self)
    }

    /// Registers the class, making it visible by name.
    ///
    /// # Errors
    ///
    /// See [`register_class`].
    pub fn register(self) -> Result<Class> {
        register_class(&self.class)?;
        Ok(self.class.clone())
    }
}

impl Drop for ClassBuilder {
    fn drop(&mut self) {
        if self.class.state() == ClassState::Pending {
            debug!("abandoned pending class {}", self.class.name());
            release_name(&self.class);
            self.class.dispose();
        }
    }
}

/// Reserves `name` and returns a builder for a pending class.
///
/// With `super_class` set to `None` the class starts a new hierarchy and
/// does not inherit the root class's methods.
///
/// # Errors
///
/// - [`Error::ClassAlreadyExists`] if the name is taken by a pending or
///   registered class
/// - [`Error::ClassNotRegistered`] if `super_class` is not registered
pub fn allocate_class(name: &str, super_class: Option<&Class>) -> Result<ClassBuilder> {
    if let Some(parent) = super_class {
        if !parent.is_registered() {
            return Err(parent.not_registered());
        }
    }

    let mut classes = write_lock(&registry().classes);
    if classes.contains_key(name) {
        return Err(Error::ClassAlreadyExists {
            name: name.to_string(),
        });
    }

    let class = Class::new_pending(name, super_class, ClassOrigin::Dynamic);
    classes.insert(Arc::from(name), class.clone());
    debug!("allocated class {name}");

    Ok(ClassBuilder { class })
}

/// Creates and registers a subclass of the root class `Object`.
///
/// # Errors
///
/// Returns [`Error::ClassAlreadyExists`] if the name is taken.
pub fn create_class(name: &str) -> Result<Class> {
    allocate_class(name, Some(&root_class()))?.register()
}

/// Creates and registers a subclass of `super_class`.
///
/// # Errors
///
/// As [`allocate_class`].
pub fn create_subclass(name: &str, super_class: &Class) -> Result<Class> {
    allocate_class(name, Some(super_class))?.register()
}

/// Registers a pending class.
///
/// # Errors
///
/// - [`Error::ClassAlreadyFinalized`] if it is already registered
/// - [`Error::ClassNotRegistered`] if the class was destroyed
pub fn register_class(class: &Class) -> Result<()> {
    class.finalize()
}

// ============================================================================
// Lookup
// ============================================================================

/// Looks up a registered class by name. Pending classes are not visible.
#[must_use]
pub fn class_from_name(name: &str) -> Option<Class> {
    read_lock(&registry().classes)
        .get(name)
        .filter(|class| class.is_registered())
        .cloned()
}

/// Like [`class_from_name`], but a missing class is an error.
///
/// # Errors
///
/// Returns [`Error::ClassNotFound`] if no registered class has `name`.
pub fn class_named(name: &str) -> Result<Class> {
    class_from_name(name).ok_or_else(|| Error::ClassNotFound {
        name: name.to_string(),
    })
}

/// All registered classes, sorted by name.
#[must_use]
pub fn all_classes() -> Vec<Class> {
    let mut classes: Vec<Class> = read_lock(&registry().classes)
        .values()
        .filter(|class| class.is_registered())
        .cloned()
        .collect();
    classes.sort_by(|a, b| a.name().cmp(b.name()));
    classes
}

/// Registered classes whose direct superclass is `class`, sorted by name.
#[must_use]
pub fn subclasses(class: &Class) -> Vec<Class> {
    all_classes()
        .into_iter()
        .filter(|candidate| candidate.super_class().as_ref() == Some(class))
        .collect()
}

/// The core root class `Object`.
#[must_use]
pub fn root_class() -> Class {
    registry().root.clone()
}

// ============================================================================
// Methods
// ============================================================================

/// Attaches `imp` to `class` under `selector`.
///
/// # Errors
///
/// See [`Class::add_method`].
pub fn register_method(
    class: &Class,
    selector: Selector,
    imp: Implementation,
    kind: MethodKind,
    return_type: TypeTag,
    argument_types: &[TypeTag],
) -> Result<()> {
    class.add_method(selector, kind, return_type, argument_types, imp)
}

/// Swaps the implementation of an existing method.
///
/// # Errors
///
/// See [`Class::replace_method`].
pub fn replace_method(class: &Class, selector: Selector, kind: MethodKind, imp: Implementation) -> Result<()> {
    class.replace_method(selector, kind, imp)
}

// ============================================================================
// Destruction
// ============================================================================

#[cfg(feature = "class_backtrace")]
fn report_allocation_site(class: &Class) {
    warn!("cannot destroy {}, allocated at:\n{:?}", class.name(), class.allocated_at());
}

#[cfg(not(feature = "class_backtrace"))]
fn report_allocation_site(_class: &Class) {}

fn release_name(class: &Class) {
    let mut classes = write_lock(&registry().classes);
    if classes.get(class.name()).is_some_and(|entry| entry == class) {
        classes.remove(class.name());
    }
}

/// Destroys a dynamic class.
///
/// Removes it from the namespace, frees its method tables and marks it
/// disposed. Handles to the class stay valid but every further use fails
/// with [`Error::ClassNotRegistered`].
///
/// Destroying a core class is a logged no-op: it returns `Ok(())` and the
/// class stays registered.
///
/// # Errors
///
/// - [`Error::ClassHasLiveInstances`] if instances of the class are alive
/// - [`Error::ClassHasSubclasses`] if a pending or registered class
///   inherits from it
/// - [`Error::ClassNotRegistered`] if it was already destroyed
pub fn destroy_class(class: &Class) -> Result<()> {
    if class.origin() == ClassOrigin::Core {
        warn!("refusing to destroy core class {}", class.name());
        return Ok(());
    }
    if class.state() == ClassState::Disposed {
        return Err(class.not_registered());
    }

    let live = class.live_instances();
    if live > 0 {
        report_allocation_site(class);
        return Err(Error::ClassHasLiveInstances {
            name: class.name().to_string(),
            count: live,
        });
    }

    let has_subclasses = read_lock(&registry().classes)
        .values()
        .any(|candidate| candidate.super_class().as_ref() == Some(class));
    if has_subclasses {
        report_allocation_site(class);
        return Err(Error::ClassHasSubclasses {
            name: class.name().to_string(),
        });
    }

    release_name(class);
    class.dispose();
    debug!("destroyed class {}", class.name());
    Ok(())
}
