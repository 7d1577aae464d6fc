//! `Class` descriptors, method tables and method replacement.
//!
//! This module implements the class side of the runtime:
//! - `Class` metadata (name, superclass, instance variables, layout)
//! - Per-class instance and class method tables
//! - `Method` registration, lookup along the inheritance chain and swizzling
//! - A per-class lookup cache
//!
//! # Lifecycle
//!
//! A class starts out [`ClassState::Pending`]: methods and instance variables
//! may be added but no instance can be created and no message can be sent.
//! Registration ([`registry::register_class`](crate::runtime::registry::register_class))
//! fixes the instance layout and makes the class visible to lookup by name.
//! Destroying a dynamic class moves it to [`ClassState::Disposed`] and frees
//! its method tables.
//!
//! # Caching
//!
//! Lookups are cached per class. Every method table mutation anywhere in the
//! process bumps a global epoch, and cache entries from an older epoch are
//! ignored, so additions and replacements on an ancestor are visible to
//! subclasses on the very next lookup.
//!
//! # Thread Safety
//!
//! Method tables and the cache are behind `RwLock`s and no lock is held while
//! a method implementation runs. Ordering concurrent class mutations against
//! each other is left to the caller.

use crate::error::{Error, Result};
use crate::runtime::encoding::TypeTag;
use crate::runtime::signature::{MethodKind, MethodSignature};
use crate::runtime::{Receiver, Selector, Value, read_lock, write_lock};
use fxhash::FxHashMap;
use runtimekit_log::{debug, trace};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU8, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, RwLock};

/// Size of the object header every instance layout starts with.
pub const OBJECT_HEADER_SIZE: usize = 8;

/// Process-wide method table generation; bumped on every table mutation.
static METHOD_EPOCH: AtomicU64 = AtomicU64::new(0);

pub(crate) fn bump_method_epoch() {
    METHOD_EPOCH.fetch_add(1, Ordering::AcqRel);
}

/// Type-erased method body.
///
/// Receives the receiver, the selector it was invoked under and exactly
/// `arity` explicit arguments.
pub type ImpFn = dyn Fn(&Receiver, Selector, &[Value]) -> Value + Send + Sync;

/// A callable method body together with the number of explicit arguments it
/// expects.
///
/// # Example
///
/// ```rust
/// use runtimekit::runtime::Implementation;
///
/// let greet = Implementation::new1(|_receiver, _cmd, name| {
///     format!("Hello, {}!", name.as_str().unwrap_or("stranger"))
/// });
/// assert_eq!(greet.arity(), 1);
/// ```
#[derive(Clone)]
pub struct Implementation {
    arity: usize,
    body: Arc<ImpFn>,
}

impl Implementation {
    /// Wraps a body taking no explicit arguments.
    pub fn new0<F, R>(f: F) -> Self
    where
        F: Fn(&Receiver, Selector) -> R + Send + Sync + 'static,
        R: Into<Value>,
    {
        Implementation {
            arity: 0,
            body: Arc::new(move |receiver, cmd, _args| f(receiver, cmd).into()),
        }
    }

    /// Wraps a body taking one explicit argument.
    pub fn new1<F, R>(f: F) -> Self
    where
        F: Fn(&Receiver, Selector, &Value) -> R + Send + Sync + 'static,
        R: Into<Value>,
    {
        Implementation {
            arity: 1,
            body: Arc::new(move |receiver, cmd, args| f(receiver, cmd, &args[0]).into()),
        }
    }

    /// Wraps a body taking two explicit arguments.
    pub fn new2<F, R>(f: F) -> Self
    where
        F: Fn(&Receiver, Selector, &Value, &Value) -> R + Send + Sync + 'static,
        R: Into<Value>,
    {
        Implementation {
            arity: 2,
            body: Arc::new(move |receiver, cmd, args| {
                f(receiver, cmd, &args[0], &args[1]).into()
            }),
        }
    }

    /// Wraps a body taking `arity` explicit arguments as a slice.
    ///
    /// Bodies wider than [`MAX_ARGUMENTS`](crate::runtime::message::MAX_ARGUMENTS)
    /// can be registered and introspected but never dispatched.
    pub fn with_arity<F, R>(arity: usize, f: F) -> Self
    where
        F: Fn(&Receiver, Selector, &[Value]) -> R + Send + Sync + 'static,
        R: Into<Value>,
    {
        Implementation {
            arity,
            body: Arc::new(move |receiver, cmd, args| f(receiver, cmd, args).into()),
        }
    }

    /// Number of explicit arguments the body expects.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Returns `true` if both wrap the same body.
    #[must_use]
    pub fn ptr_eq(&self, other: &Implementation) -> bool {
        Arc::ptr_eq(&self.body, &other.body)
    }

    /// Runs the body. `args.len()` must equal `arity()`; the dispatcher
    /// checks this before calling.
    pub(crate) fn invoke(&self, receiver: &Receiver, cmd: Selector, args: &[Value]) -> Value {
        debug_assert_eq!(args.len(), self.arity);
        (self.body)(receiver, cmd, args)
    }
}

impl fmt::Debug for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Implementation")
            .field("arity", &self.arity)
            .field("body", &format!("{:p}", Arc::as_ptr(&self.body).cast::<()>()))
            .finish()
    }
}

/// A method: signature plus implementation.
///
/// Methods are immutable; replacing an implementation installs a new
/// `Method` under the same selector.
#[derive(Clone, Debug)]
pub struct Method {
    signature: MethodSignature,
    imp: Implementation,
}

impl Method {
    /// Pairs a signature with an implementation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ArgumentCountMismatch`] if the implementation's
    /// arity differs from the signature's explicit arity.
    pub fn new(signature: MethodSignature, imp: Implementation) -> Result<Self> {
        if imp.arity() != signature.explicit_arity() {
            return Err(Error::ArgumentCountMismatch {
                expected: signature.explicit_arity(),
                got: imp.arity(),
            });
        }
        Ok(Method { signature, imp })
    }

    /// The method's selector.
    #[must_use]
    pub fn selector(&self) -> Selector {
        self.signature.selector()
    }

    /// Class or instance method.
    #[must_use]
    pub fn kind(&self) -> MethodKind {
        self.signature.kind()
    }

    /// The method's signature.
    #[must_use]
    pub fn signature(&self) -> &MethodSignature {
        &self.signature
    }

    /// The method's implementation.
    #[must_use]
    pub fn implementation(&self) -> &Implementation {
        &self.imp
    }
}

/// An instance variable in a class layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ivar {
    name: Arc<str>,
    type_tag: TypeTag,
    offset: usize,
}

impl Ivar {
    /// The variable's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The variable's type.
    #[must_use]
    pub fn type_tag(&self) -> TypeTag {
        self.type_tag
    }

    /// Byte offset within the instance layout.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }
}

/// Registration state of a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ClassState {
    /// Allocated, not yet visible; layout may still change.
    Pending = 0,
    /// Visible to lookup; layout fixed.
    Registered = 1,
    /// Destroyed; method tables freed.
    Disposed = 2,
}

impl ClassState {
    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => ClassState::Pending,
            1 => ClassState::Registered,
            _ => ClassState::Disposed,
        }
    }
}

/// Who created a class. Only dynamic classes may be destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassOrigin {
    /// Bootstrapped by the runtime itself.
    Core,
    /// Created at run time through the registry.
    Dynamic,
}

#[derive(Debug)]
struct Layout {
    ivars: Arc<[Ivar]>,
    instance_size: usize,
}

type MethodTable = FxHashMap<Selector, Arc<Method>>;

pub(crate) struct ClassInner {
    name: Arc<str>,
    super_class: Option<Class>,
    origin: ClassOrigin,
    state: AtomicU8,
    /// Ivars declared on this class only
    ivars: RwLock<Vec<(Arc<str>, TypeTag)>>,
    /// Full layout, fixed at registration
    layout: OnceLock<Layout>,
    instance_methods: RwLock<MethodTable>,
    class_methods: RwLock<MethodTable>,
    /// (selector, kind) -> (epoch, method)
    cache: RwLock<FxHashMap<(Selector, MethodKind), (u64, Arc<Method>)>>,
    live_instances: AtomicUsize,
    #[cfg(feature = "class_backtrace")]
    allocated_at: backtrace::Backtrace,
}

/// A class descriptor.
///
/// `Class` is a cheap, reference-counted handle; clones refer to the same
/// class and compare equal.
///
/// # Example
///
/// ```rust
/// use runtimekit::runtime::encoding::TypeTag;
/// use runtimekit::runtime::signature::MethodKind;
/// use runtimekit::runtime::{registry, Implementation};
/// use runtimekit::Selector;
/// use std::str::FromStr;
///
/// let class = registry::create_class("DocCounter").unwrap();
/// class
///     .add_method(
///         Selector::from_str("zero").unwrap(),
///         MethodKind::Class,
///         TypeTag::LongLong,
///         &[TypeTag::Class, TypeTag::Selector],
///         Implementation::new0(|_, _| 0_i64),
///     )
///     .unwrap();
///
/// assert!(class.is_subclass_of(&registry::root_class()));
/// ```
#[derive(Clone)]
pub struct Class {
    pub(crate) inner: Arc<ClassInner>,
}

impl Class {
    pub(crate) fn new_pending(name: &str, super_class: Option<&Class>, origin: ClassOrigin) -> Self {
        Class {
            inner: Arc::new(ClassInner {
                name: Arc::from(name),
                super_class: super_class.cloned(),
                origin,
                state: AtomicU8::new(ClassState::Pending as u8),
                ivars: RwLock::new(Vec::new()),
                layout: OnceLock::new(),
                instance_methods: RwLock::new(FxHashMap::default()),
                class_methods: RwLock::new(FxHashMap::default()),
                cache: RwLock::new(FxHashMap::default()),
                live_instances: AtomicUsize::new(0),
                #[cfg(feature = "class_backtrace")]
                allocated_at: backtrace::Backtrace::new(),
            }),
        }
    }

    /// The class name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The superclass, `None` for a root class.
    #[must_use]
    pub fn super_class(&self) -> Option<Class> {
        self.inner.super_class.clone()
    }

    /// Who created the class.
    #[must_use]
    pub fn origin(&self) -> ClassOrigin {
        self.inner.origin
    }

    /// Returns `true` if the class was created through the registry at run
    /// time rather than bootstrapped by the runtime.
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        self.inner.origin == ClassOrigin::Dynamic
    }

    /// Current registration state.
    #[must_use]
    pub fn state(&self) -> ClassState {
        ClassState::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    /// Returns `true` once the class is registered and not destroyed.
    #[must_use]
    pub fn is_registered(&self) -> bool {
        self.state() == ClassState::Registered
    }

    /// Number of instances of exactly this class currently alive.
    #[must_use]
    pub fn live_instances(&self) -> usize {
        self.inner.live_instances.load(Ordering::Acquire)
    }

    /// Where the class was allocated.
    #[cfg(feature = "class_backtrace")]
    #[must_use]
    pub fn allocated_at(&self) -> &backtrace::Backtrace {
        &self.inner.allocated_at
    }

    /// Returns `true` if `self` is `class` or inherits from it.
    #[must_use]
    pub fn is_subclass_of(&self, class: &Class) -> bool {
        let mut current = Some(self.clone());
        while let Some(candidate) = current {
            if candidate == *class {
                return true;
            }
            current = candidate.super_class();
        }
        false
    }

    // ------------------------------------------------------------------
    // Instance variables and layout
    // ------------------------------------------------------------------

    /// Declares an instance variable. Only valid while the class is pending.
    ///
    /// # Errors
    ///
    /// - [`Error::ClassAlreadyFinalized`] once the class is registered
    /// - [`Error::ClassNotRegistered`] if the class was destroyed
    /// - [`Error::InvalidEncoding`] for a void ivar
    /// - [`Error::IvarAlreadyExists`] if this class or an ancestor already
    ///   declares `name`
    pub fn add_ivar(&self, name: &str, type_tag: TypeTag) -> Result<()> {
        match self.state() {
            ClassState::Pending => {}
            ClassState::Registered => {
                return Err(Error::ClassAlreadyFinalized {
                    name: self.name().to_string(),
                });
            }
            ClassState::Disposed => return Err(self.not_registered()),
        }
        if type_tag.is_void() {
            return Err(Error::InvalidEncoding);
        }
        if self.ivar_index(name).is_some() {
            return Err(Error::IvarAlreadyExists {
                name: name.to_string(),
            });
        }

        write_lock(&self.inner.ivars).push((Arc::from(name), type_tag));
        Ok(())
    }

    fn ivar_index(&self, name: &str) -> Option<usize> {
        self.ivars().iter().position(|ivar| ivar.name() == name)
    }

    /// The full instance layout: inherited ivars first, then this class's.
    #[must_use]
    pub fn ivars(&self) -> Arc<[Ivar]> {
        match self.inner.layout.get() {
            Some(layout) => Arc::clone(&layout.ivars),
            None => self.compute_layout().ivars,
        }
    }

    /// Size in bytes of an instance, header included.
    #[must_use]
    pub fn instance_size(&self) -> usize {
        match self.inner.layout.get() {
            Some(layout) => layout.instance_size,
            None => self.compute_layout().instance_size,
        }
    }

    fn compute_layout(&self) -> Layout {
        let (mut ivars, mut offset) = match &self.inner.super_class {
            Some(parent) => (parent.ivars().to_vec(), parent.instance_size()),
            None => (Vec::new(), OBJECT_HEADER_SIZE),
        };

        for (name, type_tag) in read_lock(&self.inner.ivars).iter() {
            let size = type_tag.size();
            offset = offset.next_multiple_of(size.max(1));
            ivars.push(Ivar {
                name: Arc::clone(name),
                type_tag: *type_tag,
                offset,
            });
            offset += size;
        }

        Layout {
            ivars: Arc::from(ivars),
            instance_size: offset.next_multiple_of(OBJECT_HEADER_SIZE),
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle transitions, driven by the registry
    // ------------------------------------------------------------------

    pub(crate) fn finalize(&self) -> Result<()> {
        match self.inner.state.compare_exchange(
            ClassState::Pending as u8,
            ClassState::Registered as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => {
                let layout = self.compute_layout();
                debug!(
                    "class {} registered ({} ivars, {} bytes)",
                    self.name(),
                    layout.ivars.len(),
                    layout.instance_size
                );
                let _ = self.inner.layout.set(layout);
                Ok(())
            }
            Err(raw) if ClassState::from_u8(raw) == ClassState::Registered => {
                Err(Error::ClassAlreadyFinalized {
                    name: self.name().to_string(),
                })
            }
            Err(_) => Err(self.not_registered()),
        }
    }

    pub(crate) fn dispose(&self) {
        self.inner
            .state
            .store(ClassState::Disposed as u8, Ordering::Release);
        write_lock(&self.inner.instance_methods).clear();
        write_lock(&self.inner.class_methods).clear();
        write_lock(&self.inner.cache).clear();
        bump_method_epoch();
    }

    pub(crate) fn instance_created(&self) {
        self.inner.live_instances.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn instance_destroyed(&self) {
        self.inner.live_instances.fetch_sub(1, Ordering::AcqRel);
    }

    pub(crate) fn not_registered(&self) -> Error {
        Error::ClassNotRegistered {
            name: self.name().to_string(),
        }
    }

    // ------------------------------------------------------------------
    // Method tables
    // ------------------------------------------------------------------

    fn table(&self, kind: MethodKind) -> &RwLock<MethodTable> {
        match kind {
            MethodKind::Class => &self.inner.class_methods,
            MethodKind::Instance => &self.inner.instance_methods,
        }
    }

    fn insert_method(&self, method: Method, replace: bool) -> Result<()> {
        if self.state() == ClassState::Disposed {
            return Err(self.not_registered());
        }

        let selector = method.selector();
        let kind = method.kind();
        {
            let mut table = write_lock(self.table(kind));
            if !replace && table.contains_key(&selector) {
                return Err(Error::MethodAlreadyExists {
                    selector: selector.name().to_string(),
                });
            }
            table.insert(selector, Arc::new(method));
        }
        bump_method_epoch();

        debug!(
            "{} {kind} method {selector} on {}",
            if replace { "installed" } else { "added" },
            self.name()
        );
        Ok(())
    }

    /// Adds a method with an explicit signature.
    ///
    /// `argument_types` includes the receiver and selector slots. Works on
    /// pending and registered classes.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidEncoding`] if `argument_types` is malformed
    /// - [`Error::ArgumentCountMismatch`] if the selector's colons or `imp`'s
    ///   arity disagree with the explicit argument types
    /// - [`Error::MethodAlreadyExists`] if the class itself already defines
    ///   `selector` for `kind` (use [`Class::replace_method`] or
    ///   [`Class::add_or_replace_method`])
    /// - [`Error::ClassNotRegistered`] if the class was destroyed
    pub fn add_method(
        &self,
        selector: Selector,
        kind: MethodKind,
        return_type: TypeTag,
        argument_types: &[TypeTag],
        imp: Implementation,
    ) -> Result<()> {
        let signature = MethodSignature::new(selector, kind, return_type, argument_types)?;
        self.insert_method(Method::new(signature, imp)?, false)
    }

    /// Adds a method described by an encoding string such as `"@@:@"`.
    ///
    /// # Errors
    ///
    /// As [`Class::add_method`].
    pub fn add_method_with_encoding(
        &self,
        selector: Selector,
        kind: MethodKind,
        encoding: &str,
        imp: Implementation,
    ) -> Result<()> {
        let signature = MethodSignature::from_encoding(selector, kind, encoding)?;
        self.insert_method(Method::new(signature, imp)?, false)
    }

    /// Adds a method, replacing any existing definition on this class.
    ///
    /// # Errors
    ///
    /// As [`Class::add_method`], minus [`Error::MethodAlreadyExists`].
    pub fn add_or_replace_method(
        &self,
        selector: Selector,
        kind: MethodKind,
        return_type: TypeTag,
        argument_types: &[TypeTag],
        imp: Implementation,
    ) -> Result<()> {
        let signature = MethodSignature::new(selector, kind, return_type, argument_types)?;
        self.insert_method(Method::new(signature, imp)?, true)
    }

    /// Swaps the implementation of an existing method ("swizzling").
    ///
    /// The method keeps its signature. The swap is visible to every existing
    /// and future instance of this class and its subclasses from the next
    /// message on. If the method is only inherited, the new implementation
    /// is installed on this class and overrides the ancestor's for this
    /// class and its subclasses only.
    ///
    /// # Example
    ///
    /// ```rust
    /// use runtimekit::runtime::signature::MethodKind;
    /// use runtimekit::runtime::{registry, Implementation};
    /// use runtimekit::{MethodCallRequest, Object, Selector};
    /// use std::str::FromStr;
    ///
    /// let class = registry::create_class("DocSwizzled").unwrap();
    /// let description = Selector::from_str("description").unwrap();
    /// class
    ///     .replace_method(
    ///         description,
    ///         MethodKind::Instance,
    ///         Implementation::new0(|_, _| "swizzled"),
    ///     )
    ///     .unwrap();
    ///
    /// let object = Object::new(&class).unwrap();
    /// let request = MethodCallRequest::<String>::new("description").unwrap();
    /// let text = object.perform(&request, &[]).unwrap().unwrap();
    /// assert_eq!(text.take_retained().unwrap(), "swizzled");
    /// ```
    ///
    /// # Errors
    ///
    /// - [`Error::MethodNotFound`] if `selector` does not resolve for `kind`
    /// - [`Error::ArgumentCountMismatch`] if `imp`'s arity differs from the
    ///   existing signature
    /// - [`Error::ClassNotRegistered`] if the class was destroyed
    pub fn replace_method(&self, selector: Selector, kind: MethodKind, imp: Implementation) -> Result<()> {
        let existing = self
            .lookup_method(selector, kind)
            .ok_or_else(|| Error::MethodNotFound {
                selector: selector.name().to_string(),
            })?;

        let method = Method::new(existing.signature().clone(), imp)?;
        self.insert_method(method, true)
    }

    /// Finds the method for `selector`, walking the superclass chain.
    ///
    /// Uses the per-class cache; entries older than the last method table
    /// mutation are ignored.
    #[must_use]
    pub fn lookup_method(&self, selector: Selector, kind: MethodKind) -> Option<Arc<Method>> {
        let epoch = METHOD_EPOCH.load(Ordering::Acquire);

        // Fast path: cache hit from the current epoch
        if let Some((cached_epoch, method)) = read_lock(&self.inner.cache).get(&(selector, kind)) {
            if *cached_epoch == epoch {
                return Some(Arc::clone(method));
            }
        }

        // Slow path: walk inheritance chain
        let mut current = Some(self.clone());
        while let Some(class) = current {
            let found = read_lock(class.table(kind)).get(&selector).cloned();
            if let Some(method) = found {
                trace!(
                    "resolved {kind} method {selector} for {} in {}",
                    self.name(),
                    class.name()
                );
                write_lock(&self.inner.cache).insert((selector, kind), (epoch, Arc::clone(&method)));
                return Some(method);
            }
            current = class.super_class();
        }

        None
    }

    /// Returns `true` if this class itself (not an ancestor) defines
    /// `selector` for `kind`.
    #[must_use]
    pub fn defines_method(&self, selector: Selector, kind: MethodKind) -> bool {
        read_lock(self.table(kind)).contains_key(&selector)
    }

    /// The methods of `kind` defined directly on this class.
    #[must_use]
    pub fn methods(&self, kind: MethodKind) -> Vec<Arc<Method>> {
        read_lock(self.table(kind)).values().cloned().collect()
    }
}

impl PartialEq for Class {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Class {}

impl Hash for Class {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Arc::as_ptr(&self.inner), state);
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.name())
            .field("super_class", &self.inner.super_class.as_ref().map(Class::name))
            .field("state", &self.state())
            .field("origin", &self.origin())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn sel(name: &str) -> Selector {
        Selector::from_str(name).unwrap()
    }

    fn registered(name: &str, parent: Option<&Class>) -> Class {
        let class = Class::new_pending(name, parent, ClassOrigin::Dynamic);
        class.finalize().unwrap();
        class
    }

    fn object_args() -> [TypeTag; 2] {
        [TypeTag::Object, TypeTag::Selector]
    }

    #[test]
    fn test_pending_then_registered() {
        let class = Class::new_pending("ClassLifecycle", None, ClassOrigin::Dynamic);
        assert_eq!(class.state(), ClassState::Pending);
        assert!(!class.is_registered());

        class.finalize().unwrap();
        assert!(class.is_registered());
        assert_eq!(
            class.finalize(),
            Err(Error::ClassAlreadyFinalized {
                name: "ClassLifecycle".to_string()
            })
        );
    }

    #[test]
    fn test_duplicate_method_rejected() {
        let class = registered("ClassDuplicate", None);
        let imp = Implementation::new0(|_, _| Value::Void);

        class
            .add_method(sel("run"), MethodKind::Instance, TypeTag::Void, &object_args(), imp.clone())
            .unwrap();
        assert_eq!(
            class.add_method(sel("run"), MethodKind::Instance, TypeTag::Void, &object_args(), imp.clone()),
            Err(Error::MethodAlreadyExists {
                selector: "run".to_string()
            })
        );

        // Same selector as a class method is a different slot
        class
            .add_method(
                sel("run"),
                MethodKind::Class,
                TypeTag::Void,
                &[TypeTag::Class, TypeTag::Selector],
                imp,
            )
            .unwrap();
    }

    #[test]
    fn test_arity_must_match_signature() {
        let class = registered("ClassArity", None);
        let result = class.add_method(
            sel("take:"),
            MethodKind::Instance,
            TypeTag::Void,
            &[TypeTag::Object, TypeTag::Selector, TypeTag::Int],
            Implementation::new0(|_, _| Value::Void),
        );
        assert_eq!(
            result,
            Err(Error::ArgumentCountMismatch {
                expected: 1,
                got: 0
            })
        );
    }

    #[test]
    fn test_inheritance_lookup_and_cache_invalidation() {
        let parent = registered("ClassParent", None);
        let child = registered("ClassChild", Some(&parent));
        let first = Implementation::new0(|_, _| 1_i64);
        let second = Implementation::new0(|_, _| 2_i64);

        parent
            .add_method(sel("value"), MethodKind::Instance, TypeTag::LongLong, &object_args(), first.clone())
            .unwrap();

        let found = child.lookup_method(sel("value"), MethodKind::Instance).unwrap();
        assert!(found.implementation().ptr_eq(&first));
        assert!(!child.defines_method(sel("value"), MethodKind::Instance));

        // Cached in child; replacing on the parent must still be seen
        parent
            .replace_method(sel("value"), MethodKind::Instance, second.clone())
            .unwrap();
        let found = child.lookup_method(sel("value"), MethodKind::Instance).unwrap();
        assert!(found.implementation().ptr_eq(&second));
    }

    #[test]
    fn test_replace_inherited_overrides_only_subclass() {
        let parent = registered("ClassSwizzleParent", None);
        let child = registered("ClassSwizzleChild", Some(&parent));
        let original = Implementation::new0(|_, _| 1_i64);
        let replacement = Implementation::new0(|_, _| 2_i64);

        parent
            .add_method(sel("value"), MethodKind::Instance, TypeTag::LongLong, &object_args(), original.clone())
            .unwrap();
        child
            .replace_method(sel("value"), MethodKind::Instance, replacement.clone())
            .unwrap();

        let on_child = child.lookup_method(sel("value"), MethodKind::Instance).unwrap();
        let on_parent = parent.lookup_method(sel("value"), MethodKind::Instance).unwrap();
        assert!(on_child.implementation().ptr_eq(&replacement));
        assert!(on_parent.implementation().ptr_eq(&original));
        assert_eq!(on_child.signature(), on_parent.signature());
    }

    #[test]
    fn test_replace_missing_method() {
        let class = registered("ClassReplaceMissing", None);
        assert_eq!(
            class.replace_method(sel("absent"), MethodKind::Instance, Implementation::new0(|_, _| Value::Void)),
            Err(Error::MethodNotFound {
                selector: "absent".to_string()
            })
        );
    }

    #[test]
    fn test_ivar_layout() {
        let parent = Class::new_pending("ClassIvarParent", None, ClassOrigin::Dynamic);
        parent.add_ivar("flag", TypeTag::Bool).unwrap();
        parent.finalize().unwrap();

        let child = Class::new_pending("ClassIvarChild", Some(&parent), ClassOrigin::Dynamic);
        child.add_ivar("count", TypeTag::LongLong).unwrap();
        child.add_ivar("ratio", TypeTag::Float).unwrap();
        assert_eq!(
            child.add_ivar("flag", TypeTag::Int),
            Err(Error::IvarAlreadyExists {
                name: "flag".to_string()
            })
        );
        child.finalize().unwrap();

        let ivars = child.ivars();
        let names: Vec<_> = ivars.iter().map(Ivar::name).collect();
        assert_eq!(names, ["flag", "count", "ratio"]);
        assert_eq!(ivars[0].offset(), 8);
        assert_eq!(ivars[1].offset(), 16);
        assert_eq!(ivars[2].offset(), 24);
        assert_eq!(parent.instance_size(), 16);
        assert_eq!(child.instance_size(), 32);

        assert_eq!(
            child.add_ivar("late", TypeTag::Int),
            Err(Error::ClassAlreadyFinalized {
                name: "ClassIvarChild".to_string()
            })
        );
    }

    #[test]
    fn test_dispose_frees_tables() {
        let class = registered("ClassDispose", None);
        class
            .add_method(
                sel("value"),
                MethodKind::Instance,
                TypeTag::LongLong,
                &object_args(),
                Implementation::new0(|_, _| 1_i64),
            )
            .unwrap();

        class.dispose();
        assert_eq!(class.state(), ClassState::Disposed);
        assert!(class.methods(MethodKind::Instance).is_empty());
        assert!(class.lookup_method(sel("value"), MethodKind::Instance).is_none());
        assert!(matches!(
            class.add_method(
                sel("other"),
                MethodKind::Instance,
                TypeTag::Void,
                &object_args(),
                Implementation::new0(|_, _| Value::Void),
            ),
            Err(Error::ClassNotRegistered { .. })
        ));
    }

    #[test]
    fn test_class_equality_and_debug() {
        let class = registered("ClassEquality", None);
        let other = registered("ClassEquality", None);

        assert_eq!(class, class.clone());
        assert_ne!(class, other);
        assert!(format!("{class:?}").contains("ClassEquality"));
    }
}
