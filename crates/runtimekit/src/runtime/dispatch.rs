//! Typed dynamic method calls.
//!
//! This module implements calling a method by name on a class or an
//! instance and getting a typed result back:
//!
//! - **Requests**: [`MethodCallRequest<T>`] resolves a name to a selector
//!   once and is reused for every call
//! - **Validation**: argument count and argument types are checked against
//!   the resolved signature before the implementation runs
//! - **Results**: [`MethodCallResult<T>`] holds the raw value and decides,
//!   at the accessor, who owns it
//!
//! # Dispatch Algorithm
//!
//! 1. Pack the arguments into [`MessageArgs`], rejecting more than
//!    [`MAX_ARGUMENTS`](crate::runtime::message::MAX_ARGUMENTS)
//! 2. Resolve the method on the receiver's class (class methods for class
//!    receivers, instance methods for instances), walking superclasses
//! 3. Check arity and argument types against the signature
//! 4. Invoke the implementation with exactly the supplied arguments
//! 5. Void signature or `T = ()`: void result, raw value ignored
//! 6. Check the returned value against the declared return type
//! 7. `nil` raw value: no result
//!
//! No lock is held while the implementation runs; a panic inside it
//! propagates to the caller.
//!
//! # Ownership
//!
//! Results are owned Rust values, so the two accessors differ only in who
//! keeps a handle: [`MethodCallResult::take_retained`] moves the value out
//! and [`MethodCallResult::take_unretained`] clones it, retaining objects,
//! while the result keeps its own.

use crate::error::{Error, Result};
use crate::runtime::message::MessageArgs;
use crate::runtime::signature::MethodKind;
use crate::runtime::{Class, FromValue, Object, Receiver, Selector, Value};
use runtimekit_log::trace;
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

/// A method name bound to an expected result type.
///
/// The name is interned once at construction; the request is immutable and
/// cheap to copy.
///
/// # Example
///
/// ```rust
/// use runtimekit::MethodCallRequest;
///
/// let hash = MethodCallRequest::<i64>::new("hash").unwrap();
/// assert_eq!(hash.name(), "hash");
/// assert!(MethodCallRequest::<i64>::new("").is_err());
/// ```
pub struct MethodCallRequest<T> {
    selector: Selector,
    _marker: PhantomData<fn() -> T>,
}

impl<T: FromValue> MethodCallRequest<T> {
    /// Interns `name` and binds it to `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSelector`] if `name` is not a valid selector.
    pub fn new(name: &str) -> Result<Self> {
        Ok(Self::from_selector(Selector::from_str(name)?))
    }

    /// Binds an already-interned selector to `T`.
    #[must_use]
    pub fn from_selector(selector: Selector) -> Self {
        MethodCallRequest {
            selector,
            _marker: PhantomData,
        }
    }
}

impl<T> MethodCallRequest<T> {
    /// The resolved selector.
    #[must_use]
    pub fn selector(&self) -> Selector {
        self.selector
    }

    /// The method name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.selector.name()
    }
}

impl<T> Clone for MethodCallRequest<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for MethodCallRequest<T> {}

impl<T> fmt::Debug for MethodCallRequest<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodCallRequest")
            .field("selector", &self.selector.name())
            .field("result", &std::any::type_name::<T>())
            .finish()
    }
}

/// The outcome of a successful call.
pub struct MethodCallResult<T> {
    value: Value,
    is_void: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T: FromValue> MethodCallResult<T> {
    fn new(value: Value) -> Self {
        MethodCallResult {
            value,
            is_void: false,
            _marker: PhantomData,
        }
    }

    fn void() -> Self {
        MethodCallResult {
            value: Value::Void,
            is_void: true,
            _marker: PhantomData,
        }
    }

    /// Returns `true` if the call produced no value.
    #[must_use]
    pub fn is_void(&self) -> bool {
        self.is_void
    }

    /// The raw returned value; [`Value::Void`] for void results.
    #[must_use]
    pub fn raw(&self) -> &Value {
        &self.value
    }

    /// Moves the value out; the caller becomes its sole owner.
    ///
    /// A void result yields `T`'s conversion of [`Value::Void`]: `()` for
    /// `()`, `None` for `Option<U>`, `Value::Void` for [`Value`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if the value does not convert to `T`.
    pub fn take_retained(self) -> Result<T> {
        if self.is_void {
            return T::from_value(Value::Void);
        }
        T::from_value(self.value)
    }

    /// Returns the value while the result keeps its own handle. Object
    /// values are retained once more for the caller.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if the value does not convert to `T`.
    pub fn take_unretained(&self) -> Result<T> {
        if self.is_void {
            return T::from_value(Value::Void);
        }
        T::from_value(self.value.clone())
    }

    /// The raw value, consuming the result.
    #[must_use]
    pub fn into_value(self) -> Value {
        self.value
    }
}

impl<T> fmt::Debug for MethodCallResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodCallResult")
            .field("value", &self.value)
            .field("is_void", &self.is_void)
            .finish()
    }
}

/// Raw outcome of one send: the value and whether the signature is void.
fn send(receiver: &Receiver, selector: Selector, args: &MessageArgs) -> Result<(Value, bool)> {
    let class = receiver.class();
    if !class.is_registered() {
        return Err(class.not_registered());
    }

    let kind = receiver.kind();
    let method = class
        .lookup_method(selector, kind)
        .ok_or_else(|| Error::MethodNotFound {
            selector: selector.name().to_string(),
        })?;
    let signature = method.signature();

    if args.count() != signature.explicit_arity() {
        return Err(Error::ArgumentCountMismatch {
            expected: signature.explicit_arity(),
            got: args.count(),
        });
    }
    for (index, (arg, expected)) in args
        .as_slice()
        .iter()
        .zip(signature.explicit_argument_types())
        .enumerate()
    {
        if !arg.matches(*expected) {
            return Err(Error::ArgumentTypeMismatch {
                expected: expected.encoding(),
                got: arg.type_tag().encoding(),
                index,
            });
        }
    }

    trace!(
        "{}[{} {selector}] with {} argument(s)",
        if kind == MethodKind::Class { '+' } else { '-' },
        class.name(),
        args.count()
    );

    let value = method.implementation().invoke(receiver, selector, args.as_slice());
    if signature.is_void() {
        return Ok((value, true));
    }

    let return_type = signature.return_type();
    if !value.is_nil() && !value.matches(return_type) {
        return Err(Error::TypeMismatch {
            expected: return_type.encoding().to_string(),
            found: value.type_name().to_string(),
        });
    }
    Ok((value, false))
}

/// Calls `request` on `target` with `args`.
///
/// Returns `Ok(None)` when the method returns `nil`.
///
/// # Example
///
/// ```rust
/// use runtimekit::runtime::{perform, registry};
/// use runtimekit::{MethodCallRequest, Object};
///
/// let class = registry::create_class("DocPerform").unwrap();
/// let object = Object::new(&class).unwrap();
///
/// let is_equal = MethodCallRequest::<bool>::new("isEqual:").unwrap();
/// let same = perform(&object, &is_equal, &[object.clone().into()]).unwrap().unwrap();
/// assert!(same.take_retained().unwrap());
/// ```
///
/// # Errors
///
/// - [`Error::TooManyArguments`] for more than two arguments
/// - [`Error::ClassNotRegistered`] if the receiver's class is pending or
///   destroyed
/// - [`Error::MethodNotFound`] if no method of the receiver's kind exists
/// - [`Error::ArgumentCountMismatch`] / [`Error::ArgumentTypeMismatch`] if
///   `args` does not fit the signature
/// - [`Error::TypeMismatch`] if the implementation returns a value that does
///   not fit the declared return type
pub fn perform<T: FromValue>(
    target: impl Into<Receiver>,
    request: &MethodCallRequest<T>,
    args: &[Value],
) -> Result<Option<MethodCallResult<T>>> {
    let args = MessageArgs::try_from(args)?;
    let (value, is_void) = send(&target.into(), request.selector(), &args)?;

    if is_void || T::IS_VOID {
        return Ok(Some(MethodCallResult::void()));
    }
    match value {
        Value::Nil | Value::Void => Ok(None),
        value => Ok(Some(MethodCallResult::new(value))),
    }
}

/// Like [`perform`], but an absent target yields `Ok(None)` without a call.
///
/// # Errors
///
/// As [`perform`].
pub fn perform_optional<T: FromValue, R: Into<Receiver>>(
    target: Option<R>,
    request: &MethodCallRequest<T>,
    args: &[Value],
) -> Result<Option<MethodCallResult<T>>> {
    match target {
        Some(target) => perform(target, request, args),
        None => {
            trace!("message {} sent to nil", request.name());
            Ok(None)
        }
    }
}

/// Untyped call: returns the raw value, [`Value::Void`] for void methods.
///
/// # Errors
///
/// As [`perform`].
pub fn perform_selector(target: impl Into<Receiver>, selector: Selector, args: &[Value]) -> Result<Value> {
    let args = MessageArgs::try_from(args)?;
    let (value, is_void) = send(&target.into(), selector, &args)?;
    Ok(if is_void { Value::Void } else { value })
}

impl Object {
    /// Calls an instance method on this object. See [`perform`].
    ///
    /// # Errors
    ///
    /// As [`perform`].
    pub fn perform<T: FromValue>(
        &self,
        request: &MethodCallRequest<T>,
        args: &[Value],
    ) -> Result<Option<MethodCallResult<T>>> {
        perform(self, request, args)
    }
}

impl Class {
    /// Calls a class method on this class. See [`perform`].
    ///
    /// # Errors
    ///
    /// As [`perform`].
    pub fn perform<T: FromValue>(
        &self,
        request: &MethodCallRequest<T>,
        args: &[Value],
    ) -> Result<Option<MethodCallResult<T>>> {
        perform(self, request, args)
    }
}
