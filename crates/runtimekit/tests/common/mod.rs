// Common test utilities for integration tests
//
// Shared helpers for building classes and methods across the integration
// test binaries. Each binary has its own class namespace, so class names
// only need to be unique within one test file.

#![allow(dead_code)]

use runtimekit::runtime::encoding::TypeTag;
use runtimekit::runtime::signature::MethodKind;
use runtimekit::runtime::{Class, Implementation, registry};
use runtimekit::Selector;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};

static CLASS_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Interns a selector
pub fn sel(name: &str) -> Selector {
    Selector::from_str(name).expect("Failed to create test selector")
}

/// Creates a registered subclass of `Object` with a unique name
pub fn unique_class(prefix: &str) -> Class {
    let id = CLASS_COUNTER.fetch_add(1, Ordering::SeqCst);
    registry::create_class(&format!("{prefix}{id}")).expect("Failed to create test class")
}

/// Receiver and selector slots for an instance method, then `explicit`
pub fn instance_args(explicit: &[TypeTag]) -> Vec<TypeTag> {
    [TypeTag::Object, TypeTag::Selector]
        .into_iter()
        .chain(explicit.iter().copied())
        .collect()
}

/// Receiver and selector slots for a class method, then `explicit`
pub fn class_args(explicit: &[TypeTag]) -> Vec<TypeTag> {
    [TypeTag::Class, TypeTag::Selector]
        .into_iter()
        .chain(explicit.iter().copied())
        .collect()
}

/// Adds an instance method, panicking on failure
pub fn add_instance_method(
    class: &Class,
    name: &str,
    return_type: TypeTag,
    explicit: &[TypeTag],
    imp: Implementation,
) {
    class
        .add_method(sel(name), MethodKind::Instance, return_type, &instance_args(explicit), imp)
        .expect("Failed to add instance method");
}

/// Adds a class method, panicking on failure
pub fn add_class_method(
    class: &Class,
    name: &str,
    return_type: TypeTag,
    explicit: &[TypeTag],
    imp: Implementation,
) {
    class
        .add_method(sel(name), MethodKind::Class, return_type, &class_args(explicit), imp)
        .expect("Failed to add class method");
}

/// An instance method returning a fixed integer
pub fn constant_method(class: &Class, name: &str, value: i64) {
    add_instance_method(
        class,
        name,
        TypeTag::LongLong,
        &[],
        Implementation::new0(move |_, _| value),
    );
}
