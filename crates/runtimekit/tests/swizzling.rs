// Method replacement integration tests
//
// These tests verify that replacing an implementation is visible to every
// instance from the next call on, respects inheritance, and keeps the
// method's signature.

mod common;

use runtimekit::runtime::encoding::TypeTag;
use runtimekit::runtime::signature::{self, MethodKind};
use runtimekit::runtime::{Implementation, registry};
use runtimekit::{Error, MethodCallRequest, Object, Value};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

fn call_i64(object: &Object, name: &str) -> i64 {
    let request = MethodCallRequest::<i64>::new(name).unwrap();
    object
        .perform(&request, &[])
        .unwrap()
        .unwrap()
        .take_retained()
        .unwrap()
}

#[test]
fn test_replace_affects_existing_and_new_instances() {
    let class = common::unique_class("SwizzleBasic");
    common::constant_method(&class, "getValue", 42);

    let existing = Object::new(&class).unwrap();
    assert_eq!(call_i64(&existing, "getValue"), 42);

    class
        .replace_method(
            common::sel("getValue"),
            MethodKind::Instance,
            Implementation::new0(|_, _| 100_i64),
        )
        .unwrap();

    let fresh = Object::new(&class).unwrap();
    assert_eq!(call_i64(&existing, "getValue"), 100);
    assert_eq!(call_i64(&fresh, "getValue"), 100);
}

#[test]
fn test_replaced_implementation_is_never_called_again() {
    let original_calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&original_calls);
    let class = common::unique_class("SwizzleNever");
    common::add_instance_method(
        &class,
        "tick",
        TypeTag::Void,
        &[],
        Implementation::new0(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        }),
    );
    let object = Object::new(&class).unwrap();
    let tick = MethodCallRequest::<()>::new("tick").unwrap();

    object.perform(&tick, &[]).unwrap();
    assert_eq!(original_calls.load(Ordering::SeqCst), 1);

    registry::replace_method(&class, common::sel("tick"), MethodKind::Instance, Implementation::new0(|_, _| ()))
        .unwrap();
    for _ in 0..5 {
        object.perform(&tick, &[]).unwrap();
    }
    assert_eq!(original_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_replace_on_parent_reaches_subclass() {
    let parent = common::unique_class("SwizzleParent");
    let child = registry::create_subclass("SwizzleChildOfParent", &parent).unwrap();
    common::constant_method(&parent, "inherited", 1);

    let instance = Object::new(&child).unwrap();
    assert_eq!(call_i64(&instance, "inherited"), 1);

    parent
        .replace_method(
            common::sel("inherited"),
            MethodKind::Instance,
            Implementation::new0(|_, _| 2_i64),
        )
        .unwrap();
    assert_eq!(call_i64(&instance, "inherited"), 2);
}

#[test]
fn test_replace_on_child_leaves_parent_alone() {
    let parent = common::unique_class("SwizzleBase");
    let child = registry::create_subclass("SwizzleDerived", &parent).unwrap();
    common::constant_method(&parent, "value", 10);

    child
        .replace_method(
            common::sel("value"),
            MethodKind::Instance,
            Implementation::new0(|_, _| 20_i64),
        )
        .unwrap();

    assert_eq!(call_i64(&Object::new(&parent).unwrap(), "value"), 10);
    assert_eq!(call_i64(&Object::new(&child).unwrap(), "value"), 20);

    let provider = signature::method_provider(&child, common::sel("value"), MethodKind::Instance);
    assert_eq!(provider, Some(child.clone()));
    assert_eq!(
        signature::resolve(&child, "value", MethodKind::Instance).unwrap(),
        signature::resolve(&parent, "value", MethodKind::Instance).unwrap()
    );
}

#[test]
fn test_replace_core_class_method() {
    let root = registry::root_class();
    let string_like = common::unique_class("StringLike");
    let instance = Object::new(&string_like).unwrap();
    let is_equal = MethodCallRequest::<bool>::new("isEqual:").unwrap();
    let original = root
        .lookup_method(common::sel("isEqual:"), MethodKind::Instance)
        .unwrap()
        .implementation()
        .clone();

    let before = instance.perform(&is_equal, &[instance.clone().into()]).unwrap().unwrap();
    assert!(before.take_retained().unwrap());

    root.replace_method(
        common::sel("isEqual:"),
        MethodKind::Instance,
        Implementation::new1(|_, _, _| false),
    )
    .unwrap();

    let after = instance.perform(&is_equal, &[instance.clone().into()]).unwrap().unwrap();
    assert!(!after.take_retained().unwrap());

    // Other tests in this binary share the root class
    root.replace_method(common::sel("isEqual:"), MethodKind::Instance, original)
        .unwrap();
    let restored = instance.perform(&is_equal, &[instance.clone().into()]).unwrap().unwrap();
    assert!(restored.take_retained().unwrap());
}

#[test]
fn test_replace_requires_existing_method_and_matching_arity() {
    let class = common::unique_class("SwizzleErrors");
    assert_eq!(
        class.replace_method(
            common::sel("missing"),
            MethodKind::Instance,
            Implementation::new0(|_, _| Value::Void),
        ),
        Err(Error::MethodNotFound {
            selector: "missing".to_string()
        })
    );

    common::constant_method(&class, "value", 1);
    assert_eq!(
        class.replace_method(
            common::sel("value"),
            MethodKind::Instance,
            Implementation::new1(|_, _, _| 2_i64),
        ),
        Err(Error::ArgumentCountMismatch {
            expected: 0,
            got: 1
        })
    );
}

#[test]
fn test_add_method_refuses_overwrite_but_add_or_replace_allows_it() {
    let class = common::unique_class("SwizzleAddOrReplace");
    common::constant_method(&class, "value", 1);

    assert!(matches!(
        class.add_method(
            common::sel("value"),
            MethodKind::Instance,
            TypeTag::LongLong,
            &common::instance_args(&[]),
            Implementation::new0(|_, _| 2_i64),
        ),
        Err(Error::MethodAlreadyExists { .. })
    ));

    class
        .add_or_replace_method(
            common::sel("value"),
            MethodKind::Instance,
            TypeTag::LongLong,
            &common::instance_args(&[]),
            Implementation::new0(|_, _| 3_i64),
        )
        .unwrap();
    assert_eq!(call_i64(&Object::new(&class).unwrap(), "value"), 3);
}

#[test]
fn test_concurrent_dispatch_during_replacement() {
    let class = common::unique_class("SwizzleConcurrent");
    common::constant_method(&class, "value", 1);
    let object = Object::new(&class).unwrap();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let object = object.clone();
            thread::spawn(move || {
                for _ in 0..200 {
                    let value = call_i64(&object, "value");
                    assert!(value == 1 || value == 2);
                }
            })
        })
        .collect();

    class
        .replace_method(
            common::sel("value"),
            MethodKind::Instance,
            Implementation::new0(|_, _| 2_i64),
        )
        .unwrap();

    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(call_i64(&object, "value"), 2);
}
