// Associated value integration tests

mod common;

use runtimekit::runtime::registry;
use runtimekit::{AssociatedObjectKey, Error, Object};
use std::thread;

static NAME: AssociatedObjectKey<String> = AssociatedObjectKey::new("name");
static AGE: AssociatedObjectKey<i64> = AssociatedObjectKey::new("age");

#[derive(Debug, Clone, PartialEq)]
struct Name {
    first: String,
    last: String,
}

#[test]
fn test_single_associated_value() {
    let person = common::unique_class("Person");
    let me = Object::new(&person).unwrap();

    me.set_associated(&NAME, "Lukas".to_string()).unwrap();
    assert_eq!(me.associated(&NAME).unwrap().as_deref(), Some("Lukas"));
}

#[test]
fn test_object_as_associated_value() {
    let person = common::unique_class("Person");
    let address_class = common::unique_class("Address");

    let address_key = AssociatedObjectKey::<Object>::new("address");
    let street_key = AssociatedObjectKey::<String>::new("street");
    let house_number_key = AssociatedObjectKey::<i64>::new("houseNumber");
    let city_key = AssociatedObjectKey::<String>::new("city");

    let address = Object::new(&address_class).unwrap();
    address.set_associated(&street_key, "Random Street".to_string()).unwrap();
    address.set_associated(&house_number_key, 5).unwrap();
    address.set_associated(&city_key, "Munich".to_string()).unwrap();

    let me = Object::new(&person).unwrap();
    me.set_associated(&NAME, "Lukas".to_string()).unwrap();
    me.set_associated(&address_key, address.clone()).unwrap();

    let my_address = me.associated(&address_key).unwrap().unwrap();
    assert_eq!(my_address, address);
    assert_eq!(
        my_address.associated(&street_key).unwrap().as_deref(),
        Some("Random Street")
    );
    assert_eq!(my_address.associated(&house_number_key).unwrap(), Some(5));
    assert_eq!(my_address.associated(&city_key).unwrap().as_deref(), Some("Munich"));
}

#[test]
fn test_value_type_association_is_copied() {
    let person = common::unique_class("Person");
    let name_key = AssociatedObjectKey::<Name>::new("fullName");
    let me = Object::new(&person).unwrap();

    let name = Name {
        first: "Lukas".to_string(),
        last: "Kollmer".to_string(),
    };
    me.set_associated(&name_key, name.clone()).unwrap();
    me.set_associated(&AGE, 18).unwrap();

    let mut my_name = me.associated(&name_key).unwrap().unwrap();
    assert_eq!(my_name, name);
    assert_eq!(me.associated(&AGE).unwrap(), Some(18));

    // Mutating the copy leaves the stored value alone
    my_name.first.push('!');
    assert_eq!(me.associated(&name_key).unwrap(), Some(name));
}

#[test]
fn test_instances_do_not_share_slots() {
    let person = common::unique_class("Person");
    let first = Object::new(&person).unwrap();
    let second = Object::new(&person).unwrap();

    first.set_associated(&AGE, 30).unwrap();
    second.set_associated(&AGE, 40).unwrap();

    assert_eq!(first.associated(&AGE).unwrap(), Some(30));
    assert_eq!(second.associated(&AGE).unwrap(), Some(40));
    assert!(!Object::new(&person).unwrap().has_associated(&AGE));
}

#[test]
fn test_wrong_type_for_name_is_rejected() {
    let person = common::unique_class("Person");
    let me = Object::new(&person).unwrap();
    let age_as_text = AssociatedObjectKey::<String>::new("age");

    me.set_associated(&AGE, 18).unwrap();
    assert!(matches!(me.associated(&age_as_text), Err(Error::TypeMismatch { .. })));
    assert_eq!(me.associated(&AGE).unwrap(), Some(18));
}

#[test]
fn test_associated_values_released_with_instance() {
    let holder_class = common::unique_class("Holder");
    let payload_class = common::unique_class("Payload");
    let payload_key = AssociatedObjectKey::<Object>::new("payload");

    let payload = Object::new(&payload_class).unwrap();
    let holder = Object::new(&holder_class).unwrap();
    holder.set_associated(&payload_key, payload.clone()).unwrap();
    assert_eq!(payload.retain_count(), 2);

    drop(holder);
    assert_eq!(payload.retain_count(), 1);
    assert_eq!(holder_class.live_instances(), 0);

    // Nothing keeps the payload's class busy once the payload goes too
    drop(payload);
    registry::destroy_class(&payload_class).unwrap();
}

#[test]
fn test_overwrite_releases_previous_object() {
    let class = common::unique_class("Overwrite");
    let key = AssociatedObjectKey::<Object>::new("slot");
    let owner = Object::new(&class).unwrap();
    let first = Object::new(&class).unwrap();
    let second = Object::new(&class).unwrap();

    owner.set_associated(&key, first.clone()).unwrap();
    owner.set_associated(&key, second.clone()).unwrap();

    assert_eq!(first.retain_count(), 1);
    assert_eq!(second.retain_count(), 2);
    assert_eq!(owner.remove_associated(&key).unwrap(), Some(second.clone()));
    assert_eq!(second.retain_count(), 1);
}

#[test]
fn test_association_from_many_threads() {
    let class = common::unique_class("Threaded");
    let shared = Object::new(&class).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let shared = shared.clone();
            thread::spawn(move || {
                let key = AssociatedObjectKey::<i64>::named(format!("slot{i}"));
                shared.set_associated(&key, i).unwrap();
                shared.associated(&key).unwrap()
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap(), Some(i as i64));
    }
    assert_eq!(shared.associated_count(), 8);
}
