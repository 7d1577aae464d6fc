// Dispatch benchmarks
//
// Measures the cost of a typed call through the lookup cache, the untyped
// path, and a lookup that walks several superclasses.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use runtimekit::runtime::encoding::TypeTag;
use runtimekit::runtime::signature::MethodKind;
use runtimekit::runtime::{Implementation, perform_selector, registry};
use runtimekit::{Class, MethodCallRequest, Object, Selector, Value};
use std::str::FromStr;

fn counter_class(name: &str) -> Class {
    let class = registry::create_class(name).unwrap();
    class
        .add_method(
            Selector::from_str("add:to:").unwrap(),
            MethodKind::Instance,
            TypeTag::LongLong,
            &[TypeTag::Object, TypeTag::Selector, TypeTag::LongLong, TypeTag::LongLong],
            Implementation::new2(|_, _, a, b| {
                a.as_int().unwrap_or_default() + b.as_int().unwrap_or_default()
            }),
        )
        .unwrap();
    class
}

fn bench_typed_call(c: &mut Criterion) {
    let class = counter_class("BenchTyped");
    let object = Object::new(&class).unwrap();
    let request = MethodCallRequest::<i64>::new("add:to:").unwrap();
    let args = [Value::Int(1), Value::Int(2)];

    c.bench_function("dispatch_typed_two_args", |b| {
        b.iter(|| {
            let result = object.perform(&request, black_box(&args)).unwrap().unwrap();
            black_box(result.take_retained().unwrap())
        })
    });
}

fn bench_untyped_call(c: &mut Criterion) {
    let class = counter_class("BenchUntyped");
    let object = Object::new(&class).unwrap();
    let selector = Selector::from_str("add:to:").unwrap();
    let args = [Value::Int(1), Value::Int(2)];

    c.bench_function("dispatch_untyped_two_args", |b| {
        b.iter(|| black_box(perform_selector(&object, selector, black_box(&args)).unwrap()))
    });
}

fn bench_inherited_call(c: &mut Criterion) {
    let mut class = counter_class("BenchDepth0");
    for depth in 1..=5 {
        class = registry::create_subclass(&format!("BenchDepth{depth}"), &class).unwrap();
    }
    let object = Object::new(&class).unwrap();
    let request = MethodCallRequest::<i64>::new("add:to:").unwrap();
    let args = [Value::Int(1), Value::Int(2)];

    c.bench_function("dispatch_inherited_depth_5", |b| {
        b.iter(|| {
            let result = object.perform(&request, black_box(&args)).unwrap().unwrap();
            black_box(result.take_retained().unwrap())
        })
    });
}

criterion_group!(benches, bench_typed_call, bench_untyped_call, bench_inherited_call);
criterion_main!(benches);
