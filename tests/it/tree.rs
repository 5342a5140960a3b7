use reactive_form::form::AnyControl;
use reactive_form::prelude::*;
use serde_json::{Map, Value, json};

fn address() -> FieldGroup {
    FieldGroup::builder()
        .field("city", FormField::new("beijing".to_string()))
        .field("zip", FormField::new("100000".to_string()))
        .build()
}

fn order() -> FieldGroup {
    FieldGroup::builder()
        .field("customer", FormField::new("alice".to_string()))
        .field("address", address())
        .field(
            "lines",
            FieldArray::with_factory([FormField::new(1_u32), FormField::new(2)], FormField::new),
        )
        .build()
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

#[test]
fn nested_value_is_a_plain_projection() {
    let order = order();
    assert_eq!(
        Value::Object(order.value()),
        json!({
            "customer": "alice",
            "address": {"city": "beijing", "zip": "100000"},
            "lines": [1, 2],
        })
    );
}

#[test]
fn deep_edits_bubble_up_without_caching() {
    let order = order();
    let lines = order
        .field::<FieldArray<FormField<u32>>>("lines")
        .expect("lines array");
    lines.push(FormField::new(3));
    assert!(order.is_dirty());
    assert!(order.is_touched());

    let city = order
        .field::<FieldGroup>("address")
        .and_then(|address| address.field::<FormField<String>>("city"))
        .expect("city field");
    city.set_errors(vec!["unknown city".into()]);
    assert!(!order.is_valid());
    assert!(order.errors().is_empty());

    order.set_field("address", address());
    assert!(order.is_valid());
}

#[test]
fn reset_reaches_nested_arrays_and_groups() {
    let order = order();
    order
        .reset(Some(object(json!({
            "customer": "bob",
            "address": {"city": "shanghai"},
            "lines": [5, 6, 7],
        }))))
        .expect("reset");

    assert_eq!(
        Value::Object(order.value()),
        json!({
            "customer": "bob",
            "address": {"city": "shanghai", "zip": "100000"},
            "lines": [5, 6, 7],
        })
    );
    assert!(!order.is_dirty());
    assert!(!order.is_touched());
}

#[test]
fn failed_reset_leaves_the_tree_untouched() {
    let lines = FieldArray::new([FormField::new(1_u32)]);
    let order = FieldGroup::builder()
        .field("customer", FormField::new("alice".to_string()))
        .field("lines", lines)
        .build();
    order
        .field::<FormField<String>>("customer")
        .expect("customer")
        .set_value("carol".into())
        .expect("set customer");

    let result = order.reset(Some(object(json!({
        "customer": "bob",
        "lines": [1, 2],
    }))));
    assert!(matches!(result, Err(FormError::MissingFieldFactory { .. })));
    assert_eq!(
        Value::Object(order.value()),
        json!({"customer": "carol", "lines": [1]})
    );
    assert!(order.is_dirty());
}

#[test]
fn heterogeneous_arrays_hold_erased_controls() {
    let rows: FieldArray<AnyControl> = FieldArray::new([
        erase(FormField::new(1)),
        erase(FormField::new("two".to_string())),
        erase(address()),
    ]);
    assert_eq!(
        json!(rows.value()),
        json!([1, "two", {"city": "beijing", "zip": "100000"}])
    );
    let second = rows.field(1).expect("second row");
    assert!(
        second
            .as_any()
            .downcast_ref::<FormField<String>>()
            .is_some()
    );
    second.set_value(json!("deux")).expect("set erased value");
    assert!(rows.is_dirty());
    assert!(matches!(
        second.set_value(json!(2)),
        Err(FormError::ValueMismatch { .. })
    ));
}

#[test]
fn replacing_children_resets_aggregation() {
    let order = order();
    order
        .field::<FormField<String>>("customer")
        .expect("customer")
        .set_value("bob".into())
        .expect("set customer");
    assert!(order.is_dirty());

    order.set_fields([
        ("customer", erase(FormField::new("dave".to_string()))),
        ("address", erase(address())),
    ]);
    assert!(!order.is_dirty());
    assert_eq!(order.keys(), vec!["customer", "address"]);
}
