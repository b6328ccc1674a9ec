//! Tagged-value codec matrix: round trips, partial output, nesting, cycles.

use chrono::DateTime;
use modelplan::{
    DecodeError, DeserializeOptions, EncodeError, FieldDecl, Instance, ModelDecl, NumberType, PlanError, Registry,
    SerializeOptions, TaggedCodec, TrackedCollection, TypeRef, Value,
};
use serde_json::json;

fn registry() -> Registry {
    let r = Registry::new();
    r.register(
        ModelDecl::new("Customer")
            .field(FieldDecl::string("_id").identity())
            .field(FieldDecl::string("name").required())
            .field(FieldDecl::string("email")),
    )
    .unwrap();
    r.register(
        ModelDecl::new("LineItem")
            .field(FieldDecl::string("sku"))
            .field(FieldDecl::fixed("qty", NumberType::Uint16))
            .field(FieldDecl::fixed("price", NumberType::Float64)),
    )
    .unwrap();
    r.register(
        ModelDecl::new("Order")
            .field(FieldDecl::string("_id").identity())
            .field(FieldDecl::fixed("number", NumberType::Uint32))
            .field(FieldDecl::model("customer", "Customer"))
            .field(FieldDecl::array("lines", TypeRef::model("LineItem")))
            .field(FieldDecl::array("tags", TypeRef::String))
            .field(FieldDecl::date("placed"))
            .field(FieldDecl::object("meta"))
            .field(FieldDecl::number("total"))
            .field(FieldDecl::bool("paid")),
    )
    .unwrap();
    r.register(
        ModelDecl::new("Reading")
            .field(FieldDecl::number("score"))
            .field(FieldDecl::fixed("qty", NumberType::Uint16))
            .field(FieldDecl::array("xs", TypeRef::Number))
            .field(FieldDecl::date("at")),
    )
    .unwrap();
    r
}

fn order_json() -> serde_json::Value {
    json!({
        "_id": "o-1",
        "number": 1001,
        "customer": {"_id": "c-1", "name": "Ann", "email": "ann@example.com"},
        "lines": [
            {"sku": "A-1", "qty": 2, "price": 9.5},
            {"sku": "B-2", "qty": 1, "price": 20.25}
        ],
        "tags": ["rush", "gift"],
        "placed": 1_700_000_000_000i64,
        "meta": {"source": "web", "attempts": [1, 2]},
        "total": 39.25,
        "paid": false
    })
}

#[test]
fn round_trip_yields_equal_fields_and_clean_instance() {
    let codec = TaggedCodec::new(registry());
    let order = codec.deserialize("Order", &order_json()).unwrap();
    assert!(!order.has_mutations());
    assert_eq!(codec.serialize(&order).unwrap(), order_json());

    let again = codec.deserialize("Order", &codec.serialize(&order).unwrap()).unwrap();
    assert_eq!(again, order);
}

#[test]
fn decoded_values_are_typed() {
    let codec = TaggedCodec::new(registry());
    let order = codec.deserialize("Order", &order_json()).unwrap();
    assert_eq!(order.get("number"), Some(&Value::Uint(1001)));
    assert_eq!(order.get("total"), Some(&Value::Float(39.25)));
    assert_eq!(
        order.get("placed"),
        Some(&Value::Date(DateTime::from_timestamp_millis(1_700_000_000_000).unwrap()))
    );
    let customer = order.get("customer").and_then(Value::as_instance).unwrap();
    assert_eq!(customer.model_name(), "Customer");
    assert_eq!(customer.get("name"), Some(&Value::from("Ann")));
    let lines = order.get("lines").and_then(Value::as_array).unwrap();
    assert_eq!(lines.len(), 2);
    assert_eq!(
        lines[1].as_instance().and_then(|l| l.get("qty")),
        Some(&Value::Uint(1))
    );
}

fn assigned_reading(r: &Registry) -> Instance {
    let mut reading = r.instance("Reading").unwrap();
    reading.set("score", 5i64).unwrap();
    reading.set("qty", 7i32).unwrap();
    reading.set("xs", vec![1i64, 2]).unwrap();
    reading
        .set("at", DateTime::from_timestamp(1_700_000_000, 123_456_789).unwrap())
        .unwrap();
    reading
}

#[test]
fn assigned_values_round_trip_to_equal_instances() {
    let r = registry();
    let codec = TaggedCodec::new(r.clone());
    let reading = assigned_reading(&r);
    let back = codec.deserialize("Reading", &codec.serialize(&reading).unwrap()).unwrap();
    assert_eq!(back, reading);
    assert_eq!(back.get("score"), Some(&Value::Float(5.0)));
    assert_eq!(back.get("qty"), Some(&Value::Uint(7)));
    assert_eq!(
        back.get("at"),
        Some(&Value::Date(DateTime::from_timestamp_millis(1_700_000_000_123).unwrap()))
    );
}

#[test]
fn output_keys_follow_declaration_order() {
    let codec = TaggedCodec::new(registry());
    let mut order = codec.registry().instance("Order").unwrap();
    order.set("paid", true).unwrap();
    order.set("tags", vec!["x"]).unwrap();
    order.set("_id", "o-9").unwrap();
    let out = codec.serialize(&order).unwrap();
    let keys: Vec<&str> = out.as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["_id", "tags", "paid"]);
}

#[test]
fn undefined_omitted_null_included() {
    let codec = TaggedCodec::new(registry());
    let mut order = codec.registry().instance("Order").unwrap();
    order.set("customer", Value::Null).unwrap();
    assert_eq!(codec.serialize(&order).unwrap(), json!({"customer": null}));
}

#[test]
fn mutations_only_emits_dirty_fields() {
    let codec = TaggedCodec::new(registry());
    let mut order = codec
        .deserialize("Order", &json!({"_id": "o-1", "total": 1.0, "paid": false}))
        .unwrap();
    order.set("paid", true).unwrap();
    let partial = codec
        .serialize_with(&order, SerializeOptions { mutations_only: true })
        .unwrap();
    assert_eq!(partial, json!({"paid": true}));
}

#[test]
fn mutations_only_includes_array_op_logs_and_keeps_order() {
    let codec = TaggedCodec::new(registry());
    let mut order = codec
        .deserialize("Order", &json!({"tags": ["a"], "total": 3.0}))
        .unwrap();
    order.array_mut("tags").unwrap().push(vec![Value::from("b")]).unwrap();
    order.set("total", 4.0).unwrap();
    order.set("_id", "o-2").unwrap();
    let partial = codec
        .serialize_with(&order, SerializeOptions { mutations_only: true })
        .unwrap();
    let keys: Vec<&str> = partial.as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["tags", "total"]);
    assert_eq!(partial["tags"], json!(["a", "b"]));
}

#[test]
fn deserialize_without_clearing_keeps_assignments_dirty() {
    let codec = TaggedCodec::new(registry());
    let order = codec
        .deserialize_with(
            "Order",
            &order_json(),
            DeserializeOptions {
                clear_mutations: false,
            },
        )
        .unwrap();
    let dirty: Vec<&str> = order.mutations().keys().collect();
    assert_eq!(
        dirty,
        vec!["number", "customer", "lines", "tags", "placed", "meta", "total", "paid"]
    );
    let customer = order.get("customer").and_then(Value::as_instance).unwrap();
    assert!(!customer.has_mutations());
}

#[test]
fn embedded_changes_surface_through_has_mutations() {
    let codec = TaggedCodec::new(registry());
    let mut order = codec.deserialize("Order", &order_json()).unwrap();
    order
        .model_mut("customer")
        .unwrap()
        .set("email", "ann@new.example")
        .unwrap();
    assert!(order.mutations().is_empty());
    assert!(order.has_mutations());

    let customer = order.get("customer").and_then(Value::as_instance).unwrap();
    let partial = codec
        .serialize_with(customer, SerializeOptions { mutations_only: true })
        .unwrap();
    assert_eq!(partial, json!({"email": "ann@new.example"}));
}

#[test]
fn single_values_coerce_to_arrays() {
    let codec = TaggedCodec::new(registry());
    let order = codec
        .deserialize("Order", &json!({"lines": {"sku": "solo", "qty": 1}}))
        .unwrap();
    let lines = order.get("lines").and_then(Value::as_array).unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(
        codec.serialize(&order).unwrap(),
        json!({"lines": [{"sku": "solo", "qty": 1}]})
    );
}

#[test]
fn nested_type_mismatch_reports_path() {
    let codec = TaggedCodec::new(registry());
    let err = codec
        .deserialize("Order", &json!({"lines": [{"qty": "many"}]}))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Order.lines: LineItem.qty: expected uint16, found string"
    );
    assert!(matches!(
        err.root_cause(),
        DecodeError::TypeMismatch { expected: "uint16", found: "string" }
    ));
}

#[test]
fn encode_rejects_wrong_runtime_kind() {
    let codec = TaggedCodec::new(registry());
    let mut order = codec.registry().instance("Order").unwrap();
    order.set("paid", "yes").unwrap();
    assert!(matches!(
        codec.serialize(&order).unwrap_err().root_cause(),
        EncodeError::TypeMismatch { expected: "bool", found: "string" }
    ));
}

#[test]
fn unsupported_type_fails_plan_build() {
    let r = registry();
    r.register(
        ModelDecl::new("Loose")
            .field(FieldDecl::string("name"))
            .field(FieldDecl::new("anything", TypeRef::Untyped)),
    )
    .unwrap();
    r.register(ModelDecl::new("Dangling").field(FieldDecl::model("ghost", "Ghost")))
        .unwrap();
    let codec = TaggedCodec::new(r);

    let loose = codec.registry().instance("Loose").unwrap();
    assert!(matches!(
        codec.serialize(&loose),
        Err(EncodeError::Plan(PlanError::UnsupportedType { ref key, .. })) if key == "anything"
    ));
    assert!(matches!(
        codec.deserialize("Dangling", &json!({})),
        Err(DecodeError::Plan(PlanError::UnsupportedType { ref type_name, .. })) if type_name == "Ghost"
    ));
}

fn tree_registry() -> Registry {
    let r = Registry::new();
    r.register(
        ModelDecl::new("Node")
            .field(FieldDecl::string("label"))
            .field(FieldDecl::model("parent", "Node"))
            .field(FieldDecl::array("children", TypeRef::model("Node"))),
    )
    .unwrap();
    r
}

#[test]
fn cyclic_models_round_trip() {
    let codec = TaggedCodec::new(tree_registry());
    let input = json!({
        "label": "root",
        "children": [
            {"label": "a", "children": [{"label": "a.1"}]},
            {"label": "b", "parent": {"label": "root"}}
        ]
    });
    let root = codec.deserialize("Node", &input).unwrap();
    assert_eq!(codec.serialize(&root).unwrap(), input);

    let children = root.get("children").and_then(Value::as_array).unwrap();
    let grandchild: &Instance = children[0]
        .as_instance()
        .and_then(|a| a.get("children"))
        .and_then(Value::as_array)
        .and_then(|items| items[0].as_instance())
        .unwrap();
    assert_eq!(grandchild.get("label"), Some(&Value::from("a.1")));
}
