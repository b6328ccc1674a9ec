//! Binary codec matrix: layout, round trips, offsets and malformed input.

use chrono::DateTime;
use modelplan::buffers::BufferError;
use modelplan::{
    BinaryCodec, DecodeError, EncodeError, FieldDecl, Instance, InstanceError, ModelDecl, NumberType, PlanError,
    Registry, TaggedCodec, TypeRef, Value,
};
use proptest::prelude::*;
use serde_json::json;

fn registry() -> Registry {
    let r = Registry::new();
    r.register(
        ModelDecl::new("Customer")
            .field(FieldDecl::string("_id").identity())
            .field(FieldDecl::string("name"))
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
    r.register(
        ModelDecl::new("Numbers")
            .field(FieldDecl::fixed("i8", NumberType::Int8))
            .field(FieldDecl::fixed("i16", NumberType::Int16))
            .field(FieldDecl::fixed("i32", NumberType::Int32))
            .field(FieldDecl::fixed("i64", NumberType::Int64))
            .field(FieldDecl::fixed("u8", NumberType::Uint8))
            .field(FieldDecl::fixed("u16", NumberType::Uint16))
            .field(FieldDecl::fixed("u32", NumberType::Uint32))
            .field(FieldDecl::fixed("u64", NumberType::Uint64))
            .field(FieldDecl::fixed("f32", NumberType::Float32))
            .field(FieldDecl::fixed("f64", NumberType::Float64)),
    )
    .unwrap();
    r
}

fn sample_order(registry: &Registry) -> Instance {
    let tagged = TaggedCodec::new(registry.clone());
    tagged
        .deserialize(
            "Order",
            &json!({
                "_id": "o-1",
                "number": 1001,
                "customer": {"_id": "c-1", "name": "Zoë", "email": "zoe@example.com"},
                "lines": [
                    {"sku": "A-1", "qty": 2, "price": 9.5},
                    {"sku": "B-2", "qty": 1}
                ],
                "tags": ["rush", "🎁"],
                "placed": 1_700_000_000_123i64,
                "meta": {"source": "web", "nested": {"ok": true}},
                "total": 39.25,
                "paid": true
            }),
        )
        .unwrap()
}

#[test]
fn round_trip_yields_equal_defined_fields() {
    let r = registry();
    let codec = BinaryCodec::new(r.clone());
    let order = sample_order(&r);
    let bytes = codec.encode(&order).unwrap();
    let back = codec.decode("Order", &bytes).unwrap();
    assert_eq!(back, order);
    assert!(!back.has_mutations());
    assert_eq!(
        back.get("placed"),
        Some(&Value::Date(DateTime::from_timestamp_millis(1_700_000_000_123).unwrap()))
    );
}

#[test]
fn undefined_fields_stay_absent() {
    let r = registry();
    let codec = BinaryCodec::new(r.clone());
    let mut order = r.instance("Order").unwrap();
    order.set("paid", false).unwrap();
    let back = codec.decode("Order", &codec.encode(&order).unwrap()).unwrap();
    let defined: Vec<&str> = back.iter().map(|(k, _)| k).collect();
    assert_eq!(defined, vec!["paid"]);
}

#[test]
fn explicit_null_decodes_as_undefined() {
    let r = registry();
    let codec = BinaryCodec::new(r.clone());
    let mut order = r.instance("Order").unwrap();
    order.set("customer", Value::Null).unwrap();
    order.set("total", 1.0).unwrap();
    let back = codec.decode("Order", &codec.encode(&order).unwrap()).unwrap();
    assert!(!back.is_defined("customer"));
    assert_eq!(back.get("total"), Some(&Value::Float(1.0)));
}

#[test]
fn presence_list_uses_declaration_indices() {
    let r = registry();
    let codec = BinaryCodec::new(r.clone());
    let mut order = r.instance("Order").unwrap();
    order.set("paid", true).unwrap();
    order.set("number", 7u32).unwrap();
    let bytes = codec.encode(&order).unwrap();
    assert_eq!(bytes, vec![0, 0, 0, 2, 1, 8, 0, 0, 0, 7, 1]);
}

#[test]
fn fixed_widths_round_trip_at_their_limits() {
    let r = registry();
    let codec = BinaryCodec::new(r.clone());
    let mut n = r.instance("Numbers").unwrap();
    n.set("i8", i64::from(i8::MIN)).unwrap();
    n.set("i16", i64::from(i16::MAX)).unwrap();
    n.set("i32", i64::from(i32::MIN)).unwrap();
    n.set("i64", i64::MAX).unwrap();
    n.set("u8", u64::from(u8::MAX)).unwrap();
    n.set("u16", u64::from(u16::MAX)).unwrap();
    n.set("u32", u64::from(u32::MAX)).unwrap();
    n.set("u64", u64::MAX).unwrap();
    n.set("f32", 1.5).unwrap();
    n.set("f64", -0.1).unwrap();

    let bytes = codec.encode(&n).unwrap();
    assert_eq!(bytes.len(), 4 + 10 + 1 + 2 + 4 + 8 + 1 + 2 + 4 + 8 + 4 + 8);
    let back = codec.decode("Numbers", &bytes).unwrap();
    assert_eq!(back, n);
}

#[test]
fn out_of_range_fixed_value_is_rejected_on_assignment() {
    let r = registry();
    let mut n = r.instance("Numbers").unwrap();
    let err = n.set("u16", 70_000i64).unwrap_err();
    assert_eq!(err.to_string(), "Numbers.u16: 70000 does not fit uint16");
    assert!(matches!(err, InstanceError::OutOfRange { .. }));
    assert!(!n.is_defined("u16"));
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
    let codec = BinaryCodec::new(r.clone());
    let reading = assigned_reading(&r);
    let back = codec.decode("Reading", &codec.encode(&reading).unwrap()).unwrap();
    assert_eq!(back, reading);
    assert_eq!(back.get("score"), Some(&Value::Float(5.0)));
    assert_eq!(back.get("qty"), Some(&Value::Uint(7)));
    assert_eq!(
        back.get("at"),
        Some(&Value::Date(DateTime::from_timestamp_millis(1_700_000_000_123).unwrap()))
    );
}

#[test]
fn decode_at_walks_concatenated_payloads() {
    let r = registry();
    let codec = BinaryCodec::new(r.clone());
    let order = sample_order(&r);
    let mut small = r.instance("Order").unwrap();
    small.set("tags", vec!["x"]).unwrap();

    let mut bytes = codec.encode(&order).unwrap();
    let first_len = bytes.len();
    bytes.extend(codec.encode(&small).unwrap());

    let (first, consumed) = codec.decode_at("Order", &bytes, 0).unwrap();
    assert_eq!(consumed, first_len);
    assert_eq!(first, order);
    let (second, consumed) = codec.decode_at("Order", &bytes, first_len).unwrap();
    assert_eq!(consumed, bytes.len() - first_len);
    assert_eq!(second, small);
}

#[test]
fn truncated_buffer_is_decode_error() {
    let r = registry();
    let codec = BinaryCodec::new(r.clone());
    let bytes = codec.encode(&sample_order(&r)).unwrap();
    for cut in [0, 3, 6, bytes.len() / 2, bytes.len() - 1] {
        let err = codec.decode("Order", &bytes[..cut]).unwrap_err();
        assert!(
            matches!(
                err.root_cause(),
                DecodeError::Buffer(BufferError::EndOfBuffer { .. })
            ),
            "cut at {cut}: {err}"
        );
    }
}

#[test]
fn invalid_json_blob_is_decode_error() {
    let r = registry();
    let codec = BinaryCodec::new(r.clone());
    // meta is field 6; "{" in base64 is "ew=="
    let bytes = [0, 0, 0, 1, 6, 0, 0, 0, 4, b'e', b'w', b'=', b'='];
    assert!(matches!(
        codec.decode("Order", &bytes).unwrap_err().root_cause(),
        DecodeError::InvalidJson(_)
    ));
}

#[test]
fn too_many_fields_is_encode_error() {
    let r = Registry::new();
    let wide = (0..257).fold(ModelDecl::new("Wide"), |decl, i| {
        decl.field(FieldDecl::bool(format!("f{i}")))
    });
    r.register(wide).unwrap();
    let codec = BinaryCodec::new(r.clone());
    let inst = r.instance("Wide").unwrap();
    assert!(matches!(
        codec.encode(&inst),
        Err(EncodeError::TooManyFields { count: 257, .. })
    ));
}

#[test]
fn unsupported_type_fails_plan_build() {
    let r = registry();
    r.register(ModelDecl::new("Loose").field(FieldDecl::new("x", TypeRef::Untyped)))
        .unwrap();
    let codec = BinaryCodec::new(r);
    assert!(matches!(
        codec.decode("Loose", &[0, 0, 0, 0]),
        Err(DecodeError::Plan(PlanError::UnsupportedType { .. }))
    ));
}

#[test]
fn cyclic_tree_round_trips() {
    let r = Registry::new();
    r.register(
        ModelDecl::new("Node")
            .field(FieldDecl::string("label"))
            .field(FieldDecl::array("children", TypeRef::model("Node"))),
    )
    .unwrap();
    let tagged = TaggedCodec::new(r.clone());
    let tree = tagged
        .deserialize(
            "Node",
            &json!({"label": "root", "children": [{"label": "a", "children": [{"label": "a.1"}]}, {"label": "b"}]}),
        )
        .unwrap();
    let codec = BinaryCodec::new(r);
    let back = codec.decode("Node", &codec.encode(&tree).unwrap()).unwrap();
    assert_eq!(back, tree);
}

fn chain_registry() -> Registry {
    let r = Registry::new();
    r.register(ModelDecl::new("Node").field(FieldDecl::model("next", "Node")))
        .unwrap();
    r
}

/// `levels` nested `Node`s, each with only `next` present.
fn chain(levels: usize) -> Vec<u8> {
    let mut bytes = [0, 0, 0, 1, 0].repeat(levels);
    bytes.extend([0, 0, 0, 0]);
    bytes
}

#[test]
fn deep_nesting_is_decode_error() {
    let codec = BinaryCodec::new(chain_registry());
    let err = codec.decode("Node", &chain(200_000)).unwrap_err();
    assert!(matches!(
        err.root_cause(),
        DecodeError::TooDeep { limit: 128, .. }
    ));
    assert!(err.to_string().starts_with("Node.next: Node.next: "));
}

#[test]
fn nesting_up_to_the_limit_decodes() {
    let codec = BinaryCodec::new(chain_registry());
    let mut node = codec.decode("Node", &chain(128)).unwrap();
    let mut depth = 0;
    while let Some(Value::Model(next)) = node.get("next") {
        node = next.clone();
        depth += 1;
    }
    assert_eq!(depth, 128);
    assert!(codec.decode("Node", &chain(129)).is_err());
}

#[test]
fn fingerprint_is_stable_per_key_order() {
    let r = registry();
    let codec = BinaryCodec::new(r);
    assert_eq!(
        codec.fingerprint("Order").unwrap(),
        codec.fingerprint("Order").unwrap()
    );
    assert_ne!(
        codec.fingerprint("Order").unwrap(),
        codec.fingerprint("Customer").unwrap()
    );
}

proptest! {
    #[test]
    fn arbitrary_scalars_round_trip(
        name in any::<String>(),
        qty in any::<u16>(),
        price in -1.0e12f64..1.0e12,
        tags in prop::collection::vec(any::<String>(), 0..8),
    ) {
        let r = Registry::new();
        r.register(
            ModelDecl::new("Row")
                .field(FieldDecl::string("name"))
                .field(FieldDecl::fixed("qty", NumberType::Uint16))
                .field(FieldDecl::fixed("price", NumberType::Float64))
                .field(FieldDecl::array("tags", TypeRef::String)),
        )
        .unwrap();
        let codec = BinaryCodec::new(r.clone());
        let mut row = r.instance("Row").unwrap();
        row.set("name", name).unwrap();
        row.set("qty", u64::from(qty)).unwrap();
        row.set("price", price).unwrap();
        row.set("tags", tags).unwrap();

        let back = codec.decode("Row", &codec.encode(&row).unwrap()).unwrap();
        prop_assert_eq!(back, row);
    }
}
