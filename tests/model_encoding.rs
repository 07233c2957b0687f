//! End-to-end encode/decode tests
//!
//! Builds models through the public API and checks that records survive a
//! trip through each encoder.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use picobuf::{Config, Domain, Encoder, ErrorKind, FieldSpec, PicobufError, Shape, Value};
use serde_json::json;

fn record(json: serde_json::Value) -> Value {
    Value::from(json)
}

fn passthrough() -> Arc<Domain> {
    Domain::new(Config::default().with_encoder("none").shared())
}

// =============================================================================
// Wire order
// =============================================================================

#[test]
fn test_field_order_is_the_wire_order() {
    let domain = passthrough();
    let model = domain
        .create_model("TestModel", &json!({"field1": "number", "field2": "string"}))
        .unwrap();
    let data = record(json!({"field1": 123, "field2": "abc"}));

    assert_eq!(model.encode(&data).unwrap(), record(json!([123, "abc"])));
    assert_eq!(model.decode(&record(json!([123, "abc"]))).unwrap(), data);
}

#[test]
fn test_record_key_order_does_not_matter() {
    let domain = passthrough();
    let model = domain
        .create_model("TestModel", &json!({"field1": "number", "field2": "string"}))
        .unwrap();
    let data = record(json!({"field2": "abc", "field1": 123}));
    assert_eq!(model.encode(&data).unwrap(), record(json!([123, "abc"])));
}

#[test]
fn test_wire_slots_per_variant() {
    let domain = passthrough();
    domain.create_enum("Rank", ["ROOKIE", "VETERAN"]).unwrap();
    let model = domain
        .create_model(
            "Everything",
            &json!({
                "flag": "boolean",
                "price": "float",
                "rank": {"enum": "Rank"},
                "meta": "json",
            }),
        )
        .unwrap();
    let data = record(json!({
        "flag": false,
        "price": 0.1,
        "rank": "VETERAN",
        "meta": {"a": [1, 2]},
    }));

    let encoded = model.encode(&data).unwrap();
    assert_eq!(encoded, record(json!([0, "0.1", 1, {"a": [1, 2]}])));
    assert_eq!(model.decode(&encoded).unwrap(), data);
}

// =============================================================================
// Round trips through MessagePack
// =============================================================================

#[test]
fn test_round_trip_with_list_field() {
    let domain = Domain::with_defaults();
    let model = domain
        .create_model(
            "TestModel",
            &json!({"field1": {"type": ["number"]}, "field2": "string", "field3": "boolean"}),
        )
        .unwrap();
    let data = record(json!({"field1": [123, 456], "field2": "abc", "field3": true}));

    let bytes = model.encode_to_bytes(&data).unwrap();
    assert_eq!(model.decode_from_bytes(&bytes).unwrap(), data);
}

#[test]
fn test_round_trip_with_enum_field() {
    let domain = Domain::with_defaults();
    let rank = domain.create_enum("TestEnum", ["VALUE1", "VALUE2", "VALUE3"]).unwrap();
    let model = domain
        .create_model_from_fields(
            "TestModel",
            vec![
                ("field1".to_string(), FieldSpec::of("enum").with_enum(rank)),
                ("field2".to_string(), FieldSpec::of("string")),
                ("field3".to_string(), FieldSpec::of("boolean")),
            ],
        )
        .unwrap();
    let data = record(json!({"field1": "VALUE2", "field2": "abc", "field3": true}));

    let encoded = model.encode(&data).unwrap();
    assert_eq!(model.decode(&encoded).unwrap(), data);
}

#[test]
fn test_round_trip_with_nested_model() {
    let domain = Domain::with_defaults();
    domain
        .create_model("NestedModel", &json!({"nestedField": "string"}))
        .unwrap();
    let model = domain
        .create_model(
            "TestModel",
            &json!({"field1": "number", "field2": "NestedModel", "field3": "boolean"}),
        )
        .unwrap();
    let data = record(json!({"field1": 123, "field2": {"nestedField": "abc"}, "field3": true}));

    let encoded = model.encode(&data).unwrap();
    assert_eq!(model.decode(&encoded).unwrap(), data);
}

#[test]
fn test_nested_model_travels_as_its_own_payload() {
    let domain = passthrough();
    domain.create_model("Inner", &json!({"x": "integer"})).unwrap();
    let outer = domain
        .create_model("Outer", &json!({"inner": "Inner", "many": ["Inner"]}))
        .unwrap();
    let data = record(json!({"inner": {"x": 1}, "many": [{"x": 2}, {"x": 3}]}));

    let encoded = outer.encode(&data).unwrap();
    assert_eq!(encoded, record(json!([[1], [[2], [3]]])));
    assert_eq!(outer.decode(&encoded).unwrap(), data);
}

#[test]
fn test_round_trip_buffer_field() {
    let domain = Domain::with_defaults();
    let model = domain.create_model("Blob", &json!({"data": "buffer"})).unwrap();
    let mut data = picobuf::Map::new();
    data.insert("data".to_string(), Value::Bytes(vec![0, 1, 2, 255]));
    let data = Value::Map(data);

    let encoded = model.encode(&data).unwrap();
    assert_eq!(model.decode(&encoded).unwrap(), data);
}

#[test]
fn test_positional_round_trip() {
    let domain = Domain::with_defaults();
    let model = domain
        .create_model("Point", &json!(["float", "float", ["string", "origin"]]))
        .unwrap();
    assert_eq!(model.shape(), Shape::Positional);
    let data = record(json!([1.5, -2.25, "a"]));

    let encoded = model.encode(&data).unwrap();
    assert_eq!(model.decode(&encoded).unwrap(), data);
}

// =============================================================================
// Validation
// =============================================================================

#[test]
fn test_enum_membership() {
    let domain = Domain::with_defaults();
    domain.create_enum("Rank", ["ROOKIE", "VETERAN"]).unwrap();
    let model = domain.create_model("Player", &json!({"rank": {"enum": "Rank"}})).unwrap();

    model.validate(&record(json!({"rank": "ROOKIE"}))).unwrap();
    let err = model.validate(&record(json!({"rank": "CHAMPION"}))).unwrap_err();
    assert_eq!(err.to_string(), "Invalid enum value CHAMPION");
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn test_list_field_rejects_scalar() {
    let domain = Domain::with_defaults();
    let model = domain.create_model("Tags", &json!({"tags": ["string"]})).unwrap();
    let err = model.encode(&record(json!({"tags": "solo"}))).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Field \"tags\" should be an array of type string"
    );
}

#[test]
fn test_list_element_errors_name_the_field() {
    let domain = Domain::with_defaults();
    let model = domain.create_model("Tags", &json!({"ids": ["integer"]})).unwrap();
    let err = model.validate(&record(json!({"ids": [1, "two"]}))).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid type for field ids. Expected integer, got string"
    );
}

#[test]
fn test_unknown_foreign_model() {
    let domain = Domain::with_defaults();
    let err = domain
        .create_model("Team", &json!({"captain": "Nobody"}))
        .unwrap_err();
    assert!(matches!(err, PicobufError::ForeignModelNotFound { .. }));
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(domain.get_model("Team").is_none());
}

#[test]
fn test_object_mode_validates_only() {
    let domain = Domain::new(Config::default().with_object_mode(true).shared());
    let model = domain.create_model("User", &json!({"name": "string"})).unwrap();
    let data = record(json!({"name": "ann"}));

    assert_eq!(model.encode(&data).unwrap(), data);
    assert!(model.encode(&record(json!({"name": 1}))).is_err());
}

#[test]
fn test_models_with_own_config() {
    let domain = Domain::with_defaults();
    let loose = Config::default().with_strict(false).with_encoder("none").shared();
    let model = domain
        .create_model_with_config("Loose", &json!({"a": "string"}), loose)
        .unwrap();
    assert_eq!(model.encode(&record(json!({}))).unwrap(), record(json!([null])));
    assert!(Arc::ptr_eq(&domain.get_model("loose").unwrap(), &model));
}

// =============================================================================
// Explicit encoder instances
// =============================================================================

/// Passthrough encoder that counts its calls
#[derive(Debug, Default)]
struct CountingEncoder {
    encodes: AtomicUsize,
    decodes: AtomicUsize,
}

impl Encoder for CountingEncoder {
    fn name(&self) -> &'static str {
        "CountingEncoder"
    }

    fn encode(&self, values: Vec<Value>) -> picobuf::Result<Value> {
        self.encodes.fetch_add(1, Ordering::SeqCst);
        Ok(Value::Array(values))
    }

    fn decode(&self, payload: &Value) -> picobuf::Result<Vec<Value>> {
        self.decodes.fetch_add(1, Ordering::SeqCst);
        Ok(payload.as_array().map(|items| items.to_vec()).unwrap_or_default())
    }
}

#[test]
fn test_encoder_instance_is_bound_verbatim() {
    let counter = Arc::new(CountingEncoder::default());
    let config = Config::default()
        .with_encoder("msgpack")
        .with_encoder_instance(counter.clone());
    let domain = Domain::new(config.shared());
    let model = domain.create_model("Counted", &json!({"n": "integer"})).unwrap();
    assert_eq!(model.encoder().name(), "CountingEncoder");

    let data = record(json!({"n": 7}));
    let encoded = model.encode(&data).unwrap();
    assert_eq!(encoded, record(json!([7])));
    assert_eq!(counter.encodes.load(Ordering::SeqCst), 1);

    assert_eq!(model.decode(&encoded).unwrap(), data);
    assert_eq!(counter.decodes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_object_mode_never_calls_the_encoder() {
    let counter = Arc::new(CountingEncoder::default());
    let config = Config::default()
        .with_object_mode(true)
        .with_encoder_instance(counter.clone());
    let domain = Domain::new(config.shared());
    let model = domain.create_model("Counted", &json!({"n": "integer"})).unwrap();

    let data = record(json!({"n": 7}));
    assert_eq!(model.encode(&data).unwrap(), data);
    assert_eq!(model.decode(&data).unwrap(), data);
    assert!(model.encode(&record(json!({"n": "seven"}))).is_err());

    assert_eq!(counter.encodes.load(Ordering::SeqCst), 0);
    assert_eq!(counter.decodes.load(Ordering::SeqCst), 0);
}
