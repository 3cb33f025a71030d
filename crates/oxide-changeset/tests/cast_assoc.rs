//! Tests for casting nested association input.

mod common;

use common::{change_inner, error_fields, EntityMany, EntityOne, EntityOnePointer, Inner};
use oxide_changeset::{params, Change, Changeset, FieldType, Map, Record, Value};

fn inner_params(field4: i64, field5: &str) -> Map {
    params! { "field4" => field4, "field5" => field5 }
}

// =============================================================================
// Single association
// =============================================================================

#[test]
fn test_cast_assoc_one() {
    let params = params! {
        "field1" => 1,
        "field2" => "2",
        "field3" => inner_params(4, "5"),
    };

    let mut ch = Changeset::cast(&EntityOne::default(), &params, &["field1", "field2"]);
    ch.cast_assoc("field3", change_inner);

    assert!(ch.is_valid());
    assert_eq!(ch.types(), EntityOne::FIELDS);
    assert_eq!(ch.field("field3").unwrap().ty, FieldType::One);
    assert_eq!(ch.values(), &params! { "field1" => 0_i64, "field2" => "" });

    assert_eq!(ch.get_change("field1"), Some(&Change::Value(Value::Int(1))));
    assert_eq!(ch.get_change("field2"), Some(&Change::Value(Value::Text("2".into()))));

    let expected = change_inner(Inner::default(), &inner_params(4, "5"));
    assert_eq!(ch.get_change("field3"), Some(&Change::One(Box::new(expected.clone()))));
    assert_eq!(ch.assoc_one("field3"), Some(&expected));
    assert_eq!(ch.changes().len(), 3);
}

#[test]
fn test_cast_assoc_one_pointer() {
    let params = params! {
        "field1" => 1,
        "field2" => "2",
        "field3" => inner_params(4, "5"),
    };

    let mut ch = Changeset::cast(&EntityOnePointer::default(), &params, &["field1", "field2"]);
    ch.cast_assoc("field3", change_inner);

    assert!(ch.is_valid());
    let field3 = ch.field("field3").unwrap();
    assert_eq!(field3.ty, FieldType::One);
    assert!(field3.nullable);
    assert!(ch.get_value("field3").is_none());

    let child = ch.assoc_one("field3").unwrap();
    assert_eq!(child.get_change("field4"), Some(&Change::Value(Value::Int(4))));
    assert_eq!(child.get_change("field5"), Some(&Change::Value(Value::Text("5".into()))));
}

#[test]
fn test_cast_assoc_one_absent_input_is_noop() {
    let params = params! { "field1" => 1 };
    let mut ch = Changeset::cast(&EntityOne::default(), &params, &["field1"]);
    ch.cast_assoc("field3", change_inner);

    assert!(ch.is_valid());
    assert!(ch.get_change("field3").is_none());
}

#[test]
fn test_cast_assoc_one_error_params_not_a_map() {
    let params = params! { "field1" => 1, "field2" => "2", "field3" => "3" };

    let mut ch = Changeset::cast(&EntityOne::default(), &params, &["field1", "field2"]);
    ch.cast_assoc("field3", change_inner);

    assert!(!ch.is_valid());
    assert_eq!(ch.errors().len(), 1);
    assert_eq!(ch.error().unwrap().to_string(), "field3 is invalid");
    assert_eq!(ch.error().unwrap().field, "field3");
    assert!(ch.get_change("field3").is_none());
}

#[test]
fn test_cast_assoc_one_inner_changeset_error() {
    let params = params! {
        "field1" => 1,
        "field2" => "2",
        "field3" => params! { "field4" => "abc" },
    };

    let mut ch = Changeset::cast(&EntityOne::default(), &params, &["field1", "field2"]);
    ch.cast_assoc("field3", change_inner);

    assert!(!ch.is_valid());
    assert_eq!(ch.error().unwrap().to_string(), "field4 is invalid");
    assert_eq!(ch.error().unwrap().field, "field3.field4");
    assert!(ch.assoc_one("field3").is_none());
}

#[test]
fn test_cast_assoc_on_scalar_field_is_invalid() {
    let params = params! { "field1" => params! { "x" => 1 } };
    let mut ch = Changeset::cast(&EntityOne::default(), &Map::new(), &[]);
    let mut with_params = Changeset::cast(&EntityOne::default(), &params, &[]);
    ch.cast_assoc("field1", change_inner);
    with_params.cast_assoc("field1", change_inner);

    assert!(ch.is_valid());
    assert_eq!(error_fields(&with_params), ["field1"]);
}

// =============================================================================
// Many association
// =============================================================================

#[test]
fn test_cast_assoc_many() {
    let params = params! {
        "field1" => 1,
        "field2" => "2",
        "field3" => vec![inner_params(14, "15"), inner_params(24, "25")],
    };

    let mut ch = Changeset::cast(&EntityMany::default(), &params, &["field1", "field2"]);
    ch.cast_assoc("field3", change_inner);

    assert!(ch.is_valid());
    assert_eq!(ch.field("field3").unwrap().ty, FieldType::Many);
    assert_eq!(ch.values(), &params! { "field1" => 0_i64, "field2" => "" });

    let expected = vec![
        change_inner(Inner::default(), &inner_params(14, "15")),
        change_inner(Inner::default(), &inner_params(24, "25")),
    ];
    assert_eq!(ch.get_change("field3"), Some(&Change::Many(expected.clone())));
    assert_eq!(ch.assoc_many("field3"), Some(expected.as_slice()));
}

#[test]
fn test_cast_assoc_many_from_json() {
    let json = serde_json::json!({
        "field1": 1,
        "field2": "2",
        "field3": [
            { "field4": 14, "field5": "15" },
            { "field4": 24, "field5": "25" },
        ],
    });
    let Value::Map(params) = Value::from(json) else {
        panic!("expected a map");
    };

    let mut ch = Changeset::cast(&EntityMany::default(), &params, &["field1", "field2"]);
    ch.cast_assoc("field3", change_inner);

    assert!(ch.is_valid());
    let children = ch.assoc_many("field3").unwrap();
    assert_eq!(children.len(), 2);
    assert_eq!(children[1].get_change("field4"), Some(&Change::Value(Value::Int(24))));
}

#[test]
fn test_cast_assoc_many_error_params_not_a_list() {
    let params = params! { "field1" => 1, "field2" => "2", "field3" => "3" };

    let mut ch = Changeset::cast(&EntityMany::default(), &params, &["field1", "field2"]);
    ch.cast_assoc("field3", change_inner);

    assert_eq!(ch.errors().len(), 1);
    assert_eq!(ch.error().unwrap().to_string(), "field3 is invalid");
}

#[test]
fn test_cast_assoc_many_error_mixed() {
    let params = params! {
        "field1" => 1,
        "field2" => "2",
        "field3" => vec![Value::Map(inner_params(14, "15")), Value::Text("3".into())],
    };

    let mut ch = Changeset::cast(&EntityMany::default(), &params, &["field1", "field2"]);
    ch.cast_assoc("field3", change_inner);

    assert_eq!(ch.errors().len(), 1);
    assert_eq!(ch.error().unwrap().to_string(), "field3 is invalid");
    assert!(ch.get_change("field3").is_none());
}

#[test]
fn test_cast_assoc_many_inner_changeset_error() {
    let params = params! {
        "field1" => 1,
        "field2" => "2",
        "field3" => vec![params! { "field4" => "abc" }],
    };

    let mut ch = Changeset::cast(&EntityMany::default(), &params, &["field1", "field2"]);
    ch.cast_assoc("field3", change_inner);

    assert_eq!(ch.error().unwrap().to_string(), "field4 is invalid");
    assert_eq!(ch.error().unwrap().field, "field3[0].field4");
}

#[test]
fn test_cast_assoc_many_reports_every_element() {
    let params = params! {
        "field3" => vec![
            params! { "field4" => "x" },
            inner_params(1, "ok"),
            params! { "field4" => "y", "field5" => true },
        ],
    };

    let mut ch = Changeset::cast(&EntityMany::default(), &params, &[]);
    ch.cast_assoc("field3", change_inner);

    assert_eq!(
        error_fields(&ch),
        ["field3[0].field4", "field3[2].field4", "field3[2].field5"]
    );
    assert!(ch.assoc_many("field3").is_none());
}

#[test]
fn test_cast_assoc_many_empty_list() {
    let params = params! { "field3" => Vec::<Value>::new() };

    let mut ch = Changeset::cast(&EntityMany::default(), &params, &[]);
    ch.cast_assoc("field3", change_inner);

    assert!(ch.is_valid());
    assert_eq!(ch.assoc_many("field3"), Some(&[][..]));
}
