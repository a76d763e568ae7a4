use contract_shape::{escape_segment, shape_of, shapes_equal, Shape};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

/// Keys may contain the path separator and the escape character
const KEY_PATTERN: &str = "[A-Z][a-zA-Z.~]{0,8}";

fn arb_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        "[a-z0-9-]{0,12}".prop_map(Value::String),
    ]
}

fn arb_json() -> impl Strategy<Value = Value> {
    arb_leaf().prop_recursive(4, 64, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map(KEY_PATTERN, inner, 0..5)
                .prop_map(|entries| Value::Object(entries.into_iter().collect())),
        ]
    })
}

fn arb_object() -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::btree_map(KEY_PATTERN, arb_json(), 1..6)
        .prop_map(|entries| entries.into_iter().collect())
}

/// Swap every primitive for a different primitive, keeping all keys
fn rewrite_leaves(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), rewrite_leaves(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(rewrite_leaves).collect()),
        Value::Null => json!("was-null"),
        Value::Bool(b) => Value::Bool(!b),
        Value::Number(_) => json!("10.0.0.1"),
        Value::String(_) => json!(1_432_000_000),
    }
}

proptest! {
    #[test]
    fn prop_shape_is_reflexive(value in arb_json()) {
        prop_assert!(shapes_equal(&shape_of(&value), &shape_of(&value)));
    }

    #[test]
    fn prop_leaf_values_do_not_affect_shape(value in arb_json()) {
        let rewritten = rewrite_leaves(&value);
        prop_assert!(shapes_equal(&shape_of(&value), &shape_of(&rewritten)));
    }

    #[test]
    fn prop_removing_top_level_key_breaks_equality(object in arb_object()) {
        let full = Value::Object(object.clone());
        let mut reduced = object;
        let removed = reduced.keys().next().cloned().unwrap();
        reduced.remove(&removed);

        let expected = shape_of(&full);
        let actual = shape_of(&Value::Object(reduced));
        prop_assert!(!shapes_equal(&expected, &actual));
        prop_assert!(expected.diff(&actual).missing.contains(&escape_segment(&removed)));
    }

    #[test]
    fn prop_duplicating_array_elements_keeps_shape(items in prop::collection::vec(arb_json(), 0..4)) {
        let once = json!({"Items": items.clone()});
        let mut doubled_items = items.clone();
        doubled_items.extend(items);
        let twice = json!({"Items": doubled_items});
        prop_assert!(shapes_equal(&shape_of(&once), &shape_of(&twice)));
    }
}

#[test]
fn removing_a_dotted_sibling_is_detected() {
    let fixture = json!({"Monitoring": {"State": "disabled"}, "Monitoring.State": "disabled"});
    let live = json!({"Monitoring": {"State": "enabled"}});
    assert!(!shapes_equal(&shape_of(&fixture), &shape_of(&live)));
}

#[test]
fn diff_of_equal_shapes_is_empty() {
    let value = json!({"StoppingInstances": [{"CurrentState": {"Code": 64, "Name": "stopping"}}]});
    let shape: Shape = shape_of(&value);
    assert!(shape.diff(&shape.clone()).is_empty());
}
