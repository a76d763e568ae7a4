//! Contract Shape
//!
//! Structure-only comparison of nested API responses.
//!
//! # Core Concepts
//!
//! - [`Shape`]: Sorted set of dot-joined key paths present in a value; keys
//!   containing `.` or `~` are escaped so distinct keys never share a path
//! - [`ShapeDiff`]: Paths missing from / unexpected in an actual shape
//! - [`ValueKind`]: Top-level JSON type, for checks that only care about kind
//! - [`apply_override`]: JSON-pointer replacement applied to fixtures before
//!   their shape is taken
//!
//! Values never participate in equality: two responses that differ only in
//! IDs, timestamps or addresses have the same shape.
//!
//! # Example
//!
//! ```rust
//! use contract_shape::{shape_of, shapes_equal};
//! use serde_json::json;
//!
//! let fixture = json!({"Return": true, "Tags": [{"Key": "Name", "Value": "x"}]});
//! let live = json!({"Return": false, "Tags": [{"Key": "Env", "Value": "ci"}]});
//!
//! assert!(shapes_equal(&shape_of(&fixture), &shape_of(&live)));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod diff;
mod kind;
mod pointer;
mod shape;

pub use diff::ShapeDiff;
pub use kind::{kind_of, ValueKind};
pub use pointer::apply_override;
pub use shape::{escape_segment, shape_of, shapes_equal, Shape, PATH_SEPARATOR};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn override_then_compare() {
        let mut fixture = json!({
            "Reservations": [{
                "Instances": [{
                    "InstanceId": "i-1",
                    "Tags": [{"Key": "Name", "Value": "fixture"}]
                }]
            }]
        });
        let live = json!({
            "Reservations": [{
                "Instances": [{"InstanceId": "i-cb7b2946", "Tags": []}]
            }]
        });

        assert!(!shapes_equal(&shape_of(&fixture), &shape_of(&live)));

        assert!(apply_override(
            &mut fixture,
            "/Reservations/0/Instances/0/Tags",
            json!([])
        ));
        assert!(shapes_equal(&shape_of(&fixture), &shape_of(&live)));
    }

    #[test]
    fn diff_reports_both_directions() {
        let expected = shape_of(&json!({"a": 1, "b": {"c": 2}}));
        let actual = shape_of(&json!({"a": 1, "d": 3}));

        let diff = expected.diff(&actual);
        assert_eq!(diff.missing, vec!["b".to_string(), "b.c".to_string()]);
        assert_eq!(diff.unexpected, vec!["d".to_string()]);
        assert_eq!(kind_of(&json!({})), ValueKind::Object);
    }
}
