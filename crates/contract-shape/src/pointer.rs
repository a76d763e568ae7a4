//! Fixture overrides addressed by JSON pointer

use serde_json::Value;

/// Replace the value at `pointer` (RFC 6901) with `replacement`
///
/// Returns `false` and leaves `value` untouched when nothing exists at
/// `pointer`; overrides never create new keys, so they cannot widen a
/// fixture's shape.
pub fn apply_override(value: &mut Value, pointer: &str, replacement: Value) -> bool {
    match value.pointer_mut(pointer) {
        Some(slot) => {
            *slot = replacement;
            true
        }
        None => false,
    }
}
