//! Attribute maps and their algebra.
//!
//! Attributes are the formatting layer of a change script: key/value pairs
//! attached to insert and retain operations (bold, italic, color, link,
//! header level, and any application-defined key). Values are arbitrary JSON.
//! The JSON value `null` is meaningful: inside `compose` it marks an
//! attribute for removal, and `invert`/`diff` produce it to record that a key
//! must be unset.
//!
//! The four operations here mirror the script-level algebra one floor down:
//! composing, inverting, diffing and transforming nothing but the formatting
//! of a single document position.

use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// A map of attribute names to JSON values.
///
/// Backed by a `BTreeMap` so attribute order is stable, which keeps equality
/// comparisons and serialized output deterministic.
pub type AttributeMap = BTreeMap<String, JsonValue>;

/// Static operations over attribute maps.
///
/// All four are pure and total: they never fail, and an empty result is
/// returned as `None` so callers can store "no attributes" uniformly.
pub struct AttributeMapOps;

impl AttributeMapOps {
    /// Composes two attribute maps, with `b` taking precedence.
    ///
    /// Used when applying sequential operations: the result carries every key
    /// of `b` plus the keys of `a` that `b` leaves untouched. When
    /// `keep_null` is false, keys whose final value is `null` are dropped
    /// from the result; when true they survive as explicit removals (needed
    /// when composing onto a retain, where the removal still has to reach
    /// the underlying content).
    pub fn compose(
        a: Option<&AttributeMap>,
        b: Option<&AttributeMap>,
        keep_null: bool,
    ) -> Option<AttributeMap> {
        let empty = AttributeMap::new();
        let a = a.unwrap_or(&empty);
        let b = b.unwrap_or(&empty);

        let mut result = AttributeMap::new();
        for (key, value) in a {
            if !b.contains_key(key) {
                result.insert(key.clone(), value.clone());
            }
        }
        for (key, value) in b {
            if keep_null || !value.is_null() {
                result.insert(key.clone(), value.clone());
            }
        }

        if result.is_empty() {
            None
        } else {
            Some(result)
        }
    }

    /// Records the changes needed to turn the attributes `a` into `b`.
    ///
    /// Keys with equal values are omitted. A key present in `a` but absent
    /// from `b` becomes `null` (an explicit removal); every other difference
    /// takes `b`'s value. Equality is deep structural equality of the JSON
    /// values.
    pub fn diff(a: Option<&AttributeMap>, b: Option<&AttributeMap>) -> Option<AttributeMap> {
        let empty = AttributeMap::new();
        let a = a.unwrap_or(&empty);
        let b = b.unwrap_or(&empty);

        let mut result = AttributeMap::new();
        for key in a.keys().chain(b.keys()) {
            if result.contains_key(key) {
                continue;
            }
            let a_val = a.get(key);
            let b_val = b.get(key);
            if a_val != b_val {
                result.insert(
                    key.clone(),
                    b_val.cloned().unwrap_or(JsonValue::Null),
                );
            }
        }

        if result.is_empty() {
            None
        } else {
            Some(result)
        }
    }

    /// Produces the attribute changes that undo `attr` against `base`.
    ///
    /// For each key `attr` touched, the inverse restores `base`'s value, or
    /// `null` when `base` never had the key. Keys of `base` that `attr`
    /// removed are restored as well.
    pub fn invert(
        attr: Option<&AttributeMap>,
        base: Option<&AttributeMap>,
    ) -> Option<AttributeMap> {
        let empty = AttributeMap::new();
        let attr = attr.unwrap_or(&empty);
        let base = base.unwrap_or(&empty);

        let mut result = AttributeMap::new();
        for (key, value) in attr {
            let base_value = base.get(key);
            if base_value != Some(value) {
                result.insert(
                    key.clone(),
                    base_value.cloned().unwrap_or(JsonValue::Null),
                );
            }
        }
        for (key, value) in base {
            if !attr.contains_key(key) {
                result.insert(key.clone(), value.clone());
            }
        }

        if result.is_empty() {
            None
        } else {
            Some(result)
        }
    }

    /// Reconciles concurrent attribute changes.
    ///
    /// With `priority` set, `a` was there first and wins every conflict: the
    /// result keeps only the keys of `b` that `a` does not touch. Without
    /// priority, `b` passes through unchanged.
    pub fn transform(
        a: Option<&AttributeMap>,
        b: Option<&AttributeMap>,
        priority: bool,
    ) -> Option<AttributeMap> {
        let empty = AttributeMap::new();
        let a = a.unwrap_or(&empty);
        let b = b.unwrap_or(&empty);

        if !priority {
            return if b.is_empty() { None } else { Some(b.clone()) };
        }

        let mut result = AttributeMap::new();
        for (key, value) in b {
            if !a.contains_key(key) {
                result.insert(key.clone(), value.clone());
            }
        }

        if result.is_empty() {
            None
        } else {
            Some(result)
        }
    }
}
