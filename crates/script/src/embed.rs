//! Process-wide registry of embed handlers.
//!
//! Text has universal compose/invert/transform semantics; embedded objects do
//! not. An application that wants two concurrent updates to the same embed to
//! merge (rather than clobber each other) registers an [`EmbedHandler`] for
//! that embed type. The algebra looks handlers up by the embed's top-level
//! type key whenever both sides of a pairing present structured values.
//!
//! The registry is module-level state behind a read-mostly lock: lookups
//! happen on every embed pairing inside the algebra, registration happens
//! once at startup. Handlers must be pure and are shared by `Arc`.

use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use crate::error::Error;
use crate::op::EmbedData;

/// Domain semantics for one embed type.
///
/// All three functions operate on the embed payload (the value under the
/// type key) and must be pure: same inputs, same output, no hidden state.
pub trait EmbedHandler: Send + Sync {
    /// Combines `a` then `b` applied in sequence into a single value.
    ///
    /// `keep_null` is true when the earlier side is a retain, meaning
    /// removal markers inside the payload must survive to reach the
    /// underlying document.
    fn compose(&self, a: &JsonValue, b: &JsonValue, keep_null: bool) -> JsonValue;

    /// Produces the value that undoes `change` against the embed state
    /// `base`.
    fn invert(&self, change: &JsonValue, base: &JsonValue) -> JsonValue;

    /// Rewrites `b` so it can apply after the concurrent `a`. With
    /// `priority`, `a` wins conflicts.
    fn transform(&self, a: &JsonValue, b: &JsonValue, priority: bool) -> JsonValue;
}

type Registry = HashMap<String, Arc<dyn EmbedHandler>>;

fn registry() -> &'static RwLock<Registry> {
    static REGISTRY: OnceLock<RwLock<Registry>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Registers `handler` for `embed_type`, replacing any previous handler.
pub fn register_embed(embed_type: impl Into<String>, handler: Arc<dyn EmbedHandler>) {
    registry()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(embed_type.into(), handler);
}

/// Removes the handler for `embed_type`, if any.
pub fn unregister_embed(embed_type: &str) {
    registry()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(embed_type);
}

/// The handler for `embed_type`, if one is registered.
pub(crate) fn lookup(embed_type: &str) -> Option<Arc<dyn EmbedHandler>> {
    registry()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(embed_type)
        .cloned()
}

/// The handler for `embed_type`, or [`Error::UnknownEmbedType`].
pub(crate) fn required(embed_type: &str) -> Result<Arc<dyn EmbedHandler>, Error> {
    lookup(embed_type).ok_or_else(|| Error::UnknownEmbedType(embed_type.to_string()))
}

/// Checks that two embed values agree on their type key.
pub(crate) fn matched_type<'a>(a: &'a EmbedData, b: &EmbedData) -> Result<&'a str, Error> {
    if a.embed_type == b.embed_type {
        Ok(&a.embed_type)
    } else {
        Err(Error::EmbedTypeMismatch {
            left: a.embed_type.clone(),
            right: b.embed_type.clone(),
        })
    }
}

/// Composes two matching embed values through their registered handler.
pub(crate) fn compose_embeds(
    a: &EmbedData,
    b: &EmbedData,
    keep_null: bool,
) -> Result<EmbedData, Error> {
    let handler = required(matched_type(a, b)?)?;
    Ok(EmbedData::new(
        a.embed_type.clone(),
        handler.compose(&a.data, &b.data, keep_null),
    ))
}

/// Inverts an embed update against its base value through the registered
/// handler.
pub(crate) fn invert_embeds(change: &EmbedData, base: &EmbedData) -> Result<EmbedData, Error> {
    let handler = required(matched_type(change, base)?)?;
    Ok(EmbedData::new(
        change.embed_type.clone(),
        handler.invert(&change.data, &base.data),
    ))
}
