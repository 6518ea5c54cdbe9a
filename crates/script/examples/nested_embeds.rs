//! Registers an embed handler whose payloads are themselves change scripts,
//! then drives compose, invert and transform through it. This is the shape a
//! table-cell or comment-thread embed takes in a collaborative editor.
//!
//! Run with: `cargo run --example nested_embeds`

use cowrite_log::{init_simple_logger, LogLevel};
use script::{register_embed, EmbedHandler, JsonValue, Script};
use std::sync::Arc;

/// Embedded sub-documents: every handler call recurses into the script
/// algebra.
struct SubdocHandler;

impl EmbedHandler for SubdocHandler {
    fn compose(&self, a: &JsonValue, b: &JsonValue, _keep_null: bool) -> JsonValue {
        let a: Script = serde_json::from_value(a.clone()).unwrap_or_default();
        let b: Script = serde_json::from_value(b.clone()).unwrap_or_default();
        match a.compose(&b) {
            Ok(composed) => serde_json::to_value(composed).unwrap_or(JsonValue::Null),
            Err(err) => {
                tracing::warn!(%err, "nested compose failed; keeping original");
                serde_json::to_value(a).unwrap_or(JsonValue::Null)
            }
        }
    }

    fn invert(&self, change: &JsonValue, base: &JsonValue) -> JsonValue {
        let change: Script = serde_json::from_value(change.clone()).unwrap_or_default();
        let base: Script = serde_json::from_value(base.clone()).unwrap_or_default();
        match change.invert(&base) {
            Ok(inverted) => serde_json::to_value(inverted).unwrap_or(JsonValue::Null),
            Err(err) => {
                tracing::warn!(%err, "nested invert failed; emitting empty change");
                serde_json::to_value(Script::new()).unwrap_or(JsonValue::Null)
            }
        }
    }

    fn transform(&self, a: &JsonValue, b: &JsonValue, priority: bool) -> JsonValue {
        let a: Script = serde_json::from_value(a.clone()).unwrap_or_default();
        let b: Script = serde_json::from_value(b.clone()).unwrap_or_default();
        serde_json::to_value(a.transform(&b, priority)).unwrap_or(JsonValue::Null)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_simple_logger(LogLevel::Info)?;
    register_embed("subdoc", Arc::new(SubdocHandler));

    // A document holding one embedded sub-document.
    let cell = serde_json::to_value(Script::new().insert("alpha", None))?;
    let document = Script::new()
        .insert("Cell: ", None)
        .insert_embed("subdoc", cell, None)
        .insert("\n", None);
    tracing::info!(document = %document, "document with nested script");

    // Two users edit the same cell concurrently.
    let alice_update = serde_json::to_value(Script::new().retain(5, None).insert("!", None))?;
    let bob_update = serde_json::to_value(Script::new().insert(">> ", None))?;

    let alice = Script::new().retain(6, None).retain_embed("subdoc", alice_update, None);
    let bob = Script::new().retain(6, None).retain_embed("subdoc", bob_update, None);

    let bob_rebased = alice.transform(&bob, true);
    let converged = document.compose(&alice)?.compose(&bob_rebased)?;
    tracing::info!(converged = %converged, "both cell edits applied");

    // Undo Alice's edit against the original document.
    let undo_alice = alice.invert(&document)?;
    let without_alice = document.compose(&alice)?.compose(&undo_alice)?;
    tracing::info!(matches = without_alice == document, "alice's edit undone");

    Ok(())
}
