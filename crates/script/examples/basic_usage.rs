//! Basic usage of the change-script algebra:
//! - building a formatted document
//! - applying and inverting an edit
//! - transforming concurrent edits and cursor positions
//!
//! Run with: `cargo run --example basic_usage`

use cowrite_log::{init_simple_logger, LogLevel};
use script::{AttributeMap, Script};
use serde_json::json;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_simple_logger(LogLevel::Info)?;

    let mut bold = AttributeMap::new();
    bold.insert("bold".to_string(), json!(true));

    let mut gray = AttributeMap::new();
    gray.insert("color".to_string(), json!("#ccc"));

    // "Gandalf the Grey", with "Gandalf" bold and "Grey" in gray.
    let document = Script::new()
        .insert("Gandalf", Some(bold))
        .insert(" the ", None)
        .insert("Grey", Some(gray));
    tracing::info!(document = %document, length = document.length(), "built document");

    // Keep "Gandalf the ", replace "Grey" with "White".
    let mut white = AttributeMap::new();
    white.insert("color".to_string(), json!("#fff"));
    let change = Script::new()
        .retain(12, None)
        .insert("White", Some(white))
        .delete(4);

    let edited = document.compose(&change)?;
    tracing::info!(edited = %edited, "applied change");

    let undo = change.invert(&document)?;
    let restored = edited.compose(&undo)?;
    tracing::info!(restored = %restored, matches = restored == document, "undone");

    // Two users editing concurrently against the same document.
    let alice = Script::new().retain(7, None).insert(",", None);
    let bob = Script::new().retain(16, None).insert("!", None);

    let bob_rebased = alice.transform(&bob, true);
    let converged = document.compose(&alice)?.compose(&bob_rebased)?;
    tracing::info!(converged = %converged, "merged concurrent edits");

    // A cursor sitting after "Gandalf" follows Alice's insert.
    let cursor = alice.transform_position(7, false);
    tracing::info!(cursor, "cursor after transform");

    Ok(())
}
