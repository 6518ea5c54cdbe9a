//! # Cowrite change scripts
//!
//! A Rust implementation of rich-text change scripts for collaborative
//! editing. A change script is an ordered sequence of insert, delete and
//! retain operations that describes either a complete document or an edit
//! against one, with optional formatting attributes on every run of content
//! and pluggable semantics for embedded objects.
//!
//! The crate provides the operation algebra a real-time editor needs:
//! composing sequential edits, inverting an edit against its base, diffing
//! two documents, and transforming concurrent edits (and cursor positions)
//! so every participant converges on the same state.

pub mod attributes;
pub mod diff;
pub mod embed;
pub mod error;
pub mod op;
pub mod op_iterator;
pub mod script;

pub use attributes::{AttributeMap, AttributeMapOps};
pub use embed::{register_embed, unregister_embed, EmbedHandler};
pub use error::Error;
pub use op::{EmbedData, Op, OpKind};
pub use op_iterator::OpIterator;
pub use script::{Line, Lines, Script};

// Re-export for convenience
pub use serde_json::Value as JsonValue;
