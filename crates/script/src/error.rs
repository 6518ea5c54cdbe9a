//! Error type shared by the fallible script algebra.
//!
//! Builder methods never fail; they normalize or no-op. Errors surface only
//! from `compose`, `invert` and `diff` when embed semantics are violated or
//! when `diff` is handed a script that is not a document.

/// Errors raised by the script algebra.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// An embed retain was applied to a position that does not hold an
    /// embedded object (for example a plain-text insert).
    #[error("cannot retain content that is not an embedded object")]
    CannotRetainNonObject,

    /// Two embed values were paired whose top-level type keys disagree.
    #[error("embed types do not match: {left:?} vs {right:?}")]
    EmbedTypeMismatch {
        /// Type key of the operation's embed value.
        left: String,
        /// Type key of the embed value it was paired with.
        right: String,
    },

    /// An algorithm needed an embed handler that was never registered.
    #[error("no embed handler registered for {0:?}")]
    UnknownEmbedType(String),

    /// `diff` was invoked on a script containing non-insert operations.
    /// The payload names the offending side.
    #[error("diff requires documents: the {0} script contains non-insert operations")]
    NotADocument(&'static str),
}
