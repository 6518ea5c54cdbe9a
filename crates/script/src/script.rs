//! The change script: a normalized sequence of operations and the algebra
//! over it.
//!
//! A script is either a document (inserts only) or a change against a
//! document (any mix of insert, delete and retain). The builder methods keep
//! the sequence canonical as it grows; the algebra walks one or two scripts
//! through [`OpIterator`] and emits a fresh, normalized result.
//!
//! # Examples
//!
//! Building a document and editing it:
//! ```rust
//! use script::Script;
//!
//! let doc = Script::new().insert("Hello world", None);
//! let change = Script::new()
//!     .retain(6, None)
//!     .delete(5)
//!     .insert("Rust", None);
//! let edited = doc.compose(&change).unwrap();
//! ```

use crate::attributes::{AttributeMap, AttributeMapOps};
use crate::diff::{diff_text, DiffType};
use crate::embed;
use crate::error::Error;
use crate::op::{EmbedData, Op, OpKind};
use crate::op_iterator::OpIterator;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/// A change script: a document or a transformation of one.
///
/// Operations are stored normalized: no zero-length operations, mergeable
/// neighbors merged, and inserts ordered before the deletes they are
/// adjacent to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Script {
    ops: Vec<Op>,
}

impl Script {
    /// Creates an empty script.
    pub fn new() -> Self {
        Self { ops: Vec::new() }
    }

    /// Wraps an operation vector as-is, without renormalizing.
    ///
    /// Intended for operation lists that are already canonical (the output
    /// of the algebra, or a deserialized wire script). Use the builder
    /// methods to construct scripts from scratch.
    pub fn from_ops(ops: Vec<Op>) -> Self {
        Self { ops }
    }

    /// The operations of this script.
    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    /// Appends a text insert. A no-op when `text` is empty.
    pub fn insert<T: Into<String>>(self, text: T, attributes: Option<AttributeMap>) -> Self {
        let text = text.into();
        if text.is_empty() {
            return self;
        }
        self.push(Op::Insert {
            text,
            attributes: non_empty(attributes),
        })
    }

    /// Appends an embed insert occupying one document position.
    pub fn insert_embed(
        self,
        embed_type: impl Into<String>,
        data: JsonValue,
        attributes: Option<AttributeMap>,
    ) -> Self {
        self.push(Op::InsertEmbed {
            embed: EmbedData::new(embed_type, data),
            attributes: non_empty(attributes),
        })
    }

    /// Appends a delete. A no-op when `length` is 0.
    pub fn delete(self, length: usize) -> Self {
        if length == 0 {
            return self;
        }
        self.push(Op::Delete(length))
    }

    /// Appends a retain. A no-op when `length` is 0.
    pub fn retain(self, length: usize, attributes: Option<AttributeMap>) -> Self {
        if length == 0 {
            return self;
        }
        self.push(Op::Retain {
            length,
            attributes: non_empty(attributes),
        })
    }

    /// Appends an embed retain: a structured update aimed at the single
    /// embedded object at this position.
    pub fn retain_embed(
        self,
        embed_type: impl Into<String>,
        data: JsonValue,
        attributes: Option<AttributeMap>,
    ) -> Self {
        self.push(Op::RetainEmbed {
            embed: EmbedData::new(embed_type, data),
            attributes: non_empty(attributes),
        })
    }

    /// Appends an operation, maintaining the normalization invariants.
    ///
    /// Consecutive deletes merge, as do text inserts and integer retains
    /// with equal attributes. An insert landing right after a delete is
    /// placed before it, so inserts always precede deletes among adjacent
    /// non-retain operations. Embed operations never merge.
    pub fn push(mut self, new_op: Op) -> Self {
        let mut index = self.ops.len();
        if index == 0 {
            self.ops.push(new_op);
            return self;
        }

        if let (Some(Op::Delete(last_len)), Op::Delete(new_len)) =
            (self.ops.last_mut(), &new_op)
        {
            *last_len += new_len;
            return self;
        }

        // It does not matter whether the insert happens before or after the
        // delete at the same position; canonical order puts the insert first.
        if matches!(self.ops[index - 1], Op::Delete(_)) && new_op.is_insert() {
            index -= 1;
            if index == 0 {
                self.ops.insert(0, new_op);
                return self;
            }
        }

        let merged = match (&mut self.ops[index - 1], &new_op) {
            (
                Op::Insert { text, attributes },
                Op::Insert {
                    text: new_text,
                    attributes: new_attrs,
                },
            ) if attributes == new_attrs => {
                text.push_str(new_text);
                true
            }
            (
                Op::Retain { length, attributes },
                Op::Retain {
                    length: new_len,
                    attributes: new_attrs,
                },
            ) if attributes == new_attrs => {
                *length += new_len;
                true
            }
            _ => false,
        };
        if merged {
            return self;
        }

        if index == self.ops.len() {
            self.ops.push(new_op);
        } else {
            self.ops.insert(index, new_op);
        }
        self
    }

    /// Drops a trailing bare integer retain, putting the script into its
    /// canonical terminal form.
    pub fn chop(mut self) -> Self {
        if let Some(Op::Retain {
            attributes: None, ..
        }) = self.ops.last()
        {
            self.ops.pop();
        }
        self
    }

    /// Total number of document positions covered by this script.
    pub fn length(&self) -> usize {
        self.ops.iter().map(Op::length).sum()
    }

    /// Net change in document length were this script applied: inserts
    /// count positive, deletes negative, retains zero.
    pub fn change_length(&self) -> i64 {
        self.ops
            .iter()
            .map(|op| match op {
                Op::Insert { .. } | Op::InsertEmbed { .. } => op.length() as i64,
                Op::Delete(len) => -(*len as i64),
                Op::Retain { .. } | Op::RetainEmbed { .. } => 0,
            })
            .sum()
    }

    /// References to the operations satisfying `predicate`.
    pub fn filter<F>(&self, predicate: F) -> Vec<&Op>
    where
        F: Fn(&Op) -> bool,
    {
        self.ops.iter().filter(|op| predicate(op)).collect()
    }

    /// Visits every operation in order.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&Op),
    {
        for op in &self.ops {
            f(op);
        }
    }

    /// Maps every operation to a value.
    pub fn map<T, F>(&self, f: F) -> Vec<T>
    where
        F: Fn(&Op) -> T,
    {
        self.ops.iter().map(f).collect()
    }

    /// Splits the operations into those satisfying `predicate` and the rest.
    pub fn partition<F>(&self, predicate: F) -> (Vec<Op>, Vec<Op>)
    where
        F: Fn(&Op) -> bool,
    {
        self.ops.iter().cloned().partition(|op| predicate(op))
    }

    /// Folds over the operations.
    pub fn reduce<T, F>(&self, initial: T, f: F) -> T
    where
        F: Fn(T, &Op) -> T,
    {
        self.ops.iter().fold(initial, f)
    }

    /// Extracts the position range `[start, end)` as a new script.
    ///
    /// `None` for `end` means to the end of the script. Mostly useful on
    /// documents, where every position is an insert.
    pub fn slice(&self, start: usize, end: Option<usize>) -> Script {
        let end = end.unwrap_or(usize::MAX);
        let mut ops = Vec::new();
        let mut iter = OpIterator::new(&self.ops);
        let mut index = 0;

        while index < end && iter.has_next() {
            if index < start {
                index += iter.next(Some(start - index)).length();
            } else {
                let op = iter.next(Some(end - index));
                index += op.length();
                ops.push(op);
            }
        }

        Script::from_ops(ops)
    }

    /// Appends another script, normalizing across the seam.
    pub fn concat(&self, other: &Script) -> Script {
        let mut result = self.clone();
        if let Some((first, rest)) = other.ops.split_first() {
            result = result.push(first.clone());
            result.ops.extend(rest.iter().cloned());
        }
        result
    }

    /// Composes two sequential scripts into one.
    ///
    /// The result is equivalent to applying `self` and then `other`. When
    /// both sides address the same embedded object, the embed's registered
    /// handler merges the two values; a missing handler or a type mismatch
    /// aborts with an error.
    pub fn compose(&self, other: &Script) -> Result<Script, Error> {
        let mut this_iter = OpIterator::new(&self.ops);
        let mut other_iter = OpIterator::new(&other.ops);
        let mut result = Script::new();

        // A leading bare retain in `other` can pass whole inserts through
        // untouched instead of splitting them op by op.
        if let Some(Op::Retain {
            length,
            attributes: None,
        }) = other_iter.peek()
        {
            let length = *length;
            let mut first_left = length;
            while this_iter.peek_kind() == OpKind::Insert && this_iter.peek_length() <= first_left
            {
                first_left -= this_iter.peek_length();
                result = result.push(this_iter.next(None));
            }
            if length - first_left > 0 {
                other_iter.next(Some(length - first_left));
            }
        }

        while this_iter.has_next() || other_iter.has_next() {
            if other_iter.peek_kind() == OpKind::Insert {
                result = result.push(other_iter.next(None));
                continue;
            }
            if this_iter.peek_kind() == OpKind::Delete {
                result = result.push(this_iter.next(None));
                continue;
            }

            let length = this_iter.peek_length().min(other_iter.peek_length());
            let this_op = this_iter.next(Some(length));
            let other_op = other_iter.next(Some(length));

            if let Op::Delete(_) = other_op {
                // Content `self` retained is deleted; content it inserted
                // cancels against the delete without a trace.
                if this_op.is_retain() {
                    result = result.push(other_op);
                }
                continue;
            }

            let keep_null = matches!(this_op, Op::Retain { .. });
            let attributes =
                AttributeMapOps::compose(this_op.attributes(), other_op.attributes(), keep_null);
            let new_op = match &other_op {
                Op::Retain { .. } => match this_op {
                    Op::Retain { .. } => Op::Retain { length, attributes },
                    Op::Insert { text, .. } => Op::Insert { text, attributes },
                    Op::InsertEmbed { embed, .. } => Op::InsertEmbed { embed, attributes },
                    // An integer retain over a structured retain is a pure
                    // advance; the structured value passes through.
                    Op::RetainEmbed { embed, .. } => Op::RetainEmbed { embed, attributes },
                    Op::Delete(_) => continue,
                },
                Op::RetainEmbed {
                    embed: other_embed, ..
                } => match &this_op {
                    Op::Retain { .. } => Op::RetainEmbed {
                        embed: other_embed.clone(),
                        attributes,
                    },
                    Op::InsertEmbed { embed, .. } => Op::InsertEmbed {
                        embed: embed::compose_embeds(embed, other_embed, false)?,
                        attributes,
                    },
                    Op::RetainEmbed { embed, .. } => Op::RetainEmbed {
                        embed: embed::compose_embeds(embed, other_embed, true)?,
                        attributes,
                    },
                    Op::Insert { .. } => return Err(Error::CannotRetainNonObject),
                    Op::Delete(_) => continue,
                },
                _ => continue,
            };

            result = result.push(new_op.clone());

            // Once `other` is exhausted and the emitted op survived intact,
            // the rest of `self` passes through unchanged.
            if !other_iter.has_next() && result.ops.last() == Some(&new_op) {
                let rest = Script::from_ops(this_iter.rest());
                return Ok(result.concat(&rest).chop());
            }
        }

        Ok(result.chop())
    }

    /// Produces the script that undoes `self` against the document `base`.
    ///
    /// `base.compose(self)` followed by the returned script restores `base`.
    pub fn invert(&self, base: &Script) -> Result<Script, Error> {
        let mut inverted = Script::new();
        let mut base_index = 0;

        for op in &self.ops {
            match op {
                Op::Insert { .. } | Op::InsertEmbed { .. } => {
                    inverted = inverted.delete(op.length());
                }
                Op::Delete(length) => {
                    let slice = base.slice(base_index, Some(base_index + length));
                    for base_op in slice.ops() {
                        inverted = inverted.push(base_op.clone());
                    }
                    base_index += length;
                }
                Op::Retain { length, attributes } => {
                    if attributes.is_none() {
                        inverted = inverted.retain(*length, None);
                    } else {
                        let slice = base.slice(base_index, Some(base_index + length));
                        for base_op in slice.ops() {
                            let inverted_attrs = AttributeMapOps::invert(
                                attributes.as_ref(),
                                base_op.attributes(),
                            );
                            inverted = inverted.retain(base_op.length(), inverted_attrs);
                        }
                    }
                    base_index += length;
                }
                Op::RetainEmbed { embed, attributes } => {
                    let slice = base.slice(base_index, Some(base_index + 1));
                    let Some(base_op) = slice.ops().first() else {
                        return Err(Error::CannotRetainNonObject);
                    };
                    let Op::InsertEmbed {
                        embed: base_embed, ..
                    } = base_op
                    else {
                        return Err(Error::CannotRetainNonObject);
                    };
                    let inverted_attrs =
                        AttributeMapOps::invert(attributes.as_ref(), base_op.attributes());
                    inverted = inverted.push(Op::RetainEmbed {
                        embed: embed::invert_embeds(embed, base_embed)?,
                        attributes: inverted_attrs,
                    });
                    base_index += 1;
                }
            }
        }

        Ok(inverted.chop())
    }

    /// Diffs two documents, returning the script that turns `self` into
    /// `other`.
    ///
    /// Both sides must contain only inserts. The optional `cursor` hint is
    /// forwarded to the string diff to pin ambiguous edits near the caller's
    /// cursor.
    pub fn diff(&self, other: &Script, cursor: Option<usize>) -> Result<Script, Error> {
        if self.ops.iter().any(|op| !op.is_insert()) {
            return Err(Error::NotADocument("base"));
        }
        if other.ops.iter().any(|op| !op.is_insert()) {
            return Err(Error::NotADocument("target"));
        }
        if self.ops == other.ops {
            return Ok(Script::new());
        }

        let this_text = self.document_text();
        let other_text = other.document_text();
        let components = diff_text(&this_text, &other_text, cursor);

        let mut result = Script::new();
        let mut this_iter = OpIterator::new(&self.ops);
        let mut other_iter = OpIterator::new(&other.ops);

        for component in components {
            let mut length = component.length();
            while length > 0 {
                match component.operation {
                    DiffType::Insert => {
                        let op_length = other_iter.peek_length().min(length);
                        result = result.push(other_iter.next(Some(op_length)));
                        length -= op_length;
                    }
                    DiffType::Delete => {
                        let op_length = this_iter.peek_length().min(length);
                        this_iter.next(Some(op_length));
                        result = result.delete(op_length);
                        length -= op_length;
                    }
                    DiffType::Equal => {
                        let op_length = this_iter
                            .peek_length()
                            .min(other_iter.peek_length())
                            .min(length);
                        let this_op = this_iter.next(Some(op_length));
                        let other_op = other_iter.next(Some(op_length));

                        let content_equal = match (&this_op, &other_op) {
                            (Op::Insert { text: t1, .. }, Op::Insert { text: t2, .. }) => t1 == t2,
                            (
                                Op::InsertEmbed { embed: e1, .. },
                                Op::InsertEmbed { embed: e2, .. },
                            ) => e1 == e2,
                            _ => false,
                        };

                        if content_equal {
                            let attr_diff = AttributeMapOps::diff(
                                this_op.attributes(),
                                other_op.attributes(),
                            );
                            result = result.retain(op_length, attr_diff);
                        } else {
                            // Same placeholder, different embeds: replace.
                            result = result.push(other_op).delete(op_length);
                        }
                        length -= op_length;
                    }
                }
            }
        }

        Ok(result.chop())
    }

    /// Rewrites `other` so it applies after `self`, both having been made
    /// against the same base.
    ///
    /// With `priority`, `self` is considered the earlier edit: its inserts
    /// push `other`'s positions right, and its attribute changes win
    /// conflicts. Matching embed retains are reconciled through their
    /// registered handler when one exists; otherwise `other`'s value is
    /// kept.
    pub fn transform(&self, other: &Script, priority: bool) -> Script {
        let mut this_iter = OpIterator::new(&self.ops);
        let mut other_iter = OpIterator::new(&other.ops);
        let mut result = Script::new();

        while this_iter.has_next() || other_iter.has_next() {
            if this_iter.peek_kind() == OpKind::Insert
                && (priority || other_iter.peek_kind() != OpKind::Insert)
            {
                result = result.retain(this_iter.next(None).length(), None);
                continue;
            }
            if other_iter.peek_kind() == OpKind::Insert {
                result = result.push(other_iter.next(None));
                continue;
            }

            let length = this_iter.peek_length().min(other_iter.peek_length());
            let this_op = this_iter.next(Some(length));
            let other_op = other_iter.next(Some(length));

            if this_op.is_delete() {
                // Content is gone; their op has nothing left to act on.
                continue;
            }
            if other_op.is_delete() {
                result = result.push(other_op);
                continue;
            }

            let attributes =
                AttributeMapOps::transform(this_op.attributes(), other_op.attributes(), priority);
            let new_op = match (&this_op, &other_op) {
                (
                    Op::RetainEmbed { embed: a, .. },
                    Op::RetainEmbed { embed: b, .. },
                ) if a.embed_type == b.embed_type => match embed::lookup(&a.embed_type) {
                    Some(handler) => Op::RetainEmbed {
                        embed: EmbedData::new(
                            a.embed_type.clone(),
                            handler.transform(&a.data, &b.data, priority),
                        ),
                        attributes,
                    },
                    None => Op::RetainEmbed {
                        embed: b.clone(),
                        attributes,
                    },
                },
                (_, Op::RetainEmbed { embed, .. }) => Op::RetainEmbed {
                    embed: embed.clone(),
                    attributes,
                },
                _ => Op::Retain { length, attributes },
            };
            result = result.push(new_op);
        }

        result.chop()
    }

    /// Maps a position in the base document to its position after `self`.
    ///
    /// With `priority`, an insert exactly at the position does not push it
    /// right. `offset` tracks the base coordinate and advances by the full
    /// length of every operation, deletes included.
    pub fn transform_position(&self, index: usize, priority: bool) -> usize {
        let mut iter = OpIterator::new(&self.ops);
        let mut index = index;
        let mut offset = 0;

        while iter.has_next() && offset <= index {
            let length = iter.peek_length();
            let kind = iter.peek_kind();
            iter.next(None);

            match kind {
                OpKind::Delete => index -= length.min(index - offset),
                OpKind::Insert if offset < index || !priority => index += length,
                _ => {}
            }
            offset += length;
        }

        index
    }

    /// Iterates the lines of a document, splitting on `'\n'`.
    ///
    /// Each item carries the line's content (without its newline) and the
    /// attributes of the newline insert that ended it; a trailing line with
    /// no terminating newline carries no attributes. Iteration stops at the
    /// first non-insert operation.
    pub fn lines(&self) -> Lines<'_> {
        self.lines_sep('\n')
    }

    /// Iterates lines split on a custom separator character.
    pub fn lines_sep(&self, newline: char) -> Lines<'_> {
        Lines {
            iter: OpIterator::new(&self.ops),
            newline,
            line: Script::new(),
            done: false,
        }
    }

    /// The text of a document, with every embed standing in as U+0000.
    fn document_text(&self) -> String {
        let mut text = String::new();
        for op in &self.ops {
            match op {
                Op::Insert { text: t, .. } => text.push_str(t),
                Op::InsertEmbed { .. } => text.push('\0'),
                _ => {}
            }
        }
        text
    }
}

impl From<Vec<Op>> for Script {
    fn from(ops: Vec<Op>) -> Self {
        Script::from_ops(ops)
    }
}

impl fmt::Display for Script {
    /// Renders the canonical wire form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

/// One line of a document, yielded by [`Script::lines`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// The line's content, newline excluded.
    pub script: Script,
    /// Attributes of the newline insert that terminated the line, if any.
    pub attributes: Option<AttributeMap>,
}

/// Iterator over the lines of a document. See [`Script::lines`].
pub struct Lines<'a> {
    iter: OpIterator<'a>,
    newline: char,
    line: Script,
    done: bool,
}

impl Iterator for Lines<'_> {
    type Item = Line;

    fn next(&mut self) -> Option<Line> {
        if self.done {
            return None;
        }

        while self.iter.has_next() {
            if self.iter.peek_kind() != OpKind::Insert {
                self.done = true;
                return None;
            }
            let Some(op) = self.iter.peek() else {
                break;
            };
            let consumed = op.length() - self.iter.peek_length();
            let newline_at = match op {
                Op::Insert { text, .. } => text
                    .chars()
                    .skip(consumed)
                    .position(|c| c == self.newline),
                _ => None,
            };
            match newline_at {
                None => {
                    let rest = self.iter.next(None);
                    self.line = std::mem::take(&mut self.line).push(rest);
                }
                Some(0) => {
                    let newline_op = self.iter.next(Some(1));
                    let attributes = newline_op.attributes().cloned();
                    let script = std::mem::take(&mut self.line);
                    return Some(Line { script, attributes });
                }
                Some(to_newline) => {
                    let run = self.iter.next(Some(to_newline));
                    self.line = std::mem::take(&mut self.line).push(run);
                }
            }
        }

        self.done = true;
        if self.line.length() > 0 {
            let script = std::mem::take(&mut self.line);
            return Some(Line {
                script,
                attributes: None,
            });
        }
        None
    }
}

fn non_empty(attributes: Option<AttributeMap>) -> Option<AttributeMap> {
    attributes.filter(|attrs| !attrs.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::{register_embed, EmbedHandler};
    use serde_json::json;
    use std::sync::Arc;

    fn attrs(items: &[(&str, JsonValue)]) -> Option<AttributeMap> {
        Some(
            items
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    /// Embed payloads that are themselves scripts, composed and transformed
    /// recursively. Mirrors how a rich-text cell inside a table embed
    /// behaves.
    struct SubdocHandler;

    impl EmbedHandler for SubdocHandler {
        fn compose(&self, a: &JsonValue, b: &JsonValue, _keep_null: bool) -> JsonValue {
            let a: Script = serde_json::from_value(a.clone()).unwrap_or_default();
            let b: Script = serde_json::from_value(b.clone()).unwrap_or_default();
            serde_json::to_value(a.compose(&b).expect("subdoc compose")).expect("subdoc json")
        }

        fn invert(&self, change: &JsonValue, base: &JsonValue) -> JsonValue {
            let change: Script = serde_json::from_value(change.clone()).unwrap_or_default();
            let base: Script = serde_json::from_value(base.clone()).unwrap_or_default();
            serde_json::to_value(change.invert(&base).expect("subdoc invert"))
                .expect("subdoc json")
        }

        fn transform(&self, a: &JsonValue, b: &JsonValue, priority: bool) -> JsonValue {
            let a: Script = serde_json::from_value(a.clone()).unwrap_or_default();
            let b: Script = serde_json::from_value(b.clone()).unwrap_or_default();
            serde_json::to_value(a.transform(&b, priority)).expect("subdoc json")
        }
    }

    fn register_subdoc() {
        register_embed("subdoc", Arc::new(SubdocHandler));
    }

    #[test]
    fn test_inserts_merge() {
        let script = Script::new().insert("Hello", None).insert(" World", None);
        assert_eq!(
            script.ops(),
            &[Op::Insert {
                text: "Hello World".to_string(),
                attributes: None
            }]
        );
    }

    #[test]
    fn test_inserts_with_different_attributes_do_not_merge() {
        let script = Script::new()
            .insert("ab", None)
            .insert("c", attrs(&[("bold", json!(true))]));
        assert_eq!(script.ops().len(), 2);
        assert_eq!(
            script.ops()[1],
            Op::Insert {
                text: "c".to_string(),
                attributes: attrs(&[("bold", json!(true))]),
            }
        );
    }

    #[test]
    fn test_deletes_merge_and_zero_length_is_elided() {
        let script = Script::new().delete(5).delete(3).delete(0).retain(0, None);
        assert_eq!(script.ops(), &[Op::Delete(8)]);
        assert!(Script::new().insert("", None).ops().is_empty());
    }

    #[test]
    fn test_insert_is_placed_before_delete() {
        let script = Script::new().retain(2, None).delete(5).insert("Hello", None);
        assert_eq!(
            script.ops(),
            &[
                Op::Retain {
                    length: 2,
                    attributes: None
                },
                Op::Insert {
                    text: "Hello".to_string(),
                    attributes: None
                },
                Op::Delete(5),
            ]
        );
    }

    #[test]
    fn test_insert_before_delete_merges_with_predecessor() {
        let script = Script::new().insert("a", None).delete(3).insert("b", None);
        assert_eq!(
            script.ops(),
            &[
                Op::Insert {
                    text: "ab".to_string(),
                    attributes: None
                },
                Op::Delete(3),
            ]
        );
    }

    #[test]
    fn test_insert_before_delete_at_head() {
        let script = Script::new().delete(3).insert("b", None);
        assert_eq!(
            script.ops(),
            &[
                Op::Insert {
                    text: "b".to_string(),
                    attributes: None
                },
                Op::Delete(3),
            ]
        );
    }

    #[test]
    fn test_embed_inserts_never_merge() {
        let script = Script::new()
            .insert_embed("image", json!({"url": "a"}), None)
            .insert_embed("image", json!({"url": "a"}), None);
        assert_eq!(script.ops().len(), 2);
    }

    #[test]
    fn test_chop_drops_only_bare_trailing_retain() {
        let script = Script::new().insert("Hi", None).retain(4, None).chop();
        assert_eq!(script.ops().len(), 1);

        let script = Script::new()
            .insert("Hi", None)
            .retain(4, attrs(&[("bold", json!(true))]))
            .chop();
        assert_eq!(script.ops().len(), 2);
    }

    #[test]
    fn test_length_and_change_length() {
        let script = Script::new().insert("Hello", None).retain(5, None).delete(3);
        assert_eq!(script.length(), 13);
        assert_eq!(script.change_length(), 2);

        let doc = Script::new()
            .insert("ab", None)
            .insert_embed("image", json!({"url": "x"}), None);
        assert_eq!(doc.length(), 3);
        assert_eq!(doc.change_length(), 3);
    }

    #[test]
    fn test_slice() {
        let doc = Script::new().insert("Hello World", None);
        assert_eq!(
            doc.slice(0, Some(5)).ops(),
            &[Op::Insert {
                text: "Hello".to_string(),
                attributes: None
            }]
        );
        assert_eq!(
            doc.slice(6, None).ops(),
            &[Op::Insert {
                text: "World".to_string(),
                attributes: None
            }]
        );
    }

    #[test]
    fn test_concat_merges_at_the_seam() {
        let left = Script::new().insert("Hello", None);
        let right = Script::new().insert(" World", None).retain(2, None);
        let joined = left.concat(&right);
        assert_eq!(
            joined.ops(),
            &[
                Op::Insert {
                    text: "Hello World".to_string(),
                    attributes: None
                },
                Op::Retain {
                    length: 2,
                    attributes: None
                },
            ]
        );
    }

    #[test]
    fn test_compose_overlapping_deletes() {
        let first = Script::new().retain(5, None).delete(1);
        let second = Script::new().retain(4, None).delete(1);
        let composed = first.compose(&second).unwrap();
        assert_eq!(
            composed.ops(),
            &[
                Op::Retain {
                    length: 4,
                    attributes: None
                },
                Op::Delete(2),
            ]
        );
    }

    #[test]
    fn test_compose_insert_and_retain_attributes() {
        let doc = Script::new().insert("Hello", None);
        let format = Script::new().retain(5, attrs(&[("bold", json!(true))]));
        let composed = doc.compose(&format).unwrap();
        assert_eq!(
            composed.ops(),
            &[Op::Insert {
                text: "Hello".to_string(),
                attributes: attrs(&[("bold", json!(true))]),
            }]
        );
    }

    #[test]
    fn test_compose_insert_cancels_against_delete() {
        let first = Script::new().insert("Hello", None);
        let second = Script::new().delete(5);
        assert_eq!(first.compose(&second).unwrap(), Script::new());
    }

    #[test]
    fn test_compose_retain_keeps_null_for_later_content() {
        // Unsetting an attribute through two retains must survive so it can
        // reach the underlying document.
        let first = Script::new().retain(3, attrs(&[("bold", json!(true))]));
        let second = Script::new().retain(3, attrs(&[("bold", json!(null))]));
        let composed = first.compose(&second).unwrap();
        assert_eq!(
            composed.ops(),
            &[Op::Retain {
                length: 3,
                attributes: attrs(&[("bold", json!(null))]),
            }]
        );
    }

    #[test]
    fn test_compose_length_preservation_over_documents() {
        let doc = Script::new().insert("Hello World", None);
        let change = Script::new().retain(6, None).insert("brave ", None).delete(5);
        let composed = doc.compose(&change).unwrap();
        assert_eq!(
            composed.length() as i64,
            doc.length() as i64 + change.change_length()
        );
    }

    #[test]
    fn test_compose_is_associative_over_documents() {
        let doc = Script::new().insert("Hello World", None);
        let a = Script::new().retain(6, None).insert("brave ", None);
        let b = Script::new().retain(2, None).delete(3);

        let left = doc.compose(&a).unwrap().compose(&b).unwrap();
        let right = doc.compose(&a.compose(&b).unwrap()).unwrap();
        assert_eq!(left, right);
    }

    #[test]
    fn test_compose_prefix_optimization_passes_inserts_through() {
        let doc = Script::new()
            .insert("Hello", attrs(&[("bold", json!(true))]))
            .insert(" World", None);
        let change = Script::new().retain(7, None).insert("X", None);
        let composed = doc.compose(&change).unwrap();
        assert_eq!(
            composed.ops(),
            &[
                Op::Insert {
                    text: "Hello".to_string(),
                    attributes: attrs(&[("bold", json!(true))]),
                },
                Op::Insert {
                    text: " WXorld".to_string(),
                    attributes: None
                },
            ]
        );
    }

    #[test]
    fn test_compose_embed_retain_over_embed_insert() {
        register_subdoc();
        let cell = serde_json::to_value(Script::new().insert("ab", None)).unwrap();
        let update = serde_json::to_value(Script::new().retain(2, None).insert("c", None)).unwrap();

        let doc = Script::new().insert_embed("subdoc", cell, None);
        let change = Script::new().retain_embed("subdoc", update, None);

        let composed = doc.compose(&change).unwrap();
        let expected = serde_json::to_value(Script::new().insert("abc", None)).unwrap();
        assert_eq!(
            composed.ops(),
            &[Op::InsertEmbed {
                embed: EmbedData::new("subdoc", expected),
                attributes: None,
            }]
        );
    }

    #[test]
    fn test_compose_embed_retain_over_embed_retain() {
        register_subdoc();
        let first = serde_json::to_value(Script::new().insert("x", None)).unwrap();
        let second = serde_json::to_value(Script::new().retain(1, None).insert("y", None)).unwrap();

        let a = Script::new().retain_embed("subdoc", first, None);
        let b = Script::new().retain_embed("subdoc", second, None);

        let composed = a.compose(&b).unwrap();
        let expected = serde_json::to_value(Script::new().insert("xy", None)).unwrap();
        assert_eq!(
            composed.ops(),
            &[Op::RetainEmbed {
                embed: EmbedData::new("subdoc", expected),
                attributes: None,
            }]
        );
    }

    #[test]
    fn test_compose_integer_retain_passes_embed_retain_through() {
        // No handler registered for this type; a pure advance on the other
        // side must not need one.
        let a = Script::new().retain_embed("gadget", json!({"spin": 1}), None);
        let b = Script::new().retain(1, attrs(&[("bold", json!(true))]));
        let composed = a.compose(&b).unwrap();
        assert_eq!(
            composed.ops(),
            &[Op::RetainEmbed {
                embed: EmbedData::new("gadget", json!({"spin": 1})),
                attributes: attrs(&[("bold", json!(true))]),
            }]
        );
    }

    #[test]
    fn test_compose_unknown_embed_type_fails() {
        let a = Script::new().insert_embed("widget-unknown", json!({"a": 1}), None);
        let b = Script::new().retain_embed("widget-unknown", json!({"b": 2}), None);
        assert_eq!(
            a.compose(&b).err(),
            Some(Error::UnknownEmbedType("widget-unknown".to_string()))
        );
    }

    #[test]
    fn test_compose_mismatched_embed_types_fail() {
        register_subdoc();
        let a = Script::new().insert_embed("image", json!({"url": "x"}), None);
        let b = Script::new().retain_embed("subdoc", json!([]), None);
        assert_eq!(
            a.compose(&b).err(),
            Some(Error::EmbedTypeMismatch {
                left: "image".to_string(),
                right: "subdoc".to_string(),
            })
        );
    }

    #[test]
    fn test_compose_embed_retain_over_text_fails() {
        let a = Script::new().insert("x", None);
        let b = Script::new().retain_embed("subdoc", json!([]), None);
        assert_eq!(a.compose(&b).err(), Some(Error::CannotRetainNonObject));
    }

    #[test]
    fn test_invert_insert_and_delete() {
        let base = Script::new().insert("Hello World", None);
        let change = Script::new().retain(6, None).delete(5).insert("Rust", None);

        let inverted = change.invert(&base).unwrap();
        let applied = base.compose(&change).unwrap();
        assert_eq!(applied.compose(&inverted).unwrap(), base);
    }

    #[test]
    fn test_invert_attributed_retain() {
        let base = Script::new().insert("Hello", attrs(&[("bold", json!(true))]));
        let change = Script::new().retain(5, attrs(&[("bold", json!(null)), ("italic", json!(true))]));

        let inverted = change.invert(&base).unwrap();
        let applied = base.compose(&change).unwrap();
        assert_eq!(applied.compose(&inverted).unwrap(), base);
    }

    #[test]
    fn test_invert_bare_retain_stays_bare() {
        let base = Script::new().insert("abcdef", None);
        let change = Script::new().retain(2, None).delete(2);
        let inverted = change.invert(&base).unwrap();
        assert_eq!(
            inverted.ops(),
            &[
                Op::Retain {
                    length: 2,
                    attributes: None
                },
                Op::Insert {
                    text: "cd".to_string(),
                    attributes: None
                },
            ]
        );
    }

    #[test]
    fn test_invert_embed_retain_through_handler() {
        register_subdoc();
        let cell = serde_json::to_value(Script::new().insert("ab", None)).unwrap();
        let update = serde_json::to_value(Script::new().delete(1)).unwrap();

        let base = Script::new().insert_embed("subdoc", cell, None);
        let change = Script::new().retain_embed("subdoc", update, None);

        let inverted = change.invert(&base).unwrap();
        let applied = base.compose(&change).unwrap();
        assert_eq!(applied.compose(&inverted).unwrap(), base);
    }

    #[test]
    fn test_invert_embed_retain_over_text_fails() {
        let base = Script::new().insert("x", None);
        let change = Script::new().retain_embed("subdoc", json!([]), None);
        assert_eq!(change.invert(&base).err(), Some(Error::CannotRetainNonObject));
    }

    #[test]
    fn test_diff_replaces_a_character() {
        let a = Script::new().insert("Hello", None);
        let b = Script::new().insert("Hallo", None);
        let diff = a.diff(&b, None).unwrap();
        assert_eq!(
            diff.ops(),
            &[
                Op::Retain {
                    length: 1,
                    attributes: None
                },
                Op::Insert {
                    text: "a".to_string(),
                    attributes: None
                },
                Op::Delete(1),
                Op::Retain {
                    length: 3,
                    attributes: None
                },
            ]
        );
        assert_eq!(a.compose(&diff).unwrap(), b);
    }

    #[test]
    fn test_diff_attribute_only_change() {
        let a = Script::new().insert("Hello", None);
        let b = Script::new().insert("Hello", attrs(&[("bold", json!(true))]));
        let diff = a.diff(&b, None).unwrap();
        assert_eq!(
            diff.ops(),
            &[Op::Retain {
                length: 5,
                attributes: attrs(&[("bold", json!(true))]),
            }]
        );
        assert_eq!(a.compose(&diff).unwrap(), b);
    }

    #[test]
    fn test_diff_replaces_mismatched_embeds() {
        let a = Script::new().insert_embed("image", json!({"url": "a"}), None);
        let b = Script::new().insert_embed("image", json!({"url": "b"}), None);
        let diff = a.diff(&b, None).unwrap();
        assert_eq!(
            diff.ops(),
            &[
                Op::InsertEmbed {
                    embed: EmbedData::new("image", json!({"url": "b"})),
                    attributes: None,
                },
                Op::Delete(1),
            ]
        );
        assert_eq!(a.compose(&diff).unwrap(), b);
    }

    #[test]
    fn test_diff_identical_documents_is_empty() {
        let a = Script::new().insert("same", None);
        assert_eq!(a.diff(&a.clone(), None).unwrap(), Script::new());
    }

    #[test]
    fn test_diff_rejects_non_documents() {
        let doc = Script::new().insert("ab", None);
        let change = Script::new().retain(1, None).insert("b", None);
        assert_eq!(change.diff(&doc, None).err(), Some(Error::NotADocument("base")));
        assert_eq!(doc.diff(&change, None).err(), Some(Error::NotADocument("target")));
    }

    #[test]
    fn test_diff_with_cursor_hint() {
        let a = Script::new().insert("aaa", None);
        let b = Script::new().insert("aaaa", None);

        let hinted = a.diff(&b, Some(1)).unwrap();
        assert_eq!(
            hinted.ops(),
            &[
                Op::Retain {
                    length: 1,
                    attributes: None
                },
                Op::Insert {
                    text: "a".to_string(),
                    attributes: None
                },
            ]
        );
        assert_eq!(a.compose(&hinted).unwrap(), b);
    }

    #[test]
    fn test_transform_priority_breaks_insert_ties() {
        let a = Script::new().insert("A", None);
        let b = Script::new().insert("B", None);

        let with_priority = a.transform(&b, true);
        assert_eq!(
            with_priority.ops(),
            &[
                Op::Retain {
                    length: 1,
                    attributes: None
                },
                Op::Insert {
                    text: "B".to_string(),
                    attributes: None
                },
            ]
        );

        let without_priority = a.transform(&b, false);
        assert_eq!(
            without_priority.ops(),
            &[Op::Insert {
                text: "B".to_string(),
                attributes: None
            }]
        );
    }

    #[test]
    fn test_transform_satisfies_tp1() {
        let base = Script::new().insert("Hello World", None);
        let a = Script::new().retain(5, None).insert(",", None).delete(1);
        let b = Script::new().retain(11, None).insert("!", None);

        let left = base
            .compose(&a)
            .unwrap()
            .compose(&a.transform(&b, true))
            .unwrap();
        let right = base
            .compose(&b)
            .unwrap()
            .compose(&b.transform(&a, false))
            .unwrap();
        assert_eq!(left, right);
    }

    #[test]
    fn test_transform_delete_swallows_other_side() {
        let a = Script::new().delete(5);
        let b = Script::new().retain(5, attrs(&[("bold", json!(true))]));
        assert_eq!(a.transform(&b, true), Script::new());

        let b = Script::new().delete(3);
        assert_eq!(a.transform(&b, true), Script::new());
    }

    #[test]
    fn test_transform_attributes_respect_priority() {
        let a = Script::new().retain(3, attrs(&[("color", json!("red"))]));
        let b = Script::new().retain(3, attrs(&[("color", json!("blue")), ("bold", json!(true))]));

        let transformed = a.transform(&b, true);
        assert_eq!(
            transformed.ops(),
            &[Op::Retain {
                length: 3,
                attributes: attrs(&[("bold", json!(true))]),
            }]
        );
    }

    #[test]
    fn test_transform_embed_retains_through_handler() {
        register_subdoc();
        let a_update = serde_json::to_value(Script::new().insert("a", None)).unwrap();
        let b_update = serde_json::to_value(Script::new().insert("b", None)).unwrap();

        let a = Script::new().retain_embed("subdoc", a_update, None);
        let b = Script::new().retain_embed("subdoc", b_update, None);

        let transformed = a.transform(&b, true);
        let expected =
            serde_json::to_value(Script::new().retain(1, None).insert("b", None)).unwrap();
        assert_eq!(
            transformed.ops(),
            &[Op::RetainEmbed {
                embed: EmbedData::new("subdoc", expected),
                attributes: None,
            }]
        );
    }

    #[test]
    fn test_transform_embed_retains_without_handler_keep_other() {
        let a = Script::new().retain_embed("gizmo-unregistered", json!({"a": 1}), None);
        let b = Script::new().retain_embed("gizmo-unregistered", json!({"b": 2}), None);

        let transformed = a.transform(&b, true);
        assert_eq!(
            transformed.ops(),
            &[Op::RetainEmbed {
                embed: EmbedData::new("gizmo-unregistered", json!({"b": 2})),
                attributes: None,
            }]
        );
    }

    #[test]
    fn test_transform_position_shifts_past_inserts() {
        let change = Script::new().insert("Hello ", None);
        assert_eq!(change.transform_position(5, false), 11);
        assert_eq!(change.transform_position(0, true), 0);
        assert_eq!(change.transform_position(0, false), 6);
    }

    #[test]
    fn test_transform_position_collapses_into_deletes() {
        let change = Script::new().retain(2, None).delete(3);
        assert_eq!(change.transform_position(4, false), 2);
        assert_eq!(change.transform_position(7, false), 4);
        assert_eq!(change.transform_position(1, false), 1);
    }

    #[test]
    fn test_transform_position_ignores_retains() {
        let change = Script::new().retain(10, attrs(&[("bold", json!(true))]));
        assert_eq!(change.transform_position(4, false), 4);
    }

    #[test]
    fn test_lines_splits_on_newlines() {
        let doc = Script::new()
            .insert("Hello\n", attrs(&[("header", json!(1))]))
            .insert("World", None)
            .insert_embed("image", json!({"url": "x"}), None)
            .insert("\n", None);

        let lines: Vec<Line> = doc.lines().collect();
        assert_eq!(lines.len(), 2);

        assert_eq!(
            lines[0].script.ops(),
            &[Op::Insert {
                text: "Hello".to_string(),
                attributes: attrs(&[("header", json!(1))]),
            }]
        );
        assert_eq!(lines[0].attributes, attrs(&[("header", json!(1))]));

        assert_eq!(lines[1].script.ops().len(), 2);
        assert_eq!(lines[1].attributes, None);
    }

    #[test]
    fn test_lines_emits_empty_lines_and_trailing_partial() {
        let doc = Script::new().insert("a\n\nb", None);
        let lines: Vec<Line> = doc.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].script, Script::new().insert("a", None));
        assert_eq!(lines[1].script, Script::new());
        assert_eq!(lines[2].script, Script::new().insert("b", None));
        assert_eq!(lines[2].attributes, None);
    }

    #[test]
    fn test_lines_custom_separator_and_early_break() {
        let doc = Script::new().insert("a|b|c", None);
        let first: Vec<Line> = doc.lines_sep('|').take(2).collect();
        assert_eq!(first.len(), 2);
        assert_eq!(first[1].script, Script::new().insert("b", None));
    }

    #[test]
    fn test_lines_stops_at_non_insert() {
        let change = Script::new().insert("a\n", None).retain(3, None);
        let lines: Vec<Line> = change.lines().collect();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].script, Script::new().insert("a", None));
    }

    #[test]
    fn test_wire_roundtrip() {
        let doc = Script::new()
            .insert("Hello", attrs(&[("bold", json!(true))]))
            .insert_embed("image", json!({"url": "https://example.com/a.png"}), None)
            .insert("\n", None);

        let wire = serde_json::to_value(&doc).unwrap();
        assert_eq!(
            wire,
            json!([
                {"insert": "Hello", "attributes": {"bold": true}},
                {"insert": {"image": {"url": "https://example.com/a.png"}}},
                {"insert": "\n"},
            ])
        );
        let back: Script = serde_json::from_value(wire).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn test_display_is_wire_json() {
        let script = Script::new().retain(2, None).delete(1);
        assert_eq!(script.to_string(), r#"[{"retain":2},{"delete":1}]"#);
    }

    #[test]
    fn test_filter_map_partition_reduce() {
        let script = Script::new()
            .insert("Hello", None)
            .retain(3, None)
            .delete(2);

        assert_eq!(script.filter(|op| op.is_insert()).len(), 1);
        assert_eq!(script.map(|op| op.length()), vec![5, 3, 2]);

        let (changes, keeps) = script.partition(|op| !op.is_retain());
        assert_eq!(changes.len(), 2);
        assert_eq!(keeps.len(), 1);

        let mut seen = 0;
        script.for_each(|_| seen += 1);
        assert_eq!(seen, 3);

        let total = script.reduce(0usize, |acc, op| acc + op.length());
        assert_eq!(total, 10);
    }
}
