//! The atomic edit operations a change script is made of.
//!
//! An operation either inserts new content (text or an embedded object),
//! deletes a run of document positions, or retains a run while optionally
//! restyling it. Retains may also target a single embedded object with a
//! structured update. Every operation except delete can carry attributes.
//!
//! On the wire an operation is a JSON object with exactly one of the keys
//! `insert`, `delete` or `retain`, plus an optional `attributes` object; an
//! embedded value is an object with a single top-level key naming its type.
//! The `Serialize`/`Deserialize` implementations below bridge that untagged
//! shape and the tagged enum.

use crate::attributes::AttributeMap;
use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// An embedded, non-text value occupying one document position.
///
/// The type key names the kind of embed ("image", "formula", ...); the data
/// is whatever JSON the embedder associates with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedData {
    /// Name of the embed type, also its key in the wire form.
    pub embed_type: String,
    /// Embed payload, owned by the embedder.
    pub data: JsonValue,
}

impl EmbedData {
    /// Creates an embed value from its type key and payload.
    pub fn new(embed_type: impl Into<String>, data: JsonValue) -> Self {
        Self {
            embed_type: embed_type.into(),
            data,
        }
    }
}

impl Serialize for EmbedData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.embed_type, &self.data)?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for EmbedData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut map = BTreeMap::<String, JsonValue>::deserialize(deserializer)?;
        if map.len() != 1 {
            return Err(D::Error::custom(
                "an embed must be an object with exactly one top-level key",
            ));
        }
        let (embed_type, data) = map.pop_first().ok_or_else(|| D::Error::custom("empty embed"))?;
        Ok(EmbedData { embed_type, data })
    }
}

/// Coarse classification of an operation, used to drive the aligned
/// iteration in the algebra. Both embed variants classify with their
/// text counterparts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    /// Adds content.
    Insert,
    /// Removes content.
    Delete,
    /// Advances over content, possibly restyling or updating it.
    Retain,
}

/// A single operation in a change script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    /// Inserts a run of text with optional formatting.
    Insert {
        /// The text to insert. Never empty in a normalized script.
        text: String,
        /// Optional formatting attributes.
        attributes: Option<AttributeMap>,
    },

    /// Inserts one embedded object with optional formatting.
    InsertEmbed {
        /// The embedded value.
        embed: EmbedData,
        /// Optional formatting attributes.
        attributes: Option<AttributeMap>,
    },

    /// Deletes this many document positions.
    Delete(usize),

    /// Advances over this many positions, applying any attribute changes.
    Retain {
        /// Number of positions to keep.
        length: usize,
        /// Optional attribute changes.
        attributes: Option<AttributeMap>,
    },

    /// Applies a structured update to a single embedded object in place.
    ///
    /// How the carried value combines with the existing embed is defined by
    /// the handler registered for the embed type.
    RetainEmbed {
        /// The update payload for the embed at this position.
        embed: EmbedData,
        /// Optional attribute changes.
        attributes: Option<AttributeMap>,
    },
}

impl Op {
    /// The number of document positions this operation covers.
    ///
    /// Text is measured in characters, embeds always cover exactly one
    /// position, and delete/retain use their stored counts.
    pub fn length(&self) -> usize {
        match self {
            Op::Insert { text, .. } => text.chars().count(),
            Op::InsertEmbed { .. } => 1,
            Op::Delete(len) => *len,
            Op::Retain { length, .. } => *length,
            Op::RetainEmbed { .. } => 1,
        }
    }

    /// The operation's attributes, if any. Deletes never carry attributes.
    pub fn attributes(&self) -> Option<&AttributeMap> {
        match self {
            Op::Insert { attributes, .. }
            | Op::InsertEmbed { attributes, .. }
            | Op::Retain { attributes, .. }
            | Op::RetainEmbed { attributes, .. } => attributes.as_ref(),
            Op::Delete(_) => None,
        }
    }

    /// The coarse kind of this operation.
    pub fn kind(&self) -> OpKind {
        match self {
            Op::Insert { .. } | Op::InsertEmbed { .. } => OpKind::Insert,
            Op::Delete(_) => OpKind::Delete,
            Op::Retain { .. } | Op::RetainEmbed { .. } => OpKind::Retain,
        }
    }

    /// True for text and embed inserts.
    pub fn is_insert(&self) -> bool {
        self.kind() == OpKind::Insert
    }

    /// True for deletes.
    pub fn is_delete(&self) -> bool {
        self.kind() == OpKind::Delete
    }

    /// True for integer and embed retains.
    pub fn is_retain(&self) -> bool {
        self.kind() == OpKind::Retain
    }
}

impl Serialize for Op {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let attributes = self.attributes();
        let len = if attributes.is_some() { 2 } else { 1 };
        let mut map = serializer.serialize_map(Some(len))?;
        match self {
            Op::Insert { text, .. } => map.serialize_entry("insert", text)?,
            Op::InsertEmbed { embed, .. } => map.serialize_entry("insert", embed)?,
            Op::Delete(length) => map.serialize_entry("delete", length)?,
            Op::Retain { length, .. } => map.serialize_entry("retain", length)?,
            Op::RetainEmbed { embed, .. } => map.serialize_entry("retain", embed)?,
        }
        if let Some(attributes) = attributes {
            map.serialize_entry("attributes", attributes)?;
        }
        map.end()
    }
}

/// Untyped mirror of the wire shape, validated into an [`Op`].
#[derive(Deserialize)]
struct RawOp {
    #[serde(default)]
    insert: Option<JsonValue>,
    #[serde(default)]
    delete: Option<u64>,
    #[serde(default)]
    retain: Option<JsonValue>,
    #[serde(default)]
    attributes: Option<AttributeMap>,
}

fn embed_from_value<E: serde::de::Error>(value: JsonValue) -> Result<EmbedData, E> {
    let JsonValue::Object(map) = value else {
        return Err(E::custom("an embed must be a JSON object"));
    };
    if map.len() != 1 {
        return Err(E::custom(
            "an embed must be an object with exactly one top-level key",
        ));
    }
    let (embed_type, data) = map
        .into_iter()
        .next()
        .ok_or_else(|| E::custom("empty embed"))?;
    Ok(EmbedData { embed_type, data })
}

impl<'de> Deserialize<'de> for Op {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawOp::deserialize(deserializer)?;
        let actions =
            raw.insert.is_some() as u8 + raw.delete.is_some() as u8 + raw.retain.is_some() as u8;
        if actions != 1 {
            return Err(D::Error::custom(
                "an operation must have exactly one of insert, delete or retain",
            ));
        }

        let attributes = raw.attributes.filter(|attrs| !attrs.is_empty());

        if let Some(insert) = raw.insert {
            return match insert {
                JsonValue::String(text) if !text.is_empty() => Ok(Op::Insert { text, attributes }),
                JsonValue::String(_) => Err(D::Error::custom("insert text must be non-empty")),
                value @ JsonValue::Object(_) => Ok(Op::InsertEmbed {
                    embed: embed_from_value(value)?,
                    attributes,
                }),
                _ => Err(D::Error::custom("insert must be a string or an embed object")),
            };
        }

        if let Some(delete) = raw.delete {
            if delete == 0 {
                return Err(D::Error::custom("delete count must be positive"));
            }
            return Ok(Op::Delete(delete as usize));
        }

        match raw.retain {
            Some(JsonValue::Number(n)) => match n.as_u64() {
                Some(length) if length > 0 => Ok(Op::Retain {
                    length: length as usize,
                    attributes,
                }),
                _ => Err(D::Error::custom("retain count must be a positive integer")),
            },
            Some(value @ JsonValue::Object(_)) => Ok(Op::RetainEmbed {
                embed: embed_from_value(value)?,
                attributes,
            }),
            _ => Err(D::Error::custom("retain must be a count or an embed object")),
        }
    }
}
