//! Subcondition: one node of a condition's recursive description tree.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Identifier ──────────────────────────────────────────────────────────────

/// Opaque identifier of a subcondition, unique across one tree.
///
/// Persisted nodes carry the server's numeric id; nodes created in the editor
/// carry `"<parent>-<uuid>"` (or `"parent-<uuid>"` at the root) until the
/// server assigns them a real one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(String);

impl NodeId {
  const ROOT_PREFIX: &'static str = "parent";

  /// Parse a non-empty identifier.
  pub fn parse(raw: impl Into<String>) -> Result<Self> {
    let raw = raw.into();
    if raw.is_empty() {
      return Err(Error::EmptyNodeId);
    }
    Ok(Self(raw))
  }

  /// A fresh id for a new child of `parent`.
  pub fn child_of(parent: &NodeId) -> Self {
    Self(format!("{parent}-{}", Uuid::new_v4().simple()))
  }

  /// A fresh id for a new top-level node.
  pub fn new_root() -> Self {
    Self(format!("{}-{}", Self::ROOT_PREFIX, Uuid::new_v4().simple()))
  }

  pub fn as_str(&self) -> &str { &self.0 }

  /// Whether the server has assigned this id.
  pub fn is_persisted(&self) -> bool { self.0.parse::<i64>().is_ok() }
}

impl fmt::Display for NodeId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl From<i64> for NodeId {
  fn from(id: i64) -> Self { Self(id.to_string()) }
}

impl Serialize for NodeId {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    match self.0.parse::<i64>() {
      Ok(n) => serializer.serialize_i64(n),
      Err(_) => serializer.serialize_str(&self.0),
    }
  }
}

impl<'de> Deserialize<'de> for NodeId {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
      Int(i64),
      Str(String),
    }
    match Raw::deserialize(deserializer)? {
      Raw::Int(n) => Ok(Self::from(n)),
      Raw::Str(s) => Self::parse(s).map_err(serde::de::Error::custom),
    }
  }
}

// ─── Node ────────────────────────────────────────────────────────────────────

/// A node in the description tree. Children are owned exclusively, so the
/// tree cannot contain cycles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subcondition {
  #[serde(rename = "subcondition_id")]
  pub id:         NodeId,
  /// Short label printed before the text, e.g. `"a)"`.
  #[serde(rename = "subcondition_identifier", default, deserialize_with = "null_as_empty")]
  pub identifier: String,
  #[serde(rename = "subcondition_text", default, deserialize_with = "null_as_empty")]
  pub text:       String,
  /// Position hint among siblings. Only meaningful after a recompute.
  #[serde(default)]
  pub sort_order: u32,
  #[serde(rename = "subconditions", default)]
  pub children:   Vec<Subcondition>,
}

impl Subcondition {
  /// An empty leaf, as created by the "add" actions.
  pub fn leaf(id: NodeId, sort_order: u32) -> Self {
    Self {
      id,
      identifier: String::new(),
      text: String::new(),
      sort_order,
      children: Vec::new(),
    }
  }

  /// Number of nodes in the subtree rooted here, including `self`.
  pub fn size(&self) -> usize {
    1 + self.children.iter().map(Subcondition::size).sum::<usize>()
  }
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
  Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

// ─── Persistence row ─────────────────────────────────────────────────────────

/// One row of the flat `PATCH /subconditions` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubconditionUpdate {
  pub subcondition_id:         NodeId,
  pub subcondition_identifier: String,
  pub subcondition_text:       String,
  pub sort_order:              u32,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub parent_subcondition_id:  Option<NodeId>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn numeric_ids_round_trip_as_numbers() {
    let node: Subcondition = serde_json::from_str(
      r#"{"subcondition_id": 42, "subcondition_identifier": null, "subcondition_text": "Do it"}"#,
    )
    .unwrap();
    assert_eq!(node.id.as_str(), "42");
    assert!(node.id.is_persisted());
    assert_eq!(node.identifier, "");
    assert!(node.children.is_empty());

    let json = serde_json::to_value(&node).unwrap();
    assert_eq!(json["subcondition_id"], serde_json::json!(42));
  }

  #[test]
  fn generated_ids_are_strings() {
    let root = NodeId::new_root();
    assert!(root.as_str().starts_with("parent-"));
    assert!(!root.is_persisted());

    let child = NodeId::child_of(&NodeId::from(7));
    assert!(child.as_str().starts_with("7-"));
    assert_ne!(NodeId::child_of(&root), NodeId::child_of(&root));

    let json = serde_json::to_value(&child).unwrap();
    assert!(json.is_string());
  }

  #[test]
  fn empty_id_is_rejected() {
    assert!(matches!(NodeId::parse(""), Err(Error::EmptyNodeId)));
    assert!(serde_json::from_str::<NodeId>(r#""""#).is_err());
  }

  #[test]
  fn size_counts_descendants() {
    let mut a = Subcondition::leaf(NodeId::from(1), 1);
    let mut b = Subcondition::leaf(NodeId::from(2), 1);
    b.children.push(Subcondition::leaf(NodeId::from(3), 1));
    a.children.push(b);
    a.children.push(Subcondition::leaf(NodeId::from(4), 2));
    assert_eq!(a.size(), 4);
  }
}
