//! Sort-order snapshots of a subcondition tree.
//!
//! A reorder only splices one sibling list, but persistence needs the order
//! of the whole tree in one payload. [`SortOrderMap::build`] captures every
//! node's position as `"<parent>-<node>"` → index, and [`SortOrderMap::apply`]
//! sorts any tree with the same nodes back into that order.

use std::collections::HashMap;

use crate::{
  subcondition::{NodeId, Subcondition},
  tree::SubconditionTree,
};

/// Flat map from composite `"<parentId-or-null>-<nodeId>"` keys to sibling
/// positions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortOrderMap(HashMap<String, usize>);

impl SortOrderMap {
  /// The composite key of `id` under `parent` (`None` for root nodes).
  pub fn key(parent: Option<&NodeId>, id: &NodeId) -> String {
    match parent {
      Some(parent) => format!("{parent}-{id}"),
      None => format!("null-{id}"),
    }
  }

  /// Record the current sibling position of every node in `tree`.
  pub fn build(tree: &SubconditionTree) -> Self {
    Self(
      tree
        .rows()
        .into_iter()
        .map(|row| (Self::key(row.parent, &row.node.id), row.index))
        .collect(),
    )
  }

  /// Recorded position of `id` under `parent`; 0 when the pair is unknown.
  pub fn position(&self, parent: Option<&NodeId>, id: &NodeId) -> usize {
    self.0.get(&Self::key(parent, id)).copied().unwrap_or(0)
  }

  /// Sort every sibling list of `tree` by the recorded positions.
  pub fn apply(&self, tree: &SubconditionTree) -> SubconditionTree {
    SubconditionTree::new(self.sorted(tree.roots(), None))
  }

  fn sorted(&self, nodes: &[Subcondition], parent: Option<&NodeId>) -> Vec<Subcondition> {
    let mut out: Vec<Subcondition> = nodes
      .iter()
      .map(|node| Subcondition {
        children: self.sorted(&node.children, Some(&node.id)),
        ..node.clone()
      })
      .collect();
    // Stable: nodes sharing a position keep their current relative order.
    out.sort_by_key(|node| self.position(parent, &node.id));
    out
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::tree::ContainerId;

  fn leaf(id: i64) -> Subcondition { Subcondition::leaf(NodeId::from(id), 0) }

  fn tree() -> SubconditionTree {
    let mut a = leaf(1);
    a.children = vec![leaf(2), leaf(3), leaf(4)];
    SubconditionTree::new(vec![a, leaf(5), leaf(6)])
  }

  #[test]
  fn keys_use_null_for_roots() {
    assert_eq!(SortOrderMap::key(None, &NodeId::from(5)), "null-5");
    assert_eq!(SortOrderMap::key(Some(&NodeId::from(1)), &NodeId::from(2)), "1-2");
  }

  #[test]
  fn build_records_sibling_positions() {
    let map = SortOrderMap::build(&tree());
    assert_eq!(map.0.len(), 6);
    assert_eq!(map.position(None, &NodeId::from(6)), 2);
    assert_eq!(map.position(Some(&NodeId::from(1)), &NodeId::from(4)), 2);
    assert_eq!(map.position(Some(&NodeId::from(9)), &NodeId::from(4)), 0);
  }

  #[test]
  fn apply_restores_captured_order() {
    let original = tree();
    let reordered = original
      .reorder(&ContainerId::Root, 2, 0)
      .reorder(&ContainerId::Node(NodeId::from(1)), 0, 2);
    let map = SortOrderMap::build(&reordered);

    // Applying the new order to the old tree reproduces the reordered tree.
    assert_eq!(map.apply(&original), reordered);
  }

  #[test]
  fn apply_on_ordered_tree_is_identity() {
    let t = tree();
    assert_eq!(SortOrderMap::build(&t).apply(&t), t);
  }

  #[test]
  fn unknown_nodes_default_to_position_zero() {
    let t = tree().add_root_node(NodeId::parse("parent-new").unwrap());
    let map = SortOrderMap::build(&tree());
    let applied = map.apply(&t);
    let ids: Vec<_> = applied.roots().iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, ["1", "parent-new", "5", "6"]);
  }
}
