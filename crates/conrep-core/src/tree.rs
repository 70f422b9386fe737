//! The subcondition tree store.
//!
//! Every mutation takes `&self` and returns a new [`SubconditionTree`]; the
//! previous tree is never touched. Lookups that miss are no-ops rather than
//! errors, because the editor only ever passes ids it read from the tree.

use serde::{Deserialize, Serialize};

use crate::{
  order::SortOrderMap,
  subcondition::{NodeId, Subcondition, SubconditionUpdate},
};

// ─── Containers ──────────────────────────────────────────────────────────────

/// A sibling list inside the tree: the root sequence or one node's children.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContainerId {
  Root,
  Node(NodeId),
}

impl ContainerId {
  pub fn parent(&self) -> Option<&NodeId> {
    match self {
      Self::Root => None,
      Self::Node(id) => Some(id),
    }
  }
}

/// One line of the depth-first flattening produced by [`SubconditionTree::rows`].
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
  pub depth:  usize,
  pub parent: Option<&'a NodeId>,
  /// Position among siblings.
  pub index:  usize,
  pub node:   &'a Subcondition,
}

// ─── Tree ────────────────────────────────────────────────────────────────────

/// The description of one condition: an ordered sequence of root nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubconditionTree {
  roots: Vec<Subcondition>,
}

impl SubconditionTree {
  pub fn new(roots: Vec<Subcondition>) -> Self { Self { roots } }

  pub fn roots(&self) -> &[Subcondition] { &self.roots }

  pub fn is_empty(&self) -> bool { self.roots.is_empty() }

  pub fn node_count(&self) -> usize { self.roots.iter().map(Subcondition::size).sum() }

  pub fn find(&self, id: &NodeId) -> Option<&Subcondition> { find_in(&self.roots, id) }

  pub fn contains(&self, id: &NodeId) -> bool { self.find(id).is_some() }

  /// The sibling list that holds `id`, and its position there.
  pub fn position_of(&self, id: &NodeId) -> Option<(ContainerId, usize)> {
    self
      .rows()
      .into_iter()
      .find(|row| &row.node.id == id)
      .map(|row| {
        let container = row
          .parent
          .map_or(ContainerId::Root, |p| ContainerId::Node(p.clone()));
        (container, row.index)
      })
  }

  /// Depth-first, pre-order flattening of the tree.
  pub fn rows(&self) -> Vec<Row<'_>> {
    let mut out = Vec::with_capacity(self.node_count());
    collect_rows(&self.roots, None, 0, &mut out);
    out
  }

  /// The nodes of one sibling list, if the container exists.
  pub fn container(&self, container: &ContainerId) -> Option<&[Subcondition]> {
    match container {
      ContainerId::Root => Some(&self.roots),
      ContainerId::Node(id) => self.find(id).map(|n| n.children.as_slice()),
    }
  }

  // ── Mutations ─────────────────────────────────────────────────────────────

  /// Replace the identifier and text of `id`, keeping its children.
  pub fn edit(&self, id: &NodeId, identifier: &str, text: &str) -> Self {
    self.map_node(id, |node| Subcondition {
      identifier: identifier.to_owned(),
      text: text.to_owned(),
      ..node.clone()
    })
  }

  /// Append an empty leaf with id `new_id` to the children of `parent`.
  pub fn add_child(&self, parent: &NodeId, new_id: NodeId) -> Self {
    self.map_node(parent, |node| {
      let mut children = node.children.clone();
      let sort_order = sort_order_after(children.len());
      children.push(Subcondition::leaf(new_id.clone(), sort_order));
      Subcondition {
        children,
        ..node.clone()
      }
    })
  }

  /// Append an empty leaf with id `new_id` to the root sequence.
  pub fn add_root_node(&self, new_id: NodeId) -> Self {
    let mut roots = self.roots.clone();
    roots.push(Subcondition::leaf(new_id, sort_order_after(roots.len())));
    Self { roots }
  }

  /// Remove `id` and its whole subtree.
  pub fn delete_node(&self, id: &NodeId) -> Self {
    Self {
      roots: delete_in(&self.roots, id),
    }
  }

  /// Move the element at `from` to `to` inside one sibling list.
  ///
  /// Out-of-range positions and unknown containers leave the tree unchanged.
  pub fn reorder(&self, container: &ContainerId, from: usize, to: usize) -> Self {
    let Some(list) = self.container(container) else {
      return self.clone();
    };
    if from >= list.len() || to >= list.len() || from == to {
      return self.clone();
    }
    let splice = |list: &[Subcondition]| {
      let mut list = list.to_vec();
      let moved = list.remove(from);
      list.insert(to, moved);
      list
    };
    match container {
      ContainerId::Root => Self {
        roots: splice(&self.roots),
      },
      ContainerId::Node(parent) => self.map_node(parent, |node| Subcondition {
        children: splice(&node.children),
        ..node.clone()
      }),
    }
  }

  // ── Persistence ───────────────────────────────────────────────────────────

  /// Flatten the tree into the `PATCH /subconditions` payload.
  ///
  /// Each row's `sort_order` is its index in `order` plus one.
  pub fn to_updates(&self, order: &SortOrderMap) -> Vec<SubconditionUpdate> {
    self
      .rows()
      .into_iter()
      .map(|row| SubconditionUpdate {
        subcondition_id:         row.node.id.clone(),
        subcondition_identifier: row.node.identifier.clone(),
        subcondition_text:       row.node.text.clone(),
        sort_order:              sort_order_after(order.position(row.parent, &row.node.id)),
        parent_subcondition_id:  row.parent.cloned(),
      })
      .collect()
  }

  // ── Helpers ───────────────────────────────────────────────────────────────

  fn map_node(&self, id: &NodeId, f: impl Fn(&Subcondition) -> Subcondition) -> Self {
    Self {
      roots: map_in(&self.roots, id, &f),
    }
  }
}

impl From<Vec<Subcondition>> for SubconditionTree {
  fn from(roots: Vec<Subcondition>) -> Self { Self::new(roots) }
}

fn sort_order_after(count: usize) -> u32 { u32::try_from(count).unwrap_or(u32::MAX - 1) + 1 }

fn find_in<'a>(nodes: &'a [Subcondition], id: &NodeId) -> Option<&'a Subcondition> {
  nodes.iter().find_map(|node| {
    if &node.id == id {
      Some(node)
    } else {
      find_in(&node.children, id)
    }
  })
}

fn collect_rows<'a>(
  nodes: &'a [Subcondition],
  parent: Option<&'a NodeId>,
  depth: usize,
  out: &mut Vec<Row<'a>>,
) {
  for (index, node) in nodes.iter().enumerate() {
    out.push(Row {
      depth,
      parent,
      index,
      node,
    });
    collect_rows(&node.children, Some(&node.id), depth + 1, out);
  }
}

fn map_in(
  nodes: &[Subcondition],
  id: &NodeId,
  f: &dyn Fn(&Subcondition) -> Subcondition,
) -> Vec<Subcondition> {
  nodes
    .iter()
    .map(|node| {
      if &node.id == id {
        f(node)
      } else {
        Subcondition {
          children: map_in(&node.children, id, f),
          ..node.clone()
        }
      }
    })
    .collect()
}

fn delete_in(nodes: &[Subcondition], id: &NodeId) -> Vec<Subcondition> {
  nodes
    .iter()
    .filter(|node| &node.id != id)
    .map(|node| Subcondition {
      children: delete_in(&node.children, id),
      ..node.clone()
    })
    .collect()
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  fn node(id: i64, text: &str, children: Vec<Subcondition>) -> Subcondition {
    Subcondition {
      id: NodeId::from(id),
      identifier: format!("{id})"),
      text: text.to_owned(),
      sort_order: 0,
      children,
    }
  }

  fn ids(nodes: &[Subcondition]) -> Vec<String> {
    nodes.iter().map(|n| n.id.to_string()).collect()
  }

  /// 1[2, 3[4]], 5
  fn sample() -> SubconditionTree {
    SubconditionTree::new(vec![
      node(1, "one", vec![node(2, "two", vec![]), node(3, "three", vec![node(4, "four", vec![])])]),
      node(5, "five", vec![]),
    ])
  }

  #[test]
  fn edit_replaces_only_the_target() {
    let tree = sample();
    let edited = tree.edit(&NodeId::from(4), "i.", "changed");

    let four = edited.find(&NodeId::from(4)).unwrap();
    assert_eq!(four.identifier, "i.");
    assert_eq!(four.text, "changed");
    assert_eq!(edited.node_count(), tree.node_count());
    assert_eq!(edited.find(&NodeId::from(3)).unwrap().text, "three");
    // The original is untouched.
    assert_eq!(tree.find(&NodeId::from(4)).unwrap().text, "four");
  }

  #[test]
  fn edit_unknown_id_is_noop() {
    let tree = sample();
    assert_eq!(tree.edit(&NodeId::from(99), "x", "y"), tree);
  }

  #[test]
  fn add_child_on_leaf() {
    let tree = sample();
    let new_id = NodeId::child_of(&NodeId::from(5));
    let grown = tree.add_child(&NodeId::from(5), new_id.clone());

    let five = grown.find(&NodeId::from(5)).unwrap();
    assert_eq!(five.children.len(), 1);
    let leaf = &five.children[0];
    assert_eq!(leaf.id, new_id);
    assert_eq!(leaf.identifier, "");
    assert_eq!(leaf.text, "");
    assert_eq!(leaf.sort_order, 1);
  }

  #[test]
  fn add_child_appends_after_existing_children() {
    let tree = sample();
    let grown = tree.add_child(&NodeId::from(1), NodeId::parse("1-new").unwrap());
    let one = grown.find(&NodeId::from(1)).unwrap();
    assert_eq!(ids(&one.children), ["2", "3", "1-new"]);
    assert_eq!(one.children[2].sort_order, 3);
  }

  #[test]
  fn add_child_unknown_parent_is_noop() {
    let tree = sample();
    assert_eq!(tree.add_child(&NodeId::from(42), NodeId::new_root()), tree);
  }

  #[test]
  fn add_root_node_appends() {
    let tree = sample().add_root_node(NodeId::parse("parent-x").unwrap());
    assert_eq!(ids(tree.roots()), ["1", "5", "parent-x"]);
    assert_eq!(tree.roots()[2].sort_order, 3);
  }

  #[test]
  fn delete_nested_node() {
    // X[Y, Z] -> X[Z]
    let tree = SubconditionTree::new(vec![node(1, "x", vec![node(2, "y", vec![]), node(3, "z", vec![])])]);
    let pruned = tree.delete_node(&NodeId::from(2));
    assert_eq!(ids(&pruned.find(&NodeId::from(1)).unwrap().children), ["3"]);
    assert_eq!(pruned.node_count(), tree.node_count() - 1);
  }

  #[test]
  fn delete_removes_whole_subtree() {
    let tree = sample();
    let pruned = tree.delete_node(&NodeId::from(1));
    assert_eq!(ids(pruned.roots()), ["5"]);
    assert_eq!(pruned.node_count(), 1);
  }

  #[test]
  fn reorder_root_list() {
    // [A, B, C] reorder(root, 0, 2) -> [B, C, A]
    let tree = SubconditionTree::new(vec![node(1, "a", vec![]), node(2, "b", vec![]), node(3, "c", vec![])]);
    let moved = tree.reorder(&ContainerId::Root, 0, 2);
    assert_eq!(ids(moved.roots()), ["2", "3", "1"]);
  }

  #[test]
  fn reorder_nested_list_leaves_others_alone() {
    let tree = sample();
    let moved = tree.reorder(&ContainerId::Node(NodeId::from(1)), 1, 0);
    assert_eq!(ids(&moved.find(&NodeId::from(1)).unwrap().children), ["3", "2"]);
    assert_eq!(ids(moved.roots()), ["1", "5"]);
    assert_eq!(ids(&moved.find(&NodeId::from(3)).unwrap().children), ["4"]);
  }

  #[test]
  fn reorder_out_of_range_is_noop() {
    let tree = sample();
    assert_eq!(tree.reorder(&ContainerId::Root, 0, 7), tree);
    assert_eq!(tree.reorder(&ContainerId::Node(NodeId::from(99)), 0, 1), tree);
  }

  #[test]
  fn position_of_reports_container_and_index() {
    let tree = sample();
    assert_eq!(
      tree.position_of(&NodeId::from(3)),
      Some((ContainerId::Node(NodeId::from(1)), 1))
    );
    assert_eq!(tree.position_of(&NodeId::from(5)), Some((ContainerId::Root, 1)));
    assert_eq!(tree.position_of(&NodeId::from(99)), None);
  }

  #[test]
  fn rows_are_depth_first() {
    let tree = sample();
    let rows = tree.rows();
    let order: Vec<_> = rows.iter().map(|r| (r.node.id.to_string(), r.depth)).collect();
    assert_eq!(
      order,
      [
        ("1".to_string(), 0),
        ("2".to_string(), 1),
        ("3".to_string(), 1),
        ("4".to_string(), 2),
        ("5".to_string(), 0),
      ]
    );
  }

  #[test]
  fn updates_carry_order_and_parent() {
    let tree = sample().reorder(&ContainerId::Root, 1, 0);
    let order = SortOrderMap::build(&tree);
    let updates = tree.to_updates(&order);

    assert_eq!(updates.len(), 5);
    assert_eq!(updates[0].subcondition_id, NodeId::from(5));
    assert_eq!(updates[0].sort_order, 1);
    assert_eq!(updates[0].parent_subcondition_id, None);
    let four = updates.iter().find(|u| u.subcondition_id == NodeId::from(4)).unwrap();
    assert_eq!(four.parent_subcondition_id, Some(NodeId::from(3)));
    assert_eq!(four.sort_order, 1);
  }
}
