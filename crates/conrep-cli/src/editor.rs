//! Editing state for the two tabs of the condition screen.
//!
//! Both editors keep per-row drafts. A row holding a draft is "being edited"
//! until the draft is committed or discarded, whether or not it currently has
//! keyboard focus; approvals are refused while any draft exists.

use std::collections::HashMap;

use conrep_core::{
  attribute::{ConditionAttributes, ManagementPlan},
  order::SortOrderMap,
  subcondition::{NodeId, SubconditionUpdate},
  tree::{Row, SubconditionTree},
};

// ─── Description ──────────────────────────────────────────────────────────────

/// The field of a subcondition draft receiving keystrokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeField {
  Identifier,
  Text,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeDraft {
  pub identifier: String,
  pub text:       String,
}

/// The subcondition tree of the open condition plus its editing state.
#[derive(Debug, Clone, Default)]
pub struct DescriptionEditor {
  tree:   SubconditionTree,
  order:  SortOrderMap,
  drafts: HashMap<NodeId, NodeDraft>,
  /// Field receiving input on the cursor row, if any.
  focus:  Option<NodeField>,
  cursor: usize,
  dirty:  bool,
}

impl DescriptionEditor {
  pub fn new(tree: SubconditionTree) -> Self {
    Self {
      order: SortOrderMap::build(&tree),
      tree,
      ..Self::default()
    }
  }

  pub fn tree(&self) -> &SubconditionTree { &self.tree }

  pub fn rows(&self) -> Vec<Row<'_>> { self.tree.rows() }

  pub fn cursor(&self) -> usize { self.cursor }

  pub fn focus(&self) -> Option<NodeField> { self.focus }

  pub fn draft(&self, id: &NodeId) -> Option<&NodeDraft> { self.drafts.get(id) }

  /// Whether any row holds an uncommitted draft.
  pub fn is_editing(&self) -> bool { !self.drafts.is_empty() }

  /// Whether the tree differs from the last copy received from the server.
  pub fn is_dirty(&self) -> bool { self.dirty }

  pub fn cursor_id(&self) -> Option<NodeId> {
    self.rows().get(self.cursor).map(|row| row.node.id.clone())
  }

  pub fn move_cursor(&mut self, delta: isize) {
    let len = self.tree.node_count();
    self.cursor = step(self.cursor, delta, len);
  }

  fn focus_on(&mut self, id: &NodeId) {
    if let Some(i) = self.rows().iter().position(|row| &row.node.id == id) {
      self.cursor = i;
    }
  }

  // ── Drafts ────────────────────────────────────────────────────────────────

  /// Open (or resume) a draft on the cursor row and focus its identifier.
  pub fn begin_edit(&mut self) {
    let Some(id) = self.cursor_id() else {
      return;
    };
    if !self.drafts.contains_key(&id) {
      let Some(node) = self.tree.find(&id) else {
        return;
      };
      let draft = NodeDraft {
        identifier: node.identifier.clone(),
        text:       node.text.clone(),
      };
      self.drafts.insert(id, draft);
    }
    self.focus = Some(NodeField::Identifier);
  }

  fn focused_draft(&mut self) -> Option<(&mut NodeDraft, NodeField)> {
    let field = self.focus?;
    let id = self.cursor_id()?;
    self.drafts.get_mut(&id).map(|d| (d, field))
  }

  pub fn input(&mut self, c: char) {
    if let Some((draft, field)) = self.focused_draft() {
      match field {
        NodeField::Identifier => draft.identifier.push(c),
        NodeField::Text => draft.text.push(c),
      }
    }
  }

  pub fn backspace(&mut self) {
    if let Some((draft, field)) = self.focused_draft() {
      match field {
        NodeField::Identifier => draft.identifier.pop(),
        NodeField::Text => draft.text.pop(),
      };
    }
  }

  pub fn switch_field(&mut self) {
    self.focus = match self.focus {
      Some(NodeField::Identifier) => Some(NodeField::Text),
      Some(NodeField::Text) => Some(NodeField::Identifier),
      None => None,
    };
  }

  /// Write the cursor row's draft into the tree.
  pub fn commit(&mut self) {
    self.focus = None;
    let Some(id) = self.cursor_id() else {
      return;
    };
    if let Some(draft) = self.drafts.remove(&id) {
      self.tree = self.tree.edit(&id, &draft.identifier, &draft.text);
      self.dirty = true;
    }
  }

  /// Drop keyboard focus; the draft stays pending.
  pub fn leave(&mut self) { self.focus = None; }

  /// Throw away the cursor row's draft.
  pub fn discard(&mut self) {
    self.focus = None;
    if let Some(id) = self.cursor_id() {
      self.drafts.remove(&id);
    }
  }

  // ── Structure ─────────────────────────────────────────────────────────────

  /// Give the cursor row a new empty child and start editing it.
  pub fn add_child(&mut self) {
    let Some(parent) = self.cursor_id() else {
      return;
    };
    let id = NodeId::child_of(&parent);
    self.tree = self.tree.add_child(&parent, id.clone());
    self.after_structure_change();
    self.focus_on(&id);
    self.begin_edit();
  }

  /// Append a new empty top-level node and start editing it.
  pub fn add_root(&mut self) {
    let id = NodeId::new_root();
    self.tree = self.tree.add_root_node(id.clone());
    self.after_structure_change();
    self.focus_on(&id);
    self.begin_edit();
  }

  /// Remove the cursor row and everything beneath it.
  pub fn delete(&mut self) {
    let Some(id) = self.cursor_id() else {
      return;
    };
    self.tree = self.tree.delete_node(&id);
    self.focus = None;
    let tree = &self.tree;
    self.drafts.retain(|id, _| tree.contains(id));
    self.after_structure_change();
    self.cursor = self.cursor.min(self.tree.node_count().saturating_sub(1));
  }

  /// Move the cursor row `delta` places among its siblings.
  pub fn move_node(&mut self, delta: isize) {
    let Some(id) = self.cursor_id() else {
      return;
    };
    let Some((container, from)) = self.tree.position_of(&id) else {
      return;
    };
    let len = self.tree.container(&container).map_or(0, <[_]>::len);
    let to = step(from, delta, len);
    if to == from {
      return;
    }
    let moved = self.tree.reorder(&container, from, to);
    self.order = SortOrderMap::build(&moved);
    self.tree = self.order.apply(&moved);
    self.dirty = true;
    self.focus_on(&id);
  }

  fn after_structure_change(&mut self) {
    self.order = SortOrderMap::build(&self.tree);
    self.dirty = true;
  }

  // ── Persistence ───────────────────────────────────────────────────────────

  /// The `PATCH /subconditions` payload for the current tree.
  pub fn updates(&self) -> Vec<SubconditionUpdate> { self.tree.to_updates(&self.order) }

  /// Adopt the server's copy after a save. Drafts on surviving rows are kept.
  pub fn reset(&mut self, tree: SubconditionTree) {
    self.order = SortOrderMap::build(&tree);
    self.tree = tree;
    let tree = &self.tree;
    self.drafts.retain(|id, _| tree.contains(id));
    if self.drafts.is_empty() {
      self.focus = None;
    }
    self.dirty = false;
    self.cursor = self.cursor.min(self.tree.node_count().saturating_sub(1));
  }
}

// ─── Attributes ───────────────────────────────────────────────────────────────

/// One line of the attributes tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeLine {
  /// Heading of a management plan.
  Plan(i64),
  /// An attribute, with the plan it belongs to.
  Attribute { id: i64, plan: Option<i64> },
}

/// The attribute collections of the open condition plus editing state.
#[derive(Debug, Clone, Default)]
pub struct AttributeEditor {
  attributes: ConditionAttributes,
  drafts:     HashMap<i64, String>,
  focused:    bool,
  cursor:     usize,
}

impl AttributeEditor {
  pub fn new(attributes: ConditionAttributes) -> Self {
    Self {
      attributes,
      ..Self::default()
    }
  }

  pub fn attributes(&self) -> &ConditionAttributes { &self.attributes }

  pub fn cursor(&self) -> usize { self.cursor }

  pub fn is_focused(&self) -> bool { self.focused }

  pub fn is_editing(&self) -> bool { !self.drafts.is_empty() }

  pub fn draft(&self, id: i64) -> Option<&str> { self.drafts.get(&id).map(String::as_str) }

  /// Independent attributes first, then each plan's heading and attributes.
  pub fn lines(&self) -> Vec<AttributeLine> {
    let mut lines: Vec<AttributeLine> = self
      .attributes
      .independent_attributes
      .iter()
      .map(|a| AttributeLine::Attribute { id: a.id, plan: None })
      .collect();
    for plan in &self.attributes.management_plans {
      lines.push(AttributeLine::Plan(plan.id));
      lines.extend(plan.attributes.iter().map(|a| AttributeLine::Attribute {
        id:   a.id,
        plan: Some(plan.id),
      }));
    }
    lines
  }

  pub fn move_cursor(&mut self, delta: isize) {
    self.cursor = step(self.cursor, delta, self.lines().len());
  }

  pub fn cursor_line(&self) -> Option<AttributeLine> { self.lines().get(self.cursor).copied() }

  /// The plan the cursor line belongs to, if any.
  pub fn cursor_plan(&self) -> Option<i64> {
    match self.cursor_line()? {
      AttributeLine::Plan(id) => Some(id),
      AttributeLine::Attribute { plan, .. } => plan,
    }
  }

  fn cursor_attribute(&self) -> Option<i64> {
    match self.cursor_line()? {
      AttributeLine::Attribute { id, .. } => Some(id),
      AttributeLine::Plan(_) => None,
    }
  }

  /// Open (or resume) a draft on the cursor attribute.
  ///
  /// Flag attributes have no free text: their draft flips between `true` and
  /// `false` instead, and stays unfocused.
  pub fn begin_edit(&mut self) {
    let Some(id) = self.cursor_attribute() else {
      return;
    };
    let Some(attr) = self.attributes.find(id) else {
      return;
    };
    if attr.known_key().is_some_and(|k| k.is_flag()) {
      let current = self
        .drafts
        .get(&id)
        .map_or(attr.is_truthy(), |v| v.eq_ignore_ascii_case("true"));
      self.drafts.insert(id, (!current).to_string());
      return;
    }
    let value = attr.value.clone();
    self.drafts.entry(id).or_insert(value);
    self.focused = true;
  }

  pub fn input(&mut self, c: char) {
    if !self.focused {
      return;
    }
    if let Some(draft) = self.cursor_attribute().and_then(|id| self.drafts.get_mut(&id)) {
      draft.push(c);
    }
  }

  pub fn backspace(&mut self) {
    if !self.focused {
      return;
    }
    if let Some(draft) = self.cursor_attribute().and_then(|id| self.drafts.get_mut(&id)) {
      draft.pop();
    }
  }

  /// Write the cursor attribute's draft into the collection. Returns whether
  /// anything changed.
  pub fn commit(&mut self) -> bool {
    self.focused = false;
    let Some(id) = self.cursor_attribute() else {
      return false;
    };
    match self.drafts.remove(&id) {
      Some(value) => {
        self.attributes.set_value(id, &value);
        true
      }
      None => false,
    }
  }

  pub fn leave(&mut self) { self.focused = false; }

  pub fn discard(&mut self) {
    self.focused = false;
    if let Some(id) = self.cursor_attribute() {
      self.drafts.remove(&id);
    }
  }

  /// Take the name and approval of a plan returned by the server. Its
  /// attributes stay as edited locally.
  pub fn update_plan(&mut self, plan: &ManagementPlan) {
    if let Some(slot) = self
      .attributes
      .management_plans
      .iter_mut()
      .find(|p| p.id == plan.id)
    {
      slot.name.clone_from(&plan.name);
      slot.is_approved = plan.is_approved;
    }
  }

  pub fn remove_plan(&mut self, plan_id: i64) {
    let removed: Vec<i64> = self
      .attributes
      .plan(plan_id)
      .map(|p| p.attributes.iter().map(|a| a.id).collect())
      .unwrap_or_default();
    self.attributes.management_plans.retain(|p| p.id != plan_id);
    self.drafts.retain(|id, _| !removed.contains(id));
    self.cursor = self.cursor.min(self.lines().len().saturating_sub(1));
  }

  /// Adopt the server's copy. Drafts on surviving attributes are kept.
  pub fn reset(&mut self, attributes: ConditionAttributes) {
    self.attributes = attributes;
    let attributes = &self.attributes;
    self.drafts.retain(|id, _| attributes.find(*id).is_some());
    if self.drafts.is_empty() {
      self.focused = false;
    }
    self.cursor = self.cursor.min(self.lines().len().saturating_sub(1));
  }

  /// Display key of an attribute line.
  pub fn key_label(&self, id: i64) -> &str {
    self
      .attributes
      .find(id)
      .map(|a| a.known_key().map_or(a.key.as_str(), |k| k.as_str()))
      .unwrap_or_default()
  }
}

/// Move `at` by `delta`, clamped to `0..len`.
fn step(at: usize, delta: isize, len: usize) -> usize {
  if len == 0 {
    return 0;
  }
  at.saturating_add_signed(delta).min(len - 1)
}

#[cfg(test)]
mod tests {
  use conrep_core::{
    attribute::{AttributeKey, ConditionAttribute},
    subcondition::Subcondition,
  };

  use super::*;

  fn node(id: i64, children: Vec<Subcondition>) -> Subcondition {
    Subcondition {
      id: NodeId::from(id),
      identifier: format!("{id})"),
      text: format!("text {id}"),
      sort_order: 0,
      children,
    }
  }

  fn editor() -> DescriptionEditor {
    DescriptionEditor::new(SubconditionTree::new(vec![
      node(1, vec![node(2, vec![]), node(3, vec![])]),
      node(4, vec![]),
    ]))
  }

  fn type_str(ed: &mut DescriptionEditor, s: &str) {
    for c in s.chars() {
      ed.input(c);
    }
  }

  #[test]
  fn edit_commit_updates_tree() {
    let mut ed = editor();
    ed.move_cursor(1);
    ed.begin_edit();
    type_str(&mut ed, "x");
    ed.switch_field();
    ed.backspace();
    type_str(&mut ed, "!");
    assert!(ed.is_editing());
    ed.commit();

    let two = ed.tree().find(&NodeId::from(2)).unwrap();
    assert_eq!(two.identifier, "2)x");
    assert_eq!(two.text, "text !");
    assert!(!ed.is_editing());
    assert!(ed.is_dirty());
  }

  #[test]
  fn leaving_keeps_draft_pending() {
    let mut ed = editor();
    ed.begin_edit();
    type_str(&mut ed, "z");
    ed.leave();
    assert!(ed.is_editing());
    assert_eq!(ed.focus(), None);
    // Keys typed without focus go nowhere.
    type_str(&mut ed, "q");
    assert_eq!(ed.draft(&NodeId::from(1)).unwrap().identifier, "1)z");

    ed.discard();
    assert!(!ed.is_editing());
    assert!(!ed.is_dirty());
  }

  #[test]
  fn add_child_focuses_new_leaf() {
    let mut ed = editor();
    ed.move_cursor(3); // node 4
    ed.add_child();
    let id = ed.cursor_id().unwrap();
    assert!(id.as_str().starts_with("4-"));
    assert_eq!(ed.focus(), Some(NodeField::Identifier));
    type_str(&mut ed, "a)");
    ed.commit();

    let four = ed.tree().find(&NodeId::from(4)).unwrap();
    assert_eq!(four.children.len(), 1);
    assert_eq!(four.children[0].identifier, "a)");
  }

  #[test]
  fn move_node_reorders_siblings_and_follows_cursor() {
    let mut ed = editor();
    ed.move_cursor(1); // node 2
    ed.move_node(1);
    let one = ed.tree().find(&NodeId::from(1)).unwrap();
    let ids: Vec<_> = one.children.iter().map(|c| c.id.to_string()).collect();
    assert_eq!(ids, ["3", "2"]);
    assert_eq!(ed.cursor_id(), Some(NodeId::from(2)));

    let updates = ed.updates();
    let two = updates.iter().find(|u| u.subcondition_id == NodeId::from(2)).unwrap();
    assert_eq!(two.sort_order, 2);
  }

  #[test]
  fn move_node_past_the_end_is_noop() {
    let mut ed = editor();
    ed.move_cursor(3); // node 4, last root
    ed.move_node(1);
    assert!(!ed.is_dirty());
  }

  #[test]
  fn delete_drops_drafts_of_removed_rows() {
    let mut ed = editor();
    ed.move_cursor(1);
    ed.begin_edit();
    ed.leave();
    ed.move_cursor(-1);
    ed.delete();
    assert!(!ed.is_editing());
    assert_eq!(ed.tree().node_count(), 1);
    assert_eq!(ed.cursor(), 0);
  }

  #[test]
  fn reset_adopts_server_copy() {
    let mut ed = editor();
    ed.add_root();
    ed.commit();
    assert!(ed.is_dirty());
    ed.reset(SubconditionTree::new(vec![node(1, vec![]), node(9, vec![])]));
    assert!(!ed.is_dirty());
    assert_eq!(ed.tree().node_count(), 2);
    assert_eq!(ed.cursor(), 1);
  }

  fn attr(id: i64, key: AttributeKey, value: &str) -> ConditionAttribute {
    ConditionAttribute {
      id,
      key: key.to_string(),
      value: value.to_owned(),
    }
  }

  fn attributes() -> AttributeEditor {
    AttributeEditor::new(ConditionAttributes {
      independent_attributes: vec![
        attr(1, AttributeKey::RequiresConsultation, "false"),
        attr(2, AttributeKey::PartiesRequiredToBeConsulted, ""),
      ],
      management_plans:       vec![ManagementPlan {
        id:          7,
        name:        "Dust".into(),
        is_approved: false,
        attributes:  vec![attr(3, AttributeKey::Submitter, "")],
      }],
    })
  }

  #[test]
  fn attribute_lines_group_plans() {
    let ed = attributes();
    assert_eq!(
      ed.lines(),
      [
        AttributeLine::Attribute { id: 1, plan: None },
        AttributeLine::Attribute { id: 2, plan: None },
        AttributeLine::Plan(7),
        AttributeLine::Attribute { id: 3, plan: Some(7) },
      ]
    );
  }

  #[test]
  fn flag_attributes_toggle() {
    let mut ed = attributes();
    ed.begin_edit();
    assert_eq!(ed.draft(1), Some("true"));
    assert!(!ed.is_focused());
    assert!(ed.commit());
    assert!(ed.attributes().find(1).unwrap().is_truthy());
  }

  #[test]
  fn text_attribute_edit_and_commit() {
    let mut ed = attributes();
    ed.move_cursor(3);
    assert_eq!(ed.cursor_plan(), Some(7));
    ed.begin_edit();
    for c in "Holder".chars() {
      ed.input(c);
    }
    assert!(ed.is_editing());
    assert!(ed.commit());
    assert_eq!(ed.attributes().find(3).unwrap().value, "Holder");
    assert!(!ed.is_editing());
  }

  #[test]
  fn plan_heading_is_not_editable() {
    let mut ed = attributes();
    ed.move_cursor(2);
    ed.begin_edit();
    assert!(!ed.is_editing());
    assert!(!ed.commit());
  }

  #[test]
  fn remove_plan_drops_its_drafts() {
    let mut ed = attributes();
    ed.move_cursor(3);
    ed.begin_edit();
    ed.leave();
    ed.remove_plan(7);
    assert!(!ed.is_editing());
    assert_eq!(ed.lines().len(), 2);
    assert_eq!(ed.cursor(), 1);
  }
}
