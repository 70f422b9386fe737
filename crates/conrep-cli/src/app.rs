//! Application state machine and event dispatcher.

use std::sync::Arc;

use conrep_core::{
  ValidationError,
  approval::{self, ApprovalChange, ApprovalTarget},
  condition::{AttributesUpdate, Condition, ConditionSummary, DocumentConditions, NewCondition},
  project::{Amendment, Document, Project},
  service::ConditionService,
};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use fuzzy_matcher::{FuzzyMatcher, skim::SkimMatcherV2};
use tracing::{info, warn};

use crate::editor::{AttributeEditor, DescriptionEditor};

// ─── Screen ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
  Projects,
  /// Documents of the open project.
  Documents,
  /// Conditions of the open document.
  Conditions,
  /// One condition, with its description and attribute editors.
  Condition,
  /// A requested record does not exist; carries the failed lookup.
  NotFound(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
  Description,
  Attributes,
}

impl Tab {
  fn other(self) -> Self {
    match self {
      Self::Description => Self::Attributes,
      Self::Attributes => Self::Description,
    }
  }
}

// ─── App ──────────────────────────────────────────────────────────────────────

/// Top-level application state.
pub struct App<S> {
  pub screen: Screen,
  pub tab:    Tab,

  pub projects:   Vec<Project>,
  pub documents:  Vec<Document>,
  /// Amendments of the open document.
  pub amendments: Vec<Amendment>,
  pub conditions: Option<DocumentConditions>,

  /// The open condition as last received from the server, with approval
  /// flags kept current.
  pub condition:   Option<Condition>,
  pub description: DescriptionEditor,
  pub attributes:  AttributeEditor,

  pub project_id:  Option<String>,
  pub document_id: Option<String>,

  /// Current fuzzy-filter string (only active when `filter_active`).
  pub filter:        String,
  pub filter_active: bool,
  /// Cursor position within the *filtered* list of a browsing screen.
  pub list_cursor:   usize,

  /// One-line status message shown in the status bar.
  pub status_msg: String,

  /// Set by a first `Esc` on a condition with unsaved work.
  leave_armed: bool,

  service: Arc<S>,
}

impl<S: ConditionService> App<S> {
  pub fn new(service: S) -> Self {
    Self {
      screen: Screen::Projects,
      tab: Tab::Description,
      projects: Vec::new(),
      documents: Vec::new(),
      amendments: Vec::new(),
      conditions: None,
      condition: None,
      description: DescriptionEditor::default(),
      attributes: AttributeEditor::default(),
      project_id: None,
      document_id: None,
      filter: String::new(),
      filter_active: false,
      list_cursor: 0,
      status_msg: String::new(),
      leave_armed: false,
      service: Arc::new(service),
    }
  }

  /// Report a failed call in the status bar. Local state, including unsaved
  /// edits, is left alone.
  fn report(&mut self, action: &str, err: S::Error) {
    warn!(error = %err, action, "request failed");
    self.status_msg = format!("{action} failed: {err}");
  }

  /// Report a failed navigation. A missing record gets its own screen.
  fn report_load(&mut self, action: &str, err: S::Error) {
    if S::is_not_found(&err) {
      warn!(error = %err, action, "record not found");
      self.screen = Screen::NotFound(err.to_string());
      self.status_msg.clear();
    } else {
      self.report(action, err);
    }
  }

  fn reset_list(&mut self) {
    self.filter.clear();
    self.filter_active = false;
    self.list_cursor = 0;
  }

  // ── Data loading ──────────────────────────────────────────────────────────

  pub async fn load_projects(&mut self) {
    self.status_msg = "Loading projects…".into();
    match self.service.list_projects().await {
      Ok(projects) => {
        self.projects = projects;
        self.screen = Screen::Projects;
        self.reset_list();
        self.status_msg.clear();
      }
      Err(e) => self.report_load("loading projects", e),
    }
  }

  async fn open_project(&mut self, project_id: String) {
    match self.service.list_documents(&project_id).await {
      Ok(documents) => {
        self.documents = documents;
        self.project_id = Some(project_id);
        self.screen = Screen::Documents;
        self.reset_list();
        self.status_msg.clear();
      }
      Err(e) => self.report_load("loading documents", e),
    }
  }

  async fn open_document(&mut self, document_id: String) {
    let Some(project_id) = self.project_id.clone() else {
      return;
    };
    let conditions = match self.service.list_conditions(&project_id, &document_id).await {
      Ok(conditions) => conditions,
      Err(e) => return self.report_load("loading conditions", e),
    };
    let amendments = match self.service.list_amendments(&document_id).await {
      Ok(amendments) => amendments,
      Err(e) => return self.report_load("loading amendments", e),
    };
    self.conditions = Some(conditions);
    self.amendments = amendments;
    self.document_id = Some(document_id);
    self.screen = Screen::Conditions;
    self.reset_list();
    self.status_msg.clear();
  }

  async fn open_condition(&mut self, condition_id: i64) {
    let (Some(project_id), Some(document_id)) = (self.project_id.clone(), self.document_id.clone())
    else {
      return;
    };
    let mut condition = match self
      .service
      .get_condition(&project_id, &document_id, condition_id)
      .await
    {
      Ok(condition) => condition,
      Err(e) => return self.report_load("loading condition", e),
    };
    match self
      .service
      .get_condition_attributes(&project_id, condition_id)
      .await
    {
      Ok(attributes) => condition.condition_attributes = attributes,
      Err(e) => return self.report_load("loading attributes", e),
    }
    self.show_condition(condition);
  }

  fn show_condition(&mut self, condition: Condition) {
    self.description = DescriptionEditor::new(condition.tree());
    self.attributes = AttributeEditor::new(condition.condition_attributes.clone());
    self.condition = Some(condition);
    self.screen = Screen::Condition;
    self.tab = Tab::Description;
    self.leave_armed = false;
    self.status_msg.clear();
  }

  /// Step one screen up, reloading the list being returned to.
  async fn back(&mut self) {
    match self.screen {
      Screen::Condition => {
        if self.has_unsaved_work() && !self.leave_armed {
          self.leave_armed = true;
          self.status_msg = "Unsaved changes: s to save, Esc again to leave".into();
          return;
        }
        self.condition = None;
        self.screen = Screen::Conditions;
        if let Some(document_id) = self.document_id.clone() {
          self.open_document(document_id).await;
        }
      }
      Screen::Conditions => {
        self.conditions = None;
        self.amendments.clear();
        self.document_id = None;
        self.screen = Screen::Documents;
        self.reset_list();
      }
      Screen::Documents => {
        self.documents.clear();
        self.project_id = None;
        self.screen = Screen::Projects;
        self.reset_list();
      }
      Screen::NotFound(_) => {
        self.condition = None;
        self.conditions = None;
        self.document_id = None;
        self.project_id = None;
        self.load_projects().await;
      }
      Screen::Projects => {}
    }
  }

  // ── Filtered lists ────────────────────────────────────────────────────────

  /// Display labels of the list on the current browsing screen.
  pub fn list_labels(&self) -> Vec<String> {
    match self.screen {
      Screen::Projects => self.projects.iter().map(|p| p.project_name.clone()).collect(),
      Screen::Documents => self.documents.iter().map(|d| d.document_label.clone()).collect(),
      Screen::Conditions => self
        .conditions
        .iter()
        .flat_map(|c| c.conditions.iter())
        .map(ConditionSummary::title)
        .collect(),
      Screen::Condition | Screen::NotFound(_) => Vec::new(),
    }
  }

  /// Indices into the current list that match the filter.
  pub fn filtered_indices(&self) -> Vec<usize> {
    let labels = self.list_labels();
    if self.filter.is_empty() {
      return (0..labels.len()).collect();
    }
    let matcher = SkimMatcherV2::default();
    labels
      .iter()
      .enumerate()
      .filter(|(_, label)| matcher.fuzzy_match(label, &self.filter).is_some())
      .map(|(i, _)| i)
      .collect()
  }

  /// Index of the item under the list cursor, if any.
  pub fn cursor_index(&self) -> Option<usize> {
    self.filtered_indices().get(self.list_cursor).copied()
  }

  pub fn cursor_condition(&self) -> Option<&ConditionSummary> {
    let i = self.cursor_index()?;
    self.conditions.as_ref()?.conditions.get(i)
  }

  // ── Key handling ──────────────────────────────────────────────────────────

  /// Process a key event. Returns `true` to continue, `false` to quit.
  pub async fn handle_key(&mut self, key: KeyEvent) -> anyhow::Result<bool> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
      return Ok(false);
    }

    if self.filter_active {
      self.handle_filter_key(key).await;
      return Ok(true);
    }

    match self.screen {
      Screen::Projects | Screen::Documents | Screen::Conditions => self.handle_list_key(key).await,
      Screen::Condition => self.handle_condition_key(key).await,
      Screen::NotFound(_) => match key.code {
        KeyCode::Char('q') => Ok(false),
        KeyCode::Esc | KeyCode::Enter | KeyCode::Char('h') => {
          self.back().await;
          Ok(true)
        }
        _ => Ok(true),
      },
    }
  }

  async fn handle_filter_key(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Esc => self.reset_list(),
      KeyCode::Enter => {
        self.filter_active = false;
        self.list_cursor = 0;
        if self.filtered_indices().len() == 1 {
          self.open_cursor().await;
        }
      }
      KeyCode::Backspace => {
        self.filter.pop();
        self.list_cursor = 0;
      }
      KeyCode::Char(c) => {
        self.filter.push(c);
        self.list_cursor = 0;
      }
      _ => {}
    }
  }

  async fn handle_list_key(&mut self, key: KeyEvent) -> anyhow::Result<bool> {
    match key.code {
      KeyCode::Char('q') => return Ok(false),

      KeyCode::Down | KeyCode::Char('j') => {
        if self.list_cursor + 1 < self.filtered_indices().len() {
          self.list_cursor += 1;
        }
      }
      KeyCode::Up | KeyCode::Char('k') => {
        self.list_cursor = self.list_cursor.saturating_sub(1);
      }

      KeyCode::Enter | KeyCode::Right | KeyCode::Char('l') => self.open_cursor().await,
      KeyCode::Esc | KeyCode::Left | KeyCode::Char('h') => self.back().await,

      KeyCode::Char('/') => {
        self.reset_list();
        self.filter_active = true;
      }

      KeyCode::Char('n') if self.screen == Screen::Conditions => self.create_condition(None).await,
      KeyCode::Char('c') if self.screen == Screen::Conditions => {
        if let Some(id) = self.cursor_condition().map(|c| c.condition_id) {
          self.create_condition(Some(id)).await;
        }
      }

      _ => {}
    }
    Ok(true)
  }

  /// Open the item under the list cursor.
  async fn open_cursor(&mut self) {
    let Some(i) = self.cursor_index() else {
      return;
    };
    match self.screen {
      Screen::Projects => {
        let id = self.projects[i].project_id.clone();
        self.open_project(id).await;
      }
      Screen::Documents => {
        let id = self.documents[i].document_id.clone();
        self.open_document(id).await;
      }
      Screen::Conditions => {
        if let Some(id) = self.cursor_condition().map(|c| c.condition_id) {
          self.open_condition(id).await;
        }
      }
      Screen::Condition | Screen::NotFound(_) => {}
    }
  }

  async fn handle_condition_key(&mut self, key: KeyEvent) -> anyhow::Result<bool> {
    if key.code != KeyCode::Esc {
      self.leave_armed = false;
    }

    // Keystrokes go into the focused draft first.
    match self.tab {
      Tab::Description if self.description.focus().is_some() => {
        match key.code {
          KeyCode::Char(c) => self.description.input(c),
          KeyCode::Backspace => self.description.backspace(),
          KeyCode::Tab => self.description.switch_field(),
          KeyCode::Enter => self.description.commit(),
          KeyCode::Esc => self.description.leave(),
          _ => {}
        }
        return Ok(true);
      }
      Tab::Attributes if self.attributes.is_focused() => {
        match key.code {
          KeyCode::Char(c) => self.attributes.input(c),
          KeyCode::Backspace => self.attributes.backspace(),
          KeyCode::Enter => self.commit_attribute().await,
          KeyCode::Esc => self.attributes.leave(),
          _ => {}
        }
        return Ok(true);
      }
      _ => {}
    }

    match key.code {
      KeyCode::Char('q') => return Ok(false),
      KeyCode::Esc | KeyCode::Char('h') => self.back().await,
      KeyCode::Tab => self.tab = self.tab.other(),
      KeyCode::Char('t') => self.toggle_approval(ApprovalTarget::TopicTags).await,
      _ => match self.tab {
        Tab::Description => self.handle_description_key(key).await,
        Tab::Attributes => self.handle_attributes_key(key).await,
      },
    }
    Ok(true)
  }

  async fn handle_description_key(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Down | KeyCode::Char('j') => self.description.move_cursor(1),
      KeyCode::Up | KeyCode::Char('k') => self.description.move_cursor(-1),
      KeyCode::Char('e') | KeyCode::Enter => self.description.begin_edit(),
      KeyCode::Char('u') => self.description.discard(),
      KeyCode::Char('a') => self.description.add_child(),
      KeyCode::Char('A') => self.description.add_root(),
      KeyCode::Char('d') => self.description.delete(),
      KeyCode::Char('J') => self.description.move_node(1),
      KeyCode::Char('K') => self.description.move_node(-1),
      KeyCode::Char('s') => self.save_description().await,
      KeyCode::Char('p') => self.toggle_approval(ApprovalTarget::Description).await,
      _ => {}
    }
  }

  async fn handle_attributes_key(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Down | KeyCode::Char('j') => self.attributes.move_cursor(1),
      KeyCode::Up | KeyCode::Char('k') => self.attributes.move_cursor(-1),
      KeyCode::Char('e') | KeyCode::Enter => {
        self.attributes.begin_edit();
        // Flag attributes flip without taking focus; persist right away.
        if self.attributes.is_editing() && !self.attributes.is_focused() {
          self.commit_attribute().await;
        }
      }
      KeyCode::Char('u') => self.attributes.discard(),
      KeyCode::Char('s') => self.save_attributes().await,
      KeyCode::Char('p') => self.toggle_approval(ApprovalTarget::Attributes).await,
      KeyCode::Char('m') => {
        if let Some(plan_id) = self.attributes.cursor_plan() {
          self.toggle_approval(ApprovalTarget::ManagementPlan(plan_id)).await;
        }
      }
      KeyCode::Char('x') => self.delete_plan().await,
      KeyCode::Char('M') => self.flip_requires_management_plan().await,
      _ => {}
    }
  }

  // ── Condition actions ─────────────────────────────────────────────────────

  fn has_unsaved_work(&self) -> bool {
    self.description.is_dirty() || self.description.is_editing() || self.attributes.is_editing()
  }

  /// The open condition with the editors' committed content folded in.
  fn current_condition(&self) -> Option<Condition> {
    let mut condition = self.condition.clone()?;
    condition.subconditions = self.description.tree().roots().to_vec();
    condition.condition_attributes = self.attributes.attributes().clone();
    Some(condition)
  }

  /// Persist the description tree with sort orders taken from its shape.
  pub async fn save_description(&mut self) {
    let Some(condition_id) = self.condition.as_ref().map(|c| c.condition_id) else {
      return;
    };
    if self.description.is_editing() {
      self.status_msg = "commit or discard the rows being edited before saving".into();
      return;
    }
    if !self.description.is_dirty() {
      self.status_msg = "Description has no unsaved changes".into();
      return;
    }
    let updates = self.description.updates();
    match self.service.update_subconditions(&updates).await {
      Ok(updated) => {
        info!(condition_id, rows = updates.len(), "description saved");
        self.description.reset(updated.tree());
        if let Some(condition) = self.condition.as_mut() {
          condition.subconditions = updated.subconditions;
        }
        self.status_msg = "Description saved".into();
      }
      Err(e) => self.report("saving description", e),
    }
  }

  async fn commit_attribute(&mut self) {
    if self.attributes.commit() {
      self.save_attributes().await;
    }
  }

  /// Persist the attribute collections as committed in the editor.
  pub async fn save_attributes(&mut self) {
    let Some(condition) = self.condition.as_ref() else {
      return;
    };
    let condition_id = condition.condition_id;
    let update = AttributesUpdate {
      requires_management_plan: condition.requires_management_plan,
      condition_attribute:      self.attributes.attributes().clone(),
    };
    match self
      .service
      .update_condition_attributes(condition_id, &update)
      .await
    {
      Ok(attributes) => {
        info!(condition_id, "attributes saved");
        self.attributes.reset(attributes.clone());
        if let Some(condition) = self.condition.as_mut() {
          condition.condition_attributes = attributes;
        }
        self.status_msg = "Attributes saved".into();
      }
      Err(e) => self.report("saving attributes", e),
    }
  }

  /// Flip the approval of `target`, subject to its guard.
  pub async fn toggle_approval(&mut self, target: ApprovalTarget) {
    let Some(condition) = self.current_condition() else {
      return;
    };
    let rows_editing = self.description.is_editing() || self.attributes.is_editing();
    let checked = approval::toggle(&condition, target, rows_editing).and_then(|change| {
      if change.state().is_approved() && self.description.is_dirty() {
        Err(ValidationError::UnsavedDescription)
      } else {
        Ok(change)
      }
    });
    let change = match checked {
      Ok(change) => change,
      Err(refused) => {
        self.status_msg = refused.to_string();
        return;
      }
    };
    let state = if change.state().is_approved() { "approved" } else { "unapproved" };
    let label = target_label(&condition, target);

    match change {
      ApprovalChange::Condition(patch) => {
        let (Some(project_id), Some(document_id)) = (self.project_id.clone(), self.document_id.clone())
        else {
          return;
        };
        let result = self
          .service
          .update_condition(&project_id, &document_id, condition.condition_id, &patch)
          .await;
        match result {
          Ok(updated) => {
            if let Some(condition) = self.condition.as_mut() {
              condition.is_approved = updated.is_approved;
              condition.is_condition_attributes_approved = updated.is_condition_attributes_approved;
              condition.is_topic_tags_approved = updated.is_topic_tags_approved;
            }
          }
          Err(e) => return self.report("updating approval", e),
        }
      }
      ApprovalChange::ManagementPlan { plan_id, patch } => {
        match self.service.update_management_plan(plan_id, &patch).await {
          Ok(plan) => {
            self.attributes.update_plan(&plan);
            if let Some(slot) = self
              .condition
              .as_mut()
              .and_then(|c| c.condition_attributes.management_plans.iter_mut().find(|p| p.id == plan_id))
            {
              slot.is_approved = plan.is_approved;
            }
          }
          Err(e) => return self.report("updating plan approval", e),
        }
      }
    }

    info!(condition_id = condition.condition_id, layer = %label, state, "approval changed");
    self.status_msg = format!("{label} {state}");
  }

  async fn delete_plan(&mut self) {
    let Some(plan_id) = self.attributes.cursor_plan() else {
      self.status_msg = "No management plan under the cursor".into();
      return;
    };
    match self.service.delete_management_plan(plan_id).await {
      Ok(()) => {
        info!(plan_id, "management plan deleted");
        self.attributes.remove_plan(plan_id);
        if let Some(condition) = self.condition.as_mut() {
          condition.condition_attributes.management_plans.retain(|p| p.id != plan_id);
        }
        self.status_msg = "Management plan deleted".into();
      }
      Err(e) => self.report("deleting management plan", e),
    }
  }

  /// Switch between plan-based and independent attributes. The server drops
  /// the old set and seeds the new one; reload afterwards.
  async fn flip_requires_management_plan(&mut self) {
    let Some(condition) = self.condition.as_ref() else {
      return;
    };
    let Some(project_id) = self.project_id.clone() else {
      return;
    };
    let condition_id = condition.condition_id;
    let requires = !condition.requires_management_plan;

    if let Err(e) = self
      .service
      .delete_condition_attributes(condition_id, requires)
      .await
    {
      return self.report("switching management plan", e);
    }
    match self
      .service
      .get_condition_attributes(&project_id, condition_id)
      .await
    {
      Ok(attributes) => {
        info!(condition_id, requires, "management plan requirement changed");
        self.attributes.reset(attributes.clone());
        if let Some(condition) = self.condition.as_mut() {
          condition.requires_management_plan = requires;
          condition.condition_attributes = attributes;
        }
        self.status_msg = if requires {
          "Management plan required".into()
        } else {
          "Management plan no longer required".into()
        };
      }
      Err(e) => self.report("reloading attributes", e),
    }
  }

  /// Create a blank condition, or a copy of `copied_from`, and open it.
  async fn create_condition(&mut self, copied_from: Option<i64>) {
    let Some(document_id) = self.document_id.clone() else {
      return;
    };
    let listed = self.conditions.as_ref().map(|c| c.conditions.as_slice()).unwrap_or_default();
    let next_number = listed.iter().filter_map(|c| c.condition_number).max().unwrap_or(0) + 1;
    let condition_name = copied_from
      .and_then(|id| listed.iter().find(|c| c.condition_id == id))
      .and_then(|c| c.condition_name.clone());
    let new = NewCondition {
      condition_number: Some(next_number),
      condition_name,
      copied_from,
    };

    match self.service.create_condition(&document_id, &new).await {
      Ok(condition) => {
        info!(condition_id = condition.condition_id, ?copied_from, "condition created");
        if let Some(list) = self.conditions.as_mut() {
          list.conditions.push(ConditionSummary {
            condition_id:                     condition.condition_id,
            condition_name:                   condition.condition_name.clone(),
            condition_number:                 condition.condition_number,
            is_approved:                      condition.is_approved,
            is_condition_attributes_approved: condition.is_condition_attributes_approved,
            amendment_names:                  None,
          });
        }
        self.show_condition(condition);
      }
      Err(e) => self.report("creating condition", e),
    }
  }
}

fn target_label(condition: &Condition, target: ApprovalTarget) -> String {
  match target {
    ApprovalTarget::Description => "Description".into(),
    ApprovalTarget::Attributes => "Attributes".into(),
    ApprovalTarget::TopicTags => "Topic tags".into(),
    ApprovalTarget::ManagementPlan(id) => condition
      .condition_attributes
      .plan(id)
      .map_or_else(|| format!("Plan {id}"), |p| format!("Plan {:?}", p.name)),
  }
}
