//! Conditions (regulatory obligations with a description tree and
//! attributes) and the request bodies that mutate them.

use serde::{Deserialize, Serialize};

use crate::{
  approval::ApprovalState,
  attribute::ConditionAttributes,
  subcondition::Subcondition,
  tree::SubconditionTree,
};

/// Full projection of a condition as returned by the detail endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
  pub condition_id:                     i64,
  pub condition_name:                   Option<String>,
  pub condition_number:                 Option<i32>,
  pub condition_text:                   Option<String>,
  /// Approval of the description (the subcondition tree).
  #[serde(default)]
  pub is_approved:                      bool,
  #[serde(default)]
  pub is_condition_attributes_approved: bool,
  #[serde(default)]
  pub is_topic_tags_approved:           bool,
  #[serde(default)]
  pub requires_management_plan:         bool,
  #[serde(default)]
  pub topic_tags:                       Vec<String>,
  #[serde(default)]
  pub subconditions:                    Vec<Subcondition>,
  #[serde(default)]
  pub condition_attributes:             ConditionAttributes,
}

impl Condition {
  /// `"<number>. <name>"`, falling back to whichever part is present.
  pub fn title(&self) -> String { title(self.condition_number, self.condition_name.as_deref()) }

  pub fn tree(&self) -> SubconditionTree { SubconditionTree::new(self.subconditions.clone()) }

  pub fn description_approval(&self) -> ApprovalState { self.is_approved.into() }

  pub fn attributes_approval(&self) -> ApprovalState {
    self.is_condition_attributes_approved.into()
  }
}

/// One line of a document's condition list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionSummary {
  pub condition_id:                     i64,
  pub condition_name:                   Option<String>,
  pub condition_number:                 Option<i32>,
  #[serde(default)]
  pub is_approved:                      bool,
  #[serde(default)]
  pub is_condition_attributes_approved: bool,
  /// Comma-separated names of the amendments that touched this condition.
  pub amendment_names:                  Option<String>,
}

impl ConditionSummary {
  pub fn title(&self) -> String { title(self.condition_number, self.condition_name.as_deref()) }
}

/// Response of the per-document condition listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentConditions {
  pub project_name:   String,
  pub document_label: String,
  #[serde(default)]
  pub conditions:     Vec<ConditionSummary>,
}

fn title(number: Option<i32>, name: Option<&str>) -> String {
  match (number, name) {
    (Some(n), Some(name)) => format!("{n}. {name}"),
    (Some(n), None) => format!("Condition {n}"),
    (None, Some(name)) => name.to_owned(),
    (None, None) => "(untitled condition)".to_owned(),
  }
}

// ─── Request bodies ──────────────────────────────────────────────────────────

/// Body of `POST /conditions/documents/{documentId}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCondition {
  pub condition_number: Option<i32>,
  pub condition_name:   Option<String>,
  /// Copy description and attributes from this condition.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub copied_from:      Option<i64>,
}

/// Partial update of a condition; absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionPatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub condition_name:                   Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub condition_number:                 Option<i32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub is_approved:                      Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub is_condition_attributes_approved: Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub is_topic_tags_approved:           Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub topic_tags:                       Option<Vec<String>>,
}

/// Body of `PATCH /attributes/condition/{conditionId}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributesUpdate {
  pub requires_management_plan: bool,
  pub condition_attribute:      ConditionAttributes,
}

/// Body of `PATCH /managementplan/{planId}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagementPlanPatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name:        Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub is_approved: Option<bool>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn deserialize_detail_projection() {
    let condition: Condition = serde_json::from_str(
      r#"{
        "condition_id": 9,
        "condition_name": "Wildlife Management",
        "condition_number": 12,
        "condition_text": null,
        "is_approved": false,
        "requires_management_plan": true,
        "subconditions": [
          {"subcondition_id": 1, "subcondition_identifier": "a)", "subcondition_text": "Monitor",
           "subconditions": [{"subcondition_id": 2, "subcondition_identifier": "i.", "subcondition_text": "Weekly"}]}
        ],
        "condition_attributes": {"independent_attributes": [], "management_plans": []}
      }"#,
    )
    .unwrap();

    assert_eq!(condition.title(), "12. Wildlife Management");
    assert_eq!(condition.tree().node_count(), 2);
    assert!(!condition.description_approval().is_approved());
    assert!(condition.requires_management_plan);
  }

  #[test]
  fn patch_omits_absent_fields() {
    let patch = ConditionPatch {
      is_approved: Some(true),
      ..ConditionPatch::default()
    };
    assert_eq!(
      serde_json::to_value(&patch).unwrap(),
      serde_json::json!({"is_approved": true})
    );
  }

  #[test]
  fn titles_fall_back() {
    assert_eq!(title(Some(3), None), "Condition 3");
    assert_eq!(title(None, Some("Air")), "Air");
    assert_eq!(title(None, None), "(untitled condition)");
  }
}
