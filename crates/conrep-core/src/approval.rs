//! The approval state machine.
//!
//! Each layer of a condition (description, attributes, every management plan,
//! topic tags) toggles between [`ApprovalState::NotApproved`] and
//! [`ApprovalState::Approved`]. Moving to `Approved` is guarded; moving back
//! never is.

use serde::{Deserialize, Serialize};

use crate::{
  ValidationError,
  attribute::ManagementPlan,
  condition::{Condition, ConditionPatch, ManagementPlanPatch},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalState {
  #[default]
  NotApproved,
  Approved,
}

impl ApprovalState {
  pub fn is_approved(self) -> bool { matches!(self, Self::Approved) }

  pub fn toggled(self) -> Self {
    match self {
      Self::NotApproved => Self::Approved,
      Self::Approved => Self::NotApproved,
    }
  }
}

impl From<bool> for ApprovalState {
  fn from(approved: bool) -> Self {
    if approved { Self::Approved } else { Self::NotApproved }
  }
}

/// The layer of a condition an approval applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalTarget {
  Description,
  Attributes,
  TopicTags,
  ManagementPlan(i64),
}

/// What the approval toggle will persist once it passes its guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalChange {
  Condition(ConditionPatch),
  ManagementPlan { plan_id: i64, patch: ManagementPlanPatch },
}

impl ApprovalChange {
  pub fn state(&self) -> ApprovalState {
    let approved = match self {
      Self::Condition(patch) => patch
        .is_approved
        .or(patch.is_condition_attributes_approved)
        .or(patch.is_topic_tags_approved),
      Self::ManagementPlan { patch, .. } => patch.is_approved,
    };
    approved.unwrap_or_default().into()
  }
}

/// Toggle the approval of `target` on `condition`.
///
/// `rows_editing` is true while any editor row holds an uncommitted draft.
/// Returns the change to persist, or the reason the approval is refused.
pub fn toggle(
  condition: &Condition,
  target: ApprovalTarget,
  rows_editing: bool,
) -> Result<ApprovalChange, ValidationError> {
  let current = current_state(condition, target);
  let next = current.toggled();

  if next.is_approved() {
    check(condition, target, rows_editing)?;
  }

  let value = Some(next.is_approved());
  Ok(match target {
    ApprovalTarget::Description => ApprovalChange::Condition(ConditionPatch {
      is_approved: value,
      ..ConditionPatch::default()
    }),
    ApprovalTarget::Attributes => ApprovalChange::Condition(ConditionPatch {
      is_condition_attributes_approved: value,
      ..ConditionPatch::default()
    }),
    ApprovalTarget::TopicTags => ApprovalChange::Condition(ConditionPatch {
      is_topic_tags_approved: value,
      ..ConditionPatch::default()
    }),
    ApprovalTarget::ManagementPlan(plan_id) => ApprovalChange::ManagementPlan {
      plan_id,
      patch: ManagementPlanPatch {
        is_approved: value,
        ..ManagementPlanPatch::default()
      },
    },
  })
}

/// The current state of `target`. Unknown plans read as not approved.
pub fn current_state(condition: &Condition, target: ApprovalTarget) -> ApprovalState {
  match target {
    ApprovalTarget::Description => condition.description_approval(),
    ApprovalTarget::Attributes => condition.attributes_approval(),
    ApprovalTarget::TopicTags => condition.is_topic_tags_approved.into(),
    ApprovalTarget::ManagementPlan(id) => condition
      .condition_attributes
      .plan(id)
      .is_some_and(|p| p.is_approved)
      .into(),
  }
}

fn check(
  condition: &Condition,
  target: ApprovalTarget,
  rows_editing: bool,
) -> Result<(), ValidationError> {
  if rows_editing {
    return Err(ValidationError::RowsBeingEdited);
  }
  match target {
    ApprovalTarget::Description | ApprovalTarget::TopicTags => Ok(()),
    ApprovalTarget::Attributes => {
      let attributes = &condition.condition_attributes;
      match attributes.gaps(condition.requires_management_plan).into_iter().next() {
        Some((plan, keys)) => Err(ValidationError::MissingAttributes {
          plan: plan.map(|p| p.name.clone()),
          keys,
        }),
        None => Ok(()),
      }
    }
    ApprovalTarget::ManagementPlan(id) => match condition.condition_attributes.plan(id) {
      Some(plan) => check_plan(plan),
      None => Ok(()),
    },
  }
}

fn check_plan(plan: &ManagementPlan) -> Result<(), ValidationError> {
  let keys = plan.missing();
  if keys.is_empty() {
    Ok(())
  } else {
    Err(ValidationError::MissingAttributes {
      plan: Some(plan.name.clone()),
      keys,
    })
  }
}
