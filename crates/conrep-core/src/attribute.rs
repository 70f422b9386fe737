//! Condition attributes, management plans and the rules deciding which
//! attributes must be filled in before approval.

use serde::{Deserialize, Deserializer, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::{Error, Result};

// ─── Keys ────────────────────────────────────────────────────────────────────

/// The attribute keys the requirement rules know about. The serialised form is
/// the human-readable key used on the wire.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr,
)]
pub enum AttributeKey {
  #[strum(serialize = "Submitter")]
  Submitter,
  #[strum(serialize = "Management plan acronym")]
  ManagementPlanAcronym,
  #[strum(serialize = "Time associated with submission milestone")]
  TimeAssociatedWithSubmissionMilestone,
  #[strum(serialize = "Milestones related to plan submission")]
  MilestonesRelatedToPlanSubmission,
  #[strum(serialize = "Milestones related to plan implementation")]
  MilestonesRelatedToPlanImplementation,
  #[strum(serialize = "Requires consultation")]
  RequiresConsultation,
  #[strum(serialize = "Parties required to be consulted")]
  PartiesRequiredToBeConsulted,
  #[strum(serialize = "Requires IEM Terms of Engagement")]
  RequiresIemTermsOfEngagement,
  #[strum(serialize = "Deliverable Name")]
  DeliverableName,
}

impl AttributeKey {
  /// Keys every management plan must fill in.
  pub const MANAGEMENT_PLAN: &'static [Self] = &[
    Self::Submitter,
    Self::TimeAssociatedWithSubmissionMilestone,
    Self::MilestonesRelatedToPlanSubmission,
    Self::MilestonesRelatedToPlanImplementation,
    Self::RequiresConsultation,
    Self::RequiresIemTermsOfEngagement,
  ];

  /// Keys required once `Requires consultation` is set.
  pub const CONSULTATION: &'static [Self] = &[Self::PartiesRequiredToBeConsulted];

  /// Keys required once `Requires IEM Terms of Engagement` is set.
  pub const IEM: &'static [Self] = &[
    Self::DeliverableName,
    Self::TimeAssociatedWithSubmissionMilestone,
  ];

  pub fn parse(raw: &str) -> Result<Self> {
    raw
      .parse()
      .map_err(|_| Error::UnknownAttributeKey(raw.to_owned()))
  }

  pub fn as_str(&self) -> &'static str { (*self).into() }

  /// Whether the value holds a list of entries.
  pub fn is_list(&self) -> bool { matches!(self, Self::PartiesRequiredToBeConsulted) }

  /// Whether the value is a yes/no flag.
  pub fn is_flag(&self) -> bool {
    matches!(self, Self::RequiresConsultation | Self::RequiresIemTermsOfEngagement)
  }
}

// ─── Values ──────────────────────────────────────────────────────────────────

/// One key/value entry of regulatory metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionAttribute {
  pub id:    i64,
  pub key:   String,
  #[serde(default, deserialize_with = "null_as_empty")]
  pub value: String,
}

impl ConditionAttribute {
  /// The known key, if this entry uses one.
  pub fn known_key(&self) -> Option<AttributeKey> { AttributeKey::parse(&self.key).ok() }

  /// Blank text and empty array literals (`{}`, `[]`) count as empty.
  pub fn is_empty(&self) -> bool {
    let trimmed = self.value.trim();
    trimmed.is_empty() || trimmed == "{}" || trimmed == "[]"
  }

  /// Truthy flag values: `true` and `yes`, case-insensitively.
  pub fn is_truthy(&self) -> bool {
    let v = self.value.trim();
    v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes")
  }

  /// The value as shown to the user. Lists read as `a, b`; a list that does
  /// not parse is shown verbatim.
  pub fn display_value(&self) -> String {
    if self.known_key().is_some_and(|k| k.is_list()) {
      if let Ok(items) = self.items() {
        return items.join(", ");
      }
    }
    self.value.clone()
  }

  /// Split a multi-valued entry into its items.
  ///
  /// Accepts JSON arrays (`["a","b"]`), Postgres array literals (`{a,b}`) and
  /// plain single values.
  pub fn items(&self) -> Result<Vec<String>> {
    let v = self.value.trim();
    if v.starts_with('[') {
      return Ok(serde_json::from_str(v)?);
    }
    let inner = v
      .strip_prefix('{')
      .and_then(|rest| rest.strip_suffix('}'))
      .unwrap_or(v);
    Ok(
      inner
        .split(',')
        .map(|item| item.trim().trim_matches('"').to_owned())
        .filter(|item| !item.is_empty())
        .collect(),
    )
  }
}

/// A named, independently approvable bundle of attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagementPlan {
  pub id:          i64,
  #[serde(default, deserialize_with = "null_as_empty")]
  pub name:        String,
  #[serde(default)]
  pub is_approved: bool,
  #[serde(default)]
  pub attributes:  Vec<ConditionAttribute>,
}

impl ManagementPlan {
  /// Required keys of this plan that are still empty.
  pub fn missing(&self) -> Vec<AttributeKey> { missing_keys(&self.attributes, true) }
}

/// All attribute data of one condition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionAttributes {
  #[serde(default)]
  pub independent_attributes: Vec<ConditionAttribute>,
  #[serde(default)]
  pub management_plans:       Vec<ManagementPlan>,
}

impl ConditionAttributes {
  pub fn is_empty(&self) -> bool {
    self.independent_attributes.is_empty() && self.management_plans.is_empty()
  }

  pub fn find(&self, id: i64) -> Option<&ConditionAttribute> {
    self
      .independent_attributes
      .iter()
      .chain(self.management_plans.iter().flat_map(|p| p.attributes.iter()))
      .find(|a| a.id == id)
  }

  /// Set the value of attribute `id` wherever it lives. Unknown ids are ignored.
  pub fn set_value(&mut self, id: i64, value: &str) {
    let entry = self
      .independent_attributes
      .iter_mut()
      .chain(self.management_plans.iter_mut().flat_map(|p| p.attributes.iter_mut()))
      .find(|a| a.id == id);
    if let Some(entry) = entry {
      entry.value = value.to_owned();
    }
  }

  pub fn plan(&self, id: i64) -> Option<&ManagementPlan> {
    self.management_plans.iter().find(|p| p.id == id)
  }

  /// Every requirement gap, grouped by plan (`None` for the independent set).
  pub fn gaps(&self, requires_management_plan: bool) -> Vec<(Option<&ManagementPlan>, Vec<AttributeKey>)> {
    let mut out = Vec::new();
    if requires_management_plan {
      for plan in &self.management_plans {
        let missing = plan.missing();
        if !missing.is_empty() {
          out.push((Some(plan), missing));
        }
      }
    }
    let missing = missing_keys(&self.independent_attributes, false);
    if !missing.is_empty() {
      out.push((None, missing));
    }
    out
  }
}

// ─── Requirement rules ───────────────────────────────────────────────────────

/// The keys `attributes` must fill in: the management-plan keys when
/// `plan` is set, plus the consultation and IEM keys when their flags are on.
pub fn required_keys(attributes: &[ConditionAttribute], plan: bool) -> Vec<AttributeKey> {
  let flag = |key: AttributeKey| {
    attributes
      .iter()
      .any(|a| a.known_key() == Some(key) && a.is_truthy())
  };

  let mut keys: Vec<AttributeKey> = Vec::new();
  let mut push = |set: &[AttributeKey]| {
    for key in set {
      if !keys.contains(key) {
        keys.push(*key);
      }
    }
  };
  if plan {
    push(AttributeKey::MANAGEMENT_PLAN);
  }
  if flag(AttributeKey::RequiresConsultation) {
    push(AttributeKey::CONSULTATION);
  }
  if flag(AttributeKey::RequiresIemTermsOfEngagement) {
    push(AttributeKey::IEM);
  }
  keys
}

/// Required keys with no non-empty value in `attributes`.
pub fn missing_keys(attributes: &[ConditionAttribute], plan: bool) -> Vec<AttributeKey> {
  required_keys(attributes, plan)
    .into_iter()
    .filter(|key| {
      !attributes
        .iter()
        .any(|a| a.known_key() == Some(*key) && !a.is_empty())
    })
    .collect()
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
  Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
  use strum::IntoEnumIterator;

  use super::*;

  fn attr(id: i64, key: AttributeKey, value: &str) -> ConditionAttribute {
    ConditionAttribute {
      id,
      key: key.to_string(),
      value: value.to_owned(),
    }
  }

  #[test]
  fn keys_parse_from_wire_strings() {
    for key in AttributeKey::iter() {
      assert_eq!(AttributeKey::parse(key.as_str()).unwrap(), key);
    }
    assert!(matches!(
      AttributeKey::parse("Colour"),
      Err(Error::UnknownAttributeKey(k)) if k == "Colour"
    ));
  }

  #[test]
  fn empty_values() {
    assert!(attr(1, AttributeKey::Submitter, "  ").is_empty());
    assert!(attr(1, AttributeKey::PartiesRequiredToBeConsulted, "{}").is_empty());
    assert!(attr(1, AttributeKey::PartiesRequiredToBeConsulted, "[]").is_empty());
    assert!(!attr(1, AttributeKey::Submitter, "Proponent").is_empty());
  }

  #[test]
  fn items_from_array_forms() {
    let pg = attr(1, AttributeKey::PartiesRequiredToBeConsulted, r#"{"First Nation A",Ministry}"#);
    assert_eq!(pg.items().unwrap(), ["First Nation A", "Ministry"]);

    let json = attr(1, AttributeKey::PartiesRequiredToBeConsulted, r#"["A", "B"]"#);
    assert_eq!(json.items().unwrap(), ["A", "B"]);

    let broken = attr(1, AttributeKey::PartiesRequiredToBeConsulted, "[oops");
    assert!(matches!(broken.items(), Err(Error::Serialization(_))));
  }

  #[test]
  fn lists_display_as_comma_separated() {
    let parties = attr(1, AttributeKey::PartiesRequiredToBeConsulted, r#"{"First Nation A",Ministry}"#);
    assert_eq!(parties.display_value(), "First Nation A, Ministry");

    let broken = attr(1, AttributeKey::PartiesRequiredToBeConsulted, "[oops");
    assert_eq!(broken.display_value(), "[oops");

    // Only list keys are split.
    let submitter = attr(2, AttributeKey::Submitter, "{Proponent}");
    assert_eq!(submitter.display_value(), "{Proponent}");
  }

  #[test]
  fn consultation_requires_parties() {
    let attrs = vec![
      attr(1, AttributeKey::RequiresConsultation, "true"),
      attr(2, AttributeKey::PartiesRequiredToBeConsulted, ""),
    ];
    assert_eq!(missing_keys(&attrs, false), [AttributeKey::PartiesRequiredToBeConsulted]);
  }

  #[test]
  fn flags_off_require_nothing_without_plan() {
    let attrs = vec![
      attr(1, AttributeKey::RequiresConsultation, "false"),
      attr(2, AttributeKey::RequiresIemTermsOfEngagement, "No"),
    ];
    assert!(required_keys(&attrs, false).is_empty());
  }

  #[test]
  fn plan_keys_deduplicate_with_iem_keys() {
    let attrs = vec![attr(1, AttributeKey::RequiresIemTermsOfEngagement, "Yes")];
    let keys = required_keys(&attrs, true);
    let time = keys
      .iter()
      .filter(|k| **k == AttributeKey::TimeAssociatedWithSubmissionMilestone)
      .count();
    assert_eq!(time, 1);
    assert!(keys.contains(&AttributeKey::DeliverableName));
  }

  #[test]
  fn set_value_reaches_plan_attributes() {
    let mut attrs = ConditionAttributes {
      independent_attributes: vec![attr(1, AttributeKey::Submitter, "")],
      management_plans:       vec![ManagementPlan {
        id:          10,
        name:        "Wildlife".into(),
        is_approved: false,
        attributes:  vec![attr(2, AttributeKey::Submitter, "")],
      }],
    };
    attrs.set_value(2, "Holder");
    assert_eq!(attrs.find(2).unwrap().value, "Holder");
    assert_eq!(attrs.find(1).unwrap().value, "");
    attrs.set_value(99, "ignored");
  }

  #[test]
  fn null_values_deserialize_as_empty() {
    let a: ConditionAttribute =
      serde_json::from_str(r#"{"id": 3, "key": "Submitter", "value": null}"#).unwrap();
    assert_eq!(a.value, "");
    assert_eq!(a.known_key(), Some(AttributeKey::Submitter));
  }
}
