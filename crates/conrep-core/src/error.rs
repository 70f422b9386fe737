//! Error types for `conrep-core`.

use thiserror::Error;

use crate::attribute::AttributeKey;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown attribute key: {0:?}")]
  UnknownAttributeKey(String),

  #[error("subcondition id must not be empty")]
  EmptyNodeId,

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A refused user action. Reported to the user; never changes state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("save or discard the rows being edited before approving")]
  RowsBeingEdited,

  #[error("save the description before approving")]
  UnsavedDescription,

  #[error("{}", missing_message(.plan, .keys))]
  MissingAttributes {
    /// Name of the management plan the keys belong to, if any.
    plan: Option<String>,
    keys: Vec<AttributeKey>,
  },
}

fn missing_message(plan: &Option<String>, keys: &[AttributeKey]) -> String {
  let keys = keys
    .iter()
    .map(AttributeKey::as_str)
    .collect::<Vec<_>>()
    .join(", ");
  match plan {
    Some(plan) => format!("management plan {plan:?} is missing: {keys}"),
    None => format!("missing required attributes: {keys}"),
  }
}
