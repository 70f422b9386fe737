//! Projects, their documents and the amendments issued against them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A document as listed beneath its project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSummary {
  pub document_id:    String,
  pub document_label: String,
  pub document_type:  Option<String>,
}

/// A project under environmental assessment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
  pub project_id:   String,
  pub project_name: String,
  pub project_type: Option<String>,
  #[serde(default)]
  pub documents:    Vec<DocumentSummary>,
}

/// A certificate or other document carrying conditions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
  pub document_id:              String,
  pub document_label:           String,
  pub document_type:            Option<String>,
  pub date_issued:              Option<NaiveDate>,
  /// `Some(true)` once every condition of the document is approved.
  pub status:                   Option<bool>,
  #[serde(default)]
  pub is_latest_amendment_added: bool,
  #[serde(default)]
  pub amendment_count:          u32,
}

impl Document {
  pub fn status_label(&self) -> &'static str {
    match self.status {
      Some(true) => "approved",
      Some(false) => "awaiting approval",
      None => "not started",
    }
  }
}

/// A revision of a document, itself carrying conditions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amendment {
  pub amendment_id:   i64,
  pub amendment_name: String,
  pub document_id:    String,
  pub date_issued:    Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn document_dates_and_status() {
    let doc: Document = serde_json::from_str(
      r#"{"document_id": "abc", "document_label": "Certificate", "document_type": null,
          "date_issued": "2019-04-02", "status": null}"#,
    )
    .unwrap();
    assert_eq!(doc.date_issued, NaiveDate::from_ymd_opt(2019, 4, 2));
    assert_eq!(doc.status_label(), "not started");
    assert_eq!(doc.amendment_count, 0);
  }
}
