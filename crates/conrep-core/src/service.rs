//! The `ConditionService` trait: the REST collaborator as seen by the
//! front-end.
//!
//! Implemented by the HTTP client in `conrep-cli`. The application state
//! machine depends on this abstraction, so it can run against an in-memory
//! fake in tests.

use std::future::Future;

use crate::{
  attribute::{ConditionAttributes, ManagementPlan},
  condition::{
    AttributesUpdate, Condition, ConditionPatch, DocumentConditions, ManagementPlanPatch,
    NewCondition,
  },
  project::{Amendment, Document, Project},
  subcondition::SubconditionUpdate,
};

/// Abstraction over the condition repository backend.
///
/// There is no concurrency control: every write is last-write-wins.
pub trait ConditionService: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Whether `error` means the requested record does not exist.
  fn is_not_found(error: &Self::Error) -> bool;

  // ── Browsing ──────────────────────────────────────────────────────────

  /// `GET /projects`
  fn list_projects(&self) -> impl Future<Output = Result<Vec<Project>, Self::Error>> + Send + '_;

  /// `GET /documents/project/{project_id}`
  fn list_documents<'a>(
    &'a self,
    project_id: &'a str,
  ) -> impl Future<Output = Result<Vec<Document>, Self::Error>> + Send + 'a;

  /// `GET /amendments/document/{document_id}`
  fn list_amendments<'a>(
    &'a self,
    document_id: &'a str,
  ) -> impl Future<Output = Result<Vec<Amendment>, Self::Error>> + Send + 'a;

  /// `GET /conditions/project/{project_id}/document/{document_id}`
  fn list_conditions<'a>(
    &'a self,
    project_id: &'a str,
    document_id: &'a str,
  ) -> impl Future<Output = Result<DocumentConditions, Self::Error>> + Send + 'a;

  // ── Conditions ────────────────────────────────────────────────────────

  /// `GET /conditions/project/{project_id}/document/{document_id}/condition/{condition_id}`
  fn get_condition<'a>(
    &'a self,
    project_id: &'a str,
    document_id: &'a str,
    condition_id: i64,
  ) -> impl Future<Output = Result<Condition, Self::Error>> + Send + 'a;

  /// `PATCH /conditions/project/{project_id}/document/{document_id}/condition/{condition_id}`
  fn update_condition<'a>(
    &'a self,
    project_id: &'a str,
    document_id: &'a str,
    condition_id: i64,
    patch: &'a ConditionPatch,
  ) -> impl Future<Output = Result<Condition, Self::Error>> + Send + 'a;

  /// `POST /conditions/documents/{document_id}`: a blank or copied condition.
  fn create_condition<'a>(
    &'a self,
    document_id: &'a str,
    new: &'a NewCondition,
  ) -> impl Future<Output = Result<Condition, Self::Error>> + Send + 'a;

  /// `PATCH /subconditions`, returning the updated condition.
  fn update_subconditions<'a>(
    &'a self,
    updates: &'a [SubconditionUpdate],
  ) -> impl Future<Output = Result<Condition, Self::Error>> + Send + 'a;

  // ── Attributes ────────────────────────────────────────────────────────

  /// `GET /attributes/project/{project_id}/condition/{condition_id}`
  fn get_condition_attributes<'a>(
    &'a self,
    project_id: &'a str,
    condition_id: i64,
  ) -> impl Future<Output = Result<ConditionAttributes, Self::Error>> + Send + 'a;

  /// `PATCH /attributes/condition/{condition_id}`
  fn update_condition_attributes<'a>(
    &'a self,
    condition_id: i64,
    update: &'a AttributesUpdate,
  ) -> impl Future<Output = Result<ConditionAttributes, Self::Error>> + Send + 'a;

  /// `DELETE /attributes/condition/{condition_id}?requires_management_plan=<bool>`
  fn delete_condition_attributes(
    &self,
    condition_id: i64,
    requires_management_plan: bool,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Management plans ──────────────────────────────────────────────────

  /// `PATCH /managementplan/{plan_id}`
  fn update_management_plan<'a>(
    &'a self,
    plan_id: i64,
    patch: &'a ManagementPlanPatch,
  ) -> impl Future<Output = Result<ManagementPlan, Self::Error>> + Send + 'a;

  /// `DELETE /managementplan/{plan_id}`
  fn delete_management_plan(
    &self,
    plan_id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
