//! Async HTTP client wrapping the condition repository JSON API.

use std::time::Duration;

use conrep_core::{
  attribute::{ConditionAttributes, ManagementPlan},
  condition::{
    AttributesUpdate, Condition, ConditionPatch, DocumentConditions, ManagementPlanPatch,
    NewCondition,
  },
  project::{Amendment, Document, Project},
  service::ConditionService,
  subcondition::SubconditionUpdate,
};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::{debug, warn};

/// Connection settings for the condition repository API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
  /// Bearer token issued by the identity provider, if any.
  pub token:    Option<String>,
}

/// A failed API call.
#[derive(Debug, Error)]
pub enum ClientError {
  #[error("failed to build HTTP client: {0}")]
  Build(#[source] reqwest::Error),

  #[error("{method} {path} failed: {source}")]
  Transport {
    method: Method,
    path:   String,
    #[source]
    source: reqwest::Error,
  },

  #[error("not found: {0}")]
  NotFound(String),

  #[error("{method} {path} → {status}")]
  Status {
    method: Method,
    path:   String,
    status: StatusCode,
  },

  #[error("deserialising {path}: {source}")]
  Decode {
    path:   String,
    #[source]
    source: reqwest::Error,
  },
}

/// Async HTTP client for the condition repository REST API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self, ClientError> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .map_err(ClientError::Build)?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!(
      "{}/api{}",
      self.config.base_url.trim_end_matches('/'),
      path
    )
  }

  fn request(&self, method: Method, path: &str) -> RequestBuilder {
    let req = self.client.request(method, self.url(path));
    match &self.config.token {
      Some(token) => req.bearer_auth(token),
      None => req,
    }
  }

  /// Send `req` and turn non-success statuses into errors.
  async fn send(&self, method: Method, path: &str, req: RequestBuilder) -> Result<Response, ClientError> {
    debug!(%method, path, "api request");
    let resp = req.send().await.map_err(|source| ClientError::Transport {
      method: method.clone(),
      path: path.to_owned(),
      source,
    })?;

    let status = resp.status();
    if status == StatusCode::NOT_FOUND {
      return Err(ClientError::NotFound(path.to_owned()));
    }
    if !status.is_success() {
      warn!(%method, path, %status, "api request rejected");
      return Err(ClientError::Status {
        method,
        path: path.to_owned(),
        status,
      });
    }
    Ok(resp)
  }

  async fn json<T: DeserializeOwned>(&self, path: &str, resp: Response) -> Result<T, ClientError> {
    resp.json().await.map_err(|source| ClientError::Decode {
      path: path.to_owned(),
      source,
    })
  }

  async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
    let resp = self.send(Method::GET, path, self.request(Method::GET, path)).await?;
    self.json(path, resp).await
  }

  async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T, ClientError>
  where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
  {
    let req = self.request(method.clone(), path).json(body);
    let resp = self.send(method, path, req).await?;
    self.json(path, resp).await
  }
}

impl ConditionService for ApiClient {
  type Error = ClientError;

  fn is_not_found(error: &ClientError) -> bool { matches!(error, ClientError::NotFound(_)) }

  // ── Browsing ──────────────────────────────────────────────────────────────

  async fn list_projects(&self) -> Result<Vec<Project>, ClientError> {
    self.get_json("/projects").await
  }

  async fn list_documents(&self, project_id: &str) -> Result<Vec<Document>, ClientError> {
    self.get_json(&format!("/documents/project/{project_id}")).await
  }

  async fn list_amendments(&self, document_id: &str) -> Result<Vec<Amendment>, ClientError> {
    self.get_json(&format!("/amendments/document/{document_id}")).await
  }

  async fn list_conditions(
    &self,
    project_id: &str,
    document_id: &str,
  ) -> Result<DocumentConditions, ClientError> {
    self
      .get_json(&format!("/conditions/project/{project_id}/document/{document_id}"))
      .await
  }

  // ── Conditions ────────────────────────────────────────────────────────────

  async fn get_condition(
    &self,
    project_id: &str,
    document_id: &str,
    condition_id: i64,
  ) -> Result<Condition, ClientError> {
    self
      .get_json(&condition_path(project_id, document_id, condition_id))
      .await
  }

  async fn update_condition(
    &self,
    project_id: &str,
    document_id: &str,
    condition_id: i64,
    patch: &ConditionPatch,
  ) -> Result<Condition, ClientError> {
    self
      .send_json(
        Method::PATCH,
        &condition_path(project_id, document_id, condition_id),
        patch,
      )
      .await
  }

  async fn create_condition(
    &self,
    document_id: &str,
    new: &NewCondition,
  ) -> Result<Condition, ClientError> {
    self
      .send_json(Method::POST, &format!("/conditions/documents/{document_id}"), new)
      .await
  }

  async fn update_subconditions(
    &self,
    updates: &[SubconditionUpdate],
  ) -> Result<Condition, ClientError> {
    self.send_json(Method::PATCH, "/subconditions", updates).await
  }

  // ── Attributes ────────────────────────────────────────────────────────────

  async fn get_condition_attributes(
    &self,
    project_id: &str,
    condition_id: i64,
  ) -> Result<ConditionAttributes, ClientError> {
    self
      .get_json(&format!("/attributes/project/{project_id}/condition/{condition_id}"))
      .await
  }

  async fn update_condition_attributes(
    &self,
    condition_id: i64,
    update: &AttributesUpdate,
  ) -> Result<ConditionAttributes, ClientError> {
    self
      .send_json(
        Method::PATCH,
        &format!("/attributes/condition/{condition_id}"),
        update,
      )
      .await
  }

  async fn delete_condition_attributes(
    &self,
    condition_id: i64,
    requires_management_plan: bool,
  ) -> Result<(), ClientError> {
    let path = format!("/attributes/condition/{condition_id}");
    let req = self
      .request(Method::DELETE, &path)
      .query(&[("requires_management_plan", requires_management_plan)]);
    self.send(Method::DELETE, &path, req).await?;
    Ok(())
  }

  // ── Management plans ──────────────────────────────────────────────────────

  async fn update_management_plan(
    &self,
    plan_id: i64,
    patch: &ManagementPlanPatch,
  ) -> Result<ManagementPlan, ClientError> {
    self
      .send_json(Method::PATCH, &format!("/managementplan/{plan_id}"), patch)
      .await
  }

  async fn delete_management_plan(&self, plan_id: i64) -> Result<(), ClientError> {
    let path = format!("/managementplan/{plan_id}");
    self
      .send(Method::DELETE, &path, self.request(Method::DELETE, &path))
      .await?;
    Ok(())
  }
}

fn condition_path(project_id: &str, document_id: &str, condition_id: i64) -> String {
  format!("/conditions/project/{project_id}/document/{document_id}/condition/{condition_id}")
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode as AxumStatus},
    routing::{delete, get, patch},
  };
  use conrep_core::subcondition::NodeId;
  use serde_json::{Value, json};
  use tokio::net::TcpListener;

  use super::*;

  /// Requests seen by the fake backend, as `(label, payload)` pairs.
  type Seen = Arc<Mutex<Vec<(String, Value)>>>;

  fn condition_json(id: i64) -> Value {
    json!({
      "condition_id": id,
      "condition_name": "Noise",
      "condition_number": 3,
      "is_approved": false,
      "subconditions": [
        {"subcondition_id": 10, "subcondition_identifier": "a)", "subcondition_text": "Limit hours"}
      ]
    })
  }

  async fn projects(State(seen): State<Seen>, headers: HeaderMap) -> Json<Value> {
    let auth = headers
      .get("authorization")
      .and_then(|v| v.to_str().ok())
      .unwrap_or_default()
      .to_owned();
    seen.lock().unwrap().push(("auth".into(), json!(auth)));
    Json(json!([
      {"project_id": "p1", "project_name": "Mine", "project_type": "Mines", "documents": []}
    ]))
  }

  async fn subconditions(State(seen): State<Seen>, Json(body): Json<Value>) -> Json<Value> {
    seen.lock().unwrap().push(("subconditions".into(), body));
    Json(condition_json(5))
  }

  async fn clear_attributes(
    State(seen): State<Seen>,
    Path(id): Path<i64>,
    Query(q): Query<std::collections::HashMap<String, String>>,
  ) -> AxumStatus {
    seen
      .lock()
      .unwrap()
      .push((format!("delete {id}"), json!(q.get("requires_management_plan"))));
    AxumStatus::NO_CONTENT
  }

  async fn broken() -> AxumStatus { AxumStatus::INTERNAL_SERVER_ERROR }

  async fn serve(token: Option<&str>) -> (ApiClient, Seen) {
    let seen: Seen = Arc::default();
    let router = Router::new()
      .route("/api/projects", get(projects))
      .route("/api/subconditions", patch(subconditions))
      .route("/api/attributes/condition/{id}", delete(clear_attributes))
      .route("/api/managementplan/{id}", patch(broken))
      .with_state(seen.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });

    let client = ApiClient::new(ApiConfig {
      base_url: format!("http://{addr}/"),
      token:    token.map(str::to_owned),
    })
    .unwrap();
    (client, seen)
  }

  #[tokio::test]
  async fn list_projects_sends_bearer_token() {
    let (client, seen) = serve(Some("abc123")).await;
    let projects = client.list_projects().await.unwrap();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].project_name, "Mine");

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0], ("auth".to_string(), json!("Bearer abc123")));
  }

  #[tokio::test]
  async fn update_subconditions_sends_flat_rows() {
    let (client, seen) = serve(None).await;
    let updates = vec![SubconditionUpdate {
      subcondition_id:         NodeId::from(10),
      subcondition_identifier: "a)".into(),
      subcondition_text:       "Limit hours".into(),
      sort_order:              1,
      parent_subcondition_id:  None,
    }];
    let condition = client.update_subconditions(&updates).await.unwrap();
    assert_eq!(condition.condition_id, 5);
    assert_eq!(condition.subconditions.len(), 1);

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].0, "subconditions");
    assert_eq!(
      seen[0].1,
      json!([{
        "subcondition_id": 10,
        "subcondition_identifier": "a)",
        "subcondition_text": "Limit hours",
        "sort_order": 1
      }])
    );
  }

  #[tokio::test]
  async fn delete_attributes_passes_flag_as_query() {
    let (client, seen) = serve(None).await;
    client.delete_condition_attributes(7, true).await.unwrap();
    let seen = seen.lock().unwrap();
    assert_eq!(seen[0], ("delete 7".to_string(), json!("true")));
  }

  #[tokio::test]
  async fn missing_route_is_not_found() {
    let (client, _) = serve(None).await;
    let err = client.get_condition("p1", "d1", 4).await.unwrap_err();
    assert!(ApiClient::is_not_found(&err), "{err}");
  }

  #[tokio::test]
  async fn server_error_is_status_error() {
    let (client, _) = serve(None).await;
    let err = client
      .update_management_plan(3, &ManagementPlanPatch::default())
      .await
      .unwrap_err();
    match err {
      ClientError::Status { status, path, .. } => {
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(path, "/managementplan/3");
      }
      other => panic!("unexpected error: {other}"),
    }
  }
}
