//! JSON REST API for the Guichet workflow.
//!
//! Exposes an axum [`Router`] backed by a [`WorkflowEngine`] over any
//! [`DemandeStore`]. Auth, TLS, and transport concerns are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", guichet_api::api_router(engine.clone()))
//! ```

pub mod actions;
pub mod demandes;
pub mod dispatch;
pub mod error;
pub mod signature;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{get, post},
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use guichet_core::{
  notify::NotificationDispatcher, sign::SignatureCompletion, store::DemandeStore,
};
use guichet_engine::WorkflowEngine;

pub use dispatch::QueueDispatcher;
pub use error::ApiError;
pub use signature::DigestSigner;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` with
/// `GUICHET_*` environment overrides.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host: String,
  #[serde(default = "default_port")]
  pub port: u16,
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
}

fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 8732 }
fn default_store_path() -> PathBuf { PathBuf::from("guichet.db") }

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `engine`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, N, G>(engine: Arc<WorkflowEngine<S, N, G>>) -> Router<()>
where
  S: DemandeStore + 'static,
  N: NotificationDispatcher + 'static,
  G: SignatureCompletion + 'static,
{
  Router::new()
    .route(
      "/demandes",
      get(demandes::list::<S, N, G>).post(demandes::create::<S, N, G>),
    )
    .route("/demandes/{id}", get(demandes::get_one::<S, N, G>))
    .route("/demandes/{id}/actions", post(actions::apply::<S, N, G>))
    .route(
      "/demandes/{id}/assigned-actor",
      get(demandes::assigned_actor::<S, N, G>),
    )
    .route("/demandes/{id}/history", get(demandes::history::<S, N, G>))
    .layer(TraceLayer::new_for_http())
    .with_state(engine)
}

// ─── Integration tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use serde_json::{Value, json};
  use tower::ServiceExt as _;

  use guichet_store_sqlite::SqliteStore;

  async fn app() -> Router {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let engine = Arc::new(WorkflowEngine::new(
      store,
      Arc::new(QueueDispatcher::spawn()),
      Arc::new(DigestSigner),
    ));
    api_router(engine)
  }

  async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
  ) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
      Some(v) => {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
        Body::from(v.to_string())
      }
      None => Body::empty(),
    };
    let resp = app
      .clone()
      .oneshot(builder.body(body).unwrap())
      .await
      .unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    let value = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
  }

  async fn file_usine(app: &Router) -> Value {
    let (status, body) = send(
      app,
      "POST",
      "/demandes",
      Some(json!({ "demande_type": "USINE", "owner": "applicant-7" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
  }

  fn action(role: &str, action: &str) -> Value {
    json!({ "role": role, "actor_id": "agent-1", "action": action })
  }

  // ── Filing ──────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn filing_returns_201_with_reference() {
    let app = app().await;
    let body = file_usine(&app).await;

    assert_eq!(body["status"], "DEPOSEE");
    assert_eq!(body["track"], "HIERARCHICAL");
    assert!(body["reference"].as_str().unwrap().starts_with("USN-"));
  }

  #[tokio::test]
  async fn listing_filters_by_status() {
    let app = app().await;
    file_usine(&app).await;
    file_usine(&app).await;

    let (status, body) = send(&app, "GET", "/demandes?status=DEPOSEE", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, body) =
      send(&app, "GET", "/demandes?status=VALIDEE_CHEF", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());
  }

  // ── The workflow operation ──────────────────────────────────────────────

  #[tokio::test]
  async fn chief_validation_advances_the_demande() {
    let app = app().await;
    let demande = file_usine(&app).await;
    let id = demande["demande_id"].as_str().unwrap();

    let (status, body) = send(
      &app,
      "POST",
      &format!("/demandes/{id}/actions"),
      Some(action("CHEF_SERVICE", "VALIDATE")),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["new_status"], "VALIDEE_CHEF");
    assert_eq!(body["assigned"], "DDPI");
    assert!(body["audit_entry_id"].is_string());
  }

  #[tokio::test]
  async fn wrong_role_gets_403() {
    let app = app().await;
    let demande = file_usine(&app).await;
    let id = demande["demande_id"].as_str().unwrap();

    let (status, body) = send(
      &app,
      "POST",
      &format!("/demandes/{id}/actions"),
      Some(action("DGI", "VALIDATE")),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");
    assert!(body["error"].is_string());
  }

  #[tokio::test]
  async fn return_without_message_gets_400() {
    let app = app().await;
    let demande = file_usine(&app).await;
    let id = demande["demande_id"].as_str().unwrap();

    let (status, _) = send(
      &app,
      "POST",
      &format!("/demandes/{id}/actions"),
      Some(action("CHEF_SERVICE", "RETURN")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn stale_expected_status_gets_409() {
    let app = app().await;
    let demande = file_usine(&app).await;
    let id = demande["demande_id"].as_str().unwrap();

    send(
      &app,
      "POST",
      &format!("/demandes/{id}/actions"),
      Some(action("CHEF_SERVICE", "VALIDATE")),
    )
    .await;

    let mut stale = action("DDPI", "VALIDATE");
    stale["expected_status"] = json!("DEPOSEE");
    let (status, _) =
      send(&app, "POST", &format!("/demandes/{id}/actions"), Some(stale)).await;
    assert_eq!(status, StatusCode::CONFLICT);
  }

  #[tokio::test]
  async fn unknown_demande_gets_404() {
    let app = app().await;
    let id = uuid::Uuid::new_v4();

    let (status, _) = send(&app, "GET", &format!("/demandes/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
      &app,
      "POST",
      &format!("/demandes/{id}/actions"),
      Some(action("CHEF_SERVICE", "VALIDATE")),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  // ── Derived reads ───────────────────────────────────────────────────────

  #[tokio::test]
  async fn assigned_actor_follows_the_workflow() {
    let app = app().await;
    let demande = file_usine(&app).await;
    let id = demande["demande_id"].as_str().unwrap();

    let (status, body) =
      send(&app, "GET", &format!("/demandes/{id}/assigned-actor"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "CHEF_SERVICE");

    send(
      &app,
      "POST",
      &format!("/demandes/{id}/actions"),
      Some(action("CHEF_SERVICE", "VALIDATE")),
    )
    .await;

    let (_, body) =
      send(&app, "GET", &format!("/demandes/{id}/assigned-actor"), None).await;
    assert_eq!(body["role"], "DDPI");
  }

  #[tokio::test]
  async fn history_lists_entries_in_order() {
    let app = app().await;
    let demande = file_usine(&app).await;
    let id = demande["demande_id"].as_str().unwrap();

    send(
      &app,
      "POST",
      &format!("/demandes/{id}/actions"),
      Some(action("CHEF_SERVICE", "VALIDATE")),
    )
    .await;
    let mut ret = action("DDPI", "RETURN");
    ret["message"] = json!("pièce manquante");
    send(&app, "POST", &format!("/demandes/{id}/actions"), Some(ret)).await;

    let (status, body) =
      send(&app, "GET", &format!("/demandes/{id}/history"), None).await;
    assert_eq!(status, StatusCode::OK);
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["new_status"], "VALIDEE_CHEF");
    assert_eq!(entries[1]["new_status"], "RETOURNEE");
    assert_eq!(entries[1]["message"], "pièce manquante");
  }

  // ── Signature over HTTP ─────────────────────────────────────────────────

  #[tokio::test]
  async fn full_walk_ends_with_a_signed_artifact() {
    let app = app().await;
    let demande = file_usine(&app).await;
    let id = demande["demande_id"].as_str().unwrap();

    for (role, verb) in [
      ("CHEF_SERVICE", "VALIDATE"),
      ("DDPI", "VALIDATE"),
      ("DGI", "VALIDATE"),
      ("MINISTRE", "VALIDATE"),
      ("MINISTRE", "SIGN"),
      ("CHEF_SERVICE", "TRANSMIT"),
    ] {
      let (status, body) = send(
        &app,
        "POST",
        &format!("/demandes/{id}/actions"),
        Some(action(role, verb)),
      )
      .await;
      assert_eq!(status, StatusCode::OK, "{role} {verb}: {body}");
    }

    let (_, body) = send(&app, "GET", &format!("/demandes/{id}"), None).await;
    assert_eq!(body["status"], "CLOTUREE");
    assert!(
      body["signed_artifact"].as_str().unwrap().starts_with("AUT-"),
      "{body}"
    );
  }
}
