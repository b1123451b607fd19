//! Score service client: catalog fetch, leaderboard read, score submit.
//!
//! The game loop never awaits these calls. [`RemoteClient`] spawns each request
//! on the tokio runtime and hands the outcome back through a channel that the
//! loop drains once per frame.

use crate::catalog::{Catalog, CatalogError};
use crate::highscores::{ScoreRecord, ScoreStore, ScoreSubmission, StoreError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

pub const CATALOG_PATH: &str = "/api/tetrominoes";
pub const SCORES_PATH: &str = "/api/scores";

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {0}")]
    Status(reqwest::StatusCode),
    #[error("{0}")]
    Catalog(#[from] CatalogError),
    #[error("score store: {0}")]
    Store(#[from] StoreError),
    #[error("score rejected: {0}")]
    Rejected(String),
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Response to a score submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SubmitResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }

    fn into_result(self) -> Result<(), RemoteError> {
        if self.success {
            Ok(())
        } else {
            Err(RemoteError::Rejected(
                self.error.unwrap_or_else(|| "unknown error".to_string()),
            ))
        }
    }
}

/// Where pieces come from and where scores go.
#[async_trait]
pub trait ScoreService: Send + Sync {
    async fn fetch_catalog(&self) -> Result<Catalog, RemoteError>;
    async fn fetch_leaderboard(&self) -> Result<Vec<ScoreRecord>, RemoteError>;
    async fn submit_score(&self, submission: &ScoreSubmission) -> Result<(), RemoteError>;
}

/// Talks to a running `tetrixtui serve` (or anything speaking the same JSON).
pub struct HttpScoreService {
    client: reqwest::Client,
    base_url: String,
    /// Served instead of the remote catalog when set (`--catalog FILE`).
    local_catalog: Option<Catalog>,
}

impl HttpScoreService {
    pub fn new(base_url: &str) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            local_catalog: None,
        })
    }

    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.local_catalog = Some(catalog);
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl ScoreService for HttpScoreService {
    async fn fetch_catalog(&self) -> Result<Catalog, RemoteError> {
        if let Some(catalog) = &self.local_catalog {
            return Ok(catalog.clone());
        }
        let response = self.client.get(self.url(CATALOG_PATH)).send().await?;
        if !response.status().is_success() {
            return Err(RemoteError::Status(response.status()));
        }
        let body = response.text().await?;
        Ok(Catalog::from_json(&body)?)
    }

    async fn fetch_leaderboard(&self) -> Result<Vec<ScoreRecord>, RemoteError> {
        let response = self.client.get(self.url(SCORES_PATH)).send().await?;
        if !response.status().is_success() {
            return Err(RemoteError::Status(response.status()));
        }
        Ok(response.json().await?)
    }

    async fn submit_score(&self, submission: &ScoreSubmission) -> Result<(), RemoteError> {
        let response = self
            .client
            .post(self.url(SCORES_PATH))
            .json(submission)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(RemoteError::Status(response.status()));
        }
        let body: SubmitResponse = response.json().await?;
        body.into_result()
    }
}

/// No network: a fixed catalog and a scores file on this machine.
pub struct OfflineScoreService {
    catalog: Catalog,
    store: ScoreStore,
}

impl OfflineScoreService {
    pub fn new(catalog: Catalog, store: ScoreStore) -> Self {
        Self { catalog, store }
    }
}

#[async_trait]
impl ScoreService for OfflineScoreService {
    async fn fetch_catalog(&self) -> Result<Catalog, RemoteError> {
        Ok(self.catalog.clone())
    }

    async fn fetch_leaderboard(&self) -> Result<Vec<ScoreRecord>, RemoteError> {
        let store = self.store.clone();
        Ok(tokio::task::spawn_blocking(move || store.leaderboard()).await??)
    }

    async fn submit_score(&self, submission: &ScoreSubmission) -> Result<(), RemoteError> {
        let store = self.store.clone();
        let submission = submission.clone();
        tokio::task::spawn_blocking(move || store.record(&submission)).await??;
        Ok(())
    }
}

/// Finished background request.
#[derive(Debug)]
pub enum RemoteEvent {
    CatalogLoaded(Result<Catalog, RemoteError>),
    LeaderboardLoaded(Result<Vec<ScoreRecord>, RemoteError>),
    ScoreSubmitted(Result<(), RemoteError>),
}

/// Fire-and-forget bridge between the synchronous game loop and a [`ScoreService`].
pub struct RemoteClient {
    service: Arc<dyn ScoreService>,
    handle: Handle,
    tx: mpsc::UnboundedSender<RemoteEvent>,
    rx: mpsc::UnboundedReceiver<RemoteEvent>,
}

impl RemoteClient {
    pub fn new(service: Arc<dyn ScoreService>, handle: Handle) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            service,
            handle,
            tx,
            rx,
        }
    }

    pub fn request_catalog(&self) {
        let service = Arc::clone(&self.service);
        let tx = self.tx.clone();
        self.handle.spawn(async move {
            let result = service.fetch_catalog().await;
            let _ = tx.send(RemoteEvent::CatalogLoaded(result));
        });
    }

    pub fn request_leaderboard(&self) {
        let service = Arc::clone(&self.service);
        let tx = self.tx.clone();
        self.handle.spawn(async move {
            let result = service.fetch_leaderboard().await;
            let _ = tx.send(RemoteEvent::LeaderboardLoaded(result));
        });
    }

    pub fn submit_score(&self, submission: ScoreSubmission) {
        let service = Arc::clone(&self.service);
        let tx = self.tx.clone();
        self.handle.spawn(async move {
            let result = service.submit_score(&submission).await;
            let _ = tx.send(RemoteEvent::ScoreSubmitted(result));
        });
    }

    /// Next finished request, if any. Never blocks.
    pub fn poll(&mut self) -> Option<RemoteEvent> {
        self.rx.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn offline(dir: &tempfile::TempDir) -> Arc<dyn ScoreService> {
        Arc::new(OfflineScoreService::new(
            Catalog::builtin(),
            ScoreStore::new(dir.path().join("scores.json")),
        ))
    }

    #[test]
    fn test_submit_response_wire_format() {
        let ok: SubmitResponse = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert!(ok.into_result().is_ok());
        let bad: SubmitResponse =
            serde_json::from_str(r#"{"success": false, "error": "disk full"}"#).unwrap();
        match bad.into_result() {
            Err(RemoteError::Rejected(msg)) => assert_eq!(msg, "disk full"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_offline_service_persists_anonymous_scores() {
        let dir = tempfile::tempdir().unwrap();
        let service = offline(&dir);
        service
            .submit_score(&ScoreSubmission::new("  ", 300, 1, 3))
            .await
            .unwrap();
        let board = service.fetch_leaderboard().await.unwrap();
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].name, "Anonymous");
        assert_eq!(board[0].score, 300);
    }

    #[test]
    fn test_client_reports_results_through_poll() {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let mut client = RemoteClient::new(offline(&dir), rt.handle().clone());
        assert!(client.poll().is_none());

        client.request_catalog();
        let event = wait_for(&mut client);
        match event {
            RemoteEvent::CatalogLoaded(Ok(c)) => assert_eq!(c, Catalog::builtin()),
            other => panic!("unexpected {other:?}"),
        }

        client.submit_score(ScoreSubmission::new("ada", 40, 1, 1));
        assert!(matches!(
            wait_for(&mut client),
            RemoteEvent::ScoreSubmitted(Ok(()))
        ));

        client.request_leaderboard();
        match wait_for(&mut client) {
            RemoteEvent::LeaderboardLoaded(Ok(rows)) => assert_eq!(rows[0].name, "ada"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_local_catalog_skips_the_network() {
        let service = HttpScoreService::new("http://127.0.0.1:9")
            .unwrap()
            .with_catalog(Catalog::builtin());
        assert_eq!(service.fetch_catalog().await.unwrap(), Catalog::builtin());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_an_error() {
        // port 9 (discard) on localhost is closed in test environments
        let service = HttpScoreService::new("http://127.0.0.1:9/").unwrap();
        assert!(service.fetch_catalog().await.is_err());
        assert!(service.fetch_leaderboard().await.is_err());
        assert!(
            service
                .submit_score(&ScoreSubmission::new("x", 1, 1, 0))
                .await
                .is_err()
        );
    }

    fn wait_for(client: &mut RemoteClient) -> RemoteEvent {
        for _ in 0..500 {
            if let Some(event) = client.poll() {
                return event;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        panic!("no remote event within 5s");
    }
}
