//! Score service: the piece catalog and a file-backed leaderboard over HTTP.

use crate::catalog::Catalog;
use crate::highscores::{ScoreRecord, ScoreStore, ScoreSubmission};
use crate::remote::{CATALOG_PATH, SCORES_PATH, SubmitResponse};
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::routing::get;
use axum::{Json, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct ServerState {
    catalog: Arc<Catalog>,
    /// Serialises read-modify-write cycles on the scores file.
    store: Arc<Mutex<ScoreStore>>,
}

impl ServerState {
    pub fn new(catalog: Catalog, store: ScoreStore) -> Self {
        Self {
            catalog: Arc::new(catalog),
            store: Arc::new(Mutex::new(store)),
        }
    }
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route(CATALOG_PATH, get(catalog))
        .route(SCORES_PATH, get(list_scores).post(submit_score))
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, store: ScoreStore) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, scores = %store.path().display(), "score service listening");
    axum::serve(listener, router(ServerState::new(Catalog::builtin(), store))).await?;
    Ok(())
}

async fn catalog(State(state): State<ServerState>) -> Json<Catalog> {
    Json(state.catalog.as_ref().clone())
}

/// Top scores, best first. An unreadable file reads as an empty board.
async fn list_scores(State(state): State<ServerState>) -> Json<Vec<ScoreRecord>> {
    let store = state.store.lock().await.clone();
    match tokio::task::spawn_blocking(move || store.leaderboard()).await {
        Ok(Ok(rows)) => Json(rows),
        Ok(Err(err)) => {
            tracing::warn!(%err, "could not read scores");
            Json(Vec::new())
        }
        Err(err) => {
            tracing::error!(%err, "score read task failed");
            Json(Vec::new())
        }
    }
}

async fn submit_score(
    State(state): State<ServerState>,
    body: Result<Json<ScoreSubmission>, JsonRejection>,
) -> Json<SubmitResponse> {
    let submission = match body {
        Ok(Json(submission)) => submission,
        Err(rejection) => {
            tracing::warn!(%rejection, "bad score submission");
            return Json(SubmitResponse::failed(rejection.body_text()));
        }
    };
    // held until the write finishes so read-modify-write cycles don't interleave
    let guard = state.store.lock().await;
    let store = guard.clone();
    let written = tokio::task::spawn_blocking(move || store.record(&submission)).await;
    drop(guard);
    match written {
        Ok(Ok(record)) => {
            tracing::info!(name = %record.name, score = record.score, "score recorded");
            Json(SubmitResponse::ok())
        }
        Ok(Err(err)) => {
            tracing::error!(%err, "could not record score");
            Json(SubmitResponse::failed(err.to_string()))
        }
        Err(err) => {
            tracing::error!(%err, "score write task failed");
            Json(SubmitResponse::failed("internal error"))
        }
    }
}
