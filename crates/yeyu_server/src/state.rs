//! Shared request state.
//!
//! # Invariants
//! - Store work runs on the blocking pool with its own connection.
//! - Admin access requires a configured token; without one nobody is admin.

use crate::error::{ApiError, ApiResult};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use log::error;
use rusqlite::Connection;
use std::sync::Arc;
use yeyu_core::{
    open_db, AppConfig, CompletionClient, CompletionProvider, RelayResult, SparkWsClient,
};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

struct Inner {
    config: AppConfig,
    gpt: CompletionClient,
    spark_http: CompletionClient,
    spark_ws: SparkWsClient,
}

impl AppState {
    pub fn new(config: AppConfig) -> RelayResult<Self> {
        let gpt = CompletionClient::new(config.gpt.clone())?;
        let spark_http = CompletionClient::new(config.spark_http.clone())?;
        let spark_ws = SparkWsClient::new(config.spark_ws.clone());
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                gpt,
                spark_http,
                spark_ws,
            }),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn completion(&self, provider: CompletionProvider) -> &CompletionClient {
        match provider {
            CompletionProvider::Gpt => &self.inner.gpt,
            CompletionProvider::SparkHttp => &self.inner.spark_http,
        }
    }

    pub fn spark_ws(&self) -> &SparkWsClient {
        &self.inner.spark_ws
    }

    /// True when `headers` carry `Authorization: Bearer <admin token>`.
    pub fn is_admin(&self, headers: &HeaderMap) -> bool {
        let Some(expected) = self.inner.config.admin_token.as_deref() else {
            return false;
        };
        headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .is_some_and(|token| token.trim() == expected)
    }

    /// Opens the store and runs `work` on the blocking pool.
    pub async fn with_store<T, F>(&self, work: F) -> ApiResult<T>
    where
        F: FnOnce(&mut Connection) -> ApiResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let db_path = self.inner.config.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = open_db(&db_path)?;
            work(&mut conn)
        })
        .await
        .map_err(|err| {
            error!("event=store_task module=server status=error error={err}");
            ApiError::internal("internal server error")
        })?
    }
}
