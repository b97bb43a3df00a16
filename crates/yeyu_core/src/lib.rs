//! Core domain logic for the yeyu blog.
//! Content, tags, echoes, search and the chat relay live here; outer
//! surfaces only translate to and from these types.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod relay;
pub mod repo;
pub mod search;
pub mod service;

pub use config::{AppConfig, ConfigError};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError, LoggingOptions};
pub use model::content::{
    ArticleDraft, ContentId, ContentItem, ContentKind, ContentValidationError,
};
pub use model::echo::{Echo, EchoDraft, EchoId, EchoValidationError};
pub use model::tag::{Tag, TagDiff, TagId, TagValidationError, TagWithCount};
pub use relay::completion::{ChatReply, CompletionClient, CompletionProvider, ProviderConfig};
pub use relay::spark_ws::{SparkWsClient, SparkWsConfig};
pub use relay::{ChatMessage, ChatRequest, ChatRole, RelayError, RelayResult};
pub use repo::content_repo::{ContentRepository, SqliteContentRepository};
pub use repo::echo_repo::{EchoRepository, SqliteEchoRepository};
pub use repo::tag_repo::{SqliteTagRepository, TagRepository};
pub use repo::{RepoError, RepoResult};
pub use search::aggregate::{
    search_content, SearchHit, SearchQuery, SearchScope, SqliteSearchSource,
};
pub use service::content_service::{ContentPage, ContentService};
pub use service::echo_service::EchoService;
pub use service::tag_reconciler::reconcile_tags;
pub use service::tag_service::TagService;
pub use service::{ErrorCategory, ServiceError, ServiceResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
