//! HTTP surface for the yeyu blog.
//!
//! Handlers translate requests into `yeyu_core` calls and map the results
//! to JSON bodies; no domain rules live here.

pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

use axum::middleware;
use axum::routing::{get, patch, post, put};
use axum::Router;
use routes::{admin, ai_auth, chat, public, search};
use state::AppState;

/// Builds the full route table over `state`.
pub fn build_router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route(
            "/content/:kind",
            get(admin::list_content).post(admin::create_content),
        )
        .route(
            "/content/:kind/:id",
            put(admin::update_content).delete(admin::delete_content),
        )
        .route("/content/:kind/:id/published", patch(admin::publish_content))
        .route("/tags", get(admin::list_tags))
        .route("/tags/:kind", post(admin::create_tag))
        .route(
            "/tags/:kind/:id",
            put(admin::rename_tag).delete(admin::delete_tag),
        )
        .route(
            "/echoes",
            get(admin::list_echoes).post(admin::create_echo),
        )
        .route(
            "/echoes/:id",
            put(admin::update_echo).delete(admin::delete_echo),
        )
        .route("/echoes/:id/published", patch(admin::publish_echo))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            admin::require_admin,
        ));

    Router::new()
        .route("/api/chat-gpt", post(chat::chat_gpt))
        .route("/api/chat-spark", post(chat::chat_spark))
        .route("/api/chat", post(chat::chat_ws))
        .route("/api/ai-auth", post(ai_auth::ai_auth))
        .route("/api/search", get(search::search))
        .route("/api/blog/getBlogList", get(public::blog_list))
        .route("/api/blog/getBlogTags", get(public::blog_tags))
        .route("/api/note/getNoteList", get(public::note_list))
        .route("/api/note/getNoteTags", get(public::note_tags))
        .route("/api/echo/getAllEchos", get(public::all_echoes))
        .route("/api/tag/getAllTags", get(public::all_tags))
        .route("/api/content/:kind/:slug", get(public::item_by_slug))
        .route("/api/pages/:kind", get(public::published_page))
        .route("/api/tagged/:kind", get(public::tagged_items))
        .nest("/api/admin", admin_routes)
        .with_state(state)
}
