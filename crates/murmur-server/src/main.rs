use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{delete, get, patch, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use murmur_api::auth::{self, AppState, AppStateInner};
use murmur_api::middleware::require_auth;
use murmur_api::{discover, feed, notes, users};
use murmur_feed::DEFAULT_ORIGINAL_RATIO;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "murmur=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("MURMUR_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("MURMUR_DB_PATH").unwrap_or_else(|_| "murmur.db".into());
    let host = std::env::var("MURMUR_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("MURMUR_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let feed_ratio: f64 = std::env::var("MURMUR_FEED_RATIO")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_ORIGINAL_RATIO);

    // Init database
    let db = murmur_db::Database::open(&PathBuf::from(&db_path))?;

    // Shared state
    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret,
        feed_ratio,
    });

    // Routes
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/users/me", patch(users::update_me))
        .route("/users/{user_id}", get(users::get_profile))
        .route("/users/{user_id}/follow", post(users::toggle_follow))
        .route("/users/{user_id}/notes", get(notes::user_notes))
        .route("/notes", post(notes::create_note))
        .route("/notes/{note_id}", get(notes::get_note))
        .route("/notes/{note_id}", delete(notes::delete_note))
        .route("/notes/{note_id}/like", post(notes::toggle_like))
        .route("/notes/{note_id}/play", post(notes::record_play))
        .route("/notes/{note_id}/share", post(notes::toggle_share))
        .route("/notes/{note_id}/comments", post(notes::add_comment))
        .route("/notes/{note_id}/comments", get(notes::list_comments))
        .route("/feed", get(feed::get_feed))
        .route("/discover/notes", get(discover::discover_notes))
        .route("/discover/creators", get(discover::discover_creators))
        .layer(middleware::from_fn(require_auth))
        .with_state(state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Murmur server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
