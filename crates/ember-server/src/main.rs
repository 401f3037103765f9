use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use ember_api::admin;
use ember_api::auth::{self, AppState, AppStateInner};
use ember_api::comments;
use ember_api::middleware::require_auth;
use ember_api::posts;
use ember_api::streaks;
use ember_db::SqliteStreakStore;
use ember_engine::StreakEngine;
use ember_gateway::Dispatcher;
use ember_gateway::connection;

#[derive(Clone)]
struct ServerState {
    dispatcher: Dispatcher,
    jwt_secret: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ember=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("EMBER_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let admin_token = std::env::var("EMBER_ADMIN_TOKEN").unwrap_or_default();
    let db_path = std::env::var("EMBER_DB_PATH").unwrap_or_else(|_| "ember.db".into());
    let host = std::env::var("EMBER_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("EMBER_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database and the streak engine on top of it
    let db = Arc::new(ember_db::Database::open(&PathBuf::from(&db_path))?);
    let engine = StreakEngine::with_system_clock(Arc::new(SqliteStreakStore::new(db.clone())));

    // Shared state
    let dispatcher = Dispatcher::new();
    let app_state: AppState = Arc::new(AppStateInner {
        db,
        engine,
        dispatcher: dispatcher.clone(),
        jwt_secret: jwt_secret.clone(),
        admin_token,
    });

    let state = ServerState {
        dispatcher,
        jwt_secret,
    };

    // Routes
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .with_state(app_state.clone());

    let protected_routes = Router::new()
        .route("/posts", get(posts::get_posts))
        .route("/posts", post(posts::create_post))
        .route("/posts/{post_id}/comments", get(comments::get_comments))
        .route("/posts/{post_id}/comments", post(comments::create_comment))
        .route("/streaks/me", get(streaks::get_my_streak))
        .route("/streaks/me/today", get(streaks::get_today_progress))
        .route("/streaks/leaderboard", get(streaks::get_leaderboard))
        .route("/streaks/{user_id}", get(streaks::get_user_streak))
        .layer(middleware::from_fn(require_auth))
        .with_state(app_state.clone());

    // Sweep endpoint sits outside the JWT layer; it carries its own token
    let admin_routes = Router::new()
        .route("/admin/streaks/sweep", post(admin::sweep_lapsed_streaks))
        .with_state(app_state);

    let ws_route = Router::new()
        .route("/gateway", get(ws_upgrade))
        .with_state(state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(admin_routes)
        .merge(ws_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Ember server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn ws_upgrade(State(state): State<ServerState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        connection::handle_connection(socket, state.dispatcher, state.jwt_secret)
    })
}
