mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use secureaws_api::{AppState, AppStateInner};
use secureaws_assistant::{GenerationProvider, OpenAiProvider, ResponseResolver};
use secureaws_db::{ConversationStore, Database};
use secureaws_gateway::{Session, connection};

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "secureaws=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init database
    let store: Arc<dyn ConversationStore> = Arc::new(Database::open(&config.db_path)?);

    // Answer generation
    let provider = config.openai.as_ref().map(|openai| {
        let provider = OpenAiProvider::with_endpoint(
            openai.api_key.clone(),
            openai.base_url.clone(),
            openai.model.clone(),
        );
        info!("Generating answers with OpenAI model {}", provider.model());
        Arc::new(provider) as Arc<dyn GenerationProvider>
    });
    let resolver = ResponseResolver::new(provider).with_timeout(config.generation_timeout);
    if !resolver.has_live_provider() {
        warn!("OPENAI_API_KEY not set, answering from the built-in knowledge base");
    }
    let resolver = Arc::new(resolver);

    // Shared state
    let app_state: AppState = Arc::new(AppStateInner { store: store.clone() });
    let session = Session::new(store, resolver);

    // Routes
    let ws_route = Router::new().route("/ws", get(ws_upgrade)).with_state(session);

    let app = Router::new()
        .merge(secureaws_api::routes(app_state))
        .merge(ws_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("SecureAWS server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn ws_upgrade(State(session): State<Session>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| connection::handle_connection(socket, session))
}
