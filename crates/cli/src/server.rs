//! HTTP surface: `POST /rpc` and `GET /health`.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use futures::StreamExt;
use runtime::{
    CompletionBackend, ModelHandle, Orchestrator, PromptFormatter, TokenSource, ToolHost,
};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::frame::{self, Frame};
use crate::rpc::{self, Reply};
use crate::tools::ToolBackend;

pub const SERVICE_NAME: &str = "cumulus";

const KEEP_ALIVE: Duration = Duration::from_secs(15);

/// Shared by every request.
pub struct AppState<M, T> {
    pub orchestrator: Arc<Orchestrator<M, T>>,
}

impl<M, T> Clone for AppState<M, T> {
    fn clone(&self) -> Self {
        Self {
            orchestrator: Arc::clone(&self.orchestrator),
        }
    }
}

/// Build the application router.
pub fn router<M, T>(orchestrator: Arc<Orchestrator<M, T>>) -> Router
where
    M: TokenSource + 'static,
    T: ToolHost + 'static,
{
    Router::new()
        .route("/rpc", post(handle_rpc::<M, T>))
        .route("/health", get(handle_health::<M, T>))
        .with_state(AppState { orchestrator })
}

#[instrument(skip_all)]
async fn handle_rpc<M, T>(State(state): State<AppState<M, T>>, body: Bytes) -> Response
where
    M: TokenSource + 'static,
    T: ToolHost + 'static,
{
    let call = match rpc::parse(&body) {
        Ok(call) => call,
        Err(rejection) => {
            warn!(message = %rejection.message, "request rejected");
            return Json(Reply::from(rejection)).into_response();
        }
    };

    let stream = call.params.stream;
    let id = call.id;
    let events = state.orchestrator.spawn(call.params.into_request());
    debug!(%id, stream, "chat request accepted");

    if stream {
        let frames = frame::frames(id, events).map(|frame: Frame| Event::default().json_data(frame));
        return Sse::new(frames)
            .keep_alive(KeepAlive::new().interval(KEEP_ALIVE))
            .into_response();
    }

    match frame::collect(events).await {
        Ok(result) => Json(Reply::success(id, result)).into_response(),
        Err(error) => Json(Reply::failure(id, error)).into_response(),
    }
}

/// Flat health report.
#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub model: String,
    pub model_reachable: bool,
    pub model_busy: bool,
    pub tools_ready: bool,
    pub tools: Vec<String>,
}

async fn handle_health<M, T>(State(state): State<AppState<M, T>>) -> Json<Health>
where
    M: TokenSource + 'static,
    T: ToolHost + 'static,
{
    let model = state.orchestrator.model();
    let tools = state.orchestrator.tools();

    let model_reachable = model.is_reachable().await;
    let tools_ready = tools.is_ready().await;

    Json(Health {
        status: if model_reachable && tools_ready {
            "healthy"
        } else {
            "degraded"
        },
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        model: model.describe(),
        model_reachable,
        model_busy: model.is_busy(),
        tools_ready,
        tools: tools.specs().iter().map(|s| s.name.clone()).collect(),
    })
}

/// Build everything from `config` and serve until SIGINT or SIGTERM.
pub async fn serve(config: &Config) -> Result<()> {
    let tools = ToolBackend::from_config(config).await?;
    let model = CompletionBackend::builder(&config.model.url)
        .model(&config.model.name)
        .build();

    let orchestrator = Orchestrator::new(ModelHandle::new(model), tools)
        .with_prompt(PromptFormatter::new(&config.prompt.system))
        .with_options(config.model.options())
        .with_scan(config.model.scan)
        .with_token_timeout(config.model.token_timeout());
    let app = router(Arc::new(orchestrator));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| Error::Serve {
            addr: addr.clone(),
            source,
        })?;

    info!(%addr, model = %config.model.url, "cumulus ready");
    info!("   Chat:   POST http://{addr}/rpc");
    info!("   Health: GET  http://{addr}/health");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|source| Error::Serve { addr, source })?;

    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let terminate = async {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    warn!(error = %e, "cannot listen for SIGTERM");
                    std::future::pending::<()>().await;
                }
            }
        }
        #[cfg(not(unix))]
        std::future::pending::<()>().await;
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("received SIGINT, shutting down"),
        () = terminate => info!("received SIGTERM, shutting down"),
    }
}
