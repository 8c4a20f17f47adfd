#![forbid(unsafe_code)]

use std::{env, net::SocketAddr, sync::Arc};

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use shaft_adapter::{
    content_disposition, flow_error_status, AdapterHealthResponse, AdapterRuntime, FormInput,
    NormalizeAdapterResponse, OptionsAdapterResponse, SelectAdapterResponse,
};
use shaft_flow::FlowError;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let bind = env::var("SHAFT_HTTP_BIND").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    let addr: SocketAddr = bind.parse()?;
    let runtime = Arc::new(AdapterRuntime::default_from_env()?);
    let health = runtime.health();

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/api/normalize", post(normalize))
        .route("/api/options", get(options))
        .route("/api/select", post(select))
        .route("/api/export", post(export))
        .with_state(runtime);

    info!(
        %addr,
        matcher_url = %health.matcher_url,
        exporter_url = %health.exporter_url,
        "shaft_adapter_http listening"
    );
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        error!("failed to install ctrl-c handler");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

async fn healthz(
    State(runtime): State<Arc<AdapterRuntime>>,
) -> (StatusCode, Json<AdapterHealthResponse>) {
    (StatusCode::OK, Json(runtime.health()))
}

async fn normalize(
    State(runtime): State<Arc<AdapterRuntime>>,
    Json(input): Json<FormInput>,
) -> (StatusCode, Json<NormalizeAdapterResponse>) {
    (StatusCode::OK, Json(runtime.normalize(&input)))
}

#[derive(Debug, Deserialize)]
struct OptionsQuery {
    tip: Option<String>,
}

async fn options(
    State(runtime): State<Arc<AdapterRuntime>>,
    Query(query): Query<OptionsQuery>,
) -> (StatusCode, Json<OptionsAdapterResponse>) {
    (StatusCode::OK, Json(runtime.options(query.tip.as_deref())))
}

fn status_for(err: &FlowError) -> StatusCode {
    StatusCode::from_u16(flow_error_status(err)).unwrap_or(StatusCode::BAD_GATEWAY)
}

fn join_failure(reason: String) -> (StatusCode, Json<SelectAdapterResponse>) {
    error!(reason = %reason, "blocking gateway task failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(SelectAdapterResponse::failed(reason)),
    )
}

async fn select(
    State(runtime): State<Arc<AdapterRuntime>>,
    Json(input): Json<FormInput>,
) -> (StatusCode, Json<SelectAdapterResponse>) {
    // ureq blocks; keep it off the async workers.
    let result = tokio::task::spawn_blocking(move || runtime.select(&input)).await;
    match result {
        Ok(Ok(response)) => (StatusCode::OK, Json(response)),
        Ok(Err(err)) => (status_for(&err), Json(SelectAdapterResponse::rejected(&err))),
        Err(join) => join_failure(join.to_string()),
    }
}

async fn export(
    State(runtime): State<Arc<AdapterRuntime>>,
    Json(input): Json<FormInput>,
) -> Response {
    let result = tokio::task::spawn_blocking(move || runtime.export(&input)).await;
    match result {
        Ok(Ok(doc)) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, doc.content_type),
                (header::CONTENT_DISPOSITION, content_disposition(&doc.file_name)),
            ],
            doc.bytes,
        )
            .into_response(),
        Ok(Err(err)) => {
            (status_for(&err), Json(SelectAdapterResponse::rejected(&err))).into_response()
        }
        Err(join) => join_failure(join.to_string()).into_response(),
    }
}
