//! Export HTTP API
//!
//! Routes:
//! - `POST /api/export` - create an export from `{customerIds, storeData}`
//! - `GET /api/export/{id}/download` - document with ETag/attestation headers
//! - `GET /api/export/{id}` - creation metadata
//! - `GET /health`, `GET /metrics`
//!
//! Uses hyper for the HTTP server. Every response carries permissive CORS
//! headers so a browser front-end on another origin can call it.

use crate::domain::error::ExportError;
use crate::domain::types::ExportId;
use crate::infra::config::Config;
use crate::io::prometheus::format_prometheus_metrics;
use crate::services::export_service::ExportService;
use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::http::response::Builder;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Header carrying the attestation id next to a downloaded document
pub const ATTESTATION_ID_HEADER: &str = "X-Attestation-Id";
pub const ATTESTATION_SOURCE_HEADER: &str = "X-Attestation-Source";

/// Shared state for request handlers
pub struct ApiState {
    service: Arc<ExportService>,
    site_id: String,
    max_body_bytes: usize,
}

impl ApiState {
    pub fn new(service: Arc<ExportService>, config: &Config) -> Self {
        Self {
            service,
            site_id: config.site_id().to_string(),
            max_body_bytes: config.max_body_bytes(),
        }
    }
}

fn with_cors(builder: Builder) -> Builder {
    builder
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type")
        .header(
            "Access-Control-Expose-Headers",
            "ETag, Content-Disposition, X-Attestation-Id, X-Attestation-Source",
        )
}

fn json_response(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    with_cors(Response::builder())
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(body.into()))
        .expect("static response should not fail")
}

fn error_response(err: &ExportError) -> Response<Full<Bytes>> {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = serde_json::json!({ "error": err.to_string() }).to_string();
    json_response(status, body)
}

/// Handle HTTP requests
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<ApiState>,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

    let response = match (&method, segments.as_slice()) {
        (&Method::OPTIONS, _) => with_cors(Response::builder())
            .status(StatusCode::NO_CONTENT)
            .body(Full::new(Bytes::new()))
            .expect("static response should not fail"),
        (&Method::GET, ["health"]) => json_response(StatusCode::OK, r#"{"ok":true}"#),
        (&Method::GET, ["metrics"]) => {
            let body = format_prometheus_metrics(
                state.service.metrics(),
                state.service.registry().len(),
                &state.site_id,
            );
            with_cors(Response::builder())
                .status(StatusCode::OK)
                .header("Content-Type", "text/plain; version=0.0.4; charset=utf-8")
                .body(Full::new(Bytes::from(body)))
                .expect("static response should not fail")
        }
        (&Method::POST, ["api", "export"]) => handle_create(req.into_body(), &state).await,
        (&Method::GET, ["api", "export", id, "download"]) => {
            handle_download(&ExportId::from(*id), &state)
        }
        (&Method::GET, ["api", "export", id]) => handle_metadata(&ExportId::from(*id), &state),
        _ => json_response(StatusCode::NOT_FOUND, r#"{"error":"Not found"}"#),
    };

    Ok(response)
}

async fn read_body<B>(body: B, limit: usize) -> Result<Bytes, ExportError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            Err(ExportError::PayloadTooLarge(limit))
        }
        Err(e) => Err(ExportError::InvalidRequest(format!("failed to read body: {}", e))),
    }
}

async fn handle_create<B>(body: B, state: &ApiState) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let result = match read_body(body, state.max_body_bytes).await {
        Ok(bytes) => state.service.create_export_json(&bytes).await,
        Err(e) => Err(e),
    };

    match result.and_then(|receipt| {
        serde_json::to_vec(&receipt).map_err(|e| ExportError::Internal(e.to_string()))
    }) {
        Ok(body) => json_response(StatusCode::OK, body),
        Err(e) => {
            state.service.metrics().record_error(&e);
            match e {
                ExportError::InvalidRequest(_) | ExportError::PayloadTooLarge(_) => {
                    warn!(error = %e, kind = %e.kind(), "export_invalid_request")
                }
                _ => error!(error = %e, kind = %e.kind(), "export_create_failed"),
            }
            error_response(&e)
        }
    }
}

fn handle_download(export_id: &ExportId, state: &ApiState) -> Response<Full<Bytes>> {
    let result = state.service.get_export(export_id).and_then(|retrieved| {
        serde_json::to_vec_pretty(&retrieved.document)
            .map(|body| (retrieved, body))
            .map_err(|e| ExportError::Internal(e.to_string()))
    });

    match result {
        Ok((retrieved, body)) => {
            state.service.metrics().record_download();
            info!(export_id = %export_id, hash = %retrieved.fingerprint, "export_downloaded");
            with_cors(Response::builder())
                .status(StatusCode::OK)
                .header("Content-Type", "application/json")
                .header("ETag", format!("\"{}\"", retrieved.fingerprint))
                .header(ATTESTATION_ID_HEADER, retrieved.attestation.id.as_str())
                .header(ATTESTATION_SOURCE_HEADER, retrieved.attestation.source.as_str())
                .header(
                    "Content-Disposition",
                    format!("attachment; filename=\"{}\"", retrieved.filename()),
                )
                .body(Full::new(Bytes::from(body)))
                .unwrap_or_else(|e| {
                    // Only reachable if a stored value is not a valid header
                    error!(export_id = %export_id, error = %e, "export_download_response_failed");
                    error_response(&ExportError::Internal(e.to_string()))
                })
        }
        Err(e) => lookup_failed(export_id, state, e),
    }
}

fn handle_metadata(export_id: &ExportId, state: &ApiState) -> Response<Full<Bytes>> {
    let result = state.service.get_receipt(export_id).and_then(|receipt| {
        serde_json::to_vec(&receipt).map_err(|e| ExportError::Internal(e.to_string()))
    });
    match result {
        Ok(body) => json_response(StatusCode::OK, body),
        Err(e) => lookup_failed(export_id, state, e),
    }
}

fn lookup_failed(export_id: &ExportId, state: &ApiState, e: ExportError) -> Response<Full<Bytes>> {
    state.service.metrics().record_error(&e);
    match e {
        ExportError::NotFound(_) => warn!(export_id = %export_id, "export_not_found"),
        _ => error!(export_id = %export_id, error = %e, "export_lookup_failed"),
    }
    error_response(&e)
}

/// Serve the API on an already-bound listener until shutdown
pub async fn serve(
    listener: TcpListener,
    state: Arc<ApiState>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let local_addr = listener.local_addr()?;
    info!(addr = %local_addr, "api_server_started");

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, _addr)) => {
                        let io = TokioIo::new(stream);
                        let state = state.clone();

                        tokio::spawn(async move {
                            let service = service_fn(move |req| {
                                let state = state.clone();
                                async move { handle_request(req, state).await }
                            });

                            if let Err(e) = http1::Builder::new()
                                .serve_connection(io, service)
                                .await
                            {
                                error!(error = %e, "api_http_error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "api_accept_error");
                    }
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("api_server_shutdown");
                    return Ok(());
                }
            }
        }
    }
}

/// Bind the configured address and serve the API
pub async fn start_api_server(
    config: &Config,
    service: Arc<ExportService>,
    shutdown: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr: SocketAddr = format!("{}:{}", config.bind_address(), config.port()).parse()?;
    let listener = TcpListener::bind(addr).await?;
    let state = Arc::new(ApiState::new(service, config));
    serve(listener, state, shutdown).await
}
