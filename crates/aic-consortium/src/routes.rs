//! HTTP surface of a consortium node
//!
//! | Route          | Success                   | Unknown identity          |
//! |----------------|---------------------------|---------------------------|
//! | `GET /tid`     | signed consensus tid      |                           |
//! | `GET /{pid}`   | current document          | 404, signed attestation   |
//! | `POST /{pid}`  | latest signed tick        |                           |
//!
//! Failures carry the serialized [`AicError`] as body.

use crate::service::{ConsortiumService, Resolution};
use aic_core::{AicError, Value};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

/// Router over a shared service
pub fn router(service: ConsortiumService) -> Router {
    Router::new()
        .route("/tid", get(get_tid))
        .route("/:pid", get(get_document).post(post_update))
        .with_state(service)
}

/// Error response wrapper
#[derive(Debug)]
pub struct ApiError(pub AicError);

impl From<AicError> for ApiError {
    fn from(err: AicError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::debug!(error = %self.0, "request rejected");
        }
        (status, Json(self.0)).into_response()
    }
}

/// HTTP status for a ledger error
pub fn status_for(err: &AicError) -> StatusCode {
    match err {
        AicError::StaleTid { .. } => StatusCode::CONFLICT,
        AicError::MalformedSignature { .. }
        | AicError::DidMismatch { .. }
        | AicError::BadDiffSignature { .. }
        | AicError::UnauthorizedKey { .. }
        | AicError::EmptyChain
        | AicError::InvalidIdentifier { .. }
        | AicError::InvalidTid { .. }
        | AicError::Serialization { .. } => StatusCode::BAD_REQUEST,
        AicError::KeyMismatch { .. }
        | AicError::CorruptedStore { .. }
        | AicError::ConsortiumKeyMismatch { .. }
        | AicError::IndexCorruption { .. }
        | AicError::Crypto { .. }
        | AicError::Storage { .. }
        | AicError::Config { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Run a synchronous service call off the async workers
async fn blocking<T, F>(service: ConsortiumService, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&ConsortiumService) -> aic_core::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&service))
        .await
        .map_err(|e| AicError::storage(format!("request worker failed: {e}")))?
        .map_err(ApiError)
}

async fn get_tid(State(service): State<ConsortiumService>) -> Result<Response, ApiError> {
    let attestation = blocking(service, ConsortiumService::tid).await?;
    Ok(Json(attestation).into_response())
}

async fn get_document(
    State(service): State<ConsortiumService>,
    Path(pid): Path<String>,
) -> Result<Response, ApiError> {
    match blocking(service, move |service| service.resolve(&pid)).await? {
        Resolution::Found(document) => Ok(Json(document).into_response()),
        Resolution::NotFound(attestation) => {
            Ok((StatusCode::NOT_FOUND, Json(attestation)).into_response())
        }
    }
}

async fn post_update(
    State(service): State<ConsortiumService>,
    Path(pid): Path<String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let body: Value = serde_json::from_slice(&body).map_err(AicError::from)?;
    let tick = blocking(service, move |service| service.submit(&pid, body)).await?;
    Ok(Json(tick).into_response())
}
