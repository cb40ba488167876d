//! JSON quote API.
//!
//! - `POST /api/quotes`      creates a quote (`201 Created`)
//! - `GET  /api/quotes/{id}` returns a stored quote
//!
//! The calling organisation comes from `X-Organisation-ID`; without it the request body's
//! `organisationId` is treated as the caller.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use carbonquote_core::orchestrator::{CreateQuoteRequest, QuoteResponse};
use carbonquote_core::{InterfaceError, OrganisationId, Quote, QuoteId, QuoteOrchestrator};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

pub const ORGANISATION_HEADER: &str = "x-organisation-id";
pub const CORRELATION_HEADER: &str = "x-correlation-id";

#[derive(Clone)]
pub struct QuoteState {
    orchestrator: Arc<QuoteOrchestrator>,
}

pub fn router(orchestrator: Arc<QuoteOrchestrator>) -> Router {
    Router::new()
        .route("/api/quotes", post(create_quote))
        .route("/api/quotes/{id}", get(get_quote))
        .with_state(QuoteState { orchestrator })
}

#[derive(Debug)]
pub struct ApiError(InterfaceError);

#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    error: ErrorBody<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody<'a> {
    code: &'static str,
    message: &'a str,
    correlation_id: &'a str,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0 {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::Forbidden { .. } => StatusCode::FORBIDDEN,
            InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<InterfaceError> for ApiError {
    fn from(error: InterfaceError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorEnvelope {
            error: ErrorBody {
                code: self.0.code(),
                message: self.0.message(),
                correlation_id: self.0.correlation_id(),
            },
        };
        (status, Json(body)).into_response()
    }
}

fn correlation_id(headers: &HeaderMap) -> String {
    header_value(headers, CORRELATION_HEADER)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

async fn create_quote(
    State(state): State<QuoteState>,
    headers: HeaderMap,
    payload: Result<Json<CreateQuoteRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<QuoteResponse>), ApiError> {
    let correlation_id = correlation_id(&headers);
    let Json(request) = payload
        .map_err(|rejection| InterfaceError::bad_request(rejection.body_text(), &correlation_id))?;

    let missing = request.missing_required_fields();
    if !missing.is_empty() {
        warn!(
            event_name = "api.quote.rejected",
            correlation_id = %correlation_id,
            missing = %missing.join(","),
            "quote request is missing required fields"
        );
        return Err(InterfaceError::bad_request(
            format!("missing required fields: {}", missing.join(", ")),
            &correlation_id,
        )
        .into());
    }

    let caller = OrganisationId::new(
        header_value(&headers, ORGANISATION_HEADER).unwrap_or(request.organisation_id.trim()),
    );
    info!(
        event_name = "api.quote.requested",
        correlation_id = %correlation_id,
        caller = %caller,
        organisation_id = %request.organisation_id,
        order_items = request.order_items.len(),
        "quote requested"
    );

    let response = state
        .orchestrator
        .create_quote(&request, &caller)
        .await
        .map_err(|error| error.into_interface(&correlation_id))?;

    Ok((StatusCode::CREATED, Json(response)))
}

async fn get_quote(
    State(state): State<QuoteState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Quote>, ApiError> {
    let correlation_id = correlation_id(&headers);
    let quote = state
        .orchestrator
        .get_quote(&QuoteId(id))
        .await
        .map_err(|error| error.into_interface(&correlation_id))?;

    Ok(Json(quote))
}
