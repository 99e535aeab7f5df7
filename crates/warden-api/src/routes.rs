//! Request handlers.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use warden_properties::{QueryResult, RawQueryParams};

use crate::error::ApiError;
use crate::state::AppState;

pub const HEALTH_BODY: &str = "Warden Weather: OK";

/// GET / - liveness check.
pub async fn health() -> &'static str {
    HEALTH_BODY
}

/// GET /get-properties - one page of weather-enriched properties.
pub async fn get_properties(
    State(state): State<AppState>,
    query: Result<Query<RawQueryParams>, QueryRejection>,
) -> Result<Json<QueryResult>, ApiError> {
    let Query(raw) = query?;
    let params = raw.validate(&state.limits)?;
    let result = state.query.run(&params).await?;
    Ok(Json(result))
}
