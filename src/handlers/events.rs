//! # Product Event Handlers

use axum::{extract::State, http::StatusCode, response::Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::handlers::types::{ApiJson, ApiQuery, ListResponse, ProductEventInfo};
use crate::server::AppState;
use crate::services::events;

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct TrackEventRequest {
    #[schema(example = "dashboard.viewed")]
    pub event_name: String,
    #[schema(value_type = Option<Object>)]
    pub properties: Option<Value>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EventsQuery {
    /// 1 to 500 (default 50)
    pub limit: Option<u64>,
}

#[utoipa::path(
    post,
    path = "/api/v1/events",
    security(("bearer_auth" = [])),
    request_body = TrackEventRequest,
    responses(
        (status = 201, description = "Event recorded", body = ProductEventInfo),
        (status = 400, description = "Invalid event name or properties", body = ApiError)
    ),
    tag = "events"
)]
pub async fn track_event(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(request): ApiJson<TrackEventRequest>,
) -> Result<(StatusCode, Json<ProductEventInfo>), ApiError> {
    let event =
        events::track_from_client(&state.db, &auth, &request.event_name, request.properties)
            .await?;
    Ok((StatusCode::CREATED, Json(event.into())))
}

#[utoipa::path(
    get,
    path = "/api/v1/events",
    security(("bearer_auth" = [])),
    params(EventsQuery),
    responses(
        (status = 200, description = "Most recent events of the account", body = ListResponse<ProductEventInfo>),
        (status = 400, description = "Invalid limit", body = ApiError),
        (status = 403, description = "Insufficient permissions", body = ApiError)
    ),
    tag = "events"
)]
pub async fn list_events(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<EventsQuery>,
) -> Result<Json<ListResponse<ProductEventInfo>>, ApiError> {
    let events = events::list_recent(&state.db, &auth, query.limit).await?;
    Ok(Json(events.into_iter().collect()))
}
