use crate::{error::AppError, AppState};
use axum::{
    extract::{Path, State},
    Json,
};
use axum_extra::extract::WithRejection;
use core_types::{
    AgeCount, Charity, CharityColumn, CharityFilter, CharityKey, CharityPatch, DonationEvent,
    DonorKey, EventAgeSummary, EventAverageAge, EveryEventContact, FoodDonor, FoodRecipient,
    NewCharity, ProjectionRequest, Recipient, RecipientPatch, SearchRequest,
};
use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;

/// `{ "data": [...] }`, the envelope used by the listing endpoints.
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub data: T,
}

type JsonBody<T> = WithRejection<Json<T>, AppError>;
type IdPath = WithRejection<Path<i32>, AppError>;

fn success() -> Json<JsonValue> {
    Json(json!({ "success": true }))
}

/// # GET /check-db-connection
pub async fn check_db_connection(State(state): State<Arc<AppState>>) -> &'static str {
    match state.store.ping().await {
        Ok(()) => "connected",
        Err(e) => {
            tracing::warn!(error = %e, "Database connectivity check failed.");
            "unable to connect"
        }
    }
}

// ==============================================================================
// Charities
// ==============================================================================

/// # GET /demotable
pub async fn list_charities(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DataResponse<Vec<Charity>>>, AppError> {
    let data = state.store.list_charities().await?;
    Ok(Json(DataResponse { data }))
}

/// # GET /count-demotable
pub async fn count_charities(
    State(state): State<Arc<AppState>>,
) -> Result<Json<JsonValue>, AppError> {
    let count = state.store.count_charities().await?;
    Ok(Json(json!({ "success": true, "count": count })))
}

/// # POST /insert-demotable
pub async fn insert_charity(
    State(state): State<Arc<AppState>>,
    WithRejection(Json(body), _): JsonBody<NewCharity>,
) -> Result<Json<JsonValue>, AppError> {
    let charity = Charity::from(body);
    state.store.insert_charity(&charity).await?;
    tracing::info!(charity_id = charity.charity_id, "Charity inserted.");
    Ok(success())
}

/// # POST /update-charity
pub async fn update_charity(
    State(state): State<Arc<AppState>>,
    WithRejection(Json(patch), _): JsonBody<CharityPatch>,
) -> Result<Json<JsonValue>, AppError> {
    let id = patch
        .id
        .ok_or_else(|| AppError::BadRequest("id is required for updating a charity".to_string()))?;
    if !patch.has_changes() {
        return Err(AppError::BadRequest("No fields to update".to_string()));
    }
    state.store.update_charity(id, &patch).await?;
    Ok(success())
}

/// # POST /delete-charity
pub async fn delete_charity(
    State(state): State<Arc<AppState>>,
    WithRejection(Json(key), _): JsonBody<CharityKey>,
) -> Result<Json<JsonValue>, AppError> {
    state.store.delete_charity(key.id).await?;
    Ok(success())
}

/// # POST /search-charities
/// Every condition is validated before the store is queried.
pub async fn search_charities(
    State(state): State<Arc<AppState>>,
    WithRejection(Json(request), _): JsonBody<SearchRequest>,
) -> Result<Json<Vec<Charity>>, AppError> {
    let filter = CharityFilter::from_request(&request)?;
    let charities = state.store.search_charities(&filter).await?;
    Ok(Json(charities))
}

/// # POST /projection
pub async fn project_charities(
    State(state): State<Arc<AppState>>,
    WithRejection(Json(request), _): JsonBody<ProjectionRequest>,
) -> Result<Json<JsonValue>, AppError> {
    let columns = CharityColumn::parse_list(request.attributes.as_slice())?;
    let rows = state.store.project_charities(&columns).await?;
    Ok(Json(json!({ "success": true, "data": rows })))
}

/// # POST /initiate-demotable
/// Drops every table and replays the schema script.
pub async fn reinitialize(State(state): State<Arc<AppState>>) -> Result<Json<JsonValue>, AppError> {
    state.store.reinitialize().await?;
    Ok(success())
}

// ==============================================================================
// Recipients
// ==============================================================================

/// # POST /insert-recipient
pub async fn insert_recipient(
    State(state): State<Arc<AppState>>,
    WithRejection(Json(recipient), _): JsonBody<Recipient>,
) -> Result<Json<JsonValue>, AppError> {
    state.store.insert_recipient(&recipient).await?;
    tracing::info!(sin_num = recipient.sin_num, "Recipient inserted.");
    Ok(success())
}

/// # GET /recipients
pub async fn list_recipients(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DataResponse<Vec<Recipient>>>, AppError> {
    let data = state.store.list_recipients().await?;
    Ok(Json(DataResponse { data }))
}

/// # GET /recipients/:sinNum
pub async fn get_recipient(
    State(state): State<Arc<AppState>>,
    WithRejection(Path(sin_num), _): IdPath,
) -> Result<Json<Recipient>, AppError> {
    let recipient = state.store.get_recipient(sin_num).await?;
    Ok(Json(recipient))
}

/// # POST /update-recipients
/// Only the supplied fields are changed.
pub async fn update_recipient(
    State(state): State<Arc<AppState>>,
    WithRejection(Json(patch), _): JsonBody<RecipientPatch>,
) -> Result<Json<JsonValue>, AppError> {
    let sin_num = patch.sin_num.ok_or_else(|| {
        AppError::BadRequest("SinNum is required for updating a recipient".to_string())
    })?;
    if !patch.has_changes() {
        return Err(AppError::BadRequest("No fields to update".to_string()));
    }
    state.store.update_recipient(sin_num, &patch).await?;
    Ok(success())
}

// ==============================================================================
// Events and donors
// ==============================================================================

/// # GET /donation-events
pub async fn list_donation_events(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DataResponse<Vec<DonationEvent>>>, AppError> {
    let data = state.store.list_donation_events().await?;
    Ok(Json(DataResponse { data }))
}

/// # GET /fooddonor
pub async fn list_food_donors(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DataResponse<Vec<FoodDonor>>>, AppError> {
    let data = state.store.list_food_donors().await?;
    Ok(Json(DataResponse { data }))
}

/// # POST /delete-donor
/// Also removes the donor's `FoodReceived` rows.
pub async fn delete_donor(
    State(state): State<Arc<AppState>>,
    WithRejection(Json(key), _): JsonBody<DonorKey>,
) -> Result<Json<JsonValue>, AppError> {
    state.store.delete_food_donor(key.donor_id).await?;
    Ok(success())
}

// ==============================================================================
// Analytical queries
// ==============================================================================

/// # GET /recipients-for-food/:foodID
pub async fn recipients_for_food(
    State(state): State<Arc<AppState>>,
    WithRejection(Path(food_id), _): IdPath,
) -> Result<Json<Vec<FoodRecipient>>, AppError> {
    let recipients = state.store.recipients_for_food(food_id).await?;
    tracing::debug!(food_id, count = recipients.len(), "Recipients found for food.");
    Ok(Json(recipients))
}

/// # GET /event-recipient-aggregation
pub async fn event_recipient_aggregation(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<EventAgeSummary>>, AppError> {
    Ok(Json(state.store.event_age_summaries().await?))
}

/// # GET /recipient-age-count
pub async fn recipient_age_count(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<AgeCount>>, AppError> {
    Ok(Json(state.store.age_histogram().await?))
}

/// # GET /lowest-age-event-query
pub async fn lowest_age_event(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<EventAverageAge>>, AppError> {
    Ok(Json(state.store.lowest_average_age_events().await?))
}

/// # GET /division-query
/// Contact numbers seen at every event. An empty result is still a success.
pub async fn division_query(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DataResponse<Vec<EveryEventContact>>>, AppError> {
    let data = state.store.contacts_at_every_event().await?;
    Ok(Json(DataResponse { data }))
}
