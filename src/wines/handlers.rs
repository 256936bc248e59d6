use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::extractors::CurrentUser;
use crate::error::ApiError;
use crate::extract::{JsonBody, QueryParams};
use crate::response::ApiBody;
use crate::state::AppState;
use crate::validate::Mode;
use crate::wines::dto::{ListQuery, Pagination, WineData, WineListData, WinePayload};
use crate::wines::repo::{escape_like, order_clause, Wine, WineFilter};
use crate::wines::rules::validate_wine;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/wines", get(list_wines).post(create_wine))
        .route(
            "/wines/:id",
            get(get_wine).put(update_wine).delete(delete_wine),
        )
}

fn parse_id(id: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(id).map_err(|_| ApiError::BadRequest("Invalid ID format".into()))
}

#[instrument(skip(state, user), fields(user_id = %user.0.id))]
async fn list_wines(
    State(state): State<AppState>,
    user: CurrentUser,
    QueryParams(query): QueryParams<ListQuery>,
) -> Result<Json<ApiBody<WineListData>>, ApiError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let order = order_clause(query.sort.as_deref().unwrap_or("-createdAt"));

    let filter = WineFilter {
        style: query.style,
        country: query.country.as_deref().map(escape_like),
        vintage: query.vintage,
        producer: query.producer.as_deref().map(escape_like),
        cellar_room: query.cellar_room.as_deref().map(escape_like),
        cellar_rack: query.cellar_rack.as_deref().map(escape_like),
        search: query.search.as_deref().map(escape_like),
    };

    let user_id = user.0.id;
    let wines = Wine::list(&state.db, user_id, &filter, order, limit, (page - 1) * limit).await?;
    let total = Wine::count(&state.db, user_id, &filter).await?;

    Ok(Json(ApiBody::data(WineListData {
        wines,
        pagination: Pagination::new(page, limit, total),
    })))
}

#[instrument(skip(state, user), fields(user_id = %user.0.id))]
async fn get_wine(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ApiBody<WineData>>, ApiError> {
    let id = parse_id(&id)?;
    // Absent and not-owned are indistinguishable on purpose.
    let wine = Wine::find(&state.db, user.0.id, id)
        .await?
        .ok_or(ApiError::NotFound("Wine"))?;
    Ok(Json(ApiBody::data(WineData { wine })))
}

#[instrument(skip(state, user, payload), fields(user_id = %user.0.id))]
async fn create_wine(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(payload): JsonBody<WinePayload>,
) -> Result<(StatusCode, Json<ApiBody<WineData>>), ApiError> {
    validate_wine(&payload, Mode::Create).map_err(ApiError::Validation)?;

    // Owner always comes from the authenticated identity.
    let new = payload.into_new(user.0.id)?;
    let wine = Wine::insert(&state.db, new).await?;

    info!(wine_id = %wine.id, "wine created");
    Ok((
        StatusCode::CREATED,
        Json(ApiBody::with_message(
            "Wine created successfully",
            WineData { wine },
        )),
    ))
}

#[instrument(skip(state, user, payload), fields(user_id = %user.0.id))]
async fn update_wine(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<WinePayload>,
) -> Result<Json<ApiBody<WineData>>, ApiError> {
    let id = parse_id(&id)?;
    validate_wine(&payload, Mode::Update).map_err(ApiError::Validation)?;

    let patch = payload.into_patch()?;
    let wine = Wine::update(&state.db, user.0.id, id, patch)
        .await?
        .ok_or(ApiError::NotFound("Wine"))?;

    info!(wine_id = %wine.id, "wine updated");
    Ok(Json(ApiBody::with_message(
        "Wine updated successfully",
        WineData { wine },
    )))
}

#[instrument(skip(state, user), fields(user_id = %user.0.id))]
async fn delete_wine(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ApiBody<()>>, ApiError> {
    let id = parse_id(&id)?;
    // Repeating a delete lands here again: not found, not success.
    if !Wine::delete(&state.db, user.0.id, id).await? {
        return Err(ApiError::NotFound("Wine"));
    }
    info!(wine_id = %id, "wine deleted");
    Ok(Json(ApiBody::message("Wine deleted successfully")))
}
