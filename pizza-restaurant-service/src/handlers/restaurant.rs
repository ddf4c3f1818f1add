use axum::{
    extract::{rejection::PathRejection, Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use diesel::Connection;
use tracing::{info, instrument};

use crate::db;
use crate::error::ApiError;
use crate::serializer::*;

use super::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/restaurants", get(list_restaurants))
        .route(
            "/restaurants/{id}",
            get(get_restaurant).delete(delete_restaurant),
        )
}

// non-numeric ids cannot name a restaurant
fn restaurant_id(path: Result<Path<i32>, PathRejection>) -> Result<i32, ApiError> {
    path.map(|Path(id)| id)
        .map_err(|_| ApiError::NotFound("Restaurant"))
}

#[utoipa::path(
    get,
    path = "/restaurants",
    responses(
        (status = 200, description = "All restaurants", body = [RestaurantSummary]),
    ),
    tag = "restaurants"
)]
#[instrument(skip(state))]
pub async fn list_restaurants(
    State(state): State<AppState>,
) -> Result<Json<Vec<RestaurantSummary>>, ApiError> {
    let restaurants = state
        .with_conn(|conn| Ok(db::list_restaurants(conn)?))
        .await?;

    Ok(Json(restaurants.iter().map(serialize_restaurant).collect()))
}

#[utoipa::path(
    get,
    path = "/restaurants/{id}",
    responses(
        (status = 200, description = "Restaurant with the pizzas it offers", body = RestaurantDetails),
        (status = 404, description = "Restaurant not found", body = ApiErrorResponse),
    ),
    params(
        ("id" = i32, Path, description = "Restaurant ID")
    ),
    tag = "restaurants"
)]
#[instrument(skip(state))]
pub async fn get_restaurant(
    State(state): State<AppState>,
    path: Result<Path<i32>, PathRejection>,
) -> Result<Json<RestaurantDetails>, ApiError> {
    let id = restaurant_id(path)?;

    let (restaurant, restaurant_pizzas) = state
        .with_conn(move |conn| {
            conn.transaction::<_, ApiError, _>(|conn| {
                let restaurant =
                    db::find_restaurant(conn, id)?.ok_or(ApiError::NotFound("Restaurant"))?;
                let restaurant_pizzas = db::restaurant_pizzas_with_pizza(conn, &restaurant)?;
                Ok((restaurant, restaurant_pizzas))
            })
        })
        .await?;

    Ok(Json(serialize_restaurant_details(
        &restaurant,
        &restaurant_pizzas,
    )))
}

#[utoipa::path(
    delete,
    path = "/restaurants/{id}",
    responses(
        (status = 204, description = "Restaurant and its pizzas deleted"),
        (status = 404, description = "Restaurant not found", body = ApiErrorResponse),
    ),
    params(
        ("id" = i32, Path, description = "Restaurant ID")
    ),
    tag = "restaurants"
)]
#[instrument(skip(state))]
pub async fn delete_restaurant(
    State(state): State<AppState>,
    path: Result<Path<i32>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let id = restaurant_id(path)?;

    let deleted = state
        .with_conn(move |conn| Ok(db::delete_restaurant(conn, id)?))
        .await?;
    if !deleted {
        return Err(ApiError::NotFound("Restaurant"));
    }

    info!(id, "restaurant deleted");
    Ok(StatusCode::NO_CONTENT)
}
