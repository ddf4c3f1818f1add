use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Json,
    routing::post,
    Router,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, instrument};
use utoipa::ToSchema;

use crate::db;
use crate::error::ApiError;
use crate::models::RestaurantPizzaDraft;
use crate::serializer::*;

use super::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/restaurant_pizzas", post(create_restaurant_pizza))
}

/// Body of `POST /restaurant_pizzas`.
///
/// Fields are taken as raw JSON so that a missing or mistyped value becomes a
/// validation error instead of an extractor rejection.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRestaurantPizzaRequest {
    /// Price between 1 and 30 inclusive
    #[schema(value_type = i32, minimum = 1, maximum = 30)]
    pub price: Option<Value>,
    /// Id of an existing pizza
    #[schema(value_type = i32)]
    pub pizza_id: Option<Value>,
    /// Id of an existing restaurant
    #[schema(value_type = i32)]
    pub restaurant_id: Option<Value>,
}

fn integer_id(value: Option<&Value>) -> Option<i32> {
    value
        .and_then(Value::as_i64)
        .and_then(|id| i32::try_from(id).ok())
}

impl From<CreateRestaurantPizzaRequest> for RestaurantPizzaDraft {
    fn from(request: CreateRestaurantPizzaRequest) -> Self {
        RestaurantPizzaDraft {
            pizza_id: integer_id(request.pizza_id.as_ref()),
            restaurant_id: integer_id(request.restaurant_id.as_ref()),
            price: request.price,
        }
    }
}

#[utoipa::path(
    post,
    path = "/restaurant_pizzas",
    request_body = CreateRestaurantPizzaRequest,
    responses(
        (status = 201, description = "Pizza added to the restaurant", body = RestaurantPizzaCreated),
        (status = 400, description = "Unknown pizza or restaurant, or invalid price", body = ValidationErrorResponse),
    ),
    tag = "restaurant_pizzas"
)]
#[instrument(skip(state))]
pub async fn create_restaurant_pizza(
    State(state): State<AppState>,
    payload: Result<Json<CreateRestaurantPizzaRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RestaurantPizzaCreated>), ApiError> {
    let Json(payload) = payload.map_err(|e| ApiError::Validation(e.body_text()))?;
    let draft = RestaurantPizzaDraft::from(payload);

    let (restaurant_pizza, pizza, restaurant) = state
        .with_conn(move |conn| Ok(db::create_restaurant_pizza(conn, &draft)?))
        .await?;

    info!(
        id = restaurant_pizza.id,
        pizza_id = pizza.id,
        restaurant_id = restaurant.id,
        price = restaurant_pizza.price,
        "restaurant pizza created"
    );

    Ok((
        StatusCode::CREATED,
        Json(serialize_restaurant_pizza_created(
            &restaurant_pizza,
            &pizza,
            &restaurant,
        )),
    ))
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::db::DbPool;
    use crate::schema::restaurant_pizzas;
    use diesel::prelude::*;
    use serde_json::json;

    fn count_associations(pool: &DbPool) -> i64 {
        restaurant_pizzas::table
            .count()
            .get_result(&mut *pool.get().unwrap())
            .unwrap()
    }

    #[test]
    fn test_draft_from_request() {
        let request: CreateRestaurantPizzaRequest =
            serde_json::from_value(json!({"price": "ten", "pizza_id": 3, "restaurant_id": "2"}))
                .unwrap();

        let draft = RestaurantPizzaDraft::from(request);

        assert_eq!(draft.price, Some(json!("ten")));
        assert_eq!(draft.pizza_id, Some(3));
        assert_eq!(draft.restaurant_id, None);
    }

    #[tokio::test]
    async fn test_create_restaurant_pizza() {
        let (app, pool, data) = seeded_app();
        let pizza = &data.pizzas[2];
        let restaurant = &data.restaurants[0];
        let before = count_associations(&pool);

        let (status, body) = send(
            &app,
            "POST",
            "/restaurant_pizzas",
            Some(json!({"price": 15, "pizza_id": pizza.id, "restaurant_id": restaurant.id})),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["price"], 15);
        assert_eq!(body["pizza_id"], pizza.id);
        assert_eq!(body["restaurant_id"], restaurant.id);
        assert_eq!(
            body["pizza"],
            json!({"id": pizza.id, "name": pizza.name, "ingredients": pizza.ingredients})
        );
        assert_eq!(
            body["restaurant"],
            json!({"id": restaurant.id, "name": restaurant.name, "address": restaurant.address})
        );
        assert_eq!(count_associations(&pool), before + 1);

        let (_, details) =
            send(&app, "GET", &format!("/restaurants/{}", restaurant.id), None).await;
        let created = details["restaurant_pizzas"]
            .as_array()
            .unwrap()
            .iter()
            .find(|rp| rp["id"] == body["id"])
            .unwrap();
        assert_eq!(created["price"], 15);
        assert_eq!(created["pizza"]["name"], pizza.name.as_str());
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_price() {
        let (app, pool, data) = seeded_app();
        let before = count_associations(&pool);
        let pizza_id = data.pizzas[0].id;
        let restaurant_id = data.restaurants[0].id;

        for payload in [
            json!({"price": 0, "pizza_id": pizza_id, "restaurant_id": restaurant_id}),
            json!({"price": 31, "pizza_id": pizza_id, "restaurant_id": restaurant_id}),
            json!({"price": "ten", "pizza_id": pizza_id, "restaurant_id": restaurant_id}),
            json!({"price": 12.5, "pizza_id": pizza_id, "restaurant_id": restaurant_id}),
            json!({"price": null, "pizza_id": pizza_id, "restaurant_id": restaurant_id}),
            json!({"pizza_id": pizza_id, "restaurant_id": restaurant_id}),
        ] {
            let (status, body) =
                send(&app, "POST", "/restaurant_pizzas", Some(payload.clone())).await;

            assert_eq!(status, StatusCode::BAD_REQUEST, "{payload}");
            assert_eq!(body, json!({"errors": ["validation errors"]}));
        }

        assert_eq!(count_associations(&pool), before);
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_references() {
        let (app, pool, data) = seeded_app();
        let before = count_associations(&pool);
        let pizza_id = data.pizzas[0].id;
        let restaurant_id = data.restaurants[0].id;

        for payload in [
            json!({"price": 10, "pizza_id": 9999, "restaurant_id": restaurant_id}),
            json!({"price": 10, "pizza_id": pizza_id, "restaurant_id": 9999}),
            json!({"price": 10, "restaurant_id": restaurant_id}),
            json!({"price": 10, "pizza_id": pizza_id.to_string(), "restaurant_id": restaurant_id}),
            json!({"price": 0, "pizza_id": 9999, "restaurant_id": 9999}),
        ] {
            let (status, body) =
                send(&app, "POST", "/restaurant_pizzas", Some(payload.clone())).await;

            assert_eq!(status, StatusCode::BAD_REQUEST, "{payload}");
            assert_eq!(body, json!({"errors": ["validation errors"]}));
        }

        assert_eq!(count_associations(&pool), before);
    }

    #[tokio::test]
    async fn test_create_rejects_malformed_body() {
        let (app, pool, _) = seeded_app();
        let before = count_associations(&pool);

        let requests = [
            Some(("application/json", "{\"price\": 10,".to_string())),
            Some(("application/json", "\"price\"".to_string())),
            Some(("text/plain", "{\"price\": 10}".to_string())),
            None,
        ];
        for request in requests {
            let (status, body) = send_raw(&app, "POST", "/restaurant_pizzas", request).await;

            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body, json!({"errors": ["validation errors"]}));
        }

        assert_eq!(count_associations(&pool), before);
    }
}
