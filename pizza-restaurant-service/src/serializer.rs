//! Response shapes for each endpoint.
//!
//! Rows are never serialized directly: every endpoint builds one of these
//! structures so that nested objects carry exactly the listed fields and never
//! point back at their parent.

use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{Pizza, Restaurant, RestaurantPizza};

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiErrorResponse {
    /// Error message
    pub error: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ValidationErrorResponse {
    /// Always `["validation errors"]`
    pub errors: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema, PartialEq)]
pub struct RestaurantSummary {
    pub id: i32,
    pub name: String,
    pub address: String,
}

#[derive(Debug, Serialize, ToSchema, PartialEq)]
pub struct PizzaSummary {
    pub id: i32,
    pub name: String,
    pub ingredients: String,
}

/// An association as listed under its restaurant.
#[derive(Debug, Serialize, ToSchema, PartialEq)]
pub struct RestaurantPizzaWithPizza {
    pub id: i32,
    pub price: i32,
    pub pizza_id: i32,
    pub restaurant_id: i32,
    pub pizza: PizzaSummary,
}

#[derive(Debug, Serialize, ToSchema, PartialEq)]
pub struct RestaurantDetails {
    pub id: i32,
    pub name: String,
    pub address: String,
    pub restaurant_pizzas: Vec<RestaurantPizzaWithPizza>,
}

/// A freshly created association with both parents embedded.
#[derive(Debug, Serialize, ToSchema, PartialEq)]
pub struct RestaurantPizzaCreated {
    pub id: i32,
    pub price: i32,
    pub pizza_id: i32,
    pub restaurant_id: i32,
    pub pizza: PizzaSummary,
    pub restaurant: RestaurantSummary,
}

pub fn serialize_restaurant(restaurant: &Restaurant) -> RestaurantSummary {
    RestaurantSummary {
        id: restaurant.id,
        name: restaurant.name.clone(),
        address: restaurant.address.clone(),
    }
}

pub fn serialize_pizza(pizza: &Pizza) -> PizzaSummary {
    PizzaSummary {
        id: pizza.id,
        name: pizza.name.clone(),
        ingredients: pizza.ingredients.clone(),
    }
}

pub fn serialize_restaurant_details(
    restaurant: &Restaurant,
    restaurant_pizzas: &[(RestaurantPizza, Pizza)],
) -> RestaurantDetails {
    RestaurantDetails {
        id: restaurant.id,
        name: restaurant.name.clone(),
        address: restaurant.address.clone(),
        restaurant_pizzas: restaurant_pizzas
            .iter()
            .map(|(rp, pizza)| RestaurantPizzaWithPizza {
                id: rp.id,
                price: rp.price,
                pizza_id: rp.pizza_id,
                restaurant_id: rp.restaurant_id,
                pizza: serialize_pizza(pizza),
            })
            .collect(),
    }
}

pub fn serialize_restaurant_pizza_created(
    restaurant_pizza: &RestaurantPizza,
    pizza: &Pizza,
    restaurant: &Restaurant,
) -> RestaurantPizzaCreated {
    RestaurantPizzaCreated {
        id: restaurant_pizza.id,
        price: restaurant_pizza.price,
        pizza_id: restaurant_pizza.pizza_id,
        restaurant_id: restaurant_pizza.restaurant_id,
        pizza: serialize_pizza(pizza),
        restaurant: serialize_restaurant(restaurant),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn restaurant() -> Restaurant {
        Restaurant {
            id: 1,
            name: "Kiki's Pizza".to_string(),
            address: "8 Harbor Rd".to_string(),
        }
    }

    fn pizza() -> Pizza {
        Pizza {
            id: 2,
            name: "Geri".to_string(),
            ingredients: "Dough, Tomato Sauce, Cheese, Pepperoni".to_string(),
        }
    }

    #[test]
    fn test_restaurant_details_shape() {
        let rp = RestaurantPizza {
            id: 5,
            price: 9,
            pizza_id: 2,
            restaurant_id: 1,
        };

        let details = serialize_restaurant_details(&restaurant(), &[(rp, pizza())]);

        assert_eq!(
            serde_json::to_value(&details).unwrap(),
            json!({
                "id": 1,
                "name": "Kiki's Pizza",
                "address": "8 Harbor Rd",
                "restaurant_pizzas": [{
                    "id": 5,
                    "price": 9,
                    "pizza_id": 2,
                    "restaurant_id": 1,
                    "pizza": {
                        "id": 2,
                        "name": "Geri",
                        "ingredients": "Dough, Tomato Sauce, Cheese, Pepperoni"
                    }
                }]
            })
        );
    }

    #[test]
    fn test_created_embeds_both_parents() {
        let rp = RestaurantPizza {
            id: 11,
            price: 15,
            pizza_id: 2,
            restaurant_id: 1,
        };

        let created = serialize_restaurant_pizza_created(&rp, &pizza(), &restaurant());
        let value = serde_json::to_value(&created).unwrap();

        assert_eq!(value["price"], 15);
        assert_eq!(
            value["pizza"],
            json!({
                "id": 2,
                "name": "Geri",
                "ingredients": "Dough, Tomato Sauce, Cheese, Pepperoni"
            })
        );
        assert_eq!(
            value["restaurant"],
            json!({"id": 1, "name": "Kiki's Pizza", "address": "8 Harbor Rd"})
        );
        assert!(value["pizza"].get("restaurant_pizzas").is_none());
    }
}
