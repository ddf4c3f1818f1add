use diesel::prelude::*;
use tracing::info;

use crate::db::{insert_pizza, insert_restaurant};
use crate::models::{
    NewPizza, NewRestaurant, NewRestaurantPizza, Pizza, Restaurant, RestaurantPizza,
};
use crate::schema::{pizzas, restaurant_pizzas, restaurants};

const RESTAURANTS: [(&str, &str); 3] = [
    ("Karen's Pizza Shack", "123 Sesame St"),
    ("Sanjay's Pizza", "50 Main St"),
    ("Kiki's Pizza", "8 Harbor Rd"),
];

const PIZZAS: [(&str, &str); 3] = [
    ("Emma", "Dough, Tomato Sauce, Cheese"),
    ("Geri", "Dough, Tomato Sauce, Cheese, Pepperoni"),
    ("Melanie", "Dough, Sauce, Ricotta, Red peppers, Mustard"),
];

const SEED_PRICE: i32 = 1;

#[derive(Debug)]
pub struct SeededData {
    pub restaurants: Vec<Restaurant>,
    pub pizzas: Vec<Pizza>,
    pub restaurant_pizzas: Vec<RestaurantPizza>,
}

/// Replaces every row with the sample dataset: three restaurants, three pizzas,
/// and one association pairing the n-th restaurant with the n-th pizza.
pub fn seed(conn: &mut SqliteConnection) -> QueryResult<SeededData> {
    conn.transaction(|conn| {
        diesel::delete(restaurant_pizzas::table).execute(conn)?;
        diesel::delete(pizzas::table).execute(conn)?;
        diesel::delete(restaurants::table).execute(conn)?;

        let restaurants = RESTAURANTS
            .iter()
            .map(|&(name, address)| insert_restaurant(conn, &NewRestaurant { name, address }))
            .collect::<QueryResult<Vec<_>>>()?;
        let pizzas = PIZZAS
            .iter()
            .map(|&(name, ingredients)| insert_pizza(conn, &NewPizza { name, ingredients }))
            .collect::<QueryResult<Vec<_>>>()?;

        let associations = restaurants
            .iter()
            .zip(&pizzas)
            .map(|(restaurant, pizza)| {
                diesel::insert_into(restaurant_pizzas::table)
                    .values(&NewRestaurantPizza {
                        price: SEED_PRICE,
                        pizza_id: pizza.id,
                        restaurant_id: restaurant.id,
                    })
                    .returning(RestaurantPizza::as_returning())
                    .get_result(conn)
            })
            .collect::<QueryResult<Vec<_>>>()?;

        info!(
            restaurants = restaurants.len(),
            pizzas = pizzas.len(),
            restaurant_pizzas = associations.len(),
            "seeded database"
        );

        Ok(SeededData {
            restaurants,
            pizzas,
            restaurant_pizzas: associations,
        })
    })
}
