// src/users/mod.rs

pub mod handlers;
pub mod models;
pub mod routes;
pub mod store;
pub mod validators;


pub use routes::users_routes;
pub use store::UserStore;
